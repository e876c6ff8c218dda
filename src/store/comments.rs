use std::collections::BTreeMap;
use std::path::PathBuf;

use tracing::warn;

use super::{remap_keys, remove_keys, JsonDocument, StoreError};
use crate::path::PathKey;

/// 文件评论：路径键 -> 评论文本。空评论等同于没有评论，从不落盘。
pub struct Comments {
    doc: JsonDocument<BTreeMap<String, String>>,
}

impl Comments {
    pub fn new(path: PathBuf) -> Self {
        Self {
            doc: JsonDocument::new(path),
        }
    }

    pub fn get(&self, key: &PathKey) -> String {
        self.doc.load().remove(key.as_str()).unwrap_or_default()
    }

    pub fn all(&self) -> BTreeMap<String, String> {
        self.doc.load()
    }

    /// 设置评论；`text` 为空时删除该键。写入失败返回 `false`。
    pub fn set(&self, key: &PathKey, text: &str) -> bool {
        let result = self.doc.update(|map| {
            if text.is_empty() {
                map.remove(key.as_str()).is_some()
            } else {
                map.insert(key.as_str().to_string(), text.to_string())
                    .as_deref()
                    != Some(text)
            }
        });
        match result {
            Ok(_) => true,
            Err(e) => {
                warn!(key = %key, error = %e, "failed to save comment");
                false
            }
        }
    }

    pub fn remap_prefix(&self, from: &PathKey, to: &PathKey) -> Result<usize, StoreError> {
        let mut moved = 0;
        self.doc.update(|map| {
            moved = remap_keys(map, from, to);
            moved > 0
        })?;
        Ok(moved)
    }

    pub fn remove_prefix(&self, prefix: &PathKey) -> Result<usize, StoreError> {
        let mut removed = 0;
        self.doc.update(|map| {
            removed = remove_keys(map, prefix);
            removed > 0
        })?;
        Ok(removed)
    }
}
