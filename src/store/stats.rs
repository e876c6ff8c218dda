use std::collections::BTreeMap;
use std::path::PathBuf;

use super::{remap_keys, remove_keys, JsonDocument, StoreError};
use crate::path::PathKey;

/// 下载计数：路径键 -> 次数。
pub struct Stats {
    doc: JsonDocument<BTreeMap<String, u64>>,
}

impl Stats {
    pub fn new(path: PathBuf) -> Self {
        Self {
            doc: JsonDocument::new(path),
        }
    }

    pub fn get(&self, key: &PathKey) -> u64 {
        self.doc.load().get(key.as_str()).copied().unwrap_or(0)
    }

    pub fn increment(&self, key: &PathKey) -> Result<u64, StoreError> {
        let mut count = 0;
        self.doc.update(|map| {
            let entry = map.entry(key.as_str().to_string()).or_insert(0);
            *entry = entry.saturating_add(1);
            count = *entry;
            true
        })?;
        Ok(count)
    }

    /// 按次数降序取前 `n` 个。次数相同时按路径键升序（文档按键有序存放，排序是稳定的）。
    pub fn top_n(&self, n: usize) -> Vec<(PathKey, u64)> {
        let mut entries: Vec<(PathKey, u64)> = self
            .doc
            .load()
            .into_iter()
            .filter_map(|(raw, count)| PathKey::parse(&raw).ok().map(|key| (key, count)))
            .collect();
        entries.sort_by(|a, b| b.1.cmp(&a.1));
        entries.truncate(n);
        entries
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
