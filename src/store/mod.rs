//! 磁盘上的四个 JSON 附属文档：评论、下载统计、公告、管理员凭据。
//!
//! 每个文档每次修改都整体读出、修改、整体写回。同一进程内用互斥锁串行化，
//! 多进程同时写同一个文件时后写者覆盖先写者，不做检测。

mod advert;
mod comments;
mod credentials;
mod stats;

use std::collections::BTreeMap;
use std::io;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, warn};

use crate::path::PathKey;

pub use advert::{Advert, AdvertStore};
pub use comments::Comments;
pub use credentials::{CredentialStore, Credentials, DEFAULT_PASSWORD, DEFAULT_USERNAME};
pub use stats::Stats;

pub const COMMENTS_FILE: &str = "file_metadata.json";
pub const STATS_FILE: &str = "download_stats.json";
pub const ADVERT_FILE: &str = "reklama.json";
pub const CREDENTIALS_FILE: &str = "admin_secrets.json";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to read {path}: {source}")]
    Read { path: PathBuf, source: io::Error },
    #[error("failed to write {path}: {source}")]
    Write { path: PathBuf, source: io::Error },
    #[error("malformed document {path}: {source}")]
    Malformed {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("failed to encode document: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("advert lifetime of {0} hours is out of range")]
    ExpiryOutOfRange(u32),
}

/// 单个 JSON 文档。文件不存在或内容损坏时按默认值处理。
pub struct JsonDocument<T> {
    path: PathBuf,
    lock: Mutex<()>,
    _marker: PhantomData<fn() -> T>,
}

impl<T> JsonDocument<T>
where
    T: Serialize + DeserializeOwned + Default,
{
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
            _marker: PhantomData,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn load(&self) -> T {
        match self.read() {
            Ok(Some(value)) => value,
            Ok(None) => T::default(),
            Err(e) => {
                warn!(error = %e, "document unreadable, using defaults");
                T::default()
            }
        }
    }

    fn read(&self) -> Result<Option<T>, StoreError> {
        let bytes = match std::fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(source) => {
                return Err(StoreError::Read {
                    path: self.path.clone(),
                    source,
                })
            }
        };
        serde_json::from_slice(&bytes)
            .map(Some)
            .map_err(|source| StoreError::Malformed {
                path: self.path.clone(),
                source,
            })
    }

    /// 整体覆盖写入：先写临时文件再 rename，读者不会看到写了一半的文件。
    pub fn save(&self, value: &T) -> Result<(), StoreError> {
        let _guard = self.lock.lock();
        self.write(value)
    }

    fn write(&self, value: &T) -> Result<(), StoreError> {
        let encoded = serde_json::to_vec_pretty(value)?;
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, encoded)
            .and_then(|_| std::fs::rename(&tmp, &self.path))
            .map_err(|source| StoreError::Write {
                path: self.path.clone(),
                source,
            })?;
        debug!(path = %self.path.display(), "document saved");
        Ok(())
    }

    /// 读-改-写。`f` 返回 `true` 时才落盘。
    pub fn update<F>(&self, f: F) -> Result<bool, StoreError>
    where
        F: FnOnce(&mut T) -> bool,
    {
        let _guard = self.lock.lock();
        let mut value = self.load();
        let changed = f(&mut value);
        if changed {
            self.write(&value)?;
        }
        Ok(changed)
    }
}

/// 把 `from` 及其下所有键改挂到 `to` 下，返回移动的条目数。
pub(crate) fn remap_keys<V>(map: &mut BTreeMap<String, V>, from: &PathKey, to: &PathKey) -> usize {
    let moved: Vec<(String, PathKey)> = map
        .keys()
        .filter_map(|raw| {
            let key = PathKey::parse(raw).ok()?;
            key.rebase(from, to).map(|new_key| (raw.clone(), new_key))
        })
        .collect();
    for (old, new_key) in &moved {
        if let Some(value) = map.remove(old) {
            map.insert(new_key.as_str().to_string(), value);
        }
    }
    moved.len()
}

/// 删除 `prefix` 及其下所有键，返回删除的条目数。
pub(crate) fn remove_keys<V>(map: &mut BTreeMap<String, V>, prefix: &PathKey) -> usize {
    let before = map.len();
    map.retain(|raw, _| match PathKey::parse(raw) {
        Ok(key) => !key.starts_with(prefix),
        Err(_) => true,
    });
    before - map.len()
}

/// 数据目录下的全部附属文档。
pub struct Registry {
    pub comments: Comments,
    pub stats: Stats,
    pub advert: AdvertStore,
    pub credentials: CredentialStore,
}

impl Registry {
    pub fn open(data_dir: &Path) -> Self {
        Self {
            comments: Comments::new(data_dir.join(COMMENTS_FILE)),
            stats: Stats::new(data_dir.join(STATS_FILE)),
            advert: AdvertStore::new(data_dir.join(ADVERT_FILE)),
            credentials: CredentialStore::new(data_dir.join(CREDENTIALS_FILE)),
        }
    }
}
