use tracing::{debug, warn};

use crate::navigator;
use crate::path::PathKey;
use crate::shelf::Shelf;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ranked {
    pub key: PathKey,
    pub downloads: u64,
    pub size: u64,
}

impl Shelf {
    /// 记一次下载。在开始传输之前调用，传输中途失败也算一次。
    pub fn register_download(&self, key: &PathKey) {
        match self.registry().stats.increment(key) {
            Ok(count) => debug!(file = %key, count, "download registered"),
            Err(e) => warn!(file = %key, error = %e, "failed to register download"),
        }
    }

    /// 下载次数最多的前 `n` 个仍然存在的文件。
    pub fn top_downloads(&self, n: usize) -> Vec<Ranked> {
        self.registry()
            .stats
            .top_n(usize::MAX)
            .into_iter()
            .filter(|(key, _)| navigator::is_file(self.root(), key))
            .take(n)
            .map(|(key, downloads)| Ranked {
                size: navigator::file_size(self.root(), &key),
                key,
                downloads,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn two_downloads_add_two() {
        let dir = tempdir().unwrap();
        let shelf = Shelf::open(&dir.path().join("up"), dir.path()).unwrap();
        let key = PathKey::parse("f.bin").unwrap();
        let before = shelf.registry().stats.get(&key);
        shelf.register_download(&key);
        shelf.register_download(&key);
        assert_eq!(shelf.registry().stats.get(&key), before + 2);
    }

    #[test]
    fn top_downloads_skips_missing_files() {
        let dir = tempdir().unwrap();
        let shelf = Shelf::open(&dir.path().join("up"), dir.path()).unwrap();
        fs::write(shelf.root().join("kept.txt"), b"12345").unwrap();
        let kept = PathKey::parse("kept.txt").unwrap();
        let gone = PathKey::parse("gone.txt").unwrap();
        for _ in 0..3 {
            shelf.register_download(&gone);
        }
        shelf.register_download(&kept);

        let top = shelf.top_downloads(5);
        assert_eq!(top.len(), 1);
        assert_eq!(top[0].key, kept);
        assert_eq!(top[0].downloads, 1);
        assert_eq!(top[0].size, 5);
    }
}
