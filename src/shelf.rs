use std::io;
use std::path::{Path, PathBuf};

use tracing::info;

use crate::navigator::{self, Listing};
use crate::path::PathKey;
use crate::search::{self, SearchHit};
use crate::store::Registry;

/// 存储根目录加上它的附属文档。所有操作每次都重新读磁盘，不缓存任何状态。
pub struct Shelf {
    root: PathBuf,
    registry: Registry,
}

impl Shelf {
    /// 打开（必要时创建）存储根目录。根目录会被规范化为绝对路径。
    pub fn open(root: &Path, data_dir: &Path) -> io::Result<Self> {
        std::fs::create_dir_all(root)?;
        std::fs::create_dir_all(data_dir)?;
        let root = std::fs::canonicalize(root)?;
        info!(root = %root.display(), data_dir = %data_dir.display(), "storage opened");
        Ok(Self {
            root,
            registry: Registry::open(data_dir),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn list(&self, dir: &PathKey) -> Listing {
        navigator::list(&self.root, dir)
    }

    pub fn search(&self, query: &str, extension: Option<&str>) -> Vec<SearchHit> {
        search::search(&self.root, query, extension)
    }

    pub fn comment(&self, key: &PathKey) -> String {
        self.registry.comments.get(key)
    }

    pub fn set_comment(&self, key: &PathKey, text: &str) -> bool {
        self.registry.comments.set(key, text)
    }
}
