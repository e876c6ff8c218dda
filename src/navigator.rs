use std::path::Path;

use tracing::debug;
use walkdir::WalkDir;

use crate::path::{is_valid_name, PathKey};

/// 目录的直接子项，文件夹与文件分开，各自按名字排序。
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Listing {
    pub folders: Vec<String>,
    pub files: Vec<String>,
}

impl Listing {
    pub fn is_empty(&self) -> bool {
        self.folders.is_empty() && self.files.is_empty()
    }
}

/// 列出 `dir` 的直接子项。任何 I/O 错误都返回空列表。
pub fn list(root: &Path, dir: &PathKey) -> Listing {
    let path = dir.to_fs_path(root);
    let entries = match std::fs::read_dir(&path) {
        Ok(entries) => entries,
        Err(e) => {
            debug!(dir = %dir, error = %e, "cannot list directory");
            return Listing::default();
        }
    };

    let mut listing = Listing::default();
    for entry in entries {
        let Ok(entry) = entry else { return Listing::default() };
        // 无法作为键的名字不列出，搜索里同样查不到它
        let name = match entry.file_name().into_string() {
            Ok(name) if is_valid_name(&name) => name,
            Ok(name) => {
                debug!(dir = %dir, name, "skipping unaddressable entry");
                continue;
            }
            Err(raw) => {
                debug!(dir = %dir, name = ?raw, "skipping non UTF-8 entry");
                continue;
            }
        };
        // 跟随符号链接，与“是否目录/是否文件”的判断保持一致
        match std::fs::metadata(entry.path()) {
            Ok(meta) if meta.is_dir() => listing.folders.push(name),
            Ok(meta) if meta.is_file() => listing.files.push(name),
            _ => {}
        }
    }
    listing.folders.sort();
    listing.files.sort();
    listing
}

/// 进入子目录，只做路径拼接，不检查是否存在。名字非法时返回 `None`。
pub fn descend(dir: &PathKey, child: &str) -> Option<PathKey> {
    dir.child(child)
}

/// 返回上级目录；已在根目录时保持不变。
pub fn ascend(dir: &PathKey) -> PathKey {
    dir.parent()
}

/// 目录下直接包含的文件数。
pub fn count_files(root: &Path, dir: &PathKey) -> usize {
    list(root, dir).files.len()
}

/// 根目录及其下所有文件夹，根目录排在最前。
pub fn all_folders(root: &Path) -> Vec<PathKey> {
    let mut folders: Vec<PathKey> = WalkDir::new(root)
        .follow_links(true)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|entry| entry.file_type().is_dir())
        .filter_map(|entry| PathKey::from_fs_path(root, entry.path()).ok())
        .collect();
    folders.sort();
    folders
}

/// 文件大小（字节），读取失败按 0 处理。
pub fn file_size(root: &Path, key: &PathKey) -> u64 {
    std::fs::metadata(key.to_fs_path(root))
        .map(|meta| meta.len())
        .unwrap_or(0)
}

pub fn is_file(root: &Path, key: &PathKey) -> bool {
    key.to_fs_path(root).is_file()
}
