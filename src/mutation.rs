//! 新建、删除、重命名、上传落盘。
//!
//! 所有操作失败时返回 `false` 并记录日志，不向调用方抛错。文件系统操作成功之后
//! 才去更新评论和下载统计，两者之间没有事务。

use std::io;
use std::path::PathBuf;

use tracing::{info, warn};

use crate::path::{is_valid_name, PathKey};
use crate::shelf::Shelf;

impl Shelf {
    /// 在 `parent` 下新建文件夹；已存在或出错时返回 `false`。
    pub fn create_folder(&self, parent: &PathKey, name: &str) -> bool {
        let name = name.trim();
        let Some(key) = parent.child(name) else {
            warn!(parent = %parent, name, "invalid folder name");
            return false;
        };
        let path = key.to_fs_path(self.root());
        if path.exists() {
            return false;
        }
        match std::fs::create_dir_all(&path) {
            Ok(()) => {
                info!(folder = %key, "folder created");
                true
            }
            Err(e) => {
                warn!(folder = %key, error = %e, "failed to create folder");
                false
            }
        }
    }

    /// 删除文件或整个文件夹。目标不存在时返回 `false`。
    ///
    /// 成功后同时清掉该路径及其下所有路径的评论和下载计数。
    pub fn delete(&self, parent: &PathKey, name: &str) -> bool {
        let Some(key) = parent.child(name) else {
            return false;
        };
        let path = key.to_fs_path(self.root());
        let meta = match std::fs::symlink_metadata(&path) {
            Ok(meta) => meta,
            Err(_) => return false,
        };
        let removed = if meta.is_dir() {
            std::fs::remove_dir_all(&path)
        } else {
            std::fs::remove_file(&path)
        };
        if let Err(e) = removed {
            warn!(entry = %key, error = %e, "failed to delete");
            return false;
        }
        info!(entry = %key, dir = meta.is_dir(), "deleted");

        let registry = self.registry();
        if let Err(e) = registry.comments.remove_prefix(&key) {
            warn!(entry = %key, error = %e, "failed to drop comments of deleted entry");
        }
        if let Err(e) = registry.stats.remove_prefix(&key) {
            warn!(entry = %key, error = %e, "failed to drop download counts of deleted entry");
        }
        true
    }

    /// 重命名文件或文件夹，再把评论和下载计数迁到新键下。
    ///
    /// 目标名已存在时拒绝，避免覆盖别的条目；文件系统重命名失败时附属文档保持不变。
    pub fn rename(&self, parent: &PathKey, old_name: &str, new_name: &str) -> bool {
        let new_name = new_name.trim();
        let (Some(old_key), Some(new_key)) = (parent.child(old_name), parent.child(new_name))
        else {
            warn!(parent = %parent, old_name, new_name, "invalid rename");
            return false;
        };
        let old_path = old_key.to_fs_path(self.root());
        if old_key == new_key {
            return old_path.exists();
        }
        let new_path = new_key.to_fs_path(self.root());
        if new_path.exists() {
            warn!(from = %old_key, to = %new_key, "rename target already exists");
            return false;
        }
        if let Err(e) = std::fs::rename(&old_path, &new_path) {
            warn!(from = %old_key, to = %new_key, error = %e, "rename failed");
            return false;
        }
        info!(from = %old_key, to = %new_key, "renamed");

        let registry = self.registry();
        if let Err(e) = registry.comments.remap_prefix(&old_key, &new_key) {
            warn!(from = %old_key, to = %new_key, error = %e, "failed to move comments");
        }
        if let Err(e) = registry.stats.remap_prefix(&old_key, &new_key) {
            warn!(from = %old_key, to = %new_key, error = %e, "failed to move download counts");
        }
        true
    }

    /// 上传文件的落盘位置。文件名先经过清洗；目标目录必须已存在。
    /// 同名文件会被覆盖。
    pub fn upload_target(&self, dir: &PathKey, file_name: &str) -> io::Result<(PathKey, PathBuf)> {
        let clean = sanitize_filename::sanitize(file_name);
        if !is_valid_name(&clean) {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("unusable file name: {file_name:?}"),
            ));
        }
        let folder = dir.to_fs_path(self.root());
        if !folder.is_dir() {
            return Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("upload folder does not exist: {dir}"),
            ));
        }
        let key = dir
            .child(&clean)
            .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "bad file name"))?;
        let path = key.to_fs_path(self.root());
        Ok((key, path))
    }
}
