use std::fmt;
use std::path::{Component, Path, PathBuf};

use thiserror::Error;

/// 相对存储根目录的路径键，分隔符固定为 `/`，根目录为空串。
///
/// 评论、下载统计都以它为键，所以同一个条目在任何平台上必须得到同一个字符串。
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PathKey(String);

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PathError {
    #[error("path segment not allowed: {0:?}")]
    BadSegment(String),
    #[error("path is outside the storage root: {0}")]
    OutsideRoot(String),
}

impl PathKey {
    pub fn root() -> Self {
        PathKey(String::new())
    }

    /// 解析外部传入的路径（查询参数、表单字段）。
    /// 首尾的 `/` 被忽略，`..`、`.`、空段和反斜杠一律拒绝。
    pub fn parse(raw: &str) -> Result<Self, PathError> {
        let trimmed = raw.trim_matches('/');
        if trimmed.is_empty() {
            return Ok(Self::root());
        }
        for segment in trimmed.split('/') {
            if !is_valid_name(segment) {
                return Err(PathError::BadSegment(segment.to_string()));
            }
        }
        Ok(PathKey(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    /// 最后一段；根目录返回空串。
    pub fn name(&self) -> &str {
        self.0.rsplit('/').next().unwrap_or("")
    }

    /// 拼接一个子条目名，名字必须是单个普通路径段。
    pub fn child(&self, name: &str) -> Option<PathKey> {
        if !is_valid_name(name) {
            return None;
        }
        if self.is_root() {
            Some(PathKey(name.to_string()))
        } else {
            Some(PathKey(format!("{}/{}", self.0, name)))
        }
    }

    /// 上级目录，根目录的上级仍是根目录。
    pub fn parent(&self) -> PathKey {
        match self.0.rfind('/') {
            Some(idx) => PathKey(self.0[..idx].to_string()),
            None => Self::root(),
        }
    }

    /// 按路径段判断前缀：`a/b` 是 `a/b/c` 的前缀，但不是 `a/bc` 的前缀。
    pub fn starts_with(&self, prefix: &PathKey) -> bool {
        if prefix.is_root() {
            return true;
        }
        match self.0.strip_prefix(prefix.as_str()) {
            Some(rest) => rest.is_empty() || rest.starts_with('/'),
            None => false,
        }
    }

    /// 把 `from` 前缀替换为 `to`；不以 `from` 开头时返回 `None`。
    pub fn rebase(&self, from: &PathKey, to: &PathKey) -> Option<PathKey> {
        if !self.starts_with(from) {
            return None;
        }
        let rest = self.0[from.0.len()..].trim_start_matches('/');
        if rest.is_empty() {
            return Some(to.clone());
        }
        if to.is_root() {
            Some(PathKey(rest.to_string()))
        } else {
            Some(PathKey(format!("{}/{}", to.0, rest)))
        }
    }

    pub fn to_fs_path(&self, root: &Path) -> PathBuf {
        let mut path = root.to_path_buf();
        for segment in self.0.split('/').filter(|s| !s.is_empty()) {
            path.push(segment);
        }
        path
    }

    /// 把遍历得到的绝对路径转换回键。
    pub fn from_fs_path(root: &Path, path: &Path) -> Result<PathKey, PathError> {
        let relative = path
            .strip_prefix(root)
            .map_err(|_| PathError::OutsideRoot(path.display().to_string()))?;
        let mut segments = Vec::new();
        for component in relative.components() {
            match component {
                // 与 parse 同样的规则，非 UTF-8 或含反斜杠的名字拿不到键
                Component::Normal(part) => match part.to_str() {
                    Some(name) if is_valid_name(name) => segments.push(name.to_string()),
                    _ => return Err(PathError::BadSegment(part.to_string_lossy().into_owned())),
                },
                _ => return Err(PathError::BadSegment(relative.display().to_string())),
            }
        }
        Ok(PathKey(segments.join("/")))
    }
}

impl fmt::Display for PathKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_root() {
            f.write_str(".")
        } else {
            f.write_str(&self.0)
        }
    }
}

/// 单个路径段是否合法（用于新建、重命名、上传的名字）。
pub fn is_valid_name(name: &str) -> bool {
    !name.is_empty()
        && name != "."
        && name != ".."
        && !name.contains('/')
        && !name.contains('\\')
        && !name.contains('\0')
}
