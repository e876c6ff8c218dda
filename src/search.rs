use std::path::{Path, PathBuf};

use tracing::debug;
use walkdir::WalkDir;

use crate::path::PathKey;

/// 不按扩展名过滤时使用的哨兵值。
pub const ALL_EXTENSIONS: &str = "all";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchHit {
    pub name: String,
    pub key: PathKey,
    pub path: PathBuf,
}

/// 递归搜索文件名包含 `query` 的文件（不区分大小写）。
///
/// `extension` 为 `None`、空串或 `all` 时不过滤，否则要求文件名以它结尾（同样不区分大小写）。
/// 结果顺序即目录遍历顺序，不保证稳定。
pub fn search(root: &Path, query: &str, extension: Option<&str>) -> Vec<SearchHit> {
    let needle = query.to_lowercase();
    let suffix = extension
        .map(str::trim)
        .filter(|ext| !ext.is_empty() && !ext.eq_ignore_ascii_case(ALL_EXTENSIONS))
        .map(str::to_lowercase);

    let mut hits = Vec::new();
    for entry in WalkDir::new(root).follow_links(true) {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                debug!(error = %e, "skipping unreadable entry");
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }
        let name = entry.file_name().to_string_lossy().into_owned();
        let lowered = name.to_lowercase();
        if !lowered.contains(&needle) {
            continue;
        }
        if let Some(suffix) = &suffix {
            if !lowered.ends_with(suffix.as_str()) {
                continue;
            }
        }
        let Ok(key) = PathKey::from_fs_path(root, entry.path()) else {
            continue;
        };
        hits.push(SearchHit {
            name,
            key,
            path: entry.into_path(),
        });
    }
    hits
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;
    use std::fs;
    use tempfile::tempdir;

    fn tree() -> tempfile::TempDir {
        let dir = tempdir().unwrap();
        fs::create_dir_all(dir.path().join("a")).unwrap();
        fs::create_dir_all(dir.path().join("b")).unwrap();
        fs::write(dir.path().join("a/report1.pdf"), b"1").unwrap();
        fs::write(dir.path().join("a/report2.txt"), b"2").unwrap();
        fs::write(dir.path().join("b/Report3.PDF"), b"3").unwrap();
        fs::write(dir.path().join("b/notes.md"), b"4").unwrap();
        dir
    }

    fn names(hits: &[SearchHit]) -> BTreeSet<String> {
        hits.iter().map(|h| h.name.clone()).collect()
    }

    #[cfg(unix)]
    #[test]
    fn unaddressable_files_are_not_found() {
        let dir = tree();
        fs::write(dir.path().join("a/report\\old.pdf"), b"5").unwrap();
        let hits = search(dir.path(), "report", Some(".pdf"));
        assert!(hits.iter().all(|h| !h.name.contains('\\')));
        assert_eq!(hits.len(), 2);
    }

    #[test]
    fn extension_filter_is_case_insensitive() {
        let dir = tree();
        let hits = search(dir.path(), "report", Some(".pdf"));
        let expected: BTreeSet<String> = ["report1.pdf", "Report3.PDF"]
            .into_iter()
            .map(String::from)
            .collect();
        assert_eq!(names(&hits), expected);
    }

    #[test]
    fn all_sentinel_disables_filter() {
        let dir = tree();
        assert_eq!(search(dir.path(), "REPORT", Some("All")).len(), 3);
        assert_eq!(search(dir.path(), "report", None).len(), 3);
    }

    #[test]
    fn hits_carry_path_keys() {
        let dir = tree();
        let hits = search(dir.path(), "notes", None);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].key.as_str(), "b/notes.md");
        assert_eq!(hits[0].path, dir.path().join("b/notes.md"));
    }

    #[test]
    fn folders_are_not_results() {
        let dir = tree();
        fs::create_dir(dir.path().join("report-archive")).unwrap();
        assert!(names(&search(dir.path(), "archive", None)).is_empty());
    }
}
