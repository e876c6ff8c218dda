use std::cmp::min;
use std::io::SeekFrom;

use axum::body::Body;
use axum::extract::{Query, State};
use axum::http::{header, HeaderMap, HeaderValue, Method, StatusCode};
use axum::response::Response;
use mime_guess::from_path;
use percent_encoding::{percent_encode, NON_ALPHANUMERIC};
use serde::Deserialize;
use tokio::fs::File;
use tokio::io::{AsyncReadExt, AsyncSeekExt};
use tokio_util::io::ReaderStream;
use tracing::debug;

use crate::app::AppState;
use crate::error::WebError;
use crate::path::PathKey;

// 常量定义 - 优化传输性能
const CHUNK_SIZE: usize = 1024 * 1024; // 1MB 数据块，提高大文件传输效率

#[derive(Debug, Deserialize)]
pub struct DownloadQuery {
    pub path: String,
}

pub async fn handle_download(
    State(state): State<AppState>,
    Query(query): Query<DownloadQuery>,
    method: Method,
    headers: HeaderMap,
) -> Result<Response, WebError> {
    let key = PathKey::parse(&query.path)?;
    let root = state.shelf.root().to_path_buf();

    // 安全验证：跟随符号链接后仍须落在根目录内
    let canonical_path = match tokio::fs::canonicalize(key.to_fs_path(&root)).await {
        Ok(p) => p,
        Err(_) => return Err(WebError::NotFound),
    };
    if !canonical_path.starts_with(&root) {
        return Err(WebError::Forbidden);
    }

    let metadata = tokio::fs::metadata(&canonical_path).await?;
    if !metadata.is_file() {
        return Err(WebError::NotFound);
    }
    let file_size = metadata.len();

    let range = match headers.get(header::RANGE) {
        Some(value) if file_size > 0 => Some(parse_range(value, file_size)?),
        _ => None,
    };

    // 每次从头开始的下载记一次；续传请求和 HEAD 不计数
    if method != Method::HEAD && range.map_or(true, |(start, _)| start == 0) {
        let counted = key.clone();
        state
            .blocking(move |shelf| shelf.register_download(&counted))
            .await?;
    }

    let mime_type = from_path(&canonical_path).first_or_octet_stream();
    let original_filename = key.name();
    let encoded_filename = percent_encode(original_filename.as_bytes(), NON_ALPHANUMERIC);
    // filename 只放 ASCII 兜底，完整名字放在 RFC 5987 的 filename* 里
    let ascii_fallback: String = original_filename
        .chars()
        .map(|c| if c.is_ascii_graphic() || c == ' ' { c } else { '_' })
        .collect();
    let content_disposition = format!(
        "attachment; filename=\"{}\"; filename*=UTF-8''{}",
        ascii_fallback.replace('"', "\\\""),
        encoded_filename
    );

    let builder = Response::builder()
        .header(header::CONTENT_TYPE, mime_type.as_ref())
        .header(
            header::CONTENT_DISPOSITION,
            HeaderValue::from_str(&content_disposition)
                .unwrap_or_else(|_| HeaderValue::from_static("attachment")),
        )
        .header(header::ACCEPT_RANGES, "bytes");

    let mut file = File::open(&canonical_path).await?;
    let response = match range {
        Some((start, end)) => {
            let content_length = end - start + 1;
            file.seek(SeekFrom::Start(start)).await?;
            debug!(file = %key, start, end, "range download");
            let stream = ReaderStream::with_capacity(file.take(content_length), CHUNK_SIZE);
            builder
                .status(StatusCode::PARTIAL_CONTENT)
                .header(
                    header::CONTENT_RANGE,
                    format!("bytes {}-{}/{}", start, end, file_size),
                )
                .header(header::CONTENT_LENGTH, content_length)
                .body(Body::from_stream(stream))
        }
        None => {
            debug!(file = %key, size = file_size, "full download");
            let stream = ReaderStream::with_capacity(file, CHUNK_SIZE);
            builder
                .header(header::CONTENT_LENGTH, file_size)
                .body(Body::from_stream(stream))
        }
    };
    response.map_err(|e| WebError::BadRequest(e.to_string()))
}

/// 解析单段 `Range: bytes=a-b`，返回闭区间 `(start, end)`。
/// 只支持单个区间；`bytes=-n` 表示最后 n 个字节。
fn parse_range(value: &HeaderValue, file_size: u64) -> Result<(u64, u64), WebError> {
    let bad = || WebError::BadRequest("invalid Range header".into());
    let range_str = value.to_str().map_err(|_| bad())?;
    let ranges_str = range_str.strip_prefix("bytes=").ok_or_else(bad)?;
    if ranges_str.contains(',') {
        return Err(bad());
    }
    let (first, last) = ranges_str.trim().split_once('-').ok_or_else(bad)?;
    let last_byte = file_size - 1;

    let (start, end) = if first.is_empty() {
        let suffix: u64 = last.parse().map_err(|_| bad())?;
        if suffix == 0 {
            return Err(WebError::RangeNotSatisfiable(file_size));
        }
        (file_size.saturating_sub(suffix), last_byte)
    } else {
        let start: u64 = first.parse().map_err(|_| bad())?;
        let end = if last.is_empty() {
            last_byte
        } else {
            min(last.parse::<u64>().map_err(|_| bad())?, last_byte)
        };
        (start, end)
    };

    if start > end || start >= file_size {
        return Err(WebError::RangeNotSatisfiable(file_size));
    }
    Ok((start, end))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn range(raw: &'static str, size: u64) -> Result<(u64, u64), WebError> {
        parse_range(&HeaderValue::from_static(raw), size)
    }

    #[test]
    fn parses_open_and_closed_ranges() {
        assert_eq!(range("bytes=0-99", 1000).unwrap(), (0, 99));
        assert_eq!(range("bytes=500-", 1000).unwrap(), (500, 999));
        assert_eq!(range("bytes=900-5000", 1000).unwrap(), (900, 999));
        assert_eq!(range("bytes=-100", 1000).unwrap(), (900, 999));
    }

    #[test]
    fn rejects_unsatisfiable_ranges() {
        assert!(matches!(
            range("bytes=1000-", 1000),
            Err(WebError::RangeNotSatisfiable(1000))
        ));
        assert!(matches!(
            range("bytes=50-10", 1000),
            Err(WebError::RangeNotSatisfiable(_))
        ));
        assert!(matches!(range("items=0-1", 1000), Err(WebError::BadRequest(_))));
        assert!(matches!(range("bytes=0-1,5-6", 1000), Err(WebError::BadRequest(_))));
    }
}
