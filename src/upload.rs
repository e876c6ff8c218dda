use axum::extract::{Multipart, State};
use axum::response::Redirect;
use axum_extra::extract::cookie::CookieJar;
use tokio::io::AsyncWriteExt;
use tracing::{info, warn};

use crate::app::{require_admin, session_id, AppState};
use crate::error::WebError;
use crate::i18n::Key;
use crate::path::PathKey;
use crate::session::{Event, Notice, Tone};

/// 目标文件夹字段名；它必须出现在文件字段之前，缺省时落到会话当前目录。
const FOLDER_FIELD: &str = "folder";

pub async fn handle_upload(
    State(state): State<AppState>,
    jar: CookieJar,
    mut multipart: Multipart,
) -> Result<(CookieJar, Redirect), WebError> {
    let (jar, id) = session_id(jar);
    let session = state.sessions.get(id);
    require_admin(&session)?;

    let mut target_dir = session.current_dir.clone();
    let mut saved = 0usize;
    let mut failed = 0usize;

    while let Some(mut field) = multipart.next_field().await? {
        if field.name() == Some(FOLDER_FIELD) {
            target_dir = PathKey::parse(field.text().await?.trim())?;
            continue;
        }
        // 没选文件时浏览器也会发一个空文件名的字段
        let filename = match field.file_name() {
            Some(f) if !f.is_empty() => f.to_string(),
            _ => continue,
        };

        let (key, file_path) = match state.shelf.upload_target(&target_dir, &filename) {
            Ok(target) => target,
            Err(e) => {
                warn!(dir = %target_dir, filename, error = %e, "upload rejected");
                failed += 1;
                continue;
            }
        };

        // 写入文件，中途失败时删掉半截文件
        let mut file = tokio::fs::File::create(&file_path).await?;
        let mut written = 0u64;
        let result: Result<(), WebError> = async {
            while let Some(chunk) = field.chunk().await? {
                file.write_all(&chunk).await?;
                written += chunk.len() as u64;
            }
            file.flush().await?;
            Ok(())
        }
        .await;

        match result {
            Ok(()) => {
                info!(file = %key, bytes = written, "uploaded");
                saved += 1;
            }
            Err(e) => {
                drop(file);
                let _ = tokio::fs::remove_file(&file_path).await;
                warn!(file = %key, error = %e, "upload interrupted");
                failed += 1;
            }
        }
    }

    let notice = if saved > 0 {
        Notice::new(Tone::Success, Key::SuccessUpload).with_prefix(saved.to_string())
    } else if failed > 0 {
        Notice::new(Tone::Error, Key::ErrorUpload)
    } else {
        return Ok((jar, Redirect::to("/")));
    };
    state.sessions.update(id, Event::Notify(notice));

    // 重定向回首页
    Ok((jar, Redirect::to("/")))
}
