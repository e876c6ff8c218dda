//! 页面与表单处理。每个 POST 动作读出会话、执行操作、写回会话，然后 303 回首页。

use axum::body::Body;
use axum::extract::{Path, Query, State};
use axum::http::{header, StatusCode};
use axum::response::{Html, IntoResponse, Redirect, Response};
use axum::Form;
use axum_extra::extract::cookie::CookieJar;
use rust_embed::RustEmbed;
use serde::Deserialize;
use time::OffsetDateTime;
use tracing::{info, warn};

use crate::app::{require_admin, session_id, AppState};
use crate::error::WebError;
use crate::html::{self, AdminPanel, Browse, Content, FileRow, FolderRow, Page};
use crate::i18n::{Key, Lang};
use crate::navigator;
use crate::path::PathKey;
use crate::search::ALL_EXTENSIONS;
use crate::session::{self, Event, Notice, Session, Tone, View};
use crate::shelf::Shelf;

const USER_TOP: usize = 5;
const ADMIN_TOP: usize = 10;

#[derive(RustEmbed)]
#[folder = "assets/"]
struct Assets;

fn browse(shelf: &Shelf, dir: &PathKey, with_counts: bool) -> Browse {
    let listing = shelf.list(dir);
    let folders = listing
        .folders
        .into_iter()
        .map(|name| {
            let file_count = match (with_counts, dir.child(&name)) {
                (true, Some(key)) => navigator::count_files(shelf.root(), &key),
                _ => 0,
            };
            FolderRow { name, file_count }
        })
        .collect();
    let files = listing
        .files
        .into_iter()
        .filter_map(|name| {
            let key = dir.child(&name)?;
            Some(file_row(shelf, name, key))
        })
        .collect();
    Browse {
        dir: dir.clone(),
        folders,
        files,
    }
}

fn file_row(shelf: &Shelf, name: String, key: PathKey) -> FileRow {
    FileRow {
        size: navigator::file_size(shelf.root(), &key),
        comment: shelf.comment(&key),
        name,
        key,
    }
}

/// 根据会话状态收集整页所需的数据。
fn build_page(shelf: &Shelf, session: Session, notice: Option<Notice>) -> Page {
    let advert = shelf.registry().advert.load();
    let content = match (session.view, session.admin) {
        (View::User, _) => Content::User {
            top: shelf.top_downloads(USER_TOP),
            browse: browse(shelf, &session.current_dir, false),
        },
        (View::Admin, false) => Content::Login,
        (View::Admin, true) => Content::Admin(AdminPanel {
            browse: browse(shelf, &session.current_dir, true),
            stats: shelf.registry().stats.top_n(ADMIN_TOP),
            advert: advert.clone(),
            username: shelf.registry().credentials.load().username,
            upload_folders: navigator::all_folders(shelf.root()),
        }),
    };
    Page {
        lang: session.lang,
        dark: session.dark,
        view: session.view,
        notice,
        advert,
        content,
        now: OffsetDateTime::now_utc(),
    }
}

/// 取出会话里的一次性提示并写回。
fn take_session(state: &AppState, jar: CookieJar) -> (CookieJar, Session, Option<Notice>) {
    let (jar, id) = session_id(jar);
    let (session, notice) = state.sessions.modify(id, |session| {
        let notice = session.take_notice();
        (session.clone(), notice)
    });
    (jar, session, notice)
}

pub async fn index(State(state): State<AppState>, jar: CookieJar) -> Result<(CookieJar, Html<String>), WebError> {
    let (jar, session, notice) = take_session(&state, jar);
    let page = state
        .blocking(move |shelf| build_page(shelf, session, notice))
        .await?;
    Ok((jar, Html(html::render(&page))))
}

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    pub q: String,
    #[serde(default)]
    pub ext: Option<String>,
}

pub async fn search(
    State(state): State<AppState>,
    jar: CookieJar,
    Query(query): Query<SearchQuery>,
) -> Result<Response, WebError> {
    let (jar, session, notice) = take_session(&state, jar);
    let term = query.q.trim().to_string();
    if term.is_empty() {
        return Ok((jar, Redirect::to("/")).into_response());
    }
    let ext = query.ext.unwrap_or_else(|| ALL_EXTENSIONS.to_string());
    let page = state
        .blocking(move |shelf| {
            let mut page = build_page(shelf, session, notice);
            let hits = shelf
                .search(&term, Some(ext.as_str()))
                .into_iter()
                .map(|hit| file_row(shelf, hit.name, hit.key))
                .collect();
            page.content = Content::Search {
                query: term,
                ext,
                hits,
            };
            page
        })
        .await?;
    Ok((jar, Html(html::render(&page))).into_response())
}

pub async fn asset(Path(file): Path<String>) -> Response {
    match Assets::get(&file) {
        Some(content) => {
            let mime = mime_guess::from_path(&file).first_or_octet_stream();
            (
                [
                    (header::CONTENT_TYPE, mime.as_ref().to_string()),
                    (header::CACHE_CONTROL, "public, max-age=3600".to_string()),
                ],
                Body::from(content.data.into_owned()),
            )
                .into_response()
        }
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

fn back_home(jar: CookieJar) -> (CookieJar, Redirect) {
    (jar, Redirect::to("/"))
}

#[derive(Debug, Deserialize)]
pub struct NameForm {
    pub name: String,
}

pub async fn open_folder(
    State(state): State<AppState>,
    jar: CookieJar,
    Form(form): Form<NameForm>,
) -> (CookieJar, Redirect) {
    let (jar, id) = session_id(jar);
    state.sessions.update(id, Event::Descend(form.name));
    back_home(jar)
}

pub async fn go_up(State(state): State<AppState>, jar: CookieJar) -> (CookieJar, Redirect) {
    let (jar, id) = session_id(jar);
    state.sessions.update(id, Event::Ascend);
    back_home(jar)
}

#[derive(Debug, Deserialize)]
pub struct ViewForm {
    pub view: View,
}

pub async fn switch_view(
    State(state): State<AppState>,
    jar: CookieJar,
    Form(form): Form<ViewForm>,
) -> (CookieJar, Redirect) {
    let (jar, id) = session_id(jar);
    state.sessions.update(id, Event::SwitchView(form.view));
    back_home(jar)
}

#[derive(Debug, Deserialize)]
pub struct LangForm {
    pub lang: Lang,
}

pub async fn set_lang(
    State(state): State<AppState>,
    jar: CookieJar,
    Form(form): Form<LangForm>,
) -> (CookieJar, Redirect) {
    let (jar, id) = session_id(jar);
    state.sessions.update(id, Event::SetLang(form.lang));
    back_home(jar)
}

pub async fn toggle_theme(State(state): State<AppState>, jar: CookieJar) -> (CookieJar, Redirect) {
    let (jar, id) = session_id(jar);
    state.sessions.update(id, Event::ToggleTheme);
    back_home(jar)
}

#[derive(Debug, Deserialize)]
pub struct LoginForm {
    pub username: String,
    pub password: String,
}

pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    Form(form): Form<LoginForm>,
) -> Result<(CookieJar, Redirect), WebError> {
    let (jar, id) = session_id(jar);
    let stored = state.blocking(|shelf| shelf.registry().credentials.load()).await?;
    state.sessions.modify(id, |current| {
        let (next, _) = session::login(std::mem::take(current), &stored, &form.username, &form.password);
        *current = next;
    });
    Ok(back_home(jar))
}

pub async fn logout(State(state): State<AppState>, jar: CookieJar) -> (CookieJar, Redirect) {
    let (jar, id) = session_id(jar);
    state.sessions.update(id, Event::Logout);
    back_home(jar)
}

/// 管理动作的公共流程：检查登录、在阻塞线程里执行、把结果变成提示写回会话。
async fn admin_action<F>(state: &AppState, jar: CookieJar, action: F) -> Result<(CookieJar, Redirect), WebError>
where
    F: FnOnce(&Shelf, &PathKey) -> Option<Notice> + Send + 'static,
{
    let (jar, id) = session_id(jar);
    let session = state.sessions.get(id);
    require_admin(&session)?;
    let dir = session.current_dir.clone();
    if let Some(notice) = state.blocking(move |shelf| action(shelf, &dir)).await? {
        state.sessions.update(id, Event::Notify(notice));
    }
    Ok(back_home(jar))
}

fn failure_notice(ok: bool) -> Option<Notice> {
    (!ok).then(|| Notice::new(Tone::Error, Key::ActionFailed))
}

pub async fn create_folder(
    State(state): State<AppState>,
    jar: CookieJar,
    Form(form): Form<NameForm>,
) -> Result<(CookieJar, Redirect), WebError> {
    admin_action(&state, jar, move |shelf, dir| {
        if form.name.trim().is_empty() {
            return None;
        }
        if shelf.create_folder(dir, &form.name) {
            Some(Notice::new(Tone::Success, Key::SuccessUpload).with_prefix(form.name.trim()))
        } else {
            Some(Notice::new(Tone::Error, Key::ErrorUpload))
        }
    })
    .await
}

pub async fn delete_entry(
    State(state): State<AppState>,
    jar: CookieJar,
    Form(form): Form<NameForm>,
) -> Result<(CookieJar, Redirect), WebError> {
    admin_action(&state, jar, move |shelf, dir| failure_notice(shelf.delete(dir, &form.name))).await
}

#[derive(Debug, Deserialize)]
pub struct RenameForm {
    pub name: String,
    pub new_name: String,
}

pub async fn rename_entry(
    State(state): State<AppState>,
    jar: CookieJar,
    Form(form): Form<RenameForm>,
) -> Result<(CookieJar, Redirect), WebError> {
    admin_action(&state, jar, move |shelf, dir| {
        failure_notice(shelf.rename(dir, &form.name, &form.new_name))
    })
    .await
}

#[derive(Debug, Deserialize)]
pub struct CommentForm {
    pub name: String,
    #[serde(default)]
    pub text: String,
}

pub async fn save_comment(
    State(state): State<AppState>,
    jar: CookieJar,
    Form(form): Form<CommentForm>,
) -> Result<(CookieJar, Redirect), WebError> {
    admin_action(&state, jar, move |shelf, dir| {
        let ok = match dir.child(&form.name) {
            Some(key) => shelf.set_comment(&key, form.text.trim()),
            None => false,
        };
        failure_notice(ok)
    })
    .await
}

#[derive(Debug, Deserialize)]
pub struct AdvertForm {
    #[serde(default)]
    pub text: String,
    /// 复选框未勾选时浏览器不发送该字段
    #[serde(default)]
    pub active: Option<String>,
    #[serde(default)]
    pub hours: u32,
}

pub async fn save_advert(
    State(state): State<AppState>,
    jar: CookieJar,
    Form(form): Form<AdvertForm>,
) -> Result<(CookieJar, Redirect), WebError> {
    admin_action(&state, jar, move |shelf, _| {
        let active = form.active.is_some();
        match shelf.registry().advert.save(&form.text, active, form.hours) {
            Ok(advert) => {
                info!(active, expires_at = ?advert.expires_at, "advert updated");
                Some(Notice::new(Tone::Success, Key::SuccessAd))
            }
            Err(e) => {
                warn!(error = %e, "failed to save advert");
                Some(Notice::new(Tone::Error, Key::ErrorUpload))
            }
        }
    })
    .await
}

#[derive(Debug, Deserialize)]
pub struct CredentialsForm {
    pub username: String,
    pub password: String,
}

pub async fn save_credentials(
    State(state): State<AppState>,
    jar: CookieJar,
    Form(form): Form<CredentialsForm>,
) -> Result<(CookieJar, Redirect), WebError> {
    admin_action(&state, jar, move |shelf, _| {
        if form.username.is_empty() || form.password.is_empty() {
            return Some(Notice::new(Tone::Warning, Key::PassEmptyWarning));
        }
        match shelf.registry().credentials.save(&form.username, &form.password) {
            Ok(()) => {
                info!(username = %form.username, "admin credentials changed");
                Some(Notice::new(Tone::Success, Key::SuccessPass))
            }
            Err(e) => {
                warn!(error = %e, "failed to save credentials");
                Some(Notice::new(Tone::Error, Key::ErrorUpload))
            }
        }
    })
    .await
}
