use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::http::{header, HeaderValue};
use axum::routing::{get, post};
use axum::Router;
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use tower::ServiceBuilder;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::set_header::SetResponseHeaderLayer;
use tower_http::trace::TraceLayer;
use uuid::Uuid;

use crate::error::WebError;
use crate::i18n::Lang;
use crate::session::{Session, SessionStore, View};
use crate::shelf::Shelf;
use crate::{download, handlers, upload};

pub const SESSION_COOKIE: &str = "fileshelf_session";

#[derive(Clone)]
pub struct AppState {
    pub shelf: Arc<Shelf>,
    pub sessions: Arc<SessionStore>,
}

impl AppState {
    pub fn new(shelf: Shelf, default_lang: Lang) -> Self {
        Self {
            shelf: Arc::new(shelf),
            sessions: Arc::new(SessionStore::new(default_lang)),
        }
    }

    /// 在阻塞线程池里执行同步的磁盘操作。
    pub async fn blocking<F, R>(&self, f: F) -> Result<R, WebError>
    where
        F: FnOnce(&Shelf) -> R + Send + 'static,
        R: Send + 'static,
    {
        let shelf = self.shelf.clone();
        Ok(tokio::task::spawn_blocking(move || f(&shelf)).await?)
    }
}

/// 从 cookie 取会话 id，没有或无法解析时发一个新的。
pub fn session_id(jar: CookieJar) -> (CookieJar, Uuid) {
    if let Some(id) = jar
        .get(SESSION_COOKIE)
        .and_then(|cookie| Uuid::parse_str(cookie.value()).ok())
    {
        return (jar, id);
    }
    let id = Uuid::new_v4();
    let cookie = Cookie::build((SESSION_COOKIE, id.to_string()))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .build();
    (jar.add(cookie), id)
}

/// 管理操作的入口检查：不在管理视图或未登录一律 403。
pub fn require_admin(session: &Session) -> Result<(), WebError> {
    if session.view == View::Admin && session.admin {
        Ok(())
    } else {
        Err(WebError::Forbidden)
    }
}

pub fn router(state: AppState, upload_limit: usize) -> Router {
    Router::new()
        .route("/", get(handlers::index))
        .route("/search", get(handlers::search))
        .route("/download", get(download::handle_download))
        .route("/assets/{*file}", get(handlers::asset))
        .route("/healthz", get(|| async { "ok" }))
        .route("/nav/open", post(handlers::open_folder))
        .route("/nav/up", post(handlers::go_up))
        .route("/view", post(handlers::switch_view))
        .route("/lang", post(handlers::set_lang))
        .route("/theme", post(handlers::toggle_theme))
        .route("/login", post(handlers::login))
        .route("/logout", post(handlers::logout))
        .route("/admin/folder", post(handlers::create_folder))
        .route("/admin/delete", post(handlers::delete_entry))
        .route("/admin/rename", post(handlers::rename_entry))
        .route("/admin/comment", post(handlers::save_comment))
        .route("/admin/advert", post(handlers::save_advert))
        .route("/admin/credentials", post(handlers::save_credentials))
        .route(
            "/admin/upload",
            post(upload::handle_upload).layer(DefaultBodyLimit::max(upload_limit)),
        )
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CatchPanicLayer::new())
                .layer(SetResponseHeaderLayer::if_not_present(
                    header::CACHE_CONTROL,
                    HeaderValue::from_static("no-store"),
                )),
        )
        .with_state(state)
}
