use std::fs;
use std::io::Write;
use std::sync::Arc;

use anyhow::Result;
use axum::body::{to_bytes, Body};
use axum::http::{header, Request, StatusCode};
use axum::response::Response;
use axum::Router;
use tempfile::{tempdir, TempDir};
use tower::ServiceExt;

use fileshelf::i18n::Lang;
use fileshelf::session::SessionStore;
use fileshelf::{router, AppState, PathKey, Shelf};

const LIMIT: usize = 16 * 1024 * 1024;

struct Harness {
    _dir: TempDir,
    shelf: Arc<Shelf>,
    sessions: Arc<SessionStore>,
    app: Router,
}

fn harness() -> Result<Harness> {
    let dir = tempdir()?;
    let root = dir.path().join("uploads");
    fs::create_dir_all(root.join("docs"))?;
    fs::write(root.join("hello.txt"), b"Hello, fileshelf!")?;
    fs::write(root.join("docs/report1.pdf"), b"%PDF-1.4 one")?;
    fs::write(root.join("docs/report2.txt"), b"two")?;
    fs::write(root.join("Report3.PDF"), b"%PDF-1.4 three")?;

    let shelf = Shelf::open(&root, &dir.path().join("data"))?;
    let state = AppState::new(shelf, Lang::Uz);
    let shelf = state.shelf.clone();
    let sessions = state.sessions.clone();
    Ok(Harness {
        _dir: dir,
        shelf,
        sessions,
        app: router(state, LIMIT),
    })
}

impl Harness {
    async fn send(&self, request: Request<Body>) -> Result<Response> {
        Ok(self.app.clone().oneshot(request).await?)
    }

    /// 打开首页拿到会话 cookie（`name=value` 部分）。
    async fn session(&self) -> Result<String> {
        let response = self.send(Request::get("/").body(Body::empty())?).await?;
        let cookie = response
            .headers()
            .get(header::SET_COOKIE)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(';').next())
            .map(str::to_string)
            .ok_or_else(|| anyhow::anyhow!("no session cookie"))?;
        Ok(cookie)
    }

    async fn post_form(&self, cookie: Option<&str>, uri: &str, form: &str) -> Result<Response> {
        let mut builder = Request::post(uri).header(header::CONTENT_TYPE, "application/x-www-form-urlencoded");
        if let Some(cookie) = cookie {
            builder = builder.header(header::COOKIE, cookie);
        }
        self.send(builder.body(Body::from(form.to_string()))?).await
    }

    async fn admin_session(&self) -> Result<String> {
        let cookie = self.session().await?;
        self.post_form(Some(&cookie), "/view", "view=admin").await?;
        let response = self
            .post_form(Some(&cookie), "/login", "username=admin&password=admin123")
            .await?;
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        Ok(cookie)
    }

    async fn page(&self, cookie: &str, uri: &str) -> Result<String> {
        let response = self
            .send(Request::get(uri).header(header::COOKIE, cookie).body(Body::empty())?)
            .await?;
        assert_eq!(response.status(), StatusCode::OK);
        body_text(response).await
    }
}

async fn body_text(response: Response) -> Result<String> {
    let bytes = to_bytes(response.into_body(), usize::MAX).await?;
    Ok(String::from_utf8(bytes.to_vec())?)
}

#[tokio::test]
async fn index_sets_cookie_and_lists_root() -> Result<()> {
    let h = harness()?;
    let response = h.send(Request::get("/").body(Body::empty())?).await?;
    assert_eq!(response.status(), StatusCode::OK);
    let cookie = response
        .headers()
        .get(header::SET_COOKIE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();
    assert!(cookie.starts_with("fileshelf_session="));

    let body = body_text(response).await?;
    assert!(body.contains("hello.txt"));
    assert!(body.contains("Report3.PDF"));
    assert!(body.contains(r#"value="docs""#));
    assert!(!body.contains("report1.pdf"));
    Ok(())
}

#[tokio::test]
async fn navigation_is_per_session() -> Result<()> {
    let h = harness()?;
    let cookie = h.session().await?;
    let response = h.post_form(Some(&cookie), "/nav/open", "name=docs").await?;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(response.headers().get(header::LOCATION).unwrap(), "/");

    let body = h.page(&cookie, "/").await?;
    assert!(body.contains("report1.pdf"));
    assert!(!body.contains("hello.txt"));

    // 另一个会话仍停在根目录
    let other = h.session().await?;
    let body = h.page(&other, "/").await?;
    assert!(body.contains("hello.txt"));

    h.post_form(Some(&cookie), "/nav/up", "").await?;
    let body = h.page(&cookie, "/").await?;
    assert!(body.contains("hello.txt"));
    Ok(())
}

#[tokio::test]
async fn admin_routes_require_login() -> Result<()> {
    let h = harness()?;
    let response = h.post_form(None, "/admin/folder", "name=secret").await?;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let cookie = h.session().await?;
    h.post_form(Some(&cookie), "/view", "view=admin").await?;
    h.post_form(Some(&cookie), "/login", "username=admin&password=wrong")
        .await?;
    let response = h.post_form(Some(&cookie), "/admin/delete", "name=hello.txt").await?;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    assert!(!h.shelf.root().join("secret").exists());
    assert!(h.shelf.root().join("hello.txt").exists());
    Ok(())
}

#[tokio::test]
async fn admin_manages_files_and_metadata() -> Result<()> {
    let h = harness()?;
    let cookie = h.admin_session().await?;

    let response = h.post_form(Some(&cookie), "/admin/folder", "name=reports").await?;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert!(h.shelf.root().join("reports").is_dir());

    h.post_form(Some(&cookie), "/admin/comment", "name=hello.txt&text=Salom")
        .await?;
    let hello = PathKey::parse("hello.txt")?;
    assert_eq!(h.shelf.comment(&hello), "Salom");

    h.post_form(Some(&cookie), "/admin/rename", "name=hello.txt&new_name=hi.txt")
        .await?;
    let hi = PathKey::parse("hi.txt")?;
    assert!(h.shelf.root().join("hi.txt").is_file());
    assert_eq!(h.shelf.comment(&hi), "Salom");
    assert_eq!(h.shelf.comment(&hello), "");

    h.post_form(Some(&cookie), "/admin/delete", "name=hi.txt").await?;
    assert!(!h.shelf.root().join("hi.txt").exists());
    assert_eq!(h.shelf.comment(&hi), "");

    // 切回用户视图即退出登录
    h.post_form(Some(&cookie), "/view", "view=user").await?;
    let response = h.post_form(Some(&cookie), "/admin/folder", "name=again").await?;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    Ok(())
}

#[tokio::test]
async fn advert_is_shown_to_users() -> Result<()> {
    let h = harness()?;
    let cookie = h.admin_session().await?;
    h.post_form(Some(&cookie), "/admin/advert", "text=Yangi+fayllar&active=on&hours=0")
        .await?;

    let visitor = h.session().await?;
    let body = h.page(&visitor, "/").await?;
    assert!(body.contains("Yangi fayllar"));

    h.post_form(Some(&cookie), "/admin/advert", "text=Yangi+fayllar&hours=0")
        .await?;
    let body = h.page(&visitor, "/").await?;
    assert!(!body.contains("Yangi fayllar"));
    Ok(())
}

#[tokio::test]
async fn empty_credentials_are_not_saved() -> Result<()> {
    let h = harness()?;
    let cookie = h.admin_session().await?;
    h.post_form(Some(&cookie), "/admin/credentials", "username=&password=")
        .await?;
    let stored = h.shelf.registry().credentials.load();
    assert_eq!(stored.username, "admin");

    h.post_form(Some(&cookie), "/admin/credentials", "username=boss&password=s3cret")
        .await?;
    let stored = h.shelf.registry().credentials.load();
    assert!(stored.matches("boss", "s3cret"));
    Ok(())
}

#[tokio::test]
async fn search_filters_by_extension() -> Result<()> {
    let h = harness()?;
    let cookie = h.session().await?;
    let body = h.page(&cookie, "/search?q=REPORT&ext=.pdf").await?;
    assert!(body.contains("report1.pdf"));
    assert!(body.contains("Report3.PDF"));
    assert!(!body.contains("report2.txt"));

    let response = h
        .send(Request::get("/search?q=+").header(header::COOKIE, &cookie).body(Body::empty())?)
        .await?;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    Ok(())
}

#[tokio::test]
async fn download_counts_fresh_requests_only() -> Result<()> {
    let h = harness()?;
    let key = PathKey::parse("docs/report1.pdf")?;

    let response = h
        .send(Request::get("/download?path=docs%2Freport1.pdf").body(Body::empty())?)
        .await?;
    assert_eq!(response.status(), StatusCode::OK);
    let disposition = response.headers().get(header::CONTENT_DISPOSITION).unwrap();
    assert!(disposition.to_str()?.contains("report1.pdf"));
    assert_eq!(body_text(response).await?, "%PDF-1.4 one");
    assert_eq!(h.shelf.registry().stats.get(&key), 1);

    let response = h
        .send(
            Request::get("/download?path=docs/report1.pdf")
                .header(header::RANGE, "bytes=5-")
                .body(Body::empty())?,
        )
        .await?;
    assert_eq!(response.status(), StatusCode::PARTIAL_CONTENT);
    assert_eq!(body_text(response).await?, "1.4 one");
    assert_eq!(h.shelf.registry().stats.get(&key), 1);

    let top = h.shelf.top_downloads(5);
    assert_eq!(top.len(), 1);
    assert_eq!(top[0].key, key);
    Ok(())
}

#[tokio::test]
async fn download_rejects_escapes_and_folders() -> Result<()> {
    let h = harness()?;
    let response = h
        .send(Request::get("/download?path=..%2F..%2Fetc%2Fpasswd").body(Body::empty())?)
        .await?;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = h
        .send(Request::get("/download?path=docs").body(Body::empty())?)
        .await?;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = h
        .send(Request::get("/download?path=missing.txt").body(Body::empty())?)
        .await?;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    Ok(())
}

fn multipart_request(cookie: &str, folder: &str, files: &[(&str, &[u8])]) -> Result<Request<Body>> {
    let boundary = "------------------------test_boundary";
    let mut content = Vec::new();
    write!(
        content,
        "--{boundary}\r\nContent-Disposition: form-data; name=\"folder\"\r\n\r\n{folder}\r\n"
    )?;
    for (filename, data) in files {
        write!(
            content,
            "--{boundary}\r\nContent-Disposition: form-data; name=\"files\"; filename=\"{filename}\"\r\nContent-Type: application/octet-stream\r\n\r\n"
        )?;
        content.extend_from_slice(data);
        content.extend_from_slice(b"\r\n");
    }
    write!(content, "--{boundary}--\r\n")?;

    Ok(Request::post("/admin/upload")
        .header(header::CONTENT_TYPE, format!("multipart/form-data; boundary={boundary}"))
        .header(header::COOKIE, cookie)
        .body(Body::from(content))?)
}

#[tokio::test]
async fn upload_writes_into_chosen_folder() -> Result<()> {
    let h = harness()?;
    let cookie = h.admin_session().await?;

    let request = multipart_request(
        &cookie,
        "docs",
        &[("notes.txt", b"first"), ("../evil.txt", b"second")],
    )?;
    let response = h.send(request).await?;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);

    let docs = h.shelf.root().join("docs");
    assert_eq!(fs::read(docs.join("notes.txt"))?, b"first");
    assert!(!h.shelf.root().parent().unwrap().join("evil.txt").exists());

    let body = h.page(&cookie, "/").await?;
    assert!(body.contains("2 saqlandi!"));
    Ok(())
}

#[tokio::test]
async fn upload_requires_login() -> Result<()> {
    let h = harness()?;
    let cookie = h.session().await?;
    let request = multipart_request(&cookie, "", &[("notes.txt", b"first")])?;
    let response = h.send(request).await?;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert!(!h.shelf.root().join("notes.txt").exists());
    Ok(())
}

#[tokio::test]
async fn serves_embedded_stylesheet() -> Result<()> {
    let h = harness()?;
    let response = h
        .send(Request::get("/assets/style.css").body(Body::empty())?)
        .await?;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers().get(header::CONTENT_TYPE).unwrap(), "text/css");

    let response = h
        .send(Request::get("/assets/missing.js").body(Body::empty())?)
        .await?;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    Ok(())
}

#[tokio::test]
async fn end_to_end_download_over_tcp() -> Result<()> {
    let h = harness()?;
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    let app = h.app.clone();
    let server = tokio::spawn(async move { axum::serve(listener, app).await });

    let response = reqwest::get(format!("http://{addr}/download?path=hello.txt")).await?;
    assert_eq!(response.status(), reqwest::StatusCode::OK);
    assert_eq!(response.text().await?, "Hello, fileshelf!");
    assert_eq!(h.shelf.registry().stats.get(&PathKey::parse("hello.txt")?), 1);

    let health = reqwest::get(format!("http://{addr}/healthz")).await?;
    assert_eq!(health.text().await?, "ok");

    server.abort();
    Ok(())
}

#[tokio::test]
async fn anonymous_visits_leave_no_sessions() -> Result<()> {
    let h = harness()?;
    for _ in 0..50 {
        let response = h.send(Request::get("/").body(Body::empty())?).await?;
        assert_eq!(response.status(), StatusCode::OK);
    }
    let forged = "fileshelf_session=6f1c2b9e-3a4d-4e5f-8a7b-0c1d2e3f4a5b";
    h.page(forged, "/search?q=report").await?;
    assert!(h.sessions.is_empty());

    let cookie = h.session().await?;
    h.post_form(Some(&cookie), "/theme", "").await?;
    assert_eq!(h.sessions.len(), 1);
    Ok(())
}

#[tokio::test]
async fn login_from_user_view_opens_admin_panel() -> Result<()> {
    let h = harness()?;
    let cookie = h.session().await?;
    h.post_form(Some(&cookie), "/login", "username=admin&password=admin123")
        .await?;
    let body = h.page(&cookie, "/").await?;
    assert!(body.contains(r#"action="/logout""#));

    let response = h.post_form(Some(&cookie), "/admin/folder", "name=reports").await?;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert!(h.shelf.root().join("reports").is_dir());
    Ok(())
}

#[tokio::test]
async fn head_request_does_not_count_download() -> Result<()> {
    let h = harness()?;
    let response = h
        .send(
            Request::head("/download?path=hello.txt")
                .body(Body::empty())?,
        )
        .await?;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(h.shelf.registry().stats.get(&PathKey::parse("hello.txt")?), 0);
    Ok(())
}

#[tokio::test]
async fn absurd_advert_lifetime_fails_soft() -> Result<()> {
    let h = harness()?;
    let cookie = h.admin_session().await?;
    let response = h
        .post_form(Some(&cookie), "/admin/advert", "text=Forever&active=on&hours=4000000000")
        .await?;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert!(!h.shelf.registry().advert.load().is_visible());

    let body = h.page(&cookie, "/").await?;
    assert!(body.contains("notice error"));
    Ok(())
}
