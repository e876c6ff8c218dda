use html_escape::{encode_double_quoted_attribute as attr, encode_text as text};
use humansize::{format_size, BINARY};
use percent_encoding::{utf8_percent_encode, NON_ALPHANUMERIC};
use time::macros::{format_description, offset};
use time::OffsetDateTime;

use crate::accountant::Ranked;
use crate::i18n::{Key, Lang};
use crate::path::PathKey;
use crate::search::ALL_EXTENSIONS;
use crate::session::{Notice, Tone, View};
use crate::store::Advert;

/// 搜索页扩展名下拉框的候选项，第一个是“全部”。
pub const EXTENSION_CHOICES: &[&str] = &[
    ALL_EXTENSIONS, ".pdf", ".doc", ".docx", ".xls", ".xlsx", ".ppt", ".pptx", ".txt", ".zip", ".rar",
    ".jpg", ".png", ".mp4", ".mp3",
];

#[derive(Debug, Clone)]
pub struct FileRow {
    pub name: String,
    pub key: PathKey,
    pub size: u64,
    pub comment: String,
}

#[derive(Debug, Clone)]
pub struct FolderRow {
    pub name: String,
    pub file_count: usize,
}

#[derive(Debug, Clone, Default)]
pub struct Browse {
    pub dir: PathKey,
    pub folders: Vec<FolderRow>,
    pub files: Vec<FileRow>,
}

#[derive(Debug, Clone)]
pub struct AdminPanel {
    pub browse: Browse,
    pub stats: Vec<(PathKey, u64)>,
    pub advert: Advert,
    pub username: String,
    pub upload_folders: Vec<PathKey>,
}

#[derive(Debug, Clone)]
pub enum Content {
    User { top: Vec<Ranked>, browse: Browse },
    Search {
        query: String,
        ext: String,
        hits: Vec<FileRow>,
    },
    Login,
    Admin(AdminPanel),
}

#[derive(Debug, Clone)]
pub struct Page {
    pub lang: Lang,
    pub dark: bool,
    pub view: View,
    pub notice: Option<Notice>,
    pub advert: Advert,
    pub content: Content,
    pub now: OffsetDateTime,
}

pub fn render(page: &Page) -> String {
    let lang = page.lang;
    let body = match &page.content {
        Content::User { top, browse } => {
            let mut out = search_form(lang, "", ALL_EXTENSIONS);
            out.push_str(&top_downloads(lang, top));
            out.push_str(&user_browse(lang, browse));
            out
        }
        Content::Search { query, ext, hits } => search_results(lang, query, ext, hits),
        Content::Login => login_form(lang),
        Content::Admin(panel) => admin_panel(lang, panel),
    };

    let advert = if page.advert.is_visible() {
        format!(
            r#"<div class="advert"><strong>{}:</strong> {}</div>"#,
            lang.t(Key::AdLabel),
            text(&page.advert.text)
        )
    } else {
        String::new()
    };

    format!(
        r#"<!DOCTYPE html>
<html lang="{lang_code}">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>{title}</title>
    <link rel="stylesheet" href="/assets/style.css">
</head>
<body class="{theme}">
    <div class="container">
        <header>
            <div class="toolbar">
                <form method="post" action="/lang"><button name="lang" value="uz">UZ</button></form>
                <form method="post" action="/lang"><button name="lang" value="ru">RU</button></form>
                <form method="post" action="/theme"><button title="{dark_mode}">&#9788; | &#9790;</button></form>
                {view_switch}
            </div>
            <h1>{title}</h1>
            <div class="clock">&#128339; {clock}</div>
        </header>
        {advert}
        {notice}
        <main>{body}</main>
    </div>
</body>
</html>"#,
        lang_code = lang.code(),
        title = lang.t(Key::Title),
        theme = if page.dark { "dark" } else { "light" },
        dark_mode = lang.t(Key::DarkMode),
        view_switch = view_switch(lang, page.view),
        clock = clock(page.now),
        advert = advert,
        notice = page.notice.as_ref().map(|n| notice(lang, n)).unwrap_or_default(),
        body = body,
    )
}

// 页头时钟，固定显示乌兹别克斯坦时间（UTC+5）
fn clock(now: OffsetDateTime) -> String {
    now.to_offset(offset!(+5))
        .format(format_description!("[hour]:[minute] | [day].[month].[year]"))
        .unwrap_or_default()
}

fn view_switch(lang: Lang, view: View) -> String {
    let (target, label) = match view {
        View::User => ("admin", lang.t(Key::MenuAdmin)),
        View::Admin => ("user", lang.t(Key::MenuUser)),
    };
    format!(
        r#"<form method="post" action="/view"><button name="view" value="{target}">{label}</button></form>"#
    )
}

fn notice(lang: Lang, notice: &Notice) -> String {
    let class = match notice.tone {
        Tone::Success => "success",
        Tone::Warning => "warning",
        Tone::Error => "error",
    };
    let message = match &notice.prefix {
        Some(prefix) => format!("{} {}", prefix, lang.t(notice.key)),
        None => lang.t(notice.key).to_string(),
    };
    format!(r#"<div class="notice {class}">{}</div>"#, text(&message))
}

fn download_href(key: &PathKey) -> String {
    format!(
        "/download?path={}",
        utf8_percent_encode(key.as_str(), NON_ALPHANUMERIC)
    )
}

fn human_size(bytes: u64) -> String {
    format_size(bytes, BINARY)
}

fn search_form(lang: Lang, query: &str, ext: &str) -> String {
    let options: String = EXTENSION_CHOICES
        .iter()
        .map(|choice| {
            let label = if *choice == ALL_EXTENSIONS {
                lang.t(Key::AllTypes)
            } else {
                *choice
            };
            let selected = if choice.eq_ignore_ascii_case(ext) { " selected" } else { "" };
            format!(r#"<option value="{choice}"{selected}>{label}</option>"#)
        })
        .collect();
    format!(
        r#"<form class="search" method="get" action="/search">
            <input type="search" name="q" value="{}" placeholder="{}">
            <select name="ext">{}</select>
            <button>{}</button>
        </form>"#,
        attr(query),
        lang.t(Key::SearchPlaceholder),
        options,
        lang.t(Key::Search),
    )
}

fn top_downloads(lang: Lang, top: &[Ranked]) -> String {
    if top.is_empty() {
        return String::new();
    }
    let rows: String = top
        .iter()
        .map(|r| {
            format!(
                r#"<li><span class="name">{}</span> - {} {} ({}) <a class="button" href="{}">&#11015;</a></li>"#,
                text(r.key.name()),
                r.downloads,
                lang.t(Key::Downloads),
                human_size(r.size),
                attr(&download_href(&r.key)),
            )
        })
        .collect();
    format!(
        r#"<details class="top"><summary>{}</summary><ul>{}</ul></details>"#,
        lang.t(Key::Top5),
        rows
    )
}

// 当前目录路径提示，根目录不显示
fn current_path(lang: Lang, dir: &PathKey) -> String {
    if dir.is_root() {
        return String::new();
    }
    format!(
        r#"<div class="path">
            <form method="post" action="/nav/up"><button>&larr; {}</button></form>
            <span>{}: <code>{}</code></span>
        </div>"#,
        lang.t(Key::Back),
        lang.t(Key::CurrentPath),
        text(dir.as_str())
    )
}

fn folder_button(folder: &FolderRow, show_count: bool) -> String {
    let label = if show_count {
        format!("{} ({})", folder.name, folder.file_count)
    } else {
        folder.name.clone()
    };
    format!(
        r#"<form method="post" action="/nav/open"><button class="entry directory" name="name" value="{}">&#128193; {}</button></form>"#,
        attr(&folder.name),
        text(&label)
    )
}

fn file_entry(lang: Lang, file: &FileRow) -> String {
    let comment = if file.comment.is_empty() {
        String::new()
    } else {
        format!(r#"<div class="comment">{}</div>"#, text(&file.comment))
    };
    format!(
        r#"<li class="file">
            <div class="info"><span class="name">{}</span> <span class="size">{}</span>{}</div>
            <a class="button" href="{}">{}</a>
        </li>"#,
        text(&file.name),
        human_size(file.size),
        comment,
        attr(&download_href(&file.key)),
        lang.t(Key::DownloadBtn),
    )
}

fn user_browse(lang: Lang, browse: &Browse) -> String {
    let mut out = current_path(lang, &browse.dir);
    if browse.folders.is_empty() && browse.files.is_empty() {
        out.push_str(&format!(r#"<p class="empty">{}</p>"#, lang.t(Key::NoFiles)));
        return out;
    }
    out.push_str(r#"<div class="folders">"#);
    for folder in &browse.folders {
        out.push_str(&folder_button(folder, false));
    }
    out.push_str(r#"</div><ul class="files">"#);
    for file in &browse.files {
        out.push_str(&file_entry(lang, file));
    }
    out.push_str("</ul>");
    out
}

fn search_results(lang: Lang, query: &str, ext: &str, hits: &[FileRow]) -> String {
    let mut out = search_form(lang, query, ext);
    out.push_str(&format!(
        r#"<div class="path"><a class="button" href="/">&larr; {}</a></div><h2>{}</h2>"#,
        lang.t(Key::Back),
        text(query)
    ));
    if hits.is_empty() {
        out.push_str(&format!(r#"<p class="empty">{}</p>"#, lang.t(Key::NoFiles)));
        return out;
    }
    out.push_str(r#"<ul class="files">"#);
    for hit in hits {
        out.push_str(&file_entry(lang, hit));
    }
    out.push_str("</ul>");
    out
}

fn login_form(lang: Lang) -> String {
    format!(
        r#"<h2>{header}</h2>
        <form class="panel" method="post" action="/login">
            <label>{user}<input name="username" autocomplete="username"></label>
            <label>{pass}<input type="password" name="password" autocomplete="current-password"></label>
            <button>{login}</button>
        </form>"#,
        header = lang.t(Key::MenuAdmin),
        user = lang.t(Key::LoginUser),
        pass = lang.t(Key::LoginPass),
        login = lang.t(Key::LoginBtn),
    )
}

fn admin_panel(lang: Lang, panel: &AdminPanel) -> String {
    let mut out = format!(
        r#"<h2>{}</h2>
        <div class="notice success">{}</div>
        <form method="post" action="/logout"><button>{}</button></form>"#,
        lang.t(Key::MenuAdmin),
        lang.t(Key::Welcome),
        lang.t(Key::LogoutBtn),
    );
    out.push_str(&current_path(lang, &panel.browse.dir));
    out.push_str(&stats_table(lang, &panel.stats));
    out.push_str(&advert_form(lang, &panel.advert));
    out.push_str(&credentials_form(lang, &panel.username));
    out.push_str(&upload_form(lang, &panel.browse.dir, &panel.upload_folders));
    out.push_str(&admin_entries(lang, &panel.browse));
    out
}

fn stats_table(lang: Lang, stats: &[(PathKey, u64)]) -> String {
    let body = if stats.is_empty() {
        format!(r#"<p class="empty">{}</p>"#, lang.t(Key::NoFiles))
    } else {
        let rows: String = stats
            .iter()
            .map(|(key, count)| format!("<tr><td>{}</td><td>{}</td></tr>", text(key.as_str()), count))
            .collect();
        format!(
            "<table><thead><tr><th>{}</th><th>{}</th></tr></thead><tbody>{}</tbody></table>",
            lang.t(Key::StatFile),
            lang.t(Key::StatCount),
            rows
        )
    };
    format!(r#"<section><h3>{}</h3>{}</section>"#, lang.t(Key::AdminStats), body)
}

fn advert_form(lang: Lang, advert: &Advert) -> String {
    format!(
        r#"<section><h3>{title}</h3>
        <form class="panel" method="post" action="/admin/advert">
            <label>{label}<textarea name="text">{text}</textarea></label>
            <label class="inline"><input type="checkbox" name="active" value="on"{checked}> {active}</label>
            <label>{hours}<input type="number" name="hours" min="0" value="0" title="{help}"></label>
            <small>{help}</small>
            <button>{save}</button>
        </form></section>"#,
        title = lang.t(Key::AdSettings),
        label = lang.t(Key::AdText),
        text = text(&advert.text),
        checked = if advert.active { " checked" } else { "" },
        active = lang.t(Key::AdActive),
        hours = lang.t(Key::AdHours),
        help = lang.t(Key::AdHoursHelp),
        save = lang.t(Key::AdSave),
    )
}

fn credentials_form(lang: Lang, username: &str) -> String {
    format!(
        r#"<section><h3>{settings}</h3>
        <details><summary>{change}</summary>
        <form class="panel" method="post" action="/admin/credentials">
            <label>{user}<input name="username" value="{username}"></label>
            <label>{pass}<input type="password" name="password"></label>
            <button>{save}</button>
        </form></details></section>"#,
        settings = lang.t(Key::Settings),
        change = lang.t(Key::ChangePass),
        user = lang.t(Key::LoginUser),
        username = attr(username),
        pass = lang.t(Key::NewPass),
        save = lang.t(Key::SavePass),
    )
}

fn upload_form(lang: Lang, current: &PathKey, folders: &[PathKey]) -> String {
    let options: String = folders
        .iter()
        .map(|folder| {
            let label = if folder.is_root() {
                lang.t(Key::RootFolder).to_string()
            } else {
                folder.as_str().to_string()
            };
            let selected = if folder == current { " selected" } else { "" };
            format!(
                r#"<option value="{}"{}>{}</option>"#,
                attr(folder.as_str()),
                selected,
                text(&label)
            )
        })
        .collect();
    format!(
        r#"<section><h3>{title}</h3>
        <form class="panel" method="post" action="/admin/upload" enctype="multipart/form-data">
            <label>{select}<select name="folder">{options}</select></label>
            <label>{label}<input type="file" name="files" multiple></label>
            <button>{upload}</button>
        </form></section>"#,
        title = lang.t(Key::UploadHeader),
        select = lang.t(Key::SelectFolder),
        options = options,
        label = lang.t(Key::UploadLabel),
        upload = lang.t(Key::UploadBtn),
    )
}

fn rename_form(lang: Lang, name: &str) -> String {
    format!(
        r#"<details><summary>{rename}</summary>
        <form method="post" action="/admin/rename">
            <input type="hidden" name="name" value="{name}">
            <label>{new_name}<input name="new_name" value="{name}"></label>
            <button>{save}</button>
        </form></details>"#,
        rename = lang.t(Key::Rename),
        name = attr(name),
        new_name = lang.t(Key::NewName),
        save = lang.t(Key::Save),
    )
}

fn delete_form(lang: Lang, name: &str) -> String {
    format!(
        r#"<form method="post" action="/admin/delete"><input type="hidden" name="name" value="{}"><button class="danger">{}</button></form>"#,
        attr(name),
        lang.t(Key::DeleteBtn)
    )
}

fn comment_form(lang: Lang, file: &FileRow) -> String {
    format!(
        r#"<details><summary>{comment}</summary>
        <form method="post" action="/admin/comment">
            <input type="hidden" name="name" value="{name}">
            <input name="text" value="{current}" placeholder="{placeholder}">
            <button>{save}</button>
        </form>
        <form method="post" action="/admin/comment">
            <input type="hidden" name="name" value="{name}">
            <input type="hidden" name="text" value="">
            <button class="danger">{delete}</button>
        </form></details>"#,
        comment = lang.t(Key::Comment),
        name = attr(&file.name),
        current = attr(&file.comment),
        placeholder = lang.t(Key::WriteComment),
        save = lang.t(Key::Save),
        delete = lang.t(Key::DeleteBtn),
    )
}

fn admin_entries(lang: Lang, browse: &Browse) -> String {
    let mut out = format!(
        r#"<section><h3>{}</h3>
        <details><summary>{}</summary>
        <form method="post" action="/admin/folder">
            <label>{}<input name="name"></label>
            <button>{}</button>
        </form></details>"#,
        lang.t(Key::FilesList),
        lang.t(Key::CreateFolder),
        lang.t(Key::FolderName),
        lang.t(Key::Create),
    );
    if browse.folders.is_empty() && browse.files.is_empty() {
        out.push_str(&format!(r#"<p class="empty warning">{}</p>"#, lang.t(Key::NoFiles)));
    }
    out.push_str(r#"<ul class="entries">"#);
    for folder in &browse.folders {
        out.push_str(&format!(
            r#"<li class="directory">{}<div class="actions">{}{}</div></li>"#,
            folder_button(folder, true),
            rename_form(lang, &folder.name),
            delete_form(lang, &folder.name),
        ));
    }
    for file in &browse.files {
        let comment = if file.comment.is_empty() {
            String::new()
        } else {
            format!(r#"<div class="comment">{}</div>"#, text(&file.comment))
        };
        out.push_str(&format!(
            r#"<li class="file"><div class="info"><span class="name">&#128196; {}</span> <span class="size">{}</span>{}{}</div><div class="actions">{}{}</div></li>"#,
            text(&file.name),
            human_size(file.size),
            comment,
            comment_form(lang, file),
            rename_form(lang, &file.name),
            delete_form(lang, &file.name),
        ));
    }
    out.push_str("</ul></section>");
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page(content: Content) -> Page {
        Page {
            lang: Lang::Uz,
            dark: false,
            view: View::User,
            notice: None,
            advert: Advert::default(),
            content,
            now: time::macros::datetime!(2024-05-01 12:30 UTC),
        }
    }

    #[test]
    fn escapes_file_names_and_comments() {
        let html = render(&page(Content::User {
            top: Vec::new(),
            browse: Browse {
                dir: PathKey::root(),
                folders: Vec::new(),
                files: vec![FileRow {
                    name: "<script>.txt".into(),
                    key: PathKey::parse("<script>.txt").unwrap(),
                    size: 10,
                    comment: "a & b".into(),
                }],
            },
        }));
        assert!(!html.contains("<script>.txt"));
        assert!(html.contains("&lt;script&gt;.txt"));
        assert!(html.contains("a &amp; b"));
        assert!(html.contains("/download?path=%3Cscript%3E%2Etxt"));
    }

    #[test]
    fn header_clock_uses_tashkent_time() {
        let html = render(&page(Content::Login));
        assert!(html.contains("17:30 | 01.05.2024"));

        let mut late = page(Content::Login);
        late.now = time::macros::datetime!(2024-12-31 21:05 UTC);
        assert!(render(&late).contains("02:05 | 01.01.2025"));
    }

    #[test]
    fn advert_banner_only_when_visible() {
        let mut p = page(Content::Login);
        p.advert = Advert {
            text: "Imtihon jadvali".into(),
            active: true,
            expires_at: None,
        };
        assert!(render(&p).contains("Imtihon jadvali"));
        p.advert.active = false;
        assert!(!render(&p).contains("Imtihon jadvali"));
    }

    #[test]
    fn renders_in_selected_language() {
        let mut p = page(Content::Login);
        p.lang = Lang::Ru;
        let html = render(&p);
        assert!(html.contains("Войти"));
        assert!(html.contains(r#"lang="ru""#));
    }
}
