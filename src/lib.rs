//! 共享文件夹网站：浏览、搜索、下载计数，以及带登录的管理面板。
//!
//! 磁盘上的目录树是唯一的事实来源；评论、下载统计、公告、管理员凭据是
//! 以相对路径为键的四个 JSON 文件，由 [`mutation`] 里的操作保持与目录树一致。

pub mod accountant;
pub mod app;
pub mod config;
pub mod download;
pub mod error;
pub mod handlers;
pub mod html;
pub mod i18n;
pub mod mutation;
pub mod navigator;
pub mod path;
pub mod search;
pub mod session;
pub mod shelf;
pub mod store;
pub mod upload;

pub use app::{router, AppState};
pub use config::{Cli, Config};
pub use path::PathKey;
pub use shelf::Shelf;
