//! 每个浏览器会话的界面状态，以及管理员登录闸门。
//!
//! 状态只存在内存里，重启即丢失。所有变化都经过 `Session::apply`，
//! 处理函数拿到旧状态、产出新状态再放回 `SessionStore`。

use std::collections::HashMap;

use parking_lot::Mutex;
use serde::Deserialize;
use tracing::info;
use uuid::Uuid;

use crate::i18n::{Key, Lang};
use crate::navigator;
use crate::path::PathKey;
use crate::store::Credentials;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum View {
    #[default]
    User,
    Admin,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tone {
    Success,
    Warning,
    Error,
}

/// 下一次渲染页面时显示一次的提示。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub tone: Tone,
    pub key: Key,
    pub prefix: Option<String>,
}

impl Notice {
    pub fn new(tone: Tone, key: Key) -> Self {
        Self {
            tone,
            key,
            prefix: None,
        }
    }

    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = Some(prefix.into());
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Session {
    pub current_dir: PathKey,
    pub view: View,
    pub admin: bool,
    pub lang: Lang,
    pub dark: bool,
    pub notice: Option<Notice>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    Descend(String),
    Ascend,
    SwitchView(View),
    LoginSucceeded,
    Logout,
    SetLang(Lang),
    ToggleTheme,
    Notify(Notice),
}

impl Session {
    pub fn with_lang(lang: Lang) -> Self {
        Self {
            lang,
            ..Self::default()
        }
    }

    pub fn apply(self, event: Event) -> Session {
        match event {
            Event::Descend(name) => match navigator::descend(&self.current_dir, &name) {
                Some(current_dir) => Session {
                    current_dir,
                    ..self
                },
                None => self,
            },
            Event::Ascend => Session {
                current_dir: navigator::ascend(&self.current_dir),
                ..self
            },
            // 切回用户视图即退出登录
            Event::SwitchView(View::User) => Session {
                view: View::User,
                admin: false,
                ..self
            },
            Event::SwitchView(View::Admin) => Session {
                view: View::Admin,
                ..self
            },
            // 登录只在管理视图里有意义，成功后一并切过去
            Event::LoginSucceeded => Session {
                view: View::Admin,
                admin: true,
                notice: Some(Notice::new(Tone::Success, Key::LoginSuccess)),
                ..self
            },
            Event::Logout => Session {
                admin: false,
                ..self
            },
            Event::SetLang(lang) => Session { lang, ..self },
            Event::ToggleTheme => Session {
                dark: !self.dark,
                ..self
            },
            Event::Notify(notice) => Session {
                notice: Some(notice),
                ..self
            },
        }
    }

    pub fn take_notice(&mut self) -> Option<Notice> {
        self.notice.take()
    }
}

/// 用明文逐字比较用户名和密码。失败时会话保持未登录，只附带一条提示。
pub fn login(session: Session, stored: &Credentials, username: &str, password: &str) -> (Session, bool) {
    if stored.matches(username, password) {
        info!(username, "admin logged in");
        (session.apply(Event::LoginSucceeded), true)
    } else {
        info!(username, "admin login rejected");
        let notice = Notice::new(Tone::Error, Key::LoginFail);
        (session.apply(Event::Notify(notice)), false)
    }
}

/// 会话 id -> 会话状态。没有过期机制。
///
/// 与默认状态相同的会话不保存，只看页面不操作的访客不占内存。
pub struct SessionStore {
    default_lang: Lang,
    sessions: Mutex<HashMap<Uuid, Session>>,
}

impl SessionStore {
    pub fn new(default_lang: Lang) -> Self {
        Self {
            default_lang,
            sessions: Mutex::new(HashMap::new()),
        }
    }

    pub fn get(&self, id: Uuid) -> Session {
        self.sessions
            .lock()
            .get(&id)
            .cloned()
            .unwrap_or_else(|| Session::with_lang(self.default_lang))
    }

    /// 在锁内修改会话并写回。并发请求对同一会话的修改不会互相覆盖。
    pub fn modify<F, R>(&self, id: Uuid, f: F) -> R
    where
        F: FnOnce(&mut Session) -> R,
    {
        let fresh = Session::with_lang(self.default_lang);
        let mut sessions = self.sessions.lock();
        let mut session = sessions.remove(&id).unwrap_or_else(|| fresh.clone());
        let result = f(&mut session);
        if session != fresh {
            sessions.insert(id, session);
        }
        result
    }

    /// 应用事件，返回新状态。
    pub fn update(&self, id: Uuid, event: Event) -> Session {
        self.modify(id, |session| {
            *session = std::mem::take(session).apply(event);
            session.clone()
        })
    }

    pub fn len(&self) -> usize {
        self.sessions.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
