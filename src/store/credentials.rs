use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use super::{JsonDocument, StoreError};

pub const DEFAULT_USERNAME: &str = "admin";
pub const DEFAULT_PASSWORD: &str = "admin123";

/// 管理员凭据，明文存放、明文比较。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    #[serde(default = "default_username")]
    pub username: String,
    #[serde(default = "default_password")]
    pub password: String,
}

fn default_username() -> String {
    DEFAULT_USERNAME.to_string()
}

fn default_password() -> String {
    DEFAULT_PASSWORD.to_string()
}

impl Default for Credentials {
    fn default() -> Self {
        Self {
            username: default_username(),
            password: default_password(),
        }
    }
}

impl Credentials {
    pub fn matches(&self, username: &str, password: &str) -> bool {
        self.username == username && self.password == password
    }
}

pub struct CredentialStore {
    doc: JsonDocument<Credentials>,
}

impl CredentialStore {
    pub fn new(path: PathBuf) -> Self {
        Self {
            doc: JsonDocument::new(path),
        }
    }

    pub fn load(&self) -> Credentials {
        self.doc.load()
    }

    pub fn save(&self, username: &str, password: &str) -> Result<(), StoreError> {
        self.doc.save(&Credentials {
            username: username.to_string(),
            password: password.to_string(),
        })
    }
}
