use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use time::{Duration, OffsetDateTime};
use tracing::{info, warn};

use super::{JsonDocument, StoreError};

/// 顶部公告。`expires_at` 为空表示不过期。
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Advert {
    pub text: String,
    pub active: bool,
    #[serde(with = "expiry", skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<OffsetDateTime>,
}

/// 写出 RFC 3339；读入时也接受不带时区的 ISO 8601（旧数据文件的格式），按 UTC 解释。
mod expiry {
    use serde::{de, Deserialize, Deserializer, Serializer};
    use time::format_description::well_known::{Iso8601, Rfc3339};
    use time::{OffsetDateTime, PrimitiveDateTime};

    pub fn serialize<S: Serializer>(
        value: &Option<OffsetDateTime>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        time::serde::rfc3339::option::serialize(value, serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<OffsetDateTime>, D::Error> {
        let Some(raw) = Option::<String>::deserialize(deserializer)? else {
            return Ok(None);
        };
        if let Ok(at) = OffsetDateTime::parse(&raw, &Rfc3339) {
            return Ok(Some(at));
        }
        PrimitiveDateTime::parse(&raw, &Iso8601::DEFAULT)
            .map(|at| Some(at.assume_utc()))
            .map_err(de::Error::custom)
    }
}

impl Advert {
    /// 横幅只在启用且有文字时显示。
    pub fn is_visible(&self) -> bool {
        self.active && !self.text.is_empty()
    }

    fn is_expired_at(&self, now: OffsetDateTime) -> bool {
        self.active && self.expires_at.is_some_and(|at| now > at)
    }
}

pub struct AdvertStore {
    doc: JsonDocument<Advert>,
}

impl AdvertStore {
    pub fn new(path: PathBuf) -> Self {
        Self {
            doc: JsonDocument::new(path),
        }
    }

    pub fn load(&self) -> Advert {
        self.load_at(OffsetDateTime::now_utc())
    }

    /// 读取时检查过期：已过期则改为停用并写回，然后返回停用后的记录。
    pub fn load_at(&self, now: OffsetDateTime) -> Advert {
        let advert = self.doc.load();
        if !advert.is_expired_at(now) {
            return advert;
        }

        let mut expired = advert.clone();
        let flipped = self.doc.update(|stored| {
            // 锁内重新判断，另一个请求可能刚写入了新公告
            if stored.is_expired_at(now) {
                stored.active = false;
                expired = stored.clone();
                true
            } else {
                expired = stored.clone();
                false
            }
        });
        match flipped {
            Ok(true) => info!(expired_at = ?advert.expires_at, "advert expired"),
            Ok(false) => {}
            Err(e) => {
                warn!(error = %e, "failed to persist advert expiry");
                expired.active = false;
            }
        }
        expired
    }

    pub fn save(&self, text: &str, active: bool, hours: u32) -> Result<Advert, StoreError> {
        self.save_at(OffsetDateTime::now_utc(), text, active, hours)
    }

    /// `active && hours > 0` 时才设置过期时间；`hours == 0` 表示一直显示。
    /// 过期时间超出可表示范围时不写入，返回 `ExpiryOutOfRange`。
    pub fn save_at(
        &self,
        now: OffsetDateTime,
        text: &str,
        active: bool,
        hours: u32,
    ) -> Result<Advert, StoreError> {
        let expires_at = if active && hours > 0 {
            let at = now
                .checked_add(Duration::hours(i64::from(hours)))
                .ok_or(StoreError::ExpiryOutOfRange(hours))?;
            Some(at)
        } else {
            None
        };
        let advert = Advert {
            text: text.to_string(),
            active,
            expires_at,
        };
        self.doc.save(&advert)?;
        Ok(advert)
    }
}
