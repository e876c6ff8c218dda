use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use clap::Parser;
use serde::Deserialize;
use thiserror::Error;

use crate::i18n::Lang;

pub const DEFAULT_UPLOAD_LIMIT: usize = 512 * 1024 * 1024;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("invalid config {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
    #[error("unknown language code: {0}")]
    Lang(String),
}

/// 运行配置。可以来自 TOML 文件，命令行与环境变量覆盖文件中的值。
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Config {
    /// 共享文件的根目录
    pub root: PathBuf,
    /// 评论、统计、公告、凭据四个 JSON 文件所在目录
    pub data_dir: PathBuf,
    pub bind: SocketAddr,
    pub lang: Lang,
    /// 单次上传请求体上限（字节）
    pub upload_limit: usize,
    pub log: LogConfig,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// 按天滚动的日志目录，不设置时只输出到终端
    pub dir: Option<PathBuf>,
    pub json: bool,
    /// `EnvFilter` 语法，`RUST_LOG` 优先
    pub filter: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            root: PathBuf::from("uploads"),
            data_dir: PathBuf::from("."),
            bind: SocketAddr::from(([0, 0, 0, 0], 8080)),
            lang: Lang::Uz,
            upload_limit: DEFAULT_UPLOAD_LIMIT,
            log: LogConfig::default(),
        }
    }
}

impl Config {
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn from_toml(raw: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(raw)
    }
}

#[derive(Debug, Parser)]
#[command(name = "fileshelf", version, about = "Shared folder web server")]
pub struct Cli {
    /// TOML 配置文件
    #[arg(short, long, env = "FILESHELF_CONFIG")]
    pub config: Option<PathBuf>,
    /// 共享文件根目录
    #[arg(short, long, env = "FILESHELF_ROOT")]
    pub root: Option<PathBuf>,
    /// JSON 数据文件目录
    #[arg(long, env = "FILESHELF_DATA_DIR")]
    pub data_dir: Option<PathBuf>,
    /// 监听地址，例如 0.0.0.0:8080
    #[arg(short, long, env = "FILESHELF_BIND")]
    pub bind: Option<SocketAddr>,
    /// 默认界面语言（uz / ru）
    #[arg(long, env = "FILESHELF_LANG")]
    pub lang: Option<String>,
    #[arg(long, env = "FILESHELF_UPLOAD_LIMIT")]
    pub upload_limit: Option<usize>,
    #[arg(long, env = "FILESHELF_LOG_DIR")]
    pub log_dir: Option<PathBuf>,
    /// 以 JSON 格式输出日志
    #[arg(long, env = "FILESHELF_LOG_JSON")]
    pub log_json: bool,
}

impl Cli {
    /// 读取配置文件（如有），再叠加命令行参数。
    pub fn into_config(self) -> Result<Config, ConfigError> {
        let base = match &self.config {
            Some(path) => Config::from_file(path)?,
            None => Config::default(),
        };
        self.apply(base)
    }

    pub fn apply(self, mut config: Config) -> Result<Config, ConfigError> {
        if let Some(root) = self.root {
            config.root = root;
        }
        if let Some(data_dir) = self.data_dir {
            config.data_dir = data_dir;
        }
        if let Some(bind) = self.bind {
            config.bind = bind;
        }
        if let Some(code) = self.lang {
            config.lang = Lang::parse(&code).ok_or(ConfigError::Lang(code))?;
        }
        if let Some(limit) = self.upload_limit {
            config.upload_limit = limit;
        }
        if let Some(dir) = self.log_dir {
            config.log.dir = Some(dir);
        }
        if self.log_json {
            config.log.json = true;
        }
        Ok(config)
    }
}
