//! 用户配置（JSON 文件）
//!
//! 保存过滤 / 排序偏好、操作间隔和“记住我”的凭据。
//! 读写失败只记录日志并回退到默认值，不影响主流程。
//!
//! 注意：`saved_credentials` 只做了 base64 编码，能读到配置文件的人就能还原密码。

use crate::vrc::batch::models::{DelayRange, DEFAULT_MAX_DELAY_SECS, DEFAULT_MIN_DELAY_SECS};
use crate::vrc::error::ConfigError;
use crate::vrc::roster::options::FilterSortOptions;
use crate::vrc::serialization::{decode_credentials, encode_credentials};
use crate::vrc::types::DEFAULT_API_BASE_URL;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// 配置目录名（位于系统配置目录下）
pub const APP_DIR_NAME: &str = "vrc-friend-manager";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub api_base_url: String,
    /// 好友分页大小（API 上限 100）
    pub page_size: usize,
    pub min_delay_secs: u64,
    pub max_delay_secs: u64,
    /// HTTP 请求超时（秒）
    pub request_timeout_secs: u64,
    pub filter: FilterSortOptions,
    pub remember_me: bool,
    /// base64(username:password)
    pub saved_credentials: Option<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            page_size: 100,
            min_delay_secs: DEFAULT_MIN_DELAY_SECS,
            max_delay_secs: DEFAULT_MAX_DELAY_SECS,
            request_timeout_secs: 30,
            filter: FilterSortOptions::default(),
            remember_me: false,
            saved_credentials: None,
        }
    }
}

impl AppConfig {
    /// `<系统配置目录>/vrc-friend-manager`
    pub fn default_dir() -> Result<PathBuf, ConfigError> {
        dirs::config_dir()
            .map(|d| d.join(APP_DIR_NAME))
            .ok_or(ConfigError::NoConfigDir)
    }

    pub fn default_path() -> Result<PathBuf, ConfigError> {
        Ok(Self::default_dir()?.join("config.json"))
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&text)?)
    }

    /// 读取配置；文件不存在、损坏等任何错误都回退到默认值
    pub fn load_or_default(path: &Path) -> Self {
        match Self::load(path) {
            Ok(cfg) => {
                debug!("[Config] 读取配置: {}", path.display());
                cfg
            }
            Err(ConfigError::Read(e)) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("[Config] 配置文件不存在，使用默认配置");
                Self::default()
            }
            Err(e) => {
                warn!("[Config] 读取配置失败，使用默认配置: {}", e);
                Self::default()
            }
        }
    }

    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let text = serde_json::to_string_pretty(self)?;
        fs::write(path, text)?;
        Ok(())
    }

    /// 尽力保存，失败只记录日志
    pub fn save_best_effort(&self, path: &Path) {
        match self.save(path) {
            Ok(()) => debug!("[Config] 配置已保存: {}", path.display()),
            Err(e) => warn!("[Config] 保存配置失败: {}", e),
        }
    }

    pub fn delay_range(&self) -> DelayRange {
        DelayRange::from_secs(self.min_delay_secs, self.max_delay_secs)
    }

    pub fn remember_credentials(&mut self, username: &str, password: &str) {
        self.remember_me = true;
        self.saved_credentials = Some(encode_credentials(username, password));
    }

    pub fn forget_credentials(&mut self) {
        self.remember_me = false;
        self.saved_credentials = None;
    }

    /// 已保存的凭据；未开启“记住我”或内容损坏时返回 None
    pub fn credentials(&self) -> Option<(String, String)> {
        if !self.remember_me {
            return None;
        }
        self.saved_credentials.as_deref().and_then(decode_credentials)
    }
}
