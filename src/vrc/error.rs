//! 错误类型定义
//!
//! 认证错误直接返回给调用方；单个好友操作的 API 错误在批量任务内部被计数、汇总；
//! 配置错误只记录日志，回退到默认值。

use thiserror::Error;

/// 单次 HTTP 调用失败
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("HTTP 错误 {status}: {message}")]
    Http { status: u16, message: String },

    #[error("请求失败: {0}")]
    Network(#[from] reqwest::Error),

    #[error("反序列化响应失败: {0}")]
    Decode(String),

    #[error("无效的地址: {0}")]
    InvalidUrl(String),
}

impl ApiError {
    /// HTTP 状态码（网络错误等没有状态码）
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Http { status, .. } => Some(*status),
            ApiError::Network(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}

/// 登录 / 二次验证 / 会话恢复错误
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("用户名或密码错误: {0}")]
    InvalidCredentials(String),

    #[error("需要二次验证: {methods:?}")]
    TwoFactorRequired { methods: Vec<String> },

    #[error("二次验证失败: {0}")]
    TwoFactorFailed(String),

    #[error("二次验证已取消")]
    TwoFactorCancelled,

    #[error("当前没有等待中的二次验证")]
    NoPendingTwoFactor,

    #[error("会话未恢复: {0}")]
    SessionNotRestored(String),

    #[error(transparent)]
    Api(#[from] ApiError),
}

/// 本地配置读写错误（调用方一律回退到默认值）
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("读取配置文件失败: {0}")]
    Read(#[from] std::io::Error),

    #[error("解析配置文件失败: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("无法确定配置目录")]
    NoConfigDir,
}

/// 启动批量任务被拒绝
#[derive(Debug, Error, PartialEq, Eq)]
pub enum BatchStartError {
    #[error("没有选中任何好友")]
    NothingSelected,

    #[error("已有批量任务在运行")]
    AlreadyRunning,
}

/// 刷新好友列表被拒绝
#[derive(Debug, Error)]
pub enum RefreshError {
    #[error("批量任务运行中，禁止刷新好友列表")]
    BatchActive,

    #[error(transparent)]
    Api(#[from] ApiError),
}
