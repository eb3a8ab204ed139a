pub mod auth;
pub mod backup;
pub mod batch;
pub mod client;
pub mod config;
pub mod error;
pub mod friend;
pub mod roster;
pub mod serialization;
pub mod session;
pub mod types;

// 重新导出认证相关类型
pub use auth::{AuthGateway, TwoFactorMethod};

// 重新导出客户端
pub use client::{ClientConfig, VrcClient};
