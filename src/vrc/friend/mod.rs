//! 好友模块
//!
//! 好友列表拉取、收藏集合、删除好友 / 发送好友申请

pub mod api;
pub mod listener;
pub mod models;
pub mod service;
pub mod types;

// 重新导出主要类型和函数
pub use api::{FriendActions, FriendApi, RosterSource};
pub use listener::{EmptyRosterListener, RosterListener};
pub use models::{CurrentUser, FriendRecord};
pub use service::FriendService;
