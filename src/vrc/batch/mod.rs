//! 批量操作：删除好友 / 重新加好友
//!
//! 单个后台任务顺序执行，随机间隔，支持暂停、恢复、取消

pub mod action;
pub mod listener;
pub mod models;
pub mod runner;

pub use action::{BatchAction, FriendRequestAction, UnfriendAction};
pub use listener::{BatchListener, EmptyBatchListener};
pub use models::{
    BatchFailure, BatchProgress, BatchSummary, BatchTarget, DelayRange, JobState,
};
pub use runner::{BatchHandle, BatchRunner, PAUSE_POLL_INTERVAL};
