//! 批量任务对单个目标执行的动作

use crate::vrc::error::ApiError;
use crate::vrc::friend::api::FriendActions;
use crate::vrc::friend::models::FriendRecord;
use async_trait::async_trait;
use std::sync::Arc;

/// 对单个目标执行的异步动作；失败只影响该目标
#[async_trait]
pub trait BatchAction<T: Send + Sync>: Send + Sync {
    /// 动作名称（日志用）
    fn name(&self) -> &'static str;

    async fn run(&self, target: &T) -> Result<(), ApiError>;
}

/// 删除好友
pub struct UnfriendAction {
    api: Arc<dyn FriendActions>,
}

impl UnfriendAction {
    pub fn new(api: Arc<dyn FriendActions>) -> Self {
        Self { api }
    }
}

#[async_trait]
impl BatchAction<FriendRecord> for UnfriendAction {
    fn name(&self) -> &'static str {
        "unfriend"
    }

    async fn run(&self, target: &FriendRecord) -> Result<(), ApiError> {
        self.api.unfriend(&target.id).await
    }
}

/// 重新发送好友申请（从备份恢复）
pub struct FriendRequestAction {
    api: Arc<dyn FriendActions>,
}

impl FriendRequestAction {
    pub fn new(api: Arc<dyn FriendActions>) -> Self {
        Self { api }
    }
}

#[async_trait]
impl BatchAction<FriendRecord> for FriendRequestAction {
    fn name(&self) -> &'static str {
        "friend_request"
    }

    async fn run(&self, target: &FriendRecord) -> Result<(), ApiError> {
        self.api.send_friend_request(&target.id).await
    }
}
