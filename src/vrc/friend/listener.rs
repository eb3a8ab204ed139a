//! 好友列表监听器回调接口

use async_trait::async_trait;

/// 好友列表监听器
#[async_trait]
pub trait RosterListener: Send + Sync {
    /// 好友列表刷新完成（整体替换）
    async fn on_roster_refreshed(&self, total: usize, favorites: usize);

    /// 刷新失败，旧列表保持不变
    async fn on_roster_refresh_failed(&self, error: String);
}

/// 默认空实现（无操作）
pub struct EmptyRosterListener;

#[async_trait]
impl RosterListener for EmptyRosterListener {
    async fn on_roster_refreshed(&self, _total: usize, _favorites: usize) {}

    async fn on_roster_refresh_failed(&self, _error: String) {}
}
