//! 好友列表缓存服务层
//!
//! 内存中保存最近一次拉取的好友列表和收藏集合，每次刷新整体替换，不做增量修补。

use crate::vrc::error::ApiError;
use crate::vrc::friend::api::RosterSource;
use crate::vrc::friend::listener::{EmptyRosterListener, RosterListener};
use crate::vrc::friend::models::FriendRecord;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{error, info};

/// 好友列表缓存
pub struct FriendService {
    source: Arc<dyn RosterSource>,
    listener: Arc<dyn RosterListener>,
    roster: Vec<FriendRecord>,
    favorites: HashSet<String>,
}

impl FriendService {
    /// 创建新的好友服务（使用默认空监听器）
    pub fn new(source: Arc<dyn RosterSource>) -> Self {
        Self::with_listener(source, Arc::new(EmptyRosterListener))
    }

    pub fn with_listener(source: Arc<dyn RosterSource>, listener: Arc<dyn RosterListener>) -> Self {
        Self {
            source,
            listener,
            roster: Vec::new(),
            favorites: HashSet::new(),
        }
    }

    pub fn set_listener(&mut self, listener: Arc<dyn RosterListener>) {
        self.listener = listener;
    }

    pub fn roster(&self) -> &[FriendRecord] {
        &self.roster
    }

    pub fn favorites(&self) -> &HashSet<String> {
        &self.favorites
    }

    /// 重新拉取好友和收藏；任一失败时保留旧数据
    pub async fn refresh(&mut self) -> Result<(), ApiError> {
        info!("[FriendService] 🔄 开始刷新好友列表");

        let fetched = async {
            let friends = self.source.fetch_all_friends().await?;
            let favorites = self.source.fetch_favorite_ids().await?;
            Ok::<_, ApiError>((friends, favorites))
        }
        .await;

        match fetched {
            Ok((friends, favorites)) => {
                self.roster = friends;
                self.favorites = favorites;
                info!(
                    "[FriendService] ✅ 刷新完成，好友数: {}, 收藏数: {}",
                    self.roster.len(),
                    self.favorites.len()
                );
                self.listener
                    .on_roster_refreshed(self.roster.len(), self.favorites.len())
                    .await;
                Ok(())
            }
            Err(e) => {
                error!("[FriendService] ❌ 刷新好友列表失败: {}", e);
                self.listener.on_roster_refresh_failed(e.to_string()).await;
                Err(e)
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// 内存好友来源，`fail` 为 true 时所有请求返回错误
    pub(crate) struct FakeRoster {
        pub friends: Mutex<Vec<FriendRecord>>,
        pub favorites: Mutex<HashSet<String>>,
        pub fail: Mutex<bool>,
    }

    impl FakeRoster {
        pub(crate) fn new(friends: Vec<FriendRecord>, favorites: &[&str]) -> Self {
            Self {
                friends: Mutex::new(friends),
                favorites: Mutex::new(favorites.iter().map(|s| s.to_string()).collect()),
                fail: Mutex::new(false),
            }
        }
    }

    #[async_trait]
    impl RosterSource for FakeRoster {
        async fn fetch_all_friends(&self) -> Result<Vec<FriendRecord>, ApiError> {
            if *self.fail.lock().unwrap() {
                return Err(ApiError::Http {
                    status: 503,
                    message: "unavailable".into(),
                });
            }
            Ok(self.friends.lock().unwrap().clone())
        }

        async fn fetch_favorite_ids(&self) -> Result<HashSet<String>, ApiError> {
            Ok(self.favorites.lock().unwrap().clone())
        }
    }

    #[tokio::test]
    async fn refresh_replaces_roster_wholesale() {
        let source = Arc::new(FakeRoster::new(
            vec![FriendRecord::new("usr_a", "A"), FriendRecord::new("usr_b", "B")],
            &["usr_a"],
        ));
        let mut service = FriendService::new(source.clone());
        service.refresh().await.unwrap();
        assert_eq!(service.roster().len(), 2);
        assert!(service.favorites().contains("usr_a"));

        *source.friends.lock().unwrap() = vec![FriendRecord::new("usr_c", "C")];
        service.refresh().await.unwrap();
        assert_eq!(service.roster(), &[FriendRecord::new("usr_c", "C")]);
    }

    #[tokio::test]
    async fn failed_refresh_keeps_previous_roster() {
        let source = Arc::new(FakeRoster::new(vec![FriendRecord::new("usr_a", "A")], &[]));
        let mut service = FriendService::new(source.clone());
        service.refresh().await.unwrap();

        *source.fail.lock().unwrap() = true;
        assert!(service.refresh().await.is_err());
        assert_eq!(service.roster().len(), 1);
    }
}
