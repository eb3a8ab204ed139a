//! 好友 HTTP API 客户端
//!
//! 负责所有好友相关的 HTTP 请求

use crate::vrc::error::ApiError;
use crate::vrc::friend::models::{FavoriteEntry, FriendRecord};
use crate::vrc::friend::types::{FavoritesPageQuery, FriendsPageQuery};
use crate::vrc::types::{handle_empty_response, handle_http_response};
use async_trait::async_trait;
use std::collections::HashSet;
use tracing::{debug, info};

/// 好友列表来源（刷新时使用）
#[async_trait]
pub trait RosterSource: Send + Sync {
    /// 获取全部好友（内部分页，调用方只看到拼好的列表）
    async fn fetch_all_friends(&self) -> Result<Vec<FriendRecord>, ApiError>;

    /// 获取被收藏好友的 ID 集合
    async fn fetch_favorite_ids(&self) -> Result<HashSet<String>, ApiError>;
}

/// 针对单个好友的写操作（批量任务使用）
#[async_trait]
pub trait FriendActions: Send + Sync {
    async fn unfriend(&self, user_id: &str) -> Result<(), ApiError>;

    async fn send_friend_request(&self, user_id: &str) -> Result<(), ApiError>;
}

/// 好友相关的 HTTP API 客户端
pub struct FriendApi {
    client: reqwest::Client,
    api_base_url: String,
    page_size: usize,
}

impl FriendApi {
    /// 创建新的好友 API 客户端
    ///
    /// `client` 应该已经在外部配置好 User-Agent 和 cookie jar
    pub fn new(client: reqwest::Client, api_base_url: String, page_size: usize) -> Self {
        Self {
            client,
            api_base_url,
            page_size: page_size.clamp(1, 100),
        }
    }

    /// 拉取一轮（在线或离线）好友，直到某页不满
    async fn fetch_friends_pass(&self, offline: bool) -> Result<Vec<FriendRecord>, ApiError> {
        let url = format!("{}/auth/user/friends", self.api_base_url);
        let mut all = Vec::new();
        let mut offset = 0;

        loop {
            let query = FriendsPageQuery {
                offset,
                n: self.page_size,
                offline,
            };
            debug!(
                "[FriendAPI]   请求好友分页: offset={}, n={}, offline={}",
                offset, self.page_size, offline
            );

            let response = self.client.get(&url).query(&query).send().await?;
            let page: Vec<FriendRecord> = handle_http_response(response, "好友分页").await?;
            let page_len = page.len();
            all.extend(page);

            if page_len < self.page_size {
                break;
            }
            offset += page_len;
        }

        Ok(all)
    }

    pub async fn unfriend(&self, user_id: &str) -> Result<(), ApiError> {
        let url = format!("{}/auth/user/friends/{}", self.api_base_url, user_id);
        info!("[FriendAPI] 📡 删除好友: {}", user_id);
        let response = self.client.delete(&url).send().await?;
        handle_empty_response(response, "删除好友").await
    }

    pub async fn send_friend_request(&self, user_id: &str) -> Result<(), ApiError> {
        let url = format!("{}/user/{}/friendRequest", self.api_base_url, user_id);
        info!("[FriendAPI] 📡 发送好友申请: {}", user_id);
        let response = self.client.post(&url).send().await?;
        handle_empty_response(response, "发送好友申请").await
    }
}

#[async_trait]
impl RosterSource for FriendApi {
    async fn fetch_all_friends(&self) -> Result<Vec<FriendRecord>, ApiError> {
        info!("[FriendAPI] 📡 请求全量好友列表");
        let mut friends = self.fetch_friends_pass(false).await?;
        friends.extend(self.fetch_friends_pass(true).await?);
        let friends = dedup_by_id(friends);
        info!("[FriendAPI] ✅ 全量好友列表响应，好友数: {}", friends.len());
        Ok(friends)
    }

    async fn fetch_favorite_ids(&self) -> Result<HashSet<String>, ApiError> {
        let url = format!("{}/favorites", self.api_base_url);
        info!("[FriendAPI] 📡 请求收藏好友列表");

        let mut ids = HashSet::new();
        let mut offset = 0;
        loop {
            let query = FavoritesPageQuery {
                favorite_type: "friend",
                n: self.page_size,
                offset,
            };
            let response = self.client.get(&url).query(&query).send().await?;
            let page: Vec<FavoriteEntry> = handle_http_response(response, "收藏分页").await?;
            let page_len = page.len();
            ids.extend(page.into_iter().map(|f| f.favorite_id));

            if page_len < self.page_size {
                break;
            }
            offset += page_len;
        }

        info!("[FriendAPI] ✅ 收藏好友数: {}", ids.len());
        Ok(ids)
    }
}

#[async_trait]
impl FriendActions for FriendApi {
    async fn unfriend(&self, user_id: &str) -> Result<(), ApiError> {
        FriendApi::unfriend(self, user_id).await
    }

    async fn send_friend_request(&self, user_id: &str) -> Result<(), ApiError> {
        FriendApi::send_friend_request(self, user_id).await
    }
}

/// 按 ID 去重，保留第一次出现的记录（在线 / 离线两轮可能有交叠）
pub fn dedup_by_id(friends: Vec<FriendRecord>) -> Vec<FriendRecord> {
    let mut seen = HashSet::with_capacity(friends.len());
    friends
        .into_iter()
        .filter(|f| seen.insert(f.id.clone()))
        .collect()
}
