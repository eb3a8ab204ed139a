//! 好友本地模型定义

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// 好友记录（对应 VRChat `LimitedUserFriend` 中用到的字段）
///
/// 一次刷新周期内不可变，刷新时整体替换。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FriendRecord {
    /// 用户 ID（`usr_...`），主键
    pub id: String,
    /// 显示名称，不唯一，只用于展示和排序
    #[serde(rename = "displayName")]
    pub display_name: String,
    /// 用户标签
    #[serde(
        default,
        deserialize_with = "crate::vrc::serialization::deserialize_vec_or_null"
    )]
    pub tags: Vec<String>,
    /// 最后上线时间（原始字符串，空串或 null 视为从未上线）
    #[serde(
        rename = "last_login",
        default,
        deserialize_with = "crate::vrc::serialization::deserialize_blank_as_none"
    )]
    pub last_login: Option<String>,
}

impl FriendRecord {
    pub fn new(id: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            display_name: display_name.into(),
            tags: Vec::new(),
            last_login: None,
        }
    }

    pub fn with_last_login(mut self, last_login: impl Into<String>) -> Self {
        self.last_login = Some(last_login.into());
        self
    }

    /// 解析后的最后上线时间；缺失或格式错误都返回 None
    pub fn last_seen(&self) -> Option<DateTime<Utc>> {
        self.last_login.as_deref().and_then(parse_timestamp)
    }
}

/// 解析 RFC 3339 时间，兼容只有日期的写法（按 UTC 零点处理）
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

/// 当前登录用户
#[derive(Debug, Clone, Deserialize)]
pub struct CurrentUser {
    pub id: String,
    #[serde(rename = "displayName")]
    pub display_name: String,
}

/// 收藏条目（`type=friend` 时 `favoriteId` 即好友的用户 ID）
#[derive(Debug, Clone, Deserialize)]
pub struct FavoriteEntry {
    pub id: String,
    #[serde(rename = "favoriteId")]
    pub favorite_id: String,
    #[serde(
        default,
        deserialize_with = "crate::vrc::serialization::deserialize_vec_or_null"
    )]
    pub tags: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserializes_api_friend_with_blank_last_login() {
        let json = r#"[
            {"id":"usr_1","displayName":"Alice","tags":["system_trust_basic"],"last_login":"2024-03-01T10:00:00.000Z","status":"offline"},
            {"id":"usr_2","displayName":"Bob","tags":null,"last_login":""},
            {"id":"usr_3","displayName":"Carol"}
        ]"#;
        let friends: Vec<FriendRecord> = serde_json::from_str(json).unwrap();
        assert_eq!(friends.len(), 3);
        assert_eq!(friends[0].tags, vec!["system_trust_basic".to_string()]);
        assert!(friends[0].last_seen().is_some());
        assert_eq!(friends[1].last_login, None);
        assert!(friends[1].tags.is_empty());
        assert_eq!(friends[2].last_seen(), None);
    }

    #[test]
    fn malformed_timestamp_reads_as_absent() {
        let f = FriendRecord::new("usr_1", "A").with_last_login("yesterday-ish");
        assert_eq!(f.last_seen(), None);
        let d = FriendRecord::new("usr_2", "B").with_last_login("2024-01-01");
        assert_eq!(
            d.last_seen().map(|t| t.to_rfc3339()),
            Some("2024-01-01T00:00:00+00:00".to_string())
        );
    }
}
