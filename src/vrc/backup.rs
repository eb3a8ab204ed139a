//! 好友列表备份（JSON）
//!
//! 字段：`id`、`displayName`、`tags`、`lastLogin`。重新加好友时读取同一格式。

use crate::vrc::friend::models::FriendRecord;
use anyhow::{Context, Result};
use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackupEntry {
    pub id: String,
    #[serde(rename = "displayName")]
    pub display_name: String,
    #[serde(
        default,
        deserialize_with = "crate::vrc::serialization::deserialize_vec_or_null"
    )]
    pub tags: Vec<String>,
    #[serde(rename = "lastLogin", default)]
    pub last_login: Option<String>,
}

impl From<&FriendRecord> for BackupEntry {
    fn from(f: &FriendRecord) -> Self {
        Self {
            id: f.id.clone(),
            display_name: f.display_name.clone(),
            tags: f.tags.clone(),
            last_login: f.last_login.clone(),
        }
    }
}

impl From<BackupEntry> for FriendRecord {
    fn from(e: BackupEntry) -> Self {
        Self {
            id: e.id,
            display_name: e.display_name,
            tags: e.tags,
            last_login: e.last_login.filter(|s| !s.trim().is_empty()),
        }
    }
}

/// 备份文件名：`VRChatFriends_yyyy-MM-dd_HH-mm-ss.json`
pub fn backup_file_name(now: DateTime<Local>) -> String {
    format!("VRChatFriends_{}.json", now.format("%Y-%m-%d_%H-%M-%S"))
}

/// 在 `dir` 下写入带时间戳的备份文件，返回完整路径
pub async fn write_backup(dir: &Path, roster: &[FriendRecord]) -> Result<PathBuf> {
    let path = dir.join(backup_file_name(Local::now()));
    write_backup_to(&path, roster).await?;
    Ok(path)
}

pub async fn write_backup_to(path: &Path, roster: &[FriendRecord]) -> Result<()> {
    let entries: Vec<BackupEntry> = roster.iter().map(BackupEntry::from).collect();
    let json = serde_json::to_string_pretty(&entries).context("序列化备份失败")?;
    tokio::fs::write(path, json)
        .await
        .with_context(|| format!("写入备份文件失败: {}", path.display()))?;
    info!(
        "[Backup] 💾 已备份 {} 个好友到 {}",
        entries.len(),
        path.display()
    );
    Ok(())
}

pub async fn read_backup(path: &Path) -> Result<Vec<BackupEntry>> {
    let text = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("读取备份文件失败: {}", path.display()))?;
    let entries: Vec<BackupEntry> =
        serde_json::from_str(&text).with_context(|| format!("解析备份文件失败: {}", path.display()))?;
    info!("[Backup] 📂 读取备份 {} 条: {}", entries.len(), path.display());
    Ok(entries)
}
