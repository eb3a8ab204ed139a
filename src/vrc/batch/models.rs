//! 批量任务数据结构

use crate::vrc::friend::models::FriendRecord;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// 默认最小间隔（秒）
pub const DEFAULT_MIN_DELAY_SECS: u64 = 20;
/// 默认最大间隔（秒）
pub const DEFAULT_MAX_DELAY_SECS: u64 = 45;

/// 批量任务状态
///
/// `Idle -> Running -> {Paused <-> Running} -> Cancelling -> Cancelled`，
/// 或 `Running -> Completed`。`Completed` / `Cancelled` 为终态。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum JobState {
    Idle,
    Running,
    Paused,
    Cancelling,
    Completed,
    Cancelled,
}

impl JobState {
    pub fn is_terminal(self) -> bool {
        matches!(self, JobState::Completed | JobState::Cancelled)
    }

    /// 运行中（含暂停、取消中）
    pub fn is_active(self) -> bool {
        matches!(
            self,
            JobState::Running | JobState::Paused | JobState::Cancelling
        )
    }
}

/// 两次操作之间的随机间隔，闭区间 `[min, max]` 上均匀分布
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DelayRange {
    pub min: Duration,
    pub max: Duration,
}

impl DelayRange {
    /// `min > max` 时交换
    pub fn new(min: Duration, max: Duration) -> Self {
        if min <= max {
            Self { min, max }
        } else {
            Self { min: max, max: min }
        }
    }

    pub fn from_secs(min: u64, max: u64) -> Self {
        Self::new(Duration::from_secs(min), Duration::from_secs(max))
    }

    /// 毫秒精度采样，两端都可能取到
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Duration {
        let min = u64::try_from(self.min.as_millis()).unwrap_or(u64::MAX);
        let max = u64::try_from(self.max.as_millis()).unwrap_or(u64::MAX);
        Duration::from_millis(rng.gen_range(min..=max))
    }
}

impl Default for DelayRange {
    fn default() -> Self {
        Self::from_secs(DEFAULT_MIN_DELAY_SECS, DEFAULT_MAX_DELAY_SECS)
    }
}

/// 批量任务的目标
pub trait BatchTarget: Clone + Send + Sync + 'static {
    fn target_id(&self) -> &str;

    /// 进度展示用的名称
    fn label(&self) -> &str;
}

impl BatchTarget for FriendRecord {
    fn target_id(&self) -> &str {
        &self.id
    }

    fn label(&self) -> &str {
        &self.display_name
    }
}

/// 进度快照
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BatchProgress {
    pub job_id: String,
    /// 已处理数（成功和失败都计入）
    pub completed: usize,
    pub total: usize,
    pub succeeded: usize,
    pub current_label: String,
    pub state: JobState,
}

impl BatchProgress {
    pub fn failed(&self) -> usize {
        self.completed.saturating_sub(self.succeeded)
    }
}

/// 单个目标失败记录
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BatchFailure {
    pub id: String,
    pub label: String,
    pub error: String,
}

/// 任务结束汇总
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BatchSummary {
    pub success_count: usize,
    pub processed_count: usize,
    pub total_count: usize,
    pub cancelled: bool,
    pub failures: Vec<BatchFailure>,
}
