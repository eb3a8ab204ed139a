//! 批量任务监听器回调接口

use crate::vrc::batch::models::BatchSummary;
use async_trait::async_trait;
use std::time::Duration;

/// 批量任务监听器（进度展示、通知等由调用方实现）
#[async_trait]
pub trait BatchListener: Send + Sync {
    /// 开始处理第 `index` 个目标（从 0 开始）
    async fn on_item_started(&self, index: usize, total: usize, label: &str);

    /// 第 `index` 个目标处理完毕，`error` 为 None 表示成功
    async fn on_item_finished(&self, index: usize, label: &str, error: Option<&str>);

    /// 开始等待下一个目标
    async fn on_waiting(&self, delay: Duration);

    /// 任务结束（完成或取消）
    async fn on_finished(&self, summary: &BatchSummary);
}

/// 默认空实现（无操作）
pub struct EmptyBatchListener;

#[async_trait]
impl BatchListener for EmptyBatchListener {
    async fn on_item_started(&self, _index: usize, _total: usize, _label: &str) {}

    async fn on_item_finished(&self, _index: usize, _label: &str, _error: Option<&str>) {}

    async fn on_waiting(&self, _delay: Duration) {}

    async fn on_finished(&self, _summary: &BatchSummary) {}
}
