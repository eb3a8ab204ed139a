//! 限速批量执行器
//!
//! 在单个后台任务中按顺序处理目标，两次调用之间随机等待，可暂停、恢复、取消。
//! 控制端只写状态单元（watch channel），工作端只在安全点读取：
//! 每个目标开始前检查暂停 / 取消，等待间隔时可被取消立即打断，
//! 正在执行的动作不会被中途打断。

use crate::vrc::batch::action::BatchAction;
use crate::vrc::batch::listener::{BatchListener, EmptyBatchListener};
use crate::vrc::batch::models::{
    BatchFailure, BatchProgress, BatchSummary, BatchTarget, DelayRange, JobState,
};
use crate::vrc::error::BatchStartError;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// 暂停时检查状态的间隔
pub const PAUSE_POLL_INTERVAL: Duration = Duration::from_millis(200);

/// 控制端与工作端共享的任务状态
struct JobShared {
    job_id: String,
    total: usize,
    state_tx: watch::Sender<JobState>,
    completed: AtomicUsize,
    succeeded: AtomicUsize,
    current_label: Mutex<String>,
    summary: Mutex<Option<BatchSummary>>,
}

impl JobShared {
    fn state(&self) -> JobState {
        *self.state_tx.borrow()
    }

    /// 仅当当前状态在 `from` 中时切换到 `to`
    fn transition(&self, from: &[JobState], to: JobState) -> bool {
        self.state_tx.send_if_modified(|state| {
            if from.contains(state) {
                *state = to;
                true
            } else {
                false
            }
        })
    }

    fn set_label(&self, label: &str) {
        let mut current = self.current_label.lock().unwrap_or_else(PoisonError::into_inner);
        current.clear();
        current.push_str(label);
    }

    fn progress(&self) -> BatchProgress {
        // 写端先加 completed 再加 succeeded，这里反过来读，保证 succeeded <= completed
        let succeeded = self.succeeded.load(Ordering::SeqCst);
        let completed = self.completed.load(Ordering::SeqCst);
        BatchProgress {
            job_id: self.job_id.clone(),
            completed,
            total: self.total,
            succeeded,
            current_label: self
                .current_label
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .clone(),
            state: self.state(),
        }
    }

    /// 工作任务异常退出：补一份汇总并进入 Cancelled
    fn finish_abnormally(&self) {
        {
            let mut summary = self.summary.lock().unwrap_or_else(PoisonError::into_inner);
            if summary.is_none() {
                let p = self.progress();
                *summary = Some(BatchSummary {
                    success_count: p.succeeded,
                    processed_count: p.completed,
                    total_count: self.total,
                    cancelled: true,
                    failures: Vec::new(),
                });
            }
        }
        self.state_tx.send_if_modified(|state| {
            if state.is_terminal() {
                false
            } else {
                *state = JobState::Cancelled;
                true
            }
        });
    }
}

/// 批量任务句柄：暂停、恢复、取消、读取进度、等待结束
#[derive(Clone)]
pub struct BatchHandle {
    shared: Arc<JobShared>,
}

impl BatchHandle {
    pub fn job_id(&self) -> &str {
        &self.shared.job_id
    }

    /// 运行中 -> 暂停；其他状态下无效果，返回 false
    pub fn pause(&self) -> bool {
        let changed = self
            .shared
            .transition(&[JobState::Running], JobState::Paused);
        if changed {
            info!("[Batch] ⏸️ 任务 {} 已暂停", self.shared.job_id);
        }
        changed
    }

    /// 暂停 -> 运行中
    pub fn resume(&self) -> bool {
        let changed = self
            .shared
            .transition(&[JobState::Paused], JobState::Running);
        if changed {
            info!("[Batch] ▶️ 任务 {} 已恢复", self.shared.job_id);
        }
        changed
    }

    /// 运行中或暂停 -> 取消中；在下一个安全点生效
    pub fn cancel(&self) -> bool {
        let changed = self.shared.transition(
            &[JobState::Running, JobState::Paused],
            JobState::Cancelling,
        );
        if changed {
            info!("[Batch] 🛑 任务 {} 请求取消", self.shared.job_id);
        }
        changed
    }

    pub fn state(&self) -> JobState {
        self.shared.state()
    }

    pub fn progress(&self) -> BatchProgress {
        self.shared.progress()
    }

    /// 等待任务进入终态并返回汇总
    pub async fn wait(&self) -> BatchSummary {
        let mut rx = self.shared.state_tx.subscribe();
        let _ = rx.wait_for(|state| state.is_terminal()).await;
        self.shared
            .summary
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
            .unwrap_or_else(|| {
                let p = self.shared.progress();
                BatchSummary {
                    success_count: p.succeeded,
                    processed_count: p.completed,
                    total_count: p.total,
                    cancelled: p.state == JobState::Cancelled,
                    failures: Vec::new(),
                }
            })
    }
}

/// 批量执行器：同一时间只允许一个任务处于活动状态
pub struct BatchRunner {
    current: Mutex<Option<BatchHandle>>,
    listener: Arc<dyn BatchListener>,
}

impl Default for BatchRunner {
    fn default() -> Self {
        Self::new()
    }
}

impl BatchRunner {
    /// 创建执行器（使用默认空监听器）
    pub fn new() -> Self {
        Self::with_listener(Arc::new(EmptyBatchListener))
    }

    pub fn with_listener(listener: Arc<dyn BatchListener>) -> Self {
        Self {
            current: Mutex::new(None),
            listener,
        }
    }

    pub fn set_listener(&mut self, listener: Arc<dyn BatchListener>) {
        self.listener = listener;
    }

    /// 最近一个任务的句柄（可能已结束）
    pub fn current(&self) -> Option<BatchHandle> {
        self.current
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// 是否有任务处于活动状态
    pub fn is_busy(&self) -> bool {
        self.current()
            .map(|h| h.state().is_active())
            .unwrap_or(false)
    }

    /// 当前任务状态，没有任务时为 Idle
    pub fn state(&self) -> JobState {
        self.current()
            .map(|h| h.state())
            .unwrap_or(JobState::Idle)
    }

    /// 启动批量任务
    ///
    /// `targets` 为空时拒绝（不产生任何状态变化）；已有活动任务时拒绝。
    /// 必须在 tokio 运行时内调用。
    pub fn start<T: BatchTarget>(
        &self,
        targets: Vec<T>,
        action: Arc<dyn BatchAction<T>>,
        delay: DelayRange,
    ) -> Result<BatchHandle, BatchStartError> {
        if targets.is_empty() {
            warn!("[Batch] 没有选中任何目标，忽略启动请求");
            return Err(BatchStartError::NothingSelected);
        }

        let mut current = self.current.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(existing) = current.as_ref() {
            if !existing.state().is_terminal() {
                warn!(
                    "[Batch] 任务 {} 仍在运行，拒绝启动新任务",
                    existing.job_id()
                );
                return Err(BatchStartError::AlreadyRunning);
            }
        }

        let (state_tx, _) = watch::channel(JobState::Running);
        let shared = Arc::new(JobShared {
            job_id: Uuid::new_v4().to_string(),
            total: targets.len(),
            state_tx,
            completed: AtomicUsize::new(0),
            succeeded: AtomicUsize::new(0),
            current_label: Mutex::new(String::new()),
            summary: Mutex::new(None),
        });
        let handle = BatchHandle {
            shared: shared.clone(),
        };
        *current = Some(handle.clone());
        drop(current);

        info!(
            "[Batch] 🚀 启动任务 {}，动作: {}，目标数: {}，间隔: {:?}~{:?}",
            shared.job_id,
            action.name(),
            shared.total,
            delay.min,
            delay.max
        );

        let listener = self.listener.clone();
        let worker = tokio::spawn(run_job(shared.clone(), targets, action, listener, delay));
        // 工作任务 panic 时也要进入终态，否则 wait() 永远不返回
        tokio::spawn(async move {
            if let Err(e) = worker.await {
                error!("[Batch] ❌ 任务 {} 异常退出: {}", shared.job_id, e);
                shared.finish_abnormally();
            }
        });

        Ok(handle)
    }
}

/// 工作端主循环
async fn run_job<T: BatchTarget>(
    shared: Arc<JobShared>,
    targets: Vec<T>,
    action: Arc<dyn BatchAction<T>>,
    listener: Arc<dyn BatchListener>,
    delay: DelayRange,
) {
    let mut rx = shared.state_tx.subscribe();
    let mut rng = StdRng::from_entropy();
    let mut failures = Vec::new();
    let mut cancelled = false;
    let total = targets.len();

    for (index, target) in targets.iter().enumerate() {
        if !wait_while_paused(&mut rx).await {
            cancelled = true;
            break;
        }

        let label = target.label();
        shared.set_label(label);
        debug!("[Batch] ({}/{}) 处理: {}", index + 1, total, label);
        listener.on_item_started(index, total, label).await;

        // 动作在独立任务中执行，panic 只算作该目标失败
        let outcome = {
            let action = action.clone();
            let target = target.clone();
            tokio::spawn(async move { action.run(&target).await }).await
        };
        let error_text = match outcome {
            Ok(Ok(())) => None,
            Ok(Err(e)) => Some(e.to_string()),
            Err(e) => Some(format!("动作异常退出: {}", e)),
        };

        shared.completed.fetch_add(1, Ordering::SeqCst);
        match &error_text {
            None => {
                shared.succeeded.fetch_add(1, Ordering::SeqCst);
            }
            Some(e) => {
                warn!(
                    "[Batch] ({}/{}) {} 失败，跳过: {}",
                    index + 1,
                    total,
                    label,
                    e
                );
                failures.push(BatchFailure {
                    id: target.target_id().to_string(),
                    label: label.to_string(),
                    error: e.clone(),
                });
            }
        }

        listener
            .on_item_finished(index, label, error_text.as_deref())
            .await;

        if index + 1 < total {
            let wait = delay.sample(&mut rng);
            debug!("[Batch] 等待 {:?} 后处理下一个", wait);
            listener.on_waiting(wait).await;
            if !sleep_unless_cancelled(&mut rx, wait).await {
                cancelled = true;
                break;
            }
        }
    }

    let summary = BatchSummary {
        success_count: shared.succeeded.load(Ordering::SeqCst),
        processed_count: shared.completed.load(Ordering::SeqCst),
        total_count: total,
        cancelled,
        failures,
    };
    info!(
        "[Batch] ✅ 任务 {} 结束: 成功 {}/{}，已处理 {}，取消: {}",
        shared.job_id,
        summary.success_count,
        summary.total_count,
        summary.processed_count,
        summary.cancelled
    );

    *shared.summary.lock().unwrap_or_else(PoisonError::into_inner) = Some(summary.clone());
    let terminal = if cancelled {
        JobState::Cancelled
    } else {
        JobState::Completed
    };
    shared.state_tx.send_modify(|state| *state = terminal);
    listener.on_finished(&summary).await;
}

/// 暂停期间挂起，状态变化或每 [`PAUSE_POLL_INTERVAL`] 醒来一次；
/// 返回 false 表示已请求取消
async fn wait_while_paused(rx: &mut watch::Receiver<JobState>) -> bool {
    loop {
        let state = *rx.borrow_and_update();
        match state {
            JobState::Cancelling => return false,
            JobState::Paused => {
                tokio::select! {
                    _ = rx.changed() => {}
                    _ = tokio::time::sleep(PAUSE_POLL_INTERVAL) => {}
                }
            }
            _ => return true,
        }
    }
}

/// 等待 `delay`，期间请求取消则立即返回 false
async fn sleep_unless_cancelled(rx: &mut watch::Receiver<JobState>, delay: Duration) -> bool {
    let sleep = tokio::time::sleep(delay);
    tokio::pin!(sleep);
    loop {
        let state = *rx.borrow_and_update();
        if state == JobState::Cancelling {
            return false;
        }
        tokio::select! {
            _ = &mut sleep => return true,
            changed = rx.changed() => {
                if changed.is_err() {
                    (&mut sleep).await;
                    return true;
                }
            }
        }
    }
}
