//! 客户端核心实现模块
//!
//! 显式持有全部应用状态：认证网关、好友列表缓存、过滤选项、展示列表、选中状态、批量执行器。
//! 任何界面（CLI 或其他）都通过这里调用过滤排序和批量执行。

use crate::vrc::auth::AuthGateway;
use crate::vrc::backup::{self, BackupEntry};
use crate::vrc::batch::{
    BatchHandle, BatchListener, BatchRunner, DelayRange, FriendRequestAction, JobState,
    UnfriendAction,
};
use crate::vrc::config::AppConfig;
use crate::vrc::error::{AuthError, BatchStartError, RefreshError};
use crate::vrc::friend::{
    CurrentUser, FriendActions, FriendApi, FriendRecord, FriendService, RosterListener,
    RosterSource,
};
use crate::vrc::roster::{compute_displayed_roster, FilterSortOptions, Selection};
use crate::vrc::session::SessionStore;
use crate::vrc::types::APP_USER_AGENT;
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// 客户端配置
#[derive(Clone, Debug)]
pub struct ClientConfig {
    /// HTTP API 基础地址
    pub api_base_url: String,
    pub user_agent: String,
    pub request_timeout: Duration,
    /// 好友分页大小
    pub page_size: usize,
    /// 批量操作间隔
    pub delay: DelayRange,
    /// 会话 cookie 文件
    pub session_path: PathBuf,
}

impl ClientConfig {
    pub fn new(session_path: PathBuf) -> Self {
        Self::from_app_config(&AppConfig::default(), session_path)
    }

    pub fn from_app_config(cfg: &AppConfig, session_path: PathBuf) -> Self {
        Self {
            api_base_url: cfg.api_base_url.clone(),
            user_agent: APP_USER_AGENT.to_string(),
            request_timeout: Duration::from_secs(cfg.request_timeout_secs.max(1)),
            page_size: cfg.page_size,
            delay: cfg.delay_range(),
            session_path,
        }
    }
}

/// 好友管理客户端
pub struct VrcClient {
    config: ClientConfig,
    auth: AuthGateway,
    actions: Arc<dyn FriendActions>,
    friends: FriendService,
    options: FilterSortOptions,
    displayed: Vec<FriendRecord>,
    selection: Selection,
    runner: BatchRunner,
}

impl VrcClient {
    /// 创建客户端，好友 API 与认证网关共用同一个带 cookie 的 HTTP 客户端
    pub fn new(config: ClientConfig) -> Result<Self> {
        let auth = AuthGateway::new(
            &config.api_base_url,
            &config.user_agent,
            config.request_timeout,
            SessionStore::new(config.session_path.clone()),
        )
        .context("创建 HTTP 客户端失败")?;
        let api = Arc::new(FriendApi::new(
            auth.http_client(),
            config.api_base_url.trim_end_matches('/').to_string(),
            config.page_size,
        ));
        Ok(Self::with_parts(config, auth, api.clone(), api))
    }

    /// 使用指定的好友来源和写操作实现创建客户端
    pub fn with_parts(
        config: ClientConfig,
        auth: AuthGateway,
        source: Arc<dyn RosterSource>,
        actions: Arc<dyn FriendActions>,
    ) -> Self {
        Self {
            config,
            auth,
            actions,
            friends: FriendService::new(source),
            options: FilterSortOptions::default(),
            displayed: Vec::new(),
            selection: Selection::default(),
            runner: BatchRunner::new(),
        }
    }

    /// 注册好友列表监听器
    pub fn set_roster_listener(&mut self, listener: Arc<dyn RosterListener>) {
        self.friends.set_listener(listener);
    }

    /// 注册批量任务监听器（对之后启动的任务生效）
    pub fn set_batch_listener(&mut self, listener: Arc<dyn BatchListener>) {
        self.runner.set_listener(listener);
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// 修改批量操作间隔（对之后启动的任务生效）
    pub fn set_delay(&mut self, delay: DelayRange) {
        self.config.delay = delay;
    }

    // ========== 认证 ==========

    pub async fn login(&mut self, username: &str, password: &str) -> Result<CurrentUser, AuthError> {
        self.auth.login(username, password).await
    }

    pub async fn submit_2fa_code(&mut self, code: &str) -> Result<CurrentUser, AuthError> {
        self.auth.submit_2fa_code(code).await
    }

    pub async fn restore_session(&mut self) -> Result<CurrentUser, AuthError> {
        self.auth.restore_session().await
    }

    pub fn logout(&mut self) {
        self.auth.logout();
    }

    pub fn current_user(&self) -> Option<&CurrentUser> {
        self.auth.current_user()
    }

    // ========== 好友列表 ==========

    /// 重新拉取好友和收藏并重算展示列表；批量任务运行期间拒绝
    pub async fn refresh(&mut self) -> Result<(), RefreshError> {
        if self.runner.is_busy() {
            warn!("[Client] 批量任务运行中，忽略刷新请求");
            return Err(RefreshError::BatchActive);
        }
        self.friends.refresh().await?;
        self.recompute();
        Ok(())
    }

    pub fn roster(&self) -> &[FriendRecord] {
        self.friends.roster()
    }

    pub fn favorite_count(&self) -> usize {
        self.friends.favorites().len()
    }

    pub fn options(&self) -> &FilterSortOptions {
        &self.options
    }

    /// 修改过滤 / 排序选项，立即重算展示列表（选中状态清空）
    pub fn set_options(&mut self, options: FilterSortOptions) {
        self.options = options;
        self.recompute();
    }

    pub fn recompute(&mut self) {
        self.recompute_at(Utc::now());
    }

    pub fn recompute_at(&mut self, now: DateTime<Utc>) {
        self.displayed = compute_displayed_roster(
            self.friends.roster(),
            self.friends.favorites(),
            &self.options,
            now,
        );
        self.selection.reset(self.displayed.len());
        info!(
            "[Client] 📋 展示列表: {}/{}",
            self.displayed.len(),
            self.friends.roster().len()
        );
    }

    pub fn displayed(&self) -> &[FriendRecord] {
        &self.displayed
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    pub fn selection_mut(&mut self) -> &mut Selection {
        &mut self.selection
    }

    /// 将当前展示列表备份到 `dir`
    pub async fn backup_displayed(&self, dir: &Path) -> Result<PathBuf> {
        backup::write_backup(dir, &self.displayed).await
    }

    // ========== 批量操作 ==========

    /// 对选中的好友执行删除；目标在此刻拷贝为快照，之后刷新不影响任务
    pub fn start_unfriend(&self) -> Result<BatchHandle, BatchStartError> {
        let targets = self.selection.targets(&self.displayed);
        self.runner.start(
            targets,
            Arc::new(UnfriendAction::new(self.actions.clone())),
            self.config.delay,
        )
    }

    /// 对备份中的好友重新发送好友申请
    pub fn start_readd(&self, entries: Vec<BackupEntry>) -> Result<BatchHandle, BatchStartError> {
        let targets: Vec<FriendRecord> = entries.into_iter().map(FriendRecord::from).collect();
        self.runner.start(
            targets,
            Arc::new(FriendRequestAction::new(self.actions.clone())),
            self.config.delay,
        )
    }

    pub fn current_batch(&self) -> Option<BatchHandle> {
        self.runner.current()
    }

    pub fn batch_state(&self) -> JobState {
        self.runner.state()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vrc::error::ApiError;
    use crate::vrc::friend::service::tests::FakeRoster;
    use crate::vrc::roster::{InactivityFilter, SortMode, TimeUnit};
    use async_trait::async_trait;
    use chrono::TimeZone;
    use std::sync::{Mutex, Once};

    static INIT_LOGGER: Once = Once::new();

    fn init_test_logger() {
        INIT_LOGGER.call_once(|| {
            use tracing_subscriber::prelude::*;
            use tracing_subscriber::EnvFilter;

            let filter_layer =
                EnvFilter::new("info,vrc_friend_manager_rust=debug,hyper_util::client=info,reqwest=info");

            let fmt_layer = tracing_subscriber::fmt::layer()
                .with_file(true)
                .with_line_number(true)
                .with_target(false)
                .with_test_writer();

            let _ = tracing_subscriber::registry()
                .with(filter_layer)
                .with(fmt_layer)
                .try_init();
        });
    }

    /// 记录调用的写操作
    #[derive(Default)]
    struct RecordingActions {
        calls: Mutex<Vec<(String, String)>>,
    }

    #[async_trait]
    impl FriendActions for RecordingActions {
        async fn unfriend(&self, user_id: &str) -> Result<(), ApiError> {
            self.calls
                .lock()
                .unwrap()
                .push(("unfriend".into(), user_id.into()));
            Ok(())
        }

        async fn send_friend_request(&self, user_id: &str) -> Result<(), ApiError> {
            self.calls
                .lock()
                .unwrap()
                .push(("friend_request".into(), user_id.into()));
            Ok(())
        }
    }

    fn roster() -> Vec<FriendRecord> {
        vec![
            FriendRecord::new("usr_b", "Bob").with_last_login("2024-01-01T00:00:00Z"),
            FriendRecord::new("usr_a", "alice").with_last_login("2024-12-15T00:00:00Z"),
            FriendRecord::new("usr_c", "Carol"),
            FriendRecord::new("usr_fav", "Fave").with_last_login("2023-01-01T00:00:00Z"),
        ]
    }

    fn client(dir: &Path) -> (VrcClient, Arc<FakeRoster>, Arc<RecordingActions>) {
        init_test_logger();
        let mut config = ClientConfig::new(dir.join("session"));
        config.delay = DelayRange::from_secs(1, 1);
        let auth = AuthGateway::new(
            &config.api_base_url,
            &config.user_agent,
            config.request_timeout,
            SessionStore::new(config.session_path.clone()),
        )
        .unwrap();
        let source = Arc::new(FakeRoster::new(roster(), &["usr_fav"]));
        let actions = Arc::new(RecordingActions::default());
        let client = VrcClient::with_parts(config, auth, source.clone(), actions.clone());
        (client, source, actions)
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap()
    }

    #[tokio::test(start_paused = true)]
    async fn options_change_recomputes_and_clears_selection() {
        let dir = tempfile::tempdir().unwrap();
        let (mut client, _, _) = client(dir.path());
        client.refresh().await.unwrap();
        assert_eq!(client.displayed().len(), 3);
        assert_eq!(client.favorite_count(), 1);

        client.selection_mut().mark_all();
        client.set_options(FilterSortOptions {
            exclude_favorites: true,
            inactivity_filter: Some(InactivityFilter::new(3, TimeUnit::Months)),
            sort_mode: SortMode::NameAscending,
        });
        client.recompute_at(now());
        let names: Vec<_> = client
            .displayed()
            .iter()
            .map(|f| f.display_name.as_str())
            .collect();
        assert_eq!(names, vec!["Bob", "Carol"]);
        assert_eq!(client.selection().marked_count(), 0);
        assert_eq!(client.selection().len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn unfriend_uses_snapshot_and_blocks_refresh() {
        let dir = tempfile::tempdir().unwrap();
        let (mut client, source, actions) = client(dir.path());
        client.set_options(FilterSortOptions {
            sort_mode: SortMode::NameAscending,
            ..Default::default()
        });
        client.refresh().await.unwrap();

        // alice, Bob, Carol
        client.selection_mut().toggle(0);
        client.selection_mut().toggle(2);
        let handle = client.start_unfriend().unwrap();

        *source.friends.lock().unwrap() = vec![FriendRecord::new("usr_z", "Zed")];
        assert!(matches!(
            client.refresh().await,
            Err(RefreshError::BatchActive)
        ));

        let summary = handle.wait().await;
        assert_eq!(summary.success_count, 2);
        assert_eq!(
            *actions.calls.lock().unwrap(),
            vec![
                ("unfriend".to_string(), "usr_a".to_string()),
                ("unfriend".to_string(), "usr_c".to_string()),
            ]
        );

        client.refresh().await.unwrap();
        assert_eq!(client.displayed().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn default_options_never_unfriend_favorites() {
        let dir = tempfile::tempdir().unwrap();
        let (mut client, _, actions) = client(dir.path());
        client.set_options(AppConfig::default().filter);
        client.refresh().await.unwrap();

        client.selection_mut().mark_all();
        let summary = client.start_unfriend().unwrap().wait().await;
        assert_eq!(summary.success_count, 3);
        let calls = actions.calls.lock().unwrap();
        assert!(calls.iter().all(|(_, id)| id != "usr_fav"));
    }

    #[tokio::test(start_paused = true)]
    async fn including_favorites_must_be_explicit() {
        let dir = tempfile::tempdir().unwrap();
        let (mut client, _, _) = client(dir.path());
        client.set_options(FilterSortOptions {
            exclude_favorites: false,
            ..Default::default()
        });
        client.refresh().await.unwrap();
        assert_eq!(client.displayed().len(), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn nothing_marked_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let (mut client, _, _) = client(dir.path());
        client.refresh().await.unwrap();
        assert_eq!(
            client.start_unfriend().err(),
            Some(BatchStartError::NothingSelected)
        );
        assert_eq!(client.batch_state(), JobState::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn readd_sends_friend_requests_from_backup() {
        let dir = tempfile::tempdir().unwrap();
        let (mut client, _, actions) = client(dir.path());
        client.refresh().await.unwrap();

        let path = client.backup_displayed(dir.path()).await.unwrap();
        let entries = backup::read_backup(&path).await.unwrap();
        assert_eq!(entries.len(), 3);

        let handle = client.start_readd(entries).unwrap();
        let summary = handle.wait().await;
        assert_eq!(summary.processed_count, 3);
        assert!(actions
            .calls
            .lock()
            .unwrap()
            .iter()
            .all(|(kind, _)| kind == "friend_request"));
    }

    /// 需要真实账号：VRC_USERNAME / VRC_PASSWORD（账号需关闭二次验证）
    #[tokio::test]
    #[ignore]
    async fn live_login_and_refresh() -> Result<()> {
        init_test_logger();
        let username = std::env::var("VRC_USERNAME").context("缺少 VRC_USERNAME")?;
        let password = std::env::var("VRC_PASSWORD").context("缺少 VRC_PASSWORD")?;
        let dir = tempfile::tempdir()?;

        let mut client = VrcClient::new(ClientConfig::new(dir.path().join("session")))?;
        let user = client.login(&username, &password).await?;
        info!("✅ 登录成功: {}", user.display_name);

        client.refresh().await?;
        info!(
            "👥 好友 {} 个，收藏 {} 个，展示 {} 个",
            client.roster().len(),
            client.favorite_count(),
            client.displayed().len()
        );
        Ok(())
    }
}
