//! VRChat 好友管理 CLI
//!
//! 登录（支持会话恢复与二次验证）、查看 / 过滤好友列表、备份、批量删除、从备份重新加好友。
//! 批量任务运行时在标准输入输入 `p` 暂停、`r` 恢复、`c` 取消、`s` 查看进度。

use anyhow::{anyhow, Context, Result};
use clap::{Args as ClapArgs, Parser, Subcommand, ValueEnum};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines, Stdin};
use tracing::{error, info, warn};
use vrc_friend_manager_rust::vrc::backup::read_backup;
use vrc_friend_manager_rust::vrc::batch::{
    BatchHandle, BatchListener, BatchSummary, DelayRange, JobState,
};
use vrc_friend_manager_rust::vrc::config::AppConfig;
use vrc_friend_manager_rust::vrc::error::AuthError;
use vrc_friend_manager_rust::vrc::friend::RosterListener;
use vrc_friend_manager_rust::vrc::roster::{
    FilterSortOptions, InactivityFilter, SortMode, TimeUnit,
};
use vrc_friend_manager_rust::vrc::{ClientConfig, VrcClient};

type StdinLines = Lines<BufReader<Stdin>>;

/// VRChat 好友管理 CLI
#[derive(Parser, Debug)]
#[command(name = "vrc-cli")]
#[command(about = "VRChat 好友管理 - 过滤、备份、限速批量删除 / 重新加好友", long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Command,

    /// 配置文件路径（默认: <系统配置目录>/vrc-friend-manager/config.json）
    #[arg(long)]
    config: Option<PathBuf>,

    /// 日志级别（默认: info,vrc_friend_manager_rust=debug）
    #[arg(long, default_value = "info,vrc_friend_manager_rust=debug")]
    log_level: String,

    /// 日志文件
    #[arg(long, default_value = "debug.log")]
    log_file: PathBuf,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// 登录并保存会话
    Login {
        #[arg(short, long)]
        username: Option<String>,
        /// 在配置文件中记住用户名和密码（仅 base64 编码，不安全）
        #[arg(long)]
        remember: bool,
    },
    /// 删除保存的会话和凭据
    Logout,
    /// 列出过滤排序后的好友
    List {
        #[command(flatten)]
        view: ViewArgs,
        /// 以 JSON 输出
        #[arg(long)]
        json: bool,
    },
    /// 将过滤后的好友备份为 JSON
    Backup {
        #[command(flatten)]
        view: ViewArgs,
        /// 备份目录
        #[arg(long, default_value = ".")]
        dir: PathBuf,
    },
    /// 批量删除好友
    Unfriend {
        #[command(flatten)]
        view: ViewArgs,
        #[command(flatten)]
        batch: BatchArgs,
        /// 选中过滤结果中的全部好友
        #[arg(long)]
        all: bool,
        /// 按用户 ID 选中（可重复）
        #[arg(long = "id")]
        ids: Vec<String>,
    },
    /// 从备份文件重新发送好友申请
    Readd {
        /// 备份文件
        #[arg(long)]
        backup: PathBuf,
        #[command(flatten)]
        batch: BatchArgs,
    },
}

#[derive(ClapArgs, Debug)]
struct ViewArgs {
    /// 排除收藏的好友（默认）
    #[arg(long, conflicts_with = "include_favorites")]
    exclude_favorites: bool,
    /// 在列表中显示收藏的好友，批量操作也可能选中它们
    #[arg(long)]
    include_favorites: bool,
    /// 只保留超过 N 个单位未上线的好友
    #[arg(long)]
    inactive: Option<String>,
    #[arg(long, value_enum, default_value_t = UnitArg::Months)]
    unit: UnitArg,
    #[arg(long, value_enum)]
    sort: Option<SortArg>,
    /// 把本次的过滤排序选项写回配置文件
    #[arg(long)]
    save: bool,
}

#[derive(ClapArgs, Debug)]
struct BatchArgs {
    /// 跳过确认
    #[arg(long)]
    yes: bool,
    /// 最小间隔（秒）
    #[arg(long)]
    min_delay: Option<u64>,
    /// 最大间隔（秒）
    #[arg(long)]
    max_delay: Option<u64>,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum UnitArg {
    Days,
    Months,
    Years,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum SortArg {
    Oldest,
    Newest,
    NameAsc,
    NameDesc,
}

impl ViewArgs {
    /// 命令行参数覆盖配置文件中的选项
    fn apply(&self, base: FilterSortOptions) -> FilterSortOptions {
        let unit = match self.unit {
            UnitArg::Days => TimeUnit::Days,
            UnitArg::Months => TimeUnit::Months,
            UnitArg::Years => TimeUnit::Years,
        };
        FilterSortOptions {
            exclude_favorites: match (self.exclude_favorites, self.include_favorites) {
                (true, _) => true,
                (_, true) => false,
                _ => base.exclude_favorites,
            },
            inactivity_filter: match &self.inactive {
                Some(input) => Some(InactivityFilter::from_input(input, unit)),
                None => base.inactivity_filter,
            },
            sort_mode: match self.sort {
                Some(SortArg::Oldest) => SortMode::OldestFirst,
                Some(SortArg::Newest) => SortMode::NewestFirst,
                Some(SortArg::NameAsc) => SortMode::NameAscending,
                Some(SortArg::NameDesc) => SortMode::NameDescending,
                None => base.sort_mode,
            },
        }
    }
}

impl BatchArgs {
    fn delay(&self, cfg: &AppConfig) -> DelayRange {
        DelayRange::from_secs(
            self.min_delay.unwrap_or(cfg.min_delay_secs),
            self.max_delay.unwrap_or(cfg.max_delay_secs),
        )
    }
}

/// 初始化日志（同时输出到 stdout 和文件）
fn init_logger(log_level: &str, log_file: &Path) {
    use std::fs::OpenOptions;
    use std::io;
    use tracing_subscriber::prelude::*;
    use tracing_subscriber::EnvFilter;

    // 优先使用环境变量 RUST_LOG（如果设置了），否则使用命令行参数
    let filter_layer =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));

    let stdout_layer = tracing_subscriber::fmt::layer()
        .with_writer(io::stdout)
        .with_file(true)
        .with_line_number(true)
        .with_target(false)
        .with_ansi(true);

    // 日志文件打不开时只输出到控制台
    let file = OpenOptions::new().create(true).append(true).open(log_file);
    let file_layer = file.as_ref().ok().and_then(|f| f.try_clone().ok()).map(|f| {
        tracing_subscriber::fmt::layer()
            .with_writer(std::sync::Mutex::new(f))
            .with_file(true)
            .with_line_number(true)
            .with_target(false)
            .with_ansi(false)
    });

    tracing_subscriber::registry()
        .with(filter_layer)
        .with(stdout_layer)
        .with(file_layer)
        .init();

    match file {
        Ok(_) => info!("[CLI] 📝 日志已同时输出到控制台和文件: {}", log_file.display()),
        Err(e) => warn!("[CLI] 无法打开日志文件 {}: {}", log_file.display(), e),
    }
}

struct CliRosterListener;

#[async_trait::async_trait]
impl RosterListener for CliRosterListener {
    async fn on_roster_refreshed(&self, total: usize, favorites: usize) {
        info!("[CLI/Friend] 👥 好友列表已刷新: 共 {} 个，收藏 {} 个", total, favorites);
    }

    async fn on_roster_refresh_failed(&self, error: String) {
        error!("[CLI/Friend] ❌ 好友列表刷新失败: {}", error);
    }
}

struct CliBatchListener;

#[async_trait::async_trait]
impl BatchListener for CliBatchListener {
    async fn on_item_started(&self, index: usize, total: usize, label: &str) {
        info!("[CLI/Batch] ({}/{}) 正在处理 {}...", index + 1, total, label);
    }

    async fn on_item_finished(&self, _index: usize, label: &str, error: Option<&str>) {
        match error {
            None => info!("[CLI/Batch] ✅ {} 成功", label),
            Some(e) => warn!("[CLI/Batch] ⚠️ {} 失败，跳过: {}", label, e),
        }
    }

    async fn on_waiting(&self, delay: Duration) {
        info!("[CLI/Batch] ⏳ 等待 {} 秒...", delay.as_secs());
    }

    async fn on_finished(&self, summary: &BatchSummary) {
        info!(
            "[CLI/Batch] 🏁 结束: 成功 {}/{}（已处理 {}）{}",
            summary.success_count,
            summary.total_count,
            summary.processed_count,
            if summary.cancelled { "，已取消" } else { "" }
        );
    }
}

async fn prompt(stdin: &mut StdinLines, message: &str) -> Result<String> {
    let mut stdout = tokio::io::stdout();
    stdout.write_all(message.as_bytes()).await?;
    stdout.flush().await?;
    let line = stdin
        .next_line()
        .await
        .context("读取标准输入失败")?
        .ok_or_else(|| anyhow!("标准输入已关闭"))?;
    Ok(line.trim().to_string())
}

/// 登录流程：先尝试恢复会话，再用保存的凭据，最后交互输入
///
/// 重新登录成功时返回本次使用的凭据
async fn ensure_logged_in(
    client: &mut VrcClient,
    cfg: &AppConfig,
    stdin: &mut StdinLines,
    username: Option<String>,
) -> Result<Option<(String, String)>> {
    if username.is_none() {
        match client.restore_session().await {
            Ok(user) => {
                info!("[CLI] ✅ 已恢复会话: {}", user.display_name);
                return Ok(None);
            }
            Err(e) => info!("[CLI] {}", e),
        }
    }

    let (username, password) = match (username, cfg.credentials()) {
        (None, Some(saved)) => saved,
        (Some(u), _) => {
            let p = prompt(stdin, "Password: ").await?;
            (u, p)
        }
        (None, None) => {
            let u = prompt(stdin, "Username: ").await?;
            let p = prompt(stdin, "Password: ").await?;
            (u, p)
        }
    };

    match client.login(&username, &password).await {
        Ok(user) => {
            info!("[CLI] ✅ 登录成功: {}", user.display_name);
            Ok(Some((username, password)))
        }
        Err(AuthError::TwoFactorRequired { methods }) => {
            let code = prompt(
                stdin,
                &format!("需要二次验证 ({})，请输入 6 位验证码（留空取消）: ", methods.join("/")),
            )
            .await?;
            let user = client.submit_2fa_code(&code).await?;
            info!("[CLI] ✅ 登录成功: {}", user.display_name);
            Ok(Some((username, password)))
        }
        Err(e) => Err(e.into()),
    }
}

async fn confirm(stdin: &mut StdinLines, message: &str, skip: bool) -> Result<bool> {
    if skip {
        return Ok(true);
    }
    let answer = prompt(stdin, &format!("{}（输入 yes 确认）: ", message)).await?;
    Ok(answer.eq_ignore_ascii_case("yes"))
}

/// 等待批量任务结束，期间响应标准输入的控制命令
async fn drive_batch(handle: BatchHandle, stdin: &mut StdinLines) -> BatchSummary {
    info!("[CLI] 💡 输入 p 暂停、r 恢复、c 取消、s 查看进度");
    let mut stdin_open = true;
    loop {
        tokio::select! {
            summary = handle.wait() => return summary,
            line = stdin.next_line(), if stdin_open => match line {
                Ok(Some(cmd)) => match cmd.trim() {
                    "p" => { handle.pause(); }
                    "r" => { handle.resume(); }
                    "c" => { handle.cancel(); }
                    "s" => {
                        let p = handle.progress();
                        info!(
                            "[CLI] 📊 {:?}: {}/{}（成功 {}），当前: {}",
                            p.state, p.completed, p.total, p.succeeded, p.current_label
                        );
                    }
                    other if !other.is_empty() => warn!("[CLI] 未知命令: {}", other),
                    _ => {}
                },
                Ok(None) | Err(_) => stdin_open = false,
            },
        }
    }
}

fn report(summary: &BatchSummary, verb: &str) {
    println!(
        "{} {}/{} 个好友（已处理 {}）{}",
        verb,
        summary.success_count,
        summary.total_count,
        summary.processed_count,
        if summary.cancelled { "，任务已取消" } else { "" }
    );
    for f in &summary.failures {
        println!("  失败: {} ({}) - {}", f.label, f.id, f.error);
    }
}

fn print_roster(client: &VrcClient) {
    for (i, f) in client.displayed().iter().enumerate() {
        println!(
            "{:>4}  {:<32} {:<26} {}",
            i,
            f.display_name,
            f.last_login.as_deref().unwrap_or("-"),
            f.id
        );
    }
    println!(
        "共 {} 个（全部 {}，收藏 {}）",
        client.displayed().len(),
        client.roster().len(),
        client.favorite_count()
    );
}

/// 登录、刷新、应用过滤选项
async fn load_roster(
    client: &mut VrcClient,
    cfg: &mut AppConfig,
    cfg_path: &Path,
    stdin: &mut StdinLines,
    view: &ViewArgs,
) -> Result<()> {
    ensure_logged_in(client, cfg, stdin, None).await?;
    let options = view.apply(cfg.filter);
    if view.save {
        cfg.filter = options;
        cfg.save_best_effort(cfg_path);
    }
    client.set_options(options);
    client.refresh().await?;
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // 初始化日志
    init_logger(&args.log_level, &args.log_file);

    let cfg_path = match args.config.clone() {
        Some(p) => p,
        None => AppConfig::default_path()?,
    };
    let mut cfg = AppConfig::load_or_default(&cfg_path);
    let session_path = cfg_path
        .parent()
        .map(|p| p.join("session"))
        .unwrap_or_else(|| PathBuf::from("session"));

    info!("[CLI] 🚀 VRChat 好友管理");
    info!("[CLI] ⚙️ 配置文件: {}", cfg_path.display());

    let mut client = VrcClient::new(ClientConfig::from_app_config(&cfg, session_path))?;
    client.set_roster_listener(Arc::new(CliRosterListener));
    client.set_batch_listener(Arc::new(CliBatchListener));

    let mut stdin = BufReader::new(tokio::io::stdin()).lines();

    match args.command {
        Command::Login { username, remember } => {
            let used = ensure_logged_in(&mut client, &cfg, &mut stdin, username).await?;
            if let (true, Some((u, p))) = (remember, used) {
                cfg.remember_credentials(&u, &p);
                cfg.save_best_effort(&cfg_path);
                warn!("[CLI] ⚠️ 凭据仅做 base64 编码保存在 {}", cfg_path.display());
            }
        }
        Command::Logout => {
            client.logout();
            cfg.forget_credentials();
            cfg.save_best_effort(&cfg_path);
            println!("已退出登录");
        }
        Command::List { view, json } => {
            load_roster(&mut client, &mut cfg, &cfg_path, &mut stdin, &view).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(client.displayed())?);
            } else {
                print_roster(&client);
            }
        }
        Command::Backup { view, dir } => {
            load_roster(&mut client, &mut cfg, &cfg_path, &mut stdin, &view).await?;
            let path = client.backup_displayed(&dir).await?;
            println!("备份成功: {}", path.display());
        }
        Command::Unfriend {
            view,
            batch,
            all,
            ids,
        } => {
            load_roster(&mut client, &mut cfg, &cfg_path, &mut stdin, &view).await?;
            if all {
                client.selection_mut().mark_all();
            }
            let indices: Vec<usize> = client
                .displayed()
                .iter()
                .enumerate()
                .filter(|(_, f)| ids.contains(&f.id))
                .map(|(i, _)| i)
                .collect();
            for i in indices {
                client.selection_mut().set(i, true);
            }

            let count = client.selection().marked_count();
            if count == 0 {
                println!("没有选中任何好友（使用 --all 或 --id）");
                return Ok(());
            }
            if !confirm(
                &mut stdin,
                &format!("确定要删除选中的 {} 个好友吗？此操作不可撤销", count),
                batch.yes,
            )
            .await?
            {
                println!("已取消");
                return Ok(());
            }

            client.set_delay(batch.delay(&cfg));
            let handle = client.start_unfriend()?;
            let summary = drive_batch(handle, &mut stdin).await;
            report(&summary, "成功删除");
        }
        Command::Readd { backup, batch } => {
            ensure_logged_in(&mut client, &cfg, &mut stdin, None).await?;
            let entries = read_backup(&backup).await?;
            if !confirm(
                &mut stdin,
                &format!("确定要向 {} 个用户发送好友申请吗？", entries.len()),
                batch.yes,
            )
            .await?
            {
                println!("已取消");
                return Ok(());
            }
            client.set_delay(batch.delay(&cfg));
            let handle = client.start_readd(entries)?;
            let summary = drive_batch(handle, &mut stdin).await;
            report(&summary, "成功发送好友申请");
        }
    }

    if client.batch_state() == JobState::Cancelled {
        info!("[CLI] 👋 任务已取消，程序退出");
    }
    Ok(())
}
