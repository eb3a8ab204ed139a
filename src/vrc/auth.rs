//! 登录、二次验证、会话恢复

use crate::vrc::error::{ApiError, AuthError};
use crate::vrc::friend::models::CurrentUser;
use crate::vrc::friend::types::{CurrentUserResp, TwoFactorCodeReq, TwoFactorVerifyResp};
use crate::vrc::serialization::basic_auth_header;
use crate::vrc::session::{cookie_pairs, SessionStore};
use crate::vrc::types::{extract_error_message, handle_http_response};
use reqwest::cookie::{CookieStore, Jar};
use reqwest::header::AUTHORIZATION;
use reqwest::Url;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// 二次验证方式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TwoFactorMethod {
    /// 验证器 App
    Totp,
    /// 邮件验证码
    EmailOtp,
    /// 恢复码
    Otp,
}

impl TwoFactorMethod {
    /// 优先 totp，其次邮件，最后恢复码
    pub fn pick(methods: &[String]) -> Option<Self> {
        let has = |name: &str| methods.iter().any(|m| m.eq_ignore_ascii_case(name));
        if has("totp") {
            Some(Self::Totp)
        } else if has("emailOtp") {
            Some(Self::EmailOtp)
        } else if has("otp") {
            Some(Self::Otp)
        } else {
            None
        }
    }

    fn verify_path(self) -> &'static str {
        match self {
            Self::Totp => "auth/twofactorauth/totp/verify",
            Self::EmailOtp => "auth/twofactorauth/emailotp/verify",
            Self::Otp => "auth/twofactorauth/otp/verify",
        }
    }
}

/// 登录返回 401 时区分二次验证挑战和凭据错误
///
/// 部分账号的二次验证挑战以 401 返回，消息中带 "Two-Factor"，此时按 totp 处理
fn classify_unauthorized(body: &str) -> AuthError {
    let message = extract_error_message(body);
    if message.to_ascii_lowercase().contains("two-factor") {
        AuthError::TwoFactorRequired {
            methods: vec!["totp".to_string()],
        }
    } else {
        AuthError::InvalidCredentials(message)
    }
}

/// 认证网关：持有带 cookie jar 的 HTTP 客户端，好友 API 共用同一个客户端
pub struct AuthGateway {
    client: reqwest::Client,
    jar: Arc<Jar>,
    api_base_url: String,
    api_url: Url,
    session: SessionStore,
    pending_two_factor: Option<TwoFactorMethod>,
    current_user: Option<CurrentUser>,
}

impl AuthGateway {
    pub fn new(
        api_base_url: &str,
        user_agent: &str,
        request_timeout: Duration,
        session: SessionStore,
    ) -> Result<Self, ApiError> {
        let api_url = Url::parse(api_base_url)
            .map_err(|e| ApiError::InvalidUrl(format!("{}: {}", api_base_url, e)))?;
        let jar = Arc::new(Jar::default());
        let client = reqwest::ClientBuilder::new()
            .user_agent(user_agent)
            .cookie_provider(jar.clone())
            .timeout(request_timeout)
            .build()?;

        Ok(Self {
            client,
            jar,
            api_base_url: api_base_url.trim_end_matches('/').to_string(),
            api_url,
            session,
            pending_two_factor: None,
            current_user: None,
        })
    }

    /// 共享的 HTTP 客户端（已带 User-Agent 和 cookie）
    pub fn http_client(&self) -> reqwest::Client {
        self.client.clone()
    }

    pub fn current_user(&self) -> Option<&CurrentUser> {
        self.current_user.as_ref()
    }

    pub fn pending_two_factor(&self) -> Option<TwoFactorMethod> {
        self.pending_two_factor
    }

    /// 用户名密码登录；需要二次验证时返回 `TwoFactorRequired` 并记住验证方式
    pub async fn login(&mut self, username: &str, password: &str) -> Result<CurrentUser, AuthError> {
        info!("[Auth] 🔐 正在登录: {}", username);
        self.pending_two_factor = None;

        let url = format!("{}/auth/user", self.api_base_url);
        let response = self
            .client
            .get(&url)
            .header(AUTHORIZATION, basic_auth_header(username, password))
            .send()
            .await
            .map_err(ApiError::from)?;

        if response.status() == reqwest::StatusCode::UNAUTHORIZED {
            let body = response.text().await.unwrap_or_default();
            let err = classify_unauthorized(&body);
            match &err {
                AuthError::TwoFactorRequired { methods } => {
                    info!("[Auth] 🔑 需要二次验证（401）: {:?}", methods);
                    self.pending_two_factor = TwoFactorMethod::pick(methods);
                }
                _ => warn!("[Auth] ❌ 用户名或密码错误: {}", err),
            }
            return Err(err);
        }

        match handle_http_response::<CurrentUserResp>(response, "登录").await? {
            CurrentUserResp::TwoFactor {
                requires_two_factor_auth,
            } => {
                info!("[Auth] 🔑 需要二次验证: {:?}", requires_two_factor_auth);
                match TwoFactorMethod::pick(&requires_two_factor_auth) {
                    Some(method) => {
                        self.pending_two_factor = Some(method);
                        Err(AuthError::TwoFactorRequired {
                            methods: requires_two_factor_auth,
                        })
                    }
                    None => Err(AuthError::TwoFactorFailed(format!(
                        "不支持的二次验证方式: {:?}",
                        requires_two_factor_auth
                    ))),
                }
            }
            CurrentUserResp::User(user) => Ok(self.finish_login(user)),
        }
    }

    /// 提交二次验证码；空验证码视为用户取消
    pub async fn submit_2fa_code(&mut self, code: &str) -> Result<CurrentUser, AuthError> {
        let code = code.trim();
        if code.is_empty() {
            self.pending_two_factor = None;
            info!("[Auth] 二次验证已取消");
            return Err(AuthError::TwoFactorCancelled);
        }
        let method = self
            .pending_two_factor
            .ok_or(AuthError::NoPendingTwoFactor)?;

        let url = format!("{}/{}", self.api_base_url, method.verify_path());
        debug!("[Auth]   二次验证 URL: {}", url);
        let response = self
            .client
            .post(&url)
            .json(&TwoFactorCodeReq {
                code: code.to_string(),
            })
            .send()
            .await
            .map_err(ApiError::from)?;

        let verified = match handle_http_response::<TwoFactorVerifyResp>(response, "二次验证").await
        {
            Ok(resp) => resp.verified,
            Err(ApiError::Http { status, message }) if status == 400 || status == 401 => {
                return Err(AuthError::TwoFactorFailed(message));
            }
            Err(e) => return Err(e.into()),
        };
        if !verified {
            warn!("[Auth] ❌ 二次验证失败");
            return Err(AuthError::TwoFactorFailed("验证码错误".to_string()));
        }

        self.pending_two_factor = None;
        match self.fetch_current_user().await? {
            CurrentUserResp::User(user) => Ok(self.finish_login(user)),
            CurrentUserResp::TwoFactor { .. } => Err(AuthError::TwoFactorFailed(
                "验证后仍要求二次验证".to_string(),
            )),
        }
    }

    /// 使用保存的 cookie 静默登录
    pub async fn restore_session(&mut self) -> Result<CurrentUser, AuthError> {
        let header = self
            .session
            .load()
            .ok_or_else(|| AuthError::SessionNotRestored("没有保存的会话".to_string()))?;

        for pair in cookie_pairs(&header) {
            self.jar
                .add_cookie_str(&format!("{}; Path=/", pair), &self.api_url);
        }

        match self.fetch_current_user().await {
            Ok(CurrentUserResp::User(user)) => {
                info!("[Auth] ✅ 会话恢复成功: {}", user.display_name);
                Ok(self.finish_login(user))
            }
            Ok(CurrentUserResp::TwoFactor { .. }) => Err(AuthError::SessionNotRestored(
                "会话已过期，需要重新二次验证".to_string(),
            )),
            Err(e) => {
                warn!("[Auth] 会话恢复失败: {}", e);
                Err(AuthError::SessionNotRestored(e.to_string()))
            }
        }
    }

    /// 清除本地会话
    pub fn logout(&mut self) {
        self.session.clear();
        self.current_user = None;
        self.pending_two_factor = None;
        info!("[Auth] 👋 已退出登录");
    }

    async fn fetch_current_user(&self) -> Result<CurrentUserResp, ApiError> {
        let url = format!("{}/auth/user", self.api_base_url);
        let response = self.client.get(&url).send().await?;
        handle_http_response(response, "获取当前用户").await
    }

    fn finish_login(&mut self, user: CurrentUser) -> CurrentUser {
        info!("[Auth] ✅ 登录成功: {} ({})", user.display_name, user.id);
        self.persist_session();
        self.current_user = Some(user.clone());
        user
    }

    fn persist_session(&self) {
        let Some(value) = self.jar.cookies(&self.api_url) else {
            debug!("[Auth] 没有可保存的 cookie");
            return;
        };
        match value.to_str() {
            Ok(header) => self.session.save(header),
            Err(e) => warn!("[Auth] cookie 不是合法字符串，跳过保存: {}", e),
        }
    }
}
