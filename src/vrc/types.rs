use crate::vrc::error::ApiError;
use serde::Deserialize;
use tracing::{debug, error, info};

/// VRChat API 默认地址
pub const DEFAULT_API_BASE_URL: &str = "https://api.vrchat.cloud/api/1";

/// 按 VRChat API 规范标识本程序
pub const APP_USER_AGENT: &str =
    "VRChatUnfriendManager/1.1 github.com/vrc-friend-manager/vrc-friend-manager-rust";

/// VRChat 错误响应体：`{"error": {"message": "...", "status_code": 401}}`
#[derive(Debug, Deserialize)]
pub struct ApiErrorBody {
    pub error: ApiErrorDetail,
}

#[derive(Debug, Deserialize)]
pub struct ApiErrorDetail {
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub status_code: Option<u16>,
}

/// 从错误响应中提取可读信息，无法解析时返回原始 body
pub fn extract_error_message(body: &str) -> String {
    match serde_json::from_str::<ApiErrorBody>(body) {
        Ok(b) if !b.error.message.is_empty() => b.error.message,
        _ => body.trim().to_string(),
    }
}

/// 通用 HTTP 响应处理：读取 body，非 2xx 转为 `ApiError::Http`，2xx 反序列化为 `T`
pub async fn handle_http_response<T: serde::de::DeserializeOwned>(
    response: reqwest::Response,
    operation_name: &str,
) -> Result<T, ApiError> {
    let status = response.status();

    // 读取 body bytes（只能读取一次）
    let body_bytes = response.bytes().await?;
    let body_str = String::from_utf8_lossy(&body_bytes);
    debug!("[HTTP] {}响应 Body: {}", operation_name, body_str);

    if !status.is_success() {
        let message = extract_error_message(&body_str);
        error!(
            "[HTTP] {}请求失败，HTTP状态: {}, 信息: {}",
            operation_name, status, message
        );
        return Err(ApiError::Http {
            status: status.as_u16(),
            message,
        });
    }
    info!("[HTTP] {}请求成功，HTTP状态: {}", operation_name, status);

    serde_json::from_slice(&body_bytes).map_err(|e| {
        error!(
            "[HTTP] {}反序列化失败: {:?}\n原始响应: {}",
            operation_name, e, body_str
        );
        ApiError::Decode(e.to_string())
    })
}

/// 只关心状态码的请求（unfriend / friendRequest），body 内容忽略
pub async fn handle_empty_response(
    response: reqwest::Response,
    operation_name: &str,
) -> Result<(), ApiError> {
    let status = response.status();
    if status.is_success() {
        debug!("[HTTP] {}请求成功，HTTP状态: {}", operation_name, status);
        return Ok(());
    }
    let body = response.text().await.unwrap_or_default();
    let message = extract_error_message(&body);
    error!(
        "[HTTP] {}请求失败，HTTP状态: {}, 信息: {}",
        operation_name, status, message
    );
    Err(ApiError::Http {
        status: status.as_u16(),
        message,
    })
}
