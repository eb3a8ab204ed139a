use base64::Engine;
use serde::{Deserialize, Deserializer};

/// 反序列化数组字段，处理 null 值
pub fn deserialize_vec_or_null<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    let opt = Option::<Vec<T>>::deserialize(deserializer)?;
    Ok(opt.unwrap_or_default())
}

/// 反序列化可能为 null / 空字符串的时间字段，统一为 `Option<String>`
pub fn deserialize_blank_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let opt = Option::<String>::deserialize(deserializer)?;
    Ok(opt.filter(|s| !s.trim().is_empty()))
}

/// 保存的凭据编码：`base64(username:password)`
///
/// 只是编码，不是加密；配置文件可读即可还原密码。
pub fn encode_credentials(username: &str, password: &str) -> String {
    base64::engine::general_purpose::STANDARD.encode(format!("{}:{}", username, password))
}

/// 还原 [`encode_credentials`] 的结果，格式不对时返回 None
pub fn decode_credentials(encoded: &str) -> Option<(String, String)> {
    let bytes = base64::engine::general_purpose::STANDARD
        .decode(encoded.trim())
        .ok()?;
    let text = String::from_utf8(bytes).ok()?;
    let (user, pass) = text.split_once(':')?;
    Some((user.to_string(), pass.to_string()))
}

/// HTTP Basic 认证头：用户名和密码先做 URL 编码再 base64
pub fn basic_auth_header(username: &str, password: &str) -> String {
    let raw = format!(
        "{}:{}",
        urlencoding::encode(username),
        urlencoding::encode(password)
    );
    format!(
        "Basic {}",
        base64::engine::general_purpose::STANDARD.encode(raw)
    )
}
