//! 好友 API DTO（请求和响应结构体）

use crate::vrc::friend::models::CurrentUser;
use serde::{Deserialize, Serialize};

/// `GET /auth/user` 的响应：要么是用户信息，要么要求二次验证
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum CurrentUserResp {
    TwoFactor {
        #[serde(rename = "requiresTwoFactorAuth")]
        requires_two_factor_auth: Vec<String>,
    },
    User(CurrentUser),
}

/// 二次验证请求
#[derive(Debug, Clone, Serialize)]
pub struct TwoFactorCodeReq {
    pub code: String,
}

/// 二次验证响应
#[derive(Debug, Clone, Deserialize)]
pub struct TwoFactorVerifyResp {
    #[serde(default)]
    pub verified: bool,
}

/// 好友分页查询参数
#[derive(Debug, Clone, Serialize)]
pub struct FriendsPageQuery {
    pub offset: usize,
    pub n: usize,
    pub offline: bool,
}

/// 收藏分页查询参数
#[derive(Debug, Clone, Serialize)]
pub struct FavoritesPageQuery {
    #[serde(rename = "type")]
    pub favorite_type: &'static str,
    pub n: usize,
    pub offset: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn current_user_resp_detects_two_factor() {
        let body = r#"{"requiresTwoFactorAuth":["totp","otp"]}"#;
        match serde_json::from_str::<CurrentUserResp>(body).unwrap() {
            CurrentUserResp::TwoFactor {
                requires_two_factor_auth,
            } => assert_eq!(requires_two_factor_auth, vec!["totp", "otp"]),
            other => panic!("unexpected: {:?}", other),
        }

        let body = r#"{"id":"usr_me","displayName":"Me","bio":""}"#;
        match serde_json::from_str::<CurrentUserResp>(body).unwrap() {
            CurrentUserResp::User(u) => assert_eq!(u.display_name, "Me"),
            other => panic!("unexpected: {:?}", other),
        }
    }
}
