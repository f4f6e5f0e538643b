use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

/// Request body for user registration. Fields default to empty so a missing
/// field reports the same 400 as a blank one.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct RegisterRequest {
    pub email: String,
    pub phone: String,
    pub username: String,
    pub password: String,
}

/// Request body for login.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

/// Response returned after login and after the OAuth callback.
#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub token: String,
}

/// Account summary returned on registration.
#[derive(Debug, Serialize)]
pub struct RegisteredUser {
    pub id: i64,
    pub email: String,
    pub username: String,
    pub phone: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Serialize)]
pub struct RegisterResponse {
    pub message: String,
    pub user: RegisteredUser,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registered_user_serializes_without_secrets() {
        let user = RegisteredUser {
            id: 1,
            email: "a@x.com".into(),
            username: "alice".into(),
            phone: Some("123456789".into()),
            created_at: OffsetDateTime::UNIX_EPOCH,
        };
        let json = serde_json::to_string(&user).unwrap();
        assert!(json.contains("alice"));
        assert!(json.contains("a@x.com"));
        assert!(!json.contains("password"));
    }
}
