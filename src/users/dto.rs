use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use super::models::User;

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

/// Request body for user registration.
#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub name: Option<String>,
    /// Base64 encoded image bytes.
    #[serde(default)]
    pub avatar: Option<String>,
}

/// Request body for login.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct PaginationParams {
    pub offset: Option<i64>,
    pub limit: Option<i64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    pub offset: i64,
    pub limit: i64,
}

impl PaginationParams {
    pub const MAX_OFFSET: i64 = 10_000;
    pub const MAX_LIMIT: i64 = 1_000;

    pub fn validate(&self) -> Result<Pagination, String> {
        let offset = self.offset.unwrap_or(0);
        if !(0..=Self::MAX_OFFSET).contains(&offset) {
            return Err("invalid offset: parameter offset is out of range".into());
        }
        let limit = self.limit.unwrap_or(10);
        if !(1..=Self::MAX_LIMIT).contains(&limit) {
            return Err("invalid limit: parameter limit is out of range".into());
        }
        Ok(Pagination { offset, limit })
    }
}

/// Public part of the user returned on login.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserInfo {
    pub id: i64,
    pub name: String,
    pub username: String,
}

impl From<&User> for UserInfo {
    fn from(u: &User) -> Self {
        Self {
            id: u.id,
            name: u.name.clone(),
            username: u.username.clone(),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthToken {
    pub token: String,
    #[serde(with = "time::serde::rfc3339")]
    pub expires_at: OffsetDateTime,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub success: bool,
    pub message: String,
    pub user: UserInfo,
    pub token: AuthToken,
}

#[derive(Debug, Serialize)]
pub struct UserEnvelope {
    pub user: User,
}

#[derive(Debug, Serialize)]
pub struct UserList {
    pub users: Vec<User>,
    pub total: i64,
    pub offset: i64,
    pub limit: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn email_shape() {
        assert!(is_valid_email("a@b.co"));
        assert!(!is_valid_email("a@b"));
        assert!(!is_valid_email("a b@c.d"));
        assert!(!is_valid_email(""));
    }

    #[test]
    fn pagination_defaults_and_bounds() {
        let p = PaginationParams { offset: None, limit: None }.validate().unwrap();
        assert_eq!(p, Pagination { offset: 0, limit: 10 });

        assert!(PaginationParams { offset: Some(-1), limit: None }.validate().is_err());
        assert!(PaginationParams { offset: Some(10_001), limit: None }.validate().is_err());
        assert!(PaginationParams { offset: None, limit: Some(0) }.validate().is_err());
        assert!(PaginationParams { offset: None, limit: Some(1_001) }.validate().is_err());

        let p = PaginationParams { offset: Some(20), limit: Some(5) }.validate().unwrap();
        assert_eq!(p, Pagination { offset: 20, limit: 5 });
    }
}
