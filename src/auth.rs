//! Basic auth against `m_user`, followed by the authority path check.

mod password;
mod permission;

use axum::{
    extract::{FromRef, FromRequestParts},
    http::{header, request::Parts, HeaderMap},
};
use base64::{engine::general_purpose::STANDARD, Engine};
use sqlx::SqlitePool;
use tower_sessions::Session;

use crate::{appresult::AppError, entities::User, repos};

pub use password::convert_password;
pub use permission::{check_permission, is_permitted, ADMINISTRATOR, GENERAL_USER};

/// Credentials from an `Authorization: Basic` header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BasicCredentials {
    pub username: String,
    pub password: String,
}

impl BasicCredentials {
    pub fn from_headers(headers: &HeaderMap) -> Option<Self> {
        let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
        Self::decode(value)
    }

    pub fn decode(header_value: &str) -> Option<Self> {
        let (scheme, encoded) = header_value.trim().split_once(' ')?;
        if !scheme.eq_ignore_ascii_case("basic") {
            return None;
        }

        let decoded = String::from_utf8(STANDARD.decode(encoded.trim()).ok()?).ok()?;
        let (username, password) = decoded.split_once(':')?;
        if username.is_empty() {
            return None;
        }

        Some(Self {
            username: username.to_owned(),
            password: password.to_owned(),
        })
    }
}

/// Session flag set by `/logout`; the next request is challenged once.
pub const LOGGED_OUT: &str = "logged_out";

/// The authenticated user, already checked against the path table.
#[derive(Debug, Clone)]
pub struct LoginUser(pub User);

pub async fn authenticate(db_pool: &SqlitePool, credentials: &BasicCredentials) -> Result<User, AppError> {
    let hashed = convert_password(&credentials.password);

    match repos::user::find_by_address(db_pool, &credentials.username).await? {
        Some(user) if !user.audit.del_flag && user.hashed_password == hashed => Ok(user),
        _ => Err(AppError::Unauthenticated),
    }
}

impl<S> FromRequestParts<S> for LoginUser
where
    SqlitePool: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        if let Some(user) = parts.extensions.get::<LoginUser>() {
            return Ok(user.clone());
        }

        if let Ok(session) = Session::from_request_parts(parts, state).await {
            if session.remove::<bool>(LOGGED_OUT).await?.unwrap_or(false) {
                return Err(AppError::Unauthenticated);
            }
        }

        let credentials = BasicCredentials::from_headers(&parts.headers).ok_or(AppError::Unauthenticated)?;
        let db_pool = SqlitePool::from_ref(state);
        let user = authenticate(&db_pool, &credentials).await?;

        check_permission(&user, parts.uri.path())?;

        let login_user = LoginUser(user);
        parts.extensions.insert(login_user.clone());
        Ok(login_user)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;

    #[test]
    fn decodes_basic_header() {
        // admin@example.com:se:cret
        let credentials = BasicCredentials::decode("Basic YWRtaW5AZXhhbXBsZS5jb206c2U6Y3JldA==").unwrap();
        assert_eq!(credentials.username, "admin@example.com");
        assert_eq!(credentials.password, "se:cret");
    }

    #[test]
    fn rejects_other_schemes_and_garbage() {
        assert!(BasicCredentials::decode("Bearer abc").is_none());
        assert!(BasicCredentials::decode("Basic !!!").is_none());
        // ":nouser"
        assert!(BasicCredentials::decode("Basic Om5vdXNlcg==").is_none());
    }

    #[tokio::test]
    async fn authenticate_compares_digests() {
        let db_pool = db::connect("sqlite::memory:", 1).await.unwrap();
        db::reset(&db_pool).await.unwrap();

        let good = BasicCredentials {
            username: "admin@example.com".into(),
            password: "admin".into(),
        };
        assert_eq!(authenticate(&db_pool, &good).await.unwrap().authority_code, ADMINISTRATOR);

        let bad = BasicCredentials { password: "nope".into(), ..good.clone() };
        assert!(matches!(authenticate(&db_pool, &bad).await, Err(AppError::Unauthenticated)));

        let unknown = BasicCredentials { username: "ghost@example.com".into(), ..good.clone() };
        assert!(matches!(authenticate(&db_pool, &unknown).await, Err(AppError::Unauthenticated)));

        sqlx::query("UPDATE m_user SET del_flag = 1 WHERE mail_address = 'admin@example.com'")
            .execute(&db_pool)
            .await
            .unwrap();
        assert!(matches!(authenticate(&db_pool, &good).await, Err(AppError::Unauthenticated)));
    }
}
