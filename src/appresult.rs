use axum::{
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::{config, res};

pub type AppResult<T> = Result<T, AppError>;

#[derive(Debug, Error)]
pub enum AppError {
    /// Basic auth missing or the credentials did not match.
    #[error("wrong mail address or password")]
    Unauthenticated,

    #[error("not authorized: {0}")]
    Unauthorized(String),

    /// Rejected by the path allow-list or the strict cookie gate.
    #[error("access not permitted")]
    NotPermitted,

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Unauthenticated => StatusCode::UNAUTHORIZED,
            AppError::Unauthorized(_) | AppError::NotPermitted => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        match self {
            AppError::Unauthenticated => (
                status,
                [(header::WWW_AUTHENTICATE, "Basic")],
                "wrong mail address or password",
            )
                .into_response(),
            AppError::Unauthorized(reason) => (
                status,
                res::system_info(
                    "Authorization error",
                    &format!(
                        "Your account is not allowed to use this system.\n\
                         Please contact the administrator with the error type below.\n\n\
                         Error type: {reason}"
                    ),
                ),
            )
                .into_response(),
            AppError::NotPermitted => (
                status,
                res::system_info("Access denied", "You do not have permission to open this page."),
            )
                .into_response(),
            AppError::NotFound(what) => (
                status,
                res::system_info("Not found", &format!("The requested {what} does not exist.")),
            )
                .into_response(),
            AppError::Internal(err) => {
                tracing::error!("unhandled error: {err:#}");

                let message = if config::app_env().is_dev() {
                    format!("{err:?}\n\n{}", err.backtrace())
                } else {
                    format!(
                        "Please contact the administrator and mention the time of occurrence ({}).",
                        res::timestamp_display(time::OffsetDateTime::now_utc())
                    )
                };

                (status, res::system_info("An unexpected error occurred", &message)).into_response()
            }
        }
    }
}

macro_rules! apperr_impl {
    ($E:ty) => {
        impl From<$E> for AppError {
            fn from(err: $E) -> Self {
                Self::Internal(anyhow::Error::from(err))
            }
        }
    };
}

apperr_impl!(tower_sessions::session::Error);

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => Self::NotFound("record"),
            err => Self::Internal(anyhow::Error::from(err)),
        }
    }
}

impl From<String> for AppError {
    fn from(err: String) -> Self {
        Self::Internal(anyhow::Error::msg(err))
    }
}

impl From<&str> for AppError {
    fn from(err: &str) -> Self {
        Self::Internal(anyhow::Error::msg(err.to_owned()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn statuses_follow_error_kind() {
        assert_eq!(AppError::Unauthenticated.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(AppError::NotPermitted.status(), StatusCode::FORBIDDEN);
        assert_eq!(AppError::Unauthorized("E01".into()).status(), StatusCode::FORBIDDEN);
        assert_eq!(AppError::from(sqlx::Error::RowNotFound).status(), StatusCode::NOT_FOUND);
        assert_eq!(AppError::from("boom").status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn unauthenticated_asks_for_basic_credentials() {
        let response = AppError::Unauthenticated.into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(response.headers()[header::WWW_AUTHENTICATE], "Basic");
    }
}
