//! Request hardening applied to every route.

use std::sync::Arc;

use axum::{
    body::Body,
    extract::State,
    http::{header, HeaderValue, Method, Request},
    middleware::Next,
    response::{IntoResponse, Response},
};
use tower_sessions::cookie::{Cookie, SameSite};
use tracing::{info, warn};

use crate::{auth::BasicCredentials, config::Config, paging::SearchCookies, AppError};

/// Cookie that only a same-site page load can have planted.
pub const STRICT_COOKIE: &str = "strict";

const CONTENT_SECURITY_POLICY: &str = "default-src 'self'; img-src 'self' data:; \
     style-src 'self' 'unsafe-inline'; script-src 'self' 'unsafe-inline'; \
     script-src-attr 'self' 'unsafe-inline'";

fn strict_cookie(secure: bool) -> Cookie<'static> {
    Cookie::build((STRICT_COOKIE, "1"))
        .path("/")
        .same_site(SameSite::Strict)
        .http_only(true)
        .secure(secure)
        .max_age(time::Duration::days(1))
        .build()
}

/// Access log, strict cookie gate for state-changing methods, and the
/// security headers.
pub async fn security_middleware(
    State(config): State<Arc<Config>>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_owned();
    let user = BasicCredentials::from_headers(request.headers())
        .map(|credentials| credentials.username)
        .unwrap_or_else(|| "-".to_owned());
    info!("{method} {path} user={user}");

    let mut response = if matches!(method, Method::POST | Method::DELETE) && !has_strict_cookie(&request) {
        warn!("{method} {path} rejected: missing {STRICT_COOKIE} cookie");
        AppError::NotPermitted.into_response()
    } else {
        next.run(request).await
    };

    let headers = response.headers_mut();
    if let Ok(value) = HeaderValue::from_str(&strict_cookie(config.secure_cookies()).to_string()) {
        headers.append(header::SET_COOKIE, value);
    }
    headers.insert(
        header::CONTENT_SECURITY_POLICY,
        HeaderValue::from_static(CONTENT_SECURITY_POLICY),
    );
    headers.insert(header::X_FRAME_OPTIONS, HeaderValue::from_static("SAMEORIGIN"));

    response
}

fn has_strict_cookie(request: &Request<Body>) -> bool {
    let values = request
        .headers()
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok());
    !SearchCookies::from_header_values(values).text(STRICT_COOKIE).is_empty()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strict_cookie_attributes() {
        let rendered = strict_cookie(true).to_string();
        assert!(rendered.starts_with("strict=1"));
        assert!(rendered.contains("SameSite=Strict"));
        assert!(rendered.contains("HttpOnly"));
        assert!(rendered.contains("Secure"));
        assert!(rendered.contains("Max-Age=86400"));

        assert!(!strict_cookie(false).to_string().contains("Secure"));
    }

    #[test]
    fn strict_cookie_is_detected_among_others() {
        let request = Request::builder()
            .method(Method::POST)
            .header(header::COOKIE, "sel_row_max=10; strict=1")
            .body(Body::empty())
            .unwrap();
        assert!(has_strict_cookie(&request));

        let bare = Request::builder().method(Method::POST).body(Body::empty()).unwrap();
        assert!(!has_strict_cookie(&bare));
    }
}
