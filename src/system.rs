//! Top page, logout, health check and the development database reset.

use std::sync::Arc;

use axum::{
    debug_handler,
    extract::State,
    response::{Html, IntoResponse, Redirect, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};
use sqlx::SqlitePool;
use tower_sessions::Session;
use tracing::{info, warn};

use crate::{
    auth::{LoginUser, LOGGED_OUT},
    config::Config,
    db, include_res, res, AppResult, AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(root))
        .route("/logout", get(logout))
        .route("/healthcheck", get(healthcheck))
        .route("/init_database", get(init_database))
        .route("/init/run", post(init_run))
}

#[debug_handler(state = crate::AppState)]
async fn root(_login_user: LoginUser) -> Redirect {
    Redirect::to("/room/list")
}

/// Marks the session so the next request asks for credentials again.
#[debug_handler]
async fn logout(session: Session) -> AppResult<Html<String>> {
    session.insert(LOGGED_OUT, true).await?;

    Ok(res::system_info(
        "Logged out",
        "You have been logged out. Close the browser or log in again.",
    ))
}

#[debug_handler]
async fn healthcheck() -> Json<Value> {
    Json(json!({ "message": "healthcheck" }))
}

fn not_allowed() -> Response {
    res::system_info(
        "Operation not allowed",
        "The database can only be initialized in the development environment.",
    )
    .into_response()
}

#[debug_handler(state = crate::AppState)]
async fn init_database(State(config): State<Arc<Config>>) -> Response {
    if !config.app_env.is_dev() {
        warn!("database init page requested outside dev");
        return not_allowed();
    }
    Html(include_res!(str, "/pages/init.html")).into_response()
}

#[debug_handler(state = crate::AppState)]
async fn init_run(State(config): State<Arc<Config>>, State(db_pool): State<SqlitePool>) -> AppResult<Response> {
    if !config.app_env.is_dev() {
        warn!("database init requested outside dev");
        return Ok(not_allowed());
    }

    db::reset(&db_pool).await?;
    info!("database initialized");

    Ok(res::system_info("Database initialized", "The database has been created.").into_response())
}
