pub mod appresult;
pub mod auth;
pub mod chat;
pub mod config;
pub mod db;
pub mod entities;
pub mod export;
pub mod general;
pub mod paging;
pub mod repos;
pub mod res;
pub mod rooms;
pub mod security;
pub mod services;
pub mod system;
pub mod users;

use std::sync::Arc;

use axum::{extract::FromRef, middleware::from_fn_with_state, Router};
use sha2::{Digest, Sha512};
use sqlx::SqlitePool;
use tower_http::trace::TraceLayer;
use tower_sessions::{
    cookie::{Key, SameSite},
    Expiry, MemoryStore, SessionManagerLayer,
};

pub use appresult::{AppError, AppResult};
use chat::ChatRegistry;
use config::Config;

#[derive(Clone, FromRef)]
pub struct AppState {
    pub db_pool: SqlitePool,
    pub chat: ChatRegistry,
    pub config: Arc<Config>,
}

impl AppState {
    /// Must be called inside a tokio runtime; the chat registry task starts here.
    pub fn new(db_pool: SqlitePool, config: Config) -> Self {
        Self {
            db_pool,
            chat: ChatRegistry::spawn(),
            config: Arc::new(config),
        }
    }
}

pub fn app(state: AppState) -> Router {
    let key = Key::from(Sha512::digest(state.config.session_key.as_bytes()).as_slice());
    let session_layer = SessionManagerLayer::new(MemoryStore::default())
        .with_secure(state.config.secure_cookies())
        .with_same_site(SameSite::Lax)
        .with_expiry(Expiry::OnInactivity(time::Duration::hours(8)))
        .with_signed(key);

    Router::new()
        .merge(system::router())
        .merge(general::router())
        .merge(users::router())
        .merge(rooms::router())
        .merge(chat::router())
        .layer(from_fn_with_state(state.clone(), security::security_middleware))
        .with_state(state)
        .layer(session_layer)
        .layer(TraceLayer::new_for_http())
}
