//! Room chat: the page, its history API and the websocket fan-out.

mod page;
mod registry;
mod ws;

use axum::{routing::get, Router};

use crate::AppState;

pub use registry::{ChatPayload, ChatRegistry, Connection, ConnectionId, Presence};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/chat/{room_id}/form", get(page::chat_form))
        .route("/chat/{room_id}/api", get(page::chat_messages))
        .route("/ws/{room_id}/{user_id}/{user_name}", get(ws::room_ws))
}
