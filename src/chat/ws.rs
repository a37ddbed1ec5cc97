use axum::{
    debug_handler,
    extract::{
        ws::{Message, WebSocketUpgrade},
        Path, State,
    },
    response::{IntoResponse, Response},
};
use futures_util::{SinkExt, StreamExt};
use sqlx::SqlitePool;
use tracing::{debug, error, warn};

use crate::{
    chat::{ChatRegistry, Connection},
    repos, services, AppError, AppResult,
};

/// Inbound text frames are stored and then broadcast to the room as
/// `{"sender", "message"}`. The sender is the stored user name; the name
/// segment of the path is only logged.
#[debug_handler(state = crate::AppState)]
pub(crate) async fn room_ws(
    Path((room_id, user_id, path_name)): Path<(i64, i64, String)>,
    State(db_pool): State<SqlitePool>,
    State(chat): State<ChatRegistry>,
    ws: WebSocketUpgrade,
) -> AppResult<Response> {
    let Some(member) = repos::room::find_active_member(&db_pool, room_id, user_id).await? else {
        warn!("user {user_id} is not an active member of room {room_id}");
        return Err(AppError::NotPermitted);
    };
    let user_name = member.user_name;
    if user_name != path_name {
        debug!("room {room_id}: user {user_id} connected as {path_name:?}, sending as {user_name:?}");
    }

    Ok(ws.on_upgrade(async move |stream| {
        let Connection { id, mut inbox } = chat.connect(room_id, user_id, &user_name);
        let (mut sender, mut receiver) = stream.split();

        let writer = tokio::spawn(async move {
            while let Some(payload) = inbox.recv().await {
                let Ok(text) = serde_json::to_string(&payload) else {
                    continue;
                };
                if sender.send(Message::Text(text.into())).await.is_err() {
                    break;
                }
            }
        });

        while let Some(Ok(message)) = receiver.next().await {
            let text = match message {
                Message::Text(text) => text,
                Message::Close(_) => break,
                _ => continue,
            };

            match services::room::entry_message(&db_pool, room_id, user_id, text.as_str()).await {
                Ok(_) => {
                    let delivered = chat.broadcast(room_id, &user_name, text.as_str()).await;
                    debug!("room {room_id}: message from {user_name} delivered to {delivered}");
                }
                Err(err) => error!("room {room_id}: message from {user_name} not stored: {err}"),
            }
        }

        chat.disconnect(id);
        writer.abort();
    })
    .into_response())
}
