use axum::{
    debug_handler,
    extract::{Path, State},
    response::Html,
    Json,
};
use serde_json::{json, Value};
use sqlx::SqlitePool;

use crate::{auth::LoginUser, chat::ChatRegistry, include_res, res, services, AppResult};

#[debug_handler(state = crate::AppState)]
pub(crate) async fn chat_form(
    LoginUser(login_user): LoginUser,
    State(db_pool): State<SqlitePool>,
    Path(room_id): Path<i64>,
) -> AppResult<Html<String>> {
    let room = services::room::get_room(&db_pool, room_id, &login_user).await?;
    let title = room.room_name.as_deref().unwrap_or("Chat");

    let content = include_res!(str, "/pages/chat.html")
        .replace("{room_id}", &room.id.to_string())
        .replace("{user_id}", &login_user.id.to_string())
        .replace("{remarks}", &res::escape(room.remarks.as_deref().unwrap_or_default()))
        .replace("{user_name}", &res::escape(&login_user.user_name));

    Ok(res::layout(title, &login_user.user_name, &content))
}

/// `{"messages": [...], "present": [...]}`, messages in posting order.
#[debug_handler(state = crate::AppState)]
pub(crate) async fn chat_messages(
    LoginUser(login_user): LoginUser,
    State(db_pool): State<SqlitePool>,
    State(chat): State<ChatRegistry>,
    Path(room_id): Path<i64>,
) -> AppResult<Json<Value>> {
    let messages = services::room::messages(&db_pool, room_id, &login_user).await?;
    let present = chat.presence(room_id).await;

    Ok(Json(json!({ "messages": messages, "present": present })))
}
