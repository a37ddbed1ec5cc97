use axum::{
    debug_handler,
    extract::{Path, State},
    response::Html,
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use sqlx::SqlitePool;

use crate::{
    auth::LoginUser,
    entities::{Room, RoomDraft, User},
    include_res,
    res::{self, FormMode},
    services::{self, Entry},
    AppError, AppResult,
};

/// Body posted by the room entry page.
#[derive(Debug, Deserialize)]
pub(crate) struct RoomEntry {
    #[serde(default)]
    room_id: Option<String>,
    #[serde(default)]
    members: Vec<String>,
    #[serde(default)]
    room_name: Option<String>,
    #[serde(default)]
    remarks: Option<String>,
}

impl RoomEntry {
    fn into_parts(self) -> AppResult<(RoomDraft, Vec<String>)> {
        let id = match self.room_id.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(id) => Some(id.parse().map_err(|_| AppError::NotFound("room"))?),
        };
        let draft = RoomDraft {
            id,
            room_name: self.room_name.filter(|name| !name.trim().is_empty()),
            remarks: self.remarks.filter(|remarks| !remarks.is_empty()),
        };
        Ok((draft, self.members))
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct RoomEntryResult {
    result: &'static str,
    sys_msg: &'static str,
    room_id: i64,
}

async fn render_form(db_pool: &SqlitePool, login_user: &User, room: Option<&Room>, mode: FormMode) -> AppResult<Html<String>> {
    let candidates = services::room::selectable_members(db_pool, login_user).await?;
    let member_options: String = candidates
        .iter()
        .filter(|user| user.id != login_user.id)
        .map(|user| {
            format!(
                r#"<option value="{}">{}</option>"#,
                res::escape(&user.mail_address),
                res::escape(&user.user_name)
            )
        })
        .collect();

    let edit_link = match (mode, room) {
        (FormMode::Disp, Some(room)) => format!(
            r#"<a href="/room/{0}/edit">Edit</a> <a href="/chat/{0}/form">Chat</a>"#,
            room.id
        ),
        _ => String::new(),
    };

    let content = include_res!(str, "/pages/room/form.html")
        .replace("{disabled}", mode.disabled())
        .replace("{mode}", mode.as_str())
        .replace("{edit_link}", &edit_link)
        .replace("{member_options}", &member_options)
        .replace("{id}", &room.map(|room| room.id.to_string()).unwrap_or_default())
        .replace("{room_name}", &res::escape(room.and_then(|room| room.room_name.as_deref()).unwrap_or_default()))
        .replace("{remarks}", &res::escape(room.and_then(|room| room.remarks.as_deref()).unwrap_or_default()));

    Ok(res::layout("Room entry", &login_user.user_name, &content))
}

#[debug_handler(state = crate::AppState)]
pub(crate) async fn room_form_new(
    LoginUser(login_user): LoginUser,
    State(db_pool): State<SqlitePool>,
) -> AppResult<Html<String>> {
    render_form(&db_pool, &login_user, None, FormMode::New).await
}

#[debug_handler(state = crate::AppState)]
pub(crate) async fn room_form_edit(
    LoginUser(login_user): LoginUser,
    State(db_pool): State<SqlitePool>,
    Path((id, mode)): Path<(i64, String)>,
) -> AppResult<Html<String>> {
    let mode = FormMode::parse(&mode)?;
    let room = services::room::get_room(&db_pool, id, &login_user).await?;

    render_form(&db_pool, &login_user, Some(&room), mode).await
}

/// `{"members": [...]}` for the entry page. Room `0` is the unsaved room.
#[debug_handler(state = crate::AppState)]
pub(crate) async fn room_members(
    LoginUser(login_user): LoginUser,
    State(db_pool): State<SqlitePool>,
    Path((id, _mode)): Path<(i64, String)>,
) -> AppResult<Json<Value>> {
    if id == 0 {
        return Ok(Json(json!({ "members": [] })));
    }
    let members = services::room::members(&db_pool, id, &login_user).await?;

    Ok(Json(json!({ "members": members })))
}

#[debug_handler(state = crate::AppState)]
pub(crate) async fn room_entry(
    LoginUser(login_user): LoginUser,
    State(db_pool): State<SqlitePool>,
    Json(entry): Json<RoomEntry>,
) -> AppResult<Json<RoomEntryResult>> {
    let (draft, members) = entry.into_parts()?;

    let entry = services::room::save_room(&db_pool, &draft, members, &login_user).await?;
    let room_id = match &entry {
        Entry::Created(room) | Entry::Updated(room) => room.id,
        Entry::Rejected(_) => draft.id.unwrap_or_default(),
    };

    Ok(Json(RoomEntryResult {
        result: if entry.is_rejected() { "error" } else { "complete" },
        sys_msg: entry.message(),
        room_id,
    }))
}
