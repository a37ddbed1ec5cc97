//! Room list and room entry, including the member list API.

mod form;
mod list;

use axum::{
    routing::{get, post},
    Router,
};

use crate::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/room/list", get(list::room_list))
        .route("/room/new", get(form::room_form_new))
        .route("/room/{id}/{mode}", get(form::room_form_edit))
        .route("/room/{id}/{mode}/api", get(form::room_members))
        .route("/room_entry", post(form::room_entry))
}
