//! User maintenance screens.

mod form;
mod list;

use axum::{
    routing::{get, post},
    Router,
};

use crate::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/user/list", get(list::user_list))
        .route("/user/list/download", get(list::user_list_download))
        .route("/user/new", get(form::user_form_new))
        .route("/user/{id}/{mode}", get(form::user_form_edit))
        .route("/user_entry", post(form::user_entry))
}
