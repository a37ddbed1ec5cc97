//! Maintenance screens for the code lists.

mod form;
mod list;

use axum::{
    routing::{get, post},
    Router,
};

use crate::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/general/list", get(list::general_list))
        .route("/general/list/download", get(list::general_list_download))
        .route("/general/new", get(form::general_form_new))
        .route("/general/{category}/{code}/{mode}", get(form::general_form_edit))
        .route("/general_entry", post(form::general_entry))
}
