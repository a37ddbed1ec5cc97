use axum::{debug_handler, extract::State, response::Html};
use sqlx::SqlitePool;

use crate::{
    auth::LoginUser,
    entities::Room,
    include_res,
    paging::{self, Page, PageRequest, Pager, SearchCookies},
    repos::room::RoomFilter,
    res, services, AppResult,
};

const TXT_ROOM_NAME: &str = "txt_room_name";

fn render_row(room: &Room) -> String {
    include_res!(str, "/pages/room/row.html")
        .replace("{id}", &room.id.to_string())
        .replace("{update_date}", &res::datetime_display(room.audit.update_date))
        .replace("{room_name}", &res::escape(room.room_name.as_deref().unwrap_or("(no name)")))
        .replace("{remarks}", &res::escape(room.remarks.as_deref().unwrap_or_default()))
        .replace("{update_user}", &res::escape(&room.audit.update_user))
}

/// Rooms the login user belongs to.
#[debug_handler(state = crate::AppState)]
pub(crate) async fn room_list(
    LoginUser(login_user): LoginUser,
    State(db_pool): State<SqlitePool>,
    cookies: SearchCookies,
) -> AppResult<Html<String>> {
    let filter = RoomFilter {
        room_name: cookies.text(TXT_ROOM_NAME),
        member_id: Some(login_user.id),
    };
    let row_max = cookies.row_max();

    let (page, page_no) = match cookies.page_no() {
        0 => (Page::empty(), 1),
        page_no => (
            services::room::find_rooms(&db_pool, &filter, PageRequest::page(page_no, row_max)).await?,
            page_no,
        ),
    };
    let pager = Pager::new(page_no, row_max, page.total);
    let rows: String = page.rows.iter().map(render_row).collect();

    let content = include_res!(str, "/pages/room/list.html")
        .replace("{pager}", &pager.render())
        .replace("{rows}", &rows)
        .replace("{row_max_options}", &paging::row_max_options(row_max))
        .replace("{txt_room_name}", &res::escape(&filter.room_name));

    Ok(res::layout("Room list", &login_user.user_name, &content))
}
