use axum::{
    debug_handler,
    extract::State,
    response::{Html, Response},
};
use sqlx::SqlitePool;
use time::OffsetDateTime;

use crate::{
    auth::LoginUser,
    entities::User,
    export, include_res,
    paging::{self, Page, PageRequest, Pager, SearchCookies},
    repos::user::UserFilter,
    res, services, AppResult,
};

const TXT_MAIL_ADDRESS: &str = "txt_mail_address";
const TXT_USER_NAME: &str = "txt_user_name";

fn filter(cookies: &SearchCookies) -> UserFilter {
    UserFilter {
        mail_address: cookies.text(TXT_MAIL_ADDRESS),
        user_name: cookies.text(TXT_USER_NAME),
        include_deleted: cookies.include_deleted(),
    }
}

fn render_row(user: &User) -> String {
    include_res!(str, "/pages/user/row.html")
        .replace("{row_class}", if user.audit.del_flag { "deleted" } else { "" })
        .replace("{id}", &user.id.to_string())
        .replace("{update_date}", &res::datetime_display(user.audit.update_date))
        .replace("{mail_address}", &res::escape(&user.mail_address))
        .replace("{user_name}", &res::escape(&user.user_name))
        .replace("{authority_name}", &res::escape(user.authority_name.as_deref().unwrap_or_default()))
        .replace("{update_user}", &res::escape(&user.audit.update_user))
}

#[debug_handler(state = crate::AppState)]
pub(crate) async fn user_list(
    LoginUser(login_user): LoginUser,
    State(db_pool): State<SqlitePool>,
    cookies: SearchCookies,
) -> AppResult<Html<String>> {
    let filter = filter(&cookies);
    let row_max = cookies.row_max();

    let (page, page_no) = match cookies.page_no() {
        0 => (Page::empty(), 1),
        page_no => (
            services::user::find_users(&db_pool, &filter, PageRequest::page(page_no, row_max)).await?,
            page_no,
        ),
    };
    let pager = Pager::new(page_no, row_max, page.total);
    let rows: String = page.rows.iter().map(render_row).collect();

    let content = include_res!(str, "/pages/user/list.html")
        .replace("{pager}", &pager.render())
        .replace("{rows}", &rows)
        .replace("{row_max_options}", &paging::row_max_options(row_max))
        .replace("{chk_include_deleted}", res::checked(filter.include_deleted))
        .replace("{txt_mail_address}", &res::escape(&filter.mail_address))
        .replace("{txt_user_name}", &res::escape(&filter.user_name));

    Ok(res::layout("User list", &login_user.user_name, &content))
}

#[debug_handler(state = crate::AppState)]
pub(crate) async fn user_list_download(
    _login_user: LoginUser,
    State(db_pool): State<SqlitePool>,
    cookies: SearchCookies,
) -> AppResult<Response> {
    let page = services::user::find_users(&db_pool, &filter(&cookies), PageRequest::ALL).await?;

    Ok(export::user_csv(&page.rows).into_attachment(export::USER_DOWNLOAD_FILE_NAME, OffsetDateTime::now_utc()))
}
