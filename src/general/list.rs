use axum::{
    debug_handler,
    extract::State,
    response::{Html, Response},
};
use sqlx::SqlitePool;
use time::OffsetDateTime;

use crate::{
    auth::LoginUser,
    entities::{Category, General},
    export,
    include_res,
    paging::{self, Page, PageRequest, Pager, SearchCookies},
    repos::general::GeneralFilter,
    res, services, AppResult,
};

pub(crate) const SEL_CATEGORY: &str = "sel_category";
const TXT_CODE_VALUE: &str = "txt_code_value";

fn filter(cookies: &SearchCookies) -> GeneralFilter {
    GeneralFilter {
        category: cookies.text(SEL_CATEGORY),
        code_value: cookies.text(TXT_CODE_VALUE),
        include_deleted: cookies.include_deleted(),
    }
}

pub(crate) fn category_options(categories: &[Category], selected: &str) -> String {
    categories
        .iter()
        .map(|category| {
            format!(
                r#"<option value="{}" {}>{}</option>"#,
                res::escape(&category.category),
                res::selected(category.category == selected),
                res::escape(&category.display_name),
            )
        })
        .collect()
}

fn render_row(general: &General) -> String {
    include_res!(str, "/pages/general/row.html")
        .replace("{row_class}", if general.audit.del_flag { "deleted" } else { "" })
        .replace("{category}", &res::escape(&general.category))
        .replace("{code}", &general.code.to_string())
        .replace("{sort_key}", &general.sort_key.to_string())
        .replace("{update_date}", &res::datetime_display(general.audit.update_date))
        .replace("{category_name}", &res::escape(&general.category_name))
        .replace("{code_value}", &res::escape(&general.code_value))
        .replace("{remarks}", &res::escape(general.remarks.as_deref().unwrap_or_default()))
        .replace("{update_user}", &res::escape(&general.audit.update_user))
}

#[debug_handler(state = crate::AppState)]
pub(crate) async fn general_list(
    LoginUser(login_user): LoginUser,
    State(db_pool): State<SqlitePool>,
    cookies: SearchCookies,
) -> AppResult<Html<String>> {
    let categories = services::general::select_list(&db_pool).await?;
    let filter = filter(&cookies);
    let row_max = cookies.row_max();

    // page 0 is the first visit, nothing is searched yet
    let (page, page_no) = match cookies.page_no() {
        0 => (Page::empty(), 1),
        page_no => (
            services::general::search(&db_pool, &filter, PageRequest::page(page_no, row_max)).await?,
            page_no,
        ),
    };
    let pager = Pager::new(page_no, row_max, page.total);
    let rows: String = page.rows.iter().map(render_row).collect();

    let content = include_res!(str, "/pages/general/list.html")
        .replace("{pager}", &pager.render())
        .replace("{rows}", &rows)
        .replace("{row_max_options}", &paging::row_max_options(row_max))
        .replace("{chk_include_deleted}", res::checked(filter.include_deleted))
        .replace("{category_options}", &category_options(&categories, &filter.category))
        .replace("{txt_code_value}", &res::escape(&filter.code_value));

    Ok(res::layout("Code list", &login_user.user_name, &content))
}

#[debug_handler(state = crate::AppState)]
pub(crate) async fn general_list_download(
    _login_user: LoginUser,
    State(db_pool): State<SqlitePool>,
    cookies: SearchCookies,
) -> AppResult<Response> {
    let page = services::general::search(&db_pool, &filter(&cookies), PageRequest::ALL).await?;

    Ok(export::general_csv(&page.rows).into_attachment(export::GENERAL_DOWNLOAD_FILE_NAME, OffsetDateTime::now_utc()))
}
