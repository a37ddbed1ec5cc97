use axum::{
    debug_handler,
    extract::{Path, State},
    response::Html,
    Form,
};
use serde::Deserialize;
use sqlx::SqlitePool;

use crate::{
    auth::LoginUser,
    entities::{Category, GeneralDraft, User},
    include_res,
    paging::SearchCookies,
    res::{self, FormMode},
    services::{self, Entry},
    AppError, AppResult,
};

use super::list::{category_options, SEL_CATEGORY};

#[derive(Debug, Deserialize)]
pub(crate) struct GeneralEntryForm {
    #[serde(default)]
    sel_category: String,
    #[serde(default)]
    txt_code: String,
    #[serde(default)]
    txt_code_value: String,
    #[serde(default)]
    txt_sort_key: String,
    #[serde(default)]
    txt_remarks: String,
    chk_del_flag: Option<String>,
}

impl GeneralEntryForm {
    fn into_draft(self) -> AppResult<GeneralDraft> {
        let code = match self.txt_code.trim() {
            "" => None,
            code => Some(code.parse().map_err(|_| AppError::NotFound("code"))?),
        };
        let remarks = Some(self.txt_remarks).filter(|remarks| !remarks.is_empty());

        Ok(GeneralDraft {
            category: self.sel_category,
            code,
            code_value: self.txt_code_value.trim().to_owned(),
            sort_key: self.txt_sort_key.trim().parse().unwrap_or(1000),
            remarks,
            del_flag: self.chk_del_flag.is_some(),
        })
    }
}

fn render_form(
    login_user: &User,
    categories: &[Category],
    general: &GeneralDraft,
    mode: FormMode,
    result: &str,
    message: &str,
) -> Html<String> {
    let category_field = if mode == FormMode::New {
        format!(
            r#"<label>Category <select name="sel_category" required>{}</select></label>"#,
            category_options(categories, &general.category)
        )
    } else {
        let display_name = categories
            .iter()
            .find(|category| category.category == general.category)
            .map_or(general.category.as_str(), |category| category.display_name.as_str());
        format!(
            r#"<input type="hidden" name="sel_category" value="{}">Category: {}"#,
            res::escape(&general.category),
            res::escape(display_name)
        )
    };

    let edit_link = match (mode, general.code) {
        (FormMode::Disp, Some(code)) => format!(
            r#"<a href="/general/{}/{code}/edit">Edit</a>"#,
            res::escape(&general.category)
        ),
        _ => String::new(),
    };

    let content = include_res!(str, "/pages/general/form.html")
        .replace("{sys_msg}", &res::sys_msg(result, message))
        .replace("{disabled}", mode.disabled())
        .replace("{category_field}", &category_field)
        .replace("{edit_link}", &edit_link)
        .replace("{code}", &general.code.map(|code| code.to_string()).unwrap_or_default())
        .replace("{sort_key}", &general.sort_key.to_string())
        .replace("{del_flag}", res::checked(general.del_flag))
        .replace("{code_value}", &res::escape(&general.code_value))
        .replace("{remarks}", &res::escape(general.remarks.as_deref().unwrap_or_default()));

    res::layout("Code entry", &login_user.user_name, &content)
}

#[debug_handler(state = crate::AppState)]
pub(crate) async fn general_form_new(
    LoginUser(login_user): LoginUser,
    State(db_pool): State<SqlitePool>,
    cookies: SearchCookies,
) -> AppResult<Html<String>> {
    let categories = services::general::select_list(&db_pool).await?;
    let general = services::general::get_general(&db_pool, None, &cookies.text(SEL_CATEGORY)).await?;

    Ok(render_form(&login_user, &categories, &general, FormMode::New, "", ""))
}

#[debug_handler(state = crate::AppState)]
pub(crate) async fn general_form_edit(
    LoginUser(login_user): LoginUser,
    State(db_pool): State<SqlitePool>,
    Path((category, code, mode)): Path<(String, i64, String)>,
) -> AppResult<Html<String>> {
    let mode = FormMode::parse(&mode)?;
    let categories = services::general::select_list(&db_pool).await?;
    let general = services::general::get_general(&db_pool, Some(code), &category).await?;

    Ok(render_form(&login_user, &categories, &general, mode, "", ""))
}

#[debug_handler(state = crate::AppState)]
pub(crate) async fn general_entry(
    LoginUser(login_user): LoginUser,
    State(db_pool): State<SqlitePool>,
    Form(form): Form<GeneralEntryForm>,
) -> AppResult<Html<String>> {
    let categories = services::general::select_list(&db_pool).await?;
    let draft = form.into_draft()?;

    let entry = services::general::save_general(&db_pool, &draft, &login_user.mail_address).await?;
    let html = match &entry {
        Entry::Created(general) | Entry::Updated(general) => render_form(
            &login_user,
            &categories,
            &GeneralDraft::from(general),
            FormMode::Disp,
            "complete",
            entry.message(),
        ),
        Entry::Rejected(message) => {
            let mode = if draft.code.is_some() { FormMode::Edit } else { FormMode::New };
            render_form(&login_user, &categories, &draft, mode, "error", message)
        }
    };

    Ok(html)
}
