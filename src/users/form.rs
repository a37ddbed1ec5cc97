use axum::{
    debug_handler,
    extract::{Path, State},
    response::Html,
    Form,
};
use serde::Deserialize;
use sqlx::SqlitePool;

use crate::{
    auth::{convert_password, LoginUser, ADMINISTRATOR, GENERAL_USER},
    entities::{General, User, UserDraft},
    include_res,
    res::{self, FormMode},
    services::{self, Entry},
    AppError, AppResult,
};

#[derive(Debug, Deserialize)]
pub(crate) struct UserEntryForm {
    #[serde(default)]
    hdn_user_id: String,
    #[serde(default)]
    txt_mail_address: String,
    #[serde(default)]
    txt_user_name: String,
    #[serde(default)]
    txt_password: String,
    #[serde(default)]
    sel_auth_code: String,
    chk_del_flag: Option<String>,
}

impl UserEntryForm {
    fn into_draft(self) -> AppResult<UserDraft> {
        let id = match self.hdn_user_id.trim() {
            "" => None,
            id => Some(id.parse().map_err(|_| AppError::NotFound("user"))?),
        };
        let hashed_password = if self.txt_password.is_empty() {
            String::new()
        } else {
            convert_password(&self.txt_password)
        };

        Ok(UserDraft {
            id,
            mail_address: self.txt_mail_address.trim().to_owned(),
            user_name: self.txt_user_name.trim().to_owned(),
            hashed_password,
            authority_code: self.sel_auth_code.trim().parse().unwrap_or(GENERAL_USER),
            del_flag: self.chk_del_flag.is_some(),
        })
    }
}

fn authority_options(authorities: &[General], selected: i64) -> String {
    authorities
        .iter()
        .map(|authority| {
            format!(
                r#"<option value="{}" {}>{}</option>"#,
                authority.code,
                res::selected(authority.code == selected),
                res::escape(&authority.code_value),
            )
        })
        .collect()
}

fn render_form(
    login_user: &User,
    authorities: &[General],
    user: &UserDraft,
    mode: FormMode,
    result: &str,
    message: &str,
) -> Html<String> {
    let edit_link = match (mode, user.id) {
        (FormMode::Disp, Some(id)) => format!(r#"<a href="/user/{id}/edit">Edit</a>"#),
        _ => String::new(),
    };
    let password_hint = if user.id.is_some() { "unchanged when blank" } else { "" };
    let admin_only = if login_user.authority_code == ADMINISTRATOR { "" } else { "disabled" };

    let content = include_res!(str, "/pages/user/form.html")
        .replace("{sys_msg}", &res::sys_msg(result, message))
        .replace("{disabled}", mode.disabled())
        .replace("{edit_link}", &edit_link)
        .replace("{password_hint}", password_hint)
        .replace("{admin_only}", admin_only)
        .replace("{authority_options}", &authority_options(authorities, user.authority_code))
        .replace("{del_flag}", res::checked(user.del_flag))
        .replace("{id}", &user.id.map(|id| id.to_string()).unwrap_or_default())
        .replace("{mail_address}", &res::escape(&user.mail_address))
        .replace("{user_name}", &res::escape(&user.user_name));

    res::layout("User entry", &login_user.user_name, &content)
}

#[debug_handler(state = crate::AppState)]
pub(crate) async fn user_form_new(
    LoginUser(login_user): LoginUser,
    State(db_pool): State<SqlitePool>,
) -> AppResult<Html<String>> {
    let authorities = services::user::authority_list(&db_pool).await?;
    let user = services::user::get_user(&db_pool, None).await?;

    Ok(render_form(&login_user, &authorities, &user, FormMode::New, "", ""))
}

#[debug_handler(state = crate::AppState)]
pub(crate) async fn user_form_edit(
    LoginUser(login_user): LoginUser,
    State(db_pool): State<SqlitePool>,
    Path((id, mode)): Path<(i64, String)>,
) -> AppResult<Html<String>> {
    let mode = FormMode::parse(&mode)?;
    services::user::ensure_self_or_admin(&login_user, Some(id))?;

    let authorities = services::user::authority_list(&db_pool).await?;
    let user = services::user::get_user(&db_pool, Some(id)).await?;

    Ok(render_form(&login_user, &authorities, &user, mode, "", ""))
}

#[debug_handler(state = crate::AppState)]
pub(crate) async fn user_entry(
    LoginUser(login_user): LoginUser,
    State(db_pool): State<SqlitePool>,
    Form(form): Form<UserEntryForm>,
) -> AppResult<Html<String>> {
    let authorities = services::user::authority_list(&db_pool).await?;
    let draft = form.into_draft()?;

    let entry = services::user::save_user(&db_pool, draft.clone(), &login_user).await?;
    let html = match &entry {
        Entry::Created(user) | Entry::Updated(user) => render_form(
            &login_user,
            &authorities,
            &UserDraft::from(user),
            FormMode::Disp,
            "complete",
            entry.message(),
        ),
        Entry::Rejected(message) => {
            let mode = if draft.id.is_some() { FormMode::Edit } else { FormMode::New };
            render_form(&login_user, &authorities, &draft, mode, "error", message)
        }
    };

    Ok(html)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_password_is_kept_blank() {
        let form = UserEntryForm {
            hdn_user_id: "7".into(),
            txt_mail_address: " a@example.com ".into(),
            txt_user_name: "A".into(),
            txt_password: String::new(),
            sel_auth_code: "99".into(),
            chk_del_flag: None,
        };
        let draft = form.into_draft().unwrap();
        assert_eq!(draft.id, Some(7));
        assert_eq!(draft.mail_address, "a@example.com");
        assert!(draft.hashed_password.is_empty());
        assert_eq!(draft.authority_code, ADMINISTRATOR);
        assert!(!draft.del_flag);
    }

    #[test]
    fn password_is_digested() {
        let form = UserEntryForm {
            hdn_user_id: String::new(),
            txt_mail_address: "b@example.com".into(),
            txt_user_name: "B".into(),
            txt_password: "admin".into(),
            sel_auth_code: String::new(),
            chk_del_flag: Some("1".into()),
        };
        let draft = form.into_draft().unwrap();
        assert_eq!(draft.id, None);
        assert_eq!(
            draft.hashed_password,
            "8c6976e5b5410415bde908bd4dee15dfb167a9c873fc4bb8a81f6f2ab448a918"
        );
        assert_eq!(draft.authority_code, GENERAL_USER);
    }
}
