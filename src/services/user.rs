use sqlx::SqlitePool;

use crate::{
    auth::ADMINISTRATOR,
    entities::{General, User, UserDraft, AUTHORITY_CATEGORY},
    paging::{Page, PageRequest},
    repos::{self, user::UserFilter},
    AppError, AppResult,
};

use super::Entry;

pub const ADDRESS_TAKEN_MESSAGE: &str = "The mail address entered is already registered.";

pub async fn get_user(db_pool: &SqlitePool, id: Option<i64>) -> AppResult<UserDraft> {
    match id {
        Some(id) => Ok(UserDraft::from(&repos::user::find_by_id(db_pool, id).await?)),
        None => Ok(UserDraft::default()),
    }
}

/// Choices for the authority select box.
pub async fn authority_list(db_pool: &SqlitePool) -> AppResult<Vec<General>> {
    Ok(repos::general::find(db_pool, AUTHORITY_CATEGORY).await?)
}

pub async fn find_users(db_pool: &SqlitePool, filter: &UserFilter, page: PageRequest) -> AppResult<Page<User>> {
    Ok(repos::user::find(db_pool, filter, page).await?)
}

/// General users may only look at and edit their own record.
pub fn ensure_self_or_admin(login_user: &User, id: Option<i64>) -> AppResult<()> {
    if login_user.authority_code == ADMINISTRATOR || id == Some(login_user.id) {
        Ok(())
    } else {
        Err(AppError::NotPermitted)
    }
}

/// Input check before saving; `Err` carries the message for the form.
pub async fn check_user(db_pool: &SqlitePool, draft: &UserDraft) -> AppResult<Result<(), &'static str>> {
    if repos::user::address_taken(db_pool, &draft.mail_address, draft.id).await? {
        return Ok(Err(ADDRESS_TAKEN_MESSAGE));
    }
    Ok(Ok(()))
}

pub async fn save_user(db_pool: &SqlitePool, mut draft: UserDraft, login_user: &User) -> AppResult<Entry<User>> {
    ensure_self_or_admin(login_user, draft.id)?;

    if login_user.authority_code != ADMINISTRATOR {
        // a general user cannot change their own authority or delete themselves
        draft.authority_code = login_user.authority_code;
        draft.del_flag = login_user.audit.del_flag;
    }

    if let Err(message) = check_user(db_pool, &draft).await? {
        return Ok(Entry::Rejected(message));
    }

    let actor = login_user.mail_address.as_str();
    let mut conn = db_pool.acquire().await?;
    match draft.id {
        None => {
            let id = repos::user::create(&mut *conn, &draft, actor).await?;
            Ok(Entry::Created(repos::user::find_by_id(&mut *conn, id).await?))
        }
        Some(id) => {
            repos::user::update(&mut conn, &draft, actor).await?;
            Ok(Entry::Updated(repos::user::find_by_id(&mut *conn, id).await?))
        }
    }
}
