use sqlx::SqlitePool;

use crate::{
    entities::{Category, General, GeneralDraft},
    paging::{Page, PageRequest},
    repos::{self, general::GeneralFilter},
    AppResult,
};

use super::Entry;

pub const DUPLICATE_MESSAGE: &str = "An entry with the same category and value already exists.";
pub const CATEGORY_MESSAGE: &str = "The selected category cannot be maintained.";

/// Form contents for `code`, or a blank draft in `category` for a new entry.
pub async fn get_general(db_pool: &SqlitePool, code: Option<i64>, category: &str) -> AppResult<GeneralDraft> {
    match code {
        Some(code) => Ok(GeneralDraft::from(&repos::general::find_by_code(db_pool, code, category).await?)),
        None => Ok(GeneralDraft {
            category: category.to_owned(),
            ..Default::default()
        }),
    }
}

pub async fn select_list(db_pool: &SqlitePool) -> AppResult<Vec<Category>> {
    Ok(repos::category::list(db_pool).await?)
}

pub async fn search(db_pool: &SqlitePool, filter: &GeneralFilter, page: PageRequest) -> AppResult<Page<General>> {
    Ok(repos::general::find_list(db_pool, filter, page).await?)
}

/// Creates or updates after the duplicate check and returns the stored row.
pub async fn save_general(db_pool: &SqlitePool, draft: &GeneralDraft, actor: &str) -> AppResult<Entry<General>> {
    let maintainable = repos::category::find_by_id(db_pool, &draft.category)
        .await?
        .is_some_and(|category| category.maintenance_flag && !category.audit.del_flag);
    if !maintainable {
        return Ok(Entry::Rejected(CATEGORY_MESSAGE));
    }

    if !repos::general::duplicate_check(db_pool, draft).await? {
        return Ok(Entry::Rejected(DUPLICATE_MESSAGE));
    }

    let mut conn = db_pool.acquire().await?;
    match draft.code {
        None => {
            let code = repos::general::create(&mut conn, draft, actor).await?;
            let general = repos::general::find_by_code(&mut *conn, code, &draft.category).await?;
            Ok(Entry::Created(general))
        }
        Some(code) => {
            repos::general::update(&mut conn, draft, actor).await?;
            let general = repos::general::find_by_code(&mut *conn, code, &draft.category).await?;
            Ok(Entry::Updated(general))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{db, AppError};

    async fn pool() -> SqlitePool {
        let db_pool = db::connect("sqlite::memory:", 1).await.unwrap();
        db::reset(&db_pool).await.unwrap();
        db_pool
    }

    #[tokio::test]
    async fn new_entry_starts_blank_in_category() {
        let db_pool = pool().await;
        let draft = get_general(&db_pool, None, "room_type").await.unwrap();
        assert_eq!(draft.category, "room_type");
        assert_eq!(draft.code, None);
        assert_eq!(draft.sort_key, 1000);
    }

    #[tokio::test]
    async fn missing_code_is_not_found() {
        let db_pool = pool().await;
        assert!(matches!(
            get_general(&db_pool, Some(404), "room_type").await,
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn save_creates_then_updates() {
        let db_pool = pool().await;
        let draft = GeneralDraft {
            category: "room_type".into(),
            code_value: "Study".into(),
            ..Default::default()
        };

        let Entry::Created(created) = save_general(&db_pool, &draft, "admin@example.com").await.unwrap() else {
            panic!("expected a new row");
        };
        assert_eq!(created.code, 3);
        assert_eq!(created.audit.create_user, "admin@example.com");

        let mut edit = GeneralDraft::from(&created);
        edit.remarks = Some("weekly".into());
        let Entry::Updated(updated) = save_general(&db_pool, &edit, "editor").await.unwrap() else {
            panic!("expected an update");
        };
        assert_eq!(updated.remarks.as_deref(), Some("weekly"));
        assert_eq!(updated.audit.update_user, "editor");
    }

    #[tokio::test]
    async fn locked_category_is_rejected() {
        let db_pool = pool().await;
        sqlx::query("INSERT INTO m_category (category, display_name, maintenance_flag) VALUES ('fixed', 'Fixed', 0)")
            .execute(&db_pool)
            .await
            .unwrap();

        for category in ["fixed", "missing"] {
            let draft = GeneralDraft {
                category: category.into(),
                code_value: "X".into(),
                ..Default::default()
            };
            assert_eq!(save_general(&db_pool, &draft, "test").await.unwrap().message(), CATEGORY_MESSAGE);
        }
    }

    #[tokio::test]
    async fn duplicate_value_is_rejected() {
        let db_pool = pool().await;
        let draft = GeneralDraft {
            category: "room_type".into(),
            code_value: "Project".into(),
            ..Default::default()
        };

        let entry = save_general(&db_pool, &draft, "test").await.unwrap();
        assert!(entry.is_rejected());
        assert_eq!(entry.message(), DUPLICATE_MESSAGE);
        assert_eq!(repos::general::find(&db_pool, "room_type").await.unwrap().len(), 2);
    }
}
