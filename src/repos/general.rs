use sqlx::{Connection, QueryBuilder, Sqlite, SqliteConnection, SqliteExecutor, SqlitePool};

use crate::{
    entities::{General, GeneralDraft},
    paging::{Page, PageRequest},
};

const SELECT_GENERAL: &str = "SELECT g.category, g.code, g.code_value, \
            g.code_reserve01_text, g.code_reserve02_text, g.code_reserve01_flag, g.code_reserve02_flag, \
            g.code_reserve01_code, g.code_reserve02_code, g.sort_key, g.remarks, \
            c.display_name AS category_name, \
            g.create_user, g.create_date, g.update_user, g.update_date, g.del_flag \
     FROM m_general g \
     JOIN m_category c ON c.category = g.category";

#[derive(Debug, Clone, Default)]
pub struct GeneralFilter {
    /// Exact category, empty for all.
    pub category: String,
    /// Substring of the code value.
    pub code_value: String,
    pub include_deleted: bool,
}

fn push_filter<'a>(query: &mut QueryBuilder<'a, Sqlite>, filter: &'a GeneralFilter) {
    query.push(" WHERE c.maintenance_flag = 1");
    if !filter.include_deleted {
        query.push(" AND g.del_flag = 0");
    }
    if !filter.category.is_empty() {
        query.push(" AND g.category = ").push_bind(filter.category.as_str());
    }
    if !filter.code_value.is_empty() {
        query
            .push(" AND instr(g.code_value, ")
            .push_bind(filter.code_value.as_str())
            .push(") > 0");
    }
}

/// Active codes of one category, by sort key.
pub async fn find(db_pool: &SqlitePool, category: &str) -> Result<Vec<General>, sqlx::Error> {
    sqlx::query_as(&format!(
        "{SELECT_GENERAL} WHERE g.category = ? AND g.del_flag = 0 ORDER BY g.sort_key, g.code"
    ))
    .bind(category)
    .fetch_all(db_pool)
    .await
}

pub async fn find_list(
    db_pool: &SqlitePool,
    filter: &GeneralFilter,
    page: PageRequest,
) -> Result<Page<General>, sqlx::Error> {
    let mut count = QueryBuilder::new("SELECT COUNT(*) FROM m_general g JOIN m_category c ON c.category = g.category");
    push_filter(&mut count, filter);
    let (total,): (i64,) = count.build_query_as::<(i64,)>().fetch_one(db_pool).await?;

    let (limit, offset) = page.bounds();
    let mut query = QueryBuilder::new(SELECT_GENERAL);
    push_filter(&mut query, filter);
    query
        .push(" ORDER BY c.display_name, g.del_flag, g.sort_key, g.code LIMIT ")
        .push_bind(limit)
        .push(" OFFSET ")
        .push_bind(offset);
    let rows = query.build_query_as::<General>().fetch_all(db_pool).await?;

    Ok(Page { rows, total })
}

pub async fn find_by_code<'e>(
    executor: impl SqliteExecutor<'e>,
    code: i64,
    category: &str,
) -> Result<General, sqlx::Error> {
    sqlx::query_as(&format!("{SELECT_GENERAL} WHERE g.code = ? AND g.category = ?"))
        .bind(code)
        .bind(category)
        .fetch_one(executor)
        .await
}

/// Inserts with the next free code of the category and returns that code.
pub async fn create(conn: &mut SqliteConnection, general: &GeneralDraft, actor: &str) -> Result<i64, sqlx::Error> {
    let mut tx = conn.begin().await?;

    let (code,): (i64,) = sqlx::query_as("SELECT COALESCE(MAX(code), 0) + 1 FROM m_general WHERE category = ?")
        .bind(&general.category)
        .fetch_one(&mut *tx)
        .await?;

    sqlx::query(
        "INSERT INTO m_general (category, code, code_value, sort_key, remarks, del_flag, create_user, update_user) \
         VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(&general.category)
    .bind(code)
    .bind(&general.code_value)
    .bind(general.sort_key)
    .bind(&general.remarks)
    .bind(general.del_flag)
    .bind(actor)
    .bind(actor)
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;
    Ok(code)
}

pub async fn update(conn: &mut SqliteConnection, general: &GeneralDraft, actor: &str) -> Result<(), sqlx::Error> {
    let code = general.code.ok_or(sqlx::Error::RowNotFound)?;

    let mut tx = conn.begin().await?;
    find_by_code(&mut *tx, code, &general.category).await?;

    sqlx::query(
        "UPDATE m_general SET code_value = ?, sort_key = ?, remarks = ?, del_flag = ?, \
                update_user = ?, update_date = CURRENT_TIMESTAMP \
         WHERE category = ? AND code = ?",
    )
    .bind(&general.code_value)
    .bind(general.sort_key)
    .bind(&general.remarks)
    .bind(general.del_flag)
    .bind(actor)
    .bind(&general.category)
    .bind(code)
    .execute(&mut *tx)
    .await?;

    tx.commit().await
}

/// True when no other code of the category carries the same value.
pub async fn duplicate_check(db_pool: &SqlitePool, general: &GeneralDraft) -> Result<bool, sqlx::Error> {
    let (count,): (i64,) = sqlx::query_as(
        "SELECT COUNT(*) FROM m_general WHERE category = ? AND code_value = ? AND code != ?",
    )
    .bind(&general.category)
    .bind(&general.code_value)
    .bind(general.code.unwrap_or(-1))
    .fetch_one(db_pool)
    .await?;

    Ok(count == 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;

    async fn pool() -> SqlitePool {
        let db_pool = db::connect("sqlite::memory:", 1).await.unwrap();
        db::reset(&db_pool).await.unwrap();
        db_pool
    }

    fn draft(category: &str, value: &str) -> GeneralDraft {
        GeneralDraft {
            category: category.to_owned(),
            code_value: value.to_owned(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn create_takes_next_code_in_category() {
        let db_pool = pool().await;
        let mut conn = db_pool.acquire().await.unwrap();

        // seeded room_type codes are 1 and 2
        assert_eq!(create(&mut conn, &draft("room_type", "Hobby"), "test").await.unwrap(), 3);
        assert_eq!(create(&mut conn, &draft("room_type", "Club"), "test").await.unwrap(), 4);
    }

    #[tokio::test]
    async fn create_in_empty_category_starts_at_one() {
        let db_pool = pool().await;
        sqlx::query("INSERT INTO m_category (category, display_name) VALUES ('color', 'Color')")
            .execute(&db_pool)
            .await
            .unwrap();

        let mut conn = db_pool.acquire().await.unwrap();
        assert_eq!(create(&mut conn, &draft("color", "Red"), "test").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn duplicate_check_excludes_current_row() {
        let db_pool = pool().await;

        // new row with an existing value
        assert!(!duplicate_check(&db_pool, &draft("room_type", "Team")).await.unwrap());
        // same value in another category
        assert!(duplicate_check(&db_pool, &draft("authority_code", "Team")).await.unwrap());
        // the row itself
        let mut own = draft("room_type", "Team");
        own.code = Some(2);
        assert!(duplicate_check(&db_pool, &own).await.unwrap());
        // another row renamed onto it
        let mut other = draft("room_type", "Team");
        other.code = Some(1);
        assert!(!duplicate_check(&db_pool, &other).await.unwrap());
    }

    #[tokio::test]
    async fn soft_deleted_codes_leave_default_listings() {
        let db_pool = pool().await;
        let mut conn = db_pool.acquire().await.unwrap();
        let mut project = GeneralDraft::from(&find_by_code(&mut *conn, 1, "room_type").await.unwrap());
        project.del_flag = true;
        update(&mut conn, &project, "test").await.unwrap();
        drop(conn);

        let active = find(&db_pool, "room_type").await.unwrap();
        assert_eq!(active.iter().map(|g| g.code).collect::<Vec<_>>(), vec![2]);

        let filter = GeneralFilter { category: "room_type".into(), ..Default::default() };
        let listed = find_list(&db_pool, &filter, PageRequest::ALL).await.unwrap();
        assert_eq!(listed.total, 1);

        let filter = GeneralFilter { include_deleted: true, ..filter };
        let listed = find_list(&db_pool, &filter, PageRequest::ALL).await.unwrap();
        assert_eq!(listed.total, 2);
        assert_eq!(listed.rows.len(), 2);
        assert!(listed.rows[1].audit.del_flag);
        assert_eq!(listed.rows[0].category_name, "Room type");
    }

    #[tokio::test]
    async fn update_missing_row_is_not_found() {
        let db_pool = pool().await;
        let mut conn = db_pool.acquire().await.unwrap();
        let mut ghost = draft("room_type", "Ghost");
        ghost.code = Some(77);
        assert!(matches!(update(&mut conn, &ghost, "test").await, Err(sqlx::Error::RowNotFound)));
    }
}
