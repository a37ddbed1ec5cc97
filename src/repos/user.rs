use sqlx::{Connection, QueryBuilder, Sqlite, SqliteConnection, SqliteExecutor, SqlitePool};

use crate::{
    entities::{User, UserDraft},
    paging::{Page, PageRequest},
};

pub(crate) const SELECT_USER: &str = "SELECT u.id, u.mail_address, u.user_name, u.hashed_password, u.authority_code, \
            g.code_value AS authority_name, \
            u.create_user, u.create_date, u.update_user, u.update_date, u.del_flag \
     FROM m_user u \
     LEFT JOIN m_general g ON g.category = 'authority_code' AND g.code = u.authority_code";

#[derive(Debug, Clone, Default)]
pub struct UserFilter {
    /// Substring of the mail address.
    pub mail_address: String,
    /// Substring of the display name.
    pub user_name: String,
    pub include_deleted: bool,
}

fn push_filter<'a>(query: &mut QueryBuilder<'a, Sqlite>, filter: &'a UserFilter) {
    query.push(" WHERE 1 = 1");
    if !filter.include_deleted {
        query.push(" AND u.del_flag = 0");
    }
    if !filter.mail_address.is_empty() {
        query
            .push(" AND instr(u.mail_address, ")
            .push_bind(filter.mail_address.as_str())
            .push(") > 0");
    }
    if !filter.user_name.is_empty() {
        query
            .push(" AND instr(u.user_name, ")
            .push_bind(filter.user_name.as_str())
            .push(") > 0");
    }
}

pub async fn find(db_pool: &SqlitePool, filter: &UserFilter, page: PageRequest) -> Result<Page<User>, sqlx::Error> {
    let mut count = QueryBuilder::new("SELECT COUNT(*) FROM m_user u");
    push_filter(&mut count, filter);
    let (total,): (i64,) = count.build_query_as::<(i64,)>().fetch_one(db_pool).await?;

    let (limit, offset) = page.bounds();
    let mut query = QueryBuilder::new(SELECT_USER);
    push_filter(&mut query, filter);
    query
        .push(" ORDER BY u.del_flag, u.user_name, u.id LIMIT ")
        .push_bind(limit)
        .push(" OFFSET ")
        .push_bind(offset);
    let rows = query.build_query_as::<User>().fetch_all(db_pool).await?;

    Ok(Page { rows, total })
}

pub async fn find_by_id<'e>(executor: impl SqliteExecutor<'e>, id: i64) -> Result<User, sqlx::Error> {
    sqlx::query_as(&format!("{SELECT_USER} WHERE u.id = ?"))
        .bind(id)
        .fetch_one(executor)
        .await
}

pub async fn find_by_address<'e>(
    executor: impl SqliteExecutor<'e>,
    mail_address: &str,
) -> Result<Option<User>, sqlx::Error> {
    sqlx::query_as(&format!("{SELECT_USER} WHERE u.mail_address = ?"))
        .bind(mail_address)
        .fetch_optional(executor)
        .await
}

/// Whether another user already owns `mail_address`.
pub async fn address_taken(
    db_pool: &SqlitePool,
    mail_address: &str,
    except_id: Option<i64>,
) -> Result<bool, sqlx::Error> {
    let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM m_user WHERE mail_address = ? AND id != ?")
        .bind(mail_address)
        .bind(except_id.unwrap_or(-1))
        .fetch_one(db_pool)
        .await?;
    Ok(count > 0)
}

pub async fn create<'e>(executor: impl SqliteExecutor<'e>, user: &UserDraft, actor: &str) -> Result<i64, sqlx::Error> {
    let result = sqlx::query(
        "INSERT INTO m_user (mail_address, user_name, hashed_password, authority_code, del_flag, create_user, update_user) \
         VALUES (?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(&user.mail_address)
    .bind(&user.user_name)
    .bind(&user.hashed_password)
    .bind(user.authority_code)
    .bind(user.del_flag)
    .bind(actor)
    .bind(actor)
    .execute(executor)
    .await?;

    Ok(result.last_insert_rowid())
}

/// Re-reads the row, then overwrites it. An empty password keeps the old one.
pub async fn update(conn: &mut SqliteConnection, user: &UserDraft, actor: &str) -> Result<(), sqlx::Error> {
    let id = user.id.ok_or(sqlx::Error::RowNotFound)?;

    let mut tx = conn.begin().await?;
    let current = find_by_id(&mut *tx, id).await?;

    let hashed_password = if user.hashed_password.is_empty() {
        current.hashed_password
    } else {
        user.hashed_password.clone()
    };

    sqlx::query(
        "UPDATE m_user SET mail_address = ?, user_name = ?, hashed_password = ?, authority_code = ?, \
                del_flag = ?, update_user = ?, update_date = CURRENT_TIMESTAMP \
         WHERE id = ?",
    )
    .bind(&user.mail_address)
    .bind(&user.user_name)
    .bind(hashed_password)
    .bind(user.authority_code)
    .bind(user.del_flag)
    .bind(actor)
    .bind(id)
    .execute(&mut *tx)
    .await?;

    tx.commit().await
}

/// Physical delete. Screens only soft-delete through `update`; this is for maintenance jobs.
pub async fn delete(db_pool: &SqlitePool, id: i64) -> Result<(), sqlx::Error> {
    let result = sqlx::query("DELETE FROM m_user WHERE id = ?")
        .bind(id)
        .execute(db_pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(sqlx::Error::RowNotFound);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{auth::convert_password, db};

    async fn pool() -> SqlitePool {
        let db_pool = db::connect("sqlite::memory:", 1).await.unwrap();
        db::reset(&db_pool).await.unwrap();
        db_pool
    }

    fn draft(mail: &str, name: &str) -> UserDraft {
        UserDraft {
            mail_address: mail.to_owned(),
            user_name: name.to_owned(),
            hashed_password: convert_password("pw"),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn deleted_users_are_hidden_unless_included() {
        let db_pool = pool().await;
        create(&db_pool, &draft("a@example.com", "Alice"), "test").await.unwrap();
        let bob = create(&db_pool, &draft("b@example.com", "Bob"), "test").await.unwrap();

        let mut conn = db_pool.acquire().await.unwrap();
        let mut removed = UserDraft::from(&find_by_id(&mut *conn, bob).await.unwrap());
        removed.del_flag = true;
        update(&mut conn, &removed, "test").await.unwrap();
        drop(conn);

        let active = find(&db_pool, &UserFilter::default(), PageRequest::ALL).await.unwrap();
        assert!(active.rows.iter().all(|u| !u.audit.del_flag));
        assert_eq!(active.total, 2);

        let all = find(
            &db_pool,
            &UserFilter { include_deleted: true, ..Default::default() },
            PageRequest::ALL,
        )
        .await
        .unwrap();
        assert_eq!(all.total, 3);
        assert_eq!(all.rows.len(), 3);
        // deleted rows sort last
        assert_eq!(all.rows.last().unwrap().id, bob);
    }

    #[tokio::test]
    async fn paging_windows_keep_the_full_count() {
        let db_pool = pool().await;
        for i in 0..12 {
            create(&db_pool, &draft(&format!("user{i:02}@example.com"), &format!("User {i:02}")), "test")
                .await
                .unwrap();
        }

        let filter = UserFilter { user_name: "User".into(), ..Default::default() };
        let second = find(&db_pool, &filter, PageRequest::page(2, 10)).await.unwrap();
        assert_eq!(second.total, 12);
        assert_eq!(second.rows.len(), 2);

        let all = find(&db_pool, &filter, PageRequest::ALL).await.unwrap();
        assert_eq!(all.rows.len() as i64, all.total);
    }

    #[tokio::test]
    async fn update_keeps_password_when_blank() {
        let db_pool = pool().await;
        let id = create(&db_pool, &draft("c@example.com", "Carol"), "test").await.unwrap();

        let mut conn = db_pool.acquire().await.unwrap();
        let mut edit = UserDraft::from(&find_by_id(&mut *conn, id).await.unwrap());
        edit.user_name = "Caroline".into();
        update(&mut conn, &edit, "editor").await.unwrap();

        let stored = find_by_id(&mut *conn, id).await.unwrap();
        assert_eq!(stored.user_name, "Caroline");
        assert_eq!(stored.hashed_password, convert_password("pw"));
        assert_eq!(stored.audit.update_user, "editor");
        assert_eq!(stored.authority_name.as_deref(), Some("General user"));
    }

    #[tokio::test]
    async fn address_taken_ignores_self() {
        let db_pool = pool().await;
        let id = create(&db_pool, &draft("d@example.com", "Dan"), "test").await.unwrap();

        assert!(address_taken(&db_pool, "d@example.com", None).await.unwrap());
        assert!(!address_taken(&db_pool, "d@example.com", Some(id)).await.unwrap());
        assert!(!address_taken(&db_pool, "nobody@example.com", None).await.unwrap());
    }

    #[tokio::test]
    async fn delete_missing_user_is_not_found() {
        let db_pool = pool().await;
        assert!(matches!(delete(&db_pool, 4242).await, Err(sqlx::Error::RowNotFound)));
    }
}
