use std::collections::BTreeSet;

use sqlx::{Connection, QueryBuilder, Sqlite, SqliteConnection, SqliteExecutor, SqlitePool};
use tracing::debug;

use crate::{
    auth::convert_password,
    entities::{Room, RoomDraft, RoomMember, RoomMessage, User, UserDraft},
    paging::{Page, PageRequest},
};

use super::user;

const SELECT_ROOM: &str = "SELECT r.id, r.room_name, r.remarks, \
            r.create_user, r.create_date, r.update_user, r.update_date, r.del_flag \
     FROM t_room r";

#[derive(Debug, Clone, Default)]
pub struct RoomFilter {
    /// Substring of the room name.
    pub room_name: String,
    /// Only rooms this user belongs to.
    pub member_id: Option<i64>,
}

fn push_filter<'a>(query: &mut QueryBuilder<'a, Sqlite>, filter: &'a RoomFilter) {
    query.push(" WHERE r.del_flag = 0");
    if !filter.room_name.is_empty() {
        query
            .push(" AND instr(r.room_name, ")
            .push_bind(filter.room_name.as_str())
            .push(") > 0");
    }
    if let Some(member_id) = filter.member_id {
        query
            .push(" AND EXISTS (SELECT 1 FROM t_room_member m WHERE m.room_id = r.id AND m.user_id = ")
            .push_bind(member_id)
            .push(")");
    }
}

pub async fn find_list(db_pool: &SqlitePool, filter: &RoomFilter, page: PageRequest) -> Result<Page<Room>, sqlx::Error> {
    let mut count = QueryBuilder::new("SELECT COUNT(*) FROM t_room r");
    push_filter(&mut count, filter);
    let (total,): (i64,) = count.build_query_as::<(i64,)>().fetch_one(db_pool).await?;

    let (limit, offset) = page.bounds();
    let mut query = QueryBuilder::new(SELECT_ROOM);
    push_filter(&mut query, filter);
    query
        .push(" ORDER BY r.update_date DESC, r.id DESC LIMIT ")
        .push_bind(limit)
        .push(" OFFSET ")
        .push_bind(offset);
    let rows = query.build_query_as::<Room>().fetch_all(db_pool).await?;

    Ok(Page { rows, total })
}

pub async fn find_by_id<'e>(executor: impl SqliteExecutor<'e>, id: i64) -> Result<Room, sqlx::Error> {
    sqlx::query_as(&format!("{SELECT_ROOM} WHERE r.id = ?"))
        .bind(id)
        .fetch_one(executor)
        .await
}

pub async fn members<'e>(executor: impl SqliteExecutor<'e>, room_id: i64) -> Result<Vec<RoomMember>, sqlx::Error> {
    sqlx::query_as(
        "SELECT m.id, m.room_id, m.user_id, u.mail_address, u.user_name \
         FROM t_room_member m JOIN m_user u ON u.id = m.user_id \
         WHERE m.room_id = ? \
         ORDER BY u.mail_address",
    )
    .bind(room_id)
    .fetch_all(executor)
    .await
}

pub async fn find_member(db_pool: &SqlitePool, room_id: i64, user_id: i64) -> Result<Option<RoomMember>, sqlx::Error> {
    sqlx::query_as(
        "SELECT m.id, m.room_id, m.user_id, u.mail_address, u.user_name \
         FROM t_room_member m JOIN m_user u ON u.id = m.user_id \
         WHERE m.room_id = ? AND m.user_id = ?",
    )
    .bind(room_id)
    .bind(user_id)
    .fetch_optional(db_pool)
    .await
}

/// Membership of an active user in an active room.
pub async fn find_active_member(
    db_pool: &SqlitePool,
    room_id: i64,
    user_id: i64,
) -> Result<Option<RoomMember>, sqlx::Error> {
    sqlx::query_as(
        "SELECT m.id, m.room_id, m.user_id, u.mail_address, u.user_name \
         FROM t_room_member m \
         JOIN m_user u ON u.id = m.user_id \
         JOIN t_room r ON r.id = m.room_id \
         WHERE m.room_id = ? AND m.user_id = ? AND r.del_flag = 0 AND u.del_flag = 0",
    )
    .bind(room_id)
    .bind(user_id)
    .fetch_optional(db_pool)
    .await
}

/// Everyone sharing at least one room with `user_id`, by mail address.
pub async fn co_members(db_pool: &SqlitePool, user_id: i64) -> Result<Vec<User>, sqlx::Error> {
    sqlx::query_as(&format!(
        "{} WHERE u.id IN ( \
             SELECT m.user_id FROM t_room_member m \
             WHERE m.room_id IN (SELECT room_id FROM t_room_member WHERE user_id = ?) \
         ) ORDER BY u.mail_address",
        user::SELECT_USER
    ))
    .bind(user_id)
    .fetch_all(db_pool)
    .await
}

/// Normalised member list: trimmed, non-empty, unique.
fn member_set(mail_addresses: &[String]) -> BTreeSet<String> {
    mail_addresses
        .iter()
        .map(|mail| mail.trim())
        .filter(|mail| !mail.is_empty())
        .map(str::to_owned)
        .collect()
}

/// Looks a member up by mail, registering a placeholder user when unknown.
async fn resolve_member(conn: &mut SqliteConnection, mail_address: &str, actor: &str) -> Result<i64, sqlx::Error> {
    if let Some(user) = user::find_by_address(&mut *conn, mail_address).await? {
        return Ok(user.id);
    }

    debug!("registering placeholder user {mail_address}");
    let placeholder = UserDraft {
        mail_address: mail_address.to_owned(),
        user_name: mail_address.to_owned(),
        hashed_password: convert_password(mail_address),
        ..Default::default()
    };
    user::create(&mut *conn, &placeholder, actor).await
}

async fn add_member(conn: &mut SqliteConnection, room_id: i64, mail_address: &str, actor: &str) -> Result<(), sqlx::Error> {
    let user_id = resolve_member(conn, mail_address, actor).await?;
    sqlx::query("INSERT INTO t_room_member (room_id, user_id, create_user, update_user) VALUES (?, ?, ?, ?)")
        .bind(room_id)
        .bind(user_id)
        .bind(actor)
        .bind(actor)
        .execute(&mut *conn)
        .await?;
    Ok(())
}

pub async fn create(
    conn: &mut SqliteConnection,
    room: &RoomDraft,
    mail_addresses: &[String],
    actor: &str,
) -> Result<i64, sqlx::Error> {
    let mut tx = conn.begin().await?;

    let room_id = sqlx::query("INSERT INTO t_room (room_name, remarks, create_user, update_user) VALUES (?, ?, ?, ?)")
        .bind(&room.room_name)
        .bind(&room.remarks)
        .bind(actor)
        .bind(actor)
        .execute(&mut *tx)
        .await?
        .last_insert_rowid();

    for mail_address in member_set(mail_addresses) {
        add_member(&mut tx, room_id, &mail_address, actor).await?;
    }

    tx.commit().await?;
    Ok(room_id)
}

/// Overwrites name and remarks and reconciles the member list by mail address.
pub async fn update(
    conn: &mut SqliteConnection,
    room: &RoomDraft,
    mail_addresses: &[String],
    actor: &str,
) -> Result<(), sqlx::Error> {
    let room_id = room.id.ok_or(sqlx::Error::RowNotFound)?;

    let mut tx = conn.begin().await?;
    find_by_id(&mut *tx, room_id).await?;

    sqlx::query(
        "UPDATE t_room SET room_name = ?, remarks = ?, update_user = ?, update_date = CURRENT_TIMESTAMP WHERE id = ?",
    )
    .bind(&room.room_name)
    .bind(&room.remarks)
    .bind(actor)
    .bind(room_id)
    .execute(&mut *tx)
    .await?;

    let existing = members(&mut *tx, room_id).await?;
    let wanted = member_set(mail_addresses);

    for member in existing.iter().filter(|m| !wanted.contains(&m.mail_address)) {
        sqlx::query("DELETE FROM t_room_member WHERE id = ?")
            .bind(member.id)
            .execute(&mut *tx)
            .await?;
    }

    for mail_address in wanted.iter().filter(|mail| !existing.iter().any(|m| &m.mail_address == *mail)) {
        add_member(&mut tx, room_id, mail_address, actor).await?;
    }

    tx.commit().await
}

/// Removes the room together with its members and messages.
///
/// Screens only soft-delete through `update`; this is for maintenance jobs.
pub async fn delete(conn: &mut SqliteConnection, room_id: i64) -> Result<(), sqlx::Error> {
    let mut tx = conn.begin().await?;

    sqlx::query("DELETE FROM t_room_message WHERE room_id = ?")
        .bind(room_id)
        .execute(&mut *tx)
        .await?;
    sqlx::query("DELETE FROM t_room_member WHERE room_id = ?")
        .bind(room_id)
        .execute(&mut *tx)
        .await?;
    let result = sqlx::query("DELETE FROM t_room WHERE id = ?")
        .bind(room_id)
        .execute(&mut *tx)
        .await?;

    if result.rows_affected() == 0 {
        return Err(sqlx::Error::RowNotFound);
    }
    tx.commit().await
}

pub async fn entry_message(
    db_pool: &SqlitePool,
    room_id: i64,
    user_id: i64,
    message: &str,
    actor: &str,
) -> Result<i64, sqlx::Error> {
    let result = sqlx::query(
        "INSERT INTO t_room_message (room_id, user_id, message, create_user, update_user) VALUES (?, ?, ?, ?, ?)",
    )
    .bind(room_id)
    .bind(user_id)
    .bind(message)
    .bind(actor)
    .bind(actor)
    .execute(db_pool)
    .await?;

    Ok(result.last_insert_rowid())
}

/// Messages of a room in posting order, with sender names.
pub async fn messages(db_pool: &SqlitePool, room_id: i64) -> Result<Vec<RoomMessage>, sqlx::Error> {
    sqlx::query_as(
        "SELECT t.id, t.room_id, t.user_id, u.user_name, t.message, t.create_date \
         FROM t_room_message t JOIN m_user u ON u.id = t.user_id \
         WHERE t.room_id = ? AND t.del_flag = 0 \
         ORDER BY t.id",
    )
    .bind(room_id)
    .fetch_all(db_pool)
    .await
}
