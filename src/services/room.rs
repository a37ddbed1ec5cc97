use sqlx::SqlitePool;
use tracing::debug;

use crate::{
    auth::ADMINISTRATOR,
    entities::{Room, RoomDraft, RoomMember, RoomMessage, User},
    paging::{Page, PageRequest},
    repos::{self, room::RoomFilter},
    AppError, AppResult,
};

use super::Entry;

pub async fn find_rooms(db_pool: &SqlitePool, filter: &RoomFilter, page: PageRequest) -> AppResult<Page<Room>> {
    Ok(repos::room::find_list(db_pool, filter, page).await?)
}

/// Rooms are visible to their members and to administrators.
pub async fn ensure_member(db_pool: &SqlitePool, room_id: i64, login_user: &User) -> AppResult<()> {
    if login_user.authority_code == ADMINISTRATOR {
        return Ok(());
    }
    match repos::room::find_member(db_pool, room_id, login_user.id).await? {
        Some(_) => Ok(()),
        None => Err(AppError::NotPermitted),
    }
}

pub async fn get_room(db_pool: &SqlitePool, id: i64, login_user: &User) -> AppResult<Room> {
    let room = repos::room::find_by_id(db_pool, id).await?;
    if room.audit.del_flag {
        return Err(AppError::NotFound("room"));
    }
    ensure_member(db_pool, id, login_user).await?;
    Ok(room)
}

pub async fn members(db_pool: &SqlitePool, room_id: i64, login_user: &User) -> AppResult<Vec<RoomMember>> {
    ensure_member(db_pool, room_id, login_user).await?;
    Ok(repos::room::members(db_pool, room_id).await?)
}

/// Candidates for the member picker: everyone sharing a room with the user.
pub async fn selectable_members(db_pool: &SqlitePool, login_user: &User) -> AppResult<Vec<User>> {
    Ok(repos::room::co_members(db_pool, login_user.id).await?)
}

/// The login user always stays a member of what they save.
pub async fn save_room(
    db_pool: &SqlitePool,
    draft: &RoomDraft,
    mut mail_addresses: Vec<String>,
    login_user: &User,
) -> AppResult<Entry<Room>> {
    mail_addresses.push(login_user.mail_address.clone());
    let actor = login_user.mail_address.as_str();

    if let Some(id) = draft.id {
        ensure_member(db_pool, id, login_user).await?;
    }

    let mut conn = db_pool.acquire().await?;
    match draft.id {
        None => {
            let id = repos::room::create(&mut conn, draft, &mail_addresses, actor).await?;
            debug!("room {id} created by {actor}");
            Ok(Entry::Created(repos::room::find_by_id(&mut *conn, id).await?))
        }
        Some(id) => {
            repos::room::update(&mut conn, draft, &mail_addresses, actor).await?;
            Ok(Entry::Updated(repos::room::find_by_id(&mut *conn, id).await?))
        }
    }
}

pub async fn messages(db_pool: &SqlitePool, room_id: i64, login_user: &User) -> AppResult<Vec<RoomMessage>> {
    ensure_member(db_pool, room_id, login_user).await?;
    Ok(repos::room::messages(db_pool, room_id).await?)
}

/// Persists a chat line; the sender's id doubles as the audit user.
pub async fn entry_message(db_pool: &SqlitePool, room_id: i64, user_id: i64, message: &str) -> AppResult<i64> {
    let actor = user_id.to_string();
    Ok(repos::room::entry_message(db_pool, room_id, user_id, message, &actor).await?)
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

    async fn user(db_pool: &SqlitePool, mail: &str) -> User {
        repos::user::find_by_address(db_pool, mail).await.unwrap().unwrap()
    }

    fn named(name: &str) -> RoomDraft {
        RoomDraft {
            room_name: Some(name.to_owned()),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn creator_is_always_a_member() {
        let db_pool = pool().await;
        let admin = user(&db_pool, "admin@example.com").await;

        let Entry::Created(room) = save_room(&db_pool, &named("Ops"), vec!["x@example.com".into()], &admin)
            .await
            .unwrap()
        else {
            panic!("expected a new room");
        };

        let mails: Vec<_> = repos::room::members(&db_pool, room.id)
            .await
            .unwrap()
            .into_iter()
            .map(|m| m.mail_address)
            .collect();
        assert_eq!(mails, vec!["admin@example.com", "x@example.com"]);
    }

    #[tokio::test]
    async fn outsiders_cannot_open_a_room() {
        let db_pool = pool().await;
        let admin = user(&db_pool, "admin@example.com").await;
        let Entry::Created(room) = save_room(&db_pool, &named("Secret"), vec!["in@example.com".into()], &admin)
            .await
            .unwrap()
        else {
            panic!("expected a new room");
        };
        save_room(&db_pool, &named("Other"), vec!["out@example.com".into()], &admin)
            .await
            .unwrap();

        let insider = user(&db_pool, "in@example.com").await;
        let outsider = user(&db_pool, "out@example.com").await;

        assert!(get_room(&db_pool, room.id, &insider).await.is_ok());
        assert!(matches!(get_room(&db_pool, room.id, &outsider).await, Err(AppError::NotPermitted)));
        assert!(matches!(messages(&db_pool, room.id, &outsider).await, Err(AppError::NotPermitted)));

        let takeover = RoomDraft {
            id: Some(room.id),
            room_name: Some("Mine now".into()),
            remarks: None,
        };
        assert!(matches!(
            save_room(&db_pool, &takeover, vec![], &outsider).await,
            Err(AppError::NotPermitted)
        ));
    }

    #[tokio::test]
    async fn messages_come_back_with_sender_names() {
        let db_pool = pool().await;
        let admin = user(&db_pool, "admin@example.com").await;
        let Entry::Created(room) = save_room(&db_pool, &named("Talk"), vec![], &admin).await.unwrap() else {
            panic!("expected a new room");
        };

        entry_message(&db_pool, room.id, admin.id, "first").await.unwrap();
        entry_message(&db_pool, room.id, admin.id, "second").await.unwrap();

        let lines = messages(&db_pool, room.id, &admin).await.unwrap();
        assert_eq!(lines.iter().map(|m| m.message.as_str()).collect::<Vec<_>>(), vec!["first", "second"]);
        assert!(lines.iter().all(|m| m.user_name == "Administrator"));
    }
}
