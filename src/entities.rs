//! Row types for the master tables (`m_*`) and the chat tables (`t_*`).
//!
//! Every table carries the same audit columns; they are flattened into each
//! row type through [`Audit`].

use serde::Serialize;
use sqlx::FromRow;
use time::PrimitiveDateTime;

/// Category whose codes name the authority levels.
pub const AUTHORITY_CATEGORY: &str = "authority_code";

#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Audit {
    pub create_user: String,
    pub create_date: PrimitiveDateTime,
    pub update_user: String,
    pub update_date: PrimitiveDateTime,
    pub del_flag: bool,
}

#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Category {
    pub category: String,
    pub display_name: String,
    pub maintenance_flag: bool,
    pub sort_key: i64,
    pub remarks: Option<String>,
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub audit: Audit,
}

/// A code list item, keyed by (category, code).
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct General {
    pub category: String,
    pub code: i64,
    pub code_value: String,
    pub code_reserve01_text: Option<String>,
    pub code_reserve02_text: Option<String>,
    pub code_reserve01_flag: Option<bool>,
    pub code_reserve02_flag: Option<bool>,
    pub code_reserve01_code: Option<String>,
    pub code_reserve02_code: Option<String>,
    pub sort_key: i64,
    pub remarks: Option<String>,
    /// Display name of the owning category.
    pub category_name: String,
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub audit: Audit,
}

/// Editable part of a code list item.
#[derive(Debug, Clone, PartialEq)]
pub struct GeneralDraft {
    pub category: String,
    /// `None` until the row has been created.
    pub code: Option<i64>,
    pub code_value: String,
    pub sort_key: i64,
    pub remarks: Option<String>,
    pub del_flag: bool,
}

impl Default for GeneralDraft {
    fn default() -> Self {
        Self {
            category: String::new(),
            code: None,
            code_value: String::new(),
            sort_key: 1000,
            remarks: None,
            del_flag: false,
        }
    }
}

impl From<&General> for GeneralDraft {
    fn from(general: &General) -> Self {
        Self {
            category: general.category.clone(),
            code: Some(general.code),
            code_value: general.code_value.clone(),
            sort_key: general.sort_key,
            remarks: general.remarks.clone(),
            del_flag: general.audit.del_flag,
        }
    }
}

#[derive(Debug, Clone, FromRow, Serialize)]
pub struct User {
    pub id: i64,
    pub mail_address: String,
    pub user_name: String,
    #[serde(skip)]
    pub hashed_password: String,
    pub authority_code: i64,
    /// Code value of the matching `authority_code` entry, if any.
    pub authority_name: Option<String>,
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub audit: Audit,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct UserDraft {
    pub id: Option<i64>,
    pub mail_address: String,
    pub user_name: String,
    /// Empty keeps the stored password on update.
    pub hashed_password: String,
    pub authority_code: i64,
    pub del_flag: bool,
}

impl From<&User> for UserDraft {
    fn from(user: &User) -> Self {
        Self {
            id: Some(user.id),
            mail_address: user.mail_address.clone(),
            user_name: user.user_name.clone(),
            hashed_password: String::new(),
            authority_code: user.authority_code,
            del_flag: user.audit.del_flag,
        }
    }
}

#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Room {
    pub id: i64,
    pub room_name: Option<String>,
    pub remarks: Option<String>,
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub audit: Audit,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RoomDraft {
    pub id: Option<i64>,
    pub room_name: Option<String>,
    pub remarks: Option<String>,
}

/// Membership row joined with the member's user columns.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct RoomMember {
    pub id: i64,
    pub room_id: i64,
    pub user_id: i64,
    pub mail_address: String,
    pub user_name: String,
}

/// Chat message joined with the sender's name.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct RoomMessage {
    pub id: i64,
    pub room_id: i64,
    pub user_id: i64,
    pub user_name: String,
    pub message: String,
    pub create_date: PrimitiveDateTime,
}
