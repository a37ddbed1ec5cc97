use std::{collections::HashMap, sync::LazyLock};

use regex::Regex;

use crate::{appresult::AppError, entities::User, AppResult};

pub const GENERAL_USER: i64 = 0;
pub const ADMINISTRATOR: i64 = 99;

/// Paths open to everyone who can log in.
const FOR_ALL_USERS: &[&str] = &[
    r"^/$",
    r"^/logout$",
    r"^/user/\d{1,10}/disp$",
    r"^/user/\d{1,10}/edit$",
    r"^/user_entry$",
    r"^/room/list$",
    r"^/room/new$",
    r"^/room/\d{1,10}/(disp|edit)(/api)?$",
    r"^/room_entry$",
    r"^/chat/\d{1,10}/(form|api)$",
];

static PATH_TABLE: LazyLock<HashMap<i64, Vec<Regex>>> = LazyLock::new(|| {
    let compile = |patterns: &[&str]| {
        patterns
            .iter()
            .filter_map(|pattern| Regex::new(pattern).ok())
            .collect::<Vec<_>>()
    };

    HashMap::from([
        (GENERAL_USER, compile(FOR_ALL_USERS)),
        (ADMINISTRATOR, compile(&[r"^.{1,255}$"])),
    ])
});

pub fn is_permitted(authority_code: i64, path: &str) -> bool {
    PATH_TABLE
        .get(&authority_code)
        .is_some_and(|patterns| patterns.iter().any(|re| re.is_match(path)))
}

/// Unknown authority codes are an account problem rather than a path one.
pub fn check_permission(user: &User, path: &str) -> AppResult<()> {
    if !PATH_TABLE.contains_key(&user.authority_code) {
        tracing::warn!("{} has unknown authority code {}", user.mail_address, user.authority_code);
        return Err(AppError::Unauthorized(format!("AUTHORITY_{}", user.authority_code)));
    }

    if is_permitted(user.authority_code, path) {
        Ok(())
    } else {
        tracing::warn!("{} may not open {path}", user.mail_address);
        Err(AppError::NotPermitted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn general_users_get_the_allow_list() {
        assert!(is_permitted(GENERAL_USER, "/"));
        assert!(is_permitted(GENERAL_USER, "/user/12/edit"));
        assert!(is_permitted(GENERAL_USER, "/room/3/edit/api"));
        assert!(is_permitted(GENERAL_USER, "/chat/3/form"));
        assert!(!is_permitted(GENERAL_USER, "/user/list"));
        assert!(!is_permitted(GENERAL_USER, "/general/list"));
        assert!(!is_permitted(GENERAL_USER, "/user/12345678901/edit"));
    }

    #[test]
    fn administrators_match_everything() {
        assert!(is_permitted(ADMINISTRATOR, "/general/list"));
        assert!(is_permitted(ADMINISTRATOR, "/user/list/download"));
    }

    #[test]
    fn unknown_authority_matches_nothing() {
        assert!(!is_permitted(5, "/"));
    }

    fn user(authority_code: i64) -> User {
        let at = time::macros::datetime!(2024-01-01 00:00:00);
        User {
            id: 1,
            mail_address: "someone@example.com".into(),
            user_name: "Someone".into(),
            hashed_password: String::new(),
            authority_code,
            authority_name: None,
            audit: crate::entities::Audit {
                create_user: "SYSTEM".into(),
                create_date: at,
                update_user: "SYSTEM".into(),
                update_date: at,
                del_flag: false,
            },
        }
    }

    #[test]
    fn check_permission_distinguishes_path_and_account() {
        assert!(check_permission(&user(GENERAL_USER), "/room/list").is_ok());
        assert!(matches!(check_permission(&user(GENERAL_USER), "/user/list"), Err(AppError::NotPermitted)));
        assert!(matches!(
            check_permission(&user(7), "/"),
            Err(AppError::Unauthorized(reason)) if reason == "AUTHORITY_7"
        ));
    }
}
