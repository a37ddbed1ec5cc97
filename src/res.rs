use axum::response::Html;
use time::{format_description::BorrowedFormatItem, macros::format_description, OffsetDateTime, PrimitiveDateTime};

use crate::AppError;

#[macro_export]
macro_rules! include_res {
    (bytes, $p:expr) => {
        include_bytes!(concat!(env!("CARGO_MANIFEST_DIR"), "/res", $p))
    };
    (str, $p:expr) => {
        include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/res", $p))
    };
}

const DISPLAY_FORMAT: &[BorrowedFormatItem<'static>] =
    format_description!("[year]/[month]/[day] [hour]:[minute]:[second]");

const STAMP_FORMAT: &[BorrowedFormatItem<'static>] =
    format_description!("[year][month][day][hour][minute][second]");

pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            // keeps user text from matching a template placeholder
            '{' => out.push_str("&#123;"),
            '}' => out.push_str("&#125;"),
            c => out.push(c),
        }
    }
    out
}

/// Wraps page content in the shared layout.
pub fn layout(title: &str, login_user: &str, content: &str) -> Html<String> {
    Html(
        include_res!(str, "/pages/layout.html")
            .replace("{title}", &escape(title))
            .replace("{login_user}", &escape(login_user))
            .replace("{content}", content),
    )
}

/// The info page used for logout, init results and every error.
pub fn system_info(title: &str, message: &str) -> Html<String> {
    Html(
        include_res!(str, "/pages/system_info.html")
            .replace("{title}", &escape(title))
            .replace("{message}", &escape(message)),
    )
}

pub fn datetime_display(at: PrimitiveDateTime) -> String {
    at.format(DISPLAY_FORMAT).unwrap_or_default()
}

pub fn timestamp_display(at: OffsetDateTime) -> String {
    at.format(DISPLAY_FORMAT).unwrap_or_default()
}

/// Compact stamp used in download file names.
pub fn file_stamp(at: OffsetDateTime) -> String {
    at.format(STAMP_FORMAT).unwrap_or_default()
}

pub fn checked(flag: bool) -> &'static str {
    if flag { "checked" } else { "" }
}

pub fn selected(flag: bool) -> &'static str {
    if flag { "selected" } else { "" }
}

/// How an entry form is shown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormMode {
    New,
    Disp,
    Edit,
}

impl FormMode {
    pub fn parse(mode: &str) -> Result<Self, AppError> {
        match mode {
            "new" => Ok(FormMode::New),
            "disp" => Ok(FormMode::Disp),
            "edit" => Ok(FormMode::Edit),
            _ => Err(AppError::NotFound("page")),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            FormMode::New => "new",
            FormMode::Disp => "disp",
            FormMode::Edit => "edit",
        }
    }

    /// `disabled` for the read-only display mode.
    pub fn disabled(self) -> &'static str {
        if self == FormMode::Disp { "disabled" } else { "" }
    }
}

/// Message line above an entry form; `result` is `complete` or `error`.
pub fn sys_msg(result: &str, message: &str) -> String {
    if message.is_empty() {
        return String::new();
    }
    format!(r#"<p class="sys-msg {}">{}</p>"#, escape(result), escape(message))
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    #[test]
    fn escapes_markup() {
        assert_eq!(escape(r#"<a href="x">&'"#), "&lt;a href=&quot;x&quot;&gt;&amp;&#x27;");
    }

    #[test]
    fn escapes_placeholder_braces() {
        assert_eq!(escape("{content}"), "&#123;content&#125;");
    }

    #[test]
    fn form_modes() {
        assert_eq!(FormMode::parse("disp").unwrap().disabled(), "disabled");
        assert_eq!(FormMode::parse("edit").unwrap().as_str(), "edit");
        assert!(matches!(FormMode::parse("delete"), Err(AppError::NotFound(_))));
    }

    #[test]
    fn formats_display_and_stamp() {
        assert_eq!(datetime_display(datetime!(2024-03-09 07:05:01)), "2024/03/09 07:05:01");
        assert_eq!(file_stamp(datetime!(2024-03-09 07:05:01 UTC)), "20240309070501");
    }

    #[test]
    fn system_info_escapes_message() {
        let Html(body) = system_info("Title", "<script>");
        assert!(body.contains("&lt;script&gt;"));
        assert!(!body.contains("<script>"));
    }
}
