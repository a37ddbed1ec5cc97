//! CSV downloads of the search screens.

use axum::{
    http::{header, HeaderValue},
    response::{IntoResponse, Response},
};
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use time::OffsetDateTime;

use crate::{
    entities::{General, User},
    res,
};

pub const GENERAL_DOWNLOAD_FILE_NAME: &str = "general_download";
pub const USER_DOWNLOAD_FILE_NAME: &str = "user_download";

const FILE_NAME: &AsciiSet = &NON_ALPHANUMERIC.remove(b'_').remove(b'-').remove(b'.');

#[derive(Debug, Default)]
pub struct Csv {
    body: String,
}

impl Csv {
    pub fn new(header: &[&str]) -> Self {
        let mut csv = Self::default();
        csv.row(header.iter().copied());
        csv
    }

    pub fn row<S: AsRef<str>>(&mut self, fields: impl IntoIterator<Item = S>) {
        let mut first = true;
        for field in fields {
            if !first {
                self.body.push(',');
            }
            first = false;
            push_field(&mut self.body, field.as_ref());
        }
        self.body.push_str("\r\n");
    }

    pub fn as_str(&self) -> &str {
        &self.body
    }

    /// `{prefix}_{YYYYmmddHHMMSS}.csv` as an attachment.
    pub fn into_attachment(self, prefix: &str, now: OffsetDateTime) -> Response {
        let file_name = format!("{prefix}_{}.csv", res::file_stamp(now));
        let disposition = format!(
            "attachment; filename=\"{}\"",
            utf8_percent_encode(&file_name, FILE_NAME)
        );

        // BOM so spreadsheet software picks UTF-8
        let body = format!("\u{feff}{}", self.body);

        let mut response = ([(header::CONTENT_TYPE, "text/csv; charset=utf-8")], body).into_response();
        if let Ok(value) = HeaderValue::from_str(&disposition) {
            response.headers_mut().insert(header::CONTENT_DISPOSITION, value);
        }
        response
    }
}

fn push_field(out: &mut String, field: &str) {
    if field.contains([',', '"', '\n', '\r']) {
        out.push('"');
        out.push_str(&field.replace('"', "\"\""));
        out.push('"');
    } else {
        out.push_str(field);
    }
}

pub fn general_csv(rows: &[General]) -> Csv {
    let mut csv = Csv::new(&[
        "Category",
        "Code",
        "Value",
        "Remarks",
        "Sort key",
        "Last updated by",
        "Last updated at",
        "Deleted",
    ]);
    for general in rows {
        csv.row([
            general.category_name.clone(),
            general.code.to_string(),
            general.code_value.clone(),
            general.remarks.clone().unwrap_or_default(),
            general.sort_key.to_string(),
            general.audit.update_user.clone(),
            res::datetime_display(general.audit.update_date),
            general.audit.del_flag.to_string(),
        ]);
    }
    csv
}

pub fn user_csv(rows: &[User]) -> Csv {
    let mut csv = Csv::new(&[
        "ID",
        "Mail address",
        "Name",
        "Authority",
        "Last updated by",
        "Last updated at",
        "Deleted",
    ]);
    for user in rows {
        csv.row([
            user.id.to_string(),
            user.mail_address.clone(),
            user.user_name.clone(),
            user.authority_name.clone().unwrap_or_default(),
            user.audit.update_user.clone(),
            res::datetime_display(user.audit.update_date),
            user.audit.del_flag.to_string(),
        ]);
    }
    csv
}
