//! Search state and paging for the list screens.
//!
//! The list pages keep their filters in cookies written by the browser, so a
//! reload or a download repeats the same search.

use std::{collections::HashMap, convert::Infallible};

use axum::{
    extract::FromRequestParts,
    http::{header, request::Parts},
};
use percent_encoding::percent_decode_str;
use tower_sessions::cookie::Cookie;

/// Page links shown at once in the pager.
pub const PAGE_MAX_DISP: i64 = 10;

/// Selectable rows per page; the first one is the default.
pub const SEARCH_LIST_DISP_CNT: [i64; 4] = [10, 30, 50, 100];

/// Highest page number taken from the `hdn_page_no` cookie.
pub const PAGE_NO_MAX: i64 = 1_000_000;

pub const PAGE_NO: &str = "hdn_page_no";
pub const ROW_MAX: &str = "sel_row_max";
pub const INCLUDE_DELETED: &str = "chk_include_deleted";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    /// `-1` selects every matching row.
    pub offset: i64,
    pub limit: i64,
}

impl PageRequest {
    pub const ALL: PageRequest = PageRequest { offset: -1, limit: -1 };

    /// Window for a 1-based page number.
    pub fn page(page_no: i64, row_max: i64) -> Self {
        Self {
            offset: (page_no.max(1) - 1).saturating_mul(row_max.max(1)),
            limit: row_max.max(1),
        }
    }

    pub fn is_all(&self) -> bool {
        self.offset == -1
    }

    /// `(LIMIT, OFFSET)` binds; sqlite reads a negative limit as unbounded.
    pub fn bounds(&self) -> (i64, i64) {
        if self.is_all() {
            (-1, 0)
        } else {
            (self.limit, self.offset)
        }
    }
}

#[derive(Debug, Clone)]
pub struct Page<T> {
    pub rows: Vec<T>,
    /// Matching rows regardless of the window.
    pub total: i64,
}

impl<T> Page<T> {
    pub fn empty() -> Self {
        Self { rows: Vec::new(), total: 0 }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pager {
    pub page_no: i64,
    pub row_max: i64,
    pub rec_count: i64,
    pub start_page: i64,
    pub page_count: i64,
    pub page_max_disp: i64,
}

impl Pager {
    pub fn new(page_no: i64, row_max: i64, rec_count: i64) -> Self {
        let page_no = page_no.max(1);
        let row_max = row_max.max(1);

        let mut start_page = (page_no / PAGE_MAX_DISP) * PAGE_MAX_DISP + 1;
        if page_no % PAGE_MAX_DISP == 0 {
            start_page -= PAGE_MAX_DISP;
        }

        let page_count = (rec_count + row_max - 1) / row_max;

        let page_max_disp = if page_count <= 1 {
            1
        } else if start_page + PAGE_MAX_DISP - 1 > page_count {
            page_count - start_page + 1
        } else {
            PAGE_MAX_DISP
        };

        Self {
            page_no,
            row_max,
            rec_count,
            start_page,
            page_count,
            page_max_disp,
        }
    }

    pub fn render(&self) -> String {
        let mut html = format!(r#"<nav class="pager"><span>{} records</span>"#, self.rec_count);
        if self.start_page > 1 {
            html += &format!(r#"<a href="" data-page="{}">&laquo;</a>"#, self.start_page - 1);
        }
        for page in self.start_page..self.start_page + self.page_max_disp {
            let class = if page == self.page_no { "current" } else { "" };
            html += &format!(r#"<a href="" class="{class}" data-page="{page}">{page}</a>"#);
        }
        let next = self.start_page + self.page_max_disp;
        if next <= self.page_count {
            html += &format!(r#"<a href="" data-page="{next}">&raquo;</a>"#);
        }
        html += "</nav>";
        html
    }
}

/// Row count options for the `sel_row_max` select box.
pub fn row_max_options(selected: i64) -> String {
    SEARCH_LIST_DISP_CNT
        .iter()
        .map(|n| format!(r#"<option value="{n}" {}>{n}</option>"#, crate::res::selected(*n == selected)))
        .collect()
}

/// Cookie values of the request, percent-decoded.
#[derive(Debug, Clone, Default)]
pub struct SearchCookies(HashMap<String, String>);

impl SearchCookies {
    pub fn from_header_values<'a>(values: impl IntoIterator<Item = &'a str>) -> Self {
        let mut cookies = HashMap::new();
        for value in values {
            for cookie in Cookie::split_parse(value).flatten() {
                let decoded = percent_decode_str(cookie.value()).decode_utf8_lossy().into_owned();
                cookies.insert(cookie.name().to_owned(), decoded);
            }
        }
        Self(cookies)
    }

    pub fn text(&self, name: &str) -> String {
        self.0.get(name).cloned().unwrap_or_default()
    }

    pub fn number(&self, name: &str, default: i64) -> i64 {
        self.0
            .get(name)
            .and_then(|value| value.trim().parse().ok())
            .unwrap_or(default)
    }

    pub fn flag(&self, name: &str) -> bool {
        matches!(self.0.get(name).map(String::as_str), Some("1" | "true" | "on"))
    }

    /// `0` means the screen was just opened and nothing is searched yet.
    pub fn page_no(&self) -> i64 {
        self.number(PAGE_NO, 0).clamp(0, PAGE_NO_MAX)
    }

    pub fn row_max(&self) -> i64 {
        let row_max = self.number(ROW_MAX, SEARCH_LIST_DISP_CNT[0]);
        if SEARCH_LIST_DISP_CNT.contains(&row_max) {
            row_max
        } else {
            SEARCH_LIST_DISP_CNT[0]
        }
    }

    pub fn include_deleted(&self) -> bool {
        self.flag(INCLUDE_DELETED)
    }
}

impl<S> FromRequestParts<S> for SearchCookies
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let values = parts
            .headers
            .get_all(header::COOKIE)
            .iter()
            .filter_map(|value| value.to_str().ok());
        Ok(Self::from_header_values(values))
    }
}
