//! Content API client and edition reference-page scraping.
//!
//! This crate provides:
//! - [`api`]: paginated article retrieval from the content API
//! - [`reference`]: reading the printed date off an edition's contents page

pub mod api;
pub mod reference;

pub use api::{ApiPage, ArticlePages, ContentApi};
pub use reference::{ReferenceClient, parse_printed_date, scrape_printed_date};

/// User-Agent string for all outgoing requests.
pub(crate) const USER_AGENT: &str = concat!("Broadsheet/", env!("CARGO_PKG_VERSION"));

/// Describe a failed request without leaking query strings (the API key) into logs.
pub(crate) fn network_error(target: &str, err: reqwest::Error) -> broadsheet_shared::BroadsheetError {
    let kind = if err.is_timeout() {
        if err.is_connect() {
            "connection timed out"
        } else {
            "read timed out"
        }
    } else if err.is_connect() {
        "can't connect to host"
    } else {
        "request failed"
    };
    broadsheet_shared::BroadsheetError::Network(format!("{target}: {kind}: {}", err.without_url()))
}
