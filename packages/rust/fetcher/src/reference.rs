//! Printed-date scraping from an edition's contents page.
//!
//! The contents page of the current paper carries the date printed on it
//! ("Monday 14 December 2015"). Comparing that with the clock tells us
//! whether the publisher has rolled over to the edition we expect.

use std::time::Duration;

use chrono::NaiveDate;
use reqwest::Client;
use scraper::{Html, Selector};
use tracing::{debug, instrument};

use broadsheet_shared::{BroadsheetError, Result};

use crate::{USER_AGENT, network_error};

/// Maximum redirects followed for a contents page.
const MAX_REDIRECTS: usize = 5;

/// Date layouts seen on contents pages, tried in order.
const PRINTED_DATE_FORMATS: &[&str] = &["%A %d %B %Y", "%A, %d %B %Y", "%d %B %Y", "%Y-%m-%d"];

/// HTTP client for edition contents pages.
pub struct ReferenceClient {
    client: Client,
}

impl ReferenceClient {
    /// Create a client with the given per-request timeout.
    pub fn new(timeout_secs: u64) -> Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .redirect(reqwest::redirect::Policy::limited(MAX_REDIRECTS))
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| BroadsheetError::Network(format!("failed to build HTTP client: {e}")))?;

        Ok(Self { client })
    }

    /// Fetch `url` and read the printed date from the element matching `selector`.
    #[instrument(skip(self))]
    pub async fn printed_date(&self, url: &str, selector: &str) -> Result<NaiveDate> {
        debug!("fetching contents page");

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| network_error(url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(BroadsheetError::Network(format!("{url}: HTTP {status}")));
        }

        let body = response.text().await.map_err(|e| network_error(url, e))?;
        scrape_printed_date(&body, selector)
    }
}

/// Extract and parse the printed date from a contents page.
pub fn scrape_printed_date(html: &str, selector: &str) -> Result<NaiveDate> {
    let sel = Selector::parse(selector).map_err(|e| {
        BroadsheetError::config(format!("invalid printed date selector '{selector}': {e:?}"))
    })?;

    let doc = Html::parse_document(html);
    let text = doc
        .select(&sel)
        .next()
        .map(|el| el.text().collect::<String>())
        .ok_or_else(|| {
            BroadsheetError::parse(format!("no element matching '{selector}' on contents page"))
        })?;

    parse_printed_date(&text)
}

/// Parse a human-written date such as "Monday 14 December 2015".
pub fn parse_printed_date(text: &str) -> Result<NaiveDate> {
    let normalized = text.split_whitespace().collect::<Vec<_>>().join(" ");

    PRINTED_DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(&normalized, fmt).ok())
        .ok_or_else(|| BroadsheetError::parse(format!("unrecognised printed date '{normalized}'")))
}
