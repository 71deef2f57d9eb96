//! Paginated retrieval of one edition's articles from the content API.
//!
//! Pages are requested strictly one after another with a politeness delay in
//! between. Any failed page is fatal to the caller; there is no retry.

use std::time::Duration;

use chrono::NaiveDate;
use reqwest::Client;
use serde_json::Value;
use tracing::{debug, info, instrument, warn};
use url::Url;

use broadsheet_shared::{ApiConfig, BroadsheetError, RawArticle, Result};

use crate::{USER_AGENT, network_error};

/// Status value the API uses for a successful query.
const STATUS_OK: &str = "ok";

// ---------------------------------------------------------------------------
// ApiPage
// ---------------------------------------------------------------------------

/// One page of search results.
#[derive(Debug, Clone)]
pub struct ApiPage {
    /// Records that could be read.
    pub records: Vec<RawArticle>,
    /// Number of entries in `results`, readable or not. Drives pagination.
    pub received: usize,
    /// `currentPage` reported by the API, if any.
    pub current_page: Option<u32>,
    /// `pages` (total page count) reported by the API, if any.
    pub pages: Option<u32>,
}

impl ApiPage {
    /// Entries in `results` that could not be read as records.
    pub fn unreadable(&self) -> usize {
        self.received - self.records.len()
    }
}

// ---------------------------------------------------------------------------
// ContentApi
// ---------------------------------------------------------------------------

/// Client for the content API's `/search` endpoint.
pub struct ContentApi {
    client: Client,
    search_url: Url,
    api_key: String,
    page_size: u32,
    page_delay: Duration,
    show_fields: String,
    show_tags: String,
}

impl ContentApi {
    /// Create a client from the `[api]` config and a resolved API key.
    pub fn new(config: &ApiConfig, api_key: &str) -> Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| BroadsheetError::Network(format!("failed to build HTTP client: {e}")))?;

        let mut search_url = Url::parse(&config.base_url).map_err(|e| {
            BroadsheetError::config(format!("invalid api.base_url '{}': {e}", config.base_url))
        })?;
        search_url
            .path_segments_mut()
            .map_err(|_| {
                BroadsheetError::config(format!(
                    "api.base_url '{}' cannot be a base URL",
                    config.base_url
                ))
            })?
            .pop_if_empty()
            .push("search");

        Ok(Self {
            client,
            search_url,
            api_key: api_key.to_string(),
            page_size: config.page_size.max(1),
            page_delay: Duration::from_millis(config.page_delay_ms),
            show_fields: config.show_fields.join(","),
            show_tags: config.show_tags.join(","),
        })
    }

    /// Maximum records requested per page.
    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    /// Lazily walk every page of the given edition date.
    pub fn pages(&self, date: NaiveDate) -> ArticlePages<'_> {
        ArticlePages {
            api: self,
            date,
            next_page: 1,
            done: false,
            unreadable: 0,
        }
    }

    /// Fetch a single page of articles from the edition published on `date`.
    #[instrument(skip(self), fields(page_size = self.page_size))]
    pub async fn fetch_page(&self, date: NaiveDate, page: u32) -> Result<ApiPage> {
        let day = date.format("%Y-%m-%d").to_string();
        let query: [(&str, String); 10] = [
            ("page", page.to_string()),
            ("page-size", self.page_size.to_string()),
            ("api-key", self.api_key.clone()),
            ("format", "json".into()),
            ("show-fields", self.show_fields.clone()),
            ("show-elements", "all".into()),
            ("show-tags", self.show_tags.clone()),
            ("use-date", "newspaper-edition".into()),
            ("from-date", day.clone()),
            ("to-date", day),
        ];

        info!(page, "fetching page of articles");

        let target = self.search_url.as_str();
        let response = self
            .client
            .get(self.search_url.clone())
            .query(&query)
            .send()
            .await
            .map_err(|e| network_error(target, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(BroadsheetError::Network(format!("{target}: HTTP {status}")));
        }

        let body = response
            .text()
            .await
            .map_err(|e| network_error(target, e))?;

        let parsed = parse_search_response(&body)?;
        info!(page, received = parsed.received, "received articles");
        Ok(parsed)
    }
}

/// Validate a `/search` response body and pull out its records.
pub(crate) fn parse_search_response(body: &str) -> Result<ApiPage> {
    let data: Value = serde_json::from_str(body)
        .map_err(|e| BroadsheetError::api(format!("the returned data was not JSON: {e}")))?;

    let response = data
        .get("response")
        .filter(|r| r.get("status").is_some() && r.get("results").is_some())
        .ok_or_else(|| BroadsheetError::api("the returned data was not the expected format"))?;

    let status = response.get("status").and_then(Value::as_str).unwrap_or("");
    if status != STATUS_OK {
        return Err(BroadsheetError::api(format!(
            "the API returned the status '{status}'"
        )));
    }

    let results = response
        .get("results")
        .and_then(Value::as_array)
        .ok_or_else(|| BroadsheetError::api("the returned results were not a list"))?;

    let mut records = Vec::with_capacity(results.len());
    for (i, item) in results.iter().enumerate() {
        match serde_json::from_value::<RawArticle>(item.clone()) {
            Ok(record) => records.push(record),
            Err(e) => {
                let id = item.get("id").and_then(Value::as_str).unwrap_or("<no id>");
                warn!(index = i, id, error = %e, "unreadable record, skipping");
            }
        }
    }

    let as_page = |key: &str| {
        response
            .get(key)
            .and_then(Value::as_u64)
            .and_then(|n| u32::try_from(n).ok())
    };

    Ok(ApiPage {
        records,
        received: results.len(),
        current_page: as_page("currentPage"),
        pages: as_page("pages"),
    })
}

// ---------------------------------------------------------------------------
// ArticlePages
// ---------------------------------------------------------------------------

/// Cursor over the pages of one edition. Finite: stops after the first short page.
pub struct ArticlePages<'a> {
    api: &'a ContentApi,
    date: NaiveDate,
    next_page: u32,
    done: bool,
    unreadable: usize,
}

impl ArticlePages<'_> {
    /// Fetch the next page, or `None` once the edition is exhausted.
    pub async fn next_page(&mut self) -> Result<Option<Vec<RawArticle>>> {
        if self.done {
            return Ok(None);
        }

        let page = self.next_page;
        if page > 1 && !self.api.page_delay.is_zero() {
            debug!(delay_ms = self.api.page_delay.as_millis(), "pausing before next page");
            tokio::time::sleep(self.api.page_delay).await;
        }

        let result = self.api.fetch_page(self.date, page).await?;

        let short_page = result.received < self.api.page_size as usize;
        let last_reported = matches!(
            (result.current_page, result.pages),
            (Some(current), Some(total)) if current >= total
        );
        if short_page || last_reported {
            self.done = true;
        }
        self.next_page += 1;
        self.unreadable += result.unreadable();

        Ok(Some(result.records))
    }

    /// Number of pages requested so far.
    pub fn pages_fetched(&self) -> u32 {
        self.next_page - 1
    }

    /// Entries dropped so far because they could not be read.
    pub fn unreadable(&self) -> usize {
        self.unreadable
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2015, 12, 14).unwrap()
    }

    fn config(base_url: &str) -> ApiConfig {
        ApiConfig {
            base_url: base_url.to_string(),
            page_delay_ms: 0,
            ..ApiConfig::default()
        }
    }

    fn records(start: usize, n: usize) -> Vec<Value> {
        (start..start + n)
            .map(|i| {
                json!({
                    "id": format!("uk/2015/dec/14/story-{i}"),
                    "fields": {"newspaperPageNumber": "1", "wordcount": "100"},
                    "tags": [{"id": "theguardian/mainsection", "type": "newspaper-book"}]
                })
            })
            .collect()
    }

    fn ok_body(results: Vec<Value>) -> Value {
        json!({"response": {"status": "ok", "results": results}})
    }

    async fn collect(api: &ContentApi) -> Result<(Vec<RawArticle>, u32)> {
        let mut pages = api.pages(date());
        let mut all = Vec::new();
        while let Some(batch) = pages.next_page().await? {
            all.extend(batch);
        }
        Ok((all, pages.pages_fetched()))
    }

    #[tokio::test]
    async fn full_page_triggers_second_fetch() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/search"))
            .and(query_param("page", "1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(ok_body(records(0, 200))))
            .expect(1)
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path("/search"))
            .and(query_param("page", "2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(ok_body(records(200, 12))))
            .expect(1)
            .mount(&server)
            .await;

        let api = ContentApi::new(&config(&server.uri()), "test-key").unwrap();
        let (all, pages) = collect(&api).await.unwrap();

        assert_eq!(all.len(), 212);
        assert_eq!(pages, 2);
    }

    #[tokio::test]
    async fn short_page_stops_pagination() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/search"))
            .and(query_param("page", "1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(ok_body(records(0, 150))))
            .expect(1)
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path("/search"))
            .and(query_param("page", "2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(ok_body(vec![])))
            .expect(0)
            .mount(&server)
            .await;

        let api = ContentApi::new(&config(&server.uri()), "test-key").unwrap();
        let (all, pages) = collect(&api).await.unwrap();

        assert_eq!(all.len(), 150);
        assert_eq!(pages, 1);
    }

    #[tokio::test]
    async fn reported_last_page_stops_pagination() {
        let server = MockServer::start().await;

        let body = json!({"response": {
            "status": "ok", "currentPage": 1, "pages": 1, "results": records(0, 200)
        }});
        Mock::given(path("/search"))
            .respond_with(ResponseTemplate::new(200).set_body_json(body))
            .expect(1)
            .mount(&server)
            .await;

        let api = ContentApi::new(&config(&server.uri()), "test-key").unwrap();
        let (all, pages) = collect(&api).await.unwrap();

        assert_eq!(all.len(), 200);
        assert_eq!(pages, 1);
    }

    #[tokio::test]
    async fn query_scopes_to_one_edition_date() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/search"))
            .and(query_param("from-date", "2015-12-14"))
            .and(query_param("to-date", "2015-12-14"))
            .and(query_param("use-date", "newspaper-edition"))
            .and(query_param("api-key", "secret"))
            .and(query_param("page-size", "200"))
            .and(query_param("show-tags", "newspaper-book-section,newspaper-book,tone"))
            .respond_with(ResponseTemplate::new(200).set_body_json(ok_body(records(0, 3))))
            .expect(1)
            .mount(&server)
            .await;

        let api = ContentApi::new(&config(&server.uri()), "secret").unwrap();
        let page = api.fetch_page(date(), 1).await.unwrap();
        assert_eq!(page.records.len(), 3);
    }

    #[tokio::test]
    async fn http_error_is_fatal() {
        let server = MockServer::start().await;

        Mock::given(path("/search"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let api = ContentApi::new(&config(&server.uri()), "test-key").unwrap();
        let err = collect(&api).await.unwrap_err();
        assert!(matches!(err, BroadsheetError::Network(_)));
        assert!(err.to_string().contains("503"));
    }

    #[tokio::test]
    async fn second_page_failure_fails_whole_walk() {
        let server = MockServer::start().await;

        Mock::given(path("/search"))
            .and(query_param("page", "1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(ok_body(records(0, 200))))
            .mount(&server)
            .await;
        Mock::given(path("/search"))
            .and(query_param("page", "2"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let api = ContentApi::new(&config(&server.uri()), "test-key").unwrap();
        assert!(collect(&api).await.is_err());
    }

    #[tokio::test]
    async fn connection_refused_is_network_error() {
        // Port 9 (discard) is closed on test hosts.
        let api = ContentApi::new(&config("http://127.0.0.1:9"), "test-key").unwrap();
        let err = api.fetch_page(date(), 1).await.unwrap_err();
        assert!(matches!(err, BroadsheetError::Network(_)));
        assert!(!err.to_string().contains("test-key"));
    }

    #[test]
    fn non_ok_status_is_api_error() {
        let body = r#"{"response": {"status": "error", "results": []}}"#;
        let err = parse_search_response(body).unwrap_err();
        assert!(matches!(err, BroadsheetError::Api { .. }));
        assert!(err.to_string().contains("'error'"));
    }

    #[test]
    fn missing_keys_is_api_error() {
        let err = parse_search_response(r#"{"response": {"status": "ok"}}"#).unwrap_err();
        assert!(err.to_string().contains("expected format"));

        let err = parse_search_response(r#"{"results": []}"#).unwrap_err();
        assert!(err.to_string().contains("expected format"));

        let err = parse_search_response("<html>oops</html>").unwrap_err();
        assert!(err.to_string().contains("not JSON"));
    }

    #[test]
    fn unreadable_record_counts_toward_page_size() {
        let body = r#"{"response": {"status": "ok", "results": [
            {"id": "a", "tags": []},
            "not a record",
            {"id": "b", "tags": "wrong"}
        ]}}"#;
        let page = parse_search_response(body).unwrap();
        assert_eq!(page.received, 3);
        assert_eq!(page.records.len(), 1);
        assert_eq!(page.records[0].id, "a");
        assert_eq!(page.unreadable(), 2);
    }

    #[tokio::test]
    async fn walk_counts_unreadable_entries() {
        let server = MockServer::start().await;

        let mut results = records(0, 4);
        results.push(json!("not a record"));
        results.push(json!({"id": "uk/2015/dec/14/bad-tags", "tags": "wrong"}));
        Mock::given(path("/search"))
            .respond_with(ResponseTemplate::new(200).set_body_json(ok_body(results)))
            .expect(1)
            .mount(&server)
            .await;

        let api = ContentApi::new(&config(&server.uri()), "test-key").unwrap();
        let mut pages = api.pages(date());
        let batch = pages.next_page().await.unwrap().unwrap();
        assert_eq!(batch.len(), 4);
        assert_eq!(pages.unreadable(), 2);
        assert!(pages.next_page().await.unwrap().is_none());
    }

    #[test]
    fn search_url_appends_path() {
        let api = ContentApi::new(&config("https://content.example.com"), "k").unwrap();
        assert_eq!(api.search_url.as_str(), "https://content.example.com/search");

        let api = ContentApi::new(&config("https://example.com/api/"), "k").unwrap();
        assert_eq!(api.search_url.as_str(), "https://example.com/api/search");
    }
}
