//! Core domain types: raw API records, classified articles, books, issues,
//! and the `contents.json` manifest.

use chrono::{Datelike, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Name of the manifest file inside each dated archive directory.
pub const MANIFEST_FILE_NAME: &str = "contents.json";

/// The weekday printed as the secondary edition.
pub const SECONDARY_WEEKDAY: Weekday = Weekday::Sun;

/// Record field holding the printed page number.
pub const PAGE_NUMBER_FIELD: &str = "newspaperPageNumber";

/// Record field holding the word count.
pub const WORD_COUNT_FIELD: &str = "wordcount";

// ---------------------------------------------------------------------------
// EditionKind
// ---------------------------------------------------------------------------

/// Which printed paper a date belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EditionKind {
    /// Monday to Saturday.
    Standard,
    /// The Sunday paper.
    Secondary,
}

impl EditionKind {
    /// Edition kind for a calendar date. Depends only on the day of the week.
    pub fn for_date(date: NaiveDate) -> Self {
        if date.weekday() == SECONDARY_WEEKDAY {
            Self::Secondary
        } else {
            Self::Standard
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Standard => "standard",
            Self::Secondary => "secondary",
        }
    }
}

impl std::fmt::Display for EditionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Tags and raw records
// ---------------------------------------------------------------------------

/// A tag attached to an API record. Book and section metadata are tags too.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Tag {
    #[serde(default)]
    pub id: String,
    #[serde(rename = "type", default)]
    pub tag_type: String,
    #[serde(rename = "webTitle", default, skip_serializing_if = "Option::is_none")]
    pub web_title: Option<String>,
    #[serde(rename = "webUrl", default, skip_serializing_if = "Option::is_none")]
    pub web_url: Option<String>,
    /// Anything else the API sent (apiUrl, sectionId, ...).
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// One article record exactly as the content API returned it.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RawArticle {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub fields: Map<String, Value>,
    #[serde(default)]
    pub tags: Vec<Tag>,
    /// Remaining top-level keys (webTitle, webUrl, sectionId, ...).
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

// ---------------------------------------------------------------------------
// Tone
// ---------------------------------------------------------------------------

/// Display style of an article, taken from its `tone/*` tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tone {
    News,
    Comment,
    Editorial,
    Letters,
    Feature,
    Review,
    Obituary,
    Interview,
    Analysis,
    #[default]
    Default,
}

impl Tone {
    /// Map a tone tag id (e.g. `tone/comment`) to a display style.
    /// Unknown ids fall back to [`Tone::Default`].
    pub fn from_tag_id(id: &str) -> Self {
        match id {
            "tone/news" => Self::News,
            "tone/comment" => Self::Comment,
            "tone/editorials" => Self::Editorial,
            "tone/letters" => Self::Letters,
            "tone/features" => Self::Feature,
            "tone/reviews" => Self::Review,
            "tone/obituaries" => Self::Obituary,
            "tone/interview" => Self::Interview,
            "tone/analysis" => Self::Analysis,
            _ => Self::Default,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::News => "news",
            Self::Comment => "comment",
            Self::Editorial => "editorial",
            Self::Letters => "letters",
            Self::Feature => "feature",
            Self::Review => "review",
            Self::Obituary => "obituary",
            Self::Interview => "interview",
            Self::Analysis => "analysis",
            Self::Default => "default",
        }
    }
}

// ---------------------------------------------------------------------------
// Article / Book / Issue
// ---------------------------------------------------------------------------

/// Fields handed through to the renderer and the manifest untouched.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DisplayFields {
    /// The record's `fields` map (headline, byline, body, ...).
    pub fields: Map<String, Value>,
    /// The record's full tag list.
    pub tags: Vec<Tag>,
    /// Other top-level record keys.
    pub extra: Map<String, Value>,
}

impl DisplayFields {
    /// A string-valued entry of the `fields` map.
    pub fn field_str(&self, key: &str) -> Option<&str> {
        self.fields.get(key).and_then(Value::as_str)
    }

    /// A string-valued top-level record key.
    pub fn extra_str(&self, key: &str) -> Option<&str> {
        self.extra.get(key).and_then(Value::as_str)
    }
}

/// A successfully classified article.
#[derive(Debug, Clone, PartialEq)]
pub struct Article {
    pub id: String,
    /// Id of the owning book.
    pub book_id: String,
    pub section: Option<Tag>,
    /// Printed page number, always positive.
    pub page_number: u32,
    pub word_count: u64,
    pub tone: Tone,
    /// Rendered file name inside the issue directory. Empty until written.
    pub file: String,
    pub display: DisplayFields,
}

/// A newspaper book with its articles.
#[derive(Debug, Clone, PartialEq)]
pub struct Book {
    /// The `newspaper-book` tag that introduced this book.
    pub meta: Tag,
    pub articles: Vec<Article>,
}

impl Book {
    pub fn id(&self) -> &str {
        &self.meta.id
    }
}

/// One assembled edition.
#[derive(Debug, Clone, PartialEq)]
pub struct Issue {
    pub date: NaiveDate,
    pub kind: EditionKind,
    pub paper_name: String,
    pub max_words: u64,
    pub books: Vec<Book>,
}

impl Issue {
    /// Number of articles across all books.
    pub fn article_count(&self) -> usize {
        self.books.iter().map(|b| b.articles.len()).sum()
    }

    /// Build the serializable `contents.json` form.
    pub fn to_manifest(&self) -> IssueManifest {
        IssueManifest {
            meta: ManifestMeta {
                max_words: self.max_words,
                paper_name: self.paper_name.clone(),
            },
            books: self
                .books
                .iter()
                .map(|book| ManifestBook {
                    meta: book.meta.clone(),
                    articles: book
                        .articles
                        .iter()
                        .map(|a| ManifestArticle::from_article(a, &book.meta))
                        .collect(),
                })
                .collect(),
        }
    }
}

// ---------------------------------------------------------------------------
// Manifest (contents.json)
// ---------------------------------------------------------------------------

/// Root of `contents.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IssueManifest {
    pub meta: ManifestMeta,
    pub books: Vec<ManifestBook>,
}

/// Issue-wide values in `contents.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManifestMeta {
    pub max_words: u64,
    pub paper_name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManifestBook {
    pub meta: Tag,
    pub articles: Vec<ManifestArticle>,
}

/// An article as the reader consumes it: the API record plus derived keys.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManifestArticle {
    pub id: String,
    /// Record fields, with `wordcount` and `newspaperPageNumber` as integers.
    pub fields: Map<String, Value>,
    #[serde(default)]
    pub tags: Vec<Tag>,
    #[serde(rename = "newspaperBook")]
    pub newspaper_book: Tag,
    #[serde(
        rename = "newspaperBookSection",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub newspaper_book_section: Option<Tag>,
    pub tone: Tone,
    pub file: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ManifestArticle {
    fn from_article(article: &Article, book: &Tag) -> Self {
        let mut fields = article.display.fields.clone();
        fields.insert(PAGE_NUMBER_FIELD.into(), Value::from(article.page_number));
        fields.insert(WORD_COUNT_FIELD.into(), Value::from(article.word_count));

        Self {
            id: article.id.clone(),
            fields,
            tags: article.display.tags.clone(),
            newspaper_book: book.clone(),
            newspaper_book_section: article.section.clone(),
            tone: article.tone,
            file: article.file.clone(),
            extra: article.display.extra.clone(),
        }
    }

    /// Word count as written in `fields`.
    pub fn word_count(&self) -> u64 {
        self.fields
            .get(WORD_COUNT_FIELD)
            .and_then(Value::as_u64)
            .unwrap_or(0)
    }

    /// Page number as written in `fields`.
    pub fn page_number(&self) -> u64 {
        self.fields
            .get(PAGE_NUMBER_FIELD)
            .and_then(Value::as_u64)
            .unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn book_tag(id: &str) -> Tag {
        Tag {
            id: id.into(),
            tag_type: "newspaper-book".into(),
            web_title: Some("Main section".into()),
            web_url: Some(format!("https://www.theguardian.com/{id}")),
            extra: Map::new(),
        }
    }

    fn article(id: &str, page: u32, words: u64) -> Article {
        let mut fields = Map::new();
        fields.insert("headline".into(), Value::from("A headline"));
        fields.insert(WORD_COUNT_FIELD.into(), Value::from(words.to_string()));
        Article {
            id: id.into(),
            book_id: "theguardian/mainsection".into(),
            section: None,
            page_number: page,
            word_count: words,
            tone: Tone::News,
            file: format!("{}.html", id.replace('/', "_")),
            display: DisplayFields {
                fields,
                tags: vec![],
                extra: Map::new(),
            },
        }
    }

    #[test]
    fn edition_kind_depends_on_weekday() {
        let sunday = NaiveDate::from_ymd_opt(2015, 12, 13).unwrap();
        let monday = NaiveDate::from_ymd_opt(2015, 12, 14).unwrap();
        let saturday = NaiveDate::from_ymd_opt(2015, 12, 19).unwrap();
        assert_eq!(EditionKind::for_date(sunday), EditionKind::Secondary);
        assert_eq!(EditionKind::for_date(monday), EditionKind::Standard);
        assert_eq!(EditionKind::for_date(saturday), EditionKind::Standard);

        // Same weekday a year later, same answer.
        let next_sunday = NaiveDate::from_ymd_opt(2016, 12, 11).unwrap();
        assert_eq!(EditionKind::for_date(next_sunday), EditionKind::Secondary);
    }

    #[test]
    fn tone_table_falls_back_to_default() {
        assert_eq!(Tone::from_tag_id("tone/comment"), Tone::Comment);
        assert_eq!(Tone::from_tag_id("tone/obituaries"), Tone::Obituary);
        assert_eq!(Tone::from_tag_id("tone/quiz"), Tone::Default);
        assert_eq!(Tone::from_tag_id(""), Tone::Default);
    }

    #[test]
    fn raw_article_keeps_unknown_keys() {
        let json = r#"{
            "id": "world/2015/dec/14/story",
            "webTitle": "Story",
            "sectionId": "world",
            "fields": {"headline": "Story", "newspaperPageNumber": "3"},
            "tags": [{"id": "theguardian/mainsection", "type": "newspaper-book",
                      "webTitle": "Main section", "apiUrl": "https://api/x"}]
        }"#;
        let raw: RawArticle = serde_json::from_str(json).expect("parse");
        assert_eq!(raw.id, "world/2015/dec/14/story");
        assert_eq!(raw.extra["sectionId"], "world");
        assert_eq!(raw.tags[0].tag_type, "newspaper-book");
        assert_eq!(raw.tags[0].extra["apiUrl"], "https://api/x");
    }

    #[test]
    fn manifest_article_overwrites_numeric_fields() {
        let book = book_tag("theguardian/mainsection");
        let issue = Issue {
            date: NaiveDate::from_ymd_opt(2015, 12, 14).unwrap(),
            kind: EditionKind::Standard,
            paper_name: "guardian".into(),
            max_words: 812,
            books: vec![Book {
                meta: book,
                articles: vec![article("uk/2015/dec/14/a", 4, 812)],
            }],
        };

        let manifest = issue.to_manifest();
        let json = serde_json::to_value(&manifest).expect("serialize");

        assert_eq!(json["meta"]["max_words"], 812);
        assert_eq!(json["meta"]["paper_name"], "guardian");
        let a = &json["books"][0]["articles"][0];
        assert_eq!(a["fields"]["wordcount"], 812);
        assert_eq!(a["fields"]["newspaperPageNumber"], 4);
        assert_eq!(a["newspaperBook"]["id"], "theguardian/mainsection");
        assert_eq!(a["tone"], "news");
        assert_eq!(a["file"], "uk_2015_dec_14_a.html");
        assert!(a.get("newspaperBookSection").is_none());
    }

    #[test]
    fn manifest_fixture_validates() {
        let fixture = std::fs::read_to_string("../../../fixtures/json/contents.fixture.json")
            .expect("read fixture");
        let parsed: IssueManifest =
            serde_json::from_str(&fixture).expect("deserialize fixture manifest");
        assert_eq!(parsed.meta.paper_name, "guardian");
        assert_eq!(parsed.books.len(), 2);

        let max = parsed
            .books
            .iter()
            .flat_map(|b| b.articles.iter())
            .map(ManifestArticle::word_count)
            .max()
            .unwrap_or(0);
        assert_eq!(parsed.meta.max_words, max);
    }
}
