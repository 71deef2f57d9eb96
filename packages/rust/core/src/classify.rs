//! Record classification: raw API record in, typed article or skip reason out.

use std::fmt;

use serde_json::Value;

use broadsheet_shared::{
    Article, DisplayFields, PAGE_NUMBER_FIELD, RawArticle, Tag, Tone, WORD_COUNT_FIELD,
};

const BOOK_TAG_TYPE: &str = "newspaper-book";
const SECTION_TAG_TYPE: &str = "newspaper-book-section";
const TONE_TAG_TYPE: &str = "tone";

/// An article together with the book it was filed under.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassifiedArticle {
    pub article: Article,
    pub book: Tag,
}

/// Outcome of classifying one record.
#[derive(Debug, Clone, PartialEq)]
pub enum Classification {
    Classified(ClassifiedArticle),
    Skipped(SkipReason),
}

/// Why a record was left out of the issue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    MissingId,
    NoTags,
    MissingPageNumber,
    /// The page number as it appeared in the record.
    InvalidPageNumber(String),
    NoBookTag,
    /// The word count as it appeared in the record.
    InvalidWordCount(String),
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingId => f.write_str("record has no id"),
            Self::NoTags => f.write_str("record has no tags"),
            Self::MissingPageNumber => f.write_str("no newspaper page number"),
            Self::InvalidPageNumber(v) => write!(f, "invalid newspaper page number {v}"),
            Self::NoBookTag => f.write_str("no newspaper-book tag"),
            Self::InvalidWordCount(v) => write!(f, "invalid word count {v}"),
        }
    }
}

/// Classify one record. Checks run in a fixed order and the first failure
/// decides the skip reason.
pub fn classify(raw: RawArticle) -> Classification {
    match try_classify(raw) {
        Ok(classified) => Classification::Classified(classified),
        Err(reason) => Classification::Skipped(reason),
    }
}

fn try_classify(raw: RawArticle) -> Result<ClassifiedArticle, SkipReason> {
    if raw.id.trim().is_empty() {
        return Err(SkipReason::MissingId);
    }
    if raw.tags.is_empty() {
        return Err(SkipReason::NoTags);
    }

    let page_value = raw
        .fields
        .get(PAGE_NUMBER_FIELD)
        .filter(|v| !v.is_null())
        .ok_or(SkipReason::MissingPageNumber)?;
    let page_number = coerce_int(page_value)
        .filter(|&n| n > 0)
        .and_then(|n| u32::try_from(n).ok())
        .ok_or_else(|| SkipReason::InvalidPageNumber(page_value.to_string()))?;

    let book = find_tag(&raw.tags, BOOK_TAG_TYPE)
        .cloned()
        .ok_or(SkipReason::NoBookTag)?;

    let word_count = match raw.fields.get(WORD_COUNT_FIELD).filter(|v| !v.is_null()) {
        None => 0,
        Some(v) => coerce_int(v).ok_or_else(|| SkipReason::InvalidWordCount(v.to_string()))?,
    };

    let section = find_tag(&raw.tags, SECTION_TAG_TYPE).cloned();
    let tone = find_tag(&raw.tags, TONE_TAG_TYPE)
        .map(|t| Tone::from_tag_id(&t.id))
        .unwrap_or_default();

    let article = Article {
        id: raw.id,
        book_id: book.id.clone(),
        section,
        page_number,
        word_count,
        tone,
        file: String::new(),
        display: DisplayFields {
            fields: raw.fields,
            tags: raw.tags,
            extra: raw.extra,
        },
    };

    Ok(ClassifiedArticle { article, book })
}

fn find_tag<'a>(tags: &'a [Tag], tag_type: &str) -> Option<&'a Tag> {
    tags.iter().find(|t| t.tag_type == tag_type)
}

/// Read a non-negative integer from a JSON number or a decimal string.
fn coerce_int(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => n.as_u64().or_else(|| {
            n.as_f64()
                .filter(|f| f.fract() == 0.0 && *f >= 0.0 && *f <= u64::MAX as f64)
                .map(|f| f as u64)
        }),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn raw(value: Value) -> RawArticle {
        serde_json::from_value(value).expect("raw article")
    }

    fn skipped(value: Value) -> SkipReason {
        match classify(raw(value)) {
            Classification::Skipped(reason) => reason,
            Classification::Classified(c) => panic!("expected a skip, got {}", c.article.id),
        }
    }

    fn classified(value: Value) -> ClassifiedArticle {
        match classify(raw(value)) {
            Classification::Classified(c) => c,
            Classification::Skipped(reason) => panic!("unexpected skip: {reason}"),
        }
    }

    fn book_tag() -> Value {
        json!({"id": "theguardian/mainsection", "type": "newspaper-book", "webTitle": "Main section"})
    }

    #[test]
    fn classifies_complete_record() {
        let c = classified(json!({
            "id": "politics/2015/dec/14/story",
            "webTitle": "Story",
            "fields": {"headline": "Story", "newspaperPageNumber": "12", "wordcount": "845"},
            "tags": [
                {"id": "tone/comment", "type": "tone"},
                {"id": "theguardian/mainsection/politics", "type": "newspaper-book-section", "webTitle": "Politics"},
                book_tag()
            ]
        }));

        assert_eq!(c.book.id, "theguardian/mainsection");
        assert_eq!(c.article.book_id, "theguardian/mainsection");
        assert_eq!(c.article.page_number, 12);
        assert_eq!(c.article.word_count, 845);
        assert_eq!(c.article.tone, Tone::Comment);
        assert_eq!(
            c.article.section.as_ref().map(|s| s.id.as_str()),
            Some("theguardian/mainsection/politics")
        );
        assert_eq!(c.article.display.field_str("headline"), Some("Story"));
        assert_eq!(c.article.display.extra_str("webTitle"), Some("Story"));
        assert_eq!(c.article.display.tags.len(), 3);
    }

    #[test]
    fn numbers_and_padded_strings_coerce() {
        let c = classified(json!({
            "id": "a",
            "fields": {"newspaperPageNumber": 3, "wordcount": " 120 "},
            "tags": [book_tag()]
        }));
        assert_eq!(c.article.page_number, 3);
        assert_eq!(c.article.word_count, 120);

        let c = classified(json!({
            "id": "b",
            "fields": {"newspaperPageNumber": 4.0},
            "tags": [book_tag()]
        }));
        assert_eq!(c.article.page_number, 4);
    }

    #[test]
    fn absent_word_count_is_zero_and_tone_defaults() {
        let c = classified(json!({
            "id": "a",
            "fields": {"newspaperPageNumber": "1"},
            "tags": [book_tag()]
        }));
        assert_eq!(c.article.word_count, 0);
        assert_eq!(c.article.tone, Tone::Default);
        assert!(c.article.section.is_none());
    }

    #[test]
    fn skip_reasons_in_order() {
        assert_eq!(
            skipped(json!({"fields": {"newspaperPageNumber": "1"}, "tags": [book_tag()]})),
            SkipReason::MissingId
        );
        // No tags wins over the missing page number.
        assert_eq!(
            skipped(json!({"id": "a", "fields": {}, "tags": []})),
            SkipReason::NoTags
        );
        assert_eq!(
            skipped(json!({"id": "a", "fields": {}, "tags": [book_tag()]})),
            SkipReason::MissingPageNumber
        );
        assert_eq!(
            skipped(json!({"id": "a", "fields": {"newspaperPageNumber": null}, "tags": [book_tag()]})),
            SkipReason::MissingPageNumber
        );
        // A bad page number is reported before the missing book.
        assert_eq!(
            skipped(json!({"id": "a", "fields": {"newspaperPageNumber": "x"}, "tags": [{"id": "tone/news", "type": "tone"}]})),
            SkipReason::InvalidPageNumber("\"x\"".into())
        );
        assert_eq!(
            skipped(json!({"id": "a", "fields": {"newspaperPageNumber": "2"}, "tags": [{"id": "tone/news", "type": "tone"}]})),
            SkipReason::NoBookTag
        );
        assert_eq!(
            skipped(json!({"id": "a", "fields": {"newspaperPageNumber": "2", "wordcount": "many"}, "tags": [book_tag()]})),
            SkipReason::InvalidWordCount("\"many\"".into())
        );
    }

    #[test]
    fn page_number_must_be_positive() {
        for bad in [json!(0), json!("0"), json!(-3), json!("-3"), json!(2.5), json!(true)] {
            let reason = skipped(json!({
                "id": "a",
                "fields": {"newspaperPageNumber": bad},
                "tags": [book_tag()]
            }));
            assert!(
                matches!(reason, SkipReason::InvalidPageNumber(_)),
                "unexpected reason {reason:?}"
            );
        }
    }

    #[test]
    fn skip_reason_display() {
        assert_eq!(SkipReason::NoBookTag.to_string(), "no newspaper-book tag");
        assert_eq!(
            SkipReason::InvalidPageNumber("\"x\"".into()).to_string(),
            "invalid newspaper page number \"x\""
        );
    }
}
