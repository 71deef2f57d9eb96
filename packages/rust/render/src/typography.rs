//! Typographic post-processing for rendered article HTML.
//!
//! Each pass is a function over text applied in sequence. Text passes only
//! touch character data: markup, comments and the contents of
//! `pre`/`code`/`script`/`style` are copied through untouched.

use std::sync::LazyLock;

use regex::{Captures, Regex};

/// Elements whose contents are never rewritten.
const RAW_TAGS: &[&str] = &["pre", "code", "script", "style", "textarea"];

/// Elements that continue the surrounding run of text. Any other tag starts
/// a fresh run for quote direction purposes.
const INLINE_TAGS: &[&str] = &[
    "a", "abbr", "b", "cite", "em", "i", "mark", "q", "s", "small", "span", "strong", "sub",
    "sup", "u",
];

/// Blocks whose last two words are joined with a non-breaking space.
const WIDONT_TAGS: &[&str] = &["p", "h1", "h2", "h3", "h4", "h5", "h6", "li", "dt", "dd"];

static TAG_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)<!--.*?-->|</?[A-Za-z][^>]*>|<![^>]*>").expect("valid regex")
});

static TAG_NAME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^</?([A-Za-z][A-Za-z0-9]*)").expect("valid regex"));

/// Run the full typography pipeline on an HTML fragment.
pub fn typeset(html: &str) -> String {
    let mut result = map_text(html, |text, _| ellipses(text));
    result = map_text(&result, |text, _| dashes(text));
    result = map_text(&result, smart_quotes);
    result = widont(&result);
    result
}

// ---------------------------------------------------------------------------
// Text walking
// ---------------------------------------------------------------------------

/// Apply `pass` to every run of character data outside raw elements.
///
/// `pass` also receives the last character emitted in the current run of
/// inline text, so context-sensitive passes can look across inline tags.
fn map_text<F>(html: &str, pass: F) -> String
where
    F: Fn(&str, Option<char>) -> String,
{
    let mut out = String::with_capacity(html.len());
    let mut last = 0;
    let mut raw_depth = 0usize;
    let mut prev: Option<char> = None;

    for m in TAG_RE.find_iter(html) {
        push_text(&mut out, &html[last..m.start()], raw_depth, &mut prev, &pass);

        let tag = m.as_str();
        if let Some(caps) = TAG_NAME_RE.captures(tag) {
            let name = &caps[1];
            let closing = tag.starts_with("</");
            if is_one_of(name, RAW_TAGS) {
                if closing {
                    raw_depth = raw_depth.saturating_sub(1);
                } else if !tag.ends_with("/>") {
                    raw_depth += 1;
                }
            }
            if !is_one_of(name, INLINE_TAGS) {
                prev = None;
            }
        }

        out.push_str(tag);
        last = m.end();
    }
    push_text(&mut out, &html[last..], raw_depth, &mut prev, &pass);

    out
}

fn push_text<F>(out: &mut String, text: &str, raw_depth: usize, prev: &mut Option<char>, pass: &F)
where
    F: Fn(&str, Option<char>) -> String,
{
    if text.is_empty() {
        return;
    }
    if raw_depth > 0 {
        out.push_str(text);
        return;
    }
    let replaced = pass(text, *prev);
    if let Some(c) = replaced.chars().last() {
        *prev = Some(c);
    }
    out.push_str(&replaced);
}

fn is_one_of(name: &str, names: &[&str]) -> bool {
    names.iter().any(|n| n.eq_ignore_ascii_case(name))
}

// ---------------------------------------------------------------------------
// Pass 1: Ellipses
// ---------------------------------------------------------------------------

fn ellipses(text: &str) -> String {
    static ELLIPSIS_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"\.\.\.|\. \. \.").expect("valid regex"));

    ELLIPSIS_RE.replace_all(text, "\u{2026}").into_owned()
}

// ---------------------------------------------------------------------------
// Pass 2: Dashes
// ---------------------------------------------------------------------------

/// `---` and `--` become an em dash; a hyphen standing alone between spaces
/// becomes an en dash.
fn dashes(text: &str) -> String {
    static DOUBLE_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"-{2,3}").expect("valid regex"));
    static SPACED_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"(\s)-(\s)").expect("valid regex"));

    let result = DOUBLE_RE.replace_all(text, "\u{2014}");
    SPACED_RE.replace_all(&result, "${1}\u{2013}${2}").into_owned()
}

// ---------------------------------------------------------------------------
// Pass 3: Smart quotes
// ---------------------------------------------------------------------------

fn smart_quotes(text: &str, before: Option<char>) -> String {
    let mut out = String::with_capacity(text.len());
    let mut prev = before;

    for c in text.chars() {
        let replaced = match c {
            '"' if opens_quote(prev) => '\u{201C}',
            '"' => '\u{201D}',
            '\'' if opens_quote(prev) => '\u{2018}',
            // Closing single quote doubles as the apostrophe.
            '\'' => '\u{2019}',
            other => other,
        };
        out.push(replaced);
        prev = Some(replaced);
    }

    out
}

fn opens_quote(prev: Option<char>) -> bool {
    match prev {
        None => true,
        Some(c) => {
            c.is_whitespace()
                || matches!(
                    c,
                    '(' | '[' | '{' | '\u{2014}' | '\u{2013}' | '\u{201C}' | '\u{2018}'
                )
        }
    }
}

// ---------------------------------------------------------------------------
// Pass 4: Widont
// ---------------------------------------------------------------------------

/// Keep the last word of each block from sitting alone on a line.
fn widont(html: &str) -> String {
    static BLOCK_RES: LazyLock<Vec<Regex>> = LazyLock::new(|| {
        WIDONT_TAGS
            .iter()
            .map(|tag| {
                Regex::new(&format!(r"(?is)(<{tag}(?:\s[^>]*)?>)(.*?)(</{tag}\s*>)"))
                    .expect("valid regex")
            })
            .collect()
    });

    let mut result = html.to_string();
    for re in BLOCK_RES.iter() {
        result = re
            .replace_all(&result, |caps: &Captures| {
                format!("{}{}{}", &caps[1], join_last_words(&caps[2]), &caps[3])
            })
            .into_owned();
    }
    result
}

fn join_last_words(content: &str) -> String {
    let end = content.trim_end().len();
    let Some(pos) = last_text_space(&content[..end]) else {
        return content.to_string();
    };

    let tail = &content[pos + 1..];
    if tail.contains("&nbsp;") || tail.contains('\u{a0}') {
        return content.to_string();
    }

    let head = TAG_RE.replace_all(&content[..pos], "");
    if head.trim().is_empty() {
        return content.to_string();
    }

    format!("{}&nbsp;{}", &content[..pos], tail)
}

/// Byte offset of the last ASCII space that lies in character data.
fn last_text_space(content: &str) -> Option<usize> {
    let mut found = None;
    let mut last = 0;

    for m in TAG_RE.find_iter(content) {
        if let Some(i) = content[last..m.start()].rfind(' ') {
            found = Some(last + i);
        }
        last = m.end();
    }
    if let Some(i) = content[last..].rfind(' ') {
        found = Some(last + i);
    }

    found
}
