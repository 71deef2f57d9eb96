//! Article rendering and typographic cleanup.
//!
//! A renderer turns one classified article into a standalone HTML fragment.
//! [`render_article`] runs the renderer and then the typography pipeline, so
//! every renderer gets smart punctuation and widow control for free.

mod typography;

use tracing::debug;

use broadsheet_shared::{Article, BroadsheetError, Result, Tag};

pub use typography::typeset;

// ---------------------------------------------------------------------------
// Public types
// ---------------------------------------------------------------------------

/// Everything a renderer may look at for one article.
#[derive(Debug, Clone, Copy)]
pub struct RenderContext<'a> {
    pub article: &'a Article,
    /// The book the article was filed under.
    pub book: &'a Tag,
}

/// Turns an article into HTML markup.
pub trait ArticleRenderer: Send + Sync {
    fn render(&self, ctx: &RenderContext<'_>) -> Result<String>;
}

/// Render an article and apply the typography pipeline to the result.
///
/// A renderer that produces no markup is an error: the article would be
/// listed in the manifest with an empty file.
pub fn render_article(renderer: &dyn ArticleRenderer, ctx: &RenderContext<'_>) -> Result<String> {
    let markup = renderer.render(ctx)?;
    if markup.trim().is_empty() {
        return Err(BroadsheetError::Render(format!(
            "renderer produced no markup for {}",
            ctx.article.id
        )));
    }
    let html = typeset(&markup);

    debug!(id = %ctx.article.id, bytes = html.len(), "rendered article");
    Ok(html)
}

// ---------------------------------------------------------------------------
// Default renderer
// ---------------------------------------------------------------------------

/// Built-in renderer producing a self-contained `<article>` fragment.
///
/// Plain-text fields are escaped; `standfirst` and `body` are already HTML
/// and are passed through. Text content keeps its straight quotes so the
/// typography pass can curl them.
#[derive(Debug, Clone, Copy, Default)]
pub struct HtmlRenderer;

impl ArticleRenderer for HtmlRenderer {
    fn render(&self, ctx: &RenderContext<'_>) -> Result<String> {
        let article = ctx.article;
        let display = &article.display;

        let headline = display
            .field_str("headline")
            .or_else(|| display.extra_str("webTitle"))
            .unwrap_or(article.id.as_str());

        let mut html = String::with_capacity(4096);
        html.push_str(&format!(
            "<article class=\"article tone-{}\" data-id=\"{}\">\n<header>\n",
            article.tone.as_str(),
            escape_html(&article.id)
        ));

        html.push_str(&format!("<p class=\"kicker\">{}</p>\n", kicker(ctx)));
        html.push_str(&format!("<h1 class=\"headline\">{}</h1>\n", escape_text(headline)));

        if let Some(standfirst) = display.field_str("standfirst").filter(|s| !s.is_empty()) {
            html.push_str(&format!("<div class=\"standfirst\">{standfirst}</div>\n"));
        }
        if let Some(byline) = display.field_str("byline").filter(|s| !s.is_empty()) {
            html.push_str(&format!("<p class=\"byline\">{}</p>\n", escape_text(byline)));
        }
        if let Some(thumb) = display.field_str("thumbnail").filter(|s| !s.is_empty()) {
            html.push_str(&format!(
                "<figure class=\"thumbnail\"><img src=\"{}\" alt=\"\"></figure>\n",
                escape_html(thumb)
            ));
        }

        html.push_str(&format!(
            "<p class=\"meta\">Page {} &middot; {} words</p>\n</header>\n",
            article.page_number, article.word_count
        ));

        let body = display.field_str("body").unwrap_or_default();
        html.push_str(&format!("<div class=\"body\">\n{body}\n</div>\n"));

        if let Some(url) = display
            .extra_str("webUrl")
            .or_else(|| display.field_str("shortUrl"))
        {
            html.push_str(&format!(
                "<footer><a class=\"source\" href=\"{}\">Read online</a></footer>\n",
                escape_html(url)
            ));
        }

        html.push_str("</article>\n");
        Ok(html)
    }
}

/// "Book / Section" line shown above the headline.
fn kicker(ctx: &RenderContext<'_>) -> String {
    let book = ctx.book.web_title.as_deref().unwrap_or(ctx.book.id.as_str());
    match ctx
        .article
        .section
        .as_ref()
        .and_then(|s| s.web_title.as_deref())
    {
        Some(section) => format!("{} / {}", escape_text(book), escape_text(section)),
        None => escape_text(book),
    }
}

/// Escape text for use in double-quoted attributes.
///
/// Apostrophes are kept so the typography pass can curl them.
pub fn escape_html(s: &str) -> String {
    escape(s, true)
}

/// Escape text for use as element content. Quotes are left alone.
pub fn escape_text(s: &str) -> String {
    escape(s, false)
}

fn escape(s: &str, quotes: bool) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' if quotes => out.push_str("&quot;"),
            other => out.push(other),
        }
    }
    out
}
