//! End-to-end issue run: lock → edition → fetch → classify → render → manifest → retention.

use std::path::PathBuf;
use std::time::{Duration, Instant};

use chrono::{DateTime, NaiveDate, Utc};
use tracing::{info, instrument, warn};

use broadsheet_fetcher::ContentApi;
use broadsheet_render::{ArticleRenderer, RenderContext, render_article};
use broadsheet_shared::{EditionKind, IssueConfig, Result};

use crate::assembler::{BookOrder, IssueAssembler};
use crate::classify::{Classification, ClassifiedArticle, classify};
use crate::edition::resolve_edition;
use crate::lock::{InstanceLock, ProcessProbe};
use crate::retention::prune_archive;
use crate::writer::{IssueWriter, article_filename};

/// Result of one issue run.
#[derive(Debug)]
pub struct IssueRunResult {
    pub date: NaiveDate,
    pub kind: EditionKind,
    pub paper_name: String,
    /// The dated issue directory.
    pub issue_dir: PathBuf,
    /// Path to `contents.json`.
    pub manifest_path: PathBuf,
    pub book_count: usize,
    pub article_count: usize,
    /// Records left out, either unreadable or rejected by classification.
    pub skipped: usize,
    pub max_words: u64,
    /// API pages requested.
    pub pages_fetched: u32,
    /// Old issue directories deleted by retention.
    pub pruned: Vec<PathBuf>,
    pub elapsed: Duration,
}

/// Progress callback for reporting pipeline status.
pub trait ProgressReporter: Send + Sync {
    /// Called when entering a new phase.
    fn phase(&self, name: &str);
    /// Called after each API page arrives.
    fn page_fetched(&self, page: u32, records: usize);
    /// Called after each article file is written.
    fn article_written(&self, file: &str, count: usize);
    /// Called when the pipeline completes.
    fn done(&self, result: &IssueRunResult);
}

/// No-op progress reporter for headless/test usage.
pub struct SilentProgress;

impl ProgressReporter for SilentProgress {
    fn phase(&self, _name: &str) {}
    fn page_fetched(&self, _page: u32, _records: usize) {}
    fn article_written(&self, _file: &str, _count: usize) {}
    fn done(&self, _result: &IssueRunResult) {}
}

/// Assemble today's issue.
///
/// 1. Take the archive lock
/// 2. Resolve the edition
/// 3. Fetch every API page, classifying and rendering records as they arrive
/// 4. Order books and articles, write `contents.json`
/// 5. Prune old issues
///
/// Any error before the manifest is written aborts the run without a
/// manifest. Retention problems are only logged.
#[instrument(skip_all, fields(archive = %config.archive_dir.display()))]
pub async fn run_issue(
    config: &IssueConfig,
    now: DateTime<Utc>,
    probe: &dyn ProcessProbe,
    renderer: &dyn ArticleRenderer,
    progress: &dyn ProgressReporter,
) -> Result<IssueRunResult> {
    let start = Instant::now();

    // --- Phase 1: Lock ---
    progress.phase("Acquiring archive lock");
    let _lock = InstanceLock::acquire(&config.archive_dir, probe)?;

    // --- Phase 2: Edition ---
    progress.phase("Resolving edition");
    let edition = resolve_edition(&config.edition, now).await?;
    let order = BookOrder::for_date(edition.date, &config.books);
    let writer = IssueWriter::create(&config.archive_dir, edition.date)?;

    // --- Phase 3: Fetch, classify, render ---
    progress.phase("Fetching articles");
    let api = ContentApi::new(&config.api, &config.api_key)?;
    let mut pages = api.pages(edition.date);
    let mut assembler = IssueAssembler::new(edition.date, edition.kind, &edition.paper_name);
    let mut skipped = 0usize;

    while let Some(records) = pages.next_page().await? {
        progress.page_fetched(pages.pages_fetched(), records.len());

        for raw in records {
            let id = raw.id.clone();
            match classify(raw) {
                Classification::Classified(mut classified) => {
                    write_article(&writer, renderer, &mut classified)?;
                    let count = assembler.article_count() + 1;
                    progress.article_written(&classified.article.file, count);
                    assembler.add(classified);
                }
                Classification::Skipped(reason) => {
                    warn!(%id, %reason, "skipping article");
                    skipped += 1;
                }
            }
        }
    }
    skipped += pages.unreadable();

    // --- Phase 4: Manifest ---
    progress.phase("Writing manifest");
    let issue = assembler.finish(&order);
    let manifest_path = writer.write_manifest(&issue.to_manifest())?;

    // --- Phase 5: Retention ---
    progress.phase("Pruning old issues");
    let pruned = match prune_archive(&config.archive_dir, config.keep_issues, writer.dir()) {
        Ok(pruned) => pruned,
        Err(e) => {
            warn!(error = %e, "retention failed");
            Vec::new()
        }
    };

    let result = IssueRunResult {
        date: issue.date,
        kind: issue.kind,
        paper_name: issue.paper_name.clone(),
        issue_dir: writer.dir().to_path_buf(),
        manifest_path,
        book_count: issue.books.len(),
        article_count: issue.article_count(),
        skipped,
        max_words: issue.max_words,
        pages_fetched: pages.pages_fetched(),
        pruned,
        elapsed: start.elapsed(),
    };

    progress.done(&result);

    info!(
        date = %result.date,
        paper = %result.paper_name,
        books = result.book_count,
        articles = result.article_count,
        skipped = result.skipped,
        elapsed_ms = result.elapsed.as_millis(),
        "issue complete"
    );

    Ok(result)
}

/// Render one article into the issue directory and record its file name.
fn write_article(
    writer: &IssueWriter,
    renderer: &dyn ArticleRenderer,
    classified: &mut ClassifiedArticle,
) -> Result<()> {
    let ctx = RenderContext {
        article: &classified.article,
        book: &classified.book,
    };
    let html = render_article(renderer, &ctx)?;

    let filename = article_filename(&classified.article.id);
    writer.write_article(&filename, &html)?;
    classified.article.file = filename;
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
