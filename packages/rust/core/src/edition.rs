//! Edition resolution: which day's paper is "today", and which paper it is.

use chrono::{DateTime, FixedOffset, NaiveDate, Utc};
use tracing::{info, instrument, warn};

use broadsheet_fetcher::ReferenceClient;
use broadsheet_shared::{BroadsheetError, EditionConfig, EditionKind, Resolution, Result};

/// The edition a run assembles.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedEdition {
    pub date: NaiveDate,
    pub kind: EditionKind,
    /// Value written to `meta.paper_name`.
    pub paper_name: String,
}

/// Calendar date at the publication, given a UTC instant and a fixed offset.
pub fn local_date(now: DateTime<Utc>, utc_offset_minutes: i32) -> Result<NaiveDate> {
    let offset = FixedOffset::east_opt(utc_offset_minutes * 60).ok_or_else(|| {
        BroadsheetError::config(format!("invalid UTC offset of {utc_offset_minutes} minutes"))
    })?;
    Ok(now.with_timezone(&offset).date_naive())
}

/// Paper name for an edition kind.
pub fn paper_name(kind: EditionKind, config: &EditionConfig) -> &str {
    match kind {
        EditionKind::Standard => &config.standard_paper,
        EditionKind::Secondary => &config.secondary_paper,
    }
}

fn reference_url(kind: EditionKind, config: &EditionConfig) -> &str {
    match kind {
        EditionKind::Standard => &config.standard_reference_url,
        EditionKind::Secondary => &config.secondary_reference_url,
    }
}

/// Resolve the current edition.
///
/// With [`Resolution::Clock`] the local date is taken as is. With
/// [`Resolution::Scrape`] the date printed on the expected edition's contents
/// page must agree with it; see [`verify_printed_date`].
#[instrument(skip_all, fields(resolution = ?config.resolution))]
pub async fn resolve_edition(config: &EditionConfig, now: DateTime<Utc>) -> Result<ResolvedEdition> {
    let date = local_date(now, config.utc_offset_minutes)?;

    if config.resolution == Resolution::Scrape {
        verify_printed_date(config, date).await?;
    }

    let kind = EditionKind::for_date(date);
    let resolved = ResolvedEdition {
        date,
        kind,
        paper_name: paper_name(kind, config).to_string(),
    };

    info!(date = %resolved.date, kind = %resolved.kind, paper = %resolved.paper_name, "edition resolved");
    Ok(resolved)
}

/// Check the clock against the printed date of today's contents page.
///
/// A printed date more than one day away from `today` means the publisher
/// has not rolled over yet; the previous day's paper must then be the one
/// on offer, or resolution fails.
async fn verify_printed_date(config: &EditionConfig, today: NaiveDate) -> Result<()> {
    let client = ReferenceClient::new(config.reference_timeout_secs)?;
    let selector = &config.printed_date_selector;

    let kind = EditionKind::for_date(today);
    let printed = client
        .printed_date(reference_url(kind, config), selector)
        .await?;

    if (today - printed).num_days().abs() <= 1 {
        return Ok(());
    }

    let yesterday = today
        .pred_opt()
        .ok_or_else(|| BroadsheetError::edition(format!("no day before {today}")))?;
    let alt_kind = EditionKind::for_date(yesterday);

    warn!(
        %today,
        %printed,
        retry = %alt_kind,
        "printed date disagrees with the clock, checking the previous edition"
    );

    let alt_printed = client
        .printed_date(reference_url(alt_kind, config), selector)
        .await?;

    if alt_printed == yesterday {
        Ok(())
    } else {
        Err(BroadsheetError::edition(format!(
            "expected an edition for {today} or {yesterday}, but the contents pages show {printed} and {alt_printed}"
        )))
    }
}
