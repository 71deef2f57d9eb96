//! Archive retention: keep the newest issues, delete the rest.

use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use tracing::{debug, info, instrument, warn};

use broadsheet_shared::{BroadsheetError, MANIFEST_FILE_NAME, MIN_KEEP_ISSUES, Result};

use crate::writer::ISSUE_DIR_FORMAT;

/// Delete dated issue directories beyond the newest `keep` complete issues.
///
/// Only directories named `YYYY-MM-DD` are considered; everything else in
/// the archive root is left alone. `current` is always kept and counts
/// toward `keep`, which is raised to [`MIN_KEEP_ISSUES`]. A directory without
/// a manifest is a failed run: it never counts as a kept issue and is
/// removed. Returns the directories removed. A directory that cannot be
/// removed is logged and skipped.
#[instrument(skip_all, fields(root = %root.display(), keep = keep))]
pub fn prune_archive(root: &Path, keep: usize, current: &Path) -> Result<Vec<PathBuf>> {
    let keep = keep.max(MIN_KEEP_ISSUES);
    let entries = std::fs::read_dir(root).map_err(|e| BroadsheetError::io(root, e))?;

    let mut dated: Vec<(NaiveDate, PathBuf)> = entries
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_ok_and(|t| t.is_dir()))
        .filter_map(|entry| {
            let name = entry.file_name();
            let date = parse_issue_dir_name(name.to_str()?)?;
            Some((date, entry.path()))
        })
        .filter(|(_, path)| path.as_path() != current)
        .collect();

    dated.sort_by(|a, b| b.0.cmp(&a.0));

    let mut kept = 1;
    let mut removed = Vec::new();
    for (date, path) in dated {
        let complete = path.join(MANIFEST_FILE_NAME).is_file();
        if complete && kept < keep {
            kept += 1;
            continue;
        }
        if !complete {
            debug!(%date, path = %path.display(), "issue has no manifest");
        }

        match std::fs::remove_dir_all(&path) {
            Ok(()) => {
                info!(%date, path = %path.display(), "removed old issue");
                removed.push(path);
            }
            Err(e) => warn!(%date, path = %path.display(), error = %e, "failed to remove old issue"),
        }
    }

    Ok(removed)
}

fn parse_issue_dir_name(name: &str) -> Option<NaiveDate> {
    // chrono accepts unpadded fields; directory names must be exact.
    if name.len() != 10 {
        return None;
    }
    NaiveDate::parse_from_str(name, ISSUE_DIR_FORMAT).ok()
}
