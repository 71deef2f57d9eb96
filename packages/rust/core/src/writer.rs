//! Issue directory writer: article files and the `contents.json` manifest.

use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use sha2::{Digest, Sha256};
use tracing::{debug, info, instrument};

use broadsheet_shared::{BroadsheetError, IssueManifest, MANIFEST_FILE_NAME, Result};

/// Longest file name produced from an id unchanged.
const MAX_FILENAME_BYTES: usize = 200;

/// Bytes of sanitized id kept in a hashed file name.
const HASHED_PREFIX_BYTES: usize = 64;

/// Hex digits of the id hash in a hashed file name.
const HASH_HEX_DIGITS: usize = 16;

/// Date format of issue directory names.
pub const ISSUE_DIR_FORMAT: &str = "%Y-%m-%d";

/// Deterministic file name for an article id.
///
/// Simple ids (`[a-z0-9-/]`) map to the id with `/` replaced by `_`. Anything
/// else, or anything too long, becomes a sanitized prefix plus a hash.
pub fn article_filename(id: &str) -> String {
    let simple = !id.is_empty()
        && id
            .bytes()
            .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'-' || b == b'/');

    if simple {
        let plain = format!("{}.html", id.replace('/', "_"));
        if plain.len() <= MAX_FILENAME_BYTES {
            return plain;
        }
    }

    let digest = format!("{:x}", Sha256::digest(id.as_bytes()));
    format!(
        "{}-{}.html",
        sanitize_prefix(id),
        &digest[..HASH_HEX_DIGITS]
    )
}

fn sanitize_prefix(id: &str) -> String {
    let mut out = String::with_capacity(HASHED_PREFIX_BYTES);
    let mut prev_underscore = false;

    for ch in id.chars() {
        if out.len() >= HASHED_PREFIX_BYTES {
            break;
        }
        if ch.is_ascii_alphanumeric() || ch == '-' {
            out.push(ch.to_ascii_lowercase());
            prev_underscore = false;
        } else if !prev_underscore {
            out.push('_');
            prev_underscore = true;
        }
    }

    out.trim_matches('_').to_string()
}

/// Path of the directory for one issue.
pub fn issue_dir(archive_dir: &Path, date: NaiveDate) -> PathBuf {
    archive_dir.join(date.format(ISSUE_DIR_FORMAT).to_string())
}

/// Writes one issue's files into `{archive}/YYYY-MM-DD/`.
#[derive(Debug)]
pub struct IssueWriter {
    dir: PathBuf,
}

impl IssueWriter {
    /// Create (or reuse) the issue directory for `date`.
    pub fn create(archive_dir: &Path, date: NaiveDate) -> Result<Self> {
        let dir = issue_dir(archive_dir, date);
        std::fs::create_dir_all(&dir).map_err(|e| BroadsheetError::io(&dir, e))?;
        debug!(path = %dir.display(), "issue directory ready");
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Write one rendered article.
    pub fn write_article(&self, filename: &str, html: &str) -> Result<PathBuf> {
        let path = self.dir.join(filename);
        std::fs::write(&path, html).map_err(|e| BroadsheetError::io(&path, e))?;
        debug!(file = %filename, size = html.len(), "wrote article");
        Ok(path)
    }

    /// Write `contents.json` atomically (temp file, then rename).
    #[instrument(skip_all, fields(dir = %self.dir.display()))]
    pub fn write_manifest(&self, manifest: &IssueManifest) -> Result<PathBuf> {
        let json = serde_json::to_string_pretty(manifest).map_err(|e| {
            BroadsheetError::validation(format!("manifest serialization failed: {e}"))
        })?;

        let target = self.dir.join(MANIFEST_FILE_NAME);
        let temp = self.dir.join(format!(".{MANIFEST_FILE_NAME}.tmp"));

        std::fs::write(&temp, &json).map_err(|e| BroadsheetError::io(&temp, e))?;
        std::fs::rename(&temp, &target).map_err(|e| BroadsheetError::io(&target, e))?;

        info!(
            books = manifest.books.len(),
            max_words = manifest.meta.max_words,
            "manifest written"
        );
        Ok(target)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use broadsheet_shared::ManifestMeta;

    fn temp_dir() -> PathBuf {
        let dir = std::env::temp_dir().join(format!("bs-writer-test-{}", uuid::Uuid::now_v7()));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn simple_ids_map_directly() {
        assert_eq!(
            article_filename("world/2015/dec/14/paris-climate-deal"),
            "world_2015_dec_14_paris-climate-deal.html"
        );
    }

    #[test]
    fn unusual_ids_are_hashed() {
        let name = article_filename("World/2015/Dec/14/Café?x=1");
        assert!(name.starts_with("world_2015_dec_14_caf_x_1-"), "{name}");
        assert!(name.ends_with(".html"));
        // prefix + '-' + 16 hex + ".html"
        let hash = &name[name.len() - ".html".len() - HASH_HEX_DIGITS..name.len() - ".html".len()];
        assert!(hash.chars().all(|c| c.is_ascii_hexdigit()));

        assert_ne!(article_filename("a/b?c"), article_filename("a/b?d"));
        assert_eq!(article_filename("a/b?c"), article_filename("a/b?c"));
    }

    #[test]
    fn long_ids_are_hashed_and_bounded() {
        let id = format!("uk/{}", "a".repeat(300));
        let name = article_filename(&id);
        assert!(name.len() <= HASHED_PREFIX_BYTES + 1 + HASH_HEX_DIGITS + ".html".len());
        assert!(name.len() <= MAX_FILENAME_BYTES);
    }

    #[test]
    fn path_traversal_is_neutralized() {
        let name = article_filename("../../etc/passwd");
        assert!(!name.contains('/'));
        assert!(!name.starts_with('.'));
    }

    #[test]
    fn manifest_write_is_atomic_and_replaces() {
        let tmp = temp_dir();
        let date = NaiveDate::from_ymd_opt(2015, 12, 14).unwrap();
        let writer = IssueWriter::create(&tmp, date).unwrap();
        assert_eq!(writer.dir(), tmp.join("2015-12-14"));

        let mut manifest = IssueManifest {
            meta: ManifestMeta {
                max_words: 0,
                paper_name: "guardian".into(),
            },
            books: vec![],
        };
        writer.write_manifest(&manifest).unwrap();
        manifest.meta.max_words = 99;
        let path = writer.write_manifest(&manifest).unwrap();

        let written: IssueManifest =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(written.meta.max_words, 99);

        let leftovers: Vec<_> = std::fs::read_dir(writer.dir())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().ends_with(".tmp"))
            .collect();
        assert!(leftovers.is_empty());

        let _ = std::fs::remove_dir_all(&tmp);
    }

    #[test]
    fn writes_article_file() {
        let tmp = temp_dir();
        let date = NaiveDate::from_ymd_opt(2015, 12, 14).unwrap();
        let writer = IssueWriter::create(&tmp, date).unwrap();

        let path = writer.write_article("uk_story.html", "<article></article>").unwrap();
        assert_eq!(std::fs::read_to_string(path).unwrap(), "<article></article>");

        let _ = std::fs::remove_dir_all(&tmp);
    }
}
