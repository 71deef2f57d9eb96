//! Shared types, error model, and configuration for Broadsheet.
//!
//! This crate is the foundation depended on by all other Broadsheet crates.
//! It provides:
//! - [`BroadsheetError`]: the unified error type
//! - Domain types ([`RawArticle`], [`Article`], [`Book`], [`Issue`], [`IssueManifest`])
//! - Configuration ([`AppConfig`], [`IssueConfig`], config loading)

pub mod config;
pub mod error;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    ApiConfig, AppConfig, ArchiveConfig, BooksConfig, EditionConfig, IssueConfig,
    MIN_KEEP_ISSUES, Resolution, config_dir, config_file_path, expand_home, init_config,
    load_config, load_config_from, validate_api_key, validate_config,
};
pub use error::{BroadsheetError, Result};
pub use types::{
    Article, Book, DisplayFields, EditionKind, Issue, IssueManifest, MANIFEST_FILE_NAME,
    ManifestArticle, ManifestBook, ManifestMeta, PAGE_NUMBER_FIELD, RawArticle,
    SECONDARY_WEEKDAY, Tag, Tone, WORD_COUNT_FIELD,
};
