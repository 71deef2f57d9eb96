//! Core pipeline orchestration and domain logic for Broadsheet.
//!
//! This crate ties together edition resolution, article retrieval,
//! classification, rendering and issue assembly into one run (`run_issue`).

pub mod assembler;
pub mod classify;
pub mod edition;
pub mod lock;
pub mod pipeline;
pub mod retention;
pub mod writer;

pub use assembler::{BookOrder, IssueAssembler};
pub use classify::{Classification, ClassifiedArticle, SkipReason, classify};
pub use edition::{ResolvedEdition, local_date, resolve_edition};
pub use lock::{InstanceLock, LOCK_FILE_NAME, ProcessProbe, SystemProbe};
pub use pipeline::{IssueRunResult, ProgressReporter, SilentProgress, run_issue};
pub use retention::prune_archive;
pub use writer::{IssueWriter, article_filename, issue_dir};
