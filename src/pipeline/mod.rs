//! Archive pipeline: fetch, merge, persist, partition, render
//!
//! [`Archiver`] drives every step sequentially. Failures are contained per
//! market, per file and per page; they are logged, counted in
//! [`RunMetrics`](crate::observability::RunMetrics) and reported back as
//! outcomes rather than errors.

mod runner;

pub use runner::Archiver;

use crate::dataset::PeriodExport;

/// What happened to one dataset during an update
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateOutcome {
    /// New records were merged and the file was rewritten
    Updated { appended: usize, total: usize },
    /// Nothing new; the file was left untouched
    Unchanged,
    /// The upstream request failed; nothing was merged or saved
    FetchFailed,
    /// The merged dataset could not be written
    SaveFailed,
}

/// Period export of one market
#[derive(Debug, Clone)]
pub struct PartitionReport {
    pub locale: String,
    pub is_index_source: bool,
    pub export: PeriodExport,
}

/// Result of deduplicating one market's dataset by image fingerprint
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RepairOutcome {
    Repaired { removed: usize, total: usize },
    Clean,
    /// Dataset unreadable; left as is
    Skipped,
    SaveFailed,
}

/// Which page sets to render
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum RenderFormat {
    Markdown,
    Html,
    All,
}

impl RenderFormat {
    pub fn markdown(&self) -> bool {
        matches!(self, RenderFormat::Markdown | RenderFormat::All)
    }

    pub fn html(&self) -> bool {
        matches!(self, RenderFormat::Html | RenderFormat::All)
    }
}

/// Dataset the HTML site is built from
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum SiteSource {
    /// The index-source market of the per-market archive
    #[default]
    Archive,
    /// The date-keyed daily dataset
    Daily,
}
