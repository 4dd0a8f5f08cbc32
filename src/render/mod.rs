//! Static site rendering
//!
//! Pages are a pure projection of dataset records: renderers take month
//! groups (newest first) and return [`Page`]s, and [`write_pages`] is the only
//! place that touches the filesystem. Templates use [upon] syntax.
//!
//! | Format   | Month page                  | Locale page                         | Index        |
//! |----------|-----------------------------|-------------------------------------|--------------|
//! | Markdown | `YYYY-MM/YYYY-MM.md`        | `YYYY-MM/YYYY-MM_bing_<locale>.md`  | `index.md`   |
//! | HTML     | `YYYY-MM/YYYY-MM.html`      |                                     | `index.html` |

mod error;
pub mod html;
pub mod markdown;

pub use error::{RenderError, Result};
pub use html::HtmlRenderer;
pub use markdown::MarkdownRenderer;

use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::dataset::{partition, write_if_changed, WriteOutcome};
use crate::record::{Period, Record, SiteEntry};

/// One generated file, relative to its output directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page {
    pub path: PathBuf,
    pub content: String,
}

/// A month's entries, newest first
#[derive(Debug, Clone)]
pub struct MonthGroup {
    pub period: Period,
    pub entries: Vec<SiteEntry>,
}

/// Month groups of one market
#[derive(Debug, Clone)]
pub struct LocaleMonths {
    pub locale: String,
    pub months: Vec<MonthGroup>,
}

/// Group `records` by month, months and entries newest first
pub fn month_groups<R: Record>(records: &[R]) -> Vec<MonthGroup> {
    partition(records)
        .into_iter()
        .rev()
        .map(|(period, mut members)| {
            members.sort_by(|a, b| b.temporal().cmp(a.temporal()));
            MonthGroup {
                period,
                entries: members.into_iter().map(|record| record.site_entry()).collect(),
            }
        })
        .collect()
}

/// A table cell; `blank` pads the last row of a grid
#[derive(Debug, Clone, Default, Serialize)]
pub(crate) struct Cell<T> {
    pub blank: bool,
    pub item: T,
}

/// Split `items` into rows of exactly `per_row` cells
pub(crate) fn grid<T: Clone + Default>(items: &[T], per_row: usize) -> Vec<Vec<Cell<T>>> {
    let per_row = per_row.max(1);
    items
        .chunks(per_row)
        .map(|chunk| {
            let mut row: Vec<Cell<T>> = chunk
                .iter()
                .map(|item| Cell {
                    blank: false,
                    item: item.clone(),
                })
                .collect();
            row.resize_with(per_row, || Cell {
                blank: true,
                item: T::default(),
            });
            row
        })
        .collect()
}

/// Outcome of writing a page set
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WriteSummary {
    pub written: usize,
    pub unchanged: usize,
    pub failed: usize,
}

/// Write `pages` below `root`, leaving byte-identical files untouched.
/// A failing page is logged and counted; the rest are still written.
pub fn write_pages(root: &Path, pages: &[Page]) -> WriteSummary {
    let mut summary = WriteSummary::default();
    for page in pages {
        let target = root.join(&page.path);
        match write_if_changed(&target, page.content.as_bytes()) {
            Ok(WriteOutcome::Written) => summary.written += 1,
            Ok(WriteOutcome::Unchanged) => summary.unchanged += 1,
            Err(e) => {
                warn!(path = %target.display(), error = %e, "Failed to write page");
                summary.failed += 1;
            }
        }
    }
    info!(
        root = %root.display(),
        written = summary.written,
        unchanged = summary.unchanged,
        failed = summary.failed,
        "Wrote pages"
    );
    summary
}
