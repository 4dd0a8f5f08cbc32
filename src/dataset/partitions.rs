/// Period grouping and on-disk layout of the archive
///
/// Layout under the data directory:
/// - `bing_{locale}.json`: root dataset for one market
/// - `{YYYY-MM}/bing_{locale}.json`: that market's records for one month
/// - `{YYYY-MM}/{YYYY-MM}.json`: month index, copied from the preferred market
use std::collections::BTreeMap;
use std::path::PathBuf;

use tracing::warn;

use crate::record::{Period, Record};

/// Records grouped by month; within a month input order is preserved
pub type PeriodGroups<'a, R> = BTreeMap<Period, Vec<&'a R>>;

/// Group `records` by the period `extract` derives for each of them.
///
/// Records for which `extract` yields nothing are skipped with a warning.
pub fn partition_by<'a, R, F>(records: &'a [R], extract: F) -> PeriodGroups<'a, R>
where
    R: Record,
    F: Fn(&R) -> Option<Period>,
{
    let mut groups: PeriodGroups<'a, R> = BTreeMap::new();
    for record in records {
        match extract(record) {
            Some(period) => groups.entry(period).or_default().push(record),
            None => warn!(
                field = %R::TEMPORAL,
                value = record.temporal(),
                "Skipping record with malformed date"
            ),
        }
    }
    groups
}

/// Group `records` by the month of their temporal field
pub fn partition<R: Record>(records: &[R]) -> PeriodGroups<'_, R> {
    partition_by(records, R::period)
}

/// Paths of every archive artifact below one data directory
#[derive(Debug, Clone)]
pub struct ArchiveLayout {
    root: PathBuf,
}

impl ArchiveLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// File stem shared by a market's root and period files: `bing_{locale}`
    pub fn locale_stem(locale: &str) -> String {
        format!("bing_{}", locale)
    }

    /// `bing_{locale}.json`
    pub fn root_file(&self, locale: &str) -> PathBuf {
        self.root.join(format!("{}.json", Self::locale_stem(locale)))
    }

    /// `{YYYY-MM}/`
    pub fn period_dir(&self, period: Period) -> PathBuf {
        self.root.join(period.label())
    }

    /// `{YYYY-MM}/bing_{locale}.json`
    pub fn period_file(&self, period: Period, locale: &str) -> PathBuf {
        self.period_dir(period)
            .join(format!("{}.json", Self::locale_stem(locale)))
    }

    /// `{YYYY-MM}/{YYYY-MM}.json`
    pub fn period_index(&self, period: Period) -> PathBuf {
        self.period_dir(period).join(format!("{}.json", period.label()))
    }
}
