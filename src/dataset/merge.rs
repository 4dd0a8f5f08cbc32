//! Deduplicating merge of fetched records into an existing dataset

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::warn;

use crate::record::{Record, RecordField};

/// Field, or tuple of fields, whose value must be unique within a dataset
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "OneOrMany", into = "Vec<RecordField>")]
pub struct DedupKey(Vec<RecordField>);

#[derive(Deserialize)]
#[serde(untagged)]
enum OneOrMany {
    One(RecordField),
    Many(Vec<RecordField>),
}

impl From<OneOrMany> for DedupKey {
    fn from(value: OneOrMany) -> Self {
        match value {
            OneOrMany::One(field) => DedupKey(vec![field]),
            OneOrMany::Many(fields) => DedupKey(fields),
        }
    }
}

impl From<DedupKey> for Vec<RecordField> {
    fn from(key: DedupKey) -> Self {
        key.0
    }
}

impl Default for DedupKey {
    fn default() -> Self {
        DedupKey::single(RecordField::FullStartDate)
    }
}

impl DedupKey {
    pub fn single(field: RecordField) -> Self {
        DedupKey(vec![field])
    }

    pub fn tuple(fields: impl IntoIterator<Item = RecordField>) -> Self {
        DedupKey(fields.into_iter().collect())
    }

    pub fn fields(&self) -> &[RecordField] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Key tuple of `record`; absent fields read as the empty string
    pub fn key_of<R: Record>(&self, record: &R) -> Vec<String> {
        self.0
            .iter()
            .map(|field| record.field(*field).unwrap_or("").to_string())
            .collect()
    }

    fn describe(&self) -> String {
        self.0.iter().map(RecordField::as_str).collect::<Vec<_>>().join("+")
    }
}

/// Result of merging one batch
#[derive(Debug, Clone)]
pub struct MergeOutcome<R> {
    pub records: Vec<R>,
    pub appended: usize,
    pub duplicates: usize,
}

/// Merge `incoming` into `existing`.
///
/// Existing records are never replaced: the first record seen for a key wins.
/// The result is stable-sorted newest first on the schema's temporal field.
pub fn merge<R: Record>(existing: Vec<R>, incoming: Vec<R>, key: &DedupKey) -> MergeOutcome<R> {
    let mut seen: HashSet<Vec<String>> = existing.iter().map(|record| key.key_of(record)).collect();
    let mut records = existing;
    let mut appended = 0;
    let mut duplicates = 0;

    for record in incoming {
        let record_key = key.key_of(&record);
        if record_key.iter().any(String::is_empty) {
            warn!(
                key = %key.describe(),
                temporal = record.temporal(),
                "Incoming record is missing part of its dedup key"
            );
        }
        if seen.insert(record_key) {
            records.push(record);
            appended += 1;
        } else {
            duplicates += 1;
        }
    }

    sort_newest_first(&mut records);

    MergeOutcome {
        records,
        appended,
        duplicates,
    }
}

/// Stable descending sort on the temporal field
pub fn sort_newest_first<R: Record>(records: &mut [R]) {
    records.sort_by(|a, b| b.temporal().cmp(a.temporal()));
}

/// Drop records whose key repeats an earlier record, or that have no value
/// for any key field at all. Used to repair datasets written by older tools.
pub fn dedup_existing<R: Record>(records: Vec<R>, key: &DedupKey) -> MergeOutcome<R> {
    let mut seen = HashSet::new();
    let mut kept = Vec::with_capacity(records.len());
    let mut duplicates = 0;

    for record in records {
        let record_key = key.key_of(&record);
        if record_key.iter().all(String::is_empty) || !seen.insert(record_key) {
            duplicates += 1;
            continue;
        }
        kept.push(record);
    }

    sort_newest_first(&mut kept);

    MergeOutcome {
        appended: 0,
        records: kept,
        duplicates,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{DailyWallpaper, WallpaperRecord};

    fn record(fullstartdate: &str, hsh: &str, copyright: &str) -> WallpaperRecord {
        WallpaperRecord {
            fullstartdate: fullstartdate.to_string(),
            hsh: hsh.to_string(),
            copyright: copyright.to_string(),
            ..Default::default()
        }
    }

    fn assert_sorted(records: &[WallpaperRecord]) {
        for pair in records.windows(2) {
            assert!(pair[0].fullstartdate >= pair[1].fullstartdate);
        }
    }

    #[test]
    fn test_existing_record_wins_on_hash_collision() {
        let existing = vec![record("202401010800", "abc", "original")];
        let incoming = vec![
            record("202401010800", "abc", "refetched"),
            record("202401020800", "def", "new"),
        ];

        let outcome = merge(existing, incoming, &DedupKey::single(RecordField::Hash));

        assert_eq!(outcome.records.len(), 2);
        assert_eq!(outcome.records[0].hsh, "def");
        assert_eq!(outcome.records[1].hsh, "abc");
        assert_eq!(outcome.records[1].copyright, "original");
        assert_eq!(outcome.appended, 1);
        assert_eq!(outcome.duplicates, 1);
    }

    #[test]
    fn test_merge_is_idempotent() {
        let existing = vec![record("202401010800", "a", "")];
        let incoming = vec![record("202401030800", "c", ""), record("202401020800", "b", "")];
        let key = DedupKey::default();

        let once = merge(existing, incoming.clone(), &key);
        let twice = merge(once.records.clone(), incoming, &key);

        assert_eq!(once.records, twice.records);
        assert_eq!(twice.appended, 0);
        assert_sorted(&twice.records);
    }

    #[test]
    fn test_duplicates_within_incoming_batch() {
        let incoming = vec![record("202401020800", "b", "first"), record("202401020800", "b", "second")];
        let outcome = merge(Vec::new(), incoming, &DedupKey::default());
        assert_eq!(outcome.records.len(), 1);
        assert_eq!(outcome.records[0].copyright, "first");
    }

    #[test]
    fn test_tuple_key() {
        let key = DedupKey::tuple([RecordField::Hash, RecordField::CopyrightKeyword]);
        let mut a = record("202401010800", "abc", "");
        a.copyright_keyword = "x".to_string();
        let mut b = record("202401010900", "abc", "");
        b.copyright_keyword = "y".to_string();

        let outcome = merge(vec![a], vec![b], &key);
        assert_eq!(outcome.records.len(), 2);
        assert_eq!(outcome.records[0].fullstartdate, "202401010900");
    }

    #[test]
    fn test_missing_key_dedups_against_other_missing_keys() {
        let existing = vec![record("", "", "legacy")];
        let incoming = vec![record("", "", "fresh"), record("202401050800", "", "dated")];

        let outcome = merge(existing, incoming, &DedupKey::default());

        assert_eq!(outcome.records.len(), 2);
        assert_eq!(outcome.records[0].copyright, "dated");
        assert_eq!(outcome.records[1].copyright, "legacy");
    }

    #[test]
    fn test_ties_keep_input_order() {
        let existing = vec![record("202401010800", "a", "first")];
        let incoming = vec![record("202401010800", "b", "second")];
        let key = DedupKey::single(RecordField::Hash);

        let outcome = merge(existing, incoming, &key);
        assert_eq!(outcome.records[0].copyright, "first");
        assert_eq!(outcome.records[1].copyright, "second");
    }

    #[test]
    fn test_empty_inputs() {
        let outcome = merge::<WallpaperRecord>(Vec::new(), Vec::new(), &DedupKey::default());
        assert!(outcome.records.is_empty());
        assert_eq!(outcome.appended, 0);
    }

    #[test]
    fn test_date_keyed_merge_sorts_by_date() {
        let daily = |date: &str| DailyWallpaper {
            date: date.to_string(),
            ..Default::default()
        };
        let outcome = merge(
            vec![daily("2024-01-01")],
            vec![daily("2024-01-03"), daily("2024-01-01"), daily("2024-01-02")],
            &DedupKey::single(RecordField::Date),
        );
        let dates: Vec<&str> = outcome.records.iter().map(|r| r.date.as_str()).collect();
        assert_eq!(dates, vec!["2024-01-03", "2024-01-02", "2024-01-01"]);
    }

    #[test]
    fn test_dedup_existing_drops_repeats_and_unkeyed() {
        let records = vec![
            record("202401010800", "abc", "older copy"),
            record("202401020800", "def", ""),
            record("202401010800", "abc", "repeat"),
            record("202401030800", "", "no hash"),
        ];
        let outcome = dedup_existing(records, &DedupKey::single(RecordField::Hash));
        let hashes: Vec<&str> = outcome.records.iter().map(|r| r.hsh.as_str()).collect();
        assert_eq!(hashes, vec!["def", "abc"]);
        assert_eq!(outcome.records[1].copyright, "older copy");
        assert_eq!(outcome.duplicates, 2);
    }

    #[test]
    fn test_dedup_key_accepts_string_or_list() {
        let one: DedupKey = serde_json::from_str(r#""hsh""#).unwrap();
        assert_eq!(one, DedupKey::single(RecordField::Hash));

        let many: DedupKey = serde_json::from_str(r#"["hsh", "copyrightKeyword"]"#).unwrap();
        assert_eq!(many.fields().len(), 2);
    }
}
