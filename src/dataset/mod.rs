/// File-backed dataset layer: merge engine, period partitioning, JSON store
///
/// The dataset file of each market is the single source of truth. Everything
/// else under the data directory (month files, month indexes) is derived from
/// it and can be regenerated at any time.
///
/// ## Guarantees
///
/// - Loading never fails: a missing file is an empty dataset, an unreadable
///   one is reported as [`LoadState::Corrupt`] and also treated as empty.
/// - Saving is atomic (temp file + rename) and keeps non-ASCII text literal.
/// - Merging only appends records whose dedup key has not been seen, then
///   stable-sorts newest first.
///
/// ## Usage
///
/// ```rust,ignore
/// use wallarchive::dataset::{merge, DatasetStore, DedupKey};
///
/// let store = DatasetStore::open("bing");
/// let snapshot = store.load_locale("en-US");
/// let outcome = merge(snapshot.records, fetched, &DedupKey::default());
/// store.save_locale("en-US", &outcome.records)?;
/// ```

pub mod error;
pub mod merge;
pub mod partitions;
pub mod store;

pub use error::{Result, StoreError};
pub use merge::{dedup_existing, merge, sort_newest_first, DedupKey, MergeOutcome};
pub use partitions::{partition, partition_by, ArchiveLayout, PeriodGroups};
pub use store::{
    encode, load, quarantine, save, save_if_changed, write_atomic, write_if_changed, DatasetStore, LoadState,
    PeriodExport, Snapshot, WriteOutcome,
};
