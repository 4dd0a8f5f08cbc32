use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::{Serialize, Serializer};
use serde_json::ser::PrettyFormatter;
use tempfile::NamedTempFile;
use tracing::{debug, info, warn};

use crate::record::{Record, Schema, WallpaperRecord};

use super::error::{Result, StoreError};
use super::partitions::{partition, ArchiveLayout};

/// How a dataset file looked when it was read
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadState {
    /// No file on disk
    Missing,
    /// File parsed
    Loaded,
    /// File present but unreadable or not a dataset
    Corrupt,
}

/// Records read from one dataset file
#[derive(Debug, Clone)]
pub struct Snapshot<R> {
    pub records: Vec<R>,
    pub state: LoadState,
}

impl<R> Snapshot<R> {
    fn empty(state: LoadState) -> Self {
        Self {
            records: Vec::new(),
            state,
        }
    }

    pub fn is_corrupt(&self) -> bool {
        self.state == LoadState::Corrupt
    }
}

/// Whether a write changed the file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    Written,
    Unchanged,
}

/// Read a dataset, degrading to an empty collection when the file is absent
/// or unparsable. Never fails.
pub fn load<R: Record>(path: &Path) -> Snapshot<R> {
    let bytes = match std::fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            debug!(path = %path.display(), "Dataset file not found, starting empty");
            return Snapshot::empty(LoadState::Missing);
        }
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Failed to read dataset file");
            return Snapshot::empty(LoadState::Corrupt);
        }
    };

    match decode::<R>(&bytes) {
        Ok(records) => Snapshot {
            records,
            state: LoadState::Loaded,
        },
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Dataset file is not valid JSON for its schema");
            Snapshot::empty(LoadState::Corrupt)
        }
    }
}

/// Serialize `records` the way the schema stores them on disk
pub fn encode<R: Record>(records: &[R]) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    let formatter = PrettyFormatter::with_indent(R::SCHEMA.indent());
    let mut ser = serde_json::Serializer::with_formatter(&mut buf, formatter);
    match R::SCHEMA {
        Schema::Flat => records.serialize(&mut ser)?,
        Schema::DateKeyed => (&mut ser).collect_map(records.iter().map(|r| (r.temporal(), r)))?,
    }
    Ok(buf)
}

fn decode<R: Record>(bytes: &[u8]) -> std::result::Result<Vec<R>, serde_json::Error> {
    match R::SCHEMA {
        Schema::Flat => serde_json::from_slice(bytes),
        Schema::DateKeyed => {
            let map: BTreeMap<String, R> = serde_json::from_slice(bytes)?;
            Ok(map.into_values().collect())
        }
    }
}

/// Write `records` to `path` atomically
pub fn save<R: Record>(path: &Path, records: &[R]) -> Result<WriteOutcome> {
    let bytes = encode(records)?;
    write_atomic(path, &bytes)?;
    info!(path = %path.display(), records = records.len(), "Saved dataset");
    Ok(WriteOutcome::Written)
}

/// Write `records` unless the file already holds exactly these bytes
pub fn save_if_changed<R: Record>(path: &Path, records: &[R]) -> Result<WriteOutcome> {
    let bytes = encode(records)?;
    write_if_changed(path, &bytes)
}

/// Replace `path` with `bytes` unless it already holds them
pub fn write_if_changed(path: &Path, bytes: &[u8]) -> Result<WriteOutcome> {
    if let Ok(current) = std::fs::read(path) {
        if current == bytes {
            debug!(path = %path.display(), "File unchanged, skipping write");
            return Ok(WriteOutcome::Unchanged);
        }
    }
    write_atomic(path, bytes)?;
    Ok(WriteOutcome::Written)
}

/// Write through a temporary file in the target directory, then rename over
/// the target, so a crash never leaves a half-written file behind.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    let parent = path
        .parent()
        .ok_or_else(|| StoreError::NoParent(path.to_path_buf()))?;
    let parent = if parent.as_os_str().is_empty() {
        Path::new(".")
    } else {
        parent
    };
    std::fs::create_dir_all(parent).map_err(|e| StoreError::io(parent, e))?;

    let mut tmp = NamedTempFile::new_in(parent).map_err(|e| StoreError::io(parent, e))?;
    tmp.write_all(bytes).map_err(|e| StoreError::io(tmp.path(), e))?;
    // Temp files are created owner-only; published files keep the target's mode
    #[cfg(unix)]
    tmp.as_file()
        .set_permissions(target_permissions(path))
        .map_err(|e| StoreError::io(tmp.path(), e))?;
    tmp.as_file().sync_all().map_err(|e| StoreError::io(tmp.path(), e))?;
    tmp.persist(path).map_err(|e| StoreError::io(path, e.error))?;
    Ok(())
}

/// Mode of the file being replaced, or `0o644` for a new one
#[cfg(unix)]
fn target_permissions(path: &Path) -> std::fs::Permissions {
    use std::os::unix::fs::PermissionsExt;

    match std::fs::metadata(path) {
        Ok(meta) => meta.permissions(),
        Err(_) => std::fs::Permissions::from_mode(0o644),
    }
}

/// Move an unreadable dataset aside so its bytes survive the next save
pub fn quarantine(path: &Path) -> Result<PathBuf> {
    let file_name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    let stamp = chrono::Utc::now().format("%Y%m%d%H%M%S");
    let target = path.with_file_name(format!("{}.corrupt-{}", file_name, stamp));
    std::fs::rename(path, &target).map_err(|e| StoreError::io(path, e))?;
    warn!(from = %path.display(), to = %target.display(), "Quarantined unreadable dataset");
    Ok(target)
}

/// Summary of one period export
#[derive(Debug, Clone, Default)]
pub struct PeriodExport {
    pub periods: usize,
    pub written: usize,
    pub unchanged: usize,
    pub failed: usize,
}

/// File-backed archive of per-market datasets
#[derive(Debug, Clone)]
pub struct DatasetStore {
    layout: ArchiveLayout,
}

impl DatasetStore {
    pub fn open(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            layout: ArchiveLayout::new(data_dir),
        }
    }

    pub fn layout(&self) -> &ArchiveLayout {
        &self.layout
    }

    pub fn load_locale(&self, locale: &str) -> Snapshot<WallpaperRecord> {
        load(&self.layout.root_file(locale))
    }

    pub fn save_locale(&self, locale: &str, records: &[WallpaperRecord]) -> Result<WriteOutcome> {
        save(&self.layout.root_file(locale), records)
    }

    pub fn quarantine_locale(&self, locale: &str) -> Result<PathBuf> {
        quarantine(&self.layout.root_file(locale))
    }

    /// Write `{YYYY-MM}/bing_{locale}.json` for every month in `records`,
    /// plus `{YYYY-MM}/{YYYY-MM}.json` when `as_index` is set.
    ///
    /// A failing file is logged and counted; the remaining months still run.
    pub fn export_periods(&self, locale: &str, records: &[WallpaperRecord], as_index: bool) -> PeriodExport {
        let mut export = PeriodExport::default();

        for (period, members) in partition(records) {
            export.periods += 1;
            let members: Vec<WallpaperRecord> = members.into_iter().cloned().collect();
            let mut targets = vec![self.layout.period_file(period, locale)];
            if as_index {
                targets.push(self.layout.period_index(period));
            }

            for target in targets {
                match save_if_changed(&target, &members) {
                    Ok(WriteOutcome::Written) => {
                        debug!(path = %target.display(), records = members.len(), "Wrote period file");
                        export.written += 1;
                    }
                    Ok(WriteOutcome::Unchanged) => export.unchanged += 1,
                    Err(e) => {
                        warn!(path = %target.display(), error = %e, "Failed to write period file");
                        export.failed += 1;
                    }
                }
            }
        }

        info!(
            locale,
            periods = export.periods,
            written = export.written,
            unchanged = export.unchanged,
            failed = export.failed,
            "Exported period files"
        );
        export
    }
}
