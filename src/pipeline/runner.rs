//! Sequential archive runner

use chrono::NaiveDate;
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};

use super::{PartitionReport, RenderFormat, RepairOutcome, SiteSource, UpdateOutcome};
use crate::config::Config;
use crate::dataset::{self, dedup_existing, merge, DatasetStore, DedupKey, LoadState, WriteOutcome};
use crate::fetch::ImageSource;
use crate::observability::{MetricsSnapshot, RunMetrics};
use crate::record::{DailyWallpaper, Normalizer, Record, RecordField, WallpaperRecord};
use crate::render::{self, HtmlRenderer, LocaleMonths, MarkdownRenderer, RenderError, WriteSummary};

pub struct Archiver {
    config: Config,
    source: Arc<dyn ImageSource>,
    store: DatasetStore,
    metrics: RunMetrics,
}

impl Archiver {
    pub fn new(config: Config, source: Arc<dyn ImageSource>) -> Self {
        let store = DatasetStore::open(&config.archive.data_dir);
        Self {
            config,
            source,
            store,
            metrics: RunMetrics::new(),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn store(&self) -> &DatasetStore {
        &self.store
    }

    pub fn metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    /// Fetch, merge and persist every configured market in order
    pub async fn update_all(&self) -> Vec<(String, UpdateOutcome)> {
        let mut outcomes = Vec::with_capacity(self.config.archive.locales.len());
        for locale in &self.config.archive.locales {
            let outcome = self.update_locale(locale).await;
            outcomes.push((locale.clone(), outcome));
        }
        outcomes
    }

    /// Fetch, merge and persist one market's dataset
    pub async fn update_locale(&self, locale: &str) -> UpdateOutcome {
        let images = match self.source.fetch(locale, self.config.archive.days).await {
            Ok(images) => images,
            Err(e) => {
                warn!(locale, error = %e, "Fetch failed, skipping market");
                self.metrics.fetch_failed();
                return UpdateOutcome::FetchFailed;
            }
        };

        let normalizer = Normalizer::new(&self.config.fetch.host, locale);
        let incoming = normalizer.normalize_all(&images);
        let path = self.store.layout().root_file(locale);
        self.reconcile(locale, &path, incoming, &self.config.archive.dedup_key)
    }

    /// Fetch and merge the date-keyed daily dataset
    pub async fn update_daily(&self) -> UpdateOutcome {
        let daily = &self.config.daily;
        let images = match self.source.fetch(&daily.market, daily.days).await {
            Ok(images) => images,
            Err(e) => {
                warn!(market = %daily.market, error = %e, "Fetch failed, daily dataset not updated");
                self.metrics.fetch_failed();
                return UpdateOutcome::FetchFailed;
            }
        };

        let normalizer = Normalizer::new(&self.config.fetch.host, &daily.market);
        let incoming: Vec<DailyWallpaper> = images
            .iter()
            .filter_map(|image| normalizer.normalize_daily(image))
            .collect();
        self.reconcile("daily", &daily.path, incoming, &DedupKey::single(RecordField::Date))
    }

    /// Merge `incoming` into the dataset at `path`.
    ///
    /// The file is only rewritten when something was appended. An unreadable
    /// file is quarantined first so its bytes survive the overwrite.
    fn reconcile<R: Record>(&self, label: &str, path: &Path, incoming: Vec<R>, key: &DedupKey) -> UpdateOutcome {
        let snapshot = dataset::load::<R>(path);
        let state = snapshot.state;
        let outcome = merge(snapshot.records, incoming, key);

        if outcome.appended == 0 {
            info!(
                dataset = label,
                total = outcome.records.len(),
                duplicates = outcome.duplicates,
                "No new records"
            );
            self.metrics.locale_unchanged();
            return UpdateOutcome::Unchanged;
        }

        if state == LoadState::Corrupt {
            match dataset::quarantine(path) {
                Ok(_) => self.metrics.quarantined(),
                Err(e) => {
                    warn!(dataset = label, error = %e, "Failed to quarantine unreadable dataset, not saving");
                    self.metrics.write_failed();
                    return UpdateOutcome::SaveFailed;
                }
            }
        }

        if let Err(e) = dataset::save(path, &outcome.records) {
            warn!(dataset = label, error = %e, "Failed to save dataset");
            self.metrics.write_failed();
            return UpdateOutcome::SaveFailed;
        }

        info!(
            dataset = label,
            appended = outcome.appended,
            total = outcome.records.len(),
            "Dataset updated"
        );
        self.metrics.locale_updated(outcome.appended);
        UpdateOutcome::Updated {
            appended: outcome.appended,
            total: outcome.records.len(),
        }
    }

    /// First market in the index order whose dataset has records
    pub fn index_source(&self) -> Option<(String, Vec<WallpaperRecord>)> {
        for locale in self.config.archive.index_order() {
            let snapshot = self.store.load_locale(&locale);
            if !snapshot.records.is_empty() {
                return Some((locale, snapshot.records));
            }
            info!(locale = %locale, "Index source candidate has no data, trying next");
        }
        warn!("No index source market has data");
        None
    }

    /// Write per-month files for every market, and month indexes from the
    /// index source market
    pub fn partition_all(&self) -> Vec<PartitionReport> {
        let index_locale = self.index_source().map(|(locale, _)| locale);
        let mut reports = Vec::new();

        for locale in &self.config.archive.locales {
            let snapshot = self.store.load_locale(locale);
            if snapshot.is_corrupt() {
                warn!(locale, "Dataset unreadable, not partitioning");
                self.metrics.write_failed();
                continue;
            }

            let is_index_source = index_locale.as_deref() == Some(locale.as_str());
            let export = self.store.export_periods(locale, &snapshot.records, is_index_source);
            self.metrics.files(export.written, export.unchanged, export.failed);
            reports.push(PartitionReport {
                locale: locale.clone(),
                is_index_source,
                export,
            });
        }
        reports
    }

    /// Deduplicate every market's dataset by image fingerprint, dropping
    /// records without one
    pub fn repair_all(&self) -> Vec<(String, RepairOutcome)> {
        let key = DedupKey::single(RecordField::Hash);
        let mut outcomes = Vec::new();

        for locale in &self.config.archive.locales {
            let path = self.store.layout().root_file(locale);
            let snapshot = dataset::load::<WallpaperRecord>(&path);
            let outcome = match snapshot.state {
                LoadState::Missing => RepairOutcome::Clean,
                LoadState::Corrupt => {
                    warn!(locale, "Dataset unreadable, not repairing");
                    RepairOutcome::Skipped
                }
                LoadState::Loaded => {
                    let before = snapshot.records.len();
                    let repaired = dedup_existing(snapshot.records, &key);
                    let removed = before - repaired.records.len();
                    match dataset::save_if_changed(&path, &repaired.records) {
                        Ok(WriteOutcome::Written) => {
                            info!(locale, removed, total = repaired.records.len(), "Dataset repaired");
                            RepairOutcome::Repaired {
                                removed,
                                total: repaired.records.len(),
                            }
                        }
                        Ok(WriteOutcome::Unchanged) => RepairOutcome::Clean,
                        Err(e) => {
                            warn!(locale, error = %e, "Failed to save repaired dataset");
                            self.metrics.write_failed();
                            RepairOutcome::SaveFailed
                        }
                    }
                }
            };
            outcomes.push((locale.clone(), outcome));
        }
        outcomes
    }

    /// Render the requested page sets. Template errors abort; individual
    /// page write failures are counted.
    pub fn render(
        &self,
        format: RenderFormat,
        source: SiteSource,
        generated_on: NaiveDate,
    ) -> Result<WriteSummary, RenderError> {
        let site = &self.config.site;
        let mut summary = WriteSummary::default();

        if format.markdown() {
            let renderer = MarkdownRenderer::new(site)?;
            let index = self
                .index_source()
                .map(|(_, records)| render::month_groups(&records))
                .unwrap_or_default();
            let locales: Vec<LocaleMonths> = self
                .config
                .archive
                .locales
                .iter()
                .map(|locale| LocaleMonths {
                    locale: locale.clone(),
                    months: render::month_groups(&self.store.load_locale(locale).records),
                })
                .collect();

            let pages = renderer.render(&index, &locales)?;
            add(&mut summary, render::write_pages(&site.markdown_dir, &pages));
        }

        if format.html() {
            let renderer = HtmlRenderer::new(site)?;
            let months = match source {
                SiteSource::Archive => self
                    .index_source()
                    .map(|(_, records)| render::month_groups(&records))
                    .unwrap_or_default(),
                SiteSource::Daily => {
                    render::month_groups(&dataset::load::<DailyWallpaper>(&self.config.daily.path).records)
                }
            };

            let pages = renderer.render(&months, generated_on)?;
            add(&mut summary, render::write_pages(&site.html_dir, &pages));
        }

        self.metrics.files(summary.written, summary.unchanged, summary.failed);
        Ok(summary)
    }

    /// Update, partition and render the per-market archive in one pass
    pub async fn run(&self, generated_on: NaiveDate) -> Result<WriteSummary, RenderError> {
        self.update_all().await;
        self.partition_all();
        self.render(RenderFormat::All, SiteSource::Archive, generated_on)
    }
}

fn add(total: &mut WriteSummary, part: WriteSummary) {
    total.written += part.written;
    total.unchanged += part.unchanged;
    total.failed += part.failed;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::{FetchError, Result as FetchResult};
    use crate::record::ApiImage;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use tempfile::TempDir;

    /// In-memory upstream keyed by market; unknown markets fail
    struct StubSource {
        images: HashMap<String, Vec<ApiImage>>,
    }

    #[async_trait]
    impl ImageSource for StubSource {
        async fn fetch(&self, market: &str, _days: u32) -> FetchResult<Vec<ApiImage>> {
            self.images.get(market).cloned().ok_or(FetchError::Status(503))
        }
    }

    fn image(fullstartdate: &str, hsh: &str) -> ApiImage {
        ApiImage {
            startdate: fullstartdate[..8].to_string(),
            fullstartdate: fullstartdate.to_string(),
            url: format!("/th?id=OHR.{}_1920x1080.jpg", hsh),
            urlbase: format!("/th?id=OHR.{}", hsh),
            copyright: format!("Image {}", hsh),
            hsh: hsh.to_string(),
            ..Default::default()
        }
    }

    fn create_test_archiver(images: HashMap<String, Vec<ApiImage>>) -> (Archiver, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let mut config = Config::default();
        config.archive.data_dir = temp_dir.path().join("bing");
        config.archive.locales = vec!["en-US".to_string(), "zh-CN".to_string()];
        config.archive.index_locales = vec!["zh-CN".to_string(), "en-US".to_string()];
        config.daily.path = temp_dir.path().join("data/wallpapers.json");
        config.daily.market = "en-US".to_string();
        config.site.markdown_dir = temp_dir.path().join("md");
        config.site.html_dir = temp_dir.path().join("content");

        let archiver = Archiver::new(config, Arc::new(StubSource { images }));
        (archiver, temp_dir)
    }

    #[tokio::test]
    async fn test_update_appends_and_skips_failed_market() {
        let images = HashMap::from([(
            "en-US".to_string(),
            vec![image("202401020800", "def"), image("202401010800", "abc")],
        )]);
        let (archiver, _temp_dir) = create_test_archiver(images);

        let outcomes = archiver.update_all().await;
        assert_eq!(outcomes[0].1, UpdateOutcome::Updated { appended: 2, total: 2 });
        assert_eq!(outcomes[1].1, UpdateOutcome::FetchFailed);

        let saved = archiver.store().load_locale("en-US");
        assert_eq!(saved.records[0].hsh, "def");
        assert_eq!(saved.records[0].urlbase, "https://www.bing.com/th?id=OHR.def");
        assert!(!archiver.store().layout().root_file("zh-CN").exists());

        let metrics = archiver.metrics();
        assert_eq!(metrics.records_appended, 2);
        assert_eq!(metrics.fetch_failures, 1);
    }

    #[tokio::test]
    async fn test_second_update_leaves_file_untouched() {
        let images = HashMap::from([("en-US".to_string(), vec![image("202401010800", "abc")])]);
        let (archiver, _temp_dir) = create_test_archiver(images);

        archiver.update_locale("en-US").await;
        let path = archiver.store().layout().root_file("en-US");
        let before = std::fs::read(&path).unwrap();
        let mtime = std::fs::metadata(&path).unwrap().modified().unwrap();

        assert_eq!(archiver.update_locale("en-US").await, UpdateOutcome::Unchanged);
        assert_eq!(std::fs::read(&path).unwrap(), before);
        assert_eq!(std::fs::metadata(&path).unwrap().modified().unwrap(), mtime);
    }

    #[tokio::test]
    async fn test_corrupt_dataset_is_quarantined_before_save() {
        let images = HashMap::from([("en-US".to_string(), vec![image("202401010800", "abc")])]);
        let (archiver, temp_dir) = create_test_archiver(images);

        let path = archiver.store().layout().root_file("en-US");
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, b"{ not json").unwrap();

        let outcome = archiver.update_locale("en-US").await;
        assert_eq!(outcome, UpdateOutcome::Updated { appended: 1, total: 1 });

        let quarantined: Vec<_> = std::fs::read_dir(temp_dir.path().join("bing"))
            .unwrap()
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_name().to_string_lossy().starts_with("bing_en-US.json.corrupt-"))
            .collect();
        assert_eq!(quarantined.len(), 1);
        assert_eq!(std::fs::read(quarantined[0].path()).unwrap(), b"{ not json");
        assert_eq!(archiver.metrics().quarantined, 1);
    }

    #[tokio::test]
    async fn test_unwritable_dataset_does_not_stop_later_markets() {
        // Longer than any file name the filesystem accepts
        let unwritable = "x".repeat(300);
        let images = HashMap::from([
            (unwritable.clone(), vec![image("202401020800", "def")]),
            ("zh-CN".to_string(), vec![image("202401010800", "abc")]),
        ]);
        let (mut archiver, _temp_dir) = create_test_archiver(images);
        archiver.config.archive.locales = vec![unwritable.clone(), "zh-CN".to_string()];

        let outcomes = archiver.update_all().await;
        assert_eq!(outcomes[0].1, UpdateOutcome::SaveFailed);
        assert_eq!(outcomes[1].1, UpdateOutcome::Updated { appended: 1, total: 1 });
        assert_eq!(archiver.store().load_locale("zh-CN").records.len(), 1);

        let metrics = archiver.metrics();
        assert_eq!(metrics.write_failures, 1);
        assert_eq!(metrics.locales_updated, 1);
    }

    #[tokio::test]
    async fn test_partition_counts_failed_month_and_continues() {
        let images = HashMap::from([(
            "en-US".to_string(),
            vec![image("202402010800", "feb"), image("202401310800", "jan")],
        )]);
        let (archiver, _temp_dir) = create_test_archiver(images);
        archiver.update_all().await;

        // A regular file where the January directory belongs
        let layout = archiver.store().layout();
        let january = "2024-01".parse().unwrap();
        std::fs::write(layout.period_dir(january), b"").unwrap();

        let reports = archiver.partition_all();
        let en = reports.iter().find(|r| r.locale == "en-US").unwrap();
        assert_eq!(en.export.failed, 2);
        assert_eq!(en.export.written, 2);
        assert!(layout.period_file("2024-02".parse().unwrap(), "en-US").exists());
        assert_eq!(archiver.metrics().write_failures, 2);
    }

    #[tokio::test]
    async fn test_update_daily_date_keyed() {
        let images = HashMap::from([(
            "en-US".to_string(),
            vec![image("202401020800", "def"), image("202401010800", "abc")],
        )]);
        let (archiver, _temp_dir) = create_test_archiver(images);

        let outcome = archiver.update_daily().await;
        assert_eq!(outcome, UpdateOutcome::Updated { appended: 2, total: 2 });

        let text = std::fs::read_to_string(&archiver.config().daily.path).unwrap();
        let value: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(
            value["2024-01-02"]["image_url"],
            "https://www.bing.com/th?id=OHR.def_UHD.jpg"
        );
        assert!(text.starts_with("{\n  \"2024-01-02\""));

        assert_eq!(archiver.update_daily().await, UpdateOutcome::Unchanged);
    }

    #[tokio::test]
    async fn test_partition_uses_index_fallback() {
        let images = HashMap::from([(
            "en-US".to_string(),
            vec![image("202402010800", "feb"), image("202401310800", "jan")],
        )]);
        let (archiver, _temp_dir) = create_test_archiver(images);
        archiver.update_all().await;

        let reports = archiver.partition_all();
        let en = reports.iter().find(|r| r.locale == "en-US").unwrap();
        assert!(en.is_index_source);
        assert_eq!(en.export.periods, 2);

        let layout = archiver.store().layout();
        let period = "2024-01".parse().unwrap();
        assert!(layout.period_file(period, "en-US").exists());
        assert!(layout.period_index(period).exists());
        assert!(!layout.period_file(period, "zh-CN").exists());

        let again = archiver.partition_all();
        let en = again.iter().find(|r| r.locale == "en-US").unwrap();
        assert_eq!(en.export.written, 0);
        assert_eq!(en.export.unchanged, 4);
    }

    #[test]
    fn test_repair_dedups_by_hash() {
        let (archiver, _temp_dir) = create_test_archiver(HashMap::new());
        let records = vec![
            WallpaperRecord {
                fullstartdate: "202401030800".to_string(),
                hsh: "abc".to_string(),
                ..Default::default()
            },
            WallpaperRecord {
                fullstartdate: "202401020800".to_string(),
                hsh: "abc".to_string(),
                ..Default::default()
            },
            WallpaperRecord {
                fullstartdate: "202401010800".to_string(),
                ..Default::default()
            },
        ];
        archiver.store().save_locale("en-US", &records).unwrap();

        let outcomes = archiver.repair_all();
        assert_eq!(outcomes[0].1, RepairOutcome::Repaired { removed: 2, total: 1 });
        assert_eq!(outcomes[1].1, RepairOutcome::Clean);

        let repaired = archiver.store().load_locale("en-US");
        assert_eq!(repaired.records[0].fullstartdate, "202401030800");

        assert_eq!(archiver.repair_all()[0].1, RepairOutcome::Clean);
    }

    #[tokio::test]
    async fn test_render_all_formats() {
        let images = HashMap::from([("zh-CN".to_string(), vec![image("202401010800", "abc")])]);
        let (archiver, temp_dir) = create_test_archiver(images);
        archiver.update_all().await;

        let generated_on = NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
        let summary = archiver
            .render(RenderFormat::All, SiteSource::Archive, generated_on)
            .unwrap();
        assert_eq!(summary.failed, 0);

        let md = temp_dir.path().join("md");
        assert!(md.join("index.md").exists());
        assert!(md.join("2024-01").join("2024-01.md").exists());
        assert!(md.join("2024-01").join("2024-01_bing_zh-CN.md").exists());
        let html = temp_dir.path().join("content");
        assert!(html.join("2024-01").join("2024-01.html").exists());
        assert!(html.join("index.html").exists());

        let again = archiver
            .render(RenderFormat::All, SiteSource::Archive, generated_on)
            .unwrap();
        assert_eq!(again.written, 0);
    }
}
