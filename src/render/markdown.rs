//! Markdown month pages and archive index
//!
//! Month templates receive `period`, `image_table` and `archive_table`; the
//! tables are pre-rendered so custom templates only have to place them.

use serde::Serialize;
use std::path::{Path, PathBuf};
use upon::{Engine, Template};

use super::{grid, LocaleMonths, MonthGroup, Page, RenderError, Result};
use crate::config::SiteConfig;
use crate::dataset::ArchiveLayout;
use crate::record::{Period, SiteEntry};

const MONTH_TEMPLATE: &str = include_str!("../../templates/month.md");
const INDEX_TEMPLATE: &str = include_str!("../../templates/index.md");

#[derive(Serialize)]
struct MonthContext<'a> {
    period: String,
    image_table: &'a str,
    archive_table: &'a str,
}

#[derive(Serialize)]
struct IndexContext<'a> {
    archive_table: &'a str,
}

pub struct MarkdownRenderer {
    engine: Engine<'static>,
    month: Template<'static>,
    index: Template<'static>,
    images_per_row: usize,
    links_per_row: usize,
}

impl MarkdownRenderer {
    /// Build from site settings, reading `markdown_template` when configured
    pub fn new(site: &SiteConfig) -> Result<Self> {
        let month = match &site.markdown_template {
            Some(path) => std::fs::read_to_string(path).map_err(|source| RenderError::TemplateFile {
                path: path.clone(),
                source,
            })?,
            None => MONTH_TEMPLATE.to_string(),
        };
        Self::with_template(month, site.images_per_row, site.links_per_row)
    }

    /// Build with an explicit month template. Syntax errors surface here.
    pub fn with_template(month: String, images_per_row: usize, links_per_row: usize) -> Result<Self> {
        let engine = Engine::new();
        let month = engine.compile(month)?;
        let index = engine.compile(INDEX_TEMPLATE)?;
        Ok(Self {
            engine,
            month,
            index,
            images_per_row,
            links_per_row,
        })
    }

    /// Month pages from `index`, per-locale month pages, and `index.md`.
    /// Every page links to all months present in `index`.
    pub fn render(&self, index: &[MonthGroup], locales: &[LocaleMonths]) -> Result<Vec<Page>> {
        let periods: Vec<Period> = index.iter().map(|group| group.period).collect();
        let archive_table = self.archive_table(&periods);
        let mut pages = Vec::new();

        for group in index {
            let label = group.period.label();
            pages.push(Page {
                path: PathBuf::from(&label).join(format!("{}.md", label)),
                content: self.month_page(group, &archive_table)?,
            });
        }

        for locale in locales {
            let stem = ArchiveLayout::locale_stem(&locale.locale);
            for group in &locale.months {
                let label = group.period.label();
                pages.push(Page {
                    path: PathBuf::from(&label).join(format!("{}_{}.md", label, stem)),
                    content: self.month_page(group, &archive_table)?,
                });
            }
        }

        let content = self
            .index
            .render(&self.engine, IndexContext {
                archive_table: &archive_table,
            })
            .to_string()?;
        pages.push(Page {
            path: Path::new("index.md").to_path_buf(),
            content,
        });

        Ok(pages)
    }

    fn month_page(&self, group: &MonthGroup, archive_table: &str) -> Result<String> {
        let image_table = self.image_table(&group.entries);
        let content = self
            .month
            .render(&self.engine, MonthContext {
                period: group.period.label(),
                image_table: &image_table,
                archive_table,
            })
            .to_string()?;
        Ok(content)
    }

    /// `![](<1080p>) <date> [download 4k](<uhd>)` cells, blank-padded rows
    pub fn image_table(&self, entries: &[SiteEntry]) -> String {
        let mut lines = table_header(self.images_per_row);
        for row in grid(entries, self.images_per_row) {
            let cells: Vec<String> = row
                .iter()
                .map(|cell| {
                    if cell.blank {
                        String::new()
                    } else {
                        let entry = &cell.item;
                        format!("![]({}) {} [download 4k]({})", entry.preview_url, entry.date, entry.full_url)
                    }
                })
                .collect();
            lines.push(table_row(&cells));
        }
        lines.join("\n")
    }

    /// `[YYYY-MM](/YYYY-MM/YYYY-MM.md)` links, newest first
    pub fn archive_table(&self, periods: &[Period]) -> String {
        let links: Vec<String> = periods
            .iter()
            .map(|period| {
                let label = period.label();
                format!("[{0}](/{0}/{0}.md)", label)
            })
            .collect();

        let mut lines = table_header(self.links_per_row);
        for row in grid(&links, self.links_per_row) {
            let cells: Vec<String> = row.into_iter().map(|cell| cell.item).collect();
            lines.push(table_row(&cells));
        }
        lines.join("\n")
    }
}

fn table_row(cells: &[String]) -> String {
    format!("| {} |", cells.join(" | "))
}

fn table_header(columns: usize) -> Vec<String> {
    let columns = columns.max(1);
    vec![
        table_row(&vec![String::new(); columns]),
        table_row(&vec![":----:".to_string(); columns]),
    ]
}
