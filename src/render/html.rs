//! HTML month pages and year-grouped index

use chrono::NaiveDate;
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::PathBuf;
use upon::{Engine, Template};

use super::{grid, Cell, MonthGroup, Page, Result};
use crate::config::SiteConfig;
use crate::record::SiteEntry;

const MONTH_TEMPLATE: &str = include_str!("../../templates/month.html");
const INDEX_TEMPLATE: &str = include_str!("../../templates/index.html");

#[derive(Serialize)]
struct MonthContext<'a> {
    period: String,
    total: usize,
    generated_on: &'a str,
    rows: Vec<Vec<Cell<SiteEntry>>>,
}

#[derive(Debug, Clone, Default, Serialize)]
struct MonthLink {
    label: String,
    href: String,
}

#[derive(Serialize)]
struct YearGroup {
    year: i32,
    rows: Vec<Vec<Cell<MonthLink>>>,
}

#[derive(Serialize)]
struct IndexContext<'a> {
    total_images: usize,
    total_years: usize,
    generated_on: &'a str,
    years: Vec<YearGroup>,
}

pub struct HtmlRenderer {
    engine: Engine<'static>,
    month: Template<'static>,
    index: Template<'static>,
    images_per_row: usize,
    months_per_row: usize,
}

impl HtmlRenderer {
    pub fn new(site: &SiteConfig) -> Result<Self> {
        let mut engine = Engine::new();
        engine.set_default_formatter(&upon::fmt::escape_html);
        addons::configure(&mut engine);
        let month = engine.compile(MONTH_TEMPLATE)?;
        let index = engine.compile(INDEX_TEMPLATE)?;
        Ok(Self {
            engine,
            month,
            index,
            images_per_row: site.images_per_row,
            months_per_row: site.months_per_row,
        })
    }

    /// One page per month plus `index.html`. `months` must be newest first;
    /// `generated_on` is printed in every footer.
    pub fn render(&self, months: &[MonthGroup], generated_on: NaiveDate) -> Result<Vec<Page>> {
        let generated_on = generated_on.format("%Y-%m-%d").to_string();
        let mut pages = Vec::with_capacity(months.len() + 1);

        for group in months {
            let label = group.period.label();
            let content = self
                .month
                .render(&self.engine, MonthContext {
                    period: label.clone(),
                    total: group.entries.len(),
                    generated_on: &generated_on,
                    rows: grid(&group.entries, self.images_per_row),
                })
                .to_string()?;
            pages.push(Page {
                path: PathBuf::from(&label).join(format!("{}.html", label)),
                content,
            });
        }

        let years = self.year_groups(months);
        let content = self
            .index
            .render(&self.engine, IndexContext {
                total_images: months.iter().map(|group| group.entries.len()).sum(),
                total_years: years.len(),
                generated_on: &generated_on,
                years,
            })
            .to_string()?;
        pages.push(Page {
            path: PathBuf::from("index.html"),
            content,
        });

        Ok(pages)
    }

    fn year_groups(&self, months: &[MonthGroup]) -> Vec<YearGroup> {
        let mut years: BTreeMap<i32, Vec<MonthLink>> = BTreeMap::new();
        for group in months {
            let label = group.period.label();
            years.entry(group.period.year).or_default().push(MonthLink {
                href: format!("{0}/{0}.html", label),
                label,
            });
        }

        years
            .into_iter()
            .rev()
            .map(|(year, links)| YearGroup {
                year,
                rows: grid(&links, self.months_per_row),
            })
            .collect()
    }
}

mod addons {
    use std::fmt::Write;
    use upon::{fmt as upon_fmt, Engine, Value};

    /// `20240115` as `2024-01-15`; anything else is escaped unchanged
    fn iso_date_formatter(f: &mut upon_fmt::Formatter<'_>, value: &Value) -> upon_fmt::Result {
        match value {
            Value::String(s) if s.len() == 8 && s.bytes().all(|b| b.is_ascii_digit()) => {
                write!(f, "{}-{}-{}", &s[..4], &s[4..6], &s[6..])?
            }
            v => upon_fmt::escape_html(f, v)?,
        };
        Ok(())
    }

    pub(super) fn configure(engine: &mut Engine<'_>) {
        engine.add_formatter("iso_date", iso_date_formatter);
    }
}
