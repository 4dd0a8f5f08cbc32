use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use wallarchive::pipeline::{RenderFormat, SiteSource};

#[derive(Parser, Debug)]
#[command(name = "wallarchive")]
#[command(about = "Bing wallpaper archive and static site generator", long_about = None)]
pub struct Cli {
    /// Configuration file (defaults to $WALLARCHIVE_CONFIG or config/wallarchive.toml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Fetch every configured market and merge into its dataset
    Update,
    /// Write per-month dataset files and month indexes
    Partition,
    /// Render the static site
    Render(RenderArgs),
    /// Fetch and merge the date-keyed daily dataset
    Daily,
    /// Deduplicate existing datasets by image fingerprint
    Repair,
    /// Update, partition and render in one pass
    Run(RunArgs),
    /// Print the effective configuration as TOML
    ShowConfig,
}

#[derive(clap::Args, Debug)]
pub struct RenderArgs {
    #[arg(long, value_enum, default_value_t = RenderFormat::All)]
    pub format: RenderFormat,

    /// Dataset the HTML pages are built from
    #[arg(long, value_enum, default_value_t = SiteSource::Archive)]
    pub source: SiteSource,

    /// Date printed in page footers (defaults to today)
    #[arg(long)]
    pub date: Option<NaiveDate>,
}

#[derive(clap::Args, Debug)]
pub struct RunArgs {
    /// Date printed in page footers (defaults to today)
    #[arg(long)]
    pub date: Option<NaiveDate>,
}
