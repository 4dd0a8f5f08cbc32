mod cli;

use clap::Parser;
use cli::{Cli, Commands};
use std::sync::Arc;
use tracing::info;
use wallarchive::config::Config;
use wallarchive::fetch::{ArchiveClient, HttpConfig};
use wallarchive::observability::init_tracing;
use wallarchive::pipeline::Archiver;

type AnyError = Box<dyn std::error::Error + Send + Sync + 'static>;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), AnyError> {
    init_tracing();

    let cli = Cli::parse();

    let config = match cli.config {
        Some(path) => Config::load_from_path(path)?,
        None => Config::load()?,
    };

    if let Commands::ShowConfig = cli.command {
        print!("{}", config.to_toml()?);
        return Ok(());
    }

    info!(
        locales = ?config.archive.locales,
        data_dir = %config.archive.data_dir.display(),
        "Configuration loaded"
    );

    let client = ArchiveClient::new(HttpConfig::from(&config.fetch))?;
    let archiver = Archiver::new(config, Arc::new(client));
    let today = chrono::Local::now().date_naive();

    match cli.command {
        Commands::Update => {
            for (locale, outcome) in archiver.update_all().await {
                println!("{}: {:?}", locale, outcome);
            }
        }
        Commands::Partition => {
            for report in archiver.partition_all() {
                println!(
                    "{}: {} months, {} written, {} unchanged, {} failed{}",
                    report.locale,
                    report.export.periods,
                    report.export.written,
                    report.export.unchanged,
                    report.export.failed,
                    if report.is_index_source { " (index source)" } else { "" }
                );
            }
        }
        Commands::Render(args) => {
            let summary = archiver.render(args.format, args.source, args.date.unwrap_or(today))?;
            println!("pages: {:?}", summary);
        }
        Commands::Daily => {
            println!("daily: {:?}", archiver.update_daily().await);
        }
        Commands::Repair => {
            for (locale, outcome) in archiver.repair_all() {
                println!("{}: {:?}", locale, outcome);
            }
        }
        Commands::Run(args) => {
            let summary = archiver.run(args.date.unwrap_or(today)).await?;
            println!("pages: {:?}", summary);
        }
        Commands::ShowConfig => {}
    }

    println!("{}", archiver.metrics());
    Ok(())
}
