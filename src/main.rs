use anyhow::{Context, Result};
use archive_report::config::ReportConfig;
use archive_report::image::DefaultImageFetcher;
use archive_report::record::StoreItem;
use archive_report::report::{self, ReportOutcome};
use archive_report::search::SearchResultsInput;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Parser)]
#[command(name = "archive-report")]
#[command(about = "Create PDF reports of archive items and search results")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    #[command(about = "Create a report for a single item")]
    Item {
        #[arg(long, help = "Site configuration (JSON)")]
        config: PathBuf,
        #[arg(long, help = "Item exported from the record store (JSON)")]
        item: PathBuf,
        #[arg(long, help = "Directory to write the PDF into", default_value = ".")]
        output_dir: PathBuf,
        #[arg(long, help = "Include private fields")]
        authenticated: bool,
    },
    #[command(about = "Create a report for a page of search results")]
    Search {
        #[arg(long, help = "Site configuration (JSON)")]
        config: PathBuf,
        #[arg(long, help = "Search results and query parameters (JSON)")]
        results: PathBuf,
        #[arg(long, help = "Directory to write the PDF into", default_value = ".")]
        output_dir: PathBuf,
        #[arg(long, help = "Include private fields")]
        authenticated: bool,
    },
}

fn load_item(path: &Path) -> Result<StoreItem> {
    let text = std::fs::read_to_string(path).with_context(|| format!("Failed to read item {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("Invalid item {}", path.display()))
}

fn write_outcome(outcome: ReportOutcome, output_dir: &Path) -> Result<()> {
    match outcome {
        ReportOutcome::Download(download) => {
            download
                .write_to(output_dir)
                .with_context(|| format!("Failed to write {} to {}", download.file_name, output_dir.display()))?;
            println!("Set-Cookie: {}", download.marker.header_value());
            println!("{}", download.file_name);
        }
        ReportOutcome::Message(message) => println!("{}", message),
    }
    Ok(())
}

fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Item { config, item, output_dir, authenticated } => {
            let config = ReportConfig::load(&config)?;
            let item = load_item(&item)?;
            let fetcher = DefaultImageFetcher::new(Duration::from_secs(config.image_timeout_secs));
            write_outcome(report::create_item_report(&config, &item, authenticated, &fetcher), &output_dir)
        }
        Commands::Search { config, results, output_dir, authenticated } => {
            let config = ReportConfig::load(&config)?;
            let input = SearchResultsInput::load(&results)?;
            let fetcher = DefaultImageFetcher::new(Duration::from_secs(config.image_timeout_secs));
            write_outcome(
                report::create_search_results_report(&config, &input, authenticated, &fetcher),
                &output_dir,
            )
        }
    }
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    if let Err(e) = run(Cli::parse()) {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}
