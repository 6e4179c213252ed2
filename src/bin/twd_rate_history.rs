use twd_rate_history::config::Config;
use twd_rate_history::logging;
use twd_rate_history::scrapers::bot::BotScraper;
use twd_rate_history::services::history_service::HistoryService;

use anyhow::Context;
use clap::{App, Arg};
use log::{error, info};
use std::path::Path;
use std::process::ExitCode;

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let matches = App::new("twd_rate_history")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Append today's Bank of Taiwan exchange rates to a JSON history")
        .arg(
            Arg::with_name("output")
                .short('o')
                .long("output")
                .value_name("FILE")
                .help("History JSON file to update")
                .takes_value(true),
        )
        .arg(
            Arg::with_name("log-file")
                .long("log-file")
                .value_name("FILE")
                .help("Log file to append to")
                .takes_value(true),
        )
        .arg(
            Arg::with_name("url")
                .long("url")
                .value_name("URL")
                .help("Rate board page to scrape")
                .takes_value(true),
        )
        .get_matches();

    let mut config = Config::new();
    if let Some(output) = matches.value_of("output") {
        config = config.with_output_file(output);
    }
    if let Some(log_file) = matches.value_of("log-file") {
        config = config.with_log_file(log_file);
    }
    if let Some(url) = matches.value_of("url") {
        config = config.with_source_url(url);
    }

    let guard = match logging::init(Path::new(&config.log_file)).context("Failed to initialize logging") {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("{:#}", e);
            return ExitCode::FAILURE;
        }
    };

    let code = run(config).await;
    guard.finish();
    code
}

async fn run(config: Config) -> ExitCode {
    info!("=== Exchange rate job started ===");

    let preview_chars = config.preview_chars;
    let scraper = match BotScraper::new(&config.source_url, &config.source_name, config.request_timeout_secs) {
        Ok(scraper) => scraper,
        Err(e) => {
            error!("Failed to create HTTP client: {}", e);
            return ExitCode::FAILURE;
        }
    };
    let service = HistoryService::new(config, Box::new(scraper));

    let Some(snapshot) = service.fetch_snapshot().await else {
        error!("Failed to fetch or process rate data. Exiting.");
        return ExitCode::FAILURE;
    };

    println!("\n--- JSON Data Output Preview ---");
    match snapshot.preview(preview_chars) {
        Ok(preview) => println!("{}\n...", preview),
        Err(e) => error!("Failed to render preview: {}", e),
    }

    match service.merge_and_persist(snapshot) {
        Ok(summary) => {
            info!(
                "Saved {} currencies for {} to {} ({} dates total)",
                summary.currencies, summary.date_key, service.data_path().display(), summary.total_dates
            );
            info!("=== Exchange rate job completed ===");
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("Error saving file: {}", e);
            ExitCode::FAILURE
        }
    }
}
