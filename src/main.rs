use anyhow::{Context, Result};
use clap::Parser;
use iclubscraper::config::{self, Config};
use iclubscraper::fetch::ReportClient;
use iclubscraper::output::write_csv;
use iclubscraper::scrape::scrape_year;
use std::{path::PathBuf, process};
use tracing::{error, info};
use tracing_subscriber::{fmt, EnvFilter};

/// Command-line args: report year plus portal and output overrides
#[derive(Parser, Debug)]
struct Args {
    /// Report year; prompted for when omitted
    #[arg(long)]
    year: Option<i32>,

    /// Output CSV path
    #[arg(long)]
    output: Option<PathBuf>,

    /// Club identifier
    #[arg(long)]
    club: Option<String>,

    /// Portal base URL
    #[arg(long)]
    base_url: Option<String>,

    /// Optional YAML config file
    #[arg(long)]
    config: Option<PathBuf>,
}

fn main() -> Result<()> {
    // ─── 1) init logging ─────────────────────────────────────────────
    let env = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt::Subscriber::builder().with_env_filter(env).init();

    // ─── 2) resolve configuration ────────────────────────────────────
    let args = Args::parse();
    let mut config = match &args.config {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };
    if let Some(base_url) = args.base_url {
        config.base_url = base_url;
    }
    if let Some(club) = args.club {
        config.club = club;
    }
    if let Some(output) = args.output {
        config.output = output;
    }
    let year = match args.year {
        Some(year) => year,
        None => config::prompt_year()?,
    };
    let credentials = config::credential_source().credentials()?;

    // ─── 3) authenticate ─────────────────────────────────────────────
    let client = ReportClient::new(&config.portal_url()?, config.club.as_str())?;
    match client.login(&credentials) {
        Ok(status) => info!("Login successful. Status code: {status}"),
        Err(err) => {
            error!("Failed to login: {err:#}");
            process::exit(1);
        }
    }

    // ─── 4) scrape the thirteen report periods ───────────────────────
    let records = scrape_year(&client, year)?;

    // ─── 5) write the CSV ────────────────────────────────────────────
    write_csv(&config.output, &records)
        .with_context(|| format!("writing {}", config.output.display()))?;
    info!(
        "Scraping completed. {} rows -> {}",
        records.len(),
        config.output.display()
    );

    Ok(())
}
