mod browser;
mod db;
mod error;
mod fetcher;
mod parser;
mod settings;
mod store;
mod table;

use std::io::{self, Write};
use std::time::Instant;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use tracing::{error, info};

use browser::ChromeSession;
use parser::FailureMode;
use settings::Settings;

#[derive(Parser)]
#[command(name = "vinted_scraper", about = "Fetch Vinted catalog pages and extract seller listings")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct FetchArgs {
    /// Number of catalog pages to fetch (default from config: 2)
    #[arg(short = 'n', long)]
    pages: Option<u32>,
    /// Run the browser without a window; `--headless=false` forces a visible one
    #[arg(long, num_args = 0..=1, require_equals = true, default_missing_value = "true")]
    headless: Option<bool>,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch catalog pages with the browser and save them to the data directory
    Fetch(FetchArgs),
    /// Parse saved pages into the listings table
    Parse {
        /// Abort on the first unreadable page instead of skipping it
        #[arg(long)]
        strict: bool,
        /// Print rows as JSON lines on stdout; summaries go to stderr
        #[arg(long)]
        json: bool,
    },
    /// Fetch, save and parse in one go
    Run {
        #[command(flatten)]
        fetch: FetchArgs,
        /// Abort on the first unreadable page instead of skipping it
        #[arg(long)]
        strict: bool,
    },
    /// Show stored listings
    Overview {
        /// Only this seller
        #[arg(short, long)]
        account: Option<String>,
        /// Max rows to display
        #[arg(short = 'n', long, default_value = "50")]
        limit: usize,
    },
    /// Show listing table statistics
    Stats,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with_writer(io::stderr)
        .init();

    let t0 = Instant::now();
    let cli = Cli::parse();
    let mut settings = Settings::load().context("loading settings")?;
    let json_output = matches!(cli.command, Commands::Parse { json: true, .. });

    let result = match cli.command {
        Commands::Fetch(args) => {
            apply_fetch_args(&mut settings, &args)?;
            fetch_and_save(&settings)
        }
        Commands::Parse { strict, json } => run_parse(
            &settings,
            strict,
            json,
            &mut io::stdout().lock(),
            &mut io::stderr().lock(),
        ),
        Commands::Run { fetch, strict } => {
            apply_fetch_args(&mut settings, &fetch)?;
            fetch_and_save(&settings)?;
            parse_and_store(&settings, strict, &mut io::stdout().lock()).map(|_| ())
        }
        Commands::Overview { account, limit } => {
            let conn = db::connect(&settings.db_path)?;
            db::init_schema(&conn)?;
            let rows = db::fetch_listings(&conn, account.as_deref(), limit)?;
            if rows.is_empty() {
                println!("No listings stored. Run 'parse' first.");
                return Ok(());
            }

            println!(
                "{:>4} | {:<28} | {:<14} | {:<16} | {:>3}",
                "#", "Account", "Product", "Source", "Pos"
            );
            println!("{}", "-".repeat(77));
            for (i, r) in rows.iter().enumerate() {
                println!(
                    "{:>4} | {:<28} | {:<14} | {:<16} | {:>3}",
                    i + 1,
                    truncate(&r.account_name, 28),
                    r.product_id,
                    truncate(&r.source_file, 16),
                    r.position
                );
            }
            println!("\n{} listings | item: https://www.vinted.fr/items/<product>", rows.len());
            Ok(())
        }
        Commands::Stats => {
            let conn = db::connect(&settings.db_path)?;
            db::init_schema(&conn)?;
            let s = db::get_stats(&conn)?;
            println!("Rows:      {}", s.rows);
            println!("Products:  {}", s.products);
            println!("Accounts:  {}", s.accounts);
            println!("Pages:     {} ({} with listings)", s.pages, s.pages_with_listings);
            Ok(())
        }
    };

    let elapsed = t0.elapsed();
    if elapsed.as_secs() >= 1 {
        if json_output {
            eprintln!("\nDone in {}", format_duration(elapsed));
        } else {
            println!("\nDone in {}", format_duration(elapsed));
        }
    }

    result
}

fn apply_fetch_args(settings: &mut Settings, args: &FetchArgs) -> anyhow::Result<()> {
    if let Some(pages) = args.pages {
        settings.catalog.pages = pages;
    }
    if let Some(headless) = args.headless {
        settings.catalog.headless = headless;
    }
    settings.validate()?;
    Ok(())
}

fn fetch_and_save(settings: &Settings) -> anyhow::Result<()> {
    let t_fetch = Instant::now();
    println!("Fetching {} catalog pages...", settings.catalog.pages);

    let fetched = {
        let mut session = ChromeSession::launch(settings.catalog.headless)?;
        fetcher::get_pages(&mut session, &settings.catalog, &settings.timing)
    };

    match fetched {
        Ok(pages) => {
            store::save_pages(&settings.data_dir, &pages)?;
            println!(
                "Saved {} pages to {} in {:.1}s",
                pages.len(),
                settings.data_dir.display(),
                t_fetch.elapsed().as_secs_f64()
            );
            Ok(())
        }
        Err(aborted) => {
            // Keep whatever was captured before the failure.
            if !aborted.pages.is_empty() {
                store::save_pages(&settings.data_dir, &aborted.pages)?;
                info!("Kept {} pages from the aborted batch", aborted.pages.len());
            }
            if aborted.source.is_transient() {
                error!("Fetch failed with a transient error; rerunning may succeed");
            }
            Err(aborted.into())
        }
    }
}

/// In JSON mode stdout carries only the rows; the summary moves to stderr.
fn run_parse(
    settings: &Settings,
    strict: bool,
    json: bool,
    stdout: &mut impl Write,
    stderr: &mut impl Write,
) -> anyhow::Result<()> {
    if !json {
        parse_and_store(settings, strict, stdout)?;
        return Ok(());
    }
    let report = parse_and_store(settings, strict, stderr)?;
    for row in report.table().into_rows() {
        writeln!(stdout, "{}", serde_json::to_string(&row)?)?;
    }
    stdout.flush()?;
    Ok(())
}

fn parse_and_store(
    settings: &Settings,
    strict: bool,
    out: &mut impl Write,
) -> anyhow::Result<parser::ParseReport> {
    let mode = if strict {
        FailureMode::FailFast
    } else {
        FailureMode::Isolate
    };
    let report = parser::parse_pages(&settings.data_dir, mode)?;

    let conn = db::connect(&settings.db_path)?;
    db::init_schema(&conn)?;
    let saved = db::replace_listings(&conn, &report)?;

    writeln!(
        out,
        "Parsed {} pages: {} listings saved to {}.",
        report.pages.len(),
        saved,
        settings.db_path.display()
    )?;
    for failure in &report.failures {
        writeln!(out, "  skipped {}: {}", failure.source.file_name(), failure.error)?;
    }
    Ok(report)
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let truncated: String = s.chars().take(max).collect();
        format!("{}...", truncated)
    }
}

fn format_duration(d: std::time::Duration) -> String {
    let secs = d.as_secs();
    if secs < 60 {
        format!("{:.1}s", d.as_secs_f64())
    } else if secs < 3600 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else {
        format!("{}h {}m {}s", secs / 3600, (secs % 3600) / 60, secs % 60)
    }
}
