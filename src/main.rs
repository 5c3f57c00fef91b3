//! ghdigest - GitHub activity digest
//!
//! A CLI tool that fetches a user's GitHub activity feed back to a
//! cutoff, filters out noise, and mails a Markdown summary of created
//! repositories and pushed commits.
//!
//! Exit codes:
//!   0 - Success (digest sent, skipped as empty, or dry run)
//!   1 - Failure (config, fetch, malformed event, or delivery)

mod analysis;
mod cli;
mod config;
mod delivery;
mod error;
mod feed;
mod models;
mod report;

use analysis::{filter_events, Categories, ExclusionRule};
use anyhow::{anyhow, Context, Result};
use chrono::Utc;
use cli::{Args, OutputFormat};
use config::{Config, CONFIG_FILE};
use delivery::{DeliverySink, MailApiSink, OutboundMessage, StdoutSink};
use feed::{fetch_paginated, until_cutoff, with_page_budget, GitHubClient, ProgressFetcher};
use std::time::Instant;
use tracing::{debug, error, info, warn};
use tracing_subscriber::FmtSubscriber;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    // Parse command-line arguments
    let args = Args::parse_args();

    if let Err(e) = args.validate() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    // Handle --init-config early (no logging needed)
    if args.init_config {
        return handle_init_config();
    }

    init_logging(&args);

    info!("ghdigest v{}", env!("CARGO_PKG_VERSION"));

    match run_digest(args).await {
        Ok(()) => Ok(()),
        Err(e) => {
            error!("Digest failed: {:#}", e);
            eprintln!("\n❌ Error: {:#}", e);
            if e
                .downcast_ref::<error::DigestError>()
                .is_some_and(error::DigestError::is_fetch_failure)
            {
                eprintln!("   No digest was produced; the next scheduled run will try again.");
            }
            std::process::exit(1);
        }
    }
}

/// Handle --init-config: generate a default .ghdigest.toml.
fn handle_init_config() -> Result<()> {
    let path = std::path::Path::new(CONFIG_FILE);

    if path.exists() {
        eprintln!(
            "⚠️  {} already exists. Remove it first or edit it manually.",
            CONFIG_FILE
        );
        std::process::exit(1);
    }

    std::fs::write(path, Config::default_toml())
        .with_context(|| format!("Failed to write {}", CONFIG_FILE))?;

    println!("✅ Created {} with default settings.", CONFIG_FILE);
    println!("   Set [github].user and [delivery], then add [[filter.exclude]] rules.");
    Ok(())
}

/// Initialize logging based on verbosity settings.
fn init_logging(args: &Args) {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(args.log_level())
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .finish();

    tracing::subscriber::set_global_default(subscriber).expect("Failed to set tracing subscriber");
}

/// Run one digest: fetch, filter, aggregate, render, deliver.
async fn run_digest(args: Args) -> Result<()> {
    let start_time = Instant::now();

    let mut config = load_config(&args)?;
    config.merge_with_args(&args);
    config.validate()?;

    let user = config.user().to_string();
    let cutoff = args
        .cutoff(config.filter.days, Utc::now())
        .map_err(|e| anyhow!(e))?;
    let rules = ExclusionRule::compile_all(&config.filter.exclude)?;

    debug!(
        "User: {}, cutoff: {}, {} exclusion rule(s), page budget: {}",
        user,
        cutoff,
        rules.len(),
        config.github.max_pages
    );

    // Step 1: Fetch the feed back to the cutoff
    println!("📥 Fetching activity for {} since {}", user, cutoff.format("%Y-%m-%d %H:%M UTC"));

    if args.token.is_none() {
        warn!("No GITHUB_TOKEN set; only public events are visible and rate limits are low");
    }

    let client = GitHubClient::new(
        &config.github.api_url,
        args.token.clone(),
        config.github.timeout_seconds,
    )?;
    let fetcher = ProgressFetcher::new(client, !args.quiet);
    let request = GitHubClient::user_events(&user, config.github.per_page);

    let feed = fetch_paginated(
        &fetcher,
        &request,
        with_page_budget(config.github.max_pages, until_cutoff(cutoff)),
    )
    .await;
    fetcher.finish();
    let feed = feed.context("Failed to fetch activity feed")?;
    if feed.is_empty() {
        info!("The activity feed for {} is empty", user);
    }

    // Step 2: Filter and aggregate
    let events = filter_events(feed.items, cutoff, &rules).context("Failed to filter events")?;
    let categories = Categories::from_events(&events).context("Failed to aggregate events")?;

    // Step 3: Render
    let lines = report::render_markdown(&categories, config.report.title.as_deref());

    if let Some(ref path) = args.output {
        let content = match args.format {
            OutputFormat::Json => report::render_json(&categories)?,
            OutputFormat::Markdown => lines.join("\n"),
        };
        report::write_document(&content, path)?;
        info!("Digest written to {}", path.display());
    }

    print_summary(&categories, fetcher.pages(), start_time.elapsed().as_secs_f64());

    if categories.is_empty() && !args.send_empty {
        println!("\n✅ Nothing to report since the cutoff; no message sent.");
        return Ok(());
    }

    // Step 4: Deliver
    let subject = report::subject_line(
        &config.delivery.subject_prefix,
        &user,
        Utc::now().date_naive(),
    );

    let sink: Box<dyn DeliverySink> = if args.dry_run {
        Box::new(StdoutSink)
    } else {
        // Echo first so the digest survives a failed send.
        println!("\n{}", lines.join("\n"));

        config.validate_delivery()?;
        let api_key = args
            .mail_api_key
            .clone()
            .ok_or_else(|| anyhow!("No mail API key set (use GHDIGEST_MAIL_API_KEY)"))?;
        Box::new(MailApiSink::new(
            config.delivery.endpoint.as_deref().unwrap_or_default(),
            api_key,
            config.github.timeout_seconds,
        )?)
    };

    let message = OutboundMessage::new(
        config.delivery.from.as_deref().unwrap_or_default(),
        &config.delivery.to,
        subject,
        &lines,
    );

    println!("\n📬 Delivering via {}...", sink.name());
    sink.deliver(&message)
        .await
        .context("Failed to deliver digest")?;

    if args.dry_run {
        println!("\n✅ Dry run complete. No message was sent.");
    } else {
        println!("\n✅ Digest sent to {}", config.delivery.to.join(", "));
    }

    Ok(())
}

/// Print what the digest contains.
fn print_summary(categories: &Categories, pages: usize, duration: f64) {
    let commits: u64 = categories.commits_pushed.values().sum();

    println!("\n📊 Digest Summary:");
    println!("   Pages fetched: {}", pages);
    println!("   Repos created: {}", categories.repos_created.len());
    println!(
        "   Commits pushed: {} across {} repo(s)",
        commits,
        categories.commits_pushed.len()
    );
    println!("   Duration: {:.1}s", duration);
}

/// Load configuration from file or use defaults.
fn load_config(args: &Args) -> Result<Config> {
    // Try explicit config path
    if let Some(ref config_path) = args.config {
        info!("Loading config from: {}", config_path.display());
        return Config::load(config_path);
    }

    match Config::load_default() {
        Ok(Some(config)) => {
            info!("Loaded default config from {}", CONFIG_FILE);
            Ok(config)
        }
        Ok(None) => {
            debug!("No config file found, using defaults");
            Ok(Config::default())
        }
        Err(e) => Err(e),
    }
}
