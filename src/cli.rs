//! Command-line interface argument parsing.
//!
//! This module handles all CLI argument parsing using clap,
//! including validation and cutoff resolution.

use chrono::{DateTime, Duration, NaiveDate, Utc};
use clap::Parser;
use std::path::PathBuf;

/// ghdigest - daily GitHub activity digest
///
/// Fetches a user's activity feed back to a cutoff, drops noise, and
/// mails a short Markdown summary of created repositories and pushed
/// commits.
///
/// Examples:
///   ghdigest --user octocat --to me@example.com
///   ghdigest --user octocat --since 2024-03-01 --dry-run
///   ghdigest --user octocat --days 7 --format json --output week.json --dry-run
///   ghdigest --init-config
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Args {
    /// GitHub account whose activity is digested
    #[arg(short, long, env = "GHDIGEST_USER")]
    pub user: Option<String>,

    /// GitHub API token
    #[arg(long, env = "GITHUB_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    /// Only include events at or after this time
    ///
    /// Accepts a date (YYYY-MM-DD, midnight UTC) or an RFC 3339 timestamp.
    /// Overrides --days.
    #[arg(short, long, value_name = "DATE")]
    pub since: Option<String>,

    /// Look-back window in days when --since is not given
    #[arg(short, long, value_name = "DAYS", env = "GHDIGEST_DAYS")]
    pub days: Option<u32>,

    /// Recipient addresses (comma-separated)
    #[arg(long, value_name = "ADDRS", value_delimiter = ',', env = "GHDIGEST_TO")]
    pub to: Option<Vec<String>>,

    /// Sender address
    #[arg(long, value_name = "ADDR", env = "GHDIGEST_FROM")]
    pub from: Option<String>,

    /// Mail API URL the digest is posted to
    #[arg(long, value_name = "URL", env = "GHDIGEST_MAIL_ENDPOINT")]
    pub mail_endpoint: Option<String>,

    /// Mail API key
    #[arg(long, env = "GHDIGEST_MAIL_API_KEY", hide_env_values = true)]
    pub mail_api_key: Option<String>,

    /// GitHub API base URL
    #[arg(long, value_name = "URL")]
    pub api_url: Option<String>,

    /// Events requested per page (1-100)
    #[arg(long, value_name = "COUNT")]
    pub per_page: Option<u32>,

    /// Maximum number of pages to fetch
    #[arg(long, value_name = "COUNT")]
    pub max_pages: Option<usize>,

    /// Path to configuration file
    ///
    /// If not specified, looks for .ghdigest.toml in the current directory
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Also write the rendered digest to this file
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Output format for --output (markdown, json)
    #[arg(long, default_value = "markdown", value_name = "FORMAT")]
    pub format: OutputFormat,

    /// Render and print the digest without sending it
    #[arg(long)]
    pub dry_run: bool,

    /// Send the digest even when there is nothing to report
    #[arg(long)]
    pub send_empty: bool,

    /// Enable verbose logging output
    #[arg(short, long)]
    pub verbose: bool,

    /// Run in quiet mode (minimal output)
    #[arg(short, long)]
    pub quiet: bool,

    /// Generate a default .ghdigest.toml configuration file
    #[arg(long)]
    pub init_config: bool,
}

/// Output format for the written digest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum OutputFormat {
    /// Markdown format (default)
    #[default]
    Markdown,
    /// JSON format
    Json,
}

impl Args {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Validate the parsed arguments.
    pub fn validate(&self) -> Result<(), String> {
        if self.init_config {
            return Ok(());
        }

        if self.verbose && self.quiet {
            return Err("Cannot use both --verbose and --quiet".to_string());
        }

        if let Some(ref since) = self.since {
            parse_since(since)?;
        }

        if let Some(ref url) = self.api_url {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err("API URL must start with 'http://' or 'https://'".to_string());
            }
        }

        if let Some(per_page) = self.per_page {
            if !(1..=100).contains(&per_page) {
                return Err("Per-page must be between 1 and 100".to_string());
            }
        }

        if self.max_pages == Some(0) {
            return Err("Max pages must be at least 1".to_string());
        }

        Ok(())
    }

    /// Returns the log level based on verbosity settings.
    pub fn log_level(&self) -> tracing::Level {
        if self.quiet {
            tracing::Level::ERROR
        } else if self.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        }
    }

    /// The cutoff for this run: --since if given, else `days` before `now`.
    pub fn cutoff(&self, days: u32, now: DateTime<Utc>) -> Result<DateTime<Utc>, String> {
        match self.since {
            Some(ref since) => parse_since(since),
            None => Duration::try_days(i64::from(days))
                .and_then(|window| now.checked_sub_signed(window))
                .ok_or_else(|| format!("Look-back of {} days is out of range", days)),
        }
    }
}

/// Parse a `--since` value: RFC 3339 timestamp or plain date.
pub fn parse_since(value: &str) -> Result<DateTime<Utc>, String> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(value) {
        return Ok(ts.with_timezone(&Utc));
    }

    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|midnight| midnight.and_utc())
        .ok_or_else(|| {
            format!(
                "Invalid --since value '{}': expected YYYY-MM-DD or an RFC 3339 timestamp",
                value
            )
        })
}
