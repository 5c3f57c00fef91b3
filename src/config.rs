//! Configuration file handling.
//!
//! This module handles loading `.ghdigest.toml` and merging it with
//! command-line arguments. Credentials are never read from the file.

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Default config file name, looked up in the current directory.
pub const CONFIG_FILE: &str = ".ghdigest.toml";

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Events API settings.
    #[serde(default)]
    pub github: GitHubConfig,

    /// Cutoff and exclusion rules.
    #[serde(default)]
    pub filter: FilterConfig,

    /// Outbound message settings.
    #[serde(default)]
    pub delivery: DeliveryConfig,

    /// Document settings.
    #[serde(default)]
    pub report: ReportConfig,
}

/// Events API settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GitHubConfig {
    /// Account whose feed is digested.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,

    /// API base URL.
    #[serde(default = "default_api_url")]
    pub api_url: String,

    /// Events per page (GitHub caps this at 100).
    #[serde(default = "default_per_page")]
    pub per_page: u32,

    /// Upper bound on pages fetched in one run.
    #[serde(default = "default_max_pages")]
    pub max_pages: usize,

    /// Request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,
}

impl Default for GitHubConfig {
    fn default() -> Self {
        Self {
            user: None,
            api_url: default_api_url(),
            per_page: default_per_page(),
            max_pages: default_max_pages(),
            timeout_seconds: default_timeout(),
        }
    }
}

fn default_api_url() -> String {
    "https://api.github.com".to_string()
}

fn default_per_page() -> u32 {
    100
}

fn default_max_pages() -> usize {
    10 // the events API serves at most 300 events
}

fn default_timeout() -> u64 {
    30
}

/// Cutoff and exclusion settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FilterConfig {
    /// Look-back window in days when no explicit cutoff is given.
    #[serde(default = "default_days")]
    pub days: u32,

    /// Exclusion rules, applied independently.
    #[serde(default)]
    pub exclude: Vec<ExcludeRuleConfig>,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            days: default_days(),
            exclude: Vec::new(),
        }
    }
}

fn default_days() -> u32 {
    1
}

/// One `[[filter.exclude]]` entry.
///
/// ```toml
/// [[filter.exclude]]
/// id = "dotfiles"
/// event_type = "PushEvent"
/// repo_pattern = "/dotfiles$"
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExcludeRuleConfig {
    /// Name used in logs.
    pub id: String,

    /// Exact event type to match.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event_type: Option<String>,

    /// Regex matched against the repository full name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repo_pattern: Option<String>,

    /// Dot-separated payload path, compared with `equals`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,

    /// Value the payload field must equal.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub equals: Option<serde_json::Value>,
}

/// Outbound message settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeliveryConfig {
    /// Recipient addresses.
    #[serde(default)]
    pub to: Vec<String>,

    /// Sender address.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<String>,

    /// Mail API URL messages are posted to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,

    /// Leading words of the subject line.
    #[serde(default = "default_subject_prefix")]
    pub subject_prefix: String,
}

impl Default for DeliveryConfig {
    fn default() -> Self {
        Self {
            to: Vec::new(),
            from: None,
            endpoint: None,
            subject_prefix: default_subject_prefix(),
        }
    }
}

fn default_subject_prefix() -> String {
    "GitHub activity".to_string()
}

/// Document settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReportConfig {
    /// Optional top-level heading.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

impl Config {
    /// Load configuration from a file path.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Try to load configuration from the default location.
    ///
    /// Returns `Ok(None)` if the file doesn't exist, `Err` if it exists but can't be parsed.
    pub fn load_default() -> Result<Option<Self>> {
        let default_path = Path::new(CONFIG_FILE);

        if default_path.exists() {
            Ok(Some(Self::load(default_path)?))
        } else {
            Ok(None)
        }
    }

    /// Merge this configuration with CLI arguments.
    ///
    /// CLI arguments (and their environment fallbacks) take precedence,
    /// but only when they were actually provided.
    pub fn merge_with_args(&mut self, args: &crate::cli::Args) {
        if let Some(ref user) = args.user {
            self.github.user = Some(user.clone());
        }
        if let Some(ref api_url) = args.api_url {
            self.github.api_url = api_url.clone();
        }
        if let Some(per_page) = args.per_page {
            self.github.per_page = per_page;
        }
        if let Some(max_pages) = args.max_pages {
            self.github.max_pages = max_pages;
        }

        if let Some(days) = args.days {
            self.filter.days = days;
        }

        if let Some(ref to) = args.to {
            self.delivery.to = to.clone();
        }
        if let Some(ref from) = args.from {
            self.delivery.from = Some(from.clone());
        }
        if let Some(ref endpoint) = args.mail_endpoint {
            self.delivery.endpoint = Some(endpoint.clone());
        }
    }

    /// Check the settings every run needs.
    pub fn validate(&self) -> Result<()> {
        match self.github.user.as_deref() {
            None | Some("") => bail!("No GitHub user set (use --user or [github].user)"),
            _ => {}
        }

        if !(1..=100).contains(&self.github.per_page) {
            bail!("per_page must be between 1 and 100");
        }

        if self.github.max_pages == 0 {
            bail!("max_pages must be at least 1");
        }

        if self.github.timeout_seconds == 0 {
            bail!("timeout_seconds must be at least 1");
        }

        Ok(())
    }

    /// Check the settings needed to actually send mail.
    pub fn validate_delivery(&self) -> Result<()> {
        if self.delivery.to.is_empty() {
            bail!("No recipients set (use --to or [delivery].to)");
        }
        if self.delivery.from.is_none() {
            bail!("No sender set (use --from or [delivery].from)");
        }
        if self.delivery.endpoint.is_none() {
            bail!("No mail endpoint set (use --mail-endpoint or [delivery].endpoint)");
        }
        Ok(())
    }

    /// Account whose feed is digested. Empty until validated.
    pub fn user(&self) -> &str {
        self.github.user.as_deref().unwrap_or("")
    }

    /// Generate a default configuration file content.
    pub fn default_toml() -> String {
        let config = Config::default();
        toml::to_string_pretty(&config).unwrap_or_else(|_| String::new())
    }
}
