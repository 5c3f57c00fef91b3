//! Event aggregation into report categories.
//!
//! Each reducer looks only at the event type it cares about and ignores
//! the rest.

use crate::error::{DigestError, Result};
use crate::models::Event;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Aggregated categories for one digest run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Categories {
    /// Names of repositories created, in feed order. Duplicates are kept.
    pub repos_created: Vec<String>,
    /// Total pushed commits per repository, ordered by repository name.
    pub commits_pushed: BTreeMap<String, u64>,
}

impl Categories {
    /// Runs every reducer over the filtered events.
    pub fn from_events(events: &[Event]) -> Result<Self> {
        Ok(Self {
            repos_created: repos_created(events)?,
            commits_pushed: commits_pushed(events)?,
        })
    }

    /// Whether there is nothing to report.
    pub fn is_empty(&self) -> bool {
        self.repos_created.is_empty() && self.commits_pushed.is_empty()
    }
}

/// Names of repositories created, in feed order.
pub fn repos_created(events: &[Event]) -> Result<Vec<String>> {
    let mut names = Vec::new();

    for event in events {
        if event.is_repository_creation()? {
            names.push(event.repo_name()?.to_string());
        }
    }

    Ok(names)
}

/// Commits pushed, summed per repository.
pub fn commits_pushed(events: &[Event]) -> Result<BTreeMap<String, u64>> {
    let mut pushed: BTreeMap<String, u64> = BTreeMap::new();

    for event in events {
        if event.is_push()? {
            let total = pushed.entry(event.repo_name()?.to_string()).or_default();
            *total = total
                .checked_add(event.commit_count()?)
                .ok_or_else(|| DigestError::malformed("payload.size", event.id.as_deref()))?;
        }
    }

    Ok(pushed)
}
