//! Cutoff and exclusion filtering.
//!
//! Exclusion rules are data, not code: each one is a descriptor read from
//! the config file and compiled once, then matched against every event.

use crate::config::ExcludeRuleConfig;
use crate::error::{DigestError, Result};
use crate::models::Event;
use chrono::{DateTime, Utc};
use regex::Regex;
use serde_json::Value;
use tracing::{debug, info};

/// A compiled exclusion rule.
///
/// An event matches when every criterion the rule sets matches.
#[derive(Debug, Clone)]
pub struct ExclusionRule {
    pub id: String,
    event_type: Option<String>,
    repo_pattern: Option<Regex>,
    field: Option<(String, Value)>,
}

impl TryFrom<&ExcludeRuleConfig> for ExclusionRule {
    type Error = DigestError;

    fn try_from(config: &ExcludeRuleConfig) -> Result<Self> {
        let invalid = |reason: String| {
            DigestError::Config(format!("exclude rule '{}': {}", config.id, reason))
        };

        if config.id.trim().is_empty() {
            return Err(DigestError::Config(
                "exclude rule is missing an id".to_string(),
            ));
        }

        let repo_pattern = config
            .repo_pattern
            .as_deref()
            .map(Regex::new)
            .transpose()
            .map_err(|e| invalid(format!("invalid repo_pattern: {}", e)))?;

        let field = match (&config.field, &config.equals) {
            (Some(path), Some(value)) => Some((path.clone(), value.clone())),
            (None, None) => None,
            _ => return Err(invalid("`field` and `equals` must be set together".to_string())),
        };

        if config.event_type.is_none() && repo_pattern.is_none() && field.is_none() {
            return Err(invalid("no criteria set".to_string()));
        }

        Ok(Self {
            id: config.id.clone(),
            event_type: config.event_type.clone(),
            repo_pattern,
            field,
        })
    }
}

impl ExclusionRule {
    /// Compile every configured rule, keeping their order.
    pub fn compile_all(configs: &[ExcludeRuleConfig]) -> Result<Vec<Self>> {
        configs.iter().map(Self::try_from).collect()
    }

    /// Whether `event` satisfies all of this rule's criteria.
    pub fn matches(&self, event: &Event) -> Result<bool> {
        if let Some(ref kind) = self.event_type {
            if event.kind()? != kind.as_str() {
                return Ok(false);
            }
        }

        if let Some(ref pattern) = self.repo_pattern {
            if !pattern.is_match(event.repo_name()?) {
                return Ok(false);
            }
        }

        if let Some((ref path, ref expected)) = self.field {
            if event.payload_field(path) != Some(expected) {
                return Ok(false);
            }
        }

        Ok(true)
    }
}

/// Drop events older than `cutoff`, then every event matched by any rule.
///
/// Order of the survivors is unchanged. Events exactly at the cutoff are
/// kept.
pub fn filter_events(
    events: Vec<Event>,
    cutoff: DateTime<Utc>,
    rules: &[ExclusionRule],
) -> Result<Vec<Event>> {
    let total = events.len();

    let recent = events.into_iter().try_fold(Vec::new(), |mut kept, event| {
        if event.created_at()? >= cutoff {
            kept.push(event);
        }
        Ok::<_, DigestError>(kept)
    })?;
    let after_cutoff = recent.len();

    let kept = recent.into_iter().try_fold(Vec::new(), |mut kept, event| {
        match matching_rule(rules, &event)? {
            Some(rule) => debug!("Excluding event {:?} (rule '{}')", event.id, rule.id),
            None => kept.push(event),
        }
        Ok::<_, DigestError>(kept)
    })?;

    info!(
        "Kept {} of {} event(s): {} before cutoff, {} excluded by rules",
        kept.len(),
        total,
        total - after_cutoff,
        after_cutoff - kept.len()
    );

    Ok(kept)
}

/// Evaluates every rule so a malformed event fails regardless of rule order.
fn matching_rule<'a>(
    rules: &'a [ExclusionRule],
    event: &Event,
) -> Result<Option<&'a ExclusionRule>> {
    rules.iter().try_fold(None, |hit, rule| {
        let hit = if rule.matches(event)? { hit.or(Some(rule)) } else { hit };
        Ok::<_, DigestError>(hit)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::test_event;
    use serde_json::json;

    fn cutoff() -> DateTime<Utc> {
        "2024-03-01T00:00:00Z".parse().unwrap()
    }

    fn rule(id: &str, event_type: Option<&str>, repo_pattern: Option<&str>) -> ExclusionRule {
        ExclusionRule::try_from(&ExcludeRuleConfig {
            id: id.to_string(),
            event_type: event_type.map(String::from),
            repo_pattern: repo_pattern.map(String::from),
            field: None,
            equals: None,
        })
        .unwrap()
    }

    fn sample_events() -> Vec<Event> {
        vec![
            test_event("PushEvent", "me/dotfiles", "2024-03-02T09:00:00Z", json!({"size": 1})),
            test_event("WatchEvent", "rust-lang/rust", "2024-03-02T08:00:00Z", json!({})),
            test_event("PushEvent", "me/app", "2024-03-01T00:00:00Z", json!({"size": 2})),
            test_event("PushEvent", "me/app", "2024-02-29T23:00:00Z", json!({"size": 4})),
        ]
    }

    fn repos(events: &[Event]) -> Vec<&str> {
        events.iter().map(|e| e.repo_name().unwrap()).collect()
    }

    #[test]
    fn test_cutoff_drops_strictly_older_events() {
        let kept = filter_events(sample_events(), cutoff(), &[]).unwrap();
        assert_eq!(repos(&kept), vec!["me/dotfiles", "rust-lang/rust", "me/app"]);
    }

    #[test]
    fn test_cutoff_filter_is_idempotent() {
        let once = filter_events(sample_events(), cutoff(), &[]).unwrap();
        let twice = filter_events(once.clone(), cutoff(), &[]).unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn test_exclusion_rules_drop_union_of_matches() {
        let rules = vec![
            rule("no-stars", Some("WatchEvent"), None),
            rule("no-dotfiles", Some("PushEvent"), Some(r"/dotfiles$")),
        ];

        let kept = filter_events(sample_events(), cutoff(), &rules).unwrap();
        assert_eq!(repos(&kept), vec!["me/app"]);

        let reversed: Vec<_> = rules.into_iter().rev().collect();
        let kept_reversed = filter_events(sample_events(), cutoff(), &reversed).unwrap();
        assert_eq!(kept, kept_reversed);
    }

    #[test]
    fn test_malformed_event_fails_under_any_rule_order() {
        let mut star = test_event("WatchEvent", "me/dotfiles", "2024-03-02T08:00:00Z", json!({}));
        star.repo = None;

        let rules = vec![
            rule("no-stars", Some("WatchEvent"), None),
            rule("no-dotfiles", None, Some(r"/dotfiles$")),
        ];
        let forward = filter_events(vec![star.clone()], cutoff(), &rules);
        assert!(matches!(forward, Err(DigestError::MalformedEvent { .. })));

        let reversed: Vec<_> = rules.into_iter().rev().collect();
        let backward = filter_events(vec![star], cutoff(), &reversed);
        assert!(matches!(backward, Err(DigestError::MalformedEvent { .. })));
    }

    #[test]
    fn test_non_matching_rule_changes_nothing() {
        let base = filter_events(sample_events(), cutoff(), &[]).unwrap();
        let with_rule = filter_events(
            sample_events(),
            cutoff(),
            &[rule("forks", Some("ForkEvent"), None)],
        )
        .unwrap();
        assert_eq!(base, with_rule);
    }

    #[test]
    fn test_field_rule() {
        let config = ExcludeRuleConfig {
            id: "tags".to_string(),
            event_type: Some("CreateEvent".to_string()),
            repo_pattern: None,
            field: Some("ref_type".to_string()),
            equals: Some(json!("tag")),
        };
        let rule = ExclusionRule::try_from(&config).unwrap();

        let tag = test_event(
            "CreateEvent",
            "a/b",
            "2024-03-02T00:00:00Z",
            json!({"ref_type": "tag"}),
        );
        let repo = test_event(
            "CreateEvent",
            "a/b",
            "2024-03-02T00:00:00Z",
            json!({"ref_type": "repository"}),
        );

        assert!(rule.matches(&tag).unwrap());
        assert!(!rule.matches(&repo).unwrap());
    }

    #[test]
    fn test_malformed_event_fails_filter() {
        let mut events = sample_events();
        events[1].created_at = None;

        let result = filter_events(events, cutoff(), &[]);
        assert!(matches!(result, Err(DigestError::MalformedEvent { .. })));
    }

    #[test]
    fn test_invalid_rule_configs() {
        let empty = ExcludeRuleConfig {
            id: "nothing".to_string(),
            event_type: None,
            repo_pattern: None,
            field: None,
            equals: None,
        };
        assert!(ExclusionRule::try_from(&empty).is_err());

        let bad_regex = ExcludeRuleConfig {
            repo_pattern: Some("(".to_string()),
            ..empty.clone()
        };
        assert!(ExclusionRule::try_from(&bad_regex).is_err());

        let half_field = ExcludeRuleConfig {
            field: Some("ref_type".to_string()),
            ..empty.clone()
        };
        assert!(ExclusionRule::try_from(&half_field).is_err());

        let no_id = ExcludeRuleConfig {
            id: " ".to_string(),
            event_type: Some("PushEvent".to_string()),
            ..empty
        };
        assert!(ExclusionRule::try_from(&no_id).is_err());
    }
}
