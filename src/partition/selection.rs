use std::str::FromStr;

use anyhow::bail;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::health::PartitionHealthIndex;
use super::span::{self, Span};

/// What happens to the selection when a new most-recent partition appears.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ReseedPolicy {
    /// Always replace the selection with the new most-recent key, discarding
    /// any manual choice.
    #[default]
    Always,
    /// Keep a selection the operator chose explicitly.
    UnlessExplicit,
}

impl FromStr for ReseedPolicy {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "always" => Ok(ReseedPolicy::Always),
            "unless-explicit" => Ok(ReseedPolicy::UnlessExplicit),
            other => bail!(
                "Unknown reseed policy '{}', expected 'always' or 'unless-explicit'",
                other
            ),
        }
    }
}

/// Selected partition keys plus the health data they are derived from.
///
/// `selected` is always an ordered, duplicate-free subsequence of the primary
/// asset's key sequence.
#[derive(Debug, Clone, Default)]
pub struct SelectionState {
    health: PartitionHealthIndex,
    upstream: PartitionHealthIndex,
    selected: Vec<String>,
    most_recent: Option<String>,
    explicit: bool,
    policy: ReseedPolicy,
}

impl SelectionState {
    pub fn new(policy: ReseedPolicy) -> Self {
        Self {
            policy,
            ..Self::default()
        }
    }

    pub fn selected(&self) -> &[String] {
        &self.selected
    }

    pub fn primary_keys(&self) -> &[String] {
        self.health.primary_keys()
    }

    pub fn most_recent_key(&self) -> Option<&str> {
        self.most_recent.as_deref()
    }

    pub fn health(&self) -> &PartitionHealthIndex {
        &self.health
    }

    pub fn upstream(&self) -> &PartitionHealthIndex {
        &self.upstream
    }

    /// Feed refreshed health data. Returns true when the selection was
    /// reseeded because the most-recent key changed.
    pub fn observe_health(
        &mut self,
        health: PartitionHealthIndex,
        upstream: PartitionHealthIndex,
    ) -> bool {
        self.health = health;
        self.upstream = upstream;

        let primary = self.health.primary_keys();
        self.selected.retain(|k| primary.contains(k));

        let latest = self.health.most_recent_key().map(str::to_string);
        if latest == self.most_recent {
            return false;
        }
        debug!(
            previous = ?self.most_recent,
            latest = ?latest,
            "Most recent partition changed"
        );
        self.most_recent = latest;

        if self.policy == ReseedPolicy::UnlessExplicit && self.explicit {
            return false;
        }
        self.selected = self.most_recent.iter().cloned().collect();
        true
    }

    /// Select only the most recent partition of the primary asset.
    pub fn set_most_recent(&mut self) {
        self.selected = self.most_recent.iter().cloned().collect();
        self.explicit = false;
    }

    /// Select every partition of the primary asset, in order.
    pub fn set_all(&mut self) {
        self.selected = self.primary_keys().to_vec();
        self.explicit = true;
    }

    /// Select the partitions that no launched asset has materialized.
    pub fn set_missing(&mut self) {
        self.selected = self
            .primary_keys()
            .iter()
            .filter(|k| self.health.missing_everywhere(k))
            .cloned()
            .collect();
        self.explicit = true;
    }

    /// Replace the selection with an operator-chosen subsequence of the
    /// primary keys.
    ///
    /// # Panics
    ///
    /// Panics if `keys` is not a subsequence of the primary key sequence.
    pub fn set_selection(&mut self, keys: Vec<String>) {
        assert!(
            is_subsequence(&keys, self.primary_keys()),
            "selection must be an ordered subsequence of the primary partition keys"
        );
        self.selected = keys;
        self.explicit = true;
    }

    /// True when some upstream asset defines `key` but has not materialized it.
    pub fn upstream_unavailable(&self, key: &str) -> bool {
        !self.upstream.is_empty() && self.upstream.any_defines_unmaterialized(key)
    }

    /// Runs of selected keys blocked by missing upstream data.
    pub fn upstream_unavailable_spans(&self) -> Vec<Span> {
        span::assemble(&self.selected, |k| self.upstream_unavailable(k))
            .into_iter()
            .filter(|s| s.status)
            .collect()
    }

    /// Drop every selected key whose upstream data is missing.
    pub fn remove_upstream_unavailable(&mut self) {
        let kept: Vec<String> = self
            .selected
            .iter()
            .filter(|k| !self.upstream_unavailable(k))
            .cloned()
            .collect();
        self.selected = kept;
    }
}

fn is_subsequence(candidate: &[String], sequence: &[String]) -> bool {
    let mut remaining = sequence.iter();
    candidate
        .iter()
        .all(|key| remaining.by_ref().any(|k| k == key))
}
