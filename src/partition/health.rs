use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use super::asset_key::AssetKey;

/// Materialization state of one asset's partition space.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PartitionHealthData {
    pub asset_key: AssetKey,
    /// Partition keys in display order (chronological or definition order).
    pub keys: Vec<String>,
    pub status_by_partition: HashMap<String, bool>,
}

impl PartitionHealthData {
    /// Build health data from `(key, materialized)` pairs in display order.
    pub fn from_statuses<I>(asset_key: AssetKey, statuses: I) -> Self
    where
        I: IntoIterator<Item = (String, bool)>,
    {
        let mut data = Self {
            asset_key,
            ..Self::default()
        };
        for (key, materialized) in statuses {
            data.status_by_partition.insert(key.clone(), materialized);
            data.keys.push(key);
        }
        data
    }

    pub fn is_materialized(&self, key: &str) -> bool {
        self.status_by_partition.get(key).copied().unwrap_or(false)
    }
}

/// Read-only lookup over the health data of a set of assets.
///
/// Asset order is the order the assets were requested in; index 0 is the
/// primary asset whose key sequence drives selection.
#[derive(Debug, Clone, Default)]
pub struct PartitionHealthIndex {
    assets: Vec<PartitionHealthData>,
    defined: Vec<HashSet<String>>,
}

impl PartitionHealthIndex {
    pub fn new(assets: Vec<PartitionHealthData>) -> Self {
        let defined = assets
            .iter()
            .map(|a| a.keys.iter().cloned().collect())
            .collect();
        Self { assets, defined }
    }

    pub fn len(&self) -> usize {
        self.assets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.assets.is_empty()
    }

    pub fn assets(&self) -> &[PartitionHealthData] {
        &self.assets
    }

    /// Ordered partition keys of the asset at `asset_index`; empty when the
    /// index is out of range.
    pub fn keys(&self, asset_index: usize) -> &[String] {
        self.assets
            .get(asset_index)
            .map(|a| a.keys.as_slice())
            .unwrap_or(&[])
    }

    /// Absent keys and unknown assets count as not materialized.
    pub fn is_materialized(&self, asset_index: usize, key: &str) -> bool {
        self.assets
            .get(asset_index)
            .map(|a| a.is_materialized(key))
            .unwrap_or(false)
    }

    /// Whether the asset at `asset_index` has `key` in its partition space.
    pub fn defines(&self, asset_index: usize, key: &str) -> bool {
        self.defined
            .get(asset_index)
            .map(|keys| keys.contains(key))
            .unwrap_or(false)
    }

    pub fn primary_keys(&self) -> &[String] {
        self.keys(0)
    }

    pub fn most_recent_key(&self) -> Option<&str> {
        self.primary_keys().last().map(String::as_str)
    }

    /// True when no tracked asset reports `key` as materialized.
    pub fn missing_everywhere(&self, key: &str) -> bool {
        (0..self.assets.len()).all(|i| !self.is_materialized(i, key))
    }

    /// True when some asset defines `key` and has not materialized it.
    pub fn any_defines_unmaterialized(&self, key: &str) -> bool {
        (0..self.assets.len()).any(|i| self.defines(i, key) && !self.is_materialized(i, key))
    }
}
