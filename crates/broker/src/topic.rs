//! Topic specifications and retention configuration.

use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::{BrokerError, Result, TopicName};

/// Log cleanup policy applied by the broker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum CleanupPolicy {
    /// Segments are deleted once they age out.
    #[default]
    Delete,
    /// Only the latest value per key is retained.
    Compact,
    /// Compaction plus time-based deletion.
    CompactDelete,
}

impl CleanupPolicy {
    /// Returns the broker config value for this policy.
    pub fn as_str(&self) -> &'static str {
        match self {
            CleanupPolicy::Delete => "delete",
            CleanupPolicy::Compact => "compact",
            CleanupPolicy::CompactDelete => "compact,delete",
        }
    }
}

/// Compression codec applied to stored segments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum CompressionType {
    None,
    Gzip,
    Snappy,
    #[default]
    Lz4,
    Zstd,
}

impl CompressionType {
    /// Returns the broker config value for this codec.
    pub fn as_str(&self) -> &'static str {
        match self {
            CompressionType::None => "uncompressed",
            CompressionType::Gzip => "gzip",
            CompressionType::Snappy => "snappy",
            CompressionType::Lz4 => "lz4",
            CompressionType::Zstd => "zstd",
        }
    }
}

/// Retention, compaction and compression settings attached to a new topic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopicConfig {
    pub cleanup_policy: CleanupPolicy,
    pub compression: CompressionType,
    /// How long delete tombstones are retained.
    pub delete_retention: Duration,
    /// Delay before a deleted segment file is removed from disk.
    pub file_delete_delay: Duration,
}

impl TopicConfig {
    /// Renders the settings as the string map the broker admin API expects.
    pub fn to_config_map(&self) -> BTreeMap<&'static str, String> {
        BTreeMap::from([
            ("cleanup.policy", self.cleanup_policy.as_str().to_string()),
            ("compression.type", self.compression.as_str().to_string()),
            (
                "delete.retention.ms",
                self.delete_retention.as_millis().to_string(),
            ),
            (
                "file.delete.delay.ms",
                self.file_delete_delay.as_millis().to_string(),
            ),
        ])
    }
}

impl Default for TopicConfig {
    fn default() -> Self {
        Self {
            cleanup_policy: CleanupPolicy::Delete,
            compression: CompressionType::Lz4,
            delete_retention: Duration::from_millis(2000),
            file_delete_delay: Duration::from_millis(2000),
        }
    }
}

/// Everything needed to create a topic.
///
/// A spec is validated on construction and cannot be changed afterwards,
/// so a producer always provisions exactly the topic it was built with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopicSpec {
    name: TopicName,
    partitions: u32,
    replication_factor: u32,
    config: TopicConfig,
}

impl TopicSpec {
    /// Creates a spec with the default retention configuration.
    ///
    /// Fails if the name is blank or either count is zero.
    pub fn new(
        name: impl Into<TopicName>,
        partitions: u32,
        replication_factor: u32,
    ) -> Result<Self> {
        let name = name.into();
        if name.is_blank() {
            return Err(BrokerError::InvalidTopicSpec(
                "topic name must not be empty".to_string(),
            ));
        }
        if partitions == 0 {
            return Err(BrokerError::InvalidTopicSpec(format!(
                "topic {name} must have at least one partition"
            )));
        }
        if replication_factor == 0 {
            return Err(BrokerError::InvalidTopicSpec(format!(
                "topic {name} must have a replication factor of at least one"
            )));
        }

        Ok(Self {
            name,
            partitions,
            replication_factor,
            config: TopicConfig::default(),
        })
    }

    /// Replaces the retention configuration.
    pub fn with_config(mut self, config: TopicConfig) -> Self {
        self.config = config;
        self
    }

    pub fn name(&self) -> &TopicName {
        &self.name
    }

    pub fn partitions(&self) -> u32 {
        self.partitions
    }

    pub fn replication_factor(&self) -> u32 {
        self.replication_factor
    }

    pub fn config(&self) -> &TopicConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_spec_uses_default_config() {
        let spec = TopicSpec::new("stations", 1, 1).unwrap();
        assert_eq!(spec.name().as_str(), "stations");
        assert_eq!(spec.partitions(), 1);
        assert_eq!(spec.replication_factor(), 1);
        assert_eq!(spec.config(), &TopicConfig::default());
    }

    #[test]
    fn blank_name_is_rejected() {
        let result = TopicSpec::new("  ", 1, 1);
        assert!(matches!(result, Err(BrokerError::InvalidTopicSpec(_))));
    }

    #[test]
    fn zero_partitions_is_rejected() {
        let result = TopicSpec::new("stations", 0, 1);
        assert!(matches!(result, Err(BrokerError::InvalidTopicSpec(_))));
    }

    #[test]
    fn zero_replicas_is_rejected() {
        let result = TopicSpec::new("stations", 1, 0);
        assert!(matches!(result, Err(BrokerError::InvalidTopicSpec(_))));
    }

    #[test]
    fn default_config_map() {
        let map = TopicConfig::default().to_config_map();
        assert_eq!(map["cleanup.policy"], "delete");
        assert_eq!(map["compression.type"], "lz4");
        assert_eq!(map["delete.retention.ms"], "2000");
        assert_eq!(map["file.delete.delay.ms"], "2000");
    }

    #[test]
    fn compacted_config_map() {
        let config = TopicConfig {
            cleanup_policy: CleanupPolicy::Compact,
            compression: CompressionType::Zstd,
            ..TopicConfig::default()
        };
        let map = config.to_config_map();
        assert_eq!(map["cleanup.policy"], "compact");
        assert_eq!(map["compression.type"], "zstd");
    }
}
