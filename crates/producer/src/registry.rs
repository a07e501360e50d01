use std::collections::HashSet;
use std::sync::{PoisonError, RwLock};

use broker::TopicName;

/// Topics confirmed to exist during this process run.
///
/// Shared by every [`TopicProvisioner`](crate::TopicProvisioner) through an
/// `Arc`. The set only grows. It is not persisted, so a fresh process starts
/// empty and must ask the broker again; it only saves repeated remote checks
/// within one run and is never a substitute for them.
#[derive(Debug, Default)]
pub struct TopicRegistry {
    topics: RwLock<HashSet<TopicName>>,
}

impl TopicRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true if the topic has been confirmed in this process.
    pub fn contains(&self, name: &str) -> bool {
        self.topics
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(name)
    }

    /// Records a topic as existing. Returns false if it was already known.
    pub fn add(&self, name: TopicName) -> bool {
        self.topics
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(name)
    }

    pub fn len(&self) -> usize {
        self.topics
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the known topic names in sorted order.
    pub fn names(&self) -> Vec<TopicName> {
        let mut names: Vec<_> = self
            .topics
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .cloned()
            .collect();
        names.sort();
        names
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_empty() {
        let registry = TopicRegistry::new();
        assert!(registry.is_empty());
        assert!(!registry.contains("stations"));
    }

    #[test]
    fn add_is_reported_once() {
        let registry = TopicRegistry::new();
        assert!(registry.add(TopicName::new("stations")));
        assert!(!registry.add(TopicName::new("stations")));
        assert!(registry.contains("stations"));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn names_are_sorted() {
        let registry = TopicRegistry::new();
        registry.add(TopicName::new("weather"));
        registry.add(TopicName::new("arrivals"));
        assert_eq!(
            registry.names(),
            vec![TopicName::new("arrivals"), TopicName::new("weather")]
        );
    }
}
