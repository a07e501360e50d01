use serde::{Deserialize, Serialize};

/// Name of a broker topic.
///
/// Wraps a string to keep topic names from being mixed up with other
/// string identifiers such as table or station names.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TopicName(String);

impl TopicName {
    /// Creates a topic name from any string-like value.
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Returns the name as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns true if the name is empty or whitespace only.
    pub fn is_blank(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl std::fmt::Display for TopicName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for TopicName {
    fn from(name: &str) -> Self {
        Self(name.to_string())
    }
}

impl From<String> for TopicName {
    fn from(name: String) -> Self {
        Self(name)
    }
}

impl AsRef<str> for TopicName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::borrow::Borrow<str> for TopicName {
    fn borrow(&self) -> &str {
        &self.0
    }
}

/// Milliseconds since the Unix epoch, used as the key of every produced event.
pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn topic_name_display_matches_input() {
        let name = TopicName::new("org.chicago.cta.weather.v1");
        assert_eq!(name.to_string(), "org.chicago.cta.weather.v1");
        assert_eq!(name.as_str(), "org.chicago.cta.weather.v1");
    }

    #[test]
    fn blank_names_are_detected() {
        assert!(TopicName::new("").is_blank());
        assert!(TopicName::new("   ").is_blank());
        assert!(!TopicName::new("stations").is_blank());
    }

    #[test]
    fn topic_name_serializes_as_plain_string() {
        let name = TopicName::new("stations");
        let json = serde_json::to_string(&name).unwrap();
        assert_eq!(json, "\"stations\"");
    }

    #[test]
    fn now_millis_is_after_2020() {
        assert!(now_millis() > 1_577_836_800_000);
    }
}
