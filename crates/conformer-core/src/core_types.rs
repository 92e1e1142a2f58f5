use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Environment variables handed to an action, either as container environment
/// at launch or inside an init payload.
///
/// Keys are kept sorted so generated launch flags and payloads are stable.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EnvironmentSet(BTreeMap<String, String>);

impl EnvironmentSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// `-e KEY=VALUE` launch arguments, one argv entry per token.
    pub fn to_launch_flags(&self) -> Vec<String> {
        self.iter()
            .flat_map(|(key, value)| ["-e".to_string(), format!("{}={}", key, value)])
            .collect()
    }
}

impl<K, V> FromIterator<(K, V)> for EnvironmentSet
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}
