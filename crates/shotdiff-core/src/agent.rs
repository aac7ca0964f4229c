//! Agent compatibility matching.
//!
//! A historical job is only a valid baseline if it ran on an agent with the
//! same declared metadata (queue, OS, GPU, ...) as the current one.

use std::collections::BTreeMap;
use std::ffi::OsString;
use tracing::warn;

/// Environment prefix under which the CI agent exports its metadata tags.
pub const DEFAULT_META_DATA_PREFIX: &str = "BUILDKITE_AGENT_META_DATA_";

/// Snapshot of the current agent's metadata, keyed by upper-cased tag name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AgentMetadata {
    values: BTreeMap<String, String>,
}

impl AgentMetadata {
    pub fn new() -> Self {
        Self::default()
    }

    /// Capture every `<prefix><KEY>` variable from the process environment.
    pub fn from_env(prefix: &str) -> Self {
        Self::from_os_vars(prefix, std::env::vars_os())
    }

    /// Like [`from_vars`](Self::from_vars) for raw OS strings.
    ///
    /// Names that are not UTF-8 cannot carry the prefix and are ignored.
    /// A prefixed tag whose value is not UTF-8 is skipped with a warning.
    pub fn from_os_vars<I>(prefix: &str, vars: I) -> Self
    where
        I: IntoIterator<Item = (OsString, OsString)>,
    {
        let vars = vars.into_iter().filter_map(|(name, value)| {
            let name = name.into_string().ok()?;
            if !name.starts_with(prefix) {
                return None;
            }
            match value.into_string() {
                Ok(value) => Some((name, value)),
                Err(_) => {
                    warn!(name = %name, "Skipping agent meta-data with non UTF-8 value");
                    None
                }
            }
        });
        Self::from_vars(prefix, vars)
    }

    /// Capture every `<prefix><KEY>` pair from an arbitrary variable list.
    pub fn from_vars<I, K, V>(prefix: &str, vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        let values = vars
            .into_iter()
            .filter_map(|(name, value)| {
                name.as_ref()
                    .strip_prefix(prefix)
                    .filter(|key| !key.is_empty())
                    .map(|key| (key.to_string(), value.into()))
            })
            .collect();
        AgentMetadata { values }
    }

    /// Add a tag (builder style).
    pub fn with(mut self, key: &str, value: &str) -> Self {
        self.values.insert(key.to_uppercase(), value.to_string());
        self
    }

    /// Look up a tag; the key is case-insensitive.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(&key.to_uppercase()).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Whether every `key=value` rule is satisfied by the agent's metadata.
///
/// Rules split on the first `=`. A rule without `=` or naming a tag the agent
/// does not have never matches. An empty rule list matches any agent.
pub fn matches_agent<S: AsRef<str>>(rules: &[S], metadata: &AgentMetadata) -> bool {
    rules.iter().all(|rule| match rule.as_ref().split_once('=') {
        Some((key, value)) => metadata.get(key) == Some(value),
        None => false,
    })
}
