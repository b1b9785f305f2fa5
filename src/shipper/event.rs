//! Log event model shared by the encoder, buffer and flush loop.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

/// Severity of a shipped log line.
///
/// `Disabled` sorts above every real level and is only useful as a
/// threshold: a `send_level` of `Disabled` ships nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Debug,
    Info,
    Warn,
    Error,
    Disabled,
}

impl Level {
    /// Prefix written in front of every wire line.
    pub fn prefix(self) -> &'static str {
        match self {
            Level::Debug => "Debug: ",
            Level::Info => "Info: ",
            Level::Warn => "Warn: ",
            Level::Error => "Error: ",
            Level::Disabled => "",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Level::Debug => "debug",
            Level::Info => "info",
            Level::Warn => "warn",
            Level::Error => "error",
            Level::Disabled => "disabled",
        }
    }

    /// Split a wire line into its level and message.
    pub fn strip_prefix(line: &str) -> Option<(Level, &str)> {
        [Level::Debug, Level::Info, Level::Warn, Level::Error]
            .into_iter()
            .find_map(|level| line.strip_prefix(level.prefix()).map(|rest| (level, rest)))
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Fixed labels attached to every event of a process.
///
/// Cloning is a reference count bump, so every buffered event can carry
/// its own handle.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct LabelSet(Arc<BTreeMap<String, String>>);

impl LabelSet {
    pub fn new(labels: BTreeMap<String, String>) -> Self {
        Self(Arc::new(labels))
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.get(name).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_map(&self) -> &BTreeMap<String, String> {
        &self.0
    }
}

impl<K, V> FromIterator<(K, V)> for LabelSet
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self::new(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

/// Renders the selector form used by Loki, e.g. `{app="crud-server"}`.
impl fmt::Display for LabelSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("{")?;
        for (i, (name, value)) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            write!(f, "{}={:?}", name, value)?;
        }
        f.write_str("}")
    }
}

/// A single log occurrence. Never mutated after creation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEvent {
    pub timestamp_nanos: u64,
    pub level: Level,
    pub labels: LabelSet,
    pub message: String,
}

impl LogEvent {
    pub fn new(timestamp_nanos: u64, level: Level, labels: LabelSet, message: String) -> Self {
        Self {
            timestamp_nanos,
            level,
            labels,
            message,
        }
    }
}

/// Wall clock in nanoseconds since the Unix epoch.
pub fn unix_nanos() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| u64::try_from(d.as_nanos()).unwrap_or(u64::MAX))
        .unwrap_or_default()
}
