//! Wire encoding for the Loki push API.
//!
//! # Payload
//! ```text
//! {"streams": [
//!     {"stream": {"app": "crud-server"},
//!      "values": [["1700000000000000000", "Info: Received GET request for /item/1"], ...]}
//! ]}
//! ```
//!
//! One stream per label set. Streams appear in the order their label set was
//! first seen in the batch and entries keep the batch order.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use thiserror::Error;

use crate::shipper::event::{Level, LabelSet, LogEvent};

/// Default ceiling for a single encoded line.
pub const DEFAULT_MAX_LINE_BYTES: usize = 64 * 1024;

/// One encoded entry, still associated with its label set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WireEntry {
    pub labels: LabelSet,
    pub timestamp_nanos: u64,
    pub line: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PushRequest {
    pub streams: Vec<PushStream>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PushStream {
    pub stream: BTreeMap<String, String>,
    pub values: Vec<[String; 2]>,
}

impl PushRequest {
    /// Total number of entries across all streams.
    pub fn entry_count(&self) -> usize {
        self.streams.iter().map(|s| s.values.len()).sum()
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DecodeError {
    #[error("invalid timestamp '{0}'")]
    InvalidTimestamp(String),

    #[error("line has no level prefix: '{0}'")]
    MissingLevel(String),
}

/// Turns events into wire entries and push payloads.
#[derive(Debug, Clone, Copy)]
pub struct Encoder {
    max_line_bytes: usize,
}

impl Default for Encoder {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_LINE_BYTES)
    }
}

impl Encoder {
    pub fn new(max_line_bytes: usize) -> Self {
        Self { max_line_bytes }
    }

    /// Encode one message. Oversized lines are truncated, never rejected.
    pub fn encode(
        &self,
        level: Level,
        message: &str,
        labels: &LabelSet,
        timestamp_nanos: u64,
    ) -> WireEntry {
        let mut line = String::with_capacity(level.prefix().len() + message.len());
        line.push_str(level.prefix());
        line.push_str(message);
        truncate_on_char_boundary(&mut line, self.max_line_bytes);

        WireEntry {
            labels: labels.clone(),
            timestamp_nanos,
            line,
        }
    }

    pub fn encode_event(&self, event: &LogEvent) -> WireEntry {
        self.encode(event.level, &event.message, &event.labels, event.timestamp_nanos)
    }

    /// Build the push payload for a batch.
    pub fn batch(&self, events: &[LogEvent]) -> PushRequest {
        let mut streams: Vec<PushStream> = Vec::new();
        let mut index: HashMap<LabelSet, usize> = HashMap::new();

        for event in events {
            let entry = self.encode_event(event);
            let slot = *index.entry(entry.labels.clone()).or_insert_with(|| {
                streams.push(PushStream {
                    stream: entry.labels.as_map().clone(),
                    values: Vec::new(),
                });
                streams.len() - 1
            });
            streams[slot]
                .values
                .push([entry.timestamp_nanos.to_string(), entry.line]);
        }

        PushRequest { streams }
    }
}

/// Parse a push payload back into events, stream by stream.
pub fn decode(request: &PushRequest) -> Result<Vec<LogEvent>, DecodeError> {
    let mut events = Vec::with_capacity(request.entry_count());
    for stream in &request.streams {
        let labels = LabelSet::new(stream.stream.clone());
        for [timestamp, line] in &stream.values {
            let timestamp_nanos = timestamp
                .parse::<u64>()
                .map_err(|_| DecodeError::InvalidTimestamp(timestamp.clone()))?;
            let (level, message) =
                Level::strip_prefix(line).ok_or_else(|| DecodeError::MissingLevel(line.clone()))?;
            events.push(LogEvent::new(
                timestamp_nanos,
                level,
                labels.clone(),
                message.to_string(),
            ));
        }
    }
    Ok(events)
}

fn truncate_on_char_boundary(line: &mut String, max_bytes: usize) {
    if line.len() <= max_bytes {
        return;
    }
    let mut end = max_bytes;
    while !line.is_char_boundary(end) {
        end -= 1;
    }
    line.truncate(end);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn app(name: &str) -> LabelSet {
        [("app", name)].into_iter().collect()
    }

    #[test]
    fn test_encode_prefixes_level() {
        let entry = Encoder::default().encode(Level::Info, "Creating new item", &app("a"), 42);
        assert_eq!(entry.line, "Info: Creating new item");
        assert_eq!(entry.timestamp_nanos, 42);
        assert_eq!(entry.labels, app("a"));
    }

    #[test]
    fn test_oversized_line_is_truncated() {
        let encoder = Encoder::new(16);
        let entry = encoder.encode(Level::Error, &"x".repeat(100), &app("a"), 1);
        assert_eq!(entry.line.len(), 16);
        assert!(entry.line.starts_with("Error: "));
    }

    #[test]
    fn test_truncation_respects_utf8() {
        // "Info: " is 6 bytes, each 'é' is 2 bytes; 9 bytes lands mid-character.
        let encoder = Encoder::new(9);
        let entry = encoder.encode(Level::Info, "ééé", &app("a"), 1);
        assert_eq!(entry.line, "Info: é");
    }

    #[test]
    fn test_batch_groups_by_label_set_in_order() {
        let encoder = Encoder::default();
        let events = vec![
            LogEvent::new(1, Level::Info, app("a"), "first".into()),
            LogEvent::new(2, Level::Warn, app("b"), "second".into()),
            LogEvent::new(3, Level::Error, app("a"), "third".into()),
        ];

        let request = encoder.batch(&events);
        assert_eq!(request.streams.len(), 2);
        assert_eq!(request.entry_count(), 3);

        let a = &request.streams[0];
        assert_eq!(a.stream.get("app").map(String::as_str), Some("a"));
        assert_eq!(
            a.values,
            vec![
                ["1".to_string(), "Info: first".to_string()],
                ["3".to_string(), "Error: third".to_string()],
            ]
        );
        assert_eq!(request.streams[1].values[0][1], "Warn: second");
    }

    #[test]
    fn test_payload_shape() {
        let request = Encoder::default().batch(&[LogEvent::new(
            7,
            Level::Info,
            app("crud-server"),
            "hello".into(),
        )]);
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "streams": [{
                    "stream": {"app": "crud-server"},
                    "values": [["7", "Info: hello"]]
                }]
            })
        );
    }

    #[test]
    fn test_decode_restores_events() {
        let events = vec![
            LogEvent::new(10, Level::Debug, app("a"), "one".into()),
            LogEvent::new(11, Level::Info, app("a"), "two".into()),
            LogEvent::new(12, Level::Error, app("a"), "three".into()),
        ];
        let wire = serde_json::to_string(&Encoder::default().batch(&events)).unwrap();
        let parsed: PushRequest = serde_json::from_str(&wire).unwrap();

        assert_eq!(decode(&parsed).unwrap(), events);
    }

    #[test]
    fn test_decode_rejects_bad_entries() {
        let mut request = Encoder::default().batch(&[LogEvent::new(
            1,
            Level::Info,
            app("a"),
            "ok".into(),
        )]);
        request.streams[0].values[0][0] = "soon".into();
        assert_eq!(
            decode(&request),
            Err(DecodeError::InvalidTimestamp("soon".into()))
        );

        request.streams[0].values[0] = ["1".into(), "plain".into()];
        assert_eq!(decode(&request), Err(DecodeError::MissingLevel("plain".into())));
    }
}
