//! Inbound payload decoding, classification and metric extraction.
//!
//! Payloads arrive from the transport as raw bytes and are decided once,
//! at this boundary, into a tagged variant: JSON objects become
//! [`Payload::Structured`], everything else (including unparseable JSON)
//! becomes [`Payload::Text`]. All downstream logic operates on the variant
//! instead of re-inspecting the raw bytes.

use serde_json::{Map, Value};

/// An inbound message payload, decided once at the transport boundary.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    /// Plain (or unparseable) text.
    Text(String),
    /// A JSON object.
    Structured(Map<String, Value>),
}

/// What an inbound message means for device liveness.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageKind {
    /// An explicit keep-alive signal.
    Heartbeat,
    /// A device announcing itself after powering up.
    OnlineAnnouncement,
    /// Anything else; still counts as a liveness signal.
    Data,
}

/// Field names that hold timestamps rather than telemetry values.
const TIMESTAMP_FIELDS: &[&str] = &["timestamp", "time", "ts"];

impl Payload {
    /// Decode raw transport bytes.
    ///
    /// A payload that parses as a JSON object is `Structured`; any other
    /// byte sequence, malformed JSON included, falls back to `Text`.
    /// Decoding never fails.
    pub fn decode(bytes: &[u8]) -> Self {
        let text = String::from_utf8_lossy(bytes).into_owned();
        match serde_json::from_str::<Value>(&text) {
            Ok(Value::Object(map)) => Payload::Structured(map),
            _ => Payload::Text(text),
        }
    }

    /// Classify the payload for the liveness tracker.
    pub fn classify(&self) -> MessageKind {
        match self {
            Payload::Text(text) => {
                let lower = text.to_lowercase();
                if lower.contains("hello from")
                    || lower.contains("connected")
                    || lower.contains("device online")
                {
                    MessageKind::OnlineAnnouncement
                } else if lower.contains("heartbeat")
                    || lower.contains("ping")
                    || lower.contains("alive")
                {
                    MessageKind::Heartbeat
                } else {
                    MessageKind::Data
                }
            }
            Payload::Structured(map) => {
                let is_heartbeat = map.get("type").and_then(Value::as_str) == Some("heartbeat")
                    || map.get("status").and_then(Value::as_str) == Some("alive");
                if is_heartbeat {
                    MessageKind::Heartbeat
                } else {
                    MessageKind::Data
                }
            }
        }
    }

    /// Extract numeric fields, keyed by canonical series name.
    ///
    /// Text payloads are scanned for `key=value` tokens; structured
    /// payloads yield every numeric or numeric-parseable field except
    /// designated timestamp fields. Keys are lowercased and run through
    /// the alias table before being returned. Yields nothing (never an
    /// error) when no numeric fields are present.
    pub fn metrics(&self) -> Vec<(String, f64)> {
        let raw = match self {
            Payload::Text(text) => scan_key_values(text),
            Payload::Structured(map) => map
                .iter()
                .filter(|(key, _)| !TIMESTAMP_FIELDS.contains(&key.to_lowercase().as_str()))
                .filter_map(|(key, value)| numeric_value(value).map(|v| (key.to_lowercase(), v)))
                .collect(),
        };
        raw.into_iter().map(|(key, value)| (canonical_series(&key).to_string(), value)).collect()
    }

    /// The timestamp carried inside a structured payload, if any.
    ///
    /// Accepts epoch milliseconds in `timestamp` or `time` fields.
    pub fn embedded_timestamp_ms(&self) -> Option<i64> {
        match self {
            Payload::Text(_) => None,
            Payload::Structured(map) => ["timestamp", "time"]
                .iter()
                .filter_map(|field| map.get(*field))
                .find_map(Value::as_i64),
        }
    }

    /// Render the payload for the log view.
    pub fn display(&self) -> String {
        match self {
            Payload::Text(text) => text.clone(),
            Payload::Structured(map) => {
                serde_json::to_string(&Value::Object(map.clone())).unwrap_or_default()
            }
        }
    }
}

/// Map short device field names onto canonical display series.
///
/// The table covers the abbreviations the supported devices are known to
/// send; unknown keys pass through unchanged.
pub fn canonical_series(key: &str) -> &str {
    match key {
        "temp" => "temperature",
        "hum" => "humidity",
        "rpm" | "velocity" => "speed",
        "press" => "pressure",
        other => other,
    }
}

/// Scan text for `key = value` tokens.
///
/// Keys are word characters; values are an optional sign, digits, and an
/// optional decimal part. Whitespace around `=` is allowed.
fn scan_key_values(text: &str) -> Vec<(String, f64)> {
    let bytes = text.as_bytes();
    let mut found = Vec::new();
    let mut i = 0;

    while i < bytes.len() {
        // Find the start of a word.
        if !is_word_byte(bytes[i]) {
            i += 1;
            continue;
        }
        let key_start = i;
        while i < bytes.len() && is_word_byte(bytes[i]) {
            i += 1;
        }
        let key_end = i;

        // Skip whitespace, expect '='.
        let mut j = i;
        while j < bytes.len() && (bytes[j] == b' ' || bytes[j] == b'\t') {
            j += 1;
        }
        if j >= bytes.len() || bytes[j] != b'=' {
            continue;
        }
        j += 1;
        while j < bytes.len() && (bytes[j] == b' ' || bytes[j] == b'\t') {
            j += 1;
        }

        // Parse the numeric value.
        let value_start = j;
        if j < bytes.len() && (bytes[j] == b'-' || bytes[j] == b'+') {
            j += 1;
        }
        let digits_start = j;
        while j < bytes.len() && bytes[j].is_ascii_digit() {
            j += 1;
        }
        if j < bytes.len() && bytes[j] == b'.' {
            j += 1;
            while j < bytes.len() && bytes[j].is_ascii_digit() {
                j += 1;
            }
        }
        if j == digits_start {
            continue;
        }

        if let Ok(value) = text[value_start..j].parse::<f64>() {
            let key = text[key_start..key_end].to_lowercase();
            found.push((key, value));
        }
        i = j;
    }

    found
}

fn is_word_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_'
}

/// Interpret a JSON value as a number, accepting numeric strings.
fn numeric_value(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_json_object() {
        let payload = Payload::decode(br#"{"temperature": 21.5}"#);
        assert!(matches!(payload, Payload::Structured(_)));
    }

    #[test]
    fn test_decode_malformed_json_is_text() {
        let payload = Payload::decode(b"{not json");
        assert_eq!(payload, Payload::Text("{not json".to_string()));
    }

    #[test]
    fn test_decode_non_object_json_is_text() {
        // Bare numbers and arrays carry no named fields; treat as text.
        assert_eq!(Payload::decode(b"42"), Payload::Text("42".to_string()));
        assert_eq!(Payload::decode(b"[1,2]"), Payload::Text("[1,2]".to_string()));
    }

    #[test]
    fn test_classify_text_heartbeat() {
        for text in ["heartbeat", "PING", "device alive", "keep-Alive ok"] {
            assert_eq!(Payload::Text(text.to_string()).classify(), MessageKind::Heartbeat);
        }
    }

    #[test]
    fn test_classify_text_announcement() {
        for text in ["Hello from esp32", "sensor connected", "Device Online now"] {
            assert_eq!(
                Payload::Text(text.to_string()).classify(),
                MessageKind::OnlineAnnouncement
            );
        }
    }

    #[test]
    fn test_classify_text_data() {
        assert_eq!(Payload::Text("temp=21.5".to_string()).classify(), MessageKind::Data);
    }

    #[test]
    fn test_classify_structured_heartbeat() {
        let by_type = Payload::decode(br#"{"type": "heartbeat"}"#);
        assert_eq!(by_type.classify(), MessageKind::Heartbeat);

        let by_status = Payload::decode(br#"{"status": "alive", "clientId": "x"}"#);
        assert_eq!(by_status.classify(), MessageKind::Heartbeat);

        let data = Payload::decode(br#"{"temperature": 20}"#);
        assert_eq!(data.classify(), MessageKind::Data);
    }

    #[test]
    fn test_scan_key_values() {
        let payload = Payload::Text("temp=21.5 hum = 40 speed=-3.25 junk".to_string());
        let metrics = payload.metrics();
        assert_eq!(
            metrics,
            vec![
                ("temperature".to_string(), 21.5),
                ("humidity".to_string(), 40.0),
                ("speed".to_string(), -3.25),
            ]
        );
    }

    #[test]
    fn test_scan_ignores_incomplete_tokens() {
        let payload = Payload::Text("temp= humidity 40 x=..".to_string());
        assert!(payload.metrics().is_empty());
    }

    #[test]
    fn test_structured_metrics_exclude_timestamps() {
        let payload = Payload::decode(
            br#"{"Temp": 21.5, "pressure": "1013.2", "timestamp": 1700000000000, "name": "dev1"}"#,
        );
        let mut metrics = payload.metrics();
        metrics.sort_by(|a, b| a.0.cmp(&b.0));
        assert_eq!(
            metrics,
            vec![("pressure".to_string(), 1013.2), ("temperature".to_string(), 21.5)]
        );
    }

    #[test]
    fn test_embedded_timestamp() {
        let payload = Payload::decode(br#"{"time": 5000, "speed": 1}"#);
        assert_eq!(payload.embedded_timestamp_ms(), Some(5000));
        assert_eq!(Payload::Text("speed=1".to_string()).embedded_timestamp_ms(), None);
    }

    #[test]
    fn test_alias_table() {
        assert_eq!(canonical_series("temp"), "temperature");
        assert_eq!(canonical_series("hum"), "humidity");
        assert_eq!(canonical_series("rpm"), "speed");
        assert_eq!(canonical_series("velocity"), "speed");
        assert_eq!(canonical_series("press"), "pressure");
        assert_eq!(canonical_series("voltage"), "voltage");
    }
}
