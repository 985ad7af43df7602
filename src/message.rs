// Copyright (C) 2022-2025 Michael Herstine <sp1ff@pobox.com>
//
// This file is part of gelf-tracing.
//
// gelf-tracing is free software: you can redistribute it and/or modify it under the terms of the
// GNU General Public License as published by the Free Software Foundation, either version 3 of the
// License, or (at your option) any later version.
//
// mpdpopm is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY; without even
// the implied warranty of MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the GNU General
// Public License for more details.
//
// You should have received a copy of the GNU General Public License along with mpdpopm.  If not,
// see <http://www.gnu.org/licenses/>.

//! The GELF [message] & its JSON encoding.
//!
//! [message]: https://go2docs.graylog.org/current/getting_in_log_data/gelf.html#GELFPayloadSpecification
//!
//! A [`LogMessage`] has a fixed set of well-known fields plus an open-ended set of "additional"
//! fields whose names begin with an underscore. The additional fields come from two places: a
//! [`Map`] the caller builds up field by field, and a [`RawExtra`] the caller already had in
//! serialized form. Both are merged into the top level of the one JSON object on the wire.

use crate::{
    error::{Error, Result},
    identity::Identity,
    level::Level,
};

use backtrace::Backtrace;
use bytes::BufMut;
use chrono::prelude::*;
use serde::ser::{Error as _, Serialize, SerializeMap, Serializer};
use serde_json::{Map, Value};

/// The GELF format version this crate produces
pub const GELF_VERSION: &str = "1.1";

/// Written to "short_message" when the input had nothing better to offer; GELF requires the field
pub const SHORT_MESSAGE_PLACEHOLDER: &str = "-";

/// A GELF message.
///
/// Field names follow the GELF payload: `short` is written as "short_message", `full` as
/// "full_message" & `timestamp` as "timestamp" (fractional seconds since the epoch). Empty strings
/// are left off the wire, as is a `level` of `None`.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct LogMessage {
    pub version: String,
    pub host: String,
    pub short: String,
    pub full: String,
    pub timestamp: f64,
    pub level: Option<f64>,
    pub level_name: String,
    pub facility: String,
    pub environment: String,
    pub service: String,
    /// Additional fields; every key must begin with an underscore
    pub extra: Map<String, Value>,
    /// Additional fields that arrived pre-serialized
    pub raw_extra: RawExtra,
}

/// Additional fields supplied as an already-serialized JSON object.
///
/// The object is parsed once, on construction, so that encoding can merge it with everything else
/// at the object level.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RawExtra(Map<String, Value>);

impl RawExtra {
    /// Parse `bytes`, which must hold a JSON object.
    pub fn from_slice(bytes: &[u8]) -> Result<RawExtra> {
        match serde_json::from_slice::<Value>(bytes) {
            Ok(Value::Object(map)) => Ok(RawExtra(map)),
            Ok(_) => Err(Error::BadRawExtra {
                back: Backtrace::new(),
            }),
            Err(source) => Err(Error::Decode {
                source,
                back: Backtrace::new(),
            }),
        }
    }
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
    pub fn len(&self) -> usize {
        self.0.len()
    }
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }
}

impl std::convert::TryFrom<&[u8]> for RawExtra {
    type Error = Error;
    fn try_from(x: &[u8]) -> std::result::Result<Self, Self::Error> {
        RawExtra::from_slice(x)
    }
}

/// The current wall-clock time, as GELF wants it: seconds since the epoch, with fractional part.
pub fn now() -> f64 {
    timestamp_of(Utc::now())
}

pub fn timestamp_of(t: DateTime<Utc>) -> f64 {
    t.timestamp() as f64 + f64::from(t.timestamp_subsec_nanos()) / 1_000_000_000.0
}

/// Split a trimmed payload into its short message & its full message.
///
/// If there are line breaks, the first line is the short message & the full message is the entire
/// text. If there are none, the whole thing is the short message & the full message is empty.
pub(crate) fn split_message(text: &str) -> (&str, &str) {
    match text.find('\n') {
        Some(i) if i > 0 => (text[..i].trim_end(), text),
        _ => (text, ""),
    }
}

fn is_valid_extra_key(key: &str) -> bool {
    key.len() > 1 && key.starts_with('_') && key != "_id"
}

/// Render a JSON value as message text: strings as themselves, anything else as its JSON.
fn as_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

impl LogMessage {
    /// A minimal message: `host` & `short`, stamped with the current time.
    pub fn new(host: impl Into<String>, short: impl Into<String>) -> LogMessage {
        LogMessage {
            version: GELF_VERSION.to_string(),
            host: host.into(),
            short: short.into(),
            timestamp: now(),
            ..Default::default()
        }
    }

    /// Build a message from a raw log payload.
    ///
    /// The payload is trimmed & split into short & full messages as per [`split_message`]. The
    /// short message may itself be a JSON object (a "structured" log line), in which case its
    /// "short_message", "level" & "level_name" keys populate the corresponding fields & its
    /// underscore-prefixed keys become additional fields. A structured line must carry a numeric
    /// "level"; its absence is an [`Error::MissingSeverity`]. Anything else is taken as plain text
    /// at the default (informational) level.
    pub fn from_raw(raw: &[u8], identity: &Identity) -> Result<LogMessage> {
        let text = String::from_utf8_lossy(raw);
        let (short, full) = split_message(text.trim());

        let mut msg = LogMessage {
            version: GELF_VERSION.to_string(),
            host: identity.host().to_string(),
            full: full.to_string(),
            timestamp: now(),
            facility: identity.facility().to_string(),
            environment: identity.environment().to_string(),
            service: identity.service().to_string(),
            ..Default::default()
        };

        match serde_json::from_str::<Value>(short) {
            Ok(Value::Object(fields)) => {
                msg.level = Some(
                    fields
                        .get("level")
                        .and_then(Value::as_f64)
                        .ok_or_else(|| Error::MissingSeverity {
                            back: Backtrace::new(),
                        })?,
                );
                msg.short = match fields.get("short_message") {
                    None | Some(Value::Null) => String::new(),
                    Some(value) => as_text(value),
                };
                msg.level_name = match fields.get("level_name") {
                    None | Some(Value::Null) => String::new(),
                    Some(value) => as_text(value),
                };
                msg.extra = fields
                    .into_iter()
                    .filter(|(k, _)| is_valid_extra_key(k))
                    .collect();
            }
            _ => {
                let level = Level::default();
                msg.short = short.to_string();
                msg.level = Some(level.into());
                msg.level_name = level.label().to_string();
            }
        }

        if msg.short.is_empty() {
            msg.short = SHORT_MESSAGE_PLACEHOLDER.to_string();
        }

        Ok(msg)
    }

    /// Add an additional field, prefixing `key` with an underscore if it lacks one.
    pub fn insert_extra(&mut self, key: &str, value: impl Into<Value>) -> &mut Self {
        let key = if key.starts_with('_') {
            key.to_string()
        } else {
            format!("_{}", key)
        };
        self.extra.insert(key, value.into());
        self
    }

    /// Serialize this message to a freshly-allocated buffer.
    pub fn encode(&self) -> Result<Vec<u8>> {
        let mut buf = Vec::with_capacity(256);
        self.encode_into(&mut buf)?;
        Ok(buf)
    }

    /// Serialize this message onto the end of `buf`.
    pub fn encode_into<B: BufMut>(&self, buf: &mut B) -> Result<()> {
        serde_json::to_writer(buf.writer(), self).map_err(|source| Error::Encode {
            source,
            back: Backtrace::new(),
        })
    }

    /// Parse a GELF JSON document.
    ///
    /// Underscore-prefixed keys land in `extra`; the well-known fields are type-checked & a
    /// mismatch is an [`Error::FieldType`] naming the field. Keys that are neither are dropped,
    /// since GELF producers are free to add metadata of their own.
    pub fn decode(bytes: &[u8]) -> Result<LogMessage> {
        let fields: Map<String, Value> =
            serde_json::from_slice(bytes).map_err(|source| Error::Decode {
                source,
                back: Backtrace::new(),
            })?;

        let mut msg = LogMessage::default();
        for (k, v) in fields {
            if k.starts_with('_') {
                msg.extra.insert(k, v);
                continue;
            }
            match k.as_str() {
                "version" => msg.version = expect_string(&k, v)?,
                "host" => msg.host = expect_string(&k, v)?,
                "short_message" => msg.short = expect_string(&k, v)?,
                "full_message" => msg.full = expect_string(&k, v)?,
                "timestamp" => msg.timestamp = expect_number(&k, &v)?,
                "level" => msg.level = Some(expect_number(&k, &v)?),
                "level_name" => msg.level_name = expect_string(&k, v)?,
                "facility" => msg.facility = expect_string(&k, v)?,
                "environment" => msg.environment = expect_string(&k, v)?,
                "service" => msg.service = expect_string(&k, v)?,
                _ => (),
            }
        }
        Ok(msg)
    }
}

fn expect_string(field: &str, value: Value) -> Result<String> {
    match value {
        Value::String(s) => Ok(s),
        _ => Err(Error::FieldType {
            field: field.to_string(),
            expected: "a string",
            back: Backtrace::new(),
        }),
    }
}

fn expect_number(field: &str, value: &Value) -> Result<f64> {
    value.as_f64().ok_or_else(|| Error::FieldType {
        field: field.to_string(),
        expected: "a number",
        back: Backtrace::new(),
    })
}

/// Fixed fields first, in GELF order, followed by `extra` & then any `raw_extra` keys not already
/// written. Everything goes through one map so the result is always a single, flat object.
impl Serialize for LogMessage {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        // serde_json would quietly write these as `null`
        if !self.timestamp.is_finite() || self.level.map_or(false, |l| !l.is_finite()) {
            return Err(S::Error::custom("timestamp & level must be finite numbers"));
        }

        let mut map = serializer.serialize_map(None)?;
        map.serialize_entry("version", &self.version)?;
        map.serialize_entry("host", &self.host)?;
        map.serialize_entry("short_message", &self.short)?;
        if !self.full.is_empty() {
            map.serialize_entry("full_message", &self.full)?;
        }
        map.serialize_entry("timestamp", &self.timestamp)?;
        if let Some(level) = self.level {
            map.serialize_entry("level", &level)?;
        }
        for (key, value) in [
            ("level_name", &self.level_name),
            ("facility", &self.facility),
            ("environment", &self.environment),
            ("service", &self.service),
        ] {
            if !value.is_empty() {
                map.serialize_entry(key, value)?;
            }
        }

        let raw = self
            .raw_extra
            .0
            .iter()
            .filter(|(k, _)| !self.extra.contains_key(*k));
        for (key, value) in self.extra.iter().chain(raw) {
            if !is_valid_extra_key(key) {
                return Err(S::Error::custom(format!(
                    "additional field `{}` must be an underscore followed by a name other than `id`",
                    key
                )));
            }
            map.serialize_entry(key, value)?;
        }

        map.end()
    }
}

#[cfg(test)]
mod test {

    use super::*;

    use serde_json::json;

    fn identity() -> Identity {
        Identity::builder()
            .host("bree.local")
            .facility("billing")
            .build()
    }

    fn sample() -> LogMessage {
        LogMessage {
            version: GELF_VERSION.to_string(),
            host: "example.org".to_string(),
            short: "A short message that helps you identify what is going on".to_string(),
            full: "Backtrace here\n\nmore stuff".to_string(),
            timestamp: 1385053862.3072,
            level: Some(1.0),
            level_name: "ALERT".to_string(),
            facility: "billing".to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn encode_fixed_fields_only() {
        let mut msg = sample();
        msg.full = String::new();
        let buf = msg.encode().unwrap();

        assert_eq!(
            std::str::from_utf8(&buf).unwrap(),
            "{\"version\":\"1.1\",\"host\":\"example.org\",\
             \"short_message\":\"A short message that helps you identify what is going on\",\
             \"timestamp\":1385053862.3072,\"level\":1.0,\"level_name\":\"ALERT\",\
             \"facility\":\"billing\"}"
        );
    }

    #[test]
    fn encode_merges_both_extra_sources() {
        let mut msg = sample();
        msg.insert_extra("_user_id", 9001).insert_extra("some_info", "foo");
        msg.raw_extra =
            RawExtra::from_slice(br#"{"_some_env_var":"bar","_user_id":4000}"#).unwrap();

        let buf = msg.encode().unwrap();
        let text = std::str::from_utf8(&buf).unwrap();
        assert_eq!(1, text.matches("\"_user_id\"").count());

        let value: Value = serde_json::from_slice(&buf).unwrap();
        assert_eq!(
            value,
            json!({
                "version": "1.1",
                "host": "example.org",
                "short_message": "A short message that helps you identify what is going on",
                "full_message": "Backtrace here\n\nmore stuff",
                "timestamp": 1385053862.3072,
                "level": 1.0,
                "level_name": "ALERT",
                "facility": "billing",
                "_user_id": 9001,
                "_some_info": "foo",
                "_some_env_var": "bar"
            })
        );
    }

    #[test]
    fn encode_raw_extra_alone() {
        let mut msg = sample();
        msg.raw_extra = RawExtra::from_slice(br#"{"_container_id":"abc"}"#).unwrap();
        let value: Value = serde_json::from_slice(&msg.encode().unwrap()).unwrap();
        assert_eq!(value["_container_id"], "abc");
        assert_eq!(value["host"], "example.org");
    }

    #[test]
    fn encode_empty_extras_are_valid_json() {
        let mut msg = sample();
        msg.raw_extra = RawExtra::from_slice(b"{}").unwrap();
        let buf = msg.encode().unwrap();
        let text = std::str::from_utf8(&buf).unwrap();
        assert!(!text.contains(",}"));
        assert!(!text.contains("{,"));
        assert!(!text.contains(",,"));
        let value: Value = serde_json::from_str(text).unwrap();
        assert_eq!(value.as_object().unwrap().len(), 8);
    }

    #[test]
    fn encode_appends_to_buffer() {
        let msg = sample();
        let mut buf = bytes::BytesMut::from(&b"prefix "[..]);
        msg.encode_into(&mut buf).unwrap();
        assert!(buf.starts_with(b"prefix {\"version\""));
        assert!(buf.ends_with(b"}"));
    }

    #[test]
    fn encode_rejects_bad_extra_keys() {
        let mut msg = sample();
        msg.extra.insert("user_id".to_string(), json!(1));
        assert!(matches!(msg.encode(), Err(Error::Encode { .. })));

        let mut msg = sample();
        msg.raw_extra = RawExtra::from_slice(br#"{"_id":"nope"}"#).unwrap();
        assert!(matches!(msg.encode(), Err(Error::Encode { .. })));
    }

    #[test]
    fn encode_rejects_non_finite_numbers() {
        let mut msg = sample();
        msg.timestamp = f64::NAN;
        assert!(matches!(msg.encode(), Err(Error::Encode { .. })));

        let mut msg = sample();
        msg.level = Some(f64::INFINITY);
        assert!(matches!(msg.encode(), Err(Error::Encode { .. })));
    }

    #[test]
    fn encode_fails_on_full_buffer() {
        let msg = sample();
        let mut storage = [0u8; 16];
        let mut buf: &mut [u8] = &mut storage;
        assert!(matches!(msg.encode_into(&mut buf), Err(Error::Encode { .. })));
    }

    #[test]
    fn round_trip() {
        let mut msg = sample();
        msg.environment = "staging".to_string();
        msg.service = "invoicer".to_string();
        msg.insert_extra("_user_id", 9001)
            .insert_extra("_tags", json!(["a", "b"]))
            .insert_extra("_nested", json!({"k": null}));

        let decoded = LogMessage::decode(&msg.encode().unwrap()).unwrap();
        assert_eq!(decoded, msg);
    }

    #[test]
    fn decode_gelf() {
        let gelf = json!({
            "version": "1.1",
            "host": "example.org",
            "short_message": "A short message",
            "full_message": "Backtrace here",
            "timestamp": 1385053862,
            "level": 1,
            "_user_id": 9001,
            "_some_info": "foo",
            "unknown": {"is": "dropped"}
        });
        let msg = LogMessage::decode(gelf.to_string().as_bytes()).unwrap();
        assert_eq!(msg.version, "1.1");
        assert_eq!(msg.host, "example.org");
        assert_eq!(msg.short, "A short message");
        assert_eq!(msg.full, "Backtrace here");
        assert_eq!(msg.timestamp, 1385053862.0);
        assert_eq!(msg.level, Some(1.0));
        assert_eq!(msg.extra.len(), 2);
        assert_eq!(msg.extra["_user_id"], json!(9001));
        assert!(msg.raw_extra.is_empty());
    }

    #[test]
    fn decode_type_mismatch_names_the_field() {
        match LogMessage::decode(br#"{"short_message":"x","timestamp":"yesterday"}"#) {
            Err(Error::FieldType {
                field, expected, ..
            }) => {
                assert_eq!(field, "timestamp");
                assert_eq!(expected, "a number");
            }
            other => panic!("expected a field type error, got {:?}", other),
        }
        match LogMessage::decode(br#"{"host":42}"#) {
            Err(Error::FieldType { field, .. }) => assert_eq!(field, "host"),
            other => panic!("expected a field type error, got {:?}", other),
        }
    }

    #[test]
    fn decode_malformed() {
        assert!(matches!(
            LogMessage::decode(b"this is definitely not json"),
            Err(Error::Decode { .. })
        ));
        assert!(matches!(
            LogMessage::decode(b"[1, 2, 3]"),
            Err(Error::Decode { .. })
        ));
    }

    #[test]
    fn raw_extra_must_be_an_object() {
        assert!(matches!(
            RawExtra::from_slice(b"[1]"),
            Err(Error::BadRawExtra { .. })
        ));
        assert!(matches!(
            RawExtra::from_slice(b"{"),
            Err(Error::Decode { .. })
        ));
        assert_eq!(RawExtra::from_slice(br#"{"_a":1}"#).unwrap().len(), 1);
    }

    #[test]
    fn from_raw_structured() {
        let msg = LogMessage::from_raw(
            br#"  {"short_message":"boom","level":3,"level_name":"ERROR"}  "#,
            &identity(),
        )
        .unwrap();
        assert_eq!(msg.version, "1.1");
        assert_eq!(msg.host, "bree.local");
        assert_eq!(msg.facility, "billing");
        assert_eq!(msg.short, "boom");
        assert_eq!(msg.level, Some(3.0));
        assert_eq!(msg.level_name, "ERROR");
        assert_eq!(msg.full, "");
        assert!(msg.timestamp > 0.0);
    }

    #[test]
    fn from_raw_multi_line() {
        let raw = b"{\"short_message\":\"boom\",\"level\":3,\"_req\":\"r-1\"}\n  at main.rs:12\n";
        let msg = LogMessage::from_raw(raw, &identity()).unwrap();
        assert_eq!(msg.short, "boom");
        assert_eq!(
            msg.full,
            "{\"short_message\":\"boom\",\"level\":3,\"_req\":\"r-1\"}\n  at main.rs:12"
        );
        assert_eq!(msg.extra["_req"], "r-1");
    }

    #[test]
    fn from_raw_plain_text() {
        let msg = LogMessage::from_raw(b"disk full\n", &identity()).unwrap();
        assert_eq!(msg.short, "disk full");
        assert_eq!(msg.level, Some(6.0));
        assert_eq!(msg.level_name, "INFO");
        assert_eq!(msg.full, "");

        let msg = LogMessage::from_raw(b"hello\r\nworld", &identity()).unwrap();
        assert_eq!(msg.short, "hello");
        assert_eq!(msg.full, "hello\r\nworld");
    }

    #[test]
    fn from_raw_missing_severity() {
        assert!(matches!(
            LogMessage::from_raw(br#"{"level_name":"WARN"}"#, &identity()),
            Err(Error::MissingSeverity { .. })
        ));
        assert!(matches!(
            LogMessage::from_raw(br#"{"short_message":"x","level":"3"}"#, &identity()),
            Err(Error::MissingSeverity { .. })
        ));
    }

    #[test]
    fn from_raw_short_message_placeholder() {
        let msg = LogMessage::from_raw(br#"{"level":5}"#, &identity()).unwrap();
        assert_eq!(msg.short, SHORT_MESSAGE_PLACEHOLDER);
        assert_eq!(msg.level_name, "");

        let msg = LogMessage::from_raw(b"   ", &identity()).unwrap();
        assert_eq!(msg.short, SHORT_MESSAGE_PLACEHOLDER);
    }

    #[test]
    fn timestamps() {
        let t = Utc.timestamp_opt(1385053862, 307_200_000).unwrap();
        assert!((timestamp_of(t) - 1385053862.3072).abs() < 1e-6);
        let msg = LogMessage::new("bree.local", "hi");
        assert!(msg.timestamp > 1385053862.0);
    }
}
