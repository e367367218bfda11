//! Structured worker messages.
//!
//! Every message exchanged with the worker is a mapping from string keys to a
//! recursive [`Value`]. Date-time leaves keep track of whether the wire text
//! carried an offset; [`Message`] construction always runs
//! [`Value::normalize_timestamps`] so that offset-less values are read as UTC.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, SecondsFormat, Utc};
use regex::Regex;
use thiserror::Error;

/// YAML 1.1 timestamp (date-time form only; bare dates stay strings).
static TIMESTAMP_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^(\d{4})-(\d{1,2})-(\d{1,2})(?:[Tt]|[ \t]+)(\d{1,2}):(\d{2}):(\d{2})(?:\.(\d*))?(?:[ \t]*(Z|z|[-+]\d{1,2}(?::?\d{2})?))?$",
    )
    .expect("timestamp regex")
});

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MessageError {
    #[error("message is not a mapping")]
    NotAMapping,
    #[error("message has no string `type` field")]
    MissingType,
    #[error("field `{0}` is missing or has the wrong type")]
    Field(String),
    #[error("message type `{0}` is not a job message")]
    NotAJobMessage(String),
    #[error("message type `{0}` is not terminal")]
    NotTerminal(String),
}

/// Fields the worker fills with date-times. Other text that happens to look
/// like a date-time, such as a partition label, stays a string.
pub const TIMESTAMP_FIELDS: [&str; 3] = ["start", "finish", "estimated_finish"];

/// A date-time leaf as read from the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Timestamp {
    /// No offset was present in the text.
    Naive(NaiveDateTime),
    Zoned(DateTime<FixedOffset>),
}

impl Timestamp {
    /// Parses YAML date-time text such as `2017-05-03T10:20:30.5Z` or
    /// `2017-05-03 10:20:30`. Returns `None` for anything else.
    pub fn parse(text: &str) -> Option<Self> {
        let caps = TIMESTAMP_RE.captures(text.trim())?;
        let num = |idx: usize| -> Option<u32> { caps.get(idx)?.as_str().parse().ok() };

        let year: i32 = caps.get(1)?.as_str().parse().ok()?;
        let date = NaiveDate::from_ymd_opt(year, num(2)?, num(3)?)?;
        let nanos = match caps.get(7) {
            Some(frac) if !frac.as_str().is_empty() => {
                let mut digits: String = frac.as_str().chars().take(9).collect();
                while digits.len() < 9 {
                    digits.push('0');
                }
                digits.parse().ok()?
            }
            _ => 0,
        };
        let time = NaiveTime::from_hms_nano_opt(num(4)?, num(5)?, num(6)?, nanos)?;
        let naive = NaiveDateTime::new(date, time);

        let Some(offset) = caps.get(8) else {
            return Some(Timestamp::Naive(naive));
        };
        let offset = parse_offset(offset.as_str())?;
        naive
            .and_local_timezone(offset)
            .single()
            .map(Timestamp::Zoned)
    }

    /// Offset-less timestamps are taken to be UTC.
    pub fn normalized(self) -> Self {
        match self {
            Timestamp::Naive(naive) => Timestamp::Zoned(naive.and_utc().fixed_offset()),
            zoned @ Timestamp::Zoned(_) => zoned,
        }
    }

    pub fn to_utc(self) -> DateTime<Utc> {
        match self {
            Timestamp::Naive(naive) => naive.and_utc(),
            Timestamp::Zoned(zoned) => zoned.with_timezone(&Utc),
        }
    }

    /// RFC 3339 text; offset-less values are written without an offset.
    pub fn to_wire(self) -> String {
        match self {
            Timestamp::Naive(naive) => naive.format("%Y-%m-%dT%H:%M:%S%.f").to_string(),
            Timestamp::Zoned(zoned) => zoned.to_rfc3339_opts(SecondsFormat::AutoSi, true),
        }
    }
}

fn parse_offset(text: &str) -> Option<FixedOffset> {
    if text.eq_ignore_ascii_case("z") {
        return FixedOffset::east_opt(0);
    }
    let (sign, rest) = match text.as_bytes().first()? {
        b'+' => (1, &text[1..]),
        b'-' => (-1, &text[1..]),
        _ => return None,
    };
    let (hours, minutes) = match rest.split_once(':') {
        Some((h, m)) => (h, m),
        None if rest.len() > 2 => rest.split_at(rest.len() - 2),
        None => (rest, "0"),
    };
    let hours: i32 = hours.parse().ok()?;
    let minutes: i32 = minutes.parse().ok()?;
    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60))
}

/// Recursive message value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    Timestamp(Timestamp),
    Seq(Vec<Value>),
    Map(BTreeMap<String, Value>),
}

impl Value {
    /// Rewrites every offset-less timestamp in the tree as UTC.
    pub fn normalize_timestamps(&mut self) {
        match self {
            Value::Timestamp(ts) => *ts = ts.normalized(),
            Value::Seq(items) => items.iter_mut().for_each(Value::normalize_timestamps),
            Value::Map(map) => map.values_mut().for_each(Value::normalize_timestamps),
            Value::Null | Value::Bool(_) | Value::Int(_) | Value::Float(_) | Value::Str(_) => {}
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Float(f) => Some(*f),
            Value::Int(i) => Some(*i as f64),
            _ => None,
        }
    }

    pub fn as_u64(&self) -> Option<u64> {
        match self {
            Value::Int(i) => u64::try_from(*i).ok(),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_timestamp(&self) -> Option<Timestamp> {
        match self {
            Value::Timestamp(ts) => Some(*ts),
            _ => None,
        }
    }

    pub fn as_seq(&self) -> Option<&[Value]> {
        match self {
            Value::Seq(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&BTreeMap<String, Value>> {
        match self {
            Value::Map(map) => Some(map),
            _ => None,
        }
    }

    /// Looks up `key` when this value is a mapping.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.as_map()?.get(key)
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Str(value.to_owned())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::Str(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Float(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Int(value)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(value: DateTime<Utc>) -> Self {
        Value::Timestamp(Timestamp::Zoned(value.fixed_offset()))
    }
}

impl From<Timestamp> for Value {
    fn from(value: Timestamp) -> Self {
        Value::Timestamp(value)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(values: Vec<T>) -> Self {
        Value::Seq(values.into_iter().map(Into::into).collect())
    }
}

/// An immutable, normalized message with a `type` discriminator.
#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    fields: BTreeMap<String, Value>,
}

impl Message {
    /// Starts building a message of the given type.
    pub fn build(message_type: &str) -> MessageBuilder {
        let mut fields = BTreeMap::new();
        fields.insert("type".to_owned(), Value::from(message_type));
        MessageBuilder { fields }
    }

    pub fn message_type(&self) -> &str {
        self.fields
            .get("type")
            .and_then(Value::as_str)
            .unwrap_or_default()
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    /// Present and not null.
    pub fn has(&self, key: &str) -> bool {
        self.get(key).is_some_and(|value| !value.is_null())
    }

    pub fn str_field(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(Value::as_str)
    }

    pub fn require_str(&self, key: &str) -> Result<&str, MessageError> {
        self.str_field(key)
            .ok_or_else(|| MessageError::Field(key.to_owned()))
    }

    pub fn f64_field(&self, key: &str) -> Option<f64> {
        self.get(key).and_then(Value::as_f64)
    }

    pub fn timestamp_field(&self, key: &str) -> Option<DateTime<Utc>> {
        self.get(key)
            .and_then(Value::as_timestamp)
            .map(Timestamp::to_utc)
    }

    pub fn require_timestamp(&self, key: &str) -> Result<DateTime<Utc>, MessageError> {
        self.timestamp_field(key)
            .ok_or_else(|| MessageError::Field(key.to_owned()))
    }

    pub fn fields(&self) -> &BTreeMap<String, Value> {
        &self.fields
    }

    pub fn into_value(self) -> Value {
        Value::Map(self.fields)
    }

    /// `type: status` with the given `status` value.
    pub fn is_status(&self, status: &str) -> bool {
        self.message_type() == "status" && self.str_field("status") == Some(status)
    }
}

impl TryFrom<Value> for Message {
    type Error = MessageError;

    fn try_from(mut value: Value) -> Result<Self, Self::Error> {
        value.normalize_timestamps();
        let Value::Map(fields) = value else {
            return Err(MessageError::NotAMapping);
        };
        if fields.get("type").and_then(Value::as_str).is_none() {
            return Err(MessageError::MissingType);
        }
        Ok(Self { fields })
    }
}

/// Builder used by tests and by code that synthesizes messages locally.
#[derive(Debug, Clone)]
pub struct MessageBuilder {
    fields: BTreeMap<String, Value>,
}

impl MessageBuilder {
    pub fn field(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.fields.insert(key.to_owned(), value.into());
        self
    }

    pub fn finish(mut self) -> Message {
        self.fields
            .values_mut()
            .for_each(Value::normalize_timestamps);
        Message {
            fields: self.fields,
        }
    }
}
