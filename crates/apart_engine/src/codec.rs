//! YAML text <-> message tree.
//!
//! serde_yaml reports date-times as plain strings, so the values of
//! [`TIMESTAMP_FIELDS`] are re-checked with [`Timestamp::parse`] while
//! converting. Every decoded message passes through `Message::try_from`,
//! which normalizes offset-less timestamps.

use std::collections::BTreeMap;

use apart_core::{Command, Message, MessageError, Timestamp, Value, TIMESTAMP_FIELDS};
use serde_yaml::{Mapping, Number, Value as Yaml};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CodecError {
    #[error("frame is not valid UTF-8: {0}")]
    Utf8(#[from] std::str::Utf8Error),
    #[error("invalid YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("mapping key is not a string")]
    NonStringKey,
    #[error("expected a sequence of messages")]
    NotASequence,
    #[error(transparent)]
    Message(#[from] MessageError),
}

/// Decodes one frame received from the worker.
pub fn decode_message(frame: &[u8]) -> Result<Message, CodecError> {
    let text = std::str::from_utf8(frame)?;
    parse_message(text)
}

pub fn parse_message(text: &str) -> Result<Message, CodecError> {
    let yaml: Yaml = serde_yaml::from_str(text)?;
    Ok(Message::try_from(from_yaml(yaml)?)?)
}

/// Renders a command as the worker expects it, e.g. `type: cancel-clone\nid: '3'`.
pub fn encode_command(command: &Command) -> Result<String, CodecError> {
    Ok(serde_yaml::to_string(command)?)
}

pub fn encode_message(message: &Message) -> Result<String, CodecError> {
    Ok(serde_yaml::to_string(&message_to_yaml(message))?)
}

/// Parses a document holding a sequence of messages. Items are converted one
/// by one so that a single bad entry does not invalidate the rest.
pub fn decode_messages(text: &str) -> Result<Vec<Result<Message, CodecError>>, CodecError> {
    if text.trim().is_empty() {
        return Ok(Vec::new());
    }
    let items = match serde_yaml::from_str::<Yaml>(text)? {
        Yaml::Null => return Ok(Vec::new()),
        Yaml::Sequence(items) => items,
        _ => return Err(CodecError::NotASequence),
    };
    Ok(items
        .into_iter()
        .map(|item| Ok(Message::try_from(from_yaml(item)?)?))
        .collect())
}

pub fn encode_messages<'a>(
    messages: impl IntoIterator<Item = &'a Message>,
) -> Result<String, CodecError> {
    let seq: Vec<Yaml> = messages.into_iter().map(message_to_yaml).collect();
    Ok(serde_yaml::to_string(&Yaml::Sequence(seq))?)
}

fn from_yaml(yaml: Yaml) -> Result<Value, CodecError> {
    Ok(match yaml {
        Yaml::Null => Value::Null,
        Yaml::Bool(b) => Value::Bool(b),
        Yaml::Number(n) => number(&n),
        Yaml::String(s) => Value::Str(s),
        Yaml::Sequence(items) => Value::Seq(
            items
                .into_iter()
                .map(from_yaml)
                .collect::<Result<_, _>>()?,
        ),
        Yaml::Mapping(mapping) => {
            let mut map = BTreeMap::new();
            for (key, value) in mapping {
                let key = match key {
                    Yaml::String(key) => key,
                    Yaml::Number(n) => n.to_string(),
                    Yaml::Bool(b) => b.to_string(),
                    _ => return Err(CodecError::NonStringKey),
                };
                let value = match value {
                    Yaml::String(text) if TIMESTAMP_FIELDS.contains(&key.as_str()) => {
                        match Timestamp::parse(&text) {
                            Some(ts) => Value::Timestamp(ts),
                            None => Value::Str(text),
                        }
                    }
                    other => from_yaml(other)?,
                };
                map.insert(key, value);
            }
            Value::Map(map)
        }
        // Explicit tags carry nothing the protocol uses.
        Yaml::Tagged(tagged) => from_yaml(tagged.value)?,
    })
}

fn number(n: &Number) -> Value {
    match n.as_i64() {
        Some(i) => Value::Int(i),
        None => Value::Float(n.as_f64().unwrap_or(f64::NAN)),
    }
}

fn to_yaml(value: &Value) -> Yaml {
    match value {
        Value::Null => Yaml::Null,
        Value::Bool(b) => Yaml::Bool(*b),
        Value::Int(i) => Yaml::Number(Number::from(*i)),
        Value::Float(f) => Yaml::Number(Number::from(*f)),
        Value::Str(s) => Yaml::String(s.clone()),
        Value::Timestamp(ts) => Yaml::String(ts.to_wire()),
        Value::Seq(items) => Yaml::Sequence(items.iter().map(to_yaml).collect()),
        Value::Map(map) => Yaml::Mapping(mapping(map)),
    }
}

fn message_to_yaml(message: &Message) -> Yaml {
    Yaml::Mapping(mapping(message.fields()))
}

fn mapping(map: &BTreeMap<String, Value>) -> Mapping {
    let mut out = Mapping::with_capacity(map.len());
    for (key, value) in map {
        out.insert(Yaml::String(key.clone()), to_yaml(value));
    }
    out
}
