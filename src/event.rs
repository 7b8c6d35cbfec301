//! Normalized execution events.
//!
//! Sandbox drivers and log-format parsers turn raw driver-specific logs into
//! a stream of [`ExecutionEvent`] values. This module is the boundary
//! contract: everything the evaluation core consumes is expressed in terms of
//! these types.

use std::fmt;

use serde::de::{self, Deserializer, Visitor};
use serde::{Deserialize, Serialize, Serializer};

use crate::error::{BehaviorError, Result};

/// Event timestamp with microsecond precision, stored as a fixed-point count
/// of microseconds since the unix epoch. Sub-second precision from source
/// logs is preserved without floating point drift.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Timestamp(u64);

impl Timestamp {
    pub const ZERO: Timestamp = Timestamp(0);

    pub fn from_micros(micros: u64) -> Self {
        Timestamp(micros)
    }

    /// Saturates at `u64::MAX` microseconds for out-of-range second counts.
    pub fn from_secs(secs: u64) -> Self {
        Timestamp(secs.saturating_mul(1_000_000))
    }

    pub fn as_micros(self) -> u64 {
        self.0
    }

    /// Parses a decimal unix timestamp such as `1614155232.834221`.
    /// Fractional digits beyond microseconds are truncated. Returns `None`
    /// for malformed input and for timestamps past the representable range,
    /// both of which occur in untrusted source logs.
    pub fn parse_decimal(text: &str) -> Option<Self> {
        let (secs, frac) = match text.split_once('.') {
            Some((secs, frac)) => (secs, frac),
            None => (text, ""),
        };

        let secs: u64 = secs.parse().ok()?;
        let mut micros: u64 = 0;
        let mut scale = 100_000;
        for c in frac.chars().take(6) {
            micros += c.to_digit(10)? as u64 * scale;
            scale /= 10;
        }

        let micros = secs.checked_mul(1_000_000)?.checked_add(micros)?;
        Some(Timestamp(micros))
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:06}", self.0 / 1_000_000, self.0 % 1_000_000)
    }
}

impl Serialize for Timestamp {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Timestamp {
    fn deserialize<D: Deserializer<'de>>(
        deserializer: D,
    ) -> std::result::Result<Self, D::Error> {
        struct TimestampVisitor;

        impl Visitor<'_> for TimestampVisitor {
            type Value = Timestamp;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a decimal unix timestamp")
            }

            fn visit_str<E: de::Error>(self, v: &str) -> std::result::Result<Timestamp, E> {
                Timestamp::parse_decimal(v)
                    .ok_or_else(|| E::custom(format!("invalid timestamp `{v}`")))
            }

            fn visit_u64<E: de::Error>(self, v: u64) -> std::result::Result<Timestamp, E> {
                Ok(Timestamp::from_secs(v))
            }

            fn visit_f64<E: de::Error>(self, v: f64) -> std::result::Result<Timestamp, E> {
                if v < 0.0 {
                    return Err(E::custom("negative timestamp"));
                }
                Ok(Timestamp::from_micros((v * 1e6) as u64))
            }
        }

        deserializer.deserialize_any(TimestampVisitor)
    }
}

/// A concrete runtime value: an event argument, a return value, or a value
/// bound to a symbolic variable in a token.
///
/// `Unresolved` stands for arguments the driver could not decode (rendered as
/// `null` in normalized logs). Referencing an unresolved binding from a
/// constraint expression is an evaluation error.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum EventValue {
    UInt(u64),
    Bool(bool),
    Str(String),
    Range(u64, u64),
    Unresolved,
}

impl EventValue {
    /// Interprets the value as an unsigned 64-bit integer, as required by
    /// arithmetic, bitwise and ordering operators.
    pub fn as_uint(&self) -> Result<u64> {
        match self {
            EventValue::UInt(v) => Ok(*v),
            other => Err(BehaviorError::NotAnInteger(other.to_string())),
        }
    }

    pub fn as_bool(&self) -> Result<bool> {
        match self {
            EventValue::Bool(v) => Ok(*v),
            other => Err(BehaviorError::NotABoolean(other.to_string())),
        }
    }

    pub fn is_unresolved(&self) -> bool {
        matches!(self, EventValue::Unresolved)
    }
}

impl fmt::Display for EventValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EventValue::UInt(v) => write!(f, "{v}"),
            EventValue::Bool(v) => write!(f, "{v}"),
            EventValue::Str(s) => {
                f.write_str("\"")?;
                for c in s.chars() {
                    match c {
                        '"' => f.write_str("\\\"")?,
                        '\\' => f.write_str("\\\\")?,
                        '\n' => f.write_str("\\n")?,
                        '\r' => f.write_str("\\r")?,
                        '\t' => f.write_str("\\t")?,
                        c => write!(f, "{c}")?,
                    }
                }
                f.write_str("\"")
            }
            EventValue::Range(start, end) => write!(f, "[{start}..{end}]"),
            EventValue::Unresolved => f.write_str("null"),
        }
    }
}

impl From<u64> for EventValue {
    fn from(v: u64) -> Self {
        EventValue::UInt(v)
    }
}

impl From<u32> for EventValue {
    fn from(v: u32) -> Self {
        EventValue::UInt(v as u64)
    }
}

impl From<bool> for EventValue {
    fn from(v: bool) -> Self {
        EventValue::Bool(v)
    }
}

impl From<&str> for EventValue {
    fn from(v: &str) -> Self {
        EventValue::Str(v.to_string())
    }
}

impl From<String> for EventValue {
    fn from(v: String) -> Self {
        EventValue::Str(v)
    }
}

impl From<&serde_json::Value> for EventValue {
    fn from(value: &serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => EventValue::Unresolved,
            serde_json::Value::Bool(b) => EventValue::Bool(*b),
            serde_json::Value::Number(n) => match n.as_u64() {
                Some(v) => EventValue::UInt(v),
                None => EventValue::Unresolved,
            },
            serde_json::Value::String(s) => EventValue::Str(s.clone()),
            _ => EventValue::Unresolved,
        }
    }
}

impl From<&EventValue> for serde_json::Value {
    fn from(value: &EventValue) -> Self {
        match value {
            EventValue::UInt(v) => (*v).into(),
            EventValue::Bool(b) => (*b).into(),
            EventValue::Str(s) => s.clone().into(),
            EventValue::Range(start, end) => serde_json::json!([start, end]),
            EventValue::Unresolved => serde_json::Value::Null,
        }
    }
}

impl Serialize for EventValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serde_json::Value::from(self).serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for EventValue {
    fn deserialize<D: Deserializer<'de>>(
        deserializer: D,
    ) -> std::result::Result<Self, D::Error> {
        let value = serde_json::Value::deserialize(deserializer)?;
        Ok(EventValue::from(&value))
    }
}

/// A single recorded event in an execution trace. Immutable once constructed;
/// the fluent `with_*` constructors exist for drivers and tests.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionEvent {
    pub time: Timestamp,
    #[serde(default)]
    pub process_id: u32,
    #[serde(default)]
    pub thread_id: u32,
    pub name: String,
    #[serde(default)]
    pub arguments: Vec<EventValue>,
    #[serde(default)]
    pub return_value: Option<EventValue>,
}

impl ExecutionEvent {
    pub fn new(time: Timestamp, name: impl Into<String>) -> Self {
        Self {
            time,
            process_id: 0,
            thread_id: 0,
            name: name.into(),
            arguments: Vec::new(),
            return_value: None,
        }
    }

    pub fn with_arguments(
        mut self,
        arguments: impl IntoIterator<Item = impl Into<EventValue>>,
    ) -> Self {
        self.arguments = arguments.into_iter().map(Into::into).collect();
        self
    }

    pub fn in_process(mut self, process_id: u32) -> Self {
        self.process_id = process_id;
        self
    }

    pub fn on_thread(mut self, thread_id: u32) -> Self {
        self.thread_id = thread_id;
        self
    }

    pub fn returning(mut self, value: impl Into<EventValue>) -> Self {
        self.return_value = Some(value.into());
        self
    }
}

impl fmt::Display for ExecutionEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}(", self.time, self.name)?;
        for (i, argument) in self.arguments.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{argument}")?;
        }
        f.write_str(")")?;
        if let Some(value) = &self.return_value {
            write!(f, " -> {value}")?;
        }
        Ok(())
    }
}

/// An ordered sequence of recorded events.
///
/// The analyzer consumes events in stream order and performs no sorting of
/// its own; normalizers merging multiple source logs should call
/// [`EventStream::sort_by_time`] before handing the stream over.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EventStream {
    events: Vec<ExecutionEvent>,
}

impl EventStream {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, event: ExecutionEvent) {
        self.events.push(event);
    }

    pub fn events(&self) -> &[ExecutionEvent] {
        &self.events
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Stable sort by ascending timestamp. Events with equal timestamps keep
    /// their relative source order.
    pub fn sort_by_time(&mut self) {
        self.events.sort_by_key(|e| e.time);
    }
}

impl FromIterator<ExecutionEvent> for EventStream {
    fn from_iter<I: IntoIterator<Item = ExecutionEvent>>(iter: I) -> Self {
        Self {
            events: iter.into_iter().collect(),
        }
    }
}

impl IntoIterator for EventStream {
    type Item = ExecutionEvent;
    type IntoIter = std::vec::IntoIter<ExecutionEvent>;

    fn into_iter(self) -> Self::IntoIter {
        self.events.into_iter()
    }
}
