//! Conversion between wire JSON and typed entities.
//!
//! # Design
//! Wire keys and entity wire names are identical, so decoding is a plain
//! serde pass. The only special value is `WireDate`: it accepts
//! `YYYY-MM-DD`, `dd.mm.YYYY` and `dd.mm.YYYY HH:mm` but always writes
//! `dd.mm.YYYY HH:mm`. A date string matching none of these is kept raw
//! instead of failing the whole record. Encoding skips absent fields, so
//! nulls never reach the server.

use std::fmt;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::de::{self, Deserializer, Visitor};
use serde::{Deserialize, Serialize, Serializer};
use serde_json::{Map, Value};

use crate::error::{ApiError, Result};
use crate::models::Model;

/// Format every date/time value is written in.
pub const WIRE_DATETIME_FORMAT: &str = "%d.%m.%Y %H:%M";

const ISO_DATE_FORMAT: &str = "%Y-%m-%d";
const DOTTED_DATE_FORMAT: &str = "%d.%m.%Y";

/// A `date` field: parsed when it matches a known format, raw otherwise.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WireDate {
    At(NaiveDateTime),
    Raw(String),
}

impl WireDate {
    /// Apply the read rules to a wire string.
    pub fn parse(raw: &str) -> Self {
        parse_wire_datetime(raw)
            .map(WireDate::At)
            .unwrap_or_else(|| WireDate::Raw(raw.to_string()))
    }

    pub fn as_datetime(&self) -> Option<NaiveDateTime> {
        match self {
            WireDate::At(at) => Some(*at),
            WireDate::Raw(_) => None,
        }
    }

    /// The value as it will be written to the wire.
    pub fn to_wire(&self) -> String {
        match self {
            WireDate::At(at) => at.format(WIRE_DATETIME_FORMAT).to_string(),
            WireDate::Raw(raw) => raw.clone(),
        }
    }
}

impl From<NaiveDateTime> for WireDate {
    fn from(at: NaiveDateTime) -> Self {
        WireDate::At(at)
    }
}

impl From<NaiveDate> for WireDate {
    fn from(date: NaiveDate) -> Self {
        WireDate::At(date.and_time(NaiveTime::MIN))
    }
}

impl fmt::Display for WireDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_wire())
    }
}

impl Serialize for WireDate {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_wire())
    }
}

impl<'de> Deserialize<'de> for WireDate {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        struct WireDateVisitor;

        impl Visitor<'_> for WireDateVisitor {
            type Value = WireDate;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a date string")
            }

            fn visit_str<E: de::Error>(self, v: &str) -> std::result::Result<WireDate, E> {
                Ok(WireDate::parse(v))
            }
        }

        deserializer.deserialize_str(WireDateVisitor)
    }
}

/// Parse `YYYY-MM-DD`, `dd.mm.YYYY` or `dd.mm.YYYY HH:mm`.
///
/// Length and separator decide which format is tried; a string that looks
/// like one format but fails to parse yields `None`.
pub fn parse_wire_datetime(raw: &str) -> Option<NaiveDateTime> {
    if raw.len() == 10 && raw.contains('-') {
        return NaiveDate::parse_from_str(raw, ISO_DATE_FORMAT)
            .ok()
            .map(|d| d.and_time(NaiveTime::MIN));
    }
    if raw.contains('.') && raw.len() >= 10 {
        if raw.len() == 10 {
            return NaiveDate::parse_from_str(raw, DOTTED_DATE_FORMAT)
                .ok()
                .map(|d| d.and_time(NaiveTime::MIN));
        }
        return NaiveDateTime::parse_from_str(raw, WIRE_DATETIME_FORMAT).ok();
    }
    None
}

/// Decode one wire object into an entity.
///
/// On mismatch the error names the entity kind, the keys that arrived and
/// the fields the entity declares.
pub fn parse<M: Model>(data: &Value) -> Result<M> {
    M::deserialize(data).map_err(|err| ApiError::ModelParsing {
        kind: M::KIND,
        received: match data {
            Value::Object(map) => map.keys().cloned().collect(),
            _ => Vec::new(),
        },
        expected: M::FIELDS.iter().map(|field| field.name).collect(),
        reason: err.to_string(),
    })
}

/// Encode an entity as a wire object, omitting absent fields.
pub fn serialize<M: Model>(entity: &M) -> Result<Map<String, Value>> {
    match serde_json::to_value(entity) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(other) => Err(ApiError::Transport(format!(
            "{} did not encode as a JSON object: {other}",
            M::KIND
        ))),
        Err(err) => Err(ApiError::Transport(format!("failed to encode {}: {err}", M::KIND))),
    }
}
