//! # Folder Codec
//!
//! Ecco stores every folder value as a flat string. This module converts
//! between those wire strings and native [`Value`]s, one rule set per
//! [`FolderType`].
//!
//! | Type | Native | Wire |
//! |------|--------|------|
//! | `Text`, `PopupList` | `Text` | identity |
//! | `Checkmark` | `Bool` | `""` / marker (default `"1"`) |
//! | `Date` | `Date`, `DateTime` | `YYYYMMDD`, `YYYYMMDDHHMM` |
//! | `Number` | `Int`, `Decimal` | exact decimal string |
//!
//! For every type the empty string means "no value": it decodes to
//! [`Value::None`] (or `Bool(false)` for checkmarks) and `Value::None`
//! encodes to it.
//!
//! Decoding never substitutes a default for a malformed wire value; it
//! fails with [`EccoError::Decode`].

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{EccoError, Result};
use crate::model::ItemId;

/// Marker written for a set checkmark unless configured otherwise.
pub const DEFAULT_CHECKMARK: &str = "1";

/// The type of a folder, fixed when the folder is created.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FolderType {
    Text,
    PopupList,
    Checkmark,
    Date,
    Number,
}

impl fmt::Display for FolderType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FolderType::Text => "Text",
            FolderType::PopupList => "Popup",
            FolderType::Checkmark => "Checkmark",
            FolderType::Date => "Date",
            FolderType::Number => "Number",
        };
        f.write_str(name)
    }
}

/// Native value of an item attribute.
///
/// `Ref` and `Refs` only travel through link attributes (`parent`,
/// `children`); the folder codec rejects them.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    None,
    Text(String),
    Bool(bool),
    Int(i64),
    Decimal(Decimal),
    Date(NaiveDate),
    DateTime(NaiveDateTime),
    Ref(ItemId),
    Refs(Vec<ItemId>),
}

impl Value {
    pub fn is_none(&self) -> bool {
        matches!(self, Value::None)
    }

    /// Truthiness as used by checkmark folders.
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::None => false,
            Value::Text(s) => !s.is_empty(),
            Value::Bool(b) => *b,
            Value::Int(n) => *n != 0,
            Value::Decimal(d) => !d.is_zero(),
            Value::Date(_) | Value::DateTime(_) | Value::Ref(_) => true,
            Value::Refs(ids) => !ids.is_empty(),
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_decimal(&self) -> Option<Decimal> {
        match self {
            Value::Decimal(d) => Some(*d),
            Value::Int(n) => Some(Decimal::from(*n)),
            _ => None,
        }
    }

    pub fn as_date(&self) -> Option<NaiveDate> {
        match self {
            Value::Date(d) => Some(*d),
            Value::DateTime(dt) => Some(dt.date()),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::None => f.write_str("None"),
            Value::Text(s) => write!(f, "{:?}", s),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Int(n) => write!(f, "{}", n),
            Value::Decimal(d) => write!(f, "{}", d),
            Value::Date(d) => write!(f, "{}", d),
            Value::DateTime(dt) => write!(f, "{}", dt),
            Value::Ref(id) => write!(f, "item {}", id),
            Value::Refs(ids) => write!(f, "items {:?}", ids),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Int(n)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Int(n.into())
    }
}

impl From<Decimal> for Value {
    fn from(d: Decimal) -> Self {
        Value::Decimal(d)
    }
}

impl From<NaiveDate> for Value {
    fn from(d: NaiveDate) -> Self {
        Value::Date(d)
    }
}

impl From<NaiveDateTime> for Value {
    fn from(dt: NaiveDateTime) -> Self {
        Value::DateTime(dt)
    }
}

impl From<ItemId> for Value {
    fn from(id: ItemId) -> Self {
        Value::Ref(id)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(Value::None)
    }
}

impl FolderType {
    /// Encode with the default checkmark marker.
    pub fn encode(&self, value: &Value) -> Result<String> {
        self.encode_with(value, DEFAULT_CHECKMARK)
    }

    /// Encode `value` into this folder type's wire form.
    pub fn encode_with(&self, value: &Value, checkmark: &str) -> Result<String> {
        match self {
            FolderType::Text | FolderType::PopupList => encode_text(*self, value),
            FolderType::Checkmark => Ok(if value.is_truthy() {
                checkmark.to_string()
            } else {
                String::new()
            }),
            FolderType::Date => encode_date(value),
            FolderType::Number => encode_number(value),
        }
    }

    /// Decode a wire string into a native value.
    pub fn decode(&self, wire: &str) -> Result<Value> {
        match self {
            FolderType::Text | FolderType::PopupList => Ok(if wire.is_empty() {
                Value::None
            } else {
                Value::Text(wire.to_string())
            }),
            FolderType::Checkmark => Ok(Value::Bool(!wire.is_empty())),
            FolderType::Date => decode_date(wire),
            FolderType::Number => decode_number(wire),
        }
    }
}

fn encode_error(kind: FolderType, value: &Value) -> EccoError {
    EccoError::Encode {
        kind,
        value: value.to_string(),
    }
}

fn encode_text(kind: FolderType, value: &Value) -> Result<String> {
    match value {
        Value::None => Ok(String::new()),
        Value::Text(s) => Ok(s.clone()),
        Value::Int(n) => Ok(n.to_string()),
        Value::Decimal(d) => Ok(d.to_string()),
        other => Err(encode_error(kind, other)),
    }
}

fn encode_date(value: &Value) -> Result<String> {
    match value {
        Value::None => Ok(String::new()),
        Value::Date(d) => Ok(d.format("%Y%m%d").to_string()),
        Value::DateTime(dt) => Ok(dt.format("%Y%m%d%H%M").to_string()),
        // Already in wire form
        Value::Text(s) => Ok(s.clone()),
        other => Err(encode_error(FolderType::Date, other)),
    }
}

fn encode_number(value: &Value) -> Result<String> {
    match value {
        Value::None => Ok(String::new()),
        Value::Int(n) => Ok(n.to_string()),
        Value::Decimal(d) => Ok(d.to_string()),
        Value::Text(s) => Decimal::from_str(s.trim())
            .map(|d| d.to_string())
            .map_err(|_| encode_error(FolderType::Number, value)),
        other => Err(encode_error(FolderType::Number, other)),
    }
}

fn decode_error(kind: FolderType, wire: &str, reason: impl Into<String>) -> EccoError {
    EccoError::Decode {
        kind,
        value: wire.to_string(),
        reason: reason.into(),
    }
}

fn digits(wire: &str, range: std::ops::Range<usize>) -> Result<u32> {
    let part = &wire[range];
    if !part.bytes().all(|b| b.is_ascii_digit()) {
        return Err(decode_error(FolderType::Date, wire, "non-numeric field"));
    }
    part.parse()
        .map_err(|_| decode_error(FolderType::Date, wire, "non-numeric field"))
}

fn decode_date(wire: &str) -> Result<Value> {
    if wire.is_empty() {
        return Ok(Value::None);
    }
    if !wire.is_ascii() || (wire.len() != 8 && wire.len() != 12) {
        return Err(decode_error(
            FolderType::Date,
            wire,
            "expected YYYYMMDD or YYYYMMDDHHMM",
        ));
    }

    let (y, m, d) = (digits(wire, 0..4)?, digits(wire, 4..6)?, digits(wire, 6..8)?);
    let date = NaiveDate::from_ymd_opt(y as i32, m, d)
        .ok_or_else(|| decode_error(FolderType::Date, wire, "date out of range"))?;
    if wire.len() == 8 {
        return Ok(Value::Date(date));
    }

    let (h, min) = (digits(wire, 8..10)?, digits(wire, 10..12)?);
    let time = NaiveTime::from_hms_opt(h, min, 0)
        .ok_or_else(|| decode_error(FolderType::Date, wire, "time out of range"))?;
    Ok(Value::DateTime(date.and_time(time)))
}

fn decode_number(wire: &str) -> Result<Value> {
    if wire.is_empty() {
        return Ok(Value::None);
    }
    if wire.contains('.') {
        Decimal::from_str(wire)
            .map(Value::Decimal)
            .map_err(|e| decode_error(FolderType::Number, wire, e.to_string()))
    } else {
        wire.parse::<i64>()
            .map(Value::Int)
            .map_err(|e| decode_error(FolderType::Number, wire, e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn empty_string_decodes_to_absent_for_every_type() {
        assert_eq!(FolderType::Text.decode("").unwrap(), Value::None);
        assert_eq!(FolderType::PopupList.decode("").unwrap(), Value::None);
        assert_eq!(FolderType::Checkmark.decode("").unwrap(), Value::Bool(false));
        assert_eq!(FolderType::Date.decode("").unwrap(), Value::None);
        assert_eq!(FolderType::Number.decode("").unwrap(), Value::None);
    }

    #[test]
    fn none_encodes_to_empty_for_every_type() {
        for kind in [
            FolderType::Text,
            FolderType::PopupList,
            FolderType::Checkmark,
            FolderType::Date,
            FolderType::Number,
        ] {
            assert_eq!(kind.encode(&Value::None).unwrap(), "", "{}", kind);
        }
    }

    #[test]
    fn text_is_identity() {
        let wire = FolderType::Text.encode(&"hello".into()).unwrap();
        assert_eq!(wire, "hello");
        assert_eq!(FolderType::Text.decode(&wire).unwrap(), Value::from("hello"));
    }

    #[test]
    fn text_rejects_dates() {
        let err = FolderType::Text.encode(&date(2024, 1, 1).into()).unwrap_err();
        assert!(matches!(err, EccoError::Encode { .. }));
    }

    #[test]
    fn checkmark_normalizes_truthy_values() {
        for v in [Value::Bool(true), Value::Int(3), Value::from("yes")] {
            assert_eq!(FolderType::Checkmark.encode(&v).unwrap(), "1");
        }
        for v in [Value::Bool(false), Value::Int(0), Value::from(""), Value::None] {
            assert_eq!(FolderType::Checkmark.encode(&v).unwrap(), "");
        }
        assert_eq!(FolderType::Checkmark.decode("1").unwrap(), Value::Bool(true));
        assert_eq!(FolderType::Checkmark.decode("x").unwrap(), Value::Bool(true));
    }

    #[test]
    fn checkmark_uses_configured_marker() {
        let wire = FolderType::Checkmark
            .encode_with(&Value::Bool(true), "X")
            .unwrap();
        assert_eq!(wire, "X");
    }

    #[test]
    fn date_round_trip() {
        let d = date(2024, 3, 5);
        let wire = FolderType::Date.encode(&d.into()).unwrap();
        assert_eq!(wire, "20240305");
        assert_eq!(FolderType::Date.decode(&wire).unwrap(), Value::Date(d));
    }

    #[test]
    fn datetime_round_trip() {
        let dt = date(2024, 3, 5).and_hms_opt(13, 30, 0).unwrap();
        let wire = FolderType::Date.encode(&dt.into()).unwrap();
        assert_eq!(wire, "202403051330");
        assert_eq!(FolderType::Date.decode(&wire).unwrap(), Value::DateTime(dt));
    }

    #[test]
    fn date_passes_wire_text_through() {
        let wire = FolderType::Date.encode(&"20240101".into()).unwrap();
        assert_eq!(wire, "20240101");
    }

    #[test]
    fn malformed_dates_fail_loudly() {
        for wire in ["2024", "2024030", "2024AB05", "20241305", "202403051", "202403052561"] {
            let err = FolderType::Date.decode(wire).unwrap_err();
            assert!(matches!(err, EccoError::Decode { .. }), "{}", wire);
        }
    }

    #[test]
    fn number_preserves_decimal_scale() {
        let d = Decimal::from_str("10.50").unwrap();
        let wire = FolderType::Number.encode(&d.into()).unwrap();
        assert_eq!(wire, "10.50");
        let decoded = FolderType::Number.decode(&wire).unwrap();
        assert_eq!(decoded, Value::Decimal(d));
        assert_eq!(decoded.to_string(), "10.50");
    }

    #[test]
    fn number_keeps_integers_integral() {
        let wire = FolderType::Number.encode(&Value::Int(7)).unwrap();
        assert_eq!(wire, "7");
        assert_eq!(FolderType::Number.decode(&wire).unwrap(), Value::Int(7));
    }

    #[test]
    fn number_parses_text_input() {
        assert_eq!(FolderType::Number.encode(&"2.25".into()).unwrap(), "2.25");
        assert!(FolderType::Number.encode(&"abc".into()).is_err());
    }

    #[test]
    fn malformed_numbers_fail_loudly() {
        assert!(FolderType::Number.decode("12a").is_err());
        assert!(FolderType::Number.decode("1.2.3").is_err());
    }

    #[test]
    fn links_are_not_encodable() {
        let err = FolderType::Number.encode(&Value::Ref(ItemId(1))).unwrap_err();
        assert!(matches!(err, EccoError::Encode { .. }));
    }
}
