//! Value coercion between raw cell strings and typed record fields
//!
//! [`Field`] is the runtime stand-in for reflection: every type a record
//! exposes through its schema implements it, declaring its [`Kind`], how a
//! non-empty raw string is parsed into it and how it is stringified for export.
//!
//! # Coercion rules
//!
//! - An empty string resets the field to its zero value, for every kind
//! - Integers accept decimal, `0x`, `0o`, `0b` and leading-`0` octal literals
//!   with single underscores between digits, and fail with "value too big"
//!   when the destination width overflows
//! - Floats stringify in their shortest form, with an exponent below `1e-4`
//!   and from `1e21` up
//! - `Option<T>` is unwrapped: a non-empty value always yields `Some`
//! - Slices, maps and structs (including time types) have no default coercion
//!   and fail with "Unsupported kind"; they need a custom setter

use crate::types::CoercionError;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use rust_decimal::Decimal;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Broad category of a field type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Kind {
    Int,
    Uint,
    Float32,
    Float64,
    String,
    Bool,
    Decimal,
    Pointer,
    Struct,
    Slice,
    Map,
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Kind::Int => "int",
            Kind::Uint => "uint",
            Kind::Float32 => "float32",
            Kind::Float64 => "float64",
            Kind::String => "string",
            Kind::Bool => "bool",
            Kind::Decimal => "decimal",
            Kind::Pointer => "ptr",
            Kind::Struct => "struct",
            Kind::Slice => "slice",
            Kind::Map => "map",
        };
        f.write_str(name)
    }
}

/// A record field type the engine can assign and stringify
///
/// Implement this for custom field types to make them addressable by name.
/// The default `parse_into` rejects every value with `UnsupportedKind`, so
/// such fields still need a `Meta::setter` on import.
pub trait Field: Default + 'static {
    /// Category used in diagnostics
    fn kind() -> Kind;

    /// Parse a non-empty raw value into `self`
    fn parse_into(&mut self, raw: &str) -> Result<(), CoercionError> {
        let _ = raw;
        Err(CoercionError::unsupported(Self::kind()))
    }

    /// Best-effort string form used by the exporter and identity lookups
    fn format_value(&self) -> String;
}

/// Assign a raw string to a field using the default coercion rules
pub fn set_value_from_string<T: Field>(slot: &mut T, raw: &str) -> Result<(), CoercionError> {
    if raw.is_empty() {
        *slot = T::default();
        return Ok(());
    }

    slot.parse_into(raw)
}

/// Stringify a field using the default formatting rules
pub fn format_value<T: Field>(value: &T) -> String {
    value.format_value()
}

/// Split a literal into (negative, digits, radix) following base-prefix rules
fn split_radix(raw: &str, allow_sign: bool) -> Option<(bool, String, u32)> {
    let (negative, rest) = match raw.as_bytes().first() {
        Some(b'-') if allow_sign => (true, &raw[1..]),
        Some(b'+') if allow_sign => (false, &raw[1..]),
        _ => (false, raw),
    };

    let lower = rest.to_ascii_lowercase();
    let (digits, radix, prefixed) = if let Some(d) = lower.strip_prefix("0x") {
        (d, 16, true)
    } else if let Some(d) = lower.strip_prefix("0o") {
        (d, 8, true)
    } else if let Some(d) = lower.strip_prefix("0b") {
        (d, 2, true)
    } else if lower.len() > 1 && lower.starts_with('0') {
        (&lower[1..], 8, true)
    } else {
        (lower.as_str(), 10, false)
    };

    // underscores separate digits; only a base prefix may precede one directly
    let digits = if digits.contains('_') {
        if digits.ends_with('_')
            || digits.contains("__")
            || (!prefixed && digits.starts_with('_'))
        {
            return None;
        }
        digits.replace('_', "")
    } else {
        digits.to_string()
    };

    if digits.is_empty() || digits.starts_with(|c: char| c == '+' || c == '-') {
        return None;
    }

    Some((negative, digits, radix))
}

fn parse_unsigned(raw: &str) -> Result<u64, CoercionError> {
    let invalid = || CoercionError::InvalidUint {
        value: raw.to_string(),
    };
    let (_, digits, radix) = split_radix(raw, false).ok_or_else(invalid)?;

    u64::from_str_radix(&digits, radix).map_err(|e| match e.kind() {
        std::num::IntErrorKind::PosOverflow => CoercionError::UintTooBig {
            value: raw.to_string(),
        },
        _ => invalid(),
    })
}

fn parse_signed(raw: &str) -> Result<i64, CoercionError> {
    let invalid = || CoercionError::InvalidInt {
        value: raw.to_string(),
    };
    let too_big = || CoercionError::IntTooBig {
        value: raw.to_string(),
    };
    let (negative, digits, radix) = split_radix(raw, true).ok_or_else(invalid)?;

    let magnitude = u64::from_str_radix(&digits, radix).map_err(|e| match e.kind() {
        std::num::IntErrorKind::PosOverflow => too_big(),
        _ => invalid(),
    })?;

    if negative {
        0i64.checked_sub_unsigned(magnitude).ok_or_else(too_big)
    } else {
        i64::try_from(magnitude).map_err(|_| too_big())
    }
}

macro_rules! impl_signed_field {
    ($($t:ty),*) => {$(
        impl Field for $t {
            fn kind() -> Kind {
                Kind::Int
            }

            fn parse_into(&mut self, raw: &str) -> Result<(), CoercionError> {
                let wide = parse_signed(raw)?;
                *self = <$t>::try_from(wide).map_err(|_| CoercionError::IntTooBig {
                    value: raw.to_string(),
                })?;
                Ok(())
            }

            fn format_value(&self) -> String {
                self.to_string()
            }
        }
    )*};
}

macro_rules! impl_unsigned_field {
    ($($t:ty),*) => {$(
        impl Field for $t {
            fn kind() -> Kind {
                Kind::Uint
            }

            fn parse_into(&mut self, raw: &str) -> Result<(), CoercionError> {
                let wide = parse_unsigned(raw)?;
                *self = <$t>::try_from(wide).map_err(|_| CoercionError::UintTooBig {
                    value: raw.to_string(),
                })?;
                Ok(())
            }

            fn format_value(&self) -> String {
                self.to_string()
            }
        }
    )*};
}

impl_signed_field!(i8, i16, i32, i64, isize);
impl_unsigned_field!(u8, u16, u32, u64, usize);

/// Shortest float form, switching to an exponent outside `[1e-4, 1e21)`
///
/// The exponent carries a sign and at least two digits (`1e+21`, `1e-05`).
fn format_float(infinite: bool, negative: bool, plain: String, scientific: String) -> String {
    if infinite {
        return if negative { "-Inf" } else { "+Inf" }.to_string();
    }

    let Some((mantissa, exponent)) = scientific.split_once('e') else {
        return plain;
    };
    let Ok(exponent) = exponent.parse::<i32>() else {
        return plain;
    };
    if mantissa.trim_start_matches('-') == "0" || (-4..21).contains(&exponent) {
        return plain;
    }

    let sign = if exponent < 0 { '-' } else { '+' };
    format!("{}e{}{:02}", mantissa, sign, exponent.unsigned_abs())
}

macro_rules! impl_float_field {
    ($($t:ty => $kind:ident),*) => {$(
        impl Field for $t {
            fn kind() -> Kind {
                Kind::$kind
            }

            fn parse_into(&mut self, raw: &str) -> Result<(), CoercionError> {
                *self = raw.parse::<$t>().map_err(|_| CoercionError::InvalidFloat {
                    value: raw.to_string(),
                })?;
                Ok(())
            }

            fn format_value(&self) -> String {
                format_float(
                    self.is_infinite(),
                    self.is_sign_negative(),
                    self.to_string(),
                    format!("{:e}", self),
                )
            }
        }
    )*};
}

impl_float_field!(f32 => Float32, f64 => Float64);

impl Field for String {
    fn kind() -> Kind {
        Kind::String
    }

    fn parse_into(&mut self, raw: &str) -> Result<(), CoercionError> {
        raw.clone_into(self);
        Ok(())
    }

    fn format_value(&self) -> String {
        self.clone()
    }
}

impl Field for bool {
    fn kind() -> Kind {
        Kind::Bool
    }

    fn parse_into(&mut self, raw: &str) -> Result<(), CoercionError> {
        *self = match raw {
            "1" | "t" | "T" | "TRUE" | "true" | "True" => true,
            "0" | "f" | "F" | "FALSE" | "false" | "False" => false,
            _ => {
                return Err(CoercionError::InvalidBool {
                    value: raw.to_string(),
                })
            }
        };
        Ok(())
    }

    fn format_value(&self) -> String {
        self.to_string()
    }
}

impl Field for Decimal {
    fn kind() -> Kind {
        Kind::Decimal
    }

    fn parse_into(&mut self, raw: &str) -> Result<(), CoercionError> {
        *self = Decimal::from_str(raw).map_err(|_| CoercionError::InvalidDecimal {
            value: raw.to_string(),
        })?;
        Ok(())
    }

    fn format_value(&self) -> String {
        self.to_string()
    }
}

impl<T: Field> Field for Option<T> {
    fn kind() -> Kind {
        Kind::Pointer
    }

    fn parse_into(&mut self, raw: &str) -> Result<(), CoercionError> {
        let mut inner = T::default();
        set_value_from_string(&mut inner, raw)?;
        *self = Some(inner);
        Ok(())
    }

    fn format_value(&self) -> String {
        match self {
            Some(value) => value.format_value(),
            None => String::new(),
        }
    }
}

impl<T: Field> Field for Vec<T> {
    fn kind() -> Kind {
        Kind::Slice
    }

    fn format_value(&self) -> String {
        let items: Vec<String> = self.iter().map(Field::format_value).collect();
        format!("[{}]", items.join(" "))
    }
}

impl<T: Field> Field for BTreeMap<String, T> {
    fn kind() -> Kind {
        Kind::Map
    }

    fn format_value(&self) -> String {
        let entries: Vec<String> = self
            .iter()
            .map(|(k, v)| format!("{}:{}", k, v.format_value()))
            .collect();
        format!("map[{}]", entries.join(" "))
    }
}

impl Field for NaiveDate {
    fn kind() -> Kind {
        Kind::Struct
    }

    fn format_value(&self) -> String {
        self.to_string()
    }
}

impl Field for NaiveDateTime {
    fn kind() -> Kind {
        Kind::Struct
    }

    fn format_value(&self) -> String {
        self.to_string()
    }
}

impl Field for DateTime<Utc> {
    fn kind() -> Kind {
        Kind::Struct
    }

    fn format_value(&self) -> String {
        self.to_string()
    }
}
