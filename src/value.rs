//! Typed CIM values and the leaf Value Decoder (DSP0201 VALUE).
//!
//! Converts leaf text plus a CIM type tag into a typed value. The decoder
//! is strict: anything outside the lexical grammar of the declared type is
//! a decode error, out-of-range integers are range errors. Exactly one
//! documented server defect is tolerated here: empty boolean text decodes
//! to Null with a warning. Die Allowlist tolerierter Abweichungen bleibt
//! klein und wird nie stillschweigend erweitert.

use crate::datetime::CimDateTime;
use crate::model::{CimClass, CimInstance};
use crate::path::CimObjectPath;
use crate::types::CimType;
use crate::{Error, Result};

/// A typed CIM value.
#[derive(Debug, Clone, PartialEq)]
pub enum CimValue {
    Boolean(bool),
    String(String),
    /// Exactly one UTF-16 code unit (UCS-2 code point).
    Char16(char),
    Uint8(u8),
    Uint16(u16),
    Uint32(u32),
    Uint64(u64),
    Sint8(i8),
    Sint16(i16),
    Sint32(i32),
    Sint64(i64),
    Real32(f32),
    Real64(f64),
    DateTime(CimDateTime),
    /// Reference to an object path; the path is owned by value.
    Reference(CimObjectPath),
    /// A fully parsed embedded instance subtree (exclusively owned).
    EmbeddedInstance(Box<CimInstance>),
    /// A fully parsed embedded class subtree (exclusively owned).
    EmbeddedClass(Box<CimClass>),
    Null,
    /// Homogeneous array; elements share one CIM type (or are Null).
    Array(Vec<CimValue>),
}

impl CimValue {
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// The CIM type of a scalar value; `None` for Null, arrays and
    /// embedded objects (which are string-typed on the wire).
    pub fn cim_type(&self) -> Option<CimType> {
        Some(match self {
            Self::Boolean(_) => CimType::Boolean,
            Self::String(_) => CimType::String,
            Self::Char16(_) => CimType::Char16,
            Self::Uint8(_) => CimType::Uint8,
            Self::Uint16(_) => CimType::Uint16,
            Self::Uint32(_) => CimType::Uint32,
            Self::Uint64(_) => CimType::Uint64,
            Self::Sint8(_) => CimType::Sint8,
            Self::Sint16(_) => CimType::Sint16,
            Self::Sint32(_) => CimType::Sint32,
            Self::Sint64(_) => CimType::Sint64,
            Self::Real32(_) => CimType::Real32,
            Self::Real64(_) => CimType::Real64,
            Self::DateTime(_) => CimType::DateTime,
            Self::Reference(_) => CimType::Reference,
            Self::EmbeddedInstance(_) | Self::EmbeddedClass(_) | Self::Null | Self::Array(_) => {
                return None;
            }
        })
    }
}

/// Decodes leaf text against a declared CIM type.
pub fn decode_typed(text: &str, cim_type: CimType) -> Result<CimValue> {
    match cim_type {
        CimType::Boolean => decode_boolean(text),
        CimType::String => Ok(CimValue::String(text.to_string())),
        CimType::Char16 => decode_char16(text),
        CimType::DateTime => Ok(CimValue::DateTime(CimDateTime::parse(text.trim())?)),
        CimType::Real32 | CimType::Real64 => decode_real(text, cim_type),
        CimType::Reference => Err(Error::internal(
            "reference values are structural, not leaf text",
        )),
        _ => decode_integer(text, cim_type),
    }
}

/// Decodes keybinding text carrying only a VALUETYPE="numeric" hint:
/// no declared width, so the value keeps unconstrained semantics
/// (uint64/sint64 for integers, real64 for floats).
pub fn decode_untyped_number(text: &str) -> Result<CimValue> {
    let trimmed = text.trim();
    if looks_like_real(trimmed) {
        let real = parse_real_lexical(trimmed)?;
        return Ok(CimValue::Real64(real));
    }
    let wide = parse_integer_lexical(trimmed)?;
    if wide < 0 {
        i64::try_from(wide)
            .map(CimValue::Sint64)
            .map_err(|_| Error::Range {
                cim_type: CimType::Sint64,
                value: trimmed.to_string(),
            })
    } else {
        u64::try_from(wide)
            .map(CimValue::Uint64)
            .map_err(|_| Error::Range {
                cim_type: CimType::Uint64,
                value: trimmed.to_string(),
            })
    }
}

fn decode_boolean(text: &str) -> Result<CimValue> {
    let trimmed = text.trim();
    // Tolerated server defect: empty boolean text. Decodes to Null.
    if trimmed.is_empty() {
        log::warn!("tolerating empty boolean value text (known server defect)");
        return Ok(CimValue::Null);
    }
    if trimmed.eq_ignore_ascii_case("true") {
        Ok(CimValue::Boolean(true))
    } else if trimmed.eq_ignore_ascii_case("false") {
        Ok(CimValue::Boolean(false))
    } else {
        Err(Error::decode("boolean", trimmed))
    }
}

fn decode_char16(text: &str) -> Result<CimValue> {
    let mut chars = text.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) if (c as u32) <= 0xFFFF => Ok(CimValue::Char16(c)),
        _ => Err(Error::decode("char16", text)),
    }
}

fn decode_integer(text: &str, cim_type: CimType) -> Result<CimValue> {
    let trimmed = text.trim();
    let wide = parse_integer_lexical(trimmed)?;
    let (min, max) = cim_type
        .integer_bounds()
        .ok_or_else(|| Error::internal("decode_integer called with non-integer type"))?;
    if wide < min || wide > max {
        return Err(Error::Range {
            cim_type,
            value: trimmed.to_string(),
        });
    }
    Ok(match cim_type {
        CimType::Uint8 => CimValue::Uint8(wide as u8),
        CimType::Uint16 => CimValue::Uint16(wide as u16),
        CimType::Uint32 => CimValue::Uint32(wide as u32),
        CimType::Uint64 => CimValue::Uint64(wide as u64),
        CimType::Sint8 => CimValue::Sint8(wide as i8),
        CimType::Sint16 => CimValue::Sint16(wide as i16),
        CimType::Sint32 => CimValue::Sint32(wide as i32),
        CimType::Sint64 => CimValue::Sint64(wide as i64),
        _ => unreachable!("integer_bounds returned Some for non-integer type"),
    })
}

/// Integer lexical grammar (DSP0201 VALUE): optional sign, then decimal
/// digits or a `0x`/`0X` hex literal. i128 traegt alle Breiten.
fn parse_integer_lexical(text: &str) -> Result<i128> {
    let (negative, rest) = match text.as_bytes().first() {
        Some(b'-') => (true, &text[1..]),
        Some(b'+') => (false, &text[1..]),
        _ => (false, text),
    };
    let magnitude = if let Some(hex) = rest.strip_prefix("0x").or_else(|| rest.strip_prefix("0X"))
    {
        i128::from_str_radix(hex, 16).map_err(|_| Error::decode("integer", text))?
    } else {
        if rest.is_empty() || !rest.bytes().all(|b| b.is_ascii_digit()) {
            return Err(Error::decode("integer", text));
        }
        rest.parse::<i128>().map_err(|_| Error::decode("integer", text))?
    };
    Ok(if negative { -magnitude } else { magnitude })
}

fn decode_real(text: &str, cim_type: CimType) -> Result<CimValue> {
    let trimmed = text.trim();
    let value = parse_real_lexical(trimmed)?;
    Ok(match cim_type {
        CimType::Real32 => {
            let narrowed = value as f32;
            // A finite value must stay finite after narrowing.
            if value.is_finite() && !narrowed.is_finite() {
                return Err(Error::Range {
                    cim_type,
                    value: trimmed.to_string(),
                });
            }
            CimValue::Real32(narrowed)
        }
        _ => CimValue::Real64(value),
    })
}

/// Real lexical grammar (DSP0201 VALUE): optional sign, mandatory decimal
/// point, optional exponent; plus the literal Infinity/-Infinity/NaN tokens.
fn parse_real_lexical(text: &str) -> Result<f64> {
    match text {
        "Infinity" => return Ok(f64::INFINITY),
        "-Infinity" => return Ok(f64::NEG_INFINITY),
        "NaN" => return Ok(f64::NAN),
        _ => {}
    }
    let unsigned = text.strip_prefix(['-', '+']).unwrap_or(text);
    let mantissa = match unsigned.split_once(['e', 'E']) {
        Some((mantissa, exponent)) => {
            let exp_digits = exponent.strip_prefix(['-', '+']).unwrap_or(exponent);
            if exp_digits.is_empty() || !exp_digits.bytes().all(|b| b.is_ascii_digit()) {
                return Err(Error::decode("real", text));
            }
            mantissa
        }
        None => unsigned,
    };
    let Some((int_part, frac_part)) = mantissa.split_once('.') else {
        return Err(Error::decode("real", text));
    };
    if frac_part.is_empty()
        || !int_part.bytes().all(|b| b.is_ascii_digit())
        || !frac_part.bytes().all(|b| b.is_ascii_digit())
    {
        return Err(Error::decode("real", text));
    }
    text.parse::<f64>().map_err(|_| Error::decode("real", text))
}

fn looks_like_real(text: &str) -> bool {
    text.contains('.')
        || matches!(text, "Infinity" | "-Infinity" | "NaN")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn boolean_lexical_forms() {
        assert_eq!(
            decode_typed("TRUE", CimType::Boolean).unwrap(),
            CimValue::Boolean(true)
        );
        assert_eq!(
            decode_typed("false", CimType::Boolean).unwrap(),
            CimValue::Boolean(false)
        );
        assert_eq!(
            decode_typed("True", CimType::Boolean).unwrap(),
            CimValue::Boolean(true)
        );
        assert!(decode_typed("yes", CimType::Boolean).is_err());
    }

    #[test]
    fn empty_boolean_tolerated_as_null() {
        assert_eq!(
            decode_typed("", CimType::Boolean).unwrap(),
            CimValue::Null
        );
        assert_eq!(
            decode_typed("  ", CimType::Boolean).unwrap(),
            CimValue::Null
        );
    }

    #[test]
    fn uint8_boundaries() {
        assert_eq!(
            decode_typed("255", CimType::Uint8).unwrap(),
            CimValue::Uint8(255)
        );
        assert_eq!(
            decode_typed("0xFF", CimType::Uint8).unwrap(),
            CimValue::Uint8(255)
        );
        let err = decode_typed("256", CimType::Uint8).unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::Range);
        let err = decode_typed("-1", CimType::Uint8).unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::Range);
    }

    #[test]
    fn signed_boundaries_and_hex() {
        assert_eq!(
            decode_typed("-128", CimType::Sint8).unwrap(),
            CimValue::Sint8(-128)
        );
        assert!(decode_typed("-129", CimType::Sint8).is_err());
        assert_eq!(
            decode_typed("-0x80", CimType::Sint8).unwrap(),
            CimValue::Sint8(-128)
        );
        assert_eq!(
            decode_typed("18446744073709551615", CimType::Uint64).unwrap(),
            CimValue::Uint64(u64::MAX)
        );
    }

    #[test]
    fn integer_garbage_is_decode_error() {
        for s in ["", "12a", "0x", "++1", "1 2"] {
            let err = decode_typed(s, CimType::Uint32).unwrap_err();
            assert_eq!(err.kind(), crate::ErrorKind::Decode, "{s:?}");
        }
    }

    #[test]
    fn real_lexical_forms() {
        assert_eq!(
            decode_typed("1.5", CimType::Real64).unwrap(),
            CimValue::Real64(1.5)
        );
        assert_eq!(
            decode_typed("-0.25e2", CimType::Real64).unwrap(),
            CimValue::Real64(-25.0)
        );
        assert_eq!(
            decode_typed(".5", CimType::Real64).unwrap(),
            CimValue::Real64(0.5)
        );
        assert_eq!(
            decode_typed("Infinity", CimType::Real64).unwrap(),
            CimValue::Real64(f64::INFINITY)
        );
        assert_eq!(
            decode_typed("-Infinity", CimType::Real32).unwrap(),
            CimValue::Real32(f32::NEG_INFINITY)
        );
        // NaN != NaN; check the variant instead.
        match decode_typed("NaN", CimType::Real64).unwrap() {
            CimValue::Real64(v) => assert!(v.is_nan()),
            other => panic!("expected Real64 NaN, got {other:?}"),
        }
    }

    #[test]
    fn real32_narrowing_overflow_is_range_error() {
        // Finite in f64, infinite after narrowing to f32.
        let err = decode_typed("3.5e38", CimType::Real32).unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::Range);
        let err = decode_typed("-3.5e38", CimType::Real32).unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::Range);
        // The same lexeme is fine at real64 width, and the explicit
        // non-finite tokens stay legal at real32.
        assert_eq!(
            decode_typed("3.5e38", CimType::Real64).unwrap(),
            CimValue::Real64(3.5e38)
        );
        assert_eq!(
            decode_typed("Infinity", CimType::Real32).unwrap(),
            CimValue::Real32(f32::INFINITY)
        );
    }

    #[test]
    fn real_requires_decimal_point() {
        assert!(decode_typed("15", CimType::Real64).is_err());
        assert!(decode_typed("1e5", CimType::Real64).is_err());
        assert!(decode_typed("1.", CimType::Real64).is_err());
        assert!(decode_typed("1.5e", CimType::Real64).is_err());
    }

    #[test]
    fn char16_exactly_one_unit() {
        assert_eq!(
            decode_typed("A", CimType::Char16).unwrap(),
            CimValue::Char16('A')
        );
        assert!(decode_typed("", CimType::Char16).is_err());
        assert!(decode_typed("AB", CimType::Char16).is_err());
        // Outside UCS-2 (needs a surrogate pair in UTF-16).
        assert!(decode_typed("\u{1F600}", CimType::Char16).is_err());
    }

    #[test]
    fn string_passthrough_keeps_whitespace() {
        assert_eq!(
            decode_typed("  a b  ", CimType::String).unwrap(),
            CimValue::String("  a b  ".into())
        );
    }

    #[test]
    fn untyped_number_semantics() {
        assert_eq!(
            decode_untyped_number("1234").unwrap(),
            CimValue::Uint64(1234)
        );
        assert_eq!(
            decode_untyped_number("-7").unwrap(),
            CimValue::Sint64(-7)
        );
        assert_eq!(
            decode_untyped_number("2.5").unwrap(),
            CimValue::Real64(2.5)
        );
        assert_eq!(
            decode_untyped_number("18446744073709551615").unwrap(),
            CimValue::Uint64(u64::MAX)
        );
    }
}
