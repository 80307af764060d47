//! CIM type tags as carried by TYPE/PARAMTYPE attributes (DSP0201).
//!
//! The CIM type system overlays the XML lexical layer: a TYPE attribute tags
//! leaf text with one of thirteen intrinsic types plus `reference`. The tag
//! names on the wire are the lowercase MOF keywords.

use core::fmt;

/// The intrinsic CIM types (DSP0004 intrinsic data types + reference).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CimType {
    Boolean,
    String,
    Char16,
    Uint8,
    Uint16,
    Uint32,
    Uint64,
    Sint8,
    Sint16,
    Sint32,
    Sint64,
    Real32,
    Real64,
    DateTime,
    /// Only legal as PARAMTYPE; properties use PROPERTY.REFERENCE instead.
    Reference,
}

impl CimType {
    /// Parses a TYPE/PARAMTYPE attribute value. The wire keywords are
    /// fixed lowercase; anything else is not a CIM type.
    pub fn from_attr(s: &str) -> Option<Self> {
        Some(match s {
            "boolean" => Self::Boolean,
            "string" => Self::String,
            "char16" => Self::Char16,
            "uint8" => Self::Uint8,
            "uint16" => Self::Uint16,
            "uint32" => Self::Uint32,
            "uint64" => Self::Uint64,
            "sint8" => Self::Sint8,
            "sint16" => Self::Sint16,
            "sint32" => Self::Sint32,
            "sint64" => Self::Sint64,
            "real32" => Self::Real32,
            "real64" => Self::Real64,
            "datetime" => Self::DateTime,
            "reference" => Self::Reference,
            _ => return None,
        })
    }

    /// The wire keyword (also the MOF keyword).
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Boolean => "boolean",
            Self::String => "string",
            Self::Char16 => "char16",
            Self::Uint8 => "uint8",
            Self::Uint16 => "uint16",
            Self::Uint32 => "uint32",
            Self::Uint64 => "uint64",
            Self::Sint8 => "sint8",
            Self::Sint16 => "sint16",
            Self::Sint32 => "sint32",
            Self::Sint64 => "sint64",
            Self::Real32 => "real32",
            Self::Real64 => "real64",
            Self::DateTime => "datetime",
            Self::Reference => "reference",
        }
    }

    pub fn is_integer(self) -> bool {
        self.integer_bounds().is_some()
    }

    pub fn is_real(self) -> bool {
        matches!(self, Self::Real32 | Self::Real64)
    }

    /// Inclusive value range for the integer types, `None` for the rest.
    /// i128 deckt alle vier Breiten in beiden Vorzeichen ab.
    pub fn integer_bounds(self) -> Option<(i128, i128)> {
        Some(match self {
            Self::Uint8 => (0, u8::MAX as i128),
            Self::Uint16 => (0, u16::MAX as i128),
            Self::Uint32 => (0, u32::MAX as i128),
            Self::Uint64 => (0, u64::MAX as i128),
            Self::Sint8 => (i8::MIN as i128, i8::MAX as i128),
            Self::Sint16 => (i16::MIN as i128, i16::MAX as i128),
            Self::Sint32 => (i32::MIN as i128, i32::MAX as i128),
            Self::Sint64 => (i64::MIN as i128, i64::MAX as i128),
            _ => return None,
        })
    }
}

impl fmt::Display for CimType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
