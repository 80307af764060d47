//! Central error types for the CIM-XML codec.
//!
//! The taxonomy follows the protocol layering: XML syntax errors sit below
//! the element grammar (DSP0201), grammar errors cover well-formed XML that
//! violates the CIM-XML element structure, decode/range errors cover leaf
//! text that cannot be coerced to its declared CIM type, and server errors
//! carry the ERROR element of an operation response (DSP0200 5.4).
//!
//! Every variant maps to exactly one [`ErrorKind`]; tests assert the kind
//! rather than matching variants, so variants can be refined without
//! breaking the classification contract.

use core::fmt;
use std::borrow::Cow;

use crate::model::CimError;
use crate::types::CimType;

/// All error conditions raised by the codec.
#[derive(Debug, Clone)]
#[non_exhaustive]
pub enum Error {
    /// Malformed XML markup below the element-grammar level. Never retried.
    XmlSyntax(String),
    /// An element other than the expected one was encountered (DSP0201 element grammar).
    UnexpectedElement {
        /// Was erwartet wurde, z.B. "INSTANCE start" oder "end of CLASS".
        expected: Cow<'static, str>,
        /// Was gefunden wurde, z.B. "CLASS start" oder "end of document".
        found: Cow<'static, str>,
    },
    /// A child element that the parent's content model does not allow.
    UnexpectedChild { parent: String, child: String },
    /// A required child element is missing from its parent.
    MissingChild { parent: String },
    /// A required attribute is absent.
    MissingAttribute {
        element: Cow<'static, str>,
        attribute: Cow<'static, str>,
    },
    /// An attribute the element's grammar does not allow.
    UnexpectedAttribute {
        element: Cow<'static, str>,
        attribute: String,
    },
    /// An attribute whose value is outside its legal enumeration.
    InvalidAttributeValue {
        element: Cow<'static, str>,
        attribute: Cow<'static, str>,
        value: String,
    },
    /// Non-whitespace character content on an element that must be empty.
    UnexpectedContent {
        element: Cow<'static, str>,
        text: String,
    },
    /// Non-whitespace character data between elements (trailing text).
    StrayText(String),
    /// A version attribute whose major component does not match the gate
    /// (CIMVERSION/DTDVERSION major "2", PROTOCOLVERSION major "1").
    VersionMismatch {
        attribute: &'static str,
        value: String,
        want_major: &'static str,
    },
    /// The NAME of the (I)METHODRESPONSE does not match the requested
    /// operation. Catches request/response desync on the connection.
    OperationMismatch { requested: String, answered: String },
    /// An output parameter the operation's response shape does not define
    /// (closed-world table, DSP0200 intrinsic method catalogue).
    UnexpectedParameter { operation: String, parameter: String },
    /// Required output parameters absent after the parameter run ended.
    /// Batched: all missing names are reported together.
    MissingParameters {
        operation: String,
        parameters: Vec<String>,
    },
    /// A declared TYPE attribute disagrees with the statically known type
    /// for its context. Never silently coerced.
    TypeMismatch {
        element: Cow<'static, str>,
        declared: CimType,
        expected: CimType,
    },
    /// Leaf text that cannot be coerced to its declared/contextual CIM type.
    Decode { what: &'static str, value: String },
    /// A numeric value outside the range of its declared width.
    Range { cim_type: CimType, value: String },
    /// A malformed embedded-object sub-document. Names the enclosing
    /// property so the failure is distinct from the outer parse's errors.
    EmbeddedParse { property: String, source: Box<Error> },
    /// Embedded-object nesting exceeded the recursion-depth cap.
    EmbeddedDepth { property: String, limit: usize },
    /// The server's own reported failure (ERROR element, DSP0200 5.4).
    /// Deferred until the envelope is structurally validated.
    Server(Box<CimError>),
    /// Programmer defect (e.g. double putback), not a protocol defect.
    Internal(Cow<'static, str>),
}

/// Coarse classification of [`Error`] variants, one class per taxonomy entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    XmlSyntax,
    Grammar,
    Decode,
    Range,
    Server,
    Internal,
}

impl Error {
    /// Klassifiziert den Fehler. `EmbeddedParse` delegiert an den inneren
    /// Fehler, damit z.B. ein Range-Fehler im eingebetteten Dokument auch
    /// als Range-Fehler zaehlt.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::XmlSyntax(_) => ErrorKind::XmlSyntax,
            Self::Decode { .. } | Self::EmbeddedDepth { .. } => ErrorKind::Decode,
            Self::Range { .. } => ErrorKind::Range,
            Self::Server(_) => ErrorKind::Server,
            Self::Internal(_) => ErrorKind::Internal,
            Self::EmbeddedParse { source, .. } => source.kind(),
            _ => ErrorKind::Grammar,
        }
    }

    /// Erstellt einen `UnexpectedElement` Fehler mit Kontext.
    pub fn unexpected_element(
        expected: impl Into<Cow<'static, str>>,
        found: impl Into<Cow<'static, str>>,
    ) -> Self {
        Self::UnexpectedElement {
            expected: expected.into(),
            found: found.into(),
        }
    }

    /// Erstellt einen `Decode` Fehler fuer einen Leaf-Wert.
    pub fn decode(what: &'static str, value: impl Into<String>) -> Self {
        Self::Decode {
            what,
            value: value.into(),
        }
    }

    /// Erstellt einen `Internal` Fehler.
    pub fn internal(msg: impl Into<Cow<'static, str>>) -> Self {
        Self::Internal(msg.into())
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::XmlSyntax(msg) => write!(f, "XML syntax error: {msg}"),
            Self::UnexpectedElement { expected, found } => {
                write!(f, "expected {expected}, got {found} (DSP0201)")
            }
            Self::UnexpectedChild { parent, child } => {
                write!(f, "unexpected child element {child} in {parent} (DSP0201)")
            }
            Self::MissingChild { parent } => {
                write!(f, "required child element missing in {parent} (DSP0201)")
            }
            Self::MissingAttribute { element, attribute } => {
                write!(f, "missing required attribute {attribute} on {element} (DSP0201)")
            }
            Self::UnexpectedAttribute { element, attribute } => {
                write!(f, "unexpected attribute {attribute} on {element} (DSP0201)")
            }
            Self::InvalidAttributeValue {
                element,
                attribute,
                value,
            } => write!(
                f,
                "invalid value '{value}' for attribute {attribute} on {element} (DSP0201)"
            ),
            Self::UnexpectedContent { element, text } => {
                write!(f, "unexpected content '{text}' in {element} (DSP0201)")
            }
            Self::StrayText(text) => {
                write!(f, "non-whitespace text '{text}' between elements (DSP0201)")
            }
            Self::VersionMismatch {
                attribute,
                value,
                want_major,
            } => write!(
                f,
                "unsupported {attribute} '{value}', major version {want_major} required"
            ),
            Self::OperationMismatch {
                requested,
                answered,
            } => write!(
                f,
                "response names operation '{answered}' but '{requested}' was requested"
            ),
            Self::UnexpectedParameter {
                operation,
                parameter,
            } => write!(
                f,
                "output parameter '{parameter}' is not defined for {operation} (DSP0200)"
            ),
            Self::MissingParameters {
                operation,
                parameters,
            } => write!(
                f,
                "required output parameters missing for {operation}: {}",
                parameters.join(", ")
            ),
            Self::TypeMismatch {
                element,
                declared,
                expected,
            } => write!(
                f,
                "TYPE '{declared}' on {element} disagrees with expected '{expected}'"
            ),
            Self::Decode { what, value } => {
                write!(f, "cannot decode '{value}' as {what}")
            }
            Self::Range { cim_type, value } => {
                write!(f, "value '{value}' out of range for {cim_type}")
            }
            Self::EmbeddedParse { property, source } => {
                write!(f, "embedded object in property '{property}': {source}")
            }
            Self::EmbeddedDepth { property, limit } => write!(
                f,
                "embedded object in property '{property}' exceeds nesting limit {limit}"
            ),
            Self::Server(err) => write!(f, "{err}"),
            Self::Internal(msg) => write!(f, "internal error: {msg}"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::EmbeddedParse { source, .. } => Some(source.as_ref()),
            _ => None,
        }
    }
}

/// A convenience `Result` type alias using [`Error`].
pub type Result<T> = core::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unexpected_element_display() {
        let e = Error::unexpected_element("INSTANCE start", "CLASS start");
        let msg = e.to_string();
        assert!(msg.contains("expected INSTANCE start"), "{msg}");
        assert!(msg.contains("got CLASS start"), "{msg}");
        assert_eq!(e.kind(), ErrorKind::Grammar);
    }

    #[test]
    fn missing_parameters_batched_display() {
        let e = Error::MissingParameters {
            operation: "OpenEnumerateInstances".into(),
            parameters: vec!["EnumerationContext".into(), "EndOfSequence".into()],
        };
        let msg = e.to_string();
        assert!(msg.contains("EnumerationContext, EndOfSequence"), "{msg}");
        assert_eq!(e.kind(), ErrorKind::Grammar);
    }

    #[test]
    fn range_classification() {
        let e = Error::Range {
            cim_type: CimType::Uint8,
            value: "256".into(),
        };
        assert_eq!(e.kind(), ErrorKind::Range);
        assert!(e.to_string().contains("uint8"));
    }

    #[test]
    fn embedded_parse_delegates_kind() {
        let inner = Error::Range {
            cim_type: CimType::Uint8,
            value: "300".into(),
        };
        let e = Error::EmbeddedParse {
            property: "Config".into(),
            source: Box::new(inner),
        };
        assert_eq!(e.kind(), ErrorKind::Range);
        assert!(e.to_string().contains("Config"));
    }

    #[test]
    fn internal_classification() {
        assert_eq!(
            Error::internal("double putback").kind(),
            ErrorKind::Internal
        );
    }
}
