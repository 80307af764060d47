//! The typed CIM object model produced by a parse (DSP0004 meta schema,
//! DSP0201 wire representation).
//!
//! All entities are plain data created fresh per parse; there is no
//! mutation after construction and no server-side identity tracking.
//! Property/method/parameter/qualifier collections are ordered maps with
//! case-insensitive name lookup.

use core::fmt;

use crate::nocase::NocaseMap;
use crate::path::CimInstanceName;
use crate::types::CimType;
use crate::value::CimValue;

/// Qualifier flavor bits with their DTD defaults (DSP0201 QUALIFIER).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QualifierFlavor {
    pub overridable: bool,
    pub tosubclass: bool,
    pub toinstance: bool,
    pub translatable: bool,
}

impl Default for QualifierFlavor {
    fn default() -> Self {
        Self {
            overridable: true,
            tosubclass: true,
            toinstance: false,
            translatable: false,
        }
    }
}

/// CIM metadata attached to classes, properties, methods and parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct CimQualifier {
    pub name: String,
    pub cim_type: CimType,
    pub value: CimValue,
    pub propagated: bool,
    pub flavor: QualifierFlavor,
}

impl CimQualifier {
    pub fn new(name: impl Into<String>, cim_type: CimType, value: CimValue) -> Self {
        Self {
            name: name.into(),
            cim_type,
            value,
            propagated: false,
            flavor: QualifierFlavor::default(),
        }
    }
}

/// Welche EmbeddedObject-Auspraegung eine Property/ein Parameter traegt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmbeddedObjectKind {
    /// `EmbeddedObject="instance"`: value is a serialized CIM instance.
    Instance,
    /// `EmbeddedObject="object"`: value is a serialized instance or class.
    Object,
}

impl EmbeddedObjectKind {
    pub fn as_attr(self) -> &'static str {
        match self {
            Self::Instance => "instance",
            Self::Object => "object",
        }
    }
}

/// A class or instance property (scalar, array or reference).
#[derive(Debug, Clone, PartialEq)]
pub struct CimProperty {
    pub name: String,
    pub cim_type: CimType,
    pub value: CimValue,
    pub is_array: bool,
    pub array_size: Option<u32>,
    /// Set for reference-typed properties instead of a value type attribute.
    pub reference_class: Option<String>,
    pub class_origin: Option<String>,
    pub propagated: bool,
    /// Embedded-object marker; the wire type of such a property is string.
    pub embedded_object: Option<EmbeddedObjectKind>,
    pub qualifiers: NocaseMap<CimQualifier>,
}

impl CimProperty {
    pub fn new(name: impl Into<String>, cim_type: CimType, value: CimValue) -> Self {
        Self {
            name: name.into(),
            cim_type,
            value,
            is_array: false,
            array_size: None,
            reference_class: None,
            class_origin: None,
            propagated: false,
            embedded_object: None,
            qualifiers: NocaseMap::new(),
        }
    }
}

/// A method parameter declaration (scalar, array, reference or ref array).
#[derive(Debug, Clone, PartialEq)]
pub struct CimParameter {
    pub name: String,
    pub cim_type: CimType,
    pub is_array: bool,
    pub array_size: Option<u32>,
    pub reference_class: Option<String>,
    pub qualifiers: NocaseMap<CimQualifier>,
}

impl CimParameter {
    pub fn new(name: impl Into<String>, cim_type: CimType) -> Self {
        Self {
            name: name.into(),
            cim_type,
            is_array: false,
            array_size: None,
            reference_class: None,
            qualifiers: NocaseMap::new(),
        }
    }
}

/// A method declaration on a class.
#[derive(Debug, Clone, PartialEq)]
pub struct CimMethod {
    pub name: String,
    /// Declared return type; `None` when the METHOD carries no TYPE.
    pub return_type: Option<CimType>,
    pub class_origin: Option<String>,
    pub propagated: bool,
    pub parameters: NocaseMap<CimParameter>,
    pub qualifiers: NocaseMap<CimQualifier>,
}

impl CimMethod {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            return_type: None,
            class_origin: None,
            propagated: false,
            parameters: NocaseMap::new(),
            qualifiers: NocaseMap::new(),
        }
    }
}

/// A CIM class definition.
#[derive(Debug, Clone, PartialEq)]
pub struct CimClass {
    pub classname: String,
    pub superclass: Option<String>,
    pub qualifiers: NocaseMap<CimQualifier>,
    pub properties: NocaseMap<CimProperty>,
    pub methods: NocaseMap<CimMethod>,
    /// Class path, present when the class arrived with CLASSPATH context.
    pub path: Option<crate::path::CimClassName>,
}

impl CimClass {
    pub fn new(classname: impl Into<String>) -> Self {
        Self {
            classname: classname.into(),
            superclass: None,
            qualifiers: NocaseMap::new(),
            properties: NocaseMap::new(),
            methods: NocaseMap::new(),
            path: None,
        }
    }
}

/// A CIM instance, optionally with the path it was enumerated under.
#[derive(Debug, Clone, PartialEq)]
pub struct CimInstance {
    pub classname: String,
    pub qualifiers: NocaseMap<CimQualifier>,
    pub properties: NocaseMap<CimProperty>,
    pub path: Option<CimInstanceName>,
}

impl CimInstance {
    pub fn new(classname: impl Into<String>) -> Self {
        Self {
            classname: classname.into(),
            qualifiers: NocaseMap::new(),
            properties: NocaseMap::new(),
            path: None,
        }
    }
}

/// Per-element-kind scope flags of a qualifier declaration (DSP0201 SCOPE).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct QualifierScope {
    pub class: bool,
    pub association: bool,
    pub reference: bool,
    pub property: bool,
    pub method: bool,
    pub parameter: bool,
    pub indication: bool,
}

impl QualifierScope {
    pub fn any(&self) -> bool {
        self.class
            || self.association
            || self.reference
            || self.property
            || self.method
            || self.parameter
            || self.indication
    }
}

/// A qualifier type declaration (DSP0201 QUALIFIER.DECLARATION).
#[derive(Debug, Clone, PartialEq)]
pub struct CimQualifierDeclaration {
    pub name: String,
    pub cim_type: CimType,
    pub value: CimValue,
    pub is_array: bool,
    pub array_size: Option<u32>,
    pub scope: QualifierScope,
    pub flavor: QualifierFlavor,
}

impl CimQualifierDeclaration {
    pub fn new(name: impl Into<String>, cim_type: CimType) -> Self {
        Self {
            name: name.into(),
            cim_type,
            value: CimValue::Null,
            is_array: false,
            array_size: None,
            scope: QualifierScope::default(),
            flavor: QualifierFlavor::default(),
        }
    }
}

/// An instance or class without path context (VALUE.OBJECT and friends).
#[derive(Debug, Clone, PartialEq)]
pub enum CimObject {
    Instance(CimInstance),
    Class(CimClass),
}

/// The server's own reported failure (DSP0200 ERROR element).
#[derive(Debug, Clone)]
pub struct CimError {
    /// Numeric CIM status code (CIM_ERR_*).
    pub status: u32,
    pub description: Option<String>,
    /// Zero or more detail instances (CIM_Error instances in practice).
    pub instances: Vec<CimInstance>,
}

impl CimError {
    /// Symbolic name of the status code (DSP0200 Table: CIM status codes).
    pub fn status_name(&self) -> &'static str {
        match self.status {
            1 => "CIM_ERR_FAILED",
            2 => "CIM_ERR_ACCESS_DENIED",
            3 => "CIM_ERR_INVALID_NAMESPACE",
            4 => "CIM_ERR_INVALID_PARAMETER",
            5 => "CIM_ERR_INVALID_CLASS",
            6 => "CIM_ERR_NOT_FOUND",
            7 => "CIM_ERR_NOT_SUPPORTED",
            8 => "CIM_ERR_CLASS_HAS_CHILDREN",
            9 => "CIM_ERR_CLASS_HAS_INSTANCES",
            10 => "CIM_ERR_INVALID_SUPERCLASS",
            11 => "CIM_ERR_ALREADY_EXISTS",
            12 => "CIM_ERR_NO_SUCH_PROPERTY",
            13 => "CIM_ERR_TYPE_MISMATCH",
            14 => "CIM_ERR_QUERY_LANGUAGE_NOT_SUPPORTED",
            15 => "CIM_ERR_INVALID_QUERY",
            16 => "CIM_ERR_METHOD_NOT_AVAILABLE",
            17 => "CIM_ERR_METHOD_NOT_FOUND",
            20 => "CIM_ERR_NAMESPACE_NOT_EMPTY",
            21 => "CIM_ERR_INVALID_ENUMERATION_CONTEXT",
            22 => "CIM_ERR_INVALID_OPERATION_TIMEOUT",
            23 => "CIM_ERR_PULL_HAS_BEEN_ABANDONED",
            24 => "CIM_ERR_PULL_CANNOT_BE_ABANDONED",
            25 => "CIM_ERR_FILTERED_ENUMERATION_NOT_SUPPORTED",
            26 => "CIM_ERR_CONTINUATION_ON_ERROR_NOT_SUPPORTED",
            27 => "CIM_ERR_SERVER_LIMITS_EXCEEDED",
            28 => "CIM_ERR_SERVER_IS_SHUTTING_DOWN",
            _ => "CIM_ERR_UNKNOWN",
        }
    }
}

impl fmt::Display for CimError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "server error {} ({})", self.status, self.status_name())?;
        if let Some(desc) = &self.description {
            write!(f, ": {desc}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn qualifier_flavor_dtd_defaults() {
        let flavor = QualifierFlavor::default();
        assert!(flavor.overridable);
        assert!(flavor.tosubclass);
        assert!(!flavor.toinstance);
        assert!(!flavor.translatable);
    }

    #[test]
    fn property_lookup_is_nocase() {
        let mut inst = CimInstance::new("CIM_Foo");
        inst.properties.insert(
            "Caption",
            CimProperty::new("Caption", CimType::String, CimValue::String("x".into())),
        );
        assert!(inst.properties.get("CAPTION").is_some());
    }

    #[test]
    fn server_error_display() {
        let err = CimError {
            status: 6,
            description: Some("no such instance".into()),
            instances: Vec::new(),
        };
        let msg = err.to_string();
        assert!(msg.contains("CIM_ERR_NOT_FOUND"), "{msg}");
        assert!(msg.contains("no such instance"), "{msg}");
    }
}
