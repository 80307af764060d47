//! Object Builder: one build routine per CIM-XML element kind, mutually
//! recursive per the DSP0201 grammar.
//!
//! Each `build_*` consumes its own start element via the grammar reader,
//! so dispatch sites decide with a one-token peek and never re-feed
//! attributes. Element-kind dispatch is a match over the fixed element
//! names; there is no stringly-typed build-function lookup.
//!
//! Embedded objects (EmbeddedObject="instance"|"object") carry their value
//! as XML-escaped CIM-XML text; the builder re-parses that text with a
//! fresh reader, threads the enclosing property name into any error, and
//! caps the nesting depth.

use std::cell::Cell;

use crate::event::Attributes;
use crate::model::{
    CimClass, CimError, CimInstance, CimMethod, CimObject, CimParameter, CimProperty,
    CimQualifier, CimQualifierDeclaration, EmbeddedObjectKind, QualifierFlavor, QualifierScope,
};
use crate::nocase::NocaseMap;
use crate::path::{CimClassName, CimInstanceName, CimObjectPath, UNNAMED_KEY};
use crate::reader::GrammarReader;
use crate::types::CimType;
use crate::value::{CimValue, decode_typed, decode_untyped_number};
use crate::{Error, Result};

/// Cap on embedded-object nesting. Each level re-parses with a fresh
/// reader, so this bounds the recursion the wire can force on us.
pub const MAX_EMBEDDED_DEPTH: usize = 8;

thread_local! {
    static EMBEDDED_DEPTH: Cell<usize> = const { Cell::new(0) };
}

// ============================================================================
// Attribute helpers
// ============================================================================

/// Boolean attribute with DTD default ("true"/"false", case-insensitive).
fn bool_attr(attrs: &Attributes, name: &'static str, default: bool) -> Result<bool> {
    match attrs.optional(name) {
        None => Ok(default),
        Some(v) if v.eq_ignore_ascii_case("true") => Ok(true),
        Some(v) if v.eq_ignore_ascii_case("false") => Ok(false),
        Some(v) => Err(Error::InvalidAttributeValue {
            element: attrs.element().to_string().into(),
            attribute: name.into(),
            value: v.to_string(),
        }),
    }
}

/// Required TYPE attribute carrying a CIM type keyword.
fn type_attr(attrs: &Attributes) -> Result<CimType> {
    let raw = attrs.required("TYPE")?;
    CimType::from_attr(raw).ok_or_else(|| Error::InvalidAttributeValue {
        element: attrs.element().to_string().into(),
        attribute: "TYPE".into(),
        value: raw.to_string(),
    })
}

/// Optional ARRAYSIZE attribute (decimal).
fn arraysize_attr(attrs: &Attributes) -> Result<Option<u32>> {
    match attrs.optional("ARRAYSIZE") {
        None => Ok(None),
        Some(v) => v.parse::<u32>().map(Some).map_err(|_| {
            Error::InvalidAttributeValue {
                element: attrs.element().to_string().into(),
                attribute: "ARRAYSIZE".into(),
                value: v.to_string(),
            }
        }),
    }
}

/// The EmbeddedObject marker; the attribute name is case-tolerant
/// (EmbeddedObject und EMBEDDEDOBJECT kommen beide vor).
fn embedded_attr(attrs: &Attributes) -> Result<Option<EmbeddedObjectKind>> {
    match attrs.optional_nocase("EmbeddedObject") {
        None => Ok(None),
        Some("instance") => Ok(Some(EmbeddedObjectKind::Instance)),
        Some("object") => Ok(Some(EmbeddedObjectKind::Object)),
        Some(v) => Err(Error::InvalidAttributeValue {
            element: attrs.element().to_string().into(),
            attribute: "EmbeddedObject".into(),
            value: v.to_string(),
        }),
    }
}

/// Optional TYPE attribute on VALUE/VALUE.ARRAY; when present it must agree
/// with the statically known expected type. Disagreement is a hard error,
/// never coerced.
fn check_declared_type(attrs: &Attributes, expected: CimType) -> Result<()> {
    if let Some(raw) = attrs.optional("TYPE") {
        let declared = CimType::from_attr(raw).ok_or_else(|| Error::InvalidAttributeValue {
            element: attrs.element().to_string().into(),
            attribute: "TYPE".into(),
            value: raw.to_string(),
        })?;
        if declared != expected {
            return Err(Error::TypeMismatch {
                element: attrs.element().to_string().into(),
                declared,
                expected,
            });
        }
    }
    Ok(())
}

// ============================================================================
// Values
// ============================================================================

/// VALUE: leaf text decoded against the expected type.
pub fn build_value(r: &mut GrammarReader, expected: CimType) -> Result<CimValue> {
    let attrs = r.require_start("VALUE")?;
    attrs.expect_only(&["TYPE", "xml:lang"])?;
    check_declared_type(&attrs, expected)?;
    let text = r.require_end_text("VALUE")?;
    decode_typed(&text, expected)
}

/// VALUE.ARRAY: homogeneous run of VALUE/VALUE.NULL children.
pub fn build_value_array(r: &mut GrammarReader, expected: CimType) -> Result<Vec<CimValue>> {
    let attrs = r.require_start("VALUE.ARRAY")?;
    attrs.expect_only(&["TYPE", "xml:lang"])?;
    check_declared_type(&attrs, expected)?;
    let mut items = Vec::new();
    loop {
        match r.peek_start_of(&["VALUE", "VALUE.NULL"])? {
            Some("VALUE") => items.push(build_value(r, expected)?),
            Some("VALUE.NULL") => {
                let attrs = r.require_start("VALUE.NULL")?;
                attrs.expect_only(&[])?;
                r.require_end("VALUE.NULL")?;
                items.push(CimValue::Null);
            }
            _ => break,
        }
    }
    r.require_end("VALUE.ARRAY")?;
    Ok(items)
}

/// VALUE.REFARRAY: run of VALUE.REFERENCE children.
pub fn build_value_refarray(r: &mut GrammarReader) -> Result<Vec<CimValue>> {
    let attrs = r.require_start("VALUE.REFARRAY")?;
    attrs.expect_only(&[])?;
    let mut items = Vec::new();
    while r.peek_is_start(Some("VALUE.REFERENCE"))? {
        items.push(CimValue::Reference(build_value_reference(r)?));
    }
    r.require_end("VALUE.REFARRAY")?;
    Ok(items)
}

/// VALUE.REFERENCE: one of the six path shapes, collapsed to an object path.
pub fn build_value_reference(r: &mut GrammarReader) -> Result<CimObjectPath> {
    let attrs = r.require_start("VALUE.REFERENCE")?;
    attrs.expect_only(&[])?;
    let path = match r.peek_start_of(&[
        "CLASSPATH",
        "LOCALCLASSPATH",
        "CLASSNAME",
        "INSTANCEPATH",
        "LOCALINSTANCEPATH",
        "INSTANCENAME",
    ])? {
        Some("CLASSPATH") => CimObjectPath::Class(build_classpath(r)?),
        Some("LOCALCLASSPATH") => CimObjectPath::Class(build_localclasspath(r)?),
        Some("CLASSNAME") => CimObjectPath::Class(build_classname(r)?),
        Some("INSTANCEPATH") => CimObjectPath::Instance(build_instancepath(r)?),
        Some("LOCALINSTANCEPATH") => CimObjectPath::Instance(build_localinstancepath(r)?),
        Some("INSTANCENAME") => CimObjectPath::Instance(build_instancename(r)?),
        _ => return Err(r.missing_or_unexpected_child("VALUE.REFERENCE")),
    };
    r.require_end("VALUE.REFERENCE")?;
    Ok(path)
}

// ============================================================================
// Paths and names
// ============================================================================

/// CLASSNAME: bare class name element.
pub fn build_classname(r: &mut GrammarReader) -> Result<CimClassName> {
    let attrs = r.require_start("CLASSNAME")?;
    attrs.expect_only(&["NAME"])?;
    let name = attrs.required("NAME")?.to_string();
    r.require_end("CLASSNAME")?;
    Ok(CimClassName::new(name))
}

/// HOST: leaf text.
fn build_host(r: &mut GrammarReader) -> Result<String> {
    let attrs = r.require_start("HOST")?;
    attrs.expect_only(&[])?;
    let text = r.require_end_text("HOST")?;
    Ok(text.trim().to_string())
}

/// LOCALNAMESPACEPATH: one or more NAMESPACE name attributes joined by `/`.
pub fn build_localnamespacepath(r: &mut GrammarReader) -> Result<String> {
    let attrs = r.require_start("LOCALNAMESPACEPATH")?;
    attrs.expect_only(&[])?;
    let mut parts = Vec::new();
    while let Some(ns) = r.try_start("NAMESPACE")? {
        ns.expect_only(&["NAME"])?;
        parts.push(ns.required("NAME")?.to_string());
        r.require_end("NAMESPACE")?;
    }
    if parts.is_empty() {
        return Err(Error::MissingChild {
            parent: "LOCALNAMESPACEPATH".to_string(),
        });
    }
    r.require_end("LOCALNAMESPACEPATH")?;
    Ok(parts.join("/"))
}

/// NAMESPACEPATH: HOST plus local namespace path.
pub fn build_namespacepath(r: &mut GrammarReader) -> Result<(String, String)> {
    let attrs = r.require_start("NAMESPACEPATH")?;
    attrs.expect_only(&[])?;
    let host = build_host(r)?;
    let namespace = build_localnamespacepath(r)?;
    r.require_end("NAMESPACEPATH")?;
    Ok((host, namespace))
}

/// INSTANCENAME: keybindings in one of three mutually exclusive shapes,
/// tried in order: KEYBINDING run, bare KEYVALUE/VALUE.REFERENCE (unnamed
/// key), or no children (keyless singleton).
pub fn build_instancename(r: &mut GrammarReader) -> Result<CimInstanceName> {
    let attrs = r.require_start("INSTANCENAME")?;
    attrs.expect_only(&["CLASSNAME"])?;
    let mut name = CimInstanceName::new(attrs.required("CLASSNAME")?.to_string());
    if r.peek_is_start(Some("KEYBINDING"))? {
        while r.peek_is_start(Some("KEYBINDING"))? {
            let (key, value) = build_keybinding(r)?;
            name.keybindings.insert(key, value);
        }
    } else if r.peek_is_start(Some("KEYVALUE"))? {
        let value = build_keyvalue(r)?;
        name.keybindings.insert(UNNAMED_KEY, value);
    } else if r.peek_is_start(Some("VALUE.REFERENCE"))? {
        let path = build_value_reference(r)?;
        name.keybindings
            .insert(UNNAMED_KEY, CimValue::Reference(path));
    }
    r.require_end("INSTANCENAME")?;
    Ok(name)
}

/// KEYBINDING: named key with a KEYVALUE or VALUE.REFERENCE child.
pub fn build_keybinding(r: &mut GrammarReader) -> Result<(String, CimValue)> {
    let attrs = r.require_start("KEYBINDING")?;
    attrs.expect_only(&["NAME"])?;
    let name = attrs.required("NAME")?.to_string();
    let value = match r.peek_start_of(&["KEYVALUE", "VALUE.REFERENCE"])? {
        Some("KEYVALUE") => build_keyvalue(r)?,
        Some("VALUE.REFERENCE") => CimValue::Reference(build_value_reference(r)?),
        _ => return Err(r.missing_or_unexpected_child("KEYBINDING")),
    };
    r.require_end("KEYBINDING")?;
    Ok((name, value))
}

/// KEYVALUE: leaf key text. TYPE wins when present; with only a VALUETYPE
/// hint the type defaults from it (string/boolean/numeric). An empty TYPE
/// attribute is a tolerated server defect and falls back to VALUETYPE.
pub fn build_keyvalue(r: &mut GrammarReader) -> Result<CimValue> {
    let attrs = r.require_start("KEYVALUE")?;
    attrs.expect_only(&["VALUETYPE", "TYPE"])?;
    let valuetype = attrs.optional("VALUETYPE").unwrap_or("string").to_string();
    let declared = match attrs.optional("TYPE") {
        Some("") => {
            // Tolerated server defect: empty TYPE attribute on a keybinding.
            log::warn!("tolerating empty TYPE attribute on KEYVALUE (known server defect)");
            None
        }
        Some(raw) => Some(CimType::from_attr(raw).ok_or_else(|| {
            Error::InvalidAttributeValue {
                element: "KEYVALUE".into(),
                attribute: "TYPE".into(),
                value: raw.to_string(),
            }
        })?),
        None => None,
    };
    let text = r.require_end_text("KEYVALUE")?;
    match declared {
        Some(cim_type) => decode_typed(&text, cim_type),
        None => match valuetype.as_str() {
            "string" => Ok(CimValue::String(text)),
            "boolean" => decode_typed(&text, CimType::Boolean),
            "numeric" => decode_untyped_number(&text),
            other => Err(Error::InvalidAttributeValue {
                element: "KEYVALUE".into(),
                attribute: "VALUETYPE".into(),
                value: other.to_string(),
            }),
        },
    }
}

/// INSTANCEPATH: namespace path plus instance name.
pub fn build_instancepath(r: &mut GrammarReader) -> Result<CimInstanceName> {
    let attrs = r.require_start("INSTANCEPATH")?;
    attrs.expect_only(&[])?;
    let (host, namespace) = build_namespacepath(r)?;
    let mut name = build_instancename(r)?;
    name.host = Some(host);
    name.namespace = Some(namespace);
    r.require_end("INSTANCEPATH")?;
    Ok(name)
}

/// LOCALINSTANCEPATH: local namespace path plus instance name.
pub fn build_localinstancepath(r: &mut GrammarReader) -> Result<CimInstanceName> {
    let attrs = r.require_start("LOCALINSTANCEPATH")?;
    attrs.expect_only(&[])?;
    let namespace = build_localnamespacepath(r)?;
    let mut name = build_instancename(r)?;
    name.namespace = Some(namespace);
    r.require_end("LOCALINSTANCEPATH")?;
    Ok(name)
}

/// CLASSPATH: namespace path plus class name.
pub fn build_classpath(r: &mut GrammarReader) -> Result<CimClassName> {
    let attrs = r.require_start("CLASSPATH")?;
    attrs.expect_only(&[])?;
    let (host, namespace) = build_namespacepath(r)?;
    let mut name = build_classname(r)?;
    name.host = Some(host);
    name.namespace = Some(namespace);
    r.require_end("CLASSPATH")?;
    Ok(name)
}

/// LOCALCLASSPATH: local namespace path plus class name.
pub fn build_localclasspath(r: &mut GrammarReader) -> Result<CimClassName> {
    let attrs = r.require_start("LOCALCLASSPATH")?;
    attrs.expect_only(&[])?;
    let namespace = build_localnamespacepath(r)?;
    let mut name = build_classname(r)?;
    name.namespace = Some(namespace);
    r.require_end("LOCALCLASSPATH")?;
    Ok(name)
}

/// OBJECTPATH: either an instance path or a class path.
pub fn build_objectpath(r: &mut GrammarReader) -> Result<CimObjectPath> {
    let attrs = r.require_start("OBJECTPATH")?;
    attrs.expect_only(&[])?;
    let path = match r.peek_start_of(&["INSTANCEPATH", "CLASSPATH"])? {
        Some("INSTANCEPATH") => CimObjectPath::Instance(build_instancepath(r)?),
        Some("CLASSPATH") => CimObjectPath::Class(build_classpath(r)?),
        _ => return Err(r.missing_or_unexpected_child("OBJECTPATH")),
    };
    r.require_end("OBJECTPATH")?;
    Ok(path)
}

// ============================================================================
// Qualifiers
// ============================================================================

fn flavor_attrs(attrs: &Attributes) -> Result<QualifierFlavor> {
    Ok(QualifierFlavor {
        overridable: bool_attr(attrs, "OVERRIDABLE", true)?,
        tosubclass: bool_attr(attrs, "TOSUBCLASS", true)?,
        toinstance: bool_attr(attrs, "TOINSTANCE", false)?,
        translatable: bool_attr(attrs, "TRANSLATABLE", false)?,
    })
}

/// QUALIFIER: name, type, flavor bits and an optional value child.
pub fn build_qualifier(r: &mut GrammarReader) -> Result<CimQualifier> {
    let attrs = r.require_start("QUALIFIER")?;
    attrs.expect_only(&[
        "NAME",
        "TYPE",
        "PROPAGATED",
        "OVERRIDABLE",
        "TOSUBCLASS",
        "TOINSTANCE",
        "TRANSLATABLE",
        "xml:lang",
    ])?;
    let name = attrs.required("NAME")?.to_string();
    let cim_type = type_attr(&attrs)?;
    let propagated = bool_attr(&attrs, "PROPAGATED", false)?;
    let flavor = flavor_attrs(&attrs)?;
    let value = match r.peek_start_of(&["VALUE", "VALUE.ARRAY"])? {
        Some("VALUE") => build_value(r, cim_type)?,
        Some("VALUE.ARRAY") => CimValue::Array(build_value_array(r, cim_type)?),
        _ => CimValue::Null,
    };
    r.require_end("QUALIFIER")?;
    Ok(CimQualifier {
        name,
        cim_type,
        value,
        propagated,
        flavor,
    })
}

/// Zero or more QUALIFIER children.
fn build_qualifiers(r: &mut GrammarReader) -> Result<NocaseMap<CimQualifier>> {
    let mut map = NocaseMap::new();
    while r.peek_is_start(Some("QUALIFIER"))? {
        let q = build_qualifier(r)?;
        map.insert(q.name.clone(), q);
    }
    Ok(map)
}

/// QUALIFIER.DECLARATION: declared type, scopes, flavor defaults, default value.
pub fn build_qualifier_declaration(r: &mut GrammarReader) -> Result<CimQualifierDeclaration> {
    let attrs = r.require_start("QUALIFIER.DECLARATION")?;
    attrs.expect_only(&[
        "NAME",
        "TYPE",
        "ISARRAY",
        "ARRAYSIZE",
        "OVERRIDABLE",
        "TOSUBCLASS",
        "TOINSTANCE",
        "TRANSLATABLE",
    ])?;
    let mut decl = CimQualifierDeclaration::new(
        attrs.required("NAME")?.to_string(),
        type_attr(&attrs)?,
    );
    decl.is_array = bool_attr(&attrs, "ISARRAY", false)?;
    decl.array_size = arraysize_attr(&attrs)?;
    decl.flavor = flavor_attrs(&attrs)?;
    if let Some(scope_attrs) = r.try_start("SCOPE")? {
        scope_attrs.expect_only(&[
            "CLASS",
            "ASSOCIATION",
            "REFERENCE",
            "PROPERTY",
            "METHOD",
            "PARAMETER",
            "INDICATION",
        ])?;
        decl.scope = QualifierScope {
            class: bool_attr(&scope_attrs, "CLASS", false)?,
            association: bool_attr(&scope_attrs, "ASSOCIATION", false)?,
            reference: bool_attr(&scope_attrs, "REFERENCE", false)?,
            property: bool_attr(&scope_attrs, "PROPERTY", false)?,
            method: bool_attr(&scope_attrs, "METHOD", false)?,
            parameter: bool_attr(&scope_attrs, "PARAMETER", false)?,
            indication: bool_attr(&scope_attrs, "INDICATION", false)?,
        };
        r.require_end("SCOPE")?;
    }
    decl.value = match r.peek_start_of(&["VALUE", "VALUE.ARRAY"])? {
        Some("VALUE") => build_value(r, decl.cim_type)?,
        Some("VALUE.ARRAY") => CimValue::Array(build_value_array(r, decl.cim_type)?),
        _ => CimValue::Null,
    };
    r.require_end("QUALIFIER.DECLARATION")?;
    Ok(decl)
}

// ============================================================================
// Properties
// ============================================================================

/// PROPERTY: scalar property, possibly an embedded object.
pub fn build_property(r: &mut GrammarReader) -> Result<CimProperty> {
    let attrs = r.require_start("PROPERTY")?;
    attrs.expect_only(&[
        "NAME",
        "TYPE",
        "CLASSORIGIN",
        "PROPAGATED",
        "EmbeddedObject",
        "xml:lang",
    ])?;
    let name = attrs.required("NAME")?.to_string();
    let cim_type = type_attr(&attrs)?;
    let embedded = embedded_attr(&attrs)?;
    if embedded.is_some() && cim_type != CimType::String {
        return Err(Error::TypeMismatch {
            element: "PROPERTY".into(),
            declared: cim_type,
            expected: CimType::String,
        });
    }
    let mut prop = CimProperty::new(name, cim_type, CimValue::Null);
    prop.class_origin = attrs.optional("CLASSORIGIN").map(str::to_string);
    prop.propagated = bool_attr(&attrs, "PROPAGATED", false)?;
    prop.embedded_object = embedded;
    prop.qualifiers = build_qualifiers(r)?;
    if r.peek_is_start(Some("VALUE"))? {
        prop.value = match embedded {
            Some(kind) => {
                let raw = build_value(r, CimType::String)?;
                let CimValue::String(text) = raw else {
                    unreachable!("string-typed VALUE decoded to non-string")
                };
                parse_embedded(&text, kind, &prop.name)?
            }
            None => build_value(r, cim_type)?,
        };
    }
    r.require_end("PROPERTY")?;
    Ok(prop)
}

/// PROPERTY.ARRAY: array property; embedded objects re-parse element-wise.
pub fn build_property_array(r: &mut GrammarReader) -> Result<CimProperty> {
    let attrs = r.require_start("PROPERTY.ARRAY")?;
    attrs.expect_only(&[
        "NAME",
        "TYPE",
        "ARRAYSIZE",
        "CLASSORIGIN",
        "PROPAGATED",
        "EmbeddedObject",
        "xml:lang",
    ])?;
    let name = attrs.required("NAME")?.to_string();
    let cim_type = type_attr(&attrs)?;
    let embedded = embedded_attr(&attrs)?;
    if embedded.is_some() && cim_type != CimType::String {
        return Err(Error::TypeMismatch {
            element: "PROPERTY.ARRAY".into(),
            declared: cim_type,
            expected: CimType::String,
        });
    }
    let mut prop = CimProperty::new(name, cim_type, CimValue::Null);
    prop.is_array = true;
    prop.array_size = arraysize_attr(&attrs)?;
    prop.class_origin = attrs.optional("CLASSORIGIN").map(str::to_string);
    prop.propagated = bool_attr(&attrs, "PROPAGATED", false)?;
    prop.embedded_object = embedded;
    prop.qualifiers = build_qualifiers(r)?;
    if r.peek_is_start(Some("VALUE.ARRAY"))? {
        let element_type = if embedded.is_some() {
            CimType::String
        } else {
            cim_type
        };
        let mut items = build_value_array(r, element_type)?;
        if let Some(kind) = embedded {
            for item in &mut items {
                if let CimValue::String(text) = item {
                    *item = parse_embedded(text, kind, &prop.name)?;
                }
            }
        }
        prop.value = CimValue::Array(items);
    }
    r.require_end("PROPERTY.ARRAY")?;
    Ok(prop)
}

/// PROPERTY.REFERENCE: carries REFERENCECLASS instead of a value type.
pub fn build_property_reference(r: &mut GrammarReader) -> Result<CimProperty> {
    let attrs = r.require_start("PROPERTY.REFERENCE")?;
    attrs.expect_only(&["NAME", "REFERENCECLASS", "CLASSORIGIN", "PROPAGATED"])?;
    let name = attrs.required("NAME")?.to_string();
    let mut prop = CimProperty::new(name, CimType::Reference, CimValue::Null);
    prop.reference_class = attrs.optional("REFERENCECLASS").map(str::to_string);
    prop.class_origin = attrs.optional("CLASSORIGIN").map(str::to_string);
    prop.propagated = bool_attr(&attrs, "PROPAGATED", false)?;
    prop.qualifiers = build_qualifiers(r)?;
    if r.peek_is_start(Some("VALUE.REFERENCE"))? {
        prop.value = CimValue::Reference(build_value_reference(r)?);
    }
    r.require_end("PROPERTY.REFERENCE")?;
    Ok(prop)
}

const PROPERTY_KINDS: &[&str] = &["PROPERTY", "PROPERTY.ARRAY", "PROPERTY.REFERENCE"];

/// Contiguous run of property-variant children, any order among the three.
fn build_properties(r: &mut GrammarReader) -> Result<NocaseMap<CimProperty>> {
    let mut map = NocaseMap::new();
    loop {
        let prop = match r.peek_start_of(PROPERTY_KINDS)? {
            Some("PROPERTY") => build_property(r)?,
            Some("PROPERTY.ARRAY") => build_property_array(r)?,
            Some("PROPERTY.REFERENCE") => build_property_reference(r)?,
            _ => break,
        };
        map.insert(prop.name.clone(), prop);
    }
    Ok(map)
}

// ============================================================================
// Parameters and methods
// ============================================================================

/// PARAMETER: scalar parameter declaration.
pub fn build_parameter(r: &mut GrammarReader) -> Result<CimParameter> {
    let attrs = r.require_start("PARAMETER")?;
    attrs.expect_only(&["NAME", "TYPE"])?;
    let mut param = CimParameter::new(attrs.required("NAME")?.to_string(), type_attr(&attrs)?);
    param.qualifiers = build_qualifiers(r)?;
    r.require_end("PARAMETER")?;
    Ok(param)
}

/// PARAMETER.REFERENCE: reference parameter declaration.
pub fn build_parameter_reference(r: &mut GrammarReader) -> Result<CimParameter> {
    let attrs = r.require_start("PARAMETER.REFERENCE")?;
    attrs.expect_only(&["NAME", "REFERENCECLASS"])?;
    let mut param =
        CimParameter::new(attrs.required("NAME")?.to_string(), CimType::Reference);
    param.reference_class = attrs.optional("REFERENCECLASS").map(str::to_string);
    param.qualifiers = build_qualifiers(r)?;
    r.require_end("PARAMETER.REFERENCE")?;
    Ok(param)
}

/// PARAMETER.ARRAY: array parameter declaration.
pub fn build_parameter_array(r: &mut GrammarReader) -> Result<CimParameter> {
    let attrs = r.require_start("PARAMETER.ARRAY")?;
    attrs.expect_only(&["NAME", "TYPE", "ARRAYSIZE"])?;
    let mut param = CimParameter::new(attrs.required("NAME")?.to_string(), type_attr(&attrs)?);
    param.is_array = true;
    param.array_size = arraysize_attr(&attrs)?;
    param.qualifiers = build_qualifiers(r)?;
    r.require_end("PARAMETER.ARRAY")?;
    Ok(param)
}

/// PARAMETER.REFARRAY: reference-array parameter declaration.
pub fn build_parameter_refarray(r: &mut GrammarReader) -> Result<CimParameter> {
    let attrs = r.require_start("PARAMETER.REFARRAY")?;
    attrs.expect_only(&["NAME", "REFERENCECLASS", "ARRAYSIZE"])?;
    let mut param =
        CimParameter::new(attrs.required("NAME")?.to_string(), CimType::Reference);
    param.is_array = true;
    param.array_size = arraysize_attr(&attrs)?;
    param.reference_class = attrs.optional("REFERENCECLASS").map(str::to_string);
    param.qualifiers = build_qualifiers(r)?;
    r.require_end("PARAMETER.REFARRAY")?;
    Ok(param)
}

const PARAMETER_KINDS: &[&str] = &[
    "PARAMETER",
    "PARAMETER.REFERENCE",
    "PARAMETER.ARRAY",
    "PARAMETER.REFARRAY",
];

/// METHOD: qualifiers, then a run of parameter-variant children.
pub fn build_method(r: &mut GrammarReader) -> Result<CimMethod> {
    let attrs = r.require_start("METHOD")?;
    attrs.expect_only(&["NAME", "TYPE", "CLASSORIGIN", "PROPAGATED"])?;
    let mut method = CimMethod::new(attrs.required("NAME")?.to_string());
    method.return_type = match attrs.optional("TYPE") {
        None => None,
        Some(raw) => Some(CimType::from_attr(raw).ok_or_else(|| {
            Error::InvalidAttributeValue {
                element: "METHOD".into(),
                attribute: "TYPE".into(),
                value: raw.to_string(),
            }
        })?),
    };
    method.class_origin = attrs.optional("CLASSORIGIN").map(str::to_string);
    method.propagated = bool_attr(&attrs, "PROPAGATED", false)?;
    method.qualifiers = build_qualifiers(r)?;
    loop {
        let param = match r.peek_start_of(PARAMETER_KINDS)? {
            Some("PARAMETER") => build_parameter(r)?,
            Some("PARAMETER.REFERENCE") => build_parameter_reference(r)?,
            Some("PARAMETER.ARRAY") => build_parameter_array(r)?,
            Some("PARAMETER.REFARRAY") => build_parameter_refarray(r)?,
            _ => break,
        };
        method.parameters.insert(param.name.clone(), param);
    }
    r.require_end("METHOD")?;
    Ok(method)
}

// ============================================================================
// Classes and instances
// ============================================================================

/// CLASS: qualifiers, property run, method run.
pub fn build_class(r: &mut GrammarReader) -> Result<CimClass> {
    let attrs = r.require_start("CLASS")?;
    attrs.expect_only(&["NAME", "SUPERCLASS"])?;
    let mut class = CimClass::new(attrs.required("NAME")?.to_string());
    class.superclass = attrs.optional("SUPERCLASS").map(str::to_string);
    class.qualifiers = build_qualifiers(r)?;
    class.properties = build_properties(r)?;
    while r.peek_is_start(Some("METHOD"))? {
        let method = build_method(r)?;
        class.methods.insert(method.name.clone(), method);
    }
    r.require_end("CLASS")?;
    Ok(class)
}

/// INSTANCE: qualifiers, property run.
pub fn build_instance(r: &mut GrammarReader) -> Result<CimInstance> {
    let attrs = r.require_start("INSTANCE")?;
    attrs.expect_only(&["CLASSNAME", "xml:lang"])?;
    let mut instance = CimInstance::new(attrs.required("CLASSNAME")?.to_string());
    instance.qualifiers = build_qualifiers(r)?;
    instance.properties = build_properties(r)?;
    r.require_end("INSTANCE")?;
    Ok(instance)
}

/// VALUE.NAMEDINSTANCE: instance name plus instance.
pub fn build_named_instance(r: &mut GrammarReader) -> Result<CimInstance> {
    let attrs = r.require_start("VALUE.NAMEDINSTANCE")?;
    attrs.expect_only(&[])?;
    let name = build_instancename(r)?;
    let mut instance = build_instance(r)?;
    instance.path = Some(name);
    r.require_end("VALUE.NAMEDINSTANCE")?;
    Ok(instance)
}

/// VALUE.INSTANCEWITHPATH: full instance path plus instance (pull family).
pub fn build_instance_with_path(r: &mut GrammarReader) -> Result<CimInstance> {
    let attrs = r.require_start("VALUE.INSTANCEWITHPATH")?;
    attrs.expect_only(&[])?;
    let path = build_instancepath(r)?;
    let mut instance = build_instance(r)?;
    instance.path = Some(path);
    r.require_end("VALUE.INSTANCEWITHPATH")?;
    Ok(instance)
}

/// VALUE.OBJECT: instance or class without path context.
pub fn build_object(r: &mut GrammarReader) -> Result<CimObject> {
    let attrs = r.require_start("VALUE.OBJECT")?;
    attrs.expect_only(&[])?;
    let object = match r.peek_start_of(&["INSTANCE", "CLASS"])? {
        Some("INSTANCE") => CimObject::Instance(build_instance(r)?),
        Some("CLASS") => CimObject::Class(build_class(r)?),
        _ => return Err(r.missing_or_unexpected_child("VALUE.OBJECT")),
    };
    r.require_end("VALUE.OBJECT")?;
    Ok(object)
}

/// VALUE.OBJECTWITHPATH: path-qualified instance or class.
pub fn build_object_with_path(r: &mut GrammarReader) -> Result<CimObject> {
    let attrs = r.require_start("VALUE.OBJECTWITHPATH")?;
    attrs.expect_only(&[])?;
    let object = match r.peek_start_of(&["INSTANCEPATH", "CLASSPATH"])? {
        Some("INSTANCEPATH") => {
            let path = build_instancepath(r)?;
            let mut instance = build_instance(r)?;
            instance.path = Some(path);
            CimObject::Instance(instance)
        }
        Some("CLASSPATH") => {
            let path = build_classpath(r)?;
            let mut class = build_class(r)?;
            class.path = Some(path);
            CimObject::Class(class)
        }
        _ => return Err(r.missing_or_unexpected_child("VALUE.OBJECTWITHPATH")),
    };
    r.require_end("VALUE.OBJECTWITHPATH")?;
    Ok(object)
}

/// VALUE.OBJECTWITHLOCALPATH: locally path-qualified instance or class.
pub fn build_object_with_local_path(r: &mut GrammarReader) -> Result<CimObject> {
    let attrs = r.require_start("VALUE.OBJECTWITHLOCALPATH")?;
    attrs.expect_only(&[])?;
    let object = match r.peek_start_of(&["LOCALINSTANCEPATH", "LOCALCLASSPATH"])? {
        Some("LOCALINSTANCEPATH") => {
            let path = build_localinstancepath(r)?;
            let mut instance = build_instance(r)?;
            instance.path = Some(path);
            CimObject::Instance(instance)
        }
        Some("LOCALCLASSPATH") => {
            let path = build_localclasspath(r)?;
            let mut class = build_class(r)?;
            class.path = Some(path);
            CimObject::Class(class)
        }
        _ => return Err(r.missing_or_unexpected_child("VALUE.OBJECTWITHLOCALPATH")),
    };
    r.require_end("VALUE.OBJECTWITHLOCALPATH")?;
    Ok(object)
}

/// ERROR: server status code, optional description, detail instances.
pub fn build_error(r: &mut GrammarReader) -> Result<CimError> {
    let attrs = r.require_start("ERROR")?;
    attrs.expect_only(&["CODE", "DESCRIPTION"])?;
    let code = attrs.required("CODE")?;
    let status = code.parse::<u32>().map_err(|_| Error::InvalidAttributeValue {
        element: "ERROR".into(),
        attribute: "CODE".into(),
        value: code.to_string(),
    })?;
    let description = attrs.optional("DESCRIPTION").map(str::to_string);
    let mut instances = Vec::new();
    while r.peek_is_start(Some("INSTANCE"))? {
        instances.push(build_instance(r)?);
    }
    r.require_end("ERROR")?;
    Ok(CimError {
        status,
        description,
        instances,
    })
}

// ============================================================================
// Embedded objects
// ============================================================================

/// Re-parses an embedded object's unescaped CIM-XML text with a fresh
/// reader. Errors name the enclosing property and stay distinct from the
/// outer parse's own errors; nesting is capped at [`MAX_EMBEDDED_DEPTH`].
pub fn parse_embedded(
    text: &str,
    kind: EmbeddedObjectKind,
    property: &str,
) -> Result<CimValue> {
    let depth = EMBEDDED_DEPTH.get();
    if depth >= MAX_EMBEDDED_DEPTH {
        return Err(Error::EmbeddedDepth {
            property: property.to_string(),
            limit: MAX_EMBEDDED_DEPTH,
        });
    }
    EMBEDDED_DEPTH.set(depth + 1);
    let result = parse_embedded_document(text, kind);
    EMBEDDED_DEPTH.set(depth);
    result.map_err(|e| Error::EmbeddedParse {
        property: property.to_string(),
        source: Box::new(e),
    })
}

fn parse_embedded_document(text: &str, kind: EmbeddedObjectKind) -> Result<CimValue> {
    let mut r = GrammarReader::from_str(text);
    let value = match kind {
        EmbeddedObjectKind::Instance => {
            CimValue::EmbeddedInstance(Box::new(build_instance(&mut r)?))
        }
        EmbeddedObjectKind::Object => match r.peek_start_of(&["INSTANCE", "CLASS"])? {
            Some("INSTANCE") => CimValue::EmbeddedInstance(Box::new(build_instance(&mut r)?)),
            Some("CLASS") => CimValue::EmbeddedClass(Box::new(build_class(&mut r)?)),
            _ => return Err(r.missing_or_unexpected_child("embedded object value")),
        },
    };
    r.require_end_of_document()?;
    Ok(value)
}
