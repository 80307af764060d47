//! Entity serialization back to CIM-XML element form (DSP0201).
//!
//! The emitted form is canonical: attributes carrying their DTD default are
//! omitted, values always carry their element form, and real numbers always
//! carry a decimal point so the emitted text re-parses under the strict
//! lexical value grammar. Embedded objects are re-serialized to their
//! sub-document and escaped into the enclosing VALUE text.

use quick_xml::escape::escape;

use crate::model::{
    CimClass, CimInstance, CimMethod, CimParameter, CimProperty, CimQualifier,
    CimQualifierDeclaration, QualifierFlavor,
};
use crate::path::{CimClassName, CimInstanceName, CimObjectPath};
use crate::types::CimType;
use crate::value::CimValue;

/// Minimal push-based XML writer over an owned buffer.
struct Xml {
    out: String,
}

impl Xml {
    fn new() -> Self {
        Self { out: String::new() }
    }

    fn open(&mut self, name: &str) {
        self.out.push('<');
        self.out.push_str(name);
    }

    fn attr(&mut self, name: &str, value: &str) {
        self.out.push(' ');
        self.out.push_str(name);
        self.out.push_str("=\"");
        self.out.push_str(&escape(value));
        self.out.push('"');
    }

    fn close(&mut self) {
        self.out.push('>');
    }

    fn close_empty(&mut self) {
        self.out.push_str("/>");
    }

    fn end(&mut self, name: &str) {
        self.out.push_str("</");
        self.out.push_str(name);
        self.out.push('>');
    }

    fn text(&mut self, value: &str) {
        self.out.push_str(&escape(value));
    }
}

/// Serializes a class to a CLASS element.
pub fn class_to_xml(class: &CimClass) -> String {
    let mut x = Xml::new();
    emit_class(&mut x, class);
    x.out
}

/// Serializes an instance to an INSTANCE element (path context is not
/// part of the element and is dropped).
pub fn instance_to_xml(instance: &CimInstance) -> String {
    let mut x = Xml::new();
    emit_instance(&mut x, instance);
    x.out
}

/// Serializes an instance name to an INSTANCENAME element.
pub fn instancename_to_xml(name: &CimInstanceName) -> String {
    let mut x = Xml::new();
    emit_instancename(&mut x, name);
    x.out
}

/// Serializes a qualifier declaration to a QUALIFIER.DECLARATION element.
pub fn qualifier_declaration_to_xml(decl: &CimQualifierDeclaration) -> String {
    let mut x = Xml::new();
    emit_qualifier_declaration(&mut x, decl);
    x.out
}

/// Serializes an object path to a VALUE.REFERENCE element. The wire shape
/// follows the available context: host plus namespace gives the full path,
/// namespace alone the local path, neither the bare name.
pub fn objectpath_to_xml(path: &CimObjectPath) -> String {
    let mut x = Xml::new();
    emit_value_reference(&mut x, path);
    x.out
}

fn emit_class(x: &mut Xml, class: &CimClass) {
    x.open("CLASS");
    x.attr("NAME", &class.classname);
    if let Some(superclass) = &class.superclass {
        x.attr("SUPERCLASS", superclass);
    }
    if class.qualifiers.is_empty() && class.properties.is_empty() && class.methods.is_empty() {
        x.close_empty();
        return;
    }
    x.close();
    for q in class.qualifiers.values() {
        emit_qualifier(x, q);
    }
    for p in class.properties.values() {
        emit_property(x, p);
    }
    for m in class.methods.values() {
        emit_method(x, m);
    }
    x.end("CLASS");
}

fn emit_instance(x: &mut Xml, instance: &CimInstance) {
    x.open("INSTANCE");
    x.attr("CLASSNAME", &instance.classname);
    if instance.qualifiers.is_empty() && instance.properties.is_empty() {
        x.close_empty();
        return;
    }
    x.close();
    for q in instance.qualifiers.values() {
        emit_qualifier(x, q);
    }
    for p in instance.properties.values() {
        emit_property(x, p);
    }
    x.end("INSTANCE");
}

fn emit_flavor(x: &mut Xml, flavor: &QualifierFlavor) {
    if !flavor.overridable {
        x.attr("OVERRIDABLE", "false");
    }
    if !flavor.tosubclass {
        x.attr("TOSUBCLASS", "false");
    }
    if flavor.toinstance {
        x.attr("TOINSTANCE", "true");
    }
    if flavor.translatable {
        x.attr("TRANSLATABLE", "true");
    }
}

fn emit_qualifier(x: &mut Xml, q: &CimQualifier) {
    x.open("QUALIFIER");
    x.attr("NAME", &q.name);
    x.attr("TYPE", q.cim_type.as_str());
    if q.propagated {
        x.attr("PROPAGATED", "true");
    }
    emit_flavor(x, &q.flavor);
    match &q.value {
        CimValue::Null => x.close_empty(),
        CimValue::Array(items) => {
            x.close();
            emit_value_array(x, items);
            x.end("QUALIFIER");
        }
        value => {
            x.close();
            emit_value(x, value);
            x.end("QUALIFIER");
        }
    }
}

fn emit_qualifier_declaration(x: &mut Xml, decl: &CimQualifierDeclaration) {
    x.open("QUALIFIER.DECLARATION");
    x.attr("NAME", &decl.name);
    x.attr("TYPE", decl.cim_type.as_str());
    if decl.is_array {
        x.attr("ISARRAY", "true");
    }
    if let Some(size) = decl.array_size {
        x.attr("ARRAYSIZE", &size.to_string());
    }
    emit_flavor(x, &decl.flavor);
    if !decl.scope.any() && decl.value.is_null() {
        x.close_empty();
        return;
    }
    x.close();
    if decl.scope.any() {
        x.open("SCOPE");
        let s = &decl.scope;
        for (name, set) in [
            ("CLASS", s.class),
            ("ASSOCIATION", s.association),
            ("REFERENCE", s.reference),
            ("PROPERTY", s.property),
            ("METHOD", s.method),
            ("PARAMETER", s.parameter),
            ("INDICATION", s.indication),
        ] {
            if set {
                x.attr(name, "true");
            }
        }
        x.close_empty();
    }
    match &decl.value {
        CimValue::Null => {}
        CimValue::Array(items) => emit_value_array(x, items),
        value => emit_value(x, value),
    }
    x.end("QUALIFIER.DECLARATION");
}

fn emit_property(x: &mut Xml, p: &CimProperty) {
    if p.cim_type == CimType::Reference {
        emit_property_reference(x, p);
    } else if p.is_array {
        emit_property_array(x, p);
    } else {
        emit_property_scalar(x, p);
    }
}

fn emit_property_common(x: &mut Xml, p: &CimProperty) {
    x.attr("NAME", &p.name);
    x.attr("TYPE", p.cim_type.as_str());
    if let Some(origin) = &p.class_origin {
        x.attr("CLASSORIGIN", origin);
    }
    if p.propagated {
        x.attr("PROPAGATED", "true");
    }
    if let Some(kind) = p.embedded_object {
        x.attr("EmbeddedObject", kind.as_attr());
    }
}

fn emit_property_scalar(x: &mut Xml, p: &CimProperty) {
    x.open("PROPERTY");
    emit_property_common(x, p);
    if p.qualifiers.is_empty() && p.value.is_null() {
        x.close_empty();
        return;
    }
    x.close();
    for q in p.qualifiers.values() {
        emit_qualifier(x, q);
    }
    if !p.value.is_null() {
        emit_value(x, &p.value);
    }
    x.end("PROPERTY");
}

fn emit_property_array(x: &mut Xml, p: &CimProperty) {
    x.open("PROPERTY.ARRAY");
    emit_property_common(x, p);
    if let Some(size) = p.array_size {
        x.attr("ARRAYSIZE", &size.to_string());
    }
    if p.qualifiers.is_empty() && p.value.is_null() {
        x.close_empty();
        return;
    }
    x.close();
    for q in p.qualifiers.values() {
        emit_qualifier(x, q);
    }
    if let CimValue::Array(items) = &p.value {
        emit_value_array(x, items);
    }
    x.end("PROPERTY.ARRAY");
}

fn emit_property_reference(x: &mut Xml, p: &CimProperty) {
    x.open("PROPERTY.REFERENCE");
    x.attr("NAME", &p.name);
    if let Some(class) = &p.reference_class {
        x.attr("REFERENCECLASS", class);
    }
    if let Some(origin) = &p.class_origin {
        x.attr("CLASSORIGIN", origin);
    }
    if p.propagated {
        x.attr("PROPAGATED", "true");
    }
    if p.qualifiers.is_empty() && p.value.is_null() {
        x.close_empty();
        return;
    }
    x.close();
    for q in p.qualifiers.values() {
        emit_qualifier(x, q);
    }
    if let CimValue::Reference(path) = &p.value {
        emit_value_reference(x, path);
    }
    x.end("PROPERTY.REFERENCE");
}

fn emit_method(x: &mut Xml, m: &CimMethod) {
    x.open("METHOD");
    x.attr("NAME", &m.name);
    if let Some(ty) = m.return_type {
        x.attr("TYPE", ty.as_str());
    }
    if let Some(origin) = &m.class_origin {
        x.attr("CLASSORIGIN", origin);
    }
    if m.propagated {
        x.attr("PROPAGATED", "true");
    }
    if m.qualifiers.is_empty() && m.parameters.is_empty() {
        x.close_empty();
        return;
    }
    x.close();
    for q in m.qualifiers.values() {
        emit_qualifier(x, q);
    }
    for p in m.parameters.values() {
        emit_parameter(x, p);
    }
    x.end("METHOD");
}

fn emit_parameter(x: &mut Xml, p: &CimParameter) {
    let element = match (p.cim_type == CimType::Reference, p.is_array) {
        (true, true) => "PARAMETER.REFARRAY",
        (true, false) => "PARAMETER.REFERENCE",
        (false, true) => "PARAMETER.ARRAY",
        (false, false) => "PARAMETER",
    };
    x.open(element);
    x.attr("NAME", &p.name);
    if p.cim_type == CimType::Reference {
        if let Some(class) = &p.reference_class {
            x.attr("REFERENCECLASS", class);
        }
    } else {
        x.attr("TYPE", p.cim_type.as_str());
    }
    if let Some(size) = p.array_size {
        x.attr("ARRAYSIZE", &size.to_string());
    }
    if p.qualifiers.is_empty() {
        x.close_empty();
        return;
    }
    x.close();
    for q in p.qualifiers.values() {
        emit_qualifier(x, q);
    }
    x.end(element);
}

fn emit_instancename(x: &mut Xml, name: &CimInstanceName) {
    x.open("INSTANCENAME");
    x.attr("CLASSNAME", &name.classname);
    if name.is_singleton() {
        x.close_empty();
        return;
    }
    x.close();
    if let Some(value) = name.unnamed_key() {
        // Unnamed-key form: exactly one binding, no KEYBINDING wrapper.
        match value {
            CimValue::Reference(path) => emit_value_reference(x, path),
            value => emit_keyvalue(x, value),
        }
    } else {
        for (key, value) in name.keybindings.iter() {
            x.open("KEYBINDING");
            x.attr("NAME", key);
            x.close();
            match value {
                CimValue::Reference(path) => emit_value_reference(x, path),
                value => emit_keyvalue(x, value),
            }
            x.end("KEYBINDING");
        }
    }
    x.end("INSTANCENAME");
}

fn emit_keyvalue(x: &mut Xml, value: &CimValue) {
    let (valuetype, cim_type) = match value.cim_type() {
        Some(t @ CimType::Boolean) => ("boolean", Some(t)),
        Some(t) if t.is_integer() || t.is_real() => ("numeric", Some(t)),
        Some(t) => ("string", Some(t)),
        None => ("string", None),
    };
    x.open("KEYVALUE");
    x.attr("VALUETYPE", valuetype);
    if let Some(t) = cim_type {
        x.attr("TYPE", t.as_str());
    }
    x.close();
    if let Some(text) = scalar_text(value) {
        x.text(&text);
    }
    x.end("KEYVALUE");
}

fn emit_namespace(x: &mut Xml, namespace: &str) {
    x.open("LOCALNAMESPACEPATH");
    x.close();
    for part in namespace.split('/') {
        x.open("NAMESPACE");
        x.attr("NAME", part);
        x.close_empty();
    }
    x.end("LOCALNAMESPACEPATH");
}

fn emit_value_reference(x: &mut Xml, path: &CimObjectPath) {
    x.open("VALUE.REFERENCE");
    x.close();
    match path {
        CimObjectPath::Instance(name) => emit_instance_path_shape(x, name),
        CimObjectPath::Class(name) => emit_class_path_shape(x, name),
    }
    x.end("VALUE.REFERENCE");
}

fn emit_instance_path_shape(x: &mut Xml, name: &CimInstanceName) {
    match (&name.host, &name.namespace) {
        (Some(host), Some(namespace)) => {
            x.open("INSTANCEPATH");
            x.close();
            x.open("NAMESPACEPATH");
            x.close();
            x.open("HOST");
            x.close();
            x.text(host);
            x.end("HOST");
            emit_namespace(x, namespace);
            x.end("NAMESPACEPATH");
            emit_instancename(x, name);
            x.end("INSTANCEPATH");
        }
        (None, Some(namespace)) => {
            x.open("LOCALINSTANCEPATH");
            x.close();
            emit_namespace(x, namespace);
            emit_instancename(x, name);
            x.end("LOCALINSTANCEPATH");
        }
        _ => emit_instancename(x, name),
    }
}

fn emit_class_path_shape(x: &mut Xml, name: &CimClassName) {
    let classname = |x: &mut Xml| {
        x.open("CLASSNAME");
        x.attr("NAME", &name.classname);
        x.close_empty();
    };
    match (&name.host, &name.namespace) {
        (Some(host), Some(namespace)) => {
            x.open("CLASSPATH");
            x.close();
            x.open("NAMESPACEPATH");
            x.close();
            x.open("HOST");
            x.close();
            x.text(host);
            x.end("HOST");
            emit_namespace(x, namespace);
            x.end("NAMESPACEPATH");
            classname(x);
            x.end("CLASSPATH");
        }
        (None, Some(namespace)) => {
            x.open("LOCALCLASSPATH");
            x.close();
            emit_namespace(x, namespace);
            classname(x);
            x.end("LOCALCLASSPATH");
        }
        _ => classname(x),
    }
}

fn emit_value(x: &mut Xml, value: &CimValue) {
    match value {
        CimValue::Reference(path) => emit_value_reference(x, path),
        CimValue::EmbeddedInstance(instance) => {
            x.open("VALUE");
            x.close();
            x.text(&instance_to_xml(instance));
            x.end("VALUE");
        }
        CimValue::EmbeddedClass(class) => {
            x.open("VALUE");
            x.close();
            x.text(&class_to_xml(class));
            x.end("VALUE");
        }
        value => {
            x.open("VALUE");
            x.close();
            if let Some(text) = scalar_text(value) {
                x.text(&text);
            }
            x.end("VALUE");
        }
    }
}

fn emit_value_array(x: &mut Xml, items: &[CimValue]) {
    x.open("VALUE.ARRAY");
    x.close();
    for item in items {
        match item {
            CimValue::Null => {
                x.open("VALUE.NULL");
                x.close_empty();
            }
            item => emit_value(x, item),
        }
    }
    x.end("VALUE.ARRAY");
}

/// Lexical form of a scalar value; `None` for the structural variants.
fn scalar_text(value: &CimValue) -> Option<String> {
    Some(match value {
        CimValue::Boolean(b) => b.to_string(),
        CimValue::String(s) => s.clone(),
        CimValue::Char16(c) => c.to_string(),
        CimValue::Uint8(n) => n.to_string(),
        CimValue::Uint16(n) => n.to_string(),
        CimValue::Uint32(n) => n.to_string(),
        CimValue::Uint64(n) => n.to_string(),
        CimValue::Sint8(n) => n.to_string(),
        CimValue::Sint16(n) => n.to_string(),
        CimValue::Sint32(n) => n.to_string(),
        CimValue::Sint64(n) => n.to_string(),
        CimValue::Real32(v) => real_text(*v as f64),
        CimValue::Real64(v) => real_text(*v),
        CimValue::DateTime(dt) => dt.to_string(),
        CimValue::Reference(_)
        | CimValue::EmbeddedInstance(_)
        | CimValue::EmbeddedClass(_)
        | CimValue::Null
        | CimValue::Array(_) => return None,
    })
}

/// Emits reals so they re-parse under the strict grammar: a mandatory
/// decimal point in the mantissa and the spelled-out non-finite tokens.
fn real_text(v: f64) -> String {
    if v.is_nan() {
        return "NaN".to_string();
    }
    if v.is_infinite() {
        return if v > 0.0 { "Infinity" } else { "-Infinity" }.to_string();
    }
    let mut s = format!("{v:?}");
    if !s.contains('.') {
        match s.find(['e', 'E']) {
            Some(pos) => s.insert_str(pos, ".0"),
            None => s.push_str(".0"),
        }
    }
    s
}
