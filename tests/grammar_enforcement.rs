//! Strictness tests: documents that are well-formed XML but violate the
//! element grammar must fail with grammar-class errors, and the few
//! tolerated server defects must stay the only exceptions.

use cimx::decoder::{
    build_instance, build_instancename, build_keyvalue, build_property, build_value,
};
use cimx::reader::GrammarReader;
use cimx::types::CimType;
use cimx::value::CimValue;
use cimx::{Error, ErrorKind};

fn reader(xml: &str) -> GrammarReader<'_> {
    GrammarReader::from_str(xml)
}

#[test]
fn missing_required_attribute() {
    let mut r = reader("<PROPERTY TYPE=\"string\"/>");
    let err = build_property(&mut r).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Grammar);
    assert!(err.to_string().contains("NAME"), "{err}");
}

#[test]
fn unexpected_extra_attribute() {
    let mut r = reader(r#"<INSTANCE CLASSNAME="CIM_Foo" SUPERCLASS="CIM_Bar"/>"#);
    let err = build_instance(&mut r).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Grammar);
    assert!(err.to_string().contains("SUPERCLASS"), "{err}");
}

#[test]
fn miscased_known_attribute_rejected() {
    // Attribute names are case-sensitive: a wrongly cased SUPERCLASS must
    // not be accepted and silently dropped.
    let mut r = reader(r#"<CLASS NAME="X" Superclass="Y"/>"#);
    let err = cimx::decoder::build_class(&mut r).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Grammar);
    assert!(err.to_string().contains("Superclass"), "{err}");

    // Same for a miscased TYPE on a VALUE, which would otherwise bypass
    // the declared-type agreement check.
    let mut r = reader(r#"<VALUE Type="uint16">7</VALUE>"#);
    let err = build_value(&mut r, CimType::Uint32).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Grammar);
    assert!(err.to_string().contains("Type"), "{err}");
}

#[test]
fn namespace_declarations_are_not_extra_attributes() {
    let mut r = reader(r#"<INSTANCE xmlns="urn:x" CLASSNAME="CIM_Foo"/>"#);
    build_instance(&mut r).unwrap();
}

#[test]
fn out_of_order_children_rejected() {
    // Qualifiers must precede properties; a trailing QUALIFIER is an
    // unexpected child where a property or the end was expected.
    let xml = r#"<INSTANCE CLASSNAME="CIM_Foo">
        <PROPERTY NAME="P" TYPE="string"/>
        <QUALIFIER NAME="Q" TYPE="boolean"/>
       </INSTANCE>"#;
    let mut r = reader(xml);
    let err = build_instance(&mut r).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Grammar);
}

#[test]
fn text_where_children_belong() {
    let mut r = reader("<INSTANCE CLASSNAME=\"CIM_Foo\">stray</INSTANCE>");
    let err = build_instance(&mut r).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Grammar);
    assert!(err.to_string().contains("stray"), "{err}");
}

#[test]
fn instancename_mixed_key_forms_rejected() {
    // A KEYBINDING run followed by a bare KEYVALUE is not one of the three
    // alternative content models.
    let xml = r#"<INSTANCENAME CLASSNAME="CIM_Foo">
        <KEYBINDING NAME="A"><KEYVALUE VALUETYPE="string">x</KEYVALUE></KEYBINDING>
        <KEYVALUE VALUETYPE="string">y</KEYVALUE>
       </INSTANCENAME>"#;
    let mut r = reader(xml);
    let err = build_instancename(&mut r).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Grammar);
}

#[test]
fn value_decode_and_range_classification() {
    let mut r = reader("<VALUE>256</VALUE>");
    let err = build_value(&mut r, CimType::Uint8).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Range);

    let mut r = reader("<VALUE>abc</VALUE>");
    let err = build_value(&mut r, CimType::Uint8).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Decode);

    let mut r = reader("<VALUE>0xFF</VALUE>");
    assert_eq!(
        build_value(&mut r, CimType::Uint8).unwrap(),
        CimValue::Uint8(255)
    );
}

#[test]
fn real_without_decimal_point_rejected() {
    let mut r = reader("<VALUE>42</VALUE>");
    let err = build_value(&mut r, CimType::Real64).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Decode);

    let mut r = reader("<VALUE>-Infinity</VALUE>");
    assert_eq!(
        build_value(&mut r, CimType::Real64).unwrap(),
        CimValue::Real64(f64::NEG_INFINITY)
    );
}

#[test]
fn keyvalue_tolerances_are_exactly_two() {
    // Allowlisted: empty TYPE attribute falls back to the VALUETYPE default.
    let mut r = reader(r#"<KEYVALUE VALUETYPE="numeric" TYPE="">17</KEYVALUE>"#);
    assert_eq!(build_keyvalue(&mut r).unwrap(), CimValue::Uint64(17));

    // Not allowlisted: an invalid (non-empty) TYPE keyword stays an error.
    let mut r = reader(r#"<KEYVALUE VALUETYPE="numeric" TYPE="int">17</KEYVALUE>"#);
    let err = build_keyvalue(&mut r).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Grammar);

    // Allowlisted: empty boolean text decodes to Null.
    let mut r = reader("<VALUE></VALUE>");
    assert_eq!(
        build_value(&mut r, CimType::Boolean).unwrap(),
        CimValue::Null
    );

    // Not allowlisted: empty integer text stays a decode error.
    let mut r = reader("<VALUE></VALUE>");
    assert!(build_value(&mut r, CimType::Uint32).is_err());
}

#[test]
fn embedded_depth_is_capped() {
    // Build a tower of embedded instances deeper than the cap by nesting
    // the escaped form manually.
    let mut doc = r#"<INSTANCE CLASSNAME="L0"/>"#.to_string();
    for i in 1..=10 {
        let escaped = doc.replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;");
        doc = format!(
            r#"<INSTANCE CLASSNAME="L{i}"><PROPERTY NAME="Inner" TYPE="string" EmbeddedObject="instance"><VALUE>{escaped}</VALUE></PROPERTY></INSTANCE>"#
        );
    }
    let mut r = reader(&doc);
    let err = build_instance(&mut r).unwrap_err();
    // The depth failure is wrapped per enclosing property on the way out.
    let mut cause: &Error = &err;
    while let Error::EmbeddedParse { source, .. } = cause {
        cause = source;
    }
    assert!(
        matches!(cause, Error::EmbeddedDepth { .. }),
        "unexpected cause: {cause:?}"
    );
}

#[test]
fn embedded_wrong_declared_type_rejected() {
    let mut r = reader(
        r#"<PROPERTY NAME="Cfg" TYPE="uint32" EmbeddedObject="instance"><VALUE>1</VALUE></PROPERTY>"#,
    );
    let err = build_property(&mut r).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Grammar);
    assert!(err.to_string().contains("string"), "{err}");
}

#[test]
fn embedded_object_kind_accepts_class_or_instance() {
    let class = r#"<CLASS NAME="CIM_X"/>"#.replace('<', "&lt;").replace('>', "&gt;");
    let xml = format!(
        r#"<PROPERTY NAME="Def" TYPE="string" EmbeddedObject="object"><VALUE>{class}</VALUE></PROPERTY>"#
    );
    let mut r = reader(&xml);
    let prop = build_property(&mut r).unwrap();
    assert!(matches!(prop.value, CimValue::EmbeddedClass(_)));

    // EmbeddedObject="instance" must not accept a class document.
    let class = r#"<CLASS NAME="CIM_X"/>"#.replace('<', "&lt;").replace('>', "&gt;");
    let xml = format!(
        r#"<PROPERTY NAME="Def" TYPE="string" EmbeddedObject="instance"><VALUE>{class}</VALUE></PROPERTY>"#
    );
    let mut r = reader(&xml);
    let err = build_property(&mut r).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Grammar);
    assert!(err.to_string().contains("Def"), "{err}");
}

#[test]
fn char16_requires_single_unit() {
    let mut r = reader("<VALUE>ab</VALUE>");
    assert!(build_value(&mut r, CimType::Char16).is_err());

    let mut r = reader("<VALUE>&#xE4;</VALUE>");
    assert_eq!(
        build_value(&mut r, CimType::Char16).unwrap(),
        CimValue::Char16('ä')
    );
}

#[test]
fn datetime_lexical_enforcement() {
    let mut r = reader("<VALUE>20260831120000.000000+000</VALUE>");
    assert!(build_value(&mut r, CimType::DateTime).is_ok());

    // Wrong discriminator position.
    let mut r = reader("<VALUE>20260831120000.000000*000</VALUE>");
    assert!(build_value(&mut r, CimType::DateTime).is_err());

    // Interval form.
    let mut r = reader("<VALUE>00000012063022.000000:000</VALUE>");
    assert!(build_value(&mut r, CimType::DateTime).is_ok());
}
