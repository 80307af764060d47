//! Operation-response parsing: the DSP0200 envelope around the DSP0201
//! object payload.
//!
//! The envelope walk is strict and fixed: CIM, MESSAGE, SIMPLERSP, then
//! IMETHODRESPONSE (intrinsic, catalogue-driven) or METHODRESPONSE
//! (extrinsic, generic). A server-reported ERROR is parsed where it occurs
//! but raised only after the rest of the envelope closed cleanly, so a
//! structurally broken document always surfaces as a grammar error even
//! when it also carries an ERROR element.

use crate::decoder::{
    build_class, build_classname, build_error, build_instance, build_instance_with_path,
    build_instancename, build_instancepath, build_named_instance, build_object,
    build_object_with_path, build_objectpath, build_qualifier_declaration, build_value,
    build_value_array, build_value_refarray, build_value_reference, parse_embedded,
};
use crate::event::Attributes;
use crate::model::{CimObject, EmbeddedObjectKind};
use crate::nocase::NocaseMap;
use crate::operations::{self, Operation, ParamKind, ReturnKind};
use crate::reader::GrammarReader;
use crate::types::CimType;
use crate::value::CimValue;
use crate::{Error, Result};

use crate::model::{CimClass, CimInstance, CimQualifierDeclaration};
use crate::path::{CimClassName, CimInstanceName, CimObjectPath};

/// The typed payload of an IRETURNVALUE (or extrinsic RETURNVALUE).
#[derive(Debug, Clone, PartialEq)]
pub enum ReturnValue {
    /// Void operation, or an extrinsic response without RETURNVALUE.
    None,
    Class(CimClass),
    Classes(Vec<CimClass>),
    ClassNames(Vec<CimClassName>),
    Instance(CimInstance),
    /// Instances with or without path context, depending on the operation.
    Instances(Vec<CimInstance>),
    InstanceName(CimInstanceName),
    InstanceNames(Vec<CimInstanceName>),
    QualifierDeclaration(CimQualifierDeclaration),
    QualifierDeclarations(Vec<CimQualifierDeclaration>),
    Objects(Vec<CimObject>),
    ObjectPaths(Vec<CimObjectPath>),
    Uint64(u64),
    /// Extrinsic method return value.
    Value(CimValue),
}

/// A fully parsed operation response.
///
/// Output parameters are keyed case-insensitively by their wire name; a
/// class-valued parameter (OpenQueryInstances QueryResultClass) is surfaced
/// as an embedded-class value.
#[derive(Debug, Clone, PartialEq)]
pub struct OperationResponse {
    pub return_value: ReturnValue,
    pub output_params: NocaseMap<CimValue>,
}

/// Parses one complete response document for the named operation.
///
/// An IMETHODRESPONSE is parsed against the operation's catalogue row
/// (absent row: void); a METHODRESPONSE takes the generic extrinsic path.
pub fn parse_response(xml: &str, operation: &str) -> Result<OperationResponse> {
    let mut r = GrammarReader::from_str(xml);

    let cim = r.require_start("CIM")?;
    cim.expect_only(&["CIMVERSION", "DTDVERSION"])?;
    check_major(&cim, "CIMVERSION", "2")?;
    check_major(&cim, "DTDVERSION", "2")?;

    let message = r.require_start("MESSAGE")?;
    message.expect_only(&["ID", "PROTOCOLVERSION"])?;
    message.required("ID")?;
    check_major(&message, "PROTOCOLVERSION", "1")?;

    let simplersp = r.require_start("SIMPLERSP")?;
    simplersp.expect_only(&[])?;

    let (element, attrs) = r.require_start_of(&["IMETHODRESPONSE", "METHODRESPONSE"])?;
    attrs.expect_only(&["NAME"])?;
    let answered = attrs.required("NAME")?;
    if !answered.eq_ignore_ascii_case(operation) {
        return Err(Error::OperationMismatch {
            requested: operation.to_string(),
            answered: answered.to_string(),
        });
    }

    // ERROR is parsed eagerly but raised only after the envelope closed;
    // structural defects outrank the server's own failure report.
    let mut deferred = None;
    let mut response = OperationResponse {
        return_value: ReturnValue::None,
        output_params: NocaseMap::new(),
    };
    if r.peek_is_start(Some("ERROR"))? {
        deferred = Some(build_error(&mut r)?);
    } else if element == "IMETHODRESPONSE" {
        // Intrinsic: table-driven. An operation without a catalogue entry
        // is treated as void (no return value, no legal output parameters).
        parse_intrinsic_body(&mut r, operation, operations::lookup(operation), &mut response)?;
    } else {
        parse_extrinsic_body(&mut r, &mut response)?;
    }

    r.require_end(element)?;
    r.require_end("SIMPLERSP")?;
    r.require_end("MESSAGE")?;
    r.require_end("CIM")?;
    r.require_end_of_document()?;

    match deferred {
        Some(err) => Err(Error::Server(Box::new(err))),
        None => Ok(response),
    }
}

/// Byte-level entry point: strips a UTF-8 BOM and rejects non-UTF-8 input.
pub fn parse_response_bytes(bytes: &[u8], operation: &str) -> Result<OperationResponse> {
    let bytes = bytes.strip_prefix(b"\xef\xbb\xbf").unwrap_or(bytes);
    let xml = std::str::from_utf8(bytes)
        .map_err(|e| Error::XmlSyntax(format!("invalid UTF-8: {e}")))?;
    parse_response(xml, operation)
}

/// Version attributes gate on the major component only.
fn check_major(attrs: &Attributes, name: &'static str, want_major: &'static str) -> Result<()> {
    let raw = attrs.required(name)?;
    let major = raw.split('.').next().unwrap_or("");
    if major != want_major {
        return Err(Error::VersionMismatch {
            attribute: name,
            value: raw.to_string(),
            want_major,
        });
    }
    Ok(())
}

// ============================================================================
// Intrinsic bodies (IRETURNVALUE?, IPARAMVALUE*)
// ============================================================================

fn parse_intrinsic_body(
    r: &mut GrammarReader,
    operation: &str,
    op: Option<&'static Operation>,
    response: &mut OperationResponse,
) -> Result<()> {
    let returns = op.map_or(ReturnKind::None, |o| o.returns);
    let output_params = op.map_or(&[][..], |o| o.output_params);

    if returns == ReturnKind::None {
        if r.peek_is_start(Some("IRETURNVALUE"))? {
            return Err(Error::UnexpectedChild {
                parent: "IMETHODRESPONSE".to_string(),
                child: "IRETURNVALUE".to_string(),
            });
        }
    } else if let Some(attrs) = r.try_start("IRETURNVALUE")? {
        attrs.expect_only(&[])?;
        response.return_value = parse_ireturnvalue(r, returns)?;
        r.require_end("IRETURNVALUE")?;
    } else if returns.is_list() {
        // An absent IRETURNVALUE is an empty result for list shapes.
        response.return_value = empty_return(returns);
    } else {
        return Err(Error::MissingChild {
            parent: "IMETHODRESPONSE".to_string(),
        });
    }

    while let Some(attrs) = r.try_start("IPARAMVALUE")? {
        attrs.expect_only(&["NAME"])?;
        let name = attrs.required("NAME")?.to_string();
        let decl = output_params
            .iter()
            .find(|p| p.name.eq_ignore_ascii_case(&name))
            .ok_or_else(|| Error::UnexpectedParameter {
                operation: operation.to_string(),
                parameter: name.clone(),
            })?;
        let value = match decl.kind {
            ParamKind::Boolean if r.peek_is_start(Some("VALUE"))? => {
                build_value(r, CimType::Boolean)?
            }
            ParamKind::String if r.peek_is_start(Some("VALUE"))? => {
                build_value(r, CimType::String)?
            }
            ParamKind::Class if r.peek_is_start(Some("CLASS"))? => {
                CimValue::EmbeddedClass(Box::new(build_class(r)?))
            }
            _ => CimValue::Null,
        };
        r.require_end("IPARAMVALUE")?;
        response.output_params.insert(name, value);
    }

    let missing: Vec<String> = output_params
        .iter()
        .filter(|p| p.required && response.output_params.get(p.name).is_none())
        .map(|p| p.name.to_string())
        .collect();
    if !missing.is_empty() {
        return Err(Error::MissingParameters {
            operation: operation.to_string(),
            parameters: missing,
        });
    }
    Ok(())
}

fn empty_return(kind: ReturnKind) -> ReturnValue {
    match kind {
        ReturnKind::Classes => ReturnValue::Classes(Vec::new()),
        ReturnKind::ClassNames => ReturnValue::ClassNames(Vec::new()),
        ReturnKind::Instances
        | ReturnKind::NamedInstances
        | ReturnKind::InstancesWithPath => ReturnValue::Instances(Vec::new()),
        ReturnKind::InstanceNames | ReturnKind::InstancePaths => {
            ReturnValue::InstanceNames(Vec::new())
        }
        ReturnKind::QualifierDeclarations => ReturnValue::QualifierDeclarations(Vec::new()),
        ReturnKind::ObjectsWithPath | ReturnKind::Objects => ReturnValue::Objects(Vec::new()),
        ReturnKind::ObjectPaths => ReturnValue::ObjectPaths(Vec::new()),
        _ => ReturnValue::None,
    }
}

fn parse_ireturnvalue(r: &mut GrammarReader, kind: ReturnKind) -> Result<ReturnValue> {
    Ok(match kind {
        ReturnKind::None => ReturnValue::None,
        ReturnKind::Class => ReturnValue::Class(build_class(r)?),
        ReturnKind::Classes => {
            let mut items = Vec::new();
            while r.peek_is_start(Some("CLASS"))? {
                items.push(build_class(r)?);
            }
            ReturnValue::Classes(items)
        }
        ReturnKind::ClassNames => {
            let mut items = Vec::new();
            while r.peek_is_start(Some("CLASSNAME"))? {
                items.push(build_classname(r)?);
            }
            ReturnValue::ClassNames(items)
        }
        ReturnKind::Instance => ReturnValue::Instance(build_instance(r)?),
        ReturnKind::Instances => {
            let mut items = Vec::new();
            while r.peek_is_start(Some("INSTANCE"))? {
                items.push(build_instance(r)?);
            }
            ReturnValue::Instances(items)
        }
        ReturnKind::NamedInstances => {
            let mut items = Vec::new();
            while r.peek_is_start(Some("VALUE.NAMEDINSTANCE"))? {
                items.push(build_named_instance(r)?);
            }
            ReturnValue::Instances(items)
        }
        ReturnKind::InstancesWithPath => {
            let mut items = Vec::new();
            while r.peek_is_start(Some("VALUE.INSTANCEWITHPATH"))? {
                items.push(build_instance_with_path(r)?);
            }
            ReturnValue::Instances(items)
        }
        ReturnKind::InstanceName => ReturnValue::InstanceName(build_instancename(r)?),
        ReturnKind::InstanceNames => {
            let mut items = Vec::new();
            while r.peek_is_start(Some("INSTANCENAME"))? {
                items.push(build_instancename(r)?);
            }
            ReturnValue::InstanceNames(items)
        }
        ReturnKind::InstancePaths => {
            let mut items = Vec::new();
            while r.peek_is_start(Some("INSTANCEPATH"))? {
                items.push(build_instancepath(r)?);
            }
            ReturnValue::InstanceNames(items)
        }
        ReturnKind::QualifierDeclaration => {
            ReturnValue::QualifierDeclaration(build_qualifier_declaration(r)?)
        }
        ReturnKind::QualifierDeclarations => {
            let mut items = Vec::new();
            while r.peek_is_start(Some("QUALIFIER.DECLARATION"))? {
                items.push(build_qualifier_declaration(r)?);
            }
            ReturnValue::QualifierDeclarations(items)
        }
        ReturnKind::ObjectsWithPath => {
            let mut items = Vec::new();
            while r.peek_is_start(Some("VALUE.OBJECTWITHPATH"))? {
                items.push(build_object_with_path(r)?);
            }
            ReturnValue::Objects(items)
        }
        ReturnKind::Objects => {
            let mut items = Vec::new();
            while r.peek_is_start(Some("VALUE.OBJECT"))? {
                items.push(build_object(r)?);
            }
            ReturnValue::Objects(items)
        }
        ReturnKind::ObjectPaths => {
            let mut items = Vec::new();
            while r.peek_is_start(Some("OBJECTPATH"))? {
                items.push(build_objectpath(r)?);
            }
            ReturnValue::ObjectPaths(items)
        }
        ReturnKind::Uint64 => match build_value(r, CimType::Uint64)? {
            CimValue::Uint64(n) => ReturnValue::Uint64(n),
            other => {
                return Err(Error::internal(format!(
                    "uint64 VALUE decoded to {other:?}"
                )));
            }
        },
    })
}

// ============================================================================
// Extrinsic bodies (RETURNVALUE?, PARAMVALUE*)
// ============================================================================

fn parse_extrinsic_body(r: &mut GrammarReader, response: &mut OperationResponse) -> Result<()> {
    if let Some(attrs) = r.try_start("RETURNVALUE")? {
        attrs.expect_only(&["PARAMTYPE", "EmbeddedObject"])?;
        let ty = paramtype(&attrs)?.unwrap_or(CimType::String);
        let value = match r.peek_start_of(&["VALUE", "VALUE.REFERENCE"])? {
            Some("VALUE") => build_value(r, ty)?,
            Some("VALUE.REFERENCE") => CimValue::Reference(build_value_reference(r)?),
            _ => CimValue::Null,
        };
        r.require_end("RETURNVALUE")?;
        response.return_value = ReturnValue::Value(value);
    }

    while let Some(attrs) = r.try_start("PARAMVALUE")? {
        attrs.expect_only(&["NAME", "PARAMTYPE", "EmbeddedObject"])?;
        let name = attrs.required("NAME")?.to_string();
        let ty = paramtype(&attrs)?.unwrap_or(CimType::String);
        let embedded = match attrs.optional_nocase("EmbeddedObject") {
            None => None,
            Some("instance") => Some(EmbeddedObjectKind::Instance),
            Some("object") => Some(EmbeddedObjectKind::Object),
            Some(v) => {
                return Err(Error::InvalidAttributeValue {
                    element: "PARAMVALUE".into(),
                    attribute: "EmbeddedObject".into(),
                    value: v.to_string(),
                });
            }
        };
        let value = match r.peek_start_of(&[
            "VALUE",
            "VALUE.REFERENCE",
            "VALUE.ARRAY",
            "VALUE.REFARRAY",
        ])? {
            Some("VALUE") => {
                let v = build_value(r, if embedded.is_some() { CimType::String } else { ty })?;
                match (embedded, v) {
                    (Some(kind), CimValue::String(text)) => parse_embedded(&text, kind, &name)?,
                    (_, v) => v,
                }
            }
            Some("VALUE.REFERENCE") => CimValue::Reference(build_value_reference(r)?),
            Some("VALUE.ARRAY") => {
                let element_ty = if embedded.is_some() { CimType::String } else { ty };
                let mut items = build_value_array(r, element_ty)?;
                if let Some(kind) = embedded {
                    for item in &mut items {
                        if let CimValue::String(text) = item {
                            *item = parse_embedded(text, kind, &name)?;
                        }
                    }
                }
                CimValue::Array(items)
            }
            Some("VALUE.REFARRAY") => CimValue::Array(build_value_refarray(r)?),
            _ => CimValue::Null,
        };
        r.require_end("PARAMVALUE")?;
        response.output_params.insert(name, value);
    }
    Ok(())
}

fn paramtype(attrs: &Attributes) -> Result<Option<CimType>> {
    match attrs.optional("PARAMTYPE") {
        None => Ok(None),
        Some(raw) => CimType::from_attr(raw)
            .map(Some)
            .ok_or_else(|| Error::InvalidAttributeValue {
                element: attrs.element().to_string().into(),
                attribute: "PARAMTYPE".into(),
                value: raw.to_string(),
            }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ErrorKind;

    fn envelope(op: &str, body: &str) -> String {
        format!(
            r#"<?xml version="1.0" encoding="utf-8"?>
<CIM CIMVERSION="2.0" DTDVERSION="2.4">
 <MESSAGE ID="42" PROTOCOLVERSION="1.4">
  <SIMPLERSP>
   <IMETHODRESPONSE NAME="{op}">{body}</IMETHODRESPONSE>
  </SIMPLERSP>
 </MESSAGE>
</CIM>"#
        )
    }

    #[test]
    fn void_operation_with_empty_body() {
        let xml = envelope("DeleteInstance", "");
        let resp = parse_response(&xml, "DeleteInstance").unwrap();
        assert_eq!(resp.return_value, ReturnValue::None);
        assert!(resp.output_params.is_empty());
    }

    #[test]
    fn void_operation_rejects_returnvalue() {
        let xml = envelope("DeleteInstance", "<IRETURNVALUE/>");
        let err = parse_response(&xml, "DeleteInstance").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Grammar);
        assert!(err.to_string().contains("IRETURNVALUE"), "{err}");
    }

    #[test]
    fn uncatalogued_intrinsic_is_void() {
        // GetProperty has no catalogue row: an IMETHODRESPONSE for it is
        // parsed as void, so a return value or output parameter is an error.
        let xml = envelope("GetProperty", "");
        let resp = parse_response(&xml, "GetProperty").unwrap();
        assert_eq!(resp.return_value, ReturnValue::None);

        let xml = envelope(
            "GetProperty",
            "<IRETURNVALUE><VALUE>x</VALUE></IRETURNVALUE>",
        );
        let err = parse_response(&xml, "GetProperty").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Grammar);
    }

    #[test]
    fn list_operation_tolerates_absent_returnvalue() {
        let xml = envelope("EnumerateInstances", "");
        let resp = parse_response(&xml, "EnumerateInstances").unwrap();
        assert_eq!(resp.return_value, ReturnValue::Instances(Vec::new()));
    }

    #[test]
    fn single_operation_requires_returnvalue() {
        let xml = envelope("GetClass", "");
        let err = parse_response(&xml, "GetClass").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Grammar);
    }

    #[test]
    fn operation_name_mismatch() {
        let xml = envelope("GetClass", r#"<IRETURNVALUE><CLASS NAME="X"/></IRETURNVALUE>"#);
        let err = parse_response(&xml, "GetInstance").unwrap_err();
        assert!(err.to_string().contains("GetClass"), "{err}");
        assert!(err.to_string().contains("GetInstance"), "{err}");
    }

    #[test]
    fn operation_name_match_is_nocase() {
        let xml = envelope("GETCLASS", r#"<IRETURNVALUE><CLASS NAME="X"/></IRETURNVALUE>"#);
        let resp = parse_response(&xml, "GetClass").unwrap();
        assert!(matches!(resp.return_value, ReturnValue::Class(_)));
    }

    #[test]
    fn version_gates_check_major_only() {
        let xml = r#"<CIM CIMVERSION="3.0" DTDVERSION="2.4">
 <MESSAGE ID="1" PROTOCOLVERSION="1.0"><SIMPLERSP>
  <IMETHODRESPONSE NAME="DeleteClass"/>
 </SIMPLERSP></MESSAGE></CIM>"#;
        let err = parse_response(xml, "DeleteClass").unwrap_err();
        assert!(err.to_string().contains("CIMVERSION"), "{err}");

        // Minor versions beyond the known ones pass.
        let xml = r#"<CIM CIMVERSION="2.9" DTDVERSION="2.9">
 <MESSAGE ID="1" PROTOCOLVERSION="1.9"><SIMPLERSP>
  <IMETHODRESPONSE NAME="DeleteClass"/>
 </SIMPLERSP></MESSAGE></CIM>"#;
        parse_response(xml, "DeleteClass").unwrap();
    }

    #[test]
    fn message_requires_id() {
        let xml = r#"<CIM CIMVERSION="2.0" DTDVERSION="2.0">
 <MESSAGE PROTOCOLVERSION="1.0"><SIMPLERSP>
  <IMETHODRESPONSE NAME="DeleteClass"/>
 </SIMPLERSP></MESSAGE></CIM>"#;
        let err = parse_response(xml, "DeleteClass").unwrap_err();
        assert!(err.to_string().contains("ID"), "{err}");
    }

    #[test]
    fn unknown_output_parameter_rejected() {
        let xml = envelope(
            "GetInstance",
            r#"<IRETURNVALUE><INSTANCE CLASSNAME="CIM_Foo"/></IRETURNVALUE>
               <IPARAMVALUE NAME="Bogus"><VALUE>1</VALUE></IPARAMVALUE>"#,
        );
        let err = parse_response(&xml, "GetInstance").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Grammar);
        assert!(err.to_string().contains("Bogus"), "{err}");
    }

    #[test]
    fn missing_required_parameters_batched() {
        let xml = envelope("OpenEnumerateInstances", "<IRETURNVALUE/>");
        let err = parse_response(&xml, "OpenEnumerateInstances").unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("EnumerationContext"), "{msg}");
        assert!(msg.contains("EndOfSequence"), "{msg}");
    }

    #[test]
    fn pull_response_with_enumeration_outputs() {
        let xml = envelope(
            "PullInstancesWithPath",
            r#"<IRETURNVALUE>
                <VALUE.INSTANCEWITHPATH>
                 <INSTANCEPATH>
                  <NAMESPACEPATH><HOST>srv</HOST>
                   <LOCALNAMESPACEPATH><NAMESPACE NAME="root"/><NAMESPACE NAME="cimv2"/></LOCALNAMESPACEPATH>
                  </NAMESPACEPATH>
                  <INSTANCENAME CLASSNAME="CIM_Foo">
                   <KEYBINDING NAME="Id"><KEYVALUE VALUETYPE="numeric" TYPE="uint32">7</KEYVALUE></KEYBINDING>
                  </INSTANCENAME>
                 </INSTANCEPATH>
                 <INSTANCE CLASSNAME="CIM_Foo">
                  <PROPERTY NAME="Id" TYPE="uint32"><VALUE>7</VALUE></PROPERTY>
                 </INSTANCE>
                </VALUE.INSTANCEWITHPATH>
               </IRETURNVALUE>
               <IPARAMVALUE NAME="EnumerationContext"><VALUE>ctx-1</VALUE></IPARAMVALUE>
               <IPARAMVALUE NAME="EndOfSequence"><VALUE>TRUE</VALUE></IPARAMVALUE>"#,
        );
        let resp = parse_response(&xml, "PullInstancesWithPath").unwrap();
        let ReturnValue::Instances(instances) = &resp.return_value else {
            panic!("expected instances, got {:?}", resp.return_value);
        };
        assert_eq!(instances.len(), 1);
        let path = instances[0].path.as_ref().unwrap();
        assert_eq!(path.host.as_deref(), Some("srv"));
        assert_eq!(path.namespace.as_deref(), Some("root/cimv2"));
        assert_eq!(
            resp.output_params.get("enumerationcontext"),
            Some(&CimValue::String("ctx-1".into()))
        );
        assert_eq!(
            resp.output_params.get("EndOfSequence"),
            Some(&CimValue::Boolean(true))
        );
    }

    #[test]
    fn server_error_is_deferred_behind_envelope_checks() {
        // Intact envelope: the ERROR surfaces as a server error.
        let xml = envelope("GetInstance", r#"<ERROR CODE="6" DESCRIPTION="gone"/>"#);
        let err = parse_response(&xml, "GetInstance").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Server);
        assert!(err.to_string().contains("CIM_ERR_NOT_FOUND"), "{err}");

        // Broken envelope after the ERROR: the grammar error wins.
        let xml = r#"<CIM CIMVERSION="2.0" DTDVERSION="2.0">
 <MESSAGE ID="1" PROTOCOLVERSION="1.0"><SIMPLERSP>
  <IMETHODRESPONSE NAME="GetInstance"><ERROR CODE="6"/><STRAGGLER/></IMETHODRESPONSE>
 </SIMPLERSP></MESSAGE></CIM>"#;
        let err = parse_response(xml, "GetInstance").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Grammar);
    }

    #[test]
    fn extrinsic_method_response() {
        let xml = r#"<CIM CIMVERSION="2.0" DTDVERSION="2.0">
 <MESSAGE ID="7" PROTOCOLVERSION="1.0"><SIMPLERSP>
  <METHODRESPONSE NAME="RequestStateChange">
   <RETURNVALUE PARAMTYPE="uint32"><VALUE>4096</VALUE></RETURNVALUE>
   <PARAMVALUE NAME="Job" PARAMTYPE="reference">
    <VALUE.REFERENCE>
     <INSTANCENAME CLASSNAME="CIM_Job">
      <KEYBINDING NAME="Id"><KEYVALUE VALUETYPE="string">j1</KEYVALUE></KEYBINDING>
     </INSTANCENAME>
    </VALUE.REFERENCE>
   </PARAMVALUE>
  </METHODRESPONSE>
 </SIMPLERSP></MESSAGE></CIM>"#;
        let resp = parse_response(xml, "RequestStateChange").unwrap();
        assert_eq!(resp.return_value, ReturnValue::Value(CimValue::Uint32(4096)));
        match resp.output_params.get("Job") {
            Some(CimValue::Reference(path)) => assert_eq!(path.classname(), "CIM_Job"),
            other => panic!("expected reference, got {other:?}"),
        }
    }

    #[test]
    fn enumeration_count_returns_uint64() {
        let xml = envelope(
            "EnumerationCount",
            "<IRETURNVALUE><VALUE>12345</VALUE></IRETURNVALUE>",
        );
        let resp = parse_response(&xml, "EnumerationCount").unwrap();
        assert_eq!(resp.return_value, ReturnValue::Uint64(12345));
    }

    #[test]
    fn bom_is_stripped() {
        let xml = envelope("DeleteClass", "");
        let mut bytes = b"\xef\xbb\xbf".to_vec();
        bytes.extend_from_slice(xml.as_bytes());
        parse_response_bytes(&bytes, "DeleteClass").unwrap();
    }

    #[test]
    fn trailing_garbage_after_envelope_rejected() {
        let mut xml = envelope("DeleteClass", "");
        xml.push_str("<EXTRA/>");
        let err = parse_response(&xml, "DeleteClass").unwrap_err();
        // quick-xml flags a second root as a syntax defect.
        assert!(matches!(
            err.kind(),
            ErrorKind::Grammar | ErrorKind::XmlSyntax
        ));
    }
}
