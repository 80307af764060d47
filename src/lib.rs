//! cimx: a strict client-side codec for CIM-XML operation responses
//! (DSP0201 XML representation, DSP0200 operations over HTTP).
//!
//! The crate parses one complete response document into typed CIM objects:
//! classes, instances, qualifiers, object paths and values. Parsing is
//! grammar-first and closed-world: elements, attributes and output
//! parameters outside the DSP0201/DSP0200 content models are errors, and
//! the few tolerated server defects are an explicit, warning-logged
//! allowlist rather than a lenient mode.
//!
//! # Example
//!
//! ```
//! use cimx::{parse_response, ReturnValue};
//!
//! let xml = r#"<CIM CIMVERSION="2.0" DTDVERSION="2.0">
//!  <MESSAGE ID="1001" PROTOCOLVERSION="1.0">
//!   <SIMPLERSP>
//!    <IMETHODRESPONSE NAME="GetClass">
//!     <IRETURNVALUE>
//!      <CLASS NAME="CIM_Fan" SUPERCLASS="CIM_Cooler">
//!       <PROPERTY NAME="DesiredSpeed" TYPE="uint64">
//!        <VALUE>4200</VALUE>
//!       </PROPERTY>
//!      </CLASS>
//!     </IRETURNVALUE>
//!    </IMETHODRESPONSE>
//!   </SIMPLERSP>
//!  </MESSAGE>
//! </CIM>"#;
//!
//! let response = parse_response(xml, "GetClass")?;
//! let ReturnValue::Class(class) = response.return_value else {
//!     panic!("GetClass answers with a class");
//! };
//! assert_eq!(class.classname, "CIM_Fan");
//! assert_eq!(class.superclass.as_deref(), Some("CIM_Cooler"));
//! assert_eq!(
//!     class.properties.get("desiredspeed").unwrap().value,
//!     cimx::CimValue::Uint64(4200)
//! );
//! # Ok::<(), cimx::Error>(())
//! ```
//!
//! Documents are parsed from memory in a single pass with one-token
//! lookahead; no state is shared between parses.

pub mod datetime;
pub mod decoder;
pub mod encoder;
pub mod error;
pub mod event;
pub mod model;
pub mod nocase;
pub mod operations;
pub mod path;
pub mod reader;
pub mod response;
pub mod types;
pub mod value;

/// IndexMap mit ahash: deterministische Reihenfolge, schnelles Hashing.
pub(crate) type FastIndexMap<K, V> = indexmap::IndexMap<K, V, ahash::RandomState>;

pub use datetime::CimDateTime;
pub use error::{Error, ErrorKind, Result};
pub use model::{
    CimClass, CimError, CimInstance, CimMethod, CimObject, CimParameter, CimProperty,
    CimQualifier, CimQualifierDeclaration, EmbeddedObjectKind, QualifierFlavor, QualifierScope,
};
pub use nocase::NocaseMap;
pub use path::{CimClassName, CimInstanceName, CimObjectPath, UNNAMED_KEY};
pub use response::{OperationResponse, ReturnValue, parse_response, parse_response_bytes};
pub use types::CimType;
pub use value::CimValue;
