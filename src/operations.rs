//! The intrinsic-operation catalogue (DSP0200 5.3): a compile-time table
//! mapping each operation name to the shape of its response.
//!
//! The table is the single source of truth for response parsing: the
//! return-value kind selects the IRETURNVALUE content model, and the
//! output-parameter list is closed-world. A parameter the table does not
//! define is a grammar error, and required parameters that never arrive
//! are reported together once the parameter run ends.

/// Content model of an operation's IRETURNVALUE.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReturnKind {
    /// No IRETURNVALUE at all (void operations).
    None,
    /// Exactly one CLASS.
    Class,
    /// Zero or more CLASS elements.
    Classes,
    /// Zero or more CLASSNAME elements.
    ClassNames,
    /// Exactly one INSTANCE.
    Instance,
    /// Zero or more INSTANCE elements (PullInstances, OpenQueryInstances).
    Instances,
    /// Zero or more VALUE.NAMEDINSTANCE elements.
    NamedInstances,
    /// Zero or more VALUE.INSTANCEWITHPATH elements (pull family).
    InstancesWithPath,
    /// Exactly one INSTANCENAME (CreateInstance).
    InstanceName,
    /// Zero or more INSTANCENAME elements (EnumerateInstanceNames).
    InstanceNames,
    /// Zero or more INSTANCEPATH elements (path-pull family).
    InstancePaths,
    /// Exactly one QUALIFIER.DECLARATION.
    QualifierDeclaration,
    /// Zero or more QUALIFIER.DECLARATION elements.
    QualifierDeclarations,
    /// Zero or more VALUE.OBJECTWITHPATH elements (association traversal).
    ObjectsWithPath,
    /// Zero or more VALUE.OBJECT elements (ExecQuery).
    Objects,
    /// Zero or more OBJECTPATH elements (association name traversal).
    ObjectPaths,
    /// A single uint64 VALUE (EnumerationCount).
    Uint64,
}

impl ReturnKind {
    /// List-shaped kinds tolerate an absent IRETURNVALUE (empty result);
    /// single-valued kinds require one.
    pub fn is_list(self) -> bool {
        !matches!(
            self,
            Self::Class
                | Self::Instance
                | Self::InstanceName
                | Self::QualifierDeclaration
                | Self::Uint64
        )
    }
}

/// Value shape of a declared output parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamKind {
    Boolean,
    String,
    /// A CLASS child instead of a VALUE (OpenQueryInstances QueryResultClass).
    Class,
}

/// One output parameter an operation may answer with.
#[derive(Debug, Clone, Copy)]
pub struct OutputParam {
    pub name: &'static str,
    pub required: bool,
    pub kind: ParamKind,
}

/// One row of the operation catalogue.
#[derive(Debug, Clone, Copy)]
pub struct Operation {
    pub name: &'static str,
    pub returns: ReturnKind,
    pub output_params: &'static [OutputParam],
}

/// EnumerationContext/EndOfSequence pair of the open/pull family. Both are
/// required on the wire; EnumerationContext may be an empty value once the
/// enumeration is exhausted.
const ENUM_PARAMS: &[OutputParam] = &[
    OutputParam {
        name: "EnumerationContext",
        required: true,
        kind: ParamKind::String,
    },
    OutputParam {
        name: "EndOfSequence",
        required: true,
        kind: ParamKind::Boolean,
    },
];

const QUERY_ENUM_PARAMS: &[OutputParam] = &[
    OutputParam {
        name: "EnumerationContext",
        required: true,
        kind: ParamKind::String,
    },
    OutputParam {
        name: "EndOfSequence",
        required: true,
        kind: ParamKind::Boolean,
    },
    OutputParam {
        name: "QueryResultClass",
        required: false,
        kind: ParamKind::Class,
    },
];

macro_rules! op {
    ($name:literal, $returns:expr) => {
        Operation {
            name: $name,
            returns: $returns,
            output_params: &[],
        }
    };
    ($name:literal, $returns:expr, $params:expr) => {
        Operation {
            name: $name,
            returns: $returns,
            output_params: $params,
        }
    };
}

/// The catalogue (DSP0200 5.3 intrinsic methods plus the 5.4 pulled
/// enumeration family).
pub const OPERATIONS: &[Operation] = &[
    // Class operations
    op!("GetClass", ReturnKind::Class),
    op!("EnumerateClasses", ReturnKind::Classes),
    op!("EnumerateClassNames", ReturnKind::ClassNames),
    op!("CreateClass", ReturnKind::None),
    op!("ModifyClass", ReturnKind::None),
    op!("DeleteClass", ReturnKind::None),
    // Instance operations
    op!("GetInstance", ReturnKind::Instance),
    op!("EnumerateInstances", ReturnKind::NamedInstances),
    op!("EnumerateInstanceNames", ReturnKind::InstanceNames),
    op!("CreateInstance", ReturnKind::InstanceName),
    op!("ModifyInstance", ReturnKind::None),
    op!("DeleteInstance", ReturnKind::None),
    // Association traversal
    op!("Associators", ReturnKind::ObjectsWithPath),
    op!("AssociatorNames", ReturnKind::ObjectPaths),
    op!("References", ReturnKind::ObjectsWithPath),
    op!("ReferenceNames", ReturnKind::ObjectPaths),
    // Query
    op!("ExecQuery", ReturnKind::Objects),
    // Qualifier declarations
    op!("GetQualifier", ReturnKind::QualifierDeclaration),
    op!("EnumerateQualifiers", ReturnKind::QualifierDeclarations),
    op!("SetQualifier", ReturnKind::None),
    op!("DeleteQualifier", ReturnKind::None),
    // Pulled enumeration family
    op!(
        "OpenEnumerateInstances",
        ReturnKind::InstancesWithPath,
        ENUM_PARAMS
    ),
    op!(
        "OpenEnumerateInstancePaths",
        ReturnKind::InstancePaths,
        ENUM_PARAMS
    ),
    op!(
        "OpenAssociatorInstances",
        ReturnKind::InstancesWithPath,
        ENUM_PARAMS
    ),
    op!(
        "OpenAssociatorInstancePaths",
        ReturnKind::InstancePaths,
        ENUM_PARAMS
    ),
    op!(
        "OpenReferenceInstances",
        ReturnKind::InstancesWithPath,
        ENUM_PARAMS
    ),
    op!(
        "OpenReferenceInstancePaths",
        ReturnKind::InstancePaths,
        ENUM_PARAMS
    ),
    op!(
        "OpenQueryInstances",
        ReturnKind::Instances,
        QUERY_ENUM_PARAMS
    ),
    op!(
        "PullInstancesWithPath",
        ReturnKind::InstancesWithPath,
        ENUM_PARAMS
    ),
    op!("PullInstancePaths", ReturnKind::InstancePaths, ENUM_PARAMS),
    op!("PullInstances", ReturnKind::Instances, ENUM_PARAMS),
    op!("CloseEnumeration", ReturnKind::None),
    op!("EnumerationCount", ReturnKind::Uint64),
];

/// Looks up an operation by name, case-insensitively (operation names on
/// the wire are case-preserving but compared case-insensitively).
pub fn lookup(name: &str) -> Option<&'static Operation> {
    OPERATIONS.iter().find(|op| op.name.eq_ignore_ascii_case(name))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_is_nocase() {
        assert_eq!(lookup("getclass").map(|o| o.name), Some("GetClass"));
        assert_eq!(lookup("GETINSTANCE").map(|o| o.name), Some("GetInstance"));
        assert!(lookup("NoSuchOperation").is_none());
    }

    #[test]
    fn names_are_unique() {
        for (i, a) in OPERATIONS.iter().enumerate() {
            for b in &OPERATIONS[i + 1..] {
                assert!(
                    !a.name.eq_ignore_ascii_case(b.name),
                    "duplicate operation {}",
                    a.name
                );
            }
        }
    }

    #[test]
    fn pull_family_declares_enumeration_outputs() {
        let op = lookup("OpenEnumerateInstances").unwrap();
        let required: Vec<&str> = op
            .output_params
            .iter()
            .filter(|p| p.required)
            .map(|p| p.name)
            .collect();
        assert_eq!(required, ["EnumerationContext", "EndOfSequence"]);
    }

    #[test]
    fn single_vs_list_kinds() {
        assert!(!ReturnKind::Class.is_list());
        assert!(!ReturnKind::Uint64.is_list());
        assert!(ReturnKind::Classes.is_list());
        assert!(ReturnKind::None.is_list());
        assert!(ReturnKind::ObjectPaths.is_list());
    }
}
