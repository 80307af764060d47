//! CIM object paths: class names, instance names, keybindings.
//!
//! Six wire shapes (CLASSNAME, LOCALCLASSPATH, CLASSPATH, INSTANCENAME,
//! LOCALINSTANCEPATH, INSTANCEPATH) collapse to two results: a class path
//! and an instance path, each with optional namespace and host. Paths are
//! immutable value types; properties that carry a reference own their copy.

use core::fmt;

use crate::nocase::NocaseMap;
use crate::value::CimValue;

/// Key name used for the unnamed-key wire form: an INSTANCENAME whose only
/// child is a bare KEYVALUE or VALUE.REFERENCE carries exactly one binding
/// under this sentinel (DSP0201 INSTANCENAME content model).
pub const UNNAMED_KEY: &str = "";

/// A class path: class name plus optional namespace and host.
#[derive(Debug, Clone, PartialEq)]
pub struct CimClassName {
    pub classname: String,
    pub namespace: Option<String>,
    pub host: Option<String>,
}

impl CimClassName {
    pub fn new(classname: impl Into<String>) -> Self {
        Self {
            classname: classname.into(),
            namespace: None,
            host: None,
        }
    }
}

/// An instance path: class name, keybindings, optional namespace and host.
///
/// Keybindings are an ordered map. Empty keybindings identify the keyless
/// singleton instance of the class; a single entry under [`UNNAMED_KEY`]
/// is the unnamed-key wire form.
#[derive(Debug, Clone, PartialEq)]
pub struct CimInstanceName {
    pub classname: String,
    pub keybindings: NocaseMap<CimValue>,
    pub namespace: Option<String>,
    pub host: Option<String>,
}

impl CimInstanceName {
    pub fn new(classname: impl Into<String>) -> Self {
        Self {
            classname: classname.into(),
            keybindings: NocaseMap::new(),
            namespace: None,
            host: None,
        }
    }

    /// True for the keyless-singleton form (no keybindings at all).
    pub fn is_singleton(&self) -> bool {
        self.keybindings.is_empty()
    }

    /// The unnamed key, if this name uses the bare-KEYVALUE wire form.
    pub fn unnamed_key(&self) -> Option<&CimValue> {
        self.keybindings.get(UNNAMED_KEY)
    }
}

/// Either kind of object path, as produced by VALUE.REFERENCE and OBJECTPATH.
#[derive(Debug, Clone, PartialEq)]
pub enum CimObjectPath {
    Class(CimClassName),
    Instance(CimInstanceName),
}

impl CimObjectPath {
    pub fn classname(&self) -> &str {
        match self {
            Self::Class(c) => &c.classname,
            Self::Instance(i) => &i.classname,
        }
    }

    pub fn namespace(&self) -> Option<&str> {
        match self {
            Self::Class(c) => c.namespace.as_deref(),
            Self::Instance(i) => i.namespace.as_deref(),
        }
    }

    pub fn host(&self) -> Option<&str> {
        match self {
            Self::Class(c) => c.host.as_deref(),
            Self::Instance(i) => i.host.as_deref(),
        }
    }
}

fn fmt_prefix(
    f: &mut fmt::Formatter<'_>,
    host: Option<&str>,
    namespace: Option<&str>,
) -> fmt::Result {
    if let Some(host) = host {
        write!(f, "//{host}/")?;
    }
    if let Some(ns) = namespace {
        write!(f, "{ns}:")?;
    }
    Ok(())
}

impl fmt::Display for CimClassName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt_prefix(f, self.host.as_deref(), self.namespace.as_deref())?;
        f.write_str(&self.classname)
    }
}

impl fmt::Display for CimInstanceName {
    /// WBEM-URI-aehnliche Form, nur fuer Diagnosezwecke.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt_prefix(f, self.host.as_deref(), self.namespace.as_deref())?;
        f.write_str(&self.classname)?;
        for (i, (name, value)) in self.keybindings.iter().enumerate() {
            let sep = if i == 0 { '.' } else { ',' };
            if name.is_empty() {
                write!(f, "{sep}{value:?}")?;
            } else {
                write!(f, "{sep}{name}={value:?}")?;
            }
        }
        Ok(())
    }
}

impl fmt::Display for CimObjectPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Class(c) => c.fmt(f),
            Self::Instance(i) => i.fmt(f),
        }
    }
}
