//! Token Source: adapts the quick-xml tokenizer into a flat stream of
//! start/end element events with a single putback slot.
//!
//! CIM-XML (DSP0201) is parseable with one-token lookahead, so the putback
//! "stack" is a plain `Option` owned by the source; the at-most-one-pending
//! invariant is structural. A second putback without an intervening `next()`
//! is a programmer defect and fails with an internal error.
//!
//! Self-closing elements always yield a Start followed by an End, never a
//! fused event. Comments, processing instructions and doctype declarations
//! are dropped. Character data is accumulated onto the following End event;
//! non-whitespace text in front of a start element (between elements) is
//! rejected here, non-whitespace element content is the grammar reader's
//! call.

use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};

use crate::FastIndexMap;
use crate::{Error, Result};

/// Attribute map of one start element, insertion order preserved.
#[derive(Debug, Clone, Default)]
pub struct Attributes {
    element: String,
    map: FastIndexMap<String, String>,
}

impl Attributes {
    pub(crate) fn new(element: String, map: FastIndexMap<String, String>) -> Self {
        Self { element, map }
    }

    /// The element the attributes belong to.
    pub fn element(&self) -> &str {
        &self.element
    }

    /// Fetches a required attribute; absence is a grammar error.
    pub fn required(&self, name: &'static str) -> Result<&str> {
        self.map
            .get(name)
            .map(String::as_str)
            .ok_or_else(|| Error::MissingAttribute {
                element: self.element.clone().into(),
                attribute: name.into(),
            })
    }

    /// Fetches an optional attribute.
    pub fn optional(&self, name: &str) -> Option<&str> {
        self.map.get(name).map(String::as_str)
    }

    /// Case-tolerant lookup, fuer das EmbeddedObject/EMBEDDEDOBJECT Attribut
    /// (DSP0201 laesst beide Schreibweisen zu).
    pub fn optional_nocase(&self, name: &str) -> Option<&str> {
        self.map
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Rejects any attribute outside `allowed` (closed-world per element).
    /// Namespace declarations are ignored. Attribute names compare exactly;
    /// only the EmbeddedObject marker is case-tolerant, since both its
    /// spellings occur on the wire.
    pub fn expect_only(&self, allowed: &[&str]) -> Result<()> {
        for key in self.map.keys() {
            if key == "xmlns" || key.starts_with("xmlns:") {
                continue;
            }
            let known = allowed.iter().any(|a| {
                if *a == "EmbeddedObject" {
                    a.eq_ignore_ascii_case(key)
                } else {
                    a == key
                }
            });
            if !known {
                return Err(Error::UnexpectedAttribute {
                    element: self.element.clone().into(),
                    attribute: key.clone(),
                });
            }
        }
        Ok(())
    }
}

/// One flat parse event. Text is present only on End.
#[derive(Debug, Clone)]
pub enum ParseEvent {
    Start(Attributes),
    End { name: String, text: String },
}

impl ParseEvent {
    pub fn name(&self) -> &str {
        match self {
            Self::Start(attrs) => attrs.element(),
            Self::End { name, .. } => name,
        }
    }
}

/// Flat event stream over one complete in-memory document.
pub struct EventSource<'a> {
    reader: Reader<&'a [u8]>,
    putback: Option<ParseEvent>,
    /// End-Half eines Self-Closing-Elements, wird vor dem Reader geliefert.
    pending_end: Option<String>,
    /// Character data accumulated since the last delivered event.
    text: String,
}

impl<'a> EventSource<'a> {
    pub fn new(xml: &'a str) -> Self {
        let mut reader = Reader::from_str(xml);
        reader.config_mut().trim_text(false);
        Self {
            reader,
            putback: None,
            pending_end: None,
            text: String::new(),
        }
    }

    /// Returns the next event, `None` at end of document.
    pub fn next(&mut self) -> Result<Option<ParseEvent>> {
        if let Some(event) = self.putback.take() {
            return Ok(Some(event));
        }
        if let Some(name) = self.pending_end.take() {
            return Ok(Some(ParseEvent::End {
                name,
                text: String::new(),
            }));
        }
        loop {
            match self.reader.read_event() {
                Ok(Event::Start(e)) => {
                    self.reject_stray_text()?;
                    return Ok(Some(ParseEvent::Start(self.attributes(&e)?)));
                }
                Ok(Event::Empty(e)) => {
                    self.reject_stray_text()?;
                    let attrs = self.attributes(&e)?;
                    self.pending_end = Some(attrs.element().to_string());
                    return Ok(Some(ParseEvent::Start(attrs)));
                }
                Ok(Event::End(e)) => {
                    let name = String::from_utf8_lossy(e.name().as_ref()).into_owned();
                    let text = std::mem::take(&mut self.text);
                    return Ok(Some(ParseEvent::End { name, text }));
                }
                Ok(Event::Text(t)) => {
                    let value = t.unescape().map_err(|e| Error::XmlSyntax(e.to_string()))?;
                    self.text.push_str(&value);
                }
                Ok(Event::CData(c)) => {
                    let value = std::str::from_utf8(c.as_ref())
                        .map_err(|e| Error::XmlSyntax(e.to_string()))?;
                    self.text.push_str(value);
                }
                // Comments, PIs, doctype and the XML declaration are never
                // surfaced (DSP0201 operates on elements only).
                Ok(Event::Comment(_) | Event::PI(_) | Event::DocType(_) | Event::Decl(_)) => {}
                Ok(Event::Eof) => {
                    self.reject_stray_text()?;
                    return Ok(None);
                }
                Err(e) => return Err(Error::XmlSyntax(e.to_string())),
            }
        }
    }

    /// Returns one event to the single putback slot.
    pub fn put_back(&mut self, event: ParseEvent) -> Result<()> {
        if self.putback.is_some() {
            return Err(Error::internal("double putback without intervening next()"));
        }
        self.putback = Some(event);
        Ok(())
    }

    /// Non-whitespace character data in front of a start element or at end
    /// of document never belongs to any element's content.
    fn reject_stray_text(&mut self) -> Result<()> {
        if !self.text.trim().is_empty() {
            return Err(Error::StrayText(std::mem::take(&mut self.text).trim().to_string()));
        }
        self.text.clear();
        Ok(())
    }

    fn attributes(&self, e: &BytesStart<'_>) -> Result<Attributes> {
        let element = String::from_utf8_lossy(e.name().as_ref()).into_owned();
        let mut map = FastIndexMap::default();
        for attr in e.attributes() {
            let attr = attr.map_err(|err| Error::XmlSyntax(err.to_string()))?;
            let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
            let value = attr
                .unescape_value()
                .map_err(|err| Error::XmlSyntax(err.to_string()))?
                .into_owned();
            map.insert(key, value);
        }
        Ok(Attributes::new(element, map))
    }
}
