//! Grammar Reader: required/optional element sequencing over the token
//! source (DSP0201 element grammar).
//!
//! Every "optional element" decision is a `try_*` call that puts the
//! mismatching event back; lookahead never exceeds one token. `require_*`
//! calls consume and fail with a structured grammar error on mismatch.

use std::borrow::Cow;

use crate::event::{Attributes, EventSource, ParseEvent};
use crate::{Error, Result};

/// Recursive-descent cursor over one CIM-XML document.
pub struct GrammarReader<'a> {
    source: EventSource<'a>,
}

impl<'a> GrammarReader<'a> {
    pub fn from_str(xml: &'a str) -> Self {
        Self {
            source: EventSource::new(xml),
        }
    }

    /// Consumes the next event, which must be the start of `name`.
    pub fn require_start(&mut self, name: &'static str) -> Result<Attributes> {
        match self.source.next()? {
            Some(ParseEvent::Start(attrs)) if attrs.element() == name => Ok(attrs),
            other => Err(mismatch(Cow::Owned(format!("{name} start element")), other)),
        }
    }

    /// Consumes the next event, which must be the start of one of `names`.
    /// Returns the matched name from the caller's slice.
    pub fn require_start_of(
        &mut self,
        names: &[&'static str],
    ) -> Result<(&'static str, Attributes)> {
        match self.source.next()? {
            Some(ParseEvent::Start(attrs)) => {
                match names.iter().find(|n| **n == attrs.element()) {
                    Some(name) => Ok((name, attrs)),
                    None => Err(mismatch(
                        Cow::Owned(format!("one of {} start", names.join("|"))),
                        Some(ParseEvent::Start(attrs)),
                    )),
                }
            }
            other => Err(mismatch(
                Cow::Owned(format!("one of {} start", names.join("|"))),
                other,
            )),
        }
    }

    /// Like [`require_start`](Self::require_start), but puts the event back
    /// on mismatch instead of failing.
    pub fn try_start(&mut self, name: &str) -> Result<Option<Attributes>> {
        match self.source.next()? {
            Some(ParseEvent::Start(attrs)) if attrs.element() == name => Ok(Some(attrs)),
            Some(other) => {
                self.source.put_back(other)?;
                Ok(None)
            }
            None => Ok(None),
        }
    }

    /// Multi-name variant of [`try_start`](Self::try_start).
    pub fn try_start_of(
        &mut self,
        names: &[&'static str],
    ) -> Result<Option<(&'static str, Attributes)>> {
        match self.source.next()? {
            Some(ParseEvent::Start(attrs)) => {
                match names.iter().find(|n| **n == attrs.element()) {
                    Some(name) => Ok(Some((name, attrs))),
                    None => {
                        self.source.put_back(ParseEvent::Start(attrs))?;
                        Ok(None)
                    }
                }
            }
            Some(other) => {
                self.source.put_back(other)?;
                Ok(None)
            }
            None => Ok(None),
        }
    }

    /// Non-destructive lookahead: which of `names`, if any, starts next.
    pub fn peek_start_of(&mut self, names: &[&'static str]) -> Result<Option<&'static str>> {
        match self.source.next()? {
            Some(event) => {
                let matched = match &event {
                    ParseEvent::Start(attrs) => {
                        names.iter().find(|n| **n == attrs.element()).copied()
                    }
                    ParseEvent::End { .. } => None,
                };
                self.source.put_back(event)?;
                Ok(matched)
            }
            None => Ok(None),
        }
    }

    /// Non-destructive lookahead: is the next event any start element
    /// (`None`), or the start of a specific element (`Some(name)`)?
    pub fn peek_is_start(&mut self, name: Option<&str>) -> Result<bool> {
        match self.source.next()? {
            Some(event) => {
                let is_start = match (&event, name) {
                    (ParseEvent::Start(attrs), Some(n)) => attrs.element() == n,
                    (ParseEvent::Start(_), None) => true,
                    (ParseEvent::End { .. }, _) => false,
                };
                self.source.put_back(event)?;
                Ok(is_start)
            }
            None => Ok(false),
        }
    }

    /// Consumes the matching end element; non-whitespace content is a
    /// grammar error.
    pub fn require_end(&mut self, name: &'static str) -> Result<()> {
        let text = self.end_event(name)?;
        if !text.trim().is_empty() {
            return Err(Error::UnexpectedContent {
                element: name.into(),
                text: text.trim().to_string(),
            });
        }
        Ok(())
    }

    /// Consumes the matching end element and returns its character content.
    pub fn require_end_text(&mut self, name: &'static str) -> Result<String> {
        self.end_event(name)
    }

    fn end_event(&mut self, name: &'static str) -> Result<String> {
        match self.source.next()? {
            Some(ParseEvent::End { name: n, text }) if n == name => Ok(text),
            other => Err(mismatch(Cow::Owned(format!("end of {name}")), other)),
        }
    }

    /// After the top-level element closed, nothing may follow.
    pub fn require_end_of_document(&mut self) -> Result<()> {
        match self.source.next()? {
            None => Ok(()),
            other => Err(mismatch(Cow::Borrowed("end of document"), other)),
        }
    }

    /// Builds the error for a failed child-alternative decision point:
    /// a pending start is an unexpected child, a pending end (or document
    /// end) means the required child is missing. Die Unterscheidung ist
    /// diagnostisch wichtig und bleibt deshalb hier zentral.
    pub fn missing_or_unexpected_child(&mut self, parent: &str) -> Error {
        match self.source.next() {
            Err(e) => e,
            Ok(Some(ParseEvent::Start(attrs))) => Error::UnexpectedChild {
                parent: parent.to_string(),
                child: attrs.element().to_string(),
            },
            Ok(_) => Error::MissingChild {
                parent: parent.to_string(),
            },
        }
    }
}

fn mismatch(expected: Cow<'static, str>, got: Option<ParseEvent>) -> Error {
    let found = match got {
        Some(ParseEvent::Start(attrs)) => format!("{} start element", attrs.element()),
        Some(ParseEvent::End { name, .. }) => format!("end of {name}"),
        None => "end of document".to_string(),
    };
    Error::unexpected_element(expected, found)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ErrorKind;

    #[test]
    fn require_start_matches() {
        let mut r = GrammarReader::from_str("<CIM CIMVERSION=\"2.0\"/>");
        let attrs = r.require_start("CIM").unwrap();
        assert_eq!(attrs.required("CIMVERSION").unwrap(), "2.0");
        r.require_end("CIM").unwrap();
        r.require_end_of_document().unwrap();
    }

    #[test]
    fn require_start_mismatch_names_both_sides() {
        let mut r = GrammarReader::from_str("<CLASS NAME=\"X\"/>");
        let err = r.require_start("INSTANCE").unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("INSTANCE"), "{msg}");
        assert!(msg.contains("CLASS"), "{msg}");
        assert_eq!(err.kind(), ErrorKind::Grammar);
    }

    #[test]
    fn try_start_puts_back_on_mismatch() {
        let mut r = GrammarReader::from_str("<A><B/></A>");
        r.require_start("A").unwrap();
        assert!(r.try_start("C").unwrap().is_none());
        assert!(r.try_start("B").unwrap().is_some());
        r.require_end("B").unwrap();
        r.require_end("A").unwrap();
    }

    #[test]
    fn peek_is_nondestructive() {
        let mut r = GrammarReader::from_str("<A><B/></A>");
        r.require_start("A").unwrap();
        assert!(r.peek_is_start(Some("B")).unwrap());
        assert!(!r.peek_is_start(Some("C")).unwrap());
        assert!(r.peek_is_start(None).unwrap());
        assert_eq!(r.peek_start_of(&["C", "B"]).unwrap(), Some("B"));
        r.require_start("B").unwrap();
        r.require_end("B").unwrap();
        assert!(!r.peek_is_start(None).unwrap());
        r.require_end("A").unwrap();
    }

    #[test]
    fn require_end_rejects_content() {
        let mut r = GrammarReader::from_str("<A>text</A>");
        r.require_start("A").unwrap();
        let err = r.require_end("A").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Grammar);
        assert!(err.to_string().contains("text"));
    }

    #[test]
    fn require_end_text_returns_content() {
        let mut r = GrammarReader::from_str("<A> 42 </A>");
        r.require_start("A").unwrap();
        assert_eq!(r.require_end_text("A").unwrap(), " 42 ");
    }

    #[test]
    fn end_of_document_rejects_second_root_sibling() {
        // quick-xml already rejects two roots; a leftover child inside the
        // root is the interesting case.
        let mut r = GrammarReader::from_str("<A><B/></A>");
        r.require_start("A").unwrap();
        let err = r.require_end_of_document().unwrap_err();
        assert!(err.to_string().contains("end of document"));
    }

    #[test]
    fn child_decision_disambiguation() {
        // Pending start element: unexpected child.
        let mut r = GrammarReader::from_str("<A><X/></A>");
        r.require_start("A").unwrap();
        let err = r.missing_or_unexpected_child("A");
        assert!(err.to_string().contains("unexpected child"), "{err}");

        // Pending end: required child missing.
        let mut r = GrammarReader::from_str("<A></A>");
        r.require_start("A").unwrap();
        let err = r.missing_or_unexpected_child("A");
        assert!(err.to_string().contains("missing"), "{err}");
    }
}
