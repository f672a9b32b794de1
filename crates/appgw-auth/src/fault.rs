//! SOAP fault reader.
//!
//! When the identity endpoint rejects a request it answers with a SOAP fault
//! instead of a token:
//!
//! ```text
//! <S:Envelope>
//!   <S:Body>
//!     <S:Fault>
//!       <S:Reason><S:Text>reason</S:Text></S:Reason>
//!       <S:Detail><psf:error><psf:internalerror>
//!         <psf:text>detail</psf:text>
//!       </psf:internalerror></psf:error></S:Detail>
//!     </S:Fault>
//!   </S:Body>
//! </S:Envelope>
//! ```
//!
//! Every node on both paths is optional. Lookups match the qualified tag name
//! case-insensitively against immediate children only and take the first hit.

use quick_xml::Reader;
use quick_xml::events::Event;

/// The document could not be read as XML at all.
#[derive(Debug, thiserror::Error)]
pub enum FaultParseError {
    /// The XML reader rejected the input.
    #[error("malformed XML: {0}")]
    Xml(#[from] quick_xml::Error),

    /// No element was found.
    #[error("document has no root element")]
    Empty,

    /// Input ended while an element was still open.
    #[error("document ended inside <{0}>")]
    Unclosed(String),
}

// ─────────────────────────────────────────────────────────────────────────────
// Element tree
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug)]
enum Node {
    Element(Element),
    Text(String),
}

/// Minimal element tree: qualified name plus ordered children.
#[derive(Debug)]
pub struct Element {
    name: String,
    children: Vec<Node>,
}

impl Element {
    fn named(raw: &[u8]) -> Self {
        Self {
            name: String::from_utf8_lossy(raw).into_owned(),
            children: Vec::new(),
        }
    }

    /// Qualified tag name as written (`S:Body`).
    pub fn name(&self) -> &str {
        &self.name
    }

    /// First immediate child whose qualified name equals `name`, ignoring case.
    pub fn child(&self, name: &str) -> Option<&Element> {
        self.children.iter().find_map(|node| match node {
            Node::Element(e) if e.name.eq_ignore_ascii_case(name) => Some(e),
            _ => None,
        })
    }

    /// First text child.
    pub fn text(&self) -> Option<&str> {
        self.children.iter().find_map(|node| match node {
            Node::Text(t) => Some(t.as_str()),
            Node::Element(_) => None,
        })
    }

    /// Walk a chain of child names.
    pub fn path(&self, names: &[&str]) -> Option<&Element> {
        names.iter().try_fold(self, |node, name| node.child(name))
    }
}

/// Parse `xml` and return its first root element.
pub fn parse_document(xml: &str) -> Result<Element, FaultParseError> {
    let mut reader = Reader::from_str(xml);
    let _ = reader.trim_text(true);

    let mut stack: Vec<Element> = Vec::new();
    let mut root: Option<Element> = None;

    loop {
        match reader.read_event()? {
            Event::Start(start) => stack.push(Element::named(start.name().as_ref())),
            Event::Empty(start) => attach(&mut stack, &mut root, Element::named(start.name().as_ref())),
            Event::End(_) => {
                if let Some(done) = stack.pop() {
                    attach(&mut stack, &mut root, done);
                }
            }
            Event::Text(text) => {
                if let Some(open) = stack.last_mut() {
                    open.children.push(Node::Text(text.unescape()?.into_owned()));
                }
            }
            Event::CData(data) => {
                if let Some(open) = stack.last_mut() {
                    let text = String::from_utf8_lossy(&data.into_inner()).into_owned();
                    open.children.push(Node::Text(text));
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if let Some(open) = stack.pop() {
        return Err(FaultParseError::Unclosed(open.name));
    }
    root.ok_or(FaultParseError::Empty)
}

fn attach(stack: &mut [Element], root: &mut Option<Element>, element: Element) {
    if let Some(parent) = stack.last_mut() {
        parent.children.push(Node::Element(element));
    } else if root.is_none() {
        *root = Some(element);
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// SoapFault
// ─────────────────────────────────────────────────────────────────────────────

const FAULT_PATH: &[&str] = &["S:Body", "S:Fault"];
const REASON_PATH: &[&str] = &["S:Reason", "S:Text"];
const DETAIL_PATH: &[&str] = &["S:Detail", "psf:error", "psf:internalerror", "psf:text"];

/// Reason and detail texts of a SOAP fault. Either may be missing.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SoapFault {
    /// `S:Reason/S:Text`.
    pub reason: Option<String>,
    /// `S:Detail/psf:error/psf:internalerror/psf:text`.
    pub detail: Option<String>,
}

impl SoapFault {
    /// Parse a fault document.
    ///
    /// Well-formed documents always succeed; absent nodes leave fields empty.
    pub fn parse(xml: &str) -> Result<Self, FaultParseError> {
        Ok(Self::from_envelope(&parse_document(xml)?))
    }

    /// Read the fault out of an already-parsed envelope.
    pub fn from_envelope(envelope: &Element) -> Self {
        let Some(fault) = envelope.path(FAULT_PATH) else {
            return Self::default();
        };
        let text_at = |path: &[&str]| {
            fault
                .path(path)
                .and_then(Element::text)
                .map(str::to_owned)
        };
        Self {
            reason: text_at(REASON_PATH),
            detail: text_at(DETAIL_PATH),
        }
    }

    /// `"{reason}: {detail}"` when both are present and non-empty.
    pub fn describe(&self) -> Option<String> {
        let reason = self.reason.as_deref().filter(|r| !r.is_empty())?;
        let detail = self.detail.as_deref().filter(|d| !d.is_empty())?;
        Some(format!("{reason}: {detail}"))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
