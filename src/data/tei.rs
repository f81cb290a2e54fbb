//! TEI document reader producing a light element tree with text and tail slots.

use std::path::Path;

use quick_xml::{events::Event, name::ResolveResult, reader::NsReader};
use tracing::debug;

use crate::error::{PromptOreError, Result};

/// Namespace used by TEI P5 documents.
pub const TEI_NAMESPACE: &str = "http://www.tei-c.org/ns/1.0";

/// Namespace-resolved element name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QName {
    pub namespace: Option<String>,
    pub local: String,
}

/// One XML element. `text` holds the character data before the first child,
/// `tail` the character data between this element's end tag and the next sibling.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    pub name: QName,
    pub text: Option<String>,
    pub tail: Option<String>,
    pub children: Vec<Element>,
}

impl Element {
    fn new(name: QName) -> Self {
        Self {
            name,
            text: None,
            tail: None,
            children: Vec::new(),
        }
    }

    /// True when the element has the given namespace and local name.
    pub fn is(&self, namespace: &str, local: &str) -> bool {
        self.name.local == local && self.name.namespace.as_deref() == Some(namespace)
    }

    /// Pre-order traversal starting with `self`.
    pub fn descendants(&self) -> Descendants<'_> {
        Descendants { stack: vec![self] }
    }

    fn push_char_data(&mut self, data: &str) {
        if data.is_empty() {
            return;
        }
        let slot = match self.children.last_mut() {
            Some(last) => &mut last.tail,
            None => &mut self.text,
        };
        slot.get_or_insert_with(String::new).push_str(data);
    }
}

pub struct Descendants<'a> {
    stack: Vec<&'a Element>,
}

impl<'a> Iterator for Descendants<'a> {
    type Item = &'a Element;

    fn next(&mut self) -> Option<Self::Item> {
        let element = self.stack.pop()?;
        self.stack.extend(element.children.iter().rev());
        Some(element)
    }
}

/// Parsed document. Read-only once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TeiDocument {
    pub root: Element,
}

impl TeiDocument {
    /// Read and parse an XML file.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let xml = std::fs::read_to_string(path)
            .map_err(|err| PromptOreError::parse(err.to_string()).with_path(path))?;
        let document = Self::parse(&xml).map_err(|err| err.with_path(path))?;
        debug!(path = %path.display(), "parsed tei document");
        Ok(document)
    }

    /// Parse XML text into an element tree.
    pub fn parse(xml: &str) -> Result<Self> {
        let mut reader = NsReader::from_str(xml);
        let mut stack: Vec<Element> = Vec::new();
        let mut root: Option<Element> = None;

        loop {
            let (resolved, event) = reader.read_resolved_event()?;
            match event {
                Event::Start(start) => {
                    let name = qualified(resolved, start.local_name().as_ref());
                    stack.push(Element::new(name));
                }
                Event::Empty(start) => {
                    let name = qualified(resolved, start.local_name().as_ref());
                    close(&mut stack, &mut root, Element::new(name))?;
                }
                Event::End(_) => {
                    let element = stack
                        .pop()
                        .ok_or_else(|| PromptOreError::parse("closing tag without opening tag"))?;
                    close(&mut stack, &mut root, element)?;
                }
                Event::Text(text) => {
                    if let Some(open) = stack.last_mut() {
                        open.push_char_data(&text.unescape()?);
                    }
                }
                Event::CData(data) => {
                    if let Some(open) = stack.last_mut() {
                        open.push_char_data(&String::from_utf8_lossy(&data.into_inner()));
                    }
                }
                Event::Eof => break,
                _ => {}
            }
        }

        if let Some(open) = stack.last() {
            return Err(PromptOreError::parse(format!(
                "unclosed element <{}>",
                open.name.local
            )));
        }
        let root = root.ok_or_else(|| PromptOreError::parse("document has no root element"))?;
        Ok(Self { root })
    }

    /// Every element in document order, root first.
    pub fn elements(&self) -> Descendants<'_> {
        self.root.descendants()
    }
}

fn qualified(resolved: ResolveResult<'_>, local: &[u8]) -> QName {
    let namespace = match resolved {
        ResolveResult::Bound(ns) => Some(String::from_utf8_lossy(ns.as_ref()).into_owned()),
        _ => None,
    };
    QName {
        namespace,
        local: String::from_utf8_lossy(local).into_owned(),
    }
}

fn close(stack: &mut Vec<Element>, root: &mut Option<Element>, element: Element) -> Result<()> {
    match stack.last_mut() {
        Some(parent) => parent.children.push(element),
        None if root.is_none() => *root = Some(element),
        None => return Err(PromptOreError::parse("multiple root elements")),
    }
    Ok(())
}
