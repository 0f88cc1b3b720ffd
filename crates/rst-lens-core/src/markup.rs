//! Generic attributed element tree.
//!
//! RS3 content is first materialized as an [`Element`] tree with
//! `quick-xml`; the document parser then walks that tree. Child elements are
//! always held as a sequence, so a container with a single child and a
//! container with many are iterated the same way.

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use crate::error::{syntax, MalformedDocumentError};
use crate::models::MAX_TREE_DEPTH;

/// Deepest open-element stack accepted: the tree plus its `rst` and `body`
/// wrappers.
const MAX_NESTING: usize = MAX_TREE_DEPTH + 2;

/// One markup element with its attributes, child elements, and direct text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    /// Local name (namespace prefix stripped).
    pub name: String,
    /// Attributes in source order, values unescaped.
    pub attributes: Vec<(String, String)>,
    /// Child elements in document order.
    pub children: Vec<Element>,
    /// Character data directly inside this element, trimmed. Separate text
    /// runs (around child elements) are joined with a single space.
    pub text: String,
}

impl Element {
    fn from_start(start: &BytesStart<'_>) -> Result<Self, MalformedDocumentError> {
        let name = String::from_utf8_lossy(start.local_name().as_ref()).into_owned();
        let mut attributes = Vec::new();
        for attr in start.attributes() {
            let attr = attr.map_err(syntax)?;
            let key = String::from_utf8_lossy(attr.key.local_name().as_ref()).into_owned();
            let value = attr.unescape_value().map_err(syntax)?.into_owned();
            attributes.push((key, value));
        }
        Ok(Self {
            name,
            attributes,
            children: Vec::new(),
            text: String::new(),
        })
    }

    /// Value of the attribute `key`, if present.
    pub fn attr(&self, key: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// First child element named `name`.
    pub fn child(&self, name: &str) -> Option<&Element> {
        self.children.iter().find(|c| c.name == name)
    }

    /// All child elements named `name`, in document order.
    pub fn children_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Element> + 'a {
        self.children.iter().filter(move |c| c.name == name)
    }

    fn push_text(&mut self, text: &str) {
        let text = text.trim();
        if text.is_empty() {
            return;
        }
        if !self.text.is_empty() {
            self.text.push(' ');
        }
        self.text.push_str(text);
    }
}

/// Parse `content` into its document element.
///
/// Fails on invalid syntax, mismatched or unclosed tags, stray text or a
/// second element at the top level, and content with no element at all.
/// Elements nested deeper than the tree limit allows are rejected with
/// [`MalformedDocumentError::TooDeep`] before any tree is built.
pub fn parse_markup(content: &str) -> Result<Element, MalformedDocumentError> {
    let content = content.strip_prefix('\u{feff}').unwrap_or(content);
    let mut reader = Reader::from_str(content);
    reader.config_mut().trim_text(true);

    let mut open: Vec<Element> = Vec::new();
    let mut root: Option<Element> = None;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => {
                if open.len() >= MAX_NESTING {
                    return Err(MalformedDocumentError::TooDeep(MAX_TREE_DEPTH));
                }
                open.push(Element::from_start(&e)?);
            }
            Ok(Event::Empty(e)) => {
                let element = Element::from_start(&e)?;
                attach(&mut open, &mut root, element)?;
            }
            Ok(Event::End(e)) => {
                let element = open.pop().ok_or_else(|| {
                    syntax(format!(
                        "unexpected closing tag </{}>",
                        String::from_utf8_lossy(e.local_name().as_ref())
                    ))
                })?;
                attach(&mut open, &mut root, element)?;
            }
            Ok(Event::Text(t)) => {
                let text = t.unescape().map_err(syntax)?;
                push_text(&mut open, &text)?;
            }
            Ok(Event::CData(c)) => {
                let bytes = c.into_inner();
                push_text(&mut open, &String::from_utf8_lossy(&bytes))?;
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(syntax(format!(
                    "{} (near byte {})",
                    e,
                    reader.buffer_position()
                )))
            }
            // declarations, comments, processing instructions, doctype
            _ => {}
        }
    }

    if let Some(element) = open.last() {
        return Err(syntax(format!("unclosed element <{}>", element.name)));
    }
    root.ok_or_else(|| syntax("no document element"))
}

fn attach(
    open: &mut [Element],
    root: &mut Option<Element>,
    element: Element,
) -> Result<(), MalformedDocumentError> {
    match open.last_mut() {
        Some(parent) => parent.children.push(element),
        None if root.is_some() => {
            return Err(syntax(format!(
                "second top-level element <{}>",
                element.name
            )))
        }
        None => *root = Some(element),
    }
    Ok(())
}

fn push_text(open: &mut [Element], text: &str) -> Result<(), MalformedDocumentError> {
    match open.last_mut() {
        Some(element) => element.push_text(text),
        None if text.trim().is_empty() => {}
        None => return Err(syntax("text outside of the document element")),
    }
    Ok(())
}
