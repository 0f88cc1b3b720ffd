//! RS3 document parser.
//!
//! Turns raw RS3 markup into an [`RstDocument`]. Two body layouts are
//! understood:
//!
//! - **Nested**: `segment`/`group` elements contain their children directly.
//!   When the body has exactly one direct tree element it is the root;
//!   otherwise the body itself is the root (kind [`NodeKind::Span`]).
//! - **Flat**: every `segment`/`group` sits directly under `body` and points
//!   at its parent through `id`/`parent` attributes (the rstWeb export
//!   format). Several parentless elements are adopted by a synthetic span
//!   root.
//!
//! Either way, output ids are dense and assigned in preorder: a node gets its
//! id before any of its children are visited. Trees deeper than
//! [`MAX_TREE_DEPTH`] levels are rejected.
//!
//! # Example
//!
//! ```rust
//! use rst_lens_core::parser::parse;
//!
//! let doc = parse(
//!     r#"<rst><body><segment><segment relname="cause">Rain.</segment></segment></body></rst>"#,
//! )
//! .unwrap();
//! assert_eq!(doc.nodes().len(), 2);
//! assert_eq!(doc.nodes()[1].parent_id, Some(1));
//! ```

use std::collections::HashMap;

use serde::Deserialize;

use crate::error::{FileFailure, MalformedDocumentError};
use crate::markup::{parse_markup, Element};
use crate::models::{
    NamedDocument, Node, NodeId, NodeKind, Relation, RstDocument, MAX_TREE_DEPTH,
};

/// Element names that become tree nodes.
const TREE_ELEMENTS: [&str; 2] = ["segment", "group"];

/// How the body encodes parent/child links.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Layout {
    /// Flat when any direct tree element of the body has a `parent`
    /// attribute, nested otherwise.
    #[default]
    Auto,
    Nested,
    Flat,
}

/// What [`parse_all`] does when one file fails.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BatchPolicy {
    /// Stop at the first failure and return it.
    #[default]
    Fail,
    /// Record the failure and keep going.
    Skip,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ParseOptions {
    pub layout: Layout,
    pub on_error: BatchPolicy,
}

/// Raw content of one file, keyed by an identifier the parser never
/// interprets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    pub id: String,
    pub content: String,
}

impl SourceFile {
    pub fn new(id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            content: content.into(),
        }
    }
}

/// Result of a batch parse.
#[derive(Debug, Default)]
pub struct BatchOutcome {
    /// Successfully parsed documents, in input order.
    pub documents: Vec<NamedDocument>,
    /// Files skipped under [`BatchPolicy::Skip`], in input order.
    pub failures: Vec<FileFailure>,
}

/// Parse one document with default options.
pub fn parse(content: &str) -> Result<RstDocument, MalformedDocumentError> {
    parse_with(content, &ParseOptions::default())
}

/// Parse one document.
pub fn parse_with(
    content: &str,
    options: &ParseOptions,
) -> Result<RstDocument, MalformedDocumentError> {
    let root = parse_markup(content)?;
    if root.name != "rst" {
        return Err(MalformedDocumentError::MissingContainer("rst"));
    }

    let relations = read_relations(&root);
    let body = root
        .child("body")
        .ok_or(MalformedDocumentError::MissingContainer("body"))?;

    let mut builder = TreeBuilder::default();
    match resolve_layout(options.layout, body) {
        Layout::Flat => build_flat(&mut builder, body)?,
        _ => build_nested_root(&mut builder, body)?,
    }

    Ok(RstDocument::from_parts(relations, builder.finish()))
}

/// Parse every file independently, preserving input order.
pub fn parse_all(
    files: &[SourceFile],
    options: &ParseOptions,
) -> Result<BatchOutcome, FileFailure> {
    let mut outcome = BatchOutcome::default();
    for file in files {
        match parse_with(&file.content, options) {
            Ok(document) => outcome.documents.push(NamedDocument {
                id: file.id.clone(),
                document,
            }),
            Err(error) => {
                let failure = FileFailure {
                    id: file.id.clone(),
                    error,
                };
                match options.on_error {
                    BatchPolicy::Fail => return Err(failure),
                    BatchPolicy::Skip => outcome.failures.push(failure),
                }
            }
        }
    }
    Ok(outcome)
}

fn read_relations(root: &Element) -> Vec<Relation> {
    root.child("header")
        .and_then(|header| header.child("relations"))
        .map(|catalog| {
            catalog
                .children_named("rel")
                .map(|rel| {
                    Relation::new(
                        rel.attr("name").unwrap_or_default(),
                        rel.attr("type").unwrap_or_default(),
                    )
                })
                .collect()
        })
        .unwrap_or_default()
}

fn tree_children(element: &Element) -> impl DoubleEndedIterator<Item = &Element> {
    element
        .children
        .iter()
        .filter(|child| TREE_ELEMENTS.contains(&child.name.as_str()))
}

fn resolve_layout(layout: Layout, body: &Element) -> Layout {
    match layout {
        Layout::Auto if tree_children(body).any(|e| e.attr("parent").is_some()) => Layout::Flat,
        Layout::Auto => Layout::Nested,
        other => other,
    }
}

/// Fields of a node before it is given an id.
struct NodeDraft {
    relname: Option<String>,
    kind: NodeKind,
    source_id: Option<u32>,
    text: Option<String>,
}

impl NodeDraft {
    fn from_element(element: &Element, source_id: Option<u32>) -> Self {
        let kind = match element.name.as_str() {
            "segment" => NodeKind::Segment,
            "group" => NodeKind::Group,
            _ => NodeKind::Span,
        };
        Self {
            relname: non_empty(element.attr("relname")),
            kind,
            source_id,
            text: non_empty(Some(element.text.as_str())),
        }
    }
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value.filter(|v| !v.is_empty()).map(str::to_string)
}

fn check_depth(depth: usize) -> Result<(), MalformedDocumentError> {
    if depth > MAX_TREE_DEPTH {
        return Err(MalformedDocumentError::TooDeep(MAX_TREE_DEPTH));
    }
    Ok(())
}

/// Accumulates the preorder node arena.
///
/// [`push`](TreeBuilder::push) hands out the next id and links the node
/// into its parent's children, so a parent must be pushed before any of its
/// children and siblings in document order.
#[derive(Default)]
struct TreeBuilder {
    nodes: Vec<Node>,
}

impl TreeBuilder {
    fn push(&mut self, parent_id: Option<NodeId>, draft: NodeDraft) -> NodeId {
        let id = self.nodes.len() as NodeId + 1;
        if let Some(parent) = parent_id {
            self.nodes[parent as usize - 1].children.push(id);
        }
        self.nodes.push(Node {
            id,
            parent_id,
            relname: draft.relname,
            kind: draft.kind,
            source_id: draft.source_id,
            text: draft.text,
            children: Vec::new(),
        });
        id
    }

    fn len(&self) -> usize {
        self.nodes.len()
    }

    fn finish(self) -> Vec<Node> {
        self.nodes
    }
}

// ============ Nested layout ============

fn build_nested_root(
    builder: &mut TreeBuilder,
    body: &Element,
) -> Result<(), MalformedDocumentError> {
    let mut direct = tree_children(body);
    let root = match (direct.next(), direct.next()) {
        (Some(only), None) => only,
        _ => body,
    };
    build_nested(builder, root)
}

/// Depth-first over the element tree with an explicit stack. Children are
/// pushed in reverse so they pop, and get their ids, in document order.
fn build_nested(
    builder: &mut TreeBuilder,
    root: &Element,
) -> Result<(), MalformedDocumentError> {
    let mut stack: Vec<(&Element, Option<NodeId>, usize)> = vec![(root, None, 1)];
    while let Some((element, parent_id, depth)) = stack.pop() {
        check_depth(depth)?;
        let source_id = element.attr("id").and_then(|v| v.parse().ok());
        let id = builder.push(parent_id, NodeDraft::from_element(element, source_id));
        stack.extend(
            tree_children(element)
                .rev()
                .map(|child| (child, Some(id), depth + 1)),
        );
    }
    Ok(())
}

// ============ Flat layout ============

struct FlatEntry<'a> {
    element: &'a Element,
    source_id: u32,
    parent: Option<u32>,
}

fn numeric_attr(
    element: &Element,
    attribute: &'static str,
) -> Result<Option<u32>, MalformedDocumentError> {
    match element.attr(attribute).map(str::trim) {
        None | Some("") => Ok(None),
        Some(raw) => raw
            .parse()
            .map(Some)
            .map_err(|_| MalformedDocumentError::InvalidAttribute {
                element: element.name.clone(),
                attribute,
                value: Some(raw.to_string()),
            }),
    }
}

fn flat_entry(element: &Element) -> Result<FlatEntry<'_>, MalformedDocumentError> {
    let source_id =
        numeric_attr(element, "id")?.ok_or_else(|| MalformedDocumentError::InvalidAttribute {
            element: element.name.clone(),
            attribute: "id",
            value: None,
        })?;
    Ok(FlatEntry {
        element,
        source_id,
        parent: numeric_attr(element, "parent")?,
    })
}

fn build_flat(builder: &mut TreeBuilder, body: &Element) -> Result<(), MalformedDocumentError> {
    let entries = tree_children(body)
        .map(flat_entry)
        .collect::<Result<Vec<_>, _>>()?;
    if entries.is_empty() {
        builder.push(None, NodeDraft::from_element(body, None));
        return Ok(());
    }

    let mut index: HashMap<u32, usize> = HashMap::with_capacity(entries.len());
    for (i, entry) in entries.iter().enumerate() {
        if index.insert(entry.source_id, i).is_some() {
            return Err(MalformedDocumentError::DuplicateId(entry.source_id));
        }
    }

    let mut children: Vec<Vec<usize>> = vec![Vec::new(); entries.len()];
    let mut roots = Vec::new();
    for (i, entry) in entries.iter().enumerate() {
        match entry.parent {
            None => roots.push(i),
            Some(parent) => {
                let &p = index
                    .get(&parent)
                    .ok_or(MalformedDocumentError::DanglingParent {
                        id: entry.source_id,
                        parent,
                    })?;
                children[p].push(i);
            }
        }
    }

    // (entry index, parent id, depth), popped in preorder.
    let mut stack: Vec<(usize, Option<NodeId>, usize)> = Vec::with_capacity(entries.len());
    match roots.as_slice() {
        [] => return Err(MalformedDocumentError::NoRoot),
        [only] => stack.push((*only, None, 1)),
        many => {
            let root = builder.push(None, NodeDraft::from_element(body, None));
            stack.extend(many.iter().rev().map(|&r| (r, Some(root), 2)));
        }
    }

    while let Some((entry, parent_id, depth)) = stack.pop() {
        check_depth(depth)?;
        let current = &entries[entry];
        let id = builder.push(
            parent_id,
            NodeDraft::from_element(current.element, Some(current.source_id)),
        );
        stack.extend(
            children[entry]
                .iter()
                .rev()
                .map(|&child| (child, Some(id), depth + 1)),
        );
    }

    let synthetic = usize::from(roots.len() > 1);
    let reached = builder.len() - synthetic;
    if reached < entries.len() {
        return Err(MalformedDocumentError::Unreachable(entries.len() - reached));
    }
    Ok(())
}
