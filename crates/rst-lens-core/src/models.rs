//! Parsed RST document model.
//!
//! An [`RstDocument`] owns its nodes in a flat arena ordered by preorder id:
//! the node with id `k` lives at index `k - 1`. Tree structure is expressed
//! through [`Node::children`] (child ids, document order) and
//! [`Node::parent_id`]. The root is always the first node.
//!
//! Documents are produced by [`crate::parser`] and never mutated afterwards.
//!
//! # JSON shape
//!
//! ```json
//! {
//!   "relations": [{ "name": "elaboration", "type": "rst" }],
//!   "nodes": [{ "id": 1, "parentId": null, "relname": null, "kind": "span", "children": [2] }],
//!   "rootNode": { "id": 1, "parentId": null, "relname": null, "kind": "span", "children": [ ... ] }
//! }
//! ```
//!
//! `nodes` lists child ids; `rootNode` nests full child objects. Nesting is
//! bounded by [`MAX_TREE_DEPTH`], which the parser enforces.

use serde::ser::{SerializeSeq, SerializeStruct};
use serde::{Serialize, Serializer};

/// Preorder node id, dense from 1.
pub type NodeId = u32;

/// Deepest tree a document may have, counting the root as level 1.
pub const MAX_TREE_DEPTH: usize = 512;

/// A declared discourse-relation kind.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Relation {
    pub name: String,
    /// Opaque classification, e.g. `rst` or `multinuc`.
    #[serde(rename = "type")]
    pub relation_type: String,
}

impl Relation {
    pub fn new(name: impl Into<String>, relation_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            relation_type: relation_type.into(),
        }
    }
}

/// Markup element a node was built from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    /// An elementary discourse unit.
    Segment,
    /// A composite span over other nodes.
    Group,
    /// The body container standing in as root.
    Span,
}

/// One unit of discourse structure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Node {
    pub id: NodeId,
    pub parent_id: Option<NodeId>,
    /// Relation this node bears to its parent.
    pub relname: Option<String>,
    pub kind: NodeKind,
    /// The `id` attribute from the markup, when it carried one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_id: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    pub children: Vec<NodeId>,
}

impl Node {
    pub fn is_root(&self) -> bool {
        self.parent_id.is_none()
    }
}

/// One parsed file: relation catalog plus node tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RstDocument {
    relations: Vec<Relation>,
    nodes: Vec<Node>,
}

impl RstDocument {
    /// Callers go through the parser, which guarantees a non-empty preorder
    /// arena with the root first.
    pub(crate) fn from_parts(relations: Vec<Relation>, nodes: Vec<Node>) -> Self {
        debug_assert!(!nodes.is_empty());
        debug_assert!(nodes
            .iter()
            .enumerate()
            .all(|(i, n)| n.id as usize == i + 1));
        Self { relations, nodes }
    }

    /// Relations in declaration order.
    pub fn relations(&self) -> &[Relation] {
        &self.relations
    }

    /// Every node in preorder, root included.
    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    /// The single parentless node.
    pub fn root_node(&self) -> &Node {
        &self.nodes[0]
    }

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        let index = (id as usize).checked_sub(1)?;
        self.nodes.get(index)
    }

    /// Children of `node` in document order.
    pub fn children<'a>(&'a self, node: &'a Node) -> impl Iterator<Item = &'a Node> + 'a {
        node.children.iter().filter_map(move |id| self.node(*id))
    }

    /// `node` and all of its descendants, depth-first preorder.
    pub fn descendants<'a>(&'a self, node: &'a Node) -> Descendants<'a> {
        Descendants {
            document: self,
            stack: vec![node],
        }
    }

    /// Nested view of the subtree rooted at `node`, for serialization.
    pub fn tree<'a>(&'a self, node: &'a Node) -> NodeTree<'a> {
        NodeTree {
            document: self,
            node,
        }
    }
}

impl AsRef<RstDocument> for RstDocument {
    fn as_ref(&self) -> &RstDocument {
        self
    }
}

impl Serialize for RstDocument {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("RstDocument", 3)?;
        state.serialize_field("relations", &self.relations)?;
        state.serialize_field("nodes", &self.nodes)?;
        state.serialize_field("rootNode", &self.tree(self.root_node()))?;
        state.end()
    }
}

/// Preorder iterator over a subtree.
pub struct Descendants<'a> {
    document: &'a RstDocument,
    stack: Vec<&'a Node>,
}

impl<'a> Iterator for Descendants<'a> {
    type Item = &'a Node;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.stack.pop()?;
        let document = self.document;
        self.stack
            .extend(node.children.iter().rev().filter_map(|id| document.node(*id)));
        Some(node)
    }
}

/// A node serialized with its children nested as full objects.
#[derive(Clone, Copy)]
pub struct NodeTree<'a> {
    document: &'a RstDocument,
    node: &'a Node,
}

impl<'a> NodeTree<'a> {
    pub fn node(&self) -> &'a Node {
        self.node
    }
}

struct NestedChildren<'a>(NodeTree<'a>);

impl Serialize for NestedChildren<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let NodeTree { document, node } = self.0;
        let mut seq = serializer.serialize_seq(Some(node.children.len()))?;
        for child in document.children(node) {
            seq.serialize_element(&document.tree(child))?;
        }
        seq.end()
    }
}

impl Serialize for NodeTree<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let node = self.node;
        let mut state = serializer.serialize_struct("Node", 7)?;
        state.serialize_field("id", &node.id)?;
        state.serialize_field("parentId", &node.parent_id)?;
        state.serialize_field("relname", &node.relname)?;
        state.serialize_field("kind", &node.kind)?;
        if let Some(source_id) = node.source_id {
            state.serialize_field("sourceId", &source_id)?;
        } else {
            state.skip_field("sourceId")?;
        }
        if let Some(text) = &node.text {
            state.serialize_field("text", text)?;
        } else {
            state.skip_field("text")?;
        }
        state.serialize_field("children", &NestedChildren(*self))?;
        state.end()
    }
}

/// A parsed document together with the caller's identifier (e.g. a filename).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NamedDocument {
    pub id: String,
    pub document: RstDocument,
}

impl AsRef<RstDocument> for NamedDocument {
    fn as_ref(&self) -> &RstDocument {
        &self.document
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;
    use serde_json::json;

    const SAMPLE: &str = r#"<rst>
        <header><relations><rel name="elaboration" type="rst"/></relations></header>
        <body>
          <segment>
            <segment relname="elaboration">First.</segment>
            <segment relname="elaboration">Second.</segment>
          </segment>
        </body>
    </rst>"#;

    #[test]
    fn node_lookup_is_by_preorder_id() {
        let doc = parse(SAMPLE).unwrap();
        assert_eq!(doc.node(1).map(|n| n.id), Some(1));
        assert_eq!(doc.node(3).and_then(|n| n.text.as_deref()), Some("Second."));
        assert!(doc.node(0).is_none());
        assert!(doc.node(4).is_none());
    }

    #[test]
    fn descendants_walk_in_preorder() {
        let doc = parse(SAMPLE).unwrap();
        let ids: Vec<NodeId> = doc.descendants(doc.root_node()).map(|n| n.id).collect();
        assert_eq!(ids, vec![1, 2, 3]);
    }

    #[test]
    fn serializes_flat_nodes_and_nested_root() {
        let doc = parse(SAMPLE).unwrap();
        let value = serde_json::to_value(&doc).unwrap();

        assert_eq!(
            value["relations"],
            json!([{ "name": "elaboration", "type": "rst" }])
        );
        assert_eq!(value["nodes"][0]["children"], json!([2, 3]));
        assert_eq!(value["nodes"][1]["parentId"], json!(1));
        assert_eq!(value["rootNode"]["parentId"], json!(null));
        assert_eq!(value["rootNode"]["children"][1]["text"], json!("Second."));
        assert_eq!(
            value["rootNode"]["children"][0]["relname"],
            json!("elaboration")
        );
        assert!(value["rootNode"].get("sourceId").is_none());
    }
}
