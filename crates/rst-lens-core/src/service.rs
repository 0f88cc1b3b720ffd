//! Relation aggregation over a corpus of parsed documents.
//!
//! [`RelationService`] holds the corpus behind a `RwLock`. [`load`] swaps
//! the whole corpus under the write lock; every query clones the `Arc` under
//! the read lock and scans the snapshot without holding it, so a query
//! always sees exactly one corpus.
//!
//! All queries are full scans. Result ordering is first appearance in scan
//! order: documents in corpus order, relations in declaration order, nodes
//! in preorder.
//!
//! | Query | Keyed by | Deduplicated |
//! |-------|----------|--------------|
//! | [`stats`](RelationService::stats) | relation name | no (counts every declaration) |
//! | [`groups`](RelationService::groups) | type, then name | yes |
//! | [`distribution`](RelationService::distribution) | type | no |
//! | [`usage`](RelationService::usage) | `relname` in one subtree | no |
//!
//! [`load`]: RelationService::load

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};

use crate::models::{Node, NodeTree, Relation, RstDocument};

/// Type reported by [`relation_usage`], which never consults the catalog.
pub const UNKNOWN_TYPE: &str = "unknown";

/// Count and first-seen type of one relation name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RelationCount {
    pub count: usize,
    #[serde(rename = "type")]
    pub relation_type: String,
}

/// Relation name to [`RelationCount`], in first-appearance order.
///
/// Serializes as a JSON object.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RelationStats {
    entries: Vec<(String, RelationCount)>,
}

impl RelationStats {
    pub fn get(&self, name: &str) -> Option<&RelationCount> {
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, count)| count)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &RelationCount)> {
        self.entries.iter().map(|(n, c)| (n.as_str(), c))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Serialize for RelationStats {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (name, count) in &self.entries {
            map.serialize_entry(name, count)?;
        }
        map.end()
    }
}

/// Relations sharing one type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RelationGroup {
    #[serde(rename = "type")]
    pub relation_type: String,
    pub relations: Vec<Relation>,
}

/// How often one relation name is used inside a subtree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RelationUsage {
    pub relation: Relation,
    pub count: usize,
}

/// Number of relation declarations of one type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TypeCount {
    #[serde(rename = "type")]
    pub relation_type: String,
    pub count: usize,
}

/// Insertion-ordered accumulator keyed by string.
struct Tally<T> {
    index: HashMap<String, usize>,
    entries: Vec<(String, T)>,
}

impl<T> Tally<T> {
    fn new() -> Self {
        Self {
            index: HashMap::new(),
            entries: Vec::new(),
        }
    }

    fn entry(&mut self, key: &str, init: impl FnOnce() -> T) -> &mut T {
        let slot = match self.index.get(key) {
            Some(&slot) => slot,
            None => {
                self.index.insert(key.to_string(), self.entries.len());
                self.entries.push((key.to_string(), init()));
                self.entries.len() - 1
            }
        };
        &mut self.entries[slot].1
    }

    fn into_entries(self) -> Vec<(String, T)> {
        self.entries
    }
}

/// Count `relname` occurrences in the subtree rooted at `node`.
///
/// Every reported relation carries type [`UNKNOWN_TYPE`]; match names
/// against [`RelationService::stats`] or [`RelationService::groups`] to
/// recover declared types.
pub fn relation_usage(document: &RstDocument, node: &Node) -> Vec<RelationUsage> {
    let mut usage: Tally<usize> = Tally::new();
    for visited in document.descendants(node) {
        if let Some(relname) = &visited.relname {
            *usage.entry(relname, || 0) += 1;
        }
    }
    usage
        .into_entries()
        .into_iter()
        .map(|(name, count)| RelationUsage {
            relation: Relation::new(name, UNKNOWN_TYPE),
            count,
        })
        .collect()
}

/// Holds a corpus and answers aggregate queries over it.
///
/// `D` is anything that exposes an [`RstDocument`]: plain documents or
/// [`NamedDocument`](crate::models::NamedDocument)s.
pub struct RelationService<D = RstDocument> {
    corpus: RwLock<Arc<[D]>>,
}

impl<D> Default for RelationService<D> {
    fn default() -> Self {
        Self {
            corpus: RwLock::new(Arc::from(Vec::new())),
        }
    }
}

impl<D: AsRef<RstDocument>> RelationService<D> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_documents(documents: impl Into<Arc<[D]>>) -> Self {
        Self {
            corpus: RwLock::new(documents.into()),
        }
    }

    /// Replace the corpus wholesale.
    pub fn load(&self, documents: impl Into<Arc<[D]>>) {
        let documents = documents.into();
        let mut corpus = self.corpus.write().unwrap_or_else(|e| e.into_inner());
        *corpus = documents;
    }

    /// The current corpus.
    pub fn snapshot(&self) -> Arc<[D]> {
        self.corpus
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    pub fn len(&self) -> usize {
        self.snapshot().len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshot().is_empty()
    }

    fn declared(corpus: &[D]) -> impl Iterator<Item = &Relation> {
        corpus.iter().flat_map(|doc| doc.as_ref().relations())
    }

    /// Declaration counts per relation name. The type is the one seen first;
    /// later conflicting declarations only add to the count.
    pub fn stats(&self) -> RelationStats {
        let corpus = self.snapshot();
        let mut stats: Tally<RelationCount> = Tally::new();
        for relation in Self::declared(&corpus) {
            stats
                .entry(&relation.name, || RelationCount {
                    count: 0,
                    relation_type: relation.relation_type.clone(),
                })
                .count += 1;
        }
        RelationStats {
            entries: stats.into_entries(),
        }
    }

    /// Distinct relations bucketed by type. A name is kept once per bucket.
    pub fn groups(&self) -> Vec<RelationGroup> {
        let corpus = self.snapshot();
        let mut groups: Tally<Vec<Relation>> = Tally::new();
        for relation in Self::declared(&corpus) {
            let bucket = groups.entry(&relation.relation_type, Vec::new);
            if !bucket.iter().any(|r| r.name == relation.name) {
                bucket.push(relation.clone());
            }
        }
        groups
            .into_entries()
            .into_iter()
            .map(|(relation_type, relations)| RelationGroup {
                relation_type,
                relations,
            })
            .collect()
    }

    /// Relation usage in the subtree of `node`.
    ///
    /// Same as [`relation_usage`]: `document` need not belong to the loaded
    /// corpus, and the result never depends on it. Types are always
    /// [`UNKNOWN_TYPE`], even for names the corpus declares.
    pub fn usage(&self, document: &RstDocument, node: &Node) -> Vec<RelationUsage> {
        relation_usage(document, node)
    }

    /// Declaration counts per type, every occurrence counted.
    pub fn distribution(&self) -> Vec<TypeCount> {
        let corpus = self.snapshot();
        let mut distribution: Tally<usize> = Tally::new();
        for relation in Self::declared(&corpus) {
            *distribution.entry(&relation.relation_type, || 0) += 1;
        }
        distribution
            .into_entries()
            .into_iter()
            .map(|(relation_type, count)| TypeCount {
                relation_type,
                count,
            })
            .collect()
    }

    /// Root node of every document, in corpus order.
    pub fn hierarchy(&self) -> Hierarchy<D> {
        Hierarchy {
            corpus: self.snapshot(),
        }
    }
}

/// The root of every document in a corpus snapshot.
///
/// Serializes as an array of nested node trees.
pub struct Hierarchy<D> {
    corpus: Arc<[D]>,
}

impl<D: AsRef<RstDocument>> Hierarchy<D> {
    pub fn roots(&self) -> impl Iterator<Item = &Node> {
        self.corpus.iter().map(|doc| doc.as_ref().root_node())
    }

    /// Each document paired with its nested root tree.
    pub fn trees(&self) -> impl Iterator<Item = (&D, NodeTree<'_>)> {
        self.corpus.iter().map(|doc| {
            let document = doc.as_ref();
            (doc, document.tree(document.root_node()))
        })
    }

    pub fn len(&self) -> usize {
        self.corpus.len()
    }

    pub fn is_empty(&self) -> bool {
        self.corpus.is_empty()
    }
}

impl<D: AsRef<RstDocument>> Serialize for Hierarchy<D> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.trees().map(|(_, tree)| tree))
    }
}
