//! # rst-lens core
//!
//! Document model, RS3 parser, and relation aggregation for Rhetorical
//! Structure Theory corpora.
//!
//! This crate performs no filesystem or network I/O: callers hand it raw
//! markup text and get plain data back.
//!
//! ```text
//! raw RS3 text ──▶ parser::parse ──▶ RstDocument ──▶ RelationService
//!                                                     ├─ stats()
//!                                                     ├─ groups()
//!                                                     ├─ usage(doc, node)
//!                                                     ├─ distribution()
//!                                                     └─ hierarchy()
//! ```

pub mod error;
pub mod markup;
pub mod models;
pub mod parser;
pub mod service;

pub use error::{FileFailure, MalformedDocumentError};
pub use models::{NamedDocument, Node, NodeId, NodeKind, Relation, RstDocument};
pub use parser::{parse, parse_all, parse_with, BatchOutcome, BatchPolicy, Layout, ParseOptions, SourceFile};
pub use service::RelationService;
