//! # rst-lens
//!
//! Relation statistics and discourse-tree browsing for Rhetorical Structure
//! Theory corpora stored as RS3 files.
//!
//! Parsing and aggregation live in the `rst-lens-core` crate. This crate
//! adds everything that touches the outside world: configuration, corpus
//! discovery on disk, CLI rendering, and the HTTP API.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐   ┌──────────────┐   ┌──────────────────┐
//! │ corpus root │──▶│    loader    │──▶│ RelationService  │
//! │  *.rs3      │   │ walk + parse │   │ (rst-lens-core)  │
//! └─────────────┘   └──────────────┘   └────────┬─────────┘
//!                                               │
//!                          ┌────────────────────┤
//!                          ▼                    ▼
//!                     ┌──────────┐        ┌──────────┐
//!                     │   CLI    │        │   HTTP   │
//!                     │ (report) │        │ (server) │
//!                     └──────────┘        └──────────┘
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing and validation |
//! | [`loader`] | Corpus discovery, concurrent reads, batch parsing |
//! | [`progress`] | Load progress on stderr |
//! | [`report`] | Human-readable tables and trees |
//! | [`server`] | JSON HTTP API |

pub mod config;
pub mod loader;
pub mod progress;
pub mod report;
pub mod server;
