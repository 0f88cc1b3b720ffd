//! # rst-lens CLI
//!
//! Loads a corpus of RS3 discourse trees and reports on the relations it
//! declares and uses.
//!
//! ## Usage
//!
//! ```bash
//! rst-lens --config ./config/rst-lens.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `rst-lens files` | List loaded documents |
//! | `rst-lens parse <path>` | Parse one file and print its tree |
//! | `rst-lens stats` | Declaration counts per relation name |
//! | `rst-lens groups` | Distinct relations grouped by type |
//! | `rst-lens distribution` | Declaration counts per relation type |
//! | `rst-lens hierarchy` | Tree of every document |
//! | `rst-lens usage <id> [--node N]` | Relation usage below a node |
//! | `rst-lens serve` | Start the HTTP API |
//! | `rst-lens completions <shell>` | Print shell completions |
//!
//! Data goes to stdout; progress and warnings go to stderr.

use anyhow::{bail, Context, Result};
use clap::{CommandFactory, Parser, Subcommand};
use rst_lens::config::{self, Config};
use rst_lens::loader::{load_corpus, LoadedCorpus};
use rst_lens::progress::ProgressMode;
use rst_lens::{report, server};
use rst_lens_core::{parse_with, NamedDocument, NodeId, RelationService};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;

const DEFAULT_CONFIG: &str = "./config/rst-lens.toml";

/// Relation statistics and discourse-tree browsing for RST corpora.
#[derive(Parser)]
#[command(name = "rst-lens", version, about)]
struct Cli {
    /// Path to configuration file (TOML).
    ///
    /// Defaults to `./config/rst-lens.toml`. When that file does not exist,
    /// built-in defaults are used (corpus in `./documents`).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Corpus root, overriding `[corpus].root`.
    #[arg(long, global = true)]
    root: Option<PathBuf>,

    /// Print results as JSON.
    #[arg(long, global = true)]
    json: bool,

    /// Load progress on stderr. Defaults to human when stderr is a TTY.
    #[arg(long, global = true, value_enum)]
    progress: Option<ProgressMode>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List loaded documents with node and relation counts.
    Files,

    /// Parse a single file and print its tree.
    ///
    /// The file does not need to be part of the corpus. Uses the
    /// `[parser]` settings from the config.
    Parse {
        /// Path to an `.rs3` file.
        path: PathBuf,
    },

    /// Declaration counts per relation name.
    ///
    /// The type shown is the first one declared for the name.
    Stats,

    /// Distinct relations grouped by type.
    Groups,

    /// Declaration counts per relation type.
    Distribution,

    /// Print the tree of every document.
    Hierarchy,

    /// Count relation names used in a subtree of one document.
    Usage {
        /// Document id (path relative to the corpus root).
        id: String,

        /// Node id to start from. Defaults to the root.
        #[arg(long)]
        node: Option<NodeId>,
    },

    /// Start the HTTP API on `[server].bind`.
    Serve,

    /// Print shell completions.
    Completions {
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if let Commands::Completions { shell } = cli.command {
        clap_complete::generate(
            shell,
            &mut Cli::command(),
            "rst-lens",
            &mut std::io::stdout(),
        );
        return Ok(());
    }

    let mut cfg = resolve_config(cli.config.as_deref())?;
    if let Some(root) = cli.root {
        cfg.corpus.root = root;
    }

    let progress = cli.progress.unwrap_or_else(ProgressMode::default_for_tty);

    match cli.command {
        Commands::Completions { .. } => {}
        Commands::Parse { path } => {
            let content = std::fs::read_to_string(&path)
                .with_context(|| format!("Failed to read {}", path.display()))?;
            let document = parse_with(&content, &cfg.parser)
                .with_context(|| format!("Failed to parse {}", path.display()))?;
            let named = NamedDocument {
                id: path.display().to_string(),
                document,
            };
            if cli.json {
                print_json(&named)?;
            } else {
                print!("{}", report::render_hierarchy([&named]));
            }
        }
        Commands::Files => {
            let loaded = load(&cfg, progress).await?;
            if cli.json {
                let files: Vec<serde_json::Value> = loaded
                    .documents
                    .iter()
                    .map(|doc| {
                        serde_json::json!({
                            "id": doc.id,
                            "nodes": doc.document.nodes().len(),
                            "relations": doc.document.relations().len(),
                        })
                    })
                    .collect();
                print_json(&files)?;
            } else {
                print!("{}", report::render_files(&loaded.documents));
            }
        }
        Commands::Stats => {
            let stats = load(&cfg, progress).await?.into_service().stats();
            if cli.json {
                print_json(&stats)?;
            } else {
                print!("{}", report::render_stats(&stats));
            }
        }
        Commands::Groups => {
            let groups = load(&cfg, progress).await?.into_service().groups();
            if cli.json {
                print_json(&groups)?;
            } else {
                print!("{}", report::render_groups(&groups));
            }
        }
        Commands::Distribution => {
            let distribution = load(&cfg, progress).await?.into_service().distribution();
            if cli.json {
                print_json(&distribution)?;
            } else {
                print!("{}", report::render_distribution(&distribution));
            }
        }
        Commands::Hierarchy => {
            let service = load(&cfg, progress).await?.into_service();
            let hierarchy = service.hierarchy();
            if cli.json {
                let trees: Vec<serde_json::Value> = hierarchy
                    .trees()
                    .map(|(doc, tree)| serde_json::json!({ "id": doc.id, "root": tree }))
                    .collect();
                print_json(&trees)?;
            } else {
                print!("{}", report::render_hierarchy(hierarchy.trees().map(|(doc, _)| doc)));
            }
        }
        Commands::Usage { id, node } => {
            let loaded = load(&cfg, progress).await?;
            let Some(named) = loaded.documents.iter().find(|doc| doc.id == id) else {
                bail!("No document '{}' in corpus {}", id, cfg.corpus.root.display());
            };
            let document = &named.document;
            let start = match node {
                None => document.root_node(),
                Some(node_id) => match document.node(node_id) {
                    Some(found) => found,
                    None => bail!(
                        "Node {} not found in {} ({} nodes)",
                        node_id,
                        id,
                        document.nodes().len()
                    ),
                },
            };
            let usage = rst_lens_core::service::relation_usage(document, start);
            if cli.json {
                print_json(&serde_json::json!({
                    "document": named.id,
                    "node": start.id,
                    "usage": usage,
                }))?;
            } else {
                print!("{}", report::render_usage(&usage));
            }
        }
        Commands::Serve => {
            let service: RelationService<NamedDocument> =
                load(&cfg, progress).await?.into_service();
            server::run_server(&cfg, Arc::new(service)).await?;
        }
    }

    Ok(())
}

/// An explicit `--config` must exist. The default path may be absent, in
/// which case built-in defaults apply.
fn resolve_config(explicit: Option<&Path>) -> Result<Config> {
    match explicit {
        Some(path) => config::load_config(path),
        None => {
            let default_path = Path::new(DEFAULT_CONFIG);
            if default_path.exists() {
                config::load_config(default_path)
            } else {
                Ok(Config::minimal())
            }
        }
    }
}

async fn load(cfg: &Config, progress: ProgressMode) -> Result<LoadedCorpus> {
    let reporter = progress.reporter();
    load_corpus(cfg, reporter.as_ref()).await
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
