//! Corpus discovery and loading from the filesystem.
//!
//! Walks `[corpus].root`, filters paths through the include/exclude glob
//! sets, reads the matching files concurrently, and parses them with the
//! configured [`ParseOptions`](rst_lens_core::parser::ParseOptions).
//!
//! Document identifiers are paths relative to the corpus root, with `/`
//! separators on every platform.

use anyhow::{bail, Context, Result};
use globset::{Glob, GlobSet, GlobSetBuilder};
use rst_lens_core::parser::{parse_all, BatchPolicy, SourceFile};
use rst_lens_core::{NamedDocument, RelationService};
use std::path::{Path, PathBuf};
use tokio::task::JoinSet;
use walkdir::WalkDir;

use crate::config::{Config, CorpusConfig};
use crate::progress::{LoadProgressEvent, LoadProgressReporter};

/// Files parsed between two progress events.
const PARSE_BATCH: usize = 64;

/// A file selected for loading.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CorpusFile {
    /// Path relative to the corpus root.
    pub id: String,
    pub path: PathBuf,
    pub size: u64,
}

/// A file left out of the corpus and why.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedFile {
    pub id: String,
    pub reason: String,
}

/// Parsed documents in identifier order plus everything that was skipped.
#[derive(Debug, Default)]
pub struct LoadedCorpus {
    pub documents: Vec<NamedDocument>,
    pub skipped: Vec<SkippedFile>,
}

impl LoadedCorpus {
    pub fn into_service(self) -> RelationService<NamedDocument> {
        RelationService::with_documents(self.documents)
    }
}

/// List the files under the corpus root matching the configured globs,
/// sorted by identifier.
pub fn discover_files(corpus: &CorpusConfig) -> Result<Vec<CorpusFile>> {
    let root = &corpus.root;
    if !root.exists() {
        bail!("Corpus root does not exist: {}", root.display());
    }

    let include_set = build_globset(&corpus.include_globs)?;

    let mut default_excludes = vec!["**/.git/**".to_string()];
    default_excludes.extend(corpus.exclude_globs.clone());
    let exclude_set = build_globset(&default_excludes)?;

    let mut files = Vec::new();

    let walker = WalkDir::new(root).follow_links(corpus.follow_symlinks);
    for entry in walker {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }

        let path = entry.path();
        let relative = path.strip_prefix(root).unwrap_or(path);
        let id = relative_id(relative);

        if exclude_set.is_match(&id) || !include_set.is_match(&id) {
            continue;
        }

        let size = entry
            .metadata()
            .with_context(|| format!("Failed to stat {}", path.display()))?
            .len();
        files.push(CorpusFile {
            id,
            path: path.to_path_buf(),
            size,
        });
    }

    files.sort_by(|a, b| a.id.cmp(&b.id));

    Ok(files)
}

fn relative_id(relative: &Path) -> String {
    relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

/// Read every file concurrently. Results line up with `files`.
pub async fn read_files(files: &[CorpusFile]) -> Result<Vec<std::io::Result<String>>> {
    let mut set = JoinSet::new();
    for (i, file) in files.iter().enumerate() {
        let path = file.path.clone();
        set.spawn(async move { (i, tokio::fs::read_to_string(path).await) });
    }

    let mut contents: Vec<Option<std::io::Result<String>>> = files.iter().map(|_| None).collect();
    while let Some(joined) = set.join_next().await {
        let (i, read) = joined.context("File read task failed")?;
        contents[i] = Some(read);
    }

    Ok(contents
        .into_iter()
        .map(|read| {
            read.unwrap_or_else(|| Err(std::io::Error::other("file was not read")))
        })
        .collect())
}

/// Discover, read, and parse the configured corpus.
///
/// Oversized files are always skipped with a warning. Unreadable and
/// malformed files follow `[parser].on_error`: `fail` aborts the load,
/// `skip` warns and leaves them out.
pub async fn load_corpus(
    config: &Config,
    reporter: &dyn LoadProgressReporter,
) -> Result<LoadedCorpus> {
    reporter.report(LoadProgressEvent::Discovering {
        root: config.corpus.root.display().to_string(),
    });
    let discovered = discover_files(&config.corpus)?;

    let mut loaded = LoadedCorpus::default();
    let (files, oversized): (Vec<CorpusFile>, Vec<CorpusFile>) = discovered
        .into_iter()
        .partition(|f| f.size <= config.corpus.max_file_bytes);
    for file in oversized {
        skip(
            &mut loaded,
            file.id,
            format!(
                "file is {} bytes, limit is {}",
                file.size, config.corpus.max_file_bytes
            ),
        );
    }

    reporter.report(LoadProgressEvent::Reading {
        files: files.len() as u64,
    });
    let reads = read_files(&files).await?;

    let mut sources = Vec::with_capacity(files.len());
    for (file, read) in files.iter().zip(reads) {
        match read {
            Ok(content) => sources.push(SourceFile::new(file.id.clone(), content)),
            Err(e) if config.parser.on_error == BatchPolicy::Skip => {
                skip(&mut loaded, file.id.clone(), e.to_string());
            }
            Err(e) => {
                return Err(e).with_context(|| format!("Failed to read {}", file.path.display()))
            }
        }
    }

    let total = sources.len() as u64;
    let mut parsed = 0u64;
    for batch in sources.chunks(PARSE_BATCH) {
        let outcome =
            parse_all(batch, &config.parser).with_context(|| "Failed to parse corpus")?;
        loaded.documents.extend(outcome.documents);
        for failure in outcome.failures {
            skip(&mut loaded, failure.id, failure.error.to_string());
        }
        parsed += batch.len() as u64;
        reporter.report(LoadProgressEvent::Parsing { n: parsed, total });
    }

    reporter.report(LoadProgressEvent::Loaded {
        documents: loaded.documents.len() as u64,
        skipped: loaded.skipped.len() as u64,
    });

    Ok(loaded)
}

fn skip(loaded: &mut LoadedCorpus, id: String, reason: String) {
    eprintln!("Warning: skipped {}: {}", id, reason);
    loaded.skipped.push(SkippedFile { id, reason });
}

fn build_globset(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        builder.add(Glob::new(pattern)?);
    }
    Ok(builder.build()?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::progress::NoProgress;
    use std::fs;
    use tempfile::TempDir;

    const GOOD: &str = r#"<rst>
      <header><relations><rel name="cause" type="rst"/></relations></header>
      <body><segment><segment relname="cause">Because.</segment></segment></body>
    </rst>"#;

    fn corpus_dir() -> TempDir {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path();
        fs::create_dir_all(root.join("cluster-1")).unwrap();
        fs::create_dir_all(root.join(".git")).unwrap();
        fs::write(root.join("cluster-1/b.rs3"), GOOD).unwrap();
        fs::write(root.join("a.rs3"), GOOD).unwrap();
        fs::write(root.join("notes.txt"), "not a document").unwrap();
        fs::write(root.join(".git/c.rs3"), GOOD).unwrap();
        tmp
    }

    fn config_for(root: &Path) -> Config {
        let mut config = Config::minimal();
        config.corpus.root = root.to_path_buf();
        config
    }

    #[test]
    fn discover_applies_globs_and_sorts() {
        let tmp = corpus_dir();
        let files = discover_files(&config_for(tmp.path()).corpus).unwrap();
        let ids: Vec<&str> = files.iter().map(|f| f.id.as_str()).collect();
        assert_eq!(ids, vec!["a.rs3", "cluster-1/b.rs3"]);
    }

    #[test]
    fn discover_honors_exclude_globs() {
        let tmp = corpus_dir();
        let mut config = config_for(tmp.path());
        config.corpus.exclude_globs = vec!["cluster-1/**".to_string()];
        let files = discover_files(&config.corpus).unwrap();
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].id, "a.rs3");
    }

    #[test]
    fn discover_fails_for_missing_root() {
        let config = config_for(Path::new("/nonexistent/rst-lens-corpus"));
        let err = discover_files(&config.corpus).unwrap_err();
        assert!(err.to_string().contains("does not exist"));
    }

    #[tokio::test]
    async fn load_parses_every_file_in_order() {
        let tmp = corpus_dir();
        let loaded = load_corpus(&config_for(tmp.path()), &NoProgress)
            .await
            .unwrap();
        let ids: Vec<&str> = loaded.documents.iter().map(|d| d.id.as_str()).collect();
        assert_eq!(ids, vec!["a.rs3", "cluster-1/b.rs3"]);
        assert!(loaded.skipped.is_empty());

        let service = loaded.into_service();
        assert_eq!(service.stats().get("cause").map(|c| c.count), Some(2));
    }

    #[tokio::test]
    async fn malformed_file_fails_the_load_by_default() {
        let tmp = corpus_dir();
        fs::write(tmp.path().join("broken.rs3"), "<rst><header/></rst>").unwrap();
        let err = load_corpus(&config_for(tmp.path()), &NoProgress)
            .await
            .unwrap_err();
        assert!(format!("{:#}", err).contains("broken.rs3"));
    }

    #[tokio::test]
    async fn malformed_file_is_skipped_under_skip_policy() {
        let tmp = corpus_dir();
        fs::write(tmp.path().join("broken.rs3"), "<rst><header/></rst>").unwrap();
        let mut config = config_for(tmp.path());
        config.parser.on_error = BatchPolicy::Skip;

        let loaded = load_corpus(&config, &NoProgress).await.unwrap();
        assert_eq!(loaded.documents.len(), 2);
        assert_eq!(loaded.skipped.len(), 1);
        assert_eq!(loaded.skipped[0].id, "broken.rs3");
        assert!(loaded.skipped[0].reason.contains("<body>"));
    }

    #[tokio::test]
    async fn oversized_files_are_skipped() {
        let tmp = corpus_dir();
        let mut config = config_for(tmp.path());
        config.corpus.max_file_bytes = 16;

        let loaded = load_corpus(&config, &NoProgress).await.unwrap();
        assert!(loaded.documents.is_empty());
        assert_eq!(loaded.skipped.len(), 2);
    }
}
