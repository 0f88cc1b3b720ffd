//! Human-readable rendering of corpus queries for the CLI.
//!
//! Every renderer returns a `String` so the CLI can print it and tests can
//! inspect it. `--json` output bypasses this module entirely.

use std::fmt::Write;

use rst_lens_core::service::{RelationGroup, RelationStats, RelationUsage, TypeCount};
use rst_lens_core::{NamedDocument, Node, RstDocument};

/// Longest text excerpt shown next to a node in tree output.
const EXCERPT_CHARS: usize = 60;

pub fn render_files(documents: &[NamedDocument]) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{:<48} {:>6} {:>10}", "DOCUMENT", "NODES", "RELATIONS");
    let _ = writeln!(out, "{}", "-".repeat(66));
    for doc in documents {
        let _ = writeln!(
            out,
            "{:<48} {:>6} {:>10}",
            doc.id,
            doc.document.nodes().len(),
            doc.document.relations().len()
        );
    }
    let _ = writeln!(out);
    let _ = writeln!(out, "{} documents", documents.len());
    out
}

pub fn render_stats(stats: &RelationStats) -> String {
    if stats.is_empty() {
        return "No relations declared.\n".to_string();
    }
    let mut out = String::new();
    let _ = writeln!(out, "{:<28} {:<20} {:>6}", "RELATION", "TYPE", "COUNT");
    let _ = writeln!(out, "{}", "-".repeat(56));
    for (name, count) in stats.iter() {
        let _ = writeln!(
            out,
            "{:<28} {:<20} {:>6}",
            name, count.relation_type, count.count
        );
    }
    out
}

pub fn render_groups(groups: &[RelationGroup]) -> String {
    if groups.is_empty() {
        return "No relations declared.\n".to_string();
    }
    let mut out = String::new();
    for group in groups {
        let _ = writeln!(
            out,
            "{} ({})",
            display_type(&group.relation_type),
            group.relations.len()
        );
        for relation in &group.relations {
            let _ = writeln!(out, "  {}", relation.name);
        }
    }
    out
}

pub fn render_distribution(distribution: &[TypeCount]) -> String {
    if distribution.is_empty() {
        return "No relations declared.\n".to_string();
    }
    let total: usize = distribution.iter().map(|t| t.count).sum();
    let mut out = String::new();
    let _ = writeln!(out, "{:<28} {:>6} {:>7}", "TYPE", "COUNT", "SHARE");
    let _ = writeln!(out, "{}", "-".repeat(43));
    for entry in distribution {
        let _ = writeln!(
            out,
            "{:<28} {:>6} {:>6.1}%",
            display_type(&entry.relation_type),
            entry.count,
            entry.count as f64 * 100.0 / total as f64
        );
    }
    out
}

pub fn render_usage(usage: &[RelationUsage]) -> String {
    if usage.is_empty() {
        return "No relations used in this subtree.\n".to_string();
    }
    let mut out = String::new();
    let _ = writeln!(out, "{:<28} {:>6}", "RELATION", "COUNT");
    let _ = writeln!(out, "{}", "-".repeat(35));
    for entry in usage {
        let _ = writeln!(out, "{:<28} {:>6}", entry.relation.name, entry.count);
    }
    out
}

/// Indented tree of every document, one node per line.
pub fn render_hierarchy<'a>(documents: impl IntoIterator<Item = &'a NamedDocument>) -> String {
    let mut out = String::new();
    for named in documents {
        let _ = writeln!(out, "{}", named.id);
        render_subtree(&mut out, &named.document, named.document.root_node(), 1);
        let _ = writeln!(out);
    }
    out
}

fn render_subtree(out: &mut String, document: &RstDocument, root: &Node, depth: usize) {
    let mut stack = vec![(root, depth)];
    while let Some((node, depth)) = stack.pop() {
        let _ = write!(out, "{}#{} {}", "  ".repeat(depth), node.id, kind_label(node));
        if let Some(relname) = &node.relname {
            let _ = write!(out, " [{}]", relname);
        }
        if let Some(text) = &node.text {
            let _ = write!(out, " \"{}\"", excerpt(text));
        }
        let _ = writeln!(out);
        let children: Vec<&Node> = document.children(node).collect();
        stack.extend(children.into_iter().rev().map(|child| (child, depth + 1)));
    }
}

fn kind_label(node: &Node) -> &'static str {
    match node.kind {
        rst_lens_core::NodeKind::Segment => "segment",
        rst_lens_core::NodeKind::Group => "group",
        rst_lens_core::NodeKind::Span => "span",
    }
}

fn excerpt(text: &str) -> String {
    if text.chars().count() <= EXCERPT_CHARS {
        return text.to_string();
    }
    let mut cut: String = text.chars().take(EXCERPT_CHARS - 3).collect();
    cut.push_str("...");
    cut
}

fn display_type(relation_type: &str) -> &str {
    if relation_type.is_empty() {
        "(untyped)"
    } else {
        relation_type
    }
}
