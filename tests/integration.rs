use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;

fn rst_lens_binary() -> PathBuf {
    let mut path = std::env::current_exe().unwrap();
    path.pop(); // remove test binary name
    path.pop(); // remove deps/
    path.push("rst-lens");
    path
}

const ALPHA: &str = r#"<rst>
  <header>
    <relations>
      <rel name="elaboration" type="rst"/>
      <rel name="joint" type="multinuc"/>
    </relations>
  </header>
  <body>
    <segment>
      <segment relname="elaboration">The committee met on Monday.</segment>
      <group type="multinuc" relname="elaboration">
        <segment relname="joint">It approved the budget</segment>
        <segment relname="joint">and adjourned.</segment>
      </group>
    </segment>
  </body>
</rst>"#;

const BETA: &str = r#"<rst>
  <header>
    <relations>
      <rel name="elaboration" type="presentational"/>
      <rel name="evidence" type="presentational"/>
    </relations>
  </header>
  <body>
    <segment id="1" parent="2" relname="evidence">Sales rose.</segment>
    <segment id="2">Demand is strong.</segment>
  </body>
</rst>"#;

fn setup_test_env() -> (TempDir, PathBuf) {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path().to_path_buf();

    let config_dir = root.join("config");
    fs::create_dir_all(&config_dir).unwrap();

    let corpus = root.join("corpus");
    fs::create_dir_all(corpus.join("news")).unwrap();
    fs::write(corpus.join("alpha.rs3"), ALPHA).unwrap();
    fs::write(corpus.join("news/beta.rs3"), BETA).unwrap();
    fs::write(corpus.join("readme.txt"), "not part of the corpus").unwrap();

    let config_content = format!(
        r#"[corpus]
root = "{}/corpus"
include_globs = ["**/*.rs3"]

[parser]
layout = "auto"
on_error = "fail"

[server]
bind = "127.0.0.1:7341"
"#,
        root.display()
    );

    let config_path = config_dir.join("rst-lens.toml");
    fs::write(&config_path, config_content).unwrap();

    (tmp, config_path)
}

fn run_rst_lens(config_path: &Path, args: &[&str]) -> (String, String, bool) {
    let binary = rst_lens_binary();
    let output = Command::new(&binary)
        .arg("--config")
        .arg(config_path.to_str().unwrap())
        .arg("--progress")
        .arg("off")
        .args(args)
        .output()
        .unwrap_or_else(|e| panic!("Failed to run rst-lens binary at {:?}: {}", binary, e));

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    let success = output.status.success();
    (stdout, stderr, success)
}

fn run_json(config_path: &Path, args: &[&str]) -> serde_json::Value {
    let mut full = vec!["--json"];
    full.extend_from_slice(args);
    let (stdout, stderr, success) = run_rst_lens(config_path, &full);
    assert!(success, "rst-lens {:?} failed: {}", args, stderr);
    serde_json::from_str(&stdout).unwrap_or_else(|e| panic!("invalid JSON ({}): {}", e, stdout))
}

#[test]
fn test_files_lists_corpus_in_path_order() {
    let (_tmp, config_path) = setup_test_env();

    let (stdout, stderr, success) = run_rst_lens(&config_path, &["files"]);
    assert!(success, "files failed: {}", stderr);
    assert!(stdout.contains("alpha.rs3"));
    assert!(stdout.contains("news/beta.rs3"));
    assert!(!stdout.contains("readme.txt"));
    assert!(stdout.contains("2 documents"));

    let files = run_json(&config_path, &["files"]);
    assert_eq!(files[0]["id"], "alpha.rs3");
    assert_eq!(files[0]["nodes"], 5);
    assert_eq!(files[1]["id"], "news/beta.rs3");
}

#[test]
fn test_stats_first_declared_type_wins() {
    let (_tmp, config_path) = setup_test_env();

    let stats = run_json(&config_path, &["stats"]);
    assert_eq!(stats["elaboration"]["count"], 2);
    assert_eq!(stats["elaboration"]["type"], "rst");
    assert_eq!(stats["evidence"]["count"], 1);

    let (stdout, _, success) = run_rst_lens(&config_path, &["stats"]);
    assert!(success);
    assert!(stdout.starts_with("RELATION"));
}

#[test]
fn test_groups_and_distribution() {
    let (_tmp, config_path) = setup_test_env();

    let groups = run_json(&config_path, &["groups"]);
    let types: Vec<&str> = groups
        .as_array()
        .unwrap()
        .iter()
        .map(|g| g["type"].as_str().unwrap())
        .collect();
    assert_eq!(types, vec!["rst", "multinuc", "presentational"]);
    assert_eq!(groups[2]["relations"].as_array().unwrap().len(), 2);

    let distribution = run_json(&config_path, &["distribution"]);
    assert_eq!(distribution[2]["type"], "presentational");
    assert_eq!(distribution[2]["count"], 2);
}

#[test]
fn test_hierarchy_includes_flat_layout_documents() {
    let (_tmp, config_path) = setup_test_env();

    let hierarchy = run_json(&config_path, &["hierarchy"]);
    let beta = &hierarchy[1];
    assert_eq!(beta["id"], "news/beta.rs3");
    assert_eq!(beta["root"]["id"], 1);
    assert_eq!(beta["root"]["sourceId"], 2);
    assert_eq!(beta["root"]["children"][0]["relname"], "evidence");

    let (stdout, _, success) = run_rst_lens(&config_path, &["hierarchy"]);
    assert!(success);
    assert!(stdout.contains("[evidence] \"Sales rose.\""));
}

#[test]
fn test_usage_defaults_to_root_and_accepts_node() {
    let (_tmp, config_path) = setup_test_env();

    let usage = run_json(&config_path, &["usage", "alpha.rs3"]);
    assert_eq!(usage["node"], 1);
    assert_eq!(usage["usage"][0]["relation"]["name"], "elaboration");
    assert_eq!(usage["usage"][0]["relation"]["type"], "unknown");
    assert_eq!(usage["usage"][0]["count"], 2);
    assert_eq!(usage["usage"][1]["count"], 2);

    let scoped = run_json(&config_path, &["usage", "alpha.rs3", "--node", "3"]);
    assert_eq!(scoped["usage"].as_array().unwrap().len(), 2);
    assert_eq!(scoped["usage"][0]["relation"]["name"], "elaboration");
    assert_eq!(scoped["usage"][0]["count"], 1);
}

#[test]
fn test_usage_unknown_document_or_node_fails() {
    let (_tmp, config_path) = setup_test_env();

    let (_, stderr, success) = run_rst_lens(&config_path, &["usage", "missing.rs3"]);
    assert!(!success);
    assert!(stderr.contains("No document"), "got: {}", stderr);

    let (_, stderr, success) = run_rst_lens(&config_path, &["usage", "alpha.rs3", "--node", "99"]);
    assert!(!success);
    assert!(stderr.contains("Node 99 not found"), "got: {}", stderr);
}

#[test]
fn test_parse_single_file() {
    let (tmp, config_path) = setup_test_env();
    let path = tmp.path().join("corpus/alpha.rs3");

    let document = run_json(&config_path, &["parse", path.to_str().unwrap()]);
    let nodes = document["document"]["nodes"].as_array().unwrap();
    let ids: Vec<u64> = nodes.iter().map(|n| n["id"].as_u64().unwrap()).collect();
    assert_eq!(ids, vec![1, 2, 3, 4, 5]);
    assert_eq!(document["document"]["rootNode"]["id"], 1);
    assert_eq!(nodes[2]["kind"], "group");
}

#[test]
fn test_malformed_file_fails_by_default() {
    let (tmp, config_path) = setup_test_env();
    fs::write(tmp.path().join("corpus/broken.rs3"), "<rst><body>").unwrap();

    let (_, stderr, success) = run_rst_lens(&config_path, &["stats"]);
    assert!(!success);
    assert!(stderr.contains("broken.rs3"), "got: {}", stderr);
}

#[test]
fn test_malformed_file_skipped_with_warning() {
    let (tmp, config_path) = setup_test_env();
    fs::write(tmp.path().join("corpus/broken.rs3"), "<rst><body>").unwrap();
    let config = fs::read_to_string(&config_path)
        .unwrap()
        .replace("on_error = \"fail\"", "on_error = \"skip\"");
    fs::write(&config_path, config).unwrap();

    let (stdout, stderr, success) = run_rst_lens(&config_path, &["files"]);
    assert!(success, "files failed: {}", stderr);
    assert!(stderr.contains("Warning: skipped broken.rs3"), "got: {}", stderr);
    assert!(stdout.contains("2 documents"));
}

#[test]
fn test_root_override() {
    let (tmp, config_path) = setup_test_env();
    let other = tmp.path().join("other");
    fs::create_dir_all(&other).unwrap();
    fs::write(other.join("only.rs3"), BETA).unwrap();

    let files = run_json(
        &config_path,
        &["--root", other.to_str().unwrap(), "files"],
    );
    assert_eq!(files.as_array().unwrap().len(), 1);
    assert_eq!(files[0]["id"], "only.rs3");
}

#[test]
fn test_missing_corpus_root_fails() {
    let (tmp, config_path) = setup_test_env();
    fs::remove_dir_all(tmp.path().join("corpus")).unwrap();

    let (_, stderr, success) = run_rst_lens(&config_path, &["files"]);
    assert!(!success);
    assert!(stderr.contains("does not exist"), "got: {}", stderr);
}

#[test]
fn test_missing_explicit_config_fails() {
    let tmp = TempDir::new().unwrap();
    let (_, stderr, success) = run_rst_lens(&tmp.path().join("nope.toml"), &["files"]);
    assert!(!success);
    assert!(stderr.contains("Failed to read config file"), "got: {}", stderr);
}

#[test]
fn test_completions() {
    let output = Command::new(rst_lens_binary())
        .args(["completions", "bash"])
        .output()
        .unwrap();
    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).contains("rst-lens"));
}
