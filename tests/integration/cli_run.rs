#![allow(missing_docs)]

use std::fs;
use std::path::{Path, PathBuf};

use assert_cmd::cargo::cargo_bin_cmd;
use linkclique::{EdgeStore, SqliteGraphStore, StoreOptions};
use tempfile::TempDir;

const EXAMPLE: &str = "A,B\nA,C\nA,D\nB,A\nB,C\nC,A\nC,B\nC,D\nD,A\nD,B\n";

struct Workspace {
    dir: TempDir,
}

impl Workspace {
    fn new() -> Self {
        Self {
            dir: TempDir::new().expect("tempdir"),
        }
    }

    fn file(&self, name: &str, contents: &str) -> PathBuf {
        let path = self.dir.path().join(name);
        fs::write(&path, contents).expect("write input");
        path
    }

    fn path(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    fn config(&self) -> PathBuf {
        self.path("cli.toml")
    }
}

fn stdout_of(output: &[u8]) -> String {
    String::from_utf8(output.to_vec()).expect("utf8 stdout")
}

fn run_json(ws: &Workspace, args: &[&str], input: &Path) -> serde_json::Value {
    let output = cargo_bin_cmd!("linkclique")
        .arg("--config")
        .arg(ws.config())
        .args(["--format", "json", "run"])
        .args(args)
        .arg(input)
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    serde_json::from_slice(&output).expect("json output")
}

#[test]
fn run_prints_ranked_cliques() {
    let ws = Workspace::new();
    let input = ws.file("links.csv", EXAMPLE);
    let output = cargo_bin_cmd!("linkclique")
        .arg("--config")
        .arg(ws.config())
        .args(["--quiet", "run", "--amnt", "2"])
        .arg(&input)
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let stdout = stdout_of(&output);
    let lines: Vec<&str> = stdout.lines().collect();
    assert_eq!(
        lines,
        ["1 Result of length 3: A, B, C", "2 Result of length 2: A, D"]
    );
}

#[test]
fn run_reports_json_with_stats() {
    let ws = Workspace::new();
    let input = ws.file("links.csv", EXAMPLE);
    let summary = run_json(&ws, &["--amnt", "3", "--pivot", "max-candidates"], &input);

    assert_eq!(summary["ingest"]["documents"], 4);
    assert_eq!(summary["ingest"]["edges_inserted"], 10);
    let report = &summary["report"];
    assert_eq!(report["complete"], true);
    assert_eq!(report["top_k"], 3);
    let cliques = report["cliques"].as_array().expect("cliques");
    assert_eq!(cliques.len(), 3);
    assert_eq!(cliques[0]["members"], serde_json::json!(["A", "B", "C"]));
    assert_eq!(cliques[2]["size"], 0);
    assert!(report["stats"]["calls"].as_u64().unwrap() > 0);
    assert!(summary["kept_db"].is_null());
}

#[test]
fn call_limit_exits_with_aborted_status() {
    let ws = Workspace::new();
    let input = ws.file("links.csv", EXAMPLE);
    let assert = cargo_bin_cmd!("linkclique")
        .arg("--config")
        .arg(ws.config())
        .args(["--quiet", "run", "--max-calls", "1"])
        .arg(&input)
        .assert()
        .code(2);
    let stderr = String::from_utf8_lossy(&assert.get_output().stderr).into_owned();
    assert!(stderr.contains("call limit reached"), "stderr: {stderr}");
}

#[test]
fn ingest_then_search_existing_store() {
    let ws = Workspace::new();
    let input = ws.file("links.jsonl", concat!(
        "{\"source\": \"A\", \"targets\": [\"B\", \"C\", \"D\"]}\n",
        "{\"source\": \"B\", \"targets\": [\"A\", \"C\"]}\n",
        "{\"source\": \"C\", \"targets\": [\"A\", \"B\", \"D\"]}\n",
        "{\"source\": \"D\", \"targets\": [\"A\", \"B\"]}\n",
    ));
    let db = ws.path("graph.sqlite");

    cargo_bin_cmd!("linkclique")
        .arg("--config")
        .arg(ws.config())
        .args(["--quiet", "ingest", "--defer-indexes", "--db"])
        .arg(&db)
        .arg(&input)
        .assert()
        .success();
    assert!(db.exists());

    let output = cargo_bin_cmd!("linkclique")
        .arg("--config")
        .arg(ws.config())
        .args(["--quiet", "search", "--amnt", "1"])
        .arg(&db)
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    assert_eq!(stdout_of(&output).trim(), "1 Result of length 3: A, B, C");

    cargo_bin_cmd!("linkclique")
        .arg("--config")
        .arg(ws.config())
        .args(["ingest", "--db"])
        .arg(&db)
        .arg(&input)
        .assert()
        .failure();
}

#[test]
fn keep_db_leaves_scratch_store_behind() {
    let ws = Workspace::new();
    let input = ws.file("links.csv", EXAMPLE);
    let scratch = ws.path("scratch.sqlite");
    let summary = run_json(
        &ws,
        &["--keep-db", "--tmp", scratch.to_str().expect("utf8 path")],
        &input,
    );
    assert_eq!(summary["kept_db"], scratch.to_str().unwrap());
    assert!(scratch.exists());
}

#[test]
fn profiles_feed_run_settings() {
    let ws = Workspace::new();
    let input = ws.file("links.csv", EXAMPLE);

    cargo_bin_cmd!("linkclique")
        .arg("--config")
        .arg(ws.config())
        .args(["profile", "save", "tiny", "--amnt", "1", "--make-default"])
        .assert()
        .success();
    let saved = fs::read_to_string(ws.config()).expect("config written");
    assert!(saved.contains("[profiles.tiny]"), "config: {saved}");

    let listing = cargo_bin_cmd!("linkclique")
        .arg("--config")
        .arg(ws.config())
        .args(["profile", "list"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    assert!(stdout_of(&listing).contains("tiny (default): top_k=1"));

    let summary = run_json(&ws, &[], &input);
    assert_eq!(summary["report"]["top_k"], 1);

    let summary = run_json(&ws, &["--amnt", "2"], &input);
    assert_eq!(summary["report"]["top_k"], 2);
}

#[test]
fn completions_are_generated() {
    let output = cargo_bin_cmd!("linkclique")
        .args(["completions", "bash"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    assert!(stdout_of(&output).contains("linkclique"));
}

fn ingest(ws: &Workspace, input: &Path, db: &Path, flags: &[&str]) {
    cargo_bin_cmd!("linkclique")
        .arg("--config")
        .arg(ws.config())
        .args(["--quiet", "ingest"])
        .args(flags)
        .arg("--db")
        .arg(db)
        .arg(input)
        .assert()
        .success();
}

fn stored_edges(db: &Path) -> u64 {
    SqliteGraphStore::open(db, StoreOptions::default())
        .expect("open store")
        .edge_count()
        .expect("edge count")
}

#[test]
fn negated_flags_override_profile_toggles() {
    let ws = Workspace::new();
    let input = ws.file("links.csv", "A,B\nB,A\nA,B\n");

    cargo_bin_cmd!("linkclique")
        .arg("--config")
        .arg(ws.config())
        .args(["profile", "save", "strict", "--dedup-edges", "--make-default"])
        .assert()
        .success();

    let deduped = ws.path("deduped.sqlite");
    ingest(&ws, &input, &deduped, &[]);
    assert_eq!(stored_edges(&deduped), 2);

    let raw = ws.path("raw.sqlite");
    ingest(&ws, &input, &raw, &["--no-dedup-edges"]);
    assert_eq!(stored_edges(&raw), 3);

    let output = cargo_bin_cmd!("linkclique")
        .arg("--config")
        .arg(ws.config())
        .args(["--quiet", "search", "--amnt", "1"])
        .arg(&raw)
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    assert_eq!(stdout_of(&output).trim(), "1 Result of length 2: A, B");
}

#[test]
fn tab_separated_input_is_split_on_tabs() {
    let ws = Workspace::new();
    let input = ws.file("links.tsv", &EXAMPLE.replace(',', "\t"));
    let output = cargo_bin_cmd!("linkclique")
        .arg("--config")
        .arg(ws.config())
        .args(["--quiet", "run", "--amnt", "2"])
        .arg(&input)
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    assert_eq!(
        stdout_of(&output).lines().collect::<Vec<_>>(),
        ["1 Result of length 3: A, B, C", "2 Result of length 2: A, D"]
    );
}
