use std::path::Path;
use std::process::{Command, Output};

fn refgraph_cmd(fixture: &str) -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_refgraph"));
    cmd.current_dir(Path::new("tests/fixtures").join(fixture));
    cmd
}

fn run(fixture: &str, args: &[&str]) -> Output {
    refgraph_cmd(fixture).args(args).output().unwrap()
}

fn json(output: &Output) -> serde_json::Value {
    assert!(
        output.status.success(),
        "command failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    serde_json::from_slice(&output.stdout).unwrap()
}

/// `(context, referenced, kind)` of every edge whose file ends with `file`.
fn edges_in(doc: &serde_json::Value, file: &str) -> Vec<(String, String, String)> {
    doc["edges"]
        .as_array()
        .unwrap()
        .iter()
        .filter(|e| e["file"].as_str().unwrap().ends_with(file))
        .map(|e| {
            (
                e["context"].as_str().unwrap_or("<no context>").to_string(),
                e["referenced"].as_str().unwrap().to_string(),
                e["kind"].as_str().unwrap().to_string(),
            )
        })
        .collect()
}

fn edge(context: &str, referenced: &str, kind: &str) -> (String, String, String) {
    (context.to_string(), referenced.to_string(), kind.to_string())
}

#[test]
fn deps_resolves_transitive_artifacts() {
    let doc = json(&run("basic", &["--format", "json", "deps"]));
    let coordinates: Vec<&str> = doc["artifacts"]
        .as_array()
        .unwrap()
        .iter()
        .map(|a| a["coordinate"].as_str().unwrap())
        .collect();
    // junit is test scope and extras is optional in greeting's POM.
    assert_eq!(coordinates, vec!["com.example:greeting:jar:1.0", "com.example:util:jar:1.0"]);
    assert_eq!(doc["artifacts"][0]["depth"], 1);
    assert_eq!(doc["artifacts"][1]["depth"], 2);
    assert!(doc["artifacts"][1]["file"].as_str().unwrap().ends_with("util-1.0.jar"));
    assert_eq!(doc["source_roots"].as_array().unwrap().len(), 2);
    assert!(doc["failures"].as_array().unwrap().is_empty());
}

#[test]
fn deps_text_lists_roots_and_dependencies() {
    let output = run("basic", &["deps"]);
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    let stdout = String::from_utf8(output.stdout).unwrap();
    let lines: Vec<&str> = stdout.lines().collect();
    assert!(lines[0].starts_with("Code: ") && lines[0].ends_with("src/main/java"));
    assert!(lines[1].starts_with("Code: ") && lines[1].ends_with("src/test/java"));
    assert!(lines[2].starts_with("Dependency: ") && lines[2].contains("(com.example:greeting:jar:1.0, compile, depth 1)"));
    assert!(lines[3].contains("(com.example:util:jar:1.0, compile, depth 2)"));
    assert_eq!(lines.len(), 4);
}

#[test]
fn scan_extracts_context_attributed_edges() {
    let doc = json(&run("basic", &["--format", "json", "scan"]));

    let app = edges_in(&doc, "App.java");
    assert_eq!(
        app,
        vec![
            edge("com.acme.App::greeter", "com.example.greeting.Greeter::create", "method-call"),
            edge("com.acme.App::run", "com.acme.App::helper", "method-call"),
            edge("com.acme.App::run", "com.example.greeting.Greeter::greet", "method-call"),
            edge("com.acme.App::helper", "com.acme.App::total", "field-access"),
            edge("com.acme.App::helper", "com.acme.Widget::size", "method-call"),
            edge("com.acme.App::helper", "com.acme.Widget::count", "field-access"),
            edge("com.acme.App::helper", "com.acme.App::total", "field-access"),
            edge("com.acme.App::helper", "com.example.util.Formatter::format", "method-call"),
            edge("com.acme.App::helper", "com.example.greeting.Greeter::formatter", "method-call"),
            edge("com.acme.App::helper", "com.acme.App::greeter", "field-access"),
            edge("com.acme.App::helper", "com.example.greeting.Greeter::DEFAULT", "field-access"),
            edge("com.acme.App::helper", "unresolved(Missing.call)", "method-call"),
        ]
    );

    let test = edges_in(&doc, "AppTest.java");
    assert_eq!(test, vec![edge("<no context>", "com.acme.App::run", "method-call")]);
    assert!(edges_in(&doc, "Widget.java").is_empty());

    let first = &doc["edges"][0];
    assert_eq!(first["line"], 7);
    assert_eq!(first["column"], 37);
    assert_eq!(first["resolved"], true);
}

#[test]
fn scan_reports_problems_and_messages_per_file() {
    let doc = json(&run("basic", &["--format", "json", "scan"]));
    let files = doc["files"].as_array().unwrap();
    assert_eq!(files.len(), 3);
    let app = files
        .iter()
        .find(|f| f["path"].as_str().unwrap().ends_with("App.java"))
        .unwrap();
    assert_eq!(app["parsed"], true);
    // No JDK on the boot classpath, so java.lang.String is unknown too.
    assert_eq!(
        app["problems"],
        serde_json::json!([
            "18:12: String cannot be resolved to a type",
            "18:23: String cannot be resolved to a type",
            "28:9: Missing cannot be resolved",
        ])
    );
    assert_eq!(app["messages"], serde_json::json!(["11:5: Javadoc: Parameter extra is not declared"]));
}

#[test]
fn scan_is_deterministic() {
    let first = run("basic", &["--format", "json", "scan"]);
    let second = run("basic", &["--format", "json", "scan"]);
    assert!(first.status.success());
    assert_eq!(first.stdout, second.stdout);
}

#[test]
fn tree_dumps_bindings() {
    let output = run("basic", &["tree"]);
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    let stdout = String::from_utf8(output.stdout).unwrap();
    assert!(stdout.contains("TypeDeclaration = com.acme.App"));
    assert!(stdout.contains("MethodDeclaration = com.acme.App::run [@param who, @param extra, @return]"));
    assert!(stdout.contains("FieldDeclaration = com.acme.App::greeter"));
    assert!(stdout.contains("MethodInvocation -> com.example.greeting.Greeter::create"));
    assert!(stdout.contains("  MSG: 11:5: Javadoc: Parameter extra is not declared"));
}

#[test]
fn missing_artifact_aborts_by_default() {
    let output = run("missing-dep", &["scan"]);
    assert!(!output.status.success());
    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("com.example:absent:jar:9.9"), "stderr: {stderr}");
    assert!(output.stdout.is_empty());
}

#[test]
fn partial_policy_records_failures_and_continues() {
    let doc = json(&run("partial", &["--format", "json", "scan"]));
    let failures = doc["failures"].as_array().unwrap();
    assert_eq!(failures.len(), 1);
    assert!(failures[0].as_str().unwrap().contains("com.example:absent:jar:9.9"));
    assert_eq!(doc["artifacts"][0]["coordinate"], "com.example:util:jar:1.0");
    assert_eq!(
        edges_in(&doc, "Report.java"),
        vec![edge("com.acme.Report::render", "com.example.util.Formatter::format", "method-call")]
    );
}

#[test]
fn missing_declared_source_root_is_fatal() {
    let output = run("missing-root", &["deps"]);
    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Source Root Missing"), "stderr: {stderr}");
    assert!(stderr.contains("src/nowhere"));
}

#[test]
fn missing_manifest_is_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let output = Command::new(env!("CARGO_BIN_EXE_refgraph"))
        .arg("deps")
        .arg(dir.path())
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&output.stderr).contains("Manifest Not Found"));
}
