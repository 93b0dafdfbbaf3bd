use std::io::Write;
use std::process::{Command, Output, Stdio};

use serde_json::Value;

const CITED: &str = concat!(
    "See the sources.\n\n",
    "data_start",
    r#"[{"pageNumber":1,"documentChunk":"Alpha.","documentPath":"/a.pdf"},"#,
    r#"{"pageNumber":2,"documentChunk":"Beta.","documentPath":"/b.pdf"}]"#,
    "data_end",
);

fn chatmark(args: &[&str], stdin: &str) -> Output {
    let config_dir = std::env::temp_dir().join(format!("chatmark-cli-{}", std::process::id()));
    let mut child = Command::new(env!("CARGO_BIN_EXE_chatmark"))
        .args(args)
        .env("CHATMARK_CONFIG_DIR", &config_dir)
        .env_remove("RUST_LOG")
        .env_remove("CHATMARK_LATEX")
        .env_remove("CHATMARK_CITATION_TOGGLE")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .unwrap();
    child.stdin.take().unwrap().write_all(stdin.as_bytes()).unwrap();
    child.wait_with_output().unwrap()
}

fn json(output: &Output) -> Value {
    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));
    serde_json::from_slice(&output.stdout).unwrap()
}

#[test]
fn test_render_markdown_with_code_block() {
    let out = json(&chatmark(&["render", "-", "--allow-run-code"], "Hi\n\n```py\na = 1\nb = 2\n```\n"));
    assert_eq!(out["state"], "markdown");
    let block = &out["tree"]["nodes"][1];
    assert_eq!(block["kind"], "code_block");
    assert_eq!(block["lang"], "py");
    assert_eq!(block["block_index"], 0);
    assert_eq!(block["allow_execution"], true);
}

#[test]
fn test_render_without_permission_hides_execution() {
    let out = json(&chatmark(&["render", "-"], "```py\na\nb\n```\n"));
    assert_eq!(out["tree"]["nodes"][0]["allow_execution"], false);
}

#[test]
fn test_render_citations() {
    let out = json(&chatmark(&["render", "-"], CITED));
    assert_eq!(out["state"], "cited");
    assert_eq!(out["citations"]["markers"].as_array().map(Vec::len), Some(2));
    assert_eq!(out["citations"]["tiles"][1]["label"], "Source2");
    assert_eq!(out["citations"]["detail"], Value::Null);
}

#[test]
fn test_render_select_opens_detail() {
    let out = json(&chatmark(&["render", "-", "--select", "2"], CITED));
    assert_eq!(out["citations"]["detail"]["documentPath"], "/b.pdf");
}

#[test]
fn test_render_pending_latest() {
    let out = json(&chatmark(&["render", "-", "--latest"], ""));
    assert_eq!(out, serde_json::json!({ "state": "pending", "thinking": true }));
}

#[test]
fn test_malformed_citations_fail() {
    let output = chatmark(&["render", "-"], "x data_start{oops}data_end");
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("malformed citation payload"));
}

#[test]
fn test_resolve_link() {
    let out = json(&chatmark(
        &["resolve-link", "https://host/files/u123/abc/report.pdf", "--user", "u123"],
        "",
    ));
    assert_eq!(out["resolvedFileId"], "abc");
    assert_eq!(out["resolvedFilename"], "report.pdf");
    assert_eq!(out["displayHref"], "/api/files/u123/abc/report.pdf");
    assert_eq!(out["target"], "_blank");
}

#[test]
fn test_normalize() {
    let output = chatmark(&["normalize", "-"], r"costs $5, area \(\pi r^2\)");
    assert!(output.status.success());
    assert_eq!(String::from_utf8_lossy(&output.stdout), r"costs \$5, area $\pi r^2$");
}

#[test]
fn test_text_format() {
    let output = chatmark(&["render", "-", "--format", "text"], "# Title\n\nBody *text*.");
    assert!(output.status.success());
    assert_eq!(String::from_utf8_lossy(&output.stdout).trim_end(), "Title\nBody text.");
}
