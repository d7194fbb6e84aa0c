use std::process::{Command, Output};

fn tagquery(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_tagquery"))
        .args(args)
        .env_remove("RUST_LOG")
        .output()
        .expect("tagquery to run")
}

#[test]
fn prints_document_and_exits_cleanly() {
    let output = tagquery(&["red_panda AND NOT blue"]);
    assert_eq!(output.status.code(), Some(0));
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("\\begin{forest}"));
    assert!(stdout.contains("[ ${red\\_panda}$, draw, black]"));
}

#[test]
fn parse_failure_exits_with_one() {
    let output = tagquery(&["cat AND"]);
    assert_eq!(output.status.code(), Some(1));
    assert!(output.stdout.is_empty(), "no document on failure");
    assert!(String::from_utf8_lossy(&output.stderr).contains("Parse error"));
}

#[test]
fn context_leak_exits_with_one_without_document() {
    let output = tagquery(&["title:\"open"]);
    assert_eq!(output.status.code(), Some(1));
    assert!(output.stdout.is_empty());
}

#[test]
fn unwritable_output_exits_with_one() {
    let target = std::env::temp_dir().join("tagquery-missing-dir").join("out.tex");
    let output = tagquery(&["cat", "--output", target.to_str().expect("utf-8 path")]);
    assert_eq!(output.status.code(), Some(1));
}

#[test]
fn writes_document_to_output_file() {
    let target = std::env::temp_dir().join(format!("tagquery-cli-{}.tex", std::process::id()));
    let output = tagquery(&["cat", "-o", target.to_str().expect("utf-8 path")]);
    assert_eq!(output.status.code(), Some(0));
    let document = std::fs::read_to_string(&target).expect("document file");
    std::fs::remove_file(&target).ok();
    assert!(document.ends_with("\\end{document}\n\n"));
    assert!(output.stdout.is_empty());
}

#[test]
fn missing_config_exits_with_two() {
    let missing = std::env::temp_dir().join("tagquery-cli-missing.toml");
    let output = tagquery(&["cat", "--config", missing.to_str().expect("utf-8 path")]);
    assert_eq!(output.status.code(), Some(2));
}
