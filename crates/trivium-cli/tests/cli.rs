//! Integration tests for the trivium binary

use std::path::Path;
use std::process::{Command, Output};
use tempfile::TempDir;

const SQUARE: &str = "sq := x -> x * x; sq(5)";

fn trivium(dir: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_trivium"))
        .args(args)
        .arg("--color")
        .arg("never")
        .current_dir(dir)
        .env_remove("RUST_LOG")
        .output()
        .expect("failed to start trivium")
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}

fn workspace(source: &str) -> TempDir {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("prog.triv"), source).unwrap();
    dir
}

#[test]
fn test_eval_prints_result() {
    let dir = workspace("a := 3; b := 4; a + b");
    let out = trivium(dir.path(), &["eval", "prog.triv"]);
    assert!(out.status.success(), "stderr: {}", stderr(&out));
    assert_eq!(stdout(&out).trim(), "7");
}

#[test]
fn test_eval_on_each_machine() {
    let dir = workspace(SQUARE);
    for vm in ["closure", "vector"] {
        let out = trivium(dir.path(), &["eval", "prog.triv", "--vm", vm]);
        assert!(out.status.success(), "{}: {}", vm, stderr(&out));
        assert_eq!(stdout(&out).trim(), "25", "{}", vm);
    }
}

#[test]
fn test_eval_step_limit() {
    let dir = workspace("while 1 do 0");
    let out = trivium(dir.path(), &["eval", "prog.triv", "--max-steps", "100"]);
    assert_eq!(out.status.code(), Some(1));
    assert!(stderr(&out).contains("step limit of 100 exceeded"));
}

#[test]
fn test_ir_prints_instructions() {
    let dir = workspace(SQUARE);
    let out = trivium(dir.path(), &["ir", "prog.triv", "--vm", "closure"]);
    assert!(out.status.success(), "stderr: {}", stderr(&out));
    let text = stdout(&out);
    assert!(text.contains("mkfunval fun_0"));
    assert!(text.contains("fun_0:"));
}

#[test]
fn test_parse_json() {
    let dir = workspace("1 + x");
    let out = trivium(dir.path(), &["parse", "prog.triv", "--json"]);
    assert!(out.status.success(), "stderr: {}", stderr(&out));
    let json: serde_json::Value = serde_json::from_str(&stdout(&out)).unwrap();
    assert_eq!(json["kind"], "binary");
    assert_eq!(json["rhs"]["name"], "x");
}

#[test]
fn test_parse_error_has_location() {
    let dir = workspace("x := 1;\ny := )");
    let out = trivium(dir.path(), &["parse", "prog.triv"]);
    assert_eq!(out.status.code(), Some(1));
    let err = stderr(&out);
    assert!(err.starts_with("error: cannot parse prog.triv"), "{}", err);
    assert!(err.contains("2:6: expected expression"), "{}", err);
}

#[test]
fn test_undefined_variable_fails() {
    let dir = workspace("z + 1");
    let out = trivium(dir.path(), &["eval", "prog.triv", "--vm", "vector"]);
    assert_eq!(out.status.code(), Some(1));
    assert!(stderr(&out).contains("Undefined variable: z"));
}

#[test]
fn test_missing_file() {
    let dir = TempDir::new().unwrap();
    let out = trivium(dir.path(), &["eval", "nope.triv"]);
    assert_eq!(out.status.code(), Some(1));
    assert!(stderr(&out).contains("cannot read nope.triv"));
}

#[test]
fn test_compile_to_stdout() {
    let dir = workspace(SQUARE);
    let out = trivium(
        dir.path(),
        &["compile", "prog.triv", "-o", "-", "--emit", "asm", "--vm", "vector"],
    );
    assert!(out.status.success(), "stderr: {}", stderr(&out));
    let text = stdout(&out);
    assert!(text.contains("global main"));
    assert!(text.contains("extern malloc"));
}

#[test]
fn test_stdout_needs_text_stage() {
    let dir = workspace(SQUARE);
    let out = trivium(dir.path(), &["compile", "prog.triv", "-o", "-"]);
    assert_eq!(out.status.code(), Some(1));
    assert!(stderr(&out).contains("cannot be written to stdout"));
}

#[test]
fn test_compile_writes_default_output() {
    let dir = workspace("1 + 2");
    let out = trivium(dir.path(), &["compile", "prog.triv", "--emit", "ir"]);
    assert!(out.status.success(), "stderr: {}", stderr(&out));
    let text = std::fs::read_to_string(dir.path().join("prog.ir")).unwrap();
    assert!(text.starts_with("; stack machine"));
    assert!(text.contains("main:"));
}

#[test]
fn test_stage_inferred_from_output_name() {
    let dir = workspace("1 + 2");
    let out = trivium(dir.path(), &["compile", "prog.triv", "-o", "out.s"]);
    assert!(out.status.success(), "stderr: {}", stderr(&out));
    let text = std::fs::read_to_string(dir.path().join("out.s")).unwrap();
    assert!(text.contains("SECTION .text"));
}

#[test]
fn test_config_selects_machine() {
    let dir = workspace("a := 2; a");
    std::fs::write(
        dir.path().join("trivium.toml"),
        "[compiler]\nmachine = \"vector\"\n",
    )
    .unwrap();
    let out = trivium(dir.path(), &["ir", "prog.triv"]);
    assert!(out.status.success(), "stderr: {}", stderr(&out));
    assert!(stdout(&out).contains("setgp"));

    let out = trivium(dir.path(), &["ir", "prog.triv", "--vm", "stack"]);
    assert!(!stdout(&out).contains("setgp"));
}

#[test]
fn test_bad_config_is_reported() {
    let dir = workspace("1");
    std::fs::write(dir.path().join("trivium.toml"), "[compiler]\nspeed = 3\n").unwrap();
    let out = trivium(dir.path(), &["eval", "prog.triv"]);
    assert_eq!(out.status.code(), Some(1));
    assert!(stderr(&out).contains("trivium.toml"));
}

#[test]
fn test_failing_assembler_stops_build() {
    let dir = workspace("1 + 2");
    std::fs::write(
        dir.path().join("build.toml"),
        "[toolchain]\nassembler = \"false\"\n",
    )
    .unwrap();
    let out = trivium(
        dir.path(),
        &["compile", "prog.triv", "--config", "build.toml", "-o", "prog"],
    );
    assert_eq!(out.status.code(), Some(1));
    assert!(stderr(&out).contains("false failed"), "{}", stderr(&out));
    assert!(!dir.path().join("prog").exists());
    assert!(!dir.path().join("prog.s").exists());
}

#[test]
fn test_keep_intermediates_flag() {
    let dir = workspace("1 + 2");
    std::fs::write(
        dir.path().join("build.toml"),
        "[toolchain]\nassembler = \"false\"\n",
    )
    .unwrap();
    let out = trivium(
        dir.path(),
        &[
            "compile",
            "prog.triv",
            "--config",
            "build.toml",
            "--keep-intermediates",
            "--emit",
            "obj",
        ],
    );
    assert_eq!(out.status.code(), Some(1));
    assert!(dir.path().join("prog.s").exists());
}
