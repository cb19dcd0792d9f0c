use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use std::fs;

#[test]
fn test_render_from_stdin() {
    let mut cmd = cargo_bin_cmd!("mdpage");
    cmd.arg("render").write_stdin("# Hi\n\n- a\n- b\n");

    cmd.assert()
        .success()
        .stdout("<h1>Hi</h1>\n<ul>\n<li>a</li>\n<li>b</li>\n</ul>\n");
}

#[test]
fn test_render_document_with_title() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("page.md");
    fs::write(&input, "*hello*").unwrap();

    let mut cmd = cargo_bin_cmd!("mdpage");
    cmd.current_dir(dir.path())
        .arg("render")
        .arg(&input)
        .arg("--document")
        .arg("--title")
        .arg("Greeting");

    cmd.assert()
        .success()
        .stdout(predicate::str::starts_with("<!DOCTYPE html>"))
        .stdout(predicate::str::contains("<title>Greeting</title>"))
        .stdout(predicate::str::contains("<p><em>hello</em></p>"));
}

#[test]
fn test_render_ast_json() {
    let mut cmd = cargo_bin_cmd!("mdpage");
    cmd.arg("render").arg("--ast").write_stdin("## Two");

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("\"Heading\""))
        .stdout(predicate::str::contains("\"level\": 2"));
}

#[test]
fn test_render_missing_file_fails() {
    let dir = tempfile::tempdir().unwrap();

    let mut cmd = cargo_bin_cmd!("mdpage");
    cmd.current_dir(dir.path()).arg("render").arg("absent.md");

    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("file not found"));
}

#[test]
fn test_convert_save_and_move() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("notes.md"), "# Notes\n").unwrap();

    let mut cmd = cargo_bin_cmd!("mdpage");
    cmd.current_dir(dir.path())
        .arg("convert")
        .arg("notes.md")
        .arg("--save")
        .arg("--out-dir")
        .arg("site");

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("HTML file saved"));

    let saved = dir.path().join("site").join("notes.html");
    assert!(fs::read_to_string(&saved).unwrap().contains("<h1>Notes</h1>"));
    assert!(dir.path().join("temp_preview.html").exists());

    let mut cmd = cargo_bin_cmd!("mdpage");
    cmd.current_dir(dir.path())
        .arg("convert")
        .arg("notes.md")
        .arg("--out-dir")
        .arg("site")
        .arg("--to")
        .arg("final.html");

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("File saved as: final.html"));
    assert!(dir.path().join("final.html").exists());
    assert!(!saved.exists());
}

#[test]
fn test_convert_refuses_to_overwrite() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("notes.md"), "text").unwrap();
    fs::write(dir.path().join("taken.html"), "keep").unwrap();

    let mut cmd = cargo_bin_cmd!("mdpage");
    cmd.current_dir(dir.path())
        .arg("convert")
        .arg("notes.md")
        .arg("--to")
        .arg("taken.html");

    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("already exists"));
    assert_eq!(fs::read_to_string(dir.path().join("taken.html")).unwrap(), "keep");
}

#[test]
fn test_local_config_file_is_used() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("mdpage.toml"), "[page]\ntitle = \"From config\"\n").unwrap();

    let mut cmd = cargo_bin_cmd!("mdpage");
    cmd.current_dir(dir.path())
        .arg("render")
        .arg("--document")
        .write_stdin("text");

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("<title>From config</title>"));
}
