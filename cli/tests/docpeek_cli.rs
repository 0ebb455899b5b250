use std::fs;
use std::path::Path;
use std::path::PathBuf;

use anyhow::Result;
use predicates::prelude::PredicateBooleanExt;
use predicates::str::contains;
use pretty_assertions::assert_eq;
use tempfile::TempDir;

const ANN_ID: &str = "507f1f77bcf86cd799439011";

fn docpeek_command(docpeek_home: &Path) -> Result<assert_cmd::Command> {
    let mut cmd = assert_cmd::Command::cargo_bin("docpeek")?;
    cmd.env("DOCPEEK_HOME", docpeek_home);
    cmd.env_remove("VISUAL");
    cmd.env_remove("EDITOR");
    Ok(cmd)
}

fn write_people(dir: &Path) -> Result<PathBuf> {
    let path = dir.join("people.jsonl");
    fs::write(
        &path,
        format!(
            "{{\"_id\":{{\"$oid\":\"{ANN_ID}\"}},\"name\":\"Ann\",\"age\":31}}\n\
             {{\"_id\":2,\"name\":\"bob\",\"age\":25}}\n\
             {{\"_id\":3,\"name\":\"Cy\",\"age\":40}}\n"
        ),
    )?;
    Ok(path)
}

#[test]
fn compile_prints_indented_extended_json() -> Result<()> {
    let home = TempDir::new()?;
    let output = docpeek_command(home.path())?
        .args(["compile", r#"{_id: ObjectId("507f1f77bcf86cd799439011"), name: /^jo/i}"#])
        .output()?;
    assert!(output.status.success());
    let stdout = String::from_utf8(output.stdout)?;
    assert_eq!(
        stdout,
        "{\n  \"_id\": {\n    \"$oid\": \"507f1f77bcf86cd799439011\"\n  },\n  \"name\": {\n    \"$regex\": \"^jo\",\n    \"$options\": \"i\"\n  }\n}\n"
    );
    Ok(())
}

#[test]
fn compile_errors_exit_non_zero() -> Result<()> {
    let home = TempDir::new()?;
    docpeek_command(home.path())?
        .args(["compile", r#"{at: ISODate("yesterday")}"#])
        .assert()
        .failure()
        .stderr(contains("invalid date").and(contains("yesterday")));
    Ok(())
}

#[test]
fn history_records_and_clears_queries() -> Result<()> {
    let home = TempDir::new()?;
    for text in ["{a: 1}", "{b: 2}", "{a: 1}", "{}"] {
        docpeek_command(home.path())?
            .args(["compile", text])
            .assert()
            .success();
    }
    let output = docpeek_command(home.path())?.arg("history").output()?;
    assert_eq!(String::from_utf8(output.stdout)?, "{b: 2}\n{a: 1}\n");

    docpeek_command(home.path())?
        .args(["history", "--clear"])
        .assert()
        .success()
        .stdout(contains("History cleared"));
    let output = docpeek_command(home.path())?.arg("history").output()?;
    assert_eq!(String::from_utf8(output.stdout)?, "");
    Ok(())
}

#[test]
fn history_respects_configured_cap() -> Result<()> {
    let home = TempDir::new()?;
    fs::write(home.path().join("config.toml"), "[history]\nmax_entries = 2\n")?;
    for text in ["{n: 1}", "{n: 2}", "{n: 3}"] {
        docpeek_command(home.path())?
            .args(["compile", text])
            .assert()
            .success();
    }
    let output = docpeek_command(home.path())?.arg("history").output()?;
    assert_eq!(String::from_utf8(output.stdout)?, "{n: 2}\n{n: 3}\n");
    Ok(())
}

#[test]
fn render_wraps_long_values() -> Result<()> {
    let home = TempDir::new()?;
    let file = home.path().join("doc.json");
    fs::write(&file, r#"{note: "one two three four five six", n: 1}"#)?;
    let output = docpeek_command(home.path())?
        .args(["render", file.to_str().unwrap_or_default(), "--width", "20"])
        .output()?;
    assert!(output.status.success());
    let stdout = String::from_utf8(output.stdout)?;
    let rows: Vec<&str> = stdout.lines().collect();
    assert_eq!(rows.first(), Some(&"{"));
    assert_eq!(rows.last(), Some(&"}"));
    assert!(rows.iter().all(|row| row.chars().count() <= 20), "{rows:?}");
    assert!(rows.len() > 4, "{rows:?}");
    Ok(())
}

#[test]
fn copy_prints_the_selected_block() -> Result<()> {
    let home = TempDir::new()?;
    let file = home.path().join("doc.json");
    fs::write(&file, r#"{object: {nested: "x", n: 1}, after: true}"#)?;
    let path = file.to_str().unwrap_or_default();

    docpeek_command(home.path())?
        .args(["copy", path, "--line", "2", "--mode", "value", "--stdout"])
        .assert()
        .success()
        .stdout("{ \"nested\": \"x\", \"n\": 1 }\n");

    docpeek_command(home.path())?
        .args(["copy", path, "--line", "6", "--stdout"])
        .assert()
        .success()
        .stdout("\"after\": true\n");
    Ok(())
}

#[test]
fn find_filters_sorts_and_projects() -> Result<()> {
    let home = TempDir::new()?;
    let store = write_people(home.path())?;
    let output = docpeek_command(home.path())?
        .args([
            "find",
            store.to_str().unwrap_or_default(),
            "--filter",
            "{name: /^[a-c]/i}",
            "--sort",
            "{age: -1}",
            "--projection",
            "{name: 1, _id: 0}",
        ])
        .output()?;
    assert!(output.status.success());
    assert_eq!(
        String::from_utf8(output.stdout)?,
        "{\"name\":\"Cy\"}\n{\"name\":\"Ann\"}\n{\"name\":\"bob\"}\n"
    );
    assert!(String::from_utf8(output.stderr)?.contains("3 of 3 documents"));
    Ok(())
}

#[test]
fn delete_removes_the_document() -> Result<()> {
    let home = TempDir::new()?;
    let store = write_people(home.path())?;
    let path = store.to_str().unwrap_or_default();
    docpeek_command(home.path())?
        .args(["delete", path, "2"])
        .assert()
        .success()
        .stdout(contains("Deleted document 2"));
    let contents = fs::read_to_string(&store)?;
    assert_eq!(contents.lines().count(), 2);
    assert!(!contents.contains("bob"));

    docpeek_command(home.path())?
        .args(["delete", path, "2"])
        .assert()
        .failure()
        .stderr(contains("no document with _id 2"));
    Ok(())
}

#[cfg(unix)]
#[test]
fn edit_round_trip_through_the_editor() -> Result<()> {
    let home = TempDir::new()?;
    let store = write_people(home.path())?;
    let path = store.to_str().unwrap_or_default();

    docpeek_command(home.path())?
        .args(["--editor", "true", "edit", path, ANN_ID])
        .assert()
        .success()
        .stdout(contains("unchanged"));

    docpeek_command(home.path())?
        .args([
            "--editor",
            r#"sh -c 'printf "{name: \"Ann\", age: 32}" > "$0"'"#,
            "edit",
            path,
            ANN_ID,
        ])
        .assert()
        .success()
        .stdout(contains("Updated document"));
    let contents = fs::read_to_string(&store)?;
    assert!(contents.starts_with(&format!(
        "{{\"_id\":{{\"$oid\":\"{ANN_ID}\"}},\"name\":\"Ann\",\"age\":32}}\n"
    )));

    docpeek_command(home.path())?
        .args([
            "--editor",
            r#"sh -c 'printf "{_id: 9}" > "$0"'"#,
            "edit",
            path,
            "2",
        ])
        .assert()
        .failure()
        .stderr(contains("_id cannot be changed"));
    Ok(())
}

#[cfg(unix)]
#[test]
fn insert_and_duplicate_add_documents() -> Result<()> {
    let home = TempDir::new()?;
    let store = write_people(home.path())?;
    let path = store.to_str().unwrap_or_default();

    docpeek_command(home.path())?
        .args(["--editor", "true", "insert", path])
        .assert()
        .success()
        .stdout(contains("Nothing to insert"));

    docpeek_command(home.path())?
        .args([
            "--editor",
            r#"sh -c 'printf "{_id: 10, name: \"Dee\"}" > "$0"'"#,
            "insert",
            path,
        ])
        .assert()
        .success()
        .stdout(contains("Inserted document 10"));

    docpeek_command(home.path())?
        .args(["--editor", "true", "duplicate", path, "3"])
        .assert()
        .success()
        .stdout(contains("Inserted document ObjectId("));

    let contents = fs::read_to_string(&store)?;
    assert_eq!(contents.lines().count(), 5);
    assert_eq!(contents.matches("\"Cy\"").count(), 2);
    Ok(())
}
