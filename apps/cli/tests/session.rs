use std::error::Error;
use std::fs;
use std::path::Path;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::tempdir;

const SESSION_FILE: &str = "rustic-viewer_tabState_v1.json";

fn cli(workspace: &Path) -> Result<Command, Box<dyn Error>> {
    let mut cmd = Command::cargo_bin("rustic-viewer-cli")?;
    cmd.current_dir(workspace)
        .env_remove("RUSTIC_VIEWER_LOG")
        .args(["--workspace", workspace.to_str().unwrap()]);
    Ok(cmd)
}

fn write_images(dir: &Path, names: &[&str]) -> Result<(), Box<dyn Error>> {
    fs::create_dir_all(dir)?;
    for name in names {
        fs::write(dir.join(name), b"")?;
    }
    Ok(())
}

fn slash_path(path: &Path) -> String {
    path.to_str().unwrap().replace('\\', "/")
}

#[test]
fn list_prints_images_in_natural_order() -> Result<(), Box<dyn Error>> {
    let workspace = tempdir()?;
    let pictures = workspace.path().join("pics");
    write_images(&pictures, &["img10.png", "img2.PNG", "readme.md", "img1.jpg"])?;

    let output = cli(workspace.path())?
        .args(["list", pictures.to_str().unwrap()])
        .output()?;
    assert!(output.status.success());
    let stdout = String::from_utf8(output.stdout)?;
    let names: Vec<&str> = stdout
        .lines()
        .map(|line| line.rsplit('/').next().unwrap_or(line))
        .collect();
    assert_eq!(names, ["img1.jpg", "img2.PNG", "img10.png"]);
    Ok(())
}

#[test]
fn open_then_show_restores_tabs() -> Result<(), Box<dyn Error>> {
    let workspace = tempdir()?;
    let pictures = workspace.path().join("pics");
    write_images(&pictures, &["a.png", "b.png"])?;

    cli(workspace.path())?
        .args([
            "open",
            "--new-tab",
            pictures.join("a.png").to_str().unwrap(),
            pictures.join("b.png").to_str().unwrap(),
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("* b.png"));

    let session_path = workspace
        .path()
        .join(".rustic-viewer")
        .join("sessions")
        .join(SESSION_FILE);
    let stored = fs::read_to_string(&session_path)?;
    assert!(stored.contains("\"version\":2"));
    assert!(stored.contains(&format!("{}/a.png", slash_path(&pictures))));

    cli(workspace.path())?
        .args(["session", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("  a.png").and(predicate::str::contains("* b.png")));

    cli(workspace.path())?
        .args(["session", "clear"])
        .assert()
        .success();
    assert!(!session_path.exists());

    cli(workspace.path())?
        .args(["session", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No saved session"));
    Ok(())
}

#[test]
fn migrate_upgrades_legacy_session() -> Result<(), Box<dyn Error>> {
    let workspace = tempdir()?;
    let pictures = workspace.path().join("pics");
    write_images(&pictures, &["one.png", "two.png"])?;
    let sessions = workspace.path().join(".rustic-viewer").join("sessions");
    fs::create_dir_all(&sessions)?;
    let legacy = format!(
        r#"{{
            "version": 1,
            "tabOrder": ["t1"],
            "activeTabId": "t1",
            "comparisonTabs": {{}},
            "singleTabs": {{
                "t1": {{ "parentId": null, "directory": "{}", "currentIndex": 1, "zoom": 1, "panOffset": {{ "x": 0, "y": 0 }} }}
            }}
        }}"#,
        slash_path(&pictures)
    );
    fs::write(sessions.join(SESSION_FILE), legacy)?;

    cli(workspace.path())?
        .args(["session", "migrate"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Migrated session (1 tabs)"));

    let stored = fs::read_to_string(sessions.join(SESSION_FILE))?;
    assert!(stored.contains("\"version\":2"));
    assert!(stored.contains("two.png"));

    cli(workspace.path())?
        .args(["session", "migrate"])
        .assert()
        .success()
        .stdout(predicate::str::contains("already up to date"));
    Ok(())
}

#[test]
fn corrupt_preferences_are_reported() -> Result<(), Box<dyn Error>> {
    let workspace = tempdir()?;
    let state_dir = workspace.path().join(".rustic-viewer");
    fs::create_dir_all(&state_dir)?;
    fs::write(state_dir.join("preferences.json"), "{ nope")?;

    cli(workspace.path())?
        .arg("preferences")
        .assert()
        .failure()
        .stderr(predicate::str::contains("failed to load preferences"));
    Ok(())
}

#[test]
fn preferences_default_to_standard_session_key() -> Result<(), Box<dyn Error>> {
    let workspace = tempdir()?;
    cli(workspace.path())?
        .arg("preferences")
        .assert()
        .success()
        .stdout(predicate::str::contains("rustic-viewer:tabState:v1"));
    Ok(())
}
