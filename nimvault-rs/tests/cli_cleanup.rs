//! Integration tests for `nimvault cleanup`.

use std::fs;
use std::path::Path;
use std::process::Command;
use tempfile::TempDir;

/// Run the nimvault binary and return (stdout, stderr, exit code).
fn run_nimvault(home: &Path, args: &[&str]) -> (String, String, i32) {
    let binary = env!("CARGO_BIN_EXE_nimvault");

    let output = Command::new(binary)
        .args(args)
        .env("XDG_CONFIG_HOME", home)
        .env_remove("RUST_LOG")
        .output()
        .expect("Failed to execute nimvault");

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    let code = output.status.code().unwrap_or(-1);

    (stdout, stderr, code)
}

fn vault() -> TempDir {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("dirty.md"), "<p>Hello <b>world</b></p>").unwrap();
    fs::write(dir.path().join("clean.md"), "Already clean\n").unwrap();
    fs::create_dir_all(dir.path().join("nested")).unwrap();
    fs::write(
        dir.path().join("nested").join("table.md"),
        "---\ntitle: T\n---\n<table><tr><td>a</td><td>b</td></tr></table>",
    )
    .unwrap();
    dir
}

mod cleanup_command {
    use super::*;

    #[test]
    fn cleans_in_place() {
        let home = TempDir::new().unwrap();
        let vault = vault();
        let root = vault.path().to_str().unwrap();

        let (stdout, _, code) = run_nimvault(home.path(), &["cleanup", root]);
        assert_eq!(code, 0);
        assert!(stdout.contains("Found 3 markdown files"));
        assert!(stdout.contains("Cleanup complete!"));
        assert!(stdout.contains("Modified: 2 files"));
        assert!(stdout.contains("Unchanged: 1 files"));
        assert!(stdout.contains("Errors: 0 files"));

        assert_eq!(
            fs::read_to_string(vault.path().join("dirty.md")).unwrap(),
            "Hello **world**\n"
        );
        assert_eq!(
            fs::read_to_string(vault.path().join("nested").join("table.md")).unwrap(),
            "---\ntitle: T\n---\n| a | b |\n"
        );
    }

    #[test]
    fn second_run_changes_nothing() {
        let home = TempDir::new().unwrap();
        let vault = vault();
        let root = vault.path().to_str().unwrap();

        run_nimvault(home.path(), &["cleanup", root]);
        let (stdout, _, code) = run_nimvault(home.path(), &["cleanup", root]);
        assert_eq!(code, 0);
        assert!(stdout.contains("Modified: 0 files"));
        assert!(stdout.contains("Unchanged: 3 files"));
    }

    #[test]
    fn dry_run_writes_nothing() {
        let home = TempDir::new().unwrap();
        let vault = vault();
        let root = vault.path().to_str().unwrap();

        let (stdout, _, code) = run_nimvault(home.path(), &["cleanup", root, "--dry-run"]);
        assert_eq!(code, 0);
        assert!(stdout.contains("Would modify: 2 files"));
        assert_eq!(
            fs::read_to_string(vault.path().join("dirty.md")).unwrap(),
            "<p>Hello <b>world</b></p>"
        );
    }

    #[test]
    fn json_summary() {
        let home = TempDir::new().unwrap();
        let vault = vault();
        let root = vault.path().to_str().unwrap();

        let (stdout, _, code) =
            run_nimvault(home.path(), &["cleanup", root, "--json", "--workers", "2"]);
        assert_eq!(code, 0);

        let summary: serde_json::Value = serde_json::from_str(&stdout).unwrap();
        assert_eq!(summary["total"], 3);
        assert_eq!(summary["modified"], 2);
        assert_eq!(summary["errors"], 0);
        assert_eq!(summary["dry_run"], false);
    }

    #[test]
    fn unreadable_file_is_reported_not_fatal() {
        let home = TempDir::new().unwrap();
        let vault = vault();
        fs::write(vault.path().join("binary.md"), [0xff, 0xfe, 0x00]).unwrap();
        let root = vault.path().to_str().unwrap();

        let (stdout, _, code) = run_nimvault(home.path(), &["cleanup", root]);
        assert_eq!(code, 0);
        assert!(stdout.contains("ERROR:"));
        assert!(stdout.contains("Errors: 1 files"));
        assert!(stdout.contains("Modified: 2 files"));
    }
}

mod exit_codes {
    use super::*;

    #[test]
    fn missing_root_exits_1() {
        let home = TempDir::new().unwrap();
        let missing = home.path().join("no-such-vault");

        let (_, stderr, code) = run_nimvault(home.path(), &["cleanup", missing.to_str().unwrap()]);
        assert_eq!(code, 1);
        assert!(stderr.contains("Path not found"));
    }

    #[test]
    fn bad_arguments_exit_1() {
        let home = TempDir::new().unwrap();
        let (_, _, code) = run_nimvault(home.path(), &["cleanup"]);
        assert_eq!(code, 1);

        let (_, _, code) = run_nimvault(home.path(), &["frobnicate"]);
        assert_eq!(code, 1);

        let (_, _, code) = run_nimvault(home.path(), &["cleanup", ".", "--workers", "0"]);
        assert_eq!(code, 1);
    }

    #[test]
    fn help_and_version_exit_0() {
        let home = TempDir::new().unwrap();
        let (stdout, _, code) = run_nimvault(home.path(), &["--help"]);
        assert_eq!(code, 0);
        assert!(stdout.contains("cleanup"));
        assert!(stdout.contains("convert"));

        let (stdout, _, code) = run_nimvault(home.path(), &["--version"]);
        assert_eq!(code, 0);
        assert!(stdout.contains("nimvault"));
    }

    #[test]
    fn missing_config_file_exits_1() {
        let home = TempDir::new().unwrap();
        let vault = vault();
        let missing = home.path().join("nope.toml");

        let (_, stderr, code) = run_nimvault(
            home.path(),
            &[
                "--config",
                missing.to_str().unwrap(),
                "cleanup",
                vault.path().to_str().unwrap(),
            ],
        );
        assert_eq!(code, 1);
        assert!(stderr.contains("config file not found"));
    }
}
