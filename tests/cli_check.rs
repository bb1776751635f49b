//! Integration tests for the lnsync binary.
//!
//! These run the compiled CLI on temporary configuration files. Nothing here
//! touches the network.

use std::path::PathBuf;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

const CONFIG: &str = "\
links:
  - from: LICENSE
    to:
      - octocat/api:LICENSE
      - octocat/web:LICENSE
  - from: docs/ci.yml
    to: octocat/api:.github/workflows/ci.yml
";

/// Get a command for running lnsync with a clean environment.
fn lnsync() -> Command {
    let mut cmd = Command::cargo_bin("lnsync").unwrap();
    cmd.env_remove("GITHUB_ACTIONS")
        .env_remove("GITHUB_TOKEN")
        .env_remove("GITHUB_REPOSITORY")
        .env_remove("LNSYNC_CONFIG")
        .env_remove("LNSYNC_LOG_FORMAT")
        .env_remove("RUST_LOG");
    cmd
}

fn write_config(content: &str) -> (TempDir, PathBuf) {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("lnsync.yaml");
    std::fs::write(&path, content).unwrap();
    (dir, path)
}

mod check {
    use super::*;

    #[test]
    fn prints_groups_with_origin() {
        let (_dir, path) = write_config(CONFIG);

        lnsync()
            .args(["check", "--repo", "octocat/templates"])
            .arg(&path)
            .assert()
            .success()
            .stdout(predicate::str::contains(
                "octocat/api:\n  octocat/templates:LICENSE -> octocat/api:LICENSE\n  octocat/templates:docs/ci.yml -> octocat/api:.github/workflows/ci.yml\n",
            ))
            .stdout(predicate::str::contains(
                "octocat/web:\n  octocat/templates:LICENSE -> octocat/web:LICENSE",
            ));
    }

    #[test]
    fn json_output() {
        let (_dir, path) = write_config(CONFIG);

        let output = lnsync()
            .args(["check", "--json", "--repo", "octocat/templates"])
            .arg(&path)
            .output()
            .unwrap();
        assert!(output.status.success());

        let groups: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
        let api = &groups["octocat/api"];
        assert_eq!(api["repo"]["owner"], "octocat");
        assert_eq!(api["repo"]["name"], "api");
        assert_eq!(api["links"].as_array().unwrap().len(), 2);
        assert_eq!(api["links"][0]["from"]["repo"]["name"], "templates");
        assert_eq!(api["links"][0]["to"]["path"], "LICENSE");
        assert_eq!(groups["octocat/web"]["links"].as_array().unwrap().len(), 1);
    }

    #[test]
    fn self_links_are_dropped() {
        let (_dir, path) = write_config("links:\n  - from: README.md\n");

        lnsync()
            .args(["check", "--repo", "octocat/templates"])
            .arg(&path)
            .assert()
            .success()
            .stdout(predicate::str::contains("No links."));
    }

    #[test]
    fn quiet_prints_nothing() {
        let (_dir, path) = write_config(CONFIG);

        lnsync()
            .args(["--quiet", "check"])
            .arg(&path)
            .assert()
            .success()
            .stdout(predicate::str::is_empty());
    }

    #[test]
    fn unknown_field_is_rejected() {
        let (_dir, path) = write_config("links: []\nextra: true\n");

        lnsync()
            .arg("check")
            .arg(&path)
            .assert()
            .failure()
            .stderr(predicate::str::contains("invalid configuration"))
            .stderr(predicate::str::contains("unknown field"));
    }

    #[test]
    fn invalid_reference_names_the_entry() {
        let (_dir, path) = write_config("links:\n  - from: 42\n    to: a.md\n");

        lnsync()
            .arg("check")
            .arg(&path)
            .assert()
            .failure()
            .stderr(predicate::str::contains("link #0"))
            .stderr(predicate::str::contains("invalid reference type"));
    }

    #[test]
    fn missing_file() {
        let dir = TempDir::new().unwrap();

        lnsync()
            .arg("check")
            .arg(dir.path().join("absent.yaml"))
            .assert()
            .failure()
            .stderr(predicate::str::contains("failed to read config file"));
    }
}

mod sync {
    use super::*;

    #[test]
    fn requires_token_and_repository() {
        lnsync()
            .arg("sync")
            .assert()
            .failure()
            .stderr(predicate::str::contains("--token"))
            .stderr(predicate::str::contains("--repo"));
    }

    #[test]
    fn rejects_invalid_head_branch() {
        lnsync()
            .args(["sync", "--token", "t", "--repo", "o/r", "--head-branch", "a..b"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("--head-branch"));
    }
}

mod misc {
    use super::*;

    #[test]
    fn version_flag_works() {
        lnsync()
            .arg("--version")
            .assert()
            .success()
            .stdout(predicate::str::contains("lnsync"));
    }

    #[test]
    fn completion_for_bash() {
        lnsync()
            .args(["completion", "bash"])
            .assert()
            .success()
            .stdout(predicate::str::contains("lnsync"));
    }
}
