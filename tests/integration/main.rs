//! Integration tests for buildstash

mod cli_tests {
    use assert_cmd::{cargo::cargo_bin_cmd, Command};
    use predicates::prelude::*;
    use std::path::Path;
    use tempfile::TempDir;

    /// Command isolated from the host's CI variables, state and store
    fn buildstash(work: &Path) -> Command {
        let mut cmd = cargo_bin_cmd!("buildstash");
        cmd.current_dir(work)
            .env_remove("GITHUB_ACTIONS")
            .env_remove("GITHUB_OUTPUT")
            .env_remove("BUILDSTASH_CONFIG")
            .env("BUILDSTASH_STATE_FILE", work.join("state.json"))
            .env("BUILDSTASH_STORE_DIR", work.join("store"));
        cmd
    }

    #[test]
    fn help_displays() {
        let work = TempDir::new().unwrap();
        buildstash(work.path())
            .arg("--help")
            .assert()
            .success()
            .stdout(predicate::str::contains("Go build cache keys"));
    }

    #[test]
    fn version_displays() {
        let work = TempDir::new().unwrap();
        buildstash(work.path())
            .arg("--version")
            .assert()
            .success()
            .stdout(predicate::str::contains("buildstash"));
    }

    #[test]
    fn save_without_restore_is_a_noop() {
        let work = TempDir::new().unwrap();
        buildstash(work.path())
            .arg("save")
            .assert()
            .success()
            .stdout(predicate::str::contains("No restore recorded"));
    }

    #[test]
    fn save_with_disabled_provider_is_silent() {
        let work = TempDir::new().unwrap();
        std::fs::write(work.path().join("state.json"), "garbage").unwrap();
        buildstash(work.path())
            .args(["save", "--cache-provider", "none"])
            .assert()
            .success();
    }

    #[test]
    fn save_with_corrupt_state_fails() {
        let work = TempDir::new().unwrap();
        std::fs::write(
            work.path().join("state.json"),
            r#"{"buildstash-config": "{\"key\": 1}"}"#,
        )
        .unwrap();
        buildstash(work.path())
            .arg("save")
            .assert()
            .failure()
            .stderr(predicate::str::contains("corrupt"));
    }

    #[test]
    fn failed_job_ignores_corrupt_state() {
        let work = TempDir::new().unwrap();
        std::fs::write(
            work.path().join("state.json"),
            r#"{"buildstash-config": "{\"key\": 1}"}"#,
        )
        .unwrap();
        buildstash(work.path())
            .args(["save", "--job-status", "failure"])
            .assert()
            .success()
            .stdout(predicate::str::contains("not saving"));
        assert!(!work.path().join("state.json").exists());
    }

    #[test]
    fn restore_without_toolchain_does_not_fail_job() {
        let work = TempDir::new().unwrap();
        buildstash(work.path())
            .args(["restore", "--go", "/nonexistent/buildstash/go"])
            .assert()
            .success()
            .stderr(predicate::str::contains("Go toolchain not available"));
        assert!(!work.path().join("state.json").exists());
    }

    #[test]
    fn key_without_toolchain_fails() {
        let work = TempDir::new().unwrap();
        buildstash(work.path())
            .args(["key", "--go", "/nonexistent/buildstash/go"])
            .assert()
            .failure();
    }

    #[cfg(unix)]
    fn fake_go(work: &Path) -> std::path::PathBuf {
        use std::os::unix::fs::PermissionsExt;

        let root = work.display();
        let script = format!(
            "#!/bin/sh\ncat <<'EOF'\n{{\"GOARCH\": \"amd64\", \"GOCACHE\": \"{root}/go-build\", \
             \"GOMODCACHE\": \"{root}/gopath/pkg/mod\", \"GOPATH\": \"{root}/gopath\", \
             \"GOOS\": \"linux\", \"GOVERSION\": \"go1.21.0\"}}\nEOF\n"
        );
        let path = work.join("go");
        std::fs::write(&path, script).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    #[cfg(unix)]
    #[test]
    fn restore_save_roundtrip() {
        let work = TempDir::new().unwrap();
        let go = fake_go(work.path());
        std::fs::write(work.path().join("go.mod"), "module x\n").unwrap();
        std::fs::create_dir_all(work.path().join("go-build").join("ab")).unwrap();
        std::fs::write(work.path().join("go-build").join("ab").join("obj"), "o").unwrap();

        let go = go.to_str().unwrap();

        buildstash(work.path())
            .args(["key", "--go", go])
            .assert()
            .success()
            .stdout(predicate::str::contains("key=v0-go-"));

        buildstash(work.path())
            .args(["restore", "--go", go])
            .assert()
            .success()
            .stdout(predicate::str::contains("No cache found"));

        buildstash(work.path())
            .arg("save")
            .assert()
            .success()
            .stdout(predicate::str::contains("Saved cache under v0-go-"));

        buildstash(work.path())
            .args(["restore", "--go", go])
            .assert()
            .success()
            .stdout(predicate::str::contains("Restored from cache key"));

        buildstash(work.path())
            .arg("save")
            .assert()
            .success()
            .stdout(predicate::str::contains("Cache up-to-date"));
    }

    #[cfg(unix)]
    #[test]
    fn save_after_failed_restore_does_not_reuse_earlier_key() {
        let work = TempDir::new().unwrap();
        let go = fake_go(work.path());
        let go = go.to_str().unwrap();
        std::fs::create_dir_all(work.path().join("go-build")).unwrap();
        std::fs::write(work.path().join("go.mod"), "module a\n").unwrap();

        buildstash(work.path())
            .args(["restore", "--go", go])
            .assert()
            .success();
        buildstash(work.path())
            .arg("save")
            .assert()
            .success()
            .stdout(predicate::str::contains("Saved cache under v0-go-"));
        assert!(!work.path().join("state.json").exists());

        // Next job: manifest changed and the toolchain is gone
        std::fs::write(work.path().join("go.mod"), "module b\n").unwrap();
        buildstash(work.path())
            .args(["restore", "--go", "/nonexistent/buildstash/go"])
            .assert()
            .success();
        buildstash(work.path())
            .arg("save")
            .assert()
            .success()
            .stdout(predicate::str::contains("No restore recorded"))
            .stdout(predicate::str::contains("Saved cache").not());
    }

    #[cfg(unix)]
    #[test]
    fn restore_discards_state_left_by_earlier_job() {
        let work = TempDir::new().unwrap();
        let go = fake_go(work.path());
        let go = go.to_str().unwrap();
        std::fs::write(work.path().join("go.mod"), "module a\n").unwrap();

        // Restore without a matching save leaves state behind
        buildstash(work.path())
            .args(["restore", "--go", go])
            .assert()
            .success();
        assert!(work.path().join("state.json").exists());

        buildstash(work.path())
            .args(["restore", "--go", "/nonexistent/buildstash/go"])
            .assert()
            .success();
        assert!(!work.path().join("state.json").exists());
    }
}
