#![warn(clippy::pedantic)]

//! Integration tests for the php-latest CLI.
//!
//! These tests spawn the compiled binary with an isolated home directory and
//! validate its behavior through stdout, stderr, exit codes and the files it
//! leaves behind.
//!
//! ## Test Strategy
//!
//! 1. **Metadata**: help and version output
//! 2. **Local commands**: `list` and `status` on empty and populated homes
//! 3. **Sync**: unreachable feed, rejected plain-HTTP feed, invalid configuration
//!
//! No test reaches the network. Feeds point at a closed local port.
//!
//! ## Test Infrastructure
//!
//! - Uses `assert_cmd` for spawning and asserting on command execution
//! - Uses `assert_fs` for temporary home directories
//! - Uses `predicates` for flexible output matching

use assert_cmd::prelude::*;
use assert_fs::prelude::*;
use predicates::prelude::*;
use std::process::Command;

/// Feed address that refuses connections.
const CLOSED_FEED: &str = "http://127.0.0.1:9";

/// Builds a command with `home` as its home directory and no ambient overrides.
fn php_latest(home: &assert_fs::TempDir) -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("php-latest"));
    cmd.env("PHP_LATEST_HOME", home.path())
        .env_remove("PHP_LATEST_FEED")
        .env_remove("GITHUB_PAT")
        .env_remove("RUST_LOG");
    cmd
}

// =============================================================================
// Metadata
// =============================================================================

#[test]
fn help_lists_subcommands() {
    let temp = assert_fs::TempDir::new().expect("Should create temp dir");
    php_latest(&temp)
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("sync"))
        .stdout(predicate::str::contains("status"))
        .stdout(predicate::str::contains("list"))
        .stdout(predicate::str::contains("PHP_LATEST_HOME"));
}

#[test]
fn version_flag_prints_package_version() {
    let temp = assert_fs::TempDir::new().expect("Should create temp dir");
    php_latest(&temp)
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn version_command_detailed_shows_platform() {
    let temp = assert_fs::TempDir::new().expect("Should create temp dir");
    php_latest(&temp)
        .args(["version", "--detailed"])
        .assert()
        .success()
        .stdout(predicate::str::contains("php-latest"))
        .stdout(predicate::str::contains("Platform:"));
}

#[test]
fn unknown_subcommand_fails() {
    let temp = assert_fs::TempDir::new().expect("Should create temp dir");
    php_latest(&temp)
        .arg("frobnicate")
        .assert()
        .failure()
        .stderr(predicate::str::contains("frobnicate"));
}

// =============================================================================
// List and Status
// =============================================================================

#[test]
fn list_on_empty_home_suggests_sync() {
    let temp = assert_fs::TempDir::new().expect("Should create temp dir");
    php_latest(&temp)
        .arg("list")
        .assert()
        .success()
        .stdout(predicate::str::contains("No toolchains registered."))
        .stdout(predicate::str::contains("php-latest sync"));
}

#[test]
fn list_marks_managed_toolchain() {
    let temp = assert_fs::TempDir::new().expect("Should create temp dir");
    let launcher = temp.child("cache/php-7.1.9/php.sh");
    launcher.write_str("#!/bin/sh\n").expect("Should write launcher");
    let registry = serde_json::json!([
        { "name": "system", "executable": "/usr/bin/php" },
        { "name": "PHP latest", "executable": launcher.path() },
    ]);
    temp.child("toolchains.json")
        .write_str(&registry.to_string())
        .expect("Should write registry");

    php_latest(&temp)
        .arg("list")
        .assert()
        .success()
        .stdout(predicate::str::contains("* PHP latest"))
        .stdout(predicate::str::contains("  system"))
        .stdout(predicate::str::contains("missing launcher").not());
}

#[test]
fn list_warns_about_missing_launcher() {
    let temp = assert_fs::TempDir::new().expect("Should create temp dir");
    temp.child("toolchains.json")
        .write_str(r#"[{ "name": "PHP latest", "executable": "/nowhere/php.sh" }]"#)
        .expect("Should write registry");

    php_latest(&temp)
        .arg("list")
        .assert()
        .success()
        .stdout(predicate::str::contains("missing launcher"));
}

#[test]
fn list_with_corrupt_registry_fails() {
    let temp = assert_fs::TempDir::new().expect("Should create temp dir");
    temp.child("toolchains.json")
        .write_str("{ not json")
        .expect("Should write registry");

    php_latest(&temp)
        .arg("list")
        .assert()
        .failure()
        .stderr(predicate::str::contains("not a valid registry"));
}

#[test]
fn status_on_empty_home() {
    let temp = assert_fs::TempDir::new().expect("Should create temp dir");
    php_latest(&temp)
        .arg("status")
        .assert()
        .success()
        .stdout(predicate::str::contains("Installed:  none"))
        .stdout(predicate::str::contains("Registered: no"))
        .stdout(predicate::str::contains("/releases/latest"));
}

#[test]
fn status_reports_installed_toolchain() {
    let temp = assert_fs::TempDir::new().expect("Should create temp dir");
    temp.child("cache/php-7.1.9/php.sh")
        .write_str("#!/bin/sh\n")
        .expect("Should write launcher");

    php_latest(&temp)
        .arg("status")
        .assert()
        .success()
        .stdout(predicate::str::contains("Installed:  7.1.9"));
}

#[test]
fn status_uses_feed_override() {
    let temp = assert_fs::TempDir::new().expect("Should create temp dir");
    php_latest(&temp)
        .env("PHP_LATEST_FEED", "https://mirror.example.com/api/")
        .arg("status")
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "https://mirror.example.com/api/repos/artspb/php-latest-",
        ));
}

// =============================================================================
// Sync
// =============================================================================

#[test]
fn sync_with_unreachable_feed_keeps_cache() {
    let temp = assert_fs::TempDir::new().expect("Should create temp dir");
    temp.child("config.toml")
        .write_str("[feed]\nallow_http = true\nrequest_timeout_secs = 5\n")
        .expect("Should write config");
    let launcher = temp.child("cache/php-7.1.9/php.sh");
    launcher.write_str("#!/bin/sh\n").expect("Should write launcher");

    php_latest(&temp)
        .env("PHP_LATEST_FEED", CLOSED_FEED)
        .args(["sync", "--quiet"])
        .assert()
        .success()
        .stdout(
            predicate::str::contains("unreachable")
                .or(predicate::str::contains("No PHP builds are published")),
        );

    launcher.assert("#!/bin/sh\n");
    temp.child("toolchains.json")
        .assert(predicate::path::missing());
}

#[test]
fn default_command_is_sync() {
    let temp = assert_fs::TempDir::new().expect("Should create temp dir");
    temp.child("config.toml")
        .write_str("[feed]\nallow_http = true\n")
        .expect("Should write config");

    php_latest(&temp)
        .env("PHP_LATEST_FEED", CLOSED_FEED)
        .assert()
        .success()
        .stdout(
            predicate::str::contains("unreachable")
                .or(predicate::str::contains("No PHP builds are published")),
        );
}

#[cfg(any(target_os = "linux", target_os = "macos"))]
#[test]
fn sync_rejects_plain_http_feed_by_default() {
    let temp = assert_fs::TempDir::new().expect("Should create temp dir");
    php_latest(&temp)
        .env("PHP_LATEST_FEED", CLOSED_FEED)
        .arg("sync")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Error:"));

    temp.child("cache").assert(predicate::path::missing());
}

#[test]
fn sync_with_invalid_config_fails() {
    let temp = assert_fs::TempDir::new().expect("Should create temp dir");
    temp.child("config.toml")
        .write_str("[feed\nallow_http = ")
        .expect("Should write config");

    php_latest(&temp)
        .arg("sync")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to load configuration"));
}
