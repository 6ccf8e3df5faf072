//! Integration tests for store, sprint and task-entry commands via CLI.
//!
//! These tests verify that:
//! - `spr system init` creates the store and is idempotent
//! - `spr sprint open/list/show` get-or-create and inspect sprints
//! - `spr planned|reported add/import/list` record rows per sprint
//! - Column lists of different lengths are rejected

mod common;

use common::TestEnv;
use predicates::prelude::*;

// === Init Tests ===

#[test]
fn test_init_creates_storage() {
    let env = TestEnv::new();

    env.spr()
        .args(["system", "init"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"initialized\":true"));
}

#[test]
fn test_init_human_readable() {
    let env = TestEnv::new();

    env.spr()
        .args(["system", "init", "-H"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Initialized sprintrecon store"));
}

#[test]
fn test_init_already_initialized() {
    let env = TestEnv::init();

    env.spr()
        .args(["system", "init"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"initialized\":false"));
}

#[test]
fn test_commands_require_init() {
    let env = TestEnv::new();

    env.spr()
        .args(["sprint", "open", "2024-S3"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("spr system init"));
}

#[test]
fn test_system_info_reports_storage() {
    let env = TestEnv::new();
    let info = env.spr_json(&["system", "info"]);
    assert_eq!(info["initialized"], false);
    assert!(
        info["storage_path"]
            .as_str()
            .unwrap()
            .starts_with(env.data_path().to_str().unwrap())
    );
}

// === Sprint Tests ===

#[test]
fn test_sprint_open_creates_then_reuses() {
    let env = TestEnv::init();

    let first = env.spr_json(&["sprint", "open", "2024-S3"]);
    assert_eq!(first["id"], "2024-S3");
    assert_eq!(first["created"], true);

    let second = env.spr_json(&["sprint", "open", "2024-S3"]);
    assert_eq!(second["created"], false);
    assert_eq!(second["created_at"], first["created_at"]);
}

#[test]
fn test_sprint_open_rejects_blank_id() {
    let env = TestEnv::init();

    env.spr()
        .args(["sprint", "open", "  "])
        .assert()
        .failure()
        .stderr(predicate::str::contains("must not be empty"));
}

#[test]
fn test_sprint_list_and_show() {
    let env = TestEnv::init();
    env.spr().args(["sprint", "open", "S1"]).assert().success();
    env.spr().args(["sprint", "open", "S2"]).assert().success();

    let list = env.spr_json(&["sprint", "list"]);
    assert_eq!(list["count"], 2);

    env.spr()
        .args(["planned", "add", "-s", "S1", "--code", "T1", "--name", "Login"])
        .assert()
        .success();

    let show = env.spr_json(&["sprint", "show", "S1"]);
    assert_eq!(show["planned"], 1);
    assert_eq!(show["reported"], 0);
    assert_eq!(show["finalized"], false);
}

#[test]
fn test_unknown_sprint_is_not_found() {
    let env = TestEnv::init();

    env.spr()
        .args(["planned", "list", "-s", "nope"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Sprint not found: nope"));
}

#[test]
fn test_sprint_from_env_var() {
    let env = TestEnv::with_sprint("S1");

    env.spr()
        .env("SPR_SPRINT", "S1")
        .args(["planned", "add", "--code", "T1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"sprint_id\":\"S1\""));
}

// === Task Entry Tests ===

#[test]
fn test_planned_add_columns() {
    let env = TestEnv::with_sprint("S1");

    let added = env.spr_json(&[
        "planned",
        "add",
        "-s",
        "S1",
        "--start-date",
        "2024-05-01",
        "--module",
        "auth",
        "--code",
        "T1",
        "--name",
        "Login",
        "--start-date",
        "2024-05-02",
        "--module",
        "web",
        "--code",
        "T2",
        "--name",
        "Dashboard",
    ]);
    assert_eq!(added["added"], 2);
    assert_eq!(added["missing_code"], 0);

    let list = env.spr_json(&["planned", "list", "-s", "S1"]);
    assert_eq!(list["count"], 2);
    assert_eq!(list["tasks"][0]["code"], "T1");
    assert_eq!(list["tasks"][1]["module"], "web");
}

#[test]
fn test_planned_add_mismatched_columns() {
    let env = TestEnv::with_sprint("S1");

    env.spr()
        .args([
            "planned", "add", "-s", "S1", "--code", "T1", "--code", "T2", "--name", "Only one",
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Column lengths differ"));

    let list = env.spr_json(&["planned", "list", "-s", "S1"]);
    assert_eq!(list["count"], 0);
}

#[test]
fn test_planned_add_requires_rows() {
    let env = TestEnv::with_sprint("S1");

    env.spr()
        .args(["planned", "add", "-s", "S1"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("No planned tasks given"));
}

#[test]
fn test_reported_import_json() {
    let env = TestEnv::with_sprint("S1");
    let file = env.write_file(
        "reported.json",
        r#"[
            {"report_date": "2024-05-10", "module": "auth", "code": "T1", "name": "Login", "progress": "50%"},
            {"report_date": "2024-05-10", "module": "web", "name": "No code here", "progress": "5%"}
        ]"#,
    );

    let added = env.spr_json(&["reported", "import", "-s", "S1", &file]);
    assert_eq!(added["added"], 2);
    assert_eq!(added["missing_code"], 1);

    let list = env.spr_json(&["reported", "list", "-s", "S1"]);
    assert_eq!(list["tasks"][0]["progress"], "50%");
}

#[test]
fn test_planned_import_from_stdin() {
    let env = TestEnv::with_sprint("S1");

    env.spr()
        .args(["planned", "import", "-s", "S1", "-"])
        .write_stdin(r#"[{"code": "T1", "name": "Login"}]"#)
        .assert()
        .success()
        .stdout(predicate::str::contains("\"added\":1"));
}

#[test]
fn test_import_invalid_json() {
    let env = TestEnv::with_sprint("S1");
    let file = env.write_file("bad.json", "{ not json");

    env.spr()
        .args(["planned", "import", "-s", "S1", &file])
        .assert()
        .failure()
        .stderr(predicate::str::contains("JSON error"));
}

#[test]
fn test_tasks_are_isolated_per_sprint() {
    let env = TestEnv::init();
    env.spr().args(["sprint", "open", "S1"]).assert().success();
    env.spr().args(["sprint", "open", "S2"]).assert().success();

    env.spr()
        .args(["planned", "add", "-s", "S1", "--code", "T1"])
        .assert()
        .success();

    let list = env.spr_json(&["planned", "list", "-s", "S2"]);
    assert_eq!(list["count"], 0);
}

#[test]
fn test_rebuild_cache_keeps_records() {
    let env = TestEnv::with_sprint("S1");
    env.spr()
        .args(["reported", "add", "-s", "S1", "--code", "T1", "--progress", "10%"])
        .assert()
        .success();

    let rebuilt = env.spr_json(&["system", "rebuild-cache"]);
    assert_eq!(rebuilt["sprints"], 1);
    assert_eq!(rebuilt["reported"], 1);

    let list = env.spr_json(&["reported", "list", "-s", "S1"]);
    assert_eq!(list["count"], 1);
}

#[test]
fn test_workspace_flag_selects_store() {
    let env = TestEnv::init();
    let other = common::TempDir::new().unwrap();

    env.spr()
        .args(["-C", other.path().to_str().unwrap(), "sprint", "list"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Not initialized"));

    env.spr()
        .args(["-C", "/definitely/not/a/dir", "sprint", "list"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("does not exist"));
}

#[test]
fn test_init_recovers_lost_cache() {
    let env = TestEnv::with_sprint("S1");
    env.spr()
        .args(["planned", "add", "-s", "S1", "--code", "T1", "--name", "Login"])
        .assert()
        .success();
    let opened = env.spr_json(&["sprint", "show", "S1"]);
    env.spr().args(["finalize", "-s", "S1"]).assert().success();

    let init = env.spr_json(&["system", "init"]);
    let cache = std::path::Path::new(init["path"].as_str().unwrap()).join("cache.db");
    std::fs::remove_file(&cache).unwrap();

    let recovered = env.spr_json(&["system", "init"]);
    assert_eq!(recovered["initialized"], false);
    assert_eq!(recovered["recovered"]["sprints"], 1);
    assert_eq!(recovered["recovered"]["comparisons"], 1);

    let reopened = env.spr_json(&["sprint", "open", "S1"]);
    assert_eq!(reopened["created"], false);
    assert_eq!(reopened["created_at"], opened["created_at"]);

    env.spr()
        .args(["finalize", "-s", "S1"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("already finalized"));

    let report = env.spr_json(&["report", "-s", "S1"]);
    assert_eq!(report["entries"].as_array().unwrap().len(), 1);
}
