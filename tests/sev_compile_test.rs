use predicates::prelude::*;
use serde_json::{Value, json};
use std::fs;
use std::path::Path;
use tempfile::{TempDir, tempdir};

fn write_json(path: &Path, value: Value) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("mkdir");
    }
    fs::write(path, serde_json::to_string_pretty(&value).expect("json")).expect("write");
}

fn write_archive(root: &Path) {
    write_json(
        &root.join("users.json"),
        json!([
            {"id": "U1", "name": "alice"},
            {"id": "U2", "name": "bob"},
            {"id": "U3", "name": "carol"}
        ]),
    );
    write_json(
        &root.join("channels.json"),
        json!([
            {"id": "C1", "name": "general"},
            {"id": "C2", "name": "random"}
        ]),
    );
    write_json(
        &root.join("general/2020-01-01.json"),
        json!([
            {"user": "U1", "ts": "100", "text": "root", "reply_count": 2,
             "replies": [{"user": "U2", "ts": "300"}, {"user": "U3", "ts": "400"}]},
            {"user": "U2", "ts": "200", "text": "aside"}
        ]),
    );
    write_json(
        &root.join("general/2020-01-02.json"),
        json!([
            {"user": "U3", "ts": "400", "text": "second reply"},
            {"user": "U2", "ts": "300", "text": "first reply"},
            {"user": "U2", "ts": "350", "subtype": "channel_join", "text": "bob joined"}
        ]),
    );
    fs::create_dir_all(root.join("general")).expect("mkdir");
    fs::write(root.join("general/2020-01-03.json"), "{not json").expect("write bad day");
    write_json(
        &root.join("random/2020-01-01.json"),
        json!([{"user": "U1", "ts": "50", "text": "random note"}]),
    );
    write_json(
        &root.join("dms.json"),
        json!([
            {"id": "D1", "members": ["U1", "U2"]},
            {"id": "D2", "members": ["U1", "U3"]}
        ]),
    );
    write_json(
        &root.join("D1/2020-01-01.json"),
        json!([{"user": "U1", "ts": "10", "text": "psst"}]),
    );
}

fn fixture() -> TempDir {
    let tmp = tempdir().expect("tempdir");
    write_archive(&tmp.path().join("acme"));
    tmp
}

fn sev(tmp: &TempDir) -> assert_cmd::Command {
    let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("sev");
    cmd.current_dir(tmp.path())
        .env("SEV_HOME", tmp.path())
        .env("SEV_CONFIG_PATH", tmp.path().join("absent.toml"))
        .env_remove("SEV_ARCHIVE")
        .env_remove("SEV_CHANNELS")
        .env_remove("SEV_HIDE_CHANNELS")
        .env_remove("SEV_SHOW_DMS")
        .env_remove("SEV_THREAD_NOTE")
        .env_remove("SEV_SKIP_CHANNEL_MEMBER_CHANGE")
        .env_remove("SEV_SINCE")
        .env_remove("SEV_TIMEZONE")
        .env_remove("SEV_LOG");
    cmd
}

#[test]
fn compile_threads_replies_under_their_root() {
    let tmp = fixture();
    let output = sev(&tmp)
        .arg("compile")
        .arg("--archive")
        .arg(tmp.path().join("acme"))
        .arg("--json")
        .arg("--messages")
        .output()
        .expect("run sev");
    assert!(output.status.success());

    let report: Value = serde_json::from_slice(&output.stdout).expect("report json");
    assert_eq!(report["command"], "compile");
    assert_eq!(report["ok"], true);

    let details: Vec<&str> = report["details"]
        .as_array()
        .expect("details")
        .iter()
        .filter_map(Value::as_str)
        .filter(|d| d.starts_with("channel.general ts="))
        .collect();
    assert_eq!(
        details,
        vec![
            "channel.general ts=100 user=U1 text=root",
            "channel.general ts=300 user=U2 text=Thread Reply: first reply",
            "channel.general ts=400 user=U3 text=Thread Reply: second reply",
            "channel.general ts=200 user=U2 text=aside",
            "channel.general ts=350 user=U2 text=bob joined",
        ]
    );
}

#[test]
fn compile_skips_malformed_day_files_with_a_warning() {
    let tmp = fixture();
    sev(&tmp)
        .arg("compile")
        .arg("-z")
        .arg(tmp.path().join("acme"))
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "channel.general messages=5 thread_replies=2",
        ))
        .stdout(predicate::str::contains("dm.count=1"))
        .stdout(predicate::str::contains("dm.empty=D2"))
        .stderr(predicate::str::contains("DAY_FILE_SKIPPED"));
}

#[test]
fn compile_honors_member_change_and_thread_note_flags() {
    let tmp = fixture();
    sev(&tmp)
        .arg("compile")
        .arg("-z")
        .arg(tmp.path().join("acme"))
        .arg("--skip-channel-member-change")
        .arg("--no-thread-note")
        .arg("--messages")
        .assert()
        .success()
        .stdout(predicate::str::contains("channel.general messages=4 thread_replies=2"))
        .stdout(predicate::str::contains("text=first reply"))
        .stdout(predicate::str::contains("Thread Reply:").not())
        .stdout(predicate::str::contains("bob joined").not());
}

#[test]
fn compile_reads_settings_from_env_and_config_file() {
    let tmp = fixture();
    let config = tmp.path().join("sev.toml");
    fs::write(&config, "hide_channels = [\"random\", \"missing\"]\nshow_dms = false\n")
        .expect("write config");

    sev(&tmp)
        .env("SEV_CONFIG_PATH", &config)
        .env("SEV_ARCHIVE", tmp.path().join("acme"))
        .arg("compile")
        .assert()
        .success()
        .stdout(predicate::str::contains("channel.count=1"))
        .stdout(predicate::str::contains("channel.random").not())
        .stdout(predicate::str::contains("dm.count").not())
        .stdout(predicate::str::contains("hidden.unresolved=missing"));
}

#[test]
fn compile_window_drops_old_thread_groups() {
    let tmp = fixture();
    sev(&tmp)
        .arg("compile")
        .arg("-z")
        .arg(tmp.path().join("acme"))
        .arg("--since")
        .arg("2001-01-01")
        .arg("--timezone")
        .arg("UTC")
        .assert()
        .success()
        .stdout(predicate::str::contains("channel.count=0"))
        .stdout(predicate::str::contains("dm.count=0"));
}

#[test]
fn compile_fails_without_users_table() {
    let tmp = fixture();
    fs::remove_file(tmp.path().join("acme/users.json")).expect("remove users");

    sev(&tmp)
        .arg("compile")
        .arg("-z")
        .arg(tmp.path().join("acme"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("users table unreadable"));
}

#[test]
fn compile_rejects_unknown_timezone() {
    let tmp = fixture();
    sev(&tmp)
        .arg("compile")
        .arg("-z")
        .arg(tmp.path().join("acme"))
        .arg("--since")
        .arg("2020-01-01")
        .arg("--timezone")
        .arg("Nowhere/City")
        .assert()
        .failure();
}
