use predicates::prelude::*;
use serde_json::{Value, json};
use md5::{Digest, Md5};
use std::fs;
use std::path::Path;
use tempfile::{TempDir, tempdir};

const IMAGE_URL: &str = "https://files.slack.com/files-pri/T1-F1/chart.png";

fn write_json(path: &Path, value: Value) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("mkdir");
    }
    fs::write(path, serde_json::to_string(&value).expect("json")).expect("write");
}

fn fixture() -> TempDir {
    let tmp = tempdir().expect("tempdir");
    let root = tmp.path().join("acme");
    write_json(
        &root.join("users.json"),
        json!([
            {"id": "U1", "name": "alice", "profile": {"display_name": "Alice A"}},
            {"id": "U2", "name": "bob"}
        ]),
    );
    write_json(&root.join("channels.json"), json!([{"id": "C1", "name": "general"}]));
    write_json(
        &root.join("general/2020-01-01.json"),
        json!([
            {"user": "U1", "ts": "100.000200", "text": "look", "reply_count": 1,
             "replies": [{"user": "U2", "ts": "101.000000"}],
             "files": [{"url_private": IMAGE_URL}]},
            {"user": "U2", "ts": "101.000000", "text": "nice"}
        ]),
    );
    write_json(
        &root.join("dms.json"),
        json!([
            {"id": "D1", "members": ["U1", "U2"]},
            {"id": "D2", "members": ["U1", "U7"]}
        ]),
    );
    write_json(
        &root.join("D1/2020-01-01.json"),
        json!([{"user": "U2", "ts": "5", "text": "hey"}]),
    );
    tmp
}

fn short_hash(url: &str) -> String {
    let digest = format!("{:x}", Md5::digest(url.as_bytes()));
    digest[..8].to_string()
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
fn export_writes_threaded_document_with_local_resources() {
    let tmp = fixture();
    let downloads = tmp.path().join("downloads");
    fs::create_dir_all(&downloads).expect("mkdir downloads");
    let local = downloads.join(format!("chart_{}.png", short_hash(IMAGE_URL)));
    fs::write(&local, b"png").expect("write download");
    let output = tmp.path().join("out/acme.json");

    sev(&tmp)
        .arg("export")
        .arg("-z")
        .arg(tmp.path().join("acme"))
        .arg("--output")
        .arg(&output)
        .arg("--resources-dir")
        .arg(&downloads)
        .assert()
        .success()
        .stdout(predicate::str::contains("resources.indexed=1"))
        .stdout(predicate::str::contains("channels=1"));

    let doc: Value =
        serde_json::from_str(&fs::read_to_string(&output).expect("read export")).expect("json");
    assert_eq!(doc["workspace"], "acme");

    let general = &doc["channels"][0];
    assert_eq!(general["name"], "general");
    let messages = general["messages"].as_array().expect("messages");
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0]["user_name"], "Alice A");
    assert_eq!(
        messages[0]["permalink"],
        "https://acme.slack.com/archives/C1/p100000200"
    );
    assert_eq!(messages[0]["resources"][0]["url"], IMAGE_URL);
    assert_eq!(
        messages[0]["resources"][0]["local_path"],
        local.display().to_string()
    );
    assert_eq!(messages[1]["text"], "Thread Reply: nice");
    assert_eq!(messages[1]["is_thread_reply"], true);

    let dms = doc["dms"].as_array().expect("dms");
    assert_eq!(dms.len(), 1);
    assert_eq!(dms[0]["name"], "D1");
    assert_eq!(dms[0]["members"], json!(["Alice A", "bob"]));
}

#[test]
fn export_without_dms_leaves_them_out() {
    let tmp = fixture();
    let output = tmp.path().join("acme.json");

    sev(&tmp)
        .arg("export")
        .arg("-z")
        .arg(tmp.path().join("acme"))
        .arg("--no-dms")
        .arg("-o")
        .arg(&output)
        .assert()
        .success();

    let doc: Value =
        serde_json::from_str(&fs::read_to_string(&output).expect("read export")).expect("json");
    assert_eq!(doc["dms"], json!([]));
    assert_eq!(doc["mpims"], json!([]));
    assert_eq!(doc["channels"][0]["messages"][0]["resources"][0]["local_path"], Value::Null);
}
