use anyhow::Result;
use std::env;

use crate::archive::config::{ReaderConfig, resolve_config_path};
use crate::archive::paths::ArchivePaths;
use crate::archive::store::day_files;
use crate::archive::tables::read_conversations;
use crate::commands::CommandReport;

include!(concat!(env!("OUT_DIR"), "/sev_env_allowlist.rs"));

/// Environment keys the binary reads that are currently set.
fn active_env_keys() -> Vec<&'static str> {
    GENERATED_SEV_ENV_ALLOWLIST
        .iter()
        .copied()
        .filter(|key| env::var_os(key).is_some_and(|v| !v.is_empty()))
        .collect()
}

pub fn run(cfg: &ReaderConfig) -> Result<CommandReport> {
    let mut report = CommandReport::new("status");

    match resolve_config_path() {
        Some(path) if path.is_file() => report.detail(format!("config_file={}", path.display())),
        Some(path) => report.detail(format!("config_file={} (absent)", path.display())),
        None => report.detail("config_file=none"),
    }

    let keys = active_env_keys();
    report.detail(format!(
        "env={}",
        if keys.is_empty() {
            "none".to_string()
        } else {
            keys.join(",")
        }
    ));

    let root = match cfg.archive_path() {
        Ok(root) => root,
        Err(err) => {
            report.issue(format!("{err:#}"));
            return Ok(report);
        }
    };
    report.detail(format!("archive={}", root.display()));
    if !root.is_dir() {
        report.issue(format!("archive directory missing: {}", root.display()));
        return Ok(report);
    }

    let paths = ArchivePaths::new(&root);
    report.detail(format!("slack_name={}", paths.slack_name()));
    for (name, path) in paths.tables() {
        if path.is_file() {
            report.detail(format!("table.{name}=present"));
        } else if name == "users" {
            report.issue(format!("missing users table: {}", path.display()));
        } else {
            report.detail(format!("table.{name}=absent"));
        }
    }

    let tables = [
        ("channel", &paths.channels_file),
        ("group", &paths.groups_file),
        ("dm", &paths.dms_file),
        ("mpim", &paths.mpims_file),
    ];
    for (kind, table) in tables {
        let conversations = read_conversations(table);
        let mut with_days = 0usize;
        let mut missing = 0usize;
        for meta in conversations.values() {
            let dir = paths.conversation_dir(meta.folder_name());
            match day_files(&dir) {
                Ok(files) if !files.is_empty() => with_days += 1,
                _ => missing += 1,
            }
        }
        report.detail(format!(
            "{kind}.listed={} {kind}.with_day_files={with_days} {kind}.without_day_files={missing}",
            conversations.len()
        ));
    }

    match cfg.cutoff() {
        Ok(Some(cutoff)) => report.detail(format!("cutoff_epoch={cutoff}")),
        Ok(None) => report.detail("cutoff_epoch=none"),
        Err(err) => report.issue(format!("invalid timeframe: {err:#}")),
    }

    Ok(report)
}
