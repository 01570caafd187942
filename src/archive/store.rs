use crate::archive::record::RawRecord;
use crate::archive::warn::{self, WarnEvent};
use anyhow::{Context, Result};
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq)]
pub enum LoadedConversation {
    /// No day files at all under the conversation directory.
    Empty,
    Records(Vec<RawRecord>),
}

/// `*.json` day files directly under `dir`, in file-name (date) order.
pub fn day_files(dir: &Path) -> Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Ok(Vec::new());
    }

    let mut out = Vec::new();
    let read_dir =
        fs::read_dir(dir).with_context(|| format!("failed to read {}", dir.display()))?;
    for entry in read_dir {
        let path = entry?.path();
        if !path.is_file() {
            continue;
        }
        if path.extension().and_then(|v| v.to_str()) == Some("json") {
            out.push(path);
        }
    }
    out.sort();
    Ok(out)
}

fn warn_skipped(conversation: &str, path: &Path, reason: &str, err: &str) {
    warn::emit(WarnEvent {
        code: "DAY_FILE_SKIPPED",
        stage: "record-store",
        action: "load-day-file",
        conversation,
        path: &path.display().to_string(),
        reason,
        err,
    });
}

/// Load one day file, sorted by ascending timestamp. Returns `None` when the
/// file is not a JSON array; such files are skipped, not fatal.
pub fn load_day_file(conversation: &str, path: &Path) -> Result<Option<Vec<RawRecord>>> {
    let raw = fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;

    // Bad encoding surfaces as a parse error and takes the skip path.
    let items = match serde_json::from_slice::<Value>(&raw) {
        Ok(Value::Array(items)) => items,
        Ok(other) => {
            let kind = match other {
                Value::Object(_) => "object",
                Value::String(_) => "string",
                Value::Number(_) => "number",
                Value::Bool(_) => "bool",
                _ => "null",
            };
            warn_skipped(conversation, path, "expected-array", kind);
            return Ok(None);
        }
        Err(err) => {
            warn_skipped(conversation, path, "invalid-json", &err.to_string());
            return Ok(None);
        }
    };

    let mut records = Vec::with_capacity(items.len());
    for (idx, item) in items.into_iter().enumerate() {
        match serde_json::from_value::<RawRecord>(item) {
            Ok(record) => records.push(record),
            Err(err) => {
                warn::emit(WarnEvent {
                    code: "RECORD_SKIPPED",
                    stage: "record-store",
                    action: "parse-record",
                    conversation,
                    path: &format!("{}#{idx}", path.display()),
                    reason: "not-a-message-object",
                    err: &err.to_string(),
                });
            }
        }
    }

    // Stable: equal timestamps keep file order.
    records.sort_by(|a, b| a.sort_time().total_cmp(&b.sort_time()));
    Ok(Some(records))
}

/// Merge every day file of a conversation, oldest day first.
pub fn load_conversation(conversation: &str, dir: &Path) -> Result<LoadedConversation> {
    let files = day_files(dir)?;
    if files.is_empty() {
        return Ok(LoadedConversation::Empty);
    }

    let mut out = Vec::new();
    for file in &files {
        if let Some(mut records) = load_day_file(conversation, file)? {
            out.append(&mut records);
        }
    }
    tracing::debug!(
        conversation,
        day_files = files.len(),
        records = out.len(),
        "loaded conversation"
    );
    Ok(LoadedConversation::Records(out))
}
