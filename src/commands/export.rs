use anyhow::{Context, Result};
use chrono::Utc;
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::archive::config::ReaderConfig;
use crate::archive::reader::{ConversationMap, ConversationMembers};
use crate::archive::record::{Message, RawRecord};
use crate::archive::resources::{DirectoryResolver, NoResources, ResourceResolver};
use crate::archive::tables::User;
use crate::commands::{CommandReport, compile_archive};

#[derive(Debug, Clone)]
pub struct ExportOptions {
    pub output: PathBuf,
    pub resources_dir: Option<PathBuf>,
}

#[derive(Debug, Serialize)]
struct ExportedResource {
    url: String,
    local_path: Option<String>,
}

#[derive(Debug, Serialize)]
struct ExportedMessage<'a> {
    ts: Option<&'a str>,
    user: Option<&'a str>,
    user_name: Option<&'a str>,
    text: &'a str,
    is_thread_reply: bool,
    is_recent: bool,
    permalink: Option<String>,
    resources: Vec<ExportedResource>,
    record: &'a RawRecord,
}

#[derive(Debug, Serialize)]
struct ExportedConversation<'a> {
    name: &'a str,
    members: Vec<&'a str>,
    messages: Vec<ExportedMessage<'a>>,
}

#[derive(Debug, Serialize)]
struct ExportDocument<'a> {
    workspace: &'a str,
    generated_at: String,
    channels: Vec<ExportedConversation<'a>>,
    groups: Vec<ExportedConversation<'a>>,
    dms: Vec<ExportedConversation<'a>>,
    mpims: Vec<ExportedConversation<'a>>,
}

/// URLs of files and image attachments carried by a message.
fn resource_urls(message: &Message) -> Vec<&str> {
    let extra = &message.record.extra;
    let files = extra
        .get("files")
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .filter_map(|f| f.get("url_private").and_then(Value::as_str));
    let attachments = extra
        .get("attachments")
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .filter_map(|a| a.get("image_url").and_then(Value::as_str));
    files.chain(attachments).collect()
}

struct Exporter<'a> {
    slack_name: &'a str,
    users: BTreeMap<&'a str, &'a User>,
    resolver: &'a dyn ResourceResolver,
}

impl<'a> Exporter<'a> {
    fn message(&self, message: &'a Message) -> ExportedMessage<'a> {
        let resources = resource_urls(message)
            .into_iter()
            .map(|url| ExportedResource {
                url: url.to_string(),
                local_path: self
                    .resolver
                    .resolve_local(url)
                    .map(|p| p.display().to_string()),
            })
            .collect();

        ExportedMessage {
            ts: message.ts(),
            user: message.user(),
            user_name: message
                .user()
                .and_then(|id| self.users.get(id).copied())
                .map(User::display_name),
            text: &message.text,
            is_thread_reply: message.is_thread_reply,
            is_recent: message.is_recent,
            permalink: message.permalink(self.slack_name),
            resources,
            record: &message.record,
        }
    }

    fn conversations(
        &self,
        map: &'a ConversationMap,
        members: &'a [ConversationMembers],
    ) -> Vec<ExportedConversation<'a>> {
        let members: BTreeMap<&str, Vec<&str>> = members
            .iter()
            .map(|m| {
                let names = m.users.iter().map(User::display_name).collect();
                (m.key.as_str(), names)
            })
            .collect();

        map.iter()
            .map(|(name, messages)| ExportedConversation {
                name,
                members: members.get(name.as_str()).cloned().unwrap_or_default(),
                messages: messages.iter().map(|m| self.message(m)).collect(),
            })
            .collect()
    }
}

fn write_atomic(path: &Path, data: &str) -> Result<()> {
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    };
    std::fs::create_dir_all(&parent)
        .with_context(|| format!("failed to create {}", parent.display()))?;

    let mut tmp = tempfile::NamedTempFile::new_in(&parent)
        .with_context(|| format!("failed to create temp file in {}", parent.display()))?;
    tmp.write_all(data.as_bytes())?;
    tmp.persist(path)
        .with_context(|| format!("failed to write {}", path.display()))?;
    Ok(())
}

pub fn run(cfg: ReaderConfig, opts: &ExportOptions) -> Result<CommandReport> {
    let mut report = CommandReport::new("export");
    let compiled = compile_archive(cfg)?;

    let resolver: Box<dyn ResourceResolver> = match &opts.resources_dir {
        Some(dir) => {
            let resolver = DirectoryResolver::scan(dir)?;
            report.detail(format!("resources.indexed={}", resolver.len()));
            Box::new(resolver)
        }
        None => Box::new(NoResources),
    };

    let exporter = Exporter {
        slack_name: &compiled.slack_name,
        users: compiled
            .users
            .iter()
            .map(|(id, user)| (id.as_str(), user))
            .collect(),
        resolver: resolver.as_ref(),
    };

    let document = ExportDocument {
        workspace: &compiled.slack_name,
        generated_at: Utc::now().to_rfc3339(),
        channels: exporter.conversations(&compiled.channels, &[]),
        groups: exporter.conversations(&compiled.groups, &[]),
        dms: exporter.conversations(&compiled.dms, &compiled.dm_users),
        mpims: exporter.conversations(&compiled.mpims, &compiled.mpim_users),
    };

    let data = serde_json::to_string_pretty(&document)?;
    write_atomic(&opts.output, &format!("{data}\n"))?;

    report.detail(format!("output={}", opts.output.display()));
    report.detail(format!("channels={}", document.channels.len()));
    report.detail(format!("groups={}", document.groups.len()));
    report.detail(format!("dms={}", document.dms.len()));
    report.detail(format!("mpims={}", document.mpims.len()));
    Ok(report)
}
