pub mod compile;
pub mod export;
pub mod status;

use anyhow::Result;
use serde::Serialize;
use std::collections::BTreeMap;

use crate::archive::config::ReaderConfig;
use crate::archive::reader::{ArchiveReader, ConversationMap, ConversationMembers};
use crate::archive::tables::User;

#[derive(Debug, Clone, Serialize)]
pub struct CommandReport {
    pub command: String,
    pub ok: bool,
    pub details: Vec<String>,
    pub issues: Vec<String>,
}

impl CommandReport {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            ok: true,
            details: Vec::new(),
            issues: Vec::new(),
        }
    }

    pub fn detail(&mut self, text: impl Into<String>) {
        self.details.push(text.into());
    }

    pub fn issue(&mut self, text: impl Into<String>) {
        self.ok = false;
        self.issues.push(text.into());
    }
}

/// Everything one run reconstructs from an archive.
#[derive(Debug, Clone, Serialize)]
pub struct CompiledArchive {
    pub slack_name: String,
    pub channels: ConversationMap,
    pub groups: ConversationMap,
    pub dms: ConversationMap,
    pub dm_users: Vec<ConversationMembers>,
    pub mpims: ConversationMap,
    pub mpim_users: Vec<ConversationMembers>,
    /// DMs listed in the table without any day files.
    pub empty_dms: Vec<String>,
    pub unresolved_hidden: Vec<String>,
    #[serde(skip)]
    pub users: BTreeMap<String, User>,
}

pub fn compile_archive(cfg: ReaderConfig) -> Result<CompiledArchive> {
    let mut reader = ArchiveReader::open(cfg)?;
    tracing::info!(archive = %reader.archive_path().display(), "compiling archive");
    let filter = reader.config().channels.clone();

    let mut channels = reader.compile_channels(Some(&filter))?;
    let mut groups = reader.compile_groups()?;

    let (dms, dm_users, mpims, mpim_users) = if reader.config().show_dms {
        let dms = reader.compile_dm_messages()?;
        let dm_users = reader.compile_dm_users();
        let mpims = reader.compile_mpim_messages()?;
        let mpim_users = reader.compile_mpim_users();
        (dms, dm_users, mpims, mpim_users)
    } else {
        Default::default()
    };

    let unresolved_hidden = reader.warn_unresolved_hidden_conversations();

    // Empty channels and groups are not worth listing; DMs stay for member lists.
    channels.retain(|_, messages| !messages.is_empty());
    groups.retain(|_, messages| !messages.is_empty());

    Ok(CompiledArchive {
        slack_name: reader.slack_name(),
        channels,
        groups,
        dms,
        dm_users,
        mpims,
        mpim_users,
        unresolved_hidden,
        empty_dms: reader.empty_dms().iter().cloned().collect(),
        users: reader.users().clone(),
    })
}
