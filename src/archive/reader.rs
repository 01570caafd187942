use crate::archive::config::ReaderConfig;
use crate::archive::index::IdentityIndex;
use crate::archive::membership::strip_membership_changes;
use crate::archive::paths::ArchivePaths;
use crate::archive::record::Message;
use crate::archive::store::{LoadedConversation, load_conversation};
use crate::archive::tables::{ConversationMeta, User, load_users, read_conversations};
use crate::archive::threads::assemble;
use crate::archive::timeframe::filter_timeframe;
use crate::error::ReaderError;
use anyhow::Result;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

pub type ConversationMap = BTreeMap<String, Vec<Message>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ConversationKind {
    Channel,
    Group,
    Dm,
    Mpim,
}

impl ConversationKind {
    fn label(self) -> &'static str {
        match self {
            Self::Channel => "channel",
            Self::Group => "group",
            Self::Dm => "dm",
            Self::Mpim => "mpim",
        }
    }
}

/// Members of one DM (keyed by id) or MPIM (keyed by name).
#[derive(Debug, Clone, Serialize)]
pub struct ConversationMembers {
    pub key: String,
    pub users: Vec<User>,
}

/// Compiles every conversation of an unpacked export into thread-ordered
/// message lists. One instance per run; it remembers which DMs had no day
/// files and which hidden names were never matched.
#[derive(Debug)]
pub struct ArchiveReader {
    paths: ArchivePaths,
    config: ReaderConfig,
    cutoff: Option<f64>,
    users: BTreeMap<String, User>,
    remaining_hidden: Vec<String>,
    empty_dms: BTreeSet<String>,
}

impl ArchiveReader {
    pub fn open(config: ReaderConfig) -> Result<Self> {
        let root = config.archive_path()?;
        if !root.is_dir() || std::fs::read_dir(&root).is_err() {
            return Err(ReaderError::ArchiveUnreadable(root).into());
        }
        let paths = ArchivePaths::new(&root);
        let users = load_users(&paths.users_file)?;
        let cutoff = config.cutoff()?;

        Ok(Self {
            remaining_hidden: config.hide_channels.clone(),
            paths,
            config,
            cutoff,
            users,
            empty_dms: BTreeSet::new(),
        })
    }

    pub fn archive_path(&self) -> &Path {
        &self.paths.root
    }

    pub fn slack_name(&self) -> String {
        self.paths.slack_name()
    }

    pub fn config(&self) -> &ReaderConfig {
        &self.config
    }

    pub fn users(&self) -> &BTreeMap<String, User> {
        &self.users
    }

    pub fn empty_dms(&self) -> &BTreeSet<String> {
        &self.empty_dms
    }

    pub fn compile_channels(&mut self, filter: Option<&[String]>) -> Result<ConversationMap> {
        let table = read_conversations(&self.paths.channels_file);
        let names: Vec<String> = table
            .values()
            .filter_map(|c| c.name.clone())
            .filter(|name| filter.is_none_or(|wanted| wanted.is_empty() || wanted.contains(name)))
            .collect();
        let names = self.remove_hidden(names);
        self.create_messages(&names, &table, ConversationKind::Channel)
    }

    /// Private channels.
    pub fn compile_groups(&mut self) -> Result<ConversationMap> {
        let table = read_conversations(&self.paths.groups_file);
        let names: Vec<String> = table.values().filter_map(|c| c.name.clone()).collect();
        let names = self.remove_hidden(names);
        self.create_messages(&names, &table, ConversationKind::Group)
    }

    pub fn compile_dm_messages(&mut self) -> Result<ConversationMap> {
        let table = read_conversations(&self.paths.dms_file);
        let ids: Vec<String> = table.keys().cloned().collect();
        self.create_messages(&ids, &table, ConversationKind::Dm)
    }

    pub fn compile_mpim_messages(&mut self) -> Result<ConversationMap> {
        let table = read_conversations(&self.paths.mpims_file);
        let names: Vec<String> = table.values().filter_map(|c| c.name.clone()).collect();
        self.create_messages(&names, &table, ConversationKind::Mpim)
    }

    /// Members of every DM that has day files. Uses the empty-DM set from the
    /// last `compile_dm_messages` call.
    pub fn compile_dm_users(&self) -> Vec<ConversationMembers> {
        read_conversations(&self.paths.dms_file)
            .into_values()
            .filter(|dm| !self.empty_dms.contains(&dm.id))
            .filter_map(|dm| {
                let ids = match (&dm.user, &dm.members) {
                    (Some(user), _) => vec![user.clone()],
                    (None, Some(members)) => members.clone(),
                    (None, None) => return None,
                };
                Some(ConversationMembers {
                    key: dm.id.clone(),
                    users: self.lookup_users(&ids),
                })
            })
            .collect()
    }

    pub fn compile_mpim_users(&self) -> Vec<ConversationMembers> {
        read_conversations(&self.paths.mpims_file)
            .into_values()
            .filter_map(|mpim| {
                let name = mpim.name?;
                let members = mpim.members.unwrap_or_default();
                Some(ConversationMembers {
                    key: name,
                    users: self.lookup_users(&members),
                })
            })
            .collect()
    }

    /// Report hide-list names that matched no channel or group. Non-fatal.
    pub fn warn_unresolved_hidden_conversations(&self) -> Vec<String> {
        if !self.remaining_hidden.is_empty() {
            tracing::warn!(
                names = %self.remaining_hidden.join(","),
                "could not find all conversations to hide"
            );
        }
        self.remaining_hidden.clone()
    }

    fn lookup_users(&self, ids: &[String]) -> Vec<User> {
        ids.iter()
            .map(|id| {
                self.users
                    .get(id)
                    .cloned()
                    .unwrap_or_else(|| User::deleted(id))
            })
            .collect()
    }

    fn remove_hidden(&mut self, names: Vec<String>) -> Vec<String> {
        if self.remaining_hidden.is_empty() {
            return names;
        }
        let matched: BTreeSet<String> = names
            .iter()
            .filter(|n| self.remaining_hidden.contains(*n))
            .cloned()
            .collect();
        self.remaining_hidden.retain(|n| !matched.contains(n));
        names.into_iter().filter(|n| !matched.contains(n)).collect()
    }

    fn create_messages(
        &mut self,
        names: &[String],
        table: &BTreeMap<String, ConversationMeta>,
        kind: ConversationKind,
    ) -> Result<ConversationMap> {
        // Folder name -> conversation id, needed for permalinks.
        let folder_to_id: BTreeMap<&str, &str> = table
            .values()
            .map(|c| (c.folder_name(), c.id.as_str()))
            .collect();

        let mut chats = ConversationMap::new();
        let mut empty = BTreeSet::new();
        for name in names {
            let dir = self.paths.conversation_dir(name);
            let records = match load_conversation(name, &dir)? {
                LoadedConversation::Empty => {
                    if kind == ConversationKind::Dm {
                        empty.insert(name.clone());
                    }
                    continue;
                }
                LoadedConversation::Records(records) => records,
            };

            let conversation_id = folder_to_id.get(name.as_str()).copied().unwrap_or(name.as_str());
            let messages = records
                .into_iter()
                .map(|record| Message::new(conversation_id, record))
                .collect();
            chats.insert(name.clone(), self.build_threads(name, messages));
        }

        if kind == ConversationKind::Dm {
            self.empty_dms = empty;
        }

        tracing::info!(kind = kind.label(), conversations = chats.len(), "compiled conversations");

        if self.cutoff.is_some() {
            chats = filter_timeframe(chats, self.cutoff);
        }
        Ok(chats)
    }

    fn build_threads(&self, name: &str, messages: Vec<Message>) -> Vec<Message> {
        let messages = if self.config.skip_channel_member_change {
            strip_membership_changes(messages)
        } else {
            messages
        };
        let index = IdentityIndex::build(&messages);
        if index.is_empty() {
            return messages;
        }
        let (out, stats) = assemble(messages, &index, self.config.thread_note);
        tracing::debug!(
            conversation = name,
            keys = index.len(),
            threads = stats.threads,
            replies = stats.replies,
            "threads assembled"
        );
        out
    }
}
