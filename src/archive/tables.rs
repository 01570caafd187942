use crate::error::ReaderError;
use anyhow::Result;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

pub const SLACKBOT_ID: &str = "USLACKBOT";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    #[serde(default)]
    pub real_name: Option<String>,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub image_72: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub real_name: Option<String>,
    #[serde(default)]
    pub deleted: bool,
    #[serde(default)]
    pub profile: Option<UserProfile>,
}

impl User {
    /// Stand-in for ids referenced by conversations but absent from `users.json`.
    pub fn deleted(id: &str) -> Self {
        Self {
            id: id.to_string(),
            name: Some(format!("deleted-user-{id}")),
            real_name: None,
            deleted: true,
            profile: None,
        }
    }

    fn slackbot() -> Self {
        Self {
            id: SLACKBOT_ID.to_string(),
            name: Some("slackbot".to_string()),
            real_name: Some("Slackbot".to_string()),
            deleted: false,
            profile: Some(UserProfile {
                real_name: Some("Slackbot".to_string()),
                display_name: Some("slackbot".to_string()),
                image_72: Some("https://a.slack-edge.com/0180/img/slackbot_72.png".to_string()),
            }),
        }
    }

    pub fn display_name(&self) -> &str {
        let profile_name = self
            .profile
            .as_ref()
            .and_then(|p| p.display_name.as_deref().or(p.real_name.as_deref()));
        [profile_name, self.real_name.as_deref(), self.name.as_deref()]
            .into_iter()
            .flatten()
            .find(|s| !s.trim().is_empty())
            .unwrap_or(self.id.as_str())
    }
}

/// Channel, group, DM or MPIM descriptor from one of the conversation tables.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationMeta {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub members: Option<Vec<String>>,
    #[serde(default)]
    pub user: Option<String>,
}

impl ConversationMeta {
    /// Channels, groups and MPIMs live under their name; DMs under their id.
    pub fn folder_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.id)
    }
}

/// Read a table file into an id-keyed map. A missing or unreadable table is an
/// empty table; entries without an id are skipped.
pub fn read_table(path: &Path) -> BTreeMap<String, Value> {
    let Ok(raw) = fs::read_to_string(path) else {
        tracing::debug!(path = %path.display(), "table file missing, using empty table");
        return BTreeMap::new();
    };
    let Ok(Value::Array(items)) = serde_json::from_str::<Value>(&raw) else {
        tracing::warn!(path = %path.display(), "table file is not a JSON array, using empty table");
        return BTreeMap::new();
    };

    items
        .into_iter()
        .filter_map(|item| {
            let id = item.get("id").and_then(Value::as_str)?.to_string();
            Some((id, item))
        })
        .collect()
}

pub fn read_conversations(path: &Path) -> BTreeMap<String, ConversationMeta> {
    read_table(path)
        .into_iter()
        .filter_map(|(id, value)| match serde_json::from_value::<ConversationMeta>(value) {
            Ok(meta) => Some((id, meta)),
            Err(err) => {
                tracing::warn!(path = %path.display(), id = %id, error = %err, "skipping malformed conversation entry");
                None
            }
        })
        .collect()
}

/// Load `users.json`. Unlike the conversation tables this one is required.
pub fn load_users(path: &Path) -> Result<BTreeMap<String, User>> {
    let unreadable = |source: Box<dyn std::error::Error + Send + Sync>| {
        ReaderError::UsersTableUnreadable {
            path: path.to_path_buf(),
            source,
        }
    };
    let raw = fs::read_to_string(path).map_err(|err| unreadable(err.into()))?;
    let users: Vec<User> = serde_json::from_str(&raw).map_err(|err| unreadable(err.into()))?;

    let mut out: BTreeMap<String, User> = users.into_iter().map(|u| (u.id.clone(), u)).collect();
    out.entry(SLACKBOT_ID.to_string()).or_insert_with(User::slackbot);
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn missing_table_degrades_to_empty() {
        let tmp = tempdir().expect("tempdir");
        assert!(read_table(&tmp.path().join("groups.json")).is_empty());
    }

    #[test]
    fn non_array_table_degrades_to_empty() {
        let tmp = tempdir().expect("tempdir");
        let path = tmp.path().join("channels.json");
        fs::write(&path, r#"{"id":"C1"}"#).expect("write");
        assert!(read_table(&path).is_empty());
    }

    #[test]
    fn conversation_table_is_keyed_by_id() {
        let tmp = tempdir().expect("tempdir");
        let path = tmp.path().join("channels.json");
        fs::write(
            &path,
            r#"[{"id":"C1","name":"general","members":["U1"]},{"name":"no-id"},{"id":"D1","user":"U2"}]"#,
        )
        .expect("write");

        let table = read_conversations(&path);
        assert_eq!(table.len(), 2);
        assert_eq!(table["C1"].folder_name(), "general");
        assert_eq!(table["D1"].folder_name(), "D1");
        assert_eq!(table["D1"].user.as_deref(), Some("U2"));
    }

    #[test]
    fn users_table_adds_slackbot() {
        let tmp = tempdir().expect("tempdir");
        let path = tmp.path().join("users.json");
        fs::write(
            &path,
            r#"[{"id":"U1","name":"alice","profile":{"display_name":"Alice"}}]"#,
        )
        .expect("write");

        let users = load_users(&path).expect("users");
        assert_eq!(users["U1"].display_name(), "Alice");
        assert_eq!(users[SLACKBOT_ID].display_name(), "slackbot");
    }

    #[test]
    fn missing_users_table_is_fatal() {
        let tmp = tempdir().expect("tempdir");
        let err = load_users(&tmp.path().join("users.json")).expect_err("must fail");
        assert!(err.downcast_ref::<ReaderError>().is_some());
        assert!(format!("{err:#}").contains("users.json"));
    }

    #[test]
    fn unparsable_users_table_keeps_parse_detail() {
        let tmp = tempdir().expect("tempdir");
        let path = tmp.path().join("users.json");
        fs::write(&path, r#"[{"name":"no id"}]"#).expect("write");

        let err = load_users(&path).expect_err("must fail");
        let reader_err = err.downcast_ref::<ReaderError>().expect("reader error");
        assert!(matches!(reader_err, ReaderError::UsersTableUnreadable { .. }));
        assert!(format!("{err:#}").contains("missing field `id`"));
    }

    #[test]
    fn display_name_falls_back_to_id() {
        let user = User {
            id: "U9".to_string(),
            name: None,
            real_name: Some("  ".to_string()),
            deleted: false,
            profile: None,
        };
        assert_eq!(user.display_name(), "U9");
        assert_eq!(User::deleted("U7").display_name(), "deleted-user-U7");
    }
}
