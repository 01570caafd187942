use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

pub const THREAD_REPLY_MARKER: &str = "Thread Reply:";

/// Reply stub as it appears under a thread root's `replies` field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplyRef {
    #[serde(default)]
    pub user: Option<String>,
    #[serde(default, deserialize_with = "de_opt_ts")]
    pub ts: Option<String>,
}

/// One message object from a day file. Fields the reconstruction never looks at
/// (attachments, files, reactions, ...) are carried through in `extra`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,
    #[serde(default, deserialize_with = "de_opt_ts", skip_serializing_if = "Option::is_none")]
    pub ts: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subtype: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub replies: Option<Vec<ReplyRef>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reply_count: Option<u64>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

fn de_opt_ts<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<Value>::deserialize(deserializer)?;
    Ok(match raw {
        Some(Value::String(s)) => Some(s),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

/// Parse a Slack `"1700000000.000200"` timestamp. Unparsable values read as `None`.
pub fn parse_ts(raw: &str) -> Option<f64> {
    raw.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

impl RawRecord {
    pub fn has_reply_count(&self) -> bool {
        self.reply_count.is_some()
    }

    pub fn reply_refs(&self) -> &[ReplyRef] {
        self.replies.as_deref().unwrap_or_default()
    }

    /// A record declares a thread when it carries a reply count or a non-empty reply list.
    pub fn declares_replies(&self) -> bool {
        self.has_reply_count() || !self.reply_refs().is_empty()
    }

    /// Numeric timestamp used for ordering; records without one sort first.
    pub fn sort_time(&self) -> f64 {
        self.ts.as_deref().and_then(parse_ts).unwrap_or(0.0)
    }

    pub fn thread_key(&self) -> Option<ThreadKey> {
        Some(ThreadKey::new(self.user.as_deref()?, self.ts.as_deref()?))
    }
}

/// `(author, timestamp)` pair correlating reply stubs with real records.
/// Not unique within a conversation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ThreadKey {
    pub user: String,
    pub ts: String,
}

impl ThreadKey {
    pub fn new(user: &str, ts: &str) -> Self {
        Self {
            user: user.to_string(),
            ts: ts.to_string(),
        }
    }

    pub fn from_ref(reply: &ReplyRef) -> Option<Self> {
        Some(Self::new(reply.user.as_deref()?, reply.ts.as_deref()?))
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Message {
    pub conversation_id: String,
    pub text: String,
    pub is_thread_reply: bool,
    pub is_recent: bool,
    pub record: RawRecord,
}

impl Message {
    pub fn new(conversation_id: &str, record: RawRecord) -> Self {
        Self {
            conversation_id: conversation_id.to_string(),
            text: record.text.clone().unwrap_or_default(),
            is_thread_reply: false,
            is_recent: true,
            record,
        }
    }

    pub fn user(&self) -> Option<&str> {
        self.record.user.as_deref()
    }

    pub fn ts(&self) -> Option<&str> {
        self.record.ts.as_deref()
    }

    pub fn subtype(&self) -> Option<&str> {
        self.record.subtype.as_deref()
    }

    pub fn sort_time(&self) -> f64 {
        self.record.sort_time()
    }

    /// Mark this message as spliced under a thread root. With `thread_note`
    /// the display text gains the reply marker, at most once.
    pub fn annotate_thread_reply(&mut self, thread_note: bool) {
        if thread_note && !self.text.starts_with(THREAD_REPLY_MARKER) {
            self.text = format!("{THREAD_REPLY_MARKER} {}", self.text);
        }
        self.is_thread_reply = true;
    }

    pub fn permalink(&self, slack_name: &str) -> Option<String> {
        let ts = self.ts()?;
        Some(format!(
            "https://{slack_name}.slack.com/archives/{}/p{}",
            self.conversation_id,
            ts.replace('.', "")
        ))
    }
}
