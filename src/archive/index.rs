use crate::archive::record::{Message, ThreadKey};
use std::collections::HashMap;

/// Positions of every message in one conversation, grouped by `(author, ts)`.
/// One key can map to several positions; duplicate-timestamp records are kept.
#[derive(Debug, Default)]
pub struct IdentityIndex {
    by_key: HashMap<ThreadKey, Vec<usize>>,
}

impl IdentityIndex {
    pub fn build(messages: &[Message]) -> Self {
        let mut by_key: HashMap<ThreadKey, Vec<usize>> = HashMap::new();
        for (pos, message) in messages.iter().enumerate() {
            let Some(key) = message.record.thread_key() else {
                continue;
            };
            by_key.entry(key).or_default().push(pos);
        }
        Self { by_key }
    }

    /// Positions sharing `key`, ascending. Empty when nothing matches.
    pub fn resolve(&self, key: &ThreadKey) -> &[usize] {
        self.by_key.get(key).map(Vec::as_slice).unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.by_key.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_key.is_empty()
    }
}
