use crate::archive::record::Message;

const MEMBERSHIP_SUBTYPES: [&str; 2] = ["channel_join", "channel_leave"];

pub fn is_membership_change(message: &Message) -> bool {
    message
        .subtype()
        .is_some_and(|subtype| MEMBERSHIP_SUBTYPES.contains(&subtype))
}

/// Drop "<user> has joined/left the channel" notices. Must run before the
/// identity index is built so removed records cannot be resolved as replies.
pub fn strip_membership_changes(messages: Vec<Message>) -> Vec<Message> {
    messages
        .into_iter()
        .filter(|m| !is_membership_change(m))
        .collect()
}
