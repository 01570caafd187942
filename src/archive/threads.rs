use crate::archive::index::IdentityIndex;
use crate::archive::record::{Message, ThreadKey};
use std::collections::{BTreeMap, BTreeSet};

/// Arena cell. Resolved replies leave a `Vacant` behind so positions recorded
/// for other groups stay valid until the final compaction.
#[derive(Debug)]
enum Slot {
    Live(Message),
    Vacant,
}

impl Slot {
    fn take(&mut self) -> Option<Message> {
        match std::mem::replace(self, Slot::Vacant) {
            Slot::Live(message) => Some(message),
            Slot::Vacant => None,
        }
    }

    fn into_message(self) -> Option<Message> {
        match self {
            Slot::Live(message) => Some(message),
            Slot::Vacant => None,
        }
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct AssemblyStats {
    pub threads: usize,
    pub replies: usize,
}

/// Reply positions of every thread root, keyed by root position.
#[derive(Debug, Default)]
struct ThreadPlan {
    groups: BTreeMap<usize, Vec<usize>>,
    claimed: BTreeSet<usize>,
}

impl ThreadPlan {
    fn is_free(&self, pos: usize, taken: &BTreeSet<usize>) -> bool {
        !self.claimed.contains(&pos) && !self.groups.contains_key(&pos) && !taken.contains(&pos)
    }

    /// Free positions matching the reply stubs of `parent`, ascending.
    fn resolve_stubs(
        &self,
        messages: &[Message],
        index: &IdentityIndex,
        parent: usize,
        taken: &BTreeSet<usize>,
    ) -> BTreeSet<usize> {
        let mut resolved = BTreeSet::new();
        for stub in messages[parent].record.reply_refs() {
            let Some(key) = ThreadKey::from_ref(stub) else {
                continue;
            };
            resolved.extend(
                index
                    .resolve(&key)
                    .iter()
                    .copied()
                    .filter(|&pos| pos != parent && self.is_free(pos, taken)),
            );
        }
        resolved
    }

    /// Replies of `parent` in order, each followed by its own nested replies.
    fn expand(
        &self,
        messages: &[Message],
        index: &IdentityIndex,
        parent: usize,
        taken: &mut BTreeSet<usize>,
        out: &mut Vec<usize>,
    ) {
        let resolved = self.resolve_stubs(messages, index, parent, taken);
        taken.extend(resolved.iter().copied());
        for pos in resolved {
            out.push(pos);
            if messages[pos].record.declares_replies() {
                self.expand(messages, index, pos, taken, out);
            }
        }
    }

    /// Single forward scan. A position ends up in at most one group, either as
    /// its root or as one of its replies. A reply that declares replies of its
    /// own pulls them into the same group, right after itself.
    fn scan(messages: &[Message], index: &IdentityIndex) -> Self {
        let mut plan = ThreadPlan::default();

        for (root, message) in messages.iter().enumerate() {
            if !message.record.declares_replies() || plan.claimed.contains(&root) {
                continue;
            }

            let mut taken = BTreeSet::from([root]);
            let mut replies = Vec::new();
            plan.expand(messages, index, root, &mut taken, &mut replies);
            if replies.is_empty() {
                continue;
            }

            plan.claimed.extend(replies.iter().copied());
            plan.groups.insert(root, replies);
        }

        plan
    }
}

/// Splice every resolved thread reply directly under its root.
///
/// Works in place on positions recorded during one forward scan: replies are
/// vacated in descending position order, groups are re-inserted in descending
/// root order so earlier roots never shift, and vacated slots are compacted
/// at the end. Messages without reply markers keep their relative order.
pub fn assemble(
    messages: Vec<Message>,
    index: &IdentityIndex,
    thread_note: bool,
) -> (Vec<Message>, AssemblyStats) {
    let plan = ThreadPlan::scan(&messages, index);
    if plan.groups.is_empty() {
        return (messages, AssemblyStats::default());
    }

    let mut slots: Vec<Slot> = messages.into_iter().map(Slot::Live).collect();

    let mut vacated: BTreeMap<usize, Message> = BTreeMap::new();
    for &pos in plan.claimed.iter().rev() {
        if let Some(message) = slots[pos].take() {
            vacated.insert(pos, message);
        }
    }

    let mut stats = AssemblyStats::default();
    for (&root, reply_positions) in plan.groups.iter().rev() {
        let mut replies = Vec::with_capacity(reply_positions.len());
        for pos in reply_positions {
            let Some(mut reply) = vacated.remove(pos) else {
                continue;
            };
            reply.annotate_thread_reply(thread_note);
            replies.push(Slot::Live(reply));
        }
        stats.threads += 1;
        stats.replies += replies.len();
        slots.splice(root + 1..root + 1, replies);
    }

    let out = slots.into_iter().filter_map(Slot::into_message).collect();
    (out, stats)
}
