use crate::archive::record::{Message, parse_ts};
use crate::error::ReaderError;
use anyhow::Result;
use chrono::{Duration, Local, NaiveDate, NaiveDateTime, TimeZone};
use chrono_tz::Tz;
use std::collections::BTreeMap;

pub const SINCE_FORMAT: &str = "%Y-%m-%d";

pub fn parse_since(raw: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), SINCE_FORMAT).map_err(|err| {
        ReaderError::InvalidConfig(format!("since `{raw}` is not YYYY-MM-DD: {err}")).into()
    })
}

pub fn parse_timezone(raw: &str) -> Result<Tz> {
    raw.trim()
        .parse::<Tz>()
        .map_err(|_| ReaderError::InvalidConfig(format!("unknown timezone `{raw}`")).into())
}

/// First instant at or after `start` that exists in `tz`, as epoch seconds.
/// Steps over a DST gap one minute at a time.
fn first_existing_instant<Z: TimeZone>(tz: &Z, start: NaiveDateTime) -> Option<i64> {
    (0..=24 * 60).find_map(|minutes| {
        tz.from_local_datetime(&(start + Duration::minutes(minutes)))
            .earliest()
            .map(|dt| dt.timestamp())
    })
}

/// Epoch seconds of local midnight at the start of `since`, in `tz` or the
/// system zone when unset. When midnight falls in a DST gap the day starts
/// at the first instant after it.
pub fn cutoff_epoch(since: NaiveDate, tz: Option<Tz>) -> Result<f64> {
    let midnight = since
        .and_hms_opt(0, 0, 0)
        .ok_or_else(|| ReaderError::InvalidConfig(format!("no midnight for {since}")))?;
    let secs = match tz {
        Some(tz) => first_existing_instant(&tz, midnight),
        None => first_existing_instant(&Local, midnight),
    }
    .ok_or_else(|| ReaderError::InvalidConfig(format!("start of {since} does not exist locally")))?;
    Ok(secs as f64)
}

fn in_window(message: &Message, cutoff: Option<f64>) -> bool {
    let Some(cutoff) = cutoff else {
        return true;
    };
    let ts = message.ts().and_then(parse_ts).unwrap_or(0.0);
    ts >= cutoff
}

/// Positions of every root+replies group to drop from one assembled sequence.
///
/// A group is judged when it closes (next root, or end of sequence) by the
/// window status of the last message evaluated before closing.
fn doomed_positions(messages: &mut [Message], cutoff: Option<f64>) -> Vec<usize> {
    let mut doomed = Vec::new();
    let mut open_group: Vec<usize> = Vec::new();
    let mut last_in_window = false;

    for (pos, message) in messages.iter_mut().enumerate() {
        let recent = in_window(message, cutoff);
        if !recent {
            message.is_recent = false;
        }

        if message.is_thread_reply {
            open_group.push(pos);
        } else {
            if !last_in_window {
                doomed.append(&mut open_group);
            }
            open_group = vec![pos];
        }

        last_in_window = recent;
    }

    if !last_in_window {
        doomed.append(&mut open_group);
    }
    doomed
}

pub fn filter_sequence(mut messages: Vec<Message>, cutoff: Option<f64>) -> Vec<Message> {
    let doomed = doomed_positions(&mut messages, cutoff);
    if doomed.is_empty() {
        return messages;
    }

    let mut keep = vec![true; messages.len()];
    for pos in doomed {
        keep[pos] = false;
    }
    messages
        .into_iter()
        .zip(keep)
        .filter_map(|(message, keep)| keep.then_some(message))
        .collect()
}

/// Apply the window to every conversation and drop the ones left empty.
pub fn filter_timeframe(
    conversations: BTreeMap<String, Vec<Message>>,
    cutoff: Option<f64>,
) -> BTreeMap<String, Vec<Message>> {
    conversations
        .into_iter()
        .filter_map(|(name, messages)| {
            let before = messages.len();
            let kept = filter_sequence(messages, cutoff);
            tracing::debug!(conversation = %name, before, after = kept.len(), "timeframe window applied");
            (!kept.is_empty()).then_some((name, kept))
        })
        .collect()
}
