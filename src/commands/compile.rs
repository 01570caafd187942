use anyhow::Result;

use crate::archive::config::ReaderConfig;
use crate::archive::reader::ConversationMap;
use crate::commands::{CommandReport, compile_archive};

#[derive(Debug, Clone, Default)]
pub struct CompileOptions {
    /// Also list every message (`<conversation> <ts> <text>`).
    pub show_messages: bool,
}

fn describe(report: &mut CommandReport, kind: &str, map: &ConversationMap, show_messages: bool) {
    report.detail(format!("{kind}.count={}", map.len()));
    for (name, messages) in map {
        let replies = messages.iter().filter(|m| m.is_thread_reply).count();
        report.detail(format!(
            "{kind}.{name} messages={} thread_replies={replies}",
            messages.len()
        ));
        if !show_messages {
            continue;
        }
        for message in messages {
            report.detail(format!(
                "{kind}.{name} ts={} user={} text={}",
                message.ts().unwrap_or("-"),
                message.user().unwrap_or("-"),
                message.text.replace('\n', " ")
            ));
        }
    }
}

pub fn run(cfg: ReaderConfig, opts: &CompileOptions) -> Result<CommandReport> {
    let mut report = CommandReport::new("compile");
    report.detail(format!("archive={}", cfg.archive_path()?.display()));

    let show_dms = cfg.show_dms;
    let compiled = compile_archive(cfg)?;
    report.detail(format!("slack_name={}", compiled.slack_name));

    describe(&mut report, "channel", &compiled.channels, opts.show_messages);
    describe(&mut report, "group", &compiled.groups, opts.show_messages);
    if show_dms {
        describe(&mut report, "dm", &compiled.dms, opts.show_messages);
        describe(&mut report, "mpim", &compiled.mpims, opts.show_messages);
        if !compiled.empty_dms.is_empty() {
            report.detail(format!("dm.empty={}", compiled.empty_dms.join(",")));
        }
    }

    if !compiled.unresolved_hidden.is_empty() {
        report.detail(format!(
            "hidden.unresolved={}",
            compiled.unresolved_hidden.join(",")
        ));
    }

    Ok(report)
}
