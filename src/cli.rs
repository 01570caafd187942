use anyhow::{Result, bail};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use crate::archive::config::{ConfigOverrides, load_config};
use crate::commands::{self, CommandReport};

#[derive(Parser)]
#[command(
    name = "sev",
    about = "Reconstruct thread-ordered conversations from a Slack export",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Compile every conversation and summarize the result.
    Compile {
        #[command(flatten)]
        reader: ReaderArgs,

        /// List every compiled message.
        #[arg(long)]
        messages: bool,

        /// Print the report as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Write the compiled conversations to one JSON document.
    Export {
        #[command(flatten)]
        reader: ReaderArgs,

        /// Destination file.
        #[arg(long, short)]
        output: PathBuf,

        /// Directory of downloaded files and images to link by URL.
        #[arg(long)]
        resources_dir: Option<PathBuf>,

        /// Print the report as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Check the archive layout and the active configuration.
    Status {
        #[command(flatten)]
        reader: ReaderArgs,

        /// Print the report as JSON.
        #[arg(long)]
        json: bool,
    },
}

#[derive(Args, Debug, Default)]
struct ReaderArgs {
    /// Unpacked export directory.
    #[arg(long, short = 'z')]
    archive: Option<PathBuf>,

    /// Only these channels (comma-separated).
    #[arg(long, value_delimiter = ',')]
    channels: Option<Vec<String>>,

    /// Channel or group names to leave out (comma-separated).
    #[arg(long, value_delimiter = ',')]
    hide_channels: Option<Vec<String>>,

    /// Drop thread groups older than this date (YYYY-MM-DD).
    #[arg(long)]
    since: Option<String>,

    /// IANA time zone used to read --since.
    #[arg(long)]
    timezone: Option<String>,

    /// Include direct and group messages.
    #[arg(long, overrides_with = "no_dms")]
    show_dms: bool,

    /// Leave direct and group messages out.
    #[arg(long, overrides_with = "show_dms")]
    no_dms: bool,

    /// Prefix spliced replies with the thread reply marker.
    #[arg(long, overrides_with = "no_thread_note")]
    thread_note: bool,

    /// Keep reply text unchanged.
    #[arg(long, overrides_with = "thread_note")]
    no_thread_note: bool,

    /// Drop join/leave notices before threading.
    #[arg(long)]
    skip_channel_member_change: bool,
}

fn flag_pair(on: bool, off: bool) -> Option<bool> {
    match (on, off) {
        (true, _) => Some(true),
        (_, true) => Some(false),
        _ => None,
    }
}

impl ReaderArgs {
    fn into_overrides(self) -> ConfigOverrides {
        ConfigOverrides {
            archive: self.archive,
            channels: self.channels,
            hide_channels: self.hide_channels,
            show_dms: flag_pair(self.show_dms, self.no_dms),
            thread_note: flag_pair(self.thread_note, self.no_thread_note),
            skip_channel_member_change: self.skip_channel_member_change.then_some(true),
            since: self.since,
            timezone: self.timezone,
        }
    }
}

fn print_report(report: &CommandReport, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(report)?);
        return Ok(());
    }

    println!("{}: {}", report.command, if report.ok { "ok" } else { "failed" });
    for detail in &report.details {
        println!("  {detail}");
    }
    for issue in &report.issues {
        println!("  issue: {issue}");
    }
    Ok(())
}

pub fn run() -> Result<()> {
    let cli = Cli::parse();

    let (report, json) = match cli.command {
        Command::Compile {
            reader,
            messages,
            json,
        } => {
            let cfg = load_config(reader.into_overrides())?;
            let opts = commands::compile::CompileOptions {
                show_messages: messages,
            };
            (commands::compile::run(cfg, &opts)?, json)
        }
        Command::Export {
            reader,
            output,
            resources_dir,
            json,
        } => {
            let cfg = load_config(reader.into_overrides())?;
            let opts = commands::export::ExportOptions {
                output,
                resources_dir,
            };
            (commands::export::run(cfg, &opts)?, json)
        }
        Command::Status { reader, json } => {
            let cfg = load_config(reader.into_overrides())?;
            (commands::status::run(&cfg)?, json)
        }
    };

    print_report(&report, json)?;
    if !report.ok {
        bail!("{} reported {} issue(s)", report.command, report.issues.len());
    }
    Ok(())
}
