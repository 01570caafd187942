use crate::archive::timeframe::{cutoff_epoch, parse_since, parse_timezone};
use crate::error::ReaderError;
use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReaderConfig {
    pub archive: Option<PathBuf>,
    /// Restrict channels to these names. Empty means every channel.
    pub channels: Vec<String>,
    pub hide_channels: Vec<String>,
    pub show_dms: bool,
    pub thread_note: bool,
    pub skip_channel_member_change: bool,
    /// `YYYY-MM-DD`; whole thread groups older than this are dropped.
    pub since: Option<String>,
    /// IANA zone used to read `since`. System zone when unset.
    pub timezone: Option<String>,
}

impl Default for ReaderConfig {
    fn default() -> Self {
        Self {
            archive: None,
            channels: Vec::new(),
            hide_channels: Vec::new(),
            show_dms: true,
            thread_note: true,
            skip_channel_member_change: false,
            since: None,
            timezone: None,
        }
    }
}

/// Values given on the command line; `None` leaves the layered value alone.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub archive: Option<PathBuf>,
    pub channels: Option<Vec<String>>,
    pub hide_channels: Option<Vec<String>>,
    pub show_dms: Option<bool>,
    pub thread_note: Option<bool>,
    pub skip_channel_member_change: Option<bool>,
    pub since: Option<String>,
    pub timezone: Option<String>,
}

impl ReaderConfig {
    pub fn archive_path(&self) -> Result<PathBuf> {
        self.archive
            .clone()
            .ok_or_else(|| anyhow!(ReaderError::InvalidConfig("archive path not set".to_string())))
    }

    /// Window cutoff as epoch seconds, when `since` is configured.
    pub fn cutoff(&self) -> Result<Option<f64>> {
        let Some(raw) = self.since.as_deref() else {
            return Ok(None);
        };
        let date = parse_since(raw)?;
        let tz = self.timezone.as_deref().map(parse_timezone).transpose()?;
        Ok(Some(cutoff_epoch(date, tz)?))
    }

    fn apply(&mut self, overrides: ConfigOverrides) {
        if let Some(archive) = overrides.archive {
            self.archive = Some(archive);
        }
        if let Some(channels) = overrides.channels {
            self.channels = channels;
        }
        if let Some(hide) = overrides.hide_channels {
            self.hide_channels = hide;
        }
        if let Some(show_dms) = overrides.show_dms {
            self.show_dms = show_dms;
        }
        if let Some(thread_note) = overrides.thread_note {
            self.thread_note = thread_note;
        }
        if let Some(skip) = overrides.skip_channel_member_change {
            self.skip_channel_member_change = skip;
        }
        if overrides.since.is_some() {
            self.since = overrides.since;
        }
        if overrides.timezone.is_some() {
            self.timezone = overrides.timezone;
        }
    }
}

fn env_or_bool(var: &str, fallback: bool) -> bool {
    match env::var(var) {
        Ok(v) => match v.trim() {
            "1" | "true" | "TRUE" | "yes" | "on" => true,
            "0" | "false" | "FALSE" | "no" | "off" => false,
            _ => fallback,
        },
        Err(_) => fallback,
    }
}

fn env_non_empty(var: &str) -> Option<String> {
    match env::var(var) {
        Ok(v) if !v.trim().is_empty() => Some(v.trim().to_string()),
        _ => None,
    }
}

pub fn split_csv(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(ToOwned::to_owned)
        .collect()
}

fn env_or_csv(var: &str, fallback: &[String]) -> Vec<String> {
    match env::var(var) {
        Ok(v) => {
            let out = split_csv(&v);
            if out.is_empty() { fallback.to_vec() } else { out }
        }
        Err(_) => fallback.to_vec(),
    }
}

fn validate(cfg: &ReaderConfig) -> Result<()> {
    if let Some(archive) = &cfg.archive
        && archive.as_os_str().is_empty()
    {
        return Err(ReaderError::InvalidConfig("archive path is empty".to_string()).into());
    }
    if let Some(since) = cfg.since.as_deref() {
        parse_since(since)?;
    }
    if let Some(tz) = cfg.timezone.as_deref() {
        parse_timezone(tz)?;
    }
    Ok(())
}

/// `SEV_CONFIG_PATH`, else `<config dir>/sev/config.toml`.
pub fn resolve_config_path() -> Option<PathBuf> {
    if let Some(custom) = env_non_empty("SEV_CONFIG_PATH") {
        return Some(PathBuf::from(custom));
    }
    Some(dirs::config_dir()?.join("sev").join("config.toml"))
}

fn read_file_config(path: &Path) -> Result<ReaderConfig> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read sev config {}", path.display()))?;
    toml::from_str(&raw)
        .map_err(|err| anyhow!("failed to parse sev config {}: {err}", path.display()))
}

fn merge_file_config(base: &mut ReaderConfig) -> Result<()> {
    let Some(path) = resolve_config_path() else {
        return Ok(());
    };
    if !path.exists() {
        return Ok(());
    }

    *base = read_file_config(&path)?;
    Ok(())
}

fn merge_env(cfg: &mut ReaderConfig) {
    if let Some(archive) = env_non_empty("SEV_ARCHIVE") {
        cfg.archive = Some(PathBuf::from(archive));
    }
    cfg.channels = env_or_csv("SEV_CHANNELS", &cfg.channels);
    cfg.hide_channels = env_or_csv("SEV_HIDE_CHANNELS", &cfg.hide_channels);
    cfg.show_dms = env_or_bool("SEV_SHOW_DMS", cfg.show_dms);
    cfg.thread_note = env_or_bool("SEV_THREAD_NOTE", cfg.thread_note);
    cfg.skip_channel_member_change = env_or_bool(
        "SEV_SKIP_CHANNEL_MEMBER_CHANGE",
        cfg.skip_channel_member_change,
    );
    if let Some(since) = env_non_empty("SEV_SINCE") {
        cfg.since = Some(since);
    }
    if let Some(tz) = env_non_empty("SEV_TIMEZONE") {
        cfg.timezone = Some(tz);
    }
}

/// Defaults, then the TOML file, then `SEV_*` variables, then CLI overrides.
pub fn load_config(overrides: ConfigOverrides) -> Result<ReaderConfig> {
    let mut cfg = ReaderConfig::default();
    merge_file_config(&mut cfg)?;
    merge_env(&mut cfg);
    cfg.apply(overrides);

    validate(&cfg)?;
    Ok(cfg)
}
