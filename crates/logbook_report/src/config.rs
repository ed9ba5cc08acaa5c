use crate::error::ReportError;
use chrono::Weekday;
use logbook_client::config::Config;
use std::path::PathBuf;

#[derive(Clone, Debug)]
pub struct ReportConfig {
    pub logbook: Config,
    pub pages_dir: PathBuf,
    pub output_dir: PathBuf,
    /// Day every weekly window starts on.
    pub week_start: Weekday,
    /// Aggregate whatever was fetched even when the walk stopped early.
    pub allow_partial: bool,
}

impl ReportConfig {
    pub fn from_env() -> Result<Self, ReportError> {
        Self::from_env_with(|k| std::env::var(k).ok())
    }

    pub fn from_env_with<F>(mut get: F) -> Result<Self, ReportError>
    where
        F: FnMut(&str) -> Option<String>,
    {
        let logbook = Config::from_env_with(&mut get)?;
        let pages_dir = get("LOGBOOK_PAGES_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("data/pages"));
        let output_dir = get("LOGBOOK_OUTPUT_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("output"));
        let week_start = match get("LOGBOOK_WEEK_START") {
            Some(raw) => raw.trim().parse::<Weekday>().map_err(|_| {
                ReportError::Config(format!("LOGBOOK_WEEK_START: unknown weekday {raw:?}"))
            })?,
            None => Weekday::Sat,
        };
        let allow_partial = match get("LOGBOOK_ALLOW_PARTIAL") {
            Some(raw) => parse_flag(&raw).ok_or_else(|| {
                ReportError::Config(format!("LOGBOOK_ALLOW_PARTIAL: expected true/false, got {raw:?}"))
            })?,
            None => false,
        };
        Ok(Self {
            logbook,
            pages_dir,
            output_dir,
            week_start,
            allow_partial,
        })
    }
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" | "" => Some(false),
        _ => None,
    }
}
