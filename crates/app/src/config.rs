use std::path::PathBuf;

use lumiere_cloud::CloudConfig;

/// Default location of the history store file.
const DEFAULT_HISTORY_PATH: &str = ".lumiere/history.json";

/// Default history store quota (5 MiB, the usual browser storage budget).
const DEFAULT_HISTORY_QUOTA_BYTES: usize = 5 * 1024 * 1024;

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Text,
    Json,
}

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// JSON file backing the history store.
    pub history_path: PathBuf,
    /// Byte quota of the history store.
    pub history_quota_bytes: usize,
    /// Log output format.
    pub log_format: LogFormat,
    /// Collaborator endpoints and credentials.
    pub cloud: CloudConfig,
}

impl AppConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                       | Default                    |
    /// |-------------------------------|----------------------------|
    /// | `LUMIERE_HISTORY_PATH`        | `.lumiere/history.json`    |
    /// | `LUMIERE_HISTORY_QUOTA_BYTES` | `5242880`                  |
    /// | `LOG_FORMAT`                  | `text` (`json` to switch)  |
    ///
    /// Collaborator variables are documented on [`CloudConfig::from_env`].
    pub fn from_env() -> anyhow::Result<Self> {
        let history_path = std::env::var("LUMIERE_HISTORY_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_HISTORY_PATH));

        let history_quota_bytes = match std::env::var("LUMIERE_HISTORY_QUOTA_BYTES") {
            Ok(raw) => raw.trim().parse().map_err(|_| {
                anyhow::anyhow!("LUMIERE_HISTORY_QUOTA_BYTES must be a byte count, got '{raw}'")
            })?,
            Err(_) => DEFAULT_HISTORY_QUOTA_BYTES,
        };

        let log_format = parse_log_format(std::env::var("LOG_FORMAT").ok().as_deref());

        Ok(Self {
            history_path,
            history_quota_bytes,
            log_format,
            cloud: CloudConfig::from_env(),
        })
    }
}

fn parse_log_format(raw: Option<&str>) -> LogFormat {
    match raw.map(str::trim) {
        Some(v) if v.eq_ignore_ascii_case("json") => LogFormat::Json,
        _ => LogFormat::Text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_format_parsing() {
        assert_eq!(parse_log_format(None), LogFormat::Text);
        assert_eq!(parse_log_format(Some("JSON")), LogFormat::Json);
        assert_eq!(parse_log_format(Some("pretty")), LogFormat::Text);
    }
}
