use std::time::Duration;

use crate::error::ConfigError;
use crate::message::APP_LINK_MESSAGE;

pub const DEFAULT_INSTANCE_NAME: &str = "com.marquis.editor.instance";
/// Class the main window registers under; the forwarder looks it up by this name.
pub const MAIN_WINDOW_CLASS: &str = "FLUTTER_RUNNER_WIN32_WINDOW";
pub const DEFAULT_SEND_TIMEOUT: Duration = Duration::from_millis(2000);
const MAX_SEND_TIMEOUT_MS: u64 = 60_000;

pub const ENV_INSTANCE_NAME: &str = "MARQUIS_INSTANCE_NAME";
pub const ENV_SEND_TIMEOUT_MS: &str = "MARQUIS_SEND_TIMEOUT_MS";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunnerConfig {
    pub instance_name: String,
    pub window_class: String,
    pub message_tag: usize,
    pub send_timeout: Duration,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            instance_name: DEFAULT_INSTANCE_NAME.to_owned(),
            window_class: MAIN_WINDOW_CLASS.to_owned(),
            message_tag: APP_LINK_MESSAGE,
            send_timeout: DEFAULT_SEND_TIMEOUT,
        }
    }
}

impl RunnerConfig {
    /// Defaults plus `MARQUIS_*` environment overrides.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Like [`RunnerConfig::from_env`] with a custom variable source. Bad
    /// values are logged and skipped; they never abort startup.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut cfg = Self::default();
        if let Some(raw) = lookup(ENV_INSTANCE_NAME) {
            match parse_instance_name(&raw) {
                Ok(name) => cfg.instance_name = name,
                Err(e) => log::warn!("ignoring override: {e}"),
            }
        }
        if let Some(raw) = lookup(ENV_SEND_TIMEOUT_MS) {
            match parse_timeout_ms(&raw) {
                Ok(t) => cfg.send_timeout = t,
                Err(e) => log::warn!("ignoring override: {e}"),
            }
        }
        cfg
    }
}

fn parse_instance_name(raw: &str) -> Result<String, ConfigError> {
    let name = raw.trim();
    if name.is_empty() {
        return Err(ConfigError::Empty {
            key: ENV_INSTANCE_NAME,
        });
    }
    // 内核对象名不能包含反斜杠（命名空间前缀除外）
    if name.contains('\\') && !(name.starts_with("Local\\") || name.starts_with("Global\\")) {
        return Err(ConfigError::Invalid {
            key: ENV_INSTANCE_NAME,
            value: raw.to_owned(),
            reason: "backslash outside a Local\\ or Global\\ prefix".to_owned(),
        });
    }
    Ok(name.to_owned())
}

fn parse_timeout_ms(raw: &str) -> Result<Duration, ConfigError> {
    let invalid = |reason: String| ConfigError::Invalid {
        key: ENV_SEND_TIMEOUT_MS,
        value: raw.to_owned(),
        reason,
    };
    let ms: u64 = raw.trim().parse().map_err(|e| invalid(format!("{e}")))?;
    if ms == 0 || ms > MAX_SEND_TIMEOUT_MS {
        return Err(invalid(format!("expected 1..={MAX_SEND_TIMEOUT_MS}")));
    }
    Ok(Duration::from_millis(ms))
}
