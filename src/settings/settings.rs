use anyhow::{Result, anyhow, bail};
use config::{Config, Environment, File, FileFormat};
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub auth: Auth,
    pub chat: Chat,
    pub forum: Forum,
    pub log: Log,
    pub session: SessionStorage,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Auth {
    pub base_url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Chat {
    pub endpoint: String,
    #[serde(default = "default_reconnect_delay_ms")]
    pub reconnect_delay_ms: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Forum {
    pub base_url: String,
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    #[serde(default = "default_limit")]
    pub default_limit: u32,
    pub post_limits: Vec<u32>,
    pub comment_limits: Vec<u32>,
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Log {
    pub filter: String,
    #[serde(default)]
    pub quiet_transports: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SessionStorage {
    pub backend: String, // "memory" or "file"
    #[serde(default)]
    pub path: Option<String>,
}

fn default_reconnect_delay_ms() -> u64 {
    3000
}

fn default_poll_interval_ms() -> u64 {
    5000
}

fn default_limit() -> u32 {
    5
}

fn default_request_timeout_ms() -> u64 {
    10_000
}

impl Settings {
    pub fn validate(&self) -> Result<()> {
        if self.chat.reconnect_delay_ms == 0 {
            bail!("chat.reconnect_delay_ms must be positive");
        }
        if self.forum.poll_interval_ms == 0 {
            bail!("forum.poll_interval_ms must be positive");
        }
        for (name, limits) in [
            ("forum.post_limits", &self.forum.post_limits),
            ("forum.comment_limits", &self.forum.comment_limits),
        ] {
            if limits.is_empty() || limits.contains(&0) {
                bail!("{name} must be a non-empty list of positive page sizes");
            }
            if !limits.contains(&self.forum.default_limit) {
                bail!(
                    "forum.default_limit {} is not one of {name} {:?}",
                    self.forum.default_limit,
                    limits
                );
            }
        }
        if self.session.backend == "file" && self.session.path.is_none() {
            bail!("session.path is required for the file backend");
        }
        Ok(())
    }
}

#[cfg(debug_assertions)]
const SETTINGS_PATH: &str = "settings/dev.toml";
#[cfg(not(debug_assertions))]
const SETTINGS_PATH: &str = "settings/release.toml";

const ENV_PREFIX: &str = "FORUM_SYNC";

/// Loads settings from a TOML file, then lets `FORUM_SYNC__SECTION__KEY`
/// environment variables override individual values.
pub fn parse_settings(path: Option<&str>) -> Result<Settings> {
    let path = path.unwrap_or(SETTINGS_PATH);

    let settings: Settings = Config::builder()
        .add_source(File::with_name(path))
        .add_source(
            Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        )
        .build()
        .map_err(|e| anyhow!(e))?
        .try_deserialize()
        .map_err(|e| anyhow!(e))?;

    settings.validate()?;
    Ok(settings)
}

pub fn parse_settings_str(toml: &str) -> Result<Settings> {
    let settings: Settings = Config::builder()
        .add_source(File::from_str(toml, FileFormat::Toml))
        .build()
        .map_err(|e| anyhow!(e))?
        .try_deserialize()
        .map_err(|e| anyhow!(e))?;

    settings.validate()?;
    Ok(settings)
}
