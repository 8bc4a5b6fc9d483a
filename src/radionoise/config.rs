use crate::error::RadionoiseError;
use crate::logging::LogLevel;
use crate::radionoise::glob_escape::GLOB_METACHARACTERS;
use anyhow::{Result, anyhow};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

include!(concat!(env!("OUT_DIR"), "/env_allowlist.rs"));

const ENV_PREFIX: &str = "RADIONOISE_";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TransmissionConfig {
    pub url: String,
    pub username: Option<String>,
    pub password: Option<String>,
    pub timeout_secs: u64,
}

impl Default for TransmissionConfig {
    fn default() -> Self {
        Self {
            url: "http://127.0.0.1:9091/transmission/rpc".to_string(),
            username: None,
            password: None,
            timeout_secs: 30,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub path: PathBuf,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        let base = dirs::data_dir().unwrap_or_else(|| PathBuf::from("."));
        Self {
            path: base.join("radionoise").join("torrents.json"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RenamerConfig {
    /// Holding directory that staged content is copied into.
    pub unsorted: PathBuf,
    /// Sorting program; file paths are appended after `args`.
    pub command: String,
    pub args: Vec<String>,
}

impl Default for RenamerConfig {
    fn default() -> Self {
        Self {
            unsorted: dirs::home_dir()
                .map(|home| home.join("Unsorted"))
                .unwrap_or_default(),
            command: String::new(),
            args: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScopeConfig {
    pub scope_marker: String,
    pub extensions: Vec<String>,
}

impl Default for ScopeConfig {
    fn default() -> Self {
        Self {
            scope_marker: "anime".to_string(),
            extensions: vec!["mkv".to_string(), "avi".to_string(), "mp4".to_string()],
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: LogLevel,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub transmission: TransmissionConfig,
    pub database: DatabaseConfig,
    pub renamer: RenamerConfig,
    #[serde(rename = "radionoise")]
    pub scope: ScopeConfig,
    pub logging: LoggingConfig,
    /// `RADIONOISE_*` variables in the environment that nothing reads.
    #[serde(skip)]
    pub unknown_env_keys: Vec<String>,
}

impl Config {
    /// Advisory lock shared by every command, kept beside the record store.
    pub fn lock_path(&self) -> PathBuf {
        self.database
            .path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default()
            .join("radionoise.lock")
    }
}

fn env_non_empty(var: &str) -> Option<String> {
    match env::var(var) {
        Ok(v) if !v.trim().is_empty() => Some(v.trim().to_string()),
        _ => None,
    }
}

fn env_or_string(var: &str, fallback: &str) -> String {
    env_non_empty(var).unwrap_or_else(|| fallback.to_string())
}

fn env_or_optional(var: &str, fallback: Option<String>) -> Option<String> {
    env_non_empty(var).or(fallback)
}

fn env_or_path(var: &str, fallback: &Path) -> PathBuf {
    env_non_empty(var)
        .map(PathBuf::from)
        .unwrap_or_else(|| fallback.to_path_buf())
}

fn env_or_u64(var: &str, fallback: u64) -> u64 {
    match env::var(var) {
        Ok(v) => v.trim().parse::<u64>().ok().unwrap_or(fallback),
        Err(_) => fallback,
    }
}

fn env_or_csv(var: &str, fallback: &[String]) -> Vec<String> {
    match env::var(var) {
        Ok(v) => {
            let out = v
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(ToOwned::to_owned)
                .collect::<Vec<_>>();
            if out.is_empty() {
                fallback.to_vec()
            } else {
                out
            }
        }
        Err(_) => fallback.to_vec(),
    }
}

fn normalize_extensions(raw: &[String]) -> Vec<String> {
    let mut out = raw
        .iter()
        .map(|ext| ext.trim().trim_start_matches('.').to_ascii_lowercase())
        .filter(|ext| !ext.is_empty())
        .collect::<Vec<_>>();
    out.sort();
    out.dedup();
    out
}

fn validate(cfg: &Config) -> Result<()> {
    let invalid = |msg: String| anyhow!(RadionoiseError::InvalidConfig(msg));

    if cfg.transmission.url.trim().is_empty() {
        return Err(invalid("transmission.url cannot be empty".into()));
    }
    if cfg.transmission.timeout_secs == 0 {
        return Err(invalid("transmission.timeout_secs must be >= 1".into()));
    }
    if cfg.database.path.as_os_str().is_empty() {
        return Err(invalid("database.path cannot be empty".into()));
    }
    if cfg.renamer.unsorted.as_os_str().is_empty() {
        return Err(invalid("renamer.unsorted cannot be empty".into()));
    }
    if cfg.renamer.command.trim().is_empty() {
        return Err(invalid(
            "renamer.command must name the sorting program".into(),
        ));
    }
    if cfg.scope.scope_marker.is_empty() {
        return Err(invalid("radionoise.scope_marker cannot be empty".into()));
    }
    if cfg.scope.extensions.is_empty() {
        return Err(invalid(
            "radionoise.extensions needs at least one entry".into(),
        ));
    }
    for ext in &cfg.scope.extensions {
        if ext.contains(GLOB_METACHARACTERS) || ext.contains(['/', ',']) {
            return Err(invalid(format!(
                "radionoise.extensions entry `{ext}` contains a glob metacharacter or separator"
            )));
        }
    }
    Ok(())
}

fn resolve_config_path(explicit: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return Some(path.to_path_buf());
    }
    if let Some(custom) = env_non_empty("RADIONOISE_CONFIG_PATH") {
        return Some(PathBuf::from(custom));
    }

    let config_dir = dirs::config_dir()?;
    Some(config_dir.join("radionoise").join("config.toml"))
}

fn merge_file_config(base: &mut Config, explicit: Option<&Path>) -> Result<()> {
    let Some(path) = resolve_config_path(explicit) else {
        return Ok(());
    };
    if !path.exists() {
        if explicit.is_some() {
            return Err(anyhow!(RadionoiseError::InvalidConfig(format!(
                "{} does not exist",
                path.display()
            ))));
        }
        return Ok(());
    }

    let raw = fs::read_to_string(&path).map_err(|err| {
        RadionoiseError::InvalidConfig(format!("failed to read {}: {err}", path.display()))
    })?;
    let parsed: Config = toml::from_str(&raw).map_err(|err| {
        RadionoiseError::InvalidConfig(format!("failed to parse {}: {err}", path.display()))
    })?;
    *base = parsed;
    Ok(())
}

fn unknown_env_keys(present: impl Iterator<Item = String>, allowlist: &[&str]) -> Vec<String> {
    let mut out = present
        .filter(|key| key.starts_with(ENV_PREFIX))
        .filter(|key| !allowlist.contains(&key.as_str()))
        .collect::<Vec<_>>();
    out.sort();
    out
}

pub fn load_config(explicit: Option<&Path>) -> Result<Config> {
    let mut cfg = Config::default();
    merge_file_config(&mut cfg, explicit)?;

    cfg.transmission.url = env_or_string("RADIONOISE_TRANSMISSION_URL", &cfg.transmission.url);
    cfg.transmission.username = env_or_optional(
        "RADIONOISE_TRANSMISSION_USERNAME",
        cfg.transmission.username.take(),
    );
    cfg.transmission.password = env_or_optional(
        "RADIONOISE_TRANSMISSION_PASSWORD",
        cfg.transmission.password.take(),
    );
    cfg.transmission.timeout_secs = env_or_u64(
        "RADIONOISE_TRANSMISSION_TIMEOUT_SECS",
        cfg.transmission.timeout_secs,
    );
    cfg.database.path = env_or_path("RADIONOISE_DATABASE_PATH", &cfg.database.path);
    cfg.renamer.unsorted = env_or_path("RADIONOISE_UNSORTED_DIR", &cfg.renamer.unsorted);
    cfg.renamer.command = env_or_string("RADIONOISE_SORTER_COMMAND", &cfg.renamer.command);
    cfg.renamer.args = env_or_csv("RADIONOISE_SORTER_ARGS", &cfg.renamer.args);
    cfg.scope.scope_marker =
        env_or_string("RADIONOISE_SCOPE_MARKER", &cfg.scope.scope_marker);
    cfg.scope.extensions = normalize_extensions(&env_or_csv(
        "RADIONOISE_EXTENSIONS",
        &cfg.scope.extensions,
    ));
    if let Some(raw) = env_non_empty("RADIONOISE_LOG_LEVEL") {
        cfg.logging.level = LogLevel::parse(&raw).ok_or_else(|| {
            RadionoiseError::InvalidConfig(format!("unknown RADIONOISE_LOG_LEVEL `{raw}`"))
        })?;
    }

    cfg.unknown_env_keys = unknown_env_keys(env::vars().map(|(k, _)| k), GENERATED_ENV_ALLOWLIST);

    validate(&cfg)?;
    Ok(cfg)
}
