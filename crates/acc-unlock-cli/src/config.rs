use std::{
    fs,
    path::{Path, PathBuf},
};

use acc_unlock_aps::ApsConfig;
use acc_unlock_core::{
    classify::ClassifyErrorPolicy, orchestrator::RunOptions, walker::FolderErrorPolicy,
};
use color_eyre::Result;
use dirs::config_dir;
use serde::{Deserialize, Serialize};

use crate::cli::RunArgs;

pub const ENV_CLIENT_ID: &str = "ACC_UNLOCK_CLIENT_ID";
pub const ENV_CLIENT_SECRET: &str = "ACC_UNLOCK_CLIENT_SECRET";
pub const ENV_USER_ID: &str = "ACC_UNLOCK_USER_ID";

/// User-level configuration loaded from `~/.config/acc-unlock/config.toml` (platform-specific).
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq, Eq)]
pub struct Config {
    #[serde(default)]
    pub aps: ApsSection,
    #[serde(default)]
    pub run: RunSection,
}

/// Connection settings; every field may also come from the environment or keyring.
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq, Eq)]
pub struct ApsSection {
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    pub account_id: Option<String>,
    pub project_id: Option<String>,
    pub base_url: Option<String>,
    pub scope: Option<String>,
    pub request_timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq, Eq)]
pub struct RunSection {
    /// Admin user id the unlocks are attributed to.
    pub user_id: Option<String>,
    #[serde(default)]
    pub dry_run: bool,
    pub unlock_concurrency: Option<usize>,
    #[serde(default)]
    pub on_classify_error: ClassifyErrorPolicy,
    #[serde(default)]
    pub on_folder_error: FolderErrorPolicy,
}

/// Load config from the default path; if missing, return defaults.
pub fn load() -> Result<Config> {
    let path = default_path()?;
    load_from_path(path)
}

/// Load config from a given path; if missing or empty, return defaults.
pub fn load_from_path(path: impl AsRef<Path>) -> Result<Config> {
    let path = path.as_ref();
    if !path.exists() {
        return Ok(Config::default());
    }
    let contents = fs::read_to_string(path)?;
    if contents.trim().is_empty() {
        return Ok(Config::default());
    }
    let cfg: Config = toml::from_str(&contents)?;
    Ok(cfg)
}

/// Resolve the default config path (platform aware).
pub fn default_path() -> Result<PathBuf> {
    let base = config_dir().ok_or_else(|| color_eyre::eyre::eyre!("no config dir available"))?;
    Ok(base.join("acc-unlock").join("config.toml"))
}

/// Write the config to `path` unless a file is already there.
pub fn write_if_missing(config: &Config, path: &Path) -> Result<PathBuf> {
    if path.exists() {
        return Ok(path.to_path_buf());
    }
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let body = toml::to_string_pretty(config)?;
    fs::write(path, body)?;
    Ok(path.to_path_buf())
}

pub fn write_default_if_missing(config: &Config) -> Result<PathBuf> {
    write_if_missing(config, &default_path()?)
}

/// Client id from config, falling back to the environment.
pub fn resolve_client_id(cfg: &Config, env: impl Fn(&str) -> Option<String>) -> Option<String> {
    cfg.aps.client_id.clone().or_else(|| env(ENV_CLIENT_ID))
}

/// Build the APS settings. The secret is looked up in config, then the
/// environment, then `stored_secret` (keyed by client id).
pub fn resolve_aps(
    cfg: &Config,
    env: impl Fn(&str) -> Option<String>,
    stored_secret: impl Fn(&str) -> Option<String>,
) -> Result<ApsConfig> {
    let client_id = resolve_client_id(cfg, &env)
        .ok_or_else(|| missing("aps.client_id", Some(ENV_CLIENT_ID)))?;
    let client_secret = cfg
        .aps
        .client_secret
        .clone()
        .or_else(|| env(ENV_CLIENT_SECRET))
        .or_else(|| stored_secret(&client_id))
        .ok_or_else(|| missing("aps.client_secret", Some(ENV_CLIENT_SECRET)))?;
    let account_id = cfg
        .aps
        .account_id
        .clone()
        .ok_or_else(|| missing("aps.account_id", None))?;
    let project_id = cfg
        .aps
        .project_id
        .clone()
        .ok_or_else(|| missing("aps.project_id", None))?;

    Ok(ApsConfig {
        client_id,
        client_secret,
        account_id,
        project_id,
        base_url: cfg.aps.base_url.clone(),
        scope: cfg.aps.scope.clone(),
        request_timeout_secs: cfg.aps.request_timeout_secs,
    })
}

/// Command-line flags win over the config file.
pub fn resolve_user_id(
    cfg: &Config,
    args: &RunArgs,
    env: impl Fn(&str) -> Option<String>,
) -> Result<String> {
    args.user_id
        .clone()
        .or_else(|| cfg.run.user_id.clone())
        .or_else(|| env(ENV_USER_ID))
        .ok_or_else(|| missing("run.user_id", Some(ENV_USER_ID)))
}

pub fn run_options(cfg: &Config, args: &RunArgs) -> RunOptions {
    let defaults = RunOptions::default();
    RunOptions {
        on_classify_error: cfg.run.on_classify_error,
        on_folder_error: if args.skip_failed_folders {
            FolderErrorPolicy::Skip
        } else {
            cfg.run.on_folder_error
        },
        unlock_concurrency: args
            .concurrency
            .or(cfg.run.unlock_concurrency)
            .unwrap_or(defaults.unlock_concurrency),
        dry_run: args.dry_run || cfg.run.dry_run,
    }
}

fn missing(key: &str, env: Option<&str>) -> color_eyre::eyre::Report {
    match env {
        Some(var) => color_eyre::eyre::eyre!("missing `{key}`: set it in the config file or via {var}"),
        None => color_eyre::eyre::eyre!("missing `{key}` in the config file"),
    }
}
