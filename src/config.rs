use std::{fs::read_to_string, path::PathBuf, time::Duration};

use jiff::tz::TimeZone;
use serde::Deserialize;
use thiserror::Error;

const APP_NAME: &str = "focused-todo";
const BACKEND_URL_ENV: &str = "BACKEND_URL";

pub const DEFAULT_BACKEND_URL: &str = "http://localhost:8080";
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Could not parse config at {path:?}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Unknown time zone '{name}': {source}")]
    TimeZone {
        name: String,
        #[source]
        source: jiff::Error,
    },

    #[error("OS data directory could not be determined, set session_path in the config file")]
    NoDataDir,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub backend_url: String,
    pub timeout: Duration,
    pub session_path: PathBuf,
    pub time_zone: TimeZone,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct PartialConfig {
    backend_url: Option<String>,
    timeout_secs: Option<u64>,
    session_path: Option<PathBuf>,
    time_zone: Option<String>,
}

pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_local_dir().map(|dir| dir.join(APP_NAME).join("config.toml"))
}

/// Reads the config file, if any, and fills in defaults.
///
/// A missing file is not an error; a malformed one is. `BACKEND_URL` in the
/// environment wins over the file.
pub fn load_config(config_path: Option<PathBuf>) -> Result<Config, ConfigError> {
    let partial = match config_path.or_else(default_config_path) {
        Some(path) => {
            log::debug!("Reading configuration at path {:?}", &path);
            match read_to_string(&path) {
                Ok(contents) => toml::from_str(&contents)
                    .map_err(|source| ConfigError::Parse { path, source })?,
                Err(err) => {
                    log::trace!(
                        "Could not read path {path:?} (assuming no config file set yet) {err}"
                    );
                    PartialConfig::default()
                }
            }
        }
        None => PartialConfig::default(),
    };

    resolve(partial, std::env::var(BACKEND_URL_ENV).ok())
}

fn resolve(partial: PartialConfig, env_backend_url: Option<String>) -> Result<Config, ConfigError> {
    let backend_url = env_backend_url
        .filter(|url| !url.trim().is_empty())
        .or(partial.backend_url)
        .unwrap_or_else(|| DEFAULT_BACKEND_URL.to_string());
    log::trace!("Config: backend_url is {backend_url}");

    let timeout = Duration::from_secs(partial.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS));

    let session_path = match partial.session_path {
        Some(path) => path,
        None => dirs::data_local_dir()
            .map(|dir| dir.join(APP_NAME).join("session.json"))
            .ok_or(ConfigError::NoDataDir)?,
    };
    log::trace!("Config: session_path is {:?}", &session_path);

    let time_zone = match partial.time_zone {
        Some(name) => {
            TimeZone::get(&name).map_err(|source| ConfigError::TimeZone { name, source })?
        }
        None => TimeZone::system(),
    };

    Ok(Config {
        backend_url,
        timeout,
        session_path,
        time_zone,
    })
}
