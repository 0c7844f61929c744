//! Process-wide configuration, loaded once at start-up.
//!
//! Credentials come from the environment (optionally through `.env`); the
//! user profile and default model come from a JSON file.

use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
};

use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use crate::{Credentials, Error, Result};

pub const DEFAULT_CONFIG_PATH: &str = "config/default.json";

/// What the assistant is told about the user it is serving.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(transparent)]
pub struct UserProfile(BTreeMap<String, Value>);

impl UserProfile {
    /// Entries with string values unquoted.
    pub fn iter(&self) -> impl Iterator<Item = (&str, String)> {
        self.0.iter().map(|(key, value)| {
            let value = match value {
                Value::String(value) => value.clone(),
                other => other.to_string(),
            };
            (key.as_str(), value)
        })
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
struct ConfigFile {
    #[serde(default)]
    user_profile: UserProfile,
    #[serde(default)]
    model: Option<String>,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub credentials: Credentials,
    pub user_profile: UserProfile,
    /// Model used when a command does not name one.
    pub model: Option<String>,
}

impl Config {
    /// Loads `.env`, credentials and the config file.
    ///
    /// Without an explicit `path`, a missing `config/default.json` yields an
    /// empty profile; an explicit path must exist.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        dotenvy::dotenv().ok();

        let credentials = Credentials::from_env()?;
        let file = match path {
            Some(path) => read_config_file(path)?,
            None => {
                let default = PathBuf::from(DEFAULT_CONFIG_PATH);
                if default.exists() {
                    read_config_file(&default)?
                } else {
                    debug!("no config file at {DEFAULT_CONFIG_PATH}, using an empty profile");
                    ConfigFile::default()
                }
            }
        };

        Ok(Config {
            credentials,
            user_profile: file.user_profile,
            model: file.model,
        })
    }
}

fn read_config_file(path: &Path) -> Result<ConfigFile> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("cannot read {}: {e}", path.display())))?;
    serde_json::from_str(&text)
        .map_err(|e| Error::Config(format!("invalid config {}: {e}", path.display())))
}
