use std::{env, io, path::PathBuf};

use rocket::figment::{
    providers::{Env, Format, Toml},
    Figment, Profile,
};
use serde::{Deserialize, Deserializer, Serialize};
use shared::{validate_options, VoteOptions, VoteSettings};
use tracing::info;

use crate::error::ConfigError;

pub const DEFAULT_CONFIG_PATH: &str = "Vote.toml";
pub const DEFAULT_REDIS_URL: &str = "redis://localhost:6380";
pub const DEFAULT_ADDRESS: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 5000;

/// Environment variables that override keys of the same (lowercased) name
/// in the config file.
pub const ENV_OVERRIDES: [&str; 7] = [
    "VOTE1VALUE",
    "VOTE2VALUE",
    "TITLE",
    "SHOWHOST",
    "INSTRUMENTATION_KEY",
    "REDIS_URL",
    "STORE",
];

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    #[default]
    Redis,
    Memory,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    pub vote1value: String,
    pub vote2value: String,
    pub title: String,
    #[serde(default, deserialize_with = "flag")]
    pub showhost: bool,
    #[serde(default)]
    pub instrumentation_key: Option<String>,
    #[serde(default = "default_redis_url")]
    pub redis_url: String,
    #[serde(default)]
    pub store: StoreBackend,
}

fn default_redis_url() -> String {
    DEFAULT_REDIS_URL.to_string()
}

/// Accepts a TOML boolean or the string `"true"`; any other string is off.
fn flag<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Flag {
        Bool(bool),
        Text(String),
    }

    Ok(match Flag::deserialize(deserializer)? {
        Flag::Bool(b) => b,
        Flag::Text(s) => s == "true",
    })
}

pub fn config_path() -> PathBuf {
    env::var("VOTE_CONFIG")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG_PATH))
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        let path = config_path();
        info!("Loading configuration from {}", path.display());
        Self::from_sources(Toml::file(path), |key| env::var(key).ok())
    }

    /// Builds the config from a file provider plus an environment lookup.
    /// An environment value always wins over the file.
    pub fn from_sources<F>(file: impl rocket::figment::Provider, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut figment = Figment::new().merge(file);

        for key in ENV_OVERRIDES {
            if let Some(value) = lookup(key) {
                info!("{} set in environment, overriding config file", key);
                figment = figment.merge((key.to_lowercase(), value));
            }
        }

        Ok(figment.extract()?)
    }

    pub fn options(&self) -> VoteOptions {
        VoteOptions::new(self.vote1value.clone(), self.vote2value.clone())
    }

    /// Produces the immutable settings handed to the vote processor.
    pub fn resolve_settings<H>(&self, hostname: H) -> Result<VoteSettings, ConfigError>
    where
        H: FnOnce() -> io::Result<String>,
    {
        let options = self.options();
        validate_options(&options)?;

        let title = if self.showhost {
            let host = hostname()?;
            info!("SHOWHOST enabled, using hostname {} as title", host);
            host
        } else {
            self.title.clone()
        };

        Ok(VoteSettings { options, title })
    }
}

pub fn system_hostname() -> io::Result<String> {
    Ok(hostname::get()?.to_string_lossy().into_owned())
}

/// Rocket's server figment with this service's default bind address.
/// `Rocket.toml` and `ROCKET_*` variables still take precedence.
pub fn server_figment() -> Figment {
    Figment::from(rocket::Config::default())
        .merge(("address", DEFAULT_ADDRESS))
        .merge(("port", DEFAULT_PORT))
        .merge(Toml::file(Env::var_or("ROCKET_CONFIG", "Rocket.toml")).nested())
        .merge(Env::prefixed("ROCKET_").ignore(&["PROFILE"]).global())
        .select(Profile::from_env_or("ROCKET_PROFILE", rocket::Config::DEFAULT_PROFILE))
}
