//! Settings read from the environment.

use std::fmt;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::str::FromStr;
use std::time::Duration;

use farmhand_openai_model::{OpenAIConfig, OpenAIConfigBuilder};
use thiserror::Error;

use crate::AgentSettings;
use crate::api::HttpFarmApi;
use crate::session::DEFAULT_FARM_API_URL;

const DEFAULT_MODEL: &str = "gpt-4o";
const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
const DEFAULT_HOST: IpAddr = IpAddr::V4(Ipv4Addr::UNSPECIFIED);
const DEFAULT_PORT: u16 = 8000;

/// Errors of reading the configuration.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// A required variable is not set.
    #[error("{0} environment variable is not set")]
    Missing(&'static str),
    /// A variable is set to a value that doesn't parse.
    #[error("invalid value for {key}: {value:?}")]
    Invalid {
        /// The variable name.
        key: &'static str,
        /// The offending value.
        value: String,
    },
}

/// Application configuration.
#[derive(Clone, PartialEq, Eq)]
pub struct Config {
    /// Key of the model provider.
    pub openai_api_key: String,
    /// Model name.
    pub openai_model: String,
    /// Base URL of the model provider.
    pub openai_base_url: String,
    /// Base URL of the farm REST API.
    pub farm_api_url: String,
    /// Timeout of each farm API call.
    pub farm_api_timeout: Duration,
    /// Address the HTTP server listens on.
    pub host: IpAddr,
    /// Port the HTTP server listens on.
    pub port: u16,
    /// Origins allowed to call the HTTP server. Empty allows any origin.
    pub cors_allowed_origins: Vec<String>,
    /// Limits of each conversation turn.
    pub agent: AgentSettings,
}

impl Config {
    /// Reads the configuration from the process environment, after loading
    /// a `.env` file if there is one.
    pub fn from_env() -> Result<Self, ConfigError> {
        match dotenvy::dotenv() {
            Ok(path) => debug!(path = %path.display(), "loaded .env"),
            Err(err) if err.not_found() => {}
            Err(err) => warn!("failed to load .env: {err}"),
        }
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads the configuration through `lookup`, which returns the value
    /// of a variable if it's set.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let vars = Vars(lookup);
        let defaults = AgentSettings::default();
        Ok(Self {
            openai_api_key: vars
                .get("OPENAI_API_KEY")
                .ok_or(ConfigError::Missing("OPENAI_API_KEY"))?,
            openai_model: vars.string_or("OPENAI_MODEL", DEFAULT_MODEL),
            openai_base_url: vars
                .string_or("OPENAI_BASE_URL", DEFAULT_OPENAI_BASE_URL),
            farm_api_url: vars.string_or("FARM_API_URL", DEFAULT_FARM_API_URL),
            farm_api_timeout: Duration::from_secs(
                vars.parse_or("FARM_API_TIMEOUT_SECS", 15)?,
            ),
            host: vars.parse_or("HOST", DEFAULT_HOST)?,
            port: vars.parse_or("PORT", DEFAULT_PORT)?,
            cors_allowed_origins: vars
                .get("CORS_ALLOWED_ORIGINS")
                .map(|origins| {
                    origins
                        .split(',')
                        .map(str::trim)
                        .filter(|origin| !origin.is_empty())
                        .map(str::to_owned)
                        .collect()
                })
                .unwrap_or_default(),
            agent: AgentSettings {
                history_limit: vars
                    .parse_or("CHAT_HISTORY_LIMIT", defaults.history_limit)?,
                max_rounds: vars
                    .parse_or("CHAT_MAX_ROUNDS", defaults.max_rounds)?,
                max_result_length: vars.parse_or(
                    "TOOL_RESULT_MAX_LENGTH",
                    defaults.max_result_length,
                )?,
            },
        })
    }

    /// Returns the configuration of the model provider.
    pub fn openai_config(&self) -> OpenAIConfig {
        OpenAIConfigBuilder::with_api_key(&self.openai_api_key)
            .with_model(&self.openai_model)
            .with_base_url(&self.openai_base_url)
            .build()
    }

    /// Returns a client of the configured farm API.
    pub fn farm_api(&self) -> HttpFarmApi {
        HttpFarmApi::new(&self.farm_api_url)
            .with_timeout(self.farm_api_timeout)
    }

    /// Returns the address the HTTP server listens on.
    #[inline]
    pub fn listen_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("openai_model", &self.openai_model)
            .field("openai_base_url", &self.openai_base_url)
            .field("farm_api_url", &self.farm_api_url)
            .field("farm_api_timeout", &self.farm_api_timeout)
            .field("host", &self.host)
            .field("port", &self.port)
            .field("cors_allowed_origins", &self.cors_allowed_origins)
            .field("agent", &self.agent)
            .finish_non_exhaustive()
    }
}

struct Vars<F>(F);

impl<F: Fn(&str) -> Option<String>> Vars<F> {
    /// Returns a variable, treating blank values as unset.
    fn get(&self, key: &str) -> Option<String> {
        (self.0)(key)
            .map(|value| value.trim().to_owned())
            .filter(|value| !value.is_empty())
    }

    fn string_or(&self, key: &str, default: &str) -> String {
        self.get(key).unwrap_or_else(|| default.to_owned())
    }

    fn parse_or<T: FromStr>(
        &self,
        key: &'static str,
        default: T,
    ) -> Result<T, ConfigError> {
        match self.get(key) {
            Some(value) => value
                .parse()
                .map_err(|_| ConfigError::Invalid { key, value }),
            None => Ok(default),
        }
    }
}
