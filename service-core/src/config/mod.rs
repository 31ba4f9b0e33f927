use crate::error::AppError;
use config::{Config as Cfg, Environment, File};
use serde::Deserialize;

/// Server settings shared by every service binary.
///
/// Keys are read case-insensitively from the optional `configuration` file and
/// the process environment, e.g. `API_PORT=9000` or `ALLOWED_ORIGINS=a,b`.
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    #[serde(default = "default_host")]
    pub api_host: String,
    #[serde(default = "default_port")]
    pub api_port: u16,
    #[serde(default = "default_debug")]
    pub debug: bool,
    #[serde(default = "default_allowed_origins")]
    pub allowed_origins: Vec<String>,
    #[serde(default)]
    pub log_level: Option<String>,
    #[serde(default)]
    pub otlp_endpoint: Option<String>,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8000
}

fn default_debug() -> bool {
    true
}

fn default_allowed_origins() -> Vec<String> {
    vec!["*".to_string()]
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_host: default_host(),
            api_port: default_port(),
            debug: default_debug(),
            allowed_origins: default_allowed_origins(),
            log_level: None,
            otlp_endpoint: None,
        }
    }
}

impl Config {
    pub fn load() -> Result<Self, AppError> {
        dotenvy::dotenv().ok();
        Self::from_environment(Environment::default())
    }

    /// Builds the config from an explicit environment source; `load` passes the process env.
    pub fn from_environment(env: Environment) -> Result<Self, AppError> {
        let config = Cfg::builder()
            .add_source(File::with_name("configuration").required(false))
            .add_source(
                env.try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("allowed_origins"),
            )
            .build()?;

        Ok(config.try_deserialize()?)
    }

    /// Filter directive used when `RUST_LOG` is not set.
    pub fn log_level(&self) -> &str {
        match &self.log_level {
            Some(level) => level,
            None if self.debug => "debug",
            None => "info",
        }
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.api_host, self.api_port)
    }
}
