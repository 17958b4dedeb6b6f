//! Layered configuration (SPEC_FULL.md "Config"): a `LicensingConfig` loaded
//! from an optional file and overridden by `LICENSING__`-prefixed
//! environment variables, in the style of the workspace's own
//! `kernel::config::load_config`.

use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[licensing_derive::licensing_error]
pub enum ConfigError {
    #[error("config error{}: {source}", format_context(.context))]
    Config { source: config::ConfigError, context: Option<std::borrow::Cow<'static, str>> },
}

/// Settings that don't have a natural home as a CLI flag: DNS lookup
/// timeout, default log level, and the default basename/search roots when
/// none are given on the command line.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LicensingConfig {
    pub dns_timeout_secs: u64,
    pub log_level: String,
    pub name: String,
    pub search_paths: Vec<PathBuf>,
}

impl Default for LicensingConfig {
    fn default() -> Self {
        Self {
            dns_timeout_secs: 5,
            log_level: "info".to_owned(),
            name: "crypto".to_owned(),
            search_paths: vec![PathBuf::from(".")],
        }
    }
}

/// Loads a [`LicensingConfig`], layering an optional file under
/// `LICENSING__`-prefixed environment overrides (e.g. `LICENSING__DNS_TIMEOUT_SECS=10`).
pub fn load_config(path: Option<impl AsRef<Path>>) -> Result<LicensingConfig, ConfigError> {
    let mut builder = Config::builder().add_source(Config::try_from(&LicensingConfig::default())?);

    if let Some(path) = &path {
        builder = builder.add_source(File::from(path.as_ref()).required(false));
    } else {
        builder = builder.add_source(File::with_name("licensing").required(false));
    }

    let builder = builder.add_source(
        Environment::with_prefix("LICENSING").separator("__").convert_case(config::Case::Snake),
    );

    builder.build()?.try_deserialize().map_err(Into::into)
}
