use crate::utils::get_config_dir;
use color_eyre::eyre;
use config::{Config, Environment, File};
use serde::Deserialize;
use std::path::PathBuf;

/// Loopback address used when running in development mode
pub const DEFAULT_DEV_ADDRESS: &str = "http://localhost:8000";

const CONFIG_FILE: &str = "config.toml";
const ENV_PREFIX: &str = "NETDROP";

/// Application settings merged from defaults, the config file, the
/// environment and command line flags (in increasing priority)
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Settings {
    /// Send uploads to `dev_address` instead of `origin`
    pub dev_mode: bool,
    pub dev_address: String,
    /// Address the application is served from
    #[serde(default)]
    pub origin: Option<String>,
    /// Abort the in-flight request when its record is removed
    pub abort_on_remove: bool,
    #[serde(default)]
    pub connect_timeout_secs: Option<u64>,
}

/// Values given on the command line, applied on top of every other source
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SettingsOverrides {
    pub dev: bool,
    pub origin: Option<String>,
}

impl Settings {
    /// Loads settings using `config.toml` from the config directory
    pub fn load(overrides: SettingsOverrides) -> eyre::Result<Self> {
        Self::load_from(Some(get_config_dir().join(CONFIG_FILE)), overrides)
    }

    pub fn load_from(
        config_file: Option<PathBuf>,
        overrides: SettingsOverrides,
    ) -> eyre::Result<Self> {
        let mut builder = Config::builder()
            .set_default("dev_mode", cfg!(debug_assertions))?
            .set_default("dev_address", DEFAULT_DEV_ADDRESS)?
            .set_default("abort_on_remove", true)?;

        if let Some(path) = config_file {
            tracing::debug!("Reading settings from {}", path.display());
            builder = builder.add_source(File::from(path).required(false));
        }

        builder = builder
            .add_source(Environment::with_prefix(ENV_PREFIX).try_parsing(true))
            .set_override_option("origin", overrides.origin)?;
        if overrides.dev {
            builder = builder.set_override("dev_mode", true)?;
        }

        let settings: Settings = builder.build()?.try_deserialize()?;
        Ok(settings)
    }
}
