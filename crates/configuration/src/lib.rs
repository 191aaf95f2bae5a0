use crate::error::ConfigError;

// Declare the modules that make up this crate.
pub mod error;
pub mod settings;

// Re-export the core types to provide a clean public API.
pub use settings::{
    AccountsConfig, Config, DatabaseConfig, LoggingConfig, PortfolioConfig, QuoteConfig,
    QuoteFailurePolicy, QuoteSource,
};

/// Prefix for environment overrides, e.g. `EQUITYBOOK_DATABASE__URL`.
pub const ENV_PREFIX: &str = "EQUITYBOOK";

/// Loads the application configuration from `config.toml` and the environment.
///
/// The file is optional. Environment variables override file values, with `__`
/// separating nested keys (`EQUITYBOOK_QUOTES__API_TOKEN`).
pub fn load_config() -> Result<Config, ConfigError> {
    load_config_from("config.toml")
}

/// Like [`load_config`], reading the given file instead of `config.toml`.
pub fn load_config_from(path: &str) -> Result<Config, ConfigError> {
    let config = load_unvalidated_from(path)?;
    config.validate()?;
    Ok(config)
}

/// Reads the file and environment sources without running [`Config::validate`].
///
/// For callers that apply their own overrides (such as command-line flags)
/// before validating once.
pub fn load_unvalidated_from(path: &str) -> Result<Config, ConfigError> {
    let config = config::Config::builder()
        .add_source(config::File::with_name(path).required(false))
        .add_source(
            config::Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("_")
                .separator("__"),
        )
        .build()?
        .try_deserialize::<Config>()?;

    tracing::debug!(path, source = ?config.quotes.source, "Configuration loaded.");
    Ok(config)
}
