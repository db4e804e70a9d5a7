//! Initialize configuration from file or env var.
use privateer_tracker_configuration::Configuration;

/// The whole `tracker.toml` file content. It has priority over the config file,
/// even if the file is not on the default path.
const ENV_VAR_CONFIG: &str = "TRACKER_CONFIG";

/// The `tracker.toml` file location.
pub const ENV_VAR_PATH_CONFIG: &str = "TRACKER_PATH_CONFIG";

// Default values
pub const DEFAULT_PATH_CONFIG: &str = "./share/default/config/tracker.development.sqlite3.toml";

/// It loads the application configuration from the environment.
///
/// There are two methods to inject the configuration:
///
/// 1. By using a config file: `tracker.toml`.
/// 2. Environment variable: `TRACKER_CONFIG`. The variable contains the same contents as the `tracker.toml` file.
///
/// Environment variable has priority over the config file.
///
/// # Panics
///
/// Will panic if it can't load the configuration from either the config
/// file or the `TRACKER_CONFIG` env var.
#[must_use]
pub fn initialize_configuration() -> Configuration {
    if let Ok(contents) = std::env::var(ENV_VAR_CONFIG) {
        return Configuration::load(&contents).expect("the TRACKER_CONFIG contents should be valid");
    }

    let path = std::env::var(ENV_VAR_PATH_CONFIG).unwrap_or_else(|_| DEFAULT_PATH_CONFIG.to_string());

    Configuration::load_from_file(&path).expect("the configuration file should be valid")
}

#[cfg(test)]
mod tests {
    #[test]
    fn it_should_load_with_default_config() {
        use crate::bootstrap::config::initialize_configuration;

        drop(initialize_configuration());
    }
}
