//! Setup for the application tracing.
//!
//! It redirects the tracing info to the standard output with the tracing
//! level defined in the configuration.
//!
//! (case is ignored)
//!
//! - `Off` (i.e. don't load any subscriber...)
//! - `Error`
//! - `Warn`
//! - `Info`
//! - `Debug`
//! - `Trace`
//!
//! Refer to the [configuration crate documentation](https://docs.rs/privateer-tracker-configuration) to know how to change tracing settings.
use std::sync::Once;

use privateer_tracker_configuration::{Configuration, LogLevel};
use tracing::debug;
use tracing::level_filters::LevelFilter;

static INIT: Once = Once::new();

/// It redirects the tracing info to the standard output with the tracing
/// level and format defined in the configuration.
pub fn setup(cfg: &Configuration) {
    let filter = level_filter(&cfg.log_level);

    if filter == LevelFilter::OFF {
        return;
    }

    INIT.call_once(|| {
        stdout_init(filter, cfg.log_json);
    });
}

fn level_filter(level: &LogLevel) -> LevelFilter {
    match level {
        LogLevel::Off => LevelFilter::OFF,
        LogLevel::Error => LevelFilter::ERROR,
        LogLevel::Warn => LevelFilter::WARN,
        LogLevel::Info => LevelFilter::INFO,
        LogLevel::Debug => LevelFilter::DEBUG,
        LogLevel::Trace => LevelFilter::TRACE,
    }
}

fn stdout_init(filter: LevelFilter, json: bool) {
    let builder = tracing_subscriber::fmt().with_max_level(filter);

    if json {
        builder.json().init();
    } else {
        builder.init();
    }

    debug!("tracing initialized.");
}

#[cfg(test)]
mod tests {
    use privateer_tracker_configuration::LogLevel;
    use tracing::level_filters::LevelFilter;

    use super::level_filter;

    #[test]
    fn it_should_map_every_log_level_to_a_filter() {
        assert_eq!(level_filter(&LogLevel::Off), LevelFilter::OFF);
        assert_eq!(level_filter(&LogLevel::Error), LevelFilter::ERROR);
        assert_eq!(level_filter(&LogLevel::Warn), LevelFilter::WARN);
        assert_eq!(level_filter(&LogLevel::Info), LevelFilter::INFO);
        assert_eq!(level_filter(&LogLevel::Debug), LevelFilter::DEBUG);
        assert_eq!(level_filter(&LogLevel::Trace), LevelFilter::TRACE);
    }
}
