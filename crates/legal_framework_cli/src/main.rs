//! CLI probe for a legal framework database.
//!
//! Opens (creating if needed) the database file given as the only argument,
//! loads the schema and prints the schema version and per-table row counts.
//!
//! Setting `LEGAL_FRAMEWORK_LOG_DIR` (absolute path) enables file logging;
//! `LEGAL_FRAMEWORK_LOG_LEVEL` overrides the build's default level.

use legal_framework_core::db::schema::SCHEMA_VERSION;
use legal_framework_core::{
    core_version, init_logging, EntityStore, LogLevel, LoggingConfig, LoggingError, StoreConfig,
};
use std::ffi::OsString;
use std::process::ExitCode;

const LOG_DIR_ENV: &str = "LEGAL_FRAMEWORK_LOG_DIR";
const LOG_LEVEL_ENV: &str = "LEGAL_FRAMEWORK_LOG_LEVEL";

fn main() -> ExitCode {
    let Some(path) = std::env::args_os().nth(1) else {
        eprintln!("usage: legal_framework_cli <database-file>");
        return ExitCode::from(2);
    };

    let logging = logging_config(
        std::env::var_os(LOG_DIR_ENV),
        std::env::var(LOG_LEVEL_ENV).ok(),
    );
    match logging {
        Ok(Some(config)) => {
            if let Err(err) = init_logging(&config) {
                eprintln!("failed to start logging: {err}");
                return ExitCode::FAILURE;
            }
        }
        Ok(None) => {}
        Err(err) => {
            eprintln!("invalid {LOG_LEVEL_ENV}: {err}");
            return ExitCode::from(2);
        }
    }

    let store = match EntityStore::open(&path, StoreConfig::default()) {
        Ok(store) => store,
        Err(err) => {
            eprintln!("failed to open {}: {err}", path.to_string_lossy());
            return ExitCode::FAILURE;
        }
    };

    match store.counts() {
        Ok(counts) => {
            println!("legal_framework_core version={}", core_version());
            println!("schema_version={SCHEMA_VERSION}");
            println!("matter_types={}", counts.matter_types);
            println!("merits_tasks={}", counts.merits_tasks);
            println!("proceeding_types={}", counts.proceeding_types);
            ExitCode::SUCCESS
        }
        Err(err) => {
            eprintln!("failed to count rows: {err}");
            ExitCode::FAILURE
        }
    }
}

/// Builds the logging config from the environment values, if logging is on.
fn logging_config(
    log_dir: Option<OsString>,
    level: Option<String>,
) -> Result<Option<LoggingConfig>, LoggingError> {
    let Some(log_dir) = log_dir.filter(|dir| !dir.is_empty()) else {
        return Ok(None);
    };
    let level = match level {
        Some(value) => value.parse::<LogLevel>()?,
        None => LogLevel::default(),
    };
    Ok(Some(LoggingConfig::new(log_dir).with_level(level)))
}
