//! Logger setup.
//!
//! The runtime only talks to the `log` facade. Hosts that don't bring their
//! own logger can call [`init_logger`] once at startup to get env_logger
//! output on stderr.

use crate::config::RuntimeConfig;

/// Install env_logger as the global logger.
///
/// Uses `config.log_filter` when set, otherwise the `RUST_LOG` environment
/// variable. Returns `false` if a logger was already installed.
pub fn init_logger(config: &RuntimeConfig) -> bool {
    let mut builder = env_logger::Builder::new();
    match &config.log_filter {
        Some(filter) => {
            builder.parse_filters(filter);
        }
        None => {
            builder.parse_default_env();
        }
    }

    if builder.try_init().is_err() {
        eprintln!("[troupe] Warning: a logger is already set. Keeping the existing one.");
        return false;
    }
    true
}
