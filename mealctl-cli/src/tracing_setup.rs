//! Tracing setup for the mealctl CLI
//!
//! Usage:
//!   mealctl --debug ...               # Debug logging
//!   RUST_LOG=mealctl_core=trace ...   # Fine-grained log control
//!   RUST_LOG                          # Log filter (default: info)
//!
//! Logs go to stderr so query output on stdout stays machine-readable.

use anyhow::{anyhow, Result};
use tracing_subscriber::EnvFilter;

/// Tracing configuration options
#[derive(Debug, Clone, Default)]
pub struct TracingConfig {
    /// Enable debug logging (ignored when RUST_LOG is set)
    pub debug: bool,
}

pub fn init_tracing(config: &TracingConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directives(config.debug)));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(config.debug)
        .with_writer(std::io::stderr)
        .compact()
        .try_init()
        .map_err(|err| anyhow!(err))
}

/// Filter used when RUST_LOG is unset.
fn default_directives(debug: bool) -> &'static str {
    if debug {
        "debug"
    } else {
        "info"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_level_is_info() {
        assert_eq!(default_directives(false), "info");
        assert_eq!(default_directives(true), "debug");
    }
}
