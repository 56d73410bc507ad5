//! Logging and tracing initialization for native builds.
//!
//! The browser build does not install a subscriber; it routes `tracing`
//! events through the `log` bridge into the developer console instead.

use crate::config::LoggingConfig;

/// Build the filter directive for a configured level.
///
/// Bare levels ("debug") apply to the Clipcast crates only and keep
/// everything else at `warn`. Anything containing `=` or `,` is treated as a
/// full directive and passed through unchanged.
pub fn filter_directive(level: &str) -> String {
    let level = level.trim();
    if level.contains('=') || level.contains(',') {
        return level.to_string();
    }
    let level = if level.is_empty() { "info" } else { level };
    format!("warn,clipcast={level},clipcast_common={level},clipcast_capture_engine={level},clipcast_platform_synthetic={level}")
}

/// Initialize the tracing subscriber with the given configuration.
///
/// `RUST_LOG` overrides the configured level when set.
#[cfg(not(target_arch = "wasm32"))]
pub fn init_logging(config: &LoggingConfig) {
    use tracing_subscriber::{fmt, EnvFilter};

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(filter_directive(&config.level)));

    if config.json {
        let subscriber = fmt::Subscriber::builder()
            .with_env_filter(env_filter)
            .json()
            .finish();
        tracing::subscriber::set_global_default(subscriber).ok();
    } else {
        let subscriber = fmt::Subscriber::builder()
            .with_env_filter(env_filter)
            .with_target(false)
            .compact()
            .finish();
        tracing::subscriber::set_global_default(subscriber).ok();
    }
}

/// Level string for a `--verbose` flag.
pub fn level_for_verbosity(verbose: bool) -> &'static str {
    if verbose {
        "debug"
    } else {
        "info"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_level_scopes_to_clipcast_crates() {
        let directive = filter_directive("debug");
        assert!(directive.starts_with("warn,"));
        assert!(directive.contains("clipcast_capture_engine=debug"));
    }

    #[test]
    fn full_directive_passes_through() {
        assert_eq!(filter_directive("clipcast=trace,warn"), "clipcast=trace,warn");
    }

    #[test]
    fn empty_level_defaults_to_info() {
        assert!(filter_directive("  ").contains("clipcast=info"));
    }
}
