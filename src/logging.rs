//! Logging setup and event macros.
//!
//! Events are emitted through `tracing`. Applications that already install a
//! subscriber get them for free; others can call [`init`] or
//! [`init_with_config`].
//!
//! `RUST_LOG` takes precedence over configuration:
//! ```bash
//! RUST_LOG=modreload=debug ./my-app
//! ```

use std::sync::Once;
use tracing_subscriber::fmt::time::FormatTime;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

use crate::config::LoggingConfig;

static INIT: Once = Once::new();

/// Compact time format: HH:MM:SS.mmm
struct CompactTime;

impl FormatTime for CompactTime {
    fn format_time(&self, w: &mut tracing_subscriber::fmt::format::Writer<'_>) -> std::fmt::Result {
        write!(w, "{}", chrono::Local::now().format("%H:%M:%S%.3f"))
    }
}

/// Filter from a `RUST_LOG` value if one is given, else from `config`.
fn build_filter(config: &LoggingConfig, rust_log: Option<&str>) -> EnvFilter {
    match rust_log {
        Some(directives) => EnvFilter::new(directives),
        None => EnvFilter::new(config.filter_directive()),
    }
}

/// Install a global subscriber configured from `config`.
///
/// Only the first call has an effect. Returns `false` if this call did not
/// install a subscriber, either because an earlier call did or because the
/// application installed its own.
pub fn init_with_config(config: &LoggingConfig) -> bool {
    let mut installed = false;
    INIT.call_once(|| {
        let rust_log = std::env::var("RUST_LOG").ok();
        let filter = build_filter(config, rust_log.as_deref());

        let fmt_layer = tracing_subscriber::fmt::layer()
            .with_target(true)
            .with_timer(CompactTime)
            .with_level(true)
            .with_filter(filter);

        installed = tracing_subscriber::registry()
            .with(fmt_layer)
            .try_init()
            .is_ok();
        if !installed {
            tracing::debug!("[logging] subscriber already installed");
        }
    });
    installed
}

/// Install a global subscriber with default settings (`warn`).
pub fn init() -> bool {
    init_with_config(&LoggingConfig::default())
}

/// Log an event tagged with the component that produced it.
///
/// # Examples
/// ```ignore
/// log_event!("reload", "reloaded", "{name}");
/// log_event!("reload", "tracking disabled");
/// ```
#[macro_export]
macro_rules! log_event {
    ($component:expr, $event:expr) => {
        tracing::info!("[{}] {}", $component, $event)
    };
    ($component:expr, $event:expr, $($arg:tt)*) => {
        tracing::info!("[{}] {}: {}", $component, $event, format!($($arg)*))
    };
}

/// Warning-level variant of [`log_event!`], for recoverable problems.
#[macro_export]
macro_rules! warn_event {
    ($component:expr, $event:expr) => {
        tracing::warn!("[{}] {}", $component, $event)
    };
    ($component:expr, $event:expr, $($arg:tt)*) => {
        tracing::warn!("[{}] {}: {}", $component, $event, format!($($arg)*))
    };
}

/// Debug-level variant of [`log_event!`].
#[macro_export]
macro_rules! debug_event {
    ($component:expr, $event:expr) => {
        tracing::debug!("[{}] {}", $component, $event)
    };
    ($component:expr, $event:expr, $($arg:tt)*) => {
        tracing::debug!("[{}] {}: {}", $component, $event, format!($($arg)*))
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_filter_from_config() {
        let config = LoggingConfig {
            default: "warn".to_string(),
            modules: HashMap::from([("modreload".to_string(), "debug".to_string())]),
        };

        let filter = build_filter(&config, None).to_string();
        assert!(filter.contains("warn"));
        assert!(filter.contains("modreload=debug"));
    }

    #[test]
    fn test_only_first_init_installs() {
        init();
        assert!(!init());
    }

    #[test]
    fn test_rust_log_replaces_config() {
        let config = LoggingConfig {
            default: "error".to_string(),
            modules: HashMap::from([("modreload".to_string(), "debug".to_string())]),
        };

        let filter = build_filter(&config, Some("modreload::monitor=trace")).to_string();
        assert!(filter.contains("modreload::monitor=trace"));
        assert!(!filter.contains("modreload=debug"));
    }
}
