//! Tracing setup for the console.
//!
//! Native builds log to the terminal through `tracing-subscriber`, honouring
//! `RUST_LOG`. Browser builds forward to the devtools console through
//! `tracing-wasm`.
//!
//! ```ignore
//! use volunteer_common::telemetry::{self, TelemetryConfig};
//!
//! telemetry::init(TelemetryConfig::from_env("volunteer-app"));
//! tracing::info!("console started");
//! ```

use tracing::Level;

/// Telemetry configuration
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    /// Service name attached to the startup log line
    pub service_name: String,
    /// Console log level (default: INFO, DEBUG in debug builds)
    pub console_level: Level,
}

impl TelemetryConfig {
    pub fn from_env(service_name: impl Into<String>) -> Self {
        let console_level = if cfg!(debug_assertions) {
            Level::DEBUG
        } else {
            Level::INFO
        };

        Self {
            service_name: service_name.into(),
            console_level,
        }
    }
}

/// Install the global subscriber. Safe to call more than once; later calls
/// leave the first subscriber in place.
#[cfg(not(all(target_family = "wasm", target_os = "unknown")))]
pub fn init(config: TelemetryConfig) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.console_level.as_str().to_lowercase()));

    match tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init()
    {
        Ok(()) => tracing::info!(service = %config.service_name, "telemetry initialized"),
        Err(_) => tracing::debug!("tracing subscriber already installed"),
    }
}

#[cfg(all(target_family = "wasm", target_os = "unknown"))]
pub fn init(config: TelemetryConfig) {
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;

    let wasm_config = tracing_wasm::WASMLayerConfigBuilder::new()
        .set_max_level(config.console_level)
        .build();
    if tracing_subscriber::registry()
        .with(tracing_wasm::WASMLayer::new(wasm_config))
        .try_init()
        .is_ok()
    {
        tracing::info!(service = %config.service_name, "telemetry initialized");
    }
}
