//! Logging capability handed to the validation procedure

use std::error::Error;
use std::fmt;

/// Where the config flow writes its diagnostics
pub trait FlowLogger: Send + Sync {
    fn debug(&self, message: fmt::Arguments<'_>);

    fn error(&self, message: fmt::Arguments<'_>);

    /// Log an unexpected failure in full
    fn exception(&self, message: fmt::Arguments<'_>, error: &(dyn Error + 'static));
}

/// Forwards to `tracing`
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingLogger;

impl FlowLogger for TracingLogger {
    fn debug(&self, message: fmt::Arguments<'_>) {
        tracing::debug!(target: "ha_components::xiaomi_viomi", "{}", message);
    }

    fn error(&self, message: fmt::Arguments<'_>) {
        tracing::error!(target: "ha_components::xiaomi_viomi", "{}", message);
    }

    fn exception(&self, message: fmt::Arguments<'_>, error: &(dyn Error + 'static)) {
        tracing::error!(
            target: "ha_components::xiaomi_viomi",
            error = %error,
            source = ?error.source(),
            "{}",
            message
        );
    }
}
