//! User-facing reporting
//!
//! The engine reports progress and problems through [`Reporter`]. Calls are
//! fire-and-forget; nothing the reporter does feeds back into a decision.

use tracing::{error, info, warn};

/// Sink for notices, warnings and errors
pub trait Reporter {
    /// Informational notice (e.g. a completed rename)
    fn notify(&self, message: &str);

    /// Something was skipped or blocked
    fn warn(&self, message: &str);

    /// A document or file could not be processed
    fn log_error(&self, message: &str);
}

/// Reporter that forwards to `tracing`
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingReporter;

impl Reporter for TracingReporter {
    fn notify(&self, message: &str) {
        info!("{}", message);
    }

    fn warn(&self, message: &str) {
        warn!("{}", message);
    }

    fn log_error(&self, message: &str) {
        error!("{}", message);
    }
}

impl<R: Reporter + ?Sized> Reporter for &R {
    fn notify(&self, message: &str) {
        (**self).notify(message)
    }

    fn warn(&self, message: &str) {
        (**self).warn(message)
    }

    fn log_error(&self, message: &str) {
        (**self).log_error(message)
    }
}
