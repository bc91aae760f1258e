//! Diagnostics reporting for keychain operations.
//!
//! Reports are fire-and-forget. A sink must never block or fail the operation
//! that produced the report, and must never receive secret values.

/// Receiver for breadcrumbs, messages and captured errors.
pub trait DiagnosticsSink: Send + Sync {
    /// Record a breadcrumb leading up to a possible later report.
    fn breadcrumb(&self, message: &str);

    /// Report a notable event.
    fn capture_message(&self, message: &str);

    /// Report an error.
    fn capture_error(&self, error: &(dyn std::error::Error + 'static));
}

/// Sink that forwards every report to `tracing` under the
/// `keychain::diagnostics` target.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingDiagnostics;

impl DiagnosticsSink for TracingDiagnostics {
    fn breadcrumb(&self, message: &str) {
        tracing::info!(target: "keychain::diagnostics", kind = "breadcrumb", "{}", message);
    }

    fn capture_message(&self, message: &str) {
        tracing::warn!(target: "keychain::diagnostics", kind = "message", "{}", message);
    }

    fn capture_error(&self, error: &(dyn std::error::Error + 'static)) {
        tracing::error!(target: "keychain::diagnostics", kind = "exception", "{}", error);
    }
}

impl<T: DiagnosticsSink + ?Sized> DiagnosticsSink for std::sync::Arc<T> {
    fn breadcrumb(&self, message: &str) {
        (**self).breadcrumb(message)
    }

    fn capture_message(&self, message: &str) {
        (**self).capture_message(message)
    }

    fn capture_error(&self, error: &(dyn std::error::Error + 'static)) {
        (**self).capture_error(error)
    }
}
