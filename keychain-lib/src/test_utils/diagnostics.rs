//! Diagnostics sink that records reports for assertions.

use std::sync::{Arc, Mutex};

use crate::diagnostics::DiagnosticsSink;

/// A single recorded report.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DiagnosticEvent {
    /// A breadcrumb.
    Breadcrumb(String),
    /// A captured message.
    Message(String),
    /// A captured error, rendered with `Display`.
    Error(String),
}

/// Records every report. Clones share the same log.
#[derive(Clone, Debug, Default)]
pub struct RecordingDiagnostics {
    events: Arc<Mutex<Vec<DiagnosticEvent>>>,
}

impl RecordingDiagnostics {
    /// Create an empty recorder.
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&self, event: DiagnosticEvent) {
        self.events
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(event);
    }

    /// Every report, in order.
    pub fn events(&self) -> Vec<DiagnosticEvent> {
        self.events
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// Captured messages, in order.
    pub fn messages(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                DiagnosticEvent::Message(m) => Some(m),
                _ => None,
            })
            .collect()
    }

    /// Captured errors, in order.
    pub fn errors(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                DiagnosticEvent::Error(m) => Some(m),
                _ => None,
            })
            .collect()
    }

    /// Breadcrumbs, in order.
    pub fn breadcrumbs(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                DiagnosticEvent::Breadcrumb(m) => Some(m),
                _ => None,
            })
            .collect()
    }

    /// True if any report of any kind contains `needle`.
    pub fn mentions(&self, needle: &str) -> bool {
        self.events().iter().any(|e| match e {
            DiagnosticEvent::Breadcrumb(m) | DiagnosticEvent::Message(m) | DiagnosticEvent::Error(m) => {
                m.contains(needle)
            }
        })
    }
}

impl DiagnosticsSink for RecordingDiagnostics {
    fn breadcrumb(&self, message: &str) {
        self.push(DiagnosticEvent::Breadcrumb(message.to_string()));
    }

    fn capture_message(&self, message: &str) {
        self.push(DiagnosticEvent::Message(message.to_string()));
    }

    fn capture_error(&self, error: &(dyn std::error::Error + 'static)) {
        self.push(DiagnosticEvent::Error(error.to_string()));
    }
}
