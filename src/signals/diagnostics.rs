// =============================================================================
// Run Diagnostics — per-run scoped logging sink
// =============================================================================
//
// Every aggregation run gets its own sink: a run id, a tracing span carrying
// that id, and a bounded log of the warnings raised while the run executed.
// Concurrent runs therefore never mix their diagnostics.
// =============================================================================

use parking_lot::Mutex;
use serde::Serialize;
use tracing::{debug, warn, Span};

/// Maximum number of diagnostics retained per run.
const MAX_DIAGNOSTICS: usize = 256;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Debug,
    Warning,
}

/// One diagnostic raised during a run.
#[derive(Debug, Clone, Serialize)]
pub struct Diagnostic {
    pub severity: Severity,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub strategy_id: Option<String>,
}

pub struct RunDiagnostics {
    run_id: String,
    span: Span,
    entries: Mutex<Vec<Diagnostic>>,
}

impl RunDiagnostics {
    pub fn new() -> Self {
        Self::with_run_id(uuid::Uuid::new_v4().to_string())
    }

    pub fn with_run_id(run_id: impl Into<String>) -> Self {
        let run_id = run_id.into();
        let span = tracing::info_span!("aggregation_run", run_id = %run_id);
        Self {
            run_id,
            span,
            entries: Mutex::new(Vec::new()),
        }
    }

    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    pub fn span(&self) -> &Span {
        &self.span
    }

    pub fn warn(&self, strategy_id: Option<&str>, message: impl Into<String>) {
        let message = message.into();
        self.span.in_scope(|| {
            warn!(strategy_id = strategy_id.unwrap_or("-"), "{message}");
        });
        self.push(Severity::Warning, strategy_id, message);
    }

    pub fn debug(&self, strategy_id: Option<&str>, message: impl Into<String>) {
        let message = message.into();
        self.span.in_scope(|| {
            debug!(strategy_id = strategy_id.unwrap_or("-"), "{message}");
        });
        self.push(Severity::Debug, strategy_id, message);
    }

    fn push(&self, severity: Severity, strategy_id: Option<&str>, message: String) {
        let mut entries = self.entries.lock();
        if entries.len() >= MAX_DIAGNOSTICS {
            entries.remove(0);
        }
        entries.push(Diagnostic {
            severity,
            message,
            strategy_id: strategy_id.map(str::to_string),
        });
    }

    /// Snapshot of everything recorded so far (oldest first).
    pub fn entries(&self) -> Vec<Diagnostic> {
        self.entries.lock().clone()
    }

    pub fn warnings(&self) -> Vec<Diagnostic> {
        self.entries
            .lock()
            .iter()
            .filter(|d| d.severity == Severity::Warning)
            .cloned()
            .collect()
    }
}

impl Default for RunDiagnostics {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn runs_keep_separate_logs() {
        let a = RunDiagnostics::with_run_id("run-a");
        let b = RunDiagnostics::with_run_id("run-b");
        a.warn(Some("rsi"), "no rows");
        b.debug(None, "aligned");

        assert_eq!(a.entries().len(), 1);
        assert_eq!(a.warnings()[0].strategy_id.as_deref(), Some("rsi"));
        assert!(b.warnings().is_empty());
        assert_eq!(b.entries().len(), 1);
        assert_eq!(a.run_id(), "run-a");
    }

    #[test]
    fn log_is_bounded() {
        let d = RunDiagnostics::with_run_id("bounded");
        for i in 0..(MAX_DIAGNOSTICS + 10) {
            d.debug(None, format!("entry {i}"));
        }
        let entries = d.entries();
        assert_eq!(entries.len(), MAX_DIAGNOSTICS);
        assert_eq!(entries[0].message, "entry 10");
    }

    #[test]
    fn generated_run_ids_are_unique() {
        assert_ne!(RunDiagnostics::new().run_id(), RunDiagnostics::new().run_id());
    }
}
