//! Diagnostic queue for collecting and sorting diagnostics.
//!
//! Rule-compilation errors are per rule: a bad rule is dropped and the
//! remaining rules keep compiling, so errors accumulate here and are
//! reported together once compilation finishes.
//!
//! The queue:
//! - deduplicates identical diagnostics
//! - stops recording errors once the configured limit is reached
//! - sorts by location when flushed

use kil_ir::Location;

use crate::{Diagnostic, ErrorCode, ErrorGuaranteed, Severity};

/// Configuration for diagnostic processing.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DiagnosticConfig {
    /// Maximum number of errors before the queue stops recording (0 = unlimited).
    pub error_limit: usize,
    /// Drop a diagnostic identical to one already queued.
    pub deduplicate: bool,
}

impl Default for DiagnosticConfig {
    fn default() -> Self {
        DiagnosticConfig {
            error_limit: 20,
            deduplicate: true,
        }
    }
}

impl DiagnosticConfig {
    /// Create a config with no error limit.
    pub fn unlimited() -> Self {
        DiagnosticConfig {
            error_limit: 0,
            ..Self::default()
        }
    }
}

/// Diagnostic queue.
#[derive(Debug, Default)]
pub struct DiagnosticQueue {
    diagnostics: Vec<Diagnostic>,
    error_count: usize,
    limit_reached: bool,
    config: DiagnosticConfig,
}

impl DiagnosticQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: DiagnosticConfig) -> Self {
        DiagnosticQueue {
            config,
            ..Self::default()
        }
    }

    /// Record an error and return proof that it was recorded.
    ///
    /// The proof is returned even if the error was deduplicated or dropped
    /// past the limit: an error has been reported either way.
    pub fn emit_error(&mut self, diag: Diagnostic) -> ErrorGuaranteed {
        debug_assert!(diag.is_error(), "emit_error called with a non-error diagnostic");
        self.add(diag);
        ErrorGuaranteed::new()
    }

    /// Record a warning.
    pub fn emit_warning(&mut self, diag: Diagnostic) {
        debug_assert!(!diag.is_error(), "emit_warning called with an error diagnostic");
        self.add(diag);
    }

    /// Add a diagnostic of any severity. Returns `false` if it was dropped.
    pub fn add(&mut self, diag: Diagnostic) -> bool {
        let is_error = diag.is_error();
        if is_error {
            // Errors are counted even when dropped so `has_errors` stays truthful.
            self.error_count += 1;
        }
        if self.limit_reached {
            return false;
        }
        if self.config.deduplicate && self.diagnostics.contains(&diag) {
            return false;
        }
        self.diagnostics.push(diag);
        if is_error && self.config.error_limit > 0 && self.error_count >= self.config.error_limit {
            self.limit_reached = true;
        }
        true
    }

    pub fn has_errors(&self) -> bool {
        self.error_count > 0
    }

    pub fn error_count(&self) -> usize {
        self.error_count
    }

    pub fn limit_reached(&self) -> bool {
        self.limit_reached
    }

    pub fn len(&self) -> usize {
        self.diagnostics.len()
    }

    pub fn is_empty(&self) -> bool {
        self.diagnostics.is_empty()
    }

    /// Queued diagnostics in insertion order.
    pub fn peek(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    /// Proof of an error, if one was emitted.
    pub fn guarantee(&self) -> Option<ErrorGuaranteed> {
        ErrorGuaranteed::from_error_count(self.error_count)
    }

    /// Drain all diagnostics sorted by location.
    ///
    /// Diagnostics without a location sort last, and a trailing E9002 note is
    /// appended when the error limit cut the report short.
    pub fn flush(&mut self) -> Vec<Diagnostic> {
        let mut out = std::mem::take(&mut self.diagnostics);
        out.sort_by_key(|d| sort_key(d.primary_location()));
        if self.limit_reached {
            out.push(too_many_errors(self.config.error_limit));
        }
        self.limit_reached = false;
        out
    }
}

fn sort_key(location: Option<Location>) -> (bool, &'static str, u32) {
    match location {
        Some(loc) => (false, loc.source.as_str(), loc.span.start),
        None => (true, "", 0),
    }
}

/// E9002: the error limit was reached.
pub fn too_many_errors(limit: usize) -> Diagnostic {
    Diagnostic {
        code: ErrorCode::E9002,
        severity: Severity::Error,
        message: format!("aborting after {limit} errors"),
        labels: Vec::new(),
        notes: vec!["raise the error limit to see every error".to_owned()],
    }
}

#[cfg(test)]
mod tests {
    use kil_ir::Span;
    use pretty_assertions::assert_eq;

    use super::*;

    fn error_at(source: &str, start: u32) -> Diagnostic {
        Diagnostic::error(ErrorCode::E1002)
            .with_message(format!("nested rewrite at {start}"))
            .with_label(Location::new(source, Span::new(start, start + 1)), "here")
    }

    #[test]
    fn test_flush_sorts_by_location() {
        let mut queue = DiagnosticQueue::new();
        queue.emit_error(error_at("b.k", 1));
        queue.emit_error(error_at("a.k", 9));
        queue.emit_error(error_at("a.k", 3));
        queue.emit_warning(Diagnostic::warning(ErrorCode::W4001).with_message("cap"));

        let starts: Vec<_> = queue
            .flush()
            .iter()
            .map(|d| d.primary_location().map(|l| (l.source.as_str(), l.span.start)))
            .collect();
        assert_eq!(
            starts,
            vec![Some(("a.k", 3)), Some(("a.k", 9)), Some(("b.k", 1)), None]
        );
    }

    #[test]
    fn test_deduplicates_identical() {
        let mut queue = DiagnosticQueue::new();
        queue.emit_error(error_at("a.k", 1));
        queue.emit_error(error_at("a.k", 1));
        assert_eq!(queue.len(), 1);
        assert_eq!(queue.error_count(), 2);
    }

    #[test]
    fn test_error_limit_appends_note() {
        let mut queue = DiagnosticQueue::with_config(DiagnosticConfig {
            error_limit: 2,
            deduplicate: true,
        });
        for i in 0..5 {
            queue.emit_error(error_at("a.k", i));
        }
        assert!(queue.limit_reached());
        let flushed = queue.flush();
        assert_eq!(flushed.len(), 3);
        assert_eq!(flushed.last().map(|d| d.code), Some(ErrorCode::E9002));
    }

    #[test]
    fn test_warnings_do_not_count_as_errors() {
        let mut queue = DiagnosticQueue::with_config(DiagnosticConfig::unlimited());
        queue.emit_warning(Diagnostic::warning(ErrorCode::W4002));
        assert!(!queue.has_errors());
        assert!(queue.guarantee().is_none());
    }
}
