//! Per-session compilation state.

use kil_diagnostic::{Diagnostic, DiagnosticQueue, ErrorGuaranteed};
use kil_ir::{Name, Variable};

use crate::CompileOptions;

/// Options, the fresh-variable counter and the diagnostics of one session.
pub struct CompileContext {
    pub options: CompileOptions,
    diagnostics: DiagnosticQueue,
    next_id: u32,
}

impl CompileContext {
    pub fn new(options: CompileOptions) -> Self {
        CompileContext {
            options,
            diagnostics: DiagnosticQueue::new(),
            next_id: 1,
        }
    }

    /// A variable id no other variable of this session carries.
    pub fn fresh_id(&mut self) -> u32 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    /// `var` renamed apart, optionally with a name prefix.
    pub fn rename(&mut self, var: Variable, prefix: Option<&str>) -> Variable {
        let renamed = var.with_id(self.fresh_id());
        match prefix {
            Some(prefix) => renamed.with_name(Name::intern(&format!("{prefix}{}", var.name()))),
            None => renamed,
        }
    }

    pub fn emit_error(&mut self, diag: Diagnostic) -> ErrorGuaranteed {
        self.diagnostics.emit_error(diag)
    }

    pub fn emit_warning(&mut self, diag: Diagnostic) {
        self.diagnostics.emit_warning(diag);
    }

    pub fn diagnostics(&self) -> &DiagnosticQueue {
        &self.diagnostics
    }

    pub fn diagnostics_mut(&mut self) -> &mut DiagnosticQueue {
        &mut self.diagnostics
    }

    pub fn has_errors(&self) -> bool {
        self.diagnostics.has_errors()
    }

    /// Sorted diagnostics; leaves the queue empty.
    pub fn take_diagnostics(&mut self) -> Vec<Diagnostic> {
        self.diagnostics.flush()
    }
}

impl Default for CompileContext {
    fn default() -> Self {
        Self::new(CompileOptions::default())
    }
}
