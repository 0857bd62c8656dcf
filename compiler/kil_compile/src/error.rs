//! Errors surfaced by [`compile`](crate::compile).

use kil_diagnostic::Diagnostic;
use thiserror::Error;

use crate::PassError;

#[derive(Debug, Error)]
pub enum CompileError {
    /// At least one error diagnostic was emitted.
    #[error("compilation failed with {errors} error(s)")]
    Failed {
        errors: usize,
        diagnostics: Vec<Diagnostic>,
    },
    /// The pass pipeline itself is misconfigured.
    #[error(transparent)]
    Pipeline(#[from] PassError),
}

impl CompileError {
    /// Every diagnostic of the failed session, warnings included.
    pub fn diagnostics(&self) -> &[Diagnostic] {
        match self {
            CompileError::Failed { diagnostics, .. } => diagnostics,
            CompileError::Pipeline(_) => &[],
        }
    }
}
