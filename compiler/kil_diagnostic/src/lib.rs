//! Diagnostic system for rule-compilation errors.
//!
//! Every diagnostic carries:
//! - an error code for searchability
//! - a message saying what went wrong
//! - labels pointing at the source location of the offending sentence
//! - notes giving context
//!
//! # Error Guarantees
//!
//! [`ErrorGuaranteed`] is a type-level proof that at least one error was
//! emitted. Compilation entry points return it instead of a bare flag so a
//! failure can never be reported without a diagnostic.

mod diagnostic;
mod error_code;
mod guarantee;
pub mod queue;

pub use diagnostic::{Diagnostic, Label, Severity};
pub use error_code::ErrorCode;
pub use guarantee::ErrorGuaranteed;
pub use queue::{DiagnosticConfig, DiagnosticQueue};
