//! Pass infrastructure for the rule compiler.
//!
//! Each pass rewrites the rules of a [`Definition`] in place:
//! - `bubble_rewrites`: reject misplaced rewrites, lift the rest to cell level
//! - `normalize_assoc`: flatten associative operators into list form
//! - `expand_macros`: replace macro applications by their expansion
//! - `convert_lookups`: move `#match`/`#mapChoice`/`#setChoice` into lookups
//! - `rename_fresh`: rename the variables of equations apart
//! - `mark_single_variables`: turn singleton `K` variables into don't-cares
//! - `partial_evaluation`: evaluate right-hand sides to a fixpoint
//! - `build_automaton`: merge the ordinary rules
//!
//! A rule that fails a pass is reported and dropped; the pass itself only
//! fails when the pipeline is misconfigured.

mod assoc;
mod automaton;
mod bubble;
mod fresh;
mod lookups;
mod macros;
mod manager;
mod partial_eval;
mod single_vars;

pub use assoc::{flatten_assoc, unflatten_assoc, NormalizeAssocPass};
pub use automaton::BuildAutomatonPass;
pub use bubble::BubbleRewritesPass;
pub use fresh::RenameFreshPass;
pub use lookups::ConvertLookupsPass;
pub use macros::{ExpandMacrosPass, MacroExpander};
pub use manager::PassManager;
pub use partial_eval::PartialEvaluationPass;
pub use single_vars::MarkSingleVariablesPass;

use std::time::Duration;

use thiserror::Error;

use crate::{CompileContext, Definition};

/// Result of running a pass
#[derive(Debug, Clone)]
pub struct PassResult {
    /// Whether the pass made any changes
    pub changed: bool,
    /// Statistics about the pass execution
    pub stats: PassStats,
}

impl PassResult {
    pub fn unchanged() -> Self {
        PassResult {
            changed: false,
            stats: PassStats::default(),
        }
    }

    pub fn changed(items_transformed: usize) -> Self {
        PassResult {
            changed: true,
            stats: PassStats {
                duration: Duration::ZERO,
                items_transformed,
            },
        }
    }

    /// `changed(n)` when anything was transformed.
    pub fn from_count(items_transformed: usize) -> Self {
        if items_transformed == 0 {
            Self::unchanged()
        } else {
            Self::changed(items_transformed)
        }
    }
}

/// Statistics collected during pass execution
#[derive(Debug, Clone, Default)]
pub struct PassStats {
    /// Time taken by the pass
    pub duration: Duration,
    /// Number of rules transformed
    pub items_transformed: usize,
}

/// Error during pass execution
#[derive(Debug, Clone, Error)]
#[error("Pass '{pass_name}' failed: {message}")]
pub struct PassError {
    pub pass_name: String,
    pub message: String,
}

impl PassError {
    pub fn new(pass_name: &str, message: impl Into<String>) -> Self {
        PassError {
            pass_name: pass_name.to_string(),
            message: message.into(),
        }
    }
}

/// Trait for compiler passes
pub trait Pass {
    /// Name of this pass (for debugging and logging)
    fn name(&self) -> &'static str;

    /// Whether this pass is required (cannot be disabled)
    fn required(&self) -> bool {
        false
    }

    /// Run the pass on the definition
    fn run(&self, definition: &mut Definition, ctx: &mut CompileContext)
        -> Result<PassResult, PassError>;

    /// Names of passes that must run before this one
    fn requires(&self) -> &[&'static str] {
        &[]
    }
}

impl<T: Pass + ?Sized> Pass for Box<T> {
    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn required(&self) -> bool {
        (**self).required()
    }

    fn run(
        &self,
        definition: &mut Definition,
        ctx: &mut CompileContext,
    ) -> Result<PassResult, PassError> {
        (**self).run(definition, ctx)
    }

    fn requires(&self) -> &[&'static str] {
        (**self).requires()
    }
}
