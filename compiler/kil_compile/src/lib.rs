//! KIL Compile - turns K definitions into compiled, indexed rule sets.
//!
//! The pipeline, leaves first:
//!
//! - [`kast`]: the front-end term AST handed over by the parser
//! - module resolution: flattens the import closure of the main module
//! - lowering: front-end terms become hash-consed [`kil_ir::Term`]s, with
//!   cells, collections and freezers recognized from the productions and the
//!   configuration
//! - [`passes`]: the rule compiler proper, run by a [`PassManager`]
//! - [`automaton`]: merges the ordinary rules into one pattern whose
//!   disjunctions narrow the set of live rules while matching
//!
//! The result is a [`Definition`] that the rewrite driver queries through its
//! indexing table, the constraint store and the automaton.
//!
//! # Debugging
//!
//! Enable tracing with environment variables:
//! - `RUST_LOG=kil_compile=debug` - pass timings and rule counts
//! - `RUST_LOG=kil_compile=trace` - every rewrite the evaluator performs
//! - `RUST_LOG=kil_compile::automaton=trace` - automaton matching

pub mod automaton;
mod compile;
mod context;
mod definition;
mod error;
pub mod eval;
pub mod kast;
mod labels;
mod lower;
mod modules;
mod options;
pub mod passes;
mod rule;
#[cfg(test)]
mod test_helpers;

pub use automaton::{Automaton, Firing};
pub use compile::{compile, compile_with, Compiled};
pub use context::CompileContext;
pub use definition::Definition;
pub use error::CompileError;
pub use labels::{CollectionKind, CollectionRole, LabelInfo, LabelTable};
pub use lower::{cell_config, Lowering};
pub use modules::{flatten_modules, FlatModule};
pub use options::CompileOptions;
pub use passes::{Pass, PassError, PassManager, PassResult};
pub use rule::{flatten_conjunction, left_side, right_side, FastRewrite, Rule, RuleKind};

use std::sync::Once;

static TRACING_INIT: Once = Once::new();

/// Initialize tracing for debug output.
///
/// Call this once at startup. Safe to call multiple times.
/// Enable with `RUST_LOG=kil_compile=debug` or `RUST_LOG=kil_compile=trace`.
pub fn init_tracing() {
    TRACING_INIT.call_once(|| {
        use tracing_subscriber::{fmt, prelude::*, EnvFilter};

        // Only initialize if RUST_LOG is set
        if std::env::var("RUST_LOG").is_ok() {
            let filter = EnvFilter::from_default_env();
            tracing_subscriber::registry()
                .with(fmt::layer().with_target(true).with_level(true))
                .with(filter)
                .init();
        }
    });
}
