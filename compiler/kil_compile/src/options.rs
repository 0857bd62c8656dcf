//! Compiler configuration.

use kil_ir::Name;

/// Knobs of one compilation session.
#[derive(Clone, Debug)]
pub struct CompileOptions {
    /// Rename the variables of ordinary rules apart too (prefix `R_`).
    pub fresh_rules: bool,
    /// Rounds of function-rule partial evaluation before giving up.
    pub max_fixpoint_iterations: usize,
    /// Macro applications allowed while expanding one rule.
    pub macro_expansion_limit: usize,
    /// Rule applications allowed while evaluating one term.
    pub evaluation_fuel: usize,
    /// Evaluate function calls in rule right-hand sides at compile time.
    pub partial_evaluation: bool,
    pub build_automaton: bool,
    /// Cell whose content drives indexing; `k` when declared.
    pub computation_cell: Option<Name>,
}

impl Default for CompileOptions {
    fn default() -> Self {
        CompileOptions {
            fresh_rules: false,
            max_fixpoint_iterations: 16,
            macro_expansion_limit: 1024,
            evaluation_fuel: 10_000,
            partial_evaluation: true,
            build_automaton: true,
            computation_cell: None,
        }
    }
}
