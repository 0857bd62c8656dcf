// Pass manager for the rule compiler
// Handles pass registration, ordering, and execution

use std::collections::HashSet;
use std::time::Instant;

use tracing::{debug, trace};

use super::{
    BubbleRewritesPass, BuildAutomatonPass, ConvertLookupsPass, ExpandMacrosPass,
    MarkSingleVariablesPass, NormalizeAssocPass, Pass, PassError, PartialEvaluationPass,
    RenameFreshPass,
};
use crate::{CompileContext, Definition};

/// Manages and runs compiler passes
pub struct PassManager {
    passes: Vec<Box<dyn Pass>>,
    disabled: HashSet<String>,
}

impl Default for PassManager {
    fn default() -> Self {
        Self::new()
    }
}

impl PassManager {
    pub fn new() -> Self {
        PassManager {
            passes: Vec::new(),
            disabled: HashSet::new(),
        }
    }

    /// Create a pass manager with the default pipeline
    pub fn default_pipeline() -> Self {
        let mut pm = PassManager::new();

        pm.add(BubbleRewritesPass); // Required: rewrites checked and lifted
        pm.add(NormalizeAssocPass);
        pm.add(ExpandMacrosPass);
        pm.add(NormalizeAssocPass); // Macro bodies may splice operands into lists
        pm.add(ConvertLookupsPass); // Required: side-condition lookups
        pm.add(RenameFreshPass);
        pm.add(MarkSingleVariablesPass);
        pm.add(PartialEvaluationPass);
        pm.add(BuildAutomatonPass);

        pm
    }

    /// Add a pass to the manager
    pub fn add<P: Pass + 'static>(&mut self, pass: P) {
        self.passes.push(Box::new(pass));
    }

    /// Skip every pass named `name`; required passes cannot be skipped.
    pub fn disable(&mut self, name: &str) {
        self.disabled.insert(name.to_string());
    }

    /// Run all passes on the definition
    pub fn run(&self, definition: &mut Definition, ctx: &mut CompileContext) -> Result<(), PassError> {
        self.verify_dependencies()?;

        for pass in &self.passes {
            let name = pass.name();

            // Skip disabled passes (unless required)
            if self.disabled.contains(name) {
                if pass.required() {
                    return Err(PassError::new(name, "Cannot disable required pass"));
                }
                debug!(pass = name, "skipping disabled pass");
                continue;
            }

            trace!(pass = name, rules = definition.rules().len(), "running");
            let start = Instant::now();
            let mut result = pass.run(definition, ctx)?;
            result.stats.duration = start.elapsed();

            debug!(
                pass = name,
                duration = ?result.stats.duration,
                changed = result.changed,
                items = result.stats.items_transformed,
                rules = definition.rules().len(),
                "pass completed"
            );
        }

        Ok(())
    }

    /// Verify that all pass dependencies are satisfied
    fn verify_dependencies(&self) -> Result<(), PassError> {
        let pass_names: HashSet<_> = self.passes.iter().map(|p| p.name()).collect();
        let mut seen = HashSet::new();

        for pass in &self.passes {
            for req in pass.requires() {
                if !pass_names.contains(req) {
                    return Err(PassError::new(
                        pass.name(),
                        format!("Required pass '{req}' not found in pipeline"),
                    ));
                }
                if !seen.contains(req) {
                    return Err(PassError::new(
                        pass.name(),
                        format!("Required pass '{req}' must run before '{}'", pass.name()),
                    ));
                }
            }
            seen.insert(pass.name());
        }

        Ok(())
    }

    /// Get the number of passes
    pub fn len(&self) -> usize {
        self.passes.len()
    }

    /// Check if the manager has no passes
    pub fn is_empty(&self) -> bool {
        self.passes.is_empty()
    }

    /// Get pass names
    pub fn pass_names(&self) -> Vec<&'static str> {
        self.passes.iter().map(|p| p.name()).collect()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, reason = "tests unwrap expected errors")]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::passes::PassResult;

    struct Needs(&'static str);

    impl Pass for Needs {
        fn name(&self) -> &'static str {
            "needs"
        }

        fn run(&self, _: &mut Definition, _: &mut CompileContext) -> Result<PassResult, PassError> {
            Ok(PassResult::unchanged())
        }

        fn requires(&self) -> &[&'static str] {
            std::slice::from_ref(&self.0)
        }
    }

    fn empty_definition() -> Definition {
        Definition::new(
            crate::LabelTable::new(),
            kil_ir::CellConfig::new(),
            Vec::new(),
            kil_index::IndexingData::default(),
        )
    }

    #[test]
    fn test_pass_manager_new() {
        let pm = PassManager::new();
        assert!(pm.is_empty());
    }

    #[test]
    fn test_pass_manager_default_pipeline() {
        let pm = PassManager::default_pipeline();
        assert_eq!(
            pm.pass_names(),
            vec![
                "bubble_rewrites",
                "normalize_assoc",
                "expand_macros",
                "normalize_assoc",
                "convert_lookups",
                "rename_fresh",
                "mark_single_variables",
                "partial_evaluation",
                "build_automaton",
            ]
        );
    }

    #[test]
    fn test_disabled_pass_is_skipped() {
        struct Count;

        impl Pass for Count {
            fn name(&self) -> &'static str {
                "count"
            }

            fn run(&self, _: &mut Definition, ctx: &mut CompileContext) -> Result<PassResult, PassError> {
                ctx.fresh_id();
                Ok(PassResult::unchanged())
            }
        }

        let mut pm = PassManager::new();
        pm.add(Count);
        pm.disable("count");
        let mut definition = empty_definition();
        let mut ctx = CompileContext::default();
        pm.run(&mut definition, &mut ctx).unwrap();
        assert_eq!(ctx.fresh_id(), 1);
    }

    #[test]
    fn test_cannot_disable_required_pass() {
        let mut pm = PassManager::default_pipeline();
        pm.disable("bubble_rewrites");
        let mut definition = empty_definition();
        let mut ctx = CompileContext::default();
        let err = pm.run(&mut definition, &mut ctx).unwrap_err();
        assert_eq!(err.to_string(), "Pass 'bubble_rewrites' failed: Cannot disable required pass");
    }

    #[test]
    fn test_missing_dependency() {
        let mut pm = PassManager::new();
        pm.add(Needs("bubble_rewrites"));
        let err = pm.verify_dependencies().unwrap_err();
        assert_eq!(err.message, "Required pass 'bubble_rewrites' not found in pipeline");
    }

    #[test]
    fn test_dependency_order() {
        let mut pm = PassManager::new();
        pm.add(Needs("bubble_rewrites"));
        pm.add(BubbleRewritesPass);
        let err = pm.verify_dependencies().unwrap_err();
        assert_eq!(err.message, "Required pass 'bubble_rewrites' must run before 'needs'");
    }

    #[test]
    fn test_empty_definition_runs() {
        let pm = PassManager::default_pipeline();
        let mut definition = empty_definition();
        let mut ctx = CompileContext::default();
        assert!(pm.run(&mut definition, &mut ctx).is_ok());
        assert!(definition.automaton().is_none());
    }
}
