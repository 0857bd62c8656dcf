//! Macro expansion.
//!
//! Macro rules are applied outermost-first, repeatedly, until no macro
//! left-hand side matches anywhere in the term. Every application counts
//! against `macro_expansion_limit`; a rule whose expansion exceeds it is
//! reported as non-terminating and dropped.

use kil_constraint::match_all;
use kil_diagnostic::{Diagnostic, ErrorCode};
use kil_ir::visit::transform;
use kil_ir::Term;
use rustc_hash::FxHashSet;
use tracing::{debug, trace};

use super::{Pass, PassError, PassResult};
use crate::{CompileContext, Definition, Rule, RuleKind};

/// Applies a fixed set of macro rules.
pub struct MacroExpander<'d> {
    macros: Vec<&'d Rule>,
    limit: usize,
}

impl<'d> MacroExpander<'d> {
    pub fn new(macros: impl IntoIterator<Item = &'d Rule>, limit: usize) -> Self {
        MacroExpander {
            macros: macros.into_iter().collect(),
            limit,
        }
    }

    /// The macro rules of `definition`.
    pub fn for_definition(definition: &'d Definition, limit: usize) -> Self {
        Self::new(
            definition.rules_of(RuleKind::Macro).map(|(_, rule)| rule),
            limit,
        )
    }

    pub fn is_empty(&self) -> bool {
        self.macros.is_empty()
    }

    /// `term` with every macro expanded; `Err` carries the step count once
    /// the limit is exceeded.
    pub fn expand(&self, term: &Term) -> Result<Term, usize> {
        if self.macros.is_empty() {
            return Ok(term.clone());
        }
        let mut current = term.clone();
        let mut steps = 0;
        loop {
            let mut applied = 0;
            let next = transform(&current, &mut |t| {
                let expansion = self.expand_once(t)?;
                applied += 1;
                Some(expansion)
            });
            if applied == 0 {
                return Ok(current);
            }
            steps += applied;
            if steps > self.limit {
                return Err(steps);
            }
            current = next;
        }
    }

    fn expand_once(&self, term: &Term) -> Option<Term> {
        self.macros.iter().find_map(|rule| {
            match_all(rule.lhs(), term).into_iter().find_map(|substitution| {
                let enabled = rule
                    .requires()
                    .iter()
                    .all(|condition| substitution.apply(condition) == Term::bool(true));
                enabled.then(|| {
                    let expansion = substitution.apply(rule.rhs());
                    trace!(%term, %expansion, "macro");
                    expansion
                })
            })
        })
    }
}

pub struct ExpandMacrosPass;

impl Pass for ExpandMacrosPass {
    fn name(&self) -> &'static str {
        "expand_macros"
    }

    fn requires(&self) -> &[&'static str] {
        &["bubble_rewrites"]
    }

    fn run(&self, definition: &mut Definition, ctx: &mut CompileContext) -> Result<PassResult, PassError> {
        let limit = ctx.options.macro_expansion_limit;
        let expander = MacroExpander::for_definition(definition, limit);
        if expander.is_empty() {
            return Ok(PassResult::unchanged());
        }

        let mut expanded = Vec::new();
        let mut failed = FxHashSet::default();
        for (id, rule) in definition.rules().iter().enumerate() {
            if rule.kind() == RuleKind::Macro {
                continue;
            }
            let mut changed = false;
            let mut diverged = None;
            let rebuilt = rule.map_terms(
                &mut |term| match expander.expand(term) {
                    Ok(result) => {
                        changed |= !Term::ptr_eq(&result, term);
                        result
                    }
                    Err(steps) => {
                        diverged = Some(steps);
                        term.clone()
                    }
                },
                definition.indexing_data(),
            );
            if let Some(steps) = diverged {
                ctx.emit_error(
                    Diagnostic::error(ErrorCode::E3001)
                        .with_message(format!(
                            "Macro expansion did not terminate after {steps} steps."
                        ))
                        .with_optional_label(rule.location(), "while expanding this rule")
                        .with_note(format!("the expansion limit is {limit}")),
                );
                failed.insert(id);
            } else if changed {
                expanded.push((id, rebuilt));
            }
        }

        let count = expanded.len() + failed.len();
        for (id, rule) in expanded {
            definition.replace_rule(id, rule);
        }
        definition.remove_rules(&failed);
        debug!(expanded = count, "macros");
        Ok(PassResult::from_count(count))
    }
}

#[cfg(test)]
mod tests;
