//! Renaming rule variables apart.
//!
//! Equations (function, anywhere, pattern and pattern-folding rules) are
//! instantiated inside other rules during evaluation, so their variables get
//! session-unique ids. Ordinary rules are renamed too, with an `R_` prefix,
//! when `fresh_rules` is set.

use kil_index::IndexingData;
use kil_ir::visit::substitute;
use kil_ir::{Term, Variable};
use rustc_hash::FxHashMap;

use super::{Pass, PassError, PassResult};
use crate::{CompileContext, Definition, Rule, RuleKind};

pub struct RenameFreshPass;

impl Pass for RenameFreshPass {
    fn name(&self) -> &'static str {
        "rename_fresh"
    }

    fn run(&self, definition: &mut Definition, ctx: &mut CompileContext) -> Result<PassResult, PassError> {
        let mut renamed = Vec::new();
        for (id, rule) in definition.rules().iter().enumerate() {
            let prefix = match rule.kind() {
                RuleKind::Function
                | RuleKind::Anywhere
                | RuleKind::Pattern
                | RuleKind::PatternFolding => None,
                RuleKind::Regular if ctx.options.fresh_rules => Some("R_"),
                _ => continue,
            };
            renamed.push((id, rename_variables(rule, prefix, ctx, definition.indexing_data())));
        }

        let count = renamed.len();
        for (id, rule) in renamed {
            definition.replace_rule(id, rule);
        }
        Ok(PassResult::from_count(count))
    }
}

/// `rule` with every named variable given a fresh id.
///
/// Fresh-constant (`!X`) and fresh-variable (`?X`) names keep their marker
/// and are never prefixed.
pub(crate) fn rename_variables(
    rule: &Rule,
    prefix: Option<&str>,
    ctx: &mut CompileContext,
    indexing: &IndexingData,
) -> Rule {
    let mut renaming: FxHashMap<Variable, Variable> = FxHashMap::default();
    for var in rule.variable_occurrences() {
        if var.is_dont_care() || renaming.contains_key(&var) {
            continue;
        }
        let marked = matches!(var.name().as_str().as_bytes().first(), Some(b'!' | b'?'));
        let renamed = ctx.rename(var, if marked { None } else { prefix });
        renaming.insert(var, renamed);
    }
    rule.map_terms(
        &mut |term| substitute(term, &|var| renaming.get(var).map(|v| Term::variable(*v))),
        indexing,
    )
}
