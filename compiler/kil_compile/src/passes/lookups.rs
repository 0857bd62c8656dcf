//! Side-condition lookups.
//!
//! `#match(P, V)`, `#setChoice(E, S)` and `#mapChoice(K, M)` conjuncts leave
//! `requires` and become lookup equations `(V, P)`, `(Set:choice(S), E)` and
//! `(Map:choice(M), K)`, which the constraint store resolves once the
//! collection is known.

use kil_ir::well_known::names;
use kil_ir::{Name, Term};

use super::{Pass, PassError, PassResult};
use crate::{CompileContext, Definition};

pub struct ConvertLookupsPass;

impl Pass for ConvertLookupsPass {
    fn name(&self) -> &'static str {
        "convert_lookups"
    }

    fn required(&self) -> bool {
        true
    }

    fn run(&self, definition: &mut Definition, _ctx: &mut CompileContext) -> Result<PassResult, PassError> {
        let mut converted = Vec::new();
        for (id, rule) in definition.rules().iter().enumerate() {
            let mut requires = Vec::with_capacity(rule.requires().len());
            let mut equations = rule.lookup_equations().to_vec();
            for condition in rule.requires() {
                match lookup_equation(condition) {
                    Some(equation) => equations.push(equation),
                    None => requires.push(condition.clone()),
                }
            }
            if equations.len() == rule.lookup_equations().len() {
                continue;
            }
            converted.push((
                id,
                rule.rebuild(
                    rule.body().clone(),
                    requires,
                    rule.ensures().to_vec(),
                    equations,
                    definition.indexing_data(),
                ),
            ));
        }

        let count = converted.len();
        for (id, rule) in converted {
            definition.replace_rule(id, rule);
        }
        Ok(PassResult::from_count(count))
    }
}

/// The `(value, pattern)` equation a side condition stands for.
pub(crate) fn lookup_equation(condition: &Term) -> Option<(Term, Term)> {
    let app = condition.as_application()?;
    let label = app.constant_label()?;
    let labels = &names().labels;
    let choice = |function: Name, collection: &Term| Term::apply(function, vec![collection.clone()]);
    match app.args() {
        [pattern, value] if label == labels.match_ => Some((value.clone(), pattern.clone())),
        [element, set] if label == labels.set_choice => {
            Some((choice(labels.set_choice_fn, set), element.clone()))
        }
        [key, map] if label == labels.map_choice => {
            Some((choice(labels.map_choice_fn, map), key.clone()))
        }
        _ => None,
    }
}
