//! Associative operators in flattened form.
//!
//! An application of an effectively associative label becomes a list
//! collection whose concatenation is that label. Nested lists of the same
//! operator and variables of its sort are spliced in, the unit disappears
//! and anything else is an operand. Subjects are lowered into the same form
//! (see [`Definition::lower`](crate::Definition::lower)), so rule patterns
//! and the terms they rewrite agree on it.

use kil_ir::visit::transform_bottom_up;
use kil_ir::{CollectionOps, ListBuilder, Name, Sort, Term, TermKind};

use super::{Pass, PassError, PassResult};
use crate::{CompileContext, Definition, LabelTable};

pub struct NormalizeAssocPass;

impl Pass for NormalizeAssocPass {
    fn name(&self) -> &'static str {
        "normalize_assoc"
    }

    fn run(&self, definition: &mut Definition, _ctx: &mut CompileContext) -> Result<PassResult, PassError> {
        let mut normalized = Vec::new();
        for (id, rule) in definition.rules().iter().enumerate() {
            let mut changed = false;
            let rule = rule.map_terms(
                &mut |term| {
                    let flat = flatten_assoc(term, definition.labels());
                    changed |= !Term::ptr_eq(&flat, term);
                    flat
                },
                definition.indexing_data(),
            );
            if changed {
                normalized.push((id, rule));
            }
        }

        let count = normalized.len();
        for (id, rule) in normalized {
            definition.replace_rule(id, rule);
        }
        Ok(PassResult::from_count(count))
    }
}

fn assoc_ops(sort: Sort, label: Name, labels: &LabelTable) -> CollectionOps {
    CollectionOps {
        sort,
        concat: label,
        unit: labels.unit(label).unwrap_or(label),
        element: None,
    }
}

/// Flatten every effectively associative application in `term`.
///
/// An application that flattens to nothing becomes the operator's unit, one
/// that flattens to a single operand becomes that operand.
pub fn flatten_assoc(term: &Term, labels: &LabelTable) -> Term {
    transform_bottom_up(term, &mut |node| {
        let Some(app) = node.as_application() else {
            return node;
        };
        let Some(label) = app.constant_label() else {
            return node;
        };
        if !labels.is_effectively_assoc(label) {
            return node;
        }

        let mut builder = ListBuilder::new(assoc_ops(app.sort(), label, labels));
        for arg in app.args() {
            builder.concatenate(arg);
        }
        builder.build()
    })
}

/// Rebuild flattened associative lists as right-nested binary applications.
pub fn unflatten_assoc(term: &Term) -> Term {
    transform_bottom_up(term, &mut |node| {
        let TermKind::List(list) = node.kind() else {
            return node;
        };
        let ops = list.ops();
        if ops.element.is_some() {
            return node;
        }

        let unit = Term::apply_sorted(ops.sort, ops.unit, Vec::new());
        let mut items: Vec<Term> = list
            .left()
            .iter()
            .chain(list.base())
            .chain(list.right())
            .cloned()
            .collect();
        let Some(mut folded) = items.pop() else {
            return unit;
        };
        while let Some(item) = items.pop() {
            folded = Term::apply_sorted(ops.sort, ops.concat, vec![item, folded]);
        }
        folded
    })
}
