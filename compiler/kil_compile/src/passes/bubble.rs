//! Rewrite placement.
//!
//! A rule body must contain a rewrite, rewrites may not nest, and they may
//! not sit in a side condition or under a function call other than the
//! rule's own head. Legal rewrites are then lifted: inside each cell the
//! content becomes a single `left => right`, and a body outside of cells
//! becomes one rewrite at the top.

use kil_diagnostic::{Diagnostic, ErrorCode};
use kil_ir::visit::for_each_subterm;
use kil_ir::{CellBuilder, Name, Term, TermKind};
use rustc_hash::FxHashSet;
use tracing::debug;

use super::{Pass, PassError, PassResult};
use crate::{left_side, right_side, CompileContext, Definition, Rule};

pub struct BubbleRewritesPass;

impl Pass for BubbleRewritesPass {
    fn name(&self) -> &'static str {
        "bubble_rewrites"
    }

    fn required(&self) -> bool {
        true
    }

    fn run(&self, definition: &mut Definition, ctx: &mut CompileContext) -> Result<PassResult, PassError> {
        let mut failed = FxHashSet::default();
        let mut lifted = Vec::new();
        for (id, rule) in definition.rules().iter().enumerate() {
            if let Err(diag) = check(rule, definition.functions()) {
                ctx.emit_error(diag);
                failed.insert(id);
                continue;
            }
            let body = bubble(rule.body());
            if body != *rule.body() {
                lifted.push((
                    id,
                    rule.rebuild(
                        body,
                        rule.requires().to_vec(),
                        rule.ensures().to_vec(),
                        rule.lookup_equations().to_vec(),
                        definition.indexing_data(),
                    ),
                ));
            }
        }

        let transformed = lifted.len() + failed.len();
        for (id, rule) in lifted {
            definition.replace_rule(id, rule);
        }
        if !failed.is_empty() {
            debug!(dropped = failed.len(), "rules with misplaced rewrites");
        }
        definition.remove_rules(&failed);
        Ok(PassResult::from_count(transformed))
    }
}

fn rejected(rule: &Rule, code: ErrorCode, message: &str, label: &str) -> Diagnostic {
    Diagnostic::error(code)
        .with_message(message)
        .with_optional_label(rule.location(), label)
}

fn check(rule: &Rule, functions: &FxHashSet<Name>) -> Result<(), Diagnostic> {
    if rule.requires().iter().chain(rule.ensures()).any(Term::has_rewrite) {
        return Err(rejected(
            rule,
            ErrorCode::E1004,
            "Rewrites are not allowed in side conditions.",
            "rewrite in side condition",
        ));
    }

    let body = rule.body();
    if !body.has_rewrite() {
        return Err(rejected(
            rule,
            ErrorCode::E1001,
            "Rules must have at least one rewrite.",
            "rule without rewrite",
        ));
    }

    let mut nested = false;
    let mut under_function = false;
    for_each_subterm(body, &mut |t| {
        if let Some(rewrite) = t.as_rewrite() {
            nested |= rewrite.left.has_rewrite() || rewrite.right.has_rewrite();
            return false;
        }
        if !t.has_rewrite() {
            return false;
        }
        if !Term::ptr_eq(t, body) && t.constant_label().is_some_and(|l| functions.contains(&l)) {
            under_function = true;
            return false;
        }
        true
    });

    if nested {
        return Err(rejected(
            rule,
            ErrorCode::E1002,
            "Rewrites are not allowed to be nested.",
            "nested rewrite",
        ));
    }
    if under_function {
        return Err(rejected(
            rule,
            ErrorCode::E1005,
            "Rewrites are not allowed under functions.",
            "rewrite under a function call",
        ));
    }
    Ok(())
}

/// Lift the rewrites of a checked body.
pub(super) fn bubble(body: &Term) -> Term {
    match body.kind() {
        TermKind::Rewrite(_) => body.clone(),
        TermKind::Cells(cells) => {
            let mut builder = CellBuilder::new();
            for cell in cells.cells() {
                builder.put(cell.label, cell.multiplicity, bubble_content(&cell.content));
            }
            for frame in cells.frames() {
                builder.concatenate(&Term::variable(*frame));
            }
            builder.build()
        }
        _ => Term::rewrite(left_side(body), right_side(body)),
    }
}

fn bubble_content(content: &Term) -> Term {
    if content.has_rewrite() {
        bubble(content)
    } else {
        content.clone()
    }
}
