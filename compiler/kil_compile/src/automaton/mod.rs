//! The rule automaton.
//!
//! All regular rules are merged into one pattern. Where the rules agree the
//! pattern is shared and visited once per match; where they diverge a
//! [`Disjunction`] holds one branch per distinct sub-pattern, annotated with
//! the rules that use it. Matching threads the set of live rules through the
//! disjunctions, and every rewrite position carries an [`InnerRhs`] from
//! which each surviving rule picks its own right-hand side.
//!
//! Rules share one substitution while the merged pattern is matched, so the
//! automaton keeps its own copy of every member rule with the variables
//! renamed apart.

use std::sync::Arc;

use kil_constraint::{match_all, match_from, ConjunctiveFormula, MatchState, Substitution};
use kil_ir::stack::ensure_sufficient_stack;
use kil_index::IndexingData;
use kil_ir::visit::{for_each_subterm, substitute};
use kil_ir::{
    Cell, CellBuilder, Disjunction, InnerRhs, RuleSet, SequenceBuilder, Term, TermKind, Variable,
};
use rustc_hash::FxHashMap;
use tracing::{debug, trace};

use crate::eval::{EvalContext, Evaluator};
use crate::{left_side, right_side, Definition, Rule, RuleKind};

/// One successful rule application.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Firing {
    pub rule: usize,
    pub result: Term,
}

/// First variable id handed out when renaming member rules apart.
const MEMBER_IDS: u32 = 1 << 30;

/// The merged regular rules of a definition.
pub struct Automaton {
    pattern: Term,
    rules: RuleSet,
    /// Renamed copies of the member rules, by rule id.
    members: Vec<Option<Rule>>,
}

impl Automaton {
    /// Merge the regular rules; `None` when there are none.
    pub fn new(definition: &Definition) -> Option<Automaton> {
        let width = definition
            .rules_of(RuleKind::Regular)
            .map(|(id, _)| id + 1)
            .max()?;
        let indexing = definition.indexing_data();
        let mut next_id = MEMBER_IDS;
        let renamed: Vec<(usize, Rule)> = definition
            .rules_of(RuleKind::Regular)
            .map(|(id, rule)| (id, rename_apart(rule, &mut next_id, indexing)))
            .collect();
        let items: Vec<(Term, usize)> = renamed
            .iter()
            .map(|(id, rule)| (rule.body().clone(), *id))
            .collect();
        let rules: RuleSet = items.iter().map(|(_, id)| *id).collect();

        let mut merger = Merger::new(width);
        let pattern = merger.merge(&items);
        let pattern = rename(&pattern, &merger.aliases);
        let mut members = vec![None; width];
        for (id, rule) in renamed {
            members[id] = Some(rule.map_terms(&mut |term| rename(term, &merger.aliases), indexing));
        }
        let automaton = Automaton {
            pattern,
            rules,
            members,
        };
        debug!(
            rules = items.len(),
            disjunctions = automaton.disjunction_count(),
            "automaton built"
        );
        Some(automaton)
    }

    /// The merged pattern, rewrites and disjunctions included.
    pub fn pattern(&self) -> &Term {
        &self.pattern
    }

    pub fn rules(&self) -> &RuleSet {
        &self.rules
    }

    /// Number of divergence points.
    pub fn disjunction_count(&self) -> usize {
        let mut count = 0;
        for_each_subterm(&self.pattern, &mut |t| {
            if matches!(t.kind(), TermKind::Disjunction(_)) {
                count += 1;
            }
            true
        });
        count
    }

    /// Every application of a regular rule to `subject`.
    pub fn fire(&self, definition: &Definition, subject: &Term) -> Vec<Firing> {
        let firer = Firer::new(definition);
        let start = MatchState {
            substitution: Substitution::new(),
            rules: Some(self.rules.clone()),
        };
        let mut firings = Vec::new();
        for state in match_from(&self.pattern, subject, start) {
            let live = state.rules.as_ref().unwrap_or(&self.rules);
            trace!(live = ?live, "automaton match");
            for id in live.iter() {
                let Some(rule) = self.members.get(id).and_then(Option::as_ref) else {
                    continue;
                };
                firer.complete(
                    id,
                    rule,
                    &state.substitution,
                    &|substitution| build(&self.pattern, subject, id, rule, substitution),
                    &mut firings,
                );
            }
        }
        firings
    }
}

/// `rule` with every variable carrying a fresh id from `next_id`.
fn rename_apart(rule: &Rule, next_id: &mut u32, indexing: &IndexingData) -> Rule {
    let mut renaming: FxHashMap<Variable, Variable> = FxHashMap::default();
    for var in rule.variable_occurrences() {
        if var.is_dont_care() || renaming.contains_key(&var) {
            continue;
        }
        renaming.insert(var, var.with_id(*next_id));
        *next_id += 1;
    }
    rule.map_terms(&mut |term| rename(term, &renaming), indexing)
}

fn rename(term: &Term, renaming: &FxHashMap<Variable, Variable>) -> Term {
    if renaming.is_empty() {
        return term.clone();
    }
    substitute(term, &|var| renaming.get(var).map(|v| Term::variable(*v)))
}

/// Apply one regular rule, bypassing the automaton.
pub fn fire_rule(definition: &Definition, id: usize, subject: &Term) -> Vec<Firing> {
    fire_candidates(definition, &[id], subject)
}

/// Apply each of `ids` in turn.
pub(crate) fn fire_candidates(definition: &Definition, ids: &[usize], subject: &Term) -> Vec<Firing> {
    let firer = Firer::new(definition);
    let mut firings = Vec::new();
    for &id in ids {
        let Some(rule) = definition.rule(id) else {
            continue;
        };
        for substitution in match_all(rule.lhs(), subject) {
            firer.complete(
                id,
                rule,
                &substitution,
                &|substitution| build(rule.body(), subject, id, rule, substitution),
                &mut firings,
            );
        }
    }
    firings
}

struct Firer<'d> {
    definition: &'d Definition,
    evaluator: Evaluator<'d>,
}

impl<'d> Firer<'d> {
    fn new(definition: &'d Definition) -> Self {
        Firer {
            definition,
            evaluator: Evaluator::new(definition),
        }
    }

    /// Resolve lookups and conditions for one match, then build results.
    fn complete(
        &self,
        id: usize,
        rule: &Rule,
        substitution: &Substitution,
        result_of: &dyn Fn(&Substitution) -> Term,
        firings: &mut Vec<Firing>,
    ) {
        let mut formula = ConjunctiveFormula::from_substitution(substitution.clone())
            .with_functions(Arc::clone(self.definition.functions()));
        formula.add_all(rule.lookups());
        formula.simplify();
        if formula.is_false() {
            return;
        }

        for choice in formula.choices() {
            if !choice.is_substitution() {
                continue;
            }
            let mut ctx = EvalContext::new(self.definition.evaluation_fuel());
            let enabled = rule
                .requires()
                .iter()
                .all(|condition| self.evaluator.holds(&choice.apply(condition), &mut ctx) == Some(true));
            if !enabled {
                continue;
            }
            let mut bindings = choice.substitution().clone();
            for var in rule.fresh_constants() {
                bindings.bind(*var, ctx.fresh_constant(var.sort()));
            }
            let result = self.evaluator.evaluate(&result_of(&bindings), &mut ctx);
            trace!(rule = id, %result, "fired");
            firings.push(Firing { rule: id, result });
        }
    }
}

/// Merges rule bodies position by position.
struct Merger {
    width: usize,
    /// Member variables shared at a common position, mapped to the variable
    /// that stands for all of them.
    aliases: FxHashMap<Variable, Variable>,
}

impl Merger {
    fn new(width: usize) -> Self {
        Merger {
            width,
            aliases: FxHashMap::default(),
        }
    }

    fn merge(&mut self, items: &[(Term, usize)]) -> Term {
        ensure_sufficient_stack(|| {
            if items.iter().any(|(term, _)| term.as_rewrite().is_some()) {
                return self.merge_rewrites(items);
            }
            let Some((first, _)) = items.first() else {
                return Term::dot_k();
            };
            if !first.has_rewrite() && items.iter().all(|(term, _)| term == first) {
                return first.clone();
            }
            if let Some(shared) = self.share_variables(items) {
                return shared;
            }

            match first.kind() {
                TermKind::Application(app) => {
                    let same_shape = items.iter().all(|(term, _)| {
                        term.as_application().is_some_and(|other| {
                            other.label() == app.label()
                                && other.args().len() == app.args().len()
                                && other.sort() == app.sort()
                        })
                    });
                    if same_shape {
                        let args = (0..app.args().len())
                            .map(|i| {
                                self.merge(&column(items, |t| {
                                    t.as_application().map(|a| &a.args()[i])
                                }))
                            })
                            .collect();
                        return Term::with_args(app, args);
                    }
                }
                TermKind::Sequence(seq) => {
                    let same_shape = items.iter().all(|(term, _)| {
                        term.as_sequence().is_some_and(|other| {
                            other.items().len() == seq.items().len()
                                && other.frame().is_some() == seq.frame().is_some()
                        })
                    });
                    let frames: Vec<&[Variable]> = items
                        .iter()
                        .filter_map(|(term, _)| term.as_sequence())
                        .map(|s| s.frame().map(std::slice::from_ref).unwrap_or_default())
                        .collect();
                    if let Some(frame) = same_shape.then(|| self.merge_frames(&frames)).flatten() {
                        let mut builder = SequenceBuilder::new();
                        for i in 0..seq.items().len() {
                            let merged =
                                self.merge(&column(items, |t| t.as_sequence().map(|s| &s.items()[i])));
                            builder.add(&merged);
                        }
                        for var in frame {
                            builder.add(&Term::variable(var));
                        }
                        return builder.build();
                    }
                }
                TermKind::Cells(cells) => {
                    let signature = |cells: &[Cell]| -> Vec<_> {
                        cells.iter().map(|c| (c.label, c.multiplicity)).collect()
                    };
                    let single = cells.cells().iter().all(|c| !c.multiplicity.is_multiple());
                    let mut frames = Vec::with_capacity(items.len());
                    let same_shape = single
                        && items.iter().all(|(term, _)| match term.kind() {
                            TermKind::Cells(other) => {
                                frames.push(other.frames());
                                signature(other.cells()) == signature(cells.cells())
                            }
                            _ => false,
                        });
                    if let Some(frames) = same_shape.then(|| self.merge_frames(&frames)).flatten() {
                        let mut builder = CellBuilder::new();
                        for (i, cell) in cells.cells().iter().enumerate() {
                            let merged = self.merge(&column(items, |t| match t.kind() {
                                TermKind::Cells(other) => Some(&other.cells()[i].content),
                                _ => None,
                            }));
                            builder.put(cell.label, cell.multiplicity, merged);
                        }
                        for frame in frames {
                            builder.concatenate(&Term::variable(frame));
                        }
                        return builder.build();
                    }
                }
                _ => {}
            }
            disjunction(items)
        })
    }

    /// One variable for a column of variables.
    fn share_variables(&mut self, items: &[(Term, usize)]) -> Option<Term> {
        let vars = items
            .iter()
            .map(|(term, _)| term.as_variable().copied())
            .collect::<Option<Vec<Variable>>>()?;
        self.share(&vars).map(Term::variable)
    }

    /// Frames position by position; `None` when some position cannot be
    /// shared.
    fn merge_frames(&mut self, frames: &[&[Variable]]) -> Option<Vec<Variable>> {
        let first = *frames.first()?;
        if frames.iter().any(|f| f.len() != first.len()) {
            return None;
        }
        (0..first.len())
            .map(|i| {
                let column: Vec<Variable> = frames.iter().map(|f| f[i]).collect();
                if column.iter().all(|var| *var == column[0]) {
                    Some(column[0])
                } else {
                    self.share(&column)
                }
            })
            .collect()
    }

    /// Alias distinct, not yet shared variables of one sort to the first.
    ///
    /// Every member rule was renamed apart, so each alias class holds at
    /// most one variable per rule.
    fn share(&mut self, vars: &[Variable]) -> Option<Variable> {
        let first = *vars.first()?;
        let shareable = vars.iter().all(|var| {
            !var.is_dont_care() && var.sort() == first.sort() && !self.aliases.contains_key(var)
        });
        if !shareable {
            return None;
        }
        for var in vars {
            self.aliases.insert(*var, first);
        }
        Some(first)
    }

    fn merge_rewrites(&mut self, items: &[(Term, usize)]) -> Term {
        let mut by_rule = vec![None; self.width];
        let mut lefts = Vec::with_capacity(items.len());
        for (term, id) in items {
            match term.as_rewrite() {
                Some(rewrite) => {
                    lefts.push((rewrite.left.clone(), *id));
                    by_rule[*id] = Some(rewrite.right.clone());
                }
                None if term.has_rewrite() => {
                    lefts.push((left_side(term), *id));
                    by_rule[*id] = Some(right_side(term));
                }
                None => lefts.push((term.clone(), *id)),
            }
        }
        Term::rewrite(self.merge(&lefts), Term::inner_rhs(InnerRhs::new(by_rule)))
    }
}

/// The children of `items` selected by `child`.
fn column<'a>(
    items: &'a [(Term, usize)],
    child: impl Fn(&'a Term) -> Option<&'a Term>,
) -> Vec<(Term, usize)> {
    items
        .iter()
        .filter_map(|(term, id)| child(term).map(|c| (c.clone(), *id)))
        .collect()
}

fn disjunction(items: &[(Term, usize)]) -> Term {
    let mut branches: Vec<(Term, RuleSet)> = Vec::new();
    for (term, id) in items {
        match branches.iter_mut().find(|(branch, _)| branch == term) {
            Some((_, rules)) => rules.insert(*id),
            None => branches.push((term.clone(), RuleSet::singleton(*id))),
        }
    }
    Term::disjunction(Disjunction::new(branches))
}

/// The result of rule `id` at a matched position.
///
/// Positions without a rewrite are copied from the subject. Falls back to
/// instantiating the rule's right-hand side when the pattern and the subject
/// cannot be walked together.
fn build(pattern: &Term, subject: &Term, id: usize, rule: &Rule, substitution: &Substitution) -> Term {
    rebuild(pattern, subject, id, substitution).unwrap_or_else(|| substitution.apply(rule.rhs()))
}

fn rebuild(pattern: &Term, subject: &Term, rule: usize, substitution: &Substitution) -> Option<Term> {
    if !pattern.has_rewrite() {
        return Some(subject.clone());
    }
    ensure_sufficient_stack(|| match pattern.kind() {
        TermKind::Rewrite(rewrite) => match rewrite.right.kind() {
            TermKind::InnerRhs(inner) => Some(
                inner
                    .get(rule)
                    .map_or_else(|| subject.clone(), |rhs| substitution.apply(rhs)),
            ),
            _ => Some(substitution.apply(&rewrite.right)),
        },
        TermKind::Disjunction(disjunction) => {
            let (branch, _) = disjunction
                .branches()
                .iter()
                .find(|(_, rules)| rules.contains(rule))?;
            rebuild(branch, subject, rule, substitution)
        }
        TermKind::Application(app) => {
            let target = subject.as_application()?;
            if target.args().len() != app.args().len() {
                return None;
            }
            let args = app
                .args()
                .iter()
                .zip(target.args())
                .map(|(p, s)| rebuild(p, s, rule, substitution))
                .collect::<Option<Vec<_>>>()?;
            Some(Term::with_args(target, args))
        }
        TermKind::Sequence(seq) => {
            let (items, frame) = match subject.as_sequence() {
                Some(target) => (target.items(), target.frame()),
                None if subject.is_dot_k() => (&[][..], None),
                None => (std::slice::from_ref(subject), None),
            };
            let n = seq.items().len();
            let aligned = match seq.frame() {
                Some(_) => items.len() >= n,
                None => items.len() == n && frame.is_none(),
            };
            if !aligned {
                return None;
            }
            let mut builder = SequenceBuilder::new();
            for (p, s) in seq.items().iter().zip(items) {
                builder.add(&rebuild(p, s, rule, substitution)?);
            }
            builder.concatenate(&items[n..]);
            if let Some(frame) = frame {
                builder.add(&Term::variable(*frame));
            }
            Some(builder.build())
        }
        TermKind::Cells(cells) => rebuild_cells(cells.cells(), subject, rule, substitution),
        _ => None,
    })
}

/// Pair every rewritten pattern cell with the subject cell it matched.
fn rebuild_cells(
    pattern: &[Cell],
    subject: &Term,
    rule: usize,
    substitution: &Substitution,
) -> Option<Term> {
    let TermKind::Cells(target) = subject.kind() else {
        return None;
    };
    let mut contents: Vec<Term> = target.cells().iter().map(|c| c.content.clone()).collect();
    let mut used = vec![false; contents.len()];

    for cell in pattern.iter().filter(|c| c.content.has_rewrite()) {
        let index = target.cells().iter().enumerate().position(|(i, candidate)| {
            !used[i]
                && candidate.label == cell.label
                && !match_from(
                    &cell.content,
                    &candidate.content,
                    MatchState {
                        substitution: substitution.clone(),
                        rules: Some(RuleSet::singleton(rule)),
                    },
                )
                .is_empty()
        })?;
        used[index] = true;
        contents[index] = rebuild(&cell.content, &target.cells()[index].content, rule, substitution)?;
    }

    let mut builder = CellBuilder::new();
    for (cell, content) in target.cells().iter().zip(contents) {
        builder.put(cell.label, cell.multiplicity, content);
    }
    for frame in target.frames() {
        builder.concatenate(&Term::variable(*frame));
    }
    Some(builder.build())
}

#[cfg(test)]
mod tests;
