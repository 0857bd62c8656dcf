//! Compiled rules.

use std::fmt;

use kil_constraint::ConjunctiveFormula;
use kil_index::{IndexingData, IndexingPair};
use kil_ir::unshare::freeze;
use kil_ir::visit::{transform, variable_occurrences};
use kil_ir::well_known::names;
use kil_ir::{Att, CellCollection, Location, Name, Term, TermKind, Variable};
use rustc_hash::{FxHashMap, FxHashSet};

use crate::LabelTable;

/// Partition a rule belongs to.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum RuleKind {
    /// Ordinary rewrite rule, fired by the rewrite driver.
    Regular,
    /// Equation defining a function symbol.
    Function,
    /// Applies at any position of its head label.
    Anywhere,
    /// Expanded away at compile time.
    Macro,
    Pattern,
    PatternFolding,
}

impl RuleKind {
    /// From the rule's attributes first, then from its head label's production.
    pub fn classify(att: &Att, head: Option<Name>, labels: &LabelTable) -> RuleKind {
        if att.contains(Att::MACRO) || att.contains(Att::ALIAS) {
            RuleKind::Macro
        } else if att.contains(Att::PATTERN_FOLDING) {
            RuleKind::PatternFolding
        } else if att.contains(Att::PATTERN) {
            RuleKind::Pattern
        } else if att.contains(Att::ANYWHERE) || head.is_some_and(|l| labels.is_anywhere(l)) {
            RuleKind::Anywhere
        } else if att.contains(Att::FUNCTION) || head.is_some_and(|l| labels.is_function(l)) {
            RuleKind::Function
        } else {
            RuleKind::Regular
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            RuleKind::Regular => "regular",
            RuleKind::Function => "function",
            RuleKind::Anywhere => "anywhere",
            RuleKind::Macro => "macro",
            RuleKind::Pattern => "pattern",
            RuleKind::PatternFolding => "pattern-folding",
        }
    }
}

impl fmt::Display for RuleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Cell-level view of a rule over single-instance cells.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FastRewrite {
    /// Pattern each read cell must match.
    pub lhs_of_read_cell: FxHashMap<Name, Term>,
    /// Replacement written into each rewritten cell.
    pub rhs_of_write_cell: FxHashMap<Name, Term>,
    /// Cells read but left unchanged.
    pub cells_to_copy: FxHashSet<Name>,
}

impl FastRewrite {
    /// `None` unless the body is a cell collection without multi-instance cells.
    pub fn derive(body: &Term) -> Option<FastRewrite> {
        let TermKind::Cells(cells) = body.kind() else {
            return None;
        };
        let mut fast = FastRewrite::default();
        fast.collect(cells).then_some(fast)
    }

    fn collect(&mut self, cells: &CellCollection) -> bool {
        for cell in cells.cells() {
            if cell.multiplicity.is_multiple() {
                return false;
            }
            match cell.content.kind() {
                TermKind::Rewrite(rewrite) => {
                    self.lhs_of_read_cell.insert(cell.label, rewrite.left.clone());
                    self.rhs_of_write_cell.insert(cell.label, rewrite.right.clone());
                }
                TermKind::Cells(inner) if cell.content.has_rewrite() => {
                    if !self.collect(inner) {
                        return false;
                    }
                }
                _ if cell.content.has_rewrite() => return false,
                _ => {
                    self.lhs_of_read_cell.insert(cell.label, cell.content.clone());
                    self.cells_to_copy.insert(cell.label);
                }
            }
        }
        true
    }
}

/// A rule ready for matching.
///
/// Everything but `body`, `requires`, `ensures` and the lookup equations is
/// derived once at construction; passes replace whole rules.
#[derive(Clone)]
pub struct Rule {
    kind: RuleKind,
    att: Att,
    body: Term,
    lhs: Term,
    rhs: Term,
    requires: Vec<Term>,
    ensures: Vec<Term>,
    lookup_equations: Vec<(Term, Term)>,
    lookups: ConjunctiveFormula,
    fresh_constants: Vec<Variable>,
    fresh_variables: Vec<Variable>,
    fast_rewrite: Option<FastRewrite>,
    indexing_pair: IndexingPair,
}

impl Rule {
    pub fn new(
        body: Term,
        requires: Vec<Term>,
        ensures: Vec<Term>,
        att: Att,
        kind: RuleKind,
        indexing: &IndexingData,
    ) -> Rule {
        Self::assemble(kind, att, body, requires, ensures, Vec::new(), indexing)
    }

    fn assemble(
        kind: RuleKind,
        att: Att,
        body: Term,
        requires: Vec<Term>,
        ensures: Vec<Term>,
        lookup_equations: Vec<(Term, Term)>,
        indexing: &IndexingData,
    ) -> Rule {
        // Rule terms are spliced into every result and must never be edited.
        let body = freeze(&body);
        let requires: Vec<Term> = requires.iter().map(freeze).collect();
        let ensures: Vec<Term> = ensures.iter().map(freeze).collect();
        let lhs = left_side(&body);
        let rhs = right_side(&body);
        let mut lookups = ConjunctiveFormula::new();
        for (value, pattern) in &lookup_equations {
            lookups.add(value.clone(), pattern.clone());
        }
        lookups.simplify();

        let mut fresh_constants = Vec::new();
        let mut fresh_variables = Vec::new();
        let mut seen = FxHashSet::default();
        let outputs = std::iter::once(&rhs).chain(&ensures);
        for var in outputs.flat_map(variable_occurrences) {
            if !seen.insert(var) {
                continue;
            }
            match var.name().as_str().as_bytes().first() {
                Some(b'!') => fresh_constants.push(var),
                Some(b'?') => fresh_variables.push(var),
                _ => {}
            }
        }

        let fast_rewrite = FastRewrite::derive(&body);
        let indexing_pair = indexing.indexing_pair(&body);
        Rule {
            kind,
            att,
            body,
            lhs,
            rhs,
            requires,
            ensures,
            lookup_equations,
            lookups,
            fresh_constants,
            fresh_variables,
            fast_rewrite,
            indexing_pair,
        }
    }

    /// Same kind and attributes, new parts; derived data is recomputed.
    pub(crate) fn rebuild(
        &self,
        body: Term,
        requires: Vec<Term>,
        ensures: Vec<Term>,
        lookup_equations: Vec<(Term, Term)>,
        indexing: &IndexingData,
    ) -> Rule {
        Self::assemble(
            self.kind,
            self.att.clone(),
            body,
            requires,
            ensures,
            lookup_equations,
            indexing,
        )
    }

    /// Apply `f` to the body, every condition and both sides of every lookup.
    pub(crate) fn map_terms(&self, f: &mut dyn FnMut(&Term) -> Term, indexing: &IndexingData) -> Rule {
        let body = f(&self.body);
        let requires = self.requires.iter().map(&mut *f).collect();
        let ensures = self.ensures.iter().map(&mut *f).collect();
        let lookups = self
            .lookup_equations
            .iter()
            .map(|(value, pattern)| (f(value), f(pattern)))
            .collect();
        self.rebuild(body, requires, ensures, lookups, indexing)
    }

    pub fn kind(&self) -> RuleKind {
        self.kind
    }

    pub fn att(&self) -> &Att {
        &self.att
    }

    /// The user-given rule label.
    pub fn label(&self) -> Option<&'static str> {
        self.att.get(Att::LABEL)
    }

    pub fn location(&self) -> Option<Location> {
        self.att.location()
    }

    /// The rule as written, rewrite markers included.
    pub fn body(&self) -> &Term {
        &self.body
    }

    pub fn lhs(&self) -> &Term {
        &self.lhs
    }

    pub fn rhs(&self) -> &Term {
        &self.rhs
    }

    pub fn requires(&self) -> &[Term] {
        &self.requires
    }

    pub fn ensures(&self) -> &[Term] {
        &self.ensures
    }

    /// `(value, pattern)` pairs the lookups were built from.
    pub fn lookup_equations(&self) -> &[(Term, Term)] {
        &self.lookup_equations
    }

    pub fn lookups(&self) -> &ConjunctiveFormula {
        &self.lookups
    }

    pub fn fresh_constants(&self) -> &[Variable] {
        &self.fresh_constants
    }

    pub fn fresh_variables(&self) -> &[Variable] {
        &self.fresh_variables
    }

    pub fn fast_rewrite(&self) -> Option<&FastRewrite> {
        self.fast_rewrite.as_ref()
    }

    pub fn indexing_pair(&self) -> IndexingPair {
        self.indexing_pair
    }

    /// Label at the top of the left-hand side.
    pub fn head_label(&self) -> Option<Name> {
        self.lhs.constant_label()
    }

    /// Every variable occurrence across body, conditions and lookups.
    pub fn variable_occurrences(&self) -> Vec<Variable> {
        let mut out = variable_occurrences(&self.body);
        for term in self.requires.iter().chain(&self.ensures) {
            out.extend(variable_occurrences(term));
        }
        for (value, pattern) in &self.lookup_equations {
            out.extend(variable_occurrences(value));
            out.extend(variable_occurrences(pattern));
        }
        out
    }
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "rule {}", self.body)?;
        for (i, condition) in self.requires.iter().enumerate() {
            f.write_str(if i == 0 { " requires " } else { " andBool " })?;
            write!(f, "{condition}")?;
        }
        for (value, pattern) in &self.lookup_equations {
            write!(f, " #match({pattern}, {value})")?;
        }
        for (i, condition) in self.ensures.iter().enumerate() {
            f.write_str(if i == 0 { " ensures " } else { " andBool " })?;
            write!(f, "{condition}")?;
        }
        Ok(())
    }
}

impl fmt::Debug for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {self}", self.kind)
    }
}

/// `term` with every rewrite replaced by its left side.
pub fn left_side(term: &Term) -> Term {
    if !term.has_rewrite() {
        return term.clone();
    }
    transform(term, &mut |t| t.as_rewrite().map(|rewrite| left_side(&rewrite.left)))
}

/// `term` with every rewrite replaced by its right side.
pub fn right_side(term: &Term) -> Term {
    if !term.has_rewrite() {
        return term.clone();
    }
    transform(term, &mut |t| t.as_rewrite().map(|rewrite| right_side(&rewrite.right)))
}

/// Split a side condition on `_andBool_`; `true` conjuncts vanish.
pub fn flatten_conjunction(condition: &Term) -> Vec<Term> {
    let mut out = Vec::new();
    collect_conjuncts(condition, &mut out);
    out
}

fn collect_conjuncts(condition: &Term, out: &mut Vec<Term>) {
    if let Some(app) = condition.as_application() {
        if app.constant_label() == Some(names().labels.and_bool) && app.args().len() == 2 {
            for arg in app.args() {
                collect_conjuncts(arg, out);
            }
            return;
        }
    }
    if *condition != Term::bool(true) {
        out.push(condition.clone());
    }
}
