//! The hash-consed term model.
//!
//! A [`Term`] is a cheap-to-clone handle to an immutable node that caches its
//! structural hash and [`TermFlags`]. Constant-like terms (tokens, nullary
//! applications, label injections, the hole, the empty sequence) are interned:
//! every constructor returns the canonical instance, so two of them are equal
//! exactly when they are the same allocation.
//!
//! Compound terms are built either directly (`Term::apply`, `Term::rewrite`)
//! or through the uniquely owned builders in [`builder`], whose `build`
//! consumes the builder and freezes the node.

use std::sync::Arc;

use rustc_hash::{FxHashMap, FxHashSet};
use smallvec::SmallVec;

mod builder;
mod display;
mod flags;
mod hash;
mod intern;

pub use builder::{CellBuilder, ListBuilder, MapBuilder, SequenceBuilder, SetBuilder};
pub use flags::TermFlags;
pub use intern::{intern, InternKey};

use crate::stack::ensure_sufficient_stack;
use crate::well_known::names;
use crate::{Multiplicity, Name, RuleSet, Sort};

/// Shared handle to a term node.
#[derive(Clone)]
pub struct Term(Arc<TermNode>);

struct TermNode {
    kind: TermKind,
    hash: u64,
    flags: TermFlags,
}

/// The term variants.
#[derive(Clone, PartialEq)]
pub enum TermKind {
    Application(Application),
    Token(Token),
    Sequence(Sequence),
    List(ListCollection),
    Map(MapCollection),
    Set(SetCollection),
    Cells(CellCollection),
    Variable(Variable),
    /// Placeholder inside a frozen context.
    Hole,
    /// A label used as a first-class value.
    LabelInjection(Name),
    /// Rewrite marker inside a rule body.
    Rewrite(Rewrite),
    /// Merged rule position built by the automaton builder.
    Disjunction(Disjunction),
    /// Per-rule right-hand sides of a merged rewrite.
    InnerRhs(InnerRhs),
}

/// Application label: a constant or a frozen context.
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub enum Label {
    Constant(Name),
    /// The frozen application, with exactly one argument replaced by the hole.
    Freezer(Term),
}

impl Label {
    pub fn constant(&self) -> Option<Name> {
        match self {
            Label::Constant(name) => Some(*name),
            Label::Freezer(_) => None,
        }
    }

    /// Label of the frozen application and the position of its hole.
    pub fn frozen_hole(&self) -> Option<(Name, usize)> {
        let Label::Freezer(frozen) = self else {
            return None;
        };
        let app = frozen.as_application()?;
        let label = app.label.constant()?;
        let position = app
            .args
            .iter()
            .position(|arg| matches!(arg.kind(), TermKind::Hole))?;
        Some((label, position))
    }
}

impl From<Name> for Label {
    fn from(name: Name) -> Self {
        Label::Constant(name)
    }
}

impl From<&str> for Label {
    fn from(name: &str) -> Self {
        Label::Constant(Name::intern(name))
    }
}

#[derive(Clone, PartialEq)]
pub struct Application {
    label: Label,
    args: Vec<Term>,
    sort: Sort,
}

impl Application {
    pub fn label(&self) -> &Label {
        &self.label
    }

    pub fn args(&self) -> &[Term] {
        &self.args
    }

    pub fn sort(&self) -> Sort {
        self.sort
    }

    pub fn constant_label(&self) -> Option<Name> {
        self.label.constant()
    }
}

#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub struct Token {
    sort: Sort,
    value: Name,
}

impl Token {
    pub fn sort(&self) -> Sort {
        self.sort
    }

    pub fn value(&self) -> Name {
        self.value
    }

    /// The integer value of an `Int` token.
    pub fn as_int(&self) -> Option<i128> {
        if self.sort == Sort::int() {
            self.value.as_str().parse().ok()
        } else {
            None
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        if self.sort != Sort::bool() {
            return None;
        }
        match self.value.as_str() {
            "true" => Some(true),
            "false" => Some(false),
            _ => None,
        }
    }
}

/// A `~>` sequence: at least two items, or one item and a frame.
#[derive(Clone, PartialEq)]
pub struct Sequence {
    items: Vec<Term>,
    frame: Option<Variable>,
}

impl Sequence {
    pub fn items(&self) -> &[Term] {
        &self.items
    }

    /// Trailing `K` variable standing for the rest of the sequence.
    pub fn frame(&self) -> Option<&Variable> {
        self.frame.as_ref()
    }
}

/// Labels a collection is built from and rebuilt into.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub struct CollectionOps {
    pub sort: Sort,
    pub concat: Name,
    pub unit: Name,
    /// Wrapper label of a single element (`ListItem`, `SetItem`, `_|->_`).
    pub element: Option<Name>,
}

impl CollectionOps {
    pub fn list() -> Self {
        CollectionOps {
            sort: names().sorts.list,
            concat: Name::intern("_List_"),
            unit: Name::intern(".List"),
            element: Some(names().labels.list_item),
        }
    }

    pub fn map() -> Self {
        CollectionOps {
            sort: names().sorts.map,
            concat: Name::intern("_Map_"),
            unit: Name::intern(".Map"),
            element: Some(names().labels.map_item),
        }
    }

    pub fn set() -> Self {
        CollectionOps {
            sort: names().sorts.set,
            concat: Name::intern("_Set_"),
            unit: Name::intern(".Set"),
            element: Some(names().labels.set_item),
        }
    }
}

/// Associative collection: concrete prefix, unresolved middle, concrete suffix.
#[derive(Clone, PartialEq)]
pub struct ListCollection {
    ops: CollectionOps,
    left: Vec<Term>,
    base: Vec<Term>,
    right: Vec<Term>,
}

impl ListCollection {
    pub fn ops(&self) -> CollectionOps {
        self.ops
    }

    pub fn left(&self) -> &[Term] {
        &self.left
    }

    pub fn base(&self) -> &[Term] {
        &self.base
    }

    pub fn right(&self) -> &[Term] {
        &self.right
    }

    pub fn is_concrete(&self) -> bool {
        self.base.is_empty()
    }

    /// Element at `index` when the list is fully concrete.
    pub fn get(&self, index: usize) -> Option<&Term> {
        if self.is_concrete() {
            self.left.get(index)
        } else {
            None
        }
    }

    /// `term` read as a list of the user operator `ops`.
    ///
    /// Operator lists are built with at least two parts, so the unit reads as
    /// the empty list and any single operand as a one-item list. `None` for
    /// lists with an element wrapper and for lists of another operator.
    pub fn operands_of(ops: CollectionOps, term: &Term) -> Option<ListCollection> {
        if ops.element.is_some() {
            return None;
        }
        let mut view = ListCollection {
            ops,
            left: Vec::new(),
            base: Vec::new(),
            right: Vec::new(),
        };
        match term.kind() {
            TermKind::List(list) => return (list.ops == ops).then(|| list.clone()),
            TermKind::Application(app)
                if app.constant_label() == Some(ops.unit) && app.args.is_empty() => {}
            TermKind::Variable(var) if var.sort() == ops.sort => view.base.push(term.clone()),
            _ => view.left.push(term.clone()),
        }
        Some(view)
    }
}

#[derive(Clone, PartialEq)]
pub struct MapCollection {
    ops: CollectionOps,
    entries: FxHashMap<Term, Term>,
    base: Vec<Term>,
}

impl MapCollection {
    pub fn ops(&self) -> CollectionOps {
        self.ops
    }

    pub fn entries(&self) -> &FxHashMap<Term, Term> {
        &self.entries
    }

    pub fn get(&self, key: &Term) -> Option<&Term> {
        self.entries.get(key)
    }

    pub fn base(&self) -> &[Term] {
        &self.base
    }

    pub fn is_concrete(&self) -> bool {
        self.base.is_empty()
    }

    /// In-place update, reachable only through [`Term::try_edit`].
    pub fn insert(&mut self, key: Term, value: Term) -> Option<Term> {
        self.entries.insert(key, value)
    }

    pub fn remove(&mut self, key: &Term) -> Option<Term> {
        self.entries.remove(key)
    }
}

#[derive(Clone, PartialEq)]
pub struct SetCollection {
    ops: CollectionOps,
    elements: FxHashSet<Term>,
    base: Vec<Term>,
}

impl SetCollection {
    pub fn ops(&self) -> CollectionOps {
        self.ops
    }

    pub fn elements(&self) -> &FxHashSet<Term> {
        &self.elements
    }

    pub fn contains(&self, element: &Term) -> bool {
        self.elements.contains(element)
    }

    pub fn base(&self) -> &[Term] {
        &self.base
    }

    pub fn is_concrete(&self) -> bool {
        self.base.is_empty()
    }

    pub fn insert(&mut self, element: Term) -> bool {
        self.elements.insert(element)
    }

    pub fn remove(&mut self, element: &Term) -> bool {
        self.elements.remove(element)
    }
}

#[derive(Clone, PartialEq, Debug)]
pub struct Cell {
    pub label: Name,
    pub multiplicity: Multiplicity,
    pub content: Term,
}

/// Cells in canonical order (by label text) plus unresolved frame variables.
#[derive(Clone, PartialEq)]
pub struct CellCollection {
    cells: Vec<Cell>,
    frames: Vec<Variable>,
}

impl CellCollection {
    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }

    pub fn frames(&self) -> &[Variable] {
        &self.frames
    }

    pub fn is_concrete(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn cells_labeled(&self, label: Name) -> impl Iterator<Item = &Cell> {
        self.cells.iter().filter(move |cell| cell.label == label)
    }

    /// Replace the content of the single cell labeled `label`.
    pub fn set_content(&mut self, label: Name, content: Term) -> bool {
        let mut matching = self.cells.iter_mut().filter(|cell| cell.label == label);
        match (matching.next(), matching.next()) {
            (Some(cell), None) => {
                cell.content = content;
                true
            }
            _ => false,
        }
    }
}

/// A sorted variable. Source variables have id 0; renamed ones get fresh ids.
#[derive(Copy, Clone, PartialEq, Eq, Hash)]
pub struct Variable {
    name: Name,
    sort: Sort,
    id: u32,
}

impl Variable {
    pub fn new(name: &str, sort: Sort) -> Self {
        Self::from_name(Name::intern(name), sort)
    }

    pub const fn from_name(name: Name, sort: Sort) -> Self {
        Variable { name, sort, id: 0 }
    }

    #[must_use]
    pub const fn with_id(self, id: u32) -> Self {
        Variable { id, ..self }
    }

    #[must_use]
    pub const fn with_name(self, name: Name) -> Self {
        Variable { name, ..self }
    }

    /// The marker variable matched without binding.
    pub fn dont_care(sort: Sort) -> Self {
        Self::from_name(names().variables.dont_care, sort)
    }

    pub fn is_dont_care(&self) -> bool {
        self.name == names().variables.dont_care
    }

    pub fn name(&self) -> Name {
        self.name
    }

    pub fn sort(&self) -> Sort {
        self.sort
    }

    pub fn id(&self) -> u32 {
        self.id
    }
}

#[derive(Clone, PartialEq, Debug)]
pub struct Rewrite {
    pub left: Term,
    pub right: Term,
}

/// Merged alternatives at one rule position.
///
/// Each branch is a pattern with the set of rules that share it. Branches are
/// additionally indexed by head label and by token so a subject only visits
/// the branches that can possibly match it.
#[derive(Clone)]
pub struct Disjunction {
    branches: Vec<(Term, RuleSet)>,
    /// Per computational sort, the don't-care variables and the rules that use them.
    variables: Vec<(Sort, Vec<(Variable, RuleSet)>)>,
    by_label: FxHashMap<Name, SmallVec<[usize; 2]>>,
    by_token: FxHashMap<Term, usize>,
    unindexed: Vec<usize>,
}

impl Disjunction {
    pub fn new(branches: Vec<(Term, RuleSet)>) -> Self {
        let mut by_label: FxHashMap<Name, SmallVec<[usize; 2]>> = FxHashMap::default();
        let mut by_token = FxHashMap::default();
        let mut unindexed = Vec::new();
        let mut variables: Vec<(Sort, Vec<(Variable, RuleSet)>)> = Vec::new();

        for (i, (pattern, rules)) in branches.iter().enumerate() {
            match pattern.kind() {
                TermKind::Application(app) if app.label.constant().is_some() => {
                    if let Some(label) = app.label.constant() {
                        by_label.entry(label).or_default().push(i);
                    }
                }
                TermKind::Token(_) => {
                    by_token.insert(pattern.clone(), i);
                }
                TermKind::Variable(var) => {
                    if var.is_dont_care() && var.sort.is_computational() {
                        match variables.iter_mut().find(|(sort, _)| *sort == var.sort) {
                            Some((_, vars)) => vars.push((*var, rules.clone())),
                            None => variables.push((var.sort, vec![(*var, rules.clone())])),
                        }
                    }
                    unindexed.push(i);
                }
                _ => unindexed.push(i),
            }
        }
        variables.sort_by_key(|(sort, _)| sort.name().as_str());

        Disjunction {
            branches,
            variables,
            by_label,
            by_token,
            unindexed,
        }
    }

    pub fn branches(&self) -> &[(Term, RuleSet)] {
        &self.branches
    }

    /// Don't-care variables of `sort` and the rules binding them.
    pub fn variables_for_sort(&self, sort: Sort) -> &[(Variable, RuleSet)] {
        self.variables
            .iter()
            .find(|(s, _)| *s == sort)
            .map_or(&[], |(_, vars)| vars.as_slice())
    }

    /// Branches that may match `subject`, in branch order.
    pub fn candidates<'a>(&'a self, subject: &Term) -> impl Iterator<Item = &'a (Term, RuleSet)> {
        let mut indices: SmallVec<[usize; 4]> = SmallVec::new();
        match subject.kind() {
            TermKind::Application(app) => {
                if let Some(hits) = app.label.constant().and_then(|l| self.by_label.get(&l)) {
                    indices.extend(hits.iter().copied());
                }
            }
            TermKind::Token(_) => {
                if let Some(&hit) = self.by_token.get(subject) {
                    indices.push(hit);
                }
            }
            _ => {}
        }
        // Non-constant subjects can still meet labeled branches through variables.
        if !matches!(subject.kind(), TermKind::Application(_) | TermKind::Token(_)) {
            for hits in self.by_label.values() {
                indices.extend(hits.iter().copied());
            }
            indices.extend(self.by_token.values().copied());
        }
        indices.extend(self.unindexed.iter().copied());
        indices.sort_unstable();
        indices.dedup();
        indices.into_iter().map(move |i| &self.branches[i])
    }
}

impl PartialEq for Disjunction {
    fn eq(&self, other: &Self) -> bool {
        self.branches == other.branches
    }
}

/// Right-hand sides of a merged rewrite, indexed by rule id.
///
/// `None` means the rule leaves the position unchanged.
#[derive(Clone, PartialEq)]
pub struct InnerRhs {
    by_rule: Vec<Option<Term>>,
}

impl InnerRhs {
    pub fn new(by_rule: Vec<Option<Term>>) -> Self {
        InnerRhs { by_rule }
    }

    pub fn get(&self, rule: usize) -> Option<&Term> {
        self.by_rule.get(rule).and_then(Option::as_ref)
    }

    pub fn entries(&self) -> &[Option<Term>] {
        &self.by_rule
    }
}

// Construction

impl Term {
    fn new(kind: TermKind) -> Term {
        let hash = hash::structural_hash(&kind);
        let flags = flags::compute(&kind);
        Term(Arc::new(TermNode { kind, hash, flags }))
    }

    fn new_interned(kind: TermKind) -> Term {
        let hash = hash::structural_hash(&kind);
        let flags = flags::compute(&kind) | TermFlags::INTERNED;
        Term(Arc::new(TermNode { kind, hash, flags }))
    }

    /// Application of sort `KItem`.
    pub fn apply(label: impl Into<Label>, args: Vec<Term>) -> Term {
        Self::apply_sorted(Sort::kitem(), label, args)
    }

    /// Nullary constant applications are interned.
    pub fn apply_sorted(sort: Sort, label: impl Into<Label>, args: Vec<Term>) -> Term {
        match label.into() {
            Label::Constant(name) if args.is_empty() => {
                intern(InternKey::Constant { label: name, sort })
            }
            label => Term::new(TermKind::Application(Application { label, args, sort })),
        }
    }

    /// Canonical token instance.
    pub fn token(sort: Sort, value: &str) -> Term {
        intern(InternKey::Token {
            sort,
            value: Name::intern(value),
        })
    }

    pub fn bool(value: bool) -> Term {
        let labels = &names().labels;
        intern(InternKey::Token {
            sort: Sort::bool(),
            value: if value { labels.true_ } else { labels.false_ },
        })
    }

    pub fn int(value: i128) -> Term {
        Term::token(Sort::int(), &value.to_string())
    }

    pub fn string(value: &str) -> Term {
        Term::token(Sort::string(), value)
    }

    pub fn variable(var: Variable) -> Term {
        Term::new(TermKind::Variable(var))
    }

    pub fn hole() -> Term {
        intern(InternKey::Hole)
    }

    pub fn label_injection(label: Name) -> Term {
        intern(InternKey::LabelInjection(label))
    }

    /// The empty sequence `.K`.
    pub fn dot_k() -> Term {
        intern(InternKey::EmptySequence)
    }

    pub fn rewrite(left: Term, right: Term) -> Term {
        Term::new(TermKind::Rewrite(Rewrite { left, right }))
    }

    pub fn disjunction(disjunction: Disjunction) -> Term {
        Term::new(TermKind::Disjunction(disjunction))
    }

    pub fn inner_rhs(inner: InnerRhs) -> Term {
        Term::new(TermKind::InnerRhs(inner))
    }

    /// Same label and sort as `app`, new arguments.
    pub fn with_args(app: &Application, args: Vec<Term>) -> Term {
        Term::apply_sorted(app.sort, app.label.clone(), args)
    }
}

// Inspection

impl Term {
    #[inline]
    pub fn kind(&self) -> &TermKind {
        &self.0.kind
    }

    #[inline]
    pub fn flags(&self) -> TermFlags {
        self.0.flags
    }

    /// Cached structural hash.
    #[inline]
    pub fn hash_value(&self) -> u64 {
        self.0.hash
    }

    /// Identity comparison.
    #[inline]
    pub fn ptr_eq(a: &Term, b: &Term) -> bool {
        Arc::ptr_eq(&a.0, &b.0)
    }

    /// Address of the node, stable while any handle is alive.
    pub(crate) fn address(&self) -> usize {
        Arc::as_ptr(&self.0) as usize
    }

    pub fn as_application(&self) -> Option<&Application> {
        match self.kind() {
            TermKind::Application(app) => Some(app),
            _ => None,
        }
    }

    pub fn as_token(&self) -> Option<&Token> {
        match self.kind() {
            TermKind::Token(token) => Some(token),
            _ => None,
        }
    }

    pub fn as_variable(&self) -> Option<&Variable> {
        match self.kind() {
            TermKind::Variable(var) => Some(var),
            _ => None,
        }
    }

    pub fn as_sequence(&self) -> Option<&Sequence> {
        match self.kind() {
            TermKind::Sequence(seq) => Some(seq),
            _ => None,
        }
    }

    pub fn as_rewrite(&self) -> Option<&Rewrite> {
        match self.kind() {
            TermKind::Rewrite(rewrite) => Some(rewrite),
            _ => None,
        }
    }

    /// Label of an application with a constant label.
    pub fn constant_label(&self) -> Option<Name> {
        self.as_application().and_then(Application::constant_label)
    }

    pub fn is_dot_k(&self) -> bool {
        Term::ptr_eq(self, &Term::dot_k())
    }

    pub fn is_variable(&self) -> bool {
        matches!(self.kind(), TermKind::Variable(_))
    }

    pub fn is_ground(&self) -> bool {
        !self.0.flags.contains(TermFlags::HAS_VARIABLE)
    }

    pub fn has_rewrite(&self) -> bool {
        self.0.flags.contains(TermFlags::HAS_REWRITE)
    }

    pub fn is_mutable(&self) -> bool {
        self.0.flags.contains(TermFlags::MUTABLE)
    }

    pub fn sort(&self) -> Sort {
        match self.kind() {
            TermKind::Application(app) => app.sort,
            TermKind::Token(token) => token.sort,
            TermKind::List(list) => list.ops.sort,
            TermKind::Map(map) => map.ops.sort,
            TermKind::Set(set) => set.ops.sort,
            TermKind::Cells(_) => Sort::bag(),
            TermKind::Variable(var) => var.sort,
            TermKind::LabelInjection(_) => Sort::kitem(),
            TermKind::Rewrite(rewrite) => rewrite.left.sort(),
            TermKind::Sequence(_)
            | TermKind::Hole
            | TermKind::Disjunction(_)
            | TermKind::InnerRhs(_) => Sort::k(),
        }
    }
}

// Mutation

impl Term {
    /// Edit a mutable node in place.
    ///
    /// Succeeds only for nodes built with `build_mutable` that are not
    /// referenced from anywhere else. The cached hash and flags are refreshed
    /// after `edit` returns; `edit` must keep the variant's shape invariants.
    pub fn try_edit<R>(&mut self, edit: impl FnOnce(&mut TermKind) -> R) -> Option<R> {
        if !self.is_mutable() {
            return None;
        }
        let node = Arc::get_mut(&mut self.0)?;
        let result = edit(&mut node.kind);
        node.hash = hash::structural_hash(&node.kind);
        node.flags = flags::compute(&node.kind) | TermFlags::MUTABLE;
        Some(result)
    }

    /// Mark a freshly built node as mutable. Interned and shared nodes stay frozen.
    pub(crate) fn into_mutable(mut self) -> Term {
        if self.0.flags.contains(TermFlags::INTERNED) {
            return self;
        }
        if let Some(node) = Arc::get_mut(&mut self.0) {
            node.flags |= TermFlags::MUTABLE;
        }
        self
    }

    /// Copy of this node without the mutable marker.
    pub(crate) fn into_frozen(mut self) -> Term {
        if !self.is_mutable() {
            return self;
        }
        if let Some(node) = Arc::get_mut(&mut self.0) {
            node.flags.remove(TermFlags::MUTABLE);
            return self;
        }
        Term::new(self.0.kind.clone())
    }

    /// A fresh node with the same contents.
    pub(crate) fn shallow_copy(&self) -> Term {
        let copy = Term::new(self.0.kind.clone());
        if self.is_mutable() {
            copy.into_mutable()
        } else {
            copy
        }
    }
}

impl PartialEq for Term {
    fn eq(&self, other: &Term) -> bool {
        if Term::ptr_eq(self, other) {
            return true;
        }
        if self.0.hash != other.0.hash {
            return false;
        }
        // Interned terms are unique per payload.
        if self.0.flags.contains(TermFlags::INTERNED) && other.0.flags.contains(TermFlags::INTERNED)
        {
            return false;
        }
        ensure_sufficient_stack(|| self.0.kind == other.0.kind)
    }
}

impl Eq for Term {}

impl std::hash::Hash for Term {
    #[inline]
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        state.write_u64(self.0.hash);
    }
}
