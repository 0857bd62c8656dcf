//! The compiled definition.

use std::sync::Arc;

use kil_diagnostic::ErrorGuaranteed;
use kil_index::{IndexingData, IndexingTable};
use kil_ir::unshare::Unsharer;
use kil_ir::{Att, CellConfig, Name, Term};
use rustc_hash::{FxHashMap, FxHashSet};

use crate::automaton::{fire_candidates, Automaton, Firing};
use crate::kast::KTerm;
use crate::passes::flatten_assoc;
use crate::{CompileContext, LabelTable, Lowering, Rule, RuleKind};

/// Rules by kind plus everything needed to match them.
///
/// Rule ids are positions in [`Definition::rules`]; the indexing table and
/// the automaton are built over the regular rules once the passes are done.
pub struct Definition {
    rules: Vec<Rule>,
    labels: LabelTable,
    cells: CellConfig,
    priorities: Vec<Vec<Name>>,
    constants: FxHashMap<Name, Term>,
    functions: Arc<FxHashSet<Name>>,
    indexing: IndexingData,
    indexing_table: IndexingTable,
    automaton: Option<Automaton>,
    evaluation_fuel: usize,
}

impl Definition {
    pub fn new(
        labels: LabelTable,
        cells: CellConfig,
        priorities: Vec<Vec<Name>>,
        indexing: IndexingData,
    ) -> Self {
        let mut constants = FxHashMap::default();
        for (label, info) in labels.iter() {
            if info.arity == 0 && !info.att.contains(Att::FUNCTION) && labels.collection(label).is_none() {
                constants.insert(label, Term::apply_sorted(info.sort, label, Vec::new()));
            }
        }
        let functions = labels.functions();
        Definition {
            rules: Vec::new(),
            labels,
            cells,
            priorities,
            constants,
            functions,
            indexing,
            indexing_table: IndexingTable::new(),
            automaton: None,
            evaluation_fuel: usize::MAX,
        }
    }

    pub fn add_rule(&mut self, rule: Rule) -> usize {
        self.rules.push(rule);
        self.rules.len() - 1
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    pub fn rule(&self, id: usize) -> Option<&Rule> {
        self.rules.get(id)
    }

    /// Rules of one kind with their ids.
    pub fn rules_of(&self, kind: RuleKind) -> impl Iterator<Item = (usize, &Rule)> {
        self.rules
            .iter()
            .enumerate()
            .filter(move |(_, rule)| rule.kind() == kind)
    }

    pub fn count_of(&self, kind: RuleKind) -> usize {
        self.rules_of(kind).count()
    }

    pub(crate) fn replace_rule(&mut self, id: usize, rule: Rule) {
        self.rules[id] = rule;
    }

    /// Drop rules that failed to compile. Ids of later rules shift down.
    pub(crate) fn remove_rules(&mut self, ids: &FxHashSet<usize>) {
        if ids.is_empty() {
            return;
        }
        let mut id = 0;
        self.rules.retain(|_| {
            let keep = !ids.contains(&id);
            id += 1;
            keep
        });
    }

    pub fn labels(&self) -> &LabelTable {
        &self.labels
    }

    pub fn cells(&self) -> &CellConfig {
        &self.cells
    }

    pub fn priorities(&self) -> &[Vec<Name>] {
        &self.priorities
    }

    /// The shared instance of a nullary constructor.
    pub fn constant(&self, label: Name) -> Option<&Term> {
        self.constants.get(&label)
    }

    /// Labels applied by evaluation rather than matched.
    pub fn functions(&self) -> &Arc<FxHashSet<Name>> {
        &self.functions
    }

    pub fn indexing_data(&self) -> &IndexingData {
        &self.indexing
    }

    pub fn indexing_table(&self) -> &IndexingTable {
        &self.indexing_table
    }

    pub fn automaton(&self) -> Option<&Automaton> {
        self.automaton.as_ref()
    }

    pub(crate) fn set_automaton(&mut self, automaton: Option<Automaton>) {
        self.automaton = automaton;
    }

    pub fn evaluation_fuel(&self) -> usize {
        self.evaluation_fuel
    }

    pub(crate) fn set_evaluation_fuel(&mut self, fuel: usize) {
        self.evaluation_fuel = fuel;
    }

    /// Index the regular rules by their pairs.
    pub(crate) fn rebuild_indexing_table(&mut self) {
        let mut table = IndexingTable::new();
        for (id, rule) in self.rules_of(RuleKind::Regular) {
            table.insert(id, rule.indexing_pair());
        }
        self.indexing_table = table;
    }

    /// Regular rules whose pair is compatible with `subject`'s.
    pub fn candidates(&self, subject: &Term) -> Vec<usize> {
        self.indexing_table
            .candidates(self.indexing.indexing_pair(subject))
    }

    /// Lower a front-end term, e.g. an initial configuration.
    ///
    /// Associative operators come out flattened, the shape rule patterns
    /// have after compilation.
    pub fn lower(&self, term: &KTerm, ctx: &mut CompileContext) -> Result<Term, ErrorGuaranteed> {
        let lowered = Lowering::new(&self.labels, &self.cells).term(term, ctx)?;
        Ok(flatten_assoc(&lowered, &self.labels))
    }

    /// Every regular-rule step from `subject`.
    ///
    /// Goes through the automaton when one was built, otherwise tries the
    /// indexed candidates one by one. A still-mutable node of `subject` that
    /// ends up in several places is copied for all but its first occurrence,
    /// so a caller may edit one result without touching another.
    pub fn step(&self, subject: &Term) -> Vec<Firing> {
        let mut firings = match &self.automaton {
            Some(automaton) => automaton.fire(self, subject),
            None => fire_candidates(self, &self.candidates(subject), subject),
        };
        // Results reuse parts of the subject, and each goes its own way.
        let mut unsharer = Unsharer::default();
        for firing in &mut firings {
            firing.result = unsharer.unshare(&firing.result);
        }
        firings
    }
}
