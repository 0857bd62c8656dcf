//! Lowering front-end terms to the term model.
//!
//! Labels are interpreted through the production table and the cell
//! configuration:
//! - `#hole` and `#freezer(frozen, args..)` become the hole and a freezer label
//! - `#EmptyK` and `#KSequence` become sequences
//! - configured cells, and `#cells` juxtapositions, become cell collections
//! - labels hooked to `LIST`/`MAP`/`SET` become collections
//!
//! Rewrites between whole groups of cells are lifted to the enclosing cell so
//! that cell collections only ever hold cells and frame variables.

use kil_diagnostic::{Diagnostic, ErrorCode, ErrorGuaranteed};
use kil_index::IndexingData;
use kil_ir::stack::ensure_sufficient_stack;
use kil_ir::well_known::names;
use kil_ir::{
    Att, CellBuilder, CellConfig, CellInfo, CollectionOps, Label, ListBuilder, MapBuilder,
    Multiplicity, Name, SequenceBuilder, SetBuilder, Sort, Term, TermKind, Variable,
};

use crate::eval::Hook;
use crate::kast::{KConfiguration, KRule, KTerm, Side};
use crate::{
    flatten_conjunction, left_side, CollectionKind, CollectionRole, CompileContext, LabelTable,
    Rule, RuleKind,
};

const CELLS: &str = "#cells";
const DOT_BAG: &str = ".Bag";

/// Declare every cell of the configurations.
///
/// A configuration containing a rewrite is reported and skipped.
pub fn cell_config(configurations: &[KConfiguration], ctx: &mut CompileContext) -> CellConfig {
    let mut config = CellConfig::new();
    for configuration in configurations {
        if let Some(rewrite) = first_rewrite(&configuration.body) {
            let location = rewrite.location().or(configuration.att.location());
            ctx.emit_error(
                Diagnostic::error(ErrorCode::E1003)
                    .with_message("Rewrites are not allowed in configurations.")
                    .with_optional_label(location, "rewrite in configuration"),
            );
            continue;
        }
        declare_cells(&configuration.body, None, &mut config);
    }
    config
}

fn declare_cells(term: &KTerm, parent: Option<Name>, config: &mut CellConfig) {
    if let KTerm::Apply { label, args, att } = term {
        if att.contains(Att::CELL) {
            let multiplicity = att
                .get(Att::MULTIPLICITY)
                .and_then(Multiplicity::from_attr)
                .unwrap_or_default();
            let sort = att.sort().unwrap_or_else(Sort::k);
            config.declare(
                *label,
                CellInfo {
                    multiplicity,
                    sort,
                    parent,
                },
            );
            for arg in args {
                declare_cells(arg, Some(*label), config);
            }
            return;
        }
    }
    for child in term.children() {
        declare_cells(child, parent, config);
    }
}

fn first_rewrite(term: &KTerm) -> Option<&KTerm> {
    if term.is_rewrite() {
        return Some(term);
    }
    term.children().into_iter().find_map(first_rewrite)
}

/// Converts front-end terms of one definition.
pub struct Lowering<'a> {
    labels: &'a LabelTable,
    cells: &'a CellConfig,
}

impl<'a> Lowering<'a> {
    pub fn new(labels: &'a LabelTable, cells: &'a CellConfig) -> Self {
        Lowering { labels, cells }
    }

    /// Lower a front-end rule and classify it.
    pub fn rule(
        &self,
        rule: &KRule,
        indexing: &IndexingData,
        ctx: &mut CompileContext,
    ) -> Result<Rule, ErrorGuaranteed> {
        let body = self.term(&rule.body, ctx)?;
        let requires = match &rule.requires {
            Some(condition) => flatten_conjunction(&self.term(condition, ctx)?),
            None => Vec::new(),
        };
        let ensures = match &rule.ensures {
            Some(condition) => flatten_conjunction(&self.term(condition, ctx)?),
            None => Vec::new(),
        };
        let mut att = rule.att.clone();
        if att.location().is_none() {
            if let Some(location) = rule.body.location() {
                att = att.with_location(location);
            }
        }
        let kind = RuleKind::classify(&att, left_side(&body).constant_label(), self.labels);
        Ok(Rule::new(body, requires, ensures, att, kind, indexing))
    }

    pub fn term(&self, term: &KTerm, ctx: &mut CompileContext) -> Result<Term, ErrorGuaranteed> {
        ensure_sufficient_stack(|| match term {
            KTerm::Apply { label, args, att } => self.apply(*label, args, att, ctx),
            KTerm::Token { sort, value, .. } => Ok(Term::token(*sort, value.as_str())),
            KTerm::Sequence { items, .. } => self.sequence(items, ctx),
            KTerm::Variable { name, att } => {
                let sort = att.sort().unwrap_or_else(Sort::k);
                let var = Variable::from_name(*name, sort);
                // Every anonymous variable is distinct.
                let var = if name.as_str() == "_" {
                    var.with_id(ctx.fresh_id())
                } else {
                    var
                };
                Ok(Term::variable(var))
            }
            KTerm::Rewrite { left, right, .. } => {
                Ok(Term::rewrite(self.term(left, ctx)?, self.term(right, ctx)?))
            }
            KTerm::InjectedLabel { label, .. } => Ok(Term::label_injection(*label)),
        })
    }

    fn terms(&self, terms: &[KTerm], ctx: &mut CompileContext) -> Result<Vec<Term>, ErrorGuaranteed> {
        terms.iter().map(|t| self.term(t, ctx)).collect()
    }

    fn sequence(&self, items: &[KTerm], ctx: &mut CompileContext) -> Result<Term, ErrorGuaranteed> {
        let items = self.terms(items, ctx)?;
        let mut builder = SequenceBuilder::new();
        builder.concatenate(&items);
        Ok(builder.build())
    }

    fn apply(
        &self,
        label: Name,
        args: &[KTerm],
        att: &Att,
        ctx: &mut CompileContext,
    ) -> Result<Term, ErrorGuaranteed> {
        let wk = &names().labels;
        if args.is_empty() && label == wk.hole {
            return Ok(Term::hole());
        }
        if args.is_empty() && label == wk.dot_k {
            return Ok(Term::dot_k());
        }
        if label == wk.kseq {
            return self.sequence(args, ctx);
        }
        if label == wk.freezer {
            if let Some((frozen, rest)) = args.split_first() {
                let frozen = self.term(frozen, ctx)?;
                let rest = self.terms(rest, ctx)?;
                return Ok(Term::apply_sorted(Sort::kitem(), Label::Freezer(frozen), rest));
            }
        }
        if label.as_str() == CELLS {
            return self.cell_content(args, ctx);
        }
        if self.cells.is_cell(label) {
            let content = self.cell_content(args, ctx)?;
            let mut builder = CellBuilder::new();
            builder.put(label, self.cells.multiplicity(label), content);
            return Ok(builder.build());
        }
        if let Some((kind, role)) = self.labels.collection(label) {
            return self.collection(kind, role, args, att, ctx);
        }
        let sort = self
            .labels
            .sort_of(label)
            .or_else(|| Hook::from_label(label.as_str()).and_then(Hook::result_sort))
            .or_else(|| att.sort())
            .unwrap_or_else(Sort::kitem);
        Ok(Term::apply_sorted(sort, label, self.terms(args, ctx)?))
    }

    fn collection(
        &self,
        kind: CollectionKind,
        role: CollectionRole,
        args: &[KTerm],
        att: &Att,
        ctx: &mut CompileContext,
    ) -> Result<Term, ErrorGuaranteed> {
        let args = self.terms(args, ctx)?;
        let term = match kind {
            CollectionKind::List => {
                let mut builder = ListBuilder::new(CollectionOps::list());
                for arg in args {
                    match role {
                        CollectionRole::Concat => builder.concatenate(&arg),
                        CollectionRole::Element => builder.add_item(arg),
                        CollectionRole::Unit => &mut builder,
                    };
                }
                builder.build()
            }
            CollectionKind::Set => {
                let mut builder = SetBuilder::new(CollectionOps::set());
                for arg in args {
                    match role {
                        CollectionRole::Concat => builder.concatenate(&arg),
                        CollectionRole::Element => builder.add(arg),
                        CollectionRole::Unit => &mut builder,
                    };
                }
                builder.build()
            }
            CollectionKind::Map => {
                let mut builder = MapBuilder::new(CollectionOps::map());
                match (role, args.as_slice()) {
                    (CollectionRole::Concat, parts) => {
                        for part in parts {
                            builder.concatenate(part);
                        }
                    }
                    (CollectionRole::Element, [key, value]) => {
                        builder.put(key.clone(), value.clone());
                    }
                    (CollectionRole::Unit, []) => {}
                    (_, parts) => {
                        return Err(ctx.emit_error(
                            Diagnostic::error(ErrorCode::E9001)
                                .with_message(format!(
                                    "map {role:?} applied to {} arguments",
                                    parts.len()
                                ))
                                .with_optional_label(att.location(), "malformed map term"),
                        ));
                    }
                }
                builder.build()
            }
        };
        Ok(term)
    }

    fn is_bag_item(&self, term: &KTerm) -> bool {
        match term {
            KTerm::Apply { label, .. } => {
                self.cells.is_cell(*label) || matches!(label.as_str(), CELLS | DOT_BAG)
            }
            KTerm::Variable { att, .. } => att.sort() == Some(Sort::bag()),
            KTerm::Rewrite { left, right, .. } => self.is_bag_item(left) || self.is_bag_item(right),
            _ => false,
        }
    }

    /// Content of a cell: either an ordinary term or a group of cells.
    fn cell_content(&self, args: &[KTerm], ctx: &mut CompileContext) -> Result<Term, ErrorGuaranteed> {
        if !args.iter().any(|arg| self.is_bag_item(arg)) {
            return self.sequence(args, ctx);
        }
        let bag_rewrites: Vec<&KTerm> = args
            .iter()
            .filter(|arg| arg.is_rewrite() && self.is_bag_item(arg))
            .collect();
        if bag_rewrites.is_empty() {
            return self.bag(args, ctx);
        }
        for rewrite in &bag_rewrites {
            if let KTerm::Rewrite { left, right, att } = rewrite {
                if left.contains_rewrite() || right.contains_rewrite() {
                    return Err(ctx.emit_error(
                        Diagnostic::error(ErrorCode::E1002)
                            .with_message("Rewrites are not allowed to be nested.")
                            .with_optional_label(att.location(), "nested rewrite"),
                    ));
                }
            }
        }
        let left: Vec<KTerm> = args.iter().map(|arg| arg.project(Side::Left)).collect();
        let right: Vec<KTerm> = args.iter().map(|arg| arg.project(Side::Right)).collect();
        Ok(Term::rewrite(self.bag(&left, ctx)?, self.bag(&right, ctx)?))
    }

    fn bag(&self, args: &[KTerm], ctx: &mut CompileContext) -> Result<Term, ErrorGuaranteed> {
        let mut builder = CellBuilder::new();
        for arg in args {
            if let KTerm::Apply { label, args, .. } = arg {
                if args.is_empty() && label.as_str() == DOT_BAG {
                    continue;
                }
            }
            let lowered = self.term(arg, ctx)?;
            match lowered.kind() {
                TermKind::Cells(_) | TermKind::Variable(_) => {
                    builder.concatenate(&lowered);
                }
                _ => {
                    return Err(ctx.emit_error(
                        Diagnostic::error(ErrorCode::E9001)
                            .with_message(format!("`{lowered}` cannot appear among cells"))
                            .with_optional_label(arg.location(), "expected a cell or a Bag variable"),
                    ));
                }
            }
        }
        Ok(builder.build())
    }
}

#[cfg(test)]
mod tests;
