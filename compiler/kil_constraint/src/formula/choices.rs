use kil_ir::{Term, TermKind};

use super::{ConjunctiveFormula, Deferred};

/// Lazy cartesian product over the pending choices of a formula.
///
/// Each item is the formula with every choice replaced by one concrete key
/// or element. Combinations that turn out false are skipped. A formula
/// without resolvable choices yields itself once.
pub struct Choices {
    base: Option<ConjunctiveFormula>,
    /// Chosen variable and its candidates, per resolvable choice.
    options: Vec<(Term, Vec<Term>)>,
    cursor: Vec<usize>,
}

impl Choices {
    pub(super) fn new(formula: &ConjunctiveFormula) -> Self {
        if formula.is_false() {
            return Choices {
                base: None,
                options: Vec::new(),
                cursor: Vec::new(),
            };
        }

        let mut base = formula.clone();
        let mut options = Vec::new();
        base.deferred.retain(|deferred| {
            let candidates: Option<(Term, Vec<Term>)> = match deferred {
                Deferred::MapChoice { map, key } => match map.kind() {
                    TermKind::Map(m) if !m.entries().is_empty() => {
                        Some((key.clone(), m.entries().keys().cloned().collect()))
                    }
                    _ => None,
                },
                Deferred::SetChoice { set, element } => match set.kind() {
                    TermKind::Set(s) if !s.elements().is_empty() => {
                        Some((element.clone(), s.elements().iter().cloned().collect()))
                    }
                    _ => None,
                },
                _ => None,
            };
            match candidates {
                Some((target, mut candidates)) => {
                    candidates.sort_by_key(Term::hash_value);
                    options.push((target, candidates));
                    false
                }
                None => true,
            }
        });

        let cursor = vec![0; options.len()];
        Choices {
            base: Some(base),
            options,
            cursor,
        }
    }

    /// Step the odometer; drops the base once every combination was produced.
    fn advance(&mut self) {
        for (digit, (_, candidates)) in self.cursor.iter_mut().zip(&self.options).rev() {
            *digit += 1;
            if *digit < candidates.len() {
                return;
            }
            *digit = 0;
        }
        self.base = None;
    }
}

impl Iterator for Choices {
    type Item = ConjunctiveFormula;

    fn next(&mut self) -> Option<ConjunctiveFormula> {
        loop {
            let mut candidate = self.base.as_ref()?.clone();
            for ((target, candidates), &digit) in self.options.iter().zip(&self.cursor) {
                candidate.add(target.clone(), candidates[digit].clone());
            }
            candidate.simplify();
            self.advance();
            if !candidate.is_false() {
                return Some(candidate);
            }
        }
    }
}
