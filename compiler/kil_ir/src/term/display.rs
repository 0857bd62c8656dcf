//! K-like rendering of terms for diagnostics, logs and test failures.

use std::fmt;

use super::{Label, Term, TermKind, Variable};

fn join<T: fmt::Display>(f: &mut fmt::Formatter<'_>, items: &[T], sep: &str) -> fmt::Result {
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            f.write_str(sep)?;
        }
        write!(f, "{item}")?;
    }
    Ok(())
}

impl fmt::Display for Variable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.id() == 0 {
            write!(f, "{}", self.name())
        } else {
            write!(f, "{}_{}", self.name(), self.id())
        }
    }
}

impl fmt::Debug for Variable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self}:{}", self.sort())
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Label::Constant(name) => write!(f, "{name}"),
            Label::Freezer(frozen) => write!(f, "#freezer({frozen})"),
        }
    }
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind() {
            TermKind::Application(app) => {
                if app.args.is_empty() {
                    write!(f, "{}", app.label)
                } else {
                    write!(f, "{}(", app.label)?;
                    join(f, &app.args, ", ")?;
                    f.write_str(")")
                }
            }
            TermKind::Token(token) => write!(f, "{}", token.value),
            TermKind::Sequence(seq) => {
                if seq.items.is_empty() && seq.frame.is_none() {
                    return f.write_str(".K");
                }
                join(f, &seq.items, " ~> ")?;
                if let Some(frame) = &seq.frame {
                    write!(f, " ~> {frame}")?;
                }
                Ok(())
            }
            TermKind::List(list) => {
                f.write_str("[")?;
                let mut parts: Vec<&Term> = list.left.iter().collect();
                parts.extend(&list.base);
                parts.extend(&list.right);
                join(f, &parts, ", ")?;
                f.write_str("]")
            }
            TermKind::Map(map) => {
                let mut parts: Vec<String> = map
                    .entries
                    .iter()
                    .map(|(k, v)| format!("{k} |-> {v}"))
                    .collect();
                parts.sort();
                parts.extend(map.base.iter().map(ToString::to_string));
                f.write_str("{")?;
                join(f, &parts, ", ")?;
                f.write_str("}")
            }
            TermKind::Set(set) => {
                let mut parts: Vec<String> = set.elements.iter().map(ToString::to_string).collect();
                parts.sort();
                parts.extend(set.base.iter().map(ToString::to_string));
                f.write_str("{")?;
                join(f, &parts, ", ")?;
                f.write_str("}")
            }
            TermKind::Cells(cells) => {
                if cells.cells.is_empty() && cells.frames.is_empty() {
                    return f.write_str(".Bag");
                }
                for (i, cell) in cells.cells.iter().enumerate() {
                    if i > 0 {
                        f.write_str(" ")?;
                    }
                    write!(f, "<{0}> {1} </{0}>", cell.label, cell.content)?;
                }
                for frame in &cells.frames {
                    write!(f, " {frame}")?;
                }
                Ok(())
            }
            TermKind::Variable(var) => write!(f, "{var}"),
            TermKind::Hole => f.write_str("HOLE"),
            TermKind::LabelInjection(label) => write!(f, "#klabel({label})"),
            TermKind::Rewrite(rewrite) => write!(f, "({} => {})", rewrite.left, rewrite.right),
            TermKind::Disjunction(disjunction) => {
                f.write_str("(")?;
                for (i, (pattern, rules)) in disjunction.branches.iter().enumerate() {
                    if i > 0 {
                        f.write_str(" \\/ ")?;
                    }
                    write!(f, "{pattern} {rules:?}")?;
                }
                f.write_str(")")
            }
            TermKind::InnerRhs(inner) => {
                f.write_str("[")?;
                for (i, entry) in inner.by_rule.iter().enumerate() {
                    if i > 0 {
                        f.write_str(" | ")?;
                    }
                    match entry {
                        Some(term) => write!(f, "{term}")?,
                        None => f.write_str("_")?,
                    }
                }
                f.write_str("]")
            }
        }
    }
}

impl fmt::Debug for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}
