//! Front-end term AST.
//!
//! This is the shape a parser hands over: applications, tokens, sequences,
//! variables, rewrites and injected labels, each with an attribute bag that
//! carries the source location, a declared sort and user flags. Nothing here
//! is hash-consed; lowering turns it into [`kil_ir::Term`]s.

use kil_ir::{Att, Location, Name, Sort};

/// A front-end term.
#[derive(Clone, Debug, PartialEq)]
pub enum KTerm {
    Apply {
        label: Name,
        args: Vec<KTerm>,
        att: Att,
    },
    Token {
        sort: Sort,
        value: Name,
        att: Att,
    },
    Sequence {
        items: Vec<KTerm>,
        att: Att,
    },
    /// Sort comes from the `sort` attribute, `K` when absent.
    Variable {
        name: Name,
        att: Att,
    },
    Rewrite {
        left: Box<KTerm>,
        right: Box<KTerm>,
        att: Att,
    },
    InjectedLabel {
        label: Name,
        att: Att,
    },
}

impl KTerm {
    pub fn apply(label: &str, args: Vec<KTerm>) -> Self {
        KTerm::Apply {
            label: Name::intern(label),
            args,
            att: Att::new(),
        }
    }

    pub fn token(sort: &str, value: &str) -> Self {
        KTerm::Token {
            sort: Sort::new(sort),
            value: Name::intern(value),
            att: Att::new(),
        }
    }

    pub fn int(value: i128) -> Self {
        Self::token("Int", &value.to_string())
    }

    pub fn bool(value: bool) -> Self {
        Self::token("Bool", if value { "true" } else { "false" })
    }

    pub fn var(name: &str, sort: &str) -> Self {
        KTerm::Variable {
            name: Name::intern(name),
            att: Att::new().with_value(Att::SORT, sort),
        }
    }

    pub fn seq(items: Vec<KTerm>) -> Self {
        KTerm::Sequence {
            items,
            att: Att::new(),
        }
    }

    pub fn rewrite(left: KTerm, right: KTerm) -> Self {
        KTerm::Rewrite {
            left: Box::new(left),
            right: Box::new(right),
            att: Att::new(),
        }
    }

    pub fn injected(label: &str) -> Self {
        KTerm::InjectedLabel {
            label: Name::intern(label),
            att: Att::new(),
        }
    }

    pub fn att(&self) -> &Att {
        match self {
            KTerm::Apply { att, .. }
            | KTerm::Token { att, .. }
            | KTerm::Sequence { att, .. }
            | KTerm::Variable { att, .. }
            | KTerm::Rewrite { att, .. }
            | KTerm::InjectedLabel { att, .. } => att,
        }
    }

    fn att_mut(&mut self) -> &mut Att {
        match self {
            KTerm::Apply { att, .. }
            | KTerm::Token { att, .. }
            | KTerm::Sequence { att, .. }
            | KTerm::Variable { att, .. }
            | KTerm::Rewrite { att, .. }
            | KTerm::InjectedLabel { att, .. } => att,
        }
    }

    #[must_use]
    pub fn with_att(mut self, att: Att) -> Self {
        *self.att_mut() = att;
        self
    }

    #[must_use]
    pub fn at(mut self, location: Location) -> Self {
        let att = std::mem::take(self.att_mut());
        *self.att_mut() = att.with_location(location);
        self
    }

    pub fn location(&self) -> Option<Location> {
        self.att().location()
    }

    pub fn is_rewrite(&self) -> bool {
        matches!(self, KTerm::Rewrite { .. })
    }

    /// Direct children, rewrite sides included.
    pub fn children(&self) -> Vec<&KTerm> {
        match self {
            KTerm::Apply { args, .. } => args.iter().collect(),
            KTerm::Sequence { items, .. } => items.iter().collect(),
            KTerm::Rewrite { left, right, .. } => vec![left, right],
            KTerm::Token { .. } | KTerm::Variable { .. } | KTerm::InjectedLabel { .. } => {
                Vec::new()
            }
        }
    }

    pub fn contains_rewrite(&self) -> bool {
        self.is_rewrite() || self.children().into_iter().any(KTerm::contains_rewrite)
    }

    /// This term with every rewrite replaced by one of its sides.
    #[must_use]
    pub fn project(&self, side: Side) -> KTerm {
        match self {
            KTerm::Rewrite { left, right, .. } => match side {
                Side::Left => left.project(side),
                Side::Right => right.project(side),
            },
            KTerm::Apply { label, args, att } => KTerm::Apply {
                label: *label,
                args: args.iter().map(|arg| arg.project(side)).collect(),
                att: att.clone(),
            },
            KTerm::Sequence { items, att } => KTerm::Sequence {
                items: items.iter().map(|item| item.project(side)).collect(),
                att: att.clone(),
            },
            KTerm::Token { .. } | KTerm::Variable { .. } | KTerm::InjectedLabel { .. } => {
                self.clone()
            }
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Side {
    Left,
    Right,
}

/// A syntax production: a label, its result sort and arity.
#[derive(Clone, Debug, PartialEq)]
pub struct Production {
    pub label: Name,
    pub sort: Sort,
    pub arity: usize,
    pub att: Att,
}

impl Production {
    pub fn new(label: &str, sort: &str, arity: usize) -> Self {
        Production {
            label: Name::intern(label),
            sort: Sort::new(sort),
            arity,
            att: Att::new(),
        }
    }

    #[must_use]
    pub fn with_att(mut self, att: Att) -> Self {
        self.att = att;
        self
    }

    /// The tag priorities refer to this production by.
    pub fn tag(&self) -> Name {
        self.att.get(Att::TAG).map_or(self.label, Name::intern)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct KRule {
    pub body: KTerm,
    pub requires: Option<KTerm>,
    pub ensures: Option<KTerm>,
    pub att: Att,
}

impl KRule {
    pub fn new(body: KTerm) -> Self {
        KRule {
            body,
            requires: None,
            ensures: None,
            att: Att::new(),
        }
    }

    #[must_use]
    pub fn requires(mut self, condition: KTerm) -> Self {
        self.requires = Some(condition);
        self
    }

    #[must_use]
    pub fn ensures(mut self, condition: KTerm) -> Self {
        self.ensures = Some(condition);
        self
    }

    #[must_use]
    pub fn with_att(mut self, att: Att) -> Self {
        self.att = att;
        self
    }
}

/// Initial configuration; applications carrying the `cell` attribute declare cells.
#[derive(Clone, Debug, PartialEq)]
pub struct KConfiguration {
    pub body: KTerm,
    pub att: Att,
}

/// Priority blocks, highest first, each a list of production tags.
#[derive(Clone, Debug, PartialEq)]
pub struct Priority {
    pub blocks: Vec<Vec<Name>>,
    pub att: Att,
}

#[derive(Clone, Debug, PartialEq)]
pub enum Sentence {
    Production(Production),
    Rule(KRule),
    Configuration(KConfiguration),
    Priority(Priority),
}

#[derive(Clone, Debug, PartialEq)]
pub struct KModule {
    pub name: Name,
    pub imports: Vec<Name>,
    pub sentences: Vec<Sentence>,
    pub att: Att,
}

impl KModule {
    pub fn new(name: &str) -> Self {
        KModule {
            name: Name::intern(name),
            imports: Vec::new(),
            sentences: Vec::new(),
            att: Att::new(),
        }
    }

    #[must_use]
    pub fn import(mut self, module: &str) -> Self {
        self.imports.push(Name::intern(module));
        self
    }

    #[must_use]
    pub fn with(mut self, sentence: Sentence) -> Self {
        self.sentences.push(sentence);
        self
    }

    #[must_use]
    pub fn production(self, production: Production) -> Self {
        self.with(Sentence::Production(production))
    }

    #[must_use]
    pub fn rule(self, rule: KRule) -> Self {
        self.with(Sentence::Rule(rule))
    }

    #[must_use]
    pub fn at(mut self, location: Location) -> Self {
        self.att = std::mem::take(&mut self.att).with_location(location);
        self
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct KDefinition {
    pub main_module: Name,
    pub modules: Vec<KModule>,
}

impl KDefinition {
    pub fn new(main_module: &str, modules: Vec<KModule>) -> Self {
        KDefinition {
            main_module: Name::intern(main_module),
            modules,
        }
    }

    pub fn module(&self, name: Name) -> Option<&KModule> {
        self.modules.iter().find(|m| m.name == name)
    }
}
