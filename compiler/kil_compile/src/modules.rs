//! Module import resolution.
//!
//! Flattens the import closure of the main module into one [`FlatModule`],
//! imported modules first, each module visited once.

use kil_diagnostic::{Diagnostic, ErrorCode, ErrorGuaranteed};
use kil_ir::{Location, Name};
use rustc_hash::FxHashSet;
use tracing::debug;

use crate::kast::{KConfiguration, KDefinition, KModule, KRule, Production, Sentence};
use crate::CompileContext;

/// Every sentence reachable from the main module.
#[derive(Clone, Debug, Default)]
pub struct FlatModule {
    pub name: Name,
    pub productions: Vec<Production>,
    pub rules: Vec<KRule>,
    pub configurations: Vec<KConfiguration>,
    /// Priority blocks resolved to labels, highest first.
    pub priorities: Vec<Vec<Name>>,
}

pub fn flatten_modules(
    definition: &KDefinition,
    ctx: &mut CompileContext,
) -> Result<FlatModule, ErrorGuaranteed> {
    let mut order = Vec::new();
    let mut resolver = Resolver {
        definition,
        ctx,
        done: FxHashSet::default(),
        path: Vec::new(),
        failed: None,
    };
    resolver.visit(definition.main_module, None, &mut order);
    if let Some(err) = resolver.failed {
        return Err(err);
    }

    let mut flat = FlatModule {
        name: definition.main_module,
        ..FlatModule::default()
    };
    let mut priorities = Vec::new();
    for module in &order {
        for sentence in &module.sentences {
            match sentence {
                Sentence::Production(p) => flat.productions.push(p.clone()),
                Sentence::Rule(r) => flat.rules.push(r.clone()),
                Sentence::Configuration(c) => flat.configurations.push(c.clone()),
                Sentence::Priority(p) => priorities.push(p),
            }
        }
    }

    let mut failed = None;
    for priority in priorities {
        let location = priority.att.location();
        let mut resolved = Vec::new();
        for block in &priority.blocks {
            let mut labels = Vec::new();
            for &tag in block {
                let matching: Vec<Name> = flat
                    .productions
                    .iter()
                    .filter(|p| p.tag() == tag)
                    .map(|p| p.label)
                    .collect();
                if matching.is_empty() {
                    failed = Some(ctx.emit_error(
                        Diagnostic::error(ErrorCode::E2003)
                            .with_message(format!("Could not find any productions for tag: {tag}"))
                            .with_optional_label(location, "in this priority declaration"),
                    ));
                }
                labels.extend(matching);
            }
            resolved.push(labels);
        }
        flat.priorities.extend(resolved);
    }
    if let Some(err) = failed {
        return Err(err);
    }

    debug!(
        module = %flat.name,
        modules = order.len(),
        productions = flat.productions.len(),
        rules = flat.rules.len(),
        "flattened module imports"
    );
    Ok(flat)
}

struct Resolver<'a, 'c> {
    definition: &'a KDefinition,
    ctx: &'c mut CompileContext,
    done: FxHashSet<Name>,
    /// Modules currently being visited, outermost first.
    path: Vec<Name>,
    failed: Option<ErrorGuaranteed>,
}

impl<'a> Resolver<'a, '_> {
    fn visit(&mut self, name: Name, importer: Option<&KModule>, order: &mut Vec<&'a KModule>) {
        if self.done.contains(&name) {
            return;
        }
        if let Some(start) = self.path.iter().position(|m| *m == name) {
            let cycle: Vec<&str> = self.path[start..]
                .iter()
                .chain(std::iter::once(&name))
                .map(|m| m.as_str())
                .collect();
            let location = importer.and_then(|m| m.att.location());
            self.failed = Some(
                self.ctx.emit_error(
                    Diagnostic::error(ErrorCode::E2001)
                        .with_message(format!(
                            "Found circularity in module imports: {}",
                            cycle.join(" < ")
                        ))
                        .with_optional_label(location, "import closes the cycle"),
                ),
            );
            return;
        }
        let Some(module) = self.definition.module(name) else {
            let location: Option<Location> = importer.and_then(|m| m.att.location());
            self.failed = Some(
                self.ctx.emit_error(
                    Diagnostic::error(ErrorCode::E2002)
                        .with_message(format!("Could not find module: {name}"))
                        .with_optional_label(location, "imported here"),
                ),
            );
            return;
        };

        self.path.push(name);
        for &import in &module.imports {
            self.visit(import, Some(module), order);
        }
        self.path.pop();
        self.done.insert(name);
        order.push(module);
    }
}
