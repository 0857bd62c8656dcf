//! Compilation pipeline: resolve modules → lower → run passes.
//!
//! Module errors are fatal for the definition. Errors in a single rule drop
//! that rule and compilation continues, so one run reports every problem;
//! the session fails at the end if any error was emitted.

use kil_diagnostic::{Diagnostic, ErrorGuaranteed};
use kil_index::IndexingData;
use kil_ir::Name;
use tracing::debug;

use crate::kast::KDefinition;
use crate::{
    cell_config, flatten_modules, CompileContext, CompileError, CompileOptions, Definition,
    LabelTable, Lowering, PassManager, RuleKind,
};

/// A successfully compiled definition.
pub struct Compiled {
    pub definition: Definition,
    /// Warnings emitted along the way.
    pub diagnostics: Vec<Diagnostic>,
}

/// Compile `input` with the default pass pipeline.
pub fn compile(input: &KDefinition, options: CompileOptions) -> Result<Compiled, CompileError> {
    let mut passes = PassManager::default_pipeline();
    if !options.partial_evaluation {
        passes.disable("partial_evaluation");
    }
    compile_with(input, options, &passes)
}

/// Compile `input` with a custom pass pipeline.
pub fn compile_with(
    input: &KDefinition,
    options: CompileOptions,
    passes: &PassManager,
) -> Result<Compiled, CompileError> {
    let mut ctx = CompileContext::new(options);

    let definition = match lower_definition(input, &mut ctx) {
        Ok(mut definition) => {
            passes.run(&mut definition, &mut ctx)?;
            definition.rebuild_indexing_table();
            Some(definition)
        }
        Err(_) => None,
    };

    let errors = ctx.diagnostics().error_count();
    let diagnostics = ctx.take_diagnostics();
    match definition {
        Some(definition) if errors == 0 => {
            debug!(
                regular = definition.count_of(RuleKind::Regular),
                functions = definition.count_of(RuleKind::Function),
                anywhere = definition.count_of(RuleKind::Anywhere),
                macros = definition.count_of(RuleKind::Macro),
                warnings = diagnostics.len(),
                "compiled"
            );
            Ok(Compiled {
                definition,
                diagnostics,
            })
        }
        _ => Err(CompileError::Failed {
            errors,
            diagnostics,
        }),
    }
}

/// Resolve modules and lower every sentence; no passes run.
pub(crate) fn lower_definition(
    input: &KDefinition,
    ctx: &mut CompileContext,
) -> Result<Definition, ErrorGuaranteed> {
    let module = flatten_modules(input, ctx)?;
    let labels = LabelTable::from_productions(&module.productions);
    let cells = cell_config(&module.configurations, ctx);

    let k = Name::intern("k");
    let computation_cell = ctx
        .options
        .computation_cell
        .or_else(|| cells.is_cell(k).then_some(k));
    let indexing = match computation_cell {
        Some(cell) => IndexingData::default().with_computation_cell(cell),
        None => IndexingData::default(),
    };

    let lowering = Lowering::new(&labels, &cells);
    let mut rules = Vec::with_capacity(module.rules.len());
    for rule in &module.rules {
        // Failures are already reported.
        if let Ok(rule) = lowering.rule(rule, &indexing, ctx) {
            rules.push(rule);
        }
    }
    debug!(
        module = %module.name,
        productions = labels.len(),
        cells = cells.len(),
        rules = rules.len(),
        "lowered"
    );

    let mut definition = Definition::new(labels, cells, module.priorities, indexing);
    definition.set_evaluation_fuel(ctx.options.evaluation_fuel);
    for rule in rules {
        definition.add_rule(rule);
    }
    definition.rebuild_indexing_table();
    Ok(definition)
}
