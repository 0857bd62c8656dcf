//! Fixtures shared by the unit tests.

#![allow(clippy::expect_used, reason = "fixtures are known to compile")]

use crate::kast::{KDefinition, KModule};
use crate::{compile, CompileContext, CompileOptions, Definition};

/// Lower `module` without running any pass.
pub(crate) fn lower(module: KModule, options: CompileOptions) -> (Definition, CompileContext) {
    let name = module.name.as_str();
    let input = KDefinition::new(name, vec![module]);
    let mut ctx = CompileContext::new(options);
    let definition =
        crate::compile::lower_definition(&input, &mut ctx).expect("fixture module lowers");
    (definition, ctx)
}

/// Run the default pipeline over `module`.
pub(crate) fn compile_module(module: KModule) -> Definition {
    let name = module.name.as_str();
    let input = KDefinition::new(name, vec![module]);
    match compile(&input, CompileOptions::default()) {
        Ok(compiled) => compiled.definition,
        Err(err) => panic!("fixture module failed to compile: {err}: {:?}", err.diagnostics()),
    }
}
