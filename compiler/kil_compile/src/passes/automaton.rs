//! The rule automaton, built once the rules are final.

use tracing::debug;

use super::{Pass, PassError, PassResult};
use crate::{Automaton, CompileContext, Definition};

pub struct BuildAutomatonPass;

impl Pass for BuildAutomatonPass {
    fn name(&self) -> &'static str {
        "build_automaton"
    }

    fn run(&self, definition: &mut Definition, ctx: &mut CompileContext) -> Result<PassResult, PassError> {
        if !ctx.options.build_automaton {
            definition.set_automaton(None);
            return Ok(PassResult::unchanged());
        }
        let automaton = Automaton::new(definition);
        let built = automaton.is_some();
        debug!(built, "build_automaton");
        definition.set_automaton(automaton);
        Ok(PassResult::from_count(usize::from(built)))
    }
}
