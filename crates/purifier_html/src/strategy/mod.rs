//! The passes a token stream goes through
//!
//! [`Core`] runs the passes in order: foreign elements are removed first, then the stream is
//! made well-formed, then the nesting is fixed, and finally all attributes are validated. Each
//! pass gets its own context scope, so pass-local state never leaks into the next pass.
use crate::context::Context;
use crate::purifier::Policy;
use crate::token::Token;
use log::debug;

mod fix_nesting;
mod make_well_formed;
mod remove_foreign_elements;
mod validate_attributes;
mod zipper;

pub use fix_nesting::FixNesting;
pub use make_well_formed::MakeWellFormed;
pub use remove_foreign_elements::RemoveForeignElements;
pub use validate_attributes::ValidateAttributes;

pub trait Strategy: Send + Sync {
    fn name(&self) -> &'static str;

    fn execute(&self, tokens: Vec<Token>, policy: &Policy, ctx: &mut Context<'_>) -> Vec<Token>;
}

/// Runs all passes in order
pub struct Core {
    stages: Vec<Box<dyn Strategy>>,
}

impl Default for Core {
    fn default() -> Self {
        Self {
            stages: vec![
                Box::new(RemoveForeignElements),
                Box::new(MakeWellFormed),
                Box::new(FixNesting),
                Box::new(ValidateAttributes),
            ],
        }
    }
}

impl Strategy for Core {
    fn name(&self) -> &'static str {
        "Core"
    }

    fn execute(&self, mut tokens: Vec<Token>, policy: &Policy, ctx: &mut Context<'_>) -> Vec<Token> {
        for stage in &self.stages {
            let mut scope = ctx.pass(stage.name());
            tokens = stage.execute(tokens, policy, &mut scope);
            debug!("{}: {} tokens left", stage.name(), tokens.len());
        }
        tokens
    }
}
