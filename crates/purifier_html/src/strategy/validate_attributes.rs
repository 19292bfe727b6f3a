use super::Strategy;
use crate::attr::AttrValidator;
use crate::context::Context;
use crate::purifier::Policy;
use crate::token::{ArmorKind, Token};

/// Validates the attributes of every start and empty tag that has not been validated already
pub struct ValidateAttributes;

impl Strategy for ValidateAttributes {
    fn name(&self) -> &'static str {
        "ValidateAttributes"
    }

    fn execute(&self, mut tokens: Vec<Token>, policy: &Policy, ctx: &mut Context<'_>) -> Vec<Token> {
        for token in tokens
            .iter_mut()
            .filter(|t| t.is_start() || t.is_empty_tag())
            .filter(|t| !t.armor.contains(ArmorKind::ValidateAttributes))
        {
            AttrValidator::validate_token(token, policy.definition(), policy.settings(), ctx);
        }
        tokens
    }
}
