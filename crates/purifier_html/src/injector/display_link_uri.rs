use super::{Injector, Needed, Step, StreamView};
use crate::token::Token;

/// Moves the target of a link into the text after it, leaving the link itself inert
#[derive(Debug, Default)]
pub struct DisplayLinkUri;

impl Injector for DisplayLinkUri {
    fn name(&self) -> &'static str {
        "DisplayLinkURI"
    }

    fn needed(&self) -> Vec<Needed> {
        vec![Needed::element("a")]
    }

    fn handle_end(&mut self, token: &mut Token, stream: &mut StreamView<'_, '_>) -> Step {
        if !token.is_end_of("a") {
            return Step::Keep;
        }
        let Some(href) = stream
            .start_token_mut(token)
            .and_then(Token::attrs_mut)
            .and_then(|attrs| attrs.shift_remove("href"))
        else {
            return Step::Keep;
        };

        Step::Replace(vec![token.clone(), Token::text(&format!(" ({href})"))])
    }
}
