use super::{Injector, Needed, Step, StreamView};
use crate::token::Token;

/// Removes `span` elements that are left without attributes, keeping their content
#[derive(Debug, Default)]
pub struct RemoveSpansWithoutAttributes;

impl Injector for RemoveSpansWithoutAttributes {
    fn name(&self) -> &'static str {
        "RemoveSpansWithoutAttributes"
    }

    fn needed(&self) -> Vec<Needed> {
        vec![Needed::element("span")]
    }

    fn handle_element(&mut self, token: &mut Token, stream: &mut StreamView<'_, '_>) -> Step {
        if !token.is_start_of("span") {
            return Step::Keep;
        }

        // attributes are normally validated after this pass; a span only loses its reason to
        // exist once they are
        stream.validate_attributes(token);
        if token.attrs().is_some_and(|attrs| !attrs.is_empty()) {
            return Step::Keep;
        }

        let Some(offset) = stream.closing_end(0) else {
            return Step::Keep;
        };
        if !stream
            .upcoming()
            .nth(offset)
            .is_some_and(|end| end.is_end_of("span"))
        {
            return Step::Keep;
        }

        stream.mark_upcoming(offset);
        Step::Delete
    }

    fn handle_end(&mut self, token: &mut Token, stream: &mut StreamView<'_, '_>) -> Step {
        if stream.is_marked(token) {
            Step::Delete
        } else {
            Step::Keep
        }
    }
}
