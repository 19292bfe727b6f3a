use super::{Injector, Step, StreamView};
use crate::definition::HtmlDefinition;
use crate::settings::Settings;
use crate::token::{is_whitespace, Token};

/// Elements that are kept even when empty, as long as they carry the listed attributes
const KEEP_WHEN_EMPTY: [(&str, &[&str]); 4] = [
    ("colgroup", &[]),
    ("th", &[]),
    ("td", &[]),
    ("iframe", &["src"]),
];

/// Removes elements without content. Elements with an `id` or `name` are kept since they can
/// serve as anchors.
#[derive(Debug, Default)]
pub struct RemoveEmpty {
    remove_nbsp: bool,
}

impl RemoveEmpty {
    fn is_blank(&self, token: &Token, element: &str) -> bool {
        let Some(data) = token.text_data() else {
            return false;
        };
        if token.is_whitespace() {
            return true;
        }
        if !self.remove_nbsp || matches!(element, "td" | "th") {
            return false;
        }
        let plain = data.replace('\u{a0}', "");
        plain.is_empty() || is_whitespace(&plain)
    }
}

impl Injector for RemoveEmpty {
    fn name(&self) -> &'static str {
        "RemoveEmpty"
    }

    fn prepare(&mut self, _definition: &HtmlDefinition, settings: &Settings) {
        self.remove_nbsp = settings.remove_empty_nbsp;
    }

    fn handle_element(&mut self, token: &mut Token, stream: &mut StreamView<'_, '_>) -> Step {
        if !token.is_start() {
            return Step::Keep;
        }
        let name = token.tag_name().unwrap_or_default().to_string();

        // the element itself, plus the blank text up to the next token
        let mut deleted = 1;
        let mut next = None;
        for upcoming in stream.upcoming() {
            next = Some(upcoming);
            if self.is_blank(upcoming, &name) {
                deleted += 1;
                continue;
            }
            break;
        }
        if !next.map_or(true, |next| next.is_end_of(&name)) {
            return Step::Keep;
        }

        stream.validate_attributes(token);
        let attrs = token.attrs().cloned().unwrap_or_default();
        if let Some((_, needed)) = KEEP_WHEN_EMPTY.iter().find(|(keep, _)| *keep == name) {
            if needed.iter().all(|attr| attrs.contains_key(*attr)) {
                return Step::Keep;
            }
        }
        if attrs.contains_key("id") || attrs.contains_key("name") {
            return Step::Keep;
        }

        // the parent may have become empty as well: step back over the whitespace before
        // this element and look at the parent again
        let whitespace = stream.emitted().take_while(|t| t.is_whitespace()).count();
        stream.rewind(whitespace + 1);

        Step::Consume(deleted + 1)
    }

    /// An element can turn out empty after its start tag was looked at, when the next start
    /// tag closes it right away. Its start tag is then looked at again.
    fn handle_end(&mut self, token: &mut Token, stream: &mut StreamView<'_, '_>) -> Step {
        let name = token.tag_name().unwrap_or_default().to_string();
        if KEEP_WHEN_EMPTY
            .iter()
            .any(|(keep, needed)| *keep == name && needed.is_empty())
        {
            return Step::Keep;
        }

        let blank = stream
            .emitted()
            .take_while(|emitted| self.is_blank(emitted, &name))
            .count();
        if stream
            .emitted()
            .nth(blank)
            .is_some_and(|start| start.is_start_of(&name))
        {
            stream.rewind(blank + 1);
        }
        Step::Keep
    }
}
