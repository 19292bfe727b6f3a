//! Injectors hook into the well-formedness pass
//!
//! An injector gets a look at every text, element and end token while the stream is made
//! well-formed. It can keep the token, replace it by any number of tokens, delete it, or delete
//! it together with upcoming tokens. Replacement tokens are processed again, but never shown to
//! the injector that produced them. Injectors see the stream through a [`StreamView`]: tokens
//! already emitted are read-only (except the start tag matching an end tag), upcoming tokens can
//! be looked at and marked.
use crate::attr::AttrValidator;
use crate::context::Context;
use crate::definition::HtmlDefinition;
use crate::errors::Error;
use crate::settings::Settings;
use crate::token::{ArmorKind, Token, TokenKind};

mod auto_paragraph;
mod display_link_uri;
mod linkify;
mod remove_empty;
mod remove_spans_without_attributes;

pub use auto_paragraph::AutoParagraph;
pub use display_link_uri::DisplayLinkUri;
pub use linkify::Linkify;
pub use remove_empty::RemoveEmpty;
pub use remove_spans_without_attributes::RemoveSpansWithoutAttributes;

/// Maximum number of injectors that can be active at the same time
pub const MAX_INJECTORS: usize = 32;

/// An element an injector relies on, together with the attributes it relies on
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Needed {
    pub element: &'static str,
    pub attributes: &'static [&'static str],
}

impl Needed {
    pub const fn element(element: &'static str) -> Self {
        Self {
            element,
            attributes: &[],
        }
    }
}

/// What should happen to the token an injector looked at
#[derive(Clone, Debug, Default)]
pub enum Step {
    /// Keep the token, including any changes made to it
    #[default]
    Keep,
    /// Replace the token by the given tokens, which are processed next
    Replace(Vec<Token>),
    /// Remove the token
    Delete,
    /// Remove the token and the given number of tokens minus one that follow it
    Consume(usize),
}

pub trait Injector: Send {
    fn name(&self) -> &'static str;

    /// Elements (and attributes) that must be allowed for the injector to work
    fn needed(&self) -> Vec<Needed> {
        vec![]
    }

    /// Called once before the stream is processed
    fn prepare(&mut self, _definition: &HtmlDefinition, _settings: &Settings) {}

    fn handle_text(&mut self, _token: &mut Token, _stream: &mut StreamView<'_, '_>) -> Step {
        Step::Keep
    }

    /// Called for start and empty tags
    fn handle_element(&mut self, _token: &mut Token, _stream: &mut StreamView<'_, '_>) -> Step {
        Step::Keep
    }

    fn handle_end(&mut self, _token: &mut Token, _stream: &mut StreamView<'_, '_>) -> Step {
        Step::Keep
    }
}

/// Verifies that everything the injector needs is allowed by the definition
pub fn check_needed(injector: &dyn Injector, definition: &HtmlDefinition) -> Result<(), Error> {
    let missing = |missing: String| Error::InjectorNeedsUnavailable {
        injector: injector.name().to_string(),
        missing,
    };

    for needed in injector.needed() {
        let Some(def) = definition.get(needed.element) else {
            return Err(missing(needed.element.to_string()));
        };
        if let Some(attr) = needed
            .attributes
            .iter()
            .find(|attr| !def.attrs.contains_key(**attr))
        {
            return Err(missing(format!("{}.{attr}", needed.element)));
        }
    }
    Ok(())
}

/// The part of the stream an injector may look at
pub struct StreamView<'v, 'c> {
    pub definition: &'v HtmlDefinition,
    pub settings: &'v Settings,
    pub ctx: &'v mut Context<'c>,
    /// Open elements, as indices into `front`
    stack: &'v [usize],
    /// Emitted tokens, oldest first
    front: &'v mut [Token],
    /// Upcoming tokens, the next token is the last one
    back: &'v mut [Token],
    index: usize,
    rewind: Option<usize>,
}

impl<'v, 'c> StreamView<'v, 'c> {
    pub(crate) fn new(
        definition: &'v HtmlDefinition,
        settings: &'v Settings,
        ctx: &'v mut Context<'c>,
        stack: &'v [usize],
        front: &'v mut [Token],
        back: &'v mut [Token],
        index: usize,
    ) -> Self {
        Self {
            definition,
            settings,
            ctx,
            stack,
            front,
            back,
            index,
            rewind: None,
        }
    }

    /// Number of open elements
    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    /// The innermost open element
    pub fn parent(&self) -> Option<&Token> {
        self.stack.last().and_then(|ix| self.front.get(*ix))
    }

    /// Returns true when an element may be inserted at the current position: the innermost
    /// open element (or the document parent) must allow it, and no open element excludes it.
    pub fn allows_element(&self, name: &str) -> bool {
        let parent = match self.parent().and_then(Token::tag_name) {
            Some(parent) => match self.definition.get(parent) {
                Some(def) => def,
                None => return false,
            },
            None => &self.definition.parent,
        };
        if !parent.child.allows(name) || parent.excludes.contains(name) {
            return false;
        }

        // the innermost element has been checked already
        let ancestors = self.stack.len().saturating_sub(1);
        !self.stack[..ancestors]
            .iter()
            .filter_map(|ix| self.front.get(*ix).and_then(Token::tag_name))
            .filter_map(|tag| self.definition.get(tag))
            .any(|def| def.excludes.contains(name))
    }

    /// Upcoming tokens, nearest first
    pub fn upcoming(&self) -> impl Iterator<Item = &Token> {
        self.back.iter().rev()
    }

    /// Emitted tokens, most recent first
    pub fn emitted(&self) -> impl Iterator<Item = &Token> {
        self.front.iter().rev()
    }

    /// Upcoming tokens up to (not including) the end tag that closes the current nesting level.
    /// `nesting` is the number of elements opened that still need to be closed before that.
    pub fn upcoming_until_end(&self, nesting: usize) -> impl Iterator<Item = &Token> {
        self.upcoming().scan(nesting, |nesting, token| {
            if token.is_start() {
                *nesting += 1;
            } else if token.is_end() {
                if *nesting == 0 {
                    return None;
                }
                *nesting -= 1;
            }
            Some(token)
        })
    }

    /// Offset (0 being the next token) of the end tag that closes the current nesting level
    pub fn closing_end(&self, nesting: usize) -> Option<usize> {
        let offset = self.upcoming_until_end(nesting).count();
        self.upcoming()
            .nth(offset)
            .filter(|token| token.is_end())
            .map(|_| offset)
    }

    /// Marks an upcoming token for this injector
    pub fn mark_upcoming(&mut self, offset: usize) {
        let bit = 1 << self.index;
        let len = self.back.len();
        if let Some(token) = len
            .checked_sub(offset + 1)
            .and_then(|ix| self.back.get_mut(ix))
        {
            token.marks |= bit;
        }
    }

    /// Returns true when this injector marked the token earlier
    pub fn is_marked(&self, token: &Token) -> bool {
        token.marks & (1 << self.index) != 0
    }

    /// Requests the given number of emitted tokens to be processed again. Rewound tokens are
    /// only shown to this injector.
    pub fn rewind(&mut self, count: usize) {
        self.rewind = Some(count);
    }

    pub(crate) fn rewind_request(&self) -> Option<usize> {
        self.rewind
    }

    /// Validates the attributes of the token right away and armors it against validation later
    pub fn validate_attributes(&mut self, token: &mut Token) {
        AttrValidator::validate_token(token, self.definition, self.settings, self.ctx);
        token.armor.insert(ArmorKind::ValidateAttributes);
    }

    /// The start tag matching an end tag
    pub fn start_token_mut(&mut self, end: &Token) -> Option<&mut Token> {
        match end.kind {
            TokenKind::End {
                start: Some(ix), ..
            } => self.front.get_mut(ix),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::token::Attributes;

    struct NeedsTable;

    impl Injector for NeedsTable {
        fn name(&self) -> &'static str {
            "NeedsTable"
        }

        fn needed(&self) -> Vec<Needed> {
            vec![Needed {
                element: "table",
                attributes: &["summary"],
            }]
        }
    }

    fn definition(configure: impl FnOnce(&mut Settings)) -> (HtmlDefinition, Settings) {
        let mut settings = Settings::defaults().unwrap();
        configure(&mut settings);
        (HtmlDefinition::build(&settings).unwrap(), settings)
    }

    #[test]
    fn needed_elements() {
        let (def, _) = definition(|_| {});
        assert!(check_needed(&NeedsTable, &def).is_ok());

        let (def, _) = definition(|s| s.allowed = "table[border]".into());
        match check_needed(&NeedsTable, &def) {
            Err(Error::InjectorNeedsUnavailable { missing, .. }) => {
                assert_eq!(missing, "table.summary")
            }
            other => panic!("unexpected {other:?}"),
        }

        let (def, _) = definition(|s| s.allowed = "p".into());
        assert!(check_needed(&NeedsTable, &def).is_err());
    }

    fn start(name: &str) -> Token {
        Token::start(name, Attributes::new())
    }

    #[test]
    fn view_lookups() {
        let (def, settings) = definition(|_| {});
        let mut ctx = Context::new(None);

        let mut front = vec![start("div"), start("a"), Token::text("x")];
        // upcoming: <b> y </b> </a>, reversed
        let mut back = vec![
            Token::end("a"),
            Token::end("b"),
            Token::text("y"),
            start("b"),
        ];
        let stack = [0, 1];

        let mut view = StreamView::new(&def, &settings, &mut ctx, &stack, &mut front, &mut back, 2);

        assert_eq!(view.depth(), 2);
        assert_eq!(view.parent().and_then(Token::tag_name), Some("a"));
        // a excludes a
        assert!(!view.allows_element("a"));
        assert!(view.allows_element("b"));
        assert!(!view.allows_element("div"));

        assert_eq!(view.emitted().next().and_then(Token::text_data), Some("x"));
        assert_eq!(view.upcoming_until_end(0).count(), 3);
        assert_eq!(view.closing_end(0), Some(3));
        assert_eq!(view.closing_end(1), None);

        view.mark_upcoming(3);
        let end = view.upcoming().nth(3).unwrap().clone();
        assert!(view.is_marked(&end));
        assert!(!view.is_marked(&start("b")));

        view.rewind(2);
        assert_eq!(view.rewind_request(), Some(2));
    }

    #[test]
    fn document_level_allows_block_elements() {
        let (def, settings) = definition(|_| {});
        let mut ctx = Context::new(None);
        let (mut front, mut back) = (vec![], vec![]);

        let view = StreamView::new(&def, &settings, &mut ctx, &[], &mut front, &mut back, 0);
        assert!(view.allows_element("p"));
        assert!(view.parent().is_none());
    }
}
