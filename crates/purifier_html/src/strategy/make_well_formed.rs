use super::zipper::Zipper;
use super::Strategy;
use crate::context::{Context, CurrentToken};
use crate::definition::HtmlDefinition;
use crate::diagnostics::Diagnostic;
use crate::generator::Generator;
use crate::injector::{Injector, Step, StreamView};
use crate::purifier::Policy;
use crate::settings::Settings;
use crate::token::{ArmorKind, Attributes, Token, TokenKind};
use log::{debug, trace};

/// Balances the token stream
///
/// Every start tag ends up with a matching end tag, and no end tag is left without a start tag.
/// Start tags that are not allowed inside the current element close it first (formatting
/// elements are opened again afterwards), or get a wrapper element when that makes them fit.
/// Injectors get to look at (and rewrite) every token on the way.
pub struct MakeWellFormed;

impl Strategy for MakeWellFormed {
    fn name(&self) -> &'static str {
        "MakeWellFormed"
    }

    fn execute(&self, tokens: Vec<Token>, policy: &Policy, ctx: &mut Context<'_>) -> Vec<Token> {
        Self::run(
            tokens,
            policy.definition(),
            policy.settings(),
            policy.injectors(),
            ctx,
        )
    }
}

impl MakeWellFormed {
    /// Balances the stream with the given injectors
    pub fn run(
        tokens: Vec<Token>,
        definition: &HtmlDefinition,
        settings: &Settings,
        injectors: Vec<Box<dyn Injector>>,
        ctx: &mut Context<'_>,
    ) -> Vec<Token> {
        debug!(
            "making {} tokens well-formed with {} injectors",
            tokens.len(),
            injectors.len()
        );

        let (zipper, current) = Zipper::from_vec(tokens);
        let pass = Pass {
            definition,
            settings,
            ctx,
            injectors,
            zipper,
            stack: vec![],
            generator: Generator::new(definition.doctype),
            rewind: None,
        };
        pass.run(current)
    }
}

enum Hook {
    Text,
    Element,
    End,
}

/// Outcome of fitting a start tag into the open element
enum Fit {
    /// The tag fits, and can be processed further
    Fits(Token),
    /// The stream changed; processing continues with the given token
    Changed(Option<Token>),
}

/// Returns true when the wrapper element can hold the element
fn wraps(definition: &HtmlDefinition, wrapper: &str, name: &str) -> bool {
    definition
        .get(wrapper)
        .is_some_and(|def| def.child.allows(name))
}

/// A fresh start or empty tag with the name, attributes and armor of the given tag
fn retag(token: &Token, name: &str, empty: bool) -> Token {
    let attrs = token.attrs().cloned().unwrap_or_default();
    let mut tag = if empty {
        Token::empty(name, attrs)
    } else {
        Token::start(name, attrs)
    }
    .at(token.location);
    tag.armor = token.armor;
    tag
}

fn end_of(name: &str, start: usize) -> Token {
    let mut end = Token::end(name);
    if let TokenKind::End { start: slot, .. } = &mut end.kind {
        *slot = Some(start);
    }
    end
}

struct Pass<'a, 'x, 'c> {
    definition: &'a HtmlDefinition,
    settings: &'a Settings,
    ctx: &'x mut Context<'c>,
    injectors: Vec<Box<dyn Injector>>,
    zipper: Zipper<Token>,
    /// Open elements, as indices into the emitted tokens
    stack: Vec<usize>,
    generator: Generator,
    /// Pending rewind: injector and number of tokens
    rewind: Option<(usize, usize)>,
}

impl Pass<'_, '_, '_> {
    fn run(mut self, mut token: Option<Token>) -> Vec<Token> {
        let mut reprocess = true;

        loop {
            if reprocess {
                reprocess = false;
            } else {
                token = self.zipper.next(token);
            }

            if let Some((injector, count)) = self.rewind.take() {
                token = self.rewind_by(token, injector, count);
            }

            let Some(mut current) = token.take() else {
                // end of the document: close whatever is still open
                let Some(top) = self.stack.last().and_then(|ix| self.zipper.front.get(*ix)) else {
                    break;
                };
                let name = top.tag_name().unwrap_or_default().to_string();
                if !top.armor.contains(ArmorKind::TagClosedError) {
                    let location = top.location;
                    self.ctx
                        .report_at(Diagnostic::TagClosedByDocumentEnd, &name, location);
                }
                token = Some(Token::end(&name));
                reprocess = true;
                continue;
            };

            let Some(name) = current.tag_name().map(str::to_string) else {
                if current.is_text() {
                    if let Some((injector, step)) = self.dispatch(Hook::Text, &mut current, false) {
                        token = self.apply(current, injector, step);
                        reprocess = true;
                        continue;
                    }
                }
                token = Some(current);
                continue;
            };

            self.ctx.current_token = Some(CurrentToken {
                name: name.clone(),
                location: current.location,
            });

            if !current.is_end() {
                let empty_model = self
                    .definition
                    .get(&name)
                    .map(|def| def.child.is_empty_model());

                match empty_model {
                    Some(true) if current.is_start() => {
                        current = retag(&current, &name, true);
                    }
                    Some(false) if current.is_empty_tag() => {
                        let start = retag(&current, &name, false);
                        token = Some(self.zipper.insert_before(Token::end(&name), start));
                        reprocess = true;
                        continue;
                    }
                    _ => {}
                }

                if current.is_start() {
                    match self.fit(current, &name) {
                        Fit::Fits(fits) => current = fits,
                        Fit::Changed(next) => {
                            token = next;
                            reprocess = true;
                            continue;
                        }
                    }
                }

                if let Some((injector, step)) = self.dispatch(Hook::Element, &mut current, false) {
                    token = self.apply(current, injector, step);
                    reprocess = true;
                    continue;
                }

                if current.is_start() {
                    self.stack.push(self.zipper.front.len());
                }
                token = Some(current);
                continue;
            }

            // an end tag an injector asked for earlier goes to that injector first, whether or
            // not its start tag made it into the stream
            if current.marks != 0 {
                if let Some((injector, step)) = self.dispatch(Hook::End, &mut current, true) {
                    if !matches!(step, Step::Keep) {
                        token = self.apply(current, injector, step);
                        reprocess = true;
                        continue;
                    }
                    current.skip |= 1 << injector;
                }
            }

            let Some(&top) = self.stack.last() else {
                token = self.unmatched_end(
                    current,
                    &name,
                    Diagnostic::UnnecessaryEndTagToText,
                    Diagnostic::UnnecessaryEndTagRemoved,
                );
                reprocess = true;
                continue;
            };

            if self.open_name(top) == name {
                if let TokenKind::End { start, .. } = &mut current.kind {
                    *start = Some(top);
                }
                self.stack.pop();
                if let Some((injector, step)) = self.dispatch(Hook::End, &mut current, false) {
                    token = self.apply(current, injector, step);
                    self.stack.push(top);
                    reprocess = true;
                } else {
                    token = Some(current);
                }
                continue;
            }

            // closing an element further up: everything in between is closed as well
            let found = (0..self.stack.len() - 1)
                .rev()
                .find(|j| self.open_name(self.stack[*j]) == name);
            let Some(j) = found else {
                token = self.unmatched_end(
                    current,
                    &name,
                    Diagnostic::StrayEndTagToText,
                    Diagnostic::StrayEndTagRemoved,
                );
                reprocess = true;
                continue;
            };

            token = self.close_through(current, j);
            reprocess = true;
        }

        self.zipper.into_vec(None)
    }

    fn open_name(&self, ix: usize) -> &str {
        self.zipper
            .front
            .get(ix)
            .and_then(Token::tag_name)
            .unwrap_or_default()
    }

    /// Checks whether a start tag fits into the innermost open element. When it does not, the
    /// open element is closed, the tag is wrapped, or the tag is removed.
    fn fit(&mut self, current: Token, name: &str) -> Fit {
        let definition = self.definition;
        let Some(&parent_ix) = self.stack.last() else {
            return Fit::Fits(current);
        };
        let parent_name = self.open_name(parent_ix).to_string();
        let Some(parent_def) = definition.get(&parent_name) else {
            return Fit::Fits(current);
        };
        if !parent_def.auto_closes(name) {
            return Fit::Fits(current);
        }

        let wrap = definition.get(name).and_then(|def| def.wrap.as_deref());
        if let Some(wrapper) = wrap {
            if wraps(definition, wrapper, name) && parent_def.child.allows(wrapper) {
                trace!("wrapping {name} in {wrapper}");
                let wrapper = Token::start(wrapper, Attributes::new());
                return Fit::Changed(Some(self.zipper.insert_before(current, wrapper)));
            }
        }

        // closing the parent only helps when the element fits somewhere further up
        let fits_above = definition.parent.child.allows(name)
            || self.stack.iter().any(|ix| {
                self.zipper
                    .front
                    .get(*ix)
                    .and_then(Token::tag_name)
                    .and_then(|ancestor| definition.get(ancestor))
                    .is_some_and(|ancestor| {
                        ancestor.child.allows(name)
                            || wrap.is_some_and(|wrapper| {
                                wraps(definition, wrapper, name) && ancestor.child.allows(wrapper)
                            })
                    })
            });
        if !fits_above {
            self.ctx.report(Diagnostic::StartTagRemoved, name);
            return Fit::Changed(self.zipper.delete());
        }

        let carryover = parent_def.formatting;
        let Some(parent) = self.zipper.front.get(parent_ix) else {
            return Fit::Fits(current);
        };
        if !parent.armor.contains(ArmorKind::TagClosedError) {
            let diagnostic = if carryover {
                Diagnostic::TagCarryover
            } else {
                Diagnostic::TagAutoClosed
            };
            let location = parent.location;
            self.ctx.report_at(diagnostic, &parent_name, location);
        }

        let end = end_of(&parent_name, parent_ix);
        if carryover {
            let reopened = parent.reopened();
            return Fit::Changed(self.zipper.splice(0, vec![end, current, reopened]));
        }
        Fit::Changed(Some(self.zipper.insert_before(current, end)))
    }

    /// Closes the open elements from stack position `j` up, with the end tag for the element
    /// at `j` as the current token. Formatting elements are opened again afterwards.
    fn close_through(&mut self, current: Token, j: usize) -> Option<Token> {
        let skipped: Vec<usize> = self.stack[j + 1..].to_vec();

        for ix in skipped.iter().rev() {
            if let Some(open) = self.zipper.front.get(*ix) {
                if !open.armor.contains(ArmorKind::TagClosedError) {
                    let name = open.tag_name().unwrap_or_default().to_string();
                    let location = open.location;
                    self.ctx
                        .report_at(Diagnostic::TagClosedByElementEnd, &name, location);
                }
            }
        }

        let mut replacement = Vec::with_capacity(skipped.len() * 2 + 1);
        let mut reopened = vec![];
        for ix in &skipped {
            let Some(open) = self.zipper.front.get(*ix) else {
                continue;
            };
            let name = open.tag_name().unwrap_or_default();
            replacement.push(end_of(name, *ix));
            if self.definition.get(name).is_some_and(|def| def.formatting) {
                reopened.push(open.reopened());
            }
        }
        // innermost element closes first
        replacement.reverse();
        replacement.push(current);
        replacement.extend(reopened);

        self.zipper.splice(0, replacement)
    }

    /// An end tag without a matching open element is removed, or turned into text
    fn unmatched_end(
        &mut self,
        current: Token,
        name: &str,
        to_text: Diagnostic,
        removed: Diagnostic,
    ) -> Option<Token> {
        if self.settings.escape_invalid_tags {
            self.ctx.report(to_text, name);
            let text = self.generator.generate_token(&current);
            Some(Token::text(&text).at(current.location))
        } else {
            self.ctx.report(removed, name);
            self.zipper.delete()
        }
    }

    /// Offers the token to the first injector that has not seen it yet. With `marked`, only
    /// injectors that marked the token are considered.
    fn dispatch(&mut self, hook: Hook, token: &mut Token, marked: bool) -> Option<(usize, Step)> {
        for (i, injector) in self.injectors.iter_mut().enumerate() {
            if token.skip & (1 << i) != 0 || token.rewind.is_some_and(|owner| owner != i) {
                continue;
            }
            if marked && token.marks & (1 << i) == 0 {
                continue;
            }

            let mut view = StreamView::new(
                self.definition,
                self.settings,
                &mut *self.ctx,
                &self.stack,
                &mut self.zipper.front,
                &mut self.zipper.back,
                i,
            );
            let step = match hook {
                Hook::Text => injector.handle_text(token, &mut view),
                Hook::Element => injector.handle_element(token, &mut view),
                Hook::End => injector.handle_end(token, &mut view),
            };
            if let Some(count) = view.rewind_request() {
                self.rewind = Some((i, count));
            }

            trace!("{}: {step:?}", injector.name());
            return Some((i, step));
        }
        None
    }

    /// Applies the outcome of an injector. Tokens it produced are never shown to it again, and
    /// inherit which other injectors have seen the original token.
    fn apply(&mut self, current: Token, injector: usize, step: Step) -> Option<Token> {
        let skip = current.skip | (1 << injector);
        match step {
            Step::Keep => {
                let mut current = current;
                current.skip = skip;
                Some(current)
            }
            Step::Replace(mut tokens) => {
                for token in &mut tokens {
                    token.skip = skip;
                }
                self.zipper.splice(0, tokens)
            }
            Step::Delete => self.zipper.delete(),
            Step::Consume(count) => {
                assert!(count > 0, "an injector must consume at least one token");
                self.zipper.splice(count - 1, vec![])
            }
        }
    }

    /// Moves back over emitted tokens, so the injector that asked for it can process them again
    fn rewind_by(&mut self, mut token: Option<Token>, injector: usize, count: usize) -> Option<Token> {
        for _ in 0..count {
            if self.zipper.front.is_empty() {
                break;
            }
            token = self.zipper.prev(token);
            let Some(rewound) = token.as_mut() else {
                continue;
            };
            rewound.skip &= !(1 << injector);
            rewound.rewind = Some(injector);
            match rewound.kind {
                TokenKind::Start { .. } => {
                    self.stack.pop();
                }
                TokenKind::End {
                    start: Some(start), ..
                } => self.stack.push(start),
                _ => {}
            }
        }
        token
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::ErrorCollector;
    use crate::lexer::Lexer;
    use test_case::test_case;

    fn run_with(html: &str, settings: Settings) -> (String, ErrorCollector) {
        let policy = Policy::new(settings).unwrap();
        let tokens = Lexer::new(policy.settings()).tokenize(html);
        let mut collector = ErrorCollector::new();
        let tokens = {
            let mut ctx = Context::new(Some(&mut collector));
            MakeWellFormed.execute(tokens, &policy, &mut ctx)
        };
        (tokens.iter().map(ToString::to_string).collect(), collector)
    }

    fn run(html: &str) -> (String, ErrorCollector) {
        run_with(html, Settings::defaults().unwrap())
    }

    #[test_case("<b>bold", "<b>bold</b>", Diagnostic::TagClosedByDocumentEnd)]
    #[test_case("</p>x", "x", Diagnostic::UnnecessaryEndTagRemoved)]
    #[test_case("<div>a</span>b</div>", "<div>ab</div>", Diagnostic::StrayEndTagRemoved)]
    #[test_case("<p>a<div>b</div>", "<p>a</p><div>b</div>", Diagnostic::TagAutoClosed)]
    #[test_case("<b><i>x</b>y", "<b><i>x</i></b><i>y</i>", Diagnostic::TagClosedByElementEnd)]
    #[test_case("<b>a<div>b</div></b>", "<b>a</b><div><b>b</b></div><b></b>", Diagnostic::TagCarryover)]
    fn balances(html: &str, expected: &str, diagnostic: Diagnostic) {
        let (out, collector) = run(html);
        assert_eq!(out, expected);
        assert!(collector.has(diagnostic), "{:?}", collector.reports());
    }

    #[test]
    fn well_formed_input_is_untouched() {
        let html = r#"<div><p>a <b>b</b> <br /> c</p></div>"#;
        let (out, collector) = run(html);
        assert_eq!(out, html);
        assert!(collector.reports().is_empty());
    }

    #[test]
    fn empty_and_start_tags_follow_the_model() {
        let (out, _) = run("<br><b/>");
        assert_eq!(out, "<br /><b></b>");
    }

    #[test]
    fn stray_end_tag_to_text() {
        let mut settings = Settings::defaults().unwrap();
        settings.escape_invalid_tags = true;
        let (out, collector) = run_with("a</b>", settings);
        assert_eq!(out, "a</b>");
        assert!(collector.has(Diagnostic::UnnecessaryEndTagToText));
    }

    #[test]
    fn start_tag_that_fits_nowhere_is_removed() {
        let mut settings = Settings::defaults().unwrap();
        settings.parent = "span".to_string();
        let (out, collector) = run_with("<b><div>x</div></b>", settings);
        assert_eq!(out, "<b>x</b>");
        assert!(collector.has(Diagnostic::StartTagRemoved));
        assert!(collector.has(Diagnostic::StrayEndTagRemoved));
    }

    struct Shout;

    impl Injector for Shout {
        fn name(&self) -> &'static str {
            "Shout"
        }

        fn handle_text(&mut self, token: &mut Token, _stream: &mut StreamView<'_, '_>) -> Step {
            let data = token.text_data().unwrap_or_default().to_uppercase();
            Step::Replace(vec![Token::text(&data), Token::text("!")])
        }
    }

    #[test]
    fn injector_output_is_not_offered_to_the_injector_again() {
        let settings = Settings::defaults().unwrap();
        let definition = HtmlDefinition::build(&settings).unwrap();
        let tokens = Lexer::new(&settings).tokenize("<b>hi</b>");

        let mut ctx = Context::new(None);
        let tokens = MakeWellFormed::run(
            tokens,
            &definition,
            &settings,
            vec![Box::new(Shout)],
            &mut ctx,
        );
        let out: String = tokens.iter().map(ToString::to_string).collect();
        assert_eq!(out, "<b>HI!</b>");
    }
}
