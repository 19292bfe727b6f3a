use super::{Injector, Needed, Step, StreamView};
use crate::token::{ArmorKind, Attributes, Token};

/// Wraps free text and inline elements into paragraphs. Blank lines separate paragraphs.
#[derive(Debug, Default)]
pub struct AutoParagraph;

const PARAGRAPH_BREAK: &str = "\n\n";

fn paragraph_start() -> Token {
    Token::start("p", Attributes::new()).armored(ArmorKind::TagClosedError)
}

/// Returns true when the token may sit inside a paragraph
fn is_inline(stream: &StreamView<'_, '_>, token: &Token) -> bool {
    let Some(name) = token.name() else {
        return false;
    };
    stream
        .definition
        .get("p")
        .is_some_and(|p| p.child.allows(name))
}

/// Looks ahead within the current element: a paragraph is needed when a paragraph break shows
/// up before any block element does.
fn needs_paragraph(stream: &StreamView<'_, '_>, nesting: usize) -> bool {
    for token in stream.upcoming_until_end(nesting) {
        if token.is_start() && !is_inline(stream, token) {
            return false;
        }
        if token
            .text_data()
            .is_some_and(|data| data.contains(PARAGRAPH_BREAK))
        {
            return true;
        }
    }
    false
}

/// Splits text at paragraph breaks, appending the pieces to `result`. A trailing paragraph is
/// left open; the well-formedness pass closes it.
fn split_text(data: &str, result: &mut Vec<Token>) {
    let raw: Vec<&str> = data.split(PARAGRAPH_BREAK).collect();
    if raw.len() == 1 {
        result.push(Token::text(data));
        return;
    }

    let mut paragraphs = vec![];
    let mut needs_start = false;
    let mut needs_end = false;

    let last = raw.len() - 1;
    for (i, paragraph) in raw.into_iter().enumerate() {
        if !paragraph.trim().is_empty() {
            paragraphs.push(paragraph);
            continue;
        }

        if i == 0 {
            if result.is_empty() {
                // break right at the start of a paragraph: close it first
                result.push(Token::end("p"));
                result.push(Token::text(PARAGRAPH_BREAK));
                needs_start = true;
            } else {
                result.insert(0, Token::text(PARAGRAPH_BREAK));
            }
        } else if i == last {
            needs_end = true;
        }
    }

    if paragraphs.is_empty() {
        return;
    }
    if needs_start {
        result.push(paragraph_start());
    }

    for paragraph in paragraphs {
        result.push(Token::text(paragraph));
        result.push(Token::end("p"));
        result.push(Token::text(PARAGRAPH_BREAK));
        result.push(paragraph_start());
    }

    // the last paragraph start is added back later when it turns out to be needed
    result.pop();
    if !needs_end {
        result.pop();
        result.pop();
    }
}

impl Injector for AutoParagraph {
    fn name(&self) -> &'static str {
        "AutoParagraph"
    }

    fn needed(&self) -> Vec<Needed> {
        vec![Needed::element("p")]
    }

    fn handle_text(&mut self, token: &mut Token, stream: &mut StreamView<'_, '_>) -> Step {
        let Some(text) = token.text_data().map(str::to_string) else {
            return Step::Keep;
        };

        if stream.allows_element("p") {
            if stream.depth() > 0 && !text.contains(PARAGRAPH_BREAK) {
                // inside an element that allows paragraphs; they are only needed when a break
                // follows before the element ends
                if needs_paragraph(stream, 0) {
                    return Step::Replace(vec![paragraph_start(), token.clone()]);
                }
                return Step::Keep;
            }

            let next = stream.upcoming_until_end(0).next();
            if token.is_whitespace() && next.map_or(true, |next| !is_inline(stream, next)) {
                // whitespace before a block element or the end of the document
                return Step::Keep;
            }

            let mut result = vec![paragraph_start()];
            split_text(&text, &mut result);
            // same separation as for elements following a block at the top level
            let separate = stream.depth() == 0
                && stream.emitted().next().is_some_and(|prev| !prev.is_text());
            if separate && result.first().is_some_and(|first| !first.is_text()) {
                result.insert(0, Token::text(PARAGRAPH_BREAK));
            }
            return Step::Replace(result);
        }

        if stream.parent().is_some_and(|parent| parent.is_start_of("p")) {
            let mut result = vec![];
            split_text(&text, &mut result);
            return Step::Replace(result);
        }

        Step::Keep
    }

    fn handle_element(&mut self, token: &mut Token, stream: &mut StreamView<'_, '_>) -> Step {
        // block elements inside a paragraph have been auto-closed already
        if !stream.allows_element("p") {
            return Step::Keep;
        }

        let inline = is_inline(stream, token);
        if stream.depth() > 0 {
            if !inline {
                return Step::Keep;
            }
            return match stream.emitted().next() {
                Some(prev) if prev.is_start() => {
                    let nesting = usize::from(token.is_start());
                    if needs_paragraph(stream, nesting) {
                        Step::Replace(vec![paragraph_start(), token.clone()])
                    } else {
                        Step::Keep
                    }
                }
                Some(prev)
                    if prev
                        .text_data()
                        .is_some_and(|data| data.ends_with(PARAGRAPH_BREAK)) =>
                {
                    Step::Replace(vec![paragraph_start(), token.clone()])
                }
                _ => Step::Keep,
            };
        }

        // top level of the document
        let separate = stream.emitted().next().is_some_and(|prev| !prev.is_text());
        if !inline && !separate {
            return Step::Keep;
        }

        let mut result = vec![];
        if separate {
            result.push(Token::text(PARAGRAPH_BREAK));
        }
        if inline {
            result.push(paragraph_start());
        }
        result.push(token.clone());
        Step::Replace(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn render(tokens: &[Token]) -> String {
        tokens.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn split_without_breaks() {
        let mut result = vec![];
        split_text("hello", &mut result);
        assert_eq!(render(&result), "hello");
    }

    #[test]
    fn split_into_paragraphs() {
        let mut result = vec![paragraph_start()];
        split_text("one\n\ntwo", &mut result);
        assert_eq!(render(&result), "<p>one</p>\n\n<p>two");
    }

    #[test]
    fn split_with_trailing_break() {
        let mut result = vec![paragraph_start()];
        split_text("one\n\n", &mut result);
        assert_eq!(render(&result), "<p>one</p>\n\n");
    }

    #[test]
    fn split_with_leading_break_inside_paragraph() {
        let mut result = vec![];
        split_text("\n\none", &mut result);
        assert_eq!(render(&result), "</p>\n\n<p>one");
    }

    #[test]
    fn split_collapses_blank_paragraphs() {
        let mut result = vec![paragraph_start()];
        split_text("one\n\n\n\n\n\ntwo", &mut result);
        assert_eq!(render(&result), "<p>one</p>\n\n<p>two");
    }

    #[test]
    fn paragraph_start_is_armored() {
        assert!(paragraph_start().armor.contains(ArmorKind::TagClosedError));
    }
}
