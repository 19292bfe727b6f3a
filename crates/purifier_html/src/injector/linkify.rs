use super::{Injector, Needed, Step, StreamView};
use crate::token::{Attributes, Token};
use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    // trailing punctuation is not part of the link
    static ref URL: Regex = crate::pattern(r#"(?i)\b(?:https?|ftp)://[^\s<>"'()]*[^\s<>"'().,;:!?\]]"#);
}

/// Turns urls in text into links
#[derive(Debug, Default)]
pub struct Linkify;

impl Injector for Linkify {
    fn name(&self) -> &'static str {
        "Linkify"
    }

    fn needed(&self) -> Vec<Needed> {
        vec![Needed {
            element: "a",
            attributes: &["href"],
        }]
    }

    fn handle_text(&mut self, token: &mut Token, stream: &mut StreamView<'_, '_>) -> Step {
        if !stream.allows_element("a") {
            return Step::Keep;
        }
        let Some(data) = token.text_data() else {
            return Step::Keep;
        };
        if !data.contains("://") {
            return Step::Keep;
        }

        let mut result = vec![];
        let mut last = 0;
        for url in URL.find_iter(data) {
            if url.start() > last {
                result.push(Token::text(&data[last..url.start()]));
            }
            let mut attrs = Attributes::new();
            attrs.insert("href".to_string(), url.as_str().to_string());
            result.push(Token::start("a", attrs));
            result.push(Token::text(url.as_str()));
            result.push(Token::end("a"));
            last = url.end();
        }

        if result.is_empty() {
            return Step::Keep;
        }
        if last < data.len() {
            result.push(Token::text(&data[last..]));
        }
        Step::Replace(result)
    }
}
