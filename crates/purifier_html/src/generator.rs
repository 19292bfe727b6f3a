//! Serialization of tokens back into markup
use crate::definition::Doctype;
use crate::token::{Attributes, Token, TokenKind};

/// Escapes text content: `&`, `<` and `>`
pub fn escape_text(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            _ => escaped.push(ch),
        }
    }
    escaped
}

/// Escapes an attribute value, which is always written between double quotes
pub fn escape_attr(value: &str) -> String {
    escape_text(value).replace('"', "&quot;")
}

#[derive(Clone, Copy, Debug)]
pub struct Generator {
    xhtml: bool,
}

impl Generator {
    pub fn new(doctype: Doctype) -> Self {
        Self {
            xhtml: doctype.is_xhtml(),
        }
    }

    pub fn generate(&self, tokens: &[Token]) -> String {
        tokens.iter().map(|t| self.generate_token(t)).collect()
    }

    pub fn generate_token(&self, token: &Token) -> String {
        match &token.kind {
            TokenKind::Start { name, attrs } => format!("<{name}{}>", self.attributes(attrs)),
            TokenKind::Empty { name, attrs } => {
                let close = if self.xhtml { " /" } else { "" };
                format!("<{name}{}{close}>", self.attributes(attrs))
            }
            TokenKind::End { name, .. } => format!("</{name}>"),
            TokenKind::Text { data, .. } => escape_text(data),
            TokenKind::Comment { data } => format!("<!--{data}-->"),
        }
    }

    fn attributes(&self, attrs: &Attributes) -> String {
        attrs
            .iter()
            .map(|(key, value)| format!(r#" {key}="{}""#, escape_attr(value)))
            .collect()
    }
}
