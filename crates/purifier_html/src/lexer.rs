//! Turns markup into a flat token stream
//!
//! The lexer is forgiving: it never fails. Markup it cannot make sense of (a `<` that does not
//! start a tag, a tag without a closing `>`) ends up as text. Tag and attribute names are
//! lowercased, character references in text and attribute values are decoded. The content of
//! `script` and `style` is kept as raw text.
use crate::entities;
use crate::settings::Settings;
use crate::token::{Attributes, Token};
use lazy_static::lazy_static;
use log::trace;
use purifier_shared::location::{Location, LocationHandler};
use regex::Regex;

lazy_static! {
    static ref BODY: Regex =
        crate::pattern(r"(?is)<body[^>]*>(.*)</body>");
    static ref TAG_NAME: Regex =
        crate::pattern(r"^[a-zA-Z][a-zA-Z0-9:_.\-]*$");
}

/// Elements whose content is not markup
const RAW_TEXT: [&str; 2] = ["script", "style"];

/// Characters that have no place in a document
fn is_non_sgml(ch: char) -> bool {
    matches!(ch,
        '\u{0}'..='\u{8}' | '\u{b}' | '\u{c}' | '\u{e}'..='\u{1f}'
        | '\u{7f}'..='\u{84}' | '\u{86}'..='\u{9f}')
}

fn is_space(byte: u8) -> bool {
    matches!(byte, b' ' | b'\t' | b'\n' | b'\x0C')
}

/// Finds the `>` that closes the tag starting at the beginning of `rest`. Quoted attribute
/// values may hold a `>`; when quotes do not balance, the first `>` is taken.
fn find_tag_end(rest: &str) -> Option<usize> {
    let mut quote: Option<u8> = None;
    let mut after_equals = false;

    for (i, byte) in rest.bytes().enumerate().skip(1) {
        match quote {
            Some(q) => {
                if byte == q {
                    quote = None;
                }
            }
            None => match byte {
                b'>' => return Some(i),
                b'"' | b'\'' if after_equals => quote = Some(byte),
                b'=' => {
                    after_equals = true;
                    continue;
                }
                _ if is_space(byte) => continue,
                _ => {}
            },
        }
        after_equals = false;
    }

    rest.find('>')
}

/// Parses the attributes of a tag. The first occurrence of an attribute wins; an attribute
/// without a value gets its own name as value.
fn parse_attributes(input: &str) -> Attributes {
    let bytes = input.as_bytes();
    let len = bytes.len();
    let mut attrs = Attributes::new();
    let mut i = 0;

    let skip_space = |mut i: usize| {
        while i < len && is_space(bytes[i]) {
            i += 1;
        }
        i
    };

    loop {
        i = skip_space(i);
        if i >= len {
            break;
        }

        let start = i;
        while i < len && !is_space(bytes[i]) && bytes[i] != b'=' {
            i += 1;
        }
        if start == i {
            // a stray `=`
            i += 1;
            continue;
        }
        let name = input[start..i].to_ascii_lowercase();

        i = skip_space(i);
        let value = if i < len && bytes[i] == b'=' {
            i = skip_space(i + 1);
            if i < len && (bytes[i] == b'"' || bytes[i] == b'\'') {
                let quote = bytes[i];
                let value_start = i + 1;
                i = value_start;
                while i < len && bytes[i] != quote {
                    i += 1;
                }
                let value = &input[value_start..i];
                i = (i + 1).min(len);
                entities::decode(value).into_owned()
            } else {
                let value_start = i;
                while i < len && !is_space(bytes[i]) {
                    i += 1;
                }
                entities::decode(&input[value_start..i]).into_owned()
            }
        } else {
            name.clone()
        };

        attrs.entry(name).or_insert(value);
    }

    attrs
}

/// Parses the inside of a tag (without the angle brackets). Returns None when this is not a
/// tag after all.
fn parse_tag(segment: &str) -> Option<Token> {
    if segment.is_empty() || segment.starts_with(char::is_whitespace) {
        return None;
    }

    if let Some(end) = segment.strip_prefix('/') {
        let name = end.split_whitespace().next()?;
        if !TAG_NAME.is_match(name) {
            return None;
        }
        return Some(Token::end(&name.to_ascii_lowercase()));
    }

    let (segment, is_empty) = match segment.strip_suffix('/') {
        Some(segment) => (segment, true),
        None => (segment, false),
    };
    let name_end = segment
        .find(|ch: char| ch.is_ascii_whitespace())
        .unwrap_or(segment.len());
    let name = &segment[..name_end];
    if !TAG_NAME.is_match(name) {
        return None;
    }

    let name = name.to_ascii_lowercase();
    let attrs = parse_attributes(&segment[name_end..]);
    Some(if is_empty {
        Token::empty(&name, attrs)
    } else {
        Token::start(&name, attrs)
    })
}

struct Scanner<'s> {
    src: &'s str,
    pos: usize,
    /// Location of `pos`, when locations are tracked
    location: Option<LocationHandler>,
    tokens: Vec<Token>,
}

impl Scanner<'_> {
    fn here(&self) -> Option<Location> {
        self.location.as_ref().map(|handler| handler.cur_location)
    }

    fn advance_to(&mut self, pos: usize) {
        if let Some(handler) = self.location.as_mut() {
            handler.inc_str(&self.src[self.pos..pos]);
        }
        self.pos = pos;
    }

    fn push(&mut self, token: Token) {
        let token = token.at(self.here());
        self.tokens.push(token);
    }

    /// Emits the text up to `end`
    fn text_until(&mut self, end: usize, decode: bool) {
        if end > self.pos {
            let raw = &self.src[self.pos..end];
            let token = if decode {
                Token::text(&entities::decode(raw))
            } else {
                Token::text(raw)
            };
            self.push(token);
        }
        self.advance_to(end);
    }

    /// Position of the first occurrence of `needle` at or after `from`
    fn find_from(&self, from: usize, needle: &str) -> Option<usize> {
        self.src[from..].find(needle).map(|i| from + i)
    }

    fn run(&mut self) {
        let src = self.src;

        while self.pos < src.len() {
            let Some(lt) = self.find_from(self.pos, "<") else {
                self.text_until(src.len(), true);
                break;
            };
            self.text_until(lt, true);
            let rest = &src[lt..];

            if let Some(comment) = rest.strip_prefix("<!--") {
                let (data, end) = match comment.find("-->") {
                    Some(i) => (&comment[..i], lt + 4 + i + 3),
                    None => (comment, src.len()),
                };
                self.push(Token::comment(data));
                self.advance_to(end);
                continue;
            }

            if let Some(cdata) = rest.strip_prefix("<![CDATA[") {
                let (data, end) = match cdata.find("]]>") {
                    Some(i) => (&cdata[..i], lt + 9 + i + 3),
                    None => (cdata, src.len()),
                };
                if !data.is_empty() {
                    self.push(Token::text(data));
                }
                self.advance_to(end);
                continue;
            }

            if rest.starts_with("<!") || rest.starts_with("<?") {
                // doctypes and processing instructions
                let end = rest.find('>').map_or(src.len(), |i| lt + i + 1);
                trace!("skipping {}", &src[lt..end]);
                self.advance_to(end);
                continue;
            }

            let tag = find_tag_end(rest).and_then(|close| Some((parse_tag(&rest[1..close])?, close)));
            let Some((token, close)) = tag else {
                // not a tag, just a less-than sign
                self.push(Token::text("<"));
                self.advance_to(lt + 1);
                continue;
            };

            let raw_text = token
                .tag_name()
                .filter(|name| token.is_start() && RAW_TEXT.contains(name))
                .map(|name| format!("</{name}"));
            self.push(token);
            self.advance_to(lt + close + 1);

            if let Some(closing) = raw_text {
                let end = src[self.pos..]
                    .to_ascii_lowercase()
                    .find(&closing)
                    .map_or(src.len(), |i| self.pos + i);
                self.text_until(end, false);
            }
        }
    }
}

pub struct Lexer<'a> {
    settings: &'a Settings,
}

impl<'a> Lexer<'a> {
    pub fn new(settings: &'a Settings) -> Self {
        Self { settings }
    }

    /// Normalizes newlines, drops characters that cannot appear in a document and, when asked,
    /// cuts a full document down to the content of its body.
    pub fn normalize(&self, html: &str) -> String {
        let html = html.replace("\r\n", "\n").replace('\r', "\n");
        let html = if self.settings.convert_document_to_fragment {
            match BODY.captures(&html).and_then(|c| c.get(1)) {
                Some(body) => body.as_str().to_string(),
                None => html,
            }
        } else {
            html
        };
        html.chars().filter(|ch| !is_non_sgml(*ch)).collect()
    }

    pub fn tokenize(&self, html: &str) -> Vec<Token> {
        let html = self.normalize(html);
        let mut scanner = Scanner {
            src: &html,
            pos: 0,
            location: self
                .settings
                .maintain_line_numbers
                .then(LocationHandler::default),
            tokens: vec![],
        };
        scanner.run();
        scanner.tokens
    }
}
