use crate::node::Node;
use core::fmt::{Display, Formatter};
use indexmap::IndexMap;
use purifier_shared::location::Location;

/// Attributes of a tag, in source order. Keys are lower case.
pub type Attributes = IndexMap<String, String>;

/// Name used for text in content models
pub const PCDATA: &str = "#PCDATA";

/// Kinds of armor a token can carry. An armored token is exempt from a specific kind of
/// processing.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ArmorKind {
    /// Attributes have been validated already; attribute validation skips the token
    ValidateAttributes,
    /// The token was synthesized; closing it never produces a "tag closed" report
    TagClosedError,
}

impl ArmorKind {
    fn bit(self) -> u8 {
        match self {
            ArmorKind::ValidateAttributes => 0b01,
            ArmorKind::TagClosedError => 0b10,
        }
    }
}

/// Set of armor kinds
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Armor(u8);

impl Armor {
    pub fn with(kind: ArmorKind) -> Self {
        Armor(kind.bit())
    }

    pub fn contains(&self, kind: ArmorKind) -> bool {
        self.0 & kind.bit() != 0
    }

    pub fn insert(&mut self, kind: ArmorKind) {
        self.0 |= kind.bit();
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }
}

/// The different token structures that flow through the pipeline
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TokenKind {
    Start {
        name: String,
        attrs: Attributes,
    },
    End {
        name: String,
        /// Position of the matching start tag in the emitted stream. Only maintained while
        /// the stream is made well-formed.
        start: Option<usize>,
    },
    Empty {
        name: String,
        attrs: Attributes,
    },
    Text {
        data: String,
        is_whitespace: bool,
    },
    Comment {
        data: String,
    },
}

/// A single unit of the token stream
#[derive(Clone, Debug)]
pub struct Token {
    pub kind: TokenKind,
    pub location: Option<Location>,
    pub armor: Armor,
    /// Injectors (by index) that already had their look at this token
    pub(crate) skip: u32,
    /// Set when the token re-entered the stream through a rewind; only the injector that
    /// requested the rewind may look at it
    pub(crate) rewind: Option<usize>,
    /// Injector marks (by index) placed on upcoming tokens
    pub(crate) marks: u32,
}

/// Returns true when the string is not empty and only holds whitespace
pub(crate) fn is_whitespace(data: &str) -> bool {
    !data.is_empty()
        && data
            .chars()
            .all(|ch| matches!(ch, ' ' | '\t' | '\n' | '\r' | '\x0B' | '\x0C'))
}

fn lowercase_keys(attrs: Attributes) -> Attributes {
    let mut normalized = Attributes::with_capacity(attrs.len());
    for (key, value) in attrs {
        normalized
            .entry(key.to_ascii_lowercase())
            .or_insert(value);
    }
    normalized
}

impl Token {
    fn new(kind: TokenKind) -> Self {
        Self {
            kind,
            location: None,
            armor: Armor::default(),
            skip: 0,
            rewind: None,
            marks: 0,
        }
    }

    pub fn start(name: &str, attrs: Attributes) -> Self {
        Self::new(TokenKind::Start {
            name: name.to_ascii_lowercase(),
            attrs: lowercase_keys(attrs),
        })
    }

    pub fn end(name: &str) -> Self {
        Self::new(TokenKind::End {
            name: name.to_ascii_lowercase(),
            start: None,
        })
    }

    pub fn empty(name: &str, attrs: Attributes) -> Self {
        Self::new(TokenKind::Empty {
            name: name.to_ascii_lowercase(),
            attrs: lowercase_keys(attrs),
        })
    }

    pub fn text(data: &str) -> Self {
        Self::new(TokenKind::Text {
            data: data.to_string(),
            is_whitespace: is_whitespace(data),
        })
    }

    pub fn comment(data: &str) -> Self {
        Self::new(TokenKind::Comment {
            data: data.to_string(),
        })
    }

    /// Sets the source location of the token
    #[must_use]
    pub fn at(mut self, location: Option<Location>) -> Self {
        self.location = location;
        self
    }

    /// Adds the given armor to the token
    #[must_use]
    pub fn armored(mut self, kind: ArmorKind) -> Self {
        self.armor.insert(kind);
        self
    }

    /// Name of the token as used in content models: the tag name for tags, `#PCDATA` for
    /// text, and nothing for comments.
    pub fn name(&self) -> Option<&str> {
        match &self.kind {
            TokenKind::Start { name, .. }
            | TokenKind::End { name, .. }
            | TokenKind::Empty { name, .. } => Some(name),
            TokenKind::Text { .. } => Some(PCDATA),
            TokenKind::Comment { .. } => None,
        }
    }

    /// Name of the tag, or None when this is not a tag
    pub fn tag_name(&self) -> Option<&str> {
        match &self.kind {
            TokenKind::Start { name, .. }
            | TokenKind::End { name, .. }
            | TokenKind::Empty { name, .. } => Some(name),
            _ => None,
        }
    }

    pub fn attrs(&self) -> Option<&Attributes> {
        match &self.kind {
            TokenKind::Start { attrs, .. } | TokenKind::Empty { attrs, .. } => Some(attrs),
            _ => None,
        }
    }

    pub fn attrs_mut(&mut self) -> Option<&mut Attributes> {
        match &mut self.kind {
            TokenKind::Start { attrs, .. } | TokenKind::Empty { attrs, .. } => Some(attrs),
            _ => None,
        }
    }

    pub fn is_tag(&self) -> bool {
        self.tag_name().is_some()
    }

    pub fn is_start(&self) -> bool {
        matches!(self.kind, TokenKind::Start { .. })
    }

    pub fn is_end(&self) -> bool {
        matches!(self.kind, TokenKind::End { .. })
    }

    pub fn is_empty_tag(&self) -> bool {
        matches!(self.kind, TokenKind::Empty { .. })
    }

    pub fn is_text(&self) -> bool {
        matches!(self.kind, TokenKind::Text { .. })
    }

    pub fn is_comment(&self) -> bool {
        matches!(self.kind, TokenKind::Comment { .. })
    }

    /// Returns true for whitespace-only text
    pub fn is_whitespace(&self) -> bool {
        matches!(
            self.kind,
            TokenKind::Text {
                is_whitespace: true,
                ..
            }
        )
    }

    /// Returns true for a start tag with the given name
    pub fn is_start_of(&self, wanted: &str) -> bool {
        matches!(&self.kind, TokenKind::Start { name, .. } if name == wanted)
    }

    /// Returns true for an end tag with the given name
    pub fn is_end_of(&self, wanted: &str) -> bool {
        matches!(&self.kind, TokenKind::End { name, .. } if name == wanted)
    }

    pub fn text_data(&self) -> Option<&str> {
        match &self.kind {
            TokenKind::Text { data, .. } => Some(data),
            _ => None,
        }
    }

    /// A copy of a start tag that reopens an element closed early. The copy is a new token as
    /// far as injectors are concerned, and never reported as closed.
    pub(crate) fn reopened(&self) -> Self {
        let mut token = self.clone();
        token.skip = 0;
        token.rewind = None;
        token.marks = 0;
        token.armor.insert(ArmorKind::TagClosedError);
        token
    }

    /// Converts the token into a tree node. End tokens have no node of their own and
    /// return None.
    pub fn to_node(&self) -> Option<Node> {
        let node = match &self.kind {
            TokenKind::Start { name, attrs } => Node::Element {
                name: name.clone(),
                attrs: attrs.clone(),
                children: vec![],
                is_empty: false,
                armor: self.armor,
                location: self.location,
            },
            TokenKind::Empty { name, attrs } => Node::Element {
                name: name.clone(),
                attrs: attrs.clone(),
                children: vec![],
                is_empty: true,
                armor: self.armor,
                location: self.location,
            },
            TokenKind::Text {
                data,
                is_whitespace,
            } => Node::Text {
                data: data.clone(),
                is_whitespace: *is_whitespace,
                location: self.location,
            },
            TokenKind::Comment { data } => Node::Comment {
                data: data.clone(),
                location: self.location,
            },
            TokenKind::End { .. } => return None,
        };
        Some(node)
    }
}

// Tokens display roughly as their markup, for logging and debugging. Serialization proper is
// done by the generator.
impl Display for Token {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        match &self.kind {
            TokenKind::Start { name, attrs } | TokenKind::Empty { name, attrs } => {
                write!(f, "<{name}")?;
                for (key, value) in attrs {
                    write!(f, r#" {key}="{value}""#)?;
                }
                if self.is_empty_tag() {
                    write!(f, " /")?;
                }
                write!(f, ">")
            }
            TokenKind::End { name, .. } => write!(f, "</{name}>"),
            TokenKind::Text { data, .. } => write!(f, "{data}"),
            TokenKind::Comment { data } => write!(f, "<!--{data}-->"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case("   ", true)]
    #[test_case("\n\t", true)]
    #[test_case("", false)]
    #[test_case(" a ", false)]
    #[test_case("\u{a0}", false)]
    fn test_whitespace(data: &str, expected: bool) {
        assert_eq!(Token::text(data).is_whitespace(), expected);
    }

    #[test]
    fn test_attribute_keys_are_lowercased() {
        let mut attrs = Attributes::new();
        attrs.insert("HREF".into(), "first".into());
        attrs.insert("href".into(), "second".into());
        attrs.insert("Title".into(), "t".into());

        let token = Token::start("A", attrs);
        assert_eq!(token.tag_name(), Some("a"));

        let attrs = token.attrs().unwrap();
        assert_eq!(attrs.len(), 2);
        assert_eq!(attrs.get("href").map(String::as_str), Some("first"));
        assert_eq!(attrs.keys().collect::<Vec<_>>(), vec!["href", "title"]);
    }

    #[test]
    fn test_names() {
        assert_eq!(Token::text("x").name(), Some(PCDATA));
        assert_eq!(Token::comment("x").name(), None);
        assert_eq!(Token::end("b").name(), Some("b"));
        assert_eq!(Token::text("x").tag_name(), None);
    }

    #[test]
    fn test_armor() {
        let mut armor = Armor::default();
        assert!(armor.is_empty());

        armor.insert(ArmorKind::TagClosedError);
        assert!(armor.contains(ArmorKind::TagClosedError));
        assert!(!armor.contains(ArmorKind::ValidateAttributes));

        let token = Token::start("p", Attributes::new()).armored(ArmorKind::ValidateAttributes);
        assert!(token.armor.contains(ArmorKind::ValidateAttributes));
    }

    #[test]
    fn test_display() {
        let mut attrs = Attributes::new();
        attrs.insert("src".into(), "a.png".into());
        assert_eq!(Token::empty("img", attrs).to_string(), r#"<img src="a.png" />"#);
        assert_eq!(Token::end("p").to_string(), "</p>");
        assert_eq!(Token::comment(" c ").to_string(), "<!-- c -->");
    }

    #[test]
    fn test_to_node() {
        assert!(Token::end("b").to_node().is_none());

        let node = Token::empty("br", Attributes::new()).to_node().unwrap();
        assert!(matches!(node, Node::Element { is_empty: true, .. }));
    }

    #[test]
    fn test_reopened() {
        let mut token = Token::start("b", Attributes::new());
        token.skip = 0b101;
        token.rewind = Some(2);
        token.marks = 0b10;

        let reopened = token.reopened();
        assert!(reopened.is_start_of("b"));
        assert_eq!(reopened.skip, 0);
        assert_eq!(reopened.rewind, None);
        assert_eq!(reopened.marks, 0);
        assert!(reopened.armor.contains(ArmorKind::TagClosedError));
    }
}
