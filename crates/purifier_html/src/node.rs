//! Tree projection of a well-formed token stream
//!
//! Content models are checked against trees, not token streams. A well-formed stream is turned
//! into a tree with [`Node::arborize`] and back into a stream with [`Node::flatten`]. Both walk
//! the input iteratively so deeply nested input cannot exhaust the call stack.
use crate::token::{Armor, Attributes, Token, PCDATA};
use purifier_shared::location::Location;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Node {
    Element {
        name: String,
        attrs: Attributes,
        children: Vec<Node>,
        /// Element came from an empty tag and has no end tag
        is_empty: bool,
        armor: Armor,
        location: Option<Location>,
    },
    Text {
        data: String,
        is_whitespace: bool,
        location: Option<Location>,
    },
    Comment {
        data: String,
        location: Option<Location>,
    },
}

impl Node {
    /// Creates a new, childless element without attributes
    pub fn element(name: &str) -> Self {
        Node::Element {
            name: name.to_string(),
            attrs: Attributes::new(),
            children: vec![],
            is_empty: false,
            armor: Armor::default(),
            location: None,
        }
    }

    pub fn text(data: &str) -> Self {
        Node::Text {
            data: data.to_string(),
            is_whitespace: crate::token::is_whitespace(data),
            location: None,
        }
    }

    /// Name as used in content models. Comments have no name.
    pub fn name(&self) -> Option<&str> {
        match self {
            Node::Element { name, .. } => Some(name),
            Node::Text { .. } => Some(PCDATA),
            Node::Comment { .. } => None,
        }
    }

    /// Whitespace text and comments are ignored by content models
    pub fn is_whitespace(&self) -> bool {
        match self {
            Node::Text { is_whitespace, .. } => *is_whitespace,
            Node::Comment { .. } => true,
            Node::Element { .. } => false,
        }
    }

    pub fn is_element(&self) -> bool {
        matches!(self, Node::Element { .. })
    }

    pub fn is_text(&self) -> bool {
        matches!(self, Node::Text { .. })
    }

    pub fn children(&self) -> &[Node] {
        match self {
            Node::Element { children, .. } => children,
            _ => &[],
        }
    }

    /// Appends a child to an element. Elements that receive children are no longer empty.
    /// Other nodes ignore the call.
    pub fn push_child(&mut self, child: Node) {
        if let Node::Element {
            children, is_empty, ..
        } = self
        {
            *is_empty = false;
            children.push(child);
        }
    }

    /// Returns the start token of the node and, for non-empty elements, the end token
    pub fn to_token_pair(&self) -> (Token, Option<Token>) {
        match self {
            Node::Element {
                name,
                attrs,
                is_empty,
                armor,
                location,
                ..
            } => {
                let mut start = if *is_empty {
                    Token::empty(name, attrs.clone())
                } else {
                    Token::start(name, attrs.clone())
                };
                start.armor = *armor;
                start.location = *location;

                let end = (!*is_empty).then(|| Token::end(name));
                (start, end)
            }
            Node::Text { data, location, .. } => (Token::text(data).at(*location), None),
            Node::Comment { data, location } => (Token::comment(data).at(*location), None),
        }
    }

    /// Builds a tree out of a well-formed token stream. The returned root is an element with
    /// the given name, holding the stream as its children. Injector bookkeeping on the tokens
    /// is dropped.
    pub fn arborize(tokens: Vec<Token>, root: &str) -> Node {
        let mut stack = vec![Node::element(root)];

        for token in tokens {
            if token.is_end() {
                // The root is never closed by the stream
                if stack.len() > 1 {
                    if let Some(node) = stack.pop() {
                        if let Some(parent) = stack.last_mut() {
                            parent.push_child(node);
                        }
                    }
                }
                continue;
            }

            let Some(node) = token.to_node() else {
                continue;
            };

            if token.is_start() {
                stack.push(node);
            } else if let Some(parent) = stack.last_mut() {
                parent.push_child(node);
            }
        }

        // Unclosed elements are closed at the end
        while stack.len() > 1 {
            if let Some(node) = stack.pop() {
                if let Some(parent) = stack.last_mut() {
                    parent.push_child(node);
                }
            }
        }

        stack.pop().unwrap_or_else(|| Node::element(root))
    }

    /// Flattens the children of this node back into a token stream. The node itself is not
    /// part of the output.
    pub fn flatten(self) -> Vec<Token> {
        let mut tokens = vec![];

        let Node::Element { children, .. } = self else {
            return tokens;
        };

        let mut stack: Vec<(std::vec::IntoIter<Node>, Option<Token>)> =
            vec![(children.into_iter(), None)];

        while let Some((iter, _)) = stack.last_mut() {
            match iter.next() {
                Some(node) => {
                    let (start, end) = node.to_token_pair();
                    tokens.push(start);

                    if let Node::Element { children, .. } = node {
                        if end.is_some() {
                            stack.push((children.into_iter(), end));
                        }
                    }
                }
                None => {
                    if let Some((_, Some(end))) = stack.pop() {
                        tokens.push(end);
                    }
                }
            }
        }

        tokens
    }
}
