use crate::child_def::ElementSet;
use crate::node::Node;
use crate::token::PCDATA;

/// Outcome of a required content check
#[derive(Debug, PartialEq)]
pub(crate) enum Check {
    /// At least one real child survived
    Ok,
    /// No children survived
    Empty,
    /// Only whitespace (or comments) was found
    AllWhitespace,
}

/// Keeps the children that are allowed. Disallowed elements are replaced by their own
/// children, text is kept only when `#PCDATA` is allowed. Whitespace and comments are always
/// kept.
pub(crate) fn filter(elements: &ElementSet, children: Vec<Node>) -> (Vec<Node>, Check) {
    if children.is_empty() {
        return (children, Check::Empty);
    }

    let pcdata_allowed = elements.contains(PCDATA);
    let mut all_whitespace = true;
    let mut result = Vec::with_capacity(children.len());

    let mut stack: Vec<Node> = children.into_iter().rev().collect();
    while let Some(node) = stack.pop() {
        if node.is_whitespace() {
            result.push(node);
            continue;
        }
        all_whitespace = false;

        let allowed = node.name().is_some_and(|name| elements.contains(name));
        if allowed {
            result.push(node);
            continue;
        }

        match node {
            Node::Text { .. } if pcdata_allowed => result.push(node),
            // spill the contents of the element in its place
            Node::Element { children, .. } => stack.extend(children.into_iter().rev()),
            _ => {}
        }
    }

    if result.is_empty() {
        return (result, Check::Empty);
    }
    if all_whitespace {
        return (result, Check::AllWhitespace);
    }
    (result, Check::Ok)
}
