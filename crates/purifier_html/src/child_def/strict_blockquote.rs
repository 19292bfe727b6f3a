//! Blockquotes under strict doctypes may only hold block content. Inline content is still
//! accepted, but wrapped in the block wrapper element.
use crate::child_def::required::{self, Check};
use crate::child_def::{ElementSet, Verdict};
use crate::node::Node;

/// `real` holds the elements allowed directly, `fake` is what is accepted before wrapping
pub(crate) fn validate(
    real: &ElementSet,
    fake: &ElementSet,
    wrapper: &str,
    children: Vec<Node>,
) -> Verdict {
    let (result, check) = required::filter(fake, children);
    if check != Check::Ok {
        return Verdict::Accept(vec![]);
    }

    let mut ret: Vec<Node> = Vec::with_capacity(result.len());
    let mut wrap: Option<usize> = None;

    for node in result {
        let is_real = node.name().is_some_and(|name| real.contains(name)) && node.is_element();

        match wrap {
            None if (node.is_text() && !node.is_whitespace()) || (node.is_element() && !is_real) => {
                ret.push(Node::element(wrapper));
                wrap = Some(ret.len() - 1);
            }
            Some(_) if is_real => wrap = None,
            _ => {}
        }

        match wrap {
            Some(ix) => ret[ix].push_child(node),
            None => ret.push(node),
        }
    }

    Verdict::Accept(ret)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::child_def::element_set;

    fn run(children: Vec<Node>) -> Vec<Node> {
        let real = element_set("p | div | h1");
        let fake = element_set("p | div | h1 | b | #PCDATA");
        match validate(&real, &fake, "p", children) {
            Verdict::Accept(nodes) => nodes,
            Verdict::Reject => panic!("blockquote rejected"),
        }
    }

    #[test]
    fn wraps_inline_runs() {
        let result = run(vec![
            Node::text("loose "),
            Node::element("b"),
            Node::element("div"),
            Node::text("tail"),
        ]);

        assert_eq!(result.len(), 3);
        assert_eq!(result[0].name(), Some("p"));
        assert_eq!(result[0].children().len(), 2);
        assert_eq!(result[1].name(), Some("div"));
        assert_eq!(result[2].name(), Some("p"));
        assert_eq!(result[2].children(), &[Node::text("tail")]);
    }

    #[test]
    fn leading_whitespace_stays_outside() {
        let result = run(vec![Node::text(" "), Node::element("p")]);
        assert_eq!(result, vec![Node::text(" "), Node::element("p")]);
    }

    #[test]
    fn whitespace_after_inline_content_is_wrapped() {
        let result = run(vec![Node::text("a"), Node::text(" ")]);
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].children().len(), 2);
    }

    #[test]
    fn empty_blockquote_stays() {
        assert!(run(vec![]).is_empty());
        assert!(run(vec![Node::text("  ")]).is_empty());
    }
}
