use crate::child_def::Verdict;
use crate::node::Node;

/// Content model of `ul` and `ol`. Anything that is not an `li` is tucked into the closest
/// preceding `li`, or into a new one when there is none.
pub(crate) fn validate(children: Vec<Node>, li_defined: bool) -> Verdict {
    if children.is_empty() {
        return Verdict::Reject;
    }
    if !li_defined {
        log::warn!("lists are allowed without allowing li, dropping the list");
        return Verdict::Reject;
    }

    let mut result: Vec<Node> = Vec::with_capacity(children.len());
    let mut all_whitespace = true;
    let mut current_li: Option<usize> = None;

    for node in children {
        if node.is_whitespace() {
            result.push(node);
            continue;
        }
        all_whitespace = false;

        if node.name() == Some("li") {
            result.push(node);
            current_li = Some(result.len() - 1);
            continue;
        }

        let ix = match current_li {
            Some(ix) => ix,
            None => {
                result.push(Node::element("li"));
                let ix = result.len() - 1;
                current_li = Some(ix);
                ix
            }
        };
        result[ix].push_child(node);
    }

    if all_whitespace {
        return Verdict::Reject;
    }
    Verdict::Accept(result)
}
