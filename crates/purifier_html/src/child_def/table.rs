//! Content model of tables
//!
//! Children are put in their proper order: caption, col(group)s, thead, tfoot and then the
//! rows. Whitespace sticks to the end of the element before it. A second thead or tfoot is
//! turned into a tbody, and as soon as any row group exists, loose rows are wrapped in a tbody.
use crate::child_def::Verdict;
use crate::node::Node;

#[derive(Clone, Copy)]
enum Slot {
    Initial,
    AfterCaption,
    AfterThead,
    AfterTfoot,
    Cols,
    Content,
}

#[derive(Default)]
struct Parts {
    initial_ws: Vec<Node>,
    after_caption_ws: Vec<Node>,
    after_thead_ws: Vec<Node>,
    after_tfoot_ws: Vec<Node>,
    cols: Vec<Node>,
    content: Vec<Node>,
}

impl Parts {
    fn slot(&mut self, slot: Slot) -> &mut Vec<Node> {
        match slot {
            Slot::Initial => &mut self.initial_ws,
            Slot::AfterCaption => &mut self.after_caption_ws,
            Slot::AfterThead => &mut self.after_thead_ws,
            Slot::AfterTfoot => &mut self.after_tfoot_ws,
            Slot::Cols => &mut self.cols,
            Slot::Content => &mut self.content,
        }
    }
}

fn rename(node: &mut Node, to: &str) {
    if let Node::Element { name, .. } = node {
        *name = to.to_string();
    }
}

pub(crate) fn validate(children: Vec<Node>) -> Verdict {
    if children.is_empty() {
        return Verdict::Reject;
    }

    let mut caption = None;
    let mut thead = None;
    let mut tfoot = None;
    let mut parts = Parts::default();
    let mut ws_accum = Slot::Initial;
    let mut tbody_mode = false;

    for mut node in children {
        if matches!(node, Node::Comment { .. }) {
            parts.slot(ws_accum).push(node);
            continue;
        }

        match node.name().unwrap_or_default() {
            "tbody" | "tr" => {
                if node.name() == Some("tbody") {
                    tbody_mode = true;
                }
                parts.content.push(node);
                ws_accum = Slot::Content;
            }
            "caption" => {
                // only the first caption counts
                if caption.is_none() {
                    caption = Some(node);
                    ws_accum = Slot::AfterCaption;
                }
            }
            "thead" => {
                tbody_mode = true;
                if thead.is_none() {
                    thead = Some(node);
                    ws_accum = Slot::AfterThead;
                } else {
                    rename(&mut node, "tbody");
                    parts.content.push(node);
                    ws_accum = Slot::Content;
                }
            }
            "tfoot" => {
                tbody_mode = true;
                if tfoot.is_none() {
                    tfoot = Some(node);
                    ws_accum = Slot::AfterTfoot;
                } else {
                    rename(&mut node, "tbody");
                    parts.content.push(node);
                    ws_accum = Slot::Content;
                }
            }
            "colgroup" | "col" => {
                parts.cols.push(node);
                ws_accum = Slot::Cols;
            }
            _ => {
                if node.is_whitespace() {
                    parts.slot(ws_accum).push(node);
                }
            }
        }
    }

    if parts.content.is_empty() && thead.is_none() && tfoot.is_none() {
        return Verdict::Reject;
    }

    let mut ret = std::mem::take(&mut parts.initial_ws);
    if let Some(caption) = caption {
        ret.push(caption);
        ret.append(&mut parts.after_caption_ws);
    }
    ret.append(&mut parts.cols);
    if let Some(thead) = thead {
        ret.push(thead);
        ret.append(&mut parts.after_thead_ws);
    }
    if let Some(tfoot) = tfoot {
        ret.push(tfoot);
        ret.append(&mut parts.after_tfoot_ws);
    }

    if !tbody_mode {
        ret.append(&mut parts.content);
        return Verdict::Accept(ret);
    }

    // shuffle loose rows into a tbody
    let mut current_tbody: Option<usize> = None;
    for node in parts.content {
        match node.name() {
            Some("tbody") => {
                current_tbody = None;
                ret.push(node);
            }
            Some("tr") => {
                let ix = match current_tbody {
                    Some(ix) => ix,
                    None => {
                        ret.push(Node::element("tbody"));
                        let ix = ret.len() - 1;
                        current_tbody = Some(ix);
                        ix
                    }
                };
                ret[ix].push_child(node);
            }
            _ => match current_tbody {
                Some(ix) => ret[ix].push_child(node),
                None => ret.push(node),
            },
        }
    }

    Verdict::Accept(ret)
}
