use super::Strategy;
use crate::child_def::{ElementSet, Verdict};
use crate::context::{Context, CurrentToken};
use crate::definition::{ElementDef, HtmlDefinition};
use crate::diagnostics::Diagnostic;
use crate::node::Node;
use crate::purifier::Policy;
use crate::settings::Settings;
use crate::token::Token;

/// Checks every element against its content model, bottom up
///
/// The stream is turned into a tree below the configured parent element. Children are checked
/// before their parent, so a parent sees the repaired children. Elements excluded by an
/// ancestor are removed together with their content.
pub struct FixNesting;

struct Frame<'d> {
    /// The node, without its children
    node: Node,
    def: Option<&'d ElementDef>,
    pending: std::vec::IntoIter<Node>,
    /// Children that survived
    done: Vec<Node>,
    is_inline: bool,
    /// Elements excluded by the ancestors of this node
    excludes: ElementSet,
}

impl<'d> Frame<'d> {
    fn new(
        mut node: Node,
        def: Option<&'d ElementDef>,
        is_inline: bool,
        excludes: ElementSet,
    ) -> Self {
        let children = match &mut node {
            Node::Element { children, .. } => std::mem::take(children),
            _ => vec![],
        };
        Self {
            node,
            def,
            pending: children.into_iter(),
            done: vec![],
            is_inline,
            excludes,
        }
    }

    /// Starts a frame for a child element of this frame
    fn child(&self, node: Node, definition: &'d HtmlDefinition) -> Frame<'d> {
        let is_inline = self.is_inline || self.def.is_some_and(|def| def.descendants_are_inline);

        let mut excludes = self.excludes.clone();
        if let Some(def) = self.def {
            excludes.extend(def.excludes.iter().cloned());
        }

        let def = node.name().and_then(|name| definition.get(name));
        Frame::new(node, def, is_inline, excludes)
    }
}

/// Validates the content of a node whose children have all been processed. Returns None when
/// the node is removed.
fn finish(
    frame: Frame<'_>,
    is_root: bool,
    definition: &HtmlDefinition,
    settings: &Settings,
    ctx: &mut Context<'_>,
) -> Option<Node> {
    let Frame {
        mut node,
        def,
        done,
        is_inline,
        excludes,
        ..
    } = frame;

    let name = node.name().unwrap_or_default().to_string();
    let location = match &node {
        Node::Element { location, .. } => *location,
        _ => None,
    };
    ctx.current_token = Some(CurrentToken {
        name: name.clone(),
        location,
    });

    if !is_root && !settings.disable_excludes && excludes.contains(&name) {
        ctx.report(Diagnostic::NodeExcluded, &name);
        return None;
    }

    let Some(def) = def else {
        ctx.report(Diagnostic::NodeRemoved, &name);
        return None;
    };

    ctx.is_inline = Some(is_inline);
    let before = ctx.has_sink().then(|| done.clone());

    match def.child.validate_children(done, definition, ctx) {
        Verdict::Reject => {
            ctx.report(Diagnostic::NodeRemoved, &name);
            None
        }
        Verdict::Accept(children) => {
            if let Some(before) = before {
                if children.is_empty() && !before.is_empty() {
                    ctx.report(Diagnostic::NodeContentsRemoved, &name);
                } else if children != before {
                    ctx.report(Diagnostic::NodeReorganized, &name);
                }
            }
            if let Node::Element { children: slot, .. } = &mut node {
                *slot = children;
            }
            Some(node)
        }
    }
}

impl Strategy for FixNesting {
    fn name(&self) -> &'static str {
        "FixNesting"
    }

    fn execute(&self, tokens: Vec<Token>, policy: &Policy, ctx: &mut Context<'_>) -> Vec<Token> {
        let definition = policy.definition();
        let settings = policy.settings();
        let parent = &definition.parent;

        let root = Node::arborize(tokens, &parent.name);
        let mut stack = vec![Frame::new(
            root,
            Some(parent),
            parent.descendants_are_inline,
            parent.excludes.clone(),
        )];

        loop {
            let Some(frame) = stack.last_mut() else {
                return vec![];
            };

            match frame.pending.next() {
                Some(child) if child.is_element() => {
                    let child = frame.child(child, definition);
                    stack.push(child);
                }
                Some(child) => frame.done.push(child),
                None => {
                    let Some(frame) = stack.pop() else {
                        return vec![];
                    };
                    let is_root = stack.is_empty();
                    let node = finish(frame, is_root, definition, settings, ctx);

                    match stack.last_mut() {
                        Some(parent) => parent.done.extend(node),
                        // a rejected root leaves nothing
                        None => return node.map(Node::flatten).unwrap_or_default(),
                    }
                }
            }
        }
    }
}
