//! Content models
//!
//! Every element definition carries a [`ChildDef`] describing which children it accepts. The
//! model is consulted twice: by the well-formedness pass (through [`ChildDef::allows`]) to decide
//! whether a start tag implicitly closes its parent, and by the nesting pass (through
//! [`ChildDef::validate_children`]) to repair the children of a node.
use crate::context::Context;
use crate::node::Node;
use crate::token::PCDATA;
use std::collections::BTreeSet;

pub mod custom;
mod lists;
pub(crate) mod required;
mod strict_blockquote;
mod table;

pub use custom::Custom;

/// Set of element names, `#PCDATA` stands for text
pub type ElementSet = BTreeSet<String>;

/// Parses `a | b | #PCDATA` into a set of names
pub(crate) fn element_set(list: &str) -> ElementSet {
    list.split('|')
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(String::from)
        .collect()
}

/// Outcome of validating the children of a node
#[derive(Clone, Debug, PartialEq)]
pub enum Verdict {
    /// Replace the children with the given list. It may be identical to the input.
    Accept(Vec<Node>),
    /// The node itself must be removed
    Reject,
}

/// What a node needs to know about the definition to validate its children
pub trait ChildContext {
    /// Returns true when the element is defined
    fn is_defined(&self, name: &str) -> bool;
    /// Element used to wrap inline content in a block context
    fn block_wrapper(&self) -> &str;
}

#[derive(Clone, Debug)]
pub enum ChildDef {
    /// At least one non-whitespace child out of the set is needed
    Required(ElementSet),
    /// Any number of children out of the set
    Optional(ElementSet),
    /// No children at all, the element is empty
    Nothing,
    /// Children must match a regular expression over their names
    Custom(Custom),
    /// Depends on the context: `inline` when used inline, `block` otherwise
    Chameleon {
        inline: ElementSet,
        block: ElementSet,
    },
    /// Block content only, inline content gets wrapped
    StrictBlockquote { real: ElementSet, fake: ElementSet },
    /// `li` items, stray content is moved into items
    Lists,
    /// Table parts in their proper order
    Table,
}

fn table_elements() -> ElementSet {
    element_set("tr | tbody | thead | tfoot | caption | colgroup | col")
}

impl ChildDef {
    pub fn required(list: &str) -> Self {
        ChildDef::Required(element_set(list))
    }

    pub fn optional(list: &str) -> Self {
        ChildDef::Optional(element_set(list))
    }

    /// Elements that may appear as a direct child
    pub fn allowed_elements(&self) -> ElementSet {
        match self {
            ChildDef::Required(set) | ChildDef::Optional(set) => set.clone(),
            ChildDef::Nothing => ElementSet::new(),
            ChildDef::Custom(custom) => custom.elements.clone(),
            ChildDef::Chameleon { block, .. } => block.clone(),
            ChildDef::StrictBlockquote { fake, .. } => fake.clone(),
            ChildDef::Lists => element_set("li | ul | ol"),
            ChildDef::Table => table_elements(),
        }
    }

    /// Returns true when an element with the given name may appear as a direct child
    pub fn allows(&self, name: &str) -> bool {
        match self {
            ChildDef::Required(set) | ChildDef::Optional(set) => set.contains(name),
            ChildDef::Nothing => false,
            ChildDef::Custom(custom) => custom.elements.contains(name),
            ChildDef::Chameleon { block, .. } => block.contains(name),
            ChildDef::StrictBlockquote { fake, .. } => fake.contains(name),
            ChildDef::Lists => matches!(name, "li" | "ul" | "ol"),
            ChildDef::Table => matches!(
                name,
                "tr" | "tbody" | "thead" | "tfoot" | "caption" | "colgroup" | "col"
            ),
        }
    }

    /// Returns true when the model forbids any content
    pub fn is_empty_model(&self) -> bool {
        matches!(self, ChildDef::Nothing)
    }

    /// Returns true when text may appear as a direct child
    pub fn allows_text(&self) -> bool {
        self.allows(PCDATA)
    }

    /// Validates and repairs the children of a node
    pub fn validate_children(
        &self,
        children: Vec<Node>,
        def: &dyn ChildContext,
        ctx: &Context<'_>,
    ) -> Verdict {
        match self {
            ChildDef::Required(set) => {
                let (result, check) = required::filter(set, children);
                match check {
                    required::Check::Ok => Verdict::Accept(result),
                    _ => Verdict::Reject,
                }
            }
            ChildDef::Optional(set) => optional(set, children),
            ChildDef::Nothing => Verdict::Accept(vec![]),
            ChildDef::Custom(custom) => {
                if custom.matches(&children) {
                    Verdict::Accept(children)
                } else {
                    Verdict::Reject
                }
            }
            ChildDef::Chameleon { inline, block } => {
                if ctx.is_inline == Some(false) {
                    optional(block, children)
                } else {
                    optional(inline, children)
                }
            }
            ChildDef::StrictBlockquote { real, fake } => {
                strict_blockquote::validate(real, fake, def.block_wrapper(), children)
            }
            ChildDef::Lists => lists::validate(children, def.is_defined("li")),
            ChildDef::Table => table::validate(children),
        }
    }
}

/// Optional content: whatever survives filtering, whitespace included
fn optional(set: &ElementSet, children: Vec<Node>) -> Verdict {
    let (result, check) = required::filter(set, children);
    match check {
        required::Check::Ok | required::Check::AllWhitespace => Verdict::Accept(result),
        required::Check::Empty => Verdict::Accept(vec![]),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    struct Defined;

    impl ChildContext for Defined {
        fn is_defined(&self, _name: &str) -> bool {
            true
        }

        fn block_wrapper(&self) -> &str {
            "p"
        }
    }

    fn bold(text: &str) -> Node {
        let mut node = Node::element("b");
        node.push_child(Node::text(text));
        node
    }

    fn validate(def: &ChildDef, children: Vec<Node>) -> Verdict {
        let ctx = Context::new(None);
        def.validate_children(children, &Defined, &ctx)
    }

    #[test]
    fn optional_drops_disallowed_elements() {
        let def = ChildDef::optional("b | i");
        let verdict = validate(&def, vec![bold("Bold text"), Node::element("img")]);
        assert_eq!(verdict, Verdict::Accept(vec![bold("Bold text")]));
    }

    #[test_case(vec![Node::text("Not allowed text")], vec![] ; "text is removed")]
    #[test_case(vec![], vec![] ; "nothing stays nothing")]
    #[test_case(vec![Node::text("  ")], vec![Node::text("  ")] ; "whitespace is kept")]
    fn optional_b_or_i(children: Vec<Node>, expected: Vec<Node>) {
        let def = ChildDef::optional("b | i");
        assert_eq!(validate(&def, children), Verdict::Accept(expected));
    }

    #[test]
    fn required_rejects_empty_results() {
        let def = ChildDef::required("li");
        assert_eq!(validate(&def, vec![]), Verdict::Reject);
        assert_eq!(validate(&def, vec![Node::text(" ")]), Verdict::Reject);
        assert_eq!(validate(&def, vec![Node::text("x")]), Verdict::Reject);

        let li = Node::element("li");
        assert_eq!(
            validate(&def, vec![li.clone()]),
            Verdict::Accept(vec![li])
        );
    }

    #[test]
    fn nothing_discards_children() {
        assert_eq!(
            validate(&ChildDef::Nothing, vec![Node::text("x")]),
            Verdict::Accept(vec![])
        );
        assert!(ChildDef::Nothing.is_empty_model());
        assert!(!ChildDef::Nothing.allows("b"));
    }

    #[test]
    fn chameleon_follows_context() {
        let def = ChildDef::Chameleon {
            inline: element_set("#PCDATA | b"),
            block: element_set("#PCDATA | b | div"),
        };
        let children = vec![Node::element("div")];

        let mut ctx = Context::new(None);
        ctx.is_inline = Some(true);
        assert_eq!(
            def.validate_children(children.clone(), &Defined, &ctx),
            Verdict::Accept(vec![])
        );

        ctx.is_inline = Some(false);
        assert_eq!(
            def.validate_children(children.clone(), &Defined, &ctx),
            Verdict::Accept(children)
        );
    }

    #[test]
    fn custom_accepts_or_rejects() {
        let def = ChildDef::Custom(Custom::new("a, b").unwrap());
        let good = vec![Node::element("a"), Node::element("b")];
        assert_eq!(validate(&def, good.clone()), Verdict::Accept(good));
        assert_eq!(validate(&def, vec![Node::element("b")]), Verdict::Reject);
    }

    #[test]
    fn allowed_elements() {
        assert!(ChildDef::Table.allows("tr"));
        assert!(!ChildDef::Table.allows("td"));
        assert!(ChildDef::Lists.allows("li"));
        assert!(ChildDef::optional("#PCDATA | b").allows_text());
        assert_eq!(
            ChildDef::Table.allowed_elements().len(),
            table_elements().len()
        );
    }

    #[test]
    fn element_set_parsing() {
        let set = element_set(" a |b|| #PCDATA ");
        assert_eq!(set.len(), 3);
        assert!(set.contains("#PCDATA"));
    }
}
