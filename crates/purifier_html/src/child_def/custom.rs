//! Content models written as DTD-style regular expressions, ie: `(rb, (rt | (rp, rt, rp)))`
use crate::child_def::ElementSet;
use crate::node::Node;
use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref ELEMENT: Regex = crate::pattern(r"[#a-zA-Z0-9_.-]+");
    static ref UNSOLICITED_COMMA: Regex =
        crate::pattern(r"([^,(|]\(+),");
}

#[derive(Clone, Debug)]
pub struct Custom {
    /// The content model as written
    pub dtd: String,
    /// Every element mentioned by the model
    pub elements: ElementSet,
    regex: Regex,
}

impl Custom {
    pub fn new(dtd: &str) -> Result<Self, regex::Error> {
        let mut raw: String = dtd.chars().filter(|c| !c.is_whitespace()).collect();
        if !raw.starts_with('(') {
            raw = format!("({raw})");
        }

        let elements = ELEMENT
            .find_iter(&raw)
            .map(|m| m.as_str().to_string())
            .collect();

        // every element becomes a group with a leading comma, so a sequence of children can be
        // matched against ",a,b,c"
        let reg = ELEMENT.replace_all(&raw, "(,$0)");
        let reg = UNSOLICITED_COMMA.replace_all(&reg, "$1");
        let reg = reg.replace(",(", "(");

        let regex = Regex::new(&format!("^,?{reg}$"))?;

        Ok(Self {
            dtd: dtd.to_string(),
            elements,
            regex,
        })
    }

    /// Returns true when the children match the model. Whitespace and comments are ignored.
    pub fn matches(&self, children: &[Node]) -> bool {
        let mut list = String::new();
        for name in children
            .iter()
            .filter(|node| !node.is_whitespace())
            .filter_map(Node::name)
        {
            list.push(',');
            list.push_str(name);
        }

        self.regex.is_match(&list)
    }
}
