//! The element definitions the pipeline enforces
//!
//! An [`HtmlDefinition`] is built once per policy out of the element tables of the configured
//! doctype, narrowed down by the element and attribute whitelists. It is read-only afterwards.
use crate::attr::{AttrDef, AttrTransform};
use crate::child_def::{element_set, ChildContext, ChildDef, Custom, ElementSet};
use crate::errors::Error;
use crate::settings::Settings;
use crate::token::PCDATA;
use core::fmt::{Display, Formatter};
use core::str::FromStr;
use indexmap::IndexMap;
use log::{debug, warn};
use std::collections::{HashMap, HashSet};

mod modules;
mod transform;

use modules::{Content, ElementSpec};
pub use transform::TagTransform;

/// The doctypes whose element tables are supported
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Doctype {
    Html401Transitional,
    Html401Strict,
    Xhtml10Transitional,
    Xhtml10Strict,
    Xhtml11,
}

impl Doctype {
    pub fn name(&self) -> &'static str {
        match self {
            Doctype::Html401Transitional => "HTML 4.01 Transitional",
            Doctype::Html401Strict => "HTML 4.01 Strict",
            Doctype::Xhtml10Transitional => "XHTML 1.0 Transitional",
            Doctype::Xhtml10Strict => "XHTML 1.0 Strict",
            Doctype::Xhtml11 => "XHTML 1.1",
        }
    }

    /// Returns true when the output is serialized as xml
    pub fn is_xhtml(&self) -> bool {
        matches!(
            self,
            Doctype::Xhtml10Transitional | Doctype::Xhtml10Strict | Doctype::Xhtml11
        )
    }

    /// Strict doctypes drop all presentational leftovers
    pub fn is_strict(&self) -> bool {
        matches!(
            self,
            Doctype::Html401Strict | Doctype::Xhtml10Strict | Doctype::Xhtml11
        )
    }
}

impl Display for Doctype {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for Doctype {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.split_whitespace().collect::<Vec<_>>().join(" ");
        [
            Doctype::Html401Transitional,
            Doctype::Html401Strict,
            Doctype::Xhtml10Transitional,
            Doctype::Xhtml10Strict,
            Doctype::Xhtml11,
        ]
        .into_iter()
        .find(|doctype| doctype.name().eq_ignore_ascii_case(&normalized))
        .ok_or_else(|| Error::UnknownDoctype(s.to_string()))
    }
}

/// Everything known about a single element
#[derive(Clone, Debug)]
pub struct ElementDef {
    pub name: String,
    pub attrs: IndexMap<String, AttrDef>,
    /// Attributes without which the element is dropped
    pub required_attrs: Vec<String>,
    pub child: ChildDef,
    /// Elements that may not appear anywhere below this one
    pub excludes: ElementSet,
    /// Formatting elements are re-opened after being closed implicitly
    pub formatting: bool,
    /// Element that is inserted when a child is not allowed directly, ie: `li` for lists
    pub wrap: Option<String>,
    pub descendants_are_inline: bool,
    pub attr_pre: Vec<AttrTransform>,
    pub attr_post: Vec<AttrTransform>,
}

impl ElementDef {
    /// Returns true when a start tag of the given element implicitly closes this element
    pub fn auto_closes(&self, name: &str) -> bool {
        !self.child.allows(name)
    }
}

#[derive(Clone, Debug)]
pub struct HtmlDefinition {
    pub doctype: Doctype,
    /// All allowed elements
    pub info: HashMap<String, ElementDef>,
    pub tag_transforms: HashMap<String, TagTransform>,
    /// Content sets (`Inline`, `Block`, `Flow`, ...) after the whitelist has been applied
    pub content_sets: HashMap<String, ElementSet>,
    /// Definition of the element the output is placed in
    pub parent: ElementDef,
    pub block_wrapper: String,
    pub attr_pre: Vec<AttrTransform>,
    pub attr_post: Vec<AttrTransform>,
}

/// The parsed element and attribute whitelists. `None` allows everything.
struct Whitelist {
    elements: Option<HashSet<String>>,
    attributes: Option<HashSet<String>>,
    forbidden_elements: HashSet<String>,
    forbidden_attributes: HashSet<String>,
}

impl Whitelist {
    fn new(settings: &Settings) -> Self {
        let lower = |values: &[String]| -> HashSet<String> {
            values.iter().map(|v| v.trim().to_ascii_lowercase()).collect()
        };

        let (elements, attributes) = if settings.allowed.trim().is_empty() {
            let elements = (!settings.allowed_elements.is_empty())
                .then(|| lower(&settings.allowed_elements));
            let attributes = (!settings.allowed_attributes.is_empty())
                .then(|| lower(&settings.allowed_attributes));
            (elements, attributes)
        } else {
            let (elements, attributes) = parse_allowed(&settings.allowed);
            (Some(elements), Some(attributes))
        };

        // forbidden attributes accept both `a@href` and `a.href`
        let forbidden_attributes = settings
            .forbidden_attributes
            .iter()
            .map(|v| v.trim().to_ascii_lowercase().replacen('@', ".", 1))
            .collect();

        Self {
            elements,
            attributes,
            forbidden_elements: lower(&settings.forbidden_elements),
            forbidden_attributes,
        }
    }

    fn allows_element(&self, name: &str) -> bool {
        if self.forbidden_elements.contains(name) {
            return false;
        }
        self.elements.as_ref().map_or(true, |set| set.contains(name))
    }

    fn allows_attribute(&self, element: &str, attr: &str) -> bool {
        let local = format!("{element}.{attr}");
        let global = format!("*.{attr}");
        if self.forbidden_attributes.contains(&local) || self.forbidden_attributes.contains(&global) {
            return false;
        }
        self.attributes
            .as_ref()
            .map_or(true, |set| set.contains(&local) || set.contains(&global))
    }
}

/// Parses the compact `p,b,a[href|title]` notation into element and `element.attr` sets
fn parse_allowed(allowed: &str) -> (HashSet<String>, HashSet<String>) {
    let mut elements = HashSet::new();
    let mut attributes = HashSet::new();

    let stripped: String = allowed.chars().filter(|ch| !ch.is_whitespace()).collect();
    for chunk in stripped.split(',') {
        let chunk = chunk.to_ascii_lowercase();
        let (element, attrs) = match chunk.split_once('[') {
            Some((element, rest)) => (element.to_string(), rest.trim_end_matches(']').to_string()),
            None => (chunk, String::new()),
        };
        if element.is_empty() {
            continue;
        }

        for attr in attrs.split('|').filter(|attr| !attr.is_empty()) {
            attributes.insert(format!("{element}.{attr}"));
        }
        if element != "*" {
            elements.insert(element);
        }
    }

    (elements, attributes)
}

/// Replaces set names by their members. Unknown elements are dropped.
fn resolve(
    list: &str,
    sets: &HashMap<String, ElementSet>,
    defined: &HashSet<&str>,
) -> ElementSet {
    let mut resolved = ElementSet::new();
    for item in element_set(list) {
        if let Some(members) = sets.get(&item) {
            resolved.extend(members.iter().cloned());
        } else if item == PCDATA || defined.contains(item.as_str()) {
            resolved.insert(item);
        }
    }
    resolved
}

impl HtmlDefinition {
    /// Builds the definition for the configured doctype and whitelists
    pub fn build(settings: &Settings) -> Result<Self, Error> {
        let doctype = settings.doctype;
        let specs = modules::elements(doctype);
        let whitelist = Whitelist::new(settings);
        let transforms = transform::builtin();

        if let Some(allowed) = &whitelist.elements {
            for name in allowed {
                let known = specs.iter().any(|spec| spec.name == name.as_str());
                let transformed = transforms.iter().any(|(from, _)| *from == name.as_str());
                if !known && !transformed {
                    warn!("element '{name}' is not supported by {doctype}");
                }
            }
        }

        let block_set: HashSet<&str> = specs
            .iter()
            .filter(|spec| spec.set == Some("Block"))
            .map(|spec| spec.name)
            .collect();
        if !block_set.contains(settings.block_wrapper.as_str()) {
            return Err(Error::InvalidBlockWrapper(settings.block_wrapper.clone()));
        }

        let parent_spec = specs
            .iter()
            .find(|spec| spec.name == settings.parent)
            .cloned()
            .ok_or_else(|| Error::UndefinedParent(settings.parent.clone()))?;

        let retained: Vec<ElementSpec> = specs
            .into_iter()
            .filter(|spec| whitelist.allows_element(spec.name))
            .collect();
        let defined: HashSet<&str> = retained.iter().map(|spec| spec.name).collect();

        let mut content_sets: HashMap<String, ElementSet> = HashMap::new();
        for spec in &retained {
            if let Some(set) = spec.set {
                content_sets
                    .entry(set.to_string())
                    .or_default()
                    .insert(spec.name.to_string());
            }
        }
        let flow: ElementSet = ["Heading", "Block", "Inline", "List"]
            .iter()
            .filter_map(|set| content_sets.get(*set))
            .flatten()
            .cloned()
            .collect();
        content_sets.insert("Flow".to_string(), flow);

        let common = modules::common_attrs(doctype);
        let mut used_attributes: HashSet<String> = HashSet::new();

        let mut builder = Builder {
            settings,
            whitelist: &whitelist,
            sets: &content_sets,
            defined: &defined,
            common: &common,
            used_attributes: &mut used_attributes,
        };

        let mut info = HashMap::new();
        for spec in &retained {
            let def = builder.element(spec)?;
            info.insert(def.name.clone(), def);
        }
        let parent = builder.element(&parent_spec)?;

        if let Some(allowed) = &whitelist.attributes {
            for attr in allowed.difference(&used_attributes) {
                warn!("attribute '{attr}' is not supported by {doctype}");
            }
        }

        let mut tag_transforms = HashMap::new();
        for (from, transform) in transforms {
            let target_defined = info.contains_key(transform.target());
            if target_defined && !info.contains_key(from) && !whitelist.forbidden_elements.contains(from) {
                tag_transforms.insert(from.to_string(), transform);
            }
        }

        debug!(
            "definition: {} elements for {doctype}, parent {}",
            info.len(),
            parent.name
        );

        Ok(Self {
            doctype,
            info,
            tag_transforms,
            content_sets,
            parent,
            block_wrapper: settings.block_wrapper.clone(),
            attr_pre: modules::global_pre(doctype),
            attr_post: vec![],
        })
    }

    pub fn get(&self, name: &str) -> Option<&ElementDef> {
        self.info.get(name)
    }

    pub fn is_defined(&self, name: &str) -> bool {
        self.info.contains_key(name)
    }

    pub fn content_set(&self, name: &str) -> Option<&ElementSet> {
        self.content_sets.get(name)
    }
}

impl ChildContext for HtmlDefinition {
    fn is_defined(&self, name: &str) -> bool {
        HtmlDefinition::is_defined(self, name)
    }

    fn block_wrapper(&self) -> &str {
        &self.block_wrapper
    }
}

/// Turns element specs into definitions
struct Builder<'a> {
    settings: &'a Settings,
    whitelist: &'a Whitelist,
    sets: &'a HashMap<String, ElementSet>,
    defined: &'a HashSet<&'a str>,
    common: &'a [(&'static str, AttrDef)],
    used_attributes: &'a mut HashSet<String>,
}

impl Builder<'_> {
    fn element(&mut self, spec: &ElementSpec) -> Result<ElementDef, Error> {
        let (child, descendants_are_inline) = self.child_def(spec)?;

        let mut attrs = IndexMap::new();
        for (name, def) in self.common.iter().chain(spec.attrs.iter()) {
            let required = spec.required.contains(name);
            if !required && !self.whitelist.allows_attribute(spec.name, name) {
                continue;
            }
            // element attributes override the common ones
            attrs.insert(name.to_string(), def.clone());
            self.used_attributes.insert(format!("{}.{name}", spec.name));
            self.used_attributes.insert(format!("*.{name}"));
        }

        Ok(ElementDef {
            name: spec.name.to_string(),
            attrs,
            required_attrs: spec.required.iter().map(|s| s.to_string()).collect(),
            child,
            excludes: element_set(spec.excludes),
            formatting: spec.formatting,
            wrap: spec.wrap.map(String::from),
            descendants_are_inline,
            attr_pre: spec.pre.clone(),
            attr_post: spec.post.clone(),
        })
    }

    fn resolve(&self, list: &str) -> ElementSet {
        resolve(list, self.sets, self.defined)
    }

    fn child_def(&self, spec: &ElementSpec) -> Result<(ChildDef, bool), Error> {
        let child = match &spec.content {
            Content::Empty => ChildDef::Nothing,
            Content::Inline => return Ok((ChildDef::Optional(self.resolve("#PCDATA | Inline")), true)),
            Content::Flow => ChildDef::Optional(self.resolve("#PCDATA | Flow")),
            Content::Optional(list) => ChildDef::Optional(self.resolve(list)),
            Content::Required(list) => ChildDef::Required(self.resolve(list)),
            Content::Custom(dtd) => {
                let custom = Custom::new(dtd)?;
                if let Some(reference) = custom
                    .elements
                    .iter()
                    .find(|name| *name != PCDATA && !self.defined.contains(name.as_str()))
                {
                    return Err(Error::UndefinedElementReference {
                        element: spec.name.to_string(),
                        reference: reference.clone(),
                    });
                }
                ChildDef::Custom(custom)
            }
            Content::Chameleon(inline, block) => ChildDef::Chameleon {
                inline: self.resolve(inline),
                block: self.resolve(block),
            },
            Content::StrictBlockquote(list) => {
                let real = self.resolve(list);
                if self.defined.contains(self.settings.block_wrapper.as_str()) {
                    ChildDef::StrictBlockquote {
                        real,
                        fake: self.resolve("#PCDATA | Flow"),
                    }
                } else {
                    ChildDef::Optional(real)
                }
            }
            Content::Lists => ChildDef::Lists,
            Content::Table => ChildDef::Table,
        };
        Ok((child, false))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    fn build(configure: impl FnOnce(&mut Settings)) -> Result<HtmlDefinition, Error> {
        let mut settings = Settings::defaults().unwrap();
        configure(&mut settings);
        HtmlDefinition::build(&settings)
    }

    #[test_case("XHTML 1.0 Transitional", Doctype::Xhtml10Transitional)]
    #[test_case("html  4.01 strict", Doctype::Html401Strict)]
    #[test_case("XHTML 1.1", Doctype::Xhtml11)]
    fn doctype_names(name: &str, expected: Doctype) {
        assert_eq!(name.parse::<Doctype>().unwrap(), expected);
    }

    #[test]
    fn unknown_doctype() {
        assert!(matches!(
            "HTML 5".parse::<Doctype>(),
            Err(Error::UnknownDoctype(_))
        ));
    }

    #[test]
    fn default_definition() {
        let def = build(|_| {}).unwrap();

        assert_eq!(def.parent.name, "div");
        assert!(def.is_defined("p"));
        assert!(!def.is_defined("script"));
        assert!(def.get("b").unwrap().formatting);
        assert!(def.get("span").unwrap().descendants_are_inline);
        assert!(def.get("br").unwrap().child.is_empty_model());
        assert_eq!(def.get("ul").unwrap().wrap.as_deref(), Some("li"));
        assert!(def.tag_transforms.contains_key("font"));

        let flow = def.content_set("Flow").unwrap();
        assert!(flow.contains("p"));
        assert!(flow.contains("b"));
        assert!(flow.contains("ul"));
        assert!(flow.contains("h1"));
    }

    #[test]
    fn paragraphs_auto_close() {
        let def = build(|_| {}).unwrap();
        let p = def.get("p").unwrap();
        assert!(p.auto_closes("div"));
        assert!(!p.auto_closes("b"));
    }

    #[test]
    fn compact_whitelist() {
        let def = build(|s| s.allowed = "p, b, a[href|title]".into()).unwrap();

        let mut names: Vec<&String> = def.info.keys().collect();
        names.sort();
        assert_eq!(names, vec!["a", "b", "p"]);

        let a = def.get("a").unwrap();
        assert_eq!(a.attrs.keys().collect::<Vec<_>>(), vec!["title", "href"]);
        assert!(def.get("p").unwrap().attrs.is_empty());

        // content models only reference allowed elements
        assert!(!def.get("p").unwrap().child.allows("span"));
        assert!(def.get("p").unwrap().child.allows("b"));
        // the parent is taken from the full table
        assert!(def.parent.child.allows("p"));
        assert!(!def.parent.child.allows("div"));
    }

    #[test]
    fn required_attributes_survive_the_whitelist() {
        let def = build(|s| s.allowed = "img[width]".into()).unwrap();
        let img = def.get("img").unwrap();
        assert!(img.attrs.contains_key("src"));
        assert!(img.attrs.contains_key("alt"));
        assert!(img.attrs.contains_key("width"));
        assert!(!img.attrs.contains_key("height"));
    }

    #[test]
    fn forbidden_elements_and_attributes() {
        let def = build(|s| {
            s.forbidden_elements = vec!["b".into()];
            s.forbidden_attributes = vec!["a@href".into(), "*.title".into()];
        })
        .unwrap();

        assert!(!def.is_defined("b"));
        assert!(!def.get("p").unwrap().child.allows("b"));
        assert!(!def.get("a").unwrap().attrs.contains_key("href"));
        assert!(!def.get("p").unwrap().attrs.contains_key("title"));
    }

    #[test]
    fn unknown_allowed_elements_are_warned_about() {
        testing_logger::setup();
        build(|s| s.allowed_elements = vec!["p".into(), "blink".into(), "center".into()]).unwrap();

        testing_logger::validate(|logs| {
            let warnings: Vec<&String> = logs
                .iter()
                .filter(|log| log.level == log::Level::Warn)
                .map(|log| &log.body)
                .collect();
            assert_eq!(warnings.len(), 1);
            assert!(warnings[0].contains("blink"));
        });
    }

    #[test]
    fn configuration_errors() {
        assert!(matches!(
            build(|s| s.parent = "marquee".into()),
            Err(Error::UndefinedParent(_))
        ));
        assert!(matches!(
            build(|s| s.block_wrapper = "span".into()),
            Err(Error::InvalidBlockWrapper(_))
        ));
        assert!(matches!(
            build(|s| {
                s.doctype = Doctype::Xhtml11;
                s.allowed_elements = vec!["ruby".into(), "rb".into()];
            }),
            Err(Error::UndefinedElementReference { .. })
        ));
    }

    #[test]
    fn strict_blockquote_depends_on_the_wrapper() {
        let def = build(|s| s.doctype = Doctype::Xhtml10Strict).unwrap();
        assert!(matches!(
            def.get("blockquote").unwrap().child,
            ChildDef::StrictBlockquote { .. }
        ));

        let def = build(|s| {
            s.doctype = Doctype::Xhtml10Strict;
            s.allowed_elements = vec!["blockquote".into(), "div".into()];
        })
        .unwrap();
        assert!(matches!(
            def.get("blockquote").unwrap().child,
            ChildDef::Optional(_)
        ));
    }

    #[test]
    fn unknown_allowed_elements_are_logged() {
        testing_logger::setup();
        let def = build(|s| s.allowed_elements = vec!["p".into(), "blink".into()]).unwrap();
        assert!(def.get("blink").is_none());

        testing_logger::validate(|captured_logs| {
            assert!(captured_logs
                .iter()
                .any(|log| log.level == log::Level::Warn && log.body.contains("'blink'")));
        });
    }

    #[test]
    fn tag_transforms_need_their_target() {
        let def = build(|s| s.allowed_elements = vec!["p".into()]).unwrap();
        assert!(def.tag_transforms.is_empty());

        let def = build(|s| s.allowed_elements = vec!["span".into()]).unwrap();
        assert!(def.tag_transforms.contains_key("font"));
        assert!(!def.tag_transforms.contains_key("center"));
    }
}
