//! The element tables of the supported doctypes, before any whitelist is applied
use crate::attr::{AttrDef, AttrTransform};
use crate::definition::Doctype;

/// Content model as written in the tables. Set names are resolved once the whitelist has been
/// applied.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum Content {
    Empty,
    /// `#PCDATA | Inline`, all descendants are inline
    Inline,
    /// `#PCDATA | Flow`
    Flow,
    Optional(&'static str),
    Required(&'static str),
    Custom(&'static str),
    Chameleon(&'static str, &'static str),
    /// Holds the list of real block elements
    StrictBlockquote(&'static str),
    Lists,
    Table,
}

#[derive(Clone, Debug)]
pub(crate) struct ElementSpec {
    pub name: &'static str,
    /// Content set the element belongs to
    pub set: Option<&'static str>,
    pub content: Content,
    pub attrs: Vec<(&'static str, AttrDef)>,
    pub required: Vec<&'static str>,
    pub formatting: bool,
    pub excludes: &'static str,
    pub wrap: Option<&'static str>,
    pub pre: Vec<AttrTransform>,
    pub post: Vec<AttrTransform>,
}

impl ElementSpec {
    fn new(name: &'static str, set: Option<&'static str>, content: Content) -> Self {
        Self {
            name,
            set,
            content,
            attrs: vec![],
            required: vec![],
            formatting: false,
            excludes: "",
            wrap: None,
            pre: vec![],
            post: vec![],
        }
    }

    fn attr(mut self, name: &'static str, def: AttrDef) -> Self {
        self.attrs.push((name, def));
        self
    }

    /// Adds an attribute the element cannot live without
    fn required(mut self, name: &'static str, def: AttrDef) -> Self {
        self.required.push(name);
        self.attr(name, def)
    }

    fn formatting(mut self) -> Self {
        self.formatting = true;
        self
    }

    fn excludes(mut self, list: &'static str) -> Self {
        self.excludes = list;
        self
    }

    fn wrap(mut self, wrapper: &'static str) -> Self {
        self.wrap = Some(wrapper);
        self
    }

    fn pre(mut self, transform: AttrTransform) -> Self {
        self.pre.push(transform);
        self
    }

    fn post(mut self, transform: AttrTransform) -> Self {
        self.post.push(transform);
        self
    }

    /// Adds the attribute only for transitional doctypes
    fn legacy(self, doctype: Doctype, name: &'static str, def: AttrDef) -> Self {
        if doctype.is_strict() {
            return self;
        }
        self.attr(name, def)
    }
}

const INLINE: Option<&str> = Some("Inline");
const BLOCK: Option<&str> = Some("Block");
const HEADING: Option<&str> = Some("Heading");
const LIST: Option<&str> = Some("List");

/// Attributes every element accepts
pub(crate) fn common_attrs(doctype: Doctype) -> Vec<(&'static str, AttrDef)> {
    let mut attrs = vec![
        ("class", AttrDef::Class),
        ("id", AttrDef::Id),
        ("style", AttrDef::Css),
        ("title", AttrDef::Text),
        ("dir", AttrDef::enumeration(&["ltr", "rtl"])),
    ];
    if doctype != Doctype::Xhtml11 {
        attrs.push(("lang", AttrDef::Lang));
    }
    if doctype.is_xhtml() {
        attrs.push(("xml:lang", AttrDef::Lang));
    }
    attrs
}

/// Transforms applied to every element
pub(crate) fn global_pre(doctype: Doctype) -> Vec<AttrTransform> {
    match doctype {
        Doctype::Xhtml10Transitional | Doctype::Xhtml10Strict => vec![AttrTransform::Lang],
        _ => vec![],
    }
}

fn text(doctype: Doctype) -> Vec<ElementSpec> {
    let mut elements = vec![];

    for name in [
        "abbr", "acronym", "cite", "dfn", "kbd", "samp", "var", "em", "strong", "code",
    ] {
        elements.push(ElementSpec::new(name, INLINE, Content::Inline).formatting());
    }
    elements.push(
        ElementSpec::new("q", INLINE, Content::Inline)
            .formatting()
            .attr("cite", AttrDef::Uri { embedded: false }),
    );
    elements.push(ElementSpec::new("span", INLINE, Content::Inline));
    elements.push(
        ElementSpec::new("br", INLINE, Content::Empty).legacy(
            doctype,
            "clear",
            AttrDef::enumeration(&["left", "all", "right", "none"]),
        ),
    );

    elements.push(ElementSpec::new("address", BLOCK, Content::Inline));
    elements.push(ElementSpec::new("div", BLOCK, Content::Flow).pre(AttrTransform::TextAlign));
    elements.push(ElementSpec::new("p", BLOCK, Content::Inline).pre(AttrTransform::TextAlign));

    let blockquote = if doctype.is_strict() {
        Content::StrictBlockquote("Heading | Block | List")
    } else {
        Content::Optional("#PCDATA | Flow")
    };
    elements.push(
        ElementSpec::new("blockquote", BLOCK, blockquote)
            .attr("cite", AttrDef::Uri { embedded: false }),
    );

    for name in ["h1", "h2", "h3", "h4", "h5", "h6"] {
        elements.push(ElementSpec::new(name, HEADING, Content::Inline).pre(AttrTransform::TextAlign));
    }

    elements.push(
        ElementSpec::new("pre", BLOCK, Content::Inline)
            .excludes("img | big | small | object | applet | font | basefont | sub | sup")
            .legacy(
                doctype,
                "width",
                AttrDef::Integer {
                    negative: false,
                    zero: false,
                    positive: true,
                },
            ),
    );
    elements.push(ElementSpec::new("sub", INLINE, Content::Inline).formatting());
    elements.push(ElementSpec::new("sup", INLINE, Content::Inline).formatting());

    elements
}

fn presentation(doctype: Doctype) -> Vec<ElementSpec> {
    let mut elements: Vec<ElementSpec> = ["b", "big", "i", "small", "tt"]
        .into_iter()
        .map(|name| ElementSpec::new(name, INLINE, Content::Inline).formatting())
        .collect();
    elements.push(
        ElementSpec::new("hr", BLOCK, Content::Empty)
            .legacy(doctype, "size", AttrDef::Pixels { max: None })
            .legacy(doctype, "width", AttrDef::Length)
            .legacy(doctype, "noshade", AttrDef::enumeration(&["noshade"])),
    );
    elements
}

fn hypertext() -> Vec<ElementSpec> {
    vec![ElementSpec::new("a", INLINE, Content::Inline)
        .formatting()
        .excludes("a")
        .attr("href", AttrDef::Uri { embedded: false })
        .attr("target", AttrDef::FrameTarget)
        .post(AttrTransform::Nofollow)
        .post(AttrTransform::TargetNoopener)]
}

fn lists(doctype: Doctype) -> Vec<ElementSpec> {
    let int = AttrDef::Integer {
        negative: true,
        zero: true,
        positive: true,
    };
    vec![
        ElementSpec::new("ol", LIST, Content::Lists)
            .wrap("li")
            .legacy(doctype, "start", int.clone())
            .legacy(
                doctype,
                "type",
                AttrDef::Enum {
                    values: &["1", "a", "A", "i", "I"],
                    case_sensitive: true,
                },
            ),
        ElementSpec::new("ul", LIST, Content::Lists).wrap("li").legacy(
            doctype,
            "type",
            AttrDef::enumeration(&["disc", "square", "circle"]),
        ),
        ElementSpec::new("li", None, Content::Flow).legacy(doctype, "value", int),
        ElementSpec::new("dl", LIST, Content::Required("dt | dd")),
        ElementSpec::new("dt", None, Content::Inline),
        ElementSpec::new("dd", None, Content::Flow),
    ]
}

fn edit() -> Vec<ElementSpec> {
    ["ins", "del"]
        .into_iter()
        .map(|name| {
            ElementSpec::new(
                name,
                INLINE,
                Content::Chameleon("#PCDATA | Inline", "#PCDATA | Flow"),
            )
            .attr("cite", AttrDef::Uri { embedded: false })
            .attr("datetime", AttrDef::Text)
        })
        .collect()
}

fn bdo() -> Vec<ElementSpec> {
    vec![ElementSpec::new("bdo", INLINE, Content::Inline)
        .formatting()
        .attr("dir", AttrDef::enumeration(&["ltr", "rtl"]))
        .post(AttrTransform::BdoDir)]
}

fn tables(doctype: Doctype) -> Vec<ElementSpec> {
    let cell_align = || AttrDef::enumeration(&["left", "center", "right", "justify", "char"]);
    let valign = || AttrDef::enumeration(&["top", "middle", "bottom", "baseline"]);
    let span = || AttrDef::Integer {
        negative: false,
        zero: false,
        positive: true,
    };

    let cell = |name| {
        ElementSpec::new(name, None, Content::Flow)
            .attr("abbr", AttrDef::Text)
            .attr("colspan", span())
            .attr("rowspan", span())
            .attr("align", cell_align())
            .attr("valign", valign())
            .legacy(doctype, "bgcolor", AttrDef::Color)
            .legacy(doctype, "width", AttrDef::Length)
            .legacy(doctype, "height", AttrDef::Length)
    };
    let group = |name| {
        ElementSpec::new(name, None, Content::Required("tr"))
            .attr("align", cell_align())
            .attr("valign", valign())
    };

    vec![
        ElementSpec::new("table", BLOCK, Content::Table)
            .attr("border", AttrDef::Pixels { max: None })
            .attr("cellpadding", AttrDef::Length)
            .attr("cellspacing", AttrDef::Length)
            .attr("summary", AttrDef::Text)
            .attr("width", AttrDef::Length)
            .legacy(doctype, "bgcolor", AttrDef::Color)
            .legacy(
                doctype,
                "align",
                AttrDef::enumeration(&["left", "center", "right"]),
            ),
        ElementSpec::new("caption", None, Content::Inline),
        ElementSpec::new("colgroup", None, Content::Optional("col"))
            .attr("span", span())
            .attr("width", AttrDef::Length),
        ElementSpec::new("col", None, Content::Empty)
            .attr("span", span())
            .attr("width", AttrDef::Length),
        group("thead"),
        group("tfoot"),
        group("tbody"),
        ElementSpec::new("tr", None, Content::Required("td | th"))
            .attr("align", cell_align())
            .attr("valign", valign())
            .legacy(doctype, "bgcolor", AttrDef::Color),
        cell("td"),
        cell("th"),
    ]
}

fn image(doctype: Doctype) -> Vec<ElementSpec> {
    vec![ElementSpec::new("img", INLINE, Content::Empty)
        .required("alt", AttrDef::Text)
        .required("src", AttrDef::Uri { embedded: true })
        .attr("height", AttrDef::Pixels { max: Some(1200) })
        .attr("width", AttrDef::Pixels { max: Some(1200) })
        .attr("longdesc", AttrDef::Uri { embedded: false })
        .legacy(doctype, "border", AttrDef::Pixels { max: None })
        .legacy(doctype, "hspace", AttrDef::Pixels { max: None })
        .legacy(doctype, "vspace", AttrDef::Pixels { max: None })
        .legacy(
            doctype,
            "align",
            AttrDef::enumeration(&["top", "middle", "bottom", "left", "right"]),
        )
        .post(AttrTransform::ImgRequired)]
}

fn ruby() -> Vec<ElementSpec> {
    vec![
        ElementSpec::new(
            "ruby",
            INLINE,
            Content::Custom("((rb, (rt | (rp, rt, rp))) | (rbc, rtc, rtc?))"),
        ),
        ElementSpec::new("rbc", None, Content::Required("rb")),
        ElementSpec::new("rtc", None, Content::Required("rt")),
        ElementSpec::new("rb", None, Content::Inline).excludes("ruby"),
        ElementSpec::new("rt", None, Content::Inline).excludes("ruby"),
        ElementSpec::new("rp", None, Content::Optional("#PCDATA")),
    ]
}

/// All elements known to the doctype
pub(crate) fn elements(doctype: Doctype) -> Vec<ElementSpec> {
    let mut elements = text(doctype);
    elements.extend(presentation(doctype));
    elements.extend(hypertext());
    elements.extend(lists(doctype));
    elements.extend(edit());
    elements.extend(bdo());
    elements.extend(tables(doctype));
    elements.extend(image(doctype));
    if doctype == Doctype::Xhtml11 {
        elements.extend(ruby());
    }
    elements
}

#[cfg(test)]
mod tests {
    use super::*;

    fn find(doctype: Doctype, name: &str) -> Option<ElementSpec> {
        elements(doctype).into_iter().find(|spec| spec.name == name)
    }

    #[test]
    fn names_are_unique() {
        let all = elements(Doctype::Xhtml11);
        let mut names: Vec<&str> = all.iter().map(|spec| spec.name).collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), all.len());
    }

    #[test]
    fn legacy_attributes_depend_on_doctype() {
        let img = find(Doctype::Xhtml10Transitional, "img").unwrap();
        assert!(img.attrs.iter().any(|(name, _)| *name == "border"));

        let img = find(Doctype::Xhtml10Strict, "img").unwrap();
        assert!(!img.attrs.iter().any(|(name, _)| *name == "border"));

        let hr = find(Doctype::Html401Transitional, "hr").unwrap();
        assert!(hr.attrs.iter().any(|(name, _)| *name == "size"));
    }

    #[test]
    fn strict_blockquote() {
        let bq = find(Doctype::Html401Strict, "blockquote").unwrap();
        assert!(matches!(bq.content, Content::StrictBlockquote(_)));

        let bq = find(Doctype::Html401Transitional, "blockquote").unwrap();
        assert!(matches!(bq.content, Content::Optional(_)));
    }

    #[test]
    fn ruby_only_in_xhtml11() {
        assert!(find(Doctype::Xhtml11, "ruby").is_some());
        assert!(find(Doctype::Xhtml10Strict, "ruby").is_none());
    }

    #[test]
    fn common_attributes() {
        let names = |doctype| {
            common_attrs(doctype)
                .into_iter()
                .map(|(name, _)| name)
                .collect::<Vec<_>>()
        };
        assert!(names(Doctype::Html401Strict).contains(&"lang"));
        assert!(!names(Doctype::Html401Strict).contains(&"xml:lang"));
        assert!(!names(Doctype::Xhtml11).contains(&"lang"));
        assert!(names(Doctype::Xhtml11).contains(&"xml:lang"));
    }
}
