//! Tag transforms turn deprecated elements into their modern counterparts before anything else
//! looks at them.
use crate::token::{Token, TokenKind};
use phf::phf_map;

static FONT_SIZES: phf::Map<&'static str, &'static str> = phf_map! {
    "0" => "xx-small",
    "1" => "xx-small",
    "2" => "small",
    "3" => "medium",
    "4" => "large",
    "5" => "x-large",
    "6" => "xx-large",
    "7" => "300%",
    "-1" => "smaller",
    "-2" => "60%",
    "+1" => "larger",
    "+2" => "150%",
    "+3" => "200%",
    "+4" => "300%",
};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TagTransform {
    /// Renames the tag and prepends the given css to its style
    Simple {
        target: &'static str,
        css: Option<&'static str>,
    },
    /// `font` becomes a `span`, its presentational attributes become css
    Font,
}

/// Every known transform, keyed by the deprecated element
pub(crate) fn builtin() -> Vec<(&'static str, TagTransform)> {
    let simple = |target, css| TagTransform::Simple { target, css };
    vec![
        ("font", TagTransform::Font),
        ("center", simple("div", Some("text-align:center;"))),
        ("dir", simple("ul", None)),
        ("menu", simple("ul", None)),
        ("u", simple("span", Some("text-decoration:underline;"))),
        ("s", simple("span", Some("text-decoration:line-through;"))),
        ("strike", simple("span", Some("text-decoration:line-through;"))),
    ]
}

fn prepend_css(token: &mut Token, css: &str) {
    if css.is_empty() {
        return;
    }
    if let Some(attrs) = token.attrs_mut() {
        let style = attrs.entry("style".to_string()).or_default();
        style.insert_str(0, css);
    }
}

/// Normalizes out-of-range font sizes the way browsers clamp them
fn normalize_size(size: &str) -> String {
    let Some(first) = size.chars().next() else {
        return String::new();
    };

    if first == '+' || first == '-' {
        return match size.parse::<i32>() {
            Ok(n) if n < -2 => "-2".to_string(),
            Ok(n) if n > 4 => "+4".to_string(),
            _ => size.to_string(),
        };
    }

    match size.parse::<i32>() {
        Ok(n) if n > 7 => "7".to_string(),
        _ => size.to_string(),
    }
}

impl TagTransform {
    /// Name of the element the transform produces
    pub fn target(&self) -> &'static str {
        match self {
            TagTransform::Simple { target, .. } => target,
            TagTransform::Font => "span",
        }
    }

    /// Transforms a tag. The location and armor of the token are retained.
    pub fn transform(&self, mut token: Token) -> Token {
        let target = self.target().to_string();
        match &mut token.kind {
            TokenKind::Start { name, .. }
            | TokenKind::Empty { name, .. }
            | TokenKind::End { name, .. } => *name = target,
            _ => return token,
        }

        match self {
            TagTransform::Simple { css, .. } => {
                if let Some(css) = css {
                    prepend_css(&mut token, css);
                }
            }
            TagTransform::Font => {
                let Some(attrs) = token.attrs_mut() else {
                    return token;
                };

                let mut css = String::new();
                if let Some(color) = attrs.shift_remove("color") {
                    css.push_str(&format!("color:{color};"));
                }
                if let Some(face) = attrs.shift_remove("face") {
                    css.push_str(&format!("font-family:{face};"));
                }
                if let Some(size) = attrs.shift_remove("size") {
                    if let Some(size) = FONT_SIZES.get(normalize_size(size.trim()).as_str()) {
                        css.push_str(&format!("font-size:{size};"));
                    }
                }
                prepend_css(&mut token, &css);
            }
        }

        token
    }
}
