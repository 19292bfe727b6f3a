//! Validation of inline css, as found in `style` attributes
//!
//! Only a small, safe subset of css is understood. Declarations with properties outside of that
//! subset are dropped, and anything that could load resources or run script rejects the value.
use crate::attr::types::validate_color;
use crate::settings::Settings;
use cow_utils::CowUtils;
use indexmap::IndexMap;
use lazy_static::lazy_static;
use log::trace;
use regex::Regex;

lazy_static! {
    static ref LENGTH: Regex =
        crate::pattern(r"^([+-]?(?:\d+\.?\d*|\.\d+))(px|em|ex|pt|pc|in|cm|mm|%)?$");
    static ref FONT_NAME: Regex =
        crate::pattern(r"^[A-Za-z0-9 _\-]+$");
}

/// Every property that is understood
pub const PROPERTIES: [&str; 14] = [
    "color",
    "background-color",
    "text-align",
    "text-decoration",
    "font-weight",
    "font-style",
    "float",
    "width",
    "height",
    "margin-left",
    "margin-right",
    "vertical-align",
    "font-size",
    "font-family",
];

fn keyword(value: &str, allowed: &[&str]) -> Option<String> {
    allowed.contains(&value).then(|| value.to_string())
}

/// A css length. Unitless numbers are only fine when they are zero.
fn length(value: &str, allow_negative: bool) -> Option<String> {
    let captures = LENGTH.captures(value)?;
    let number: f64 = captures.get(1)?.as_str().parse().ok()?;
    if number < 0.0 && !allow_negative {
        return None;
    }
    if captures.get(2).is_none() && number != 0.0 {
        return None;
    }
    Some(value.to_string())
}

fn font_family(value: &str) -> Option<String> {
    let mut fonts = vec![];
    for font in value.split(',') {
        let font = font.trim();
        let unquoted = font
            .strip_prefix('"')
            .and_then(|f| f.strip_suffix('"'))
            .or_else(|| font.strip_prefix('\'').and_then(|f| f.strip_suffix('\'')))
            .unwrap_or(font);
        if !FONT_NAME.is_match(unquoted) {
            return None;
        }
        fonts.push(font.to_string());
    }
    Some(fonts.join(", "))
}

fn validate_property(property: &str, value: &str) -> Option<String> {
    let lower = value.cow_to_ascii_lowercase();
    let lower = lower.as_ref();

    match property {
        "color" => validate_color(value),
        "background-color" => keyword(lower, &["transparent"]).or_else(|| validate_color(value)),
        "text-align" => keyword(lower, &["left", "right", "center", "justify"]),
        "text-decoration" => {
            let parts: Vec<&str> = lower.split_whitespace().collect();
            if parts.is_empty() {
                return None;
            }
            if parts == ["none"] {
                return Some("none".to_string());
            }
            parts
                .iter()
                .all(|part| matches!(*part, "underline" | "overline" | "line-through"))
                .then(|| parts.join(" "))
        }
        "font-weight" => keyword(
            lower,
            &[
                "normal", "bold", "bolder", "lighter", "100", "200", "300", "400", "500", "600",
                "700", "800", "900",
            ],
        ),
        "font-style" => keyword(lower, &["normal", "italic", "oblique"]),
        "float" => keyword(lower, &["left", "right", "none"]),
        "width" | "height" => keyword(lower, &["auto"]).or_else(|| length(lower, false)),
        "margin-left" | "margin-right" => keyword(lower, &["auto"]).or_else(|| length(lower, true)),
        "vertical-align" => keyword(
            lower,
            &[
                "baseline",
                "sub",
                "super",
                "top",
                "text-top",
                "middle",
                "bottom",
                "text-bottom",
            ],
        )
        .or_else(|| length(lower, true)),
        "font-size" => keyword(
            lower,
            &[
                "xx-small", "x-small", "small", "medium", "large", "x-large", "xx-large",
                "larger", "smaller",
            ],
        )
        .or_else(|| length(lower, false)),
        "font-family" => font_family(value),
        _ => None,
    }
}

/// Validates a complete style attribute. Returns None when nothing valid is left.
pub(crate) fn validate(value: &str, settings: &Settings) -> Option<String> {
    if value.contains('\\') || value.contains("/*") {
        return None;
    }

    let mut declarations: IndexMap<String, String> = IndexMap::new();
    for declaration in value.split(';') {
        let Some((property, value)) = declaration.split_once(':') else {
            continue;
        };
        let property = property.trim().to_ascii_lowercase();
        let value = value.trim();

        if !PROPERTIES.contains(&property.as_str()) {
            trace!("css: unknown property {property}");
            continue;
        }
        if !settings.css_allowed_properties.is_empty()
            && !settings.css_allowed_properties.contains(&property)
        {
            continue;
        }

        let lower = value.cow_to_ascii_lowercase();
        if lower.contains("expression(") || lower.contains("url(") {
            continue;
        }

        if let Some(value) = validate_property(&property, value) {
            declarations.insert(property, value);
        }
    }

    if declarations.is_empty() {
        return None;
    }

    Some(
        declarations
            .iter()
            .map(|(property, value)| format!("{property}:{value};"))
            .collect(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case("color: red", Some("color:#FF0000;"))]
    #[test_case("COLOR:#abc; text-align: Center;", Some("color:#aabbcc;text-align:center;"))]
    #[test_case("position: absolute; float:left", Some("float:left;"))]
    #[test_case("width: expression(alert(1))", None)]
    #[test_case("background-color: url(x.png)", None)]
    #[test_case("color: red; width: 10px; color: blue", Some("color:#0000FF;width:10px;"))]
    #[test_case("color:\\72 ed", None)]
    #[test_case("color: red /* c */", None)]
    #[test_case("width: -10px", None)]
    #[test_case("margin-left: -1.5em", Some("margin-left:-1.5em;"))]
    #[test_case("width: 10", None)]
    #[test_case("height: 0", Some("height:0;"))]
    #[test_case("text-decoration: underline line-through", Some("text-decoration:underline line-through;"))]
    #[test_case("font-family: Arial, 'Times New Roman'", Some("font-family:Arial, 'Times New Roman';"))]
    #[test_case("font-family: a<b", None)]
    #[test_case("font-size: 150%", Some("font-size:150%;"))]
    #[test_case("", None)]
    fn style(value: &str, expected: Option<&str>) {
        let settings = Settings::defaults().unwrap();
        assert_eq!(validate(value, &settings).as_deref(), expected);
    }

    #[test]
    fn allowed_properties() {
        let mut settings = Settings::defaults().unwrap();
        settings.css_allowed_properties = ["color".to_string()].into_iter().collect();

        assert_eq!(
            validate("color: red; float: left", &settings).as_deref(),
            Some("color:#FF0000;")
        );
        assert_eq!(validate("float: left", &settings), None);
    }
}
