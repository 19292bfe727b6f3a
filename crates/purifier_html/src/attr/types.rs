//! Attribute types and their validation
use crate::attr::{css, uri};
use crate::context::Context;
use crate::settings::Settings;
use lazy_static::lazy_static;
use phf::phf_map;
use regex::Regex;

lazy_static! {
    static ref ID: Regex = crate::pattern(r"^[A-Za-z][A-Za-z0-9_:.\-]*$");
    static ref CLASS: Regex = crate::pattern(r"^-?[A-Za-z_][A-Za-z0-9_\-]*$");
}

/// The sixteen html color keywords
pub(crate) static COLOR_KEYWORDS: phf::Map<&'static str, &'static str> = phf_map! {
    "black" => "#000000",
    "silver" => "#C0C0C0",
    "gray" => "#808080",
    "white" => "#FFFFFF",
    "maroon" => "#800000",
    "red" => "#FF0000",
    "purple" => "#800080",
    "fuchsia" => "#FF00FF",
    "green" => "#008000",
    "lime" => "#00FF00",
    "olive" => "#808000",
    "yellow" => "#FFFF00",
    "navy" => "#000080",
    "blue" => "#0000FF",
    "teal" => "#008080",
    "aqua" => "#00FFFF",
};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AttrDef {
    /// Free text
    Text,
    /// One out of a fixed list of values
    Enum {
        values: &'static [&'static str],
        case_sensitive: bool,
    },
    Integer {
        negative: bool,
        zero: bool,
        positive: bool,
    },
    /// A number of pixels, with an optional upper bound
    Pixels { max: Option<u32> },
    /// Pixels or a percentage
    Length,
    /// A uri, `embedded` when the resource is loaded without user interaction
    Uri { embedded: bool },
    Color,
    Id,
    Class,
    Lang,
    FrameTarget,
    /// Inline css
    Css,
}

/// Trims and collapses newlines and tabs into spaces
pub(crate) fn parse_cdata(value: &str) -> String {
    value
        .trim()
        .chars()
        .map(|ch| match ch {
            '\n' | '\t' | '\r' => ' ',
            other => other,
        })
        .collect()
}

impl AttrDef {
    /// Case-insensitive enumeration
    pub fn enumeration(values: &'static [&'static str]) -> Self {
        AttrDef::Enum {
            values,
            case_sensitive: false,
        }
    }

    /// Validates a value. Returns the (possibly cleaned up) value, or None when the attribute
    /// must go.
    pub fn validate(&self, value: &str, settings: &Settings, ctx: &mut Context<'_>) -> Option<String> {
        match self {
            AttrDef::Text => Some(parse_cdata(value)),
            AttrDef::Enum {
                values,
                case_sensitive,
            } => {
                let value = value.trim();
                let value = if *case_sensitive {
                    value.to_string()
                } else {
                    value.to_ascii_lowercase()
                };
                values.contains(&value.as_str()).then_some(value)
            }
            AttrDef::Integer {
                negative,
                zero,
                positive,
            } => validate_integer(value, *negative, *zero, *positive),
            AttrDef::Pixels { max } => validate_pixels(value, *max),
            AttrDef::Length => validate_length(value),
            AttrDef::Uri { embedded } => {
                ctx.embedded_uri = *embedded;
                let result = uri::validate(value, *embedded, settings);
                ctx.embedded_uri = false;
                result
            }
            AttrDef::Color => validate_color(value),
            AttrDef::Id => validate_id(value, settings, ctx),
            AttrDef::Class => validate_class(value),
            AttrDef::Lang => validate_lang(value),
            AttrDef::FrameTarget => {
                let value = value.trim();
                settings
                    .allowed_frame_targets
                    .iter()
                    .any(|target| target == value)
                    .then(|| value.to_string())
            }
            AttrDef::Css => css::validate(value, settings),
        }
    }
}

fn validate_integer(value: &str, negative: bool, zero: bool, positive: bool) -> Option<String> {
    let value = value.trim();
    let (sign, digits) = match value.chars().next()? {
        '-' => (-1, &value[1..]),
        '+' => (1, &value[1..]),
        _ => (1, value),
    };
    if digits.is_empty() || !digits.chars().all(|ch| ch.is_ascii_digit()) {
        return None;
    }

    let digits = digits.trim_start_matches('0');
    if digits.is_empty() {
        return zero.then(|| "0".to_string());
    }
    if sign < 0 {
        return negative.then(|| format!("-{digits}"));
    }
    positive.then(|| digits.to_string())
}

fn validate_pixels(value: &str, max: Option<u32>) -> Option<String> {
    let value = value.trim();
    let value = value.strip_suffix("px").unwrap_or(value);
    if value.is_empty() {
        return None;
    }
    if let Some(rest) = value.strip_prefix('-') {
        // negative pixel counts clamp to zero
        return rest.chars().all(|ch| ch.is_ascii_digit()).then(|| "0".to_string());
    }
    if !value.chars().all(|ch| ch.is_ascii_digit()) {
        return None;
    }

    let pixels: u64 = value.parse().ok()?;
    match max {
        Some(max) if pixels > u64::from(max) => Some(max.to_string()),
        _ => Some(pixels.to_string()),
    }
}

fn validate_length(value: &str) -> Option<String> {
    let value = value.trim();
    let Some(percentage) = value.strip_suffix('%') else {
        return validate_pixels(value, None);
    };

    let number: f64 = percentage.trim().parse().ok()?;
    if !number.is_finite() {
        return None;
    }
    if number < 0.0 {
        return Some("0%".to_string());
    }
    if number > 100.0 {
        return Some("100%".to_string());
    }
    Some(format!("{}%", percentage.trim()))
}

/// Accepts color keywords, `#rgb`, `#rrggbb` and bare hex digits
pub(crate) fn validate_color(value: &str) -> Option<String> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }
    if let Some(hex) = COLOR_KEYWORDS.get(value.to_ascii_lowercase().as_str()) {
        return Some(hex.to_string());
    }

    let hex = value.strip_prefix('#').unwrap_or(value);
    if !hex.chars().all(|ch| ch.is_ascii_hexdigit()) {
        return None;
    }
    match hex.len() {
        3 => Some(format!(
            "#{}",
            hex.chars().flat_map(|ch| [ch, ch]).collect::<String>()
        )),
        6 => Some(format!("#{hex}")),
        _ => None,
    }
}

fn validate_id(value: &str, settings: &Settings, ctx: &mut Context<'_>) -> Option<String> {
    if !settings.enable_id {
        return None;
    }

    let value = value.trim();
    if value.is_empty() {
        return None;
    }

    let id = if !settings.id_prefix.is_empty() && !value.starts_with(&settings.id_prefix) {
        format!("{}{value}", settings.id_prefix)
    } else {
        value.to_string()
    };

    if !ID.is_match(&id) {
        return None;
    }
    // every id is handed out only once per document
    if !ctx.ids.add(&id) {
        return None;
    }
    Some(id)
}

fn validate_class(value: &str) -> Option<String> {
    let mut classes: Vec<&str> = vec![];
    for class in value.split_whitespace() {
        if CLASS.is_match(class) && !classes.contains(&class) {
            classes.push(class);
        }
    }

    if classes.is_empty() {
        return None;
    }
    Some(classes.join(" "))
}

/// Language codes: a primary tag with optional subtags. Everything from the first invalid
/// subtag on is dropped.
fn validate_lang(value: &str) -> Option<String> {
    let value = value.trim().to_ascii_lowercase();
    let mut subtags = value.split('-');

    let primary = subtags.next()?;
    let valid_primary = matches!(primary.len(), 2..=3) && primary.chars().all(|ch| ch.is_ascii_alphabetic())
        || primary == "i"
        || primary == "x";
    if !valid_primary {
        return None;
    }

    let mut result = primary.to_string();
    for subtag in subtags {
        if subtag.is_empty() || subtag.len() > 8 || !subtag.chars().all(|ch| ch.is_ascii_alphanumeric()) {
            break;
        }
        result.push('-');
        result.push_str(subtag);
    }
    Some(result)
}
