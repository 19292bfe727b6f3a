//! Attribute transforms run before (pre) or after (post) attribute validation
use crate::settings::Settings;
use crate::token::Attributes;
use url::Url;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AttrTransform {
    /// Fills in `alt` (and `src` when invalid images are kept)
    ImgRequired,
    /// `bdo` always needs a direction
    BdoDir,
    /// Presentational `align` becomes css
    TextAlign,
    /// Links to other hosts get `rel="nofollow"`
    Nofollow,
    /// Links with a target get `rel="noopener noreferrer"`
    TargetNoopener,
    /// Keeps `lang` and `xml:lang` in sync
    Lang,
}

fn add_rel(attrs: &mut Attributes, values: &[&str]) {
    let rel = attrs.entry("rel".to_string()).or_default();
    let mut parts: Vec<String> = rel.split_whitespace().map(String::from).collect();
    for value in values {
        if !parts.iter().any(|part| part == value) {
            parts.push(value.to_string());
        }
    }
    *rel = parts.join(" ");
}

fn is_external(href: &str) -> bool {
    let href = href.trim();
    if href.starts_with("//") {
        return true;
    }
    Url::parse(href).is_ok_and(|url| url.host_str().is_some())
}

impl AttrTransform {
    pub fn transform(&self, attrs: &mut Attributes, settings: &Settings) {
        match self {
            AttrTransform::ImgRequired => {
                let mut has_src = true;
                if !attrs.contains_key("src") {
                    if settings.remove_invalid_img {
                        return;
                    }
                    attrs.insert("src".to_string(), String::new());
                    has_src = false;
                }

                if attrs.contains_key("alt") {
                    return;
                }
                let alt = if has_src {
                    let src = attrs.get("src").map(String::as_str).unwrap_or_default();
                    let basename = src.rsplit('/').next().unwrap_or(src);
                    basename.chars().take(40).collect()
                } else {
                    "Invalid image".to_string()
                };
                attrs.insert("alt".to_string(), alt);
            }
            AttrTransform::BdoDir => {
                attrs
                    .entry("dir".to_string())
                    .or_insert_with(|| "ltr".to_string());
            }
            AttrTransform::TextAlign => {
                let Some(align) = attrs.shift_remove("align") else {
                    return;
                };
                let align = align.trim().to_ascii_lowercase();
                if !matches!(align.as_str(), "left" | "right" | "center" | "justify") {
                    return;
                }
                let style = attrs.entry("style".to_string()).or_default();
                style.insert_str(0, &format!("text-align:{align};"));
            }
            AttrTransform::Nofollow => {
                if !settings.nofollow {
                    return;
                }
                if attrs.get("href").is_some_and(|href| is_external(href)) {
                    add_rel(attrs, &["nofollow"]);
                }
            }
            AttrTransform::TargetNoopener => {
                if settings.target_noopener && attrs.contains_key("target") {
                    add_rel(attrs, &["noopener", "noreferrer"]);
                }
            }
            AttrTransform::Lang => {
                let lang = attrs.get("lang").cloned();
                let xml_lang = attrs.get("xml:lang").cloned();
                match (lang, xml_lang) {
                    (Some(lang), None) => {
                        attrs.insert("xml:lang".to_string(), lang);
                    }
                    (_, Some(xml_lang)) => {
                        attrs.insert("lang".to_string(), xml_lang);
                    }
                    (None, None) => {}
                }
            }
        }
    }
}
