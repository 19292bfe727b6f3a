//! Typed view on the configuration, read by every stage of the pipeline
use crate::definition::Doctype;
use crate::errors::Error;
use log::warn;
use purifier_config::ConfigStore;
use regex::Regex;
use std::collections::HashSet;

/// Snapshot of all purifier settings. Built once per policy; the pipeline never reads the
/// config store directly.
#[derive(Clone, Debug)]
pub struct Settings {
    pub escape_invalid_tags: bool,
    pub remove_invalid_img: bool,
    pub hidden_elements: HashSet<String>,
    pub disable_excludes: bool,
    pub maintain_line_numbers: bool,
    pub convert_document_to_fragment: bool,
    pub collect_errors: bool,

    pub doctype: Doctype,
    /// Compact whitelist (`p,b,a[href|title]`), empty when not used
    pub allowed: String,
    pub allowed_elements: Vec<String>,
    pub allowed_attributes: Vec<String>,
    pub forbidden_elements: Vec<String>,
    pub forbidden_attributes: Vec<String>,
    pub parent: String,
    pub block_wrapper: String,
    pub trusted: bool,
    pub allowed_comments: HashSet<String>,
    pub allowed_comments_regexp: Option<Regex>,
    pub nofollow: bool,
    pub target_noopener: bool,

    pub enable_id: bool,
    pub id_prefix: String,
    pub allowed_frame_targets: Vec<String>,

    pub allowed_schemes: HashSet<String>,
    pub disable_external_resources: bool,

    /// Allowed css properties, empty allows every supported property
    pub css_allowed_properties: HashSet<String>,

    pub auto_paragraph: bool,
    pub linkify: bool,
    pub display_link_uri: bool,
    pub remove_empty: bool,
    pub remove_empty_nbsp: bool,
    pub remove_spans_without_attributes: bool,
}

fn lowercase_set(values: Vec<String>) -> HashSet<String> {
    values.into_iter().map(|v| v.to_ascii_lowercase()).collect()
}

impl Settings {
    /// Reads all settings from the store
    pub fn from_store(store: &ConfigStore) -> Result<Self, Error> {
        let doctype_name = store.get_string("html.doctype");
        let doctype: Doctype = doctype_name.parse()?;

        let regexp = store.get_string("html.allowed_comments_regexp");
        let allowed_comments_regexp = if regexp.is_empty() {
            None
        } else {
            Some(Regex::new(&format!("^(?:{regexp})$"))?)
        };

        let parent = store.get_string("html.parent").to_ascii_lowercase();
        let block_wrapper = store.get_string("html.block_wrapper").to_ascii_lowercase();
        if parent.is_empty() {
            return Err(Error::UndefinedParent(parent));
        }

        let settings = Self {
            escape_invalid_tags: store.get_bool("core.escape_invalid_tags"),
            remove_invalid_img: store.get_bool("core.remove_invalid_img"),
            hidden_elements: lowercase_set(store.get_map("core.hidden_elements")),
            disable_excludes: store.get_bool("core.disable_excludes"),
            maintain_line_numbers: store.get_bool("core.maintain_line_numbers"),
            convert_document_to_fragment: store.get_bool("core.convert_document_to_fragment"),
            collect_errors: store.get_bool("core.collect_errors"),

            doctype,
            allowed: store.get_string("html.allowed"),
            allowed_elements: store.get_map("html.allowed_elements"),
            allowed_attributes: store.get_map("html.allowed_attributes"),
            forbidden_elements: store.get_map("html.forbidden_elements"),
            forbidden_attributes: store.get_map("html.forbidden_attributes"),
            parent,
            block_wrapper,
            trusted: store.get_bool("html.trusted"),
            allowed_comments: store
                .get_map("html.allowed_comments")
                .into_iter()
                .collect(),
            allowed_comments_regexp,
            nofollow: store.get_bool("html.nofollow"),
            target_noopener: store.get_bool("html.target_noopener"),

            enable_id: store.get_bool("attr.enable_id"),
            id_prefix: store.get_string("attr.id_prefix"),
            allowed_frame_targets: store.get_map("attr.allowed_frame_targets"),

            allowed_schemes: lowercase_set(store.get_map("uri.allowed_schemes")),
            disable_external_resources: store.get_bool("uri.disable_external_resources"),

            css_allowed_properties: lowercase_set(store.get_map("css.allowed_properties")),

            auto_paragraph: store.get_bool("autoformat.auto_paragraph"),
            linkify: store.get_bool("autoformat.linkify"),
            display_link_uri: store.get_bool("autoformat.display_link_uri"),
            remove_empty: store.get_bool("autoformat.remove_empty"),
            remove_empty_nbsp: store.get_bool("autoformat.remove_empty.remove_nbsp"),
            remove_spans_without_attributes: store
                .get_bool("autoformat.remove_spans_without_attributes"),
        };

        if settings.trusted && settings.allowed_comments_regexp.is_some() {
            warn!("html.allowed_comments_regexp has no effect when html.trusted is enabled");
        }

        Ok(settings)
    }

    /// Settings with every default applied
    pub fn defaults() -> Result<Self, Error> {
        let store = ConfigStore::new().map_err(|err| Error::Config(err.to_string()))?;
        Self::from_store(&store)
    }

    /// Returns true when comments are inspected at all
    pub fn checks_comments(&self) -> bool {
        !self.allowed_comments.is_empty() || self.allowed_comments_regexp.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let settings = Settings::defaults().unwrap();

        assert_eq!(settings.doctype, Doctype::Xhtml10Transitional);
        assert_eq!(settings.parent, "div");
        assert_eq!(settings.block_wrapper, "p");
        assert!(settings.hidden_elements.contains("script"));
        assert!(settings.allowed_schemes.contains("https"));
        assert!(!settings.allowed_schemes.contains("javascript"));
        assert!(!settings.checks_comments());
    }

    #[test]
    fn comment_regexp_is_anchored() {
        let store = ConfigStore::new().unwrap();
        store
            .set_from_str("html.allowed_comments_regexp", "keep.*")
            .unwrap();

        let settings = Settings::from_store(&store).unwrap();
        let re = settings.allowed_comments_regexp.unwrap();
        assert!(re.is_match("keep me"));
        assert!(!re.is_match("please keep me"));
    }

    #[test]
    fn invalid_regexp_is_a_config_error() {
        let store = ConfigStore::new().unwrap();
        store
            .set_from_str("html.allowed_comments_regexp", "(unclosed")
            .unwrap();

        assert!(matches!(Settings::from_store(&store), Err(Error::Regex(_))));
    }

    #[test]
    fn unknown_doctype() {
        let store = ConfigStore::new().unwrap();
        store.set_from_str("html.doctype", "HTML 5").unwrap();

        assert!(matches!(
            Settings::from_store(&store),
            Err(Error::UnknownDoctype(_))
        ));
    }
}
