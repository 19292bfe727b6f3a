//! Attribute validation
//!
//! [`AttrValidator`] checks every attribute of a tag against the definition of its element.
//! Attributes that are not defined, or whose value does not validate, are removed.
use crate::context::{Context, CurrentToken};
use crate::definition::HtmlDefinition;
use crate::diagnostics::Diagnostic;
use crate::settings::Settings;
use crate::token::{Attributes, Token};

pub mod css;
mod transform;
mod types;
mod uri;

pub use transform::AttrTransform;
pub use types::AttrDef;

pub struct AttrValidator;

fn run_transforms(
    transforms: &[AttrTransform],
    attrs: &mut Attributes,
    settings: &Settings,
    ctx: &mut Context<'_>,
) {
    for transform in transforms {
        if !ctx.has_sink() {
            transform.transform(attrs, settings);
            continue;
        }

        let before = attrs.clone();
        transform.transform(attrs, settings);
        if *attrs != before {
            ctx.report(Diagnostic::AttributesTransformed, &format!("{transform:?}"));
        }
    }
}

impl AttrValidator {
    /// Validates all attributes of a start or empty tag in place. Other tokens, and tags of
    /// undefined elements, are left alone.
    pub fn validate_token(
        token: &mut Token,
        definition: &HtmlDefinition,
        settings: &Settings,
        ctx: &mut Context<'_>,
    ) {
        let Some(name) = token.tag_name().map(str::to_string) else {
            return;
        };
        let Some(element) = definition.get(&name) else {
            return;
        };
        let location = token.location;
        let Some(attrs) = token.attrs_mut() else {
            return;
        };

        ctx.current_token = Some(CurrentToken { name, location });

        let mut current = std::mem::take(attrs);
        run_transforms(&definition.attr_pre, &mut current, settings, ctx);
        run_transforms(&element.attr_pre, &mut current, settings, ctx);

        let mut validated = Attributes::with_capacity(current.len());
        for (key, value) in current {
            ctx.current_attr = Some(key.clone());
            let result = element
                .attrs
                .get(&key)
                .and_then(|def| def.validate(&value, settings, ctx));

            match result {
                Some(clean) => {
                    if clean != value {
                        ctx.report(Diagnostic::AttributeValueChanged, &key);
                    }
                    validated.insert(key, clean);
                }
                None => ctx.report(Diagnostic::AttributeRemoved, &key),
            }
        }
        ctx.current_attr = None;

        run_transforms(&definition.attr_post, &mut validated, settings, ctx);
        run_transforms(&element.attr_post, &mut validated, settings, ctx);

        *attrs = validated;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::{ErrorCollector, Severity};

    fn token(name: &str, pairs: &[(&str, &str)]) -> Token {
        let attrs = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Token::start(name, attrs)
    }

    fn validate(token: &mut Token, settings: &Settings) -> ErrorCollector {
        let definition = HtmlDefinition::build(settings).unwrap();
        let mut collector = ErrorCollector::new();
        {
            let mut ctx = Context::new(Some(&mut collector));
            AttrValidator::validate_token(token, &definition, settings, &mut ctx);
        }
        collector
    }

    #[test]
    fn removes_invalid_and_unknown_attributes() {
        let settings = Settings::defaults().unwrap();
        let mut token = token(
            "a",
            &[
                ("href", "javascript:alert(1)"),
                ("onclick", "x()"),
                ("title", " hello "),
            ],
        );

        let collector = validate(&mut token, &settings);
        assert_eq!(token.to_string(), r#"<a title="hello">"#);
        assert_eq!(
            collector
                .reports()
                .iter()
                .filter(|r| r.diagnostic == Diagnostic::AttributeRemoved)
                .count(),
            2
        );
    }

    #[test]
    fn changed_values_are_reported() {
        let settings = Settings::defaults().unwrap();
        let mut token = token("span", &[("style", "color:red;behavior:url(x)")]);

        let collector = validate(&mut token, &settings);
        assert_eq!(token.to_string(), r#"<span style="color:#FF0000;">"#);
        let report = collector
            .reports()
            .iter()
            .find(|r| r.diagnostic == Diagnostic::AttributeValueChanged)
            .unwrap();
        assert_eq!(report.detail, "style");
        assert_eq!(report.severity, Severity::Warning);
    }

    #[test]
    fn unchanged_values_are_not_reported() {
        let settings = Settings::defaults().unwrap();
        let mut token = token("a", &[("href", "http://example.com/"), ("title", "t")]);

        let collector = validate(&mut token, &settings);
        assert!(collector.reports().is_empty());
    }

    #[test]
    fn pre_transforms_are_reported() {
        let settings = Settings::defaults().unwrap();
        let mut token = token("p", &[("align", "right")]);

        let collector = validate(&mut token, &settings);
        assert_eq!(token.to_string(), r#"<p style="text-align:right;">"#);
        assert!(collector.has(Diagnostic::AttributesTransformed));
    }

    #[test]
    fn undefined_elements_are_left_alone() {
        let settings = Settings::defaults().unwrap();
        let mut token = token("blink", &[("onclick", "x()")]);

        let collector = validate(&mut token, &settings);
        assert_eq!(token.to_string(), r#"<blink onclick="x()">"#);
        assert!(collector.reports().is_empty());
    }

    #[test]
    fn post_transforms_add_attributes() {
        let mut settings = Settings::defaults().unwrap();
        settings.nofollow = true;
        let mut token = token("a", &[("href", "http://example.com/")]);

        validate(&mut token, &settings);
        assert_eq!(
            token.to_string(),
            r#"<a href="http://example.com/" rel="nofollow">"#
        );
    }
}
