use super::Strategy;
use crate::attr::AttrValidator;
use crate::context::{Context, CurrentToken};
use crate::diagnostics::Diagnostic;
use crate::generator::Generator;
use crate::purifier::Policy;
use crate::token::{ArmorKind, Token, TokenKind};
use log::trace;

/// Removes every tag that is not allowed, and every comment that is not explicitly allowed
///
/// Tags with a transform are renamed first. Elements with required attributes are validated
/// right away; when a required attribute is missing the tag is dropped. Unknown tags are dropped,
/// or turned into text when invalid tags are escaped. The content of hidden elements (like
/// `script`) is dropped together with the tags.
pub struct RemoveForeignElements;

/// Collapses runs of hyphens in comment data, since `--` cannot appear inside a comment
fn clean_comment(data: &str) -> (String, bool, bool) {
    let trailing_hyphen = data.ends_with('-');
    let mut data = data.trim_end_matches('-').to_string();
    let mut double_hyphen = false;
    while data.contains("--") {
        double_hyphen = true;
        data = data.replace("--", "-");
    }
    (data, trailing_hyphen, double_hyphen)
}

impl Strategy for RemoveForeignElements {
    fn name(&self) -> &'static str {
        "RemoveForeignElements"
    }

    fn execute(&self, tokens: Vec<Token>, policy: &Policy, ctx: &mut Context<'_>) -> Vec<Token> {
        let definition = policy.definition();
        let settings = policy.settings();
        let generator = Generator::new(definition.doctype);

        let mut result = Vec::with_capacity(tokens.len());
        // drops everything up to a tag with this name
        let mut remove_until: Option<String> = None;
        // turns comments into text while inside this element
        let mut textify_comments: Option<String> = None;

        for mut token in tokens {
            if let Some(until) = &remove_until {
                if token.tag_name() != Some(until.as_str()) {
                    continue;
                }
            }

            if let Some(name) = token.tag_name().map(str::to_string) {
                ctx.current_token = Some(CurrentToken {
                    name: name.clone(),
                    location: token.location,
                });

                if let Some(transform) = definition.tag_transforms.get(&name) {
                    token = transform.transform(token);
                    ctx.report(Diagnostic::TagTransformed, &name);
                }
                let name = token.tag_name().unwrap_or_default().to_string();

                if let Some(def) = definition.get(&name) {
                    let opens = token.is_start() || token.is_empty_tag();
                    if opens
                        && !def.required_attrs.is_empty()
                        && (name != "img" || settings.remove_invalid_img)
                    {
                        AttrValidator::validate_token(&mut token, definition, settings, ctx);
                        let attrs = token.attrs();
                        if let Some(missing) = def
                            .required_attrs
                            .iter()
                            .find(|attr| !attrs.is_some_and(|attrs| attrs.contains_key(*attr)))
                        {
                            ctx.report(Diagnostic::MissingRequiredAttribute, missing);
                            continue;
                        }
                        token.armor.insert(ArmorKind::ValidateAttributes);
                    }

                    if settings.hidden_elements.contains(&name) && token.is_start() {
                        textify_comments = Some(name);
                    } else if token.is_end() && textify_comments.as_deref() == Some(name.as_str()) {
                        textify_comments = None;
                    }
                } else if settings.escape_invalid_tags {
                    ctx.report(Diagnostic::ForeignElementToText, &name);
                    token = Token::text(&generator.generate_token(&token)).at(token.location);
                } else {
                    if settings.hidden_elements.contains(&name) {
                        remove_until = match token.kind {
                            TokenKind::Start { .. } => Some(name.clone()),
                            // still looking for the end
                            TokenKind::Empty { .. } => remove_until,
                            _ => None,
                        };
                        ctx.report(Diagnostic::ForeignMetaElementRemoved, &name);
                    } else {
                        ctx.report(Diagnostic::ForeignElementRemoved, &name);
                    }
                    trace!("removed foreign tag {token}");
                    continue;
                }
            } else if let TokenKind::Comment { data } = &token.kind {
                ctx.current_token = Some(CurrentToken {
                    name: String::new(),
                    location: token.location,
                });

                if textify_comments.is_some() {
                    token = Token::text(data).at(token.location);
                } else if settings.trusted || settings.checks_comments() {
                    let (data, trailing_hyphen, double_hyphen) = clean_comment(data);
                    let trimmed = data.trim();
                    let allowed = settings.trusted
                        || settings.allowed_comments.contains(trimmed)
                        || settings
                            .allowed_comments_regexp
                            .as_ref()
                            .is_some_and(|re| re.is_match(trimmed));
                    if !allowed {
                        ctx.report(Diagnostic::CommentRemoved, "");
                        continue;
                    }
                    if trailing_hyphen {
                        ctx.report(Diagnostic::TrailingHyphenInComment, "");
                    }
                    if double_hyphen {
                        ctx.report(Diagnostic::DoubleHyphenInComment, "");
                    }
                    token.kind = TokenKind::Comment { data };
                } else {
                    ctx.report(Diagnostic::CommentRemoved, "");
                    continue;
                }
            }

            result.push(token);
        }

        if let Some(until) = remove_until {
            ctx.report(Diagnostic::TokenRemovedToEnd, &until);
        }
        result
    }
}
