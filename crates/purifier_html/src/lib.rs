//! Whitelist based HTML purifier
//!
//! Untrusted markup is lexed into a flat token stream, which then runs through four passes:
//! foreign elements are removed, the stream is made well-formed (with optional injectors
//! rewriting it on the way), the nesting is checked against the content models of the
//! definition, and finally every attribute is validated. What comes out only holds elements and
//! attributes the policy allows, nested the way the definition says they can be.
use crate::purifier::{Policy, Purifier};
use crate::settings::Settings;
use regex::Regex;

pub mod attr;
pub mod child_def;
pub mod context;
pub mod definition;
pub mod diagnostics;
pub mod entities;
pub mod errors;
pub mod generator;
pub mod injector;
pub mod lexer;
pub mod node;
pub mod purifier;
pub mod settings;
pub mod strategy;
pub mod token;

/// Purifies the given markup with the default settings
pub fn purify(html: &str) -> Result<String, errors::Error> {
    let purifier = Purifier::new(Policy::new(Settings::defaults()?)?);
    Ok(purifier.purify(html))
}

/// Compiles one of the fixed patterns the crate matches against
#[allow(clippy::expect_used)]
pub(crate) fn pattern(re: &str) -> Regex {
    Regex::new(re).expect("fixed pattern must compile")
}
