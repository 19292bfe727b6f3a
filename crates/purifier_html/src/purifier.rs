//! The policy a document is purified against, and the purifier that applies it
use crate::context::Context;
use crate::definition::HtmlDefinition;
use crate::diagnostics::{ErrorCollector, Report};
use crate::errors::Error;
use crate::generator::Generator;
use crate::injector::{
    check_needed, AutoParagraph, DisplayLinkUri, Injector, Linkify, RemoveEmpty,
    RemoveSpansWithoutAttributes, MAX_INJECTORS,
};
use crate::lexer::Lexer;
use crate::settings::Settings;
use crate::strategy::{Core, Strategy};
use log::{debug, trace};
use purifier_config::ConfigStore;
use std::sync::Arc;

/// Creates a fresh injector for every purified document
pub type InjectorFactory = Arc<dyn Fn() -> Box<dyn Injector> + Send + Sync>;

fn builtin<I: Injector + Default + 'static>() -> InjectorFactory {
    Arc::new(|| -> Box<dyn Injector> { Box::new(I::default()) })
}

/// Settings, the element definition built from them and the active injectors. A policy is
/// immutable once built and can be shared between threads.
pub struct Policy {
    settings: Settings,
    definition: HtmlDefinition,
    injectors: Vec<InjectorFactory>,
}

impl Policy {
    /// Builds the definition and enables the injectors turned on in the settings. Fails when
    /// the configuration is inconsistent, or when an injector needs something the definition
    /// does not allow.
    pub fn new(settings: Settings) -> Result<Self, Error> {
        let definition = HtmlDefinition::build(&settings)?;

        let builtins = [
            (settings.auto_paragraph, builtin::<AutoParagraph>()),
            (settings.display_link_uri, builtin::<DisplayLinkUri>()),
            (settings.linkify, builtin::<Linkify>()),
            (settings.remove_empty, builtin::<RemoveEmpty>()),
            (
                settings.remove_spans_without_attributes,
                builtin::<RemoveSpansWithoutAttributes>(),
            ),
        ];

        let mut policy = Self {
            settings,
            definition,
            injectors: vec![],
        };
        for (_, factory) in builtins.into_iter().filter(|(enabled, _)| *enabled) {
            policy.push_injector(factory)?;
        }

        Ok(policy)
    }

    pub fn from_store(store: &ConfigStore) -> Result<Self, Error> {
        Self::new(Settings::from_store(store)?)
    }

    /// Adds a custom injector. It runs after the injectors already added.
    pub fn add_injector<F>(&mut self, factory: F) -> Result<(), Error>
    where
        F: Fn() -> Box<dyn Injector> + Send + Sync + 'static,
    {
        self.push_injector(Arc::new(factory))
    }

    fn push_injector(&mut self, factory: InjectorFactory) -> Result<(), Error> {
        if self.injectors.len() >= MAX_INJECTORS {
            return Err(Error::Config(format!(
                "no more than {MAX_INJECTORS} injectors can be active"
            )));
        }

        let injector = factory();
        check_needed(injector.as_ref(), &self.definition)?;
        debug!("injector {} enabled", injector.name());

        self.injectors.push(factory);
        Ok(())
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn definition(&self) -> &HtmlDefinition {
        &self.definition
    }

    /// Names of the active injectors, in the order they run
    pub fn injector_names(&self) -> Vec<&'static str> {
        self.injectors.iter().map(|factory| factory().name()).collect()
    }

    /// Fresh, prepared injector instances for a single run
    pub(crate) fn injectors(&self) -> Vec<Box<dyn Injector>> {
        self.injectors
            .iter()
            .map(|factory| {
                let mut injector = factory();
                injector.prepare(&self.definition, &self.settings);
                injector
            })
            .collect()
    }
}

/// Result of a purification together with everything that was corrected
#[derive(Clone, Debug)]
pub struct Purified {
    pub html: String,
    pub diagnostics: Vec<Report>,
}

pub struct Purifier {
    policy: Policy,
    core: Core,
}

impl Purifier {
    pub fn new(policy: Policy) -> Self {
        Self {
            policy,
            core: Core::default(),
        }
    }

    pub fn from_store(store: &ConfigStore) -> Result<Self, Error> {
        Ok(Self::new(Policy::from_store(store)?))
    }

    pub fn policy(&self) -> &Policy {
        &self.policy
    }

    /// Purifies a document. Corrections are only logged, and only when `core.collect_errors`
    /// is enabled.
    pub fn purify(&self, html: &str) -> String {
        if self.policy.settings.collect_errors {
            return self.purify_with_report(html).html;
        }

        let mut ctx = Context::new(None);
        self.run(html, &mut ctx)
    }

    /// Purifies a document and returns every correction that was made
    pub fn purify_with_report(&self, html: &str) -> Purified {
        let mut collector = ErrorCollector::new();
        let html = {
            let mut ctx = Context::new(Some(&mut collector));
            self.run(html, &mut ctx)
        };

        Purified {
            html,
            diagnostics: collector.into_reports(),
        }
    }

    fn run(&self, html: &str, ctx: &mut Context<'_>) -> String {
        let tokens = Lexer::new(&self.policy.settings).tokenize(html);
        trace!("lexed {} tokens", tokens.len());

        let tokens = self.core.execute(tokens, &self.policy, ctx);
        Generator::new(self.policy.definition.doctype).generate(&tokens)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::Diagnostic;
    use crate::injector::{Step, StreamView};
    use crate::token::Token;

    fn purifier(configure: impl FnOnce(&mut Settings)) -> Purifier {
        let mut settings = Settings::defaults().unwrap();
        configure(&mut settings);
        Purifier::new(Policy::new(settings).unwrap())
    }

    #[test]
    fn purify_defaults() {
        let purifier = purifier(|_| {});
        assert_eq!(
            purifier.purify(r#"<b onclick="x()">hi<script>alert(1)</script></b>"#),
            "<b>hi</b>"
        );
        assert_eq!(purifier.purify("a & b < c"), "a &amp; b &lt; c");
        assert_eq!(purifier.purify(""), "");
    }

    #[test]
    fn report_lists_corrections() {
        let purified = purifier(|_| {}).purify_with_report("<p>x<blink>y</blink>");
        assert_eq!(purified.html, "<p>xy</p>");

        let diagnostics: Vec<_> = purified.diagnostics.iter().map(|r| r.diagnostic).collect();
        assert!(diagnostics.contains(&Diagnostic::ForeignElementRemoved));
        assert!(diagnostics.contains(&Diagnostic::TagClosedByDocumentEnd));
    }

    #[test]
    fn builtin_injectors_follow_the_settings() {
        let policy = Policy::new(Settings::defaults().unwrap()).unwrap();
        assert!(policy.injector_names().is_empty());

        let mut settings = Settings::defaults().unwrap();
        settings.linkify = true;
        settings.auto_paragraph = true;
        let policy = Policy::new(settings).unwrap();
        assert_eq!(policy.injector_names(), ["AutoParagraph", "Linkify"]);
    }

    #[test]
    fn injector_needs_are_checked() {
        let mut settings = Settings::defaults().unwrap();
        settings.allowed = "p,b".to_string();
        settings.linkify = true;

        let err = Policy::new(settings).err().unwrap();
        assert!(matches!(err, Error::InjectorNeedsUnavailable { .. }));
        assert_eq!(err.to_string(), "injector Linkify needs a, which is not allowed");
    }

    struct Upper;

    impl Injector for Upper {
        fn name(&self) -> &'static str {
            "Upper"
        }

        fn handle_text(&mut self, token: &mut Token, _stream: &mut StreamView<'_, '_>) -> Step {
            Step::Replace(vec![Token::text(
                &token.text_data().unwrap_or_default().to_uppercase(),
            )])
        }
    }

    #[test]
    fn custom_injectors() {
        let mut policy = Policy::new(Settings::defaults().unwrap()).unwrap();
        policy.add_injector(|| Box::new(Upper)).unwrap();

        let purifier = Purifier::new(policy);
        assert_eq!(purifier.purify("<i>shout</i>"), "<i>SHOUT</i>");
    }

    #[test]
    fn injector_limit() {
        let mut policy = Policy::new(Settings::defaults().unwrap()).unwrap();
        for _ in 0..MAX_INJECTORS {
            policy.add_injector(|| Box::new(Upper)).unwrap();
        }
        assert!(matches!(
            policy.add_injector(|| Box::new(Upper)),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn purifier_is_shareable() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Purifier>();
    }
}
