//! Per-invocation ambient state
//!
//! A [`Context`] lives for exactly one purification. Stages that need pass-local state open a
//! [`PassScope`]; whatever the pass stored in the context is cleared when the scope drops.
use crate::diagnostics::{Diagnostic, ErrorSink, Report};
use core::ops::{Deref, DerefMut};
use log::trace;
use purifier_shared::location::Location;
use std::collections::HashSet;

/// Identifies the token currently being processed
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CurrentToken {
    pub name: String,
    pub location: Option<Location>,
}

/// Keeps track of every id used in the document, so ids stay unique
#[derive(Clone, Debug, Default)]
pub struct IdAccumulator {
    ids: HashSet<String>,
}

impl IdAccumulator {
    /// Adds the id, returns false when it was already in use
    pub fn add(&mut self, id: &str) -> bool {
        self.ids.insert(id.to_string())
    }

    pub fn contains(&self, id: &str) -> bool {
        self.ids.contains(id)
    }
}

pub struct Context<'a> {
    sink: Option<&'a mut dyn ErrorSink>,
    pub ids: IdAccumulator,
    /// Token being processed, used to locate reports
    pub current_token: Option<CurrentToken>,
    /// Whether the node being validated sits in an inline context
    pub is_inline: Option<bool>,
    /// Whether the uri being validated is loaded as an embedded resource
    pub embedded_uri: bool,
    /// Attribute being validated
    pub current_attr: Option<String>,
}

impl<'a> Context<'a> {
    pub fn new(sink: Option<&'a mut dyn ErrorSink>) -> Self {
        Self {
            sink,
            ids: IdAccumulator::default(),
            current_token: None,
            is_inline: None,
            embedded_uri: false,
            current_attr: None,
        }
    }

    /// Returns true when reports are collected
    pub fn has_sink(&self) -> bool {
        self.sink.is_some()
    }

    /// Reports a correction located at the current token
    pub fn report(&mut self, diagnostic: Diagnostic, detail: &str) {
        let location = self.current_token.as_ref().and_then(|t| t.location);
        self.report_at(diagnostic, detail, location);
    }

    /// Reports a correction at the given location
    pub fn report_at(&mut self, diagnostic: Diagnostic, detail: &str, location: Option<Location>) {
        if let Some(sink) = self.sink.as_deref_mut() {
            sink.send(Report {
                severity: diagnostic.severity(),
                diagnostic,
                detail: detail.to_string(),
                location,
            });
        }
    }

    /// Opens a scope for a single pass
    pub fn pass<'c>(&'c mut self, name: &'static str) -> PassScope<'c, 'a> {
        trace!("context: entering pass {name}");
        PassScope { ctx: self, name }
    }

    fn clear_pass_state(&mut self) {
        self.current_token = None;
        self.is_inline = None;
        self.embedded_uri = false;
        self.current_attr = None;
    }
}

/// Scope guard for a pass. Clears all pass-local fields of the context on drop.
pub struct PassScope<'c, 'a> {
    ctx: &'c mut Context<'a>,
    name: &'static str,
}

impl<'a> Deref for PassScope<'_, 'a> {
    type Target = Context<'a>;

    fn deref(&self) -> &Self::Target {
        self.ctx
    }
}

impl DerefMut for PassScope<'_, '_> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.ctx
    }
}

impl Drop for PassScope<'_, '_> {
    fn drop(&mut self) {
        trace!("context: leaving pass {}", self.name);
        self.ctx.clear_pass_state();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::ErrorCollector;

    #[test]
    fn pass_state_is_cleared() {
        let mut ctx = Context::new(None);
        {
            let mut scope = ctx.pass("test");
            scope.is_inline = Some(true);
            scope.embedded_uri = true;
            scope.current_attr = Some("src".into());
            scope.ids.add("main");
        }

        assert_eq!(ctx.is_inline, None);
        assert!(!ctx.embedded_uri);
        assert_eq!(ctx.current_attr, None);
        // ids live for the whole invocation
        assert!(ctx.ids.contains("main"));
    }

    #[test]
    fn reports_use_current_location() {
        let mut collector = ErrorCollector::new();
        {
            let mut ctx = Context::new(Some(&mut collector));
            assert!(ctx.has_sink());
            ctx.current_token = Some(CurrentToken {
                name: "b".into(),
                location: Some(Location::new(1, 4, 3)),
            });
            ctx.report(Diagnostic::TagAutoClosed, "b");
        }

        let reports = collector.into_reports();
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].location, Some(Location::new(1, 4, 3)));
    }

    #[test]
    fn reports_without_sink_are_dropped() {
        let mut ctx = Context::new(None);
        assert!(!ctx.has_sink());
        ctx.report(Diagnostic::NodeRemoved, "ul");
    }

    #[test]
    fn id_accumulator_rejects_duplicates() {
        let mut ids = IdAccumulator::default();
        assert!(ids.add("a"));
        assert!(!ids.add("a"));
    }
}
