//! Diagnostics emitted while input is being corrected
//!
//! Every correction the pipeline makes to untrusted input is reported through an [`ErrorSink`].
//! Reports never influence control flow: the output is identical with or without a sink.
use core::fmt::{Display, Formatter};
use log::debug;
use purifier_shared::location::Location;

/// Severity of a correction
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Severity {
    /// Content was destructive and has been removed
    Error,
    /// Content was defused but preserved in an altered form
    Warning,
    /// A harmless but possibly surprising normalization occurred
    Notice,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Error => "error",
            Severity::Warning => "warning",
            Severity::Notice => "notice",
        }
    }
}

/// Every kind of correction that can be reported
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Diagnostic {
    TagTransformed,
    MissingRequiredAttribute,
    ForeignElementToText,
    ForeignElementRemoved,
    ForeignMetaElementRemoved,
    TrailingHyphenInComment,
    DoubleHyphenInComment,
    CommentRemoved,
    TokenRemovedToEnd,
    UnnecessaryEndTagToText,
    UnnecessaryEndTagRemoved,
    StrayEndTagToText,
    StrayEndTagRemoved,
    TagAutoClosed,
    TagCarryover,
    StartTagRemoved,
    TagClosedByElementEnd,
    TagClosedByDocumentEnd,
    NodeExcluded,
    NodeRemoved,
    NodeContentsRemoved,
    NodeReorganized,
    AttributeRemoved,
    AttributeValueChanged,
    AttributesTransformed,
}

impl Diagnostic {
    /// Fixed severity of the diagnostic
    pub fn severity(&self) -> Severity {
        match self {
            Diagnostic::MissingRequiredAttribute
            | Diagnostic::ForeignElementRemoved
            | Diagnostic::ForeignMetaElementRemoved
            | Diagnostic::TokenRemovedToEnd
            | Diagnostic::StartTagRemoved
            | Diagnostic::NodeExcluded
            | Diagnostic::NodeRemoved
            | Diagnostic::NodeContentsRemoved
            | Diagnostic::AttributeRemoved => Severity::Error,

            Diagnostic::ForeignElementToText
            | Diagnostic::UnnecessaryEndTagToText
            | Diagnostic::UnnecessaryEndTagRemoved
            | Diagnostic::StrayEndTagToText
            | Diagnostic::StrayEndTagRemoved
            | Diagnostic::NodeReorganized
            | Diagnostic::AttributeValueChanged => Severity::Warning,

            Diagnostic::TagTransformed
            | Diagnostic::TrailingHyphenInComment
            | Diagnostic::DoubleHyphenInComment
            | Diagnostic::CommentRemoved
            | Diagnostic::TagAutoClosed
            | Diagnostic::TagCarryover
            | Diagnostic::TagClosedByElementEnd
            | Diagnostic::TagClosedByDocumentEnd
            | Diagnostic::AttributesTransformed => Severity::Notice,
        }
    }

    /// Stable identifier of the diagnostic
    pub fn as_str(&self) -> &'static str {
        match self {
            Diagnostic::TagTransformed => "tag-transformed",
            Diagnostic::MissingRequiredAttribute => "missing-required-attribute",
            Diagnostic::ForeignElementToText => "foreign-element-to-text",
            Diagnostic::ForeignElementRemoved => "foreign-element-removed",
            Diagnostic::ForeignMetaElementRemoved => "foreign-meta-element-removed",
            Diagnostic::TrailingHyphenInComment => "trailing-hyphen-in-comment",
            Diagnostic::DoubleHyphenInComment => "double-hyphen-in-comment",
            Diagnostic::CommentRemoved => "comment-removed",
            Diagnostic::TokenRemovedToEnd => "token-removed-to-end",
            Diagnostic::UnnecessaryEndTagToText => "unnecessary-end-tag-to-text",
            Diagnostic::UnnecessaryEndTagRemoved => "unnecessary-end-tag-removed",
            Diagnostic::StrayEndTagToText => "stray-end-tag-to-text",
            Diagnostic::StrayEndTagRemoved => "stray-end-tag-removed",
            Diagnostic::TagAutoClosed => "tag-auto-closed",
            Diagnostic::TagCarryover => "tag-carryover",
            Diagnostic::StartTagRemoved => "start-tag-removed",
            Diagnostic::TagClosedByElementEnd => "tag-closed-by-element-end",
            Diagnostic::TagClosedByDocumentEnd => "tag-closed-by-document-end",
            Diagnostic::NodeExcluded => "node-excluded",
            Diagnostic::NodeRemoved => "node-removed",
            Diagnostic::NodeContentsRemoved => "node-contents-removed",
            Diagnostic::NodeReorganized => "node-reorganized",
            Diagnostic::AttributeRemoved => "attribute-removed",
            Diagnostic::AttributeValueChanged => "attribute-value-changed",
            Diagnostic::AttributesTransformed => "attributes-transformed",
        }
    }
}

/// A single reported correction
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Report {
    pub severity: Severity,
    pub diagnostic: Diagnostic,
    /// Free form detail, usually the element or attribute involved
    pub detail: String,
    /// Source position of the offending token, when line numbers are maintained
    pub location: Option<Location>,
}

impl Display for Report {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}: {}", self.severity.as_str(), self.diagnostic.as_str())?;
        if !self.detail.is_empty() {
            write!(f, " ({})", self.detail)?;
        }
        if let Some(location) = self.location {
            write!(f, " at {location}")?;
        }
        Ok(())
    }
}

/// Receives reports from the pipeline
pub trait ErrorSink {
    fn send(&mut self, report: Report);
}

/// Collects every report in order of arrival
#[derive(Clone, Debug, Default)]
pub struct ErrorCollector {
    reports: Vec<Report>,
}

impl ErrorCollector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reports(&self) -> &[Report] {
        &self.reports
    }

    pub fn into_reports(self) -> Vec<Report> {
        self.reports
    }

    /// Returns true when the given diagnostic has been reported at least once
    pub fn has(&self, diagnostic: Diagnostic) -> bool {
        self.reports.iter().any(|r| r.diagnostic == diagnostic)
    }
}

impl ErrorSink for ErrorCollector {
    fn send(&mut self, report: Report) {
        debug!("purifier: {report}");
        self.reports.push(report);
    }
}
