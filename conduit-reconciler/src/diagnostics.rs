//! Operation diagnostics
//!
//! Every orchestrator operation returns an [`Outcome`]: what to do with the
//! tracked record plus an ordered list of diagnostics. Errors mean the
//! operation's primary effect did not happen; warnings mean it did but an
//! auxiliary step (usually convergence) did not.

use conduit_core::domain::pipeline::PipelineRecord;
use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
    Info,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Error => write!(f, "error"),
            Severity::Warning => write!(f, "warning"),
            Severity::Info => write!(f, "info"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    pub severity: Severity,
    pub summary: String,
    pub detail: String,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.detail.is_empty() {
            write!(f, "{}: {}", self.severity, self.summary)
        } else {
            write!(f, "{}: {}: {}", self.severity, self.summary, self.detail)
        }
    }
}

/// Ordered diagnostics collected by one operation
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Diagnostics(Vec<Diagnostic>);

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, severity: Severity, summary: impl Into<String>, detail: impl Into<String>) {
        self.0.push(Diagnostic {
            severity,
            summary: summary.into(),
            detail: detail.into(),
        });
    }

    pub fn error(&mut self, summary: impl Into<String>, detail: impl Into<String>) {
        self.push(Severity::Error, summary, detail);
    }

    pub fn warning(&mut self, summary: impl Into<String>, detail: impl Into<String>) {
        self.push(Severity::Warning, summary, detail);
    }

    pub fn info(&mut self, summary: impl Into<String>, detail: impl Into<String>) {
        self.push(Severity::Info, summary, detail);
    }

    pub fn has_errors(&self) -> bool {
        self.0.iter().any(|d| d.severity == Severity::Error)
    }

    pub fn errors(&self) -> impl Iterator<Item = &Diagnostic> {
        self.0.iter().filter(|d| d.severity == Severity::Error)
    }

    pub fn warnings(&self) -> impl Iterator<Item = &Diagnostic> {
        self.0.iter().filter(|d| d.severity == Severity::Warning)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<'a> IntoIterator for &'a Diagnostics {
    type Item = &'a Diagnostic;
    type IntoIter = std::slice::Iter<'a, Diagnostic>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// What the caller should do with its tracked record
#[derive(Debug, Clone, PartialEq)]
pub enum Disposition {
    /// Write this record
    Persist(PipelineRecord),
    /// Drop the record from tracked state
    Remove,
    /// Write nothing; the previously tracked record (if any) stays as is
    Unchanged,
}

/// Result of one orchestrator operation
#[derive(Debug, Clone, PartialEq)]
pub struct Outcome {
    pub disposition: Disposition,
    pub diagnostics: Diagnostics,
}

impl Outcome {
    pub fn persist(record: PipelineRecord, diagnostics: Diagnostics) -> Self {
        Self {
            disposition: Disposition::Persist(record),
            diagnostics,
        }
    }

    pub fn remove(diagnostics: Diagnostics) -> Self {
        Self {
            disposition: Disposition::Remove,
            diagnostics,
        }
    }

    pub fn unchanged(diagnostics: Diagnostics) -> Self {
        Self {
            disposition: Disposition::Unchanged,
            diagnostics,
        }
    }

    /// Shorthand for a hard failure with a single error
    pub fn failed(summary: impl Into<String>, detail: impl Into<String>) -> Self {
        let mut diagnostics = Diagnostics::new();
        diagnostics.error(summary, detail);
        Self::unchanged(diagnostics)
    }

    /// The record to persist, if any
    pub fn record(&self) -> Option<&PipelineRecord> {
        match &self.disposition {
            Disposition::Persist(record) => Some(record),
            _ => None,
        }
    }

    pub fn is_removed(&self) -> bool {
        matches!(self.disposition, Disposition::Remove)
    }
}
