//! Diagnostic sink boundary.
//!
//! Compilation logic MUST NOT call into `tracing` directly for
//! user-facing diagnostics; it records a `Diagnostic` on the sink it was
//! given. The surrounding tool decides how to render them.

use derive_more::Display;
use std::cell::RefCell;

///
/// Level
///

#[derive(Clone, Copy, Debug, Display, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub enum Level {
    #[display("info")]
    Info,
    #[display("warning")]
    Warning,
}

///
/// Diagnostic
///
/// A non-fatal message keyed by schema and, when relevant, field.
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Diagnostic {
    pub level: Level,
    pub schema: String,
    pub field: Option<String>,
    pub message: String,
}

impl Diagnostic {
    pub fn warning(schema: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(Level::Warning, schema, message)
    }

    pub fn info(schema: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(Level::Info, schema, message)
    }

    fn new(level: Level, schema: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            level,
            schema: schema.into(),
            field: None,
            message: message.into(),
        }
    }

    #[must_use]
    pub fn with_field(mut self, field: impl Into<String>) -> Self {
        self.field = Some(field.into());
        self
    }
}

///
/// DiagnosticSink
///

pub trait DiagnosticSink {
    fn record(&self, diagnostic: Diagnostic);
}

///
/// TracingSink
///
/// Default sink: forwards every diagnostic to `tracing` with schema and
/// field as structured fields.
///

#[derive(Clone, Copy, Debug, Default)]
pub struct TracingSink;

impl DiagnosticSink for TracingSink {
    fn record(&self, diagnostic: Diagnostic) {
        let field = diagnostic.field.as_deref().unwrap_or_default();

        match diagnostic.level {
            Level::Warning => tracing::warn!(
                schema = %diagnostic.schema,
                field,
                "{}",
                diagnostic.message
            ),
            Level::Info => tracing::info!(
                schema = %diagnostic.schema,
                field,
                "{}",
                diagnostic.message
            ),
        }
    }
}

///
/// CollectingSink
///
/// Keeps diagnostics in memory, in emission order.
///

#[derive(Debug, Default)]
pub struct CollectingSink {
    diagnostics: RefCell<Vec<Diagnostic>>,
}

impl CollectingSink {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn diagnostics(&self) -> Vec<Diagnostic> {
        self.diagnostics.borrow().clone()
    }

    #[must_use]
    pub fn warnings(&self) -> Vec<Diagnostic> {
        self.diagnostics
            .borrow()
            .iter()
            .filter(|d| d.level == Level::Warning)
            .cloned()
            .collect()
    }

    /// Whether any warning message contains `needle`.
    #[must_use]
    pub fn has_warning(&self, needle: &str) -> bool {
        self.warnings().iter().any(|d| d.message.contains(needle))
    }

    pub fn take(&self) -> Vec<Diagnostic> {
        self.diagnostics.take()
    }
}

impl DiagnosticSink for CollectingSink {
    fn record(&self, diagnostic: Diagnostic) {
        self.diagnostics.borrow_mut().push(diagnostic);
    }
}
