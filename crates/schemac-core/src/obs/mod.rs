//! Observability: compile diagnostics and the sink boundary they flow through.
//!
//! Passes never log directly. Every warning or note goes through the
//! `DiagnosticSink` carried by the pass context.

pub mod sink;

// re-exports
pub use sink::{CollectingSink, Diagnostic, DiagnosticSink, Level, TracingSink};
