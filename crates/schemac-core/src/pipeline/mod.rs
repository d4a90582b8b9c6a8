//! Ordered pass execution.
//!
//! A run walks `PassId::ALL` once, in order, handing every pass the same
//! schema graph and a read-only `PassContext`. Passes never call each other;
//! whatever one pass derives, the next reads back from the graph.

mod application;
mod pass;


pub use application::Application;
pub use pass::PassId;

use crate::{
    config::FeatureFlags,
    error::CompileError,
    obs::{Diagnostic, DiagnosticSink, TracingSink},
    schema::{Schema, SchemaRegistry},
};
use indexmap::IndexMap;
use schemac_types::TensorType;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

static DEFAULT_SINK: TracingSink = TracingSink;
static NO_MODELS: NoModels = NoModels;

///
/// Mode
///
/// `validate` decides whether rule violations are checked at all; it never
/// turns a failure into a warning. `documents_only` restricts the run to the
/// passes needed to derive the document type.
///

#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct Mode {
    pub validate: bool,
    pub documents_only: bool,
}

impl Mode {
    #[must_use]
    pub const fn full() -> Self {
        Self {
            validate: true,
            documents_only: false,
        }
    }

    #[must_use]
    pub const fn best_effort() -> Self {
        Self {
            validate: false,
            documents_only: false,
        }
    }

    #[must_use]
    pub const fn documents_only(validate: bool) -> Self {
        Self {
            validate,
            documents_only: true,
        }
    }
}

impl Default for Mode {
    fn default() -> Self {
        Self::full()
    }
}

///
/// PipelineOptions
///

#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub struct PipelineOptions {
    #[serde(default)]
    pub mode: Mode,

    /// Passes to leave out of the run. For isolating passes under test.
    #[serde(default)]
    pub skip: BTreeSet<PassId>,
}

impl PipelineOptions {
    #[must_use]
    pub fn new(mode: Mode) -> Self {
        Self {
            mode,
            skip: BTreeSet::new(),
        }
    }

    #[must_use]
    pub fn skip(mut self, pass: PassId) -> Self {
        self.skip.insert(pass);
        self
    }

    /// Skip every pass except the given ones.
    #[must_use]
    pub fn only(mut self, passes: &[PassId]) -> Self {
        self.skip = PassId::ALL
            .into_iter()
            .filter(|p| !passes.contains(p))
            .collect();
        self
    }

    /// Whether the pass takes part in a run with these options.
    #[must_use]
    pub fn runs(&self, pass: PassId) -> bool {
        !self.skip.contains(&pass)
            && (pass.is_document_pass() || !self.mode.documents_only)
            && (self.mode.validate || !pass.is_check())
    }
}

///
/// ModelLookup
///
/// Access to model files stored in the application package. `None` means
/// the file is not available, which dependent passes treat as nothing to do.
///

pub trait ModelLookup {
    fn output_types(&self, file: &str) -> Option<IndexMap<String, TensorType>>;
}

///
/// NoModels
///

#[derive(Clone, Copy, Debug, Default)]
pub struct NoModels;

impl ModelLookup for NoModels {
    fn output_types(&self, _: &str) -> Option<IndexMap<String, TensorType>> {
        None
    }
}

///
/// PassContext
///
/// Everything a pass may read besides the schema itself.
///

pub struct PassContext<'a> {
    pub mode: Mode,
    pub flags: &'a FeatureFlags,
    sink: &'a dyn DiagnosticSink,
    registry: Option<&'a SchemaRegistry>,
    models: &'a dyn ModelLookup,
}

impl<'a> PassContext<'a> {
    #[must_use]
    pub const fn validate(&self) -> bool {
        self.mode.validate
    }

    pub fn warn(&self, schema: &str, field: Option<&str>, message: impl Into<String>) {
        self.emit(Diagnostic::warning(schema, message), field);
    }

    pub fn info(&self, schema: &str, field: Option<&str>, message: impl Into<String>) {
        self.emit(Diagnostic::info(schema, message), field);
    }

    fn emit(&self, diagnostic: Diagnostic, field: Option<&str>) {
        let diagnostic = match field {
            Some(field) => diagnostic.with_field(field),
            None => diagnostic,
        };
        self.sink.record(diagnostic);
    }

    /// Compiled schema owning the given document type.
    #[must_use]
    pub fn referenced_schema(&self, document: &str) -> Option<&'a Schema> {
        self.registry?.by_document(document)
    }

    #[must_use]
    pub fn model_outputs(&self, file: &str) -> Option<IndexMap<String, TensorType>> {
        self.models.output_types(file)
    }
}

///
/// Pipeline
///

pub struct Pipeline<'a> {
    options: PipelineOptions,
    flags: FeatureFlags,
    sink: &'a dyn DiagnosticSink,
    registry: Option<&'a SchemaRegistry>,
    models: &'a dyn ModelLookup,
}

impl<'a> Pipeline<'a> {
    #[must_use]
    pub fn new(options: PipelineOptions) -> Self {
        Self {
            options,
            flags: FeatureFlags::default(),
            sink: &DEFAULT_SINK,
            registry: None,
            models: &NO_MODELS,
        }
    }

    #[must_use]
    pub fn with_flags(mut self, flags: FeatureFlags) -> Self {
        self.flags = flags;
        self
    }

    #[must_use]
    pub fn with_sink(mut self, sink: &'a dyn DiagnosticSink) -> Self {
        self.sink = sink;
        self
    }

    /// Compiled schemas that imported fields resolve against.
    #[must_use]
    pub const fn with_registry(mut self, registry: &'a SchemaRegistry) -> Self {
        self.registry = Some(registry);
        self
    }

    #[must_use]
    pub fn with_models(mut self, models: &'a dyn ModelLookup) -> Self {
        self.models = models;
        self
    }

    #[must_use]
    pub const fn options(&self) -> &PipelineOptions {
        &self.options
    }

    /// Passes a full run executes, in order.
    #[must_use]
    pub fn passes(&self) -> Vec<PassId> {
        PassId::ALL
            .into_iter()
            .filter(|p| self.options.runs(*p))
            .collect()
    }

    /// Run every enabled pass once. Stops at the first hard failure; the
    /// schema must then be discarded.
    pub fn process(&self, schema: &mut Schema) -> Result<(), CompileError> {
        self.run(schema, self.passes())
    }

    /// Re-run the rank-profile group against an already compiled schema.
    pub fn process_rank_profiles(&self, schema: &mut Schema) -> Result<(), CompileError> {
        let passes = PassId::ALL
            .into_iter()
            .filter(|p| p.is_rank_profile_pass())
            .filter(|p| !self.options.skip.contains(p))
            .filter(|p| self.options.mode.validate || !p.is_check())
            .collect();

        self.run(schema, passes)
    }

    fn run(&self, schema: &mut Schema, passes: Vec<PassId>) -> Result<(), CompileError> {
        let ctx = self.context();

        for pass in passes {
            tracing::debug!(schema = %schema.name, %pass, "running pass");
            pass.run(schema, &ctx)?;
        }

        Ok(())
    }

    fn context(&self) -> PassContext<'_> {
        PassContext {
            mode: self.options.mode,
            flags: &self.flags,
            sink: self.sink,
            registry: self.registry,
            models: self.models,
        }
    }
}
