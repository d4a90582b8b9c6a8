//! Semantic compiler for document schemas: the schema graph, the ordered
//! pass pipeline, and the derivation and validation passes that bring a
//! parsed graph into an internally consistent state.

pub mod config;
pub mod error;
pub mod obs;
pub mod pipeline;
pub mod schema;

mod processing;

#[cfg(test)]
pub(crate) mod test_support;

pub use config::{ConfigError, FeatureFlags};
pub use error::{CompileError, ErrorClass};
pub use pipeline::{
    Application, Mode, ModelLookup, NoModels, PassContext, PassId, Pipeline, PipelineOptions,
};
pub use schema::{Schema, SchemaRegistry};

///
/// Prelude
///

pub mod prelude {
    pub use crate::{
        config::FeatureFlags,
        error::{CompileError, ErrorClass},
        obs::{CollectingSink, DiagnosticSink, TracingSink},
        pipeline::{Application, Mode, PassId, Pipeline, PipelineOptions},
        schema::{
            Attribute, DocumentSummary, Field, FieldSet, ImportDeclaration, Index, RankProfile,
            Schema, SchemaRegistry, SummaryField, SummaryTransform,
        },
    };
}
