//! Builders shared by the pass tests.

use crate::{
    config::FeatureFlags,
    error::CompileError,
    obs::CollectingSink,
    pipeline::{Mode, ModelLookup, PassId, Pipeline, PipelineOptions},
    schema::{Field, Schema, SchemaRegistry},
};
use schemac_expr::{Expression, OutputKind};
use schemac_types::{DataType, StructField, StructType};

/// Field whose script routes its own value into the given outputs.
pub(crate) fn field(name: &str, data_type: DataType, outputs: &[OutputKind]) -> Field {
    let mut statement = vec![Expression::input(name)];
    statement.extend(outputs.iter().map(|kind| Expression::output(*kind, name)));

    Field::new(name, data_type).with_indexing(Expression::statement(statement))
}

pub(crate) fn attribute_field(name: &str, data_type: DataType) -> Field {
    field(name, data_type, &[OutputKind::Attribute])
}

pub(crate) fn index_field(name: &str, data_type: DataType) -> Field {
    field(name, data_type, &[OutputKind::Index])
}

pub(crate) fn person_type() -> DataType {
    DataType::Struct(StructType::new(
        "person",
        vec![
            StructField::new("name", DataType::String),
            StructField::new("age", DataType::Int),
        ],
    ))
}

pub(crate) fn schema_with(name: &str, fields: impl IntoIterator<Item = Field>) -> Schema {
    let mut schema = Schema::new(name);
    for field in fields {
        schema.add_field(field).unwrap();
    }

    schema
}

///
/// Run
///
/// One pipeline run against a schema with in-memory diagnostics.
///

pub(crate) struct Run {
    pub options: PipelineOptions,
    pub flags: FeatureFlags,
    pub registry: Option<SchemaRegistry>,
    pub models: Option<Box<dyn ModelLookup>>,
    pub sink: CollectingSink,
}

impl Run {
    pub(crate) fn all() -> Self {
        Self {
            options: PipelineOptions::default(),
            flags: FeatureFlags::default(),
            registry: None,
            models: None,
            sink: CollectingSink::new(),
        }
    }

    pub(crate) fn only(passes: &[PassId]) -> Self {
        Self {
            options: PipelineOptions::default().only(passes),
            ..Self::all()
        }
    }

    pub(crate) fn mode(mut self, mode: Mode) -> Self {
        self.options.mode = mode;
        self
    }

    pub(crate) fn flags(mut self, flags: FeatureFlags) -> Self {
        self.flags = flags;
        self
    }

    pub(crate) fn registry(mut self, registry: SchemaRegistry) -> Self {
        self.registry = Some(registry);
        self
    }

    pub(crate) fn models(mut self, models: impl ModelLookup + 'static) -> Self {
        self.models = Some(Box::new(models));
        self
    }

    pub(crate) fn process(&self, schema: &mut Schema) -> Result<(), CompileError> {
        let mut pipeline = Pipeline::new(self.options.clone())
            .with_flags(self.flags.clone())
            .with_sink(&self.sink);
        if let Some(registry) = &self.registry {
            pipeline = pipeline.with_registry(registry);
        }
        if let Some(models) = &self.models {
            pipeline = pipeline.with_models(models.as_ref());
        }

        pipeline.process(schema)
    }

    pub(crate) fn has_warning(&self, needle: &str) -> bool {
        self.sink.has_warning(needle)
    }
}
