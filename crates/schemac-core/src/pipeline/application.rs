use crate::{
    config::FeatureFlags,
    error::CompileError,
    obs::{DiagnosticSink, TracingSink},
    pipeline::{ModelLookup, NoModels, Pipeline, PipelineOptions},
    schema::{Schema, SchemaRegistry},
};
use schemac_types::DataType;
use std::collections::HashMap;

static DEFAULT_SINK: TracingSink = TracingSink;
static NO_MODELS: NoModels = NoModels;

///
/// Application
///
/// Compiles a set of schemas so that every reference target is compiled
/// before the schemas that import from it. Each schema gets a private run.
///

pub struct Application<'a> {
    options: PipelineOptions,
    flags: FeatureFlags,
    sink: &'a dyn DiagnosticSink,
    models: &'a dyn ModelLookup,
}

impl<'a> Application<'a> {
    #[must_use]
    pub fn new(options: PipelineOptions) -> Self {
        Self {
            options,
            flags: FeatureFlags::default(),
            sink: &DEFAULT_SINK,
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

    #[must_use]
    pub fn with_models(mut self, models: &'a dyn ModelLookup) -> Self {
        self.models = models;
        self
    }

    /// Compile every schema in reference order. The first failure is
    /// returned and no registry is produced.
    pub fn compile(&self, schemas: Vec<Schema>) -> Result<SchemaRegistry, CompileError> {
        let order = compile_order(&schemas)?;
        let mut pending: Vec<Option<Schema>> = schemas.into_iter().map(Some).collect();
        let mut registry = SchemaRegistry::new();

        for i in order {
            let Some(mut schema) = pending[i].take() else {
                continue;
            };
            {
                let pipeline = Pipeline::new(self.options.clone())
                    .with_flags(self.flags.clone())
                    .with_sink(self.sink)
                    .with_models(self.models)
                    .with_registry(&registry);
                pipeline.process(&mut schema)?;
            }
            tracing::debug!(schema = %schema.name, "schema compiled");
            registry.insert(schema);
        }

        Ok(registry)
    }
}

// Depth-first topological order over reference targets, input order among
// independent schemas.
fn compile_order(schemas: &[Schema]) -> Result<Vec<usize>, CompileError> {
    let by_document: HashMap<&str, usize> = schemas
        .iter()
        .enumerate()
        .filter_map(|(i, s)| s.document.as_ref().map(|d| (d.name.as_str(), i)))
        .collect();

    let dependencies: Vec<Vec<usize>> = schemas
        .iter()
        .enumerate()
        .map(|(i, schema)| {
            let mut deps = Vec::new();
            for field in schema.document_fields() {
                if let DataType::Reference(target) = &field.data_type
                    && let Some(&j) = by_document.get(target.as_str())
                    && j != i
                    && !deps.contains(&j)
                {
                    deps.push(j);
                }
            }
            deps
        })
        .collect();

    let mut state = vec![Visit::New; schemas.len()];
    let mut order = Vec::with_capacity(schemas.len());
    for i in 0..schemas.len() {
        visit(i, schemas, &dependencies, &mut state, &mut order, &mut Vec::new())?;
    }

    Ok(order)
}

#[derive(Clone, Copy, Eq, PartialEq)]
enum Visit {
    New,
    Active,
    Done,
}

fn visit(
    i: usize,
    schemas: &[Schema],
    dependencies: &[Vec<usize>],
    state: &mut [Visit],
    order: &mut Vec<usize>,
    path: &mut Vec<usize>,
) -> Result<(), CompileError> {
    match state[i] {
        Visit::Done => return Ok(()),
        Visit::Active => {
            let start = path.iter().position(|&p| p == i).unwrap_or(0);
            let cycle: Vec<&str> = path[start..]
                .iter()
                .chain(std::iter::once(&i))
                .map(|&p| schemas[p].name.as_str())
                .collect();
            return Err(CompileError::structural(
                &schemas[i].name,
                format!("document references form a cycle: {}", cycle.join(" -> ")),
            ));
        }
        Visit::New => {}
    }

    state[i] = Visit::Active;
    path.push(i);
    for &dep in &dependencies[i] {
        visit(dep, schemas, dependencies, state, order, path)?;
    }
    path.pop();
    state[i] = Visit::Done;
    order.push(i);

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::Field;

    fn schema_referencing(name: &str, target: Option<&str>) -> Schema {
        let mut schema = Schema::new(name);
        if let Some(target) = target {
            schema
                .add_field(Field::new(
                    format!("{target}_ref"),
                    DataType::Reference(target.to_string()),
                ))
                .unwrap();
        }
        schema
    }

    #[test]
    fn reference_targets_come_first() {
        let schemas = vec![
            schema_referencing("ad", Some("campaign")),
            schema_referencing("campaign", Some("advertiser")),
            schema_referencing("advertiser", None),
        ];

        assert_eq!(compile_order(&schemas).unwrap(), vec![2, 1, 0]);
    }

    #[test]
    fn independent_schemas_keep_input_order() {
        let schemas = vec![
            schema_referencing("b", None),
            schema_referencing("a", None),
        ];

        assert_eq!(compile_order(&schemas).unwrap(), vec![0, 1]);
    }

    #[test]
    fn reference_cycles_fail() {
        let schemas = vec![
            schema_referencing("a", Some("b")),
            schema_referencing("b", Some("a")),
        ];

        let err = compile_order(&schemas).unwrap_err();
        assert_eq!(err.class, crate::error::ErrorClass::Structural);
        assert!(err.message.contains("a -> b -> a"));
    }
}
