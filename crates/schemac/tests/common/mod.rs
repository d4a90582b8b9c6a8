#![allow(dead_code)]

use schemac::prelude::*;

/// Field whose script routes its own value into the given outputs.
pub fn field(name: &str, data_type: DataType, outputs: &[OutputKind]) -> Field {
    let mut statement = vec![Expression::input(name)];
    statement.extend(outputs.iter().map(|kind| Expression::output(*kind, name)));

    Field::new(name, data_type).with_indexing(Expression::statement(statement))
}

pub fn person_type() -> DataType {
    DataType::Struct(StructType::new(
        "person",
        vec![
            StructField::new("name", DataType::String),
            StructField::new("age", DataType::Int),
        ],
    ))
}

pub fn schema_with(name: &str, fields: impl IntoIterator<Item = Field>) -> Schema {
    let mut schema = Schema::new(name);
    for field in fields {
        schema.add_field(field).unwrap();
    }

    schema
}

/// Full validating run with diagnostics kept in memory.
pub fn compile(schema: &mut Schema) -> Result<CollectingSink, CompileError> {
    let sink = CollectingSink::new();
    Pipeline::new(PipelineOptions::default())
        .with_sink(&sink)
        .process(schema)?;

    Ok(sink)
}
