use crate::schema::Schema;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

///
/// SchemaRegistry
///
/// Compiled schemas, in compilation order. Imported fields resolve against
/// the schemas held here.
///

#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
pub struct SchemaRegistry {
    schemas: IndexMap<String, Schema>,
}

impl SchemaRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a schema, replacing any earlier one with the same name.
    pub fn insert(&mut self, schema: Schema) {
        self.schemas.insert(schema.name.clone(), schema);
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Schema> {
        self.schemas.get(name)
    }

    /// Schema whose document type has the given name.
    #[must_use]
    pub fn by_document(&self, document: &str) -> Option<&Schema> {
        self.schemas
            .values()
            .find(|s| s.document.as_ref().is_some_and(|d| d.name == document))
    }

    pub fn iter(&self) -> impl Iterator<Item = &Schema> {
        self.schemas.values()
    }

    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        self.schemas.keys().map(String::as_str).collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.schemas.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.schemas.is_empty()
    }

    #[must_use]
    pub fn into_schemas(self) -> Vec<Schema> {
        self.schemas.into_values().collect()
    }
}
