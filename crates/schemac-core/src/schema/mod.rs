//! The schema graph: one document type's fields, storage descriptors,
//! summary classes, field sets, imports and rank profiles.
//!
//! Every lookup is name based and reads the current state, so a pass always
//! sees the mutations of the passes before it.

pub mod attribute;
pub mod field;
pub mod field_set;
pub mod imported;
pub mod index;
pub mod rank_profile;
pub mod registry;
pub mod summary;


use crate::error::CompileError;
use indexmap::IndexMap;
use schemac_expr::{FieldTypeAdapter, OutputKind};
use schemac_types::DataType;
use serde::{Deserialize, Serialize};

// re-exports
pub use attribute::{Attribute, Dictionary, DictionaryKind, HnswParams};
pub use field::{Field, Matching, Ranking};
pub use field_set::{DOCUMENT_FIELD_SET, FieldSet};
pub use imported::{
    ImportDeclaration, ImportedComplexField, ImportedField, ImportedFields, ImportedSimpleField,
};
pub use index::Index;
pub use rank_profile::{
    DiversitySettings, MatchPhaseSettings, OnnxModel, RankFunction, RankProfile, RankSetting,
    RankSettingKind,
};
pub use registry::SchemaRegistry;
pub use summary::{
    DEFAULT_SUMMARY, DocumentSummary, ElementsSelector, RANK_FEATURES, SUMMARY_FEATURES,
    SummaryField, SummaryTransform,
};

///
/// DocumentType
///

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct DocumentType {
    pub name: String,
    #[serde(default)]
    pub fields: IndexMap<String, Field>,

    /// Values stored with the document that are not declared document
    /// fields: extra fields and docstore-backed summary fields.
    #[serde(default)]
    pub extra_stored: IndexMap<String, DataType>,
}

impl DocumentType {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fields: IndexMap::new(),
            extra_stored: IndexMap::new(),
        }
    }
}

///
/// Schema
///
/// The unit of compilation. Mutated in place by every pass.
///

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct Schema {
    pub name: String,

    #[serde(default)]
    pub document: Option<DocumentType>,

    /// Fields declared outside the document block.
    #[serde(default)]
    pub extra_fields: IndexMap<String, Field>,

    #[serde(default)]
    pub summaries: IndexMap<String, DocumentSummary>,

    /// Index definitions not owned by a single field.
    #[serde(default)]
    pub indices: IndexMap<String, Index>,

    #[serde(default)]
    pub imported_fields: ImportedFields,

    #[serde(default)]
    pub field_sets: IndexMap<String, FieldSet>,

    #[serde(default)]
    pub rank_profiles: IndexMap<String, RankProfile>,
}

impl Schema {
    /// New schema with an equally named, empty document type.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        let mut schema = Self::without_document(&name);
        schema.document = Some(DocumentType::new(name));

        schema
    }

    #[must_use]
    pub fn without_document(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            document: None,
            extra_fields: IndexMap::new(),
            summaries: IndexMap::new(),
            indices: IndexMap::new(),
            imported_fields: ImportedFields::default(),
            field_sets: IndexMap::new(),
            rank_profiles: IndexMap::new(),
        }
    }

    // ------------------------------------------------------------------
    // Fields
    // ------------------------------------------------------------------

    pub fn document_fields(&self) -> impl Iterator<Item = &Field> {
        self.document.iter().flat_map(|d| d.fields.values())
    }

    /// Document fields followed by extra fields.
    pub fn concrete_fields(&self) -> impl Iterator<Item = &Field> {
        self.document_fields().chain(self.extra_fields.values())
    }

    pub fn concrete_fields_mut(&mut self) -> impl Iterator<Item = &mut Field> {
        self.document
            .iter_mut()
            .flat_map(|d| d.fields.values_mut())
            .chain(self.extra_fields.values_mut())
    }

    #[must_use]
    pub fn concrete_field_names(&self) -> Vec<String> {
        self.concrete_fields().map(|f| f.name.clone()).collect()
    }

    #[must_use]
    pub fn get_concrete_field(&self, name: &str) -> Option<&Field> {
        self.document
            .as_ref()
            .and_then(|d| d.fields.get(name))
            .or_else(|| self.extra_fields.get(name))
    }

    pub fn get_concrete_field_mut(&mut self, name: &str) -> Option<&mut Field> {
        if let Some(document) = self.document.as_mut()
            && document.fields.contains_key(name)
        {
            return document.fields.get_mut(name);
        }

        self.extra_fields.get_mut(name)
    }

    /// Concrete field or struct member by dotted name.
    #[must_use]
    pub fn get_field(&self, name: &str) -> Option<&Field> {
        if let Some(field) = self.get_concrete_field(name) {
            return Some(field);
        }
        let (top, _) = name.split_once('.')?;

        self.get_concrete_field(top)?.sub_field(name)
    }

    pub fn get_field_mut(&mut self, name: &str) -> Option<&mut Field> {
        if self.get_concrete_field(name).is_some() {
            return self.get_concrete_field_mut(name);
        }
        let (top, _) = name.split_once('.')?;

        self.get_concrete_field_mut(top)?.sub_field_mut(name)
    }

    #[must_use]
    pub fn is_document_field(&self, name: &str) -> bool {
        self.document
            .as_ref()
            .is_some_and(|d| d.fields.contains_key(name))
    }

    /// Target document type of a reference field.
    #[must_use]
    pub fn reference_target(&self, field: &str) -> Option<&str> {
        match &self.get_concrete_field(field)?.data_type {
            DataType::Reference(target) => Some(target),
            _ => None,
        }
    }

    /// Add a document field. Field names are never silently shadowed.
    pub fn add_field(&mut self, field: Field) -> Result<(), CompileError> {
        if self.get_concrete_field(&field.name).is_some() {
            return Err(self.duplicate_field(&field.name));
        }
        let Some(document) = self.document.as_mut() else {
            return Err(CompileError::structural(
                &self.name,
                format!("cannot add field '{}' to a schema without a document", field.name),
            ));
        };
        document.fields.insert(field.name.clone(), field);

        Ok(())
    }

    /// Add a field outside the document block.
    pub fn add_extra_field(&mut self, mut field: Field) -> Result<(), CompileError> {
        if self.get_concrete_field(&field.name).is_some()
            || self.imported_fields.get(&field.name).is_some()
        {
            return Err(self.duplicate_field(&field.name));
        }
        field.is_extra_field = true;
        self.extra_fields.insert(field.name.clone(), field);

        Ok(())
    }

    fn duplicate_field(&self, name: &str) -> CompileError {
        CompileError::structural(&self.name, format!("field '{name}' is already defined"))
            .with_field(name)
    }

    // ------------------------------------------------------------------
    // Storage lookups
    // ------------------------------------------------------------------

    /// Attribute by name: local fields and their members, extra fields, then
    /// imported fields.
    #[must_use]
    pub fn get_attribute(&self, name: &str) -> Option<&Attribute> {
        fn find<'a>(field: &'a Field, name: &str) -> Option<&'a Attribute> {
            field
                .attributes
                .get(name)
                .or_else(|| field.struct_fields.values().find_map(|s| find(s, name)))
        }

        self.concrete_fields()
            .find_map(|f| find(f, name))
            .or_else(|| {
                self.imported_fields
                    .get(name)
                    .and_then(ImportedField::attribute)
            })
    }

    /// Index by name: field-owned first, then schema-level.
    #[must_use]
    pub fn get_index(&self, name: &str) -> Option<&Index> {
        self.concrete_fields()
            .find_map(|f| f.indices.get(name))
            .or_else(|| self.indices.get(name))
    }

    /// Whether any field writes to the named index.
    #[must_use]
    pub fn has_index(&self, name: &str) -> bool {
        self.get_index(name).is_some()
            || self
                .concrete_fields()
                .any(|f| f.index_names().iter().any(|n| n == name))
    }

    pub fn add_index(&mut self, index: Index) -> Result<(), CompileError> {
        if self.indices.contains_key(&index.name) {
            return Err(CompileError::structural(
                &self.name,
                format!("index '{}' is already defined", index.name),
            ));
        }
        self.indices.insert(index.name.clone(), index);

        Ok(())
    }

    // ------------------------------------------------------------------
    // Summaries
    // ------------------------------------------------------------------

    pub fn add_summary(&mut self, summary: DocumentSummary) -> Result<(), CompileError> {
        if self.summaries.contains_key(&summary.name) {
            return Err(CompileError::structural(
                &self.name,
                format!("summary class '{}' is already defined", summary.name),
            ));
        }
        self.summaries.insert(summary.name.clone(), summary);

        Ok(())
    }

    /// Summary field by name: the default class entry first, then the first
    /// explicit declaration, then any declaration.
    #[must_use]
    pub fn summary_field(&self, name: &str) -> Option<&SummaryField> {
        if let Some(field) = self.summary_field_in(DEFAULT_SUMMARY, name) {
            return Some(field);
        }
        let mut entries = self.summaries.values().filter_map(|s| s.get(name));
        let first = entries.next()?;
        if !first.implicit {
            return Some(first);
        }

        entries.find(|f| !f.implicit).or(Some(first))
    }

    #[must_use]
    pub fn summary_field_in(&self, class: &str, name: &str) -> Option<&SummaryField> {
        self.summaries.get(class)?.get(name)
    }

    /// Every class entry with the given name, in class order.
    #[must_use]
    pub fn summary_entries(&self, name: &str) -> Vec<(&str, &SummaryField)> {
        self.summaries
            .values()
            .filter_map(|s| s.get(name).map(|f| (s.name.as_str(), f)))
            .collect()
    }

    /// Distinct summary field names across classes, first-seen order.
    #[must_use]
    pub fn summary_field_names(&self) -> Vec<String> {
        let mut names: Vec<String> = Vec::new();
        for field in self.summaries.values().flat_map(|s| s.fields.values()) {
            if !names.contains(&field.name) {
                names.push(field.name.clone());
            }
        }

        names
    }

    /// Apply `f` to every class entry and field declaration with the name.
    pub fn update_summary_fields(&mut self, name: &str, mut f: impl FnMut(&mut SummaryField)) {
        for summary in self.summaries.values_mut() {
            if let Some(field) = summary.fields.get_mut(name) {
                f(field);
            }
        }
        for field in self.concrete_fields_mut() {
            if let Some(declared) = field.summary_fields.get_mut(name) {
                f(declared);
            }
        }
    }

    /// Summary fields reading from exactly the named field.
    #[must_use]
    pub fn summary_fields_sourced_from(&self, field: &str) -> Vec<&SummaryField> {
        self.summaries
            .values()
            .flat_map(|s| s.fields.values())
            .filter(|s| s.single_source() == Some(field))
            .collect()
    }

    // ------------------------------------------------------------------
    // Field sets and rank profiles
    // ------------------------------------------------------------------

    pub fn add_field_set(&mut self, field_set: FieldSet) -> Result<(), CompileError> {
        if self.field_sets.contains_key(&field_set.name) {
            return Err(CompileError::structural(
                &self.name,
                format!("field set '{}' is already defined", field_set.name),
            ));
        }
        self.field_sets.insert(field_set.name.clone(), field_set);

        Ok(())
    }

    pub fn add_rank_profile(&mut self, profile: RankProfile) -> Result<(), CompileError> {
        if self.rank_profiles.contains_key(&profile.name) {
            return Err(CompileError::structural(
                &self.name,
                format!("rank profile '{}' is already defined", profile.name),
            ));
        }
        self.rank_profiles.insert(profile.name.clone(), profile);

        Ok(())
    }

    /// Declare an imported field; resolution happens during compilation.
    pub fn import_field(&mut self, declaration: ImportDeclaration) {
        self.imported_fields.declared.push(declaration);
    }

    /// Type of a name as readable by an indexing `input`.
    fn readable_type(&self, name: &str) -> Option<DataType> {
        self.get_field(name).map(|f| f.data_type.clone())
    }
}

impl FieldTypeAdapter for Schema {
    fn input_type(&self, field: &str) -> Option<DataType> {
        self.readable_type(field)
    }

    fn output_type(&self, kind: OutputKind, field: &str) -> Option<DataType> {
        match kind {
            OutputKind::Attribute => self.get_attribute(field).map(|a| a.data_type.clone()),
            OutputKind::Index => self
                .concrete_fields()
                .find(|f| f.index_names().iter().any(|n| n == field))
                .map(|f| f.data_type.clone()),
            OutputKind::Summary => {
                let summary = self.summary_field(field)?;
                summary.data_type.clone().or_else(|| {
                    summary
                        .single_source()
                        .and_then(|source| self.readable_type(source))
                })
            }
        }
    }
}
