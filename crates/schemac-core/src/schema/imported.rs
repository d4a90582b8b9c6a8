use crate::schema::{attribute::Attribute, field::Field};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

///
/// ImportDeclaration
///
/// `import field <reference_field>.<target_field> as <local_name>`
///

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct ImportDeclaration {
    pub local_name: String,
    pub reference_field: String,
    pub target_field: String,
}

impl ImportDeclaration {
    #[must_use]
    pub fn new(
        local_name: impl Into<String>,
        reference_field: impl Into<String>,
        target_field: impl Into<String>,
    ) -> Self {
        Self {
            local_name: local_name.into(),
            reference_field: reference_field.into(),
            target_field: target_field.into(),
        }
    }
}

///
/// ImportedFields
///

#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
pub struct ImportedFields {
    #[serde(default)]
    pub declared: Vec<ImportDeclaration>,

    /// Filled by resolution, keyed by top-level local name.
    #[serde(default)]
    pub resolved: IndexMap<String, ImportedField>,
}

impl ImportedFields {
    /// Imported field by local name, including nested members.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&ImportedField> {
        self.resolved.values().find_map(|field| field.find(name))
    }

    /// Every simple imported field, nested members included.
    #[must_use]
    pub fn simple_fields(&self) -> Vec<&ImportedSimpleField> {
        let mut out = Vec::new();
        for field in self.resolved.values() {
            field.collect_simple(&mut out);
        }

        out
    }
}

///
/// ImportedField
///

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub enum ImportedField {
    Simple(ImportedSimpleField),
    Complex(ImportedComplexField),
}

impl ImportedField {
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::Simple(f) => &f.name,
            Self::Complex(f) => &f.name,
        }
    }

    #[must_use]
    pub fn reference_field(&self) -> &str {
        match self {
            Self::Simple(f) => &f.reference_field,
            Self::Complex(f) => &f.reference_field,
        }
    }

    /// Snapshot of the field in the referenced schema.
    #[must_use]
    pub const fn target_field(&self) -> &Field {
        match self {
            Self::Simple(f) => &f.target_field,
            Self::Complex(f) => &f.target_field,
        }
    }

    /// Attribute as seen from the importing schema.
    #[must_use]
    pub const fn attribute(&self) -> Option<&Attribute> {
        match self {
            Self::Simple(f) => Some(&f.attribute),
            Self::Complex(_) => None,
        }
    }

    fn find(&self, name: &str) -> Option<&Self> {
        if self.name() == name {
            return Some(self);
        }
        match self {
            Self::Simple(_) => None,
            Self::Complex(f) => f.nested.values().find_map(|n| n.find(name)),
        }
    }

    fn collect_simple<'a>(&'a self, out: &mut Vec<&'a ImportedSimpleField>) {
        match self {
            Self::Simple(f) => out.push(f),
            Self::Complex(f) => {
                for nested in f.nested.values() {
                    nested.collect_simple(out);
                }
            }
        }
    }
}

///
/// ImportedSimpleField
///

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct ImportedSimpleField {
    pub name: String,
    pub reference_field: String,
    pub target_field: Field,

    /// The target's attribute, renamed to the local name.
    pub attribute: Attribute,
}

///
/// ImportedComplexField
///
/// Struct, map, array-of-struct or position import; owns its members.
///

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct ImportedComplexField {
    pub name: String,
    pub reference_field: String,
    pub target_field: Field,
    #[serde(default)]
    pub nested: IndexMap<String, ImportedField>,
}
