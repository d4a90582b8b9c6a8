use crate::tensor::TensorType;
use serde::{Deserialize, Serialize};
use std::fmt;

static TAG_ELEMENT: DataType = DataType::String;

///
/// DataType
///
/// Declared type of a document field, struct sub-field, attribute or summary
/// field. Collection and complex kinds carry their payload so callers can
/// match exhaustively instead of probing.
///

#[derive(Clone, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub enum DataType {
    Bool,
    Byte,
    Int,
    Long,
    Float,
    Double,
    String,
    Raw,
    Uri,
    Predicate,

    /// Legacy `tag` type, rewritten to `weightedset<string>` during compilation.
    Tag,

    /// Geo-position struct `{ x: int, y: int }`.
    Position,

    Array(Box<Self>),
    WeightedSet(WeightedSetType),
    Map {
        key: Box<Self>,
        value: Box<Self>,
    },
    Struct(StructType),
    Tensor(TensorType),

    /// Reference to a document of the named document type.
    Reference(String),
}

impl DataType {
    #[must_use]
    pub fn array(element: Self) -> Self {
        Self::Array(Box::new(element))
    }

    #[must_use]
    pub fn weighted_set(element: Self) -> Self {
        Self::WeightedSet(WeightedSetType {
            element: Box::new(element),
            create_if_nonexistent: false,
            remove_if_zero: false,
        })
    }

    /// The weighted set a legacy `tag` field turns into.
    #[must_use]
    pub fn tag_set() -> Self {
        Self::WeightedSet(WeightedSetType {
            element: Box::new(Self::String),
            create_if_nonexistent: true,
            remove_if_zero: true,
        })
    }

    #[must_use]
    pub fn map(key: Self, value: Self) -> Self {
        Self::Map {
            key: Box::new(key),
            value: Box::new(value),
        }
    }

    /// Element type of an array or weighted set.
    #[must_use]
    pub fn element_type(&self) -> Option<&Self> {
        match self {
            Self::Array(element) => Some(element),
            Self::WeightedSet(wset) => Some(&wset.element),
            Self::Tag => Some(&TAG_ELEMENT),
            _ => None,
        }
    }

    /// Innermost non-collection type.
    #[must_use]
    pub fn primitive_type(&self) -> &Self {
        match self.element_type() {
            Some(element) => element.primitive_type(),
            None => self,
        }
    }

    #[must_use]
    pub const fn is_multi_value(&self) -> bool {
        matches!(self, Self::Array(_) | Self::WeightedSet(_) | Self::Tag)
    }

    #[must_use]
    pub const fn is_numeric(&self) -> bool {
        matches!(
            self,
            Self::Byte | Self::Int | Self::Long | Self::Float | Self::Double
        )
    }

    // is_primitive
    // scalar value types that can act as keys and attribute values
    #[must_use]
    pub const fn is_primitive(&self) -> bool {
        matches!(
            self,
            Self::Bool
                | Self::Byte
                | Self::Int
                | Self::Long
                | Self::Float
                | Self::Double
                | Self::String
                | Self::Raw
                | Self::Uri
        )
    }

    #[must_use]
    pub fn is_string(&self) -> bool {
        matches!(self.primitive_type(), Self::String)
    }

    #[must_use]
    pub fn is_uri(&self) -> bool {
        matches!(self.primitive_type(), Self::Uri)
    }

    #[must_use]
    pub fn is_position(&self) -> bool {
        matches!(self.primitive_type(), Self::Position)
    }

    #[must_use]
    pub const fn is_struct(&self) -> bool {
        matches!(self, Self::Struct(_) | Self::Position)
    }

    #[must_use]
    pub const fn is_tensor(&self) -> bool {
        matches!(self, Self::Tensor(_))
    }

    /// Struct, map, or a collection of either.
    #[must_use]
    pub fn is_complex(&self) -> bool {
        match self {
            Self::Struct(_) | Self::Map { .. } => true,
            Self::Array(element) => matches!(**element, Self::Struct(_) | Self::Map { .. }),
            _ => false,
        }
    }

    /// Array of struct, or map from a primitive to a struct.
    #[must_use]
    pub fn is_collection_of_struct(&self) -> bool {
        match self {
            Self::Array(element) => matches!(**element, Self::Struct(_)),
            Self::Map { key, value } => key.is_primitive() && matches!(**value, Self::Struct(_)),
            _ => false,
        }
    }

    /// Map from a primitive to a primitive.
    #[must_use]
    pub fn is_map_of_primitive(&self) -> bool {
        match self {
            Self::Map { key, value } => key.is_primitive() && value.is_primitive(),
            _ => false,
        }
    }

    #[must_use]
    pub const fn as_tensor(&self) -> Option<&TensorType> {
        match self {
            Self::Tensor(tensor) => Some(tensor),
            _ => None,
        }
    }

    #[must_use]
    pub fn collection_type(&self) -> CollectionType {
        match self {
            Self::Array(_) => CollectionType::Array,
            Self::WeightedSet(_) | Self::Tag => CollectionType::WeightedSet,
            _ => CollectionType::Single,
        }
    }

    /// Wrap `inner` in the same collection shape as `self`.
    #[must_use]
    pub fn with_collection_of(&self, inner: Self) -> Self {
        match self {
            Self::Array(_) => Self::array(inner),
            Self::WeightedSet(wset) => Self::WeightedSet(WeightedSetType {
                element: Box::new(inner),
                ..wset.clone()
            }),
            Self::Tag => Self::tag_set(),
            _ => inner,
        }
    }

    /// Structural equality that treats `tag` and every `weightedset<string>`
    /// flag combination as the same type. Other weighted sets must agree on
    /// their flags too.
    #[must_use]
    pub fn matches_ignoring_tag(&self, other: &Self) -> bool {
        match (self.normalized_tag(), other.normalized_tag()) {
            (Self::WeightedSet(a), Self::WeightedSet(b)) if *a.element == Self::String => {
                a.element == b.element
            }
            (Self::Array(a), Self::Array(b)) => a.matches_ignoring_tag(&b),
            (a, b) => a == b,
        }
    }

    fn normalized_tag(&self) -> Self {
        match self {
            Self::Tag => Self::tag_set(),
            other => other.clone(),
        }
    }

    /// Struct fields of the type, with the geo-position struct expanded.
    #[must_use]
    pub fn struct_fields(&self) -> Vec<StructField> {
        match self {
            Self::Struct(st) => st.fields.clone(),
            Self::Position => vec![
                StructField::new("x", Self::Int),
                StructField::new("y", Self::Int),
            ],
            _ => Vec::new(),
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool => f.write_str("bool"),
            Self::Byte => f.write_str("byte"),
            Self::Int => f.write_str("int"),
            Self::Long => f.write_str("long"),
            Self::Float => f.write_str("float"),
            Self::Double => f.write_str("double"),
            Self::String => f.write_str("string"),
            Self::Raw => f.write_str("raw"),
            Self::Uri => f.write_str("uri"),
            Self::Predicate => f.write_str("predicate"),
            Self::Tag => f.write_str("tag"),
            Self::Position => f.write_str("position"),
            Self::Array(element) => write!(f, "array<{element}>"),
            Self::WeightedSet(wset) => write!(f, "weightedset<{}>", wset.element),
            Self::Map { key, value } => write!(f, "map<{key},{value}>"),
            Self::Struct(st) => f.write_str(&st.name),
            Self::Tensor(tensor) => write!(f, "{tensor}"),
            Self::Reference(target) => write!(f, "reference<{target}>"),
        }
    }
}

///
/// WeightedSetType
///

#[derive(Clone, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub struct WeightedSetType {
    pub element: Box<DataType>,

    #[serde(default)]
    pub create_if_nonexistent: bool,

    #[serde(default)]
    pub remove_if_zero: bool,
}

///
/// StructType
///

#[derive(Clone, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub struct StructType {
    pub name: String,
    pub fields: Vec<StructField>,
}

impl StructType {
    #[must_use]
    pub fn new(name: impl Into<String>, fields: Vec<StructField>) -> Self {
        Self {
            name: name.into(),
            fields,
        }
    }
}

///
/// StructField
///

#[derive(Clone, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub struct StructField {
    pub name: String,
    pub data_type: DataType,
}

impl StructField {
    #[must_use]
    pub fn new(name: impl Into<String>, data_type: DataType) -> Self {
        Self {
            name: name.into(),
            data_type,
        }
    }
}

///
/// CollectionType
///

#[derive(Clone, Copy, Debug, Deserialize, derive_more::Display, Eq, PartialEq, Serialize)]
pub enum CollectionType {
    #[display("single")]
    Single,
    #[display("array")]
    Array,
    #[display("weightedset")]
    WeightedSet,
}
