use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};
use thiserror::Error as ThisError;

///
/// TensorTypeError
///

#[derive(Clone, Debug, Eq, PartialEq, ThisError)]
pub enum TensorTypeError {
    #[error("'{0}' is not a tensor type")]
    NotATensor(String),

    #[error("unknown tensor value type '{0}'")]
    UnknownValueType(String),

    #[error("malformed tensor dimension '{0}'")]
    MalformedDimension(String),

    #[error("duplicate tensor dimension '{0}'")]
    DuplicateDimension(String),
}

///
/// TensorValueType
///

#[derive(
    Clone, Copy, Debug, Default, Deserialize, derive_more::Display, Eq, Hash, PartialEq, Serialize,
)]
#[remain::sorted]
pub enum TensorValueType {
    #[display("bfloat16")]
    BFloat16,
    #[default]
    #[display("double")]
    Double,
    #[display("float")]
    Float,
    #[display("int8")]
    Int8,
}

impl FromStr for TensorValueType {
    type Err = TensorTypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "bfloat16" => Ok(Self::BFloat16),
            "double" => Ok(Self::Double),
            "float" => Ok(Self::Float),
            "int8" => Ok(Self::Int8),
            other => Err(TensorTypeError::UnknownValueType(other.to_string())),
        }
    }
}

///
/// DimensionKind
///

#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub enum DimensionKind {
    /// Dense dimension, with a bound when declared as `x[N]`.
    Indexed(Option<u64>),
    Mapped,
}

///
/// TensorDimension
///

#[derive(Clone, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub struct TensorDimension {
    pub name: String,
    pub kind: DimensionKind,
}

impl TensorDimension {
    #[must_use]
    pub fn indexed(name: impl Into<String>, size: u64) -> Self {
        Self {
            name: name.into(),
            kind: DimensionKind::Indexed(Some(size)),
        }
    }

    #[must_use]
    pub fn mapped(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: DimensionKind::Mapped,
        }
    }

    #[must_use]
    pub const fn is_indexed(&self) -> bool {
        matches!(self.kind, DimensionKind::Indexed(_))
    }

    #[must_use]
    pub const fn is_bound(&self) -> bool {
        matches!(self.kind, DimensionKind::Indexed(Some(_)))
    }
}

impl fmt::Display for TensorDimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            DimensionKind::Indexed(Some(size)) => write!(f, "{}[{size}]", self.name),
            DimensionKind::Indexed(None) => write!(f, "{}[]", self.name),
            DimensionKind::Mapped => write!(f, "{}{{}}", self.name),
        }
    }
}

///
/// TensorType
///
/// Value type plus dimensions; dimensions are kept sorted by name so two
/// spellings of the same type compare equal.
///

#[derive(Clone, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub struct TensorType {
    pub value_type: TensorValueType,
    pub dimensions: Vec<TensorDimension>,
}

impl TensorType {
    #[must_use]
    pub fn new(value_type: TensorValueType, mut dimensions: Vec<TensorDimension>) -> Self {
        dimensions.sort_by(|a, b| a.name.cmp(&b.name));

        Self {
            value_type,
            dimensions,
        }
    }

    /// A scalar (dimensionless) double tensor.
    #[must_use]
    pub const fn scalar() -> Self {
        Self {
            value_type: TensorValueType::Double,
            dimensions: Vec::new(),
        }
    }

    pub fn indexed_dimensions(&self) -> impl Iterator<Item = &TensorDimension> {
        self.dimensions.iter().filter(|d| d.is_indexed())
    }

    pub fn mapped_dimensions(&self) -> impl Iterator<Item = &TensorDimension> {
        self.dimensions.iter().filter(|d| !d.is_indexed())
    }

    /// Every dimension is indexed and bound.
    #[must_use]
    pub fn is_dense(&self) -> bool {
        !self.dimensions.is_empty() && self.dimensions.iter().all(TensorDimension::is_bound)
    }

    /// Shape accepted by an HNSW index: exactly one bound indexed dimension,
    /// optionally combined with a single mapped dimension.
    #[must_use]
    pub fn is_valid_for_nearest_neighbor(&self) -> bool {
        let indexed: Vec<_> = self.indexed_dimensions().collect();
        let mapped = self.mapped_dimensions().count();

        indexed.len() == 1 && indexed[0].is_bound() && mapped <= 1
    }
}

impl fmt::Display for TensorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("tensor")?;
        if self.value_type != TensorValueType::Double {
            write!(f, "<{}>", self.value_type)?;
        }
        f.write_str("(")?;
        for (i, dim) in self.dimensions.iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            write!(f, "{dim}")?;
        }
        f.write_str(")")
    }
}

impl FromStr for TensorType {
    type Err = TensorTypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let compact: String = s.chars().filter(|c| !c.is_whitespace()).collect();
        let rest = compact
            .strip_prefix("tensor")
            .ok_or_else(|| TensorTypeError::NotATensor(s.to_string()))?;

        let (value_type, rest) = if let Some(rest) = rest.strip_prefix('<') {
            let (vt, rest) = rest
                .split_once('>')
                .ok_or_else(|| TensorTypeError::NotATensor(s.to_string()))?;
            (vt.parse::<TensorValueType>()?, rest)
        } else {
            (TensorValueType::Double, rest)
        };

        let body = rest
            .strip_prefix('(')
            .and_then(|r| r.strip_suffix(')'))
            .ok_or_else(|| TensorTypeError::NotATensor(s.to_string()))?;

        let mut dimensions: Vec<TensorDimension> = Vec::new();
        for spec in body.split(',').filter(|d| !d.is_empty()) {
            let dim = parse_dimension(spec)?;
            if dimensions.iter().any(|d| d.name == dim.name) {
                return Err(TensorTypeError::DuplicateDimension(dim.name));
            }
            dimensions.push(dim);
        }

        Ok(Self::new(value_type, dimensions))
    }
}

fn parse_dimension(spec: &str) -> Result<TensorDimension, TensorTypeError> {
    let malformed = || TensorTypeError::MalformedDimension(spec.to_string());

    if let Some(name) = spec.strip_suffix("{}") {
        if !is_dimension_name(name) {
            return Err(malformed());
        }
        return Ok(TensorDimension::mapped(name));
    }

    let (name, size) = spec
        .strip_suffix(']')
        .and_then(|r| r.split_once('['))
        .ok_or_else(malformed)?;
    if !is_dimension_name(name) {
        return Err(malformed());
    }

    let kind = if size.is_empty() {
        DimensionKind::Indexed(None)
    } else {
        DimensionKind::Indexed(Some(size.parse().map_err(|_| malformed())?))
    };

    Ok(TensorDimension {
        name: name.to_string(),
        kind,
    })
}

fn is_dimension_name(name: &str) -> bool {
    let mut chars = name.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_dense_and_mixed_types() {
        let dense: TensorType = "tensor<float>(x[3])".parse().unwrap();
        assert_eq!(dense.value_type, TensorValueType::Float);
        assert!(dense.is_dense());
        assert!(dense.is_valid_for_nearest_neighbor());

        let mixed: TensorType = "tensor<int8>(p{}, x[8])".parse().unwrap();
        assert!(!mixed.is_dense());
        assert!(mixed.is_valid_for_nearest_neighbor());
        assert_eq!(mixed.to_string(), "tensor<int8>(p{},x[8])");
    }

    #[test]
    fn dimension_order_does_not_affect_equality() {
        let a: TensorType = "tensor(y[2],x[3])".parse().unwrap();
        let b: TensorType = "tensor(x[3],y[2])".parse().unwrap();

        assert_eq!(a, b);
        assert_eq!(a.to_string(), "tensor(x[3],y[2])");
        assert!(!a.is_valid_for_nearest_neighbor());
    }

    #[test]
    fn rejects_malformed_types() {
        assert!(matches!(
            "vector(x[3])".parse::<TensorType>(),
            Err(TensorTypeError::NotATensor(_))
        ));
        assert!(matches!(
            "tensor<half>(x[3])".parse::<TensorType>(),
            Err(TensorTypeError::UnknownValueType(_))
        ));
        assert!(matches!(
            "tensor(x[3],x{})".parse::<TensorType>(),
            Err(TensorTypeError::DuplicateDimension(_))
        ));
        assert!(matches!(
            "tensor(x[three])".parse::<TensorType>(),
            Err(TensorTypeError::MalformedDimension(_))
        ));
    }

    #[test]
    fn scalar_tensor_renders_without_dimensions() {
        assert_eq!(TensorType::scalar().to_string(), "tensor()");
        assert_eq!("tensor()".parse::<TensorType>().unwrap(), TensorType::scalar());
    }
}
