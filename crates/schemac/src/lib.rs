//! ## Crate layout
//! - `types`: data types, tensor types and the shared setting enums.
//! - `expr`: the indexing-expression AST, its rewrite and walk framework,
//!   and script type verification.
//! - `core`: the schema graph, the ordered pass pipeline and every
//!   derivation and validation pass.
//!
//! The `prelude` module holds what a caller needs to build a schema graph
//! and compile it.

pub use schemac_core as core;
pub use schemac_expr as expr;
pub use schemac_types as types;

pub use schemac_core::{Application, CompileError, ErrorClass, FeatureFlags, Pipeline};

use tracing_subscriber::{EnvFilter, fmt};

/// Workspace version re-export for downstream tooling/tests.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Install a `fmt` subscriber for diagnostics forwarded by the default sink.
/// `RUST_LOG` overrides `default_filter`. Does nothing if a global subscriber
/// is already set.
pub fn init_tracing(default_filter: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    let _ = fmt().with_env_filter(filter).with_target(false).try_init();
}

///
/// Prelude
///

pub mod prelude {
    pub use crate::core::prelude::*;
    pub use crate::expr::{Expression, OutputKind};
    pub use crate::types::{
        DataType, MatchType, NormalizeLevel, RankType, Stemming, StructField, StructType,
        TensorType,
    };
}
