//! Indexing-expression language: the AST, the rewrite (`Converter`) and walk
//! (`Visitor`) framework every compilation pass builds on, and static type
//! verification of scripts.

pub mod ast;
pub mod convert;
pub mod error;
pub mod verify;
pub mod visit;


pub use ast::{Constant, Expression, OutputExpression, OutputKind, TokenizeConfig};
pub use convert::{Converter, convert, convert_script_root};
pub use error::ExpressionError;
pub use verify::{FieldTypeAdapter, is_assignable, verify};
pub use visit::Visitor;
