//! Tree rewriting.
//!
//! A converter decides per node whether to rewrite it; nodes it declines are
//! rebuilt from their converted children. Rewritten nodes are not revisited.

use crate::{ast::Expression, error::ExpressionError};

///
/// Converter
///

pub trait Converter {
    fn should_convert(&self, exp: &Expression) -> bool;

    /// Rewrite a matched node. `None` deletes it from its parent.
    fn do_convert(&mut self, exp: Expression) -> Result<Option<Expression>, ExpressionError>;

    /// Fresh state for one statement of a script. Stateless converters keep
    /// the default and share `self` across statements.
    fn branch(&self) -> Option<Self>
    where
        Self: Sized,
    {
        None
    }
}

/// Convert a tree depth-first. Returns `None` when the root itself was deleted.
pub fn convert<C: Converter>(
    converter: &mut C,
    exp: Expression,
) -> Result<Option<Expression>, ExpressionError> {
    if converter.should_convert(&exp) {
        return converter.do_convert(exp);
    }

    match exp {
        Expression::Script(statements) => convert_script(converter, statements).map(Some),
        Expression::Statement(children) => convert_statement(converter, children),
        Expression::ForEach(inner) => {
            Ok(convert(converter, *inner)?.map(|inner| Expression::ForEach(Box::new(inner))))
        }
        leaf => Ok(Some(leaf)),
    }
}

/// Convert a script, always yielding a script (possibly with no statements).
pub fn convert_script_root<C: Converter>(
    converter: &mut C,
    script: Expression,
) -> Result<Expression, ExpressionError> {
    Ok(convert(converter, script)?.unwrap_or_else(|| Expression::Script(Vec::new())))
}

fn convert_script<C: Converter>(
    converter: &mut C,
    statements: Vec<Expression>,
) -> Result<Expression, ExpressionError> {
    let mut out = Vec::with_capacity(statements.len());

    for statement in statements {
        let converted = match converter.branch() {
            Some(mut branch) => convert(&mut branch, statement)?,
            None => convert(converter, statement)?,
        };

        match converted {
            Some(statement @ Expression::Statement(_)) => out.push(statement),
            Some(other) => out.push(Expression::Statement(vec![other])),
            None => {}
        }
    }

    Ok(Expression::Script(out))
}

// Rewritten children that are themselves statements are spliced so pipelines
// stay flat; a statement whose every child was deleted disappears.
fn convert_statement<C: Converter>(
    converter: &mut C,
    children: Vec<Expression>,
) -> Result<Option<Expression>, ExpressionError> {
    let had_children = !children.is_empty();
    let mut out = Vec::with_capacity(children.len());

    for child in children {
        let rewritten = converter.should_convert(&child);

        match convert(converter, child)? {
            Some(Expression::Statement(inner)) if rewritten => out.extend(inner),
            Some(other) => out.push(other),
            None => {}
        }
    }

    if had_children && out.is_empty() {
        return Ok(None);
    }

    Ok(Some(Expression::Statement(out)))
}
