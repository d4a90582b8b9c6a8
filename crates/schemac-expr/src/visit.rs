use crate::{
    ast::{Expression, OutputExpression, OutputKind},
    error::ExpressionError,
};

///
/// Visitor
///
/// Read-only depth-first walk. Returning an error stops the walk.
///

pub trait Visitor {
    fn visit(&mut self, exp: &Expression) -> Result<(), ExpressionError>;
}

impl<F> Visitor for F
where
    F: FnMut(&Expression) -> Result<(), ExpressionError>,
{
    fn visit(&mut self, exp: &Expression) -> Result<(), ExpressionError> {
        self(exp)
    }
}

impl Expression {
    /// Visit this node, then its children in order.
    pub fn accept<V: Visitor + ?Sized>(&self, visitor: &mut V) -> Result<(), ExpressionError> {
        visitor.visit(self)?;
        self.drive(visitor)
    }

    fn drive<V: Visitor + ?Sized>(&self, visitor: &mut V) -> Result<(), ExpressionError> {
        for child in self.children() {
            child.accept(visitor)?;
        }

        Ok(())
    }

    /// Every node of the tree in visiting order.
    #[must_use]
    pub fn nodes(&self) -> Vec<&Self> {
        let mut out = vec![self];
        for child in self.children() {
            out.extend(child.nodes());
        }
        out
    }

    #[must_use]
    pub fn outputs(&self) -> Vec<&OutputExpression> {
        self.nodes()
            .into_iter()
            .filter_map(Self::as_output)
            .collect()
    }

    /// Target names of every output of the given kind.
    #[must_use]
    pub fn output_fields(&self, kind: OutputKind) -> Vec<&str> {
        self.outputs()
            .into_iter()
            .filter(|o| o.kind == kind)
            .filter_map(|o| o.field.as_deref())
            .collect()
    }

    #[must_use]
    pub fn has_output(&self, kind: OutputKind) -> bool {
        self.outputs().iter().any(|o| o.kind == kind)
    }

    #[must_use]
    pub fn input_fields(&self) -> Vec<&str> {
        self.nodes()
            .into_iter()
            .filter_map(|n| match n {
                Self::Input(Some(field)) => Some(field.as_str()),
                _ => None,
            })
            .collect()
    }

    #[must_use]
    pub fn contains(&self, predicate: impl Fn(&Self) -> bool) -> bool {
        self.nodes().into_iter().any(predicate)
    }
}
