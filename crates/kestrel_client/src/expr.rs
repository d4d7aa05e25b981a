use std::fmt;
use std::ops;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::errors::{ClientError, Result};
use crate::session::{Reply, Session, Value};

/// Lazily composed scalar expression.
///
/// An expression is plain text the engine will eventually parse; composition
/// here is purely textual. `BinOp` renders fully parenthesized, so nesting is
/// unambiguous without an operator-precedence table, and any operator string
/// is accepted at construction. Malformed operators surface as remote errors
/// at execution time, never here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Expr {
    Raw(String),
    BinOp {
        left: Box<Expr>,
        op: String,
        right: Box<Expr>,
    },
}

macro_rules! expr_binop_fn {
    ($name:ident, $op:literal) => {
        pub fn $name(self, other: impl Into<Expr>) -> Expr {
            Expr::binary(self, $op, other)
        }
    };
}

impl Expr {
    pub fn raw(text: impl Into<String>) -> Self {
        Self::Raw(text.into())
    }

    pub fn binary(left: impl Into<Expr>, op: impl Into<String>, right: impl Into<Expr>) -> Self {
        Self::BinOp {
            left: Box::new(left.into()),
            op: op.into(),
            right: Box::new(right.into()),
        }
    }

    expr_binop_fn! {eq, "=="}

    expr_binop_fn! {ne, "!="}

    expr_binop_fn! {lt, "<"}

    expr_binop_fn! {le, "<="}

    expr_binop_fn! {gt, ">"}

    expr_binop_fn! {ge, ">="}

    expr_binop_fn! {and, "and"}

    expr_binop_fn! {or, "or"}

    /// Rendered statement fragment.
    pub fn sql(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Raw(text) => write!(f, "{text}"),
            Self::BinOp { left, op, right } => write!(f, "({left} {op} {right})"),
        }
    }
}

impl From<&str> for Expr {
    fn from(value: &str) -> Self {
        Self::raw(value)
    }
}

impl From<String> for Expr {
    fn from(value: String) -> Self {
        Self::Raw(value)
    }
}

impl From<i32> for Expr {
    fn from(value: i32) -> Self {
        Self::Raw(value.to_string())
    }
}

impl From<i64> for Expr {
    fn from(value: i64) -> Self {
        Self::Raw(value.to_string())
    }
}

impl From<f64> for Expr {
    fn from(value: f64) -> Self {
        Self::Raw(value.to_string())
    }
}

impl From<bool> for Expr {
    fn from(value: bool) -> Self {
        Self::Raw(value.to_string())
    }
}

impl From<Value> for Expr {
    fn from(value: Value) -> Self {
        Self::Raw(value.to_string())
    }
}

macro_rules! expr_std_op {
    ($trait:ident, $fn:ident, $op:literal) => {
        impl<R: Into<Expr>> ops::$trait<R> for Expr {
            type Output = Expr;

            fn $fn(self, rhs: R) -> Expr {
                Expr::binary(self, $op, rhs)
            }
        }

        impl<R: Into<Expr>> ops::$trait<R> for ColumnRef {
            type Output = Expr;

            fn $fn(self, rhs: R) -> Expr {
                Expr::binary(self, $op, rhs)
            }
        }
    };
}

expr_std_op! {Add, add, "+"}
expr_std_op! {Sub, sub, "-"}
expr_std_op! {Mul, mul, "*"}
expr_std_op! {Div, div, "/"}
expr_std_op! {Rem, rem, "%"}
expr_std_op! {Shl, shl, "<<"}
expr_std_op! {Shr, shr, ">>"}
expr_std_op! {BitAnd, bitand, "and"}
expr_std_op! {BitOr, bitor, "or"}

/// Reference to a named column of a specific table identity.
///
/// Combining a column reference with an operator never touches the network;
/// it only builds an [`Expr`] over the bare column name. The one eager
/// operation is [`ColumnRef::as_series`].
#[derive(Debug, Clone)]
pub struct ColumnRef {
    table: String,
    name: String,
    session: Arc<dyn Session>,
    cached: Arc<Mutex<Option<Vec<Value>>>>,
}

macro_rules! column_cmp_fn {
    ($name:ident, $op:literal) => {
        pub fn $name(&self, other: impl Into<Expr>) -> Expr {
            Expr::binary(Expr::raw(&self.name), $op, other)
        }
    };
}

impl ColumnRef {
    pub(crate) fn new(session: Arc<dyn Session>, table: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            name: name.into(),
            session,
            cached: Arc::new(Mutex::new(None)),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn table_name(&self) -> &str {
        &self.table
    }

    column_cmp_fn! {eq, "=="}

    column_cmp_fn! {ne, "!="}

    column_cmp_fn! {lt, "<"}

    column_cmp_fn! {le, "<="}

    column_cmp_fn! {gt, ">"}

    column_cmp_fn! {ge, ">="}

    /// Eagerly fetch the column's values.
    ///
    /// With `use_cache` set, a previously fetched result is returned without
    /// another round trip.
    pub fn as_series(&self, use_cache: bool) -> Result<Vec<Value>> {
        if use_cache {
            if let Some(values) = self.cached.lock().as_ref() {
                return Ok(values.clone());
            }
        }

        let statement = format!("{}.{}", self.table, self.name);
        tracing::debug!(%statement, "fetching column");
        let values = match self.session.run(&statement)? {
            Reply::Vector(values) => values,
            Reply::Scalar(value) => vec![value],
            other => {
                return Err(ClientError::UnexpectedReply {
                    statement,
                    reason: format!("expected a vector, got {other:?}"),
                })
            }
        };

        *self.cached.lock() = Some(values.clone());
        Ok(values)
    }
}

impl From<ColumnRef> for Expr {
    fn from(value: ColumnRef) -> Self {
        Self::Raw(value.name)
    }
}

impl From<&ColumnRef> for Expr {
    fn from(value: &ColumnRef) -> Self {
        Self::Raw(value.name.clone())
    }
}
