use std::fmt;

use serde::{Deserialize, Serialize};

use crate::errors::Result;

/// Scalar value exchanged with the engine.
///
/// `Display` produces the literal text used when a value is embedded into a
/// statement. String values render as-is; callers embedding string literals
/// into expressions are responsible for quoting them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Double(f64),
    String(String),
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => write!(f, "NULL"),
            Self::Bool(v) => write!(f, "{v}"),
            Self::Int(v) => write!(f, "{v}"),
            Self::Double(v) => write!(f, "{v}"),
            Self::String(v) => write!(f, "{v}"),
        }
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Self::Double(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

/// Column-major tabular payload, both for uploads and for query results.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TableData {
    columns: Vec<(String, Vec<Value>)>,
}

impl TableData {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_column(mut self, name: impl Into<String>, values: Vec<Value>) -> Self {
        self.columns.push((name.into(), values));
        self
    }

    pub fn column_names(&self) -> Vec<String> {
        self.columns.iter().map(|(name, _)| name.clone()).collect()
    }

    pub fn column(&self, name: &str) -> Option<&[Value]> {
        self.columns
            .iter()
            .find(|(col, _)| col == name)
            .map(|(_, values)| values.as_slice())
    }

    pub fn columns(&self) -> &[(String, Vec<Value>)] {
        &self.columns
    }

    pub fn num_columns(&self) -> usize {
        self.columns.len()
    }

    pub fn num_rows(&self) -> usize {
        self.columns.first().map(|(_, v)| v.len()).unwrap_or(0)
    }

    /// Column values as plain lists, in column order.
    pub fn into_lists(self) -> Vec<Vec<Value>> {
        self.columns.into_iter().map(|(_, values)| values).collect()
    }
}

/// Reply from [`Session::run`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Reply {
    Table(TableData),
    Vector(Vec<Value>),
    Scalar(Value),
    None,
}

/// The external execution collaborator.
///
/// The builder only ever hands finished statement text to `run`, pushes local
/// tabular data through `upload`, and consults `is_closed` before issuing
/// cleanup statements. Connection management, the wire protocol, and result
/// decoding all live behind this trait.
pub trait Session: fmt::Debug + Send + Sync {
    fn run(&self, statement: &str) -> Result<Reply>;

    fn upload(&self, name: &str, data: &TableData) -> Result<()>;

    fn is_closed(&self) -> bool;
}
