//! Client-side lazy query builder for the Kestrel columnar engine.
//!
//! Queries are accumulated through chained verbs (`select`, `filter`,
//! `group_by`, `merge`, ...); every verb copies the current state and returns
//! a new handle, so earlier handles are never disturbed. No statement text is
//! rendered and nothing touches the network until a materialization call
//! (`to_table`, `to_list`, `execute`, `execute_as`) hands the rendered
//! statement to the [`Session`] collaborator.
//!
//! The session itself — connection management, authentication, the wire
//! protocol, result decoding — lives behind the [`Session`] trait and is not
//! part of this crate.

mod dml;
mod groupby;
mod join;
mod pivot;
mod state;
mod table;

pub mod errors;
pub mod expr;
pub mod session;

#[cfg(test)]
pub(crate) mod testutil;

pub use crate::dml::{TableDelete, TableUpdate};
pub use crate::errors::{ClientError, Result};
pub use crate::expr::{ColumnRef, Expr};
pub use crate::groupby::{AggregateSpec, TableContextby, TableGroupby};
pub use crate::join::{JoinKind, JoinSpec, WindowSpec};
pub use crate::pivot::TablePivotBy;
pub use crate::session::{Reply, Session, TableData, Value};
pub use crate::table::{Ascending, KeyList, Limit, Table};
