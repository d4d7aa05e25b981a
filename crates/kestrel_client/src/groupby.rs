use crate::errors::{ClientError, Result};
use crate::expr::Expr;
use crate::session::{Reply, TableData};
use crate::state::GroupMode;
use crate::table::{Ascending, KeyList, Table};

/// Aggregate-function spec for [`TableGroupby::agg`].
#[derive(Debug, Clone)]
pub enum AggregateSpec {
    /// One function applied to every non-key column.
    Single(String),
    /// Several functions, each applied to every non-key column.
    List(Vec<String>),
    /// Explicit functions per column.
    PerColumn(Vec<(String, Vec<String>)>),
}

impl From<&str> for AggregateSpec {
    fn from(value: &str) -> Self {
        Self::Single(value.to_string())
    }
}

impl From<String> for AggregateSpec {
    fn from(value: String) -> Self {
        Self::Single(value)
    }
}

impl From<Vec<&str>> for AggregateSpec {
    fn from(value: Vec<&str>) -> Self {
        Self::List(value.into_iter().map(str::to_string).collect())
    }
}

impl From<Vec<String>> for AggregateSpec {
    fn from(value: Vec<String>) -> Self {
        Self::List(value)
    }
}

impl<const N: usize> From<[&str; N]> for AggregateSpec {
    fn from(value: [&str; N]) -> Self {
        Self::List(value.iter().map(|s| s.to_string()).collect())
    }
}

impl From<Vec<(&str, Vec<&str>)>> for AggregateSpec {
    fn from(value: Vec<(&str, Vec<&str>)>) -> Self {
        Self::PerColumn(
            value
                .into_iter()
                .map(|(col, funcs)| {
                    (
                        col.to_string(),
                        funcs.into_iter().map(str::to_string).collect(),
                    )
                })
                .collect(),
        )
    }
}

/// Expand an aggregate spec against the table's projection, skipping the
/// group keys, and return a new table whose select list is the keys followed
/// by the aggregate expressions.
fn expand_agg(table: &Table, keys: &[String], spec: AggregateSpec) -> Result<Table> {
    let base: Vec<String> = {
        let select = &table.state().select_list;
        if select.is_empty() || select.iter().any(|c| c == "*") {
            table.col_names()?
        } else {
            select.clone()
        }
    };

    let aggs: Vec<String> = match spec {
        AggregateSpec::Single(func) => {
            if func.is_empty() {
                return Err(ClientError::InvalidAggregateSpec(
                    "empty function name".to_string(),
                ));
            }
            base.iter()
                .filter(|col| !keys.contains(col))
                .map(|col| format!("{func}({col})"))
                .collect()
        }
        AggregateSpec::List(funcs) => {
            if funcs.is_empty() {
                return Err(ClientError::InvalidAggregateSpec(
                    "empty function list".to_string(),
                ));
            }
            base.iter()
                .filter(|col| !keys.contains(col))
                .flat_map(|col| funcs.iter().map(move |func| format!("{func}({col})")))
                .collect()
        }
        AggregateSpec::PerColumn(pairs) => {
            if pairs.is_empty() || pairs.iter().any(|(_, funcs)| funcs.is_empty()) {
                return Err(ClientError::InvalidAggregateSpec(
                    "empty per-column function mapping".to_string(),
                ));
            }
            pairs
                .iter()
                .flat_map(|(col, funcs)| funcs.iter().map(move |func| format!("{func}({col})")))
                .collect()
        }
    };

    Ok(project_grouped(table, keys, aggs))
}

/// Two-argument aggregate expansion, e.g. `wavg(price,qty)`.
fn expand_agg2(table: &Table, keys: &[String], func: &str, pairs: &[(&str, &str)]) -> Result<Table> {
    if pairs.is_empty() {
        return Err(ClientError::InvalidAggregateSpec(
            "agg2 needs at least one column pair".to_string(),
        ));
    }
    let aggs = pairs
        .iter()
        .map(|(x, w)| format!("{func}({x},{w})"))
        .collect();
    Ok(project_grouped(table, keys, aggs))
}

fn project_grouped(table: &Table, keys: &[String], aggs: Vec<String>) -> Table {
    // Mutate the projection directly: going through `select` would wrap a
    // non-materialized state into a subquery and lose the group clause.
    let mut state = table.state().clone();
    state.select_list = keys.to_vec();
    state.select_list.extend(aggs);
    table.with_state(state, false)
}

macro_rules! agg_fn {
    ($name:ident) => {
        pub fn $name(&self) -> Result<Table> {
            self.agg(stringify!($name))
        }
    };
}

macro_rules! agg2_fn {
    ($name:ident) => {
        pub fn $name(&self, pairs: &[(&str, &str)]) -> Result<Table> {
            self.agg2(stringify!($name), pairs)
        }
    };
    ($name:ident, $func:literal) => {
        pub fn $name(&self, pairs: &[(&str, &str)]) -> Result<Table> {
            self.agg2($func, pairs)
        }
    };
}

macro_rules! grouped_agg_impls {
    ($ty:ident) => {
        impl $ty {
            /// Expand an aggregate spec into the projection.
            pub fn agg(&self, spec: impl Into<AggregateSpec>) -> Result<Table> {
                expand_agg(&self.table, &self.keys, spec.into())
            }

            /// Apply one two-argument aggregate per `(column, weight)` pair.
            pub fn agg2(&self, func: &str, pairs: &[(&str, &str)]) -> Result<Table> {
                expand_agg2(&self.table, &self.keys, func, pairs)
            }

            agg_fn! {sum}

            agg_fn! {avg}

            agg_fn! {count}

            agg_fn! {max}

            agg_fn! {min}

            agg_fn! {first}

            agg_fn! {last}

            agg_fn! {std}

            agg_fn! {var}

            agg2_fn! {wavg}

            agg2_fn! {wsum}

            agg2_fn! {covar}

            agg2_fn! {corr}

            agg2_fn! {at_imax, "atImax"}

            agg2_fn! {at_imin, "atImin"}

            /// The wrapped table, with the grouping clause applied.
            pub fn table(&self) -> &Table {
                &self.table
            }

            pub fn show_sql(&self) -> String {
                self.table.show_sql()
            }

            pub fn to_table(&self) -> Result<TableData> {
                self.table.to_table()
            }

            pub fn execute(&self) -> Result<Reply> {
                self.table.execute()
            }
        }
    };
}

/// Row-collapsing grouped view over a table.
#[derive(Debug, Clone)]
pub struct TableGroupby {
    table: Table,
    keys: Vec<String>,
}

grouped_agg_impls! {TableGroupby}

impl TableGroupby {
    pub fn having(&self, cond: impl Into<Expr>) -> Self {
        Self {
            table: self.table.having(cond),
            keys: self.keys.clone(),
        }
    }

    pub fn sort(&self, bys: impl Into<KeyList>, ascending: impl Into<Ascending>) -> Result<Self> {
        Ok(Self {
            table: self.table.sort(bys, ascending)?,
            keys: self.keys.clone(),
        })
    }
}

/// Cardinality-preserving grouped view (windowed/cumulative computations).
#[derive(Debug, Clone)]
pub struct TableContextby {
    table: Table,
    keys: Vec<String>,
}

grouped_agg_impls! {TableContextby}

impl TableContextby {
    pub fn having(&self, cond: impl Into<Expr>) -> Self {
        Self {
            table: self.table.having(cond),
            keys: self.keys.clone(),
        }
    }

    pub fn csort(&self, bys: impl Into<KeyList>, ascending: impl Into<Ascending>) -> Result<Self> {
        Ok(Self {
            table: self.table.csort(bys, ascending)?,
            keys: self.keys.clone(),
        })
    }

    pub fn top(&self, count: u64) -> Self {
        Self {
            table: self.table.top(count),
            keys: self.keys.clone(),
        }
    }

    pub fn limit(&self, limit: impl Into<crate::table::Limit>) -> Self {
        Self {
            table: self.table.limit(limit),
            keys: self.keys.clone(),
        }
    }
}

impl Table {
    /// Enter group-by mode. Errors if a grouping or context mode is already
    /// active on this lineage.
    pub fn group_by(&self, keys: impl Into<KeyList>) -> Result<TableGroupby> {
        let keys = keys.into().0;
        let table = self.grouped(GroupMode::GroupBy, keys.clone())?;
        Ok(TableGroupby { table, keys })
    }

    /// Enter context-by mode. Errors if a grouping or context mode is already
    /// active on this lineage.
    pub fn context_by(&self, keys: impl Into<KeyList>) -> Result<TableContextby> {
        let keys = keys.into().0;
        let table = self.grouped(GroupMode::ContextBy, keys.clone())?;
        Ok(TableContextby { table, keys })
    }
}
