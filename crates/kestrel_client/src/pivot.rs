use crate::errors::{ClientError, Result};
use crate::session::{Reply, TableData, Value};
use crate::state::normalize_whitespace;
use crate::table::Table;

/// Pivoted view: one key spreads across rows, the other across columns.
///
/// The pivot clause is a terminal clause in the dialect; the view renders the
/// wrapped state and appends it.
#[derive(Debug, Clone)]
pub struct TablePivotBy {
    table: Table,
    row: String,
    column: String,
    value: Option<String>,
    agg: Option<String>,
}

impl TablePivotBy {
    /// Cell value expression; without one the projection is left as-is.
    pub fn value(mut self, value: impl Into<String>) -> Self {
        self.value = Some(value.into());
        self
    }

    /// Aggregate applied to the cell value when a row/column pair collides.
    pub fn agg(mut self, func: impl Into<String>) -> Self {
        self.agg = Some(func.into());
        self
    }

    pub fn show_sql(&self) -> String {
        let mut state = self.table.state().clone();
        match (&self.value, &self.agg) {
            (Some(value), Some(func)) => state.select_list = vec![format!("{func}({value})")],
            (Some(value), None) => state.select_list = vec![value.clone()],
            (None, _) => {}
        }
        normalize_whitespace(&format!(
            "{} pivot by {},{}",
            state.render(),
            self.row,
            self.column
        ))
    }

    pub fn execute(&self) -> Result<Reply> {
        self.table.run(&self.show_sql())
    }

    pub fn to_table(&self) -> Result<TableData> {
        let statement = self.show_sql();
        match self.table.run(&statement)? {
            Reply::Table(data) => Ok(data),
            other => Err(ClientError::UnexpectedReply {
                statement,
                reason: format!("expected a table, got {other:?}"),
            }),
        }
    }

    pub fn to_list(&self) -> Result<Vec<Vec<Value>>> {
        Ok(self.to_table()?.into_lists())
    }
}

impl Table {
    /// Pivot the table over a row key and a column key.
    pub fn pivot_by(&self, row: impl Into<String>, column: impl Into<String>) -> TablePivotBy {
        TablePivotBy {
            table: self.clone(),
            row: row.into(),
            column: column.into(),
            value: None,
            agg: None,
        }
    }
}
