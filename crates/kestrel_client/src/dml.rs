use crate::errors::{ClientError, Result};
use crate::expr::Expr;
use crate::state::{normalize_whitespace, QueryState};
use crate::table::{KeyList, Table};

/// Pending `update ... set ...` statement.
///
/// The view is SQL-polymorphic in an explicit way: [`TableUpdate::to_statement`]
/// renders the true update, [`TableUpdate::to_underlying_select`] renders the
/// select the accumulated state stands for. There is no implicit mode switch.
#[derive(Debug, Clone)]
pub struct TableUpdate {
    table: Table,
    assignments: Vec<(String, String)>,
}

impl TableUpdate {
    /// Narrow the update with another predicate.
    pub fn filter(&self, cond: impl Into<Expr>) -> Self {
        Self {
            table: self.table.filter(cond),
            assignments: self.assignments.clone(),
        }
    }

    /// The true update statement.
    pub fn to_statement(&self) -> String {
        let state = self.table.state();
        let set = self
            .assignments
            .iter()
            .map(|(col, expr)| format!("{col}={expr}"))
            .collect::<Vec<_>>()
            .join(",");

        let text = if state.merge_for_update {
            // Updates against a join target the physical left table and pull
            // the join in through a from clause.
            let target = state
                .left_identity
                .as_deref()
                .unwrap_or(state.identity.as_str());
            format!(
                "update {target} set {set} from {} {} {}",
                state.identity,
                state.where_clause().unwrap_or_default(),
                state.group_clause().unwrap_or_default(),
            )
        } else {
            format!(
                "update {} set {set} {} {} {}",
                state.identity,
                state.where_clause().unwrap_or_default(),
                state.group_clause().unwrap_or_default(),
                state.having_clause().unwrap_or_default(),
            )
        };
        normalize_whitespace(&text)
    }

    /// The equivalent select, as if the update had not been requested.
    pub fn to_underlying_select(&self) -> String {
        self.table.state().render()
    }

    /// Dispatch the update and return a handle to the updated table.
    pub fn execute(&self) -> Result<Table> {
        self.table.run(&self.to_statement())?;

        let state = self.table.state();
        let identity = if state.merge_for_update {
            state
                .left_identity
                .clone()
                .unwrap_or_else(|| state.identity.clone())
        } else {
            state.identity.clone()
        };
        // Lifetime sharing is re-established: the handle aliases the same
        // remote object as the original.
        Ok(self.table.with_state(QueryState::named(identity, true), false))
    }
}

/// Pending `delete from ...` statement, with the same explicit dual render.
#[derive(Debug, Clone)]
pub struct TableDelete {
    table: Table,
}

impl TableDelete {
    pub fn filter(&self, cond: impl Into<Expr>) -> Self {
        Self {
            table: self.table.filter(cond),
        }
    }

    pub fn to_statement(&self) -> String {
        let state = self.table.state();
        normalize_whitespace(&format!(
            "delete from {} {}",
            state.identity,
            state.where_clause().unwrap_or_default()
        ))
    }

    pub fn to_underlying_select(&self) -> String {
        self.table.state().render()
    }

    pub fn execute(&self) -> Result<Table> {
        self.table.run(&self.to_statement())?;
        let identity = self.table.state().identity.clone();
        Ok(self.table.with_state(QueryState::named(identity, true), false))
    }
}

impl Table {
    /// Begin an update: one value expression per column.
    pub fn update(
        &self,
        cols: impl Into<KeyList>,
        values: impl Into<KeyList>,
    ) -> Result<TableUpdate> {
        let cols = cols.into().0;
        let values = values.into().0;
        if cols.len() != values.len() {
            return Err(ClientError::UpdateShapeMismatch {
                columns: cols.len(),
                values: values.len(),
            });
        }
        Ok(TableUpdate {
            table: self.clone(),
            assignments: cols.into_iter().zip(values).collect(),
        })
    }

    /// Begin a delete against this table.
    pub fn delete(&self) -> TableDelete {
        TableDelete {
            table: self.clone(),
        }
    }
}
