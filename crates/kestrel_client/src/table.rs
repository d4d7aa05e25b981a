use std::sync::Arc;

use parking_lot::Mutex;
use uuid::Uuid;

use crate::errors::{ClientError, Result};
use crate::expr::{ColumnRef, Expr};
use crate::session::{Reply, Session, TableData, Value};
use crate::state::{GroupMode, QueryState};

pub(crate) const TEMP_TABLE_PREFIX: &str = "tmp_tbl_";

pub(crate) fn generate_temp_name() -> String {
    format!("{TEMP_TABLE_PREFIX}{}", Uuid::new_v4().simple())
}

/// Owner of a server-side temporary table.
///
/// Held behind an `Arc` so that every facade aliasing the same remote
/// temporary shares one guard; the drop of the last alias issues the cleanup
/// statement. Cleanup errors are logged and swallowed, never propagated.
#[derive(Debug)]
pub(crate) struct TempTableGuard {
    name: String,
    session: Arc<dyn Session>,
}

impl TempTableGuard {
    pub(crate) fn new(session: Arc<dyn Session>, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            session,
        }
    }
}

impl Drop for TempTableGuard {
    fn drop(&mut self) {
        // Only names following the generated convention are ours to undef;
        // composite expressions never name a concrete object.
        if !self.name.starts_with(TEMP_TABLE_PREFIX) || self.name.contains('(') {
            return;
        }
        if self.session.is_closed() {
            return;
        }
        if let Err(err) = self.session.run(&format!("undef(\"{}\")", self.name)) {
            tracing::warn!(%err, table = %self.name, "failed to undef remote temporary");
        }
    }
}

/// Ordered list of column names or column expressions.
#[derive(Debug, Clone, Default)]
pub struct KeyList(pub Vec<String>);

impl From<&str> for KeyList {
    fn from(value: &str) -> Self {
        Self(vec![value.to_string()])
    }
}

impl From<String> for KeyList {
    fn from(value: String) -> Self {
        Self(vec![value])
    }
}

impl From<Vec<String>> for KeyList {
    fn from(value: Vec<String>) -> Self {
        Self(value)
    }
}

impl From<Vec<&str>> for KeyList {
    fn from(value: Vec<&str>) -> Self {
        Self(value.into_iter().map(str::to_string).collect())
    }
}

impl From<&[&str]> for KeyList {
    fn from(value: &[&str]) -> Self {
        Self(value.iter().map(|s| s.to_string()).collect())
    }
}

impl<const N: usize> From<[&str; N]> for KeyList {
    fn from(value: [&str; N]) -> Self {
        Self(value.iter().map(|s| s.to_string()).collect())
    }
}

/// Sort direction spec: one flag broadcast to every key, or one flag per key.
#[derive(Debug, Clone)]
pub enum Ascending {
    Uniform(bool),
    PerKey(Vec<bool>),
}

impl From<bool> for Ascending {
    fn from(value: bool) -> Self {
        Self::Uniform(value)
    }
}

impl From<Vec<bool>> for Ascending {
    fn from(value: Vec<bool>) -> Self {
        Self::PerKey(value)
    }
}

impl<const N: usize> From<[bool; N]> for Ascending {
    fn from(value: [bool; N]) -> Self {
        Self::PerKey(value.to_vec())
    }
}

/// Suffix sort keys with ` desc` according to the ascending spec.
pub(crate) fn apply_ascending(keys: Vec<String>, ascending: Ascending) -> Result<Vec<String>> {
    let flags = match ascending {
        Ascending::Uniform(flag) => vec![flag; keys.len()],
        Ascending::PerKey(flags) => {
            if flags.len() != keys.len() {
                return Err(ClientError::AscendingLengthMismatch {
                    flags: flags.len(),
                    keys: keys.len(),
                });
            }
            flags
        }
    };

    Ok(keys
        .into_iter()
        .zip(flags)
        .map(|(key, asc)| if asc { key } else { format!("{key} desc") })
        .collect())
}

/// Row-count or row-range limit.
#[derive(Debug, Clone, Copy)]
pub enum Limit {
    Count(i64),
    Range(i64, i64),
}

impl Limit {
    fn spec(&self) -> String {
        match self {
            Self::Count(n) => n.to_string(),
            Self::Range(offset, count) => format!("{offset},{count}"),
        }
    }
}

impl From<i64> for Limit {
    fn from(value: i64) -> Self {
        Self::Count(value)
    }
}

impl From<(i64, i64)> for Limit {
    fn from(value: (i64, i64)) -> Self {
        Self::Range(value.0, value.1)
    }
}

impl From<[i64; 2]> for Limit {
    fn from(value: [i64; 2]) -> Self {
        Self::Range(value[0], value[1])
    }
}

/// Lazy handle to a remote table expression.
///
/// Every verb copies the accumulated [`QueryState`] and returns a new handle;
/// nothing reaches the session until a materialization call (`to_table`,
/// `to_list`, `execute`, `execute_as`) renders the state into statement text.
#[derive(Debug, Clone)]
pub struct Table {
    session: Arc<dyn Session>,
    state: QueryState,
    schema_cache: Arc<Mutex<Option<Vec<String>>>>,
    temps: Vec<Arc<TempTableGuard>>,
}

impl Table {
    /// Handle to an existing remote table.
    pub fn from_remote(session: Arc<dyn Session>, name: impl Into<String>) -> Self {
        Self {
            session,
            state: QueryState::named(name, true),
            schema_cache: Arc::new(Mutex::new(None)),
            temps: Vec::new(),
        }
    }

    /// Load a table from a database path, optionally scoped to partitions,
    /// into a reference-counted remote temporary.
    pub fn load(
        session: Arc<dyn Session>,
        database: &str,
        name: &str,
        partitions: Option<&[&str]>,
    ) -> Result<Self> {
        let temp = generate_temp_name();
        let statement = match partitions {
            Some(parts) => format!(
                "{temp} = loadTable(\"{database}\", \"{name}\", [{}])",
                quote_names(parts)
            ),
            None => format!("{temp} = loadTable(\"{database}\", \"{name}\")"),
        };
        tracing::debug!(%statement, "loading remote table");
        session.run(&statement)?;

        let guard = Arc::new(TempTableGuard::new(session.clone(), temp.clone()));
        Ok(Self {
            session,
            state: QueryState::named(temp, true),
            schema_cache: Arc::new(Mutex::new(None)),
            temps: vec![guard],
        })
    }

    /// Upload local tabular data as a reference-counted remote temporary.
    pub fn from_data(session: Arc<dyn Session>, data: TableData) -> Result<Self> {
        let temp = generate_temp_name();
        session.upload(&temp, &data)?;

        let guard = Arc::new(TempTableGuard::new(session.clone(), temp.clone()));
        Ok(Self {
            session,
            state: QueryState::named(temp, true),
            schema_cache: Arc::new(Mutex::new(Some(data.column_names()))),
            temps: vec![guard],
        })
    }

    /// Opt out of temporary lifecycle management; the caller becomes
    /// responsible for explicit cleanup.
    pub fn unmanaged(mut self) -> Self {
        self.temps.clear();
        self
    }

    pub(crate) fn state(&self) -> &QueryState {
        &self.state
    }

    /// Copy-on-write: a new facade over `state`, sharing session and temp
    /// lifetime. The schema cache is carried over only while the column
    /// shape is unchanged.
    pub(crate) fn with_state(&self, state: QueryState, keep_schema: bool) -> Self {
        Self {
            session: self.session.clone(),
            schema_cache: if keep_schema {
                self.schema_cache.clone()
            } else {
                Arc::new(Mutex::new(None))
            },
            temps: self.temps.clone(),
            state,
        }
    }

    /// Facade over a join result, keeping both operands' temporaries alive.
    pub(crate) fn with_joined_state(&self, state: QueryState, left: &Table, right: &Table) -> Self {
        let mut joined = self.with_state(state, false);
        joined.temps = left.temps.clone();
        joined.temps.extend(right.temps.iter().cloned());
        joined
    }

    pub(crate) fn run(&self, statement: &str) -> Result<Reply> {
        tracing::debug!(%statement, "running statement");
        self.session.run(statement)
    }

    // ---- transitions ------------------------------------------------------

    pub fn select(&self, cols: impl Into<KeyList>) -> Self {
        self.project(cols.into(), false)
    }

    /// Like [`Table::select`] but renders the `exec` verb, producing a scalar
    /// or vector instead of a table.
    pub fn exec(&self, cols: impl Into<KeyList>) -> Self {
        self.project(cols.into(), true)
    }

    fn project(&self, cols: KeyList, exec_mode: bool) -> Self {
        let mut state = if self.state.is_materialized {
            self.state.clone()
        } else {
            // Derived states nest as an inline subquery.
            QueryState::named(format!("({})", self.state.render()), false)
        };
        state.select_list = cols.0;
        if exec_mode {
            state.exec_mode = true;
        }
        self.with_state(state, false)
    }

    /// Append a predicate; predicates from separate calls are ANDed.
    pub fn filter(&self, cond: impl Into<Expr>) -> Self {
        let mut state = self.state.clone();
        state.predicates.push(cond.into().sql());
        self.with_state(state, true)
    }

    pub fn filter_all<I>(&self, conds: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<Expr>,
    {
        let mut state = self.state.clone();
        state
            .predicates
            .extend(conds.into_iter().map(|c| c.into().sql()));
        self.with_state(state, true)
    }

    pub(crate) fn grouped(&self, mode: GroupMode, keys: Vec<String>) -> Result<Self> {
        if self.state.group_mode.is_some() {
            return Err(ClientError::GroupModeConflict);
        }
        let mut state = self.state.clone();
        state.group_mode = Some((mode, keys));
        Ok(self.with_state(state, true))
    }

    /// Only meaningful once a grouping or context mode is active.
    pub fn having(&self, cond: impl Into<Expr>) -> Self {
        let mut state = self.state.clone();
        state.having = Some(cond.into().sql());
        self.with_state(state, true)
    }

    pub fn sort(&self, bys: impl Into<KeyList>, ascending: impl Into<Ascending>) -> Result<Self> {
        let keys = apply_ascending(bys.into().0, ascending.into())?;
        let mut state = self.state.clone();
        state.sort_keys = keys;
        Ok(self.with_state(state, true))
    }

    pub fn csort(&self, bys: impl Into<KeyList>, ascending: impl Into<Ascending>) -> Result<Self> {
        let keys = apply_ascending(bys.into().0, ascending.into())?;
        let mut state = self.state.clone();
        state.csort_keys = keys;
        Ok(self.with_state(state, true))
    }

    pub fn top(&self, count: u64) -> Self {
        let mut state = self.state.clone();
        state.top_count = Some(count.to_string());
        self.with_state(state, true)
    }

    pub fn limit(&self, limit: impl Into<Limit>) -> Self {
        let mut state = self.state.clone();
        state.limit_spec = Some(limit.into().spec());
        self.with_state(state, true)
    }

    /// Drop columns on the remote table and scrub them from the projection.
    ///
    /// Whether a given table kind accepts multi-column drops is a server
    /// rule; it surfaces as a remote error, not a local check.
    pub fn drop_columns(&self, cols: impl Into<KeyList>) -> Result<Self> {
        let cols = cols.into().0;
        self.run(&format!(
            "alter table {} drop {}",
            self.state.identity,
            cols.join(",")
        ))?;

        let mut state = self.state.clone();
        state.select_list.retain(|c| !cols.contains(c));
        Ok(self.with_state(state, false))
    }

    /// Rename the remote table. The one in-place transition: the identity
    /// change is inherently visible to everything referencing the object.
    pub fn rename(&mut self, new_name: &str) -> Result<()> {
        self.run(&format!(
            "rename table {} to {new_name}",
            self.state.identity
        ))?;
        self.state.identity = new_name.to_string();
        // A renamed object is caller-owned; it is no longer ours to undef.
        self.temps.clear();
        Ok(())
    }

    // ---- materialization --------------------------------------------------

    /// Rendered statement text, without dispatching it.
    pub fn show_sql(&self) -> String {
        self.state.render()
    }

    /// Render and dispatch, returning the raw reply.
    pub fn execute(&self) -> Result<Reply> {
        self.run(&self.show_sql())
    }

    /// Render and dispatch, expecting a tabular result.
    pub fn to_table(&self) -> Result<TableData> {
        let statement = self.show_sql();
        match self.run(&statement)? {
            Reply::Table(data) => Ok(data),
            other => Err(ClientError::UnexpectedReply {
                statement,
                reason: format!("expected a table, got {other:?}"),
            }),
        }
    }

    /// Column values as plain lists.
    pub fn to_list(&self) -> Result<Vec<Vec<Value>>> {
        Ok(self.to_table()?.into_lists())
    }

    /// Materialize the query under `name` on the server and return a handle
    /// to the new object.
    pub fn execute_as(&self, name: &str) -> Result<Self> {
        self.run(&format!("{name} = ({})", self.show_sql()))?;
        Ok(Self {
            session: self.session.clone(),
            state: QueryState::named(name, true),
            schema_cache: Arc::new(Mutex::new(None)),
            temps: Vec::new(),
        })
    }

    /// Append another table's rows to this table.
    pub fn append(&self, other: &Table) -> Result<()> {
        self.run(&format!(
            "append!({},{})",
            self.state.identity, other.state.identity
        ))?;
        Ok(())
    }

    // ---- introspection ----------------------------------------------------

    pub fn name(&self) -> &str {
        &self.state.identity
    }

    pub fn is_materialized(&self) -> bool {
        self.state.is_materialized
    }

    pub fn is_exec(&self) -> bool {
        self.state.exec_mode
    }

    pub fn is_merge_for_update(&self) -> bool {
        self.state.merge_for_update
    }

    pub fn rows(&self) -> Result<i64> {
        let statement = format!("exec count(*) from {}", self.state.reference());
        match self.run(&statement)? {
            Reply::Scalar(Value::Int(n)) => Ok(n),
            other => Err(ClientError::UnexpectedReply {
                statement,
                reason: format!("expected an integer scalar, got {other:?}"),
            }),
        }
    }

    pub fn cols(&self) -> Result<usize> {
        Ok(self.col_names()?.len())
    }

    /// Column names, fetched from the remote schema on first use and cached.
    pub fn col_names(&self) -> Result<Vec<String>> {
        if let Some(names) = self.schema_cache.lock().as_ref() {
            return Ok(names.clone());
        }

        let statement = format!("schema({})", self.state.reference());
        let names = match self.run(&statement)? {
            Reply::Table(data) => match data.column("name") {
                Some(values) => values
                    .iter()
                    .map(|v| match v {
                        Value::String(s) => Ok(s.clone()),
                        other => Err(ClientError::UnexpectedReply {
                            statement: statement.clone(),
                            reason: format!("non-string column name {other:?}"),
                        }),
                    })
                    .collect::<Result<Vec<_>>>()?,
                None => {
                    return Err(ClientError::UnexpectedReply {
                        statement,
                        reason: "schema table has no 'name' column".to_string(),
                    })
                }
            },
            other => Err(ClientError::UnexpectedReply {
                statement,
                reason: format!("expected a schema table, got {other:?}"),
            })?,
        };

        *self.schema_cache.lock() = Some(names.clone());
        Ok(names)
    }

    /// Raw schema table as reported by the engine.
    pub fn schema(&self) -> Result<TableData> {
        let statement = format!("schema({})", self.state.reference());
        match self.run(&statement)? {
            Reply::Table(data) => Ok(data),
            other => Err(ClientError::UnexpectedReply {
                statement,
                reason: format!("expected a schema table, got {other:?}"),
            }),
        }
    }

    /// Lazy reference to one column of this table.
    pub fn column(&self, name: &str) -> ColumnRef {
        ColumnRef::new(self.session.clone(), self.state.identity.clone(), name)
    }

    pub fn columns(&self) -> Result<Vec<ColumnRef>> {
        Ok(self
            .col_names()?
            .into_iter()
            .map(|name| self.column(&name))
            .collect())
    }
}

pub(crate) fn quote_names(names: &[&str]) -> String {
    names
        .iter()
        .map(|n| format!("\"{n}\""))
        .collect::<Vec<_>>()
        .join(",")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::RecordingSession;

    fn remote(session: &Arc<RecordingSession>) -> Table {
        Table::from_remote(session.clone() as Arc<dyn Session>, "T")
    }

    #[test]
    fn select_where_sort_end_to_end() {
        let session = Arc::new(RecordingSession::new());
        let t = remote(&session)
            .select("a")
            .filter("a>1")
            .sort("a", true)
            .unwrap();
        assert_eq!(t.show_sql(), "select a from T where a>1 order by a");
        assert!(session.statements().is_empty());
    }

    #[test]
    fn copy_on_write_never_aliases() {
        let session = Arc::new(RecordingSession::new());
        let q1 = remote(&session).select("a");
        let q2 = q1.filter("a>1");
        assert_eq!(q1.show_sql(), "select a from T");
        assert_eq!(q2.show_sql(), "select a from T where a>1");
    }

    #[test]
    fn predicates_from_separate_calls_conjoin() {
        let session = Arc::new(RecordingSession::new());
        let t = remote(&session).filter("a>1").filter("b<2");
        assert_eq!(t.show_sql(), "select * from T where (a>1) and (b<2)");
    }

    #[test]
    fn expression_predicates_render_parenthesized() {
        let session = Arc::new(RecordingSession::new());
        let t = remote(&session);
        let filtered = t.filter(t.column("a").gt(1i64).and(t.column("b").lt(2i64)));
        assert_eq!(
            filtered.show_sql(),
            "select * from T where ((a > 1) and (b < 2))"
        );
    }

    #[test]
    fn sort_suffix_broadcast_and_per_key() {
        let session = Arc::new(RecordingSession::new());
        let t = remote(&session);

        let per_key = t.sort(["a", "b"], [true, false]).unwrap();
        assert_eq!(per_key.show_sql(), "select * from T order by a,b desc");

        let broadcast = t.sort(["a", "b"], false).unwrap();
        assert_eq!(
            broadcast.show_sql(),
            "select * from T order by a desc,b desc"
        );
    }

    #[test]
    fn sort_length_mismatch_is_an_error() {
        let session = Arc::new(RecordingSession::new());
        let t = remote(&session);
        let err = t.sort(["a", "b"], [true]).unwrap_err();
        assert!(matches!(
            err,
            ClientError::AscendingLengthMismatch { flags: 1, keys: 2 }
        ));
        // The source state is untouched.
        assert_eq!(t.show_sql(), "select * from T");
    }

    #[test]
    fn limit_count_and_range_forms() {
        let session = Arc::new(RecordingSession::new());
        let t = remote(&session);
        assert_eq!(t.limit(5).show_sql(), "select * from T limit 5");
        assert_eq!(t.limit((2, 5)).show_sql(), "select * from T limit 2,5");
        assert_eq!(t.limit([2, 5]).show_sql(), "select * from T limit 2,5");
    }

    #[test]
    fn top_renders_before_projection() {
        let session = Arc::new(RecordingSession::new());
        let t = remote(&session).top(10).select(["a", "b"]);
        assert_eq!(t.show_sql(), "select top 10 a,b from T");
    }

    #[test]
    fn exec_switches_verb() {
        let session = Arc::new(RecordingSession::new());
        let t = remote(&session).exec("count(*)");
        assert_eq!(t.show_sql(), "exec count(*) from T");
        assert!(t.is_exec());
    }

    #[test]
    fn select_on_materialized_keeps_identity() {
        let session = Arc::new(RecordingSession::new());
        let t = remote(&session).select(["a", "b"]).filter("a>1");
        // A concrete identity is safe to reference directly; re-selecting
        // replaces the projection instead of nesting a subquery.
        let again = t.select("a");
        assert_eq!(again.show_sql(), "select a from T where a>1");
        assert!(again.is_materialized());
    }

    #[test]
    fn render_is_repeatable() {
        let session = Arc::new(RecordingSession::new());
        let t = remote(&session).select("a").filter("a>1").limit(3);
        assert_eq!(t.show_sql(), t.show_sql());
    }

    #[test]
    fn to_table_dispatches_rendered_sql() {
        let session = Arc::new(RecordingSession::new());
        session.script(
            "select a from T",
            Reply::Table(TableData::new().with_column("a", vec![Value::Int(1)])),
        );

        let data = remote(&session).select("a").to_table().unwrap();
        assert_eq!(data.num_rows(), 1);
        assert_eq!(session.statements(), vec!["select a from T".to_string()]);
    }

    #[test]
    fn to_list_returns_columns_in_order() {
        let session = Arc::new(RecordingSession::new());
        session.script(
            "select * from T",
            Reply::Table(
                TableData::new()
                    .with_column("a", vec![Value::Int(1), Value::Int(2)])
                    .with_column("b", vec![Value::Double(0.5), Value::Double(1.5)]),
            ),
        );

        let lists = remote(&session).to_list().unwrap();
        assert_eq!(lists.len(), 2);
        assert_eq!(lists[0], vec![Value::Int(1), Value::Int(2)]);
    }

    #[test]
    fn execute_as_creates_named_handle() {
        let session = Arc::new(RecordingSession::new());
        let named = remote(&session).select("a").execute_as("Snap").unwrap();
        assert_eq!(
            session.statements(),
            vec!["Snap = (select a from T)".to_string()]
        );
        assert_eq!(named.name(), "Snap");
        assert!(named.is_materialized());
        assert_eq!(named.show_sql(), "select * from Snap");
    }

    #[test]
    fn rows_uses_exec_count() {
        let session = Arc::new(RecordingSession::new());
        session.script("exec count(*) from T", Reply::Scalar(Value::Int(42)));
        assert_eq!(remote(&session).rows().unwrap(), 42);
    }

    #[test]
    fn col_names_fetches_schema_once() {
        let session = Arc::new(RecordingSession::new());
        session.script(
            "schema(T)",
            Reply::Table(TableData::new().with_column(
                "name",
                vec![Value::String("a".into()), Value::String("b".into())],
            )),
        );

        let t = remote(&session);
        assert_eq!(t.col_names().unwrap(), vec!["a", "b"]);
        assert_eq!(t.cols().unwrap(), 2);
        assert_eq!(session.statements().len(), 1);
    }

    #[test]
    fn upload_primes_schema_cache() {
        let session = Arc::new(RecordingSession::new());
        let data = TableData::new()
            .with_column("x", vec![Value::Int(1)])
            .with_column("y", vec![Value::Int(2)]);
        let t = Table::from_data(session.clone() as Arc<dyn Session>, data).unwrap();
        assert_eq!(t.col_names().unwrap(), vec!["x", "y"]);
        // One upload, no schema round trip.
        assert!(session.statements().is_empty());
        assert_eq!(session.uploads().len(), 1);
        drop(t);
    }

    #[test]
    fn temp_cleanup_fires_exactly_once() {
        let session = Arc::new(RecordingSession::new());
        let data = TableData::new().with_column("x", vec![Value::Int(1)]);
        let t = Table::from_data(session.clone() as Arc<dyn Session>, data).unwrap();

        let aliases: Vec<Table> = (0..4).map(|_| t.filter("x>0")).collect();
        drop(aliases);
        assert_eq!(undef_count(&session), 0);

        drop(t);
        assert_eq!(undef_count(&session), 1);
    }

    #[test]
    fn closed_session_suppresses_cleanup() {
        let session = Arc::new(RecordingSession::new());
        let data = TableData::new().with_column("x", vec![Value::Int(1)]);
        let t = Table::from_data(session.clone() as Arc<dyn Session>, data).unwrap();
        session.close();
        drop(t);
        assert_eq!(undef_count(&session), 0);
    }

    #[test]
    fn unmanaged_table_skips_cleanup() {
        let session = Arc::new(RecordingSession::new());
        let data = TableData::new().with_column("x", vec![Value::Int(1)]);
        let t = Table::from_data(session.clone() as Arc<dyn Session>, data)
            .unwrap()
            .unmanaged();
        drop(t);
        assert_eq!(undef_count(&session), 0);
    }

    #[test]
    fn cleanup_errors_are_swallowed() {
        let session = Arc::new(RecordingSession::new());
        session.fail_matching("undef");
        let data = TableData::new().with_column("x", vec![Value::Int(1)]);
        let t = Table::from_data(session.clone() as Arc<dyn Session>, data).unwrap();
        drop(t); // must not panic
        assert_eq!(undef_count(&session), 1);
    }

    #[test]
    fn load_scopes_partitions() {
        let session = Arc::new(RecordingSession::new());
        let t = Table::load(
            session.clone() as Arc<dyn Session>,
            "dfs://market",
            "trades",
            Some(&["2024.01.01", "2024.01.02"]),
        )
        .unwrap();

        let stmts = session.statements();
        assert_eq!(stmts.len(), 1);
        assert!(stmts[0].contains(
            "loadTable(\"dfs://market\", \"trades\", [\"2024.01.01\",\"2024.01.02\"])"
        ));
        assert!(t.name().starts_with(TEMP_TABLE_PREFIX));
    }

    #[test]
    fn drop_columns_issues_alter_and_scrubs_projection() {
        let session = Arc::new(RecordingSession::new());
        let t = remote(&session).select(["a", "b", "c"]);
        let t = t.drop_columns(["b"]).unwrap();
        assert_eq!(
            session.statements(),
            vec!["alter table T drop b".to_string()]
        );
        assert_eq!(t.show_sql(), "select a,c from T");
    }

    #[test]
    fn rename_updates_identity_in_place() {
        let session = Arc::new(RecordingSession::new());
        let mut t = remote(&session);
        t.rename("U").unwrap();
        assert_eq!(
            session.statements(),
            vec!["rename table T to U".to_string()]
        );
        assert_eq!(t.show_sql(), "select * from U");
    }

    #[test]
    fn append_targets_both_identities() {
        let session = Arc::new(RecordingSession::new());
        let left = remote(&session);
        let right = Table::from_remote(session.clone() as Arc<dyn Session>, "U");
        left.append(&right).unwrap();
        assert_eq!(session.statements(), vec!["append!(T,U)".to_string()]);
    }

    pub(crate) fn undef_count(session: &RecordingSession) -> usize {
        session
            .statements()
            .iter()
            .filter(|s| s.starts_with("undef(\"tmp_tbl_"))
            .count()
    }
}
