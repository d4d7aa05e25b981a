use uuid::Uuid;

use crate::errors::{ClientError, Result};
use crate::state::QueryState;
use crate::table::{KeyList, Table};

/// Join kind for [`Table::merge`].
///
/// `Right` is not a distinct server verb; it is rewritten as a left join with
/// the operands and key lists swapped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum JoinKind {
    #[default]
    Inner,
    Left,
    Right,
    Outer,
    LeftSemi,
}

impl JoinKind {
    fn function(self, sorted: bool) -> &'static str {
        match (self, sorted) {
            (Self::Inner, false) => "ej",
            (Self::Inner, true) => "sej",
            (Self::Left, false) => "lj",
            (Self::Left, true) => "slj",
            (Self::LeftSemi, false) => "lsj",
            (Self::LeftSemi, true) => "slsj",
            // Full joins never take the sorted variant.
            (Self::Outer, _) => "fj",
            (Self::Right, _) => unreachable!("right joins are rewritten before rendering"),
        }
    }
}

/// Key and mode options for a join.
#[derive(Debug, Clone, Default)]
pub struct JoinSpec {
    how: JoinKind,
    on: Option<Vec<String>>,
    left_on: Option<Vec<String>>,
    right_on: Option<Vec<String>>,
    sorted: bool,
    for_update: bool,
}

impl JoinSpec {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn how(mut self, how: JoinKind) -> Self {
        self.how = how;
        self
    }

    /// Shared key names, matched on both sides.
    pub fn on(mut self, keys: impl Into<KeyList>) -> Self {
        self.on = Some(keys.into().0);
        self
    }

    pub fn left_on(mut self, keys: impl Into<KeyList>) -> Self {
        self.left_on = Some(keys.into().0);
        self
    }

    pub fn right_on(mut self, keys: impl Into<KeyList>) -> Self {
        self.right_on = Some(keys.into().0);
        self
    }

    /// Use the sorted-data variant of the join function.
    pub fn sorted(mut self, sorted: bool) -> Self {
        self.sorted = sorted;
        self
    }

    /// Mark the join result as an update target; a later `update` will aim
    /// at the left table with a `from <join>` clause.
    pub fn for_update(mut self, for_update: bool) -> Self {
        self.for_update = for_update;
        self
    }

    fn resolve_keys(&self) -> Result<(Vec<String>, Vec<String>)> {
        match (&self.on, &self.left_on, &self.right_on) {
            (Some(_), Some(_), _) | (Some(_), _, Some(_)) => {
                Err(ClientError::ConflictingJoinKeys)
            }
            (Some(on), None, None) => Ok((on.clone(), on.clone())),
            (None, None, None) => Err(ClientError::MissingJoinKeys),
            (None, Some(left), Some(right)) => {
                if left.len() != right.len() {
                    return Err(ClientError::JoinKeyLengthMismatch {
                        left: left.len(),
                        right: right.len(),
                    });
                }
                Ok((left.clone(), right.clone()))
            }
            // One side given defaults the other to the same names.
            (None, Some(left), None) => Ok((left.clone(), left.clone())),
            (None, None, Some(right)) => Ok((right.clone(), right.clone())),
        }
    }
}

/// Window bounds and aggregates for [`Table::merge_window`].
#[derive(Debug, Clone)]
pub struct WindowSpec {
    lower: i64,
    upper: i64,
    aggs: Vec<String>,
    prevailing: bool,
}

impl WindowSpec {
    /// Inclusive bounds relative to the left row, plus the aggregate
    /// expressions computed over each window.
    pub fn new(lower: i64, upper: i64, aggs: impl Into<KeyList>) -> Self {
        Self {
            lower,
            upper,
            aggs: aggs.into().0,
            prevailing: false,
        }
    }

    /// Switch to the prevailing-window server function.
    pub fn prevailing(mut self, prevailing: bool) -> Self {
        self.prevailing = prevailing;
        self
    }
}

fn generate_alias() -> String {
    let id = Uuid::new_v4().simple().to_string();
    format!("t{}", &id[..8])
}

fn key_list(keys: &[String]) -> String {
    keys.iter()
        .map(|k| format!("\"{k}\""))
        .collect::<Vec<_>>()
        .join(",")
}

/// Operand text for a join: the identity itself when materialized, otherwise
/// an aliased derived subquery.
fn operand(table: &Table) -> String {
    let state = table.state();
    if state.is_materialized {
        state.identity.clone()
    } else {
        format!("({}) as {}", state.render(), generate_alias())
    }
}

fn call_identity(func: &str, left: &str, right: &str, extra: &[String]) -> String {
    let mut args = vec![left.to_string(), right.to_string()];
    args.extend(extra.iter().cloned());
    format!("{func}({})", args.join(","))
}

fn key_args(left_keys: &[String], right_keys: &[String]) -> Vec<String> {
    if left_keys == right_keys {
        vec![format!("[{}]", key_list(left_keys))]
    } else {
        vec![
            format!("[{}]", key_list(left_keys)),
            format!("[{}]", key_list(right_keys)),
        ]
    }
}

impl Table {
    /// Compose a join of two table expressions.
    ///
    /// The composed state's projection is reset to `*`: a `select` applied
    /// before `merge` does not survive the join. This mirrors the engine
    /// semantics of the join functions and is deliberate.
    pub fn merge(&self, right: &Table, spec: JoinSpec) -> Result<Table> {
        let (mut left_keys, mut right_keys) = spec.resolve_keys()?;

        let (left_table, right_table, how) = if spec.how == JoinKind::Right {
            std::mem::swap(&mut left_keys, &mut right_keys);
            (right, self, JoinKind::Left)
        } else {
            (self, right, spec.how)
        };

        let sorted = spec.sorted && how != JoinKind::Outer;
        let identity = call_identity(
            how.function(sorted),
            &operand(left_table),
            &operand(right_table),
            &key_args(&left_keys, &right_keys),
        );

        Ok(self.joined(identity, left_table, right_table, spec.for_update))
    }

    /// As-of join: each left row matches the closest preceding right row on
    /// the last key column.
    pub fn merge_asof(&self, right: &Table, spec: JoinSpec) -> Result<Table> {
        let (left_keys, right_keys) = spec.resolve_keys()?;
        let identity = call_identity(
            "aj",
            &operand(self),
            &operand(right),
            &key_args(&left_keys, &right_keys),
        );
        Ok(self.joined(identity, self, right, spec.for_update))
    }

    /// Window join: aggregates right-side rows falling into a per-row window.
    pub fn merge_window(&self, right: &Table, window: WindowSpec, spec: JoinSpec) -> Result<Table> {
        let (left_keys, right_keys) = spec.resolve_keys()?;
        let func = if window.prevailing { "pwj" } else { "wj" };

        let mut extra = vec![
            format!("{}:{}", window.lower, window.upper),
            format!("<{}>", window.aggs.join(",")),
        ];
        extra.extend(key_args(&left_keys, &right_keys));

        let identity = call_identity(func, &operand(self), &operand(right), &extra);
        Ok(self.joined(identity, self, right, spec.for_update))
    }

    /// Cross join: the cartesian product of both tables.
    pub fn merge_cross(&self, right: &Table) -> Table {
        let identity = call_identity("cj", &operand(self), &operand(right), &[]);
        self.joined(identity, self, right, false)
    }

    fn joined(&self, identity: String, left: &Table, right: &Table, for_update: bool) -> Table {
        let mut state = QueryState::named(identity, false);
        // Pre-wrap identities, so an update against the join can target the
        // physical left table.
        state.left_identity = Some(left.state().identity.clone());
        state.right_identity = Some(right.state().identity.clone());
        state.merge_for_update = for_update;
        self.with_joined_state(state, left, right)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::session::Session;
    use crate::testutil::RecordingSession;

    fn pair() -> (Table, Table) {
        let session = Arc::new(RecordingSession::new());
        (
            Table::from_remote(session.clone() as Arc<dyn Session>, "A"),
            Table::from_remote(session as Arc<dyn Session>, "B"),
        )
    }

    #[test]
    fn inner_join_on_shared_keys() {
        let (a, b) = pair();
        let joined = a.merge(&b, JoinSpec::new().on(["k"])).unwrap();
        assert_eq!(joined.show_sql(), "select * from ej(A,B,[\"k\"])");
        assert!(!joined.is_materialized());
    }

    #[test]
    fn left_on_defaults_right_on() {
        let (a, b) = pair();
        let explicit = a
            .merge(&b, JoinSpec::new().left_on(["x"]).right_on(["x"]))
            .unwrap();
        let defaulted = a.merge(&b, JoinSpec::new().left_on(["x"])).unwrap();
        assert_eq!(explicit.show_sql(), defaulted.show_sql());
    }

    #[test]
    fn differing_keys_render_both_lists() {
        let (a, b) = pair();
        let joined = a
            .merge(&b, JoinSpec::new().left_on(["x"]).right_on(["y"]))
            .unwrap();
        assert_eq!(joined.show_sql(), "select * from ej(A,B,[\"x\"],[\"y\"])");
    }

    #[test]
    fn right_join_swaps_operands() {
        let (a, b) = pair();
        let joined = a
            .merge(
                &b,
                JoinSpec::new().how(JoinKind::Right).left_on(["x"]).right_on(["y"]),
            )
            .unwrap();
        assert_eq!(joined.show_sql(), "select * from lj(B,A,[\"y\"],[\"x\"])");
    }

    #[test]
    fn sorted_variants() {
        let (a, b) = pair();
        let sorted = a
            .merge(&b, JoinSpec::new().how(JoinKind::Left).on(["k"]).sorted(true))
            .unwrap();
        assert_eq!(sorted.show_sql(), "select * from slj(A,B,[\"k\"])");

        // Full joins ignore the sorted flag.
        let outer = a
            .merge(&b, JoinSpec::new().how(JoinKind::Outer).on(["k"]).sorted(true))
            .unwrap();
        assert_eq!(outer.show_sql(), "select * from fj(A,B,[\"k\"])");
    }

    #[test]
    fn key_errors() {
        let (a, b) = pair();
        assert!(matches!(
            a.merge(&b, JoinSpec::new()).unwrap_err(),
            ClientError::MissingJoinKeys
        ));
        assert!(matches!(
            a.merge(&b, JoinSpec::new().on(["k"]).left_on(["x"]))
                .unwrap_err(),
            ClientError::ConflictingJoinKeys
        ));
        assert!(matches!(
            a.merge(&b, JoinSpec::new().left_on(["x", "y"]).right_on(["x"]))
                .unwrap_err(),
            ClientError::JoinKeyLengthMismatch { left: 2, right: 1 }
        ));
    }

    #[test]
    fn merge_discards_prior_projection() {
        let (a, b) = pair();
        let joined = a.select("a").merge(&b, JoinSpec::new().on(["k"])).unwrap();
        assert_eq!(joined.show_sql(), "select * from ej(A,B,[\"k\"])");
    }

    #[test]
    fn select_on_join_result_nests_subquery() {
        let (a, b) = pair();
        let projected = a.merge(&b, JoinSpec::new().on(["k"])).unwrap().select("k");
        assert_eq!(
            projected.show_sql(),
            "select k from (select * from ej(A,B,[\"k\"]))"
        );
    }

    #[test]
    fn derived_join_operand_is_aliased() {
        let (a, b) = pair();
        let first = a.merge(&b, JoinSpec::new().on(["k"])).unwrap();
        let second = first.merge(&a, JoinSpec::new().on(["k"])).unwrap();
        let sql = second.show_sql();
        assert!(sql.starts_with("select * from ej((select * from ej(A,B,[\"k\"])) as t"));
        assert!(sql.ends_with(",A,[\"k\"])"));
    }

    #[test]
    fn asof_join_function() {
        let (a, b) = pair();
        let joined = a.merge_asof(&b, JoinSpec::new().on(["sym", "ts"])).unwrap();
        assert_eq!(
            joined.show_sql(),
            "select * from aj(A,B,[\"sym\",\"ts\"])"
        );
    }

    #[test]
    fn window_join_renders_bounds_and_aggs() {
        let (a, b) = pair();
        let joined = a
            .merge_window(&b, WindowSpec::new(-5, 5, ["avg(price)"]), JoinSpec::new().on(["sym"]))
            .unwrap();
        assert_eq!(
            joined.show_sql(),
            "select * from wj(A,B,-5:5,<avg(price)>,[\"sym\"])"
        );

        let prevailing = a
            .merge_window(
                &b,
                WindowSpec::new(-5, 5, ["avg(price)"]).prevailing(true),
                JoinSpec::new().on(["sym"]),
            )
            .unwrap();
        assert_eq!(
            prevailing.show_sql(),
            "select * from pwj(A,B,-5:5,<avg(price)>,[\"sym\"])"
        );
    }

    #[test]
    fn cross_join_takes_no_keys() {
        let (a, b) = pair();
        assert_eq!(a.merge_cross(&b).show_sql(), "select * from cj(A,B)");
    }

    #[test]
    fn join_records_operand_identities() {
        let (a, b) = pair();
        let joined = a
            .merge(&b, JoinSpec::new().on(["k"]).for_update(true))
            .unwrap();
        assert!(joined.is_merge_for_update());
    }
}
