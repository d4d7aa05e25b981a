use std::fmt;

/// Grouping mode for a query.
///
/// `ContextBy` preserves per-row output cardinality, unlike `GroupBy`'s
/// row-collapsing aggregation. A state carries at most one of the two; the
/// single field makes the invariant structural.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupMode {
    GroupBy,
    ContextBy,
}

impl GroupMode {
    pub fn keyword(&self) -> &'static str {
        match self {
            Self::GroupBy => "group by",
            Self::ContextBy => "context by",
        }
    }
}

impl fmt::Display for GroupMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.keyword())
    }
}

/// Snapshot of all clauses accumulated so far for one table expression.
///
/// States are plain values. Transitions clone, adjust the copy, and hand the
/// copy back; a failed transition leaves the caller's state untouched.
#[derive(Debug, Clone, Default)]
pub struct QueryState {
    /// Remote object name, generated temporary name, or a parenthesized
    /// subquery/function-call expression.
    pub(crate) identity: String,
    /// Whether `identity` names a concrete remote object (safe to reference
    /// directly) rather than a derived expression.
    pub(crate) is_materialized: bool,

    /// Projection; empty renders as `*`.
    pub(crate) select_list: Vec<String>,
    /// Predicates, ANDed at render time.
    pub(crate) predicates: Vec<String>,
    pub(crate) group_mode: Option<(GroupMode, Vec<String>)>,
    pub(crate) having: Option<String>,
    /// Sort keys carry their ` desc` suffix already.
    pub(crate) sort_keys: Vec<String>,
    pub(crate) csort_keys: Vec<String>,
    pub(crate) top_count: Option<String>,
    pub(crate) limit_spec: Option<String>,
    /// Render `exec` instead of `select`.
    pub(crate) exec_mode: bool,

    /// Pre-wrap identities of a join's operands; consulted when an update is
    /// issued against the join result.
    pub(crate) left_identity: Option<String>,
    pub(crate) right_identity: Option<String>,
    pub(crate) merge_for_update: bool,
}

impl QueryState {
    pub(crate) fn named(identity: impl Into<String>, is_materialized: bool) -> Self {
        Self {
            identity: identity.into(),
            is_materialized,
            ..Default::default()
        }
    }

    /// Whether any clause beyond the bare identity has accumulated.
    pub(crate) fn is_plain(&self) -> bool {
        self.select_list.is_empty()
            && self.predicates.is_empty()
            && self.group_mode.is_none()
            && self.having.is_none()
            && self.sort_keys.is_empty()
            && self.csort_keys.is_empty()
            && self.top_count.is_none()
            && self.limit_spec.is_none()
            && !self.exec_mode
    }

    /// Text that can stand in a `from` clause: the identity itself when
    /// materialized, otherwise the state rendered as a derived subquery.
    pub(crate) fn reference(&self) -> String {
        if self.is_materialized && self.is_plain() {
            self.identity.clone()
        } else {
            format!("({})", self.render())
        }
    }

    pub(crate) fn where_clause(&self) -> Option<String> {
        match self.predicates.len() {
            0 => None,
            1 => Some(format!("where {}", self.predicates[0])),
            _ => Some(format!(
                "where {}",
                self.predicates
                    .iter()
                    .map(|p| format!("({p})"))
                    .collect::<Vec<_>>()
                    .join(" and ")
            )),
        }
    }

    pub(crate) fn group_clause(&self) -> Option<String> {
        self.group_mode
            .as_ref()
            .map(|(mode, keys)| format!("{} {}", mode.keyword(), keys.join(",")))
    }

    pub(crate) fn having_clause(&self) -> Option<String> {
        self.having.as_ref().map(|h| format!("having {h}"))
    }

    /// Render the accumulated state as one whitespace-normalized statement.
    ///
    /// Pure and idempotent; rendering the same state twice yields identical
    /// text.
    pub(crate) fn render(&self) -> String {
        let mut parts: Vec<String> = Vec::new();

        parts.push(if self.exec_mode { "exec" } else { "select" }.to_string());
        if let Some(top) = &self.top_count {
            parts.push(format!("top {top}"));
        }
        parts.push(if self.select_list.is_empty() {
            "*".to_string()
        } else {
            self.select_list.join(",")
        });
        parts.push(format!("from {}", self.identity));
        if let Some(clause) = self.where_clause() {
            parts.push(clause);
        }
        if let Some(clause) = self.group_clause() {
            parts.push(clause);
        }
        if !self.csort_keys.is_empty() {
            parts.push(format!("csort {}", self.csort_keys.join(",")));
        }
        if let Some(clause) = self.having_clause() {
            parts.push(clause);
        }
        if !self.sort_keys.is_empty() {
            parts.push(format!("order by {}", self.sort_keys.join(",")));
        }
        if let Some(limit) = &self.limit_spec {
            parts.push(format!("limit {limit}"));
        }

        normalize_whitespace(&parts.join(" "))
    }
}

/// Collapse runs of whitespace to single spaces and trim the ends.
pub(crate) fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
