#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("multiple context/group-by are not allowed")]
    GroupModeConflict,

    #[error("'ascending' has {flags} entries but there are {keys} sort keys")]
    AscendingLengthMismatch { flags: usize, keys: usize },

    #[error("at least one of 'on', 'left_on', 'right_on' must be present")]
    MissingJoinKeys,

    #[error("'on' cannot be combined with 'left_on'/'right_on'")]
    ConflictingJoinKeys,

    #[error("'left_on' has {left} entries but 'right_on' has {right}")]
    JoinKeyLengthMismatch { left: usize, right: usize },

    #[error("update has {columns} columns but {values} value expressions")]
    UpdateShapeMismatch { columns: usize, values: usize },

    #[error("invalid aggregate spec: {0}")]
    InvalidAggregateSpec(String),

    #[error("unexpected reply to '{statement}': {reason}")]
    UnexpectedReply { statement: String, reason: String },

    #[error("session is closed")]
    SessionClosed,

    #[error("session error: {0}")]
    Session(String),
}

pub type Result<T, E = ClientError> = std::result::Result<T, E>;
