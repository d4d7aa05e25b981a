use parking_lot::Mutex;

use crate::errors::{ClientError, Result};
use crate::session::{Reply, Session, TableData};

/// Scripted [`Session`] double that records every statement it receives.
#[derive(Debug, Default)]
pub(crate) struct RecordingSession {
    statements: Mutex<Vec<String>>,
    uploads: Mutex<Vec<(String, TableData)>>,
    replies: Mutex<Vec<(String, Reply)>>,
    fail_matching: Mutex<Option<String>>,
    closed: Mutex<bool>,
}

impl RecordingSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reply with `reply` whenever `statement` is run verbatim.
    pub fn script(&self, statement: &str, reply: Reply) {
        self.replies.lock().push((statement.to_string(), reply));
    }

    /// Fail any statement containing `needle`.
    pub fn fail_matching(&self, needle: &str) {
        *self.fail_matching.lock() = Some(needle.to_string());
    }

    pub fn close(&self) {
        *self.closed.lock() = true;
    }

    pub fn statements(&self) -> Vec<String> {
        self.statements.lock().clone()
    }

    pub fn uploads(&self) -> Vec<(String, TableData)> {
        self.uploads.lock().clone()
    }
}

impl Session for RecordingSession {
    fn run(&self, statement: &str) -> Result<Reply> {
        self.statements.lock().push(statement.to_string());

        if let Some(needle) = self.fail_matching.lock().as_ref() {
            if statement.contains(needle.as_str()) {
                return Err(ClientError::Session(format!(
                    "scripted failure for '{statement}'"
                )));
            }
        }

        let reply = self
            .replies
            .lock()
            .iter()
            .find(|(scripted, _)| scripted == statement)
            .map(|(_, reply)| reply.clone())
            .unwrap_or(Reply::None);
        Ok(reply)
    }

    fn upload(&self, name: &str, data: &TableData) -> Result<()> {
        self.uploads.lock().push((name.to_string(), data.clone()));
        Ok(())
    }

    fn is_closed(&self) -> bool {
        *self.closed.lock()
    }
}
