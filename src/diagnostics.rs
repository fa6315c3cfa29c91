//! Single reporting point for errors that are recovered without failing a request

use std::fmt;

/// Which recoverable failure happened
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Failure {
    Lookup,
    Persist,
    Read,
    Deserialize,
}

impl Failure {
    pub fn as_str(&self) -> &'static str {
        match self {
            Failure::Lookup => "lookup",
            Failure::Persist => "persist",
            Failure::Read => "read",
            Failure::Deserialize => "deserialize",
        }
    }
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Emit a structured warning for a swallowed error
pub fn report(failure: Failure, context: &str, error: &dyn std::error::Error) {
    tracing::warn!(failure = failure.as_str(), context, "{}", error);
}
