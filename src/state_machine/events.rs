use serde::{Deserialize, Serialize};

/// Events that drive a job execution through its lifecycle
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum JobEvent {
    /// Run begins; chunks may be submitted
    Start,
    /// Source exhausted and every chunk succeeded
    Complete,
    /// Read error or failed chunk
    Fail(String),
}

impl JobEvent {
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::Complete => "complete",
            Self::Fail(_) => "fail",
        }
    }

    pub fn error_message(&self) -> Option<&str> {
        match self {
            Self::Fail(reason) => Some(reason),
            _ => None,
        }
    }
}
