//! # Job Status Vocabulary
//!
//! The closed set of job states. On the wire and at rest each state is the
//! corresponding COGS vocabulary URI.

use serde::{Deserialize, Serialize};

const RUNNING_URI: &str = "http://vocab.deri.ie/cogs#Running";
const SUCCESS_URI: &str = "http://vocab.deri.ie/cogs#Success";
const FAIL_URI: &str = "http://vocab.deri.ie/cogs#Fail";

/// Status of a stamping job.
///
/// `Running` is the only non-terminal state. A job moves to exactly one of
/// `Success` or `Fail` and never changes afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum JobStatus {
    /// The job has been created and its documents are being processed.
    #[serde(rename = "http://vocab.deri.ie/cogs#Running")]
    Running,
    /// Every candidate document was stamped.
    #[serde(rename = "http://vocab.deri.ie/cogs#Success")]
    Success,
    /// At least one candidate document could not be stamped.
    #[serde(rename = "http://vocab.deri.ie/cogs#Fail")]
    Fail,
}

impl JobStatus {
    /// The COGS URI for this status.
    pub fn uri(&self) -> &'static str {
        match self {
            Self::Running => RUNNING_URI,
            Self::Success => SUCCESS_URI,
            Self::Fail => FAIL_URI,
        }
    }

    /// Parse a status from its COGS URI.
    pub fn from_uri(uri: &str) -> Option<Self> {
        match uri {
            RUNNING_URI => Some(Self::Running),
            SUCCESS_URI => Some(Self::Success),
            FAIL_URI => Some(Self::Fail),
            _ => None,
        }
    }

    /// Short lowercase label, used in logs.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Running => "running",
            Self::Success => "success",
            Self::Fail => "fail",
        }
    }

    /// Whether no further transition is possible.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Running)
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.uri())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uri_roundtrip_for_all_states() {
        for status in [JobStatus::Running, JobStatus::Success, JobStatus::Fail] {
            assert_eq!(JobStatus::from_uri(status.uri()), Some(status));
        }
    }

    #[test]
    fn unknown_uri_is_rejected() {
        assert_eq!(JobStatus::from_uri("http://vocab.deri.ie/cogs#Scheduled"), None);
    }

    #[test]
    fn serde_uses_cogs_uris() {
        let json = serde_json::to_string(&JobStatus::Fail).unwrap();
        assert_eq!(json, "\"http://vocab.deri.ie/cogs#Fail\"");
        let parsed: JobStatus = serde_json::from_str("\"http://vocab.deri.ie/cogs#Running\"").unwrap();
        assert_eq!(parsed, JobStatus::Running);
    }

    #[test]
    fn only_running_is_non_terminal() {
        assert!(!JobStatus::Running.is_terminal());
        assert!(JobStatus::Success.is_terminal());
        assert!(JobStatus::Fail.is_terminal());
    }
}
