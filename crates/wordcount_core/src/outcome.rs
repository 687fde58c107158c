use serde::{Deserialize, Serialize};

/// Message reported for any processing failure. Details only go to the log.
pub const GENERIC_FAILURE_MESSAGE: &str = "An error occurred while processing your request.";

/// Result of one count request as reported to the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "OutcomeBody", try_from = "OutcomeBody")]
pub enum CountOutcome {
    Success,
    Invalid { validation_errors: Vec<String> },
    Failed { message: String },
}

impl CountOutcome {
    pub fn failed() -> Self {
        CountOutcome::Failed {
            message: GENERIC_FAILURE_MESSAGE.to_string(),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, CountOutcome::Success)
    }
}

/// Wire shape: `{"success": bool, "validationErrors"?: [...], "message"?: "..."}`.
#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct OutcomeBody {
    success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    validation_errors: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    message: Option<String>,
}

impl From<CountOutcome> for OutcomeBody {
    fn from(outcome: CountOutcome) -> Self {
        match outcome {
            CountOutcome::Success => OutcomeBody {
                success: true,
                validation_errors: None,
                message: None,
            },
            CountOutcome::Invalid { validation_errors } => OutcomeBody {
                success: false,
                validation_errors: Some(validation_errors),
                message: None,
            },
            CountOutcome::Failed { message } => OutcomeBody {
                success: false,
                validation_errors: None,
                message: Some(message),
            },
        }
    }
}

impl TryFrom<OutcomeBody> for CountOutcome {
    type Error = String;

    fn try_from(body: OutcomeBody) -> Result<Self, Self::Error> {
        match body {
            OutcomeBody { success: true, .. } => Ok(CountOutcome::Success),
            OutcomeBody {
                validation_errors: Some(validation_errors),
                ..
            } => Ok(CountOutcome::Invalid { validation_errors }),
            OutcomeBody {
                message: Some(message),
                ..
            } => Ok(CountOutcome::Failed { message }),
            _ => Err("failed outcome without errors or message".to_string()),
        }
    }
}

/// Running total of a single word.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WordStatistics {
    pub word: String,
    pub count: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthReport {
    pub healthy: bool,
    pub store: String,
}
