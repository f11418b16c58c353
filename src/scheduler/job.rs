use serde::{Deserialize, Serialize};

use crate::domain::OrderId;
use crate::error::{JobError, SchedulerError};

/// Kinds of delayed job. Jobs of one kind share a handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobKind {
    Finalize,
}

impl JobKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobKind::Finalize => "finalize",
        }
    }
}

impl std::fmt::Display for JobKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Payload of a `finalize` job. Reminder and finalize for one order differ
/// only by `is_reminder`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FinalizePayload {
    #[serde(rename = "orderID")]
    pub order_id: OrderId,
    #[serde(rename = "isReminder")]
    pub is_reminder: bool,
}

/// A typed job. Only the scheduler sees the encoded form.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Job {
    Finalize(FinalizePayload),
}

/// A job as the scheduler keeps it: kind plus canonical JSON payload.
/// Two equal encodings are the same job for de-duplication.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EncodedJob {
    pub kind: JobKind,
    pub payload: String,
}

impl Job {
    pub fn reminder(order_id: OrderId) -> Self {
        Job::Finalize(FinalizePayload {
            order_id,
            is_reminder: true,
        })
    }

    pub fn finalize(order_id: OrderId) -> Self {
        Job::Finalize(FinalizePayload {
            order_id,
            is_reminder: false,
        })
    }

    pub fn kind(&self) -> JobKind {
        match self {
            Job::Finalize(_) => JobKind::Finalize,
        }
    }

    /// The order this job belongs to; jobs of one order never run concurrently.
    pub fn order_id(&self) -> OrderId {
        match self {
            Job::Finalize(payload) => payload.order_id,
        }
    }

    pub fn encode(&self) -> Result<EncodedJob, SchedulerError> {
        let payload = match self {
            Job::Finalize(payload) => serde_json::to_string(payload),
        }
        .map_err(|e| SchedulerError::Encode(e.to_string()))?;

        Ok(EncodedJob {
            kind: self.kind(),
            payload,
        })
    }

    pub fn decode(encoded: &EncodedJob) -> Result<Self, JobError> {
        match encoded.kind {
            JobKind::Finalize => serde_json::from_str(&encoded.payload)
                .map(Job::Finalize)
                .map_err(|e| JobError::Decode(format!("{} payload: {}", encoded.kind, e))),
        }
    }
}
