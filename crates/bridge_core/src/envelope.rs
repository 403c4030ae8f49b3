//! The job envelope exchanged with the calling node.
//!
//! One `JobResult` is decoded per inbound request, moved through
//! `pending → completed | errored` by the dispatcher, and encoded back.

use crate::json::JsonData;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    #[default]
    Pending,
    Completed,
    Errored,
}

impl Status {
    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Pending => "pending",
            Status::Completed => "completed",
            Status::Errored => "errored",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobResult {
    #[serde(default)]
    pub job_run_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task_run_id: Option<String>,
    /// Inbound values are ignored; every job starts out pending.
    #[serde(skip_deserializing)]
    pub status: Status,
    #[serde(skip_deserializing)]
    pub error: Option<String>,
    #[serde(default)]
    pub pending: bool,
    #[serde(default)]
    pub data: JsonData,
}

impl JobResult {
    pub fn set_errored(&mut self, err: impl fmt::Display) {
        self.status = Status::Errored;
        self.error = Some(err.to_string());
    }

    pub fn set_completed(&mut self) {
        self.status = Status::Completed;
    }

    /// Fall back to the request `id` when no `jobRunId` was supplied.
    pub fn set_job_run_id(&mut self) {
        if self.job_run_id.is_empty() {
            if let Some(id) = &self.id {
                self.job_run_id = id.clone();
            }
        }
    }

    pub fn is_completed(&self) -> bool {
        self.status == Status::Completed
    }
}
