use crate::error::Result;
use crate::helper::Helper;
use async_trait::async_trait;
use serde_json::Value;

/// Mount options declared by a bridge.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Opts {
    pub name: String,
    /// HTTP path; empty mounts at `/`.
    pub path: String,
    /// Candidate for the serverless entrypoint.
    pub lambda: bool,
}

/// A unit of work the dispatch server can run for one job.
///
/// `run` may issue any number of outbound calls through the helper. Object
/// output is merged over the job's request `data`; any other shape replaces
/// `data` only when the request carried none. An error marks the job as
/// errored with the error's message.
#[async_trait]
pub trait Bridge: Send + Sync {
    fn opts(&self) -> Opts;

    async fn run(&self, helper: &Helper) -> Result<Value>;
}
