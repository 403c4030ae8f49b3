//! Bridge core: the pieces shared by every bridge and the dispatch server.
//!
//! ```text
//! JobResult { jobRunId, data }
//!   │
//!   ▼
//! Helper::new(data) ──► Bridge::run(&helper)
//!                         │  (zero or more Helper::call_* outbound)
//!                         ▼
//!                       output ──► JsonData::from_serialize ──► data.merge(output)
//!   │
//!   ▼
//! JobResult { status: completed | errored, error, data }
//! ```

pub mod auth;
pub mod bridge;
pub mod envelope;
pub mod error;
pub mod helper;
pub mod json;

pub use auth::{Auth, AUTH_HEADER, AUTH_PARAM};
pub use bridge::{Bridge, Opts};
pub use envelope::{JobResult, Status};
pub use error::{BridgeError, Result};
pub use helper::{CallOpts, Helper};
pub use json::{Field, JsonData};

// Re-exported so bridges need no direct reqwest/async-trait dependency.
pub use async_trait::async_trait;
pub use reqwest::Method;
