//! Per-job execution context handed to a bridge.
//!
//! A `Helper` exposes the inbound `data` payload and a small set of
//! outbound HTTP primitives. Each job gets its own helper (and HTTP
//! client); nothing here is shared across jobs.
//!
//! Supported call options:
//! - authentication (query param or header) via `CallOpts::auth`
//! - static query parameters via `CallOpts::query`
//! - passthrough of every `data` key as a query parameter via
//!   `CallOpts::query_passthrough` (replaces the static set)
//! - a literal request body via `CallOpts::body`
//! - the status code that counts as success via `CallOpts::expected_code`

use crate::auth::Auth;
use crate::error::{BridgeError, Result};
use crate::json::{param_string, JsonData};
use reqwest::header::CONTENT_TYPE;
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::debug;

const DEFAULT_EXPECTED_CODE: u16 = 200;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallOpts {
    #[serde(skip)]
    pub auth: Option<Auth>,
    #[serde(default)]
    pub query: BTreeMap<String, Value>,
    #[serde(default)]
    pub query_passthrough: bool,
    #[serde(default)]
    pub body: String,
    /// 0 means the default of 200.
    #[serde(default)]
    pub expected_code: u16,
    /// No deadline when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_ms: Option<u64>,
}

impl CallOpts {
    fn expected(&self) -> u16 {
        if self.expected_code == 0 {
            DEFAULT_EXPECTED_CODE
        } else {
            self.expected_code
        }
    }
}

#[derive(Debug, Clone)]
pub struct Helper {
    pub data: JsonData,
    client: reqwest::Client,
}

impl Helper {
    pub fn new(data: JsonData) -> Self {
        Self {
            data,
            client: reqwest::Client::new(),
        }
    }

    pub fn get_param(&self, key: &str) -> String {
        self.data.get(key).string()
    }

    pub fn get_int_param(&self, key: &str) -> i64 {
        self.data.get(key).int()
    }

    /// Call with default options and decode the JSON body into `T`.
    pub async fn call<T: DeserializeOwned>(&self, method: Method, url: &str) -> Result<T> {
        self.call_with_opts(method, url, &CallOpts::default()).await
    }

    pub async fn call_with_opts<T: DeserializeOwned>(
        &self,
        method: Method,
        url: &str,
        opts: &CallOpts,
    ) -> Result<T> {
        let body = self.call_raw(method, url, opts).await?;
        Ok(serde_json::from_slice(&body)?)
    }

    /// Perform one outbound call and return the raw body. A status other
    /// than the expected one is an error and the body is dropped.
    pub async fn call_raw(&self, method: Method, url: &str, opts: &CallOpts) -> Result<Vec<u8>> {
        let mut req = self
            .client
            .request(method, url)
            .header(CONTENT_TYPE, "application/json")
            .body(opts.body.clone())
            .build()
            .map_err(|e| BridgeError::Request(e.to_string()))?;

        {
            let mut pairs = req.url_mut().query_pairs_mut();
            if opts.query_passthrough {
                for (k, v) in self.data.map() {
                    pairs.append_pair(&k, &param_string(&v));
                }
            } else {
                for (k, v) in &opts.query {
                    pairs.append_pair(k, &param_string(v));
                }
            }
        }
        if req.url().query() == Some("") {
            req.url_mut().set_query(None);
        }

        // after the query so passthrough keys can't shadow a credential
        if let Some(auth) = &opts.auth {
            auth.authenticate(&mut req);
        }
        if let Some(ms) = opts.timeout_ms {
            *req.timeout_mut() = Some(Duration::from_millis(ms));
        }

        debug!(method = %req.method(), url = %req.url(), "outbound call");
        let resp = self
            .client
            .execute(req)
            .await
            .map_err(|e| BridgeError::Transport(e.to_string()))?;
        let status = resp.status().as_u16();
        let body = resp
            .bytes()
            .await
            .map_err(|e| BridgeError::Transport(e.to_string()))?;
        debug!(status, bytes = body.len(), "outbound response");

        if status != opts.expected() {
            return Err(BridgeError::UnexpectedStatus(status));
        }
        Ok(body.to_vec())
    }
}
