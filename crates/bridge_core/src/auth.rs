//! Credentials attached to outbound calls.
//!
//! A strategy is picked by tag (`"param"` or `"header"`) and applied to a
//! fully built request just before it is sent.

use crate::error::{BridgeError, Result};
use reqwest::header::{HeaderName, HeaderValue};

pub const AUTH_PARAM: &str = "param";
pub const AUTH_HEADER: &str = "header";

#[derive(Debug, Clone)]
pub enum Auth {
    /// Appends `key=value` to the query string.
    Param { key: String, value: String },
    /// Appends a `key: value` header.
    Header { name: HeaderName, value: HeaderValue },
}

impl Auth {
    pub fn param(key: impl Into<String>, value: impl Into<String>) -> Self {
        Auth::Param {
            key: key.into(),
            value: value.into(),
        }
    }

    pub fn header(key: &str, value: &str) -> Result<Self> {
        let name = HeaderName::from_bytes(key.as_bytes())
            .map_err(|e| BridgeError::Request(format!("auth header name '{key}': {e}")))?;
        let mut value = HeaderValue::from_str(value)
            .map_err(|e| BridgeError::Request(format!("auth header value: {e}")))?;
        value.set_sensitive(true);
        Ok(Auth::Header { name, value })
    }

    /// Build a strategy from its tag. An empty tag means no authentication;
    /// an unrecognized one is an error.
    pub fn from_tag(tag: &str, key: &str, value: &str) -> Result<Option<Self>> {
        match tag {
            "" => Ok(None),
            AUTH_PARAM => Ok(Some(Auth::param(key, value))),
            AUTH_HEADER => Auth::header(key, value).map(Some),
            other => Err(BridgeError::UnknownAuth(other.to_string())),
        }
    }

    pub fn authenticate(&self, req: &mut reqwest::Request) {
        match self {
            Auth::Param { key, value } => {
                req.url_mut().query_pairs_mut().append_pair(key, value);
            }
            Auth::Header { name, value } => {
                req.headers_mut().append(name.clone(), value.clone());
            }
        }
    }
}
