//! Bridges described by a JSON definition file instead of code.
//!
//! ```json
//! [{
//!   "name": "CryptoCompare",
//!   "method": "GET",
//!   "url": "https://min-api.cryptocompare.com/data/price",
//!   "path": "/price",
//!   "auth": {"type": "header", "key": "authorization", "env": "CC_API_KEY"},
//!   "opts": {"query": {"fsym": "coin", "tsyms": "market"}, "expectedCode": 200}
//! }]
//! ```
//!
//! Each `opts.query` value names a key of the job's `data`; the outbound
//! parameter carries that key's value.

use anyhow::{bail, Context};
use bridge_core::json::param_string;
use bridge_core::{async_trait, Auth, Bridge, CallOpts, Helper, Method, Opts};
use bridge_gate::BridgeRef;
use serde::Deserialize;
use serde_json::{Map, Value};
use std::sync::Arc;

#[derive(Debug, Clone, Deserialize)]
pub struct Definition {
    pub name: String,
    #[serde(default = "default_method")]
    pub method: String,
    pub url: String,
    #[serde(default)]
    pub path: String,
    #[serde(default)]
    pub auth: AuthDef,
    #[serde(default)]
    pub opts: CallOpts,
}

fn default_method() -> String {
    "GET".into()
}

/// `value` is never stored in the file; it is read from the `env` variable.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AuthDef {
    #[serde(default, rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub key: String,
    #[serde(default)]
    pub env: String,
}

pub struct JsonBridge {
    def: Definition,
    method: Method,
}

impl JsonBridge {
    pub fn new(mut def: Definition) -> anyhow::Result<Self> {
        let secret = if def.auth.env.is_empty() {
            String::new()
        } else {
            std::env::var(&def.auth.env).unwrap_or_default()
        };
        def.opts.auth = Auth::from_tag(&def.auth.kind, &def.auth.key, &secret)
            .with_context(|| format!("bridge '{}'", def.name))?;
        let method = Method::from_bytes(def.method.to_uppercase().as_bytes())
            .with_context(|| format!("bridge '{}': method '{}'", def.name, def.method))?;
        Ok(Self { def, method })
    }
}

#[async_trait]
impl Bridge for JsonBridge {
    fn opts(&self) -> Opts {
        Opts {
            name: self.def.name.clone(),
            path: self.def.path.clone(),
            lambda: true,
        }
    }

    async fn run(&self, h: &Helper) -> bridge_core::Result<Value> {
        let opts = CallOpts {
            query: self
                .def
                .opts
                .query
                .iter()
                .map(|(k, v)| (k.clone(), Value::String(h.get_param(&param_string(v)))))
                .collect(),
            ..self.def.opts.clone()
        };
        let body: Map<String, Value> = h
            .call_with_opts(self.method.clone(), &self.def.url, &opts)
            .await?;
        Ok(Value::Object(body))
    }
}

/// Read definitions from a file path or an `http(s)://` URL.
pub async fn load(uri: &str) -> anyhow::Result<Vec<BridgeRef>> {
    if uri.is_empty() {
        bail!("Empty bridge URI given");
    }
    let bytes = if uri.starts_with("http://") || uri.starts_with("https://") {
        reqwest::get(uri)
            .await
            .with_context(|| format!("fetch {uri}"))?
            .error_for_status()?
            .bytes()
            .await?
            .to_vec()
    } else {
        tokio::fs::read(uri)
            .await
            .with_context(|| format!("read {uri}"))?
    };
    let defs: Vec<Definition> =
        serde_json::from_slice(&bytes).with_context(|| format!("parse {uri}"))?;
    defs.into_iter()
        .map(|d| JsonBridge::new(d).map(|b| Arc::new(b) as BridgeRef))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::extract::RawQuery;
    use axum::routing::get;
    use axum::{Json, Router};
    use bridge_core::JsonData;
    use serde_json::json;
    use std::path::PathBuf;
    use tokio::net::TcpListener;

    async fn upstream(defs: Value) -> String {
        let app = Router::new()
            .route(
                "/price",
                get(|RawQuery(q): RawQuery| async move { Json(json!({"query": q})) }),
            )
            .route(
                "/bridges.json",
                get(move || {
                    let defs = defs.clone();
                    async move { Json(defs) }
                }),
            );
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{addr}")
    }

    fn write_defs(name: &str, body: &str) -> PathBuf {
        let path = std::env::temp_dir().join(format!("bridgex-{}-{name}.json", std::process::id()));
        std::fs::write(&path, body).unwrap();
        path
    }

    fn def(url: &str, auth: Value) -> Definition {
        serde_json::from_value(json!({
            "name": "Price",
            "url": url,
            "path": "/price",
            "auth": auth,
            "opts": {"query": {"fsym": "coin"}}
        }))
        .unwrap()
    }

    #[tokio::test]
    async fn empty_uri_is_rejected() {
        let err = load("").await.err().unwrap();
        assert_eq!(err.to_string(), "Empty bridge URI given");
    }

    #[tokio::test]
    async fn loads_from_file() {
        let path = write_defs(
            "ok",
            r#"[{"name":"CryptoCompare","url":"http://localhost/x"},
                {"name":"Other","method":"post","url":"http://localhost/y","path":"/other"}]"#,
        );
        let bridges = load(path.to_str().unwrap()).await.unwrap();
        assert_eq!(bridges.len(), 2);
        assert_eq!(bridges[0].opts().name, "CryptoCompare");
        assert!(bridges[0].opts().lambda);
        assert_eq!(bridges[0].opts().path, "");
        assert_eq!(bridges[1].opts().path, "/other");
    }

    #[tokio::test]
    async fn malformed_file_is_rejected() {
        let path = write_defs("bad", "[{");
        assert!(load(path.to_str().unwrap()).await.is_err());
        assert!(load("/definitely/not/here.json").await.is_err());
    }

    #[tokio::test]
    async fn unknown_auth_type_fails_at_load() {
        let path = write_defs(
            "auth",
            r#"[{"name":"A","url":"http://localhost","auth":{"type":"cookie","key":"k"}}]"#,
        );
        let err = load(path.to_str().unwrap()).await.err().unwrap();
        assert!(format!("{err:#}").contains("unknown auth type 'cookie'"), "{err:#}");
    }

    #[tokio::test]
    async fn loads_from_url() {
        let base = upstream(json!([{"name": "Remote", "url": "http://localhost"}])).await;
        let bridges = load(&format!("{base}/bridges.json")).await.unwrap();
        assert_eq!(bridges.len(), 1);
        assert_eq!(bridges[0].opts().name, "Remote");
    }

    #[tokio::test]
    async fn run_maps_query_from_job_data() {
        let base = upstream(json!([])).await;
        let bridge = JsonBridge::new(def(&format!("{base}/price"), json!({}))).unwrap();

        let eth = Helper::new(JsonData::from(json!({"coin": "ETH"})));
        let out = bridge.run(&eth).await.unwrap();
        assert_eq!(out["query"], "fsym=ETH");

        // the definition itself is left untouched between runs
        let btc = Helper::new(JsonData::from(json!({"coin": "BTC"})));
        let out = bridge.run(&btc).await.unwrap();
        assert_eq!(out["query"], "fsym=BTC");
    }

    #[tokio::test]
    async fn auth_value_comes_from_env() {
        std::env::set_var("BRIDGEX_TEST_API_KEY", "s3cret");
        let base = upstream(json!([])).await;
        let bridge = JsonBridge::new(def(
            &format!("{base}/price"),
            json!({"type": "param", "key": "api_key", "env": "BRIDGEX_TEST_API_KEY"}),
        ))
        .unwrap();
        let h = Helper::new(JsonData::from(json!({"coin": "ETH"})));
        let out = bridge.run(&h).await.unwrap();
        assert_eq!(out["query"], "fsym=ETH&api_key=s3cret");
    }
}
