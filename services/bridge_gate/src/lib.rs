//! Bridge gate: mounts bridges behind an HTTP listener or the serverless
//! runtime. Both transports funnel into [`execute`].

pub mod api;

use anyhow::Context;
use bridge_core::{Bridge, BridgeError, Helper, JobResult, JsonData};
use metrics::counter;
use serde_json::Value;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{info, warn};

pub type BridgeRef = Arc<dyn Bridge>;

/// Bridges indexed by path, plus the one mounted for serverless
/// invocations. Built once and never mutated afterwards.
pub struct Server {
    path_map: HashMap<String, BridgeRef>,
    lambda_bridge: Option<BridgeRef>,
}

impl Server {
    /// Duplicate paths: the last bridge wins. Empty paths mount at `/`.
    /// The first bridge flagged `lambda` becomes the serverless entrypoint.
    pub fn new(bridges: impl IntoIterator<Item = BridgeRef>) -> Self {
        let mut path_map = HashMap::new();
        let mut lambda_bridge: Option<BridgeRef> = None;
        for bridge in bridges {
            let opts = bridge.opts();
            let path = if opts.path.is_empty() {
                "/".to_string()
            } else {
                opts.path
            };
            if opts.lambda && lambda_bridge.is_none() {
                lambda_bridge = Some(Arc::clone(&bridge));
            }
            path_map.insert(path, bridge);
        }
        Self {
            path_map,
            lambda_bridge,
        }
    }

    pub fn lookup(&self, path: &str) -> Option<&BridgeRef> {
        self.path_map.get(path)
    }

    pub fn lambda_bridge(&self) -> Option<&BridgeRef> {
        self.lambda_bridge.as_ref()
    }

    pub fn routes(&self) -> impl Iterator<Item = (&str, &BridgeRef)> {
        self.path_map.iter().map(|(p, b)| (p.as_str(), b))
    }

    /// Serverless entrypoint: runs the designated bridge on the supplied job.
    pub async fn lambda(&self, mut result: JobResult) -> JobResult {
        result.set_job_run_id();
        match &self.lambda_bridge {
            Some(bridge) => execute(bridge.as_ref(), &mut result).await,
            None => {
                warn!(job_run_id = %result.job_run_id, "no lambda bridge registered");
                result.set_errored("No lambda bridge registered");
            }
        }
        counter!("bridge_lambda_invocations_total", "status" => result.status.as_str())
            .increment(1);
        result
    }

    /// Run until the process is stopped. `LAMBDA` selects the serverless
    /// runtime; otherwise an HTTP listener is bound on `BIND_HOST:port`.
    pub async fn start(self, port: u16) -> anyhow::Result<()> {
        let server = Arc::new(self);
        if *bridge_config::LAMBDA {
            if server.lambda_bridge.is_none() {
                warn!("lambda mode without a lambda bridge; every invocation will error");
            }
            info!("starting the bridge in lambda mode");
            return serve_lambda(server).await;
        }

        let host = bridge_config::BIND_HOST.as_str();
        let listener = TcpListener::bind((host, port))
            .await
            .with_context(|| format!("bind {host}:{port}"))?;
        info!("listening on {}", listener.local_addr()?);
        let app = api::router(server);
        axum::serve(
            listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .await?;
        Ok(())
    }
}

async fn serve_lambda(server: Arc<Server>) -> anyhow::Result<()> {
    let handler = lambda_runtime::service_fn(move |event: lambda_runtime::LambdaEvent<JobResult>| {
        let server = Arc::clone(&server);
        async move { Ok::<JobResult, lambda_runtime::Error>(server.lambda(event.payload).await) }
    });
    lambda_runtime::run(handler)
        .await
        .map_err(|e| anyhow::anyhow!("lambda runtime: {e}"))
}

/// Run one bridge against one job and settle its status. On success `data`
/// becomes the bridge output merged over the request payload, or the output
/// itself when it is not an object and the request carried no data. On
/// failure `data` is left as it arrived.
pub async fn execute(bridge: &dyn Bridge, result: &mut JobResult) {
    let outcome = run_bridge(bridge, &result.data).await;
    match outcome {
        Ok(data) => {
            result.data = data;
            result.set_completed();
        }
        Err(e) => {
            warn!(
                job_run_id = %result.job_run_id,
                bridge = %bridge.opts().name,
                error = %e,
                "bridge run failed"
            );
            result.set_errored(e);
        }
    }
}

async fn run_bridge(bridge: &dyn Bridge, data: &JsonData) -> bridge_core::Result<JsonData> {
    let helper = Helper::new(data.clone());
    let output = bridge.run(&helper).await?;
    let output = JsonData::from_serialize(&output)?;
    match output.value() {
        None | Some(Value::Null) | Some(Value::Object(_)) => data.merge(&output),
        Some(_) if data.is_empty() => Ok(output),
        Some(_) => Err(BridgeError::Merge),
    }
}

pub mod test {
    use super::Server;
    use std::net::SocketAddr;
    use std::sync::Arc;
    use tokio::net::TcpListener;

    /// Spawn the router for `server` on a random port. Returns the address
    /// and a JoinHandle that keeps the server alive until dropped.
    pub async fn spawn(server: Server) -> (SocketAddr, tokio::task::JoinHandle<()>) {
        let app = super::api::router(Arc::new(server));
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let handle = tokio::spawn(async move {
            axum::serve(
                listener,
                app.into_make_service_with_connect_info::<SocketAddr>(),
            )
            .await
            .unwrap();
        });
        (addr, handle)
    }
}
