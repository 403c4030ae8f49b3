use bridge_gate::Server;
use clap::Parser;
use colored::Colorize;
use metrics_exporter_prometheus::PrometheusBuilder;
use std::process;
use tracing::info;
use tracing_subscriber::EnvFilter;

mod json_bridge;

/// Exit codes: 1 = runtime failure, 2 = bridge definitions could not be loaded.
const EXIT_OTHER: i32 = 1;
const EXIT_INPUT: i32 = 2;

#[derive(Parser)]
#[command(name = "bridgex", version, about = "Mount JSON-described bridges over HTTP or the serverless runtime")]
struct Cli {
    /// Filepath/URL of the bridge JSON file
    #[arg(short, long, env = "BRIDGE", default_value = "")]
    bridge: String,

    /// Server port (ignored in lambda mode)
    #[arg(short, long, env = "PORT", default_value_t = bridge_config::DEFAULT_PORT)]
    port: u16,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .compact()
        .init();
    let cli = Cli::parse();

    let bridges = match json_bridge::load(&cli.bridge).await {
        Ok(b) => b,
        Err(e) => fail(EXIT_INPUT, &format!("failed to load bridge: {e:#}")),
    };
    info!(count = bridges.len(), "loaded bridges");

    if let Some(addr) = *bridge_config::METRICS_ADDR {
        if let Err(e) = PrometheusBuilder::new().with_http_listener(addr).install() {
            fail(EXIT_OTHER, &format!("metrics exporter: {e}"));
        }
        info!(%addr, "metrics exporter listening");
    }

    if let Err(e) = Server::new(bridges).start(cli.port).await {
        fail(EXIT_OTHER, &format!("{e:#}"));
    }
}

fn fail(code: i32, msg: &str) -> ! {
    eprintln!("{} {}", "error:".red().bold(), msg);
    process::exit(code);
}
