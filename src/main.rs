mod cli;
mod metric_defs;

use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::Parser;
use cli::{CliOpts, LogFormat};
use colored::Colorize;
use lib::netutils::parse_addr;
use lib::prelude::*;
use lib::{ConfigLoader, MainConfig, Shutdown};
use metrics_exporter_prometheus::PrometheusBuilder;
use metrics_util::MetricKindMask;
use tokio::{select, time};
use tracing::{debug, error, info, trace, warn};
use tracing_subscriber::prelude::*;
use tracing_subscriber::{EnvFilter, Layer};

const SERVICE_NAME: &str = "api";

fn setup_logging_subscriber(f: &LogFormat, debug: u8) {
    let default_filter = match debug {
        | 0 => {
            "info,sqlx=warn,cinemad=debug,api=debug,lib=debug,\
             tower_http=info,request_response_tracing=info,\
             request_response_tracing_metadata=info"
        }
        | _ => "debug,sqlx=info",
    };
    let env_filter = EnvFilter::builder()
        .with_env_var("CINEMA_LOG")
        .try_from_env()
        .unwrap_or_else(|_| default_filter.into());

    let stdout_layer = tracing_subscriber::fmt::layer().with_thread_names(true);
    let stdout_layer: Box<dyn Layer<_> + Send + Sync> = match f {
        | LogFormat::Pretty => stdout_layer.pretty().boxed(),
        | LogFormat::Compact => stdout_layer.compact().boxed(),
        | LogFormat::Json => stdout_layer.json().boxed(),
    };
    tracing_subscriber::registry()
        .with(stdout_layer.with_filter(env_filter))
        .init();
}

fn print_banner() {
    debug!("** {} **", "cinemad".magenta());
}

fn setup_prometheus(config: &MainConfig) -> Result<()> {
    let prometheus_sockaddr =
        parse_addr(&config.prometheus_address, config.prometheus_port)?;
    info!("Prometheus HTTP listener on {:?}", prometheus_sockaddr);
    PrometheusBuilder::new()
        .idle_timeout(
            MetricKindMask::HISTOGRAM,
            // Remove a metric from registry if it was not updated for 2
            // minutes.
            Some(Duration::from_secs(120)),
        )
        .with_http_listener(prometheus_sockaddr)
        .install()
        .context("failed to install Prometheus recorder")?;
    Ok(())
}

#[tokio::main(flavor = "multi_thread")]
async fn main() -> Result<()> {
    // Load .env file if it exists
    match dotenvy::dotenv() {
        | Ok(_) => {}
        // .env files are optional
        | Err(e) if e.not_found() => {}
        | Err(e) => bail!("Failed to load .env file: {e}"),
    };

    let opts = CliOpts::parse();
    let mut shutdown = Shutdown::default();

    setup_logging_subscriber(&opts.log_format, opts.debug);
    print_banner();

    trace!(config = opts.config, "Loading configuration");
    let config_loader = Arc::new(ConfigLoader::from_path(&opts.config));
    let config_main = config_loader.load_main()?;

    setup_prometheus(&config_main)?;
    metric_defs::install_metrics();

    let mut context = ServiceContext::new(
        SERVICE_NAME.to_owned(),
        config_loader,
        shutdown.clone(),
    );
    let mut server = tokio::spawn(async move {
        if let Err(e) = api::start_api_server(context.clone()).await {
            error!(service = SERVICE_NAME, "Failed to start service: {e:#}");
            context.broadcast_shutdown();
        } else {
            info!(service = SERVICE_NAME, "Service terminated!");
        }
    });

    // Waiting for <C-c> to terminate
    select! {
        _ = shutdown.recv() => {
            warn!("Received shutdown signal from the service!");
        },
        _ = tokio::signal::ctrl_c() => {
            warn!("Received Ctrl+c signal (SIGINT)!");
            shutdown.broadcast_shutdown();
        }
    };

    // Give the server 10 seconds to cleanly shutdown after the shutdown
    // signal.
    info!("Waiting (10s) for the server to shutdown cleanly...");
    if time::timeout(Duration::from_secs(10), &mut server)
        .await
        .is_err()
    {
        error!("Timed out awaiting the server to shutdown!");
        server.abort();
        bail!("The server was not terminated cleanly!");
    }
    info!("Bye!");
    Ok(())
}
