//! `oddeven` standalone binary

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use oddeven_server::service::{FlowConfig, FlowTopology, ShutdownController, TracingObserver};

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

/// oddeven - scheduled producers routed by parity through pub/sub channels
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// JSON configuration file; flags override its values
    #[arg(short, long, env = "ODDEVEN_CONFIG")]
    config: Option<PathBuf>,

    /// Channel the parity router consumes
    #[arg(long, env = "ODDEVEN_INGRESS_CHANNEL")]
    ingress_channel: Option<String>,

    /// Channel receiving even numbers
    #[arg(long, env = "ODDEVEN_EVEN_CHANNEL")]
    even_channel: Option<String>,

    /// Channel receiving odd numbers
    #[arg(long, env = "ODDEVEN_ODD_CHANNEL")]
    odd_channel: Option<String>,

    /// Channel the sequential producer publishes to
    #[arg(long, env = "ODDEVEN_SEQUENTIAL_TARGET")]
    sequential_target: Option<String>,

    /// Channel the gateway publishes to
    #[arg(long, env = "ODDEVEN_GATEWAY_TARGET")]
    gateway_target: Option<String>,

    /// Sequential producer period in milliseconds
    #[arg(long, env = "ODDEVEN_SEQUENTIAL_PERIOD_MS")]
    sequential_period_ms: Option<u64>,

    /// Gateway producer period in milliseconds
    #[arg(long, env = "ODDEVEN_GATEWAY_PERIOD_MS")]
    gateway_period_ms: Option<u64>,

    /// Filter non-odd values out of the odd pipeline
    #[arg(long, env = "ODDEVEN_ODD_FILTER")]
    odd_filter: bool,

    /// Stop after this many milliseconds instead of waiting for Ctrl-C
    #[arg(long, env = "ODDEVEN_RUN_FOR_MS")]
    run_for_ms: Option<u64>,

    /// Log output format
    #[arg(long, env = "ODDEVEN_LOG_FORMAT", value_enum, default_value = "text")]
    log_format: LogFormat,
}

impl Args {
    /// Defaults, then the config file, then flags and environment.
    fn flow_config(&self) -> Result<FlowConfig> {
        let mut config = match &self.config {
            Some(path) => FlowConfig::from_file(path)
                .with_context(|| format!("loading {}", path.display()))?,
            None => FlowConfig::default(),
        };

        let overrides = [
            (&self.ingress_channel, &mut config.ingress_channel),
            (&self.even_channel, &mut config.even_channel),
            (&self.odd_channel, &mut config.odd_channel),
            (&self.sequential_target, &mut config.sequential_target),
            (&self.gateway_target, &mut config.gateway_target),
        ];
        for (flag, field) in overrides {
            if let Some(value) = flag {
                field.clone_from(value);
            }
        }
        if let Some(ms) = self.sequential_period_ms {
            config.sequential_period_ms = ms;
        }
        if let Some(ms) = self.gateway_period_ms {
            config.gateway_period_ms = ms;
        }
        if self.odd_filter {
            config.odd_filter = true;
        }

        config.validate().context("invalid configuration")?;
        Ok(config)
    }
}

fn init_tracing(format: LogFormat) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info".into());
    let registry = tracing_subscriber::registry().with(filter);
    match format {
        LogFormat::Text => registry.with(tracing_subscriber::fmt::layer()).init(),
        LogFormat::Json => registry
            .with(tracing_subscriber::fmt::layer().json())
            .init(),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(args.log_format);

    let config = args.flow_config()?;
    info!(version = env!("CARGO_PKG_VERSION"), "starting oddeven");
    info!(
        ingress = %config.ingress_channel,
        even = %config.even_channel,
        odd = %config.odd_channel,
        sequential_target = %config.sequential_target,
        gateway_target = %config.gateway_target,
        "topology configured"
    );

    let topology = FlowTopology::build(config, Arc::new(TracingObserver))?;

    let shutdown = Arc::new(ShutdownController::new());
    let mut scheduler = topology.start(Arc::clone(&shutdown));

    match args.run_for_ms {
        Some(ms) => tokio::time::sleep(Duration::from_millis(ms)).await,
        None => tokio::signal::ctrl_c()
            .await
            .context("waiting for Ctrl-C")?,
    }

    info!("shutting down");
    shutdown.trigger_shutdown();
    scheduler.stop_all().await;
    if !shutdown
        .wait_for_drain(topology.config().shutdown_drain())
        .await
    {
        tracing::warn!(
            in_flight = shutdown.in_flight_count(),
            "drain timed out with ticks still running"
        );
    }

    let stats = topology.stats();
    let (even, odd) = topology.processed();
    for (task, ticks) in scheduler.ticks() {
        info!(task, ticks, "producer summary");
    }
    info!(
        published = stats.published,
        delivered = stats.delivered,
        failed = stats.failed,
        dropped = stats.dropped,
        even,
        odd,
        "stopped"
    );
    Ok(())
}
