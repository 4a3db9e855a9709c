use std::io::Write as _;
use std::sync::Arc;

use anyhow::Context as _;
use tally::{AppMetrics, MetricsServer, ServerConfig, Simulator, SimulatorConfig};
use tally_metrics::{Registry, RegistryConfig};
use tokio::sync::watch;

use crate::cli::{RenderArgs, ServeArgs};
use crate::exit_codes::ExitCode;
use crate::run_error::RunError;

fn registry_config(max_series: usize) -> RegistryConfig {
    RegistryConfig {
        max_series_per_family: (max_series > 0).then_some(max_series),
    }
}

pub async fn serve(args: ServeArgs) -> Result<ExitCode, RunError> {
    let sim_cfg = SimulatorConfig {
        interval_min: args.simulate.interval_min,
        interval_max: args.simulate.interval_max,
        error_rate: args.simulate.error_rate,
    };
    sim_cfg.validate().map_err(RunError::InvalidInput)?;
    tally::validate_path(&args.path)
        .context("invalid --path")
        .map_err(RunError::InvalidInput)?;

    let registry = Arc::new(Registry::with_config(registry_config(args.max_series)));
    let metrics = AppMetrics::register(&registry)
        .context("failed to register demo metrics")
        .map_err(RunError::RuntimeError)?;

    let server = MetricsServer::start(
        ServerConfig {
            bind_addr: args.bind,
            path: args.path,
        },
        registry.clone(),
    )
    .await
    .map_err(RunError::RuntimeError)?;

    // Machine-readable line for scripts and tests.
    eprintln!("metrics={}", server.url());

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let simulator = if args.no_simulate {
        None
    } else {
        let sim = Simulator::new(metrics, sim_cfg);
        Some(tokio::spawn(sim.run(shutdown_rx)))
    };

    let signal = tokio::signal::ctrl_c().await;
    tracing::info!("shutting down");

    let _ = shutdown_tx.send(true);
    if let Some(task) = simulator {
        let _ = task.await;
    }
    server.shutdown().await;

    signal
        .context("failed to listen for ctrl-c")
        .map_err(RunError::RuntimeError)?;
    Ok(ExitCode::Success)
}

pub fn render(args: RenderArgs) -> Result<ExitCode, RunError> {
    let sim_cfg = SimulatorConfig {
        error_rate: args.error_rate,
        ..SimulatorConfig::default()
    };
    sim_cfg.validate().map_err(RunError::InvalidInput)?;

    let registry = Registry::new();
    let metrics = AppMetrics::register(&registry)
        .context("failed to register demo metrics")
        .map_err(RunError::RuntimeError)?;
    let sim = Simulator::new(metrics, sim_cfg);

    for _ in 0..args.ticks {
        sim.tick()
            .context("failed to record simulated request")
            .map_err(RunError::RuntimeError)?;
    }

    let text = registry.render();
    let mut stdout = std::io::stdout().lock();
    stdout
        .write_all(text.as_bytes())
        .and_then(|()| stdout.flush())
        .context("failed to write exposition to stdout")
        .map_err(RunError::RuntimeError)?;

    Ok(ExitCode::Success)
}
