use clap::{Args, Parser, Subcommand};
use std::net::SocketAddr;
use std::time::Duration;

use tally::DEFAULT_METRICS_PATH;
use tally_metrics::DEFAULT_MAX_SERIES_PER_FAMILY;

#[derive(Debug, Parser)]
#[command(
    name = "tally",
    author,
    version,
    about = "In-process metrics with a pull-based text exposition endpoint",
    long_about = "tally keeps counters, gauges and histograms in memory and serves them over HTTP in the Prometheus text exposition format.\n\nThe bundled demo registers four application metrics and mutates them with random request traffic.",
    after_help = "Examples:\n  tally serve\n  tally serve --bind 127.0.0.1:9100 --path /metrics\n  tally serve --no-simulate\n  tally render --ticks 50"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Serve the exposition endpoint and run the activity simulator
    Serve(ServeArgs),

    /// Run the simulator offline and print one exposition document
    Render(RenderArgs),
}

#[derive(Debug, Args)]
pub struct SimulateArgs {
    /// Shortest pause between simulated requests (e.g. 100ms, 1s)
    #[arg(long, env = "TALLY_INTERVAL_MIN", value_parser = humantime::parse_duration, default_value = "100ms")]
    pub interval_min: Duration,

    /// Longest pause between simulated requests
    #[arg(long, env = "TALLY_INTERVAL_MAX", value_parser = humantime::parse_duration, default_value = "1s")]
    pub interval_max: Duration,

    /// Probability that a simulated request also records an error
    #[arg(long, env = "TALLY_ERROR_RATE", default_value_t = 0.05)]
    pub error_rate: f64,
}

#[derive(Debug, Args)]
pub struct ServeArgs {
    /// Address to listen on
    #[arg(long, env = "TALLY_BIND", default_value = "0.0.0.0:8000")]
    pub bind: SocketAddr,

    /// HTTP path serving the exposition document
    #[arg(long, env = "TALLY_METRICS_PATH", default_value = DEFAULT_METRICS_PATH)]
    pub path: String,

    /// Maximum label sets per metric (0 = unlimited)
    #[arg(long, env = "TALLY_MAX_SERIES", default_value_t = DEFAULT_MAX_SERIES_PER_FAMILY)]
    pub max_series: usize,

    /// Serve the registry without generating demo traffic
    #[arg(long, env = "TALLY_NO_SIMULATE")]
    pub no_simulate: bool,

    #[command(flatten)]
    pub simulate: SimulateArgs,
}

#[derive(Debug, Args)]
pub struct RenderArgs {
    /// Number of simulated requests to record before rendering
    #[arg(long, default_value_t = 10)]
    pub ticks: u64,

    /// Probability that a simulated request also records an error
    #[arg(long, default_value_t = 0.05)]
    pub error_rate: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_parses_serve_defaults() {
        let cli = match Cli::try_parse_from(["tally", "serve"]) {
            Ok(v) => v,
            Err(err) => panic!("failed to parse args: {err}"),
        };

        match cli.command {
            Command::Serve(args) => {
                assert_eq!(args.bind, SocketAddr::from(([0, 0, 0, 0], 8000)));
                assert_eq!(args.path, "/metrics");
                assert_eq!(args.max_series, DEFAULT_MAX_SERIES_PER_FAMILY);
                assert!(!args.no_simulate);
                assert_eq!(args.simulate.interval_min, Duration::from_millis(100));
                assert_eq!(args.simulate.interval_max, Duration::from_secs(1));
                assert_eq!(args.simulate.error_rate, 0.05);
            }
            Command::Render(_) => panic!("expected serve command"),
        }
    }

    #[test]
    fn cli_parses_serve_overrides() {
        let parsed = Cli::try_parse_from([
            "tally",
            "serve",
            "--bind",
            "127.0.0.1:0",
            "--path",
            "/custom",
            "--max-series",
            "0",
            "--no-simulate",
            "--interval-min",
            "250ms",
            "--interval-max",
            "2s",
        ]);
        let cli = match parsed {
            Ok(v) => v,
            Err(err) => panic!("failed to parse args: {err}"),
        };

        match cli.command {
            Command::Serve(args) => {
                assert_eq!(args.bind.port(), 0);
                assert_eq!(args.path, "/custom");
                assert_eq!(args.max_series, 0);
                assert!(args.no_simulate);
                assert_eq!(args.simulate.interval_min, Duration::from_millis(250));
                assert_eq!(args.simulate.interval_max, Duration::from_secs(2));
            }
            Command::Render(_) => panic!("expected serve command"),
        }
    }

    #[test]
    fn cli_rejects_bad_durations() {
        assert!(Cli::try_parse_from(["tally", "serve", "--interval-min", "10x"]).is_err());
        assert!(Cli::try_parse_from(["tally", "serve", "--bind", "nope"]).is_err());
    }

    #[test]
    fn cli_parses_render() {
        let cli = match Cli::try_parse_from(["tally", "render", "--ticks", "3"]) {
            Ok(v) => v,
            Err(err) => panic!("failed to parse args: {err}"),
        };
        match cli.command {
            Command::Render(args) => assert_eq!(args.ticks, 3),
            Command::Serve(_) => panic!("expected render command"),
        }
    }
}
