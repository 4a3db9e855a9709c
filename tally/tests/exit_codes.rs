use std::process::Command;

use anyhow::Context as _;

fn status_code(status: std::process::ExitStatus) -> i32 {
    status.code().unwrap_or(-1)
}

fn run(args: &[&str]) -> anyhow::Result<std::process::Output> {
    let exe = env!("CARGO_BIN_EXE_tally");
    Command::new(exe)
        .args(args)
        .env_remove("RUST_LOG")
        .output()
        .context("run tally binary")
}

#[test]
fn render_prints_exposition_and_exits_0() -> anyhow::Result<()> {
    let out = run(&["render", "--ticks", "20", "--error-rate", "1"])?;
    let stdout = String::from_utf8_lossy(&out.stdout);

    anyhow::ensure!(
        status_code(out.status) == 0,
        "expected exit code 0, got {}\nstderr:\n{}",
        status_code(out.status),
        String::from_utf8_lossy(&out.stderr)
    );
    for header in [
        "# TYPE app_requests_total counter",
        "# TYPE app_request_duration_seconds histogram",
        "# TYPE app_active_users gauge",
        "# TYPE app_errors_total counter",
    ] {
        anyhow::ensure!(stdout.contains(header), "missing `{header}` in:\n{stdout}");
    }
    anyhow::ensure!(stdout.contains("app_request_duration_seconds_count 20\n"));
    anyhow::ensure!(stdout.contains("app_request_duration_seconds_bucket{le=\"+Inf\"} 20\n"));
    Ok(())
}

#[test]
fn invalid_flags_exit_30() -> anyhow::Result<()> {
    let out = run(&["serve", "--interval-min", "10x"])?;
    anyhow::ensure!(
        status_code(out.status) == 30,
        "expected exit code 30, got {}",
        status_code(out.status)
    );
    Ok(())
}

#[test]
fn invalid_error_rate_exits_30() -> anyhow::Result<()> {
    let out = run(&["render", "--error-rate", "2"])?;
    anyhow::ensure!(
        status_code(out.status) == 30,
        "expected exit code 30, got {}\nstderr:\n{}",
        status_code(out.status),
        String::from_utf8_lossy(&out.stderr)
    );
    Ok(())
}

#[test]
fn inverted_intervals_exit_30() -> anyhow::Result<()> {
    let out = run(&[
        "serve",
        "--bind",
        "127.0.0.1:0",
        "--interval-min",
        "2s",
        "--interval-max",
        "1s",
    ])?;
    anyhow::ensure!(
        status_code(out.status) == 30,
        "expected exit code 30, got {}",
        status_code(out.status)
    );
    Ok(())
}

#[test]
fn relative_metrics_path_exits_30() -> anyhow::Result<()> {
    let out = run(&["serve", "--bind", "127.0.0.1:0", "--path", "metrics"])?;
    anyhow::ensure!(
        status_code(out.status) == 30,
        "expected exit code 30, got {}",
        status_code(out.status)
    );
    Ok(())
}

#[test]
fn route_pattern_metrics_path_exits_30() -> anyhow::Result<()> {
    for path in ["/:x", "/*rest", "/{"] {
        let out = run(&["serve", "--bind", "127.0.0.1:0", "--path", path])?;
        anyhow::ensure!(
            status_code(out.status) == 30,
            "expected exit code 30 for `{path}`, got {}\nstderr:\n{}",
            status_code(out.status),
            String::from_utf8_lossy(&out.stderr)
        );
    }
    Ok(())
}
