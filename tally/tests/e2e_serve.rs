mod support;

use std::process::Stdio;
use std::time::Duration;

use anyhow::Context as _;
use tokio::io::{AsyncBufReadExt as _, BufReader};

#[tokio::test]
async fn e2e_serve_exposes_simulated_activity() -> anyhow::Result<()> {
    let exe = env!("CARGO_BIN_EXE_tally");

    let mut child = tokio::process::Command::new(exe)
        .arg("serve")
        .arg("--bind")
        .arg("127.0.0.1:0")
        .arg("--interval-min")
        .arg("5ms")
        .arg("--interval-max")
        .arg("10ms")
        .env("RUST_LOG", "warn")
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .context("spawn tally")?;

    let stderr = child.stderr.take().context("missing stderr")?;
    let mut stderr_lines = BufReader::new(stderr).lines();

    let url = tokio::time::timeout(Duration::from_secs(5), async {
        while let Some(line) = stderr_lines.next_line().await? {
            if let Some(v) = line.strip_prefix("metrics=") {
                return Ok::<_, anyhow::Error>(v.trim().to_string());
            }
        }
        anyhow::bail!("metrics url not found on stderr");
    })
    .await
    .context("timed out waiting for metrics url")??;

    // Poll until the simulator has recorded a few requests.
    let body = tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            let res = support::fetch(&url).await?;
            anyhow::ensure!(res.status == http::StatusCode::OK, "status {}", res.status);
            if res.body.contains("app_requests_total{") {
                return Ok::<_, anyhow::Error>(res.body);
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
    })
    .await
    .context("timed out waiting for simulated requests")??;

    anyhow::ensure!(body.contains("# HELP app_requests_total Total app requests\n"));
    anyhow::ensure!(body.contains("# TYPE app_active_users gauge\n"));
    anyhow::ensure!(body.contains("app_request_duration_seconds_bucket{le=\"+Inf\"}"));

    child.start_kill().context("kill tally")?;
    let _ = child.wait().await;
    Ok(())
}
