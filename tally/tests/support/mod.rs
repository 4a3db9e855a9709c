#![allow(dead_code)]

use anyhow::Context as _;
use bytes::Bytes;
use http_body_util::{BodyExt as _, Empty};
use hyper_util::client::legacy::Client;
use hyper_util::rt::TokioExecutor;

pub struct Fetched {
    pub status: http::StatusCode,
    pub content_type: Option<String>,
    pub body: String,
}

pub async fn fetch(url: &str) -> anyhow::Result<Fetched> {
    let client = Client::builder(TokioExecutor::new()).build_http::<Empty<Bytes>>();
    let uri: http::Uri = url.parse().with_context(|| format!("parse url {url}"))?;

    let resp = client
        .get(uri)
        .await
        .with_context(|| format!("GET {url}"))?;
    let status = resp.status();
    let content_type = resp
        .headers()
        .get(http::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);

    let body = resp
        .into_body()
        .collect()
        .await
        .context("read response body")?
        .to_bytes();

    Ok(Fetched {
        status,
        content_type,
        body: String::from_utf8(body.to_vec()).context("body is not utf-8")?,
    })
}
