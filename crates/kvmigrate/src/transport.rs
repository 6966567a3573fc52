// ai
//! 📡 Transport: "send method + URL + body + auth, get back status + body". That's it.
//!
//! Every adapter generation talks to its cluster through one of these. One client per
//! endpoint per migration run, built once, handed over explicitly. No process-wide
//! globals lurking in a `static`, waiting to surprise a test suite.
//!
//! 🧠 Knowledge graph:
//! - Auth: API key wins over basic auth when both are configured
//! - Proxy: optional, applied to every scheme
//! - Compression: optional gzip of request bodies (`Content-Encoding: gzip`)
//! - Status codes are returned, not judged. [`TransportResponse::into_success`] judges.

use std::io::Write;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use flate2::{Compression, write::GzEncoder};
use reqwest::Method;
use tracing::trace;

/// 🔧 Everything needed to reach one cluster endpoint.
#[derive(Debug, Clone, Default)]
pub(crate) struct TransportConfig {
    pub base_url: String,
    pub username: Option<String>,
    pub password: Option<String>,
    pub api_key: Option<String>,
    pub proxy: Option<String>,
    pub compress: bool,
}

/// 📦 A request body and the content type it deserves.
#[derive(Debug, Clone)]
pub(crate) struct RequestBody {
    bytes: Vec<u8>,
    content_type: &'static str,
}

impl RequestBody {
    pub(crate) fn json(value: &serde_json::Value) -> Result<Self> {
        Ok(Self {
            bytes: serde_json::to_vec(value)
                .context("💀 A request body refused to serialize. It was JSON in spirit only.")?,
            content_type: "application/json",
        })
    }

    pub(crate) fn ndjson(bytes: Vec<u8>) -> Self {
        Self {
            bytes,
            content_type: "application/x-ndjson",
        }
    }

    pub(crate) fn text(text: &str) -> Self {
        Self {
            bytes: text.as_bytes().to_vec(),
            content_type: "text/plain",
        }
    }
}

/// 📬 What came back. Status and body, nothing more, nothing less.
#[derive(Debug, Clone)]
pub(crate) struct TransportResponse {
    pub status: u16,
    pub body: String,
}

impl TransportResponse {
    pub(crate) fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// ✅ or 💀: the body if the status was 2xx, otherwise an error that quotes the body.
    pub(crate) fn into_success(self, what: &str) -> Result<String> {
        if !self.is_success() {
            bail!(
                "💀 {} came back with HTTP {}. The cluster had this to say about it: '{}'",
                what,
                self.status,
                self.body
            );
        }
        Ok(self.body)
    }
}

/// 📡 The HTTP capability shared by every adapter generation. Cheap to clone.
#[derive(Debug, Clone)]
pub(crate) struct HttpTransport {
    client: reqwest::Client,
    config: TransportConfig,
}

impl HttpTransport {
    pub(crate) fn new(config: TransportConfig) -> Result<Self> {
        let mut builder = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .timeout(Duration::from_secs(120));

        if let Some(ref proxy_url) = config.proxy {
            let proxy = reqwest::Proxy::all(proxy_url).context(format!(
                "💀 The proxy '{}' does not parse as a proxy. It might be a URL. It might be a wish.",
                proxy_url
            ))?;
            builder = builder.proxy(proxy);
        }

        let client = builder
            .build()
            .context("💀 The HTTP client refused to be born. Probably the TLS stack. Tragic, either way.")?;

        Ok(Self { client, config })
    }

    /// 🔗 Base URL joined with a path, exactly one slash in between.
    pub(crate) fn url(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.config.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    pub(crate) fn base_url(&self) -> &str {
        &self.config.base_url
    }

    /// 🚀 Send one request. Network failures are errors; HTTP failures are just statuses.
    pub(crate) async fn send(
        &self,
        method: Method,
        path: &str,
        body: Option<RequestBody>,
    ) -> Result<TransportResponse> {
        let url = self.url(path);
        trace!("📡 {} {}", method, url);

        let mut request = self.client.request(method.clone(), &url);

        if let Some(ref api_key) = self.config.api_key {
            request = request.header("Authorization", format!("ApiKey {}", api_key));
        } else if let Some(ref username) = self.config.username {
            request = request.basic_auth(username, self.config.password.as_ref());
        }

        if let Some(body) = body {
            request = request.header("Content-Type", body.content_type);
            if self.config.compress {
                request = request
                    .header("Content-Encoding", "gzip")
                    .body(gzip(&body.bytes)?);
            } else {
                request = request.body(body.bytes);
            }
        }

        let response = request.send().await.context(format!(
            "💀 {} {} never made it to the cluster. The network is giving us the silent treatment.",
            method, url
        ))?;
        let status = response.status().as_u16();
        let body = response.text().await.context(format!(
            "💀 {} {} answered, but the body got lost on the way back.",
            method, url
        ))?;

        Ok(TransportResponse { status, body })
    }
}

fn gzip(bytes: &[u8]) -> Result<Vec<u8>> {
    let mut encoder = GzEncoder::new(Vec::with_capacity(bytes.len() / 4), Compression::fast());
    encoder
        .write_all(bytes)
        .context("💀 gzip choked on the request body")?;
    encoder
        .finish()
        .context("💀 gzip could not finish the request body")
}
