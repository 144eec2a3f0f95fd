//! Service checks: process status and HTTP endpoint fetches.
//!
//! Both collaborators sit behind traits so the probe can be driven by
//! fakes in tests. Neither ever returns an error: every failure is folded
//! into the outcome value at the call site.

use std::future::Future;
use std::path::PathBuf;
use std::pin::Pin;
use std::process::Stdio;
use std::time::Duration;

use anyhow::{Context, bail};
use http_body_util::BodyExt;
use tracing::{debug, warn};

use vigil_core::FetchFailure;

/// Boxed future returned by collaborator traits.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

// ── Process status ────────────────────────────────────────────────

/// State of the monitored service as reported by the process manager.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProcessStatus {
    Active,
    /// Any state other than `active`, as reported.
    Inactive(String),
    /// The process manager answered with nothing.
    Unknown,
    /// The process manager could not be run or did not answer in time.
    QueryFailed { program: String, reason: String },
}

impl ProcessStatus {
    /// Interpret the status token printed by the process manager.
    pub fn from_token(token: &str) -> Self {
        match token.trim() {
            "active" => ProcessStatus::Active,
            "" => ProcessStatus::Unknown,
            other => ProcessStatus::Inactive(other.to_string()),
        }
    }

    pub fn is_active(&self) -> bool {
        matches!(self, ProcessStatus::Active)
    }

    /// The state label shown in report lines.
    pub fn state(&self) -> &str {
        match self {
            ProcessStatus::Active => "active",
            ProcessStatus::Inactive(state) => state.as_str(),
            ProcessStatus::Unknown | ProcessStatus::QueryFailed { .. } => "unknown",
        }
    }
}

/// Queries whether a service is running, injected for testability.
pub trait ProcessProbe: Send + Sync {
    fn status<'a>(&'a self, service: &'a str) -> BoxFuture<'a, ProcessStatus>;
}

/// Asks systemd via `systemctl is-active <service>`.
#[derive(Debug, Clone)]
pub struct SystemctlProbe {
    program: PathBuf,
    timeout: Duration,
}

impl SystemctlProbe {
    pub fn new(timeout: Duration) -> Self {
        Self {
            program: PathBuf::from("systemctl"),
            timeout,
        }
    }

    /// Use a different executable with the same calling convention.
    pub fn with_program(mut self, program: impl Into<PathBuf>) -> Self {
        self.program = program.into();
        self
    }

    async fn query(&self, service: &str) -> ProcessStatus {
        let output = tokio::process::Command::new(&self.program)
            .arg("is-active")
            .arg(service)
            .stdin(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .output();

        match tokio::time::timeout(self.timeout, output).await {
            Ok(Ok(output)) => {
                let status = ProcessStatus::from_token(&String::from_utf8_lossy(&output.stdout));
                debug!(%service, state = status.state(), "process status queried");
                status
            }
            Ok(Err(e)) => {
                warn!(error = %e, program = ?self.program, "process status query failed");
                self.failed(e.to_string())
            }
            Err(_) => {
                warn!(
                    program = ?self.program,
                    timeout = ?self.timeout,
                    "process status query timed out"
                );
                self.failed(format!("timed out after {:?}", self.timeout))
            }
        }
    }
}

impl SystemctlProbe {
    fn failed(&self, reason: String) -> ProcessStatus {
        ProcessStatus::QueryFailed {
            program: self.program.display().to_string(),
            reason,
        }
    }
}

impl ProcessProbe for SystemctlProbe {
    fn status<'a>(&'a self, service: &'a str) -> BoxFuture<'a, ProcessStatus> {
        Box::pin(self.query(service))
    }
}

// ── HTTP fetch ────────────────────────────────────────────────────

/// Result of one HTTP GET.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    /// The endpoint answered; any status code.
    Response { status: u16, body: String },
    /// Connection, protocol or timeout failure.
    Unreachable(String),
}

impl FetchOutcome {
    /// The body of a 200 response.
    pub fn ok_body(&self) -> Option<&str> {
        match self {
            FetchOutcome::Response { status: 200, body } => Some(body.as_str()),
            _ => None,
        }
    }

    /// Why this outcome does not count as a success, if it doesn't.
    pub fn failure(&self) -> Option<FetchFailure> {
        match self {
            FetchOutcome::Response { status: 200, .. } => None,
            FetchOutcome::Response { status, body } => Some(FetchFailure::status(*status, body)),
            FetchOutcome::Unreachable(reason) => Some(FetchFailure::unreachable(reason.clone())),
        }
    }
}

/// Performs HTTP GETs, injected for testability.
pub trait Fetcher: Send + Sync {
    fn fetch<'a>(&'a self, url: &'a str, bearer: Option<&'a str>) -> BoxFuture<'a, FetchOutcome>;
}

/// Plain HTTP/1.1 client with a fixed per-request timeout.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    timeout: Duration,
}

impl HttpFetcher {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    async fn get(&self, url: &str, bearer: Option<&str>) -> FetchOutcome {
        match tokio::time::timeout(self.timeout, http_get(url, bearer)).await {
            Ok(Ok(outcome)) => outcome,
            Ok(Err(e)) => {
                debug!(error = %e, %url, "fetch failed");
                FetchOutcome::Unreachable(format!("{e:#}"))
            }
            Err(_) => {
                debug!(%url, "fetch timed out");
                FetchOutcome::Unreachable(format!("timed out after {:?}", self.timeout))
            }
        }
    }
}

impl Fetcher for HttpFetcher {
    fn fetch<'a>(&'a self, url: &'a str, bearer: Option<&'a str>) -> BoxFuture<'a, FetchOutcome> {
        Box::pin(self.get(url, bearer))
    }
}

async fn http_get(url: &str, bearer: Option<&str>) -> anyhow::Result<FetchOutcome> {
    let uri: http::Uri = url.parse().with_context(|| format!("invalid URL {url:?}"))?;
    if uri.scheme_str() != Some("http") {
        bail!("unsupported URL scheme in {url:?}");
    }
    let host = uri
        .host()
        .with_context(|| format!("missing host in {url:?}"))?
        .trim_start_matches('[')
        .trim_end_matches(']');
    let port = uri.port_u16().unwrap_or(80);
    let authority = uri
        .authority()
        .map(|a| a.as_str().to_string())
        .unwrap_or_else(|| host.to_string());
    let target = uri.path_and_query().map(|p| p.as_str()).unwrap_or("/");

    let stream = tokio::net::TcpStream::connect((host, port))
        .await
        .with_context(|| format!("connect to {authority}"))?;

    let io = hyper_util::rt::TokioIo::new(stream);
    let (mut sender, conn) = hyper::client::conn::http1::handshake(io).await?;

    // Drive the connection in the background.
    tokio::spawn(async move {
        let _ = conn.await;
    });

    let mut req = http::Request::builder()
        .method(http::Method::GET)
        .uri(target)
        .header(http::header::HOST, authority.as_str())
        .header(http::header::USER_AGENT, "vigil/0.1");
    if let Some(token) = bearer {
        req = req.header(http::header::AUTHORIZATION, format!("Bearer {token}"));
    }
    let req = req.body(http_body_util::Empty::<bytes::Bytes>::new())?;

    let resp = sender.send_request(req).await?;
    let status = resp.status().as_u16();
    let body = resp.into_body().collect().await?.to_bytes();

    debug!(%status, bytes = body.len(), %url, "fetched");
    Ok(FetchOutcome::Response {
        status,
        body: String::from_utf8_lossy(&body).into_owned(),
    })
}
