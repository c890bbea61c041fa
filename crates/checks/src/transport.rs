//! Outbound HTTP/HTTPS transport for probes.

use crate::probe::ProbeRequest;
use async_trait::async_trait;
use common::ProbeError;
use futures::future::{BoxFuture, FutureExt};
use std::error::Error as StdError;
use std::io;
use tracing::debug;

/// Response of a probe request.
///
/// The body is not read until [`ProbeResponse::drain`] is awaited.
pub struct ProbeResponse {
    /// Response status code
    pub status_code: u16,
    drain: BoxFuture<'static, ()>,
}

impl ProbeResponse {
    /// Create a response whose body is consumed by `drain`.
    pub fn new<F>(status_code: u16, drain: F) -> Self
    where
        F: Future<Output = ()> + Send + 'static,
    {
        Self {
            status_code,
            drain: drain.boxed(),
        }
    }

    /// Read the remaining body to completion, discarding it.
    pub async fn drain(self) {
        self.drain.await
    }
}

impl std::fmt::Debug for ProbeResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProbeResponse")
            .field("status_code", &self.status_code)
            .finish_non_exhaustive()
    }
}

/// Sends one probe request
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send the request and wait for the response headers.
    async fn send(&self, request: ProbeRequest) -> Result<ProbeResponse, ProbeError>;
}

/// Plain and TLS HTTP transport backed by a shared reqwest client
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    /// Create a new HTTP transport
    pub fn new() -> Result<Self, reqwest::Error> {
        // Redirects are not followed: the first response is the outcome.
        let client = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .build()?;

        Ok(Self { client })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, request: ProbeRequest) -> Result<ProbeResponse, ProbeError> {
        let method = reqwest::Method::from_bytes(request.method.as_str().as_bytes())
            .map_err(|e| ProbeError::transport("EINVAL", e))?;
        let mut builder = self.client.request(method, request.url.clone());

        if let Some(payload) = &request.payload {
            // A String body carries its own Content-Length.
            builder = builder
                .header(reqwest::header::CONTENT_TYPE, payload.content_type())
                .body(payload.to_body());
        }

        let mut response = builder
            .send()
            .await
            .map_err(|e| ProbeError::transport(error_code(&e), &e))?;

        let status_code = response.status().as_u16();
        let url = request.url;
        debug!(url = %url, status = status_code, "Probe response received");

        Ok(ProbeResponse::new(status_code, async move {
            while let Ok(Some(_)) = response.chunk().await {}
            debug!(url = %url, "Connection closed");
        }))
    }
}

/// Classify a transport failure into a symbolic error code.
///
/// Only the causes of `err` are inspected; its own message embeds the
/// request URL.
pub fn error_code(err: &reqwest::Error) -> String {
    if err.is_timeout() {
        return common::TIMEOUT_CODE.to_string();
    }
    cause_code(err.source())
}

fn cause_code(mut cause: Option<&(dyn StdError + 'static)>) -> String {
    while let Some(current) = cause {
        if let Some(tls) = current.downcast_ref::<rustls::Error>() {
            return tls_error_code(tls).to_string();
        }
        if let Some(io_err) = current.downcast_ref::<io::Error>() {
            // TLS failures surface as io errors wrapping the rustls error.
            if let Some(tls) = io_err
                .get_ref()
                .and_then(|inner| inner.downcast_ref::<rustls::Error>())
            {
                return tls_error_code(tls).to_string();
            }
            return io_error_code(io_err);
        }
        // hyper-util names resolver failures "dns error".
        if current.to_string().starts_with("dns error") {
            return "ENOTFOUND".to_string();
        }
        cause = current.source();
    }

    "EUNKNOWN".to_string()
}

fn tls_error_code(err: &rustls::Error) -> &'static str {
    match err {
        rustls::Error::InvalidCertificate(_) | rustls::Error::NoCertificatesPresented => {
            "CERT_INVALID"
        }
        _ => "EPROTO",
    }
}

/// Symbolic errno name of an io error, e.g. `ECONNREFUSED`.
pub fn io_error_code(err: &io::Error) -> String {
    if let Some(raw) = err.raw_os_error() {
        return format!("{:?}", nix::errno::Errno::from_raw(raw));
    }

    match err.kind() {
        io::ErrorKind::ConnectionRefused => "ECONNREFUSED",
        io::ErrorKind::ConnectionReset => "ECONNRESET",
        io::ErrorKind::ConnectionAborted => "ECONNABORTED",
        io::ErrorKind::NotConnected => "ENOTCONN",
        io::ErrorKind::AddrNotAvailable => "EADDRNOTAVAIL",
        io::ErrorKind::BrokenPipe => "EPIPE",
        io::ErrorKind::TimedOut => common::TIMEOUT_CODE,
        io::ErrorKind::UnexpectedEof => "ECONNRESET",
        _ => "EUNKNOWN",
    }
    .to_string()
}
