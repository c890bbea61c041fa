//! Probe outcome arbitration.
//!
//! A probe has three event sources that can race: the response, the timeout
//! and a transport error. [`ProbeRun`] lets only the first one through.

use crate::types::{Check, CheckMethod, Payload};
use common::{Error, ProbeError, TIMEOUT_CODE};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

/// Default time a probe may take before it is recorded as timed out.
pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_millis(5000);

/// An event that may terminate a probe
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeEvent {
    /// Response headers arrived at `at` (ms since epoch)
    Response { status_code: u16, at: i64 },

    /// The probe timeout elapsed first
    Timeout,

    /// The transport failed at `at` (ms since epoch)
    Error { error: ProbeError, at: i64 },
}

/// One in-flight probe of one check.
#[derive(Debug)]
pub struct ProbeRun {
    check: Check,
    timeout: Duration,
    settled: AtomicBool,
}

impl ProbeRun {
    /// Start a probe of `check` dispatched at `req_time`.
    pub fn start(mut check: Check, timeout: Duration, req_time: i64) -> Self {
        check.req_time = Some(req_time);
        Self {
            check,
            timeout,
            settled: AtomicBool::new(false),
        }
    }

    pub fn req_time(&self) -> i64 {
        self.check.req_time.unwrap_or_default()
    }

    pub fn is_settled(&self) -> bool {
        self.settled.load(Ordering::Acquire)
    }

    /// Apply `event` if no other event has settled this probe yet.
    ///
    /// Returns the record to commit, or `None` when another event won.
    pub fn settle(&self, event: ProbeEvent) -> Option<Check> {
        if self
            .settled
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return None;
        }

        let mut check = self.check.clone();
        match event {
            ProbeEvent::Response { status_code, at } => {
                check.status_code = Some(status_code);
                check.res_time = Some(at);
                check.err_code = None;
            }
            ProbeEvent::Timeout => {
                check.res_time = Some(self.req_time() + self.timeout.as_millis() as i64);
                check.err_code = Some(TIMEOUT_CODE.to_string());
            }
            ProbeEvent::Error { error, at } => {
                check.res_time = Some(at);
                check.err_code = Some(error.err_code().to_string());
            }
        }
        Some(check)
    }
}

/// Outbound request derived from a check.
#[derive(Debug, Clone, PartialEq)]
pub struct ProbeRequest {
    pub url: reqwest::Url,
    pub method: CheckMethod,
    pub payload: Option<Payload>,
}

impl ProbeRequest {
    /// Build the request for `check`.
    ///
    /// Fails when the stored URL does not parse, which only happens if the
    /// snapshot was edited by hand.
    pub fn from_check(check: &Check) -> Result<Self, Error> {
        let url = reqwest::Url::parse(&check.url)
            .map_err(|e| Error::validation(format!("The url '{}' is invalid: {}", check.url, e)))?;
        Ok(Self {
            url,
            method: check.method,
            payload: check.payload.clone().filter(|p| !p.is_empty()),
        })
    }

    /// Whether the request goes over TLS.
    pub fn is_secure(&self) -> bool {
        self.url.scheme() == "https"
    }
}
