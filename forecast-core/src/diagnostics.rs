//! Request/response diagnostics for the forecast client.
//!
//! Entries go through the [`DiagnosticsSink`] the client is constructed with.
//! Everything that reaches a sink has already been redacted.

use std::{fmt::Debug, sync::Arc, time::Duration};

use reqwest::header::HeaderMap;
use serde::Serialize;
use sha2::{Digest, Sha256};
use url::Url;

/// Query parameters never written to diagnostics.
const SENSITIVE_PARAMS: &[&str] = &["password", "token"];

/// Header names containing this are never written to diagnostics.
const SENSITIVE_HEADER_FRAGMENT: &str = "auth";

const LOG_TARGET: &str = "forecast_core::network";

#[derive(Debug, Clone, PartialEq)]
pub enum NetworkEvent {
    InvalidUrl { url: String },
    RequestSent { url: String, method: String, headers: Vec<(String, String)> },
    TransportError { message: String },
    ErrorStatus { status: u16, reason: Option<String> },
    ResponseReceived { status: u16, headers: Vec<(String, String)> },
    EmptyBody { status: u16 },
    DataFingerprint { sha256_prefix: String, bytes: usize },
    DecodeSuccess { pretty: String },
    DecodeFailed { message: String },
}

#[derive(Debug, Clone, PartialEq)]
pub struct DiagnosticEntry {
    pub event: NetworkEvent,
    pub latency: Option<Duration>,
}

impl DiagnosticEntry {
    pub fn new(event: NetworkEvent) -> Self {
        Self { event, latency: None }
    }

    pub fn with_latency(event: NetworkEvent, latency: Duration) -> Self {
        Self { event, latency: Some(latency) }
    }
}

pub trait DiagnosticsSink: Send + Sync + Debug {
    fn log(&self, entry: DiagnosticEntry);

    /// When false the client skips building entries altogether.
    fn enabled(&self) -> bool {
        true
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Disabled;

impl DiagnosticsSink for Disabled {
    fn log(&self, _entry: DiagnosticEntry) {}

    fn enabled(&self) -> bool {
        false
    }
}

/// Writes entries as `tracing` debug events.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingDiagnostics;

impl DiagnosticsSink for TracingDiagnostics {
    fn log(&self, entry: DiagnosticEntry) {
        let latency_ms = entry.latency.map(|l| l.as_secs_f64() * 1000.0);

        match entry.event {
            NetworkEvent::InvalidUrl { url } => {
                tracing::debug!(target: LOG_TARGET, %url, "invalid request url");
            }
            NetworkEvent::RequestSent { url, method, headers } => {
                tracing::debug!(target: LOG_TARGET, %method, %url, ?headers, "request sent");
            }
            NetworkEvent::TransportError { message } => {
                tracing::debug!(target: LOG_TARGET, ?latency_ms, error = %message, "transport error");
            }
            NetworkEvent::ErrorStatus { status, reason } => {
                tracing::debug!(target: LOG_TARGET, ?latency_ms, status, ?reason, "error status");
            }
            NetworkEvent::ResponseReceived { status, headers } => {
                tracing::debug!(target: LOG_TARGET, ?latency_ms, status, ?headers, "response received");
            }
            NetworkEvent::EmptyBody { status } => {
                tracing::debug!(target: LOG_TARGET, ?latency_ms, status, "empty body");
            }
            NetworkEvent::DataFingerprint { sha256_prefix, bytes } => {
                tracing::debug!(
                    target: LOG_TARGET,
                    sha256 = %sha256_prefix,
                    size = %format_byte_size(bytes),
                    "body fingerprint"
                );
            }
            NetworkEvent::DecodeSuccess { pretty } => {
                tracing::debug!(target: LOG_TARGET, ?latency_ms, "decoded forecast\n{pretty}");
            }
            NetworkEvent::DecodeFailed { message } => {
                tracing::debug!(target: LOG_TARGET, ?latency_ms, error = %message, "decode failed");
            }
        }
    }
}

/// Sink for the given on/off switch.
pub fn sink_for(enabled: bool) -> Arc<dyn DiagnosticsSink> {
    if enabled { Arc::new(TracingDiagnostics) } else { Arc::new(Disabled) }
}

/// Strips sensitive query parameters from `url`.
pub fn redact_url(url: &Url) -> String {
    let mut redacted = url.clone();
    let kept: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(name, _)| !SENSITIVE_PARAMS.iter().any(|s| name.eq_ignore_ascii_case(s)))
        .map(|(name, value)| (name.into_owned(), value.into_owned()))
        .collect();

    if kept.is_empty() {
        redacted.set_query(None);
    } else {
        redacted.query_pairs_mut().clear().extend_pairs(kept);
    }
    redacted.to_string()
}

/// Same as [`redact_url`] for a string that may not parse.
pub fn redact_url_str(raw: &str) -> String {
    match Url::parse(raw) {
        Ok(url) => redact_url(&url),
        // Unparsable: drop the whole query.
        Err(_) => raw.split('?').next().unwrap_or_default().to_string(),
    }
}

/// Header pairs with authentication-related names removed.
pub fn redact_headers(headers: &HeaderMap) -> Vec<(String, String)> {
    headers
        .iter()
        .filter(|(name, _)| !name.as_str().to_ascii_lowercase().contains(SENSITIVE_HEADER_FRAGMENT))
        .map(|(name, value)| {
            (name.as_str().to_string(), value.to_str().unwrap_or("<binary>").to_string())
        })
        .collect()
}

/// First eight hex digits of the body's SHA-256.
pub fn fingerprint(body: &[u8]) -> String {
    let digest = Sha256::digest(body);
    hex::encode(digest)[..8].to_string()
}

/// Pretty JSON rendering of any decoded value, for diagnostics only.
pub fn pretty_json<T: Serialize>(value: &T) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|err| format!("<unserializable: {err}>"))
}

/// Byte count as KB or MB, matching file-size conventions (1000-based).
pub fn format_byte_size(bytes: usize) -> String {
    const KB: f64 = 1000.0;
    const MB: f64 = KB * 1000.0;

    let bytes = bytes as f64;
    if bytes >= MB {
        format!("{:.1} MB", bytes / MB)
    } else {
        format!("{:.1} KB", bytes / KB)
    }
}
