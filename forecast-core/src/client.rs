use std::{
    fmt::Debug,
    sync::Arc,
    time::{Duration, Instant},
};

use async_trait::async_trait;
use reqwest::{Client, StatusCode, header::ACCEPT};
use serde_json::Value;
use url::Url;

use crate::{
    diagnostics::{
        self, DiagnosticEntry, DiagnosticsSink, NetworkEvent, redact_headers, redact_url,
        redact_url_str,
    },
    error::{FetchFailure, TransportCause},
    model::{Coordinate, RawForecastResponse},
};

pub const DEFAULT_BASE_URL: &str = "https://api.open-meteo.com/v1/forecast";
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(15);
pub const DEFAULT_RESOURCE_TIMEOUT: Duration = Duration::from_secs(60);

const HOURLY_FIELDS: &str = "temperature_2m";

/// Source of raw hourly forecasts.
#[async_trait]
pub trait ForecastApi: Send + Sync + Debug {
    async fn fetch_forecast(&self, coordinate: Coordinate)
    -> Result<RawForecastResponse, FetchFailure>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchOptions {
    /// Limit on waiting for the response to start arriving.
    pub request_timeout: Duration,
    /// Limit on the whole exchange, body included.
    pub resource_timeout: Duration,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            resource_timeout: DEFAULT_RESOURCE_TIMEOUT,
        }
    }
}

/// Open-Meteo hourly temperature client.
#[derive(Debug, Clone)]
pub struct OpenMeteoClient {
    base_url: String,
    options: FetchOptions,
    http: Client,
    diagnostics: Arc<dyn DiagnosticsSink>,
}

impl OpenMeteoClient {
    pub fn new(base_url: impl Into<String>, options: FetchOptions) -> Result<Self, reqwest::Error> {
        let http = Client::builder().connect_timeout(options.request_timeout).build()?;

        Ok(Self {
            base_url: base_url.into(),
            options,
            http,
            diagnostics: Arc::new(diagnostics::Disabled),
        })
    }

    pub fn with_diagnostics(mut self, sink: Arc<dyn DiagnosticsSink>) -> Self {
        self.diagnostics = sink;
        self
    }

    pub fn options(&self) -> FetchOptions {
        self.options
    }

    fn log(&self, event: impl FnOnce() -> NetworkEvent, latency: Option<Duration>) {
        if !self.diagnostics.enabled() {
            return;
        }
        let event = event();
        self.diagnostics.log(match latency {
            Some(latency) => DiagnosticEntry::with_latency(event, latency),
            None => DiagnosticEntry::new(event),
        });
    }
}

/// `{base}?latitude=..&longitude=..&hourly=temperature_2m`.
pub fn forecast_url(base_url: &str, coordinate: Coordinate) -> Result<Url, FetchFailure> {
    if !coordinate.is_finite() {
        return Err(FetchFailure::InvalidRequest(format!(
            "coordinate is not finite: {coordinate}"
        )));
    }

    let mut url = Url::parse(base_url)
        .map_err(|err| FetchFailure::InvalidRequest(format!("base url {base_url:?}: {err}")))?;

    if url.cannot_be_a_base() {
        return Err(FetchFailure::InvalidRequest(format!(
            "base url {base_url:?} cannot carry query parameters"
        )));
    }

    url.query_pairs_mut()
        .append_pair("latitude", &coordinate.latitude.to_string())
        .append_pair("longitude", &coordinate.longitude.to_string())
        .append_pair("hourly", HOURLY_FIELDS);

    Ok(url)
}

#[async_trait]
impl ForecastApi for OpenMeteoClient {
    async fn fetch_forecast(
        &self,
        coordinate: Coordinate,
    ) -> Result<RawForecastResponse, FetchFailure> {
        let url = forecast_url(&self.base_url, coordinate).inspect_err(|_| {
            self.log(|| NetworkEvent::InvalidUrl { url: redact_url_str(&self.base_url) }, None);
        })?;

        let request = self
            .http
            .get(url.clone())
            .header(ACCEPT, "application/json")
            .timeout(self.options.resource_timeout)
            .build()
            .map_err(|err| FetchFailure::InvalidRequest(err.to_string()))?;

        self.log(
            || NetworkEvent::RequestSent {
                url: redact_url(&url),
                method: request.method().to_string(),
                headers: redact_headers(request.headers()),
            },
            None,
        );

        let started = Instant::now();
        let transport_error = |cause: TransportCause| {
            self.log(
                || NetworkEvent::TransportError { message: cause.to_string() },
                Some(started.elapsed()),
            );
            FetchFailure::Transport(cause)
        };

        let response =
            match tokio::time::timeout(self.options.request_timeout, self.http.execute(request))
                .await
            {
                Ok(Ok(response)) => response,
                Ok(Err(err)) => return Err(transport_error(TransportCause::Client(err))),
                Err(_) => {
                    return Err(transport_error(TransportCause::TimedOut(
                        self.options.request_timeout,
                    )));
                }
            };

        let status = response.status();
        self.log(
            || NetworkEvent::ResponseReceived {
                status: status.as_u16(),
                headers: redact_headers(response.headers()),
            },
            Some(started.elapsed()),
        );

        let body = response
            .bytes()
            .await
            .map_err(|err| transport_error(TransportCause::Client(err)))?;
        let latency = started.elapsed();

        // Error statuses still carry a body and are classified by it below.
        if !status.is_success() {
            self.log(
                || NetworkEvent::ErrorStatus {
                    status: status.as_u16(),
                    reason: extract_reason(&body, status),
                },
                Some(latency),
            );
        }

        if body.is_empty() {
            self.log(|| NetworkEvent::EmptyBody { status: status.as_u16() }, Some(latency));
            return Err(FetchFailure::EmptyBody);
        }

        self.log(
            || NetworkEvent::DataFingerprint {
                sha256_prefix: diagnostics::fingerprint(&body),
                bytes: body.len(),
            },
            None,
        );

        match serde_json::from_slice::<RawForecastResponse>(&body) {
            Ok(forecast) => {
                self.log(
                    || NetworkEvent::DecodeSuccess { pretty: diagnostics::pretty_json(&forecast) },
                    Some(latency),
                );
                Ok(forecast)
            }
            Err(err) => {
                self.log(|| NetworkEvent::DecodeFailed { message: err.to_string() }, Some(latency));
                Err(FetchFailure::DecodeFailed(err))
            }
        }
    }
}

/// Error text from an API error body, falling back to the status reason.
fn extract_reason(body: &[u8], status: StatusCode) -> Option<String> {
    let from_json = serde_json::from_slice::<Value>(body).ok().and_then(|json| {
        ["reason", "message", "error"].iter().find_map(|key| {
            json.get(key)
                .and_then(Value::as_str)
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
        })
    });

    from_json.or_else(|| status.canonical_reason().map(str::to_string))
}
