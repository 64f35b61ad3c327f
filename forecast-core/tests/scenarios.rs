//! End-to-end acquisition scenarios: location, fetch and series together.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use forecast_core::location::{Authorization, LocationEvents, PlatformError, PlatformErrorCode};
use forecast_core::series::{SkippedEntry, to_series_with_skipped};
use forecast_core::{
    Acquisition, AcquisitionFailure, Coordinate, FetchFailure, FetchOptions, FixedPosition,
    LocationFailure, LocationPlatform, LocationResolver, OpenMeteoClient, RawForecastResponse,
    Recovery,
};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const JAN_1_2025: f64 = 1_735_689_600.0;

/// Platform whose subscription immediately reports a denial.
#[derive(Debug, Default)]
struct DenyingPlatform {
    subscriptions: AtomicUsize,
}

#[async_trait]
impl LocationPlatform for DenyingPlatform {
    async fn authorization(&self) -> Authorization {
        Authorization::NotDetermined
    }

    async fn request_permission(&self) -> Result<Authorization, PlatformError> {
        Ok(Authorization::NotDetermined)
    }

    fn subscribe(&self, events: LocationEvents) -> Result<(), PlatformError> {
        self.subscriptions.fetch_add(1, Ordering::SeqCst);
        events.on_error(PlatformError::new(PlatformErrorCode::Denied, "user declined"));
        Ok(())
    }

    fn unsubscribe(&self) {}
}

fn berlin() -> LocationResolver {
    LocationResolver::new(Arc::new(FixedPosition::new(Some(Coordinate::new(52.52, 13.405)))))
}

fn acquisition(server: &MockServer, resolver: LocationResolver, options: FetchOptions) -> Acquisition {
    let client = OpenMeteoClient::new(format!("{}/v1/forecast", server.uri()), options).unwrap();
    Acquisition::new(resolver, Box::new(client))
}

#[tokio::test]
async fn scenario_berlin_two_hours() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v1/forecast"))
        .and(query_param("latitude", "52.52"))
        .and(query_param("longitude", "13.405"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            r#"{"latitude":52.52,"longitude":13.405,"hourly":{"time":["2025-01-01T00:00","2025-01-01T01:00"],"temperature_2m":[1.5,2.0]}}"#,
        ))
        .expect(1)
        .mount(&mock_server)
        .await;

    let series = acquisition(&mock_server, berlin(), FetchOptions::default())
        .get_current_forecast()
        .await
        .unwrap();

    let points = series.points();
    assert_eq!(points.len(), 2);
    assert_eq!((points[0].instant, points[0].value), (JAN_1_2025, 1.5));
    assert_eq!((points[1].instant, points[1].value), (JAN_1_2025 + 3600.0, 2.0));
}

#[tokio::test]
async fn scenario_one_malformed_timestamp() {
    let body = serde_json::json!({
        "latitude": 52.52,
        "longitude": 13.405,
        "hourly": {
            "time": ["2025-99-99T00:00", "2025-01-01T01:00"],
            "temperature_2m": [1.5, 2.0]
        }
    });
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v1/forecast"))
        .respond_with(ResponseTemplate::new(200).set_body_json(body.clone()))
        .mount(&mock_server)
        .await;

    let series = acquisition(&mock_server, berlin(), FetchOptions::default())
        .get_current_forecast()
        .await
        .unwrap();

    assert_eq!(series.len(), 1);
    assert_eq!(series.points()[0].instant, JAN_1_2025 + 3600.0);
    assert_eq!(series.points()[0].value, 2.0);

    // The same feed reports which entry was dropped.
    let raw: RawForecastResponse = serde_json::from_value(body).unwrap();
    let (reported, skipped) = to_series_with_skipped(&raw);
    assert_eq!(reported, series);
    assert_eq!(
        skipped,
        vec![SkippedEntry { index: 0, raw: "2025-99-99T00:00".to_string() }]
    );
}

#[tokio::test]
async fn scenario_permission_denied_never_fetches() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&mock_server)
        .await;

    let platform = Arc::new(DenyingPlatform::default());
    let resolver = LocationResolver::new(platform.clone());

    let err = acquisition(&mock_server, resolver, FetchOptions::default())
        .get_current_forecast()
        .await
        .unwrap_err();

    assert!(matches!(err, AcquisitionFailure::Location(LocationFailure::PermissionDenied)));
    assert_eq!(err.recovery(), Recovery::OpenSettings);
    assert_eq!(platform.subscriptions.load(Ordering::SeqCst), 1);
    assert!(mock_server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn scenario_request_timeout_is_transport_failure() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v1/forecast"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(3)))
        .mount(&mock_server)
        .await;

    let options = FetchOptions {
        request_timeout: Duration::from_millis(250),
        resource_timeout: Duration::from_secs(60),
    };

    let err = acquisition(&mock_server, berlin(), options)
        .get_current_forecast()
        .await
        .unwrap_err();

    assert!(
        matches!(err, AcquisitionFailure::Fetch(FetchFailure::Transport(ref cause)) if cause.is_timeout()),
        "got {err:?}"
    );
    assert_eq!(err.recovery(), Recovery::Retry);
}
