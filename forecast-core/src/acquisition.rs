use crate::{
    client::ForecastApi,
    error::AcquisitionFailure,
    location::LocationResolver,
    model::ForecastSeries,
    series,
};

/// Location → forecast → series, as one call for the presentation layer.
///
/// Holds no retry state: every call resolves the position again, since the
/// device may have moved since the previous attempt.
#[derive(Debug)]
pub struct Acquisition {
    resolver: LocationResolver,
    api: Box<dyn ForecastApi>,
}

impl Acquisition {
    pub fn new(resolver: LocationResolver, api: Box<dyn ForecastApi>) -> Self {
        Self { resolver, api }
    }

    pub async fn get_current_forecast(&self) -> Result<ForecastSeries, AcquisitionFailure> {
        let coordinate = self.resolver.resolve_current_location().await?;
        tracing::info!(%coordinate, "fetching hourly forecast");

        let raw = self.api.fetch_forecast(coordinate).await?;

        let series = series::to_series(&raw);
        tracing::info!(points = series.len(), "forecast series ready");
        Ok(series)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    };

    use async_trait::async_trait;

    use super::*;
    use crate::{
        error::{FetchFailure, LocationFailure},
        location::{
            Authorization, FixedPosition, LocationEvents, LocationPlatform, PlatformError,
        },
        model::{Coordinate, RawForecastResponse, RawHourly},
    };

    #[derive(Debug, Default)]
    struct CountingApi {
        calls: AtomicUsize,
        seen: std::sync::Mutex<Vec<Coordinate>>,
        fail: bool,
        time: Vec<String>,
    }

    #[async_trait]
    impl ForecastApi for Arc<CountingApi> {
        async fn fetch_forecast(
            &self,
            coordinate: Coordinate,
        ) -> Result<RawForecastResponse, FetchFailure> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.seen.lock().unwrap().push(coordinate);
            if self.fail {
                return Err(FetchFailure::EmptyBody);
            }
            Ok(RawForecastResponse {
                latitude: coordinate.latitude,
                longitude: coordinate.longitude,
                hourly: RawHourly {
                    temperature: (0..self.time.len()).map(|i| i as f64).collect(),
                    time: self.time.clone(),
                },
            })
        }
    }

    #[derive(Debug)]
    struct DeniedPlatform;

    #[async_trait]
    impl LocationPlatform for DeniedPlatform {
        async fn authorization(&self) -> Authorization {
            Authorization::Denied
        }

        async fn request_permission(&self) -> Result<Authorization, PlatformError> {
            Ok(Authorization::Denied)
        }

        fn subscribe(&self, _events: LocationEvents) -> Result<(), PlatformError> {
            Ok(())
        }

        fn unsubscribe(&self) {}
    }

    fn at(lat: f64, lon: f64) -> LocationResolver {
        LocationResolver::new(Arc::new(FixedPosition::new(Some(Coordinate::new(lat, lon)))))
    }

    #[tokio::test]
    async fn location_failure_short_circuits_fetch() {
        let api = Arc::new(CountingApi::default());
        let acquisition =
            Acquisition::new(LocationResolver::new(Arc::new(DeniedPlatform)), Box::new(api.clone()));

        let err = acquisition.get_current_forecast().await.unwrap_err();

        assert!(matches!(err, AcquisitionFailure::Location(LocationFailure::PermissionDenied)));
        assert_eq!(api.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn fetch_failure_is_wrapped_unchanged() {
        let api = Arc::new(CountingApi { fail: true, ..CountingApi::default() });
        let acquisition = Acquisition::new(at(1.0, 2.0), Box::new(api.clone()));

        let err = acquisition.get_current_forecast().await.unwrap_err();

        assert!(matches!(err, AcquisitionFailure::Fetch(FetchFailure::EmptyBody)));
        assert_eq!(*api.seen.lock().unwrap(), vec![Coordinate::new(1.0, 2.0)]);
    }

    #[tokio::test]
    async fn zero_valid_points_is_still_success() {
        let api = Arc::new(CountingApi {
            time: vec!["nope".into(), "also nope".into()],
            ..CountingApi::default()
        });
        let acquisition = Acquisition::new(at(1.0, 2.0), Box::new(api));

        let series = acquisition.get_current_forecast().await.unwrap();
        assert!(series.is_empty());
    }

    #[tokio::test]
    async fn each_call_is_an_independent_attempt() {
        let api = Arc::new(CountingApi {
            time: vec!["2025-01-01T00:00".into()],
            ..CountingApi::default()
        });
        let acquisition = Acquisition::new(at(3.0, 4.0), Box::new(api.clone()));

        acquisition.get_current_forecast().await.unwrap();
        acquisition.get_current_forecast().await.unwrap();

        assert_eq!(api.calls.load(Ordering::SeqCst), 2);
    }
}
