use chrono::DateTime;
use serde::{Deserialize, Serialize};

/// Label format used for chart axes and point tooltips.
pub const POINT_LABEL_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// A latitude/longitude pair in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinate {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self { latitude, longitude }
    }

    pub fn is_finite(&self) -> bool {
        self.latitude.is_finite() && self.longitude.is_finite()
    }
}

impl std::fmt::Display for Coordinate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}, {}", self.latitude, self.longitude)
    }
}

/// Forecast body as returned by the API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawForecastResponse {
    pub latitude: f64,
    pub longitude: f64,
    pub hourly: RawHourly,
}

/// Parallel hourly arrays; index `i` of `time` pairs with index `i` of `temperature`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawHourly {
    pub time: Vec<String>,
    #[serde(rename = "temperature_2m")]
    pub temperature: Vec<f64>,
}

impl RawHourly {
    /// Number of positions present in both arrays.
    pub fn usable_len(&self) -> usize {
        self.time.len().min(self.temperature.len())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ForecastPoint {
    /// Seconds since the Unix epoch.
    pub instant: f64,
    pub value: f64,
}

impl ForecastPoint {
    /// Human-readable UTC label, e.g. `2025-01-01 01:00:00`.
    pub fn label(&self) -> String {
        let secs = self.instant.floor() as i64;
        let nanos = ((self.instant - self.instant.floor()) * 1e9) as u32;
        DateTime::from_timestamp(secs, nanos)
            .map(|dt| dt.format(POINT_LABEL_FORMAT).to_string())
            .unwrap_or_else(|| format!("{}", self.instant))
    }
}

/// Points in the order the feed delivered them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ForecastSeries {
    points: Vec<ForecastPoint>,
}

impl ForecastSeries {
    pub fn new(points: Vec<ForecastPoint>) -> Self {
        Self { points }
    }

    pub fn points(&self) -> &[ForecastPoint] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ForecastPoint> {
        self.points.iter()
    }

    /// Lowest and highest temperature, or `None` for an empty series.
    pub fn temperature_range(&self) -> Option<(f64, f64)> {
        self.points.iter().fold(None, |acc, p| match acc {
            None => Some((p.value, p.value)),
            Some((lo, hi)) => Some((lo.min(p.value), hi.max(p.value))),
        })
    }

    pub fn into_points(self) -> Vec<ForecastPoint> {
        self.points
    }
}

impl<'a> IntoIterator for &'a ForecastSeries {
    type Item = &'a ForecastPoint;
    type IntoIter = std::slice::Iter<'a, ForecastPoint>;

    fn into_iter(self) -> Self::IntoIter {
        self.points.iter()
    }
}
