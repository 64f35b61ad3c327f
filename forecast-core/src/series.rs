use chrono::NaiveDateTime;

use crate::model::{ForecastPoint, ForecastSeries, RawForecastResponse};

/// Layout of the feed's hourly timestamps; no offset, read as UTC.
pub const FEED_TIME_FORMAT: &str = "%Y-%m-%dT%H:%M";

/// An hourly entry dropped because its timestamp did not parse.
#[derive(Debug, Clone, PartialEq)]
pub struct SkippedEntry {
    pub index: usize,
    pub raw: String,
}

/// Builds the chartable series, dropping entries with malformed timestamps.
pub fn to_series(raw: &RawForecastResponse) -> ForecastSeries {
    to_series_with_skipped(raw).0
}

/// Like [`to_series`] but also reports which entries were dropped.
pub fn to_series_with_skipped(raw: &RawForecastResponse) -> (ForecastSeries, Vec<SkippedEntry>) {
    let hourly = &raw.hourly;
    if hourly.time.len() != hourly.temperature.len() {
        tracing::debug!(
            times = hourly.time.len(),
            temperatures = hourly.temperature.len(),
            "hourly arrays differ in length, using the common prefix"
        );
    }

    let mut points = Vec::with_capacity(hourly.usable_len());
    let mut skipped = Vec::new();

    for (index, (time, &value)) in hourly.time.iter().zip(&hourly.temperature).enumerate() {
        match parse_instant(time) {
            Some(instant) => points.push(ForecastPoint { instant, value }),
            None => {
                tracing::warn!(index, raw = %time, "skipping unparsable forecast timestamp");
                skipped.push(SkippedEntry { index, raw: time.clone() });
            }
        }
    }

    (ForecastSeries::new(points), skipped)
}

/// Seconds since the epoch for a feed timestamp.
pub fn parse_instant(raw: &str) -> Option<f64> {
    NaiveDateTime::parse_from_str(raw, FEED_TIME_FORMAT)
        .ok()
        .map(|dt| dt.and_utc().timestamp() as f64)
}
