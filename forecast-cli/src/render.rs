use std::fmt::Write;

use forecast_core::{AcquisitionFailure, ForecastSeries, Recovery};

pub fn table(series: &ForecastSeries) -> String {
    let mut out = String::new();

    if series.is_empty() {
        out.push_str("No forecast points available.\n");
        return out;
    }

    for point in series {
        let _ = writeln!(out, "{}  {:>6.1} °C", point.label(), point.value);
    }

    if let Some((min, max)) = series.temperature_range() {
        let _ = writeln!(out, "\n{} points, {min:.1} °C .. {max:.1} °C", series.len());
    }

    out
}

pub fn failure_message(failure: &AcquisitionFailure) -> String {
    match failure.recovery() {
        Recovery::OpenSettings => format!(
            "Error: {failure}\n\
             Hint: grant location access in your system privacy settings, \
             or set a position with `forecast configure`."
        ),
        Recovery::Retry => format!("Error: {failure}"),
    }
}
