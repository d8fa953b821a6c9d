//! Display strings for route summaries.

/// `950.0` → `"950 m"`, `12345.0` → `"12.3 km"`.
pub fn format_distance(meters: f64) -> String {
    let whole_meters = meters.max(0.0).round();
    if whole_meters >= 1000.0 {
        format!("{:.1} km", meters / 1000.0)
    } else {
        format!("{whole_meters:.0} m")
    }
}

/// `1800.0` → `"30 mins"`, `3600.0` → `"1 hours"`, `5400.0` → `"1.5 hours"`.
pub fn format_duration(seconds: f64) -> String {
    let minutes = (seconds / 60.0).max(0.0).round();
    if minutes >= 60.0 {
        let hours = (seconds / 360.0).round() / 10.0;
        format!("{hours} hours")
    } else {
        format!("{minutes:.0} mins")
    }
}
