use std::f64::consts::PI;

use shared::{Coordinate, ElevationProfile};

use crate::geometry::haversine_km;

/// Valley-floor height the synthetic curve starts from.
pub const BASE_ELEVATION_M: f64 = 100.0;

/// Parse an elevation-gain display string such as `"451m"`, `"320 m"` or
/// `"1,085 m"`. `"N/A"` and anything without digits yield `None`.
pub fn parse_elevation_gain(display: &str) -> Option<f64> {
    let digits: String = display
        .trim()
        .trim_end_matches(|c: char| c.is_alphabetic() || c.is_whitespace())
        .chars()
        .filter(|c| *c != ',')
        .collect();
    digits.trim().parse::<f64>().ok().filter(|v| v.is_finite() && *v >= 0.0)
}

/// Synthesize a smooth single-hump elevation curve along `path`.
///
/// The curve starts and ends at [`BASE_ELEVATION_M`] and peaks at
/// `BASE_ELEVATION_M + gain_m` on the sample nearest the middle of the path
/// (by distance), so the total ascent equals `gain_m` whenever the path has
/// an interior point. Paths of zero length are sampled by index instead.
pub fn synthetic_elevation_profile(path: &[Coordinate], gain_m: f64) -> ElevationProfile {
    if path.is_empty() {
        return profile_from_elevations(Vec::new());
    }

    let mut cumulative = Vec::with_capacity(path.len());
    let mut total = 0.0;
    cumulative.push(0.0);
    for window in path.windows(2) {
        total += haversine_km(window[0], window[1]);
        cumulative.push(total);
    }

    let last = (path.len() - 1).max(1) as f64;
    let shape: Vec<f64> = cumulative
        .iter()
        .enumerate()
        .map(|(idx, distance)| {
            let t = if total > 0.0 {
                distance / total
            } else {
                idx as f64 / last
            };
            (PI * t).sin().max(0.0)
        })
        .collect();

    let peak = shape.iter().copied().fold(0.0, f64::max);
    let scale = if peak > 0.0 { gain_m.max(0.0) / peak } else { 0.0 };
    let elevations = shape
        .into_iter()
        .map(|s| Some(BASE_ELEVATION_M + s * scale))
        .collect();

    profile_from_elevations(elevations)
}

/// Min, max, ascent and descent of a sampled profile. `None` samples are
/// skipped.
pub fn profile_from_elevations(elevations: Vec<Option<f64>>) -> ElevationProfile {
    let valid: Vec<f64> = elevations.iter().filter_map(|&e| e).collect();

    let min_elevation = valid.iter().copied().fold(f64::INFINITY, f64::min);
    let max_elevation = valid.iter().copied().fold(f64::NEG_INFINITY, f64::max);

    let mut total_ascent = 0.0;
    let mut total_descent = 0.0;
    for window in elevations.windows(2) {
        if let (Some(prev), Some(curr)) = (window[0], window[1]) {
            let diff = curr - prev;
            if diff > 0.0 {
                total_ascent += diff;
            } else {
                total_descent += diff.abs();
            }
        }
    }

    ElevationProfile {
        elevations,
        min_elevation: min_elevation.is_finite().then_some(min_elevation),
        max_elevation: max_elevation.is_finite().then_some(max_elevation),
        total_ascent,
        total_descent,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::straight_line;

    #[test]
    fn parses_common_gain_strings() {
        assert_eq!(parse_elevation_gain("451m"), Some(451.0));
        assert_eq!(parse_elevation_gain("320 m"), Some(320.0));
        assert_eq!(parse_elevation_gain("1,085 m"), Some(1085.0));
        assert_eq!(parse_elevation_gain("N/A"), None);
        assert_eq!(parse_elevation_gain(""), None);
    }

    #[test]
    fn empty_path_has_empty_profile() {
        let profile = synthetic_elevation_profile(&[], 300.0);
        assert!(profile.elevations.is_empty());
        assert_eq!(profile.min_elevation, None);
        assert_eq!(profile.max_elevation, None);
        assert_eq!(profile.total_ascent, 0.0);
    }

    #[test]
    fn hump_peaks_at_gain_and_returns_to_base() {
        let a = Coordinate::new(54.40, -3.00);
        let b = Coordinate::new(54.44, -3.00);
        let path = straight_line(a, b, 20);
        let profile = synthetic_elevation_profile(&path, 300.0);

        assert_eq!(profile.elevations.len(), path.len());
        assert!((profile.max_elevation.unwrap() - 400.0).abs() < 1e-6);
        assert!((profile.total_ascent - 300.0).abs() < 1e-6);
        assert!((profile.total_descent - 300.0).abs() < 1e-6);
        let last = profile.elevations.last().unwrap().unwrap();
        assert!((last - BASE_ELEVATION_M).abs() < 1e-6);
    }

    #[test]
    fn zero_length_path_is_sampled_by_index() {
        let a = Coordinate::new(54.40, -3.00);
        let profile = synthetic_elevation_profile(&[a, a, a], 200.0);
        assert!((profile.max_elevation.unwrap() - 300.0).abs() < 1e-6);
    }

    #[test]
    fn sparse_path_still_climbs_full_gain() {
        let path = [
            Coordinate::new(54.40, -3.00),
            Coordinate::new(54.41, -3.00),
            Coordinate::new(54.43, -3.00),
            Coordinate::new(54.44, -3.00),
        ];
        let profile = synthetic_elevation_profile(&path, 451.0);
        assert!((profile.total_ascent - 451.0).abs() < 1e-6);
        assert!((profile.max_elevation.unwrap() - 551.0).abs() < 1e-6);
    }

    #[test]
    fn flat_profile_without_gain() {
        let a = Coordinate::new(54.40, -3.00);
        let b = Coordinate::new(54.41, -3.00);
        let profile = synthetic_elevation_profile(&[a, b], 0.0);
        assert_eq!(profile.total_ascent, 0.0);
        assert_eq!(profile.min_elevation, Some(BASE_ELEVATION_M));
    }

    #[test]
    fn stats_skip_missing_samples() {
        let profile = profile_from_elevations(vec![
            Some(100.0),
            Some(110.0),
            None,
            Some(130.0),
            Some(120.0),
        ]);
        assert_eq!(profile.min_elevation, Some(100.0));
        assert_eq!(profile.max_elevation, Some(130.0));
        assert_eq!(profile.total_ascent, 10.0);
        assert_eq!(profile.total_descent, 10.0);
    }
}
