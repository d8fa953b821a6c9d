use crate::models::Coordinate;

const EARTH_RADIUS_KM: f64 = 6_371.0;

/// Nudge applied to a loop start when nothing better is known about where
/// the loop should go. Roughly 650 m north-east at Lake District latitudes.
pub const LOOP_OFFSET_DEG: f64 = 0.006;

pub fn haversine_km(a: Coordinate, b: Coordinate) -> f64 {
    let lat1 = a.lat.to_radians();
    let lat2 = b.lat.to_radians();
    let dlat = (b.lat - a.lat).to_radians();
    let dlon = (b.lon - a.lon).to_radians();

    let sin_dlat = (dlat / 2.0).sin();
    let sin_dlon = (dlon / 2.0).sin();

    let h = sin_dlat * sin_dlat + lat1.cos() * lat2.cos() * sin_dlon * sin_dlon;
    2.0 * EARTH_RADIUS_KM * h.sqrt().asin()
}

pub fn haversine_m(a: Coordinate, b: Coordinate) -> f64 {
    haversine_km(a, b) * 1000.0
}

pub fn path_length_km(path: &[Coordinate]) -> f64 {
    path.windows(2).map(|w| haversine_km(w[0], w[1])).sum()
}

/// Evenly spaced points from `start` to `end`, both included.
///
/// `segments == 0` is treated as 1, so the result always has at least the
/// two endpoints.
pub fn straight_line(start: Coordinate, end: Coordinate, segments: usize) -> Vec<Coordinate> {
    let segments = segments.max(1);
    (0..=segments)
        .map(|i| match i {
            0 => start,
            i if i == segments => end,
            i => start.interpolate(end, i as f64 / segments as f64),
        })
        .collect()
}

/// Deterministic point near `start` used to give a loop some shape.
pub fn loop_offset(start: Coordinate) -> Coordinate {
    Coordinate {
        lat: (start.lat + LOOP_OFFSET_DEG).min(90.0),
        lon: start.lon + LOOP_OFFSET_DEG,
    }
}

/// Point of `path` farthest from `origin`, if the path has any points.
pub fn farthest_from(origin: Coordinate, path: &[Coordinate]) -> Option<Coordinate> {
    path.iter().copied().max_by(|a, b| {
        haversine_km(origin, *a)
            .partial_cmp(&haversine_km(origin, *b))
            .unwrap_or(std::cmp::Ordering::Equal)
    })
}

/// Drop points that repeat their predecessor within `epsilon` degrees.
pub fn dedup_consecutive(points: &[Coordinate], epsilon: f64) -> Vec<Coordinate> {
    let mut result: Vec<Coordinate> = Vec::with_capacity(points.len());
    for &point in points {
        if result
            .last()
            .is_some_and(|last| last.approx_eq(point, epsilon))
        {
            continue;
        }
        result.push(point);
    }
    result
}

/// Keep at most `max` points, evenly spread, always including both ends.
pub fn sample_evenly(path: &[Coordinate], max: usize) -> Vec<Coordinate> {
    if path.len() <= max || max < 2 {
        return path.to_vec();
    }
    let last = path.len() - 1;
    (0..max)
        .map(|i| path[(i * last + (max - 1) / 2) / (max - 1)])
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_haversine_same_point() {
        let point = Coordinate { lat: 54.4, lon: -3.0 };
        assert_eq!(haversine_km(point, point), 0.0);
    }

    #[test]
    fn test_haversine_symmetry() {
        let a = Coordinate { lat: 54.4, lon: -3.0 };
        let b = Coordinate { lat: 54.5, lon: -3.1 };
        assert_eq!(haversine_km(a, b), haversine_km(b, a));
    }

    #[test]
    fn test_haversine_1km_north() {
        let dist = haversine_m(
            Coordinate { lat: 54.0, lon: -3.0 },
            Coordinate { lat: 54.009, lon: -3.0 },
        );
        assert!((dist - 1000.0).abs() < 10.0);
    }

    #[test]
    fn test_path_length_empty() {
        assert_eq!(path_length_km(&[]), 0.0);
    }

    #[test]
    fn test_path_length_single_point() {
        let path = vec![Coordinate { lat: 54.4, lon: -3.0 }];
        assert_eq!(path_length_km(&path), 0.0);
    }

    #[test]
    fn straight_line_keeps_endpoints() {
        let a = Coordinate::new(54.40, -3.00);
        let b = Coordinate::new(54.42, -3.02);
        let line = straight_line(a, b, 4);
        assert_eq!(line.len(), 5);
        assert_eq!(line[0], a);
        assert_eq!(line[4], b);
        assert!((line[2].lat - 54.41).abs() < 1e-12);
    }

    #[test]
    fn straight_line_zero_segments_is_two_points() {
        let a = Coordinate::new(54.40, -3.00);
        assert_eq!(straight_line(a, a, 0), vec![a, a]);
    }

    #[test]
    fn loop_offset_moves_beyond_epsilon() {
        let start = Coordinate::new(54.40, -3.00);
        assert!(!start.approx_eq(loop_offset(start), shared::COORD_EPSILON));
    }

    #[test]
    fn dedup_drops_repeated_points_only() {
        let a = Coordinate::new(54.40, -3.00);
        let b = Coordinate::new(54.41, -3.00);
        let points = [a, a, b, Coordinate::new(54.410_000_1, -3.0), a];
        assert_eq!(dedup_consecutive(&points, 1e-6), vec![a, b, a]);
    }

    #[test]
    fn farthest_point_is_found() {
        let origin = Coordinate::new(54.40, -3.00);
        let far = Coordinate::new(54.45, -3.00);
        let path = [origin, Coordinate::new(54.42, -3.0), far, origin];
        assert_eq!(farthest_from(origin, &path), Some(far));
        assert_eq!(farthest_from(origin, &[]), None);
    }

    #[test]
    fn sample_evenly_includes_ends() {
        let path: Vec<Coordinate> = (0..100)
            .map(|i| Coordinate::new(54.0 + i as f64 * 0.001, -3.0))
            .collect();
        let sampled = sample_evenly(&path, 10);
        assert_eq!(sampled.len(), 10);
        assert_eq!(sampled[0], path[0]);
        assert_eq!(sampled[9], path[99]);
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        fn valid_coord() -> impl Strategy<Value = Coordinate> {
            (-90.0..=90.0, -180.0..=180.0).prop_map(|(lat, lon)| Coordinate { lat, lon })
        }

        proptest! {
            #[test]
            fn prop_haversine_non_negative(a in valid_coord(), b in valid_coord()) {
                prop_assert!(haversine_km(a, b) >= 0.0);
            }

            #[test]
            fn prop_haversine_symmetric(a in valid_coord(), b in valid_coord()) {
                prop_assert!((haversine_km(a, b) - haversine_km(b, a)).abs() < 1e-10);
            }

            #[test]
            fn prop_haversine_bounded_by_half_earth_circumference(
                a in valid_coord(),
                b in valid_coord()
            ) {
                let max_distance = std::f64::consts::PI * EARTH_RADIUS_KM;
                prop_assert!(haversine_km(a, b) <= max_distance + 0.1);
            }

            #[test]
            fn prop_haversine_triangle_inequality(
                a in valid_coord(),
                b in valid_coord(),
                c in valid_coord()
            ) {
                let dist_ac = haversine_km(a, c);
                prop_assert!(dist_ac <= haversine_km(a, b) + haversine_km(b, c) + 1e-6);
            }

            #[test]
            fn prop_path_length_additive(
                path1 in prop::collection::vec(valid_coord(), 2..5),
                path2 in prop::collection::vec(valid_coord(), 2..5)
            ) {
                let mut combined = path1.clone();
                combined.extend_from_slice(&path2);
                let connection = haversine_km(*path1.last().unwrap(), path2[0]);
                let expected = path_length_km(&path1) + connection + path_length_km(&path2);
                prop_assert!((path_length_km(&combined) - expected).abs() < 1e-6);
            }

            #[test]
            fn prop_straight_line_never_shorter_than_two(
                a in valid_coord(),
                b in valid_coord(),
                segments in 0usize..50
            ) {
                prop_assert!(straight_line(a, b, segments).len() >= 2);
            }
        }
    }
}
