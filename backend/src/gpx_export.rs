use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use geo_types::Point;
use gpx::{Gpx, GpxVersion, Track, TrackSegment, Waypoint};

use crate::error::ExportError;
use crate::models::{Coordinate, Walk};

/// GPX 1.1 document with one track: the walk's name, description and raw
/// waypoints. No elevation, no timestamps.
pub fn encode_walk_as_gpx(walk: &Walk) -> Result<String, ExportError> {
    let mut gpx = Gpx {
        version: GpxVersion::Gpx11,
        creator: Some("walkbook".into()),
        ..Default::default()
    };
    let mut track = Track {
        name: Some(walk.name.clone()),
        ..Default::default()
    };
    if !walk.description.is_empty() {
        track.description = Some(walk.description.clone());
    }

    let mut segment = TrackSegment::new();
    for waypoint in walk.waypoints.iter().map(to_waypoint) {
        segment.points.push(waypoint);
    }
    track.segments.push(segment);
    gpx.tracks.push(track);

    let mut buffer = Vec::new();
    gpx::write(&gpx, &mut buffer)?;
    Ok(String::from_utf8(buffer)?)
}

pub fn encode_walk_as_gpx_base64(walk: &Walk) -> Result<String, ExportError> {
    encode_walk_as_gpx(walk).map(|xml| BASE64.encode(xml))
}

fn to_waypoint(coord: &Coordinate) -> Waypoint {
    Waypoint::new(Point::new(coord.lon, coord.lat))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Difficulty, WalkType};

    fn walk() -> Walk {
        Walk {
            name: "Tarn Hows".into(),
            start: Coordinate::new(54.3869, -3.0365),
            end: Coordinate::new(54.3869, -3.0365),
            waypoints: vec![
                Coordinate::new(54.3869, -3.0365),
                Coordinate::new(54.3901, -3.0402),
                Coordinate::new(54.3869, -3.0365),
            ],
            distance: "2.6 km".into(),
            time: "1 hours".into(),
            difficulty: Difficulty::Easy,
            elevation: "N/A".into(),
            terrain: "Gravel path".into(),
            walk_type: WalkType::Lakeside,
            description: "Gentle circuit of the tarn.".into(),
            payoff: String::new(),
            parking: String::new(),
            directions: Vec::new(),
        }
    }

    #[test]
    fn gpx_contains_track_name_and_points() {
        let xml = encode_walk_as_gpx(&walk()).unwrap();
        assert!(xml.contains("Tarn Hows"));
        assert!(xml.contains("Gentle circuit of the tarn."));
        assert_eq!(xml.matches("<trkpt").count(), 3);
        assert!(!xml.contains("<ele>"));
        assert!(!xml.contains("<time>"));
    }

    #[test]
    fn gpx_parses_back_with_lat_lon_order() {
        let xml = encode_walk_as_gpx(&walk()).unwrap();
        let parsed = gpx::read(xml.as_bytes()).unwrap();
        let point = parsed.tracks[0].segments[0].points[1].point();
        assert!((point.y() - 54.3901).abs() < 1e-9);
        assert!((point.x() + 3.0402).abs() < 1e-9);
    }

    #[test]
    fn base64_variant_is_not_empty() {
        assert!(!encode_walk_as_gpx_base64(&walk()).unwrap().is_empty());
    }
}
