//! Client-side coordinate precision truncation.

use geojson::{Feature, Geometry, Value};

/// Precision value meaning "leave coordinates untouched"
pub const NO_TRUNCATION: i32 = -1;

fn round_to(value: f64, precision: i32) -> f64 {
    let factor = 10f64.powi(precision);
    let scaled = (value * factor).round() / factor;
    if scaled.is_finite() {
        scaled
    } else {
        value
    }
}

fn round_position(position: &mut [f64], precision: i32) {
    for value in position.iter_mut() {
        *value = round_to(*value, precision);
    }
}

fn round_positions(positions: &mut [Vec<f64>], precision: i32) {
    for position in positions.iter_mut() {
        round_position(position, precision);
    }
}

fn round_rings(rings: &mut [Vec<Vec<f64>>], precision: i32) {
    for ring in rings.iter_mut() {
        round_positions(ring, precision);
    }
}

/// Round every coordinate of `geometry` to `precision` decimal digits in place.
///
/// Members of a `GeometryCollection` are truncated independently. Nesting is
/// preserved exactly. A precision of `-1` leaves the geometry untouched.
pub fn truncate_geometry(geometry: Option<&mut Geometry>, precision: i32) {
    let Some(geometry) = geometry else {
        return;
    };
    if precision == NO_TRUNCATION {
        return;
    }

    match &mut geometry.value {
        Value::Point(position) => round_position(position, precision),
        Value::MultiPoint(positions) | Value::LineString(positions) => {
            round_positions(positions, precision)
        }
        Value::MultiLineString(rings) | Value::Polygon(rings) => round_rings(rings, precision),
        Value::MultiPolygon(polygons) => {
            for polygon in polygons.iter_mut() {
                round_rings(polygon, precision);
            }
        }
        Value::GeometryCollection(members) => {
            for member in members.iter_mut() {
                truncate_geometry(Some(member), precision);
            }
        }
    }
}

/// Truncate the geometry of a feature, if it has one
pub fn truncate_feature(feature: &mut Feature, precision: i32) {
    truncate_geometry(feature.geometry.as_mut(), precision);
}

#[cfg(test)]
mod tests {
    use super::*;

    const P1: [f64; 2] = [77.89824947, 21.91597942];
    const T_P1: [f64; 2] = [77.898, 21.916];
    const P2: [f64; 2] = [77.898237, 21.9153487];
    const T_P2: [f64; 2] = [77.898, 21.915];
    const P3: [f64; 2] = [77.8982494, 21.9151794];
    const T_P3: [f64; 2] = [77.898, 21.915];
    const P4: [f64; 2] = [77.8981754, 21.9150513];
    const T_P4: [f64; 2] = [77.898, 21.915];

    fn pos(p: [f64; 2]) -> Vec<f64> {
        p.to_vec()
    }

    #[test]
    fn test_none_is_noop() {
        truncate_geometry(None, 3);
    }

    #[test]
    fn test_point() {
        let mut geom = Geometry::new(Value::Point(pos(P1)));
        truncate_geometry(Some(&mut geom), 3);
        assert_eq!(geom.value, Value::Point(pos(T_P1)));
    }

    #[test]
    fn test_minus_one_is_byte_identical() {
        let mut geom = Geometry::new(Value::Point(pos(P1)));
        let before = serde_json::to_string(&geom).unwrap();
        truncate_geometry(Some(&mut geom), NO_TRUNCATION);
        assert_eq!(serde_json::to_string(&geom).unwrap(), before);
    }

    #[test]
    fn test_higher_precision_keeps_values() {
        let mut geom = Geometry::new(Value::Point(pos(P1)));
        truncate_geometry(Some(&mut geom), 8);
        assert_eq!(geom.value, Value::Point(pos(P1)));
    }

    #[test]
    fn test_polygon_keeps_nesting() {
        let mut geom = Geometry::new(Value::Polygon(vec![
            vec![pos(P2), pos(P3), pos(P4), pos(P2)],
            vec![pos(P1), pos(P2), pos(P3), pos(P1)],
        ]));
        truncate_geometry(Some(&mut geom), 3);
        assert_eq!(
            geom.value,
            Value::Polygon(vec![
                vec![pos(T_P2), pos(T_P3), pos(T_P4), pos(T_P2)],
                vec![pos(T_P1), pos(T_P2), pos(T_P3), pos(T_P1)],
            ])
        );
    }

    #[test]
    fn test_multipolygon() {
        let mut geom = Geometry::new(Value::MultiPolygon(vec![
            vec![vec![pos(P2), pos(P3), pos(P4), pos(P2)]],
            vec![vec![pos(P3), pos(P4), pos(P2), pos(P3)]],
        ]));
        truncate_geometry(Some(&mut geom), 3);
        assert_eq!(
            geom.value,
            Value::MultiPolygon(vec![
                vec![vec![pos(T_P2), pos(T_P3), pos(T_P4), pos(T_P2)]],
                vec![vec![pos(T_P3), pos(T_P4), pos(T_P2), pos(T_P3)]],
            ])
        );
    }

    #[test]
    fn test_geometry_collection_members() {
        let mut geom = Geometry::new(Value::GeometryCollection(vec![
            Geometry::new(Value::Point(pos(P1))),
            Geometry::new(Value::LineString(vec![pos(P2), pos(P3)])),
            Geometry::new(Value::MultiPoint(vec![pos(P4)])),
        ]));
        truncate_geometry(Some(&mut geom), 3);
        assert_eq!(
            geom.value,
            Value::GeometryCollection(vec![
                Geometry::new(Value::Point(pos(T_P1))),
                Geometry::new(Value::LineString(vec![pos(T_P2), pos(T_P3)])),
                Geometry::new(Value::MultiPoint(vec![pos(T_P4)])),
            ])
        );
    }

    #[test]
    fn test_feature_without_geometry() {
        let mut feature = Feature {
            bbox: None,
            geometry: None,
            id: None,
            properties: None,
            foreign_members: None,
        };
        truncate_feature(&mut feature, 3);
        assert!(feature.geometry.is_none());
    }
}
