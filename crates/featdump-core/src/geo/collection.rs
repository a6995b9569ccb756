//! Simplification of KML `MultiGeometry` collections.
//!
//! Map servers often render a polygon or line as a `MultiGeometry` holding the
//! shape plus one label point. These helpers drop that point (when asked) and
//! collapse homogeneous collections into the matching `Multi*` geometry.

use geojson::{Geometry, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SimpleKind {
    Point,
    LineString,
    Polygon,
}

fn simple_kind(value: &Value) -> Option<SimpleKind> {
    match value {
        Value::Point(_) => Some(SimpleKind::Point),
        Value::LineString(_) => Some(SimpleKind::LineString),
        Value::Polygon(_) => Some(SimpleKind::Polygon),
        _ => None,
    }
}

/// Single kind shared by every member, if any
fn common_kind(members: &[&Geometry]) -> Option<SimpleKind> {
    let first = simple_kind(&members.first()?.value)?;
    members
        .iter()
        .all(|g| simple_kind(&g.value) == Some(first))
        .then_some(first)
}

fn collapse(members: Vec<&Geometry>, kind: SimpleKind) -> Geometry {
    if members.len() == 1 {
        return members[0].clone();
    }

    let value = match kind {
        SimpleKind::Point => Value::MultiPoint(
            members
                .into_iter()
                .filter_map(|g| match &g.value {
                    Value::Point(p) => Some(p.clone()),
                    _ => None,
                })
                .collect(),
        ),
        SimpleKind::LineString => Value::MultiLineString(
            members
                .into_iter()
                .filter_map(|g| match &g.value {
                    Value::LineString(l) => Some(l.clone()),
                    _ => None,
                })
                .collect(),
        ),
        SimpleKind::Polygon => Value::MultiPolygon(
            members
                .into_iter()
                .filter_map(|g| match &g.value {
                    Value::Polygon(p) => Some(p.clone()),
                    _ => None,
                })
                .collect(),
        ),
    };
    Geometry::new(value)
}

/// Simplify a geometry collection, returning other geometries unchanged
pub fn normalize_collection(geometry: Geometry, strip_points: bool) -> Geometry {
    let Value::GeometryCollection(members) = &geometry.value else {
        return geometry;
    };

    let all: Vec<&Geometry> = members.iter().collect();
    if let Some(kind) = common_kind(&all) {
        return collapse(all, kind);
    }

    if strip_points {
        let points = all
            .iter()
            .filter(|g| simple_kind(&g.value) == Some(SimpleKind::Point))
            .count();
        if points == 1 {
            let rest: Vec<&Geometry> = all
                .iter()
                .copied()
                .filter(|g| simple_kind(&g.value) != Some(SimpleKind::Point))
                .collect();
            if let Some(kind) = common_kind(&rest) {
                return collapse(rest, kind);
            }
        }
    }

    geometry
}
