//! KML decoding for WMS GetMap responses.
//!
//! Placemarks become features. The HTML description rendered by the server
//! is turned into properties and `MultiGeometry` is simplified.

use geojson::feature::Id;
use geojson::{Feature, Geometry, Value};
use kml::types::{Coord, Placemark};
use kml::Kml;

use super::exception::check_exception;
use super::html::props_from_html;
use crate::error::{ExtractError, Result};
use crate::geo::normalize_collection;

fn position(coord: &Coord) -> Vec<f64> {
    match coord.z {
        Some(z) => vec![coord.x, coord.y, z],
        None => vec![coord.x, coord.y],
    }
}

fn positions(coords: &[Coord]) -> Vec<Vec<f64>> {
    coords.iter().map(position).collect()
}

fn convert_geometry(geometry: &kml::types::Geometry) -> Option<Geometry> {
    let value = match geometry {
        kml::types::Geometry::Point(point) => Value::Point(position(&point.coord)),
        kml::types::Geometry::LineString(line) => Value::LineString(positions(&line.coords)),
        kml::types::Geometry::LinearRing(ring) => Value::LineString(positions(&ring.coords)),
        kml::types::Geometry::Polygon(polygon) => {
            let mut rings = vec![positions(&polygon.outer.coords)];
            rings.extend(polygon.inner.iter().map(|ring| positions(&ring.coords)));
            Value::Polygon(rings)
        }
        kml::types::Geometry::MultiGeometry(multi) => Value::GeometryCollection(
            multi.geometries.iter().filter_map(convert_geometry).collect(),
        ),
        _ => return None,
    };
    Some(Geometry::new(value))
}

fn convert_placemark(placemark: &Placemark, strip_points: bool) -> Feature {
    let geometry = placemark
        .geometry
        .as_ref()
        .and_then(convert_geometry)
        .map(|g| normalize_collection(g, strip_points));

    let properties = match &placemark.description {
        Some(description) => props_from_html(description),
        None => {
            let mut props = serde_json::Map::new();
            if let Some(name) = &placemark.name {
                props.insert("name".to_string(), serde_json::Value::String(name.clone()));
            }
            props
        }
    };

    Feature {
        bbox: None,
        geometry,
        id: placemark.attrs.get("id").cloned().map(Id::String),
        properties: Some(properties),
        foreign_members: None,
    }
}

fn collect_placemarks(kml: &Kml, strip_points: bool, features: &mut Vec<Feature>) {
    match kml {
        Kml::KmlDocument(doc) => {
            for element in &doc.elements {
                collect_placemarks(element, strip_points, features);
            }
        }
        Kml::Document { elements, .. } | Kml::Folder { elements, .. } => {
            for element in elements {
                collect_placemarks(element, strip_points, features);
            }
        }
        Kml::Placemark(placemark) => features.push(convert_placemark(placemark, strip_points)),
        _ => {}
    }
}

/// Decode every placemark of a KML document, folders included
pub fn decode(text: &str, strip_points: bool) -> Result<Vec<Feature>> {
    check_exception(text)?;

    let kml: Kml = text.parse().map_err(|e: kml::Error| ExtractError::Decode {
        format: "KML".to_string(),
        reason: e.to_string(),
    })?;

    let mut features = Vec::new();
    collect_placemarks(&kml, strip_points, &mut features);
    Ok(features)
}
