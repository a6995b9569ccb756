//! GeoRSS (Atom) decoding for WMS GetMap responses.

use geojson::feature::Id;
use geojson::{Feature, Geometry, Value};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use super::exception::check_exception;
use super::html::props_from_html;
use crate::error::{ExtractError, Result};

fn decode_error(reason: impl Into<String>) -> ExtractError {
    ExtractError::Decode {
        format: "GeoRSS".to_string(),
        reason: reason.into(),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Shape {
    Point,
    Line,
    Polygon,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    Title,
    Content,
    Shape(Shape),
}

#[derive(Default)]
struct Entry {
    title: Option<String>,
    content: String,
    shape: Option<(Shape, String)>,
}

fn shape_of(start: &BytesStart) -> Option<Shape> {
    match start.local_name().as_ref() {
        b"point" => Some(Shape::Point),
        b"line" => Some(Shape::Line),
        b"polygon" => Some(Shape::Polygon),
        _ => None,
    }
}

/// Parse a GeoRSS `lat lon lat lon ...` list into `[lon, lat]` positions
fn parse_positions(text: &str) -> Result<Vec<Vec<f64>>> {
    let values = text
        .split_whitespace()
        .map(|v| {
            v.parse::<f64>()
                .map_err(|_| decode_error(format!("invalid coordinate '{}'", v)))
        })
        .collect::<Result<Vec<f64>>>()?;

    if values.len() % 2 != 0 {
        return Err(decode_error(format!(
            "odd number of coordinate values in '{}'",
            text.trim()
        )));
    }

    Ok(values.chunks(2).map(|pair| vec![pair[1], pair[0]]).collect())
}

impl Entry {
    fn push(&mut self, field: Field, text: &str) {
        match field {
            Field::Title => self.title.get_or_insert_with(String::new).push_str(text),
            Field::Content => self.content.push_str(text),
            Field::Shape(shape) => match &mut self.shape {
                Some((_, existing)) => existing.push_str(text),
                None => self.shape = Some((shape, text.to_string())),
            },
        }
    }

    fn into_feature(self) -> Result<Feature> {
        let (shape, text) = self
            .shape
            .ok_or_else(|| decode_error("entry has no georss geometry"))?;
        let mut positions = parse_positions(&text)?;

        let value = match shape {
            Shape::Point => {
                if positions.is_empty() {
                    return Err(decode_error("empty georss:point"));
                }
                Value::Point(positions.swap_remove(0))
            }
            Shape::Line => Value::LineString(positions),
            Shape::Polygon => Value::Polygon(vec![positions]),
        };

        Ok(Feature {
            bbox: None,
            geometry: Some(Geometry::new(value)),
            id: self.title.map(Id::String),
            properties: Some(props_from_html(&self.content)),
            foreign_members: None,
        })
    }
}

/// Decode the `entry` elements of an Atom feed into features
pub fn decode(text: &str) -> Result<Vec<Feature>> {
    check_exception(text)?;

    let mut reader = Reader::from_str(text);
    reader.config_mut().trim_text(true);

    let mut features = Vec::new();
    let mut entry: Option<Entry> = None;
    let mut field: Option<Field> = None;

    loop {
        let event = reader
            .read_event()
            .map_err(|e| decode_error(format!("malformed feed: {}", e)))?;

        match event {
            Event::Start(e) => {
                if e.local_name().as_ref() == b"entry" {
                    entry = Some(Entry::default());
                } else if entry.is_some() {
                    field = match e.local_name().as_ref() {
                        b"title" => Some(Field::Title),
                        b"content" => Some(Field::Content),
                        _ => shape_of(&e).map(Field::Shape),
                    };
                }
            }
            Event::Text(t) => {
                if let (Some(current), Some(f)) = (entry.as_mut(), field) {
                    let text = t
                        .unescape()
                        .map(|s| s.into_owned())
                        .unwrap_or_else(|_| String::from_utf8_lossy(&t).into_owned());
                    current.push(f, &text);
                }
            }
            Event::CData(c) => {
                if let (Some(current), Some(f)) = (entry.as_mut(), field) {
                    current.push(f, &String::from_utf8_lossy(&c));
                }
            }
            Event::End(e) => {
                if e.local_name().as_ref() == b"entry" {
                    if let Some(done) = entry.take() {
                        features.push(done.into_feature()?);
                    }
                }
                field = None;
            }
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(features)
}
