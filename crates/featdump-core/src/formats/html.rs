//! Property extraction from HTML `<li>name: value</li>` lists.
//!
//! GeoRSS entry content and KML placemark descriptions carry feature
//! attributes as an HTML list rendered by the map server template.

use quick_xml::events::Event;
use quick_xml::Reader;
use serde_json::{Map, Value};

/// Key under which content is kept when it cannot be split into properties
pub const UNPARSED_KEY: &str = "unparsed";

fn unparsed(content: &str) -> Map<String, Value> {
    let mut props = Map::new();
    props.insert(UNPARSED_KEY.to_string(), Value::String(content.to_string()));
    props
}

/// Collect the text of every `<li>` element, nested markup flattened
fn list_items(content: &str) -> Option<Vec<String>> {
    let mut reader = Reader::from_str(content);
    let config = reader.config_mut();
    config.trim_text(false);
    config.check_end_names = false;
    config.allow_unmatched_ends = true;

    let mut items = Vec::new();
    let mut depth = 0usize;
    let mut current = String::new();

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => {
                if e.local_name().as_ref().eq_ignore_ascii_case(b"li") {
                    if depth == 0 {
                        current.clear();
                    }
                    depth += 1;
                }
            }
            Ok(Event::End(e)) => {
                if depth > 0 && e.local_name().as_ref().eq_ignore_ascii_case(b"li") {
                    depth -= 1;
                    if depth == 0 {
                        items.push(current.trim().to_string());
                    }
                }
            }
            Ok(Event::Text(t)) if depth > 0 => {
                let text = t
                    .unescape()
                    .map(|s| s.into_owned())
                    .unwrap_or_else(|_| String::from_utf8_lossy(&t).into_owned());
                current.push_str(&text);
            }
            Ok(Event::CData(c)) if depth > 0 => {
                current.push_str(&String::from_utf8_lossy(&c));
            }
            Ok(Event::Eof) => break,
            Err(_) => return None,
            Ok(_) => {}
        }
    }

    Some(items)
}

/// Split list items on the first `:` into a property map.
///
/// If any item has no `:` (or the markup cannot be read) the whole content is
/// returned as `{"unparsed": content}`.
pub fn props_from_html(content: &str) -> Map<String, Value> {
    let Some(items) = list_items(content) else {
        return unparsed(content);
    };

    let mut props = Map::new();
    for item in items {
        match item.split_once(':') {
            Some((name, value)) => {
                props.insert(name.to_string(), Value::String(value.trim().to_string()));
            }
            None => return unparsed(content),
        }
    }
    props
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simple_list() {
        let html = "<h4>roads</h4><ul class=\"textattributes\">\
            <li><strong><span class=\"atr-name\">name</span>:</strong> <span class=\"atr-value\">NH 44</span></li>\
            <li><strong><span class=\"atr-name\">lanes</span>:</strong> <span class=\"atr-value\">4</span></li>\
            </ul>";
        let props = props_from_html(html);
        assert_eq!(props.get("name"), Some(&Value::String("NH 44".into())));
        assert_eq!(props.get("lanes"), Some(&Value::String("4".into())));
    }

    #[test]
    fn test_value_with_colon() {
        let props = props_from_html("<ul><li>url: http://example.com/a</li></ul>");
        assert_eq!(
            props.get("url"),
            Some(&Value::String("http://example.com/a".into()))
        );
    }

    #[test]
    fn test_item_without_colon_is_unparsed() {
        let html = "<ul><li>a: 1</li><li>no separator</li></ul>";
        let props = props_from_html(html);
        assert_eq!(props.len(), 1);
        assert_eq!(props.get(UNPARSED_KEY), Some(&Value::String(html.into())));
    }

    #[test]
    fn test_no_list_is_empty() {
        assert!(props_from_html("<p>nothing here</p>").is_empty());
        assert!(props_from_html("").is_empty());
    }

    #[test]
    fn test_escaped_text() {
        let props = props_from_html("<ul><li>owner: A &amp; B</li></ul>");
        assert_eq!(props.get("owner"), Some(&Value::String("A & B".into())));
    }
}
