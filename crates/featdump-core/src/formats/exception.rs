//! OGC exception envelope detection and classification.
//!
//! Servers report failures inside a `ServiceExceptionReport` (WMS, WFS 1.0)
//! or an `ows:ExceptionReport` (WFS 1.1+, OWS) document, often with a
//! success status. The message text is matched against known patterns to
//! produce a [`ServerErrorKind`].

use quick_xml::events::Event;
use quick_xml::Reader;
use regex::Regex;
use std::sync::LazyLock;

use crate::error::{ExtractError, Result, ServerErrorKind};

static KNOWN_MESSAGES: LazyLock<Vec<(Regex, ServerErrorKind)>> = LazyLock::new(|| {
    let table = [
        (
            r"Cannot do natural order without a primary key",
            ServerErrorKind::SortKeyRequired,
        ),
        (r"Illegal property name", ServerErrorKind::InvalidSortKey),
        (
            r"Service WFS is disabled|WFS request not enabled",
            ServerErrorKind::WfsUnsupported,
        ),
        (
            r"The request bounding box has zero area",
            ServerErrorKind::ZeroArea,
        ),
        (
            r"(?i)no support for creating maps in kml",
            ServerErrorKind::KmlUnsupported,
        ),
        (
            r"(?i)no support for creating maps in (application/atom|georss|rss)",
            ServerErrorKind::GeoRssUnsupported,
        ),
        (
            r"(?i)could not find layer|LayerNotDefined|unknown layer|feature type \S+ unknown",
            ServerErrorKind::LayerMissing,
        ),
        (
            r"(?i)no service: \(|service \w+ is disabled|unknown service",
            ServerErrorKind::ServiceUnsupported,
        ),
    ];

    table
        .into_iter()
        .map(|(pattern, kind)| {
            let re = Regex::new(pattern).expect("invalid exception pattern");
            (re, kind)
        })
        .collect()
});

fn is_report(local_name: &[u8]) -> bool {
    matches!(local_name, b"ServiceExceptionReport" | b"ExceptionReport")
}

fn is_message(local_name: &[u8]) -> bool {
    matches!(
        local_name,
        b"ServiceException" | b"ExceptionText" | b"Exception"
    )
}

/// Extract the first exception message from an OGC exception document.
///
/// Returns `None` for anything that is not an exception envelope, including
/// documents that fail to parse.
pub fn exception_message(text: &str) -> Option<String> {
    if !text.trim_start().starts_with('<') {
        return None;
    }

    let mut reader = Reader::from_str(text);
    reader.config_mut().trim_text(true);

    let mut stack: Vec<Vec<u8>> = Vec::new();
    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => {
                let name = e.local_name().as_ref().to_vec();
                if stack.is_empty() && !is_report(&name) {
                    return None;
                }
                stack.push(name);
            }
            Ok(Event::Empty(e)) => {
                if stack.is_empty() && !is_report(e.local_name().as_ref()) {
                    return None;
                }
            }
            Ok(Event::Text(t)) => {
                if stack.last().is_some_and(|n| is_message(n)) {
                    let message = t
                        .unescape()
                        .map(|s| s.into_owned())
                        .unwrap_or_else(|_| String::from_utf8_lossy(&t).into_owned());
                    if !message.is_empty() {
                        return Some(message);
                    }
                }
            }
            Ok(Event::CData(c)) => {
                if stack.last().is_some_and(|n| is_message(n)) {
                    let message = String::from_utf8_lossy(&c).trim().to_string();
                    if !message.is_empty() {
                        return Some(message);
                    }
                }
            }
            Ok(Event::End(_)) => {
                stack.pop();
            }
            Ok(Event::Eof) | Err(_) => return None,
            Ok(_) => {}
        }
    }
}

/// Map an exception message to a classified error
pub fn classify_message(message: &str) -> ExtractError {
    KNOWN_MESSAGES
        .iter()
        .find(|(re, _)| re.is_match(message))
        .map(|(_, kind)| ExtractError::Server {
            kind: *kind,
            message: message.to_string(),
        })
        .unwrap_or_else(|| ExtractError::ServerException(message.to_string()))
}

/// Fail with a classified error if `text` is an OGC exception document
pub fn check_exception(text: &str) -> Result<()> {
    match exception_message(text) {
        Some(message) => Err(classify_message(&message)),
        None => Ok(()),
    }
}
