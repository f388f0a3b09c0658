//! Parsing of the calendar's JSF partial-response

use dp2gc_core::Event;
use quick_xml::events::Event as XmlEvent;
use quick_xml::Reader;
use serde::Deserialize;
use tracing::debug;

use crate::error::{PortalError, Result};

#[derive(Debug, Deserialize)]
struct EventsPayload {
    events: Vec<Event>,
}

/// Extract the event list from a calendar partial-response.
///
/// The calendar data arrives as JSON inside the first `<update>` element
/// that mentions `events`. When the session was not accepted the portal
/// answers with an ordinary HTML page instead, which is reported as an
/// authentication failure.
pub fn parse_events(body: &str) -> Result<Vec<Event>> {
    if !body.contains("partial-response") {
        return Err(PortalError::Authentication(
            "Portal returned a page instead of calendar data; the login may have failed".to_string(),
        ));
    }

    let updates = collect_updates(body)?;
    debug!("Partial response carries {} updates", updates.len());

    let payload = updates
        .iter()
        .find(|update| update.contains("events"))
        .ok_or_else(|| {
            PortalError::Authentication("Partial response carries no calendar events".to_string())
        })?;

    let parsed: EventsPayload = serde_json::from_str(payload)
        .map_err(|e| PortalError::ParseError(format!("Invalid events JSON: {}", e)))?;

    Ok(parsed.events)
}

/// Text content of every `<update>` element, in document order
fn collect_updates(body: &str) -> Result<Vec<String>> {
    let mut updates = Vec::new();
    let mut reader = Reader::from_str(body);
    reader.config_mut().trim_text(true);

    let mut buf = Vec::new();
    let mut in_update = false;
    let mut current = String::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(XmlEvent::Start(ref e)) if e.name().as_ref() == b"update" => {
                in_update = true;
                current.clear();
            }
            Ok(XmlEvent::End(ref e)) if e.name().as_ref() == b"update" => {
                in_update = false;
                updates.push(std::mem::take(&mut current));
            }
            Ok(XmlEvent::CData(e)) if in_update => {
                current.push_str(&String::from_utf8_lossy(&e.into_inner()));
            }
            Ok(XmlEvent::Text(ref e)) if in_update => {
                let text = e
                    .unescape()
                    .map_err(|e| PortalError::XmlParseError(e.to_string()))?;
                current.push_str(&text);
            }
            Ok(XmlEvent::Eof) => break,
            Err(e) => {
                return Err(PortalError::XmlParseError(e.to_string()));
            }
            _ => {}
        }
        buf.clear();
    }

    Ok(updates)
}
