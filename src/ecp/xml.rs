//! ECP response parsing. The query endpoints return small flat XML documents,
//! so this scans for the handful of elements we care about instead of pulling
//! in a full XML parser.

use url::Url;

use crate::device::{App, NetworkInfo, RokuDevice};

/// Extract the text of a simple `<tag>value</tag>` element.
pub(crate) fn element_text(xml: &str, tag: &str) -> Option<String> {
    let open_tag = format!("<{}>", tag);
    let close_tag = format!("</{}>", tag);

    let start = xml.find(&open_tag)? + open_tag.len();
    let end = xml[start..].find(&close_tag)? + start;

    let value = xml[start..end].trim().to_string();
    if value.is_empty() { None } else { Some(value) }
}

fn element_flag(xml: &str, tag: &str) -> bool {
    element_text(xml, tag).as_deref() == Some("true")
}

/// Extract an attribute value from the attribute section of an opening tag.
fn attr_value(attrs: &str, name: &str) -> Option<String> {
    let marker = format!(" {}=\"", name);
    let start = attrs.find(&marker)? + marker.len();
    let end = attrs[start..].find('"')? + start;

    let value = attrs[start..end].trim();
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

/// Collect every `<app ...>Name</app>` element. Nameless entries are skipped.
fn app_elements(xml: &str) -> Vec<App> {
    let mut apps = Vec::new();
    let mut rest = xml;
    while let Some(start) = rest.find("<app") {
        rest = &rest[start + 4..];
        // "<apps>" and "<active-app>" also begin with "<app".
        match rest.chars().next() {
            Some(' ') | Some('>') => {}
            Some(_) => continue,
            None => break,
        }
        let Some(open_end) = rest.find('>') else { break };
        let Some(close) = rest.find("</app>") else { break };
        if close < open_end {
            continue;
        }
        let attrs = &rest[..open_end];
        let name = rest[open_end + 1..close].trim();
        if !name.is_empty() {
            apps.push(App {
                name: name.to_string(),
                id: attr_value(attrs, "id"),
                app_type: attr_value(attrs, "type"),
            });
        }
        rest = &rest[close + "</app>".len()..];
    }
    apps
}

/// Parse a device-info document into a device record. The location is
/// stamped from the URL that was queried, never from the response body.
/// Fails only when the serial number, the identity key, is missing.
pub(crate) fn parse_device_info(xml: &str, location: &Url) -> Option<RokuDevice> {
    let serial_number = element_text(xml, "serial-number")?;
    Some(RokuDevice {
        serial_number,
        current_location: location.clone(),
        model_name: element_text(xml, "model-name"),
        friendly_model_name: element_text(xml, "friendly-model-name"),
        friendly_device_name: element_text(xml, "friendly-device-name")
            .or_else(|| element_text(xml, "user-device-name"))
            .unwrap_or_default(),
        is_tv: element_flag(xml, "is-tv"),
        is_stick: element_flag(xml, "is-stick"),
        apps: Vec::new(),
        connected_network_info: element_text(xml, "network-ssid")
            .map(|ssid| NetworkInfo { ssid, bssid: None }),
    })
}

/// Parse an app catalog. `None` means the body is not an apps document at
/// all; a present-but-empty catalog parses as an empty list.
pub(crate) fn parse_apps(xml: &str) -> Option<Vec<App>> {
    if !xml.contains("<apps") {
        return None;
    }
    Some(app_elements(xml))
}

/// Parse an active-app document. Both "nothing active" and an unparseable
/// body come back as `None`; callers treat neither as an error.
pub(crate) fn parse_active_app(xml: &str) -> Option<App> {
    if !xml.contains("<active-app") {
        return None;
    }
    app_elements(xml).into_iter().next()
}
