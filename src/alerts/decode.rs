use serde::Serialize;
use serde_json::Value;

use crate::notify::{EventSink, Notification};

const ENABLE_LOGS: bool = true;

use crate::log_debug;

pub const ALERT_TITLE: &str = "Real-Time Alert";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum AlertSource {
    /// JSON object carrying a string `message` field.
    Structured,
    /// Anything else, shown verbatim.
    Raw,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DecodedAlert {
    pub text: String,
    pub source: AlertSource,
}

/// Extracts the display text of a pushed alert. Never fails: payloads that
/// are not JSON, or JSON without a usable `message`, come back verbatim.
pub fn decode_alert(raw: &str) -> DecodedAlert {
    match serde_json::from_str::<Value>(raw) {
        Ok(Value::Object(fields)) => match fields.get("message") {
            Some(Value::String(message)) if !message.is_empty() => DecodedAlert {
                text: message.clone(),
                source: AlertSource::Structured,
            },
            _ => ignored(raw, "no message field"),
        },
        Ok(_) => ignored(raw, "not an object"),
        Err(err) => ignored(raw, &err.to_string()),
    }
}

fn ignored(raw: &str, why: &str) -> DecodedAlert {
    log_debug!("alert payload shown raw ({why})");
    DecodedAlert {
        text: raw.to_string(),
        source: AlertSource::Raw,
    }
}

/// Decodes `raw` and surfaces it as exactly one info notification.
pub fn on_alert_message(events: &EventSink, raw: &str) -> DecodedAlert {
    let decoded = decode_alert(raw);
    events.notify(Notification::info(ALERT_TITLE, decoded.text.clone()));
    decoded
}
