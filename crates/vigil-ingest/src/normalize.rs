//! Normalization of heterogeneous bus payloads into canonical audit
//! events.
//!
//! The recognized keys are a closed set; everything else rides along in
//! `metadata` untouched. Unknown values never reject a message — the
//! ledger's job is to remember what happened, not to police producers.

use serde_json::{Map, Value};
use uuid::Uuid;
use vigil_core::{ActionType, AuditEvent, ResourceType};

/// Lift a generic key-value payload into a canonical event.
///
/// - `event_id`: parsed as a UUID when well-formed, else the freshly
///   assigned id stands.
/// - `event_type`: coerced into the action vocabulary; unregistered
///   values are preserved verbatim.
/// - `user_id`: parsed as a UUID; the nil sentinel marks an absent
///   subject (the ledger refuses such records at append).
/// - `service_source` defaults to the topic the message arrived on.
/// - The whole original payload is serialized into `metadata` for
///   forensic fidelity.
pub fn normalize(raw: &Map<String, Value>, topic: &str) -> AuditEvent {
    let mut event = AuditEvent::new(
        Uuid::nil(),
        ActionType::from("UNKNOWN"),
        ResourceType::from("UNKNOWN"),
        "0",
    );
    event.service_source = topic.to_owned();

    if let Some(Value::String(id)) = raw.get("event_id") {
        if let Ok(parsed) = Uuid::parse_str(id) {
            event.event_id = parsed;
        }
    }

    if let Some(Value::String(event_type)) = raw.get("event_type") {
        event.action_type = ActionType::from(event_type.as_str());
    }

    if let Some(Value::String(user_id)) = raw.get("user_id") {
        if let Ok(parsed) = Uuid::parse_str(user_id) {
            event.user_id = parsed;
        }
    }

    event.metadata = Value::Object(raw.clone());

    event
}
