//! Audit event model.
//!
//! An [`AuditEvent`] is the record a scope builds up while an operation runs.
//! Custom fields are flattened into the top level of the serialized event and
//! keep their insertion order.

use std::fmt;
use std::panic::Location;

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::error::CustomFieldError;

/// Provider-defined identifier of a persisted event.
///
/// The scope treats it as opaque: it keeps whatever the last insert returned
/// and hands it back on replace.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EventId {
    /// Integer id (row ids, sequence numbers).
    Int(i64),
    /// UUID id.
    Uuid(Uuid),
    /// String id (document keys, file names).
    String(String),
    /// Raw byte id.
    Bytes(Vec<u8>),
}

impl EventId {
    /// Generates a new time-ordered v7 UUID id.
    #[must_use]
    pub fn new_v7() -> Self {
        let ts = uuid::Timestamp::now(uuid::NoContext);
        Self::Uuid(Uuid::new_v7(ts))
    }
}

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(id) => write!(f, "{id}"),
            Self::Uuid(id) => write!(f, "{id}"),
            Self::String(id) => f.write_str(id),
            Self::Bytes(bytes) => bytes.iter().try_for_each(|b| write!(f, "{b:02x}")),
        }
    }
}

impl From<i64> for EventId {
    fn from(id: i64) -> Self {
        Self::Int(id)
    }
}

impl From<Uuid> for EventId {
    fn from(id: Uuid) -> Self {
        Self::Uuid(id)
    }
}

impl From<String> for EventId {
    fn from(id: String) -> Self {
        Self::String(id)
    }
}

impl From<&str> for EventId {
    fn from(id: &str) -> Self {
        Self::String(id.to_string())
    }
}

impl From<Vec<u8>> for EventId {
    fn from(id: Vec<u8>) -> Self {
        Self::Bytes(id)
    }
}

/// Where and by whom an audited operation ran.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditEventEnvironment {
    /// OS user running the process
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_name: Option<String>,

    /// Host name
    #[serde(skip_serializing_if = "Option::is_none")]
    pub machine_name: Option<String>,

    /// Process ID
    #[serde(skip_serializing_if = "Option::is_none")]
    pub process_id: Option<u32>,

    /// Source location that created the scope (`file:line:column`)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub calling_location: Option<String>,

    /// Description of the error the audited operation ended with
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl AuditEventEnvironment {
    /// Captures the current process environment.
    #[must_use]
    pub fn capture(location: Option<&Location<'_>>) -> Self {
        Self {
            user_name: env_var(&["USER", "USERNAME"]),
            machine_name: env_var(&["HOSTNAME", "COMPUTERNAME"]),
            process_id: Some(std::process::id()),
            calling_location: location.map(ToString::to_string),
            error: None,
        }
    }

    /// Returns true if nothing has been recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

fn env_var(names: &[&str]) -> Option<String> {
    names
        .iter()
        .find_map(|name| std::env::var(name).ok())
        .filter(|value| !value.is_empty())
}

/// Before/after snapshot of the audited object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditTarget {
    /// Type name of the audited object
    #[serde(rename = "type")]
    pub type_name: String,

    /// Snapshot taken when the scope was created
    #[serde(skip_serializing_if = "Option::is_none")]
    pub old: Option<Value>,

    /// Snapshot taken on save and at completion
    #[serde(skip_serializing_if = "Option::is_none")]
    pub new: Option<Value>,
}

/// Serialized names of the event's own fields.
pub const RESERVED_FIELDS: [&str; 8] = [
    "event_type",
    "reference_id",
    "environment",
    "target",
    "comments",
    "start_date",
    "end_date",
    "duration_ms",
];

/// A structured record of one audited operation.
///
/// # Examples
///
/// ```rust
/// use auditscope_core::AuditEvent;
///
/// let mut event = AuditEvent::new("Order:Update");
/// event.add_comment("Status Updated");
/// event.set_custom_value("OrderId", serde_json::json!(42)).unwrap();
///
/// assert_eq!(event.event_type(), "Order:Update");
/// assert_eq!(event.custom_field("OrderId"), Some(&serde_json::json!(42)));
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEvent {
    event_type: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    reference_id: Option<String>,

    /// Environment the operation ran in.
    #[serde(default, skip_serializing_if = "AuditEventEnvironment::is_empty")]
    pub environment: AuditEventEnvironment,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    target: Option<AuditTarget>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    comments: Vec<String>,

    start_date: DateTime<Utc>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    end_date: Option<DateTime<Utc>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    duration_ms: Option<i64>,

    #[serde(flatten)]
    custom_fields: Map<String, Value>,
}

impl AuditEvent {
    /// Creates a new event starting now.
    #[must_use]
    pub fn new(event_type: impl Into<String>) -> Self {
        Self::starting_at(event_type, Utc::now())
    }

    /// Creates a new event with an explicit start timestamp.
    #[must_use]
    pub fn starting_at(event_type: impl Into<String>, start_date: DateTime<Utc>) -> Self {
        Self {
            event_type: event_type.into(),
            reference_id: None,
            environment: AuditEventEnvironment::default(),
            target: None,
            comments: Vec::new(),
            start_date,
            end_date: None,
            duration_ms: None,
            custom_fields: Map::new(),
        }
    }

    /// Returns the event type tag.
    #[must_use]
    pub fn event_type(&self) -> &str {
        &self.event_type
    }

    /// Returns the caller-supplied reference id.
    #[must_use]
    pub fn reference_id(&self) -> Option<&str> {
        self.reference_id.as_deref()
    }

    /// Returns when the operation started.
    #[must_use]
    pub const fn start_date(&self) -> DateTime<Utc> {
        self.start_date
    }

    /// Returns when the operation completed, if it has.
    #[must_use]
    pub const fn end_date(&self) -> Option<DateTime<Utc>> {
        self.end_date
    }

    /// Returns the operation duration in milliseconds, if it has completed.
    #[must_use]
    pub const fn duration_ms(&self) -> Option<i64> {
        self.duration_ms
    }

    /// Returns the before/after target snapshot.
    #[must_use]
    pub const fn target(&self) -> Option<&AuditTarget> {
        self.target.as_ref()
    }

    /// Returns the comments in insertion order.
    #[must_use]
    pub fn comments(&self) -> &[String] {
        &self.comments
    }

    /// Appends a comment.
    pub fn add_comment(&mut self, text: impl Into<String>) {
        self.comments.push(text.into());
    }

    /// Returns all custom fields.
    #[must_use]
    pub const fn custom_fields(&self) -> &Map<String, Value> {
        &self.custom_fields
    }

    /// Returns a single custom field.
    #[must_use]
    pub fn custom_field(&self, key: &str) -> Option<&Value> {
        self.custom_fields.get(key)
    }

    /// Deserializes a single custom field into `T`.
    ///
    /// # Errors
    ///
    /// Returns an error if the stored value does not match `T`.
    pub fn custom_field_as<T: DeserializeOwned>(
        &self,
        key: &str,
    ) -> Result<Option<T>, serde_json::Error> {
        self.custom_fields
            .get(key)
            .map(|value| serde_json::from_value(value.clone()))
            .transpose()
    }

    /// Returns true if `key` names one of the event's own serialized fields.
    ///
    /// Custom fields share the top level of the serialized event, so these
    /// keys cannot be used for them.
    #[must_use]
    pub fn is_reserved_field(key: &str) -> bool {
        RESERVED_FIELDS.contains(&key)
    }

    /// Inserts or overwrites a custom field with an already-serialized value.
    ///
    /// # Errors
    ///
    /// Returns [`CustomFieldError::Reserved`] if `key` is one of the
    /// event's own fields.
    pub fn set_custom_value(
        &mut self,
        key: impl Into<String>,
        value: Value,
    ) -> Result<(), CustomFieldError> {
        let key = key.into();
        if Self::is_reserved_field(&key) {
            return Err(CustomFieldError::Reserved { key });
        }
        self.custom_fields.insert(key, value);
        Ok(())
    }

    /// Serializes `value` and inserts or overwrites it as a custom field.
    ///
    /// # Errors
    ///
    /// Returns an error if `key` is reserved or `value` cannot be serialized.
    pub fn set_custom_field<T: Serialize + ?Sized>(
        &mut self,
        key: impl Into<String>,
        value: &T,
    ) -> Result<(), CustomFieldError> {
        let value = serde_json::to_value(value)?;
        self.set_custom_value(key, value)
    }

    /// Removes a custom field, returning its value.
    pub fn remove_custom_field(&mut self, key: &str) -> Option<Value> {
        self.custom_fields.shift_remove(key)
    }

    /// Serializes the event to a JSON string.
    ///
    /// # Errors
    ///
    /// Returns an error if a custom field or target value fails to serialize.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Deserializes an event from a JSON string.
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON is not a valid event.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub(crate) fn set_event_type(&mut self, event_type: String) {
        self.event_type = event_type;
    }

    pub(crate) fn set_reference_id(&mut self, reference_id: String) {
        self.reference_id = Some(reference_id);
    }

    pub(crate) fn set_target(&mut self, target: AuditTarget) {
        self.target = Some(target);
    }

    pub(crate) fn set_target_new(&mut self, new: Value) {
        if let Some(target) = self.target.as_mut() {
            target.new = Some(new);
        }
    }

    pub(crate) fn clear_target(&mut self) {
        self.target = None;
    }

    pub(crate) fn complete(&mut self, end_date: DateTime<Utc>) {
        if self.end_date.is_some() {
            return;
        }
        self.end_date = Some(end_date);
        self.duration_ms = Some((end_date - self.start_date).num_milliseconds());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use serde_json::json;

    #[test]
    fn test_new_event() {
        let event = AuditEvent::new("Order:Create");
        assert_eq!(event.event_type(), "Order:Create");
        assert!(event.end_date().is_none());
        assert!(event.comments().is_empty());
        assert!(event.custom_fields().is_empty());
    }

    #[test]
    fn test_custom_field_last_write_wins() {
        let mut event = AuditEvent::new("test");
        event.set_custom_field("k", &1).unwrap();
        event.set_custom_field("k", "two").unwrap();
        assert_eq!(event.custom_field("k"), Some(&json!("two")));
        assert_eq!(event.custom_fields().len(), 1);
    }

    #[test]
    fn test_custom_field_as() {
        let mut event = AuditEvent::new("test");
        event.set_custom_field("ids", &vec![1, 2, 3]).unwrap();
        let ids: Option<Vec<u32>> = event.custom_field_as("ids").unwrap();
        assert_eq!(ids, Some(vec![1, 2, 3]));
        assert!(event.custom_field_as::<String>("ids").is_err());
        assert_eq!(event.custom_field_as::<String>("missing").unwrap(), None);
    }

    #[test]
    fn test_complete_sets_end_date_once() {
        let start = Utc::now();
        let mut event = AuditEvent::starting_at("test", start);

        event.complete(start + Duration::milliseconds(250));
        event.complete(start + Duration::seconds(10));

        assert_eq!(event.end_date(), Some(start + Duration::milliseconds(250)));
        assert_eq!(event.duration_ms(), Some(250));
    }

    #[test]
    fn test_custom_fields_flatten_in_insertion_order() {
        let mut event = AuditEvent::new("test");
        event.set_custom_value("zeta", json!(1)).unwrap();
        event.set_custom_value("alpha", json!(2)).unwrap();

        let json = event.to_json().unwrap();
        let zeta = json.find("\"zeta\"").unwrap();
        let alpha = json.find("\"alpha\"").unwrap();
        assert!(zeta < alpha);
        assert!(!json.contains("custom_fields"));
    }

    #[test]
    fn test_reserved_keys_are_rejected() {
        let mut event = AuditEvent::new("Order:Update");
        for key in RESERVED_FIELDS {
            let err = event.set_custom_value(key, json!("spoofed")).unwrap_err();
            assert!(matches!(err, CustomFieldError::Reserved { key: k } if k == key));
            assert!(matches!(
                event.set_custom_field(key, &42),
                Err(CustomFieldError::Reserved { .. })
            ));
        }
        assert!(event.custom_fields().is_empty());

        let json = event.to_json().unwrap();
        let value: Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["event_type"], "Order:Update");
        assert_eq!(AuditEvent::from_json(&json).unwrap(), event);
    }

    #[test]
    fn test_reserved_fields_match_serialized_names() {
        let mut event = AuditEvent::new("Order:Update");
        event.set_reference_id("ref".to_string());
        event.environment.machine_name = Some("host".to_string());
        event.add_comment("c");
        event.set_target(AuditTarget {
            type_name: "Order".to_string(),
            old: Some(json!({})),
            new: None,
        });
        event.complete(event.start_date());

        let value = serde_json::to_value(&event).unwrap();
        let keys: Vec<&str> = value
            .as_object()
            .unwrap()
            .keys()
            .map(String::as_str)
            .collect();
        for key in &keys {
            assert!(AuditEvent::is_reserved_field(key), "{key}");
        }
        assert_eq!(keys.len(), RESERVED_FIELDS.len());
    }

    #[test]
    fn test_event_json_roundtrip_keeps_custom_fields() {
        let mut event = AuditEvent::new("Order:Update");
        event.add_comment("first");
        event.set_custom_value("OrderId", json!(7)).unwrap();
        event.set_target(AuditTarget {
            type_name: "Order".to_string(),
            old: Some(json!({"status": "created"})),
            new: None,
        });

        let parsed = AuditEvent::from_json(&event.to_json().unwrap()).unwrap();
        assert_eq!(parsed, event);
    }

    #[test]
    fn test_event_id_display() {
        assert_eq!(EventId::from(42).to_string(), "42");
        assert_eq!(EventId::from("evt-1").to_string(), "evt-1");
        assert_eq!(EventId::from(vec![0x0a, 0xff]).to_string(), "0aff");
    }

    #[test]
    fn test_event_id_v7_unique() {
        assert_ne!(EventId::new_v7(), EventId::new_v7());
    }

    #[test]
    fn test_environment_capture() {
        let env = AuditEventEnvironment::capture(Some(Location::caller()));
        assert_eq!(env.process_id, Some(std::process::id()));
        assert!(env.calling_location.unwrap().contains("event.rs"));
        assert!(!AuditEventEnvironment::capture(None).is_empty());
    }
}
