//! Event payload model
//!
//! An event is an open-ended bag of named values. Fields are kept in a
//! `BTreeMap` so the serialized form is canonical: the same fields always
//! produce the same hash field in the store, whatever order they were set in.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A single value carried by an event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EventValue {
    Null,
    Bool(bool),
    Number(serde_json::Number),
    Text(String),
    List(Vec<EventValue>),
    Map(BTreeMap<String, EventValue>),
}

impl From<&str> for EventValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for EventValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<bool> for EventValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i64> for EventValue {
    fn from(value: i64) -> Self {
        Self::Number(value.into())
    }
}

impl From<u64> for EventValue {
    fn from(value: u64) -> Self {
        Self::Number(value.into())
    }
}

impl From<BTreeMap<String, EventValue>> for EventValue {
    fn from(value: BTreeMap<String, EventValue>) -> Self {
        Self::Map(value)
    }
}

impl From<Vec<EventValue>> for EventValue {
    fn from(value: Vec<EventValue>) -> Self {
        Self::List(value)
    }
}

/// A tracked event
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Event {
    fields: BTreeMap<String, EventValue>,
}

impl Event {
    /// Create an empty event
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a page-view style event for the given page
    pub fn page(page: impl Into<String>) -> Self {
        Self::new().with("page", page.into())
    }

    /// Set a field, replacing any previous value
    pub fn with(mut self, key: impl Into<String>, value: impl Into<EventValue>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn with_country(self, country: impl Into<String>) -> Self {
        self.with("country", country.into())
    }

    pub fn with_device(self, device: impl Into<String>) -> Self {
        self.with("device", device.into())
    }

    pub fn with_os(self, os: impl Into<String>) -> Self {
        self.with("os", os.into())
    }

    /// Set a field in place
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<EventValue>) {
        self.fields.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&EventValue> {
        self.fields.get(key)
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }
}

/// Envelope written as the hash field: `{"event": {...}}`
#[derive(Serialize)]
pub(crate) struct EventEnvelope<'a> {
    pub event: &'a Event,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_order_does_not_change_serialization() {
        let a = Event::page("/").with_country("NL").with_device("mobile");
        let b = Event::new()
            .with_device("mobile")
            .with_country("NL")
            .with("page", "/");

        assert_eq!(
            serde_json::to_string(&a).unwrap(),
            serde_json::to_string(&b).unwrap()
        );
    }

    #[test]
    fn test_serializes_as_plain_object() {
        let event = Event::page("/pricing").with_os("linux");
        let json = serde_json::to_string(&event).unwrap();
        assert_eq!(json, r#"{"os":"linux","page":"/pricing"}"#);
    }

    #[test]
    fn test_nested_values() {
        let mut utm = BTreeMap::new();
        utm.insert("source".to_string(), EventValue::from("newsletter"));

        let event = Event::page("/")
            .with("utm", utm)
            .with("returning", true)
            .with("visits", 3i64)
            .with("tags", vec![EventValue::from("a"), EventValue::Null]);

        let json = serde_json::to_string(&event).unwrap();
        assert_eq!(
            json,
            r#"{"page":"/","returning":true,"tags":["a",null],"utm":{"source":"newsletter"},"visits":3}"#
        );
    }

    #[test]
    fn test_deserialize_round_trip_keeps_variants() {
        let event: Event =
            serde_json::from_str(r#"{"page":"/","ratio":0.5,"extra":{"k":[1,"x"]}}"#).unwrap();

        assert_eq!(event.len(), 3);
        assert_eq!(event.get("page"), Some(&EventValue::from("/")));
        assert!(matches!(event.get("ratio"), Some(EventValue::Number(_))));
        assert!(matches!(event.get("extra"), Some(EventValue::Map(_))));
    }

    #[test]
    fn test_envelope_wraps_event() {
        let event = Event::page("/");
        let json = serde_json::to_string(&EventEnvelope { event: &event }).unwrap();
        assert_eq!(json, r#"{"event":{"page":"/"}}"#);
    }
}
