//! CloudEvents 1.0 envelope delivered by the host framework.
//!
//! The adapter never looks inside an event; this type exists so the host
//! shell can parse the JSON structured format and hand events through.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The only `specversion` this crate accepts.
pub const SPEC_VERSION: &str = "1.0";

/// Errors produced while parsing or validating a [`CloudEvent`].
#[derive(Debug, thiserror::Error)]
pub enum EventError {
    /// The JSON document could not be decoded.
    #[error("malformed cloud event: {0}")]
    Parse(#[from] serde_json::Error),
    /// A required context attribute is empty.
    #[error("missing required attribute `{0}`")]
    MissingAttribute(&'static str),
    /// The event declares a spec version other than 1.0.
    #[error("unsupported specversion {0:?}")]
    UnsupportedSpecVersion(String),
}

/// A CloudEvents 1.0 event in structured JSON form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CloudEvent {
    /// Event identifier, unique per source.
    pub id: String,
    /// URI-reference identifying the producer.
    pub source: String,
    /// CloudEvents spec version.
    pub specversion: String,
    /// Event type, e.g. `google.cloud.storage.object.v1.finalized`.
    #[serde(rename = "type")]
    pub event_type: String,
    /// Content type of `data`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub datacontenttype: Option<String>,
    /// Schema that `data` adheres to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dataschema: Option<String>,
    /// Subject of the event in the context of the producer.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
    /// When the occurrence happened.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time: Option<DateTime<Utc>>,
    /// Event payload.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
    /// Extension context attributes.
    #[serde(flatten)]
    pub extensions: BTreeMap<String, serde_json::Value>,
}

impl CloudEvent {
    /// Create a minimal 1.0 event with the three required attributes.
    pub fn new(
        id: impl Into<String>,
        source: impl Into<String>,
        event_type: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            source: source.into(),
            specversion: SPEC_VERSION.to_owned(),
            event_type: event_type.into(),
            datacontenttype: None,
            dataschema: None,
            subject: None,
            time: None,
            data: None,
            extensions: BTreeMap::new(),
        }
    }

    /// Attach a JSON payload.
    #[must_use]
    pub fn with_data(mut self, data: serde_json::Value) -> Self {
        self.datacontenttype = Some("application/json".to_owned());
        self.data = Some(data);
        self
    }

    /// Attach a subject.
    #[must_use]
    pub fn with_subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = Some(subject.into());
        self
    }

    /// Parse and validate one event from its JSON structured form.
    ///
    /// # Errors
    ///
    /// Returns [`EventError::Parse`] for malformed JSON, or a validation
    /// error from [`CloudEvent::validate`].
    pub fn from_json(json: &str) -> Result<Self, EventError> {
        let event: CloudEvent = serde_json::from_str(json)?;
        event.validate()?;
        Ok(event)
    }

    /// Check required attributes and the spec version.
    ///
    /// # Errors
    ///
    /// Returns the first violated constraint.
    pub fn validate(&self) -> Result<(), EventError> {
        if self.specversion != SPEC_VERSION {
            return Err(EventError::UnsupportedSpecVersion(self.specversion.clone()));
        }
        for (name, value) in [
            ("id", &self.id),
            ("source", &self.source),
            ("type", &self.event_type),
        ] {
            if value.trim().is_empty() {
                return Err(EventError::MissingAttribute(name));
            }
        }
        Ok(())
    }
}
