//! The uniform result envelope returned by every invocation.
//!
//! Plugins may return either a conforming mapping (self-reporting `status`
//! or `error`) or a bare value. [`RawOutcome`] tags which of the two the
//! runtime observed, and [`Envelope::normalise`] resolves the tag into the
//! wire contract:
//!
//! - a self-reported mapping passes through verbatim;
//! - a bare value is wrapped as `{"status": "success", "result": value}`;
//! - engine faults serialise as `{"error": message}` with optional detail.
//!
//! Envelopes are produced fresh per invocation and never cached.

use serde::Serialize;
use serde::ser::SerializeMap;
use serde_json::{Map, Value};

use crate::error::{ErrorKind, PluginError};

/// Caller-facing text substituted for masked internal faults.
pub const MASKED_FAULT_MESSAGE: &str = "internal error, please retry later";

/// A plugin's raw return value, tagged by shape.
///
/// A mapping carrying an `error` or `status` key is trusted to self-report
/// its outcome; anything else is a bare value the engine must wrap.
#[derive(Debug, Clone, PartialEq)]
pub enum RawOutcome {
    /// A mapping with a recognisable self-reported shape.
    Structured(Map<String, Value>),
    /// Any other return value, including mappings without `error`/`status`.
    Bare(Value),
}

impl RawOutcome {
    /// Tags a decoded return value by shape.
    #[must_use]
    pub fn from_value(value: Value) -> Self {
        match value {
            Value::Object(map) if map.contains_key("error") || map.contains_key("status") => {
                Self::Structured(map)
            }
            other => Self::Bare(other),
        }
    }
}

/// The uniform success/warning/error shape returned to callers.
#[derive(Debug, Clone, PartialEq)]
pub enum Envelope {
    /// A conforming mapping the plugin reported, passed through verbatim.
    Reported(Map<String, Value>),
    /// A bare return value wrapped by the engine.
    Wrapped(Value),
    /// A fault produced by the engine itself.
    Fault {
        /// Caller-facing failure message.
        error: String,
        /// Diagnostic detail for operators, when available.
        detail: Option<String>,
    },
}

impl Envelope {
    /// Resolves a tagged outcome into an envelope.
    #[must_use]
    pub fn normalise(outcome: RawOutcome) -> Self {
        match outcome {
            RawOutcome::Structured(map) => Self::Reported(map),
            RawOutcome::Bare(value) => Self::Wrapped(value),
        }
    }

    /// Converts an engine error into a fault envelope.
    ///
    /// `System`-kind errors carry no internal detail across the boundary
    /// when `mask_internal` is set; everything else reports its message,
    /// and execution faults attach their diagnostic trace as detail.
    #[must_use]
    pub fn from_error(error: &PluginError, mask_internal: bool) -> Self {
        if mask_internal && error.kind() == ErrorKind::System {
            return Self::Fault {
                error: MASKED_FAULT_MESSAGE.to_owned(),
                detail: None,
            };
        }
        let detail = match error {
            PluginError::Execution { trace, .. } => trace.clone(),
            _ => None,
        };
        Self::Fault {
            error: error.to_string(),
            detail,
        }
    }

    /// Returns whether this envelope reports a failure.
    ///
    /// Both engine faults and plugin-reported `{"error": …}` mappings count.
    #[must_use]
    pub fn is_error(&self) -> bool {
        match self {
            Self::Fault { .. } => true,
            Self::Reported(map) => map.contains_key("error"),
            Self::Wrapped(_) => false,
        }
    }

    /// Returns the self-reported `status` field, when one exists.
    ///
    /// Engine-wrapped bare values always report `success`.
    #[must_use]
    pub fn status(&self) -> Option<&str> {
        match self {
            Self::Reported(map) => map.get("status").and_then(Value::as_str),
            Self::Wrapped(_) => Some("success"),
            Self::Fault { .. } => None,
        }
    }

    /// Returns the failure message, when this envelope reports one.
    #[must_use]
    pub fn error_message(&self) -> Option<&str> {
        match self {
            Self::Fault { error, .. } => Some(error.as_str()),
            Self::Reported(map) => map.get("error").and_then(Value::as_str),
            Self::Wrapped(_) => None,
        }
    }

    /// Renders the wire-level JSON value of this envelope.
    #[must_use]
    pub fn to_value(&self) -> Value {
        match self {
            Self::Reported(map) => Value::Object(map.clone()),
            Self::Wrapped(value) => {
                let mut map = Map::with_capacity(2);
                map.insert("status".to_owned(), Value::String("success".to_owned()));
                map.insert("result".to_owned(), value.clone());
                Value::Object(map)
            }
            Self::Fault { error, detail } => {
                let mut map = Map::with_capacity(2);
                map.insert("error".to_owned(), Value::String(error.clone()));
                if let Some(detail) = detail {
                    map.insert("detail".to_owned(), Value::String(detail.clone()));
                }
                Value::Object(map)
            }
        }
    }
}

impl Serialize for Envelope {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        match self {
            Self::Reported(map) => map.serialize(serializer),
            Self::Wrapped(value) => {
                let mut map = serializer.serialize_map(Some(2))?;
                map.serialize_entry("status", "success")?;
                map.serialize_entry("result", value)?;
                map.end()
            }
            Self::Fault { error, detail } => {
                let len = if detail.is_some() { 2 } else { 1 };
                let mut map = serializer.serialize_map(Some(len))?;
                map.serialize_entry("error", error)?;
                if let Some(detail) = detail {
                    map.serialize_entry("detail", detail)?;
                }
                map.end()
            }
        }
    }
}
