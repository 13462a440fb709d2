//! Choice buttons and their embedded JSON payloads.
//!
//! The dialogue backend sends clickable options whose `payload` string may
//! embed a JSON fragment after arbitrary prefix text, e.g.
//! `/escolher{"categoria":"loops"}`. Extraction happens once, here, into a
//! typed [`ButtonPayload`]; the flow controller never scans strings itself.

use serde::{Deserialize, Serialize};

/// A clickable option with a display title and an opaque payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChoiceButton {
    pub title: String,
    pub payload: String,
}

impl ChoiceButton {
    pub fn new(title: impl Into<String>, payload: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            payload: payload.into(),
        }
    }
}

/// The typed content of a button payload, when it carries one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ButtonPayload {
    Category { categoria: String },
    Subtopic { subtopico: String },
}

impl ButtonPayload {
    /// Extracts the JSON fragment starting at the first `{` and reads the
    /// expected key. Returns `None` when there is no fragment, the fragment
    /// is not valid JSON, or neither key is present; the caller must treat
    /// that as a no-op, never as a default value.
    pub fn parse(raw: &str) -> Option<Self> {
        let start = raw.find('{')?;
        let value: serde_json::Value = serde_json::from_str(&raw[start..]).ok()?;
        if let Some(categoria) = value.get("categoria").and_then(|v| v.as_str()) {
            return Some(ButtonPayload::Category {
                categoria: categoria.to_string(),
            });
        }
        if let Some(subtopico) = value.get("subtopico").and_then(|v| v.as_str()) {
            return Some(ButtonPayload::Subtopic {
                subtopico: subtopico.to_string(),
            });
        }
        None
    }
}
