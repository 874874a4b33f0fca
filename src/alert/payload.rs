//! Alert request body.

use serde::{Deserialize, Serialize};

/// JSON body of an alert.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlertPayload {
    pub message: String,
    pub description: String,
    pub priority: String,
    pub tags: Vec<String>,
}

impl AlertPayload {
    /// Create a payload with no tags.
    pub fn new(
        message: impl Into<String>,
        description: impl Into<String>,
        priority: impl Into<String>,
    ) -> Self {
        Self {
            message: message.into(),
            description: description.into(),
            priority: priority.into(),
            tags: Vec::new(),
        }
    }

    /// Add a tag.
    pub fn tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.push(tag.into());
        self
    }

    /// The fixed payload sent by the demo.
    pub fn demo() -> Self {
        Self::new("test", "plaintext demo", "P4")
            .tag("oracle_checks")
            .tag("oracle")
    }

    pub fn to_json(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(self)
    }
}
