use cadence_core::types::EventId;
use serde::{Deserialize, Serialize};

/// The external record that owns generators.
///
/// Only the fields passed through to presentation are modelled here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    pub id: EventId,
    pub title: String,
    pub short_title: Option<String>,
    pub description: Option<String>,
}

impl Event {
    #[must_use]
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            id: EventId::new(),
            title: title.into(),
            short_title: None,
            description: None,
        }
    }

    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}
