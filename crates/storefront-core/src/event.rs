use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Stored as the `event_type` column; wire name is `type`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventType {
    View,
    Click,
}

impl EventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventType::View => "view",
            EventType::Click => "click",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "view" => Some(Self::View),
            "click" => Some(Self::Click),
            _ => None,
        }
    }
}

/// The body clients send to `POST /api/events`.
///
/// `type` is optional on the wire and defaults to `"click"`; it is kept as a
/// raw string so an unsupported value is reported as a validation error
/// rather than a JSON rejection.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClickPayload {
    #[serde(rename = "type")]
    pub event_type: Option<String>,
    pub identifier: Option<String>,
    pub path: Option<String>,
}

impl ClickPayload {
    /// Validate the payload and turn it into a click ready for the store.
    ///
    /// Only `click` is accepted here. Views are recorded implicitly by the
    /// request logger and never through this payload.
    pub fn into_click(self, subject: Option<String>) -> Result<NewEvent, CoreError> {
        let event_type = self.event_type.as_deref().unwrap_or("click");
        if EventType::parse(event_type) != Some(EventType::Click) {
            return Err(CoreError::validation(
                "type",
                "only click events can be logged explicitly",
            ));
        }

        let identifier = match self.identifier {
            Some(id) if !id.trim().is_empty() => id,
            _ => return Err(CoreError::validation("identifier", "identifier required")),
        };

        Ok(NewEvent {
            event_type: EventType::Click,
            subject,
            path: self.path.filter(|p| !p.is_empty()),
            identifier: Some(identifier),
        })
    }
}

/// An event on its way into the store. `id` and `created_at` are assigned by
/// the store at insert time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewEvent {
    pub event_type: EventType,
    pub subject: Option<String>,
    pub path: Option<String>,
    pub identifier: Option<String>,
}

impl NewEvent {
    pub fn view(subject: Option<String>, path: impl Into<String>) -> Self {
        Self {
            event_type: EventType::View,
            subject,
            path: Some(path.into()),
            identifier: None,
        }
    }
}
