use std::fmt;

use serde::{Deserialize, Serialize};

/// Body of an outbound publish, rendered to wire text exactly once.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    Json(serde_json::Value),
    Text(String),
}

impl Payload {
    pub fn json<T: Serialize>(value: &T) -> Result<Self, serde_json::Error> {
        serde_json::to_value(value).map(Self::Json)
    }

    pub fn render(&self) -> String {
        match self {
            Self::Json(value) => value.to_string(),
            Self::Text(text) => text.clone(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TelemetryState {
    pub temperature: f64,
    pub humidity: f64,
}

impl Default for TelemetryState {
    fn default() -> Self {
        Self {
            temperature: 20.0,
            humidity: 50.0,
        }
    }
}

#[derive(Clone, Default, PartialEq, Eq, Deserialize)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    /// Absent or malformed vault records degrade to empty credentials.
    pub fn from_record(record: Option<&str>) -> Self {
        record
            .and_then(|raw| serde_json::from_str::<Self>(raw).ok())
            .unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.username.is_empty() && self.password.is_empty()
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}
