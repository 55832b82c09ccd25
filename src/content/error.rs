use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use thiserror::Error;

/// Failures of the content service boundary. Unlike engine errors these do
/// propagate, up to the response boundary where they become a
/// [`ServiceError`].
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ContentError {
    #[error("payload must be a JSON object")]
    NotAnObject,
    #[error("{field} is required")]
    Missing { field: &'static str },
    #[error("slug {0:?} may only contain lowercase letters, digits and hyphens")]
    InvalidSlug(String),
    #[error("{field} must be a string")]
    InvalidText { field: &'static str },
    #[error("{field} must be a boolean")]
    InvalidFlag { field: &'static str },
    #[error("{field} must be a list of URLs")]
    InvalidList { field: &'static str },
    #[error("authentication required")]
    Unauthenticated,
    #[error("{email} is not allowed to manage content")]
    Forbidden { email: String },
    #[error("{kind} {slug:?} not found")]
    NotFound { kind: &'static str, slug: String },
}

impl ContentError {
    /// HTTP-style status code for the response boundary.
    pub fn status(&self) -> u16 {
        match self {
            Self::NotAnObject
            | Self::Missing { .. }
            | Self::InvalidSlug(_)
            | Self::InvalidText { .. }
            | Self::InvalidFlag { .. }
            | Self::InvalidList { .. } => 400,
            Self::Unauthenticated => 401,
            Self::Forbidden { .. } => 403,
            Self::NotFound { .. } => 404,
        }
    }

    fn details(&self) -> Option<Value> {
        match self {
            Self::Missing { field }
            | Self::InvalidText { field }
            | Self::InvalidFlag { field }
            | Self::InvalidList { field } => Some(json!({ "field": field })),
            Self::InvalidSlug(slug) => Some(json!({ "field": "slug", "value": slug })),
            Self::NotFound { kind, slug } => Some(json!({ "kind": kind, "slug": slug })),
            Self::NotAnObject | Self::Unauthenticated | Self::Forbidden { .. } => None,
        }
    }
}

/// Structured error object handed to clients, which render a fallback panel
/// instead of failing the page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceError {
    pub message: String,
    pub status: u16,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
}

impl From<ContentError> for ServiceError {
    fn from(err: ContentError) -> Self {
        Self {
            message: err.to_string(),
            status: err.status(),
            details: err.details(),
        }
    }
}
