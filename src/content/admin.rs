use serde::{Deserialize, Serialize};

use super::error::ContentError;

/// Authenticated session as reported by the auth provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub email: String,
}

impl Session {
    pub fn new(email: impl Into<String>) -> Self {
        Self {
            email: email.into(),
        }
    }
}

/// Email allow-list guarding every admin operation.
#[derive(Debug, Clone, Default)]
pub struct AdminGate {
    allow_list: Vec<String>,
}

impl AdminGate {
    pub fn new<I, S>(emails: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let allow_list = emails
            .into_iter()
            .map(|email| email.as_ref().trim().to_ascii_lowercase())
            .filter(|email| !email.is_empty())
            .collect();
        Self { allow_list }
    }

    /// Parse a comma-separated list, as found in deployment settings.
    pub fn from_list(raw: &str) -> Self {
        Self::new(raw.split(','))
    }

    pub fn is_open(&self) -> bool {
        self.allow_list.is_empty()
    }

    /// No session is 401; a session outside a non-empty allow-list is 403.
    /// An empty allow-list admits any authenticated session.
    pub fn authorize<'a>(&self, session: Option<&'a Session>) -> Result<&'a Session, ContentError> {
        let session = session.ok_or(ContentError::Unauthenticated)?;
        if self.is_open() {
            return Ok(session);
        }
        let email = session.email.trim().to_ascii_lowercase();
        if self.allow_list.iter().any(|allowed| *allowed == email) {
            Ok(session)
        } else {
            tracing::debug!(email = %session.email, "admin access denied");
            Err(ContentError::Forbidden {
                email: session.email.clone(),
            })
        }
    }
}
