//! Who is using the map, and where their shapes live.
//!
//! The session is loaded and saved explicitly; nothing reads it from ambient
//! storage behind the controller's back.

use std::path::Path;

use serde::{Deserialize, Serialize};

pub const DEFAULT_USER: &str = "DefaultUser";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,
}

impl Default for Session {
    fn default() -> Self {
        Self {
            user: Some(DEFAULT_USER.to_string()),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("could not access session file")]
    Io(#[from] std::io::Error),

    #[error("session file is not valid JSON")]
    Json(#[from] serde_json::Error),
}

impl Session {
    pub fn logged_out() -> Self {
        Self { user: None }
    }

    /// Read the session file. A missing file yields the default session.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, SessionError> {
        let path = path.as_ref();
        match std::fs::read_to_string(path) {
            Ok(text) => Ok(serde_json::from_str(&text)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                log::info!("No session at {}, using default", path.display());
                Ok(Self::default())
            }
            Err(e) => Err(e.into()),
        }
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), SessionError> {
        let text = serde_json::to_string_pretty(self)?;
        std::fs::write(path, text)?;
        Ok(())
    }

    pub fn login(&mut self, user: impl Into<String>) {
        self.user = Some(user.into());
    }

    pub fn logout(&mut self) {
        self.user = None;
    }

    pub fn user(&self) -> Option<&str> {
        self.user.as_deref().filter(|user| !user.is_empty())
    }

    pub fn greeting(&self) -> String {
        match self.user() {
            Some(user) => format!("Welcome, {user}!"),
            None => "Please log in.".to_string(),
        }
    }
}

/// Everything the sync controller needs to know about its environment,
/// handed over at construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppContext {
    pub session: Session,
    pub server_url: String,
}

impl AppContext {
    pub fn new(session: Session, server_url: impl Into<String>) -> Self {
        Self {
            session,
            server_url: server_url.into(),
        }
    }
}
