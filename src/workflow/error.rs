use thiserror::Error;

/// Why a bind attempt stopped. Rendering to chat text is the caller's job.
#[derive(Debug, Error)]
pub enum BindError {
    #[error("bind input must be '<redirect-url> <alias>': {0}")]
    Format(String),

    #[error("token acquisition failed: {0}")]
    Token(String),

    #[error("profile fetch failed: {0}")]
    ProfileFetch(String),

    #[error("application '{client_id}' is already bound for this principal")]
    Duplicate { client_id: String },

    #[error("persisting binding failed: {0}")]
    Persistence(String),
}

impl BindError {
    /// Stable code for callers and metrics
    pub fn kind(&self) -> &'static str {
        match self {
            BindError::Format(_) => "format",
            BindError::Token(_) => "token",
            BindError::ProfileFetch(_) => "profile_fetch",
            BindError::Duplicate { .. } => "duplicate",
            BindError::Persistence(_) => "persistence",
        }
    }
}

/// Step of a renewal that failed for one binding
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum RenewalFailure {
    #[error("refresh exchange failed")]
    Refresh,
    #[error("liveness probe failed")]
    Probe,
    #[error("persisting renewed binding failed")]
    Persist,
}

impl RenewalFailure {
    pub fn as_str(&self) -> &'static str {
        match self {
            RenewalFailure::Refresh => "refresh_failed",
            RenewalFailure::Probe => "probe_failed",
            RenewalFailure::Persist => "persist_failed",
        }
    }
}
