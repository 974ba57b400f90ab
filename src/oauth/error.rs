use thiserror::Error;

/// Failure of a single outbound exchange.
///
/// A network failure and a provider rejection surface through the same type;
/// callers tell them apart only by the variant payload.
#[derive(Debug, Error)]
pub enum ExchangeError {
    #[error("transport failure: {0}")]
    Transport(#[from] reqwest::Error),

    /// Code exchange answered without a bearer token; carries the raw body.
    #[error("provider did not issue a bearer token: {body}")]
    Rejected { body: String },

    /// Refresh or resource call refused; carries the provider's `error` field.
    #[error("provider refused the request ({status}): {error}")]
    Provider { status: u16, error: String },
}

impl ExchangeError {
    /// Metrics label
    pub fn reason(&self) -> &'static str {
        match self {
            ExchangeError::Transport(e) if e.is_timeout() => "timeout",
            ExchangeError::Transport(_) => "transport",
            ExchangeError::Rejected { .. } => "rejected",
            ExchangeError::Provider { .. } => "provider",
        }
    }
}
