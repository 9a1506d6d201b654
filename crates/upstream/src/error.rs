use thiserror::Error;

/// Everything that can go wrong between us and the lottery API.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Upstream answered, but with a non-2xx (HTTP) or >= 400 (browser) status
    #[error("upstream returned blocking status code {status}")]
    Blocked { status: u16 },

    /// Transport failure: connect, DNS, TLS, timeout, failed navigation
    #[error("upstream unreachable: {0}")]
    Unreachable(String),

    #[error("malformed upstream payload: {0}")]
    MalformedPayload(String),

    /// Browser path only
    #[error("browser launch failed: {0}")]
    BrowserLaunch(String),
}

impl FetchError {
    pub fn status(&self) -> Option<u16> {
        match self {
            FetchError::Blocked { status } => Some(*status),
            _ => None,
        }
    }

    /// Statuses the bot detection uses; only these are worth a browser retry.
    pub fn is_bot_block(&self) -> bool {
        matches!(self.status(), Some(403 | 429 | 503))
    }
}
