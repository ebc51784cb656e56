use thiserror::Error;

/// Everything that can go wrong while delivering a single robot message.
///
/// Nothing here is retried internally; the caller decides what to do next.
#[derive(Debug, Error)]
pub enum SendError {
    /// The message could not be resolved into exactly one variant.
    #[error("invalid message: {0}")]
    InvalidMessage(String),
    #[error("failed to encode payload: {0}")]
    Encoding(#[source] serde_json::Error),
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("gateway returned non-success status {status}: {body}")]
    HttpStatus { status: u16, body: String },
    #[error("failed to parse gateway response: {source} (body: {body})")]
    ResponseParse {
        #[source]
        source: serde_json::Error,
        body: String,
    },
    /// The gateway answered but reported a non-zero/non-empty error code.
    #[error("gateway error {code}: {message}")]
    Gateway { code: String, message: String },
}

impl SendError {
    /// True when the gateway itself rejected the message, as opposed to the
    /// request never reaching it or the answer being unreadable.
    pub fn is_gateway(&self) -> bool {
        matches!(self, SendError::Gateway { .. })
    }
}

/// Cap how much of a response body ends up inside an error message.
pub(crate) fn truncate_body(body: &str) -> String {
    const MAX_CHARS: usize = 512;
    if body.chars().count() <= MAX_CHARS {
        return body.to_string();
    }
    let mut out: String = body.chars().take(MAX_CHARS).collect();
    out.push_str("...");
    out
}
