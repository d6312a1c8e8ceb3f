use thiserror::Error;

/// Failures establishing or reading the upstream connection. Everything
/// after the stream is open travels in-band as an error record instead.
#[derive(Error, Debug, Clone)]
pub enum UpstreamError {
    #[error("HTTP error: {0}")]
    Http(String),

    #[error("Upstream returned status {status}: {message}")]
    Status { status: u16, message: String },

    #[error("Stream error: {0}")]
    Stream(String),

    #[error("Invalid upstream URL: {0}")]
    InvalidUrl(String),
}
