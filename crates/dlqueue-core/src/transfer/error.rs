//! Transfer error type.

/// Failure of one fetch. Every variant is non-fatal to the process; the
/// scheduler reverts the job to pending and retries on a later tick.
#[derive(Debug, thiserror::Error)]
pub enum TransferError {
    #[error("invalid URL: {0}")]
    InvalidUrl(String),

    #[error("unsupported URL scheme: {0}")]
    UnsupportedScheme(String),

    /// Connect, DNS, TLS, or response read failure reported by curl.
    #[error("network: {0}")]
    Network(#[source] curl::Error),

    /// Creating or writing the destination file failed.
    #[error("writing destination: {0}")]
    Io(#[from] std::io::Error),

    #[error("unexpected HTTP status {code}")]
    UnexpectedStatus { code: u32 },

    #[error("transfer deadline exceeded")]
    Timeout,

    #[error("more than {limit} redirects")]
    TooManyRedirects { limit: u32 },

    /// The blocking transfer task panicked or was cancelled by runtime shutdown.
    #[error("transfer task: {0}")]
    Join(String),
}

impl From<curl::Error> for TransferError {
    fn from(e: curl::Error) -> Self {
        if e.is_operation_timedout() {
            TransferError::Timeout
        } else {
            TransferError::Network(e)
        }
    }
}
