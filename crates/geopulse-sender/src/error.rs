//! Error types for the sender binary.

/// Top-level error for the sender binary.
#[derive(Debug, thiserror::Error)]
pub enum SenderError {
    /// The replay file could not be opened or a row could not be decoded.
    #[error("csv error: {source}")]
    Csv {
        /// The underlying CSV error.
        #[from]
        source: csv::Error,
    },

    /// The HTTP client could not be built.
    #[error("http client error: {source}")]
    Client {
        /// The underlying reqwest error.
        #[from]
        source: reqwest::Error,
    },

    /// The replay file has no rows.
    #[error("no packages in {path}")]
    Empty {
        /// The file that was read.
        path: String,
    },
}
