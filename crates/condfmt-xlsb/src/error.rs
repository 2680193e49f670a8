//! Binary stream reader error types

use thiserror::Error;

/// Result type for the record-stream reader
pub type XlsbCfResult<T> = std::result::Result<T, XlsbCfError>;

/// Errors that can occur while framing the record stream.
///
/// Only broken stream structure surfaces here; a malformed record *body*
/// degrades inside the engine and the walk continues.
#[derive(Debug, Error)]
pub enum XlsbCfError {
    /// Record header extends past the end of the stream
    #[error("record header truncated at offset {0}")]
    TruncatedHeader(usize),

    /// Record body extends past the end of the stream
    #[error("record body truncated at offset {offset}, need {needed} bytes")]
    TruncatedBody { offset: usize, needed: usize },

    /// Record header is malformed
    #[error("invalid record header at offset {0}: {1}")]
    InvalidHeader(usize, &'static str),
}
