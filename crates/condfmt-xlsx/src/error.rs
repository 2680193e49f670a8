//! XLSX fragment reader error types

use thiserror::Error;

/// Result type for the fragment reader
pub type XlsxCfResult<T> = std::result::Result<T, XlsxCfError>;

/// Errors that can occur while walking a worksheet fragment.
///
/// Only malformed XML surfaces here; malformed rule content degrades inside
/// the engine and never aborts the walk.
#[derive(Debug, Error)]
pub enum XlsxCfError {
    /// XML error
    #[error("XML error: {0}")]
    Xml(#[from] quick_xml::Error),
}
