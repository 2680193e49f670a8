//! # condfmt-xlsb
//!
//! Binary record-stream front-end for the condfmt engine.
//!
//! The entry point is [`read_conditional_formatting`]: hand it the raw bytes
//! of a conditional-formatting record stream (already pulled out of the
//! container) together with the
//! [`CondFormatBuffer`](condfmt_core::CondFormatBuffer) collecting the
//! sheet's rules. Record framing lives here; the fixed-layout record bodies
//! are decoded by `condfmt_core::record`.

pub mod error;
pub mod reader;
pub mod records;

pub use error::{XlsbCfError, XlsbCfResult};
pub use reader::{read_conditional_formatting, read_header, RecordHeader};
