//! # condfmt-xlsx
//!
//! SpreadsheetML (attribute-event) front-end for the condfmt engine.
//!
//! The entry point is [`read_conditional_formatting`]: hand it a worksheet
//! fragment containing `<conditionalFormatting>` blocks (and optionally the
//! `<x14:conditionalFormattings>` extension list) together with the
//! [`CondFormatBuffer`](condfmt_core::CondFormatBuffer) collecting the
//! sheet's rules. ZIP containers, relationships and the rest of the package
//! are the caller's business.

pub mod error;
pub mod reader;

pub use error::{XlsxCfError, XlsxCfResult};
pub use reader::read_conditional_formatting;
