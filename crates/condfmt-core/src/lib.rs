//! # condfmt-core
//!
//! Conditional formatting rule model and import/normalization engine.
//!
//! This crate turns conditional-formatting rules from the two spreadsheet
//! wire encodings (attribute events via `condfmt-xlsx`, binary records via
//! `condfmt-xlsb`) into one internal representation, then commits the
//! normalized result to a host document:
//!
//! - [`RuleThreshold`] and the color resolver parse individual threshold and
//!   color references
//! - the builders in [`visual`] accumulate color scales, data bars and icon
//!   sets
//! - [`CondRule`] models one rule of any kind; [`CondFormat`] collects rules
//!   by priority under one range set
//! - [`CondFormatBuffer`] owns everything for a sheet and runs the commit
//!   pipeline: deduplicate, cross-merge extension blocks, sort by priority,
//!   register with the [`DocumentSink`]
//!
//! The host document, style service, formula tokenizer and theme palette
//! are injected through the traits in [`host`]; the engine never owns them.
//! Malformed rule content never aborts an import: bad rules degrade to "no
//! rule added" and are reported through the `log` facade.

pub mod attrs;
pub mod buffer;
pub mod cell;
pub mod color;
pub mod entry;
pub mod error;
pub mod extension;
pub mod format;
pub mod host;
pub mod record;
pub mod rule;
pub mod threshold;
pub mod visual;

#[cfg(test)]
pub(crate) mod testutil;

// Re-exports for convenience
pub use attrs::AttributeMap;
pub use buffer::{CondFormatBuffer, FormatSlot};
pub use cell::{CellAddress, CellRange, RangeList};
pub use color::{resolve_color, ColorBase, ColorRef, Rgb};
pub use entry::{
    AxisPosition, ColorScaleData, CondMode, ConditionEntry, DataBarData, DateEntry, EntryKind,
    FormatEntry, IconSetData, IconSetType, ScaleEntry, TimePeriod,
};
pub use error::{Error, Result};
pub use extension::{ext_cfvo, ExtFormat, ExtPatch, ExtTarget};
pub use format::CondFormat;
pub use host::{
    DocumentSink, FormatIndex, FormulaTokenizer, StyleId, StyleResolver, ThemePalette,
    TokenSequence,
};
pub use rule::{CfOperator, CondRule, RawFormula, RuleKind};
pub use threshold::RuleThreshold;
pub use visual::{ColorScaleBuilder, DataBarBuilder, ExtCfvo, IconSetBuilder, VisualBuilder};

/// Maximum number of rows in a worksheet
pub const MAX_ROWS: u32 = 1_048_576;

/// Maximum number of columns in a worksheet
pub const MAX_COLS: u16 = 16_384;
