//! External collaborator interfaces.
//!
//! The engine consults four host services: the theme palette, the
//! differential-style service, the formula tokenizer, and the document sink
//! that receives the finalized formats. All of them are injected, synchronous
//! and side-effecting; the engine never owns their lifetime and never calls
//! them concurrently.

use std::sync::Arc;

use crate::cell::{CellAddress, RangeList};
use crate::color::Rgb;
use crate::entry::FormatEntry;

/// Identifier of a conditional format registered with the host document.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct FormatIndex(pub u32);

/// Opaque identifier of a differential style created by a [`StyleResolver`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct StyleId(pub u32);

/// Opaque formula token stream produced by a [`FormulaTokenizer`].
///
/// The engine never inspects the contents; it only stores, clones and
/// compares them. The encoding is whatever the tokenizer chooses.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TokenSequence(Arc<[u8]>);

impl TokenSequence {
    /// Wrap an encoded token stream
    pub fn new(bytes: impl Into<Arc<[u8]>>) -> Self {
        Self(bytes.into())
    }

    /// The encoded token bytes
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Whether the sequence is empty
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Default for TokenSequence {
    fn default() -> Self {
        Self(Vec::new().into())
    }
}

/// Document-wide color theme lookup.
///
/// The slot passed here has already had the wire remapping applied
/// (see [`crate::color::remap_theme_slot`]).
pub trait ThemePalette {
    /// Resolve a theme slot to its RGB value, if the theme defines it
    fn theme_color(&self, slot: u32) -> Option<Rgb>;
}

/// Differential-style service ("create style from attributes, return an
/// identifier").
pub trait StyleResolver {
    /// Create (or look up) the style for a differential-format reference.
    /// `None` means the rule carried no style reference; the resolver decides
    /// what the empty style is.
    fn create_dxf_style(&mut self, dxf_id: Option<u32>) -> StyleId;

    /// Whether two differential-format references resolve to styles with
    /// identical content. Identifier equality is not sufficient: the same
    /// visual style may be registered under different identifiers.
    fn dxf_contents_equal(&self, a: Option<u32>, b: Option<u32>) -> bool;
}

/// External formula parser. Formulas are captured from the source and handed
/// over untouched; the engine never evaluates them.
pub trait FormulaTokenizer {
    /// Tokenize a formula given in text form, relative to an anchor cell
    fn tokenize(&mut self, anchor: CellAddress, formula: &str) -> TokenSequence;

    /// Tokenize a formula given as raw token bytes from the binary encoding
    fn tokenize_binary(&mut self, anchor: CellAddress, rgce: &[u8]) -> TokenSequence;
}

/// The host document receiving finalized conditional formats.
pub trait DocumentSink {
    /// Register a new conditional format covering `ranges`; returns its index
    fn add_conditional_format(&mut self, sheet: u32, ranges: &RangeList) -> FormatIndex;

    /// Append one applied entry to a registered format
    fn add_entry(&mut self, index: FormatIndex, entry: FormatEntry);

    /// Associate the format index with its ranges in the cell attributes
    fn add_cond_format_data(&mut self, sheet: u32, ranges: &RangeList, index: FormatIndex);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_sequence_compares_by_content() {
        let a = TokenSequence::new(vec![1u8, 2, 3]);
        let b = TokenSequence::new(vec![1u8, 2, 3]);
        let c = TokenSequence::new(vec![4u8]);
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert!(TokenSequence::default().is_empty());
    }
}
