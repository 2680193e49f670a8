//! Test doubles for the host services.

use ahash::AHashMap;

use crate::cell::{CellAddress, RangeList};
use crate::color::Rgb;
use crate::entry::FormatEntry;
use crate::host::{
    DocumentSink, FormatIndex, FormulaTokenizer, StyleId, StyleResolver, ThemePalette,
    TokenSequence,
};

/// One conditional format as the host document received it
#[derive(Debug)]
pub(crate) struct RecordedFormat {
    pub sheet: u32,
    pub ranges: RangeList,
    pub entries: Vec<FormatEntry>,
    pub data_set: bool,
}

/// Records every sink call for assertions
#[derive(Debug, Default)]
pub(crate) struct RecordingSink {
    pub formats: Vec<RecordedFormat>,
}

impl DocumentSink for RecordingSink {
    fn add_conditional_format(&mut self, sheet: u32, ranges: &RangeList) -> FormatIndex {
        self.formats.push(RecordedFormat {
            sheet,
            ranges: ranges.clone(),
            entries: Vec::new(),
            data_set: false,
        });
        FormatIndex(self.formats.len() as u32 - 1)
    }

    fn add_entry(&mut self, index: FormatIndex, entry: FormatEntry) {
        self.formats[index.0 as usize].entries.push(entry);
    }

    fn add_cond_format_data(&mut self, _sheet: u32, _ranges: &RangeList, index: FormatIndex) {
        self.formats[index.0 as usize].data_set = true;
    }
}

/// Style resolver where the identifier is the content: two references are
/// content-equal iff they carry the same id
#[derive(Debug, Default)]
pub(crate) struct PlainStyles;

impl StyleResolver for PlainStyles {
    fn create_dxf_style(&mut self, dxf_id: Option<u32>) -> StyleId {
        StyleId(dxf_id.unwrap_or(0))
    }

    fn dxf_contents_equal(&self, a: Option<u32>, b: Option<u32>) -> bool {
        a == b
    }
}

/// Style resolver where distinct identifiers may share content, mirroring a
/// style table with duplicate registrations
#[derive(Debug, Default)]
pub(crate) struct AliasedStyles {
    content: AHashMap<u32, u32>,
}

impl AliasedStyles {
    /// Map each (id, content key) pair; unmapped ids are their own content
    pub fn new(pairs: &[(u32, u32)]) -> Self {
        Self {
            content: pairs.iter().copied().collect(),
        }
    }

    fn key(&self, id: Option<u32>) -> Option<u32> {
        id.map(|id| self.content.get(&id).copied().unwrap_or(id))
    }
}

impl StyleResolver for AliasedStyles {
    fn create_dxf_style(&mut self, dxf_id: Option<u32>) -> StyleId {
        StyleId(dxf_id.unwrap_or(0))
    }

    fn dxf_contents_equal(&self, a: Option<u32>, b: Option<u32>) -> bool {
        self.key(a) == self.key(b)
    }
}

/// Tokenizer that passes formula text through as UTF-8 bytes, so tests can
/// assert on the operands a rule produced
#[derive(Debug, Default)]
pub(crate) struct TextTokens;

impl FormulaTokenizer for TextTokens {
    fn tokenize(&mut self, _anchor: CellAddress, formula: &str) -> TokenSequence {
        TokenSequence::new(formula.as_bytes().to_vec())
    }

    fn tokenize_binary(&mut self, _anchor: CellAddress, rgce: &[u8]) -> TokenSequence {
        TokenSequence::new(rgce.to_vec())
    }
}

/// Theme with no defined slots
#[derive(Debug, Default)]
pub(crate) struct NoTheme;

impl ThemePalette for NoTheme {
    fn theme_color(&self, _slot: u32) -> Option<Rgb> {
        None
    }
}
