//! Threshold (cfvo) parsing.
//!
//! One threshold describes a single stop of a color scale, data bar, or icon
//! set. The type tag sets independent kind flags rather than a closed enum:
//! real-world files do produce multi-flag combinations, and the precedence
//! applied when converting to the host representation is fixed (see
//! [`RuleThreshold::entry_kind`]).

use crate::attrs::AttributeMap;
use crate::color::Rgb;
use crate::entry::{EntryKind, ScaleEntry};
use crate::error::Result;
use crate::record;

/// One parsed threshold
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RuleThreshold {
    /// Numeric payload
    pub value: f64,
    /// Formula payload, verbatim source text; empty when none
    pub formula: String,
    /// Type tag was "num"
    pub num: bool,
    /// Type tag was "min"
    pub min: bool,
    /// Type tag was "max"
    pub max: bool,
    /// Type tag was "percent"
    pub percent: bool,
    /// Type tag was "percentile"
    pub percentile: bool,
    /// Strict ">" relation instead of the default ">="
    pub greater_than: bool,
}

impl RuleThreshold {
    /// Parse one threshold from an attribute group (`type`, `val`, `gte`).
    pub fn from_attrs(attrs: &AttributeMap) -> Self {
        let ty = attrs.get("type").unwrap_or("");
        let val = attrs.get("val").unwrap_or("");

        let mut threshold = RuleThreshold::default();

        // The literal empty-quote marker is not a formula; only the kind
        // flags below are recorded for it.
        if val != "\"\"" {
            match parse_attr_double(val) {
                Some(number) if ty != "formula" => threshold.value = number,
                _ => threshold.formula = val.to_string(),
            }
        }

        if ty == "num" {
            threshold.num = true;
        }
        if ty == "min" {
            threshold.min = true;
        } else if ty == "max" {
            threshold.max = true;
        } else if ty == "percent" {
            threshold.percent = true;
        } else if ty == "percentile" {
            threshold.percentile = true;
        }

        // Only an explicit "false" switches to the strict relation; a "true"
        // or missing attribute keeps the default ">=".
        if attrs.get("gte") == Some("false") {
            threshold.greater_than = true;
        }

        threshold
    }

    /// Decode one threshold from a binary record body: `i32` type code, `u8`
    /// flags, `f64` value, and (for the formula type only) a length-prefixed
    /// formula string.
    pub fn from_record(data: &[u8]) -> Result<Self> {
        let mut offset = 0usize;
        let code = record::read_i32(data, &mut offset)?;
        let flags = record::read_u8(data, &mut offset)?;
        let value = record::read_f64(data, &mut offset)?;

        let mut threshold = RuleThreshold {
            value,
            ..RuleThreshold::default()
        };

        match code {
            record::CFVO_NUM => threshold.num = true,
            record::CFVO_MIN => threshold.min = true,
            record::CFVO_MAX => threshold.max = true,
            record::CFVO_PERCENT => threshold.percent = true,
            record::CFVO_PERCENTILE => threshold.percentile = true,
            record::CFVO_FORMULA => {
                threshold.formula = record::read_wide_string(data, &mut offset)?;
            }
            unknown => log::warn!("unknown threshold type code {unknown}, keeping plain value"),
        }

        if flags & record::CFVO_FLAG_GTE == 0 {
            threshold.greater_than = true;
        }

        Ok(threshold)
    }

    /// Map the kind flags to the host interpretation. The precedence is
    /// fixed: min, max, percent, percentile, formula, plain value.
    pub fn entry_kind(&self) -> EntryKind {
        if self.min {
            EntryKind::Min
        } else if self.max {
            EntryKind::Max
        } else if self.percent {
            EntryKind::Percent
        } else if self.percentile {
            EntryKind::Percentile
        } else if !self.formula.is_empty() {
            EntryKind::Formula
        } else {
            EntryKind::Value
        }
    }

    /// Convert into a host threshold entry
    pub fn to_scale_entry(&self, color: Option<Rgb>) -> ScaleEntry {
        ScaleEntry {
            kind: self.entry_kind(),
            value: self.value,
            formula: (!self.formula.is_empty()).then(|| self.formula.clone()),
            color,
            greater_than: self.greater_than,
        }
    }
}

/// Strict numeric parse with `.` as decimal point and `,` as group
/// separator. The whole string must be consumed.
pub(crate) fn parse_attr_double(s: &str) -> Option<f64> {
    if s.is_empty() {
        return None;
    }
    let stripped: String;
    let s = if s.contains(',') {
        stripped = s.replace(',', "");
        &stripped
    } else {
        s
    };
    s.parse::<f64>().ok()
}

/// Strict numeric parse with `.` as decimal point and no group separator.
/// Fails unless the whole string is consumed.
pub(crate) fn parse_plain_double(s: &str) -> Option<f64> {
    if s.is_empty() {
        return None;
    }
    s.parse::<f64>().ok()
}
