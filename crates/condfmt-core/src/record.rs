//! Fixed-layout binary record bodies.
//!
//! All multi-byte integers in the binary encoding are little-endian. Strings
//! are length-prefixed: a `u32` character count followed by UTF-16LE code
//! units. The helpers here read from a record body that has already been
//! demarcated by the stream layer.

use crate::cell::{CellRange, RangeList};
use crate::error::{Error, Result};

// ── Color record base types ─────────────────────────────────────────────
pub const COLOR_TYPE_AUTO: u8 = 0;
pub const COLOR_TYPE_INDEXED: u8 = 1;
pub const COLOR_TYPE_RGB: u8 = 2;
pub const COLOR_TYPE_THEME: u8 = 3;

// ── Rule types (rule header, first field) ───────────────────────────────
pub const RULE_TYPE_CELLIS: i32 = 1;
pub const RULE_TYPE_EXPRESSION: i32 = 2;
pub const RULE_TYPE_COLORSCALE: i32 = 3;
pub const RULE_TYPE_DATABAR: i32 = 4;
pub const RULE_TYPE_TOPTEN: i32 = 5;
pub const RULE_TYPE_ICONSET: i32 = 6;

// ── Rule subtypes (rule header, second field) ───────────────────────────
// The subtype records which dialog template created the rule; for the
// expression-backed templates it selects the concrete rule kind.
pub const RULE_SUB_CELLIS: i32 = 0;
pub const RULE_SUB_EXPRESSION: i32 = 1;
pub const RULE_SUB_COLORSCALE: i32 = 2;
pub const RULE_SUB_DATABAR: i32 = 3;
pub const RULE_SUB_ICONSET: i32 = 4;
pub const RULE_SUB_TOPTEN: i32 = 5;
pub const RULE_SUB_UNIQUE: i32 = 7;
pub const RULE_SUB_TEXT: i32 = 8;
pub const RULE_SUB_BLANKS: i32 = 9;
pub const RULE_SUB_NOBLANKS: i32 = 10;
pub const RULE_SUB_ERRORS: i32 = 11;
pub const RULE_SUB_NOERRORS: i32 = 12;
pub const RULE_SUB_TODAY: i32 = 15;
pub const RULE_SUB_TOMORROW: i32 = 16;
pub const RULE_SUB_LAST7DAYS: i32 = 17;
pub const RULE_SUB_THISMONTH: i32 = 18;
pub const RULE_SUB_LASTMONTH: i32 = 19;
pub const RULE_SUB_YESTERDAY: i32 = 20;
pub const RULE_SUB_LASTWEEK: i32 = 21;
pub const RULE_SUB_NEXTMONTH: i32 = 22;
pub const RULE_SUB_THISWEEK: i32 = 23;
pub const RULE_SUB_NEXTWEEK: i32 = 24;
pub const RULE_SUB_ABOVEAVERAGE: i32 = 25;
pub const RULE_SUB_BELOWAVERAGE: i32 = 26;
pub const RULE_SUB_DUPLICATE: i32 = 27;
pub const RULE_SUB_EQABOVEAVERAGE: i32 = 29;
pub const RULE_SUB_EQBELOWAVERAGE: i32 = 30;

// ── Cell-comparison operator codes (rule header `param` field) ──────────
// The `param` field is overloaded: operator for cell-comparison rules,
// text-match operator for text rules, rank for top-N rules, standard
// deviation count for average rules.
pub const OP_BETWEEN: i32 = 1;
pub const OP_NOT_BETWEEN: i32 = 2;
pub const OP_EQUAL: i32 = 3;
pub const OP_NOT_EQUAL: i32 = 4;
pub const OP_GREATER: i32 = 5;
pub const OP_LESS: i32 = 6;
pub const OP_GREATER_EQUAL: i32 = 7;
pub const OP_LESS_EQUAL: i32 = 8;

// ── Text-match operator codes (rule header `param`, subtype TEXT) ───────
pub const TEXT_OP_CONTAINS: i32 = 0;
pub const TEXT_OP_NOT_CONTAINS: i32 = 1;
pub const TEXT_OP_BEGINS_WITH: i32 = 2;
pub const TEXT_OP_ENDS_WITH: i32 = 3;

// ── Rule header flags ───────────────────────────────────────────────────
pub const FLAG_STOP_IF_TRUE: u16 = 0x0002;
pub const FLAG_ABOVE_AVERAGE: u16 = 0x0004;
pub const FLAG_BOTTOM: u16 = 0x0008;
pub const FLAG_PERCENT: u16 = 0x0010;

// ── Threshold (cfvo) record type codes ──────────────────────────────────
pub const CFVO_NUM: i32 = 1;
pub const CFVO_MIN: i32 = 2;
pub const CFVO_MAX: i32 = 3;
pub const CFVO_PERCENT: i32 = 4;
pub const CFVO_FORMULA: i32 = 5;
pub const CFVO_PERCENTILE: i32 = 7;

// Threshold record flags. The relation flag is set for the default ">="
// relation; a cleared flag selects the strict ">".
pub const CFVO_FLAG_GTE: u8 = 0x01;

// ── Data bar record flags ───────────────────────────────────────────────
pub const DATABAR_FLAG_GRADIENT: u8 = 0x01;
pub const DATABAR_FLAG_SHOW_VALUE: u8 = 0x02;

// ── Icon set record flags ───────────────────────────────────────────────
pub const ICONSET_FLAG_CUSTOM: u16 = 0x0001;
pub const ICONSET_FLAG_REVERSE: u16 = 0x0002;
pub const ICONSET_FLAG_SHOW_VALUE: u16 = 0x0004;

/// Read a `u8` from a record body at `offset`, advancing `offset`.
#[inline]
pub fn read_u8(data: &[u8], offset: &mut usize) -> Result<u8> {
    if *offset >= data.len() {
        return Err(Error::Truncated {
            offset: *offset,
            needed: 1,
        });
    }
    let v = data[*offset];
    *offset += 1;
    Ok(v)
}

/// Read a `u16` (little-endian) from a record body at `offset`.
#[inline]
pub fn read_u16(data: &[u8], offset: &mut usize) -> Result<u16> {
    if *offset + 2 > data.len() {
        return Err(Error::Truncated {
            offset: *offset,
            needed: 2,
        });
    }
    let v = u16::from_le_bytes([data[*offset], data[*offset + 1]]);
    *offset += 2;
    Ok(v)
}

/// Read a `u32` (little-endian) from a record body at `offset`.
#[inline]
pub fn read_u32(data: &[u8], offset: &mut usize) -> Result<u32> {
    if *offset + 4 > data.len() {
        return Err(Error::Truncated {
            offset: *offset,
            needed: 4,
        });
    }
    let v = u32::from_le_bytes([
        data[*offset],
        data[*offset + 1],
        data[*offset + 2],
        data[*offset + 3],
    ]);
    *offset += 4;
    Ok(v)
}

/// Read an `i16` (little-endian).
#[inline]
pub fn read_i16(data: &[u8], offset: &mut usize) -> Result<i16> {
    read_u16(data, offset).map(|v| v as i16)
}

/// Read an `i32` (little-endian).
#[inline]
pub fn read_i32(data: &[u8], offset: &mut usize) -> Result<i32> {
    read_u32(data, offset).map(|v| v as i32)
}

/// Read an `f64` (IEEE 754 double, little-endian).
#[inline]
pub fn read_f64(data: &[u8], offset: &mut usize) -> Result<f64> {
    if *offset + 8 > data.len() {
        return Err(Error::Truncated {
            offset: *offset,
            needed: 8,
        });
    }
    let bytes: [u8; 8] = data[*offset..*offset + 8].try_into().unwrap();
    *offset += 8;
    Ok(f64::from_le_bytes(bytes))
}

/// Number of unread bytes in the record body.
#[inline]
pub fn remaining(data: &[u8], offset: usize) -> usize {
    data.len().saturating_sub(offset)
}

/// Read a length-prefixed UTF-16LE string: `u32` character count followed by
/// that many code units.
pub fn read_wide_string(data: &[u8], offset: &mut usize) -> Result<String> {
    let count = read_u32(data, offset)? as usize;

    // The count is characters, not bytes; reject counts the body cannot hold
    if count > remaining(data, *offset) / 2 {
        return Err(Error::Truncated {
            offset: *offset,
            needed: count * 2,
        });
    }

    let mut units = Vec::with_capacity(count);
    for _ in 0..count {
        units.push(read_u16(data, offset)?);
    }
    Ok(String::from_utf16_lossy(&units))
}

/// Read a range list: `u32` range count, then four `u32` fields per range
/// (first row, last row, first column, last column, all 0-based).
pub fn read_range_list(data: &[u8], offset: &mut usize) -> Result<RangeList> {
    let count = read_u32(data, offset)?;
    let mut list = RangeList::new();

    for _ in 0..count {
        let row_first = read_u32(data, offset)?;
        let row_last = read_u32(data, offset)?;
        let col_first = read_u32(data, offset)?.min(u16::MAX as u32) as u16;
        let col_last = read_u32(data, offset)?.min(u16::MAX as u32) as u16;
        list.push(CellRange::from_indices(
            row_first, col_first, row_last, col_last,
        ));
    }

    Ok(list)
}
