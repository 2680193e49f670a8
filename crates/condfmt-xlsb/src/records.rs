//! Record type ids for the conditional-formatting records of the binary
//! stream.
//!
//! Records use variable-length headers: the type id is one or two bytes
//! (seven payload bits each, high bit = continuation), the body length one
//! to four bytes in the same scheme.

// ── Conditional formatting block ────────────────────────────────────────
pub const BEGIN_COND_FORMATTING: u16 = 0x01CD; // Range set, pivot flag, rule count
pub const END_COND_FORMATTING: u16 = 0x01CE;
pub const BEGIN_CF_RULE: u16 = 0x01CF; // Rule header (see condfmt_core::record)
pub const END_CF_RULE: u16 = 0x01D0;

// ── Rule payload records ────────────────────────────────────────────────
pub const CF_VALUE_OBJECT: u16 = 0x01D2; // One threshold (cfvo)
pub const BEGIN_COLOR_SCALE: u16 = 0x01D5;
pub const END_COLOR_SCALE: u16 = 0x01D6;
pub const BEGIN_DATABAR: u16 = 0x01D7; // Lengths and flags
pub const END_DATABAR: u16 = 0x01D8;
pub const BEGIN_ICONSET: u16 = 0x01D9; // Set code and flags
pub const END_ICONSET: u16 = 0x01DA;
pub const CF_COLOR: u16 = 0x023C; // One color reference
pub const CF_ICON: u16 = 0x0244; // One custom icon
