//! Walker for a conditional-formatting record stream.
//!
//! The caller hands in the stream bytes already extracted from the
//! container. Records are framed here; their bodies are decoded by the
//! engine's fixed-layout readers. Unknown record types are skipped, and a
//! malformed body never aborts the walk.

use condfmt_core::buffer::{CondFormatBuffer, FormatSlot};
use condfmt_core::host::ThemePalette;
use condfmt_core::rule::CondRule;

use crate::error::{XlsbCfError, XlsbCfResult};
use crate::records;

/// One framed record header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordHeader {
    /// Record type id
    pub record_type: u16,
    /// Body length in bytes
    pub len: usize,
}

/// Read a record header at `offset`, advancing past it. Returns `None` at a
/// clean end of stream.
pub fn read_header(data: &[u8], offset: &mut usize) -> XlsbCfResult<Option<RecordHeader>> {
    if *offset >= data.len() {
        return Ok(None);
    }
    let start = *offset;

    // Type id: one or two bytes, seven payload bits each
    let b0 = data[*offset];
    *offset += 1;
    let mut record_type = (b0 & 0x7F) as u16;
    if b0 & 0x80 != 0 {
        let b1 = *data
            .get(*offset)
            .ok_or(XlsbCfError::TruncatedHeader(start))?;
        *offset += 1;
        if b1 & 0x80 != 0 {
            return Err(XlsbCfError::InvalidHeader(start, "type id over two bytes"));
        }
        record_type |= (b1 as u16) << 7;
    }

    // Body length: up to four bytes, seven payload bits each
    let mut len = 0usize;
    let mut shift = 0u32;
    loop {
        let b = *data
            .get(*offset)
            .ok_or(XlsbCfError::TruncatedHeader(start))?;
        *offset += 1;
        len |= ((b & 0x7F) as usize) << shift;
        if b & 0x80 == 0 {
            break;
        }
        shift += 7;
        if shift > 21 {
            return Err(XlsbCfError::InvalidHeader(start, "length over four bytes"));
        }
    }

    Ok(Some(RecordHeader { record_type, len }))
}

/// Walk the record stream and feed every conditional-formatting record into
/// `buffer`.
pub fn read_conditional_formatting(
    stream: &[u8],
    theme: &dyn ThemePalette,
    buffer: &mut CondFormatBuffer,
) -> XlsbCfResult<()> {
    let mut offset = 0usize;
    let mut current_slot: Option<FormatSlot> = None;
    let mut current_rule: Option<CondRule> = None;

    while let Some(header) = read_header(stream, &mut offset)? {
        let end = offset + header.len;
        if end > stream.len() {
            return Err(XlsbCfError::TruncatedBody {
                offset,
                needed: header.len,
            });
        }
        let body = &stream[offset..end];

        match header.record_type {
            records::BEGIN_COND_FORMATTING => {
                current_slot = Some(buffer.import_cond_formatting_record(body));
            }
            records::END_COND_FORMATTING => {
                current_slot = None;
            }
            records::BEGIN_CF_RULE => match CondRule::from_record(body) {
                Ok(rule) => current_rule = Some(rule),
                Err(e) => {
                    log::warn!("bad rule header record: {e}");
                    current_rule = None;
                }
            },
            records::END_CF_RULE => {
                if let Some(rule) = current_rule.take() {
                    match current_slot {
                        Some(slot) => buffer.append_rule(slot, rule),
                        None => buffer.append_standalone_rule(rule),
                    }
                }
            }
            records::BEGIN_COLOR_SCALE => {
                if let Some(rule) = current_rule.as_mut() {
                    rule.import_color_scale();
                }
            }
            records::BEGIN_DATABAR => {
                if let Some(rule) = current_rule.as_mut() {
                    rule.import_data_bar_record(body);
                }
            }
            records::BEGIN_ICONSET => {
                if let Some(rule) = current_rule.as_mut() {
                    rule.import_icon_set_record(body);
                }
            }
            records::CF_VALUE_OBJECT => {
                if let Some(rule) = current_rule.as_mut() {
                    rule.import_cfvo_record(body);
                }
            }
            records::CF_COLOR => {
                if let Some(rule) = current_rule.as_mut() {
                    rule.import_color_record(body, theme);
                }
            }
            records::CF_ICON => {
                if let Some(rule) = current_rule.as_mut() {
                    rule.import_icon_record(body);
                }
            }
            _ => {}
        }

        offset = end;
    }

    Ok(())
}
