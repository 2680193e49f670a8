//! End-to-end tests: hand-built record streams through the walker and
//! buffer into a recording host document.

use condfmt_core::buffer::CondFormatBuffer;
use condfmt_core::cell::{CellAddress, RangeList};
use condfmt_core::color::Rgb;
use condfmt_core::entry::{CondMode, EntryKind, FormatEntry, IconSetType};
use condfmt_core::host::{
    DocumentSink, FormatIndex, FormulaTokenizer, StyleId, StyleResolver, ThemePalette,
    TokenSequence,
};
use condfmt_core::record;
use condfmt_xlsb::{read_conditional_formatting, records};
use pretty_assertions::assert_eq;

#[derive(Debug)]
struct RecordedFormat {
    ranges: RangeList,
    entries: Vec<FormatEntry>,
}

#[derive(Debug, Default)]
struct RecordingSink {
    formats: Vec<RecordedFormat>,
}

impl DocumentSink for RecordingSink {
    fn add_conditional_format(&mut self, _sheet: u32, ranges: &RangeList) -> FormatIndex {
        self.formats.push(RecordedFormat {
            ranges: ranges.clone(),
            entries: Vec::new(),
        });
        FormatIndex(self.formats.len() as u32 - 1)
    }

    fn add_entry(&mut self, index: FormatIndex, entry: FormatEntry) {
        self.formats[index.0 as usize].entries.push(entry);
    }

    fn add_cond_format_data(&mut self, _sheet: u32, _ranges: &RangeList, _index: FormatIndex) {}
}

#[derive(Debug, Default)]
struct PlainStyles;

impl StyleResolver for PlainStyles {
    fn create_dxf_style(&mut self, dxf_id: Option<u32>) -> StyleId {
        StyleId(dxf_id.unwrap_or(0))
    }

    fn dxf_contents_equal(&self, a: Option<u32>, b: Option<u32>) -> bool {
        a == b
    }
}

#[derive(Debug, Default)]
struct TextTokens;

impl FormulaTokenizer for TextTokens {
    fn tokenize(&mut self, _anchor: CellAddress, formula: &str) -> TokenSequence {
        TokenSequence::new(formula.as_bytes().to_vec())
    }

    fn tokenize_binary(&mut self, _anchor: CellAddress, rgce: &[u8]) -> TokenSequence {
        TokenSequence::new(rgce.to_vec())
    }
}

#[derive(Debug, Default)]
struct StockTheme;

impl ThemePalette for StockTheme {
    fn theme_color(&self, slot: u32) -> Option<Rgb> {
        match slot {
            0 => Some(Rgb(0xFFFFFF)),
            1 => Some(Rgb(0x000000)),
            4 => Some(Rgb(0x4F81BD)),
            _ => None,
        }
    }
}

// ── Stream building helpers ─────────────────────────────────────────────

fn push_record(stream: &mut Vec<u8>, record_type: u16, body: &[u8]) {
    if record_type < 0x80 {
        stream.push(record_type as u8);
    } else {
        stream.push((record_type & 0x7F) as u8 | 0x80);
        stream.push((record_type >> 7) as u8);
    }
    let mut len = body.len();
    loop {
        let byte = (len & 0x7F) as u8;
        len >>= 7;
        if len == 0 {
            stream.push(byte);
            break;
        }
        stream.push(byte | 0x80);
    }
    stream.extend_from_slice(body);
}

fn begin_formatting_body(ranges: &[(u32, u32, u32, u32)]) -> Vec<u8> {
    let mut body = Vec::new();
    body.extend_from_slice(&1u32.to_le_bytes()); // rule count
    body.extend_from_slice(&0u32.to_le_bytes()); // pivot
    body.extend_from_slice(&(ranges.len() as u32).to_le_bytes());
    for (row_first, row_last, col_first, col_last) in ranges {
        body.extend_from_slice(&row_first.to_le_bytes());
        body.extend_from_slice(&row_last.to_le_bytes());
        body.extend_from_slice(&col_first.to_le_bytes());
        body.extend_from_slice(&col_last.to_le_bytes());
    }
    body
}

#[allow(clippy::too_many_arguments)]
fn rule_body(
    ty: i32,
    subtype: i32,
    dxf: i32,
    priority: i32,
    param: i32,
    flags: u16,
    formulas: &[&[u8]],
) -> Vec<u8> {
    let mut body = Vec::new();
    body.extend_from_slice(&ty.to_le_bytes());
    body.extend_from_slice(&subtype.to_le_bytes());
    body.extend_from_slice(&dxf.to_le_bytes());
    body.extend_from_slice(&priority.to_le_bytes());
    body.extend_from_slice(&param.to_le_bytes());
    body.extend_from_slice(&[0u8; 8]); // reserved
    body.extend_from_slice(&flags.to_le_bytes());
    for slot in 0..3 {
        let size = formulas.get(slot).map_or(0, |f| f.len()) as i32;
        body.extend_from_slice(&size.to_le_bytes());
    }
    body.extend_from_slice(&0u32.to_le_bytes()); // empty text
    for formula in formulas {
        body.extend_from_slice(&(formula.len() as u32).to_le_bytes());
        body.extend_from_slice(formula);
        // Keep the remaining-byte gate satisfied for short token blocks
        body.extend_from_slice(&[0u8; 4]);
    }
    body
}

fn cfvo_body(code: i32, value: f64) -> Vec<u8> {
    let mut body = Vec::new();
    body.extend_from_slice(&code.to_le_bytes());
    body.push(record::CFVO_FLAG_GTE);
    body.extend_from_slice(&value.to_le_bytes());
    body
}

fn rgb_color_body(r: u8, g: u8, b: u8) -> Vec<u8> {
    vec![record::COLOR_TYPE_RGB, 0, 0, 0, r, g, b, 0xFF]
}

fn theme_color_body(slot: u8) -> Vec<u8> {
    vec![record::COLOR_TYPE_THEME, slot, 0, 0, 0, 0, 0, 0xFF]
}

fn import(stream: &[u8]) -> RecordingSink {
    let mut buffer = CondFormatBuffer::new(0);
    read_conditional_formatting(stream, &StockTheme, &mut buffer).unwrap();

    let mut sink = RecordingSink::default();
    buffer.finalize(&mut sink, &mut PlainStyles, &mut TextTokens);
    sink
}

#[test]
fn color_scale_rule_stream() {
    let mut stream = Vec::new();
    push_record(
        &mut stream,
        records::BEGIN_COND_FORMATTING,
        &begin_formatting_body(&[(0, 9, 0, 0)]),
    );
    // Subtype 2 together with the color scale type; the declared formula
    // size must not trigger a formula read for visual rules.
    push_record(
        &mut stream,
        records::BEGIN_CF_RULE,
        &rule_body(
            record::RULE_TYPE_COLORSCALE,
            record::RULE_SUB_COLORSCALE,
            -1,
            1,
            0,
            0,
            &[b"leftover-token-bytes"],
        ),
    );
    push_record(&mut stream, records::BEGIN_COLOR_SCALE, &[]);
    push_record(
        &mut stream,
        records::CF_VALUE_OBJECT,
        &cfvo_body(record::CFVO_MIN, 0.0),
    );
    push_record(
        &mut stream,
        records::CF_VALUE_OBJECT,
        &cfvo_body(record::CFVO_MAX, 0.0),
    );
    push_record(&mut stream, records::CF_COLOR, &rgb_color_body(0xFF, 0, 0));
    push_record(&mut stream, records::CF_COLOR, &rgb_color_body(0, 0xFF, 0));
    push_record(&mut stream, records::END_COLOR_SCALE, &[]);
    push_record(&mut stream, records::END_CF_RULE, &[]);
    push_record(&mut stream, records::END_COND_FORMATTING, &[]);

    let sink = import(&stream);
    assert_eq!(sink.formats.len(), 1);
    assert_eq!(sink.formats[0].ranges.to_sqref_string(), "A1:A10");

    let FormatEntry::ColorScale(scale) = &sink.formats[0].entries[0] else {
        panic!("expected a color scale entry");
    };
    assert_eq!(scale.stops.len(), 2);
    assert_eq!(scale.stops[0].kind, EntryKind::Min);
    assert_eq!(scale.stops[0].color, Some(Rgb(0xFF0000)));
    assert_eq!(scale.stops[1].kind, EntryKind::Max);
    assert_eq!(scale.stops[1].color, Some(Rgb(0x00FF00)));
}

#[test]
fn cell_is_rule_with_binary_formula() {
    let rgce: &[u8] = &[0x1E, 0x2A, 0x00];

    let mut stream = Vec::new();
    push_record(
        &mut stream,
        records::BEGIN_COND_FORMATTING,
        &begin_formatting_body(&[(0, 4, 1, 1)]),
    );
    push_record(
        &mut stream,
        records::BEGIN_CF_RULE,
        &rule_body(
            record::RULE_TYPE_CELLIS,
            record::RULE_SUB_CELLIS,
            3,
            1,
            record::OP_GREATER,
            record::FLAG_STOP_IF_TRUE,
            &[rgce],
        ),
    );
    push_record(&mut stream, records::END_CF_RULE, &[]);
    push_record(&mut stream, records::END_COND_FORMATTING, &[]);

    let sink = import(&stream);
    let FormatEntry::Condition(cond) = &sink.formats[0].entries[0] else {
        panic!("expected a condition entry");
    };
    assert_eq!(cond.mode, CondMode::Greater);
    assert!(cond.stop_if_true);
    assert_eq!(cond.style, StyleId(3));
    assert_eq!(cond.tokens.len(), 1);
    assert_eq!(cond.tokens[0].as_bytes(), rgce);
}

#[test]
fn data_bar_rule_stream() {
    let mut stream = Vec::new();
    push_record(
        &mut stream,
        records::BEGIN_COND_FORMATTING,
        &begin_formatting_body(&[(0, 19, 3, 3)]),
    );
    push_record(
        &mut stream,
        records::BEGIN_CF_RULE,
        &rule_body(
            record::RULE_TYPE_DATABAR,
            record::RULE_SUB_DATABAR,
            -1,
            1,
            0,
            0,
            &[],
        ),
    );
    // min length 20, max length 80, solid fill but keep the value visible
    push_record(
        &mut stream,
        records::BEGIN_DATABAR,
        &[20, 80, record::DATABAR_FLAG_SHOW_VALUE],
    );
    push_record(
        &mut stream,
        records::CF_VALUE_OBJECT,
        &cfvo_body(record::CFVO_NUM, 1.0),
    );
    push_record(
        &mut stream,
        records::CF_VALUE_OBJECT,
        &cfvo_body(record::CFVO_NUM, 9.0),
    );
    push_record(&mut stream, records::CF_COLOR, &rgb_color_body(0x63, 0x8E, 0xC6));
    push_record(&mut stream, records::END_DATABAR, &[]);
    push_record(&mut stream, records::END_CF_RULE, &[]);
    push_record(&mut stream, records::END_COND_FORMATTING, &[]);

    let sink = import(&stream);
    let FormatEntry::DataBar(bar) = &sink.formats[0].entries[0] else {
        panic!("expected a data bar entry");
    };
    assert_eq!(bar.lower.value, 1.0);
    assert_eq!(bar.upper.value, 9.0);
    assert_eq!(bar.min_length, 20);
    assert_eq!(bar.max_length, 80);
    assert!(!bar.gradient);
    assert!(!bar.only_bar);
    assert_eq!(bar.positive_color, Rgb(0x638EC6));
}

#[test]
fn icon_set_rule_with_custom_icons() {
    let mut stream = Vec::new();
    push_record(
        &mut stream,
        records::BEGIN_COND_FORMATTING,
        &begin_formatting_body(&[(0, 9, 4, 4)]),
    );
    push_record(
        &mut stream,
        records::BEGIN_CF_RULE,
        &rule_body(
            record::RULE_TYPE_ICONSET,
            record::RULE_SUB_ICONSET,
            -1,
            1,
            0,
            0,
            &[],
        ),
    );
    let mut iconset_body = Vec::new();
    iconset_body.extend_from_slice(&2i32.to_le_bytes()); // 3Flags
    iconset_body.extend_from_slice(
        &(record::ICONSET_FLAG_CUSTOM | record::ICONSET_FLAG_SHOW_VALUE).to_le_bytes(),
    );
    push_record(&mut stream, records::BEGIN_ICONSET, &iconset_body);
    for value in [0.0, 33.0, 67.0] {
        push_record(
            &mut stream,
            records::CF_VALUE_OBJECT,
            &cfvo_body(record::CFVO_PERCENT, value),
        );
    }
    for (set_code, icon) in [(2i32, 0i32), (0, 1), (0, -1)] {
        let mut body = Vec::new();
        body.extend_from_slice(&set_code.to_le_bytes());
        body.extend_from_slice(&icon.to_le_bytes());
        push_record(&mut stream, records::CF_ICON, &body);
    }
    push_record(&mut stream, records::END_ICONSET, &[]);
    push_record(&mut stream, records::END_CF_RULE, &[]);
    push_record(&mut stream, records::END_COND_FORMATTING, &[]);

    let sink = import(&stream);
    let FormatEntry::IconSet(icons) = &sink.formats[0].entries[0] else {
        panic!("expected an icon set entry");
    };
    assert_eq!(icons.set, IconSetType::Flags3);
    assert!(icons.show_value);
    assert!(!icons.reverse);
    assert_eq!(icons.entries.len(), 3);
    assert_eq!(icons.entries[1].value, 33.0);
    assert_eq!(
        icons.custom,
        vec![
            (IconSetType::Flags3, 0),
            (IconSetType::Arrows3, 1),
            (IconSetType::Arrows3, -1),
        ]
    );
}

#[test]
fn theme_color_reference_is_remapped() {
    let mut stream = Vec::new();
    push_record(
        &mut stream,
        records::BEGIN_COND_FORMATTING,
        &begin_formatting_body(&[(0, 9, 5, 5)]),
    );
    push_record(
        &mut stream,
        records::BEGIN_CF_RULE,
        &rule_body(
            record::RULE_TYPE_COLORSCALE,
            record::RULE_SUB_COLORSCALE,
            -1,
            1,
            0,
            0,
            &[],
        ),
    );
    push_record(&mut stream, records::BEGIN_COLOR_SCALE, &[]);
    push_record(
        &mut stream,
        records::CF_VALUE_OBJECT,
        &cfvo_body(record::CFVO_MIN, 0.0),
    );
    push_record(
        &mut stream,
        records::CF_VALUE_OBJECT,
        &cfvo_body(record::CFVO_MAX, 0.0),
    );
    // Raw slot 1 resolves through internal slot 0 (white)
    push_record(&mut stream, records::CF_COLOR, &theme_color_body(1));
    push_record(&mut stream, records::CF_COLOR, &theme_color_body(4));
    push_record(&mut stream, records::END_COLOR_SCALE, &[]);
    push_record(&mut stream, records::END_CF_RULE, &[]);
    push_record(&mut stream, records::END_COND_FORMATTING, &[]);

    let sink = import(&stream);
    let FormatEntry::ColorScale(scale) = &sink.formats[0].entries[0] else {
        panic!("expected a color scale entry");
    };
    assert_eq!(scale.stops[0].color, Some(Rgb(0xFFFFFF)));
    assert_eq!(scale.stops[1].color, Some(Rgb(0x4F81BD)));
}

#[test]
fn rule_outside_formatting_block_registers_nothing() {
    let mut stream = Vec::new();
    push_record(
        &mut stream,
        records::BEGIN_CF_RULE,
        &rule_body(
            record::RULE_TYPE_CELLIS,
            record::RULE_SUB_CELLIS,
            -1,
            1,
            record::OP_EQUAL,
            0,
            &[b"\x1E\x01"],
        ),
    );
    push_record(&mut stream, records::END_CF_RULE, &[]);

    let sink = import(&stream);
    assert!(sink.formats.is_empty());
}

#[test]
fn unknown_records_are_skipped() {
    let mut stream = Vec::new();
    push_record(&mut stream, 0x0111, &[1, 2, 3]);
    push_record(
        &mut stream,
        records::BEGIN_COND_FORMATTING,
        &begin_formatting_body(&[(0, 0, 0, 0)]),
    );
    push_record(&mut stream, 0x0222, &[0xFF; 9]);
    push_record(
        &mut stream,
        records::BEGIN_CF_RULE,
        &rule_body(
            record::RULE_TYPE_EXPRESSION,
            record::RULE_SUB_DUPLICATE,
            0,
            1,
            0,
            0,
            &[],
        ),
    );
    push_record(&mut stream, records::END_CF_RULE, &[]);
    push_record(&mut stream, records::END_COND_FORMATTING, &[]);

    let sink = import(&stream);
    assert_eq!(sink.formats.len(), 1);
    let FormatEntry::Condition(cond) = &sink.formats[0].entries[0] else {
        panic!("expected a condition entry");
    };
    assert_eq!(cond.mode, CondMode::Duplicate);
    assert!(cond.tokens.is_empty());
}

#[test]
fn truncated_body_is_a_stream_error() {
    let mut stream = Vec::new();
    push_record(&mut stream, records::BEGIN_CF_RULE, &[1, 2, 3]);
    stream.truncate(stream.len() - 2);

    let mut buffer = CondFormatBuffer::new(0);
    assert!(read_conditional_formatting(&stream, &StockTheme, &mut buffer).is_err());
}
