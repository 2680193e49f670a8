//! Streaming reader for worksheet conditional-formatting fragments.
//!
//! The caller hands in an already-extracted piece of worksheet XML holding
//! `<conditionalFormatting>` blocks and, optionally, the
//! `<x14:conditionalFormattings>` extension list. This walker drives a
//! [`CondFormatBuffer`] from it; it performs no container or relationship
//! handling of its own.

use quick_xml::events::{BytesStart, Event};
use quick_xml::reader::Reader;

use condfmt_core::buffer::{CondFormatBuffer, FormatSlot};
use condfmt_core::entry::FormatEntry;
use condfmt_core::extension::{ext_cfvo, ExtFormat, ExtPatch, ExtTarget};
use condfmt_core::host::ThemePalette;
use condfmt_core::rule::CondRule;
use condfmt_core::visual::{
    ColorScaleBuilder, DataBarBuilder, IconSetBuilder, VisualBuilder,
};
use condfmt_core::{resolve_color, AttributeMap, AxisPosition, RangeList};

use crate::error::XlsxCfResult;

/// One extension rule while its events stream in. `target` is set when the
/// rule's id resolves to a primary rule; the rule then only emits patches.
/// Otherwise it accumulates a standalone visual encoding.
struct ExtRuleState {
    target: Option<ExtTarget>,
    priority: i32,
    builder: Option<VisualBuilder>,
    cfvo_count: usize,
    pending_cfvo: Option<(String, Option<String>)>,
}

/// One extension formatting block while its events stream in
#[derive(Default)]
struct ExtBlockState {
    sqref: String,
    entries: Vec<(FormatEntry, i32)>,
}

/// Walk a worksheet fragment and feed every conditional-formatting event
/// into `buffer`.
pub fn read_conditional_formatting(
    fragment: &str,
    theme: &dyn ThemePalette,
    buffer: &mut CondFormatBuffer,
) -> XlsxCfResult<()> {
    let mut reader = Reader::from_str(fragment);
    reader.trim_text(true);

    let mut buf = Vec::new();

    // Primary path state
    let mut current_slot: Option<FormatSlot> = None;
    let mut current_rule: Option<CondRule> = None;
    let mut in_formula = false;
    let mut formula_text = String::new();
    let mut in_ext_id = false;
    let mut ext_id_text = String::new();
    let mut pending_ext_ids: Vec<String> = Vec::new();

    // Extension path state
    let mut ext_block: Option<ExtBlockState> = None;
    let mut ext_rule: Option<ExtRuleState> = None;
    let mut in_xm_sqref = false;
    let mut in_xm_f = false;

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) => match e.name().as_ref() {
                b"conditionalFormatting" => {
                    current_slot = Some(buffer.import_cond_formatting(&attr_map(&e)));
                }
                b"cfRule" if current_slot.is_some() => {
                    current_rule = Some(CondRule::from_attrs(&attr_map(&e)));
                    pending_ext_ids.clear();
                }
                b"formula" if current_rule.is_some() => {
                    in_formula = true;
                    formula_text.clear();
                }
                b"colorScale" => {
                    if let Some(rule) = current_rule.as_mut() {
                        rule.import_color_scale();
                    }
                }
                b"dataBar" => {
                    if let Some(rule) = current_rule.as_mut() {
                        rule.import_data_bar(&attr_map(&e));
                    }
                }
                b"iconSet" => {
                    if let Some(rule) = current_rule.as_mut() {
                        rule.import_icon_set(&attr_map(&e));
                    }
                }
                b"cfvo" => {
                    if let Some(rule) = current_rule.as_mut() {
                        rule.import_cfvo(&attr_map(&e));
                    }
                }
                b"color" => {
                    if let Some(rule) = current_rule.as_mut() {
                        rule.import_color(&attr_map(&e), theme);
                    }
                }
                b"x14:id" if current_rule.is_some() => {
                    in_ext_id = true;
                    ext_id_text.clear();
                }
                b"x14:conditionalFormatting" => {
                    ext_block = Some(ExtBlockState::default());
                }
                b"x14:cfRule" if ext_block.is_some() => {
                    ext_rule = Some(begin_ext_rule(&attr_map(&e), buffer));
                }
                b"x14:dataBar" => {
                    if let Some(state) = ext_rule.as_mut() {
                        begin_ext_data_bar(state, &attr_map(&e), buffer);
                    }
                }
                b"x14:colorScale" => {
                    if let Some(state) = ext_rule.as_mut() {
                        if state.target.is_none() && state.builder.is_none() {
                            state.builder =
                                Some(VisualBuilder::ColorScale(ColorScaleBuilder::new()));
                        }
                    }
                }
                b"x14:iconSet" => {
                    if let Some(state) = ext_rule.as_mut() {
                        if state.target.is_none() {
                            let mut builder = IconSetBuilder::new();
                            builder.import_attribs(&attr_map(&e));
                            state.builder = Some(VisualBuilder::IconSet(builder));
                        }
                    }
                }
                b"x14:cfvo" => {
                    if let Some(state) = ext_rule.as_mut() {
                        let attrs = attr_map(&e);
                        state.pending_cfvo =
                            Some((attrs.get("type").unwrap_or("").to_string(), None));
                    }
                }
                b"xm:f" if ext_rule.is_some() => {
                    in_xm_f = true;
                }
                b"xm:sqref" if ext_block.is_some() => {
                    in_xm_sqref = true;
                }
                _ => {}
            },
            Event::Empty(e) => match e.name().as_ref() {
                b"conditionalFormatting" => {
                    buffer.import_cond_formatting(&attr_map(&e));
                }
                b"cfvo" => {
                    if let Some(rule) = current_rule.as_mut() {
                        rule.import_cfvo(&attr_map(&e));
                    }
                }
                b"color" => {
                    if let Some(rule) = current_rule.as_mut() {
                        rule.import_color(&attr_map(&e), theme);
                    }
                }
                b"iconSet" => {
                    if let Some(rule) = current_rule.as_mut() {
                        rule.import_icon_set(&attr_map(&e));
                    }
                }
                b"x14:cfvo" => {
                    if let Some(state) = ext_rule.as_mut() {
                        let attrs = attr_map(&e);
                        let ty = attrs.get("type").unwrap_or("").to_string();
                        finish_ext_cfvo(state, ty, None, buffer);
                    }
                }
                b"x14:cfIcon" => {
                    if let Some(VisualBuilder::IconSet(builder)) =
                        ext_rule.as_mut().and_then(|s| s.builder.as_mut())
                    {
                        builder.import_icon(&attr_map(&e));
                    }
                }
                b"x14:fillColor" => {
                    ext_color(ext_rule.as_mut(), &e, theme, buffer, ColorSlot::Positive);
                }
                b"x14:negativeFillColor" => {
                    ext_color(ext_rule.as_mut(), &e, theme, buffer, ColorSlot::Negative);
                }
                b"x14:axisColor" => {
                    ext_color(ext_rule.as_mut(), &e, theme, buffer, ColorSlot::Axis);
                }
                b"x14:color" => {
                    if let Some(VisualBuilder::ColorScale(builder)) =
                        ext_rule.as_mut().and_then(|s| s.builder.as_mut())
                    {
                        builder.import_color(&attr_map(&e), theme);
                    }
                }
                _ => {}
            },
            Event::Text(e) => {
                if let Ok(text) = e.unescape() {
                    if in_formula {
                        formula_text.push_str(&text);
                    } else if in_ext_id {
                        ext_id_text.push_str(&text);
                    } else if in_xm_f {
                        if let Some((_, value)) =
                            ext_rule.as_mut().and_then(|s| s.pending_cfvo.as_mut())
                        {
                            *value = Some(text.to_string());
                        }
                    } else if in_xm_sqref {
                        if let Some(block) = ext_block.as_mut() {
                            if !block.sqref.is_empty() {
                                block.sqref.push(' ');
                            }
                            block.sqref.push_str(&text);
                        }
                    }
                }
            }
            Event::End(e) => match e.name().as_ref() {
                b"conditionalFormatting" => {
                    current_slot = None;
                }
                b"cfRule" => {
                    if let Some(rule) = current_rule.take() {
                        let priority = rule.priority;
                        match current_slot {
                            Some(slot) => {
                                buffer.append_rule(slot, rule);
                                for id in pending_ext_ids.drain(..) {
                                    buffer.register_ext_id(&id, slot, priority);
                                }
                            }
                            None => buffer.append_standalone_rule(rule),
                        }
                    }
                }
                b"formula" => {
                    if in_formula {
                        if let Some(rule) = current_rule.as_mut() {
                            rule.append_formula(&formula_text);
                        }
                        in_formula = false;
                    }
                }
                b"x14:id" => {
                    if in_ext_id {
                        let id = ext_id_text.trim().to_string();
                        if !id.is_empty() {
                            pending_ext_ids.push(id);
                        }
                        in_ext_id = false;
                    }
                }
                b"x14:cfvo" => {
                    if let Some(state) = ext_rule.as_mut() {
                        if let Some((ty, value)) = state.pending_cfvo.take() {
                            finish_ext_cfvo(state, ty, value, buffer);
                        }
                    }
                }
                b"xm:f" => {
                    in_xm_f = false;
                }
                b"xm:sqref" => {
                    in_xm_sqref = false;
                }
                b"x14:cfRule" => {
                    if let Some(state) = ext_rule.take() {
                        if state.target.is_none() {
                            if let Some(builder) = state.builder {
                                let entry = match builder {
                                    VisualBuilder::ColorScale(b) => {
                                        FormatEntry::ColorScale(b.finish())
                                    }
                                    VisualBuilder::DataBar(b) => FormatEntry::DataBar(b.finish()),
                                    VisualBuilder::IconSet(b) => FormatEntry::IconSet(b.finish()),
                                };
                                if let Some(block) = ext_block.as_mut() {
                                    block.entries.push((entry, state.priority));
                                }
                            } else {
                                log::warn!("extension rule carries no visual encoding, skipping");
                            }
                        }
                    }
                }
                b"x14:conditionalFormatting" => {
                    if let Some(block) = ext_block.take() {
                        if !block.entries.is_empty() {
                            let mut ext = ExtFormat::new();
                            ext.ranges = RangeList::parse_sqref(&block.sqref);
                            ext.entries = block.entries;
                            buffer.push_ext_format(ext);
                        }
                    }
                }
                _ => {}
            },
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    Ok(())
}

/// Which data bar color a color element addresses
enum ColorSlot {
    Positive,
    Negative,
    Axis,
}

fn attr_map(e: &BytesStart) -> AttributeMap {
    let mut attrs = AttributeMap::new();
    for attr in e.attributes().flatten() {
        if let Ok(value) = attr.unescape_value() {
            attrs.push(
                String::from_utf8_lossy(attr.key.as_ref()).to_string(),
                value.to_string(),
            );
        }
    }
    attrs
}

fn begin_ext_rule(attrs: &AttributeMap, buffer: &CondFormatBuffer) -> ExtRuleState {
    let target = attrs.get("id").and_then(|id| buffer.ext_target(id));
    ExtRuleState {
        target,
        priority: attrs.get_i32("priority").unwrap_or(-1),
        builder: None,
        cfvo_count: 0,
        pending_cfvo: None,
    }
}

fn begin_ext_data_bar(
    state: &mut ExtRuleState,
    attrs: &AttributeMap,
    buffer: &mut CondFormatBuffer,
) {
    let axis_position = attrs
        .get("axisPosition")
        .and_then(AxisPosition::from_name)
        .unwrap_or_default();
    let gradient = attrs.get_bool("gradient").unwrap_or(true);

    match state.target {
        Some(target) => {
            buffer.push_ext_patch(
                target,
                ExtPatch::DataBarAttribs {
                    axis_position,
                    gradient,
                },
            );
        }
        None => {
            let mut builder = DataBarBuilder::new();
            builder.import_attribs(attrs);
            builder.set_axis_position(axis_position);
            builder.set_gradient(gradient);
            state.builder = Some(VisualBuilder::DataBar(builder));
        }
    }
}

fn finish_ext_cfvo(
    state: &mut ExtRuleState,
    ty: String,
    value: Option<String>,
    buffer: &mut CondFormatBuffer,
) {
    let stop = state.cfvo_count;
    state.cfvo_count += 1;

    match state.target {
        Some(target) => match ext_cfvo(&ty, value.as_deref()) {
            Some(refine) => buffer.push_ext_patch(target, ExtPatch::CfvoRefine { stop, refine }),
            None => log::warn!("unknown extension threshold type '{ty}', skipping"),
        },
        None => {
            let Some(builder) = state.builder.as_mut() else {
                return;
            };
            let mut attrs = AttributeMap::new();
            attrs.push("type", ty.clone());
            if let Some(value) = &value {
                attrs.push("val", value.clone());
            }
            builder.import_cfvo(&attrs);

            // The auto kinds have no primary-path spelling; rewrite the stop
            // the same way a patch would.
            if let Some(refine) = ext_cfvo(&ty, value.as_deref()) {
                match builder {
                    VisualBuilder::ColorScale(b) => b.refine_cfvo(stop, refine),
                    VisualBuilder::DataBar(b) => b.refine_cfvo(stop, refine),
                    VisualBuilder::IconSet(_) => {}
                }
            }
        }
    }
}

fn ext_color(
    state: Option<&mut ExtRuleState>,
    e: &BytesStart,
    theme: &dyn ThemePalette,
    buffer: &mut CondFormatBuffer,
    slot: ColorSlot,
) {
    let Some(state) = state else {
        return;
    };
    let color = resolve_color(&attr_map(e), theme);

    match state.target {
        Some(target) => {
            let patch = match slot {
                ColorSlot::Positive => ExtPatch::PositiveFill(color),
                ColorSlot::Negative => ExtPatch::NegativeFill(color),
                ColorSlot::Axis => ExtPatch::AxisColor(color),
            };
            buffer.push_ext_patch(target, patch);
        }
        None => {
            if let Some(VisualBuilder::DataBar(builder)) = state.builder.as_mut() {
                match slot {
                    ColorSlot::Positive => builder.set_positive_color(color),
                    ColorSlot::Negative => builder.set_negative_color(color),
                    ColorSlot::Axis => builder.set_axis_color(color),
                }
            }
        }
    }
}
