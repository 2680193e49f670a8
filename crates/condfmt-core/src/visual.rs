//! Builders for the three visual rule encodings.
//!
//! Builders accumulate threshold and color events in document order and
//! convert to the host representation when the owning rule finalizes. They
//! are deliberately tolerant: events may arrive unpaired or out of balance in
//! malformed input, and the builders grow or overwrite slots instead of
//! rejecting anything.

use crate::attrs::AttributeMap;
use crate::color::{resolve_color, ColorRef, Rgb};
use crate::entry::{
    AxisPosition, ColorScaleData, DataBarData, EntryKind, IconSetData, IconSetType, ScaleEntry,
};
use crate::error::Result;
use crate::host::ThemePalette;
use crate::record;
use crate::threshold::{parse_plain_double, RuleThreshold};

/// A threshold refinement delivered through an extension block
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExtCfvo {
    /// Replacement interpretation for the target entry
    pub kind: EntryKind,
    /// Replacement numeric payload, when the block carried a parseable one
    pub value: Option<f64>,
}

fn apply_override(entry: &mut ScaleEntry, ext: &ExtCfvo) {
    entry.kind = ext.kind;
    if let Some(value) = ext.value {
        entry.value = value;
    }
}

/// Accumulates color scale stops.
///
/// Threshold and color events are written through two independent indices
/// over one shared stop sequence. Well-formed input interleaves them 1:1,
/// but nothing guarantees that; a surplus of either kind leaves stops with a
/// missing counterpart, which the conversion treats as unset.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ColorScaleBuilder {
    stops: Vec<(RuleThreshold, Option<Rgb>)>,
    cfvo_index: usize,
    color_index: usize,
    overrides: Vec<(usize, ExtCfvo)>,
}

impl ColorScaleBuilder {
    /// Create an empty builder
    pub fn new() -> Self {
        Self::default()
    }

    /// Import one threshold event
    pub fn import_cfvo(&mut self, attrs: &AttributeMap) {
        self.set_cfvo(RuleThreshold::from_attrs(attrs));
    }

    /// Import one threshold event from a binary record body
    pub fn import_cfvo_record(&mut self, data: &[u8]) -> Result<()> {
        self.set_cfvo(RuleThreshold::from_record(data)?);
        Ok(())
    }

    fn set_cfvo(&mut self, threshold: RuleThreshold) {
        if self.cfvo_index >= self.stops.len() {
            self.stops.push(Default::default());
        }
        self.stops[self.cfvo_index].0 = threshold;
        self.cfvo_index += 1;
    }

    /// Import one color event
    pub fn import_color(&mut self, attrs: &AttributeMap, theme: &dyn ThemePalette) {
        self.set_color(resolve_color(attrs, theme));
    }

    /// Import one color event from a binary record body
    pub fn import_color_record(&mut self, data: &[u8], theme: &dyn ThemePalette) -> Result<()> {
        self.set_color(ColorRef::from_record(data)?.resolve(theme));
        Ok(())
    }

    fn set_color(&mut self, color: Rgb) {
        if self.color_index >= self.stops.len() {
            self.stops.push(Default::default());
        }
        self.stops[self.color_index].1 = Some(color);
        self.color_index += 1;
    }

    /// Record an extension refinement for the stop at `slot`
    pub fn refine_cfvo(&mut self, slot: usize, ext: ExtCfvo) {
        self.overrides.push((slot, ext));
    }

    /// Number of stops accumulated so far
    pub fn len(&self) -> usize {
        self.stops.len()
    }

    /// Whether no stops have been accumulated
    pub fn is_empty(&self) -> bool {
        self.stops.is_empty()
    }

    /// Convert to the host representation
    pub fn finish(&self) -> ColorScaleData {
        let mut stops: Vec<ScaleEntry> = self
            .stops
            .iter()
            .map(|(threshold, color)| threshold.to_scale_entry(*color))
            .collect();

        for (slot, ext) in &self.overrides {
            if let Some(entry) = stops.get_mut(*slot) {
                apply_override(entry, ext);
            } else {
                log::warn!("color scale refinement targets missing stop {slot}");
            }
        }

        ColorScaleData { stops }
    }
}

/// Accumulates data bar settings.
///
/// The source distinguishes the two limits only by event order: the first
/// threshold event populates the lower limit, every later one overwrites the
/// upper limit.
#[derive(Debug, Clone, PartialEq)]
pub struct DataBarBuilder {
    lower: RuleThreshold,
    upper: RuleThreshold,
    cfvo_count: usize,
    positive_color: Rgb,
    negative_color: Option<Rgb>,
    axis_color: Option<Rgb>,
    axis_position: AxisPosition,
    gradient: bool,
    min_length: u32,
    max_length: u32,
    only_bar: bool,
    lower_override: Option<ExtCfvo>,
    upper_override: Option<ExtCfvo>,
}

impl Default for DataBarBuilder {
    fn default() -> Self {
        Self {
            lower: RuleThreshold::default(),
            upper: RuleThreshold::default(),
            cfvo_count: 0,
            positive_color: Rgb::ZERO,
            negative_color: None,
            axis_color: None,
            axis_position: AxisPosition::Automatic,
            gradient: true,
            min_length: 10,
            max_length: 90,
            only_bar: false,
            lower_override: None,
            upper_override: None,
        }
    }
}

impl DataBarBuilder {
    /// Create a builder with default lengths (10/90) and gradient fill
    pub fn new() -> Self {
        Self::default()
    }

    /// Import the data bar attributes (`showValue`, `minLength`, `maxLength`)
    pub fn import_attribs(&mut self, attrs: &AttributeMap) {
        self.only_bar = !attrs.get_bool("showValue").unwrap_or(true);
        self.min_length = attrs.get_u32("minLength").unwrap_or(10);
        self.max_length = attrs.get_u32("maxLength").unwrap_or(90);
    }

    /// Import the data bar attributes from a binary record body: `u8`
    /// min length, `u8` max length, `u8` flags.
    pub fn import_attribs_record(&mut self, data: &[u8]) -> Result<()> {
        let mut offset = 0usize;
        let min_length = record::read_u8(data, &mut offset)?;
        let max_length = record::read_u8(data, &mut offset)?;
        let flags = record::read_u8(data, &mut offset)?;

        self.min_length = min_length as u32;
        self.max_length = max_length as u32;
        self.gradient = flags & record::DATABAR_FLAG_GRADIENT != 0;
        self.only_bar = flags & record::DATABAR_FLAG_SHOW_VALUE == 0;
        Ok(())
    }

    /// Import one threshold event; first call sets the lower limit, later
    /// calls the upper limit
    pub fn import_cfvo(&mut self, attrs: &AttributeMap) {
        self.set_cfvo(RuleThreshold::from_attrs(attrs));
    }

    /// Import one threshold event from a binary record body
    pub fn import_cfvo_record(&mut self, data: &[u8]) -> Result<()> {
        self.set_cfvo(RuleThreshold::from_record(data)?);
        Ok(())
    }

    fn set_cfvo(&mut self, threshold: RuleThreshold) {
        if self.cfvo_count == 0 {
            self.lower = threshold;
        } else {
            self.upper = threshold;
        }
        self.cfvo_count += 1;
    }

    /// Import the fill color. This always writes the positive fill; the
    /// negative fill and axis color arrive only through extension blocks.
    /// Last write wins.
    pub fn import_color(&mut self, attrs: &AttributeMap, theme: &dyn ThemePalette) {
        self.positive_color = resolve_color(attrs, theme);
    }

    /// Import the fill color from a binary record body
    pub fn import_color_record(&mut self, data: &[u8], theme: &dyn ThemePalette) -> Result<()> {
        self.positive_color = ColorRef::from_record(data)?.resolve(theme);
        Ok(())
    }

    /// Set the axis placement (extension data)
    pub fn set_axis_position(&mut self, position: AxisPosition) {
        self.axis_position = position;
    }

    /// Set the gradient flag (extension data)
    pub fn set_gradient(&mut self, gradient: bool) {
        self.gradient = gradient;
    }

    /// Set the axis color (extension data)
    pub fn set_axis_color(&mut self, color: Rgb) {
        self.axis_color = Some(color);
    }

    /// Overwrite the positive fill color (extension data, last write wins)
    pub fn set_positive_color(&mut self, color: Rgb) {
        self.positive_color = color;
    }

    /// Set the negative fill color (extension data)
    pub fn set_negative_color(&mut self, color: Rgb) {
        self.negative_color = Some(color);
    }

    /// Record an extension refinement for one limit; slot 0 is the lower
    /// limit, slot 1 the upper
    pub fn refine_cfvo(&mut self, slot: usize, ext: ExtCfvo) {
        match slot {
            0 => self.lower_override = Some(ext),
            1 => self.upper_override = Some(ext),
            other => log::warn!("data bar refinement targets missing limit {other}"),
        }
    }

    /// Convert to the host representation
    pub fn finish(&self) -> DataBarData {
        let mut lower = self.lower.to_scale_entry(None);
        let mut upper = self.upper.to_scale_entry(None);
        if let Some(ext) = &self.lower_override {
            apply_override(&mut lower, ext);
        }
        if let Some(ext) = &self.upper_override {
            apply_override(&mut upper, ext);
        }

        DataBarData {
            lower,
            upper,
            positive_color: self.positive_color,
            negative_color: self.negative_color,
            axis_color: self.axis_color,
            axis_position: self.axis_position,
            gradient: self.gradient,
            min_length: self.min_length,
            max_length: self.max_length,
            only_bar: self.only_bar,
        }
    }
}

/// Accumulates icon set settings. Threshold events append, unlike the
/// index-addressed writes of the color scale.
#[derive(Debug, Clone, PartialEq)]
pub struct IconSetBuilder {
    entries: Vec<RuleThreshold>,
    set: IconSetType,
    reverse: bool,
    show_value: bool,
    custom: bool,
    custom_icons: Vec<(IconSetType, i32)>,
}

impl Default for IconSetBuilder {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
            set: IconSetType::default(),
            reverse: false,
            show_value: true,
            custom: false,
            custom_icons: Vec::new(),
        }
    }
}

impl IconSetBuilder {
    /// Create a builder with the wire default icon set
    pub fn new() -> Self {
        Self::default()
    }

    /// Import the icon set attributes (`iconSet`, `reverse`, `showValue`,
    /// `custom`). An unrecognized set name falls back to the default set.
    pub fn import_attribs(&mut self, attrs: &AttributeMap) {
        if let Some(name) = attrs.get("iconSet") {
            self.set = IconSetType::from_name(name).unwrap_or_default();
        }
        self.reverse = attrs.get_bool("reverse").unwrap_or(false);
        self.show_value = attrs.get_bool("showValue").unwrap_or(true);
        self.custom = attrs.get_bool("custom").unwrap_or(false);
    }

    /// Import the icon set attributes from a binary record body: `i32` set
    /// code, `u16` flags.
    pub fn import_attribs_record(&mut self, data: &[u8]) -> Result<()> {
        let mut offset = 0usize;
        let code = record::read_i32(data, &mut offset)?;
        let flags = record::read_u16(data, &mut offset)?;

        self.set = IconSetType::from_code(code).unwrap_or_default();
        self.custom = flags & record::ICONSET_FLAG_CUSTOM != 0;
        self.reverse = flags & record::ICONSET_FLAG_REVERSE != 0;
        self.show_value = flags & record::ICONSET_FLAG_SHOW_VALUE != 0;
        Ok(())
    }

    /// Append one threshold event
    pub fn import_cfvo(&mut self, attrs: &AttributeMap) {
        self.entries.push(RuleThreshold::from_attrs(attrs));
    }

    /// Append one threshold event from a binary record body
    pub fn import_cfvo_record(&mut self, data: &[u8]) -> Result<()> {
        self.entries.push(RuleThreshold::from_record(data)?);
        Ok(())
    }

    /// Refine the most recently appended threshold with a formula text. A
    /// plain number overwrites the numeric payload of a numeric-kinded
    /// threshold; any other non-empty text becomes its formula.
    pub fn import_formula(&mut self, text: &str) {
        let Some(last) = self.entries.last_mut() else {
            return;
        };

        let numeric_kind = last.num || last.percent || last.percentile;
        match parse_plain_double(text) {
            Some(number) if numeric_kind => last.value = number,
            _ => {
                if !text.is_empty() {
                    last.formula = text.to_string();
                }
            }
        }
    }

    /// Append one custom icon (`iconSet` name, `iconId`). The "NoIcons" set
    /// forces the index to -1 regardless of the attribute value.
    pub fn import_icon(&mut self, attrs: &AttributeMap) {
        let name = attrs.get("iconSet").unwrap_or("");
        let set = IconSetType::from_name(name).unwrap_or_default();
        let index = if name == "NoIcons" {
            -1
        } else {
            attrs.get_i32("iconId").unwrap_or(-1)
        };
        self.custom_icons.push((set, index));
    }

    /// Append one custom icon from a binary record body: `i32` set code,
    /// `i32` icon index.
    pub fn import_icon_record(&mut self, data: &[u8]) -> Result<()> {
        let mut offset = 0usize;
        let code = record::read_i32(data, &mut offset)?;
        let index = record::read_i32(data, &mut offset)?;

        let set = IconSetType::from_code(code).unwrap_or_default();
        self.custom_icons.push((set, index));
        Ok(())
    }

    /// Convert to the host representation
    pub fn finish(&self) -> IconSetData {
        IconSetData {
            set: self.set,
            entries: self
                .entries
                .iter()
                .map(|threshold| threshold.to_scale_entry(None))
                .collect(),
            reverse: self.reverse,
            show_value: self.show_value,
            custom: if self.custom {
                self.custom_icons.clone()
            } else {
                Vec::new()
            },
        }
    }
}

/// The visual encoding owned by a rule, at most one per rule
#[derive(Debug, Clone, PartialEq)]
pub enum VisualBuilder {
    /// Color scale accumulation
    ColorScale(ColorScaleBuilder),
    /// Data bar accumulation
    DataBar(DataBarBuilder),
    /// Icon set accumulation
    IconSet(IconSetBuilder),
}

impl VisualBuilder {
    /// Route a threshold event to the owned builder
    pub fn import_cfvo(&mut self, attrs: &AttributeMap) {
        match self {
            VisualBuilder::ColorScale(builder) => builder.import_cfvo(attrs),
            VisualBuilder::DataBar(builder) => builder.import_cfvo(attrs),
            VisualBuilder::IconSet(builder) => builder.import_cfvo(attrs),
        }
    }

    /// Route a binary threshold event to the owned builder
    pub fn import_cfvo_record(&mut self, data: &[u8]) -> Result<()> {
        match self {
            VisualBuilder::ColorScale(builder) => builder.import_cfvo_record(data),
            VisualBuilder::DataBar(builder) => builder.import_cfvo_record(data),
            VisualBuilder::IconSet(builder) => builder.import_cfvo_record(data),
        }
    }

    /// Route a color event to the owned builder; icon sets carry no colors
    pub fn import_color(&mut self, attrs: &AttributeMap, theme: &dyn ThemePalette) {
        match self {
            VisualBuilder::ColorScale(builder) => builder.import_color(attrs, theme),
            VisualBuilder::DataBar(builder) => builder.import_color(attrs, theme),
            VisualBuilder::IconSet(_) => {}
        }
    }

    /// Route a binary color event to the owned builder
    pub fn import_color_record(&mut self, data: &[u8], theme: &dyn ThemePalette) -> Result<()> {
        match self {
            VisualBuilder::ColorScale(builder) => builder.import_color_record(data, theme),
            VisualBuilder::DataBar(builder) => builder.import_color_record(data, theme),
            VisualBuilder::IconSet(_) => Ok(()),
        }
    }

    /// Route a formula event; only icon sets consume them
    pub fn import_formula(&mut self, text: &str) {
        if let VisualBuilder::IconSet(builder) = self {
            builder.import_formula(text);
        }
    }
}
