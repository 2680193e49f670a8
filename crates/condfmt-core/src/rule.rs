//! The rule model: one imported conditional-formatting rule.
//!
//! A [`CondRule`] collects everything a rule block carries on either wire
//! encoding. It stays in this form until the owning container finalizes, at
//! which point [`CondRule::into_entry`] converts it into the host-native
//! [`FormatEntry`] exactly once. Malformed rules never fail the import; they
//! degrade to "no entry" with a warning.

use crate::attrs::AttributeMap;
use crate::cell::CellAddress;
use crate::entry::{CondMode, ConditionEntry, DateEntry, FormatEntry, TimePeriod};
use crate::error::Result;
use crate::host::{FormulaTokenizer, StyleResolver, ThemePalette, TokenSequence};
use crate::record;
use crate::visual::{ColorScaleBuilder, DataBarBuilder, IconSetBuilder, VisualBuilder};

/// Anchor placeholder substituted into compatibility formulas
const ANCHOR_PLACEHOLDER: &str = "#B";

/// Comparison operator of a cell-value rule
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CfOperator {
    /// Value is between formula1 and formula2
    Between,
    /// Value is NOT between formula1 and formula2
    NotBetween,
    /// Value equals formula1
    Equal,
    /// Value does NOT equal formula1
    NotEqual,
    /// Value is greater than formula1
    GreaterThan,
    /// Value is less than formula1
    LessThan,
    /// Value is greater than or equal to formula1
    GreaterThanOrEqual,
    /// Value is less than or equal to formula1
    LessThanOrEqual,
}

impl CfOperator {
    /// Parse from the attribute encoding's operator string
    pub fn from_name(s: &str) -> Option<Self> {
        match s {
            "between" => Some(CfOperator::Between),
            "notBetween" => Some(CfOperator::NotBetween),
            "equal" => Some(CfOperator::Equal),
            "notEqual" => Some(CfOperator::NotEqual),
            "greaterThan" => Some(CfOperator::GreaterThan),
            "lessThan" => Some(CfOperator::LessThan),
            "greaterThanOrEqual" => Some(CfOperator::GreaterThanOrEqual),
            "lessThanOrEqual" => Some(CfOperator::LessThanOrEqual),
            _ => None,
        }
    }

    /// The attribute encoding's operator string
    pub fn name(&self) -> &'static str {
        match self {
            CfOperator::Between => "between",
            CfOperator::NotBetween => "notBetween",
            CfOperator::Equal => "equal",
            CfOperator::NotEqual => "notEqual",
            CfOperator::GreaterThan => "greaterThan",
            CfOperator::LessThan => "lessThan",
            CfOperator::GreaterThanOrEqual => "greaterThanOrEqual",
            CfOperator::LessThanOrEqual => "lessThanOrEqual",
        }
    }

    /// Decode the binary operator code
    pub fn from_code(code: i32) -> Option<Self> {
        match code {
            record::OP_BETWEEN => Some(CfOperator::Between),
            record::OP_NOT_BETWEEN => Some(CfOperator::NotBetween),
            record::OP_EQUAL => Some(CfOperator::Equal),
            record::OP_NOT_EQUAL => Some(CfOperator::NotEqual),
            record::OP_GREATER => Some(CfOperator::GreaterThan),
            record::OP_LESS => Some(CfOperator::LessThan),
            record::OP_GREATER_EQUAL => Some(CfOperator::GreaterThanOrEqual),
            record::OP_LESS_EQUAL => Some(CfOperator::LessThanOrEqual),
            _ => None,
        }
    }

    /// The comparison mode this operator maps to
    pub fn mode(&self) -> CondMode {
        match self {
            CfOperator::Between => CondMode::Between,
            CfOperator::NotBetween => CondMode::NotBetween,
            CfOperator::Equal => CondMode::Equal,
            CfOperator::NotEqual => CondMode::NotEqual,
            CfOperator::GreaterThan => CondMode::Greater,
            CfOperator::LessThan => CondMode::Less,
            CfOperator::GreaterThanOrEqual => CondMode::GreaterEqual,
            CfOperator::LessThanOrEqual => CondMode::LessEqual,
        }
    }
}

/// Rule kind as declared on the wire
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RuleKind {
    /// Cell value comparison
    CellIs,
    /// Formula evaluates to TRUE
    Expression,
    /// Color scale
    ColorScale,
    /// Data bar
    DataBar,
    /// Icon set
    IconSet,
    /// Top/bottom N values
    Top10,
    /// Above/below average
    AboveAverage,
    /// Contains text
    ContainsText,
    /// Does not contain text
    NotContainsText,
    /// Begins with text
    BeginsWith,
    /// Ends with text
    EndsWith,
    /// Duplicate values
    DuplicateValues,
    /// Unique values
    UniqueValues,
    /// Blank cells
    ContainsBlanks,
    /// Non-blank cells
    NotContainsBlanks,
    /// Cells containing errors
    ContainsErrors,
    /// Cells not containing errors
    NotContainsErrors,
    /// Time period (today, last week, etc.)
    TimePeriod,
}

impl RuleKind {
    /// Parse from the attribute encoding's type string
    pub fn from_name(s: &str) -> Option<Self> {
        match s {
            "cellIs" => Some(RuleKind::CellIs),
            "expression" => Some(RuleKind::Expression),
            "colorScale" => Some(RuleKind::ColorScale),
            "dataBar" => Some(RuleKind::DataBar),
            "iconSet" => Some(RuleKind::IconSet),
            "top10" => Some(RuleKind::Top10),
            "aboveAverage" => Some(RuleKind::AboveAverage),
            "containsText" => Some(RuleKind::ContainsText),
            "notContainsText" => Some(RuleKind::NotContainsText),
            "beginsWith" => Some(RuleKind::BeginsWith),
            "endsWith" => Some(RuleKind::EndsWith),
            "duplicateValues" => Some(RuleKind::DuplicateValues),
            "uniqueValues" => Some(RuleKind::UniqueValues),
            "containsBlanks" => Some(RuleKind::ContainsBlanks),
            "notContainsBlanks" => Some(RuleKind::NotContainsBlanks),
            "containsErrors" => Some(RuleKind::ContainsErrors),
            "notContainsErrors" => Some(RuleKind::NotContainsErrors),
            "timePeriod" => Some(RuleKind::TimePeriod),
            _ => None,
        }
    }
}

/// A formula captured from the source, untouched until finalize
#[derive(Debug, Clone, PartialEq, Hash)]
pub enum RawFormula {
    /// Formula text from the attribute encoding
    Text(String),
    /// Raw token bytes from the binary encoding
    Binary(Vec<u8>),
}

/// One imported rule
#[derive(Debug, Clone, PartialEq)]
pub struct CondRule {
    /// Declared rule kind; `None` when the type was missing or unknown
    pub kind: Option<RuleKind>,
    /// Comparison operator (cell-value rules)
    pub operator: Option<CfOperator>,
    /// Match text (text rules)
    pub text: String,
    /// Rank (top-N rules)
    pub rank: u32,
    /// Bottom instead of top (top-N rules)
    pub bottom: bool,
    /// Rank is a percentage (top-N rules)
    pub percent: bool,
    /// Above instead of below (average rules)
    pub above_average: bool,
    /// Include values equal to the average (average rules)
    pub equal_average: bool,
    /// Standard deviation count (average rules)
    pub std_dev: Option<i32>,
    /// Day window (time-period rules); `None` when unknown
    pub time_period: Option<TimePeriod>,
    /// Priority; -1 until assigned
    pub priority: i32,
    /// Stop evaluating lower-priority rules on match
    pub stop_if_true: bool,
    /// Differential style reference
    pub dxf_id: Option<u32>,
    /// Raw formulas in document order (at most three)
    pub formulas: Vec<RawFormula>,
    visual: Option<VisualBuilder>,
    prebuilt: Option<FormatEntry>,
}

impl Default for CondRule {
    fn default() -> Self {
        Self {
            kind: None,
            operator: None,
            text: String::new(),
            rank: 10,
            bottom: false,
            percent: false,
            above_average: true,
            equal_average: false,
            std_dev: None,
            time_period: None,
            priority: -1,
            stop_if_true: false,
            dxf_id: None,
            formulas: Vec::new(),
            visual: None,
            prebuilt: None,
        }
    }
}

impl CondRule {
    /// Create an empty rule with an unassigned priority
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap an already-built host entry (extension path). Such a rule skips
    /// conversion entirely on finalize.
    pub fn from_entry(entry: FormatEntry, priority: i32) -> Self {
        Self {
            priority,
            prebuilt: Some(entry),
            ..Self::default()
        }
    }

    /// Parse the rule header attributes of the attribute encoding
    pub fn from_attrs(attrs: &AttributeMap) -> Self {
        let mut rule = CondRule::new();

        rule.kind = attrs.get("type").and_then(RuleKind::from_name);
        rule.operator = attrs.get("operator").and_then(CfOperator::from_name);
        if let Some(priority) = attrs.get_i32("priority") {
            rule.priority = priority;
        }
        rule.stop_if_true = attrs.get_bool("stopIfTrue").unwrap_or(false);
        rule.dxf_id = attrs.get_u32("dxfId");
        if let Some(text) = attrs.get("text") {
            rule.text = text.to_string();
        }
        if let Some(rank) = attrs.get_u32("rank") {
            rule.rank = rank;
        }
        rule.percent = attrs.get_bool("percent").unwrap_or(false);
        rule.bottom = attrs.get_bool("bottom").unwrap_or(false);
        rule.above_average = attrs.get_bool("aboveAverage").unwrap_or(true);
        rule.equal_average = attrs.get_bool("equalAverage").unwrap_or(false);
        rule.std_dev = attrs.get_i32("stdDev");
        rule.time_period = attrs.get("timePeriod").and_then(TimePeriod::from_name);

        rule
    }

    /// Decode a rule header record of the binary encoding.
    ///
    /// Layout: type (`i32`), subtype (`i32`), style ref (`i32`, -1 = none),
    /// priority (`i32`), param (`i32`), 8 reserved bytes, flags (`u16`),
    /// three formula byte counts (`i32`), length-prefixed text, then up to
    /// three length-prefixed formula token blocks. A formula slot (and all
    /// slots after it) is absent when fewer than 8 bytes remain.
    pub fn from_record(data: &[u8]) -> Result<Self> {
        let mut offset = 0usize;

        let ty = record::read_i32(data, &mut offset)?;
        let subtype = record::read_i32(data, &mut offset)?;
        let dxf_ref = record::read_i32(data, &mut offset)?;
        let priority = record::read_i32(data, &mut offset)?;
        let param = record::read_i32(data, &mut offset)?;
        record::read_u32(data, &mut offset)?; // reserved
        record::read_u32(data, &mut offset)?; // reserved
        let flags = record::read_u16(data, &mut offset)?;
        let formula_sizes = [
            record::read_i32(data, &mut offset)?,
            record::read_i32(data, &mut offset)?,
            record::read_i32(data, &mut offset)?,
        ];
        let text = record::read_wide_string(data, &mut offset)?;

        let mut rule = CondRule {
            priority,
            text,
            dxf_id: (dxf_ref >= 0).then_some(dxf_ref as u32),
            stop_if_true: flags & record::FLAG_STOP_IF_TRUE != 0,
            ..CondRule::new()
        };

        rule.apply_record_codes(ty, subtype, param, flags);

        // The visual kinds never consume formula slots; their payloads
        // arrive in dedicated follow-up records.
        let visual = matches!(
            ty,
            record::RULE_TYPE_COLORSCALE | record::RULE_TYPE_DATABAR | record::RULE_TYPE_ICONSET
        );
        if !visual {
            for size in formula_sizes {
                if size <= 0 {
                    continue;
                }
                if record::remaining(data, offset) < 8 {
                    break;
                }
                let len = record::read_u32(data, &mut offset)? as usize;
                if len > record::remaining(data, offset) {
                    log::warn!("formula block longer than record body, dropping remainder");
                    break;
                }
                rule.formulas
                    .push(RawFormula::Binary(data[offset..offset + len].to_vec()));
                offset += len;
            }
        }

        Ok(rule)
    }

    fn apply_record_codes(&mut self, ty: i32, subtype: i32, param: i32, flags: u16) {
        match ty {
            record::RULE_TYPE_CELLIS => {
                self.kind = Some(RuleKind::CellIs);
                self.operator = CfOperator::from_code(param);
            }
            record::RULE_TYPE_COLORSCALE => self.kind = Some(RuleKind::ColorScale),
            record::RULE_TYPE_DATABAR => self.kind = Some(RuleKind::DataBar),
            record::RULE_TYPE_ICONSET => self.kind = Some(RuleKind::IconSet),
            record::RULE_TYPE_TOPTEN => {
                self.kind = Some(RuleKind::Top10);
                if param > 0 {
                    self.rank = param as u32;
                }
                self.bottom = flags & record::FLAG_BOTTOM != 0;
                self.percent = flags & record::FLAG_PERCENT != 0;
            }
            record::RULE_TYPE_EXPRESSION => self.apply_expression_subtype(subtype, param, flags),
            unknown => {
                log::warn!("unknown rule type code {unknown}");
            }
        }
    }

    fn apply_expression_subtype(&mut self, subtype: i32, param: i32, flags: u16) {
        match subtype {
            record::RULE_SUB_TEXT => {
                self.kind = match param {
                    record::TEXT_OP_CONTAINS => Some(RuleKind::ContainsText),
                    record::TEXT_OP_NOT_CONTAINS => Some(RuleKind::NotContainsText),
                    record::TEXT_OP_BEGINS_WITH => Some(RuleKind::BeginsWith),
                    record::TEXT_OP_ENDS_WITH => Some(RuleKind::EndsWith),
                    unknown => {
                        log::warn!("unknown text operator code {unknown}");
                        None
                    }
                };
            }
            record::RULE_SUB_BLANKS => self.kind = Some(RuleKind::ContainsBlanks),
            record::RULE_SUB_NOBLANKS => self.kind = Some(RuleKind::NotContainsBlanks),
            record::RULE_SUB_ERRORS => self.kind = Some(RuleKind::ContainsErrors),
            record::RULE_SUB_NOERRORS => self.kind = Some(RuleKind::NotContainsErrors),
            record::RULE_SUB_DUPLICATE => self.kind = Some(RuleKind::DuplicateValues),
            record::RULE_SUB_UNIQUE => self.kind = Some(RuleKind::UniqueValues),
            record::RULE_SUB_ABOVEAVERAGE
            | record::RULE_SUB_BELOWAVERAGE
            | record::RULE_SUB_EQABOVEAVERAGE
            | record::RULE_SUB_EQBELOWAVERAGE => {
                self.kind = Some(RuleKind::AboveAverage);
                self.above_average = flags & record::FLAG_ABOVE_AVERAGE != 0;
                self.equal_average = matches!(
                    subtype,
                    record::RULE_SUB_EQABOVEAVERAGE | record::RULE_SUB_EQBELOWAVERAGE
                );
                if param > 0 {
                    self.std_dev = Some(param);
                }
            }
            sub => {
                if let Some(period) = TimePeriod::from_subtype(sub) {
                    self.kind = Some(RuleKind::TimePeriod);
                    self.time_period = Some(period);
                } else {
                    self.kind = Some(RuleKind::Expression);
                }
            }
        }
    }

    /// Append a rule-level formula. Slots beyond the third are dropped.
    pub fn append_formula(&mut self, text: &str) {
        if self.formulas.len() >= 3 {
            log::warn!("rule carries more than three formulas, dropping surplus");
            return;
        }
        self.formulas.push(RawFormula::Text(text.to_string()));
    }

    /// Begin the color scale encoding of this rule
    pub fn import_color_scale(&mut self) {
        self.ensure_color_scale();
    }

    /// Begin the data bar encoding and import its attributes
    pub fn import_data_bar(&mut self, attrs: &AttributeMap) {
        self.ensure_data_bar().import_attribs(attrs);
    }

    /// Begin the data bar encoding from a binary record body
    pub fn import_data_bar_record(&mut self, data: &[u8]) {
        if let Err(e) = self.ensure_data_bar().import_attribs_record(data) {
            log::warn!("bad data bar record: {e}");
        }
    }

    /// Begin the icon set encoding and import its attributes
    pub fn import_icon_set(&mut self, attrs: &AttributeMap) {
        self.ensure_icon_set().import_attribs(attrs);
    }

    /// Begin the icon set encoding from a binary record body
    pub fn import_icon_set_record(&mut self, data: &[u8]) {
        if let Err(e) = self.ensure_icon_set().import_attribs_record(data) {
            log::warn!("bad icon set record: {e}");
        }
    }

    /// Import one threshold event into the owned visual encoding
    pub fn import_cfvo(&mut self, attrs: &AttributeMap) {
        match self.visual.as_mut() {
            Some(builder) => builder.import_cfvo(attrs),
            None => log::warn!("threshold event outside a visual rule"),
        }
    }

    /// Import one binary threshold event into the owned visual encoding
    pub fn import_cfvo_record(&mut self, data: &[u8]) {
        match self.visual.as_mut() {
            Some(builder) => {
                if let Err(e) = builder.import_cfvo_record(data) {
                    log::warn!("bad threshold record: {e}");
                }
            }
            None => log::warn!("threshold record outside a visual rule"),
        }
    }

    /// Import one color event into the owned visual encoding
    pub fn import_color(&mut self, attrs: &AttributeMap, theme: &dyn ThemePalette) {
        match self.visual.as_mut() {
            Some(builder) => builder.import_color(attrs, theme),
            None => log::warn!("color event outside a visual rule"),
        }
    }

    /// Import one binary color event into the owned visual encoding
    pub fn import_color_record(&mut self, data: &[u8], theme: &dyn ThemePalette) {
        match self.visual.as_mut() {
            Some(builder) => {
                if let Err(e) = builder.import_color_record(data, theme) {
                    log::warn!("bad color record: {e}");
                }
            }
            None => log::warn!("color record outside a visual rule"),
        }
    }

    /// Import one custom icon event into the owned icon set
    pub fn import_icon(&mut self, attrs: &AttributeMap) {
        match self.visual.as_mut() {
            Some(VisualBuilder::IconSet(builder)) => builder.import_icon(attrs),
            _ => log::warn!("icon event outside an icon set rule"),
        }
    }

    /// Import one binary custom icon event into the owned icon set
    pub fn import_icon_record(&mut self, data: &[u8]) {
        match self.visual.as_mut() {
            Some(VisualBuilder::IconSet(builder)) => {
                if let Err(e) = builder.import_icon_record(data) {
                    log::warn!("bad icon record: {e}");
                }
            }
            _ => log::warn!("icon record outside an icon set rule"),
        }
    }

    /// Import one threshold formula event into the owned visual encoding
    pub fn import_threshold_formula(&mut self, text: &str) {
        if let Some(builder) = self.visual.as_mut() {
            builder.import_formula(text);
        }
    }

    /// The owned visual encoding, if any
    pub fn visual(&self) -> Option<&VisualBuilder> {
        self.visual.as_ref()
    }

    /// Mutable access to the owned visual encoding (extension patching)
    pub(crate) fn visual_mut(&mut self) -> Option<&mut VisualBuilder> {
        self.visual.as_mut()
    }

    fn ensure_color_scale(&mut self) -> &mut ColorScaleBuilder {
        if !matches!(self.visual, Some(VisualBuilder::ColorScale(_))) {
            if self.visual.is_some() {
                log::warn!("rule already owns a different visual encoding, replacing");
            }
            self.visual = Some(VisualBuilder::ColorScale(ColorScaleBuilder::new()));
        }
        match self.visual.as_mut() {
            Some(VisualBuilder::ColorScale(builder)) => builder,
            _ => unreachable!("color scale builder was just installed"),
        }
    }

    fn ensure_data_bar(&mut self) -> &mut DataBarBuilder {
        if !matches!(self.visual, Some(VisualBuilder::DataBar(_))) {
            if self.visual.is_some() {
                log::warn!("rule already owns a different visual encoding, replacing");
            }
            self.visual = Some(VisualBuilder::DataBar(DataBarBuilder::new()));
        }
        match self.visual.as_mut() {
            Some(VisualBuilder::DataBar(builder)) => builder,
            _ => unreachable!("data bar builder was just installed"),
        }
    }

    fn ensure_icon_set(&mut self) -> &mut IconSetBuilder {
        if !matches!(self.visual, Some(VisualBuilder::IconSet(_))) {
            if self.visual.is_some() {
                log::warn!("rule already owns a different visual encoding, replacing");
            }
            self.visual = Some(VisualBuilder::IconSet(IconSetBuilder::new()));
        }
        match self.visual.as_mut() {
            Some(VisualBuilder::IconSet(builder)) => builder,
            _ => unreachable!("icon set builder was just installed"),
        }
    }

    /// Structural equality for deduplication. Ranges and priorities are
    /// deliberately excluded; style references are compared by resolved
    /// content, not identifier.
    pub(crate) fn structurally_equal(&self, other: &Self, styles: &dyn StyleResolver) -> bool {
        self.kind == other.kind
            && self.operator == other.operator
            && self.time_period == other.time_period
            && self.rank == other.rank
            && self.std_dev == other.std_dev
            && self.stop_if_true == other.stop_if_true
            && self.bottom == other.bottom
            && self.percent == other.percent
            && self.above_average == other.above_average
            && self.equal_average == other.equal_average
            && self.formulas == other.formulas
            && self.text == other.text
            && self.visual == other.visual
            && self.prebuilt == other.prebuilt
            && styles.dxf_contents_equal(self.dxf_id, other.dxf_id)
    }

    /// Hash the fields that participate in [`Self::structurally_equal`],
    /// for pre-bucketing candidate duplicates. Styles and visual encodings
    /// are left out; equal rules still land in the same bucket.
    pub(crate) fn hash_structure<H: std::hash::Hasher>(&self, state: &mut H) {
        use std::hash::Hash;

        self.kind.hash(state);
        self.operator.hash(state);
        self.time_period.hash(state);
        self.rank.hash(state);
        self.std_dev.hash(state);
        self.stop_if_true.hash(state);
        self.bottom.hash(state);
        self.percent.hash(state);
        self.above_average.hash(state);
        self.equal_average.hash(state);
        self.formulas.hash(state);
        self.text.hash(state);
    }

    /// Resolve the comparison mode, when this rule maps to a condition entry.
    /// Blank rules resolve to a direct expression built in [`Self::into_entry`].
    fn resolve_mode(&self) -> Option<CondMode> {
        match self.kind? {
            RuleKind::CellIs => self.operator.map(|op| op.mode()),
            RuleKind::Expression => Some(CondMode::Direct),
            RuleKind::ContainsText => Some(CondMode::ContainsText),
            RuleKind::NotContainsText => Some(CondMode::NotContainsText),
            RuleKind::BeginsWith => Some(CondMode::BeginsWith),
            RuleKind::EndsWith => Some(CondMode::EndsWith),
            RuleKind::DuplicateValues => Some(CondMode::Duplicate),
            RuleKind::UniqueValues => Some(CondMode::Unique),
            RuleKind::ContainsErrors => Some(CondMode::Error),
            RuleKind::NotContainsErrors => Some(CondMode::NoError),
            RuleKind::ContainsBlanks | RuleKind::NotContainsBlanks => Some(CondMode::Direct),
            RuleKind::Top10 => Some(match (self.bottom, self.percent) {
                (false, false) => CondMode::Top,
                (true, false) => CondMode::Bottom,
                (false, true) => CondMode::TopPercent,
                (true, true) => CondMode::BottomPercent,
            }),
            RuleKind::AboveAverage => Some(match (self.above_average, self.equal_average) {
                (true, false) => CondMode::AboveAverage,
                (false, false) => CondMode::BelowAverage,
                (true, true) => CondMode::AboveEqualAverage,
                (false, true) => CondMode::BelowEqualAverage,
            }),
            RuleKind::ColorScale
            | RuleKind::DataBar
            | RuleKind::IconSet
            | RuleKind::TimePeriod => None,
        }
    }

    /// Convert into the host-native entry. Called exactly once, by the
    /// owning container's finalize. Returns `None` (with a warning) for
    /// combinations that cannot be represented.
    pub fn into_entry(
        self,
        anchor: CellAddress,
        styles: &mut dyn StyleResolver,
        tokenizer: &mut dyn FormulaTokenizer,
    ) -> Option<FormatEntry> {
        // An entry built by the extension path passes through untouched.
        if let Some(entry) = self.prebuilt {
            return Some(entry);
        }

        if let Some(mode) = self.resolve_mode() {
            let tokens = self.build_operands(mode, anchor, tokenizer)?;
            let style = styles.create_dxf_style(self.dxf_id);
            return Some(FormatEntry::Condition(ConditionEntry {
                mode,
                tokens,
                style,
                stop_if_true: self.stop_if_true,
            }));
        }

        if self.kind == Some(RuleKind::TimePeriod) {
            let Some(period) = self.time_period else {
                log::warn!("time-period rule with unknown period, skipping");
                return None;
            };
            let style = styles.create_dxf_style(self.dxf_id);
            return Some(FormatEntry::Date(DateEntry { period, style }));
        }

        if let Some(builder) = self.visual {
            return Some(match builder {
                VisualBuilder::ColorScale(b) => FormatEntry::ColorScale(b.finish()),
                VisualBuilder::DataBar(b) => FormatEntry::DataBar(b.finish()),
                VisualBuilder::IconSet(b) => FormatEntry::IconSet(b.finish()),
            });
        }

        log::warn!(
            "rule of kind {:?} has no usable representation, skipping",
            self.kind
        );
        None
    }

    fn build_operands(
        &self,
        mode: CondMode,
        anchor: CellAddress,
        tokenizer: &mut dyn FormulaTokenizer,
    ) -> Option<Vec<TokenSequence>> {
        let tokenize_raw = |tokenizer: &mut dyn FormulaTokenizer, raw: &RawFormula| match raw {
            RawFormula::Text(text) => tokenizer.tokenize(anchor, text),
            RawFormula::Binary(bytes) => tokenizer.tokenize_binary(anchor, bytes),
        };

        let tokens = match mode {
            CondMode::Duplicate | CondMode::Unique | CondMode::Error | CondMode::NoError => {
                Vec::new()
            }
            CondMode::Top | CondMode::Bottom | CondMode::TopPercent | CondMode::BottomPercent => {
                vec![tokenizer.tokenize(anchor, &self.rank.to_string())]
            }
            CondMode::AboveAverage
            | CondMode::BelowAverage
            | CondMode::AboveEqualAverage
            | CondMode::BelowEqualAverage => {
                vec![tokenizer.tokenize(anchor, &self.std_dev.unwrap_or(0).to_string())]
            }
            CondMode::ContainsText
            | CondMode::NotContainsText
            | CondMode::BeginsWith
            | CondMode::EndsWith => {
                vec![tokenizer.tokenize(anchor, &format!("\"{}\"", self.text))]
            }
            CondMode::Direct => match self.kind {
                // Blank rules have no wire-level counterpart in the host;
                // they are rewritten as expressions over the anchor cell.
                Some(RuleKind::ContainsBlanks) => {
                    vec![tokenizer.tokenize(anchor, &blank_formula(true, anchor))]
                }
                Some(RuleKind::NotContainsBlanks) => {
                    vec![tokenizer.tokenize(anchor, &blank_formula(false, anchor))]
                }
                _ => {
                    let Some(first) = self.formulas.first() else {
                        log::warn!("expression rule without a formula, skipping");
                        return None;
                    };
                    vec![tokenize_raw(tokenizer, first)]
                }
            },
            CondMode::Between | CondMode::NotBetween => {
                if self.formulas.len() < 2 {
                    log::warn!("between rule with {} formulas, skipping", self.formulas.len());
                    return None;
                }
                vec![
                    tokenize_raw(tokenizer, &self.formulas[0]),
                    tokenize_raw(tokenizer, &self.formulas[1]),
                ]
            }
            // Remaining single-operand comparisons
            _ => {
                let Some(first) = self.formulas.first() else {
                    log::warn!("comparison rule without a formula, skipping");
                    return None;
                };
                vec![tokenize_raw(tokenizer, first)]
            }
        };

        Some(tokens)
    }
}

/// Compatibility formula for blank/not-blank rules, with the anchor
/// placeholder substituted in relative form.
fn blank_formula(blank: bool, anchor: CellAddress) -> String {
    let template = if blank {
        "LEN(TRIM(#B))=0"
    } else {
        "LEN(TRIM(#B))>0"
    };
    template.replace(ANCHOR_PLACEHOLDER, &anchor.to_relative_a1())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::StyleId;
    use crate::testutil::{PlainStyles, TextTokens};
    use pretty_assertions::assert_eq;

    fn anchor() -> CellAddress {
        CellAddress::new(0, 0)
    }

    fn entry_of(rule: CondRule) -> Option<FormatEntry> {
        rule.into_entry(anchor(), &mut PlainStyles, &mut TextTokens)
    }

    #[test]
    fn test_cell_is_greater_than() {
        let mut rule = CondRule::from_attrs(&AttributeMap::from_pairs([
            ("type", "cellIs"),
            ("operator", "greaterThan"),
            ("priority", "1"),
            ("dxfId", "3"),
        ]));
        rule.append_formula("10");

        let entry = entry_of(rule).unwrap();
        let FormatEntry::Condition(cond) = entry else {
            panic!("expected a condition entry");
        };
        assert_eq!(cond.mode, CondMode::Greater);
        assert_eq!(cond.tokens.len(), 1);
        assert_eq!(cond.tokens[0].as_bytes(), b"10");
        assert_eq!(cond.style, StyleId(3));
    }

    #[test]
    fn test_between_needs_two_formulas() {
        let mut rule = CondRule::from_attrs(&AttributeMap::from_pairs([
            ("type", "cellIs"),
            ("operator", "between"),
        ]));
        rule.append_formula("1");
        assert!(entry_of(rule.clone()).is_none());

        rule.append_formula("9");
        let FormatEntry::Condition(cond) = entry_of(rule).unwrap() else {
            panic!("expected a condition entry");
        };
        assert_eq!(cond.mode, CondMode::Between);
        assert_eq!(cond.tokens.len(), 2);
    }

    #[test]
    fn test_duplicate_has_no_operands() {
        let rule = CondRule::from_attrs(&AttributeMap::from_pairs([("type", "duplicateValues")]));
        let FormatEntry::Condition(cond) = entry_of(rule).unwrap() else {
            panic!("expected a condition entry");
        };
        assert_eq!(cond.mode, CondMode::Duplicate);
        assert!(cond.tokens.is_empty());
    }

    #[test]
    fn test_text_rule_quotes_operand() {
        let rule = CondRule::from_attrs(&AttributeMap::from_pairs([
            ("type", "containsText"),
            ("text", "alert"),
        ]));
        let FormatEntry::Condition(cond) = entry_of(rule).unwrap() else {
            panic!("expected a condition entry");
        };
        assert_eq!(cond.mode, CondMode::ContainsText);
        assert_eq!(cond.tokens[0].as_bytes(), b"\"alert\"");
    }

    #[test]
    fn test_blank_rule_substitutes_anchor() {
        let rule = CondRule::from_attrs(&AttributeMap::from_pairs([("type", "containsBlanks")]));
        let FormatEntry::Condition(cond) = entry_of(rule).unwrap() else {
            panic!("expected a condition entry");
        };
        assert_eq!(cond.mode, CondMode::Direct);
        assert_eq!(cond.tokens[0].as_bytes(), b"LEN(TRIM(A1))=0");
    }

    #[test]
    fn test_top_percent_modes() {
        let rule = CondRule::from_attrs(&AttributeMap::from_pairs([
            ("type", "top10"),
            ("rank", "5"),
            ("percent", "1"),
            ("bottom", "1"),
        ]));
        let FormatEntry::Condition(cond) = entry_of(rule).unwrap() else {
            panic!("expected a condition entry");
        };
        assert_eq!(cond.mode, CondMode::BottomPercent);
        assert_eq!(cond.tokens[0].as_bytes(), b"5");
    }

    #[test]
    fn test_time_period_builds_date_entry() {
        let rule = CondRule::from_attrs(&AttributeMap::from_pairs([
            ("type", "timePeriod"),
            ("timePeriod", "last7Days"),
        ]));
        let FormatEntry::Date(date) = entry_of(rule).unwrap() else {
            panic!("expected a date entry");
        };
        assert_eq!(date.period, TimePeriod::Last7Days);
    }

    #[test]
    fn test_unknown_time_period_is_dropped() {
        let rule = CondRule::from_attrs(&AttributeMap::from_pairs([
            ("type", "timePeriod"),
            ("timePeriod", "lastCentury"),
        ]));
        assert!(entry_of(rule).is_none());
    }

    #[test]
    fn test_unknown_kind_is_dropped() {
        let rule = CondRule::from_attrs(&AttributeMap::from_pairs([("type", "sparkles")]));
        assert!(entry_of(rule).is_none());
    }

    #[test]
    fn test_binary_color_scale_skips_formula_slots() {
        let mut data = Vec::new();
        data.extend_from_slice(&record::RULE_TYPE_COLORSCALE.to_le_bytes());
        data.extend_from_slice(&record::RULE_SUB_COLORSCALE.to_le_bytes());
        data.extend_from_slice(&(-1i32).to_le_bytes()); // no dxf
        data.extend_from_slice(&2i32.to_le_bytes()); // priority
        data.extend_from_slice(&0i32.to_le_bytes()); // param
        data.extend_from_slice(&[0u8; 8]); // reserved
        data.extend_from_slice(&0u16.to_le_bytes()); // flags
        data.extend_from_slice(&12i32.to_le_bytes()); // claims a formula
        data.extend_from_slice(&0i32.to_le_bytes());
        data.extend_from_slice(&0i32.to_le_bytes());
        data.extend_from_slice(&0u32.to_le_bytes()); // empty text
        // Trailing bytes that a formula read would otherwise consume
        data.extend_from_slice(&[0xAA; 16]);

        let rule = CondRule::from_record(&data).unwrap();
        assert_eq!(rule.kind, Some(RuleKind::ColorScale));
        assert_eq!(rule.priority, 2);
        assert!(rule.formulas.is_empty());
    }

    #[test]
    fn test_binary_cellis_reads_formula_blocks() {
        let rgce = [0x1E, 0x0A, 0x00]; // arbitrary token bytes
        let mut data = Vec::new();
        data.extend_from_slice(&record::RULE_TYPE_CELLIS.to_le_bytes());
        data.extend_from_slice(&record::RULE_SUB_CELLIS.to_le_bytes());
        data.extend_from_slice(&5i32.to_le_bytes()); // dxf
        data.extend_from_slice(&1i32.to_le_bytes()); // priority
        data.extend_from_slice(&record::OP_GREATER.to_le_bytes());
        data.extend_from_slice(&[0u8; 8]);
        data.extend_from_slice(&record::FLAG_STOP_IF_TRUE.to_le_bytes());
        data.extend_from_slice(&(rgce.len() as i32).to_le_bytes());
        data.extend_from_slice(&0i32.to_le_bytes());
        data.extend_from_slice(&0i32.to_le_bytes());
        data.extend_from_slice(&0u32.to_le_bytes()); // empty text
        data.extend_from_slice(&(rgce.len() as u32).to_le_bytes());
        data.extend_from_slice(&rgce);
        // Padding so the remaining-byte gate passes
        data.extend_from_slice(&[0u8; 8]);

        let rule = CondRule::from_record(&data).unwrap();
        assert_eq!(rule.kind, Some(RuleKind::CellIs));
        assert_eq!(rule.operator, Some(CfOperator::GreaterThan));
        assert!(rule.stop_if_true);
        assert_eq!(rule.dxf_id, Some(5));
        assert_eq!(rule.formulas, vec![RawFormula::Binary(rgce.to_vec())]);
    }

    #[test]
    fn test_binary_formula_slot_absent_when_bytes_run_out() {
        let mut data = Vec::new();
        data.extend_from_slice(&record::RULE_TYPE_CELLIS.to_le_bytes());
        data.extend_from_slice(&record::RULE_SUB_CELLIS.to_le_bytes());
        data.extend_from_slice(&(-1i32).to_le_bytes());
        data.extend_from_slice(&1i32.to_le_bytes());
        data.extend_from_slice(&record::OP_EQUAL.to_le_bytes());
        data.extend_from_slice(&[0u8; 8]);
        data.extend_from_slice(&0u16.to_le_bytes());
        data.extend_from_slice(&4i32.to_le_bytes()); // declared but absent
        data.extend_from_slice(&0i32.to_le_bytes());
        data.extend_from_slice(&0i32.to_le_bytes());
        data.extend_from_slice(&0u32.to_le_bytes());
        data.extend_from_slice(&[0u8; 4]); // fewer than 8 bytes remain

        let rule = CondRule::from_record(&data).unwrap();
        assert!(rule.formulas.is_empty());
    }
}
