//! Host-native applied representation of conditional formats.
//!
//! Finalizing a rule produces one [`FormatEntry`], which is handed to the
//! [`DocumentSink`](crate::host::DocumentSink) unchanged. Nothing here refers
//! back to the wire model.

use crate::color::Rgb;
use crate::host::{StyleId, TokenSequence};
use crate::record;

/// Comparison mode of an applied condition entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CondMode {
    /// Value equals operand
    Equal,
    /// Value does not equal operand
    NotEqual,
    /// Value is greater than operand
    Greater,
    /// Value is greater than or equal to operand
    GreaterEqual,
    /// Value is less than operand
    Less,
    /// Value is less than or equal to operand
    LessEqual,
    /// Value is between the two operands
    Between,
    /// Value is outside the two operands
    NotBetween,
    /// Value occurs more than once in the range
    Duplicate,
    /// Value occurs exactly once in the range
    Unique,
    /// The operand formula evaluates to true
    Direct,
    /// Value is among the N largest
    Top,
    /// Value is among the N smallest
    Bottom,
    /// Value is in the top N percent
    TopPercent,
    /// Value is in the bottom N percent
    BottomPercent,
    /// Value is above the range average
    AboveAverage,
    /// Value is below the range average
    BelowAverage,
    /// Value is above or equal to the range average
    AboveEqualAverage,
    /// Value is below or equal to the range average
    BelowEqualAverage,
    /// Cell text contains the operand text
    ContainsText,
    /// Cell text does not contain the operand text
    NotContainsText,
    /// Cell text begins with the operand text
    BeginsWith,
    /// Cell text ends with the operand text
    EndsWith,
    /// Cell contains an error value
    Error,
    /// Cell contains no error value
    NoError,
}

impl CondMode {
    /// Number of operand token sequences this mode consumes
    pub fn operand_count(&self) -> usize {
        match self {
            CondMode::Duplicate | CondMode::Unique | CondMode::Error | CondMode::NoError => 0,
            CondMode::Between | CondMode::NotBetween => 2,
            _ => 1,
        }
    }
}

/// How a threshold entry is interpreted by the host
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EntryKind {
    /// No interpretation recorded
    None,
    /// Plain numeric value
    #[default]
    Value,
    /// Minimum value in the range
    Min,
    /// Maximum value in the range
    Max,
    /// Percentage (0-100)
    Percent,
    /// Percentile (0-100)
    Percentile,
    /// Formula result
    Formula,
    /// Automatic minimum (zero-anchored when all values are positive)
    AutoMin,
    /// Automatic maximum
    AutoMax,
}

/// One threshold entry of a color scale, data bar, or icon set
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ScaleEntry {
    /// How the entry is interpreted
    pub kind: EntryKind,
    /// Numeric payload (meaningful for Value/Percent/Percentile)
    pub value: f64,
    /// Formula payload (meaningful for Formula)
    pub formula: Option<String>,
    /// Stop color; `None` when the source never supplied one
    pub color: Option<Rgb>,
    /// Strict ">" relation instead of the default ">="
    pub greater_than: bool,
}

/// Applied color scale
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ColorScaleData {
    /// Stops in semantic order (first = lowest)
    pub stops: Vec<ScaleEntry>,
}

/// Axis placement of a data bar
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AxisPosition {
    /// Axis position chosen from the value range
    #[default]
    Automatic,
    /// Axis fixed at the cell midpoint
    Middle,
    /// No axis
    None,
}

impl AxisPosition {
    /// Parse from the extension attribute value
    pub fn from_name(s: &str) -> Option<Self> {
        match s {
            "automatic" => Some(AxisPosition::Automatic),
            "middle" => Some(AxisPosition::Middle),
            "none" => Some(AxisPosition::None),
            _ => None,
        }
    }
}

/// Applied data bar
#[derive(Debug, Clone, PartialEq)]
pub struct DataBarData {
    /// Lower limit
    pub lower: ScaleEntry,
    /// Upper limit
    pub upper: ScaleEntry,
    /// Fill color for positive values
    pub positive_color: Rgb,
    /// Fill color for negative values (extension data only)
    pub negative_color: Option<Rgb>,
    /// Axis color (extension data only)
    pub axis_color: Option<Rgb>,
    /// Axis placement
    pub axis_position: AxisPosition,
    /// Gradient fill instead of solid
    pub gradient: bool,
    /// Shortest bar as a percentage of the cell width (0-100)
    pub min_length: u32,
    /// Longest bar as a percentage of the cell width (0-100)
    pub max_length: u32,
    /// Draw only the bar, not the cell value
    pub only_bar: bool,
}

/// Icon set selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IconSetType {
    /// 3 arrows (up, right, down)
    Arrows3,
    /// 3 gray arrows
    Arrows3Gray,
    /// 3 flags
    Flags3,
    /// 3 traffic lights (unrimmed)
    #[default]
    TrafficLights3,
    /// 3 traffic lights (rimmed)
    TrafficLights3Black,
    /// 3 signs
    Signs3,
    /// 3 symbols (checkmark, exclamation, X)
    Symbols3,
    /// 3 symbols circled
    Symbols3Circled,
    /// 3 stars
    Stars3,
    /// 3 triangles
    Triangles3,
    /// 4 arrows
    Arrows4,
    /// 4 gray arrows
    Arrows4Gray,
    /// 4 circles (red to black)
    RedToBlack4,
    /// 4 ratings
    Rating4,
    /// 4 traffic lights
    TrafficLights4,
    /// 5 arrows
    Arrows5,
    /// 5 gray arrows
    Arrows5Gray,
    /// 5 ratings
    Rating5,
    /// 5 quarters
    Quarters5,
    /// 5 boxes
    Boxes5,
    /// No icon (custom sets only)
    NoIcons,
}

impl IconSetType {
    /// Parse from the wire name
    pub fn from_name(s: &str) -> Option<Self> {
        match s {
            "3Arrows" => Some(IconSetType::Arrows3),
            "3ArrowsGray" => Some(IconSetType::Arrows3Gray),
            "3Flags" => Some(IconSetType::Flags3),
            "3TrafficLights1" => Some(IconSetType::TrafficLights3),
            "3TrafficLights2" => Some(IconSetType::TrafficLights3Black),
            "3Signs" => Some(IconSetType::Signs3),
            "3Symbols" => Some(IconSetType::Symbols3),
            "3Symbols2" => Some(IconSetType::Symbols3Circled),
            "3Stars" => Some(IconSetType::Stars3),
            "3Triangles" => Some(IconSetType::Triangles3),
            "4Arrows" => Some(IconSetType::Arrows4),
            "4ArrowsGray" => Some(IconSetType::Arrows4Gray),
            "4RedToBlack" => Some(IconSetType::RedToBlack4),
            "4Rating" => Some(IconSetType::Rating4),
            "4TrafficLights" => Some(IconSetType::TrafficLights4),
            "5Arrows" => Some(IconSetType::Arrows5),
            "5ArrowsGray" => Some(IconSetType::Arrows5Gray),
            "5Rating" => Some(IconSetType::Rating5),
            "5Quarters" => Some(IconSetType::Quarters5),
            "5Boxes" => Some(IconSetType::Boxes5),
            "NoIcons" => Some(IconSetType::NoIcons),
            _ => None,
        }
    }

    /// The wire name
    pub fn name(&self) -> &'static str {
        match self {
            IconSetType::Arrows3 => "3Arrows",
            IconSetType::Arrows3Gray => "3ArrowsGray",
            IconSetType::Flags3 => "3Flags",
            IconSetType::TrafficLights3 => "3TrafficLights1",
            IconSetType::TrafficLights3Black => "3TrafficLights2",
            IconSetType::Signs3 => "3Signs",
            IconSetType::Symbols3 => "3Symbols",
            IconSetType::Symbols3Circled => "3Symbols2",
            IconSetType::Stars3 => "3Stars",
            IconSetType::Triangles3 => "3Triangles",
            IconSetType::Arrows4 => "4Arrows",
            IconSetType::Arrows4Gray => "4ArrowsGray",
            IconSetType::RedToBlack4 => "4RedToBlack",
            IconSetType::Rating4 => "4Rating",
            IconSetType::TrafficLights4 => "4TrafficLights",
            IconSetType::Arrows5 => "5Arrows",
            IconSetType::Arrows5Gray => "5ArrowsGray",
            IconSetType::Rating5 => "5Rating",
            IconSetType::Quarters5 => "5Quarters",
            IconSetType::Boxes5 => "5Boxes",
            IconSetType::NoIcons => "NoIcons",
        }
    }

    /// Decode the binary icon set code
    pub fn from_code(code: i32) -> Option<Self> {
        match code {
            0 => Some(IconSetType::Arrows3),
            1 => Some(IconSetType::Arrows3Gray),
            2 => Some(IconSetType::Flags3),
            3 => Some(IconSetType::TrafficLights3),
            4 => Some(IconSetType::TrafficLights3Black),
            5 => Some(IconSetType::Signs3),
            6 => Some(IconSetType::Symbols3),
            7 => Some(IconSetType::Symbols3Circled),
            8 => Some(IconSetType::Arrows4),
            9 => Some(IconSetType::Arrows4Gray),
            10 => Some(IconSetType::RedToBlack4),
            11 => Some(IconSetType::Rating4),
            12 => Some(IconSetType::TrafficLights4),
            13 => Some(IconSetType::Arrows5),
            14 => Some(IconSetType::Arrows5Gray),
            15 => Some(IconSetType::Quarters5),
            16 => Some(IconSetType::Rating5),
            _ => None,
        }
    }

    /// Number of icons in this set
    pub fn icon_count(&self) -> usize {
        match self {
            IconSetType::NoIcons => 0,

            IconSetType::Arrows3
            | IconSetType::Arrows3Gray
            | IconSetType::Flags3
            | IconSetType::TrafficLights3
            | IconSetType::TrafficLights3Black
            | IconSetType::Signs3
            | IconSetType::Symbols3
            | IconSetType::Symbols3Circled
            | IconSetType::Stars3
            | IconSetType::Triangles3 => 3,

            IconSetType::Arrows4
            | IconSetType::Arrows4Gray
            | IconSetType::RedToBlack4
            | IconSetType::Rating4
            | IconSetType::TrafficLights4 => 4,

            IconSetType::Arrows5
            | IconSetType::Arrows5Gray
            | IconSetType::Rating5
            | IconSetType::Quarters5
            | IconSetType::Boxes5 => 5,
        }
    }
}

/// Applied icon set
#[derive(Debug, Clone, PartialEq)]
pub struct IconSetData {
    /// The icon set in use
    pub set: IconSetType,
    /// Boundary entries, one per icon, in semantic order
    pub entries: Vec<ScaleEntry>,
    /// Highest value gets the first icon
    pub reverse: bool,
    /// Show the cell value next to the icon
    pub show_value: bool,
    /// Custom per-boundary icons; an index of -1 means "no icon"
    pub custom: Vec<(IconSetType, i32)>,
}

/// Day window of a time-period entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TimePeriod {
    /// Today
    #[default]
    Today,
    /// Yesterday
    Yesterday,
    /// Tomorrow
    Tomorrow,
    /// Last 7 days
    Last7Days,
    /// This week
    ThisWeek,
    /// Last week
    LastWeek,
    /// Next week
    NextWeek,
    /// This month
    ThisMonth,
    /// Last month
    LastMonth,
    /// Next month
    NextMonth,
}

impl TimePeriod {
    /// Parse from the wire name
    pub fn from_name(s: &str) -> Option<Self> {
        match s {
            "today" => Some(TimePeriod::Today),
            "yesterday" => Some(TimePeriod::Yesterday),
            "tomorrow" => Some(TimePeriod::Tomorrow),
            "last7Days" => Some(TimePeriod::Last7Days),
            "thisWeek" => Some(TimePeriod::ThisWeek),
            "lastWeek" => Some(TimePeriod::LastWeek),
            "nextWeek" => Some(TimePeriod::NextWeek),
            "thisMonth" => Some(TimePeriod::ThisMonth),
            "lastMonth" => Some(TimePeriod::LastMonth),
            "nextMonth" => Some(TimePeriod::NextMonth),
            _ => None,
        }
    }

    /// The wire name
    pub fn name(&self) -> &'static str {
        match self {
            TimePeriod::Today => "today",
            TimePeriod::Yesterday => "yesterday",
            TimePeriod::Tomorrow => "tomorrow",
            TimePeriod::Last7Days => "last7Days",
            TimePeriod::ThisWeek => "thisWeek",
            TimePeriod::LastWeek => "lastWeek",
            TimePeriod::NextWeek => "nextWeek",
            TimePeriod::ThisMonth => "thisMonth",
            TimePeriod::LastMonth => "lastMonth",
            TimePeriod::NextMonth => "nextMonth",
        }
    }

    /// Decode the binary rule subtype into a time period
    pub fn from_subtype(subtype: i32) -> Option<Self> {
        match subtype {
            record::RULE_SUB_TODAY => Some(TimePeriod::Today),
            record::RULE_SUB_TOMORROW => Some(TimePeriod::Tomorrow),
            record::RULE_SUB_LAST7DAYS => Some(TimePeriod::Last7Days),
            record::RULE_SUB_THISMONTH => Some(TimePeriod::ThisMonth),
            record::RULE_SUB_LASTMONTH => Some(TimePeriod::LastMonth),
            record::RULE_SUB_YESTERDAY => Some(TimePeriod::Yesterday),
            record::RULE_SUB_LASTWEEK => Some(TimePeriod::LastWeek),
            record::RULE_SUB_NEXTMONTH => Some(TimePeriod::NextMonth),
            record::RULE_SUB_THISWEEK => Some(TimePeriod::ThisWeek),
            record::RULE_SUB_NEXTWEEK => Some(TimePeriod::NextWeek),
            _ => None,
        }
    }
}

/// An applied comparison/expression condition
#[derive(Debug, Clone, PartialEq)]
pub struct ConditionEntry {
    /// Comparison mode
    pub mode: CondMode,
    /// Operand token sequences (0-2, per [`CondMode::operand_count`])
    pub tokens: Vec<TokenSequence>,
    /// Differential style applied on match
    pub style: StyleId,
    /// Stop evaluating lower-priority rules on match
    pub stop_if_true: bool,
}

/// An applied time-period condition
#[derive(Debug, Clone, PartialEq)]
pub struct DateEntry {
    /// The day window
    pub period: TimePeriod,
    /// Differential style applied on match
    pub style: StyleId,
}

/// One applied entry of a conditional format
#[derive(Debug, Clone, PartialEq)]
pub enum FormatEntry {
    /// Comparison, text, expression, top-N, average, duplicate or error rule
    Condition(ConditionEntry),
    /// Color scale
    ColorScale(ColorScaleData),
    /// Data bar
    DataBar(DataBarData),
    /// Icon set
    IconSet(IconSetData),
    /// Time period rule
    Date(DateEntry),
}
