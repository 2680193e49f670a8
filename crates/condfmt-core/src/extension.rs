//! Extension blocks: the secondary, revision-specific encoding of rule
//! details.
//!
//! An extension block either refines a rule imported through the primary
//! path (an [`ExtPatch`] against a weak [`ExtTarget`]) or stands alone as an
//! [`ExtFormat`] that is matched to a primary container by exact range-set
//! equality during buffer finalize.
//!
//! Patch targets are identity keys, not pointers: they are re-resolved
//! through the buffer's merge table after deduplication, so a patch whose
//! rule was merged away lands on the surviving duplicate instead of
//! dangling.

use crate::cell::RangeList;
use crate::color::Rgb;
use crate::entry::{AxisPosition, EntryKind, FormatEntry};
use crate::rule::CondRule;
use crate::threshold::parse_plain_double;
use crate::visual::{ExtCfvo, VisualBuilder};

/// Weak identity of a rule targeted by an extension patch: the owning
/// container's import slot plus the rule's priority key within it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ExtTarget {
    pub(crate) slot: usize,
    pub(crate) priority: i32,
}

/// One field patch against a visual encoding imported through the primary
/// path
#[derive(Clone, Debug, PartialEq)]
pub enum ExtPatch {
    /// Axis placement and gradient flag of the target data bar
    DataBarAttribs {
        /// Axis placement
        axis_position: AxisPosition,
        /// Gradient fill instead of solid
        gradient: bool,
    },
    /// Axis color of the target data bar
    AxisColor(Rgb),
    /// Positive fill color; redundantly re-supplied data, last write wins
    PositiveFill(Rgb),
    /// Negative fill color; also marks the target as having one
    NegativeFill(Rgb),
    /// Threshold refinement for one stop of the target encoding
    CfvoRefine {
        /// Stop index (0 = lower limit for data bars)
        stop: usize,
        /// The refinement
        refine: ExtCfvo,
    },
}

impl ExtPatch {
    /// Apply this patch to the resolved target rule. Side effect only; a
    /// target without a matching visual encoding is a warned no-op.
    pub(crate) fn apply(self, rule: &mut CondRule) {
        match rule.visual_mut() {
            Some(VisualBuilder::DataBar(builder)) => match self {
                ExtPatch::DataBarAttribs {
                    axis_position,
                    gradient,
                } => {
                    builder.set_axis_position(axis_position);
                    builder.set_gradient(gradient);
                }
                ExtPatch::AxisColor(color) => builder.set_axis_color(color),
                ExtPatch::PositiveFill(color) => builder.set_positive_color(color),
                ExtPatch::NegativeFill(color) => builder.set_negative_color(color),
                ExtPatch::CfvoRefine { stop, refine } => builder.refine_cfvo(stop, refine),
            },
            Some(VisualBuilder::ColorScale(builder)) => match self {
                ExtPatch::CfvoRefine { stop, refine } => builder.refine_cfvo(stop, refine),
                other => {
                    log::warn!("extension patch {other:?} targets a color scale, ignoring");
                }
            },
            _ => {
                log::warn!("extension patch target owns no matching visual encoding, ignoring");
            }
        }
    }
}

/// Parse an extension threshold refinement from its type string and optional
/// embedded value.
///
/// The numeric-value case parses the embedded string strictly (`.` decimal
/// point, no group separator); a failed or partial parse leaves the value
/// unset rather than partially applied. Unknown type strings produce no
/// refinement.
pub fn ext_cfvo(ty: &str, value: Option<&str>) -> Option<ExtCfvo> {
    let kind = match ty {
        "num" => EntryKind::Value,
        "min" => EntryKind::Min,
        "max" => EntryKind::Max,
        "autoMin" => EntryKind::AutoMin,
        "autoMax" => EntryKind::AutoMax,
        "percent" => EntryKind::Percent,
        "percentile" => EntryKind::Percentile,
        "formula" => EntryKind::Formula,
        _ => return None,
    };

    let value = if kind == EntryKind::Value {
        value.and_then(parse_plain_double)
    } else {
        None
    };

    Some(ExtCfvo { kind, value })
}

/// A standalone extension container: a range set plus host-native entries
/// with their declared priorities (-1 = unassigned).
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ExtFormat {
    /// Target ranges
    pub ranges: RangeList,
    /// Host-native entries paired with their priorities
    pub entries: Vec<(FormatEntry, i32)>,
}

impl ExtFormat {
    /// Create an empty extension container
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one entry with its declared priority
    pub fn push_entry(&mut self, entry: FormatEntry, priority: i32) {
        self.entries.push((entry, priority));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ext_cfvo_kinds() {
        assert_eq!(ext_cfvo("autoMin", None).unwrap().kind, EntryKind::AutoMin);
        assert_eq!(ext_cfvo("percentile", None).unwrap().kind, EntryKind::Percentile);
        assert_eq!(ext_cfvo("plasma", None), None);
    }

    #[test]
    fn test_ext_cfvo_numeric_value_strict_parse() {
        let ok = ext_cfvo("num", Some("12.5")).unwrap();
        assert_eq!(ok.kind, EntryKind::Value);
        assert_eq!(ok.value, Some(12.5));

        // Partial or failed parses leave the value unset
        assert_eq!(ext_cfvo("num", Some("12.5abc")).unwrap().value, None);
        assert_eq!(ext_cfvo("num", Some("")).unwrap().value, None);
        assert_eq!(ext_cfvo("num", None).unwrap().value, None);
    }

    #[test]
    fn test_non_numeric_kind_ignores_value() {
        assert_eq!(ext_cfvo("min", Some("3")).unwrap().value, None);
    }
}
