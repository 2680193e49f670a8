//! The conditional format container: one range set plus its rules, keyed by
//! priority.

use std::collections::BTreeMap;
use std::hash::Hasher;

use ahash::AHasher;

use crate::attrs::AttributeMap;
use crate::cell::{CellAddress, RangeList};
use crate::error::Result;
use crate::host::{DocumentSink, FormatIndex, FormulaTokenizer, StyleResolver};
use crate::record;
use crate::rule::CondRule;

/// One conditional format block under construction
#[derive(Debug, Clone, Default)]
pub struct CondFormat {
    ranges: RangeList,
    pivot: bool,
    rules: BTreeMap<i32, CondRule>,
    ready: bool,
}

impl CondFormat {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Import the format declaration of the attribute encoding (`sqref`,
    /// `pivot`). The range set is fixed from here on; only deduplication may
    /// extend it.
    pub fn import_cond_formatting(&mut self, attrs: &AttributeMap) {
        self.ranges = RangeList::parse_sqref(attrs.get("sqref").unwrap_or(""));
        self.pivot = attrs.get_bool("pivot").unwrap_or(false);
        self.ready = true;
    }

    /// Import the format declaration record of the binary encoding: rule
    /// count (`u32`), pivot flag (`u32`), range list.
    pub fn import_cond_formatting_record(&mut self, data: &[u8]) -> Result<()> {
        let mut offset = 0usize;
        let _rule_count = record::read_u32(data, &mut offset)?;
        let pivot = record::read_u32(data, &mut offset)?;
        self.ranges = record::read_range_list(data, &mut offset)?;
        self.pivot = pivot != 0;
        self.ready = true;
        Ok(())
    }

    /// Insert a rule keyed by its priority. Rules without a positive
    /// priority are never inserted directly; they only enter through the
    /// buffer's priority-assignment pass. A duplicate priority keeps the
    /// first rule.
    pub fn insert_rule(&mut self, rule: CondRule) {
        if rule.priority <= 0 {
            log::warn!(
                "rule with unassigned priority {} not inserted",
                rule.priority
            );
            return;
        }
        self.rules.entry(rule.priority).or_insert(rule);
    }

    /// The range set this format covers
    pub fn ranges(&self) -> &RangeList {
        &self.ranges
    }

    /// Whether this format belongs to a pivot table
    pub fn pivot(&self) -> bool {
        self.pivot
    }

    /// Number of rules
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// Whether the format has no rules
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Iterate the rules in priority order
    pub fn rules(&self) -> impl Iterator<Item = &CondRule> {
        self.rules.values()
    }

    /// Merge another format's ranges into this one (deduplication)
    pub(crate) fn merge_ranges(&mut self, other: &RangeList) {
        self.ranges.merge(other);
    }

    /// Look up a rule by its priority key (extension patching)
    pub(crate) fn rule_by_priority_mut(&mut self, priority: i32) -> Option<&mut CondRule> {
        self.rules.get_mut(&priority)
    }

    /// The smallest rule priority, or `None` for an empty format
    pub(crate) fn min_priority(&self) -> Option<i32> {
        self.rules.keys().next().copied()
    }

    /// The largest rule priority, or `None` for an empty format
    pub(crate) fn max_priority(&self) -> Option<i32> {
        self.rules.keys().next_back().copied()
    }

    /// Structural equality for deduplication: the pivot flag and the full
    /// rule sequence must match. Range sets are deliberately excluded.
    pub(crate) fn structurally_equal(&self, other: &Self, styles: &dyn StyleResolver) -> bool {
        self.pivot == other.pivot
            && self.rules.len() == other.rules.len()
            && self
                .rules
                .values()
                .zip(other.rules.values())
                .all(|(a, b)| a.structurally_equal(b, styles))
    }

    /// Bucketing key for deduplication: structurally equal formats always
    /// hash alike.
    pub(crate) fn dedup_key(&self) -> u64 {
        let mut hasher = AHasher::default();
        hasher.write_u8(self.pivot as u8);
        hasher.write_usize(self.rules.len());
        for rule in self.rules.values() {
            rule.hash_structure(&mut hasher);
        }
        hasher.finish()
    }

    /// Finalize: convert every rule and register with the host document.
    ///
    /// A no-op unless the format declaration was seen. Registration happens
    /// only when at least one rule produced an entry; the returned
    /// association feeds the buffer's range-to-index table.
    pub(crate) fn finalize(
        self,
        sheet: u32,
        sink: &mut dyn DocumentSink,
        styles: &mut dyn StyleResolver,
        tokenizer: &mut dyn FormulaTokenizer,
    ) -> Option<(RangeList, FormatIndex)> {
        if !self.ready {
            return None;
        }

        let anchor = self.ranges.first_cell().unwrap_or(CellAddress::new(0, 0));

        let mut entries = Vec::with_capacity(self.rules.len());
        for (_, rule) in self.rules {
            if let Some(entry) = rule.into_entry(anchor, styles, tokenizer) {
                entries.push(entry);
            }
        }

        if entries.is_empty() {
            return None;
        }

        let index = sink.add_conditional_format(sheet, &self.ranges);
        for entry in entries {
            sink.add_entry(index, entry);
        }
        sink.add_cond_format_data(sheet, &self.ranges, index);

        Some((self.ranges, index))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entry::FormatEntry;
    use crate::testutil::{PlainStyles, RecordingSink, TextTokens};

    fn declared(sqref: &str) -> CondFormat {
        let mut format = CondFormat::new();
        format.import_cond_formatting(&AttributeMap::from_pairs([("sqref", sqref)]));
        format
    }

    fn rule(priority: i32, formula: &str) -> CondRule {
        let priority = priority.to_string();
        let mut rule = CondRule::from_attrs(&AttributeMap::from_pairs([
            ("type", "cellIs"),
            ("operator", "greaterThan"),
            ("priority", priority.as_str()),
        ]));
        rule.append_formula(formula);
        rule
    }

    #[test]
    fn test_insert_rejects_unassigned_priority() {
        let mut format = declared("A1:A5");
        format.insert_rule(rule(-1, "1"));
        format.insert_rule(rule(0, "2"));
        assert!(format.is_empty());
    }

    #[test]
    fn test_duplicate_priority_keeps_first() {
        let mut format = declared("A1:A5");
        format.insert_rule(rule(2, "first"));
        format.insert_rule(rule(2, "second"));
        assert_eq!(format.len(), 1);
        let kept = format.rules().next().unwrap();
        assert_eq!(
            kept.formulas,
            vec![crate::rule::RawFormula::Text("first".into())]
        );
    }

    #[test]
    fn test_rules_iterate_in_priority_order() {
        let mut format = declared("A1");
        format.insert_rule(rule(7, "a"));
        format.insert_rule(rule(2, "b"));
        format.insert_rule(rule(5, "c"));
        let priorities: Vec<i32> = format.rules().map(|r| r.priority).collect();
        assert_eq!(priorities, vec![2, 5, 7]);
        assert_eq!(format.min_priority(), Some(2));
        assert_eq!(format.max_priority(), Some(7));
    }

    #[test]
    fn test_finalize_requires_declaration() {
        let mut format = CondFormat::new();
        format.insert_rule(rule(1, "1"));

        let mut sink = RecordingSink::default();
        let result = format.finalize(0, &mut sink, &mut PlainStyles, &mut TextTokens);
        assert!(result.is_none());
        assert!(sink.formats.is_empty());
    }

    #[test]
    fn test_finalize_skips_empty_formats() {
        let format = declared("A1:A5");
        let mut sink = RecordingSink::default();
        assert!(format
            .finalize(0, &mut sink, &mut PlainStyles, &mut TextTokens)
            .is_none());
        assert!(sink.formats.is_empty());
    }

    #[test]
    fn test_finalize_registers_and_associates() {
        let mut format = declared("B2:B9");
        format.insert_rule(rule(1, "10"));

        let mut sink = RecordingSink::default();
        let (ranges, index) = format
            .finalize(3, &mut sink, &mut PlainStyles, &mut TextTokens)
            .unwrap();
        assert_eq!(ranges.to_sqref_string(), "B2:B9");

        let recorded = &sink.formats[index.0 as usize];
        assert_eq!(recorded.sheet, 3);
        assert_eq!(recorded.entries.len(), 1);
        assert!(recorded.data_set);
        assert!(matches!(recorded.entries[0], FormatEntry::Condition(_)));
    }

    #[test]
    fn test_binary_declaration() {
        let mut data = Vec::new();
        data.extend_from_slice(&1u32.to_le_bytes()); // rule count
        data.extend_from_slice(&0u32.to_le_bytes()); // pivot
        data.extend_from_slice(&1u32.to_le_bytes()); // one range
        for v in [0u32, 9, 0, 0] {
            data.extend_from_slice(&v.to_le_bytes());
        }

        let mut format = CondFormat::new();
        format.import_cond_formatting_record(&data).unwrap();
        assert_eq!(format.ranges().to_sqref_string(), "A1:A10");
        assert!(!format.pivot());
    }

    #[test]
    fn test_structural_equality_ignores_ranges() {
        let mut a = declared("A1:A5");
        let mut b = declared("Z9");
        a.insert_rule(rule(1, "5"));
        b.insert_rule(rule(1, "5"));

        assert!(a.structurally_equal(&b, &PlainStyles));
        assert_eq!(a.dedup_key(), b.dedup_key());

        let mut c = declared("A1:A5");
        c.insert_rule(rule(1, "6"));
        assert!(!a.structurally_equal(&c, &PlainStyles));
    }
}
