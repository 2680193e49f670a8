//! The per-sheet buffer and orchestrator.
//!
//! All conditional format blocks of one sheet accumulate here, in import
//! order, together with the extension blocks that refine or supplement them.
//! [`CondFormatBuffer::finalize`] runs the commit pipeline: deduplicate,
//! index, cross-merge, sort, register, then apply leftover extensions. No
//! step fails; malformed pieces degrade and are logged.

use ahash::AHashMap;

use crate::attrs::AttributeMap;
use crate::cell::{CellAddress, RangeList};
use crate::extension::{ExtFormat, ExtPatch, ExtTarget};
use crate::format::CondFormat;
use crate::host::{DocumentSink, FormatIndex, FormulaTokenizer, StyleResolver};
use crate::rule::CondRule;

/// Index of a format block in the buffer's import order
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct FormatSlot(usize);

/// Owns every conditional format of one sheet until commit
#[derive(Debug, Default)]
pub struct CondFormatBuffer {
    sheet: u32,
    formats: Vec<CondFormat>,
    standalone: Vec<CondRule>,
    ext_formats: Vec<ExtFormat>,
    ext_targets: AHashMap<String, ExtTarget>,
    ext_patches: Vec<(ExtTarget, ExtPatch)>,
}

impl CondFormatBuffer {
    /// Create the buffer for one sheet
    pub fn new(sheet: u32) -> Self {
        Self {
            sheet,
            ..Self::default()
        }
    }

    /// The sheet this buffer belongs to
    pub fn sheet(&self) -> u32 {
        self.sheet
    }

    /// Begin a format block from the attribute encoding's declaration event
    pub fn import_cond_formatting(&mut self, attrs: &AttributeMap) -> FormatSlot {
        let mut format = CondFormat::new();
        format.import_cond_formatting(attrs);
        self.push_format(format)
    }

    /// Begin a format block from the binary encoding's declaration record.
    /// A malformed record still opens a (never-registered) block so that the
    /// rules following it have somewhere to go.
    pub fn import_cond_formatting_record(&mut self, data: &[u8]) -> FormatSlot {
        let mut format = CondFormat::new();
        if let Err(e) = format.import_cond_formatting_record(data) {
            log::warn!("bad conditional formatting record: {e}");
        }
        self.push_format(format)
    }

    fn push_format(&mut self, format: CondFormat) -> FormatSlot {
        self.formats.push(format);
        FormatSlot(self.formats.len() - 1)
    }

    /// Attach a finished rule to a format block
    pub fn append_rule(&mut self, slot: FormatSlot, rule: CondRule) {
        match self.formats.get_mut(slot.0) {
            Some(format) => format.insert_rule(rule),
            None => {
                log::warn!("rule references unknown format slot {}", slot.0);
                self.standalone.push(rule);
            }
        }
    }

    /// Record a rule that arrived outside any format block (binary path
    /// only). Such rules are finalized for their side effects but carry no
    /// ranges to register under.
    pub fn append_standalone_rule(&mut self, rule: CondRule) {
        self.standalone.push(rule);
    }

    /// The format block at `slot`, if it exists
    pub fn format(&self, slot: FormatSlot) -> Option<&CondFormat> {
        self.formats.get(slot.0)
    }

    /// Number of format blocks imported so far
    pub fn format_count(&self) -> usize {
        self.formats.len()
    }

    /// Associate a wire-level extension id with the rule it refines
    pub fn register_ext_id(&mut self, id: &str, slot: FormatSlot, priority: i32) {
        self.ext_targets.insert(
            id.to_string(),
            ExtTarget {
                slot: slot.0,
                priority,
            },
        );
    }

    /// Resolve a wire-level extension id registered by the primary path
    pub fn ext_target(&self, id: &str) -> Option<ExtTarget> {
        self.ext_targets.get(id).copied()
    }

    /// Queue a patch against a previously registered target. Patches apply
    /// during finalize, after deduplication has settled rule ownership.
    pub fn push_ext_patch(&mut self, target: ExtTarget, patch: ExtPatch) {
        self.ext_patches.push((target, patch));
    }

    /// Queue a standalone extension container
    pub fn push_ext_format(&mut self, ext: ExtFormat) {
        self.ext_formats.push(ext);
    }

    /// Commit everything to the host document.
    ///
    /// Pipeline order matters: (1) deduplicate structurally identical
    /// blocks, merging their ranges; (2) index survivors by exact range
    /// set; (3) merge range-matched extension containers, assigning
    /// priorities from a counter seeded above the largest explicit one;
    /// (4) stable-sort by minimum rule priority; (5) register survivors and
    /// finalize standalone rules; (6) apply extension containers nothing
    /// matched.
    pub fn finalize(
        mut self,
        sink: &mut dyn DocumentSink,
        styles: &mut dyn StyleResolver,
        tokenizer: &mut dyn FormulaTokenizer,
    ) {
        let format_count = self.formats.len();
        let mut slots: Vec<Option<CondFormat>> =
            std::mem::take(&mut self.formats).into_iter().map(Some).collect();
        let mut remap: Vec<usize> = (0..format_count).collect();

        // Step 1: deduplicate. Identical rule blocks repeated across
        // thousands of ranges are common in real files, so candidates are
        // pre-bucketed by a structural hash before the deep comparison.
        let mut buckets: AHashMap<u64, Vec<usize>> = AHashMap::new();
        for (index, format) in slots.iter().enumerate() {
            if let Some(format) = format {
                buckets.entry(format.dedup_key()).or_default().push(index);
            }
        }

        for bucket in buckets.values() {
            for (position, &survivor_index) in bucket.iter().enumerate() {
                if slots[survivor_index].is_none() {
                    continue;
                }
                for &candidate_index in &bucket[position + 1..] {
                    let equal = match (&slots[survivor_index], &slots[candidate_index]) {
                        (Some(survivor), Some(candidate)) => {
                            survivor.structurally_equal(candidate, styles)
                        }
                        _ => false,
                    };
                    if !equal {
                        continue;
                    }
                    if let Some(duplicate) = slots[candidate_index].take() {
                        if let Some(survivor) = slots[survivor_index].as_mut() {
                            survivor.merge_ranges(duplicate.ranges());
                            remap[candidate_index] = survivor_index;
                        }
                    }
                }
            }
        }

        // Extension patches resolve through the merge table, so a patch
        // whose rule was deduplicated away re-targets the survivor.
        for (target, patch) in std::mem::take(&mut self.ext_patches) {
            let resolved = remap.get(target.slot).copied().unwrap_or(target.slot);
            let rule = slots
                .get_mut(resolved)
                .and_then(|slot| slot.as_mut())
                .and_then(|format| format.rule_by_priority_mut(target.priority));
            match rule {
                Some(rule) => patch.apply(rule),
                None => log::warn!(
                    "extension patch target (slot {}, priority {}) no longer exists, dropping",
                    target.slot,
                    target.priority
                ),
            }
        }

        // Step 2: index survivors by exact range set.
        let mut by_ranges: AHashMap<RangeList, usize> = AHashMap::new();
        for (index, format) in slots.iter().enumerate() {
            if let Some(format) = format {
                by_ranges.entry(format.ranges().clone()).or_insert(index);
            }
        }

        // Step 3: cross-merge range-matched extension containers. The
        // priority counter is seeded above every explicit priority seen and
        // advances once per unassigned-priority entry, in container order.
        let mut next_priority = slots
            .iter()
            .flatten()
            .filter_map(|format| format.max_priority())
            .chain(self.standalone.iter().map(|rule| rule.priority))
            .chain(
                self.ext_formats
                    .iter()
                    .flat_map(|ext| ext.entries.iter().map(|(_, priority)| *priority)),
            )
            .max()
            .unwrap_or(0)
            .max(0)
            + 1;

        let mut unmatched: Vec<ExtFormat> = Vec::new();
        for ext in std::mem::take(&mut self.ext_formats) {
            let Some(&index) = by_ranges.get(&ext.ranges) else {
                unmatched.push(ext);
                continue;
            };
            let Some(format) = slots[index].as_mut() else {
                unmatched.push(ext);
                continue;
            };
            for (entry, priority) in ext.entries {
                let priority = if priority > 0 {
                    priority
                } else {
                    let assigned = next_priority;
                    next_priority += 1;
                    assigned
                };
                format.insert_rule(CondRule::from_entry(entry, priority));
            }
        }

        // Step 4: the host applies formats in registration order, so order
        // survivors by their smallest declared priority. Blocks that lost
        // every rule sort last.
        let mut survivors: Vec<CondFormat> = slots.into_iter().flatten().collect();
        survivors.sort_by_key(|format| format.min_priority().unwrap_or(i32::MAX));

        // Step 5: register survivors, then finalize standalone rules.
        let mut associations: Vec<(RangeList, FormatIndex)> = Vec::new();
        for format in survivors {
            if let Some(association) = format.finalize(self.sheet, sink, styles, tokenizer) {
                associations.push(association);
            }
        }

        for rule in std::mem::take(&mut self.standalone) {
            // Style and formula resolution still run for these; with no
            // ranges there is nowhere to register the result.
            if rule
                .into_entry(CellAddress::new(0, 0), styles, tokenizer)
                .is_some()
            {
                log::debug!("standalone rule finalized outside any formatting block");
            }
        }

        // Step 6: leftover extension containers either join the registered
        // format at the same range or become formats of their own.
        for ext in unmatched {
            if ext.entries.is_empty() {
                continue;
            }
            let existing = associations
                .iter()
                .find(|(ranges, _)| ranges == &ext.ranges)
                .map(|(_, index)| *index);
            match existing {
                Some(index) => {
                    for (entry, _) in ext.entries {
                        sink.add_entry(index, entry);
                    }
                }
                None => {
                    let index = sink.add_conditional_format(self.sheet, &ext.ranges);
                    for (entry, _) in ext.entries {
                        sink.add_entry(index, entry);
                    }
                    sink.add_cond_format_data(self.sheet, &ext.ranges, index);
                    associations.push((ext.ranges, index));
                }
            }
        }
    }
}
