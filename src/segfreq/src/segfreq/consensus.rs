use std::collections::BTreeMap;

use crate::posna::{merge_posnas, PosNA};
use crate::segment::Segment;

use super::SegFreq;

impl SegFreq {
    /// Reconstruct the consensus over `[pos_start, pos_end]` (inclusive).
    ///
    /// The result holds one entry per reference position (`None` where the
    /// position was never observed), plus one extra `Some` entry per
    /// consensus insertion slot.
    ///
    /// With `level >= 1.0` each window contributes its single most common
    /// segment. Below 1.0, segments are taken in descending count order
    /// until their cumulative fraction of the window total reaches `level`;
    /// the qualified observations of each `(pos, bp)` slot are combined
    /// into an IUPAC ambiguity code (a deletion among them forces `-`).
    #[must_use]
    pub fn get_consensus(
        &self,
        pos_start: u64,
        pos_end: u64,
        level: f64,
    ) -> Vec<Option<PosNA>> {
        let step = self.segment_step() as u64;
        let real_start = self.anchor_of(pos_start);
        let real_end = self.anchor_of(pos_end);

        // Qualified observations per (pos, bp) slot. Each window owns its
        // first `segment_step` positions.
        let mut buckets: BTreeMap<(u64, u16), Vec<PosNA>> = BTreeMap::new();
        let mut anchor = real_start;
        while anchor <= real_end {
            let pos_until = anchor + step;
            if let Some(pos_segments) = self.segments().get(&anchor) {
                let total: u64 = pos_segments.values().sum();
                let mut ordered: Vec<(&Segment, u64)> = pos_segments
                    .iter()
                    .map(|(segment, count)| (segment, *count))
                    .collect();
                ordered.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));

                let mut cumulative = 0_u64;
                for (segment, count) in ordered {
                    for node in segment.real_nodes() {
                        if node.pos >= pos_until || node.pos < pos_start || node.pos > pos_end {
                            continue;
                        }
                        let slot = buckets.entry((node.pos, node.bp)).or_default();
                        if !slot.contains(node) {
                            slot.push(*node);
                        }
                    }
                    cumulative += count;
                    if level >= 1.0 || cumulative as f64 >= level * total as f64 {
                        break;
                    }
                }
            }
            anchor += step;
        }

        let mut result: Vec<Option<PosNA>> = Vec::new();
        for pos in pos_start..=pos_end {
            let mut bp: u16 = 0;
            loop {
                match buckets.get(&(pos, bp)) {
                    Some(slot) => {
                        let merged = slot
                            .iter()
                            .copied()
                            .reduce(merge_posnas)
                            .unwrap_or(PosNA::new(pos, bp, b'N'));
                        result.push(Some(merged));
                    }
                    None => {
                        if bp == 0 {
                            result.push(None);
                        }
                        break;
                    }
                }
                bp += 1;
            }
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use crate::segfreq::tests::spell;
    use super::*;
    use crate::posna::join_posnas;
    use pretty_assertions::assert_eq;

    fn mixed_column() -> SegFreq {
        // One window whose first position splits A×70 / G×25 / C×5.
        let mut segfreq = SegFreq::new(12, 4).unwrap();
        segfreq.add(spell(1, "ACGTACGTACGT", 12, 4), 70).unwrap();
        segfreq.add(spell(1, "GCGTACGTACGT", 12, 4), 25).unwrap();
        segfreq.add(spell(1, "CCGTACGTACGT", 12, 4), 5).unwrap();
        segfreq
    }

    #[test]
    fn majority_consensus_takes_top_segment() {
        let segfreq = mixed_column();
        let consensus = segfreq.get_consensus(1, 1, 1.0);
        assert_eq!(consensus, vec![Some(PosNA::new(1, 0, b'A'))]);
    }

    #[test]
    fn seventy_percent_level_keeps_majority_base() {
        let segfreq = mixed_column();
        let consensus = segfreq.get_consensus(1, 1, 0.7);
        assert_eq!(consensus, vec![Some(PosNA::new(1, 0, b'A'))]);
    }

    #[test]
    fn ninety_five_percent_level_merges_to_iupac() {
        let segfreq = mixed_column();
        let consensus = segfreq.get_consensus(1, 1, 0.95);
        // A (70) + G (25) reach the level; C never qualifies.
        assert_eq!(consensus, vec![Some(PosNA::new(1, 0, b'R'))]);
    }

    #[test]
    fn single_position_window() {
        let mut segfreq = SegFreq::new(12, 4).unwrap();
        segfreq.add(spell(9, "ACGTACGTACGT", 12, 4), 8).unwrap();
        let consensus = segfreq.get_consensus(9, 9, 1.0);
        assert_eq!(consensus.len(), 1);
        assert_eq!(consensus[0], Some(PosNA::new(9, 0, b'A')));
    }

    #[test]
    fn unobserved_positions_yield_gaps() {
        let mut segfreq = SegFreq::new(12, 4).unwrap();
        segfreq.add(spell(9, "ACGT", 12, 4), 8).unwrap();
        // Positions 13..20 sit inside the window but were never observed;
        // positions 21.. have no window at all.
        let consensus = segfreq.get_consensus(9, 24, 1.0);
        assert_eq!(consensus.len(), 16);
        assert_eq!(join_posnas(&consensus), "ACGT............");
    }

    #[test]
    fn consensus_spans_multiple_windows() {
        let mut segfreq = SegFreq::new(12, 4).unwrap();
        segfreq.add(spell(1, "ACGTACGTACGT", 12, 4), 10).unwrap();
        segfreq.add(spell(5, "ACGTACGTACGT", 12, 4), 10).unwrap();
        segfreq.add(spell(9, "ACGTACGTACGT", 12, 4), 10).unwrap();
        let consensus = segfreq.get_consensus(1, 12, 1.0);
        assert_eq!(join_posnas(&consensus), "ACGTACGTACGT");
    }

    #[test]
    fn deletion_forces_gap_in_merged_slot() {
        let mut segfreq = SegFreq::new(12, 4).unwrap();
        segfreq.add(spell(1, "ACGTACGTACGT", 12, 4), 60).unwrap();
        segfreq.add(spell(1, "-CGTACGTACGT", 12, 4), 40).unwrap();
        let consensus = segfreq.get_consensus(1, 1, 0.99);
        assert_eq!(consensus, vec![Some(PosNA::new(1, 0, b'-'))]);
    }
}
