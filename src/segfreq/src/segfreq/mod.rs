use std::collections::BTreeMap;

use ahash::AHashMap;

use crate::segment::Segment;

pub mod error;
pub use error::SegFreqError;

mod consensus;
mod patterns;
mod persist;
pub use patterns::Pattern;

/// Per-fragment multiset of overlapping read segments.
///
/// Segments are indexed by their anchor (the reference coordinate of their
/// first slot) and counted per distinct window content. All downstream
/// queries are served from this single structure: codon/n-gram frequencies,
/// per-position nucleotide counts, majority consensus and local haplotype
/// patterns.
#[derive(Debug, Clone)]
pub struct SegFreq {
    segment_size: usize,
    segment_step: usize,
    segments: BTreeMap<u64, AHashMap<Segment, u64>>,
    max_segpos: u64,
}

impl SegFreq {
    /// Instantiate an empty index.
    ///
    /// # Errors
    /// [`SegFreqError::InvalidGeometry`] unless `segment_step >= 1` and
    /// `segment_size >= segment_step + 2`. The two-position overlap between
    /// neighboring windows is what makes pattern chaining well-defined.
    pub fn new(segment_size: usize, segment_step: usize) -> Result<Self, SegFreqError> {
        if segment_step < 1 || segment_size < segment_step + 2 {
            return Err(SegFreqError::InvalidGeometry { segment_size, segment_step });
        }
        Ok(Self {
            segment_size,
            segment_step,
            segments: BTreeMap::new(),
            max_segpos: 0,
        })
    }

    #[must_use]
    pub fn segment_size(&self) -> usize {
        self.segment_size
    }

    #[must_use]
    pub fn segment_step(&self) -> usize {
        self.segment_step
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Total number of segment observations (reads × windows).
    #[must_use]
    pub fn total_count(&self) -> u64 {
        self.segments.values().flat_map(|counts| counts.values()).sum()
    }

    pub(crate) fn segments(&self) -> &BTreeMap<u64, AHashMap<Segment, u64>> {
        &self.segments
    }

    /// Anchor of the window owning `pos`.
    pub(crate) fn anchor_of(&self, pos: u64) -> u64 {
        if pos == 0 {
            return 0;
        }
        pos - (pos - 1) % self.segment_step as u64
    }

    /// Record `count` observations of `segment`.
    ///
    /// # Errors
    /// [`SegFreqError::MalformedSegment`] when the segment's anchor cannot
    /// be located.
    pub fn add(&mut self, segment: Segment, count: u64) -> Result<(), SegFreqError> {
        let pos = segment.position()?;
        *self
            .segments
            .entry(pos)
            .or_default()
            .entry(segment)
            .or_insert(0) += count;
        self.max_segpos = self.max_segpos.max(pos);
        Ok(())
    }

    /// Fold every counted segment of `other` into this index.
    ///
    /// # Errors
    /// [`SegFreqError::IncompatibleSegFreq`] when the two indexes were built
    /// with different window geometries.
    pub fn merge(&mut self, other: SegFreq) -> Result<(), SegFreqError> {
        if self.segment_size != other.segment_size || self.segment_step != other.segment_step {
            return Err(SegFreqError::IncompatibleSegFreq);
        }
        for (pos, pos_segments) in other.segments {
            let target = self.segments.entry(pos).or_default();
            for (segment, count) in pos_segments {
                *target.entry(segment).or_insert(0) += count;
            }
            self.max_segpos = self.max_segpos.max(pos);
        }
        Ok(())
    }

    /// Count the base combinations observed at the given reference
    /// positions. Fewer than `na_size` positions are padded by successive
    /// `+1`s. Insertions falling between two requested positions are
    /// included, so a "codon" of three positions may span more than three
    /// bases.
    ///
    /// A request overshooting the last anchor reuses the final window;
    /// positions beyond the final window simply contribute nothing.
    ///
    /// # Errors
    /// [`SegFreqError::PositionsTooFarApart`] when the requested positions
    /// do not fit within a single window.
    pub fn get_frequency(
        &self,
        positions: &[u64],
        na_size: usize,
    ) -> Result<AHashMap<Vec<u8>, u64>, SegFreqError> {
        let mut counts: AHashMap<Vec<u8>, u64> = AHashMap::new();
        if positions.is_empty() {
            return Ok(counts);
        }
        let mut positions = positions.to_vec();
        while positions.len() < na_size {
            positions.push(positions[positions.len() - 1] + 1);
        }

        let min_pos = *positions.iter().min().unwrap_or(&1);
        let mut segpos = self.anchor_of(min_pos);
        if segpos > self.max_segpos {
            segpos = self.max_segpos;
        }
        let size = self.segment_size as u64;
        for &pos in &positions {
            if pos >= self.max_segpos + size {
                // beyond the final window: cannot be served, contributes nothing
                continue;
            }
            if pos < segpos || pos >= segpos + size {
                return Err(SegFreqError::PositionsTooFarApart);
            }
        }

        let Some(pos_segments) = self.segments.get(&segpos) else {
            return Ok(counts);
        };
        'segment: for (segment, &count) in pos_segments {
            let mut nas: Vec<u8> = Vec::with_capacity(positions.len());
            for &pos in &positions {
                let mut accessed = false;
                for node in segment.real_nodes() {
                    if node.pos == pos {
                        nas.push(node.na);
                        accessed = true;
                    } else if node.pos > pos {
                        break;
                    }
                }
                if !accessed {
                    continue 'segment;
                }
            }
            *counts.entry(nas).or_insert(0) += count;
        }
        Ok(counts)
    }

    /// Count every base (or indel) observed at exactly `pos`. Deletions
    /// surface as `-`; insertion runs surface as multi-byte keys.
    #[must_use]
    pub fn get_pos_nas(&self, pos: u64) -> AHashMap<Vec<u8>, u64> {
        let mut segpos = self.anchor_of(pos);
        if segpos > self.max_segpos {
            // the position lies beyond the last anchor: reuse the final window
            segpos = self.max_segpos;
        }
        let mut counts: AHashMap<Vec<u8>, u64> = AHashMap::new();
        let Some(pos_segments) = self.segments.get(&segpos) else {
            return counts;
        };
        for (segment, &count) in pos_segments {
            let nas: Vec<u8> = segment
                .real_nodes()
                .filter(|node| node.pos == pos)
                .map(|node| node.na)
                .collect();
            if !nas.is_empty() {
                *counts.entry(nas).or_insert(0) += count;
            }
        }
        counts
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::posna::PosNA;
    use pretty_assertions::assert_eq;

    /// Segment spelling `bases` with its first base at `start`, padded with
    /// leading `None` slots so the window anchors on the 1 (mod step) grid.
    pub(crate) fn spell(start: u64, bases: &str, size: usize, step: usize) -> Segment {
        let anchor = start - (start - 1) % step as u64;
        let lead = (start - anchor) as usize;
        let mut nodes: Vec<Option<PosNA>> = vec![None; lead];
        for (idx, na) in bases.bytes().enumerate() {
            nodes.push(Some(PosNA::new(start + idx as u64, 0, na)));
        }
        nodes.resize(size.max(nodes.len()), None);
        assert!(nodes.len() == size, "segment does not fit its window");
        Segment::new(nodes)
    }

    #[test]
    fn geometry_bounds() {
        assert!(SegFreq::new(6, 4).is_ok());  // size - step == 2
        assert!(SegFreq::new(5, 4).is_err()); // size - step == 1
        assert!(SegFreq::new(3, 0).is_err());
    }

    #[test]
    fn codon_frequency_query() {
        let mut segfreq = SegFreq::new(12, 4).unwrap();
        segfreq
            .add(spell(21563, "ATGTTTGTTT", 12, 4), 1377)
            .unwrap();
        let freq = segfreq.get_frequency(&[21563, 21564, 21565], 3).unwrap();
        assert_eq!(freq.len(), 1);
        assert_eq!(freq[&b"ATG".to_vec()], 1377);
    }

    #[test]
    fn frequency_pads_missing_positions() {
        let mut segfreq = SegFreq::new(12, 4).unwrap();
        segfreq.add(spell(21563, "ATGTTTGTTT", 12, 4), 7).unwrap();
        let freq = segfreq.get_frequency(&[21563], 3).unwrap();
        assert_eq!(freq[&b"ATG".to_vec()], 7);
    }

    #[test]
    fn frequency_includes_insertions_between_positions() {
        let mut segfreq = SegFreq::new(6, 2).unwrap();
        let nodes = vec![
            Some(PosNA::new(5, 0, b'A')),
            Some(PosNA::new(6, 0, b'C')),
            Some(PosNA::new(6, 1, b'X')),
            Some(PosNA::new(7, 0, b'G')),
            Some(PosNA::new(8, 0, b'T')),
            Some(PosNA::new(9, 0, b'T')),
            Some(PosNA::new(10, 0, b'T')),
        ];
        segfreq.add(Segment::new(nodes), 4).unwrap();
        let freq = segfreq.get_frequency(&[5, 6, 7], 3).unwrap();
        assert_eq!(freq[&b"ACXG".to_vec()], 4);
    }

    #[test]
    fn frequency_window_width_boundary() {
        let mut segfreq = SegFreq::new(12, 4).unwrap();
        segfreq.add(spell(1, "ACGTACGTACGT", 12, 4), 1).unwrap();
        segfreq.add(spell(13, "ACGTACGTACGT", 12, 4), 1).unwrap();
        // segment_size - 1 apart: fits within one window.
        assert!(segfreq.get_frequency(&[1, 12], 2).is_ok());
        // one more apart: cannot fit.
        assert!(matches!(
            segfreq.get_frequency(&[1, 13], 2),
            Err(SegFreqError::PositionsTooFarApart)
        ));
    }

    #[test]
    fn frequency_clamps_to_final_window() {
        // Requests overshooting the last anchor silently reuse the final
        // window rather than failing. Pinned here on purpose: downstream
        // end-of-fragment queries rely on it.
        let mut segfreq = SegFreq::new(12, 4).unwrap();
        segfreq.add(spell(9, "ACGTACGTACGT", 12, 4), 3).unwrap();
        let freq = segfreq.get_frequency(&[17, 18, 19], 3).unwrap();
        assert_eq!(freq[&b"ACG".to_vec()], 3);
    }

    #[test]
    fn pos_nas_counts_column() {
        let mut segfreq = SegFreq::new(12, 4).unwrap();
        segfreq.add(spell(21563, "ATGTTTGTTT", 12, 4), 1411).unwrap();
        segfreq.add(spell(21563, "GTGTTTGTTT", 12, 4), 2).unwrap();
        let nas = segfreq.get_pos_nas(21563);
        assert_eq!(nas[&b"A".to_vec()], 1411);
        assert_eq!(nas[&b"G".to_vec()], 2);

        // Column total equals the number of segments holding the position.
        let total: u64 = nas.values().sum();
        assert_eq!(total, 1413);
    }

    #[test]
    fn pos_nas_insertion_key() {
        let mut segfreq = SegFreq::new(6, 2).unwrap();
        let nodes = vec![
            Some(PosNA::new(5, 0, b'A')),
            Some(PosNA::new(6, 0, b'C')),
            Some(PosNA::new(6, 1, b'A')),
            Some(PosNA::new(7, 0, b'G')),
            Some(PosNA::new(8, 0, b'T')),
            Some(PosNA::new(9, 0, b'T')),
            Some(PosNA::new(10, 0, b'T')),
        ];
        segfreq.add(Segment::new(nodes), 9).unwrap();
        let nas = segfreq.get_pos_nas(6);
        assert_eq!(nas[&b"CA".to_vec()], 9);
    }

    #[test]
    fn merge_is_commutative_and_associative() {
        let seg_a = spell(1, "ACGTAC", 6, 2);
        let seg_b = spell(3, "GTACGT", 6, 2);
        let seg_c = spell(5, "ACGTAC", 6, 2);

        let build = |entries: &[(&Segment, u64)]| {
            let mut segfreq = SegFreq::new(6, 2).unwrap();
            for (segment, count) in entries {
                segfreq.add((*segment).clone(), *count).unwrap();
            }
            segfreq
        };
        let a = build(&[(&seg_a, 5)]);
        let b = build(&[(&seg_b, 3), (&seg_a, 1)]);
        let c = build(&[(&seg_c, 2)]);

        let mut left = a.clone();
        left.merge(b.clone()).unwrap();
        left.merge(c.clone()).unwrap();

        let mut right = c;
        right.merge(a).unwrap();
        right.merge(b).unwrap();

        assert_eq!(left.segments(), right.segments());
        assert_eq!(left.total_count(), 11);
    }

    #[test]
    fn merge_rejects_incompatible_geometry() {
        let mut a = SegFreq::new(6, 2).unwrap();
        let b = SegFreq::new(12, 4).unwrap();
        assert!(matches!(a.merge(b), Err(SegFreqError::IncompatibleSegFreq)));
    }

    #[test]
    fn add_rejects_empty_segment() {
        let mut segfreq = SegFreq::new(6, 2).unwrap();
        let segment = Segment::new(vec![None; 6]);
        assert!(matches!(
            segfreq.add(segment, 1),
            Err(SegFreqError::MalformedSegment)
        ));
    }
}
