use crate::posna::PosNA;
use crate::segfreq::SegFreqError;

/// A fixed window of observations drawn from one read.
///
/// Each slot holds either a [`PosNA`] or `None` when the reference position
/// was not observed by the read. Insertion slots (`bp > 0`) sit right after
/// the slot of their base position, so a segment may carry more slots than
/// the `segment_size` reference positions it spans.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Segment {
    nodes: Vec<Option<PosNA>>,
}

impl Segment {
    #[must_use]
    pub fn new(nodes: Vec<Option<PosNA>>) -> Self {
        Self { nodes }
    }

    #[must_use]
    pub fn nodes(&self) -> &[Option<PosNA>] {
        &self.nodes
    }

    /// Reference coordinate of the segment's first slot, derived from the
    /// first real node: a node at slot offset `i` anchors the segment at
    /// `node.pos - i`.
    ///
    /// # Errors
    /// [`SegFreqError::MalformedSegment`] when every slot is `None`, when the
    /// leading node is insertion-only, or when the anchor would fall before
    /// the first reference position.
    pub fn position(&self) -> Result<u64, SegFreqError> {
        for (idx, node) in self.nodes.iter().enumerate() {
            if let Some(node) = node {
                if node.bp != 0 {
                    return Err(SegFreqError::MalformedSegment);
                }
                return (node.pos)
                    .checked_sub(idx as u64)
                    .filter(|pos| *pos > 0)
                    .ok_or(SegFreqError::MalformedSegment);
            }
        }
        Err(SegFreqError::MalformedSegment)
    }

    /// Drop the first `n` reference positions (their insertion slots travel
    /// with them). `None` when the segment spans `n` positions or fewer.
    #[must_use]
    pub fn strip_leading_positions(&self, n: usize) -> Option<&[Option<PosNA>]> {
        let mut seen = 0;
        for (idx, node) in self.nodes.iter().enumerate() {
            if node.map_or(true, |node| node.bp == 0) {
                seen += 1;
            }
            if seen > n {
                return Some(&self.nodes[idx..]);
            }
        }
        None
    }

    /// Drop the last `n` reference positions. `None` when the segment spans
    /// fewer than `n` positions.
    #[must_use]
    pub fn strip_trailing_positions(&self, n: usize) -> Option<&[Option<PosNA>]> {
        let mut seen = 0;
        for (idx, node) in self.nodes.iter().rev().enumerate() {
            if node.map_or(true, |node| node.bp == 0) {
                seen += 1;
            }
            if seen == n {
                return Some(&self.nodes[..self.nodes.len() - idx - 1]);
            }
        }
        None
    }

    /// Whether `right`, anchored `segment_step` positions after `left`,
    /// describes the same local haplotype: the two windows must agree on
    /// every slot of their `segment_size - segment_step` position overlap.
    #[must_use]
    pub fn is_continuous(left: &Segment, right: &Segment, segment_step: usize) -> bool {
        match (
            left.strip_leading_positions(segment_step),
            right.strip_trailing_positions(segment_step),
        ) {
            (Some(suffix), Some(prefix)) => suffix == prefix,
            _ => false,
        }
    }

    /// Copy of this segment with every node outside `[min_pos, max_pos]`
    /// blanked to `None`.
    #[must_use]
    pub fn masked(&self, min_pos: u64, max_pos: u64) -> Segment {
        Segment::new(
            self.nodes
                .iter()
                .map(|node| node.filter(|n| (min_pos..=max_pos).contains(&n.pos)))
                .collect(),
        )
    }

    /// Iterate over the real (non-`None`) nodes.
    pub fn real_nodes(&self) -> impl Iterator<Item = &PosNA> {
        self.nodes.iter().flatten()
    }
}
