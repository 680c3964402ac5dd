use ahash::AHashMap;

use segfreq::{PosNA, Segment};

/// Slide a read's observation stream into anchored segments.
///
/// Anchors run from the window owning the read's first position through the
/// window owning its last, stepping by `segment_step`; every window gets one
/// segment. Positions the read does not cover (outside the read, or removed
/// by quality filtering) hold `None`; insertion observations stay adjacent
/// to their base position. Windows left without a single real observation
/// are not emitted.
#[must_use]
pub fn read_segments(posnas: &[PosNA], segment_size: usize, segment_step: usize) -> Vec<Segment> {
    let Some(first) = posnas.first().map(|node| node.pos) else {
        return Vec::new();
    };
    let last = posnas
        .last()
        .map(|node| node.pos)
        .unwrap_or(first);
    let step = segment_step as u64;

    let mut groups: AHashMap<u64, Vec<PosNA>> = AHashMap::new();
    for node in posnas {
        groups.entry(node.pos).or_default().push(*node);
    }

    let mut segments: Vec<Segment> = Vec::new();
    let mut anchor = first - (first - 1) % step;
    let last_anchor = last - (last - 1) % step;
    while anchor <= last_anchor {
        let mut nodes: Vec<Option<PosNA>> = Vec::with_capacity(segment_size);
        for pos in anchor..anchor + segment_size as u64 {
            match groups.get(&pos) {
                Some(group) => nodes.extend(group.iter().copied().map(Some)),
                None => nodes.push(None),
            }
        }
        if nodes.iter().any(Option::is_some) {
            segments.push(Segment::new(nodes));
        }
        anchor += step;
    }
    segments
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use segfreq::join_posnas;

    fn spell(start: u64, bases: &str) -> Vec<PosNA> {
        bases
            .bytes()
            .enumerate()
            .map(|(idx, na)| PosNA::new(start + idx as u64, 0, na))
            .collect()
    }

    #[test]
    fn windows_anchor_on_the_step_grid() {
        // Read covering 10..17 with size 6 / step 2: anchors 9, 11, 13, 15, 17.
        let segments = read_segments(&spell(10, "ACGTACGT"), 6, 2);
        assert_eq!(segments.len(), 5);
        assert_eq!(segments[0].position().unwrap(), 9);
        assert_eq!(join_posnas(segments[0].nodes()), ".ACGTA");
        assert_eq!(join_posnas(segments[1].nodes()), "CGTACG");
        assert_eq!(segments.last().unwrap().position().unwrap(), 17);
        assert_eq!(join_posnas(segments.last().unwrap().nodes()), "T.....");
    }

    #[test]
    fn every_covered_position_gets_window_coverage() {
        let segments = read_segments(&spell(10, "ACGTACGT"), 6, 2);
        // position 17 is owned by the window anchored at 17
        let covered: Vec<u64> = segments
            .iter()
            .map(|segment| segment.position().unwrap())
            .collect();
        assert_eq!(covered, vec![9, 11, 13, 15, 17]);
    }

    #[test]
    fn short_read_yields_single_padded_window() {
        let segments = read_segments(&spell(5, "ACG"), 12, 4);
        assert_eq!(segments.len(), 1);
        assert_eq!(segments[0].position().unwrap(), 5);
        assert_eq!(join_posnas(segments[0].nodes()), "ACG.........");
    }

    #[test]
    fn insertions_travel_with_their_base_position() {
        let mut posnas = spell(5, "AC");
        posnas.insert(2, PosNA::new(6, 1, b'T'));
        posnas.extend(spell(7, "GT"));
        let segments = read_segments(&posnas, 6, 2);
        assert_eq!(join_posnas(segments[0].nodes()), "ACTGT..");
        assert_eq!(segments[0].nodes().len(), 7);
    }

    #[test]
    fn filtered_positions_leave_gaps() {
        // Quality filtering removed position 7.
        let mut posnas = spell(5, "AC");
        posnas.extend(spell(8, "TA"));
        let segments = read_segments(&posnas, 6, 2);
        assert_eq!(join_posnas(segments[0].nodes()), "AC.TA.");
    }

    #[test]
    fn empty_stream_yields_no_segments() {
        assert!(read_segments(&[], 6, 2).is_empty());
    }
}
