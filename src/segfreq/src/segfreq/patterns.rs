use std::collections::BTreeMap;

use ahash::AHashMap;

use crate::posna::PosNA;
use crate::segment::Segment;

use super::SegFreq;

/// A local haplotype recovered by chaining overlapping segments.
#[derive(Debug, Clone, PartialEq)]
pub struct Pattern {
    pub nodes: Vec<PosNA>,
    pub count: u64,
    /// Fraction of the column support backing this pattern. May exceed 1.0
    /// when two seeds converge on the same node set and their support
    /// accumulates.
    pub fraction: f64,
}

#[derive(Debug, Clone, Copy, Default)]
struct Support {
    pcnt: i64,
    count: i64,
}

impl SegFreq {
    /// Extract up to `top_n_seeds` haplotype patterns supported between
    /// `pos_start` and `pos_end` (all patterns when `top_n_seeds < 1`),
    /// ordered by descending fractional support.
    ///
    /// Each iteration seeds from the best supported masked window segment,
    /// chains left and right through the `segment_size - segment_step`
    /// position overlaps, subtracts the chain's minimum support from every
    /// window it used, and prunes exhausted entries.
    #[must_use]
    pub fn get_patterns(&self, pos_start: u64, pos_end: u64, top_n_seeds: i64) -> Vec<Pattern> {
        let step = self.segment_step() as u64;
        let size = self.segment_size() as u64;

        // Window bounds, from stored anchors: the closest anchor within one
        // step at or below pos_start, and the closest anchor within one step
        // at or above the last full-window anchor.
        let lo = self
            .segments()
            .range(pos_start.saturating_sub(step - 1)..=pos_start)
            .next_back()
            .map_or(pos_start, |(anchor, _)| *anchor);
        let hi_base = (pos_end + 1).saturating_sub(size).max(lo);
        let hi = self
            .segments()
            .range(hi_base..hi_base + step)
            .next()
            .map_or(hi_base, |(anchor, _)| *anchor)
            .max(lo);

        // Masked support per anchor, tracked both in raw counts and in
        // per-ten-thousand parts of the column total.
        let mut by_pos: BTreeMap<u64, AHashMap<Segment, Support>> = BTreeMap::new();
        for (&anchor, pos_segments) in self.segments().range(lo..=hi) {
            let total: u64 = pos_segments.values().sum();
            if total == 0 {
                continue;
            }
            let masked = by_pos.entry(anchor).or_default();
            for (segment, &count) in pos_segments {
                let entry = masked.entry(segment.masked(pos_start, pos_end)).or_default();
                entry.pcnt += (count * 10_000 / total) as i64;
                entry.count += count as i64;
            }
        }

        let mut patterns: AHashMap<Vec<PosNA>, Support> = AHashMap::new();
        loop {
            if top_n_seeds >= 1 && patterns.len() >= top_n_seeds as usize {
                break;
            }
            let Some((seed_pos, seed_segment, mut pattern_pcnt)) = best_seed(&by_pos) else {
                break;
            };
            let mut pattern_count = by_pos[&seed_pos][&seed_segment].count;
            let mut selected: Vec<(u64, Segment)> = vec![(seed_pos, seed_segment.clone())];

            // Extend leftward.
            let mut prev = seed_segment.clone();
            let mut pos = seed_pos;
            while pos >= lo + step {
                pos -= step;
                let Some(found) = best_continuation(&by_pos, pos, |candidate| {
                    Segment::is_continuous(candidate, &prev, self.segment_step())
                }) else {
                    break;
                };
                let (segment, support) = found;
                pattern_pcnt = pattern_pcnt.min(support.pcnt);
                pattern_count = pattern_count.min(support.count);
                selected.push((pos, segment.clone()));
                prev = segment;
            }

            // Extend rightward.
            prev = seed_segment;
            pos = seed_pos;
            while pos + step <= hi {
                pos += step;
                let Some(found) = best_continuation(&by_pos, pos, |candidate| {
                    Segment::is_continuous(&prev, candidate, self.segment_step())
                }) else {
                    break;
                };
                let (segment, support) = found;
                pattern_pcnt = pattern_pcnt.min(support.pcnt);
                pattern_count = pattern_count.min(support.count);
                selected.push((pos, segment.clone()));
                prev = segment;
            }

            // Collect the chain's nodes and withdraw its support.
            let mut node_map: BTreeMap<(u64, u16), PosNA> = BTreeMap::new();
            for (anchor, segment) in &selected {
                for node in segment.real_nodes() {
                    if node.pos < pos_start || node.pos > pos_end {
                        continue;
                    }
                    node_map.insert((node.pos, node.bp), *node);
                }
                let pos_segments = by_pos
                    .get_mut(anchor)
                    .expect("selected anchor vanished from support index");
                if let Some(entry) = pos_segments.get_mut(segment) {
                    entry.pcnt -= pattern_pcnt;
                    entry.count -= pattern_count;
                    if entry.count <= 0 {
                        pos_segments.remove(segment);
                    }
                }
            }

            let nodes: Vec<PosNA> = node_map.into_values().collect();
            if !nodes.is_empty() {
                let entry = patterns.entry(nodes).or_default();
                entry.pcnt += pattern_pcnt;
                entry.count += pattern_count;
            }
        }

        let mut result: Vec<(Vec<PosNA>, Support)> = patterns.into_iter().collect();
        result.sort_by(|a, b| b.1.pcnt.cmp(&a.1.pcnt).then_with(|| a.0.cmp(&b.0)));
        result
            .into_iter()
            .map(|(nodes, support)| Pattern {
                nodes,
                count: support.count.max(0) as u64,
                fraction: support.pcnt as f64 / 10_000.0,
            })
            .collect()
    }
}

/// Highest supported `(anchor, segment)` seed; ties break toward the
/// smallest anchor, then the smallest segment, keeping extraction
/// deterministic.
fn best_seed(
    by_pos: &BTreeMap<u64, AHashMap<Segment, Support>>,
) -> Option<(u64, Segment, i64)> {
    let mut best: Option<(u64, &Segment, Support)> = None;
    for (&anchor, pos_segments) in by_pos {
        for (segment, support) in pos_segments {
            let better = match &best {
                None => true,
                Some((best_anchor, best_segment, best_support)) => {
                    support.pcnt > best_support.pcnt
                        || (support.pcnt == best_support.pcnt
                            && (anchor, segment) < (*best_anchor, *best_segment))
                }
            };
            if better {
                best = Some((anchor, segment, *support));
            }
        }
    }
    best.map(|(anchor, segment, support)| (anchor, segment.clone(), support.pcnt))
}

/// Most supported segment at `anchor` satisfying the continuity predicate.
fn best_continuation<F>(
    by_pos: &BTreeMap<u64, AHashMap<Segment, Support>>,
    anchor: u64,
    is_continuous: F,
) -> Option<(Segment, Support)>
where
    F: Fn(&Segment) -> bool,
{
    let pos_segments = by_pos.get(&anchor)?;
    let mut ordered: Vec<(&Segment, &Support)> = pos_segments.iter().collect();
    ordered.sort_by(|a, b| b.1.pcnt.cmp(&a.1.pcnt).then_with(|| a.0.cmp(b.0)));
    ordered
        .into_iter()
        .find(|(segment, _)| is_continuous(segment))
        .map(|(segment, support)| (segment.clone(), *support))
}
