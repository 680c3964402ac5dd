use ahash::AHashMap;

use crate::assemble::GAP;
use crate::error::CodonAlignError;

/// Default gap re-placement window, in codons.
pub const CODON_ALIGN_WINDOW_SIZE: usize = 10;
/// Default minimal distance (nucleotides) below which two distinct gap runs
/// are never merged.
pub const CODON_ALIGN_MIN_GAP_DISTANCE: usize = 30;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IndelType {
    Insertion,
    Deletion,
}

/// Placement bonus per `(indel type, 1-based position, size)`.
pub type GapPlacementScores = AHashMap<(IndelType, u64, usize), i64>;

/// Parse a `relGapPlacementScore` table. Entries are comma separated, each
/// `<pos>ins<size>:<score>` or `<pos>del<size>:<score>` (e.g.
/// `210del3:15,415ins6:-2`).
pub fn parse_gap_placement_score(raw: &str) -> Result<GapPlacementScores, CodonAlignError> {
    let mut scores = GapPlacementScores::new();
    for entry in raw.split(',') {
        let entry = entry.trim();
        if entry.is_empty() {
            continue;
        }
        let invalid = || CodonAlignError::InvalidScoreEntry { entry: entry.to_string() };
        let (indel_type, kind_at) = match (entry.find("ins"), entry.find("del")) {
            (Some(at), None) => (IndelType::Insertion, at),
            (None, Some(at)) => (IndelType::Deletion, at),
            _ => return Err(invalid()),
        };
        let pos: u64 = entry[..kind_at].parse().map_err(|_| invalid())?;
        let rest = &entry[kind_at + 3..];
        let (size_raw, score_raw) = rest.split_once(':').ok_or_else(invalid)?;
        let size: usize = size_raw.parse().map_err(|_| invalid())?;
        let score: i64 = score_raw.parse().map_err(|_| invalid())?;
        scores.insert((indel_type, pos, size), score);
    }
    Ok(scores)
}

#[derive(Debug, Clone, Copy)]
struct GapRun {
    indel_type: IndelType,
    /// first column of the run
    start: usize,
    /// columns covered
    len: usize,
    /// 1-based reference position of the run's first column (deletions), or
    /// of the last reference base before the run (insertions).
    refpos: u64,
}

/// Re-place the gaps of an equal-length pairwise alignment so that
/// frame-length runs sit on codon boundaries.
///
/// Pure function over byte strings: the ungapped sequences on both sides are
/// preserved, only gap placement changes, and only inside
/// `[ref_start, ref_end]` (1-based, ungapped reference coordinates). Runs
/// whose length is not a multiple of three stay put. Distinct runs are never
/// merged: a shift that would land a run within `min_gap_distance` columns
/// of another gap is discarded. Boundary candidates are ranked by their
/// `scores` bonus, then by the smaller shift, then leftward; shifts are
/// bounded by `window_size` codons.
#[must_use]
pub fn codon_align(
    refseq: &[u8],
    queryseq: &[u8],
    window_size: usize,
    min_gap_distance: usize,
    scores: &GapPlacementScores,
    ref_start: u64,
    ref_end: u64,
) -> (Vec<u8>, Vec<u8>) {
    let mut ref_al = refseq.to_vec();
    let mut qry_al = queryseq.to_vec();
    if ref_al.len() != qry_al.len() || ref_al.is_empty() {
        return (ref_al, qry_al);
    }

    let max_shift = window_size * 3;
    // Each pass shifts at most one run; a shifted run is frame-aligned and
    // never picked again, so the loop is bounded by the number of runs.
    let mut passes = ref_al.len();
    while passes > 0 {
        passes -= 1;
        let runs = find_gap_runs(&ref_al, &qry_al);
        let Some(shift) = pick_shift(
            &runs, &ref_al, &qry_al, max_shift, min_gap_distance, scores, ref_start, ref_end,
        ) else {
            break;
        };
        apply_shift(&mut ref_al, &mut qry_al, shift);
    }
    (ref_al, qry_al)
}

#[derive(Debug, Clone, Copy)]
struct Shift {
    indel_type: IndelType,
    start: usize,
    len: usize,
    /// negative: leftward by `|cols|`; positive: rightward.
    cols: i64,
}

fn find_gap_runs(ref_al: &[u8], qry_al: &[u8]) -> Vec<GapRun> {
    let mut runs: Vec<GapRun> = Vec::new();
    let mut refpos = 0_u64;
    let mut idx = 0;
    while idx < ref_al.len() {
        if ref_al[idx] == GAP {
            let start = idx;
            while idx < ref_al.len() && ref_al[idx] == GAP {
                idx += 1;
            }
            runs.push(GapRun {
                indel_type: IndelType::Insertion,
                start,
                len: idx - start,
                refpos,
            });
        } else if qry_al[idx] == GAP {
            let start = idx;
            let run_refpos = refpos + 1;
            while idx < ref_al.len() && ref_al[idx] != GAP && qry_al[idx] == GAP {
                refpos += 1;
                idx += 1;
            }
            runs.push(GapRun {
                indel_type: IndelType::Deletion,
                start,
                len: idx - start,
                refpos: run_refpos,
            });
        } else {
            refpos += 1;
            idx += 1;
        }
    }
    runs
}

#[allow(clippy::too_many_arguments)]
fn pick_shift(
    runs: &[GapRun],
    ref_al: &[u8],
    qry_al: &[u8],
    max_shift: usize,
    min_gap_distance: usize,
    scores: &GapPlacementScores,
    ref_start: u64,
    ref_end: u64,
) -> Option<Shift> {
    for run in runs {
        if run.len % 3 != 0 || run.refpos < ref_start || run.refpos > ref_end {
            continue;
        }
        // Frame offset of the run: 0 means already codon-aligned.
        let misframe = match run.indel_type {
            IndelType::Deletion => ((run.refpos - 1) % 3) as usize,
            IndelType::Insertion => (run.refpos % 3) as usize,
        };
        if misframe == 0 {
            continue;
        }
        let left = misframe;
        let right = 3 - misframe;

        let mut candidates: Vec<(i64, usize, i64)> = Vec::new(); // (score, |shift|, signed cols)
        for cols in [-(left as i64), right as i64] {
            if cols.unsigned_abs() as usize > max_shift {
                continue;
            }
            if !shift_is_feasible(run, cols, ref_al, qry_al, min_gap_distance) {
                continue;
            }
            let new_refpos = (run.refpos as i64 + cols) as u64;
            let bonus = scores
                .get(&(run.indel_type, new_refpos, run.len))
                .copied()
                .unwrap_or(0);
            candidates.push((bonus, cols.unsigned_abs() as usize, cols));
        }
        // highest bonus, then smallest shift, then leftward
        candidates.sort_by(|a, b| b.0.cmp(&a.0).then(a.1.cmp(&b.1)).then(a.2.cmp(&b.2)));
        if let Some(&(_, _, cols)) = candidates.first() {
            return Some(Shift {
                indel_type: run.indel_type,
                start: run.start,
                len: run.len,
                cols,
            });
        }
    }
    None
}

fn shift_is_feasible(
    run: &GapRun,
    cols: i64,
    ref_al: &[u8],
    qry_al: &[u8],
    min_gap_distance: usize,
) -> bool {
    let span = cols.unsigned_abs() as usize;
    // The columns the run slides across must be plain match columns.
    let crossed = if cols < 0 {
        let Some(lo) = run.start.checked_sub(span) else { return false };
        lo..run.start
    } else {
        let hi = run.start + run.len + span;
        if hi > ref_al.len() {
            return false;
        }
        run.start + run.len..hi
    };
    for idx in crossed.clone() {
        if ref_al[idx] == GAP || qry_al[idx] == GAP {
            return false;
        }
    }
    // The re-placed run must not creep within min_gap_distance of another gap.
    let new_start = (run.start as i64 + cols) as usize;
    let new_end = new_start + run.len; // exclusive
    let guard_lo = new_start.saturating_sub(min_gap_distance);
    let guard_hi = (new_end + min_gap_distance).min(ref_al.len());
    for idx in guard_lo..guard_hi {
        if idx >= run.start && idx < run.start + run.len {
            continue; // the run itself
        }
        if crossed.contains(&idx) {
            continue; // columns that will hold the displaced bases
        }
        if ref_al[idx] == GAP || qry_al[idx] == GAP {
            return false;
        }
    }
    true
}

fn apply_shift(ref_al: &mut [u8], qry_al: &mut [u8], shift: Shift) {
    let seq = match shift.indel_type {
        IndelType::Deletion => qry_al,
        IndelType::Insertion => ref_al,
    };
    if shift.cols < 0 {
        let span = shift.cols.unsigned_abs() as usize;
        let slice = &mut seq[shift.start - span..shift.start + shift.len];
        slice.rotate_left(span);
    } else {
        let span = shift.cols as usize;
        let slice = &mut seq[shift.start..shift.start + shift.len + span];
        slice.rotate_left(shift.len);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn align(refseq: &[u8], qryseq: &[u8]) -> (Vec<u8>, Vec<u8>) {
        let scores = GapPlacementScores::new();
        codon_align(
            refseq,
            qryseq,
            CODON_ALIGN_WINDOW_SIZE,
            3,
            &scores,
            1,
            refseq.iter().filter(|na| **na != GAP).count() as u64,
        )
    }

    #[test]
    fn parses_score_table() {
        let scores = parse_gap_placement_score("210del3:15, 415ins6:-2").unwrap();
        assert_eq!(scores[&(IndelType::Deletion, 210, 3)], 15);
        assert_eq!(scores[&(IndelType::Insertion, 415, 6)], -2);
        assert!(parse_gap_placement_score("").unwrap().is_empty());
        assert!(parse_gap_placement_score("210dup3:15").is_err());
    }

    #[test]
    fn shifts_deletion_onto_codon_boundary() {
        // Deletion of 3 starting at refpos 5: one base out of frame.
        let (ref_al, qry_al) = align(b"AAACCCGGGTTT", b"AAAC---GGTTT");
        assert_eq!(ref_al, b"AAACCCGGGTTT".to_vec());
        assert_eq!(qry_al, b"AAA---CGGTTT".to_vec());
    }

    #[test]
    fn aligned_deletion_stays_put() {
        let (ref_al, qry_al) = align(b"AAACCCGGGTTT", b"AAA---GGGTTT");
        assert_eq!(qry_al, b"AAA---GGGTTT".to_vec());
        assert_eq!(ref_al, b"AAACCCGGGTTT".to_vec());
    }

    #[test]
    fn partial_length_gaps_stay_put() {
        let (_, qry_al) = align(b"AAACCCGGGTTT", b"AAAC--GGGTTT");
        assert_eq!(qry_al, b"AAAC--GGGTTT".to_vec());
    }

    #[test]
    fn shifts_insertion_onto_codon_boundary() {
        // Insertion after refpos 4 (one base into codon 2): shift left so it
        // follows the complete first codon.
        let (ref_al, qry_al) = align(b"AAAC---CCGGG", b"AAACTTTCCGGG");
        assert_eq!(ref_al, b"AAA---CCCGGG".to_vec());
        assert_eq!(qry_al, b"AAACTTTCCGGG".to_vec());
    }

    #[test]
    fn realignment_is_idempotent() {
        let (ref_1, qry_1) = align(b"AAACCCGGGTTT", b"AAAC---GGTTT");
        let (ref_2, qry_2) = align(&ref_1, &qry_1);
        assert_eq!(ref_1, ref_2);
        assert_eq!(qry_1, qry_2);
    }

    #[test]
    fn preserves_ungapped_sequences() {
        let before = b"AAAC---GGTTT".to_vec();
        let (_, after) = align(b"AAACCCGGGTTT", &before);
        let ungap = |seq: &[u8]| -> Vec<u8> {
            seq.iter().copied().filter(|na| *na != GAP).collect()
        };
        assert_eq!(ungap(&before), ungap(&after));
    }

    #[test]
    fn out_of_range_runs_are_left_alone() {
        let scores = GapPlacementScores::new();
        let (_, qry_al) = codon_align(
            b"AAACCCGGGTTT",
            b"AAAC---GGTTT",
            CODON_ALIGN_WINDOW_SIZE,
            3,
            &scores,
            10,
            12,
        );
        assert_eq!(qry_al, b"AAAC---GGTTT".to_vec());
    }

    #[test]
    fn score_table_breaks_boundary_ties() {
        // Deletion at refpos 6 is two bases off frame: left shift of 2 or
        // right shift of 1. The smaller shift (right, to refpos 7) would win
        // unless the table favors the left boundary.
        let scores = parse_gap_placement_score("4del3:50").unwrap();
        let (_, qry_al) = codon_align(
            b"AAACCCGGGTTT",
            b"AAACC---GTTT",
            CODON_ALIGN_WINDOW_SIZE,
            3,
            &scores,
            1,
            12,
        );
        assert_eq!(qry_al, b"AAA---CCGTTT".to_vec());
    }
}
