use log::debug;

use profile::DerivedFragment;

pub mod error;
pub use error::CodonAlignError;

pub mod table;
pub use table::{Codon, CodonTable};

mod assemble;
use assemble::{assemble_alignment, GAP};

pub mod gap;
pub use gap::{
    codon_align, parse_gap_placement_score, GapPlacementScores, IndelType,
    CODON_ALIGN_MIN_GAP_DISTANCE, CODON_ALIGN_WINDOW_SIZE,
};

/// Re-align the consensus codons of one fragment and rewrite its counters.
///
/// Upstream aligners place indels by local scoring, blind to the reading
/// frame, which biases codon counts toward out-of-frame partial codons. This
/// assembles the pairwise alignment between the reference codons and the
/// fragment's most common codons, runs each configured gap re-placement
/// step, then moves the count and quality mass of every changed most-common
/// codon onto its re-placed key. Total counts per position are unchanged.
///
/// Fragments with `codonAlignment: false` are left untouched.
///
/// # Errors
/// [`CodonAlignError::EmptyAlignment`] when no codon was ever observed for
/// the fragment (callers degrade this to a logged skip).
pub fn realign_fragment(
    table: &mut CodonTable,
    refseq: &str,
    fragment: &DerivedFragment,
) -> Result<(), CodonAlignError> {
    let Some(steps) = fragment.codon_alignment.steps() else {
        return Ok(());
    };

    let assembled = assemble_alignment(table, refseq.as_bytes(), fragment).ok_or_else(|| {
        CodonAlignError::EmptyAlignment { fragment: fragment.fragment_name.clone() }
    })?;
    let mut ref_al = assembled.refseq;
    let mut qry_al = assembled.queryseq;

    // Observed boundary, in fragment-relative nucleotide coordinates.
    let seq_ref_start = assembled.first_aa * 3 - 2;
    let seq_ref_end = assembled.last_aa * 3;

    for step in steps {
        let mut ref_start = step.rel_ref_start.unwrap_or(seq_ref_start);
        let mut ref_end = step.rel_ref_end.unwrap_or(seq_ref_end);
        // clamp to the observed boundary
        if ref_start < seq_ref_end && ref_end > seq_ref_start {
            ref_start = ref_start.max(seq_ref_start);
            ref_end = ref_end.min(seq_ref_end);
        }
        let window_size = step.window_size.unwrap_or(CODON_ALIGN_WINDOW_SIZE);
        let min_gap_distance = step.min_gap_distance.unwrap_or(CODON_ALIGN_MIN_GAP_DISTANCE);
        let scores =
            parse_gap_placement_score(step.rel_gap_placement_score.as_deref().unwrap_or(""))?;

        let (next_ref, next_qry) = codon_align(
            &ref_al,
            &qry_al,
            window_size,
            min_gap_distance,
            &scores,
            ref_start,
            ref_end,
        );
        ref_al = next_ref;
        qry_al = next_qry;
    }

    let mut rewritten = 0_usize;
    for (aapos0, query_codon) in group_by_codons(&ref_al, &qry_al).into_iter().enumerate() {
        let aapos = aapos0 as u64 + 1;
        if aapos < assembled.first_aa || aapos > assembled.last_aa {
            continue;
        }
        let Some((old_codon, _count)) = table.most_common(aapos) else {
            continue;
        };
        if old_codon != query_codon {
            table.transfer(aapos, &old_codon, query_codon);
            rewritten += 1;
        }
    }
    if rewritten > 0 {
        debug!(
            "codon alignment of '{}' rewrote {rewritten} consensus codon(s)",
            fragment.fragment_name
        );
    }
    Ok(())
}

/// Split the query side of an equal-length pairwise alignment into one codon
/// per reference codon. Insertion columns (reference gaps) attach to the
/// codon of the preceding reference position.
fn group_by_codons(ref_al: &[u8], qry_al: &[u8]) -> Vec<Codon> {
    let mut codons: Vec<Codon> = Vec::new();
    let mut refpos = 0_usize;
    for (&r, &q) in ref_al.iter().zip(qry_al) {
        if r != GAP {
            refpos += 1;
            if (refpos - 1) % 3 == 0 {
                codons.push(Codon::new());
            }
        }
        if let Some(codon) = codons.last_mut() {
            codon.push(q);
        }
    }
    codons
}
