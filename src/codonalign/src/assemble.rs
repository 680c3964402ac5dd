use profile::DerivedFragment;

use crate::table::CodonTable;

pub(crate) const GAP: u8 = b'-';
pub(crate) const DEL_CODON: &[u8] = b"---";

/// The reference/consensus pairwise alignment of one fragment, in fragment
/// relative nucleotide coordinates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Assembled {
    pub refseq: Vec<u8>,
    pub queryseq: Vec<u8>,
    pub first_aa: u64,
    pub last_aa: u64,
}

/// Map a 1-based amino acid position onto the main fragment's nucleotide
/// coordinate of its codon's first base, walking the fragment's ranges.
pub(crate) fn aapos_to_napos(aapos: u64, ref_ranges: &[(u64, u64)]) -> Option<u64> {
    let mut max_rel_napos = 0_u64;
    for &(start, end) in ref_ranges {
        max_rel_napos += end - start + 1;
        let max_aapos = max_rel_napos / 3;
        if aapos <= max_aapos {
            let rel_napos = aapos * 3 - 2;
            let napos_offset = max_rel_napos - rel_napos;
            return Some(end - napos_offset);
        }
    }
    None
}

/// Assemble the pairwise alignment between the reference codons and the
/// fragment's most common consensus codons. Unobserved positions read as
/// `---`; a consensus codon shorter than three bases is gap-padded, a longer
/// one gap-pads the reference. `None` when no codon was observed at all.
pub(crate) fn assemble_alignment(
    table: &CodonTable,
    refseq: &[u8],
    fragment: &DerivedFragment,
) -> Option<Assembled> {
    let refsize = fragment.ref_size();
    let mut frag_refseq: Vec<u8> = Vec::new();
    let mut frag_queryseq: Vec<u8> = Vec::new();
    let mut first_aa = refsize / 3;
    let mut last_aa = 0_u64;

    for aapos in 1..=refsize / 3 {
        let Some(napos) = aapos_to_napos(aapos, &fragment.ref_ranges) else {
            continue;
        };
        let lo = (napos - 1) as usize;
        let hi = (lo + 3).min(refseq.len());
        let mut ref_codon: Vec<u8> = refseq.get(lo..hi).unwrap_or_default().to_vec();

        let cons_codon_bytes = match table.most_common(aapos) {
            Some((codon, _count)) => {
                first_aa = first_aa.min(aapos);
                last_aa = last_aa.max(aapos);
                codon
            }
            None => DEL_CODON.to_vec(),
        };
        let mut cons_codon = cons_codon_bytes.clone();
        let cons_codon_size = cons_codon_bytes.len();
        if cons_codon_size < 3 {
            cons_codon.resize(3, GAP);
        } else if cons_codon_size > 3 {
            ref_codon.resize(cons_codon_size, GAP);
        }
        frag_refseq.extend_from_slice(&ref_codon);
        frag_queryseq.extend_from_slice(&cons_codon);
    }

    if last_aa == 0 {
        return None;
    }
    Some(Assembled {
        refseq: frag_refseq,
        queryseq: frag_queryseq,
        first_aa,
        last_aa,
    })
}
