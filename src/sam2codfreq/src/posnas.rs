use segfreq::{PosNA, GAP};

/// Quality attributed to bases of reads carrying no quality string.
pub const DEFAULT_QUALITY: u8 = 1;

/// A [`PosNA`] observation with the base quality it was read at. Quality is
/// carried through extraction and filtering but is not part of the
/// observation's identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PosObs {
    pub na: PosNA,
    pub qual: u8,
}

/// Convert one aligned read into its canonical observation stream.
///
/// `aligned_pairs` links 0-based sequence indices to 0-based reference
/// positions, with `None` on the sequence side for a deletion and `None` on
/// the reference side for an insertion. Output positions are 1-based;
/// insertions take the position of the last reference base with a growing
/// insertion index; deletions borrow the quality of the previous sequence
/// index.
///
/// Insertions placed before the first reference position are dropped, and a
/// trailing run of insertion observations is stripped: bases hanging off the
/// read's final aligned base are unreliable and must not be counted. Pairs
/// with both sides absent are skipped silently.
#[must_use]
pub fn single_read_posnas<I>(seq: &[u8], qual: Option<&[u8]>, aligned_pairs: I) -> Vec<PosObs>
where
    I: IntoIterator<Item = (Option<i64>, Option<i64>)>,
{
    let mut posnas: Vec<PosObs> = Vec::new();
    if seq.is_empty() {
        return posnas;
    }
    let quality_at = |idx: usize| -> u8 {
        qual.and_then(|qual| qual.get(idx))
            .copied()
            .unwrap_or(DEFAULT_QUALITY)
    };

    let mut prev_refpos: u64 = 0;
    let mut prev_seq_idx: usize = 0;
    let mut ins_idx: u16 = 0;
    let mut buffer_size: usize = 0;

    for (seq_pos, ref_pos) in aligned_pairs {
        if seq_pos.is_none() && ref_pos.is_none() {
            continue;
        }
        let refpos = match ref_pos {
            None => {
                // insertion
                ins_idx += 1;
                prev_refpos
            }
            Some(ref_pos) => {
                ins_idx = 0;
                prev_refpos = ref_pos as u64 + 1;
                prev_refpos
            }
        };

        let (na, quality) = match seq_pos {
            None => (GAP, quality_at(prev_seq_idx)),
            Some(seq_pos) => {
                let seq_pos = seq_pos as usize;
                prev_seq_idx = seq_pos;
                (seq[seq_pos], quality_at(seq_pos))
            }
        };

        if refpos == 0 {
            // insertion before the first reference position
            continue;
        }
        posnas.push(PosObs { na: PosNA::new(refpos, ins_idx, na), qual: quality });

        if ins_idx > 0 {
            buffer_size += 1;
        } else {
            buffer_size = 0;
        }
    }

    posnas.truncate(posnas.len() - buffer_size);
    posnas
}
