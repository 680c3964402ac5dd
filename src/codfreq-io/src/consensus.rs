use profile::{DerivedFragment, MainFragment};
use segfreq::{PosNA, SegFreq};

use crate::fasta::AlignedRecord;

/// Render a consensus level the way headers and file names expect:
/// `1.0 → "100"`, `0.95 → "95"`, `0.825 → "82.5"`.
#[must_use]
pub fn format_level(level: f64) -> String {
    format!("{}", level * 100.0)
}

/// The reference record leading every consensus file: the main fragment's
/// own bases over the derived fragment's ranges, pinning the coordinate
/// grid for all sample records.
#[must_use]
pub fn reference_record(main: &MainFragment, fragment: &DerivedFragment) -> AlignedRecord {
    let refseq = main.ref_sequence.as_bytes();
    let mut nodes: Vec<PosNA> = Vec::new();
    for &(pos_start, pos_end) in &fragment.ref_ranges {
        for pos in pos_start..=pos_end {
            if let Some(&na) = refseq.get((pos - 1) as usize) {
                nodes.push(PosNA::new(pos, 0, na));
            }
        }
    }
    AlignedRecord::new(main.fragment_name.clone(), nodes)
}

/// One sample's consensus record at `level`, headed
/// `{sample}|{gene}|{level%}%`.
#[must_use]
pub fn sample_record(
    sample_base: &str,
    segfreq: &SegFreq,
    fragment: &DerivedFragment,
    level: f64,
) -> AlignedRecord {
    let mut nodes: Vec<PosNA> = Vec::new();
    for &(pos_start, pos_end) in &fragment.ref_ranges {
        nodes.extend(
            segfreq
                .get_consensus(pos_start, pos_end, level)
                .into_iter()
                .flatten(),
        );
    }
    AlignedRecord::new(
        format!("{sample_base}|{}|{}%", fragment.gene_label(), format_level(level)),
        nodes,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use profile::{CodonAlignment, OutputKind, OutputOptions};
    use segfreq::Segment;

    fn main_fragment() -> MainFragment {
        MainFragment {
            fragment_name: "REF".to_string(),
            ref_sequence: "ATGTTTGTTTTC".to_string(),
            segment_size: 12,
            segment_step: 4,
        }
    }

    fn fragment() -> DerivedFragment {
        DerivedFragment {
            fragment_name: "S".to_string(),
            from_fragment: "REF".to_string(),
            gene_name: Some("S".to_string()),
            ref_ranges: vec![(1, 6)],
            outputs: vec![OutputKind::Consensus],
            output_options: OutputOptions::default(),
            codon_alignment: CodonAlignment::Disabled,
        }
    }

    #[test]
    fn level_formatting() {
        assert_eq!(format_level(1.0), "100");
        assert_eq!(format_level(0.95), "95");
        assert_eq!(format_level(0.5), "50");
    }

    #[test]
    fn reference_record_covers_the_ranges() {
        let record = reference_record(&main_fragment(), &fragment());
        assert_eq!(record.header, "REF");
        assert_eq!(record.nodes.len(), 6);
        assert_eq!(record.nodes[0], PosNA::new(1, 0, b'A'));
        assert_eq!(record.nodes[5], PosNA::new(6, 0, b'T'));
    }

    #[test]
    fn sample_record_header_carries_gene_and_level() {
        let mut segfreq = SegFreq::new(12, 4).unwrap();
        // one window per anchor covering a read over positions 1..=6
        for anchor in [1_u64, 5] {
            let nodes: Vec<Option<PosNA>> = (anchor..anchor + 12)
                .map(|pos| (pos <= 6).then(|| PosNA::new(pos, 0, b'A')))
                .collect();
            segfreq.add(Segment::new(nodes), 3).unwrap();
        }

        let record = sample_record("SampleA", &segfreq, &fragment(), 1.0);
        assert_eq!(record.header, "SampleA|S|100%");
        assert_eq!(record.nodes.len(), 6);
    }
}
