use profile::{DerivedFragment, MainFragment};
use segfreq::SegFreq;

use crate::consensus::reference_record;
use crate::fasta::AlignedRecord;

/// Haplotype pattern records of one derived fragment: per range, the
/// reference bases first (fixing the coordinate grid), then one record per
/// extracted pattern, headed `{sample}.{idx}|count={n}|pcnt={p}%` with the
/// index zero-padded to the pattern count's width.
#[must_use]
pub fn pattern_records(
    sample_base: &str,
    segfreq: &SegFreq,
    main: &MainFragment,
    fragment: &DerivedFragment,
) -> Vec<AlignedRecord> {
    let mut records: Vec<AlignedRecord> = Vec::new();
    let top_n_seeds = fragment.output_options.patterns_top_n_seeds;
    for &(pos_start, pos_end) in &fragment.ref_ranges {
        let range_fragment = DerivedFragment {
            ref_ranges: vec![(pos_start, pos_end)],
            ..fragment.clone()
        };
        records.push(AlignedRecord::new(
            main.fragment_name.clone(),
            reference_record(main, &range_fragment).nodes,
        ));

        let patterns = segfreq.get_patterns(pos_start, pos_end, top_n_seeds);
        let digits = digit_width(patterns.len());
        for (idx, pattern) in patterns.into_iter().enumerate() {
            let header = format!(
                "{sample_base}.{:0width$}|count={}|pcnt={}%",
                idx + 1,
                pattern.count,
                format_pcnt(pattern.fraction),
                width = digits,
            );
            records.push(AlignedRecord::new(header, pattern.nodes));
        }
    }
    records
}

fn digit_width(count: usize) -> usize {
    count.max(1).to_string().len()
}

fn format_pcnt(fraction: f64) -> String {
    // round away float noise from the per-ten-thousand arithmetic
    format!("{}", (fraction * 1_000_000.0).round() / 10_000.0)
}
