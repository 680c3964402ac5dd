use std::io::Write;

use log::warn;
use serde::Serialize;

use codonalign::{realign_fragment, CodonAlignError, CodonTable};
use profile::{DerivedFragment, MainFragment};
use segfreq::SegFreq;

use crate::error::OutputError;

/// One `gene,position,total,codon,count` report row. The quality mass rides
/// along for the re-alignment bookkeeping but is not serialized.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CodFreqRow {
    pub gene: String,
    pub position: u64,
    pub total: u64,
    pub codon: String,
    pub count: u64,
    #[serde(skip)]
    pub total_quality_score: f64,
}

/// Accumulate the per-amino-acid-position codon counters of a fragment from
/// its SegFreq: one `get_frequency` triple query per codon, walking the
/// fragment's ranges in order.
///
/// Sidecars carry no per-base qualities, so the tables start with zero
/// quality mass.
pub fn build_codon_table(
    segfreq: &SegFreq,
    fragment: &DerivedFragment,
) -> Result<CodonTable, OutputError> {
    let mut table = CodonTable::new();
    let positions: Vec<u64> = fragment
        .ref_ranges
        .iter()
        .flat_map(|&(start, end)| start..=end)
        .collect();
    for (aapos0, triple) in positions.chunks(3).enumerate() {
        if triple.len() < 3 {
            // out-of-frame trailing positions cannot form a codon
            continue;
        }
        let freq = segfreq.get_frequency(triple, 3)?;
        for (codon, count) in freq {
            table.observe(aapos0 as u64 + 1, codon, count, 0.0);
        }
    }
    Ok(table)
}

/// Codon frequency rows of one derived fragment, re-aligned to the reading
/// frame unless the fragment disables codon alignment. An empty pairwise
/// assembly degrades to a warning and the original counts.
pub fn fragment_codfreq_rows(
    segfreq: &SegFreq,
    main: &MainFragment,
    fragment: &DerivedFragment,
) -> Result<Vec<CodFreqRow>, OutputError> {
    let mut table = build_codon_table(segfreq, fragment)?;
    match realign_fragment(&mut table, &main.ref_sequence, fragment) {
        Ok(()) => {}
        Err(CodonAlignError::EmptyAlignment { ref fragment }) => {
            warn!("skipping codon alignment of '{fragment}': nothing to re-align");
        }
        Err(err) => return Err(err.into()),
    }
    Ok(table_rows(&table, fragment.gene_label()))
}

/// Flatten a codon table into sorted report rows (position, then codon).
#[must_use]
pub fn table_rows(table: &CodonTable, gene: &str) -> Vec<CodFreqRow> {
    let mut rows: Vec<CodFreqRow> = Vec::new();
    for aapos in table.positions() {
        let Some(codons) = table.codons(aapos) else { continue };
        let total: u64 = codons.values().sum();
        let mut sorted: Vec<(&Vec<u8>, u64)> =
            codons.iter().map(|(codon, count)| (codon, *count)).collect();
        sorted.sort();
        for (codon, count) in sorted {
            rows.push(CodFreqRow {
                gene: gene.to_string(),
                position: aapos,
                total,
                codon: String::from_utf8_lossy(codon).into_owned(),
                count,
                total_quality_score: table.quality(aapos, codon),
            });
        }
    }
    rows
}

/// Write rows as a UTF-8 CSV with a byte order mark, headed
/// `gene,position,total,codon,count`.
pub fn write_codfreq_csv<W: Write + ?Sized>(
    writer: &mut W,
    rows: &[CodFreqRow],
) -> Result<(), OutputError> {
    writer.write_all("\u{feff}".as_bytes())?;
    let mut csv_writer = csv::Writer::from_writer(writer);
    for row in rows {
        csv_writer.serialize(row)?;
    }
    csv_writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use profile::{CodonAlignment, OutputKind, OutputOptions};
    use segfreq::{PosNA, Segment};

    fn fragment(ref_ranges: Vec<(u64, u64)>) -> DerivedFragment {
        DerivedFragment {
            fragment_name: "S".to_string(),
            from_fragment: "REF".to_string(),
            gene_name: Some("S".to_string()),
            ref_ranges,
            outputs: vec![OutputKind::Codfreq],
            output_options: OutputOptions::default(),
            codon_alignment: CodonAlignment::Disabled,
        }
    }

    fn spell(start: u64, bases: &str, size: usize, step: usize) -> Segment {
        let anchor = start - (start - 1) % step as u64;
        let mut nodes: Vec<Option<PosNA>> = vec![None; (start - anchor) as usize];
        for (idx, na) in bases.bytes().enumerate() {
            nodes.push(Some(PosNA::new(start + idx as u64, 0, na)));
        }
        nodes.resize(size, None);
        Segment::new(nodes)
    }

    #[test]
    fn rows_share_position_totals() {
        let mut segfreq = SegFreq::new(12, 4).unwrap();
        segfreq.add(spell(1, "ATGTTTGTTTTC", 12, 4), 90).unwrap();
        segfreq.add(spell(1, "ATATTTGTTTTC", 12, 4), 10).unwrap();

        let rows = {
            let table = build_codon_table(&segfreq, &fragment(vec![(1, 6)])).unwrap();
            table_rows(&table, "S")
        };
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0].codon, "ATA");
        assert_eq!(rows[0].count, 10);
        assert_eq!(rows[0].total, 100);
        assert_eq!(rows[1].codon, "ATG");
        assert_eq!(rows[1].count, 90);
        assert_eq!(rows[2].position, 2);
        assert_eq!(rows[2].codon, "TTT");
        assert_eq!(rows[2].total, 100);

        // sum(count) == total within each (gene, position)
        for position in [1, 2] {
            let sum: u64 = rows
                .iter()
                .filter(|row| row.position == position)
                .map(|row| row.count)
                .sum();
            let total = rows
                .iter()
                .find(|row| row.position == position)
                .map(|row| row.total)
                .unwrap_or(0);
            assert_eq!(sum, total);
        }
    }

    #[test]
    fn csv_is_bom_prefixed_with_expected_header() {
        let rows = vec![CodFreqRow {
            gene: "S".to_string(),
            position: 1,
            total: 100,
            codon: "ATG".to_string(),
            count: 90,
            total_quality_score: 0.0,
        }];
        let mut buffer: Vec<u8> = Vec::new();
        write_codfreq_csv(&mut buffer, &rows).unwrap();
        let text = String::from_utf8(buffer).unwrap();
        assert!(text.starts_with('\u{feff}'));
        let body = text.trim_start_matches('\u{feff}');
        assert_eq!(body, "gene,position,total,codon,count\nS,1,100,ATG,90\n");
    }

    #[test]
    fn multi_range_fragment_counts_codons_across_the_junction() {
        let mut segfreq = SegFreq::new(12, 4).unwrap();
        segfreq.add(spell(1, "ATGTTTGTTTTC", 12, 4), 5).unwrap();
        // ranges 1..3 and 7..9: second codon spans positions 7,8,9
        let table = build_codon_table(&segfreq, &fragment(vec![(1, 3), (7, 9)])).unwrap();
        let rows = table_rows(&table, "S");
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].codon, "ATG");
        assert_eq!(rows[1].codon, "GTT");
        assert_eq!(rows[1].position, 2);
    }
}
