use std::io::Write;

use serde::Serialize;

use profile::DerivedFragment;
use segfreq::SegFreq;

use crate::error::OutputError;

/// One `gene,position,total,nuc,count` report row. Deletions render as `-`,
/// insertion runs as multi-character strings.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NucFreqRow {
    pub gene: String,
    pub position: u64,
    pub total: u64,
    pub nuc: String,
    pub count: u64,
}

/// Nucleotide frequency rows of one derived fragment: one `get_pos_nas`
/// query per reference position, positions numbered 1.. within the
/// fragment's concatenated ranges.
#[must_use]
pub fn fragment_nucfreq_rows(segfreq: &SegFreq, fragment: &DerivedFragment) -> Vec<NucFreqRow> {
    let mut rows: Vec<NucFreqRow> = Vec::new();
    let gene = fragment.gene_label();
    let mut offset = 1_u64;
    for &(pos_start, pos_end) in &fragment.ref_ranges {
        for pos in pos_start..=pos_end {
            let nucfreq = segfreq.get_pos_nas(pos);
            let total: u64 = nucfreq.values().sum();
            let mut sorted: Vec<(&Vec<u8>, u64)> =
                nucfreq.iter().map(|(nuc, count)| (nuc, *count)).collect();
            sorted.sort();
            for (nuc, count) in sorted {
                rows.push(NucFreqRow {
                    gene: gene.to_string(),
                    position: pos - pos_start + offset,
                    total,
                    nuc: String::from_utf8_lossy(nuc).into_owned(),
                    count,
                });
            }
        }
        offset += pos_end - pos_start + 1;
    }
    rows
}

/// Write rows as a UTF-8 CSV with a byte order mark, headed
/// `gene,position,total,nuc,count`.
pub fn write_nucfreq_csv<W: Write + ?Sized>(
    writer: &mut W,
    rows: &[NucFreqRow],
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
            outputs: vec![OutputKind::Nucfreq],
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
    fn positions_renumber_across_ranges() {
        let mut segfreq = SegFreq::new(12, 4).unwrap();
        segfreq.add(spell(1, "ATGTTTGTTTTC", 12, 4), 7).unwrap();

        let rows = fragment_nucfreq_rows(&segfreq, &fragment(vec![(1, 2), (7, 8)]));
        assert_eq!(rows.len(), 4);
        assert_eq!((rows[0].position, rows[0].nuc.as_str()), (1, "A"));
        assert_eq!((rows[1].position, rows[1].nuc.as_str()), (2, "T"));
        // second range restarts right after the first one's numbering
        assert_eq!((rows[2].position, rows[2].nuc.as_str()), (3, "G"));
        assert_eq!((rows[3].position, rows[3].nuc.as_str()), (4, "T"));
        assert!(rows.iter().all(|row| row.total == 7 && row.count == 7));
    }

    #[test]
    fn deletion_and_mixed_columns() {
        let mut segfreq = SegFreq::new(12, 4).unwrap();
        segfreq.add(spell(1, "A-GT", 12, 4), 3).unwrap();
        segfreq.add(spell(1, "ACGT", 12, 4), 5).unwrap();

        let rows = fragment_nucfreq_rows(&segfreq, &fragment(vec![(2, 2)]));
        assert_eq!(rows.len(), 2);
        assert_eq!((rows[0].nuc.as_str(), rows[0].count, rows[0].total), ("-", 3, 8));
        assert_eq!((rows[1].nuc.as_str(), rows[1].count, rows[1].total), ("C", 5, 8));
    }
}
