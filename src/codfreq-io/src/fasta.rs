use std::collections::BTreeSet;
use std::io::Write;

use segfreq::PosNA;

use crate::error::OutputError;

/// One FASTA record, positioned on the reference coordinate grid.
#[derive(Debug, Clone, PartialEq)]
pub struct AlignedRecord {
    pub header: String,
    pub nodes: Vec<PosNA>,
}

impl AlignedRecord {
    #[must_use]
    pub fn new(header: impl Into<String>, nodes: Vec<PosNA>) -> Self {
        Self { header: header.into(), nodes }
    }
}

/// Write records as a multiple alignment: every record is rendered over the
/// union `(pos, bp)` grid of the whole file, `.` where a record carries no
/// observation. Keeping all records on one grid is what makes multi-sample
/// FASTA files comparable column by column.
pub fn write_multi_alignment<W: Write + ?Sized>(
    writer: &mut W,
    records: &[AlignedRecord],
) -> Result<(), OutputError> {
    let grid: BTreeSet<(u64, u16)> = records
        .iter()
        .flat_map(|record| record.nodes.iter().map(|node| (node.pos, node.bp)))
        .collect();

    for record in records {
        writeln!(writer, ">{}", record.header)?;
        let mut rendered: Vec<u8> = Vec::with_capacity(grid.len());
        let mut nodes = record.nodes.iter().peekable();
        for &slot in &grid {
            while nodes.peek().is_some_and(|node| (node.pos, node.bp) < slot) {
                nodes.next();
            }
            match nodes.peek() {
                Some(node) if (node.pos, node.bp) == slot => {
                    rendered.push(node.na);
                    nodes.next();
                }
                _ => rendered.push(b'.'),
            }
        }
        writer.write_all(&rendered)?;
        writeln!(writer)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn spell(start: u64, bases: &str) -> Vec<PosNA> {
        bases
            .bytes()
            .enumerate()
            .map(|(idx, na)| PosNA::new(start + idx as u64, 0, na))
            .collect()
    }

    #[test]
    fn records_share_one_coordinate_grid() {
        let records = vec![
            AlignedRecord::new("ref", spell(10, "ACGT")),
            AlignedRecord::new("partial", spell(12, "GT")),
        ];
        let mut buffer: Vec<u8> = Vec::new();
        write_multi_alignment(&mut buffer, &records).unwrap();
        assert_eq!(
            String::from_utf8(buffer).unwrap(),
            ">ref\nACGT\n>partial\n..GT\n"
        );
    }

    #[test]
    fn insertions_open_grid_columns() {
        let mut with_insertion = spell(10, "AC");
        with_insertion.insert(2, PosNA::new(11, 1, b'T'));
        with_insertion.extend(spell(12, "GT"));
        let records = vec![
            AlignedRecord::new("ref", spell(10, "ACGT")),
            AlignedRecord::new("ins", with_insertion),
        ];
        let mut buffer: Vec<u8> = Vec::new();
        write_multi_alignment(&mut buffer, &records).unwrap();
        assert_eq!(
            String::from_utf8(buffer).unwrap(),
            ">ref\nAC.GT\n>ins\nACTGT\n"
        );
    }
}
