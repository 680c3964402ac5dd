use std::io::{BufRead, Write};

use itertools::Itertools;

use crate::posna::PosNA;
use crate::segment::Segment;
use crate::{DEFAULT_SEGMENT_SIZE, DEFAULT_SEGMENT_STEP};

use super::{SegFreq, SegFreqError};

const BOM: char = '\u{feff}';

impl SegFreq {
    /// Serialize to the `.segfreq` sidecar format: two comment rows carrying
    /// the window geometry, a `pos,segment,offsets,count` header, then one
    /// row per counted segment. `segment` holds one character per slot (`.`
    /// for an unobserved position); `offsets` holds one character per
    /// adjacent slot pair (`+` when the right slot is an insertion of the
    /// left slot's position).
    pub fn dump<W: Write + ?Sized>(&self, writer: &mut W) -> Result<(), SegFreqError> {
        write!(writer, "{BOM}")?;
        writeln!(writer, "# segment_size={}", self.segment_size())?;
        writeln!(writer, "# segment_step={}", self.segment_step())?;
        writeln!(writer, "pos,segment,offsets,count")?;
        for (pos, pos_segments) in self.segments() {
            let ordered = pos_segments
                .iter()
                .sorted_by_key(|(segment, _)| {
                    let bps: Vec<u16> = segment.real_nodes().map(|node| node.bp).collect();
                    let nas: Vec<u8> = segment.real_nodes().map(|node| node.na).collect();
                    (bps, nas)
                });
            for (segment, count) in ordered {
                let rendered: String = segment
                    .nodes()
                    .iter()
                    .map(|node| node.map_or('.', |n| n.na as char))
                    .collect();
                let offsets: String = segment
                    .nodes()
                    .iter()
                    .tuple_windows()
                    .map(|(from, to)| match (from, to) {
                        (Some(from), Some(to)) if from.pos == to.pos => '+',
                        _ => '.',
                    })
                    .collect();
                writeln!(writer, "{pos},{rendered},{offsets},{count}")?;
            }
        }
        Ok(())
    }

    /// Load a `.segfreq` sidecar produced by [`SegFreq::dump`]. The comment
    /// header drives the window geometry; a missing header falls back to
    /// the crate defaults.
    pub fn load<R: BufRead>(reader: R) -> Result<SegFreq, SegFreqError> {
        let mut segment_size = DEFAULT_SEGMENT_SIZE;
        let mut segment_step = DEFAULT_SEGMENT_STEP;
        let mut rows: Vec<(usize, String)> = Vec::new();

        for (lineno, line) in reader.lines().enumerate() {
            let line = line?;
            let line = line.trim_start_matches(BOM).trim_end().to_string();
            if line.is_empty() {
                continue;
            }
            if let Some(comment) = line.strip_prefix('#') {
                if let Some((key, value)) = comment.split_once('=') {
                    match key.trim() {
                        "segment_size" => {
                            segment_size = parse_field(value.trim(), lineno, "segment_size")?;
                        }
                        "segment_step" => {
                            segment_step = parse_field(value.trim(), lineno, "segment_step")?;
                        }
                        _ => {}
                    }
                }
                continue;
            }
            rows.push((lineno, line));
        }

        let mut segfreq = SegFreq::new(segment_size, segment_step)?;
        // first non-comment row is the column header
        for (lineno, row) in rows.iter().skip(1) {
            let fields: Vec<&str> = row.split(',').collect();
            if fields.len() != 4 {
                return Err(SegFreqError::ParseSidecar {
                    line: lineno + 1,
                    reason: format!("expected 4 fields, found {}", fields.len()),
                });
            }
            let pos: u64 = parse_field(fields[0], *lineno, "pos")?;
            let count: u64 = parse_field(fields[3], *lineno, "count")?;
            let segment = parse_segment(pos, fields[1], fields[2], *lineno)?;
            segfreq.add(segment, count)?;
        }
        Ok(segfreq)
    }
}

fn parse_field<T: std::str::FromStr>(
    raw: &str,
    lineno: usize,
    what: &str,
) -> Result<T, SegFreqError> {
    raw.parse().map_err(|_| SegFreqError::ParseSidecar {
        line: lineno + 1,
        reason: format!("invalid {what}: '{raw}'"),
    })
}

fn parse_segment(
    anchor: u64,
    rendered: &str,
    offsets: &str,
    lineno: usize,
) -> Result<Segment, SegFreqError> {
    let rendered = rendered.as_bytes();
    let offsets = offsets.as_bytes();
    if rendered.len() != offsets.len() + 1 {
        return Err(SegFreqError::ParseSidecar {
            line: lineno + 1,
            reason: "offsets column must hold one character per adjacent slot pair".to_string(),
        });
    }
    let mut nodes: Vec<Option<PosNA>> = Vec::with_capacity(rendered.len());
    let mut prev_pos = anchor;
    let mut prev_bp: u16 = 0;
    for (idx, &na) in rendered.iter().enumerate() {
        let node = if idx == 0 {
            (na != b'.').then(|| PosNA::new(prev_pos, 0, na))
        } else if offsets[idx - 1] == b'+' {
            prev_bp += 1;
            Some(PosNA::new(prev_pos, prev_bp, na))
        } else {
            prev_pos += 1;
            prev_bp = 0;
            (na != b'.').then(|| PosNA::new(prev_pos, 0, na))
        };
        nodes.push(node);
    }
    Ok(Segment::new(nodes))
}
