use std::path::Path;

use rust_htslib::bam::{self, Read};

use crate::error::SamError;

/// A byte-offset partition of a coordinate-sorted BAM file, for
/// data-parallel workers. Offsets are htslib virtual offsets: a worker
/// seeks to `begin` and stops once its reader position passes `end`.
#[derive(Debug, Clone)]
pub struct ChunkPlan {
    pub chunks: Vec<(i64, i64)>,
    pub total_records: u64,
}

/// Scan the file once and cut it into chunks of ≈`chunk_size` records each.
/// The scan also yields the total record count, which drives progress
/// totals without requiring a BAM index.
pub fn chunk_bamfile(path: &Path, chunk_size: usize) -> Result<ChunkPlan, SamError> {
    let mut reader = bam::Reader::from_path(path)?;
    let mut chunks: Vec<(i64, i64)> = Vec::new();
    let mut total_records = 0_u64;

    let mut cur_begin = reader.tell();
    let mut cur_chunk_size = 0_usize;
    let mut record = bam::Record::new();
    while let Some(result) = reader.read(&mut record) {
        result?;
        total_records += 1;
        cur_chunk_size += 1;
        if cur_chunk_size == chunk_size {
            let cur_end = reader.tell();
            chunks.push((cur_begin, cur_end));
            cur_begin = cur_end;
            cur_chunk_size = 0;
        }
    }
    if cur_chunk_size > 0 {
        chunks.push((cur_begin, reader.tell()));
    }

    Ok(ChunkPlan { chunks, total_records })
}
