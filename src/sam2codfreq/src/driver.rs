use std::path::Path;

use log::debug;
use rayon::prelude::*;
use rust_htslib::bam::{self, ext::BamRecordExtensions, Read};

use logger::{LogFormat, Progress};
use profile::MainFragment;
use segfreq::{PosNA, SegFreq};

use crate::chunker::{chunk_bamfile, ChunkPlan};
use crate::error::SamError;
use crate::posnas::single_read_posnas;
use crate::window::read_segments;

#[derive(Debug, Clone, Copy)]
pub struct DriverOptions {
    pub chunk_size: usize,
    pub site_quality_cutoff: u8,
}

/// Build the SegFreq of one (sample, main fragment) BAM.
///
/// The file is partitioned into record chunks; workers each open their own
/// reader, accumulate a private SegFreq, and report one progress event per
/// chunk. Partial results are folded sequentially; the first worker error
/// aborts the whole job and discards the partials.
pub fn sam_to_segfreq(
    bam_path: &Path,
    main: &MainFragment,
    options: &DriverOptions,
    log_format: LogFormat,
) -> Result<SegFreq, SamError> {
    let ChunkPlan { chunks, total_records } = chunk_bamfile(bam_path, options.chunk_size)?;
    debug!(
        "{}: {total_records} records across {} chunk(s)",
        bam_path.display(),
        chunks.len()
    );
    let progress = Progress::new(
        log_format,
        "sam2segfreq",
        &bam_path.display().to_string(),
        chunks.len() as u64,
    );

    let partials: Result<Vec<SegFreq>, SamError> = chunks
        .par_iter()
        .map(|&(begin, end)| {
            let partial = segfreq_between(bam_path, begin, end, main, options)?;
            progress.update(1);
            Ok(partial)
        })
        .collect();
    progress.close();

    let mut result = SegFreq::new(main.segment_size, main.segment_step)?;
    for partial in partials? {
        result.merge(partial)?;
    }
    Ok(result)
}

/// Worker body: process the records between two virtual offsets.
fn segfreq_between(
    bam_path: &Path,
    begin: i64,
    end: i64,
    main: &MainFragment,
    options: &DriverOptions,
) -> Result<SegFreq, SamError> {
    let mut reader = bam::Reader::from_path(bam_path)?;
    reader.seek(begin)?;

    let mut segfreq = SegFreq::new(main.segment_size, main.segment_step)?;
    let mut record = bam::Record::new();
    while let Some(result) = reader.read(&mut record) {
        result?;
        if reader.tell() > end {
            break;
        }
        if record.is_unmapped() {
            continue;
        }
        let seq = record.seq().as_bytes();
        if seq.is_empty() {
            continue;
        }
        let qual = record.qual();
        // htslib renders a missing quality string as 0xff bytes
        let qual = (!qual.is_empty() && qual[0] != 0xff).then_some(qual);

        let posnas = single_read_posnas(
            &seq,
            qual,
            record.aligned_pairs_full().map(|[seq_pos, ref_pos]| (seq_pos, ref_pos)),
        );
        let observed: Vec<PosNA> = posnas
            .into_iter()
            .filter(|obs| obs.qual >= options.site_quality_cutoff)
            .map(|obs| obs.na)
            .collect();

        for segment in read_segments(&observed, main.segment_size, main.segment_step) {
            segfreq.add(segment, 1)?;
        }
    }
    Ok(segfreq)
}
