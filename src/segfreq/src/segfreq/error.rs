use thiserror::Error;

#[derive(Error, Debug)]
pub enum SegFreqError {
    #[error("Segment step must be at least 1 and segment size at least segment step + 2 (got size={segment_size}, step={segment_step})")]
    InvalidGeometry { segment_size: usize, segment_step: usize },

    #[error("Segment is malformed: its first reference position cannot be located")]
    MalformedSegment,

    #[error("Cannot merge SegFreq objects built with different segment sizes or steps")]
    IncompatibleSegFreq,

    #[error("Positions are too far apart: all requested positions must fit within one segment window")]
    PositionsTooFarApart,

    #[error("Invalid segfreq file: {reason} (line {line})")]
    ParseSidecar { line: usize, reason: String },

    #[error("Failed to read/write segfreq file")]
    Io(#[from] std::io::Error),
}
