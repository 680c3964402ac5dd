pub mod posna;
pub use posna::{PosNA, GAP, merge_posnas, join_posnas};

pub mod segment;
pub use segment::Segment;

pub mod segfreq;
pub use segfreq::{SegFreq, SegFreqError, Pattern};

/// Default number of reference positions covered by a segment.
pub const DEFAULT_SEGMENT_SIZE: usize = 3;
/// Default distance between two neighboring segment anchors.
pub const DEFAULT_SEGMENT_STEP: usize = 1;
/// Default number of seed patterns returned by [`SegFreq::get_patterns`]
pub const DEFAULT_TOP_N_SEEDS: i64 = 10;
/// Default majority level applied by [`SegFreq::get_consensus`]
pub const DEFAULT_CONSENSUS_LEVEL: f64 = 1.0;
