use thiserror::Error;

#[derive(Error, Debug)]
pub enum SamError {
    #[error("Failed to read BAM file")]
    BamRead(#[from] rust_htslib::errors::Error),

    #[error(transparent)]
    SegFreq(#[from] segfreq::SegFreqError),
}
