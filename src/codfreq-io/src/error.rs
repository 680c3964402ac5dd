use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum OutputError {
    #[error("Failed to write report file")]
    Io(#[from] std::io::Error),

    #[error("Failed to serialize CSV row")]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    SegFreq(#[from] segfreq::SegFreqError),

    #[error(transparent)]
    CodonAlign(#[from] codonalign::CodonAlignError),

    #[error("Failed to atomically persist '{path}'")]
    Persist {
        path: PathBuf,
        #[source]
        source: tempfile::PersistError,
    },
}
