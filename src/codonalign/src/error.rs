use thiserror::Error;

#[derive(Error, Debug)]
pub enum CodonAlignError {
    #[error("Codon alignment of fragment '{fragment}' produced an empty pairwise alignment: no codon was ever observed")]
    EmptyAlignment { fragment: String },

    #[error("Invalid relGapPlacementScore entry '{entry}': expected '<pos>ins<size>:<score>' or '<pos>del<size>:<score>'")]
    InvalidScoreEntry { entry: String },
}
