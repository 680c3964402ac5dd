pub mod error;
pub use error::OutputError;

pub mod filename;
pub mod fasta;
pub use fasta::{write_multi_alignment, AlignedRecord};

pub mod write;
pub use write::atomic_write;

pub mod codfreq;
pub use codfreq::{build_codon_table, fragment_codfreq_rows, write_codfreq_csv, CodFreqRow};

pub mod nucfreq;
pub use nucfreq::{fragment_nucfreq_rows, write_nucfreq_csv, NucFreqRow};

pub mod consensus;
pub use consensus::{format_level, reference_record, sample_record};

pub mod patterns;
pub use patterns::pattern_records;
