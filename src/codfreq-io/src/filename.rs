use std::path::{Path, PathBuf};

use crate::consensus::format_level;

/// `{sample}.{fragment}.bam`: the aligner's output for one sample against
/// one main fragment.
#[must_use]
pub fn name_bamfile(sample: &Path, refname: &str) -> PathBuf {
    with_suffix(sample, &format!("{refname}.bam"))
}

/// `{sample}.{fragment}.segfreq`: the durable sidecar of one
/// (sample, main fragment) pair.
#[must_use]
pub fn name_segfreq(sample: &Path, refname: &str) -> PathBuf {
    with_suffix(sample, &format!("{refname}.segfreq"))
}

/// `{sample}.codfreq`
#[must_use]
pub fn name_codfreq(sample: &Path) -> PathBuf {
    with_suffix(sample, "codfreq")
}

/// `{sample}.nucfreq`
#[must_use]
pub fn name_nucfreq(sample: &Path) -> PathBuf {
    with_suffix(sample, "nucfreq")
}

/// `{sample}.{fragment}-patterns.fasta`
#[must_use]
pub fn name_patterns(sample: &Path, fragment_name: &str) -> PathBuf {
    with_suffix(sample, &format!("{fragment_name}-patterns.fasta"))
}

/// `{dir}/consensus-{gene}-{level%}.fasta`: one multi-sample file per
/// (gene, consensus level).
#[must_use]
pub fn name_consensus(dir: &Path, gene: &str, level: f64) -> PathBuf {
    dir.join(format!("consensus-{gene}-{}.fasta", format_level(level)))
}

/// Base name of the sample, for FASTA/CSV record headers.
#[must_use]
pub fn sample_basename(sample: &Path) -> String {
    sample
        .file_name()
        .map_or_else(String::new, |name| name.to_string_lossy().into_owned())
}

fn with_suffix(sample: &Path, suffix: &str) -> PathBuf {
    let mut raw = sample.as_os_str().to_os_string();
    raw.push(".");
    raw.push(suffix);
    PathBuf::from(raw)
}
