use std::collections::BTreeSet;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use log::{error, info, warn};

use codfreq_io::filename::{
    name_bamfile, name_codfreq, name_consensus, name_nucfreq, name_patterns, name_segfreq,
    sample_basename,
};
use codfreq_io::{
    atomic_write, fragment_codfreq_rows, fragment_nucfreq_rows, pattern_records,
    reference_record, sample_record, write_codfreq_csv, write_multi_alignment,
    write_nucfreq_csv, AlignedRecord, CodFreqRow, NucFreqRow,
};
use logger::LogFormat;
use profile::{OutputKind, Profile, RefFragment};
use segfreq::SegFreq;

pub mod error;
pub use error::SamError;

pub mod posnas;
pub use posnas::{single_read_posnas, PosObs};

pub mod chunker;
pub use chunker::{chunk_bamfile, ChunkPlan};

pub mod window;
pub use window::read_segments;

pub mod driver;
pub use driver::{sam_to_segfreq, DriverOptions};

/// Run the whole pipeline over a work directory: one SegFreq sidecar per
/// (sample, main fragment), then every configured report.
///
/// Per-sample failures are logged and the run moves on to the next sample;
/// only setup failures (unreadable profile or work directory, thread pool)
/// abort the run.
pub fn run(cli: &parser::Cli) -> Result<()> {
    let log_format: LogFormat = cli
        .log_format
        .parse::<LogFormat>()
        .map_err(anyhow::Error::msg)?;

    // ----------------------------- Load profile
    info!("Loading profile {}...", cli.profile.display());
    let profile = Profile::from_path(&cli.profile)
        .with_context(|| format!("While loading profile '{}'", cli.profile.display()))?;
    if profile.refs.is_empty() {
        warn!("The profile defines no main fragment: nothing to do.");
        return Ok(());
    }

    // ----------------------------- Configure worker pool
    if cli.threads > 0 {
        rayon::ThreadPoolBuilder::new()
            .num_threads(cli.threads)
            .build_global()
            .context("While building the worker thread pool")?;
    }

    // ----------------------------- Discover samples
    let samples = discover_samples(&cli.workdir, &profile)
        .with_context(|| format!("While scanning '{}'", cli.workdir.display()))?;
    if samples.is_empty() {
        warn!(
            "No '{{sample}}.{{fragment}}.bam' file found under '{}'",
            cli.workdir.display()
        );
        return Ok(());
    }
    info!("Found {} sample(s)", samples.len());

    let options = DriverOptions {
        chunk_size: cli.chunk_size,
        site_quality_cutoff: cli.site_quality_cutoff,
    };

    // ----------------------------- Per-sample processing
    for sample in &samples {
        if let Err(err) = process_sample(sample, &profile, &options, log_format) {
            error!("Failed to process sample '{}': {err:#}", sample.display());
        }
    }

    // ----------------------------- Multi-sample consensus files
    save_consensus(&cli.workdir, &samples, &profile)?;

    Ok(())
}

/// Samples are the `{sample}.{fragment}.bam` files of the work directory,
/// one entry per distinct `{sample}` prefix.
fn discover_samples(workdir: &Path, profile: &Profile) -> Result<Vec<PathBuf>> {
    let mut samples: BTreeSet<PathBuf> = BTreeSet::new();
    for entry in std::fs::read_dir(workdir)? {
        let path = entry?.path();
        if !path.is_file() {
            continue;
        }
        let Some(name) = path.file_name().and_then(|name| name.to_str()) else {
            continue;
        };
        for ref_fragment in &profile.refs {
            let suffix = format!(".{}.bam", ref_fragment.main.fragment_name);
            if let Some(sample) = name.strip_suffix(&suffix) {
                samples.insert(workdir.join(sample));
            }
        }
    }
    Ok(samples.into_iter().collect())
}

fn process_sample(
    sample: &Path,
    profile: &Profile,
    options: &DriverOptions,
    log_format: LogFormat,
) -> Result<()> {
    // ----------------------------- Build and persist one SegFreq per fragment
    let mut built: Vec<(&RefFragment, SegFreq)> = Vec::new();
    for ref_fragment in &profile.refs {
        let refname = &ref_fragment.main.fragment_name;
        let bam_path = name_bamfile(sample, refname);
        if !bam_path.is_file() {
            continue;
        }
        info!("Processing {}...", bam_path.display());

        let segfreq = sam_to_segfreq(&bam_path, &ref_fragment.main, options, log_format)?;

        let sidecar = name_segfreq(sample, refname);
        atomic_write(&sidecar, |writer| segfreq.dump(writer).map_err(Into::into))
            .with_context(|| format!("While persisting '{}'", sidecar.display()))?;
        info!("Saved {}", sidecar.display());
        built.push((ref_fragment, segfreq));
    }

    // ----------------------------- Reports
    let basename = sample_basename(sample);
    let mut codfreq_rows: Vec<CodFreqRow> = Vec::new();
    let mut nucfreq_rows: Vec<NucFreqRow> = Vec::new();
    let mut wants_codfreq = false;
    let mut wants_nucfreq = false;

    for (ref_fragment, segfreq) in &built {
        for fragment in &ref_fragment.fragments {
            if fragment.has_output(OutputKind::Codfreq) {
                wants_codfreq = true;
                codfreq_rows.extend(fragment_codfreq_rows(
                    segfreq,
                    &ref_fragment.main,
                    fragment,
                )?);
            }
            if fragment.has_output(OutputKind::Nucfreq) {
                wants_nucfreq = true;
                nucfreq_rows.extend(fragment_nucfreq_rows(segfreq, fragment));
            }
            if fragment.has_output(OutputKind::Patterns) {
                let records =
                    pattern_records(&basename, segfreq, &ref_fragment.main, fragment);
                let path = name_patterns(sample, &fragment.fragment_name);
                atomic_write(&path, |writer| write_multi_alignment(writer, &records))
                    .with_context(|| format!("While writing '{}'", path.display()))?;
                let pattern_count = records.len() - fragment.ref_ranges.len();
                info!("Saved {pattern_count} pattern(s) to {}", path.display());
            }
        }
    }

    if wants_codfreq {
        let path = name_codfreq(sample);
        atomic_write(&path, |writer| write_codfreq_csv(writer, &codfreq_rows))
            .with_context(|| format!("While writing '{}'", path.display()))?;
        info!("Saved codfreq to {}", path.display());
    }
    if wants_nucfreq {
        let path = name_nucfreq(sample);
        atomic_write(&path, |writer| write_nucfreq_csv(writer, &nucfreq_rows))
            .with_context(|| format!("While writing '{}'", path.display()))?;
        info!("Saved nucfreq to {}", path.display());
    }
    Ok(())
}

/// Write one multi-sample consensus FASTA per (gene, level), leading with
/// the reference record so every file shares the reference coordinate grid.
/// SegFreqs are reloaded from their sidecars; samples lacking one are
/// skipped with a warning.
fn save_consensus(workdir: &Path, samples: &[PathBuf], profile: &Profile) -> Result<()> {
    for ref_fragment in &profile.refs {
        let refname = &ref_fragment.main.fragment_name;
        let wanted: Vec<_> = ref_fragment
            .fragments
            .iter()
            .filter(|fragment| {
                fragment.has_output(OutputKind::Consensus) && fragment.gene_name.is_some()
            })
            .collect();
        if wanted.is_empty() {
            continue;
        }

        // one sidecar load per sample serves every fragment and level
        let mut loaded: Vec<(String, SegFreq)> = Vec::new();
        for sample in samples {
            let sidecar = name_segfreq(sample, refname);
            if !sidecar.is_file() {
                warn!("Missing sidecar '{}': sample skipped", sidecar.display());
                continue;
            }
            let reader = BufReader::new(File::open(&sidecar)?);
            match SegFreq::load(reader) {
                Ok(segfreq) => loaded.push((sample_basename(sample), segfreq)),
                Err(err) => {
                    error!("Failed to load '{}': {err}", sidecar.display());
                }
            }
        }

        for fragment in wanted {
            let gene = fragment.gene_label();
            for &level in &fragment.output_options.consensus_levels {
                let mut records: Vec<AlignedRecord> =
                    vec![reference_record(&ref_fragment.main, fragment)];
                for (basename, segfreq) in &loaded {
                    records.push(sample_record(basename, segfreq, fragment, level));
                }
                let path = name_consensus(workdir, gene, level);
                atomic_write(&path, |writer| write_multi_alignment(writer, &records))
                    .with_context(|| format!("While writing '{}'", path.display()))?;
                info!("Saved consensus to {}", path.display());
            }
        }
    }
    Ok(())
}
