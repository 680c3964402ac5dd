use std::path::PathBuf;

use clap::Parser;
use serde::Serialize;

use log::info;

/// Default number of BAM records handled by one worker chunk.
pub const DEFAULT_CHUNK_SIZE: usize = 25_000;

#[derive(Parser, Debug, Serialize)]
#[clap(name = "codfreq-rs", version, about)]
pub struct Cli {
    /// Directory containing the aligned sample files.
    ///
    /// Every file named '{sample}.{fragment}.bam', where '{fragment}' is a
    /// main fragment of the profile, is treated as one sample. All reports
    /// are written next to their sample files.
    pub workdir: PathBuf,

    /// Fragment profile (JSON).
    ///
    /// Defines the main reference fragments and the derived per-gene
    /// fragments, together with their outputs, output options and codon
    /// alignment directives.
    #[clap(short = 'r', long)]
    pub profile: PathBuf,

    /// Number of worker threads. 0 uses every available core.
    #[clap(short = '@', long, default_value("0"))]
    pub threads: usize,

    /// Number of BAM records per worker chunk.
    #[clap(long, default_value("25000"))]
    pub chunk_size: usize,

    /// Minimal required Base Quality (BQ) for an observation to be counted.
    ///
    /// Bases whose quality falls below the cutoff are treated as unobserved
    /// positions. The default keeps every base.
    #[clap(short = 'M', long, default_value("0"))]
    pub site_quality_cutoff: u8,

    /// Progress reporting format.
    ///
    /// 'text' renders progress bars; 'json' emits one machine-readable JSON
    /// event per line.
    #[clap(long, default_value("text"), possible_values(["text", "json"]))]
    pub log_format: String,

    /// Set the verbosity level (-v -vv -vvv -vvvv)
    ///
    /// Set the verbosity level of this program. With multiple levels
    ///    -v : Info  |  -vv : Debug  | -vvv : Trace
    /// By default, the program will still output Warnings. Use --quiet/-q to disable them
    #[clap(short = 'v', long, parse(from_occurrences), global = true)]
    pub verbose: u8,

    /// Disable warnings.
    ///
    /// By default, warnings are emitted and redirected to the console, even without verbose mode on.
    /// Use this argument to disable this. Only errors will be displayed.
    #[clap(short = 'q', long, global = true)]
    pub quiet: bool,
}

impl Cli {
    /// Echo the parsed arguments at info level.
    pub fn serialize(&self) {
        match serde_yaml::to_string(self) {
            Ok(yaml) => info!("\n---- Command line args ----\n{}---", yaml),
            Err(err) => info!("Failed to serialize command line args: {err}"),
        }
    }

    /// Effective verbosity, accounting for `--quiet`.
    #[must_use]
    pub fn verbosity(&self) -> u8 {
        self.verbose + u8::from(!self.quiet)
    }
}
