use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use serde::Deserialize;

use segfreq::{DEFAULT_SEGMENT_SIZE, DEFAULT_SEGMENT_STEP, DEFAULT_TOP_N_SEEDS};

pub mod error;
pub use error::ProfileError;

/// Default consensus level emitted when `outputOptions.consensusLevels` is
/// absent.
pub const DEFAULT_CONSENSUS_LEVELS: [f64; 1] = [1.0];

/// Closed 1-based interval on a main fragment.
pub type RefRange = (u64, u64);

/// Which report families a derived fragment participates in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputKind {
    Codfreq,
    Nucfreq,
    Consensus,
    Patterns,
}

/// One step of the codon-aware gap re-placement, §`codonAlignment` entry.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CodonAlignmentStep {
    pub rel_ref_start: Option<u64>,
    pub rel_ref_end: Option<u64>,
    pub window_size: Option<usize>,
    pub min_gap_distance: Option<usize>,
    pub rel_gap_placement_score: Option<String>,
}

/// `codonAlignment` directive: absent/null runs one full-range step,
/// `false` disables re-alignment for the fragment, a list runs every step
/// in order.
#[derive(Debug, Clone, Default)]
pub enum CodonAlignment {
    #[default]
    Default,
    Disabled,
    Steps(Vec<CodonAlignmentStep>),
}

impl CodonAlignment {
    /// Steps to execute, `None` when re-alignment is disabled.
    #[must_use]
    pub fn steps(&self) -> Option<Vec<CodonAlignmentStep>> {
        match self {
            Self::Disabled => None,
            Self::Default => Some(vec![CodonAlignmentStep::default()]),
            Self::Steps(steps) => Some(steps.clone()),
        }
    }
}

#[derive(Debug, Clone)]
pub struct OutputOptions {
    pub consensus_levels: Vec<f64>,
    pub patterns_top_n_seeds: i64,
}

impl Default for OutputOptions {
    fn default() -> Self {
        Self {
            consensus_levels: DEFAULT_CONSENSUS_LEVELS.to_vec(),
            patterns_top_n_seeds: DEFAULT_TOP_N_SEEDS,
        }
    }
}

/// A named reference sequence against which samples were aligned.
#[derive(Debug, Clone)]
pub struct MainFragment {
    pub fragment_name: String,
    pub ref_sequence: String,
    pub segment_size: usize,
    pub segment_step: usize,
}

/// A coordinate range (or union of ranges) projected from a main fragment;
/// drives all per-gene outputs.
#[derive(Debug, Clone)]
pub struct DerivedFragment {
    pub fragment_name: String,
    pub from_fragment: String,
    pub gene_name: Option<String>,
    pub ref_ranges: Vec<RefRange>,
    pub outputs: Vec<OutputKind>,
    pub output_options: OutputOptions,
    pub codon_alignment: CodonAlignment,
}

impl DerivedFragment {
    #[must_use]
    pub fn has_output(&self, kind: OutputKind) -> bool {
        self.outputs.contains(&kind)
    }

    /// Label used in the `gene` column of report rows.
    #[must_use]
    pub fn gene_label(&self) -> &str {
        self.gene_name.as_deref().unwrap_or(&self.fragment_name)
    }

    /// Total number of reference positions covered by the ranges.
    #[must_use]
    pub fn ref_size(&self) -> u64 {
        self.ref_ranges.iter().map(|(start, end)| end - start + 1).sum()
    }
}

/// A main fragment together with its derived fragments, in profile order.
#[derive(Debug, Clone)]
pub struct RefFragment {
    pub main: MainFragment,
    pub fragments: Vec<DerivedFragment>,
}

/// The parsed and validated fragment profile.
#[derive(Debug, Clone)]
pub struct Profile {
    pub refs: Vec<RefFragment>,
}

// ---- raw JSON shapes -------------------------------------------------------

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawProfile {
    fragment_config: Vec<RawFragmentConfig>,
    // untranslated-region assembly is handled by an external collaborator;
    // the key is accepted so shared profiles load unchanged.
    #[serde(default)]
    #[allow(dead_code)]
    sequence_assembly_config: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawFragmentConfig {
    fragment_name: String,
    #[serde(default)]
    ref_sequence: Option<String>,
    #[serde(default)]
    from_fragment: Option<String>,
    #[serde(default)]
    gene_name: Option<String>,
    #[serde(default)]
    ref_start: Option<u64>,
    #[serde(default)]
    ref_end: Option<u64>,
    #[serde(default)]
    ref_ranges: Option<Vec<RefRange>>,
    #[serde(default)]
    segment_size: Option<usize>,
    #[serde(default)]
    segment_step: Option<usize>,
    #[serde(default)]
    outputs: Option<Vec<serde_json::Value>>,
    #[serde(default)]
    output_options: Option<RawOutputOptions>,
    #[serde(default)]
    codon_alignment: Option<serde_json::Value>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawOutputOptions {
    #[serde(default)]
    consensus_levels: Option<Vec<f64>>,
    #[serde(default)]
    patterns_top_n_seeds: Option<i64>,
    // unknown keys are ignored on purpose
}

impl Profile {
    /// Load and validate a profile from a JSON file.
    ///
    /// # Errors
    /// [`ProfileError`] on I/O failures, malformed JSON, or any §profile
    /// validation rule (unknown output kind, unknown `fromFragment`,
    /// unordered ranges, type violations).
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ProfileError> {
        let file = File::open(path)?;
        Self::from_reader(BufReader::new(file))
    }

    pub fn from_reader<R: std::io::Read>(reader: R) -> Result<Self, ProfileError> {
        let raw: RawProfile = serde_json::from_reader(reader)?;
        Self::from_raw(raw)
    }

    pub fn from_json(raw: &str) -> Result<Self, ProfileError> {
        let raw: RawProfile = serde_json::from_str(raw)?;
        Self::from_raw(raw)
    }

    fn from_raw(raw: RawProfile) -> Result<Self, ProfileError> {
        let mut refs: Vec<RefFragment> = Vec::new();

        for config in &raw.fragment_config {
            let Some(ref_sequence) = &config.ref_sequence else {
                continue;
            };
            refs.push(RefFragment {
                main: MainFragment {
                    fragment_name: config.fragment_name.clone(),
                    ref_sequence: ref_sequence.to_uppercase(),
                    segment_size: config.segment_size.unwrap_or(DEFAULT_SEGMENT_SIZE),
                    segment_step: config.segment_step.unwrap_or(DEFAULT_SEGMENT_STEP),
                },
                fragments: Vec::new(),
            });
        }

        for config in raw.fragment_config {
            let Some(from_fragment) = config.from_fragment.clone() else {
                continue;
            };
            let fragment = parse_derived(config, from_fragment)?;
            let parent = refs
                .iter_mut()
                .find(|entry| entry.main.fragment_name == fragment.from_fragment)
                .ok_or_else(|| ProfileError::UnknownFromFragment {
                    fragment: fragment.fragment_name.clone(),
                    from_fragment: fragment.from_fragment.clone(),
                })?;
            parent.fragments.push(fragment);
        }

        Ok(Self { refs })
    }
}

fn parse_derived(
    config: RawFragmentConfig,
    from_fragment: String,
) -> Result<DerivedFragment, ProfileError> {
    let fragment_name = config.fragment_name;

    let ref_ranges = match (config.ref_ranges, config.ref_start, config.ref_end) {
        (Some(ranges), _, _) => ranges,
        (None, Some(start), Some(end)) => vec![(start, end)],
        _ => {
            return Err(ProfileError::invalid(format!(
                "fragment '{fragment_name}' declares neither refRanges nor refStart/refEnd"
            )))
        }
    };
    let ordered = ref_ranges
        .iter()
        .zip(ref_ranges.iter().skip(1))
        .all(|(left, right)| left.1 < right.0);
    if ref_ranges.is_empty()
        || ref_ranges.iter().any(|(start, end)| *start < 1 || end < start)
        || !ordered
    {
        return Err(ProfileError::InvalidRefRanges { fragment: fragment_name });
    }

    let outputs = match config.outputs {
        None => vec![OutputKind::Codfreq],
        Some(values) => values
            .into_iter()
            .map(|value| {
                serde_json::from_value::<OutputKind>(value.clone()).map_err(|_| {
                    ProfileError::UnknownOutput {
                        fragment: fragment_name.clone(),
                        output: value.to_string(),
                    }
                })
            })
            .collect::<Result<Vec<_>, _>>()?,
    };

    let output_options = {
        let raw = config.output_options.unwrap_or_default();
        let defaults = OutputOptions::default();
        OutputOptions {
            consensus_levels: raw.consensus_levels.unwrap_or(defaults.consensus_levels),
            patterns_top_n_seeds: raw
                .patterns_top_n_seeds
                .unwrap_or(defaults.patterns_top_n_seeds),
        }
    };

    let codon_alignment = match config.codon_alignment {
        None | Some(serde_json::Value::Null) => CodonAlignment::Default,
        Some(serde_json::Value::Bool(false)) => CodonAlignment::Disabled,
        Some(value @ serde_json::Value::Array(_)) => {
            let steps: Vec<CodonAlignmentStep> =
                serde_json::from_value(value).map_err(|err| {
                    ProfileError::invalid(format!(
                        "fragment '{fragment_name}' carries a malformed codonAlignment: {err}"
                    ))
                })?;
            CodonAlignment::Steps(steps)
        }
        Some(other) => {
            return Err(ProfileError::invalid(format!(
                "fragment '{fragment_name}' carries a malformed codonAlignment: expected false, null or a list, found {other}"
            )))
        }
    };

    Ok(DerivedFragment {
        fragment_name,
        from_fragment,
        gene_name: config.gene_name,
        ref_ranges,
        outputs,
        output_options,
        codon_alignment,
    })
}
