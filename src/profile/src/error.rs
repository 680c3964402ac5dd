use thiserror::Error;

#[derive(Error, Debug)]
pub enum ProfileError {
    #[error("Invalid profile: {reason}")]
    Invalid { reason: String },

    #[error("Invalid profile: fragment '{fragment}' declares an unknown output type '{output}'. Accepted values: codfreq, nucfreq, consensus, patterns")]
    UnknownOutput { fragment: String, output: String },

    #[error("Invalid profile: fragment '{fragment}' references unknown main fragment '{from_fragment}'")]
    UnknownFromFragment { fragment: String, from_fragment: String },

    #[error("Invalid profile: fragment '{fragment}' declares unordered or overlapping refRanges")]
    InvalidRefRanges { fragment: String },

    #[error("Failed to parse profile JSON")]
    Json(#[from] serde_json::Error),

    #[error("Failed to open profile file")]
    Io(#[from] std::io::Error),
}

impl ProfileError {
    pub fn invalid(reason: impl Into<String>) -> Self {
        Self::Invalid { reason: reason.into() }
    }
}
