/// Extraction-specific failure kinds, per spec §4.2. All variants are
/// fatal to the `extract` phase; the Extractor converts them to
/// `models::PipelineError::Input` at the boundary where the distinction
/// between these variants no longer matters to the caller.
#[derive(Debug, thiserror::Error)]
pub enum ExtractError {
    #[error("source not found: {0}")]
    SourceNotFound(String),

    #[error("unsupported source format: {0} (expected .json or .tar)")]
    UnsupportedFormat(String),

    #[error("invalid json in source: {0}")]
    InvalidJson(#[from] serde_json::Error),

    #[error("source is missing required metadata: {0}")]
    MissingMetadata(String),

    #[error("io error reading source: {0}")]
    Io(#[from] std::io::Error),
}

impl From<ExtractError> for models::PipelineError {
    fn from(err: ExtractError) -> Self {
        models::PipelineError::Input(err.to_string())
    }
}
