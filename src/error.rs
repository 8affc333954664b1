use thiserror::Error;

// ─── Top-level error hierarchy ───────────────────────────────────────────────

/// Structured error hierarchy for the pipeline engine.
///
/// Each subsystem defines its own error variant. Callers match on these to
/// decide recovery strategy; internal code continues to use `anyhow::Result`
/// for ad-hoc context chains.
#[derive(Debug, Error)]
pub enum PipelineError {
    // ── Brief ingress ────────────────────────────────────────────────────
    #[error("brief: {0}")]
    Brief(#[from] BriefError),

    // ── Model clients ────────────────────────────────────────────────────
    #[error("model: {0}")]
    Model(#[from] ModelError),

    // ── Director stage ───────────────────────────────────────────────────
    #[error("director: {0}")]
    Director(#[from] DirectorError),

    // ── Reference library ────────────────────────────────────────────────
    #[error("reference: {0}")]
    Reference(#[from] ReferenceError),

    // ── Asset generation ─────────────────────────────────────────────────
    #[error("asset: {0}")]
    Asset(#[from] AssetError),

    // ── Caller-initiated cancellation ────────────────────────────────────
    #[error("cancelled")]
    Cancelled,

    #[error("io: {0}")]
    Io(#[from] std::io::Error),

    // ── Generic fallthrough (wraps anyhow for interop) ──────────────────
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

// ─── Brief errors ────────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum BriefError {
    #[error("missing required field: {0}")]
    MissingField(&'static str),

    #[error("invalid field {field}: {reason}")]
    InvalidField { field: &'static str, reason: String },
}

// ─── Model client errors ─────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("model {model} request failed: {message}")]
    Request { model: String, message: String },

    #[error("model {model} rate-limited")]
    RateLimited { model: String },

    #[error("stage {stage}: output failed schema validation after {attempts} attempt(s): {message}")]
    SchemaViolation {
        stage: String,
        attempts: u32,
        message: String,
    },

    #[error("stage {stage}: image ladder exhausted ({tried})")]
    FallbackExhausted { stage: String, tried: String },

    #[error("model {model} returned no content")]
    EmptyResponse { model: String },
}

// ─── Director errors ─────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum DirectorError {
    #[error("directions output invalid after repairs: {0}")]
    OutputInvalid(String),
}

// ─── Reference library errors ────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ReferenceError {
    #[error("index unreadable at {path}: {reason}")]
    IndexUnreadable { path: String, reason: String },

    #[error("styleguide {path} does not conform to the documented format: {reason}")]
    StyleguideMalformed { path: String, reason: String },
}

// ─── Asset errors ────────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum AssetError {
    #[error("{asset} generation failed: {reason}")]
    Generation { asset: String, reason: String },

    #[error("logo variant derivation failed: {0}")]
    Variant(String),

    #[error("render failed: {0}")]
    Render(String),
}

// ─── Convenience re-exports ──────────────────────────────────────────────────

/// Shorthand result type for the crate.
pub type Result<T> = std::result::Result<T, PipelineError>;
