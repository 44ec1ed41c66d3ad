use thiserror::Error;

/// Structural mismatch between a submission and the circuit's declared shape.
///
/// Detected before any curve arithmetic runs.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InputShapeError {
    #[error("expected {expected} public instances, got {actual}")]
    InstanceCount { expected: usize, actual: usize },

    #[error("expected a {expected}-byte proof, got {actual} bytes")]
    ProofLength { expected: usize, actual: usize },
}

/// Why a particular `(proof, instances)` pair was not accepted.
///
/// Every variant collapses to `false` at the verifier boundary; the variant
/// only exists so callers can report the reason.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Rejection {
    #[error(transparent)]
    Shape(#[from] InputShapeError),

    #[error("malformed proof encoding: {0}")]
    MalformedProof(String),

    #[error("instance {index} is not a canonical field element")]
    OutOfField { index: usize },

    #[error("proof does not verify against the given instances")]
    Invalid,
}

/// Failure of the witness/proof pipeline. Never touches gate state.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("malformed circuit artifact: {0}")]
    MalformedArtifact(String),

    #[error("malformed input: {0}")]
    MalformedInput(String),

    #[error("input shape mismatch: circuit expects {expected} values, got {actual}")]
    ShapeMismatch { expected: usize, actual: usize },

    #[error("witness is inconsistent with the circuit: {0}")]
    WitnessMismatch(String),

    #[error("proof generation failed: {0}")]
    Proving(String),

    #[error("failed to encode pipeline output: {0}")]
    Encoding(String),

    #[error("no proving backend configured")]
    BackendUnavailable,

    #[error("{stage} timed out after {secs}s")]
    Timeout { stage: &'static str, secs: u64 },

    #[error("{stage} was aborted: {reason}")]
    Aborted { stage: &'static str, reason: String },
}

/// A submission that never reached a verification decision.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("malformed submission: {0}")]
    MalformedRequest(String),

    #[error("submission did not complete: {0}")]
    Interrupted(String),
}

/// Loading or decoding key material failed.
#[derive(Debug, Error)]
pub enum KeyError {
    #[error("failed to read key at {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to decode key: {0}")]
    Decode(String),

    #[error("verifying key declares no public instances")]
    EmptyVerifyingKey,

    #[error(transparent)]
    Model(#[from] PipelineError),
}

#[derive(Debug, Error)]
pub enum DeploymentError {
    #[error("deployment record already exists at {0}")]
    AlreadyDeployed(String),

    #[error("deployment record I/O failed at {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid deployment record at {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("key setup failed: {0}")]
    Setup(String),

    #[error(transparent)]
    Key(#[from] KeyError),
}
