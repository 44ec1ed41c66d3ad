use serde::{Deserialize, Serialize};

use crate::gate::GatedState;
use crate::uint::PublicInstances;
use crate::witness::Witness;

/// Body of `/verify` and `/submit`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProofSubmission {
    /// Hex-encoded proof, `0x` prefix optional.
    pub proof: String,
    pub instances: PublicInstances,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyResponse {
    pub is_valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitResponse {
    /// Verdict for this submission only.
    pub verified: bool,
    pub unlocked: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusResponse {
    pub state: GatedState,
    pub unlocked: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceResponse {
    pub resource: String,
    pub granted: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WitnessRequest {
    /// Contents of the compiled circuit file.
    pub compiled_circuit: String,
    /// Contents of the input file.
    pub input: String,
}

#[derive(Debug, Serialize)]
pub struct WitnessResponse {
    pub witness: Witness,
}

#[derive(Debug, Deserialize)]
pub struct ProveRequest {
    pub witness: Witness,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: String,
    pub num_instances: usize,
    pub prover_enabled: bool,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}
