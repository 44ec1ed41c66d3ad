use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;

use crate::error::{PipelineError, TransportError};
use crate::gate::GatedResource;
use crate::pipeline::Pipeline;
use crate::prover::{decode_hex, ProofArtifact};
use crate::types::{
    ErrorResponse, HealthResponse, ProofSubmission, ProveRequest, ResourceResponse,
    StatusResponse, SubmitResponse, VerifyResponse, WitnessRequest, WitnessResponse,
};
/// Shared application state passed to all route handlers.
pub struct AppState {
    pub gate: Arc<GatedResource>,
    pub pipeline: Pipeline,
}

/// Error body plus status, for every non-2xx response.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (
            self.status,
            Json(ErrorResponse {
                error: self.message,
            }),
        )
            .into_response()
    }
}

impl From<TransportError> for ApiError {
    fn from(err: TransportError) -> Self {
        let status = match err {
            TransportError::MalformedRequest(_) => StatusCode::BAD_REQUEST,
            TransportError::Interrupted(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        Self::new(status, err.to_string())
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        // keep axum's status (400/415/422) but report it as a transport failure
        let status = rejection.status();
        let err = TransportError::MalformedRequest(rejection.body_text());
        Self::new(status, err.to_string())
    }
}

impl From<PipelineError> for ApiError {
    fn from(err: PipelineError) -> Self {
        let status = match err {
            PipelineError::MalformedArtifact(_)
            | PipelineError::MalformedInput(_)
            | PipelineError::ShapeMismatch { .. }
            | PipelineError::WitnessMismatch(_) => StatusCode::UNPROCESSABLE_ENTITY,
            PipelineError::BackendUnavailable => StatusCode::SERVICE_UNAVAILABLE,
            PipelineError::Timeout { .. } => StatusCode::GATEWAY_TIMEOUT,
            PipelineError::Proving(_)
            | PipelineError::Encoding(_)
            | PipelineError::Aborted { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        };
        Self::new(status, err.to_string())
    }
}

type ApiResult<T> = Result<Json<T>, ApiError>;

fn decode_proof(hex_proof: &str) -> Result<Vec<u8>, TransportError> {
    decode_hex(hex_proof)
        .map_err(|e| TransportError::MalformedRequest(format!("proof is not valid hex: {}", e)))
}

/// POST /verify: Stateless verification.
///
/// Request body: ProofSubmission { proof (hex), instances (uint256 strings) }
/// Response: VerifyResponse { isValid, reason? }
pub async fn verify_handler(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<ProofSubmission>, JsonRejection>,
) -> ApiResult<VerifyResponse> {
    let Json(req) = payload?;
    let proof = decode_proof(&req.proof)?;
    let instances = req.instances;
    let verifier = Arc::clone(state.gate.verifier());

    let verdict = tokio::task::spawn_blocking(move || verifier.check(&proof, &instances))
        .await
        .map_err(|e| TransportError::Interrupted(e.to_string()))?;

    tracing::info!("Verification result: {}", verdict.is_ok());

    Ok(Json(VerifyResponse {
        is_valid: verdict.is_ok(),
        reason: verdict.err().map(|r| r.to_string()),
    }))
}

/// POST /submit: Verify and, on success, unlock the gated resource.
///
/// Request body: ProofSubmission
/// Response: SubmitResponse { verified, unlocked }
pub async fn submit_handler(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<ProofSubmission>, JsonRejection>,
) -> ApiResult<SubmitResponse> {
    let Json(req) = payload?;
    let proof = decode_proof(&req.proof)?;
    let instances = req.instances;
    let gate = Arc::clone(&state.gate);

    let verified = tokio::task::spawn_blocking(move || gate.submit(&proof, &instances))
        .await
        .map_err(|e| TransportError::Interrupted(e.to_string()))?;
    let unlocked = state.gate.is_unlocked();

    tracing::info!("Submission verified={} unlocked={}", verified, unlocked);

    Ok(Json(SubmitResponse { verified, unlocked }))
}

/// GET /status: Current lock state.
pub async fn status_handler(State(state): State<Arc<AppState>>) -> Json<StatusResponse> {
    let gate_state = state.gate.state();
    Json(StatusResponse {
        state: gate_state,
        unlocked: state.gate.is_unlocked(),
    })
}

/// GET /resource: The gated capability; 423 until unlocked.
pub async fn resource_handler(State(state): State<Arc<AppState>>) -> ApiResult<ResourceResponse> {
    if !state.gate.is_unlocked() {
        return Err(ApiError::new(
            StatusCode::LOCKED,
            "resource is locked: submit a valid proof first",
        ));
    }
    Ok(Json(ResourceResponse {
        resource: "inference-result".to_string(),
        granted: true,
    }))
}

/// POST /witness: Generate a witness from a compiled circuit and an input file.
///
/// Request body: WitnessRequest { compiledCircuit, input } (file contents)
/// Response: WitnessResponse { witness }
pub async fn witness_handler(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<WitnessRequest>, JsonRejection>,
) -> ApiResult<WitnessResponse> {
    let Json(req) = payload?;
    let witness = state
        .pipeline
        .generate_witness(req.compiled_circuit.into_bytes(), req.input.into_bytes())
        .await?;
    Ok(Json(WitnessResponse { witness }))
}

/// POST /prove: Prove a witness with the configured proving key.
///
/// Request body: ProveRequest { witness }
/// Response: ProofArtifact { hex_proof, instances }
pub async fn prove_handler(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<ProveRequest>, JsonRejection>,
) -> ApiResult<ProofArtifact> {
    let Json(req) = payload?;
    let artifact = state.pipeline.prove(&req.witness).await?;
    Ok(Json(artifact))
}

/// GET /health: Health check endpoint.
pub async fn health_handler(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        num_instances: state.gate.verifier().num_instances(),
        prover_enabled: state.pipeline.has_backend(),
    })
}

/// Build the axum router with all routes.
pub fn build_router(state: Arc<AppState>) -> axum::Router {
    use axum::routing::{get, post};
    use tower_http::cors::{Any, CorsLayer};

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    axum::Router::new()
        .route("/verify", post(verify_handler))
        .route("/submit", post(submit_handler))
        .route("/status", get(status_handler))
        .route("/resource", get(resource_handler))
        .route("/witness", post(witness_handler))
        .route("/prove", post(prove_handler))
        .route("/health", get(health_handler))
        .layer(cors)
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{fixture, FIXTURE_INPUT};
    use crate::prover::Groth16Prover;
    use crate::verifier::ProofVerifier;
    use crate::witness::ModelWitnessGenerator;
    use axum_test::TestServer;
    use std::time::Duration;

    fn app_state(with_prover: bool) -> Arc<AppState> {
        let f = fixture();
        let verifier: Arc<dyn ProofVerifier> = f.verifier.clone();
        let backend: Option<Arc<dyn crate::prover::ProofBackend>> = if with_prover {
            Some(Arc::new(Groth16Prover::new(
                f.model.clone(),
                f.proving_key.clone(),
            )))
        } else {
            None
        };
        Arc::new(AppState {
            gate: Arc::new(GatedResource::new(verifier)),
            pipeline: Pipeline::new(
                Arc::new(ModelWitnessGenerator),
                backend,
                Duration::from_secs(60),
            ),
        })
    }

    fn create_test_app() -> TestServer {
        TestServer::new(build_router(app_state(true))).unwrap()
    }

    fn valid_body() -> serde_json::Value {
        let f = fixture();
        serde_json::json!({
            "proof": format!("0x{}", hex::encode(&f.proof)),
            "instances": f.instances,
        })
    }

    fn tampered_body() -> serde_json::Value {
        let f = fixture();
        let mut proof = f.proof.clone();
        proof[5] ^= 0x01;
        serde_json::json!({
            "proof": hex::encode(&proof),
            "instances": f.instances,
        })
    }

    // ──────────────────────────────────────────────
    // GET /health
    // ──────────────────────────────────────────────

    #[tokio::test]
    async fn test_health_reports_circuit_shape() {
        let server = create_test_app();
        let response = server.get("/health").await;
        response.assert_status_ok();
        let body: serde_json::Value = response.json();
        assert_eq!(body["status"], "ok");
        assert_eq!(body["numInstances"], 3);
        assert_eq!(body["proverEnabled"], true);
    }

    // ──────────────────────────────────────────────
    // POST /verify
    // ──────────────────────────────────────────────

    #[tokio::test]
    async fn test_verify_valid_proof() {
        let server = create_test_app();
        let response = server.post("/verify").json(&valid_body()).await;
        response.assert_status_ok();
        let body: serde_json::Value = response.json();
        assert_eq!(body["isValid"], true);
        assert!(body.get("reason").is_none());
    }

    #[tokio::test]
    async fn test_verify_tampered_proof() {
        let server = create_test_app();
        let response = server.post("/verify").json(&tampered_body()).await;
        response.assert_status_ok();
        let body: serde_json::Value = response.json();
        assert_eq!(body["isValid"], false);
        assert!(body["reason"].is_string());
    }

    #[tokio::test]
    async fn test_verify_short_instances_reports_shape() {
        let server = create_test_app();
        let mut body = valid_body();
        body["instances"].as_array_mut().unwrap().pop();
        let response = server.post("/verify").json(&body).await;
        response.assert_status_ok();
        let body: serde_json::Value = response.json();
        assert_eq!(body["isValid"], false);
        assert_eq!(body["reason"], "expected 3 public instances, got 2");
    }

    #[tokio::test]
    async fn test_verify_out_of_field_instance() {
        let server = create_test_app();
        let mut body = valid_body();
        // BN254 scalar modulus itself
        body["instances"][0] = serde_json::json!(
            "21888242871839275222246405745257275088548364400416034343698204186575808495617"
        );
        let response = server.post("/verify").json(&body).await;
        let body: serde_json::Value = response.json();
        assert_eq!(body["isValid"], false);
        assert_eq!(body["reason"], "instance 0 is not a canonical field element");
    }

    #[tokio::test]
    async fn test_verify_does_not_unlock() {
        let server = create_test_app();
        server.post("/verify").json(&valid_body()).await.assert_status_ok();
        let body: serde_json::Value = server.get("/status").await.json();
        assert_eq!(body["unlocked"], false);
    }

    #[tokio::test]
    async fn test_verify_bad_hex_is_transport_error() {
        let server = create_test_app();
        let response = server
            .post("/verify")
            .json(&serde_json::json!({"proof": "0xnothex", "instances": ["1", "2", "3"]}))
            .await;
        response.assert_status(StatusCode::BAD_REQUEST);
        let body: serde_json::Value = response.json();
        assert!(body["error"].as_str().unwrap().contains("malformed submission"));
    }

    #[tokio::test]
    async fn test_verify_missing_field_returns_422() {
        let server = create_test_app();
        let response = server
            .post("/verify")
            .json(&serde_json::json!({"proof": "0x00"}))
            .await;
        response.assert_status(StatusCode::UNPROCESSABLE_ENTITY);
        let body: serde_json::Value = response.json();
        assert!(body["error"].as_str().unwrap().contains("malformed submission"));
    }

    #[tokio::test]
    async fn test_verify_float_instance_returns_422() {
        let server = create_test_app();
        let response = server
            .post("/verify")
            .json(&serde_json::json!({"proof": "0x00", "instances": [1.5, 2, 3]}))
            .await;
        response.assert_status(StatusCode::UNPROCESSABLE_ENTITY);
    }

    // ──────────────────────────────────────────────
    // POST /submit, GET /status, GET /resource
    // ──────────────────────────────────────────────

    #[tokio::test]
    async fn test_starts_locked() {
        let server = create_test_app();
        let body: serde_json::Value = server.get("/status").await.json();
        assert_eq!(body["state"], "locked");
        assert_eq!(body["unlocked"], false);

        let response = server.get("/resource").await;
        response.assert_status(StatusCode::LOCKED);
    }

    #[tokio::test]
    async fn test_submit_invalid_keeps_lock() {
        let server = create_test_app();
        let response = server.post("/submit").json(&tampered_body()).await;
        response.assert_status_ok();
        let body: serde_json::Value = response.json();
        assert_eq!(body["verified"], false);
        assert_eq!(body["unlocked"], false);
        server.get("/resource").await.assert_status(StatusCode::LOCKED);
    }

    #[tokio::test]
    async fn test_submit_valid_unlocks_resource() {
        let server = create_test_app();
        let response = server.post("/submit").json(&valid_body()).await;
        response.assert_status_ok();
        let body: serde_json::Value = response.json();
        assert_eq!(body["verified"], true);
        assert_eq!(body["unlocked"], true);

        let status: serde_json::Value = server.get("/status").await.json();
        assert_eq!(status["state"], "unlocked");

        let resource = server.get("/resource").await;
        resource.assert_status_ok();
        let resource: serde_json::Value = resource.json();
        assert_eq!(resource["granted"], true);
    }

    #[tokio::test]
    async fn test_submit_after_unlock_reports_per_call_verdict() {
        let server = create_test_app();
        server.post("/submit").json(&valid_body()).await.assert_status_ok();

        let body: serde_json::Value = server.post("/submit").json(&tampered_body()).await.json();
        assert_eq!(body["verified"], false);
        assert_eq!(body["unlocked"], true);

        let body: serde_json::Value = server.post("/submit").json(&valid_body()).await.json();
        assert_eq!(body["verified"], true);
        assert_eq!(body["unlocked"], true);
    }

    #[tokio::test]
    async fn test_malformed_submission_leaves_state_unchanged() {
        let server = create_test_app();
        let response = server
            .post("/submit")
            .json(&serde_json::json!({"proof": "zz", "instances": []}))
            .await;
        response.assert_status(StatusCode::BAD_REQUEST);
        let body: serde_json::Value = server.get("/status").await.json();
        assert_eq!(body["unlocked"], false);
    }

    // ──────────────────────────────────────────────
    // POST /witness, POST /prove
    // ──────────────────────────────────────────────

    fn witness_body(input: &str) -> serde_json::Value {
        serde_json::json!({
            "compiledCircuit": serde_json::to_string(&fixture().model).unwrap(),
            "input": input,
        })
    }

    #[tokio::test]
    async fn test_witness_generation() {
        let server = create_test_app();
        let response = server.post("/witness").json(&witness_body(FIXTURE_INPUT)).await;
        response.assert_status_ok();
        let body: serde_json::Value = response.json();
        assert_eq!(body["witness"]["outputs"], serde_json::json!(["30", "2", "3"]));
    }

    #[tokio::test]
    async fn test_witness_shape_mismatch_returns_422() {
        let server = create_test_app();
        let response = server
            .post("/witness")
            .json(&witness_body(r#"{"input_data": [[1, 2]]}"#))
            .await;
        response.assert_status(StatusCode::UNPROCESSABLE_ENTITY);
        let body: serde_json::Value = response.json();
        assert!(body["error"].as_str().unwrap().contains("shape mismatch"));
    }

    #[tokio::test]
    async fn test_witness_prove_submit_end_to_end() {
        let server = create_test_app();
        let witness: serde_json::Value = server
            .post("/witness")
            .json(&witness_body(FIXTURE_INPUT))
            .await
            .json();

        let proof = server
            .post("/prove")
            .json(&serde_json::json!({"witness": witness["witness"]}))
            .await;
        proof.assert_status_ok();
        let proof: serde_json::Value = proof.json();

        let response = server
            .post("/submit")
            .json(&serde_json::json!({
                "proof": proof["hex_proof"],
                "instances": proof["instances"],
            }))
            .await;
        let body: serde_json::Value = response.json();
        assert_eq!(body["verified"], true);
        assert_eq!(body["unlocked"], true);
    }

    #[tokio::test]
    async fn test_prove_forged_witness_returns_422() {
        let server = create_test_app();
        let response = server
            .post("/prove")
            .json(&serde_json::json!({
                "witness": {"inputs": ["4", "2", "5", "1"], "outputs": ["31", "2", "3"]}
            }))
            .await;
        response.assert_status(StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn test_prove_without_backend_returns_503() {
        let server = TestServer::new(build_router(app_state(false))).unwrap();
        let response = server
            .post("/prove")
            .json(&serde_json::json!({"witness": fixture().witness}))
            .await;
        response.assert_status(StatusCode::SERVICE_UNAVAILABLE);

        let health: serde_json::Value = server.get("/health").await.json();
        assert_eq!(health["proverEnabled"], false);
    }

    // ──────────────────────────────────────────────
    // Routing
    // ──────────────────────────────────────────────

    #[tokio::test]
    async fn test_unknown_route_returns_404() {
        let server = create_test_app();
        let response = server.get("/unknown").await;
        response.assert_status(StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_get_on_post_route_returns_405() {
        let server = create_test_app();
        let response = server.get("/submit").await;
        response.assert_status(StatusCode::METHOD_NOT_ALLOWED);
    }
}
