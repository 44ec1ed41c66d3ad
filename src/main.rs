mod circuit;
mod config;
mod deployment;
mod error;
#[cfg(test)]
mod fixtures;
mod gate;
mod pipeline;
mod prover;
mod routes;
mod types;
mod uint;
mod verifier;
mod witness;

use std::sync::Arc;

use crate::config::{Config, Mode};
use crate::deployment::DeploymentRecord;
use crate::gate::GatedResource;
use crate::pipeline::Pipeline;
use crate::prover::{Groth16Prover, ProofBackend};
use crate::routes::{build_router, AppState};
use crate::verifier::{Groth16Verifier, ProofVerifier};
use crate::witness::ModelWitnessGenerator;

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "circuit_breaker=info".into()),
        )
        .init();

    let config = Config::from_env();

    if config.mode == Mode::Setup {
        tracing::info!("Starting in setup mode");
        match deployment::setup(
            &config.model_path,
            &config.keys_dir,
            &config.deployment_record,
            config.setup_seed,
        ) {
            Ok(out) => {
                tracing::info!(
                    "Setup complete: proving key {}, verifying key {}, verifier_address={}",
                    out.proving_key.display(),
                    out.verifying_key.display(),
                    out.record.verifier_address
                );
                return;
            }
            Err(e) => {
                tracing::error!("Setup failed: {}", e);
                std::process::exit(1);
            }
        }
    }

    // Resolve the verifying key: explicit override, else the deployment record
    let vk_path = match &config.verifying_key {
        Some(path) => path.clone(),
        None => match DeploymentRecord::load(&config.deployment_record) {
            Ok(record) => record.verifier_path(),
            Err(e) => {
                tracing::error!("No deployed verifier: {}", e);
                std::process::exit(1);
            }
        },
    };
    tracing::info!("Loading verifying key from: {}", vk_path.display());

    let verifier: Arc<dyn ProofVerifier> = match Groth16Verifier::load(&vk_path) {
        Ok(v) => Arc::new(v),
        Err(e) => {
            tracing::error!("Failed to load verifier: {}", e);
            std::process::exit(1);
        }
    };
    tracing::info!("Verifier expects {} public instances", verifier.num_instances());

    let backend: Option<Arc<dyn ProofBackend>> = match &config.proving_key {
        Some(pk_path) => match Groth16Prover::load(&config.model_path, pk_path) {
            Ok(prover) => Some(Arc::new(prover)),
            Err(e) => {
                tracing::error!("Failed to load prover: {}", e);
                tracing::warn!("Starting without a proving backend");
                None
            }
        },
        None => None,
    };

    let pipeline = Pipeline::new(
        Arc::new(ModelWitnessGenerator),
        backend,
        config.pipeline_timeout,
    );

    let state = Arc::new(AppState {
        gate: Arc::new(GatedResource::new(verifier)),
        pipeline,
    });

    let app = build_router(state);
    let addr = config.bind_addr();

    tracing::info!("Circuit breaker listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .unwrap_or_else(|e| {
            panic!("Failed to bind to {}: {}", addr, e);
        });

    axum::serve(listener, app)
        .await
        .unwrap_or_else(|e| {
            panic!("Server error: {}", e);
        });
}
