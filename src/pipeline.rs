use std::sync::Arc;
use std::time::Duration;

use crate::error::PipelineError;
use crate::prover::{ProofArtifact, ProofBackend};
use crate::witness::{Witness, WitnessGenerator};

/// Witness and proof generation, off the request path.
///
/// Both stages run on tokio's blocking pool under a caller-level timeout.
/// Dropping a returned future abandons the result; the blocking work itself
/// runs to completion in the background and is discarded.
pub struct Pipeline {
    witness_generator: Arc<dyn WitnessGenerator>,
    backend: Option<Arc<dyn ProofBackend>>,
    timeout: Duration,
}

impl Pipeline {
    pub fn new(
        witness_generator: Arc<dyn WitnessGenerator>,
        backend: Option<Arc<dyn ProofBackend>>,
        timeout: Duration,
    ) -> Self {
        Self {
            witness_generator,
            backend,
            timeout,
        }
    }

    pub fn has_backend(&self) -> bool {
        self.backend.is_some()
    }

    pub async fn generate_witness(
        &self,
        circuit_artifact: Vec<u8>,
        input: Vec<u8>,
    ) -> Result<Witness, PipelineError> {
        let generator = Arc::clone(&self.witness_generator);
        let bytes = self
            .run_blocking("witness generation", move || {
                generator.generate_witness(&circuit_artifact, &input)
            })
            .await?;
        Witness::from_slice(&bytes)
    }

    pub async fn prove(&self, witness: &Witness) -> Result<ProofArtifact, PipelineError> {
        let backend = self
            .backend
            .clone()
            .ok_or(PipelineError::BackendUnavailable)?;
        let bytes = witness.to_vec()?;
        self.run_blocking("proof generation", move || backend.prove(&bytes))
            .await
    }

    async fn run_blocking<T, F>(&self, stage: &'static str, work: F) -> Result<T, PipelineError>
    where
        F: FnOnce() -> Result<T, PipelineError> + Send + 'static,
        T: Send + 'static,
    {
        let started = std::time::Instant::now();
        match tokio::time::timeout(self.timeout, tokio::task::spawn_blocking(work)).await {
            Ok(Ok(result)) => {
                tracing::info!("{} finished in {}ms", stage, started.elapsed().as_millis());
                result
            }
            Ok(Err(e)) => {
                tracing::error!("{} task failed: {}", stage, e);
                Err(PipelineError::Aborted {
                    stage,
                    reason: e.to_string(),
                })
            }
            Err(_) => {
                tracing::warn!("{} timed out after {:?}", stage, self.timeout);
                Err(PipelineError::Timeout {
                    stage,
                    secs: self.timeout.as_secs(),
                })
            }
        }
    }
}
