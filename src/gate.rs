use std::sync::{Arc, Mutex, PoisonError};

use serde::Serialize;

use crate::uint::Uint256;
use crate::verifier::ProofVerifier;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum GatedState {
    Locked,
    Unlocked,
}

/// A capability that opens once a valid proof is observed and never closes.
///
/// The cryptographic decision is delegated entirely to the verifier; the
/// resource only owns the latch.
pub struct GatedResource {
    verifier: Arc<dyn ProofVerifier>,
    state: Mutex<GatedState>,
}

impl GatedResource {
    pub fn new(verifier: Arc<dyn ProofVerifier>) -> Self {
        Self {
            verifier,
            state: Mutex::new(GatedState::Locked),
        }
    }

    /// Verify `(proof, instances)` and latch the resource open on success.
    ///
    /// Returns the verdict for this call only. Whether the resource is open is
    /// [`GatedResource::is_unlocked`], which also reflects earlier calls.
    pub fn submit(&self, proof: &[u8], instances: &[Uint256]) -> bool {
        // Verification is pure, so it can run outside the lock without
        // breaking linearizability of the state update.
        let verified = self.verifier.verify(proof, instances);
        if verified && self.latch() {
            tracing::info!("Gated resource unlocked");
        }
        verified
    }

    pub fn is_unlocked(&self) -> bool {
        self.state() == GatedState::Unlocked
    }

    pub fn state(&self) -> GatedState {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn verifier(&self) -> &Arc<dyn ProofVerifier> {
        &self.verifier
    }

    /// The only write to `state`. Returns true iff this call did the transition.
    fn latch(&self) -> bool {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        match *state {
            GatedState::Locked => {
                *state = GatedState::Unlocked;
                true
            }
            GatedState::Unlocked => false,
        }
    }
}
