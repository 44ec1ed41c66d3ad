use std::path::Path;

use ark_bn254::{Bn254, Fr};
use ark_groth16::{prepare_verifying_key, Groth16, PreparedVerifyingKey, Proof, VerifyingKey};
use ark_serialize::CanonicalDeserialize;

use crate::error::{InputShapeError, KeyError, Rejection};
use crate::uint::Uint256;

/// Size of a compressed BN254 Groth16 proof: A (G1) + B (G2) + C (G1).
pub const PROOF_LEN: usize = 32 + 64 + 32;

/// Decides whether a proof certifies a public instance vector.
///
/// Implementations must be pure: no interior mutation, same answer for the
/// same inputs, safe to call from any number of threads at once.
pub trait ProofVerifier: Send + Sync {
    /// Number of public instances the circuit declares.
    fn num_instances(&self) -> usize;

    /// Full verification with the reason for any rejection.
    fn check(&self, proof: &[u8], instances: &[Uint256]) -> Result<(), Rejection>;

    /// Fail-closed boolean verdict.
    fn verify(&self, proof: &[u8], instances: &[Uint256]) -> bool {
        match self.check(proof, instances) {
            Ok(()) => true,
            Err(reason) => {
                tracing::debug!("Proof rejected: {}", reason);
                false
            }
        }
    }
}

/// Groth16 verifier over BN254 with a key fixed at construction.
pub struct Groth16Verifier {
    pvk: PreparedVerifyingKey<Bn254>,
    num_instances: usize,
}

impl Groth16Verifier {
    pub fn new(vk: &VerifyingKey<Bn254>) -> Result<Self, KeyError> {
        let num_instances = vk
            .gamma_abc_g1
            .len()
            .checked_sub(1)
            .filter(|&n| n > 0)
            .ok_or(KeyError::EmptyVerifyingKey)?;
        Ok(Self {
            pvk: prepare_verifying_key(vk),
            num_instances,
        })
    }

    /// Decode a compressed verifying key.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, KeyError> {
        let vk = VerifyingKey::<Bn254>::deserialize_compressed(bytes)
            .map_err(|e| KeyError::Decode(e.to_string()))?;
        Self::new(&vk)
    }

    pub fn load(path: &Path) -> Result<Self, KeyError> {
        let bytes = std::fs::read(path).map_err(|source| KeyError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let verifier = Self::from_bytes(&bytes)?;
        tracing::info!(
            "Loaded verifying key from {} ({} public instances)",
            path.display(),
            verifier.num_instances
        );
        Ok(verifier)
    }
}

impl ProofVerifier for Groth16Verifier {
    fn num_instances(&self) -> usize {
        self.num_instances
    }

    fn check(&self, proof: &[u8], instances: &[Uint256]) -> Result<(), Rejection> {
        if instances.len() != self.num_instances {
            return Err(InputShapeError::InstanceCount {
                expected: self.num_instances,
                actual: instances.len(),
            }
            .into());
        }
        if proof.len() != PROOF_LEN {
            return Err(InputShapeError::ProofLength {
                expected: PROOF_LEN,
                actual: proof.len(),
            }
            .into());
        }

        let inputs = instances
            .iter()
            .enumerate()
            .map(|(index, value)| value.to_field().ok_or(Rejection::OutOfField { index }))
            .collect::<Result<Vec<Fr>, _>>()?;

        // Checked decoding: points must be on the curve and in the prime-order subgroup.
        let proof = Proof::<Bn254>::deserialize_compressed(proof)
            .map_err(|e| Rejection::MalformedProof(e.to_string()))?;

        match Groth16::<Bn254>::verify_proof(&self.pvk, &proof, &inputs) {
            Ok(true) => Ok(()),
            Ok(false) => Err(Rejection::Invalid),
            Err(e) => Err(Rejection::MalformedProof(e.to_string())),
        }
    }
}
