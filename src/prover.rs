use std::path::Path;

use ark_bn254::{Bn254, Fr};
use ark_groth16::{Groth16, ProvingKey};
use ark_serialize::{CanonicalDeserialize, CanonicalSerialize};
use ark_snark::SNARK;
use rand::rngs::OsRng;
use rand::{CryptoRng, RngCore};
use serde::{Deserialize, Serialize};

use crate::circuit::{CompiledModel, InferenceCircuit};
use crate::error::{KeyError, PipelineError};
use crate::uint::{PublicInstances, Uint256};
use crate::witness::Witness;

/// A proof plus the public instances it was generated for.
///
/// Field names match the proof JSON consumed by the on-chain test harness.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProofArtifact {
    /// `0x`-prefixed hex of the compressed proof.
    pub hex_proof: String,
    pub instances: PublicInstances,
}

/// Hex decoding that tolerates a `0x` prefix.
pub fn decode_hex(s: &str) -> Result<Vec<u8>, hex::FromHexError> {
    let s = s.trim();
    hex::decode(s.strip_prefix("0x").unwrap_or(s))
}

/// Turns a serialized witness into a proof.
pub trait ProofBackend: Send + Sync {
    fn prove(&self, witness: &[u8]) -> Result<ProofArtifact, PipelineError>;
}

/// Groth16 prover for a single compiled model.
pub struct Groth16Prover {
    model: CompiledModel,
    proving_key: ProvingKey<Bn254>,
}

impl Groth16Prover {
    pub fn new(model: CompiledModel, proving_key: ProvingKey<Bn254>) -> Self {
        Self { model, proving_key }
    }

    pub fn load(model_path: &Path, pk_path: &Path) -> Result<Self, KeyError> {
        let model = CompiledModel::load(model_path)?;
        let bytes = std::fs::read(pk_path).map_err(|source| KeyError::Io {
            path: pk_path.display().to_string(),
            source,
        })?;
        let proving_key = ProvingKey::<Bn254>::deserialize_compressed(bytes.as_slice())
            .map_err(|e| KeyError::Decode(e.to_string()))?;

        tracing::info!(
            "Loaded proving key for model={} from {}",
            model.name,
            pk_path.display()
        );
        Ok(Self::new(model, proving_key))
    }

    /// Prove `witness`, drawing blinding factors from `rng`.
    ///
    /// The outputs are recomputed from the witness inputs; a witness whose
    /// outputs disagree is refused before any proving work starts.
    pub fn prove_witness<R: RngCore + CryptoRng>(
        &self,
        witness: &Witness,
        rng: &mut R,
    ) -> Result<ProofArtifact, PipelineError> {
        if witness.inputs.len() != self.model.input_len() {
            return Err(PipelineError::ShapeMismatch {
                expected: self.model.input_len(),
                actual: witness.inputs.len(),
            });
        }

        let inputs = witness
            .inputs
            .iter()
            .enumerate()
            .map(|(i, v)| {
                v.to_field().ok_or_else(|| {
                    PipelineError::WitnessMismatch(format!("input {} is outside the field", i))
                })
            })
            .collect::<Result<Vec<Fr>, _>>()?;

        let instances: PublicInstances = self
            .model
            .forward(&inputs)
            .iter()
            .map(Uint256::from_field)
            .collect();
        if instances != witness.outputs {
            return Err(PipelineError::WitnessMismatch(
                "outputs do not match the model evaluated on the inputs".to_string(),
            ));
        }

        tracing::info!(
            "Generating proof for model={} instances={}",
            self.model.name,
            instances.len()
        );

        let circuit = InferenceCircuit::with_inputs(self.model.clone(), inputs);
        let proof = Groth16::<Bn254>::prove(&self.proving_key, circuit, rng)
            .map_err(|e| PipelineError::Proving(e.to_string()))?;

        let mut proof_bytes = Vec::new();
        proof
            .serialize_compressed(&mut proof_bytes)
            .map_err(|e| PipelineError::Encoding(e.to_string()))?;

        tracing::info!("Proof generated: {} bytes", proof_bytes.len());

        Ok(ProofArtifact {
            hex_proof: format!("0x{}", hex::encode(&proof_bytes)),
            instances,
        })
    }
}

impl ProofBackend for Groth16Prover {
    fn prove(&self, witness: &[u8]) -> Result<ProofArtifact, PipelineError> {
        let witness = Witness::from_slice(witness)?;
        self.prove_witness(&witness, &mut OsRng)
    }
}
