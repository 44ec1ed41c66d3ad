use ark_bn254::Fr;
use serde::{Deserialize, Serialize};

use crate::circuit::CompiledModel;
use crate::error::PipelineError;
use crate::uint::Uint256;

/// Full assignment of a circuit execution.
///
/// `inputs` are private; `outputs` become the public instances. Every value
/// is a field element serialized as a decimal string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Witness {
    pub inputs: Vec<Uint256>,
    pub outputs: Vec<Uint256>,
}

impl Witness {
    pub fn from_slice(bytes: &[u8]) -> Result<Self, PipelineError> {
        serde_json::from_slice(bytes).map_err(|e| PipelineError::MalformedInput(e.to_string()))
    }

    pub fn to_vec(&self) -> Result<Vec<u8>, PipelineError> {
        serde_json::to_vec(self).map_err(|e| PipelineError::Encoding(e.to_string()))
    }
}

/// Turns a compiled circuit artifact plus raw input into a serialized witness.
pub trait WitnessGenerator: Send + Sync {
    fn generate_witness(&self, circuit_artifact: &[u8], input: &[u8]) -> Result<Vec<u8>, PipelineError>;
}

/// Raw input layout: a batch of flat feature vectors.
#[derive(Debug, Deserialize)]
struct InputData {
    input_data: Vec<Vec<i64>>,
}

/// Witness generation for [`CompiledModel`] artifacts.
#[derive(Debug, Default, Clone, Copy)]
pub struct ModelWitnessGenerator;

impl WitnessGenerator for ModelWitnessGenerator {
    fn generate_witness(&self, circuit_artifact: &[u8], input: &[u8]) -> Result<Vec<u8>, PipelineError> {
        let model = CompiledModel::from_slice(circuit_artifact)?;
        let data: InputData =
            serde_json::from_slice(input).map_err(|e| PipelineError::MalformedInput(e.to_string()))?;

        let features: Vec<Fr> = data.input_data.into_iter().flatten().map(Fr::from).collect();
        if features.len() != model.input_len() {
            return Err(PipelineError::ShapeMismatch {
                expected: model.input_len(),
                actual: features.len(),
            });
        }

        let outputs = model.forward(&features);
        tracing::info!(
            "Generated witness for model={} inputs={} outputs={}",
            model.name,
            features.len(),
            outputs.len()
        );

        Witness {
            inputs: features.iter().map(Uint256::from_field).collect(),
            outputs: outputs.iter().map(Uint256::from_field).collect(),
        }
        .to_vec()
    }
}
