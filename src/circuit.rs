use std::path::Path;

use ark_bn254::{Bn254, Fr};
use ark_groth16::{Groth16, ProvingKey};
use ark_relations::lc;
use ark_relations::r1cs::{
    ConstraintSynthesizer, ConstraintSystemRef, LinearCombination, SynthesisError, Variable,
};
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::PipelineError;

/// A compiled, quantized dense layer: `y = W x + b` over the scalar field.
///
/// This is the circuit artifact format consumed by witness generation and
/// key setup.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompiledModel {
    pub name: String,
    /// One row per output, one column per input feature.
    pub weights: Vec<Vec<i64>>,
    pub bias: Vec<i64>,
}

impl CompiledModel {
    /// Parse and shape-check a compiled model from its JSON encoding.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, PipelineError> {
        let model: Self = serde_json::from_slice(bytes)
            .map_err(|e| PipelineError::MalformedArtifact(e.to_string()))?;
        model.validate()?;
        Ok(model)
    }

    pub fn load(path: &Path) -> Result<Self, PipelineError> {
        let bytes = std::fs::read(path).map_err(|e| {
            PipelineError::MalformedArtifact(format!("failed to read {}: {}", path.display(), e))
        })?;
        Self::from_slice(&bytes)
    }

    fn validate(&self) -> Result<(), PipelineError> {
        let width = match self.weights.first() {
            Some(row) if !row.is_empty() => row.len(),
            _ => {
                return Err(PipelineError::MalformedArtifact(
                    "model has no weights".to_string(),
                ))
            }
        };
        if let Some(idx) = self.weights.iter().position(|row| row.len() != width) {
            return Err(PipelineError::MalformedArtifact(format!(
                "weight row {} has {} columns, expected {}",
                idx,
                self.weights[idx].len(),
                width
            )));
        }
        if self.bias.len() != self.weights.len() {
            return Err(PipelineError::MalformedArtifact(format!(
                "bias has {} entries for {} outputs",
                self.bias.len(),
                self.weights.len()
            )));
        }
        Ok(())
    }

    pub fn input_len(&self) -> usize {
        self.weights.first().map_or(0, Vec::len)
    }

    pub fn output_len(&self) -> usize {
        self.weights.len()
    }

    /// Evaluate the layer in the field. `input` must have `input_len()` entries.
    pub fn forward(&self, input: &[Fr]) -> Vec<Fr> {
        self.weights
            .iter()
            .zip(&self.bias)
            .map(|(row, &b)| {
                row.iter()
                    .zip(input)
                    .fold(Fr::from(b), |acc, (&w, x)| acc + Fr::from(w) * x)
            })
            .collect()
    }

    /// Three-bracket income classifier over four quantized features.
    pub fn income_classifier() -> Self {
        Self {
            name: "income_classifier".to_string(),
            weights: vec![vec![3, -1, 2, 0], vec![-2, 4, 1, 1], vec![1, 1, -3, 5]],
            bias: vec![10, -4, 7],
        }
    }
}

/// R1CS for a [`CompiledModel`].
///
/// Inputs are private witnesses; outputs are public instances allocated in
/// output order, so instance `j` is output `j`.
#[derive(Clone)]
pub struct InferenceCircuit {
    model: CompiledModel,
    inputs: Option<Vec<Fr>>,
}

impl InferenceCircuit {
    /// Shape-only circuit used for key generation.
    pub fn blank(model: CompiledModel) -> Self {
        Self {
            model,
            inputs: None,
        }
    }

    pub fn with_inputs(model: CompiledModel, inputs: Vec<Fr>) -> Self {
        Self {
            model,
            inputs: Some(inputs),
        }
    }
}

impl ConstraintSynthesizer<Fr> for InferenceCircuit {
    fn generate_constraints(self, cs: ConstraintSystemRef<Fr>) -> Result<(), SynthesisError> {
        let outputs = self.inputs.as_deref().map(|x| self.model.forward(x));

        let xs = (0..self.model.input_len())
            .map(|k| {
                cs.new_witness_variable(|| {
                    self.inputs
                        .as_ref()
                        .and_then(|x| x.get(k).copied())
                        .ok_or(SynthesisError::AssignmentMissing)
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        for (j, (row, &b)) in self.model.weights.iter().zip(&self.model.bias).enumerate() {
            let y = cs.new_input_variable(|| {
                outputs
                    .as_ref()
                    .map(|ys| ys[j])
                    .ok_or(SynthesisError::AssignmentMissing)
            })?;

            let mut affine = LinearCombination::zero() + (Fr::from(b), Variable::One);
            for (&w, &x) in row.iter().zip(&xs) {
                affine = affine + (Fr::from(w), x);
            }
            cs.enforce_constraint(affine, lc!() + Variable::One, lc!() + y)?;
        }

        Ok(())
    }
}

/// Circuit-specific Groth16 setup for `model`.
pub fn keygen<R: Rng>(model: &CompiledModel, rng: &mut R) -> Result<ProvingKey<Bn254>, SynthesisError> {
    Groth16::<Bn254>::generate_random_parameters_with_reduction(
        InferenceCircuit::blank(model.clone()),
        rng,
    )
}
