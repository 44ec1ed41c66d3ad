use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

use ark_serialize::CanonicalSerialize;
use rand::rngs::{OsRng, StdRng};
use rand::SeedableRng;
use serde::{Deserialize, Serialize};

use crate::circuit::{keygen, CompiledModel};
use crate::error::DeploymentError;
use crate::verifier::Groth16Verifier;

/// Where the deployed verifier lives. Written once by setup, read at startup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeploymentRecord {
    pub verifier_address: String,
}

impl DeploymentRecord {
    pub fn load(path: &Path) -> Result<Self, DeploymentError> {
        let contents = std::fs::read_to_string(path).map_err(|source| DeploymentError::Io {
            path: path.display().to_string(),
            source,
        })?;
        serde_json::from_str(&contents).map_err(|source| DeploymentError::Parse {
            path: path.display().to_string(),
            source,
        })
    }

    /// Persist the record. Refuses to replace an existing one.
    pub fn save(&self, path: &Path) -> Result<(), DeploymentError> {
        let io_err = |source| DeploymentError::Io {
            path: path.display().to_string(),
            source,
        };
        let json = serde_json::to_vec_pretty(self).map_err(|source| DeploymentError::Parse {
            path: path.display().to_string(),
            source,
        })?;

        let mut file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(path)
            .map_err(|e| match e.kind() {
                std::io::ErrorKind::AlreadyExists => {
                    DeploymentError::AlreadyDeployed(path.display().to_string())
                }
                _ => io_err(e),
            })?;
        file.write_all(&json).map_err(io_err)?;
        file.flush().map_err(io_err)
    }

    pub fn verifier_path(&self) -> PathBuf {
        PathBuf::from(&self.verifier_address)
    }
}

/// Output locations of a completed setup.
#[derive(Debug, Clone)]
pub struct SetupOutput {
    pub record: DeploymentRecord,
    pub proving_key: PathBuf,
    pub verifying_key: PathBuf,
}

/// Generate keys for the model at `model_path`, write `key.pk` / `key.vk`
/// into `keys_dir`, and record the verifier location at `record_path`.
pub fn setup(
    model_path: &Path,
    keys_dir: &Path,
    record_path: &Path,
    seed: Option<u64>,
) -> Result<SetupOutput, DeploymentError> {
    if record_path.exists() {
        return Err(DeploymentError::AlreadyDeployed(
            record_path.display().to_string(),
        ));
    }

    let model = if model_path.exists() {
        CompiledModel::load(model_path).map_err(|e| DeploymentError::Setup(e.to_string()))?
    } else {
        let model = CompiledModel::income_classifier();
        tracing::warn!(
            "No compiled model at {}, writing the built-in {} model",
            model_path.display(),
            model.name
        );
        write_model(&model, model_path)?;
        model
    };
    tracing::info!(
        "Running setup for model={} ({} inputs, {} outputs)",
        model.name,
        model.input_len(),
        model.output_len()
    );

    let proving_key = match seed {
        Some(seed) => {
            tracing::warn!("Using fixed setup seed; keys are reproducible and not secret");
            keygen(&model, &mut StdRng::seed_from_u64(seed))
        }
        None => keygen(&model, &mut OsRng),
    }
    .map_err(|e| DeploymentError::Setup(e.to_string()))?;

    let mut pk_bytes = Vec::new();
    proving_key
        .serialize_compressed(&mut pk_bytes)
        .map_err(|e| DeploymentError::Setup(e.to_string()))?;
    let mut vk_bytes = Vec::new();
    proving_key
        .vk
        .serialize_compressed(&mut vk_bytes)
        .map_err(|e| DeploymentError::Setup(e.to_string()))?;

    // Refuse to record a key the verifier cannot load.
    Groth16Verifier::from_bytes(&vk_bytes)?;

    let io_err = |path: &Path| {
        let path = path.display().to_string();
        move |source| DeploymentError::Io { path, source }
    };
    std::fs::create_dir_all(keys_dir).map_err(io_err(keys_dir))?;
    let pk_path = keys_dir.join("key.pk");
    let vk_path = keys_dir.join("key.vk");
    std::fs::write(&pk_path, &pk_bytes).map_err(io_err(&pk_path))?;
    std::fs::write(&vk_path, &vk_bytes).map_err(io_err(&vk_path))?;

    let record = DeploymentRecord {
        verifier_address: vk_path.display().to_string(),
    };
    record.save(record_path)?;

    tracing::info!(
        "Verifier deployed to {} (record: {})",
        record.verifier_address,
        record_path.display()
    );

    Ok(SetupOutput {
        record,
        proving_key: pk_path,
        verifying_key: vk_path,
    })
}

fn write_model(model: &CompiledModel, path: &Path) -> Result<(), DeploymentError> {
    let io_err = |source| DeploymentError::Io {
        path: path.display().to_string(),
        source,
    };
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(io_err)?;
    }
    let json = serde_json::to_vec_pretty(model).map_err(|source| DeploymentError::Parse {
        path: path.display().to_string(),
        source,
    })?;
    std::fs::write(path, json).map_err(io_err)
}
