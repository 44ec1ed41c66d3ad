//! Shared test vectors: a real key pair and an honest `(proof, instances)`
//! pair for the income classifier, regenerated from a fixed seed.

use std::path::PathBuf;
use std::sync::{Arc, OnceLock};

use ark_bn254::Bn254;
use ark_groth16::ProvingKey;
use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::circuit::{keygen, CompiledModel};
use crate::prover::{decode_hex, Groth16Prover};
use crate::uint::Uint256;
use crate::verifier::Groth16Verifier;
use crate::witness::{ModelWitnessGenerator, Witness, WitnessGenerator};

pub(crate) const FIXTURE_SEED: u64 = 0x5eed_c1c7;

pub(crate) const FIXTURE_INPUT: &str = r#"{"input_data": [[4, 2, 5, 1]]}"#;

pub(crate) struct Fixture {
    pub model: CompiledModel,
    pub proving_key: ProvingKey<Bn254>,
    pub verifier: Arc<Groth16Verifier>,
    pub witness: Witness,
    pub proof: Vec<u8>,
    pub instances: Vec<Uint256>,
}

pub(crate) fn fixture() -> &'static Fixture {
    static FIXTURE: OnceLock<Fixture> = OnceLock::new();
    FIXTURE.get_or_init(build)
}

fn build() -> Fixture {
    let mut rng = StdRng::seed_from_u64(FIXTURE_SEED);
    let model = CompiledModel::income_classifier();
    let proving_key = keygen(&model, &mut rng).expect("fixture keygen");
    let verifier = Arc::new(Groth16Verifier::new(&proving_key.vk).expect("fixture vk"));

    let artifact = serde_json::to_vec(&model).expect("model json");
    let witness = ModelWitnessGenerator
        .generate_witness(&artifact, FIXTURE_INPUT.as_bytes())
        .and_then(|bytes| Witness::from_slice(&bytes))
        .expect("fixture witness");

    let prover = Groth16Prover::new(model.clone(), proving_key.clone());
    let proof = prover
        .prove_witness(&witness, &mut rng)
        .expect("fixture proof");

    Fixture {
        model,
        proving_key,
        verifier,
        witness,
        proof: decode_hex(&proof.hex_proof).expect("fixture hex"),
        instances: proof.instances,
    }
}

/// Fresh scratch directory under the system temp dir.
pub(crate) fn temp_dir(tag: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!(
        "circuit_breaker_{}_{}",
        tag,
        std::process::id()
    ));
    std::fs::remove_dir_all(&dir).ok();
    std::fs::create_dir_all(&dir).expect("create temp dir");
    dir
}
