use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Load the deployed verifier and serve HTTP.
    Serve,
    /// Generate keys for the model and write the deployment record.
    Setup,
}

/// Process configuration, read once from the environment.
#[derive(Debug, Clone)]
pub struct Config {
    pub mode: Mode,
    pub port: u16,
    pub deployment_record: PathBuf,
    /// Overrides the key location from the deployment record.
    pub verifying_key: Option<PathBuf>,
    /// Enables `/prove` when set.
    pub proving_key: Option<PathBuf>,
    pub model_path: PathBuf,
    pub keys_dir: PathBuf,
    pub pipeline_timeout: Duration,
    /// Fixed keygen seed; OS randomness when unset.
    pub setup_seed: Option<u64>,
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mode = match lookup("MODE").as_deref() {
            None | Some("serve") => Mode::Serve,
            Some("setup") => Mode::Setup,
            Some(other) => {
                tracing::warn!("Unknown MODE={}, falling back to serve", other);
                Mode::Serve
            }
        };

        Self {
            mode,
            port: parse_or(&lookup, "PORT", 5328),
            deployment_record: PathBuf::from(
                lookup("DEPLOYMENT_RECORD").unwrap_or_else(|| "./deploy_addresses.json".to_string()),
            ),
            verifying_key: lookup("VERIFYING_KEY").map(PathBuf::from),
            proving_key: lookup("PROVING_KEY").map(PathBuf::from),
            model_path: PathBuf::from(
                lookup("MODEL_PATH").unwrap_or_else(|| "./network.compiled".to_string()),
            ),
            keys_dir: PathBuf::from(lookup("KEYS_DIR").unwrap_or_else(|| "./keys".to_string())),
            pipeline_timeout: Duration::from_secs(parse_or(&lookup, "PIPELINE_TIMEOUT_SECS", 300)),
            setup_seed: lookup("SETUP_SEED").and_then(|v| match v.parse() {
                Ok(seed) => Some(seed),
                Err(_) => {
                    tracing::warn!("Ignoring unparsable SETUP_SEED={}", v);
                    None
                }
            }),
        }
    }

    pub fn bind_addr(&self) -> String {
        format!("0.0.0.0:{}", self.port)
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> T
where
    F: Fn(&str) -> Option<String>,
    T: FromStr + std::fmt::Display,
{
    match lookup(key) {
        None => default,
        Some(raw) => raw.parse().unwrap_or_else(|_| {
            tracing::warn!("Invalid {}={}, using default {}", key, raw, default);
            default
        }),
    }
}
