// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2024-2025 Oracle Verification Developers

//! Verifier configuration file

use crate::{
    batch::BatchConfig,
    policy::{PolicyError, TrustPolicy},
    session::{ReferenceSessionProvider, SessionBackend},
};
use serde::{Deserialize, Serialize};
use std::{fs, path::Path, path::PathBuf};

/// SGX section of the configuration file
#[derive(Default, Debug, Clone, Serialize, Deserialize)]
pub struct SgxPolicyConfig {
    /// Hex-encoded unique ID (MRENCLAVE) of the reproducible oracle backend build
    pub unique_id: String,

    /// TCB advisories tolerated when the platform TCB is not up to date.
    /// An advisory not in this list rejects the report.
    #[serde(default)]
    pub allowed_advisory_ids: Vec<String>,
}

/// Nitro section of the configuration file
#[derive(Default, Debug, Clone, Serialize, Deserialize)]
pub struct NitroPolicyConfig {
    /// Hex-encoded PCR0, PCR1 and PCR2. An empty or missing entry is not checked.
    #[serde(default)]
    pub pcrs: Vec<String>,

    /// Accept attestation documents without a nonce
    #[serde(default)]
    pub allow_nonceless_reports: bool,

    /// PEM or DER file with the pinned AWS Nitro Enclaves root certificate
    #[serde(default)]
    pub root_certificate: Option<PathBuf>,
}

/// The verifier configuration file
#[derive(Default, Debug, Clone, Serialize, Deserialize)]
pub struct VerifierConfig {
    /// SGX trust policy
    pub sgx: SgxPolicyConfig,
    /// Nitro trust policy
    #[serde(default)]
    pub nitro: NitroPolicyConfig,
    /// Batch verification settings
    #[serde(default)]
    pub engine: BatchConfig,
    /// Session used to format and hash the proof data. There is no default.
    #[serde(default)]
    pub session: Option<SessionBackend>,
    /// Name of the on-chain program the targets were checked against, for operator visibility
    #[serde(default)]
    pub live_check_program: String,
}

impl VerifierConfig {
    /// Parse the configuration from a YAML string
    pub fn from_yaml_str(s: &str) -> Result<Self, PolicyError> {
        Ok(serde_yaml::from_str(s)?)
    }

    /// Read and parse the configuration from a YAML file
    pub fn load(path: &Path) -> Result<Self, PolicyError> {
        let content = fs::read_to_string(path).map_err(|source| PolicyError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let config = Self::from_yaml_str(&content)?;
        tracing::info!("Loaded verifier configuration from file: {}", path.display());
        Ok(config)
    }

    /// Build the immutable trust policy
    pub fn trust_policy(&self) -> Result<TrustPolicy, PolicyError> {
        let mut policy = TrustPolicy::from_hex(&self.sgx.unique_id, self.nitro.pcrs.as_slice())?;
        policy
            .allowed_tcb_advisories
            .extend(self.sgx.allowed_advisory_ids.iter().cloned());
        policy.allow_nonceless_reports = self.nitro.allow_nonceless_reports;

        if policy.target_pcr_values.iter().all(Option::is_none) {
            tracing::error!("No Nitro PCR values configured. Any code could have produced the Nitro report.");
        }
        if policy.allow_nonceless_reports {
            tracing::warn!("Nitro reports without a nonce are accepted");
        }

        Ok(policy)
    }

    /// The session provider selected by `session`
    pub fn session_provider(&self) -> Result<ReferenceSessionProvider, PolicyError> {
        match self.session {
            Some(SessionBackend::Reference) => {
                tracing::warn!(
                    "Using the SHA3-256 reference session, reports of a Poseidon8 oracle will not match"
                );
                Ok(ReferenceSessionProvider::new(1))
            }
            None => Err(PolicyError::NoSessionBackend),
        }
    }

    /// Read the pinned Nitro root certificate, if configured
    pub fn nitro_root_certificate(&self) -> Result<Option<Vec<u8>>, PolicyError> {
        self.nitro
            .root_certificate
            .as_ref()
            .map(|path| {
                fs::read(path).map_err(|source| PolicyError::Io {
                    path: path.display().to_string(),
                    source,
                })
            })
            .transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{batch::BatchFailurePolicy, proof::ProofLayout};

    #[test]
    fn test_load_verifier_config_from_yaml() {
        let temp_dir = std::env::temp_dir().join("test_oracle_verifier_config");
        fs::create_dir_all(&temp_dir).expect("Failed to create temp directory");
        let yaml_path = temp_dir.join("config.yaml");
        let yaml_content = r#"
sgx:
  unique_id: A2CAA7055E333F69C3E46CA7BA65B135A86C90ADFDE2AFB356E05075B7818B3C
  allowed_advisory_ids:
    - INTEL-SA-00334
    - INTEL-SA-00615
nitro:
  pcrs:
    - 2a90c8fa38672cafd791d994beb6836b99383b2563736858632284f0f760a6446efd1e7ec457cf08b629ea630f7b4525
    - ""
    - c08ab64725566bcc8a6fb1c79e2e64744fcff1594b8f1f02d716fb66592ecd5de94933b2bc54ffbbc43a52aab7eb1146
engine:
  layout: block_height
  failure_policy: abort_on_first_error
live_check_program: verifier_oracle.aleo
"#;
        fs::write(&yaml_path, yaml_content).expect("Failed to write YAML file");

        let config = VerifierConfig::load(&yaml_path).expect("Failed to load config");
        let policy = config.trust_policy().unwrap();

        assert_eq!(
            policy.unique_id_hex(),
            "a2caa7055e333f69c3e46ca7ba65b135a86c90adfde2afb356e05075b7818b3c"
        );
        assert!(policy.target_pcr_values[0].is_some());
        assert!(policy.target_pcr_values[1].is_none());
        assert!(policy.target_pcr_values[2].is_some());
        assert!(policy.is_advisory_allowed("INTEL-SA-00615"));
        assert!(!policy.allow_nonceless_reports);
        assert_eq!(config.engine.layout, ProofLayout::BlockHeight);
        assert_eq!(
            config.engine.failure_policy,
            BatchFailurePolicy::AbortOnFirstError
        );
        assert!(!config.engine.parallel);
        assert_eq!(config.live_check_program, "verifier_oracle.aleo");
        assert_eq!(config.nitro_root_certificate().unwrap(), None);

        fs::remove_dir_all(temp_dir).expect("Failed to remove temp directory");
    }

    #[test]
    fn test_engine_defaults() {
        let config = VerifierConfig::from_yaml_str(
            "sgx:\n  unique_id: a2caa7055e333f69c3e46ca7ba65b135a86c90adfde2afb356e05075b7818b3c\n",
        )
        .unwrap();
        assert_eq!(config.engine.layout, ProofLayout::Legacy);
        assert_eq!(
            config.engine.failure_policy,
            BatchFailurePolicy::ContinueOnError
        );
        assert!(config.trust_policy().is_ok());
    }

    #[test]
    fn test_missing_root_certificate_file() {
        let config = VerifierConfig {
            nitro: NitroPolicyConfig {
                root_certificate: Some("/nonexistent/root.pem".into()),
                ..Default::default()
            },
            ..Default::default()
        };
        assert!(matches!(
            config.nitro_root_certificate(),
            Err(PolicyError::Io { .. })
        ));
    }

    #[test]
    fn test_session_backend_is_opt_in() {
        let unique_id = "sgx:\n  unique_id: a2caa7055e333f69c3e46ca7ba65b135a86c90adfde2afb356e05075b7818b3c\n";
        let config = VerifierConfig::from_yaml_str(unique_id).unwrap();
        assert_eq!(config.session, None);
        assert!(matches!(
            config.session_provider(),
            Err(PolicyError::NoSessionBackend)
        ));

        let config =
            VerifierConfig::from_yaml_str(&format!("{unique_id}session: reference\n")).unwrap();
        assert_eq!(config.session, Some(SessionBackend::Reference));
        assert_eq!(config.session_provider().unwrap().open_sessions(), 0);

        assert!(VerifierConfig::from_yaml_str(&format!("{unique_id}session: poseidon8\n")).is_err());
    }
}
