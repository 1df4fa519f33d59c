// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2024-2025 Oracle Verification Developers

//! The operator's trust policy
//!
//! The policy is built once at startup and passed by reference into every
//! verification call. It is never mutated afterwards.

pub mod config;

use crate::util::decode_hex_array;
use std::collections::BTreeSet;
use thiserror::Error;

pub use config::{NitroPolicyConfig, SgxPolicyConfig, VerifierConfig};

/// Size of the SGX enclave measurement (MRENCLAVE)
pub const ENCLAVE_IDENTITY_SIZE: usize = 32;
/// Size of a Nitro PCR register (SHA-384)
pub const PCR_SIZE: usize = 48;
/// Number of Nitro PCR registers covered by the policy (PCR0, PCR1, PCR2)
pub const PCR_COUNT: usize = 3;

/// A Nitro PCR register value
pub type Pcr = [u8; PCR_SIZE];

/// Errors building a [`TrustPolicy`]
#[derive(Error, Debug)]
#[allow(missing_docs)]
pub enum PolicyError {
    #[error("invalid SGX unique ID, expected {ENCLAVE_IDENTITY_SIZE} hex-encoded bytes: {0}")]
    InvalidUniqueId(#[source] hex::FromHexError),
    #[error("invalid PCR{index} value, expected {PCR_SIZE} hex-encoded bytes: {source}")]
    InvalidPcr {
        index: usize,
        source: hex::FromHexError,
    },
    #[error("at most {PCR_COUNT} PCR values can be configured, got {0}")]
    TooManyPcrs(usize),
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
    #[error("failed to parse verifier configuration: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("invalid Nitro root certificate: {0}")]
    RootCertificate(String),
    #[error(
        "no session backend is configured; the reference session hashes with SHA3-256 and \
         only matches reports of an oracle built against it, set `session: reference` to use it"
    )]
    NoSessionBackend,
}

/// One of the Nitro PCR registers a [`TrustPolicy`] pins
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[allow(missing_docs)]
pub enum PcrIndex {
    Pcr0 = 0,
    Pcr1 = 1,
    Pcr2 = 2,
}

/// The expected identity of the oracle backend enclave.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrustPolicy {
    /// Expected SGX unique ID (MRENCLAVE)
    pub target_enclave_identity: [u8; ENCLAVE_IDENTITY_SIZE],
    /// Expected Nitro PCR0..PCR2. `None` is a wildcard and never compared.
    pub target_pcr_values: [Option<Pcr>; PCR_COUNT],
    /// SGX TCB advisories tolerated on platforms that are not up to date
    pub allowed_tcb_advisories: BTreeSet<String>,
    /// Accept Nitro documents that carry no nonce
    pub allow_nonceless_reports: bool,
}

impl TrustPolicy {
    /// A policy pinning only the SGX identity; all PCR slots are wildcards.
    pub fn new(target_enclave_identity: [u8; ENCLAVE_IDENTITY_SIZE]) -> Self {
        Self {
            target_enclave_identity,
            target_pcr_values: [None; PCR_COUNT],
            allowed_tcb_advisories: BTreeSet::new(),
            allow_nonceless_reports: false,
        }
    }

    /// Build a policy from hex strings. Empty PCR strings are wildcards.
    pub fn from_hex<S: AsRef<str>>(unique_id: &str, pcrs: &[S]) -> Result<Self, PolicyError> {
        if pcrs.len() > PCR_COUNT {
            return Err(PolicyError::TooManyPcrs(pcrs.len()));
        }
        let identity = decode_hex_array(unique_id).map_err(PolicyError::InvalidUniqueId)?;
        let mut policy = Self::new(identity);
        for (index, pcr) in pcrs.iter().enumerate() {
            let pcr = pcr.as_ref().trim();
            if pcr.is_empty() {
                continue;
            }
            let value = decode_hex_array(pcr)
                .map_err(|source| PolicyError::InvalidPcr { index, source })?;
            policy.target_pcr_values[index] = Some(value);
        }
        Ok(policy)
    }

    /// Set the expected value of PCR register `index`.
    pub fn with_pcr(mut self, index: PcrIndex, value: Pcr) -> Self {
        self.target_pcr_values[index as usize] = Some(value);
        self
    }

    /// Add an allowed TCB advisory ID.
    pub fn with_allowed_advisory(mut self, advisory: impl Into<String>) -> Self {
        self.allowed_tcb_advisories.insert(advisory.into());
        self
    }

    /// Hex encoding of the target SGX unique ID
    pub fn unique_id_hex(&self) -> String {
        hex::encode(self.target_enclave_identity)
    }

    /// Hex encoding of the target PCR values, wildcards as empty strings
    pub fn pcr_values_hex(&self) -> [String; PCR_COUNT] {
        self.target_pcr_values
            .map(|pcr| pcr.map(hex::encode).unwrap_or_default())
    }

    /// `true` if `advisory` is on the allowlist
    pub fn is_advisory_allowed(&self, advisory: &str) -> bool {
        self.allowed_tcb_advisories.contains(advisory)
    }
}
