// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2024-2025 Oracle Verification Developers

//! Operator view of the configured targets

use crate::policy::{TrustPolicy, PCR_COUNT, PCR_SIZE};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

const START_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Encodings of the target SGX unique ID
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[allow(missing_docs)]
pub struct UniqueIdInfo {
    pub hex_encoded: String,
    pub base64_encoded: String,
    pub aleo_encoded: String,
}

/// Encodings of the target Nitro PCR values
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[allow(missing_docs)]
pub struct PcrValuesInfo {
    pub hex_encoded: [String; PCR_COUNT],
    pub base64_encoded: [String; PCR_COUNT],
    pub aleo_encoded: String,
}

/// The info response
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[allow(missing_docs)]
pub struct InfoResponse {
    pub target_unique_id: UniqueIdInfo,
    pub target_pcr_values: PcrValuesInfo,
    pub live_check_program: String,
    #[serde(rename = "startTimeUTC")]
    pub start_time_utc: String,
}

fn u128_le(chunk: &[u8]) -> u128 {
    let mut buf = [0u8; 16];
    buf[..chunk.len()].copy_from_slice(chunk);
    u128::from_le_bytes(buf)
}

/// Aleo struct literal of the unique ID, two little endian `u128` halves
pub fn format_unique_id(unique_id: &[u8; 32]) -> String {
    format!(
        "{{ chunk_1: {}u128, chunk_2: {}u128 }}",
        u128_le(&unique_id[..16]),
        u128_le(&unique_id[16..])
    )
}

/// Aleo struct literal of the PCR values, three little endian `u128`
/// chunks per register
pub fn format_pcr_values(pcrs: &[[u8; PCR_SIZE]; PCR_COUNT]) -> String {
    let fields: Vec<String> = pcrs
        .iter()
        .enumerate()
        .flat_map(|(pcr, value)| {
            value
                .chunks(16)
                .enumerate()
                .map(move |(chunk, bytes)| {
                    format!("pcr_{pcr}_chunk_{}: {}u128", chunk + 1, u128_le(bytes))
                })
        })
        .collect();
    format!("{{ {} }}", fields.join(", "))
}

impl InfoResponse {
    /// Describe `policy`; wildcard PCR slots are encoded as zero
    pub fn new(policy: &TrustPolicy, live_check_program: &str, start_time: DateTime<Utc>) -> Self {
        let pcrs = policy
            .target_pcr_values
            .map(|pcr| pcr.unwrap_or([0; PCR_SIZE]));
        Self {
            target_unique_id: UniqueIdInfo {
                hex_encoded: policy.unique_id_hex(),
                base64_encoded: STANDARD.encode(policy.target_enclave_identity),
                aleo_encoded: format_unique_id(&policy.target_enclave_identity),
            },
            target_pcr_values: PcrValuesInfo {
                hex_encoded: policy.pcr_values_hex(),
                base64_encoded: pcrs.map(|pcr| STANDARD.encode(pcr)),
                aleo_encoded: format_pcr_values(&pcrs),
            },
            live_check_program: live_check_program.into(),
            start_time_utc: start_time.format(START_TIME_FORMAT).to_string(),
        }
    }
}
