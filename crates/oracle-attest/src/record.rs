// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2024-2025 Oracle Verification Developers

//! Attestation records as submitted by clients

use crate::error::{Error, Result};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Name of the field that marks a multi-token record
pub const ATTESTATION_RESULTS_FIELD: &str = "attestationResults";

/// How the attested value was encoded into the proof data
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueKind {
    /// Raw UTF-8 bytes
    #[default]
    String,
    /// Unsigned integer
    Int,
    /// Unsigned fixed-point decimal with `precision` fractional digits
    Float,
}

/// Encoding options of an [`AttestationRequest`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncodingOptions {
    /// The kind of the attested value
    pub value: ValueKind,
    /// Number of fractional digits kept for [`ValueKind::Float`]
    #[serde(default)]
    pub precision: u8,
}

/// The off-chain HTTP fetch the enclave performed
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[allow(missing_docs)]
pub struct AttestationRequest {
    pub url: String,
    pub request_method: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selector: Option<String>,
    pub response_format: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub html_result_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_body: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_content_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_headers: Option<BTreeMap<String, String>>,
    pub encoding_options: EncodingOptions,
    /// Not part of the committed proof data
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub debug_request: bool,
}

/// A report attesting a single HTTP fetch
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttestationRecord {
    /// Base64-encoded TEE report
    pub attestation_report: String,
    /// `sgx` or `nitro`
    pub report_type: String,
    /// Nonce the client asked the enclave to embed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nonce: Option<String>,
    /// The value extracted from the response, as committed by the enclave
    pub attestation_data: String,
    /// The full response body, informational only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_body: Option<String>,
    /// HTTP status code of the response
    pub response_status_code: u16,
    /// Unix timestamp of the attestation
    pub timestamp: i64,
    /// Block height, only in the block-height proof layout
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub block_height: Option<u64>,
    /// The request that was performed
    pub attestation_request: AttestationRequest,
}

/// One price feed fetch inside a [`MultiTokenAttestationRecord`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[allow(missing_docs)]
pub struct PerTokenResult {
    pub attestation_data: String,
    pub attestation_request: AttestationRequest,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_body: Option<String>,
    pub response_status_code: u16,
    pub timestamp: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub block_height: Option<u64>,
}

/// A single TEE report jointly attesting several price feed fetches
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[allow(missing_docs)]
pub struct MultiTokenAttestationRecord {
    pub attestation_report: String,
    pub report_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nonce: Option<String>,
    pub timestamp: i64,
    pub attestation_results: Vec<PerTokenResult>,
}

/// A submitted report, after its shape has been determined
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReportEnvelope {
    /// One record, one fetch
    Single(AttestationRecord),
    /// One record, many price feed fetches
    Multi(MultiTokenAttestationRecord),
}

impl ReportEnvelope {
    /// Decode a submitted report.
    ///
    /// A report is multi-token if and only if it has a non-empty
    /// `attestationResults` array; everything else is decoded as a
    /// single-token record.
    pub fn from_value(value: serde_json::Value) -> Result<Self> {
        if !value.is_object() {
            return Err(Error::decode("report is not a JSON object"));
        }
        let is_multi = value
            .get(ATTESTATION_RESULTS_FIELD)
            .and_then(serde_json::Value::as_array)
            .is_some_and(|results| !results.is_empty());

        if is_multi {
            Ok(Self::Multi(serde_json::from_value(value)?))
        } else {
            Ok(Self::Single(serde_json::from_value(value)?))
        }
    }

    /// The report type string
    pub fn report_type(&self) -> &str {
        match self {
            Self::Single(r) => &r.report_type,
            Self::Multi(r) => &r.report_type,
        }
    }

    /// The nonce, if any
    pub fn nonce(&self) -> Option<&str> {
        match self {
            Self::Single(r) => r.nonce.as_deref(),
            Self::Multi(r) => r.nonce.as_deref(),
        }
    }

    /// The raw TEE report
    pub fn report_bytes(&self) -> Result<Vec<u8>> {
        let encoded = match self {
            Self::Single(r) => &r.attestation_report,
            Self::Multi(r) => &r.attestation_report,
        };
        Ok(STANDARD.decode(encoded)?)
    }
}
