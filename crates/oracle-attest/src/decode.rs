// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2024-2025 Oracle Verification Developers

//! Recovery of the proof data from a report's formatted user data

use crate::{
    proof::{decode_proof, DecodedProofData, DecodingError},
    session::{OracleSession, SessionError},
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

/// Errors decoding the user data of a report
#[derive(Error, Debug, PartialEq, Eq)]
#[allow(missing_docs)]
pub enum DecodeError {
    #[error("userData is empty")]
    EmptyUserData,
    #[error(transparent)]
    Session(#[from] SessionError),
    #[error(transparent)]
    Proof(#[from] DecodingError),
}

/// A decode request
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DecodeProofDataRequest {
    /// The formatted message the oracle hashed
    pub user_data: String,
}

/// The proof data of a single- or multi-token report
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum DecodedData {
    /// Exactly one chunk was decoded
    Single(Box<DecodedProofData>),
    /// One entry per token, in chunk order
    Multi(Vec<DecodedProofData>),
}

impl DecodedData {
    /// Number of decoded chunks
    pub fn len(&self) -> usize {
        match self {
            Self::Single(_) => 1,
            Self::Multi(items) => items.len(),
        }
    }

    /// Always `false`, decoding yields at least one chunk
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// The response of a decode request
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DecodeProofDataResponse {
    /// The decoded proof data, absent on failure
    #[serde(skip_serializing_if = "Option::is_none")]
    pub decoded_data: Option<DecodedData>,
    /// `true` if the user data was decoded
    pub success: bool,
    /// Why decoding failed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

impl From<Result<DecodedData, DecodeError>> for DecodeProofDataResponse {
    fn from(result: Result<DecodedData, DecodeError>) -> Self {
        match result {
            Ok(data) => Self {
                decoded_data: Some(data),
                success: true,
                error_message: None,
            },
            Err(e) => Self {
                decoded_data: None,
                success: false,
                error_message: Some(e.to_string()),
            },
        }
    }
}

/// Recover and decode the proof data behind `user_data`.
///
/// Multi-token messages are split into one entry per proof chunk.
pub fn decode_user_data<S: OracleSession + ?Sized>(
    session: &S,
    user_data: &str,
) -> Result<DecodedData, DecodeError> {
    if user_data.trim().is_empty() {
        return Err(DecodeError::EmptyUserData);
    }
    let bytes = session.recover_message(user_data)?;
    let mut decoded = decode_proof(&bytes)?;
    debug!(chunks = decoded.len(), "decoded proof data");

    Ok(match decoded.pop() {
        Some(single) if decoded.is_empty() => DecodedData::Single(Box::new(single)),
        Some(last) => {
            decoded.push(last);
            DecodedData::Multi(decoded)
        }
        None => return Err(DecodingError::NoProofData.into()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        proof::{ProofAssembler, ProofLayout, CHUNK_SIZE},
        record::{tests::price_request, MultiTokenAttestationRecord, PerTokenResult},
        session::{ReferenceSessionProvider, SessionProvider},
    };
    use serde_json::json;

    fn result(url: &str, block_height: Option<u64>) -> PerTokenResult {
        PerTokenResult {
            attestation_data: "104.25".into(),
            attestation_request: price_request(url),
            response_body: None,
            response_status_code: 200,
            timestamp: 1_718_000_000,
            block_height,
        }
    }

    fn user_data(layout: ProofLayout, urls: &[&str]) -> String {
        let block_height = layout.includes_block_height().then_some(4_180_000);
        let record = MultiTokenAttestationRecord {
            attestation_report: String::new(),
            report_type: "sgx".into(),
            nonce: None,
            timestamp: 1_718_000_000,
            attestation_results: urls.iter().map(|url| result(url, block_height)).collect(),
        };
        let proof = ProofAssembler::new(layout).assemble_multi(&record).unwrap();
        ReferenceSessionProvider::default()
            .open_session()
            .unwrap()
            .format_message(&proof, layout.struct_arity())
            .unwrap()
    }

    #[test]
    fn test_decode_single_token() {
        let session = ReferenceSessionProvider::default().open_session().unwrap();
        for layout in [ProofLayout::Legacy, ProofLayout::BlockHeight] {
            let decoded = decode_user_data(&session, &user_data(layout, &["price_feed: btc"])).unwrap();
            let DecodedData::Single(data) = decoded else {
                panic!("expected a single decoded chunk for {layout}");
            };
            assert_eq!(data.layout, layout);
            assert_eq!(data.token_id, Some(12));
            assert_eq!(data.attestation_data, "104.250000");
            assert_eq!(data.attestation_request, price_request("price_feed: btc"));
        }
    }

    #[test]
    fn test_decode_multi_token_splits_chunks() {
        let session = ReferenceSessionProvider::default().open_session().unwrap();
        let urls = ["price_feed: btc", "price_feed: eth", "price_feed: aleo"];
        let decoded = decode_user_data(&session, &user_data(ProofLayout::BlockHeight, &urls)).unwrap();
        let DecodedData::Multi(items) = &decoded else {
            panic!("expected one entry per token");
        };
        assert_eq!(decoded.len(), 3);
        let urls_back: Vec<_> = items
            .iter()
            .map(|item| item.attestation_request.url.as_str())
            .collect();
        assert_eq!(urls_back, urls);
        assert!(items.iter().all(|item| item.block_height == Some(4_180_000)));

        let response = serde_json::to_value(DecodeProofDataResponse::from(Ok(decoded))).unwrap();
        assert_eq!(response["success"], json!(true));
        assert!(response["decodedData"].is_array());
        assert_eq!(response["decodedData"][1]["attestationRequest"]["url"], json!("price_feed: eth"));
        assert!(response.get("errorMessage").is_none());
    }

    #[test]
    fn test_decode_rejects_empty_and_padding_only_data() {
        let session = ReferenceSessionProvider::default().open_session().unwrap();
        assert_eq!(decode_user_data(&session, "  "), Err(DecodeError::EmptyUserData));

        let zeros = session.format_message(&[0u8; CHUNK_SIZE], 1).unwrap();
        let response = DecodeProofDataResponse::from(decode_user_data(&session, &zeros));
        assert!(!response.success);
        assert_eq!(response.decoded_data, None);
        assert_eq!(response.error_message.as_deref(), Some("no decoded data"));

        assert!(matches!(
            decode_user_data(&session, "{ c0: { f0: 1u64 } }"),
            Err(DecodeError::Session(SessionError::Recover(_)))
        ));
    }
}
