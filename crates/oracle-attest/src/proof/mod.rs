// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2024-2025 Oracle Verification Developers

//! Reconstruction of the proof data an enclave commits to in its report.
//!
//! Every attestation is serialized into a fixed-size [`ProofChunk`] of
//! [`CHUNK_SIZE`] bytes. For the known price feeds, the token id of the asset
//! is written into the meta header at [`ProofLayout::token_id_offset`].

pub mod encoding;

use crate::{
    record::{AttestationRecord, AttestationRequest, MultiTokenAttestationRecord},
    session::{BLOCK_HEIGHT_ARITY, LEGACY_ARITY},
    util::{pad, PadError},
};
use encoding::{encode_proof, EncodingError, ProofFields};

pub use encoding::{decode_chunk, decode_proof, DecodedProofData, DecodingError};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use thiserror::Error;
use tracing::trace;

/// Size of one proof chunk
pub const CHUNK_SIZE: usize = 512;

/// Prefix shared by all price feed pseudo URLs
pub const PRICE_FEED_PREFIX: &str = "price_feed:";

/// A price feed with a well-known token id
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PriceFeed {
    /// The pseudo URL the oracle uses for this feed
    pub url: &'static str,
    /// Asset symbol
    pub symbol: &'static str,
    /// Token id written into the proof data
    pub token_id: u8,
}

/// All price feeds the oracle serves.
pub const PRICE_FEEDS: [PriceFeed; 5] = [
    PriceFeed {
        url: "price_feed: aleo",
        symbol: "ALEO",
        token_id: 8,
    },
    PriceFeed {
        url: "price_feed: usdt",
        symbol: "USDT",
        token_id: 9,
    },
    PriceFeed {
        url: "price_feed: usdc",
        symbol: "USDC",
        token_id: 10,
    },
    PriceFeed {
        url: "price_feed: eth",
        symbol: "ETH",
        token_id: 11,
    },
    PriceFeed {
        url: "price_feed: btc",
        symbol: "BTC",
        token_id: 12,
    },
];

impl PriceFeed {
    /// Look up the price feed for `url`.
    ///
    /// Returns `Ok(None)` for ordinary URLs and an error for a price feed URL
    /// that is not known.
    pub fn for_url(url: &str) -> Result<Option<&'static PriceFeed>, AssemblyError> {
        if let Some(feed) = PRICE_FEEDS.iter().find(|feed| feed.url == url) {
            return Ok(Some(feed));
        }
        if url.starts_with(PRICE_FEED_PREFIX) {
            return Err(AssemblyError::UnsupportedPriceFeed(url.into()));
        }
        Ok(None)
    }
}

/// Errors assembling the proof data
#[derive(Error, Debug, PartialEq, Eq)]
#[allow(missing_docs)]
pub enum AssemblyError {
    #[error(transparent)]
    Encoding(#[from] EncodingError),
    #[error("unsupported price feed URL: {0}")]
    UnsupportedPriceFeed(String),
    #[error("proof data exceeds the chunk size: {0}")]
    ProofTooLarge(#[from] PadError),
    #[error("block height is not part of the {0} proof layout")]
    UnexpectedBlockHeight(ProofLayout),
    #[error("block height is required by the {0} proof layout")]
    MissingBlockHeight(ProofLayout),
    #[error("report contains no attestation results")]
    NoResults,
}

/// The wire version of the proof data.
///
/// A verifier instance runs exactly one layout.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProofLayout {
    /// Without block height, token id at offset 21, struct arity 10
    #[default]
    Legacy,
    /// With block height, token id at offset 23, struct arity 8
    BlockHeight,
}

impl ProofLayout {
    /// Version byte stored in the meta header
    pub fn version(self) -> u8 {
        match self {
            Self::Legacy => 1,
            Self::BlockHeight => 2,
        }
    }

    /// The layout with version byte `version`
    pub fn from_version(version: u8) -> Option<Self> {
        match version {
            1 => Some(Self::Legacy),
            2 => Some(Self::BlockHeight),
            _ => None,
        }
    }

    /// Offset of the token id override byte
    pub fn token_id_offset(self) -> usize {
        match self {
            Self::Legacy => 21,
            Self::BlockHeight => 23,
        }
    }

    /// Arity of the on-chain struct the proof data is formatted into
    pub fn struct_arity(self) -> usize {
        match self {
            Self::Legacy => LEGACY_ARITY,
            Self::BlockHeight => BLOCK_HEIGHT_ARITY,
        }
    }

    /// Whether the block height is committed
    pub fn includes_block_height(self) -> bool {
        matches!(self, Self::BlockHeight)
    }
}

impl Display for ProofLayout {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Legacy => write!(f, "legacy"),
            Self::BlockHeight => write!(f, "block height"),
        }
    }
}

/// The proof data of one attestation
#[derive(Clone, PartialEq, Eq)]
pub struct ProofChunk(Box<[u8; CHUNK_SIZE]>);

impl ProofChunk {
    /// The chunk bytes
    pub fn as_bytes(&self) -> &[u8; CHUNK_SIZE] {
        &self.0
    }
}

impl AsRef<[u8]> for ProofChunk {
    fn as_ref(&self) -> &[u8] {
        self.0.as_slice()
    }
}

impl std::fmt::Debug for ProofChunk {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "ProofChunk({})", hex::encode(self.0.as_slice()))
    }
}

/// Rebuilds proof data for one [`ProofLayout`].
#[derive(Debug, Clone, Copy, Default)]
pub struct ProofAssembler {
    layout: ProofLayout,
}

impl ProofAssembler {
    /// Create an assembler for `layout`
    pub fn new(layout: ProofLayout) -> Self {
        Self { layout }
    }

    /// The layout of this assembler
    pub fn layout(&self) -> ProofLayout {
        self.layout
    }

    /// Serialize one attestation into a proof chunk.
    ///
    /// Pure and deterministic: the enclave computes the same chunk independently.
    pub fn assemble(
        &self,
        status_code: u16,
        attestation_data: &str,
        timestamp: i64,
        block_height: Option<u64>,
        request: &AttestationRequest,
    ) -> Result<ProofChunk, AssemblyError> {
        match (self.layout.includes_block_height(), block_height) {
            (false, Some(_)) => return Err(AssemblyError::UnexpectedBlockHeight(self.layout)),
            (true, None) => return Err(AssemblyError::MissingBlockHeight(self.layout)),
            _ => {}
        }

        let mut proof = encode_proof(
            self.layout,
            &ProofFields {
                status_code,
                attestation_data,
                timestamp,
                block_height,
                request,
            },
        )?;

        let feed = PriceFeed::for_url(&request.url)?;
        if let (Some(feed), false) = (feed, proof.is_empty()) {
            trace!(symbol = feed.symbol, token_id = feed.token_id, "price feed override");
            proof[self.layout.token_id_offset()] = feed.token_id;
        }

        Ok(ProofChunk(Box::new(pad::<CHUNK_SIZE>(&proof)?)))
    }

    /// Proof data of a single-token record
    pub fn assemble_record(&self, record: &AttestationRecord) -> Result<Vec<u8>, AssemblyError> {
        let chunk = self.assemble(
            record.response_status_code,
            &record.attestation_data,
            record.timestamp,
            record.block_height,
            &record.attestation_request,
        )?;
        Ok(chunk.as_ref().to_vec())
    }

    /// Proof data of a multi-token record: one chunk per result, in order
    pub fn assemble_multi(
        &self,
        record: &MultiTokenAttestationRecord,
    ) -> Result<Vec<u8>, AssemblyError> {
        if record.attestation_results.is_empty() {
            return Err(AssemblyError::NoResults);
        }
        let mut data = Vec::with_capacity(record.attestation_results.len() * CHUNK_SIZE);
        for result in &record.attestation_results {
            let chunk = self.assemble(
                result.response_status_code,
                &result.attestation_data,
                result.timestamp,
                result.block_height,
                &result.attestation_request,
            )?;
            data.extend_from_slice(chunk.as_ref());
        }
        Ok(data)
    }
}
