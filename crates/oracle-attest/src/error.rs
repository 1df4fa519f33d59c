// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2024-2025 Oracle Verification Developers

//! Error types for report verification

use crate::{nitro::NitroError, proof::AssemblyError, session::SessionError, sgx::SgxError};
use thiserror::Error;

/// Result type used throughout the crate
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that fail a single report.
///
/// None of these abort a batch; the batch verifier records the message and
/// continues with the next report unless configured otherwise.
#[derive(Error, Debug)]
pub enum Error {
    /// Malformed report bytes or report JSON
    #[error("failed to decode report: {0}")]
    Decode(String),

    /// Neither `sgx` nor `nitro`
    #[error("unsupported report type: {0}")]
    UnsupportedReportType(String),

    /// Identity, PCR, TCB, nonce or debug-mode mismatch
    #[error("trust policy violation: {0}")]
    PolicyViolation(String),

    /// The Nitro report failed verification
    #[error(transparent)]
    Nitro(#[from] NitroError),

    /// The SGX report failed verification
    #[error(transparent)]
    Sgx(#[from] SgxError),

    /// The proof data could not be reconstructed
    #[error("verification error: failed to prepare data for report verification: {0}")]
    Assembly(#[from] AssemblyError),

    /// The session could not format the proof data
    #[error("verification error: failed to format message for report verification: {0}")]
    Format(String),

    /// The session could not hash the formatted proof data
    #[error("verification error: failed to hash message for report verification: {0}")]
    Hash(String),

    /// The user data embedded in the report does not match the proof data
    #[error("verification error: userData hashes don't match")]
    DataMismatch,

    /// Verification of the report panicked
    #[error("verification of report panicked: {0}")]
    Panicked(String),
}

impl Error {
    /// Create a new decode error
    pub fn decode(reason: impl Into<String>) -> Self {
        Self::Decode(reason.into())
    }

    /// Create a new policy violation error
    pub fn policy_violation(reason: impl Into<String>) -> Self {
        Self::PolicyViolation(reason.into())
    }

    /// Returns `true` if the report was rejected by the trust policy
    pub fn is_policy_violation(&self) -> bool {
        matches!(
            self,
            Self::PolicyViolation(_)
                | Self::Nitro(NitroError::PolicyViolation(_))
                | Self::Sgx(SgxError::PolicyViolation(_))
        )
    }
}

impl From<base64::DecodeError> for Error {
    fn from(value: base64::DecodeError) -> Self {
        Self::Decode(format!("invalid base64: {value}"))
    }
}

impl From<serde_json::Error> for Error {
    fn from(value: serde_json::Error) -> Self {
        Self::Decode(format!("invalid report JSON: {value}"))
    }
}

/// Errors that fail a whole batch before any report is evaluated.
#[derive(Error, Debug)]
pub enum BatchError {
    /// The batch is empty
    #[error("no reports to verify")]
    NoReports,

    /// No cryptographic session could be acquired for the batch
    #[error("failed to acquire a session for the batch: {0}")]
    Resource(#[from] SessionError),
}
