// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2024-2025 Oracle Verification Developers

//! Intel SGX report verification
//!
//! Quote signature and collateral checks are delegated to a
//! [`SgxQuoteVerifier`]. [`SgxVerifier`] applies the trust policy on top of the
//! parsed report.

pub mod dcap;
pub mod tcbstatus;

use crate::policy::{TrustPolicy, ENCLAVE_IDENTITY_SIZE};
use serde::Serialize;
use serde_with::{base64::Base64, hex::Hex, serde_as};
use thiserror::Error;
use tracing::{debug, error, warn};

pub use dcap::DcapQuoteVerifier;
pub use tcbstatus::{TcbStatus, TOLERATED_INVALID_STATUS};

/// Size of the SGX report data
pub const REPORT_DATA_SIZE: usize = 64;

/// The verified content of an SGX quote
#[serde_as]
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SgxReport {
    /// Platform TCB status
    pub tcb_status: TcbStatus,
    /// Intel security advisories affecting the platform
    pub advisory_ids: Vec<String>,
    /// Enclave was launched in debug mode
    pub debug: bool,
    /// MRENCLAVE
    #[serde_as(as = "Hex")]
    pub unique_id: [u8; ENCLAVE_IDENTITY_SIZE],
    /// Data the enclave bound to the quote
    #[serde_as(as = "Base64")]
    pub report_data: [u8; REPORT_DATA_SIZE],
}

/// Errors of a [`SgxQuoteVerifier`]
#[derive(Error, Debug)]
pub enum SgxQuoteError {
    /// The quote could not be parsed or its signature chain is broken
    #[error("{0}")]
    Invalid(String),
    /// The quote is authentic but the platform TCB level is not acceptable as is
    #[error("TCB level invalid: {}", .0.tcb_status)]
    TcbLevelInvalid(Box<SgxReport>),
}

/// Quote verification primitive
pub trait SgxQuoteVerifier: Send + Sync {
    /// Verify the quote and return its content.
    ///
    /// Returns [`SgxQuoteError::TcbLevelInvalid`] with the parsed report if
    /// the quote is authentic but the TCB level is not up to date.
    fn verify_quote(&self, quote: &[u8]) -> Result<SgxReport, SgxQuoteError>;
}

/// SGX verification errors
#[derive(Error, Debug)]
#[allow(missing_docs)]
pub enum SgxError {
    #[error("failed to decode SGX report: {0}")]
    Decode(String),
    #[error("trust policy violation: {0}")]
    PolicyViolation(String),
}

/// Verifies SGX quotes against a [`TrustPolicy`]
#[derive(Debug, Clone)]
pub struct SgxVerifier<Q> {
    primitive: Q,
}

impl<Q: SgxQuoteVerifier> SgxVerifier<Q> {
    /// Create a verifier using `primitive` for quote verification
    pub fn new(primitive: Q) -> Self {
        Self { primitive }
    }

    /// Verify the authenticity of `quote` and return its content, whatever
    /// its TCB level. No trust policy is applied.
    pub fn decode_quote(&self, quote: &[u8]) -> Result<SgxReport, SgxError> {
        match self.primitive.verify_quote(quote) {
            Ok(report) => Ok(report),
            Err(SgxQuoteError::TcbLevelInvalid(report)) => {
                warn!("Quote has TCB level {}", report.tcb_status);
                Ok(*report)
            }
            Err(SgxQuoteError::Invalid(e)) => Err(SgxError::Decode(e)),
        }
    }

    /// Verify `quote` and apply `policy`
    pub fn verify(&self, quote: &[u8], policy: &TrustPolicy) -> Result<SgxReport, SgxError> {
        let report = match self.primitive.verify_quote(quote) {
            Ok(report) => report,
            Err(SgxQuoteError::TcbLevelInvalid(report)) => {
                if !TOLERATED_INVALID_STATUS.contains(report.tcb_status) {
                    error!("TCB level invalid: {}", report.tcb_status);
                    return Err(SgxError::PolicyViolation(format!(
                        "TCB level invalid: {}",
                        report.tcb_status
                    )));
                }
                warn!("Tolerating TCB level: {}", report.tcb_status);
                *report
            }
            Err(SgxQuoteError::Invalid(e)) => return Err(SgxError::Decode(e)),
        };

        check_advisories(&report, policy)?;

        if report.debug {
            error!("SGX enclave is running in debug mode");
            return Err(SgxError::PolicyViolation(
                "debug mode enclaves are not allowed".into(),
            ));
        }

        if report.unique_id != policy.target_enclave_identity {
            error!(
                "SGX unique ID mismatch, expected {}, got {}",
                policy.unique_id_hex(),
                hex::encode(report.unique_id)
            );
            return Err(SgxError::PolicyViolation(format!(
                "unique ID mismatch: expected {}, got {}",
                policy.unique_id_hex(),
                hex::encode(report.unique_id)
            )));
        }
        debug!("SGX unique ID matches policy");

        Ok(report)
    }
}

fn check_advisories(report: &SgxReport, policy: &TrustPolicy) -> Result<(), SgxError> {
    if report.tcb_status.is_up_to_date() || report.advisory_ids.is_empty() {
        return Ok(());
    }
    let disallowed: Vec<&str> = report
        .advisory_ids
        .iter()
        .map(String::as_str)
        .filter(|advisory| !policy.is_advisory_allowed(advisory))
        .collect();
    if !disallowed.is_empty() {
        error!("TCB advisories not allowed: {}", disallowed.join(", "));
        return Err(SgxError::PolicyViolation(format!(
            "TCB advisories not allowed: {}",
            disallowed.join(", ")
        )));
    }
    warn!(
        "Platform TCB is {}, allowed advisories: {}",
        report.tcb_status,
        report.advisory_ids.join(", ")
    );
    Ok(())
}
