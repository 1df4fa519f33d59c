// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2024-2025 Oracle Verification Developers

//! Dispatch of TEE reports to the matching verifier

use crate::{
    error::{Error, Result},
    nitro::{NitroReport, NitroVerifier},
    policy::TrustPolicy,
    sgx::{SgxQuoteVerifier, SgxReport, SgxVerifier},
};
use std::{
    fmt::{Display, Formatter},
    str::FromStr,
};
use tracing::debug;

/// The TEE a report was produced in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportType {
    /// Intel SGX
    Sgx,
    /// AWS Nitro Enclaves
    Nitro,
}

impl FromStr for ReportType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "sgx" => Ok(Self::Sgx),
            "nitro" => Ok(Self::Nitro),
            _ => Err(Error::UnsupportedReportType(s.into())),
        }
    }
}

impl Display for ReportType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sgx => write!(f, "sgx"),
            Self::Nitro => write!(f, "nitro"),
        }
    }
}

/// TEE specific content of a verified report
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Evidence {
    /// A verified SGX quote
    Sgx(SgxReport),
    /// A verified Nitro attestation document
    Nitro(NitroReport),
}

/// A report that passed authenticity and trust policy checks
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifiedReport {
    /// TEE specific content
    pub evidence: Evidence,
    /// The data the enclave bound to the report
    pub user_data: Vec<u8>,
}

/// Verifies a raw TEE report against the trust policy
pub trait ReportVerifier: Sync {
    /// Verify `report` of type `report_type`
    fn verify(
        &self,
        report_type: &str,
        report: &[u8],
        nonce: Option<&str>,
        policy: &TrustPolicy,
    ) -> Result<VerifiedReport>;
}

/// Verifies SGX and Nitro reports
#[derive(Debug, Clone)]
pub struct TeeVerifier<Q> {
    sgx: SgxVerifier<Q>,
    nitro: Option<NitroVerifier>,
}

impl<Q: SgxQuoteVerifier> TeeVerifier<Q> {
    /// Create a verifier. Without a [`NitroVerifier`] all Nitro reports are rejected.
    pub fn new(sgx: SgxVerifier<Q>, nitro: Option<NitroVerifier>) -> Self {
        Self { sgx, nitro }
    }
}

impl<Q: SgxQuoteVerifier> ReportVerifier for TeeVerifier<Q> {
    fn verify(
        &self,
        report_type: &str,
        report: &[u8],
        nonce: Option<&str>,
        policy: &TrustPolicy,
    ) -> Result<VerifiedReport> {
        let verified = match report_type.parse::<ReportType>()? {
            ReportType::Sgx => {
                let report = self.sgx.verify(report, policy)?;
                VerifiedReport {
                    user_data: report.report_data.to_vec(),
                    evidence: Evidence::Sgx(report),
                }
            }
            ReportType::Nitro => {
                let nitro = self.nitro.as_ref().ok_or_else(|| {
                    Error::policy_violation("no Nitro root certificate is configured")
                })?;
                let report = nitro.verify(report, nonce, policy)?;
                VerifiedReport {
                    user_data: report.user_data.clone(),
                    evidence: Evidence::Nitro(report),
                }
            }
        };
        debug!(report_type, "report verified");
        Ok(verified)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        nitro::tests::{policy as nitro_policy, TestPki},
        sgx::{
            tests::{report, StaticQuoteVerifier, UNIQUE_ID},
            TcbStatus,
        },
    };

    fn verifier(nitro: Option<NitroVerifier>) -> TeeVerifier<StaticQuoteVerifier> {
        TeeVerifier::new(
            SgxVerifier::new(StaticQuoteVerifier(report(TcbStatus::UpToDate))),
            nitro,
        )
    }

    #[test]
    fn test_unsupported_report_type() {
        let err = verifier(None)
            .verify("tdx", &[1], None, &TrustPolicy::new(UNIQUE_ID))
            .unwrap_err();
        assert_eq!(err.to_string(), "unsupported report type: tdx");
    }

    #[test]
    fn test_sgx_dispatch() {
        let verified = verifier(None)
            .verify("sgx", &[1], None, &TrustPolicy::new(UNIQUE_ID))
            .unwrap();
        assert!(matches!(verified.evidence, Evidence::Sgx(_)));
        assert_eq!(verified.user_data.len(), 64);

        let err = verifier(None)
            .verify("sgx", &[1], None, &TrustPolicy::new([0; 32]))
            .unwrap_err();
        assert!(err.is_policy_violation());
    }

    #[test]
    fn test_nitro_dispatch() {
        let pki = TestPki::new();
        let report = pki.report(&[5; 64], Some("n"));

        let err = verifier(None)
            .verify("nitro", &report, Some("n"), &nitro_policy())
            .unwrap_err();
        assert!(err.is_policy_violation());

        let verified = verifier(Some(pki.verifier()))
            .verify("nitro", &report, Some("n"), &nitro_policy())
            .unwrap();
        assert!(matches!(verified.evidence, Evidence::Nitro(_)));
        assert_eq!(verified.user_data, vec![5; 64]);
    }
}
