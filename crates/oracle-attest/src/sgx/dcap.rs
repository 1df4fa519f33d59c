// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2024-2025 Oracle Verification Developers

//! SGX quote verification with `dcap-qvl`

use super::{SgxQuoteError, SgxQuoteVerifier, SgxReport, TcbStatus};
use dcap_qvl::{
    quote::{EnclaveReport, Report},
    verify::VerifiedReport,
    QuoteCollateralV3,
};
use std::{str::FromStr, time::Duration};
use tracing::debug;

const SGX_FLAGS_DEBUG: u8 = 0x02;

/// Verifies quotes with `dcap-qvl`, fetching collateral from Intel PCS
/// unless collateral was provided.
#[derive(Debug, Clone)]
pub struct DcapQuoteVerifier {
    collateral: Option<QuoteCollateralV3>,
    timeout: Duration,
}

impl Default for DcapQuoteVerifier {
    fn default() -> Self {
        Self {
            collateral: None,
            timeout: Duration::from_secs(30),
        }
    }
}

impl DcapQuoteVerifier {
    /// Use `collateral` for every quote instead of fetching it
    pub fn with_collateral(collateral: QuoteCollateralV3) -> Self {
        Self {
            collateral: Some(collateral),
            ..Default::default()
        }
    }

    /// Timeout for collateral requests
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn collateral(&self, quote: &[u8]) -> Result<QuoteCollateralV3, SgxQuoteError> {
        if let Some(collateral) = &self.collateral {
            return Ok(collateral.clone());
        }
        // Execute the async operation in a separate thread
        std::thread::scope(|s| {
            s.spawn(|| {
                let rt = tokio::runtime::Builder::new_current_thread()
                    .enable_all()
                    .build()
                    .map_err(|e| {
                        SgxQuoteError::Invalid(format!("Failed to build tokio runtime: {e}"))
                    })?;
                rt.block_on(dcap_qvl::collateral::get_collateral_from_pcs(
                    quote,
                    self.timeout,
                ))
                .map_err(|e| SgxQuoteError::Invalid(format!("Fetching PCS collateral: {e:?}")))
            })
            .join()
            .map_err(|_| SgxQuoteError::Invalid("Thread panic in get_collateral".into()))
        })?
    }
}

impl SgxQuoteVerifier for DcapQuoteVerifier {
    fn verify_quote(&self, quote: &[u8]) -> Result<SgxReport, SgxQuoteError> {
        let collateral = self.collateral(quote)?;
        let now = u64::try_from(chrono::Utc::now().timestamp())
            .map_err(|e| SgxQuoteError::Invalid(format!("invalid system time: {e}")))?;

        let VerifiedReport {
            status,
            advisory_ids,
            report,
        } = dcap_qvl::verify::verify(quote, &collateral, now)
            .map_err(|e| SgxQuoteError::Invalid(format!("quote verification failed: {e:?}")))?;

        let tcb_status = TcbStatus::from_str(&status).map_err(SgxQuoteError::Invalid)?;
        debug!(%tcb_status, ?advisory_ids, "quote verified");

        let Report::SgxEnclave(enclave) = report else {
            return Err(SgxQuoteError::Invalid("not an SGX enclave quote".into()));
        };
        let report = sgx_report(tcb_status, advisory_ids, &enclave);

        match tcb_status {
            TcbStatus::UpToDate | TcbStatus::SwHardeningNeeded => Ok(report),
            _ => Err(SgxQuoteError::TcbLevelInvalid(Box::new(report))),
        }
    }
}

fn sgx_report(
    tcb_status: TcbStatus,
    advisory_ids: Vec<String>,
    enclave: &EnclaveReport,
) -> SgxReport {
    SgxReport {
        tcb_status,
        advisory_ids,
        debug: enclave.attributes[0] & SGX_FLAGS_DEBUG != 0,
        unique_id: enclave.mr_enclave,
        report_data: enclave.report_data,
    }
}
