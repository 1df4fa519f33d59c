// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2024-2025 Oracle Verification Developers

//! Verification of report batches

use crate::{
    error::{BatchError, Error, Result},
    matcher::match_report_data,
    policy::TrustPolicy,
    proof::{ProofAssembler, ProofLayout},
    record::ReportEnvelope,
    report::ReportVerifier,
    session::SessionProvider,
};
use serde::{Deserialize, Serialize};
use std::{
    any::Any,
    panic::{catch_unwind, resume_unwind, AssertUnwindSafe},
    sync::atomic::{AtomicBool, Ordering},
    thread,
};
use tracing::{debug, error, info, warn};

/// How a failing report affects the rest of the batch
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BatchFailurePolicy {
    /// Record the failure and continue with the next report
    #[default]
    ContinueOnError,
    /// Stop at the first failure; no report of the batch is valid
    AbortOnFirstError,
}

/// Engine settings of the configuration file
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchConfig {
    /// Proof layout the oracle backend commits to
    pub layout: ProofLayout,
    /// Failure handling
    pub failure_policy: BatchFailurePolicy,
    /// Verify the reports of a batch on several threads
    pub parallel: bool,
}

/// Outcome of a batch
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchResult {
    /// Indices of the reports that passed every check, ascending
    pub valid_indices: Vec<usize>,
    /// Error messages of the failed reports, in input order
    pub errors: Vec<String>,
}

impl BatchResult {
    /// `true` if no report failed
    pub fn is_success(&self) -> bool {
        self.errors.is_empty()
    }
}

/// The response of a batch verification
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyReportsResponse {
    /// `true` if every report is valid
    pub success: bool,
    /// Indices of the valid reports
    pub valid_reports: Vec<usize>,
    /// The failures, separated by `"; "`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

impl From<BatchResult> for VerifyReportsResponse {
    fn from(result: BatchResult) -> Self {
        Self {
            success: result.is_success(),
            error_message: (!result.errors.is_empty()).then(|| result.errors.join("; ")),
            valid_reports: result.valid_indices,
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| (*s).to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".into())
}

/// Verifies batches of client-submitted reports
pub struct BatchVerifier<P, V> {
    provider: P,
    verifier: V,
    policy: TrustPolicy,
    config: BatchConfig,
}

impl<P, V> BatchVerifier<P, V>
where
    P: SessionProvider + Sync,
    V: ReportVerifier,
{
    /// Create a batch verifier
    pub fn new(provider: P, verifier: V, policy: TrustPolicy, config: BatchConfig) -> Self {
        Self {
            provider,
            verifier,
            policy,
            config,
        }
    }

    /// The trust policy reports are checked against
    pub fn policy(&self) -> &TrustPolicy {
        &self.policy
    }

    /// Verify every report of the batch.
    ///
    /// Fails only if the batch is empty or no session is available; the
    /// failures of individual reports are part of the [`BatchResult`].
    pub fn verify_batch(
        &self,
        reports: &[serde_json::Value],
    ) -> std::result::Result<BatchResult, BatchError> {
        if reports.is_empty() {
            error!("no reports to verify");
            return Err(BatchError::NoReports);
        }
        let session = self.provider.open_session().map_err(|e| {
            error!("error opening a session: {e}");
            BatchError::from(e)
        })?;

        let outcomes = if self.config.parallel && reports.len() > 1 {
            self.verify_parallel(&session, reports)
        } else {
            self.verify_sequential(&session, reports)
        };

        let mut result = BatchResult::default();
        for (index, outcome) in outcomes.into_iter().enumerate() {
            match outcome {
                Some(Ok(())) => result.valid_indices.push(index),
                Some(Err(e)) => {
                    result.errors.push(e.to_string());
                    if self.abort_on_error() {
                        warn!(index, "aborting batch");
                        result.valid_indices.clear();
                        break;
                    }
                }
                None => {}
            }
        }

        info!(
            total = reports.len(),
            valid = result.valid_indices.len(),
            failed = result.errors.len(),
            "batch verified"
        );
        Ok(result)
    }

    fn abort_on_error(&self) -> bool {
        self.config.failure_policy == BatchFailurePolicy::AbortOnFirstError
    }

    fn verify_sequential(
        &self,
        session: &P::Session,
        reports: &[serde_json::Value],
    ) -> Vec<Option<Result<()>>> {
        let mut outcomes = Vec::with_capacity(reports.len());
        for (index, report) in reports.iter().enumerate() {
            let outcome = self.verify_one(session, index, report);
            let failed = outcome.is_err();
            outcomes.push(Some(outcome));
            if failed && self.abort_on_error() {
                break;
            }
        }
        outcomes
    }

    fn verify_parallel(
        &self,
        session: &P::Session,
        reports: &[serde_json::Value],
    ) -> Vec<Option<Result<()>>> {
        let threads = thread::available_parallelism()
            .map(usize::from)
            .unwrap_or(1)
            .min(reports.len());
        let chunk_size = reports.len().div_ceil(threads);
        let stop = AtomicBool::new(false);

        let mut outcomes: Vec<Option<Result<()>>> = Vec::with_capacity(reports.len());
        thread::scope(|s| {
            let handles: Vec<_> = reports
                .chunks(chunk_size)
                .enumerate()
                .map(|(chunk, reports)| {
                    let stop = &stop;
                    s.spawn(move || {
                        reports
                            .iter()
                            .enumerate()
                            .map(|(offset, report)| {
                                if stop.load(Ordering::Relaxed) {
                                    return None;
                                }
                                let outcome =
                                    self.verify_one(session, chunk * chunk_size + offset, report);
                                if outcome.is_err() && self.abort_on_error() {
                                    stop.store(true, Ordering::Relaxed);
                                }
                                Some(outcome)
                            })
                            .collect::<Vec<_>>()
                    })
                })
                .collect();
            for handle in handles {
                match handle.join() {
                    Ok(chunk) => outcomes.extend(chunk),
                    Err(payload) => resume_unwind(payload),
                }
            }
        });
        outcomes
    }

    fn verify_one(
        &self,
        session: &P::Session,
        index: usize,
        report: &serde_json::Value,
    ) -> Result<()> {
        let outcome = catch_unwind(AssertUnwindSafe(|| self.verify_report(session, report)))
            .unwrap_or_else(|payload| Err(Error::Panicked(panic_message(payload.as_ref()))));
        match &outcome {
            Ok(()) => debug!(index, "report is valid"),
            Err(e) => warn!(index, "error verifying report: {e}"),
        }
        outcome
    }

    fn verify_report(&self, session: &P::Session, report: &serde_json::Value) -> Result<()> {
        let envelope = ReportEnvelope::from_value(report.clone())?;
        let report_bytes = envelope.report_bytes()?;
        let verified = self.verifier.verify(
            envelope.report_type(),
            &report_bytes,
            envelope.nonce(),
            &self.policy,
        )?;

        let assembler = ProofAssembler::new(self.config.layout);
        let proof = match &envelope {
            ReportEnvelope::Single(record) => assembler.assemble_record(record)?,
            ReportEnvelope::Multi(record) => assembler.assemble_multi(record)?,
        };

        match_report_data(
            session,
            &verified.user_data,
            &proof,
            self.config.layout.struct_arity(),
        )
    }
}
