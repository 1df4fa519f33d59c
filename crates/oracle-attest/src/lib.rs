// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2024-2025 Oracle Verification Developers

//! Verification of TEE attestation reports produced by the oracle backend.
//!
//! A report is trusted only if the TEE evidence matches the operator's
//! [`policy::TrustPolicy`] and the user data signed by the enclave equals the
//! digest of the proof data the verifier reconstructs independently.

#![deny(missing_docs)]
#![deny(clippy::all)]

pub mod batch;
pub mod decode;
pub mod error;
pub mod info;
pub mod log;
pub mod matcher;
pub mod nitro;
pub mod policy;
pub mod proof;
pub mod record;
pub mod report;
pub mod session;
pub mod sgx;
pub mod util;
