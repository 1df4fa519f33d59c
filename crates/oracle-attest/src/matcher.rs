// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2024-2025 Oracle Verification Developers

//! Binding of the report's user data to the reconstructed proof data

use crate::{
    error::{Error, Result},
    session::{OracleSession, DIGEST_SIZE},
};
use tracing::{debug, error};

/// Check that the first [`DIGEST_SIZE`] bytes of `user_data` are the hash of
/// `proof_data` formatted as a struct with `arity` members.
pub fn match_report_data<S: OracleSession + ?Sized>(
    session: &S,
    user_data: &[u8],
    proof_data: &[u8],
    arity: usize,
) -> Result<()> {
    let formatted = session
        .format_message(proof_data, arity)
        .map_err(|e| Error::Format(e.to_string()))?;
    let digest = session
        .hash_message(&formatted)
        .map_err(|e| Error::Hash(e.to_string()))?;

    let Some(embedded) = user_data.get(..DIGEST_SIZE) else {
        error!(len = user_data.len(), "user data is shorter than the digest");
        return Err(Error::DataMismatch);
    };
    if embedded != digest {
        error!(
            "user data mismatch, expected {}, got {}",
            hex::encode(digest),
            hex::encode(embedded)
        );
        return Err(Error::DataMismatch);
    }
    debug!("user data matches proof data");
    Ok(())
}
