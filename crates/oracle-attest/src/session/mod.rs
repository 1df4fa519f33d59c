// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2024-2025 Oracle Verification Developers

//! Cryptographic sessions used to hash the proof data
//!
//! A session formats the assembled proof data into the struct the on-chain
//! program hashes, and computes that hash. Sessions are acquired per batch
//! from a [`SessionProvider`] and released when dropped.

pub mod reference;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use reference::{ReferenceSession, ReferenceSessionProvider};

/// Length of the digest compared against the report's user data
pub const DIGEST_SIZE: usize = 16;

/// Struct arity of the legacy proof layout
pub const LEGACY_ARITY: usize = 10;
/// Struct arity of the block-height proof layout
pub const BLOCK_HEIGHT_ARITY: usize = 8;

/// The session implementations a verifier can be configured with
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionBackend {
    /// [`ReferenceSessionProvider`]: SHA3-256 digests, not the on-chain Poseidon8 hash
    Reference,
}

/// Errors of a cryptographic session
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[allow(missing_docs)]
pub enum SessionError {
    #[error("all {capacity} sessions are in use")]
    Exhausted { capacity: usize },
    #[error("session unavailable: {0}")]
    Unavailable(String),
    #[error("{0}")]
    Format(String),
    #[error("{0}")]
    Hash(String),
    #[error("failed to recover the message: {0}")]
    Recover(String),
}

/// An open session.
///
/// Shared by all reports of a batch, possibly from several threads.
pub trait OracleSession: Sync {
    /// Format `bytes` as a struct with `arity` members
    fn format_message(&self, bytes: &[u8], arity: usize) -> Result<String, SessionError>;

    /// Hash a formatted message
    fn hash_message(&self, formatted: &str) -> Result<[u8; DIGEST_SIZE], SessionError>;

    /// Recover the bytes of a message formatted by [`OracleSession::format_message`],
    /// including the zero padding of the struct
    fn recover_message(&self, formatted: &str) -> Result<Vec<u8>, SessionError>;
}

/// A source of [`OracleSession`]s with bounded capacity
pub trait SessionProvider {
    /// The session type. Dropping it releases the session.
    type Session: OracleSession;

    /// Acquire a session
    fn open_session(&self) -> Result<Self::Session, SessionError>;
}

impl<T: SessionProvider + ?Sized> SessionProvider for &T {
    type Session = T::Session;

    fn open_session(&self) -> Result<Self::Session, SessionError> {
        (**self).open_session()
    }
}
