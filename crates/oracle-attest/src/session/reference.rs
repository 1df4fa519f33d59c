// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2024-2025 Oracle Verification Developers

//! In-process reference session
//!
//! Formats proof data exactly like the oracle's struct layout, but hashes with
//! SHA3-256 instead of the on-chain Poseidon8 hash. Digests of this session
//! never match reports of a production oracle; it is meant for tests and for
//! verifying reports of an oracle built against the same reference session.

use super::{OracleSession, SessionError, SessionProvider, DIGEST_SIZE};
use sha3::{Digest, Sha3_256};
use std::{
    fmt::Write,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
};
use tracing::trace;

/// Number of `u128` fields of one struct member
pub const FIELDS_PER_MEMBER: usize = 32;
/// Bytes covered by one struct member
pub const MEMBER_SIZE: usize = FIELDS_PER_MEMBER * 16;

/// Hands out [`ReferenceSession`]s, at most `capacity` at a time.
#[derive(Debug, Clone)]
pub struct ReferenceSessionProvider {
    capacity: usize,
    open: Arc<AtomicUsize>,
}

impl ReferenceSessionProvider {
    /// A provider allowing `capacity` concurrently open sessions
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            open: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Number of currently open sessions
    pub fn open_sessions(&self) -> usize {
        self.open.load(Ordering::Acquire)
    }
}

impl Default for ReferenceSessionProvider {
    fn default() -> Self {
        Self::new(1)
    }
}

impl SessionProvider for ReferenceSessionProvider {
    type Session = ReferenceSession;

    fn open_session(&self) -> Result<ReferenceSession, SessionError> {
        self.open
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |open| {
                (open < self.capacity).then_some(open + 1)
            })
            .map_err(|_| SessionError::Exhausted {
                capacity: self.capacity,
            })?;
        trace!("session opened");
        Ok(ReferenceSession {
            open: self.open.clone(),
        })
    }
}

/// Formats proof data as an Aleo struct literal and hashes it with SHA3-256.
#[derive(Debug)]
pub struct ReferenceSession {
    open: Arc<AtomicUsize>,
}

impl Drop for ReferenceSession {
    fn drop(&mut self) {
        self.open.fetch_sub(1, Ordering::AcqRel);
        trace!("session released");
    }
}

fn field(bytes: &[u8], member: usize, index: usize) -> u128 {
    let start = member * MEMBER_SIZE + index * 16;
    let mut chunk = [0u8; 16];
    if start < bytes.len() {
        let end = bytes.len().min(start + 16);
        chunk[..end - start].copy_from_slice(&bytes[start..end]);
    }
    u128::from_le_bytes(chunk)
}

fn write_struct(out: &mut String, bytes: &[u8], arity: usize) -> std::fmt::Result {
    out.write_str("{ ")?;
    for member in 0..arity {
        if member > 0 {
            out.write_str(", ")?;
        }
        write!(out, "c{member}: {{ ")?;
        for index in 0..FIELDS_PER_MEMBER {
            if index > 0 {
                out.write_str(", ")?;
            }
            write!(out, "f{index}: {}u128", field(bytes, member, index))?;
        }
        out.write_str(" }")?;
    }
    out.write_str(" }")
}

fn recover_member(member: usize, text: &str, out: &mut Vec<u8>) -> Result<(), SessionError> {
    let malformed = |reason: &str| SessionError::Recover(format!("member c{member}: {reason}"));

    let fields = text
        .trim()
        .strip_prefix(&format!("c{member}:"))
        .and_then(|rest| rest.trim_start().strip_prefix('{'))
        .ok_or_else(|| malformed("expected `c<N>: {`"))?;

    let mut count = 0;
    for (index, entry) in fields.split(',').enumerate() {
        let (name, value) = entry
            .split_once(':')
            .ok_or_else(|| malformed("expected `name: value`"))?;
        if name.trim() != format!("f{index}") {
            return Err(malformed(&format!("unexpected field {:?}", name.trim())));
        }
        let value = value
            .trim()
            .strip_suffix("u128")
            .and_then(|digits| digits.parse::<u128>().ok())
            .ok_or_else(|| malformed(&format!("invalid u128 literal {:?}", value.trim())))?;
        out.extend_from_slice(&value.to_le_bytes());
        count += 1;
    }
    if count != FIELDS_PER_MEMBER {
        return Err(malformed(&format!(
            "expected {FIELDS_PER_MEMBER} fields, got {count}"
        )));
    }
    Ok(())
}

impl OracleSession for ReferenceSession {
    fn format_message(&self, bytes: &[u8], arity: usize) -> Result<String, SessionError> {
        if arity == 0 {
            return Err(SessionError::Format("struct arity must not be zero".into()));
        }
        let capacity = arity * MEMBER_SIZE;
        if bytes.len() > capacity {
            return Err(SessionError::Format(format!(
                "{} bytes do not fit into a struct of {arity} members ({capacity} bytes)",
                bytes.len()
            )));
        }

        let mut out = String::with_capacity(arity * FIELDS_PER_MEMBER * 48);
        write_struct(&mut out, bytes, arity).map_err(|e| SessionError::Format(e.to_string()))?;
        Ok(out)
    }

    fn hash_message(&self, formatted: &str) -> Result<[u8; DIGEST_SIZE], SessionError> {
        if formatted.is_empty() {
            return Err(SessionError::Hash("cannot hash an empty message".into()));
        }
        let digest = Sha3_256::digest(formatted.as_bytes());
        let mut out = [0u8; DIGEST_SIZE];
        out.copy_from_slice(&digest[..DIGEST_SIZE]);
        Ok(out)
    }

    fn recover_message(&self, formatted: &str) -> Result<Vec<u8>, SessionError> {
        let body = formatted
            .trim()
            .strip_prefix('{')
            .and_then(|s| s.strip_suffix('}'))
            .ok_or_else(|| SessionError::Recover("message is not a struct literal".into()))?;

        let mut out = Vec::new();
        // every member ends with its own closing brace
        let members = body
            .split('}')
            .map(|m| m.trim().trim_start_matches(',').trim())
            .filter(|m| !m.is_empty());
        for (member, text) in members.enumerate() {
            recover_member(member, text, &mut out)?;
        }
        if out.is_empty() {
            return Err(SessionError::Recover("message has no members".into()));
        }
        Ok(out)
    }
}
