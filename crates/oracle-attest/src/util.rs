// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2024-2025 Oracle Verification Developers

//! utility functions.

use thiserror::Error;

/// Errors that can occur when padding bytes into fixed-size chunks.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum PadError {
    /// Indicates that the input length exceeds the target size.
    ///
    /// # Example
    /// ```rust
    /// # use oracle_attest::util::{pad, PadError};
    /// let long_input = vec![1, 2, 3, 4];
    /// let result = pad::<2>(&long_input);
    /// assert!(matches!(
    ///     result,
    ///     Err(PadError::InputTooLong { expected: 2, actual: 4 })
    /// ));
    /// ```
    #[error("Input is too long - expected at most {expected} bytes, got {actual}")]
    InputTooLong {
        /// The target size in bytes
        expected: usize,
        /// The actual length of the provided input
        actual: usize,
    },
}

/// Pad a byte slice to a fixed-size array by appending zeros. If the input is longer
/// than the target size, returns an error instead of truncating.
///
/// # Examples
/// ```rust
/// # use oracle_attest::util::{pad, PadError};
/// let padded: [u8; 5] = pad(&[1, 2, 3])?;
/// assert_eq!(padded, [1, 2, 3, 0, 0]);
/// # Ok::<(), PadError>(())
/// ```
pub fn pad<const T: usize>(input: &[u8]) -> Result<[u8; T], PadError> {
    if input.len() > T {
        return Err(PadError::InputTooLong {
            expected: T,
            actual: input.len(),
        });
    }
    let mut output = [0u8; T];
    output[..input.len()].copy_from_slice(input);
    Ok(output)
}

/// Round `len` up to the next multiple of `align`.
pub fn align_up(len: usize, align: usize) -> usize {
    len.div_ceil(align) * align
}

/// Decode a hex string into a fixed-size array, ignoring case and an optional `0x` prefix.
pub fn decode_hex_array<const N: usize>(s: &str) -> Result<[u8; N], hex::FromHexError> {
    let s = s.trim();
    let s = s
        .strip_prefix("0x")
        .or_else(|| s.strip_prefix("0X"))
        .unwrap_or(s);
    let mut out = [0u8; N];
    hex::decode_to_slice(s, &mut out)?;
    Ok(out)
}
