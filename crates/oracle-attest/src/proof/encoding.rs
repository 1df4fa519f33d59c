// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2024-2025 Oracle Verification Developers

//! The oracle proof data encoding
//!
//! ```text
//! +---------------------+--------+--------------------+-----------------+-----+---------+
//! | meta header (32 B)  | value  | timestamp | status | block height(*) | ... | headers |
//! +---------------------+--------+--------------------+-----------------+-----+---------+
//! ```
//!
//! The meta header holds the layout version, the value encoding and the byte
//! length of every variable segment. Every segment after the header is
//! zero-padded to a multiple of [`SEGMENT_ALIGNMENT`] bytes. Request headers
//! are sorted by key, and every key and value carries a `u16` LE length prefix.
//! (*) block-height layout only.

use crate::{
    proof::{ProofLayout, CHUNK_SIZE},
    record::{AttestationRequest, EncodingOptions, ValueKind},
    util::align_up,
};
use serde::Serialize;
use std::collections::BTreeMap;
use thiserror::Error;

/// Size of the meta header
pub const META_HEADER_SIZE: usize = 32;
/// Alignment of every segment after the meta header
pub const SEGMENT_ALIGNMENT: usize = 16;
/// Width of the block height field in the block-height layout
pub const BLOCK_HEIGHT_WIDTH: u16 = 8;

const VERSION_OFFSET: usize = 0;
const VALUE_KIND_OFFSET: usize = 1;
const PRECISION_OFFSET: usize = 2;
const LENGTHS_OFFSET: usize = 3;
const BLOCK_HEIGHT_WIDTH_OFFSET: usize = 21;
const NUMBER_SIZE: usize = 16;

/// Errors encoding the proof data
#[derive(Error, Debug, PartialEq, Eq)]
#[allow(missing_docs)]
pub enum EncodingError {
    #[error("{field} is too long to encode: {len} bytes")]
    SegmentTooLong { field: &'static str, len: usize },
    #[error("invalid {kind} value {value:?}")]
    InvalidNumber { kind: &'static str, value: String },
    #[error("{kind} value {value:?} overflows 128 bits")]
    NumberOverflow { kind: &'static str, value: String },
}

/// Errors decoding proof data
#[derive(Error, Debug, PartialEq, Eq)]
#[allow(missing_docs)]
pub enum DecodingError {
    #[error("unknown proof data version {0}")]
    UnknownVersion(u8),
    #[error("unknown value kind {0}")]
    UnknownValueKind(u8),
    #[error("invalid block height width {0}")]
    InvalidBlockHeightWidth(u16),
    #[error("proof data is truncated in {field}")]
    Truncated { field: &'static str },
    #[error("{field} is not valid UTF-8")]
    InvalidUtf8 { field: &'static str },
    #[error("invalid {field}: {reason}")]
    InvalidField { field: &'static str, reason: String },
    #[error("no decoded data")]
    NoProofData,
}

/// The fields of one attestation that are committed in the proof data
#[derive(Debug, Clone, Copy)]
pub struct ProofFields<'a> {
    /// HTTP status code
    pub status_code: u16,
    /// The attested value
    pub attestation_data: &'a str,
    /// Unix timestamp
    pub timestamp: i64,
    /// Block height, block-height layout only
    pub block_height: Option<u64>,
    /// The performed request
    pub request: &'a AttestationRequest,
}

/// The committed fields recovered from one proof chunk.
///
/// Numeric values are rendered in their canonical form, so a float committed
/// as `"104.25"` with precision 6 decodes as `"104.250000"`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DecodedProofData {
    /// Layout the chunk was encoded with
    pub layout: ProofLayout,
    /// Price feed token id, if the chunk carries one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token_id: Option<u8>,
    /// The attested value
    pub attestation_data: String,
    /// Unix timestamp
    pub timestamp: i64,
    /// HTTP status code
    pub response_status_code: u16,
    /// Block height, block-height layout only
    #[serde(skip_serializing_if = "Option::is_none")]
    pub block_height: Option<u64>,
    /// The performed request
    pub attestation_request: AttestationRequest,
}

fn value_kind_tag(kind: ValueKind) -> u8 {
    match kind {
        ValueKind::String => 0,
        ValueKind::Int => 1,
        ValueKind::Float => 2,
    }
}

fn value_kind_from_tag(tag: u8) -> Result<ValueKind, DecodingError> {
    match tag {
        0 => Ok(ValueKind::String),
        1 => Ok(ValueKind::Int),
        2 => Ok(ValueKind::Float),
        _ => Err(DecodingError::UnknownValueKind(tag)),
    }
}

fn parse_u128(kind: &'static str, value: &str, digits: &str) -> Result<u128, EncodingError> {
    digits.parse::<u128>().map_err(|e| match e.kind() {
        std::num::IntErrorKind::PosOverflow => EncodingError::NumberOverflow {
            kind,
            value: value.into(),
        },
        _ => EncodingError::InvalidNumber {
            kind,
            value: value.into(),
        },
    })
}

/// Parse an unsigned decimal into a fixed-point integer with `precision` fractional digits.
///
/// Extra fractional digits are truncated.
fn parse_fixed_point(value: &str, precision: u8) -> Result<u128, EncodingError> {
    const KIND: &str = "float";
    let trimmed = value.trim();
    let (int_part, frac_part) = trimmed.split_once('.').unwrap_or((trimmed, ""));
    let is_digits = |s: &str| s.bytes().all(|b| b.is_ascii_digit());
    if (int_part.is_empty() && frac_part.is_empty()) || !is_digits(int_part) || !is_digits(frac_part)
    {
        return Err(EncodingError::InvalidNumber {
            kind: KIND,
            value: value.into(),
        });
    }

    let precision = usize::from(precision);
    let mut digits = String::with_capacity(int_part.len() + precision);
    digits.push_str(if int_part.is_empty() { "0" } else { int_part });
    let kept = &frac_part[..frac_part.len().min(precision)];
    digits.push_str(kept);
    digits.extend(std::iter::repeat('0').take(precision - kept.len()));

    parse_u128(KIND, value, &digits)
}

fn format_fixed_point(value: u128, precision: u8) -> Result<String, DecodingError> {
    if precision == 0 {
        return Ok(value.to_string());
    }
    let scale = 10u128
        .checked_pow(u32::from(precision))
        .ok_or_else(|| DecodingError::InvalidField {
            field: "precision",
            reason: format!("{precision} fractional digits do not fit 128 bits"),
        })?;
    Ok(format!(
        "{}.{:0width$}",
        value / scale,
        value % scale,
        width = usize::from(precision)
    ))
}

fn encode_value(value: &str, options: &EncodingOptions) -> Result<Vec<u8>, EncodingError> {
    match options.value {
        ValueKind::String => Ok(value.as_bytes().to_vec()),
        ValueKind::Int => Ok(parse_u128("int", value, value.trim())?
            .to_le_bytes()
            .to_vec()),
        ValueKind::Float => Ok(parse_fixed_point(value, options.precision)?
            .to_le_bytes()
            .to_vec()),
    }
}

fn push_prefixed(out: &mut Vec<u8>, bytes: &[u8]) -> Result<(), EncodingError> {
    let len = u16::try_from(bytes.len()).map_err(|_| EncodingError::SegmentTooLong {
        field: "request header",
        len: bytes.len(),
    })?;
    out.extend_from_slice(&len.to_le_bytes());
    out.extend_from_slice(bytes);
    Ok(())
}

fn encode_headers(request: &AttestationRequest) -> Result<Vec<u8>, EncodingError> {
    let mut out = Vec::new();
    // BTreeMap iterates in key order
    for (key, value) in request.request_headers.iter().flatten() {
        push_prefixed(&mut out, key.as_bytes())?;
        push_prefixed(&mut out, value.as_bytes())?;
    }
    Ok(out)
}

struct Writer {
    buf: Vec<u8>,
}

impl Writer {
    fn segment(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
        self.buf.resize(align_up(self.buf.len(), SEGMENT_ALIGNMENT), 0);
    }
}

/// Encode the committed fields of one attestation.
pub fn encode_proof(layout: ProofLayout, fields: &ProofFields<'_>) -> Result<Vec<u8>, EncodingError> {
    let request = fields.request;
    let value = encode_value(fields.attestation_data, &request.encoding_options)?;
    let opt = |s: &Option<String>| s.as_deref().unwrap_or_default().as_bytes().to_vec();
    let headers = encode_headers(request)?;

    let variable: [(&'static str, Vec<u8>); 9] = [
        ("attestation data", value),
        ("request method", request.request_method.as_bytes().to_vec()),
        ("url", request.url.as_bytes().to_vec()),
        ("selector", opt(&request.selector)),
        ("response format", request.response_format.as_bytes().to_vec()),
        ("html result type", opt(&request.html_result_type)),
        ("request body", opt(&request.request_body)),
        ("request content type", opt(&request.request_content_type)),
        ("request headers", headers),
    ];

    let mut header = [0u8; META_HEADER_SIZE];
    header[VERSION_OFFSET] = layout.version();
    header[VALUE_KIND_OFFSET] = value_kind_tag(request.encoding_options.value);
    header[PRECISION_OFFSET] = request.encoding_options.precision;
    for (i, (field, bytes)) in variable.iter().enumerate() {
        let len = u16::try_from(bytes.len()).map_err(|_| EncodingError::SegmentTooLong {
            field: *field,
            len: bytes.len(),
        })?;
        let offset = LENGTHS_OFFSET + 2 * i;
        header[offset..offset + 2].copy_from_slice(&len.to_le_bytes());
    }
    if layout.includes_block_height() {
        header[BLOCK_HEIGHT_WIDTH_OFFSET..BLOCK_HEIGHT_WIDTH_OFFSET + 2]
            .copy_from_slice(&BLOCK_HEIGHT_WIDTH.to_le_bytes());
    }

    let mut writer = Writer {
        buf: Vec::with_capacity(META_HEADER_SIZE * 8),
    };
    writer.buf.extend_from_slice(&header);

    let [value, rest @ ..] = variable;
    writer.segment(&value.1);

    let mut stamp = [0u8; 16];
    stamp[..8].copy_from_slice(&fields.timestamp.to_le_bytes());
    stamp[8..].copy_from_slice(&u64::from(fields.status_code).to_le_bytes());
    writer.segment(&stamp);

    if layout.includes_block_height() {
        writer.segment(&fields.block_height.unwrap_or_default().to_le_bytes());
    }

    for (_, bytes) in rest.iter() {
        writer.segment(bytes);
    }

    Ok(writer.buf)
}

struct Reader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    /// Read a segment of `len` bytes and skip its padding
    fn segment(&mut self, field: &'static str, len: usize) -> Result<&'a [u8], DecodingError> {
        let bytes = self
            .buf
            .get(self.pos..self.pos + len)
            .ok_or(DecodingError::Truncated { field })?;
        self.pos = align_up(self.pos + len, SEGMENT_ALIGNMENT);
        Ok(bytes)
    }

    fn text(&mut self, field: &'static str, len: usize) -> Result<String, DecodingError> {
        let bytes = self.segment(field, len)?;
        String::from_utf8(bytes.to_vec()).map_err(|_| DecodingError::InvalidUtf8 { field })
    }
}

fn u16_at(buf: &[u8], offset: usize) -> u16 {
    u16::from_le_bytes([buf[offset], buf[offset + 1]])
}

fn le8(bytes: &[u8]) -> [u8; 8] {
    let mut buf = [0u8; 8];
    buf.copy_from_slice(&bytes[..8]);
    buf
}

fn decode_value(bytes: &[u8], options: &EncodingOptions) -> Result<String, DecodingError> {
    const FIELD: &str = "attestation data";
    let number = || -> Result<u128, DecodingError> {
        let bytes: [u8; NUMBER_SIZE] =
            bytes.try_into().map_err(|_| DecodingError::InvalidField {
                field: FIELD,
                reason: format!("expected {NUMBER_SIZE} bytes, got {}", bytes.len()),
            })?;
        Ok(u128::from_le_bytes(bytes))
    };
    match options.value {
        ValueKind::String => String::from_utf8(bytes.to_vec())
            .map_err(|_| DecodingError::InvalidUtf8 { field: FIELD }),
        ValueKind::Int => Ok(number()?.to_string()),
        ValueKind::Float => format_fixed_point(number()?, options.precision),
    }
}

fn next_prefixed(reader: &mut &[u8]) -> Result<String, DecodingError> {
    const FIELD: &str = "request headers";
    let (len, rest) = reader
        .split_first_chunk::<2>()
        .ok_or(DecodingError::Truncated { field: FIELD })?;
    let len = usize::from(u16::from_le_bytes(*len));
    if rest.len() < len {
        return Err(DecodingError::Truncated { field: FIELD });
    }
    let (text, rest) = rest.split_at(len);
    *reader = rest;
    String::from_utf8(text.to_vec()).map_err(|_| DecodingError::InvalidUtf8 { field: FIELD })
}

fn decode_headers(bytes: &[u8]) -> Result<Option<BTreeMap<String, String>>, DecodingError> {
    if bytes.is_empty() {
        return Ok(None);
    }
    let mut reader = bytes;
    let mut headers = BTreeMap::new();
    while !reader.is_empty() {
        let key = next_prefixed(&mut reader)?;
        let value = next_prefixed(&mut reader)?;
        headers.insert(key, value);
    }
    Ok(Some(headers))
}

/// Decode one proof chunk, the inverse of [`encode_proof`] plus the token id override.
pub fn decode_chunk(chunk: &[u8]) -> Result<DecodedProofData, DecodingError> {
    if chunk.len() < META_HEADER_SIZE {
        return Err(DecodingError::Truncated {
            field: "meta header",
        });
    }
    let version = chunk[VERSION_OFFSET];
    let layout =
        ProofLayout::from_version(version).ok_or(DecodingError::UnknownVersion(version))?;
    let encoding_options = EncodingOptions {
        value: value_kind_from_tag(chunk[VALUE_KIND_OFFSET])?,
        precision: chunk[PRECISION_OFFSET],
    };
    if layout.includes_block_height() {
        let width = u16_at(chunk, BLOCK_HEIGHT_WIDTH_OFFSET);
        if width != BLOCK_HEIGHT_WIDTH {
            return Err(DecodingError::InvalidBlockHeightWidth(width));
        }
    }
    let token_id = Some(chunk[layout.token_id_offset()]).filter(|id| *id != 0);
    let len = |i: usize| usize::from(u16_at(chunk, LENGTHS_OFFSET + 2 * i));

    let mut reader = Reader {
        buf: chunk,
        pos: META_HEADER_SIZE,
    };
    let value = reader.segment("attestation data", len(0))?;
    let attestation_data = decode_value(value, &encoding_options)?;

    let stamp = reader.segment("timestamp", 16)?;
    let timestamp = i64::from_le_bytes(le8(stamp));
    let status = u64::from_le_bytes(le8(&stamp[8..]));
    let response_status_code =
        u16::try_from(status).map_err(|_| DecodingError::InvalidField {
            field: "status code",
            reason: format!("{status} is out of range"),
        })?;

    let block_height = if layout.includes_block_height() {
        let height = reader.segment("block height", usize::from(BLOCK_HEIGHT_WIDTH))?;
        Some(u64::from_le_bytes(le8(height)))
    } else {
        None
    };

    let optional = |s: String| Some(s).filter(|s| !s.is_empty());
    let request_method = reader.text("request method", len(1))?;
    let url = reader.text("url", len(2))?;
    let selector = optional(reader.text("selector", len(3))?);
    let response_format = reader.text("response format", len(4))?;
    let html_result_type = optional(reader.text("html result type", len(5))?);
    let request_body = optional(reader.text("request body", len(6))?);
    let request_content_type = optional(reader.text("request content type", len(7))?);
    let request_headers = decode_headers(reader.segment("request headers", len(8))?)?;

    Ok(DecodedProofData {
        layout,
        token_id,
        attestation_data,
        timestamp,
        response_status_code,
        block_height,
        attestation_request: AttestationRequest {
            url,
            request_method,
            selector,
            response_format,
            html_result_type,
            request_body,
            request_content_type,
            request_headers,
            encoding_options,
            debug_request: false,
        },
    })
}

/// Decode the proof data of a single- or multi-token report.
///
/// The data is split into [`CHUNK_SIZE`] chunks; decoding stops at the first
/// chunk starting with a zero byte, which marks the struct padding.
pub fn decode_proof(data: &[u8]) -> Result<Vec<DecodedProofData>, DecodingError> {
    let decoded = data
        .chunks(CHUNK_SIZE)
        .take_while(|chunk| chunk[0] != 0)
        .map(decode_chunk)
        .collect::<Result<Vec<_>, _>>()?;
    if decoded.is_empty() {
        return Err(DecodingError::NoProofData);
    }
    Ok(decoded)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::tests::price_request;

    fn fields(request: &AttestationRequest) -> ProofFields<'_> {
        ProofFields {
            status_code: 200,
            attestation_data: "104.25",
            timestamp: 1_718_000_000,
            block_height: None,
            request,
        }
    }

    #[test]
    fn test_fixed_point() {
        assert_eq!(parse_fixed_point("104.25", 6), Ok(104_250_000));
        assert_eq!(parse_fixed_point("0.1234567", 6), Ok(123_456));
        assert_eq!(parse_fixed_point("7", 0), Ok(7));
        assert_eq!(parse_fixed_point(".5", 1), Ok(5));
        assert_eq!(parse_fixed_point("12.", 2), Ok(1200));
        assert!(matches!(
            parse_fixed_point("-1.0", 2),
            Err(EncodingError::InvalidNumber { .. })
        ));
        assert!(matches!(
            parse_fixed_point("1e5", 2),
            Err(EncodingError::InvalidNumber { .. })
        ));
        assert!(matches!(
            parse_fixed_point(".", 2),
            Err(EncodingError::InvalidNumber { .. })
        ));
        assert!(matches!(
            parse_fixed_point("340282366920938463463374607431768211456", 0),
            Err(EncodingError::NumberOverflow { .. })
        ));
    }

    #[test]
    fn test_meta_header() {
        let request = price_request("https://api.example.com/price");
        let encoded = encode_proof(ProofLayout::Legacy, &fields(&request)).unwrap();

        assert_eq!(encoded[VERSION_OFFSET], 1);
        assert_eq!(encoded[VALUE_KIND_OFFSET], 2);
        assert_eq!(encoded[PRECISION_OFFSET], 6);
        // attestation data is a 16 byte u128
        assert_eq!(&encoded[3..5], &16u16.to_le_bytes());
        // url length
        assert_eq!(&encoded[7..9], &29u16.to_le_bytes());
        assert_eq!(encoded[21], 0);
        assert_eq!(encoded.len() % SEGMENT_ALIGNMENT, 0);

        let value = &encoded[META_HEADER_SIZE..META_HEADER_SIZE + 16];
        assert_eq!(value, &104_250_000u128.to_le_bytes());
        let stamp = &encoded[META_HEADER_SIZE + 16..META_HEADER_SIZE + 32];
        assert_eq!(&stamp[..8], &1_718_000_000i64.to_le_bytes());
        assert_eq!(&stamp[8..], &200u64.to_le_bytes());
    }

    #[test]
    fn test_block_height_layout() {
        let request = price_request("https://api.example.com/price");
        let mut f = fields(&request);
        f.block_height = Some(0x0102);
        let legacy = encode_proof(ProofLayout::Legacy, &f).unwrap();
        let encoded = encode_proof(ProofLayout::BlockHeight, &f).unwrap();

        assert_eq!(encoded[VERSION_OFFSET], 2);
        assert_eq!(&encoded[21..23], &BLOCK_HEIGHT_WIDTH.to_le_bytes());
        assert_eq!(encoded[23], 0);
        assert_eq!(encoded.len(), legacy.len() + SEGMENT_ALIGNMENT);
        let height = &encoded[META_HEADER_SIZE + 32..META_HEADER_SIZE + 48];
        assert_eq!(&height[..8], &0x0102u64.to_le_bytes());
    }

    #[test]
    fn test_headers_are_sorted() {
        let mut a = price_request("https://api.example.com/price");
        a.request_headers = Some(
            [("x-b".to_string(), "2".to_string()), ("x-a".into(), "1".into())]
                .into_iter()
                .collect(),
        );
        assert_eq!(
            encode_headers(&a).unwrap(),
            b"\x03\x00x-a\x01\x001\x03\x00x-b\x01\x002".to_vec()
        );
    }

    #[test]
    fn test_headers_are_injective() {
        let headers = |pairs: &[(&str, &str)]| {
            let mut request = price_request("https://api.example.com/price");
            request.request_headers = Some(
                pairs
                    .iter()
                    .map(|(k, v)| (k.to_string(), v.to_string()))
                    .collect(),
            );
            request
        };
        let joined = headers(&[("x-a:1\nx-b", "2")]);
        let split = headers(&[("x-a", "1"), ("x-b", "2")]);
        assert_ne!(
            encode_proof(ProofLayout::Legacy, &fields(&joined)).unwrap(),
            encode_proof(ProofLayout::Legacy, &fields(&split)).unwrap()
        );

        let moved = headers(&[("x-a", "1x-b"), ("", "2")]);
        assert_ne!(encode_headers(&moved).unwrap(), encode_headers(&split).unwrap());
    }

    #[test]
    fn test_string_and_int_values() {
        let mut request = price_request("https://example.com");
        request.encoding_options = EncodingOptions {
            value: ValueKind::String,
            precision: 0,
        };
        let encoded = encode_proof(ProofLayout::Legacy, &fields(&request)).unwrap();
        assert_eq!(&encoded[3..5], &6u16.to_le_bytes());
        assert_eq!(&encoded[META_HEADER_SIZE..META_HEADER_SIZE + 6], b"104.25");

        request.encoding_options.value = ValueKind::Int;
        assert!(matches!(
            encode_proof(ProofLayout::Legacy, &fields(&request)),
            Err(EncodingError::InvalidNumber { kind: "int", .. })
        ));
    }

    #[test]
    fn test_decode_chunk_inverts_encode() {
        let mut request = price_request("https://api.example.com/price");
        request.request_headers = Some(
            [("Accept".to_string(), "application/json".to_string())]
                .into_iter()
                .collect(),
        );
        request.request_body = Some("{}".into());
        for layout in [ProofLayout::Legacy, ProofLayout::BlockHeight] {
            let mut f = fields(&request);
            f.block_height = layout.includes_block_height().then_some(4_180_000);
            let decoded = decode_chunk(&encode_proof(layout, &f).unwrap()).unwrap();
            assert_eq!(
                decoded,
                DecodedProofData {
                    layout,
                    token_id: None,
                    attestation_data: "104.250000".into(),
                    timestamp: 1_718_000_000,
                    response_status_code: 200,
                    block_height: f.block_height,
                    attestation_request: request.clone(),
                }
            );
        }
    }

    #[test]
    fn test_decode_string_and_int_values() {
        let mut request = price_request("https://example.com");
        request.encoding_options = EncodingOptions {
            value: ValueKind::String,
            precision: 0,
        };
        let encoded = encode_proof(ProofLayout::Legacy, &fields(&request)).unwrap();
        assert_eq!(decode_chunk(&encoded).unwrap().attestation_data, "104.25");

        request.encoding_options.value = ValueKind::Int;
        let mut f = fields(&request);
        f.attestation_data = "42";
        let encoded = encode_proof(ProofLayout::Legacy, &f).unwrap();
        assert_eq!(decode_chunk(&encoded).unwrap().attestation_data, "42");
    }

    #[test]
    fn test_decode_rejects_malformed_chunks() {
        let request = price_request("https://example.com");
        let encoded = encode_proof(ProofLayout::Legacy, &fields(&request)).unwrap();

        let mut bad_version = encoded.clone();
        bad_version[VERSION_OFFSET] = 7;
        assert_eq!(decode_chunk(&bad_version), Err(DecodingError::UnknownVersion(7)));

        let mut bad_kind = encoded.clone();
        bad_kind[VALUE_KIND_OFFSET] = 9;
        assert_eq!(decode_chunk(&bad_kind), Err(DecodingError::UnknownValueKind(9)));

        assert!(matches!(
            decode_chunk(&encoded[..META_HEADER_SIZE + 20]),
            Err(DecodingError::Truncated { .. })
        ));
        assert_eq!(
            decode_proof(&[0u8; CHUNK_SIZE]),
            Err(DecodingError::NoProofData)
        );
    }

    #[test]
    fn test_format_fixed_point() {
        assert_eq!(format_fixed_point(104_250_000, 6).unwrap(), "104.250000");
        assert_eq!(format_fixed_point(5, 2).unwrap(), "0.05");
        assert_eq!(format_fixed_point(7, 0).unwrap(), "7");
        assert!(format_fixed_point(1, 39).is_err());
    }

    #[test]
    fn test_oversized_segment() {
        let mut request = price_request("https://example.com");
        request.request_body = Some("x".repeat(usize::from(u16::MAX) + 1));
        assert_eq!(
            encode_proof(ProofLayout::Legacy, &fields(&request)),
            Err(EncodingError::SegmentTooLong {
                field: "request body",
                len: usize::from(u16::MAX) + 1
            })
        );
    }
}
