// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2024-2025 Oracle Verification Developers

//! The Nitro attestation document
//!
//! A COSE_Sign1 envelope whose payload is a CBOR map with the fields
//! `module_id`, `digest`, `timestamp`, `pcrs`, `certificate`, `cabundle`
//! and the optional `public_key`, `user_data` and `nonce`.

use super::NitroError;
use ciborium::Value;
use coset::{CborSerializable, CoseSign1};
use std::collections::BTreeMap;

/// The decoded attestation document
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[allow(missing_docs)]
pub struct AttestationDocument {
    pub module_id: String,
    pub digest: String,
    /// Milliseconds since the Unix epoch
    pub timestamp: u64,
    pub pcrs: BTreeMap<u64, Vec<u8>>,
    /// DER encoded leaf certificate
    pub certificate: Vec<u8>,
    /// DER encoded certificates, root first
    pub cabundle: Vec<Vec<u8>>,
    pub public_key: Option<Vec<u8>>,
    pub user_data: Option<Vec<u8>>,
    pub nonce: Option<Vec<u8>>,
}

/// Decode the COSE envelope and the attestation document it carries.
pub fn parse_cose_document(bytes: &[u8]) -> Result<(CoseSign1, AttestationDocument), NitroError> {
    let cose = CoseSign1::from_slice(bytes)
        .map_err(|e| NitroError::decode(format!("invalid COSE_Sign1 envelope: {e:?}")))?;
    let payload = cose
        .payload
        .as_deref()
        .ok_or_else(|| NitroError::decode("COSE_Sign1 payload missing"))?;
    let document = AttestationDocument::from_cbor(payload)?;
    Ok((cose, document))
}

fn bytes(field: &str, value: &Value) -> Result<Vec<u8>, NitroError> {
    match value {
        Value::Bytes(b) => Ok(b.clone()),
        _ => Err(NitroError::decode(format!("{field} is not a byte string"))),
    }
}

fn optional_bytes(field: &str, value: Option<&Value>) -> Result<Option<Vec<u8>>, NitroError> {
    match value {
        None | Some(Value::Null) => Ok(None),
        Some(v) => bytes(field, v).map(Some),
    }
}

impl AttestationDocument {
    /// Decode the CBOR payload
    pub fn from_cbor(payload: &[u8]) -> Result<Self, NitroError> {
        let value: Value = ciborium::from_reader(payload)
            .map_err(|e| NitroError::decode(format!("invalid attestation document: {e}")))?;
        let Value::Map(map) = value else {
            return Err(NitroError::decode("attestation document is not a map"));
        };

        let field = |name: &str| {
            map.iter()
                .find(|(k, _)| matches!(k, Value::Text(s) if s == name))
                .map(|(_, v)| v)
        };
        let required = |name: &str| {
            field(name).ok_or_else(|| NitroError::decode(format!("{name} missing")))
        };

        let module_id = match required("module_id")? {
            Value::Text(s) => s.clone(),
            _ => return Err(NitroError::decode("module_id is not a string")),
        };
        let digest = match required("digest")? {
            Value::Text(s) => s.clone(),
            _ => return Err(NitroError::decode("digest is not a string")),
        };
        let timestamp = match required("timestamp")? {
            Value::Integer(i) => u64::try_from(*i)
                .map_err(|_| NitroError::decode("timestamp out of range"))?,
            _ => return Err(NitroError::decode("timestamp is not an integer")),
        };

        let Value::Map(pcr_map) = required("pcrs")? else {
            return Err(NitroError::decode("pcrs is not a map"));
        };
        let mut pcrs = BTreeMap::new();
        for (index, value) in pcr_map {
            let index = match index {
                Value::Integer(i) => {
                    u64::try_from(*i).map_err(|_| NitroError::decode("invalid PCR index"))?
                }
                _ => return Err(NitroError::decode("PCR index is not an integer")),
            };
            pcrs.insert(index, bytes("PCR value", value)?);
        }

        let certificate = bytes("certificate", required("certificate")?)?;
        let Value::Array(bundle) = required("cabundle")? else {
            return Err(NitroError::decode("cabundle is not an array"));
        };
        let cabundle = bundle
            .iter()
            .map(|cert| bytes("cabundle entry", cert))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            module_id,
            digest,
            timestamp,
            pcrs,
            certificate,
            cabundle,
            public_key: optional_bytes("public_key", field("public_key"))?,
            user_data: optional_bytes("user_data", field("user_data"))?,
            nonce: optional_bytes("nonce", field("nonce"))?,
        })
    }

    /// Encode the document as a CBOR map
    pub fn to_cbor(&self) -> Result<Vec<u8>, NitroError> {
        let text = |s: &str| Value::Text(s.into());
        let optional = |v: &Option<Vec<u8>>| v.clone().map_or(Value::Null, Value::Bytes);
        let value = Value::Map(vec![
            (text("module_id"), text(&self.module_id)),
            (text("digest"), text(&self.digest)),
            (text("timestamp"), Value::Integer(self.timestamp.into())),
            (
                text("pcrs"),
                Value::Map(
                    self.pcrs
                        .iter()
                        .map(|(i, v)| (Value::Integer((*i).into()), Value::Bytes(v.clone())))
                        .collect(),
                ),
            ),
            (text("certificate"), Value::Bytes(self.certificate.clone())),
            (
                text("cabundle"),
                Value::Array(self.cabundle.iter().cloned().map(Value::Bytes).collect()),
            ),
            (text("public_key"), optional(&self.public_key)),
            (text("user_data"), optional(&self.user_data)),
            (text("nonce"), optional(&self.nonce)),
        ]);
        let mut out = Vec::new();
        ciborium::into_writer(&value, &mut out)
            .map_err(|e| NitroError::decode(format!("failed to encode attestation document: {e}")))?;
        Ok(out)
    }

    /// PCR register `index`, if present
    pub fn pcr(&self, index: u64) -> Option<&[u8]> {
        self.pcrs.get(&index).map(Vec::as_slice)
    }
}
