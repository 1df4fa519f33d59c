// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2024-2025 Oracle Verification Developers

//! AWS Nitro Enclaves report verification
//!
//! 1. Decode the COSE_Sign1 envelope and the CBOR attestation document.
//! 2. Verify the certificate chain from the pinned root to the leaf.
//! 3. Verify the COSE signature with the leaf key.
//! 4. Check the nonce and the PCR values against the trust policy.

pub mod chain;
pub mod document;

use crate::policy::{Pcr, TrustPolicy, PCR_COUNT, PCR_SIZE};
use std::time::{SystemTime, UNIX_EPOCH};
use thiserror::Error;
use tracing::{debug, error, warn};

pub use document::{parse_cose_document, AttestationDocument};

/// The only digest Nitro attestation documents use
pub const DOCUMENT_DIGEST: &str = "SHA384";

/// Nitro verification errors
#[derive(Error, Debug)]
#[allow(missing_docs)]
pub enum NitroError {
    #[error("failed to decode Nitro report: {0}")]
    Decode(String),
    #[error("trust policy violation: {0}")]
    PolicyViolation(String),
}

impl NitroError {
    /// Create a new decode error
    pub fn decode(reason: impl Into<String>) -> Self {
        Self::Decode(reason.into())
    }

    /// Create a new policy violation error
    pub fn policy_violation(reason: impl Into<String>) -> Self {
        Self::PolicyViolation(reason.into())
    }
}

/// The verified content of a Nitro attestation document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NitroReport {
    /// Enclave image ID
    pub module_id: String,
    /// Milliseconds since the Unix epoch
    pub timestamp: u64,
    /// PCR0, PCR1 and PCR2; `None` for a wildcard slot without a well-formed register
    pub pcrs: [Option<Pcr>; PCR_COUNT],
    /// Data the enclave bound to the document
    pub user_data: Vec<u8>,
}

/// Verifies Nitro attestation documents against a pinned root certificate
#[derive(Debug, Clone)]
pub struct NitroVerifier {
    root_der: Vec<u8>,
    clock: fn() -> SystemTime,
}

impl NitroVerifier {
    /// Create a verifier pinning the PEM or DER encoded `root_certificate`
    pub fn new(root_certificate: &[u8]) -> Result<Self, NitroError> {
        Ok(Self {
            root_der: chain::root_certificate_der(root_certificate)?,
            clock: SystemTime::now,
        })
    }

    /// Use `clock` instead of the system time for certificate validity
    pub fn with_clock(mut self, clock: fn() -> SystemTime) -> Self {
        self.clock = clock;
        self
    }

    /// Verify `report` and apply `policy`.
    ///
    /// `nonce` is the nonce the client submitted with the record.
    pub fn verify(
        &self,
        report: &[u8],
        nonce: Option<&str>,
        policy: &TrustPolicy,
    ) -> Result<NitroReport, NitroError> {
        let (cose, doc) = parse_cose_document(report)?;
        if doc.digest != DOCUMENT_DIGEST {
            error!(digest = %doc.digest, "unsupported Nitro document digest");
            return Err(NitroError::decode(format!(
                "unsupported document digest {:?}",
                doc.digest
            )));
        }

        let now = (self.clock)()
            .duration_since(UNIX_EPOCH)
            .map_err(|e| NitroError::decode(format!("invalid verification time: {e}")))?;
        let leaf_key = chain::verify_chain(&self.root_der, &doc.cabundle, &doc.certificate, now)?;
        chain::verify_cose_signature(&cose, &leaf_key)?;
        debug!(module_id = doc.module_id, "Nitro document signature verified");

        check_nonce(&doc, nonce, policy)?;
        let pcrs = check_pcrs(&doc, policy)?;

        Ok(NitroReport {
            module_id: doc.module_id,
            timestamp: doc.timestamp,
            pcrs,
            user_data: doc.user_data.unwrap_or_default(),
        })
    }
}

fn check_nonce(
    doc: &AttestationDocument,
    nonce: Option<&str>,
    policy: &TrustPolicy,
) -> Result<(), NitroError> {
    match (&doc.nonce, nonce) {
        (Some(embedded), Some(expected)) if embedded.as_slice() == expected.as_bytes() => {
            debug!("Nitro nonce matches");
            Ok(())
        }
        (Some(embedded), expected) => {
            error!(
                "Nitro nonce mismatch, expected {:?}, got {}",
                expected,
                hex::encode(embedded)
            );
            Err(NitroError::policy_violation("nonce mismatch"))
        }
        (None, _) if policy.allow_nonceless_reports => {
            warn!("Accepting Nitro report without nonce");
            Ok(())
        }
        (None, _) => {
            error!("Nitro report has no nonce");
            Err(NitroError::policy_violation("report has no nonce"))
        }
    }
}

fn check_pcrs(
    doc: &AttestationDocument,
    policy: &TrustPolicy,
) -> Result<[Option<Pcr>; PCR_COUNT], NitroError> {
    let mut pcrs = [None; PCR_COUNT];
    for (index, (pcr, target)) in pcrs.iter_mut().zip(&policy.target_pcr_values).enumerate() {
        let value = doc.pcr(index as u64);
        *pcr = value.and_then(|v| Pcr::try_from(v).ok());

        let Some(target) = target else {
            debug!("PCR{index} is not checked");
            continue;
        };
        let value = value.ok_or_else(|| NitroError::decode(format!("PCR{index} missing")))?;
        let actual = pcr.as_ref().ok_or_else(|| {
            NitroError::decode(format!(
                "PCR{index} has {} bytes, expected {PCR_SIZE}",
                value.len()
            ))
        })?;
        if actual != target {
            error!(
                "PCR{index} mismatch, expected {}, got {}",
                hex::encode(target),
                hex::encode(actual)
            );
            return Err(NitroError::policy_violation(format!("PCR{index} mismatch")));
        }
        debug!("PCR{index} matches policy");
    }
    Ok(pcrs)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::policy::PcrIndex;
    use coset::{iana, CborSerializable, CoseSign1Builder, HeaderBuilder};
    use p384::ecdsa::{signature::Signer, DerSignature, Signature, SigningKey};
    use std::{str::FromStr, time::Duration};
    use tracing_test::traced_test;
    use x509_cert::{
        builder::{Builder, CertificateBuilder, Profile},
        der::Encode,
        name::Name,
        serial_number::SerialNumber,
        spki::SubjectPublicKeyInfoOwned,
        time::Validity,
    };

    pub(crate) const PCR0: [u8; PCR_SIZE] = [0x10; PCR_SIZE];
    pub(crate) const PCR1: [u8; PCR_SIZE] = [0x11; PCR_SIZE];
    pub(crate) const PCR2: [u8; PCR_SIZE] = [0x12; PCR_SIZE];

    /// A root, an intermediate and a leaf certificate with their keys
    pub(crate) struct TestPki {
        pub(crate) root_der: Vec<u8>,
        pub(crate) intermediate_der: Vec<u8>,
        pub(crate) leaf_der: Vec<u8>,
        pub(crate) leaf_key: SigningKey,
    }

    fn name(cn: &str) -> Name {
        Name::from_str(&format!("CN={cn}")).unwrap()
    }

    fn certificate(profile: Profile, subject: &str, key: &SigningKey, issuer: &SigningKey) -> Vec<u8> {
        let builder = CertificateBuilder::new(
            profile,
            SerialNumber::new(&[1]).unwrap(),
            Validity::from_now(Duration::from_secs(60 * 60)).unwrap(),
            name(subject),
            SubjectPublicKeyInfoOwned::from_key(*key.verifying_key()).unwrap(),
            issuer,
        )
        .unwrap();
        builder.build::<DerSignature>().unwrap().to_der().unwrap()
    }

    impl TestPki {
        pub(crate) fn new() -> Self {
            let root_key = SigningKey::from_slice(&[1; 48]).unwrap();
            let intermediate_key = SigningKey::from_slice(&[2; 48]).unwrap();
            let leaf_key = SigningKey::from_slice(&[3; 48]).unwrap();

            let root_der = certificate(Profile::Root, "root", &root_key, &root_key);
            let intermediate_der = certificate(
                Profile::SubCA {
                    issuer: name("root"),
                    path_len_constraint: None,
                },
                "intermediate",
                &intermediate_key,
                &root_key,
            );
            let leaf_der = certificate(
                Profile::Leaf {
                    issuer: name("intermediate"),
                    enable_key_agreement: false,
                    enable_key_encipherment: false,
                },
                "leaf",
                &leaf_key,
                &intermediate_key,
            );
            Self {
                root_der,
                intermediate_der,
                leaf_der,
                leaf_key,
            }
        }

        pub(crate) fn document(&self, user_data: &[u8], nonce: Option<&str>) -> AttestationDocument {
            AttestationDocument {
                module_id: "i-0123456789abcdef0-enc0123456789abcdef".into(),
                digest: "SHA384".into(),
                timestamp: 1_718_000_000_000,
                pcrs: [(0, PCR0.to_vec()), (1, PCR1.to_vec()), (2, PCR2.to_vec()), (3, vec![0; 48])]
                    .into_iter()
                    .collect(),
                certificate: self.leaf_der.clone(),
                cabundle: vec![self.root_der.clone(), self.intermediate_der.clone()],
                public_key: None,
                user_data: Some(user_data.to_vec()),
                nonce: nonce.map(|n| n.as_bytes().to_vec()),
            }
        }

        pub(crate) fn sign(&self, doc: &AttestationDocument) -> Vec<u8> {
            self.sign_with(doc, iana::Algorithm::ES384)
        }

        fn sign_with(&self, doc: &AttestationDocument, alg: iana::Algorithm) -> Vec<u8> {
            let protected = HeaderBuilder::new().algorithm(alg).build();
            CoseSign1Builder::new()
                .protected(protected)
                .payload(doc.to_cbor().unwrap())
                .create_signature(&[], |msg| {
                    let signature: Signature = self.leaf_key.sign(msg);
                    signature.to_bytes().to_vec()
                })
                .build()
                .to_vec()
                .unwrap()
        }

        pub(crate) fn report(&self, user_data: &[u8], nonce: Option<&str>) -> Vec<u8> {
            self.sign(&self.document(user_data, nonce))
        }

        pub(crate) fn verifier(&self) -> NitroVerifier {
            NitroVerifier::new(&self.root_der).unwrap()
        }
    }

    pub(crate) fn policy() -> TrustPolicy {
        TrustPolicy::new([0; 32])
            .with_pcr(PcrIndex::Pcr0, PCR0)
            .with_pcr(PcrIndex::Pcr1, PCR1)
            .with_pcr(PcrIndex::Pcr2, PCR2)
    }

    #[test]
    fn test_verify_report() {
        let pki = TestPki::new();
        let report = pki.report(&[7; 64], Some("nonce-1"));
        let verified = pki.verifier().verify(&report, Some("nonce-1"), &policy()).unwrap();
        assert_eq!(verified.pcrs, [Some(PCR0), Some(PCR1), Some(PCR2)]);
        assert_eq!(verified.user_data, vec![7; 64]);
    }

    #[test]
    fn test_pcr_wildcard() {
        let pki = TestPki::new();
        let report = pki.report(&[7; 16], Some("n"));
        let mut wildcard = policy();
        wildcard.target_pcr_values[1] = None;
        assert!(pki.verifier().verify(&report, Some("n"), &wildcard).is_ok());

        let mismatched = wildcard.with_pcr(PcrIndex::Pcr2, [0xff; PCR_SIZE]);
        let err = pki.verifier().verify(&report, Some("n"), &mismatched).unwrap_err();
        assert_eq!(err.to_string(), "trust policy violation: PCR2 mismatch");
    }

    #[test]
    fn test_wildcard_slot_ignores_malformed_register() {
        let pki = TestPki::new();
        let mut wildcard = policy();
        wildcard.target_pcr_values[1] = None;

        let mut doc = pki.document(&[7; 16], Some("n"));
        doc.pcrs.insert(1, vec![0x11; 32]);
        let verified = pki
            .verifier()
            .verify(&pki.sign(&doc), Some("n"), &wildcard)
            .unwrap();
        assert_eq!(verified.pcrs, [Some(PCR0), None, Some(PCR2)]);

        doc.pcrs.remove(&1);
        assert!(pki
            .verifier()
            .verify(&pki.sign(&doc), Some("n"), &wildcard)
            .is_ok());

        // a configured slot still requires a well-formed register
        assert!(matches!(
            pki.verifier().verify(&pki.sign(&doc), Some("n"), &policy()),
            Err(NitroError::Decode(msg)) if msg == "PCR1 missing"
        ));
        doc.pcrs.insert(1, vec![0x11; 32]);
        assert!(matches!(
            pki.verifier().verify(&pki.sign(&doc), Some("n"), &policy()),
            Err(NitroError::Decode(msg)) if msg == "PCR1 has 32 bytes, expected 48"
        ));
    }

    #[traced_test]
    #[test]
    fn test_nonce() {
        let pki = TestPki::new();
        let verifier = pki.verifier();

        let with_nonce = pki.report(&[7; 16], Some("abc"));
        assert!(matches!(
            verifier.verify(&with_nonce, Some("abd"), &policy()),
            Err(NitroError::PolicyViolation(msg)) if msg == "nonce mismatch"
        ));
        assert!(verifier.verify(&with_nonce, None, &policy()).is_err());

        let without_nonce = pki.report(&[7; 16], None);
        assert!(verifier.verify(&without_nonce, Some("abc"), &policy()).is_err());
        let mut lenient = policy();
        lenient.allow_nonceless_reports = true;
        assert!(verifier.verify(&without_nonce, Some("abc"), &lenient).is_ok());
        assert!(logs_contain("Accepting Nitro report without nonce"));
    }

    #[test]
    fn test_foreign_root_is_rejected() {
        let pki = TestPki::new();
        let other = SigningKey::from_slice(&[9; 48]).unwrap();
        let other_root = certificate(Profile::Root, "root", &other, &other);
        let verifier = NitroVerifier::new(&other_root).unwrap();
        let report = pki.report(&[7; 16], Some("n"));
        assert!(matches!(
            verifier.verify(&report, Some("n"), &policy()),
            Err(NitroError::PolicyViolation(msg)) if msg.contains("pinned root")
        ));
    }

    #[test]
    fn test_broken_chain_is_rejected() {
        let pki = TestPki::new();
        let mut doc = pki.document(&[7; 16], Some("n"));
        // leaf directly under the root, but it was signed by the intermediate
        doc.cabundle.truncate(1);
        let report = pki.sign(&doc);
        assert!(matches!(
            pki.verifier().verify(&report, Some("n"), &policy()),
            Err(NitroError::PolicyViolation(msg)) if msg.contains("not signed by its issuer")
        ));
    }

    #[test]
    fn test_expired_certificate_is_rejected() {
        let pki = TestPki::new();
        let report = pki.report(&[7; 16], Some("n"));
        let verifier = pki
            .verifier()
            .with_clock(|| SystemTime::now() + Duration::from_secs(60 * 60 * 24));
        assert!(matches!(
            verifier.verify(&report, Some("n"), &policy()),
            Err(NitroError::PolicyViolation(msg)) if msg.contains("not valid at verification time")
        ));
    }

    #[test]
    fn test_tampered_payload_is_rejected() {
        let pki = TestPki::new();
        let report = pki.report(&[7; 16], Some("n"));
        let mut cose = coset::CoseSign1::from_slice(&report).unwrap();
        let mut doc = AttestationDocument::from_cbor(cose.payload.as_deref().unwrap()).unwrap();
        doc.user_data = Some(vec![8; 16]);
        cose.payload = Some(doc.to_cbor().unwrap());
        let tampered = cose.to_vec().unwrap();
        assert!(matches!(
            pki.verifier().verify(&tampered, Some("n"), &policy()),
            Err(NitroError::PolicyViolation(msg)) if msg == "invalid COSE signature"
        ));
    }

    #[test]
    fn test_missing_pcr() {
        let pki = TestPki::new();
        let mut doc = pki.document(&[7; 16], Some("n"));
        doc.pcrs.remove(&1);
        let report = pki.sign(&doc);
        assert!(matches!(
            pki.verifier().verify(&report, Some("n"), &policy()),
            Err(NitroError::Decode(msg)) if msg == "PCR1 missing"
        ));
    }

    #[test]
    fn test_leaf_cannot_issue_certificates() {
        let pki = TestPki::new();
        let key = SigningKey::from_slice(&[4; 48]).unwrap();
        let below_leaf = certificate(
            Profile::Leaf {
                issuer: name("leaf"),
                enable_key_agreement: false,
                enable_key_encipherment: false,
            },
            "below-leaf",
            &key,
            &pki.leaf_key,
        );
        let mut doc = pki.document(&[7; 16], Some("n"));
        doc.cabundle.push(pki.leaf_der.clone());
        doc.certificate = below_leaf;
        assert!(matches!(
            pki.verifier().verify(&pki.sign(&doc), Some("n"), &policy()),
            Err(NitroError::PolicyViolation(msg)) if msg == "certificate 2 of the chain is not a CA"
        ));
    }

    #[test]
    fn test_document_digest_and_cose_algorithm() {
        let pki = TestPki::new();
        let mut doc = pki.document(&[7; 16], Some("n"));
        let es256 = pki.sign_with(&doc, iana::Algorithm::ES256);
        assert!(matches!(
            pki.verifier().verify(&es256, Some("n"), &policy()),
            Err(NitroError::PolicyViolation(msg)) if msg == "unsupported COSE algorithm"
        ));

        doc.digest = "SHA256".into();
        assert!(matches!(
            pki.verifier().verify(&pki.sign(&doc), Some("n"), &policy()),
            Err(NitroError::Decode(msg)) if msg.contains("unsupported document digest")
        ));
    }

    #[test]
    fn test_pem_root_certificate() {
        use x509_cert::der::{pem::LineEnding, Decode, EncodePem};
        let pki = TestPki::new();
        let pem = x509_cert::Certificate::from_der(&pki.root_der)
            .unwrap()
            .to_pem(LineEnding::LF)
            .unwrap();
        let verifier = NitroVerifier::new(pem.as_bytes()).unwrap();
        let report = pki.report(&[7; 16], Some("n"));
        assert!(verifier.verify(&report, Some("n"), &policy()).is_ok());
    }
}
