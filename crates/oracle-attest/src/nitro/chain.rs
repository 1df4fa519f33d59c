// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2024-2025 Oracle Verification Developers

//! Certificate chain and COSE signature checks

use super::NitroError;
use const_oid::db::{rfc5912::ECDSA_WITH_SHA_384, rfc5912::ID_EC_PUBLIC_KEY};
use coset::{iana, CoseSign1, RegisteredLabelWithPrivate};
use p384::ecdsa::{signature::Verifier, Signature, VerifyingKey};
use std::time::Duration;
use tracing::{debug, error};
use x509_cert::{
    der::{Decode, DecodePem, Encode},
    ext::pkix::BasicConstraints,
    Certificate,
};

/// Normalize a PEM or DER root certificate to DER
pub fn root_certificate_der(bytes: &[u8]) -> Result<Vec<u8>, NitroError> {
    let cert = if bytes.starts_with(b"-----BEGIN") {
        Certificate::from_pem(bytes)
    } else {
        Certificate::from_der(bytes)
    }
    .map_err(|e| NitroError::decode(format!("invalid root certificate: {e}")))?;
    cert.to_der()
        .map_err(|e| NitroError::decode(format!("invalid root certificate: {e}")))
}

fn verifying_key(cert: &Certificate) -> Result<VerifyingKey, NitroError> {
    let spki = &cert.tbs_certificate.subject_public_key_info;
    spki.algorithm
        .assert_algorithm_oid(ID_EC_PUBLIC_KEY)
        .map_err(|e| NitroError::policy_violation(format!("unsupported certificate key: {e}")))?;
    let key = spki
        .subject_public_key
        .as_bytes()
        .ok_or_else(|| NitroError::decode("certificate public key is not byte aligned"))?;
    VerifyingKey::from_sec1_bytes(key)
        .map_err(|e| NitroError::policy_violation(format!("invalid certificate key: {e}")))
}

fn check_validity(cert: &Certificate, index: usize, now: Duration) -> Result<(), NitroError> {
    let validity = &cert.tbs_certificate.validity;
    let not_before = validity.not_before.to_unix_duration();
    let not_after = validity.not_after.to_unix_duration();
    if now < not_before || now > not_after {
        error!(
            index,
            now = now.as_secs(),
            not_before = not_before.as_secs(),
            not_after = not_after.as_secs(),
            "certificate is not valid at verification time"
        );
        return Err(NitroError::policy_violation(format!(
            "certificate {index} of the chain is not valid at verification time"
        )));
    }
    Ok(())
}

fn check_is_ca(cert: &Certificate, index: usize) -> Result<(), NitroError> {
    let constraints = cert
        .tbs_certificate
        .get::<BasicConstraints>()
        .map_err(|e| NitroError::decode(format!("certificate {index}: {e}")))?;
    match constraints {
        Some((_, BasicConstraints { ca: true, .. })) => Ok(()),
        _ => {
            error!(index, "issuing certificate is not a CA");
            Err(NitroError::policy_violation(format!(
                "certificate {index} of the chain is not a CA"
            )))
        }
    }
}

fn check_signed_by(
    cert: &Certificate,
    index: usize,
    issuer_key: &VerifyingKey,
) -> Result<(), NitroError> {
    if cert.signature_algorithm.oid != ECDSA_WITH_SHA_384 {
        return Err(NitroError::policy_violation(format!(
            "certificate {index} is not signed with ECDSA-SHA384"
        )));
    }
    let tbs = cert
        .tbs_certificate
        .to_der()
        .map_err(|e| NitroError::decode(format!("certificate {index}: {e}")))?;
    let signature = cert
        .signature
        .as_bytes()
        .ok_or_else(|| NitroError::decode(format!("certificate {index}: signature not byte aligned")))
        .and_then(|der| {
            Signature::from_der(der)
                .map_err(|e| NitroError::decode(format!("certificate {index}: {e}")))
        })?;
    issuer_key.verify(&tbs, &signature).map_err(|_| {
        error!(index, "certificate signature does not verify against its issuer");
        NitroError::policy_violation(format!("certificate {index} is not signed by its issuer"))
    })
}

/// Verify `cabundle[0] .. cabundle[n-1], leaf` and return the leaf key.
///
/// `cabundle[0]` must be byte-identical to `root_der`. Every following
/// certificate must be valid at `now` and signed by its predecessor, which
/// must be a CA.
pub fn verify_chain(
    root_der: &[u8],
    cabundle: &[Vec<u8>],
    leaf: &[u8],
    now: Duration,
) -> Result<VerifyingKey, NitroError> {
    let Some(root) = cabundle.first() else {
        return Err(NitroError::decode("cabundle is empty"));
    };
    if root.as_slice() != root_der {
        error!("cabundle does not start with the pinned root certificate");
        return Err(NitroError::policy_violation(
            "certificate chain does not start at the pinned root",
        ));
    }

    let mut issuer = Certificate::from_der(root)
        .map_err(|e| NitroError::decode(format!("certificate 0: {e}")))?;
    for (index, der) in cabundle.iter().map(Vec::as_slice).chain([leaf]).enumerate().skip(1) {
        let cert = Certificate::from_der(der)
            .map_err(|e| NitroError::decode(format!("certificate {index}: {e}")))?;
        check_validity(&cert, index, now)?;
        check_is_ca(&issuer, index - 1)?;
        check_signed_by(&cert, index, &verifying_key(&issuer)?)?;
        issuer = cert;
    }
    debug!(len = cabundle.len() + 1, "certificate chain verified");

    verifying_key(&issuer)
}

/// Verify the ES384 signature of the COSE envelope
pub fn verify_cose_signature(cose: &CoseSign1, key: &VerifyingKey) -> Result<(), NitroError> {
    let alg = &cose.protected.header.alg;
    if *alg != Some(RegisteredLabelWithPrivate::Assigned(iana::Algorithm::ES384)) {
        error!(?alg, "COSE envelope is not signed with ES384");
        return Err(NitroError::policy_violation("unsupported COSE algorithm"));
    }
    cose.verify_signature(&[], |signature, msg| {
        let signature = Signature::try_from(signature)?;
        key.verify(msg, &signature)
    })
    .map_err(|_| {
        error!("COSE signature does not verify against the leaf certificate");
        NitroError::policy_violation("invalid COSE signature")
    })
}
