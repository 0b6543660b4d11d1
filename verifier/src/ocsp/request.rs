// Copyright (c) 2023 The NemID Verifier Developers

//! Builds the DER encoded OCSP request for a single certificate.
//!
//! ```ignore
//!     OCSPRequest ::= SEQUENCE {
//!         tbsRequest              TBSRequest }
//!
//!     TBSRequest ::= SEQUENCE {
//!         requestList             SEQUENCE OF Request }
//!
//!     Request ::= SEQUENCE {
//!         reqCert                 CertID }
//! ```
//!
//! The version, requestor name, nonce and signature are all omitted.

use super::CertId;
use crate::asn1;
use crate::certificate::Certificate;
use crate::signer::HashAlgorithm;

/// Result of building a request.
pub type Result<T> = core::result::Result<T, Error>;

/// Error building an OCSP request
#[derive(Debug, displaydoc::Display, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// Failed to encode the request: {0}
    Encoding(asn1::Error),
    /// The certificate does not name an OCSP responder
    MissingResponderUrl,
}

impl From<asn1::Error> for Error {
    fn from(src: asn1::Error) -> Self {
        Error::Encoding(src)
    }
}

/// An OCSP request asking for the status of one certificate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OcspRequest {
    der: Vec<u8>,
    url: String,
    cert_id: CertId,
}

impl OcspRequest {
    /// Build a request about `certificate`, which was issued by `issuer`.
    ///
    /// The request goes to the OCSP responder named in the authority
    /// information access extension of `certificate`. The identifying hashes
    /// are made with SHA-256.
    pub fn new(certificate: &Certificate, issuer: &Certificate) -> Result<Self> {
        let url = certificate
            .ocsp_url()
            .ok_or(Error::MissingResponderUrl)?
            .to_owned();
        let cert_id = CertId {
            hash_algorithm: HashAlgorithm::Sha256,
            issuer_name_hash: issuer.hashed_subject(),
            issuer_key_hash: issuer.hashed_public_key(),
            serial_number: certificate.raw_serial_number().to_vec(),
        };

        let request = asn1::sequence(&[&encode_cert_id(&cert_id)?])?;
        let request_list = asn1::sequence(&[&request])?;
        let tbs_request = asn1::sequence(&[&request_list])?;
        let der = asn1::sequence(&[&tbs_request])?;

        Ok(Self { der, url, cert_id })
    }

    /// The DER encoding, ready to be posted to the responder.
    pub fn der(&self) -> &[u8] {
        &self.der
    }

    /// The URL of the OCSP responder.
    pub fn url(&self) -> &str {
        &self.url
    }

    /// The certificate the request asks about.
    pub fn cert_id(&self) -> &CertId {
        &self.cert_id
    }

    /// Redirects the request to a local responder.
    #[cfg(test)]
    pub(crate) fn with_url(self, url: &str) -> Self {
        Self {
            url: url.to_owned(),
            ..self
        }
    }
}

fn encode_cert_id(cert_id: &CertId) -> asn1::Result<Vec<u8>> {
    let algorithm = asn1::sequence(&[&asn1::oid(&cert_id.hash_algorithm.oid())?, &asn1::null()?])?;
    asn1::sequence(&[
        &algorithm,
        &asn1::octet_string(&cert_id.issuer_name_hash)?,
        &asn1::octet_string(&cert_id.issuer_key_hash)?,
        &asn1::integer(&cert_id.serial_number)?,
    ])
}

#[cfg(test)]
mod test {
    use super::*;
    use assert_matches::assert_matches;

    const ROOT: &[u8] = include_bytes!("../../tests/data/root.der");
    const INTERMEDIATE: &[u8] = include_bytes!("../../tests/data/intermediate.der");
    const LEAF: &[u8] = include_bytes!("../../tests/data/leaf.der");

    fn certificate(der: &[u8]) -> Certificate {
        Certificate::from_der(der).expect("Failed decoding certificate")
    }

    #[test]
    fn request_for_leaf() {
        let leaf = certificate(LEAF);
        let intermediate = certificate(INTERMEDIATE);

        let request = OcspRequest::new(&leaf, &intermediate).expect("Failed building request");

        let expected = hex::decode(concat!(
            "3061305f305d305b3059",
            "300d06096086480165030402010500",
            "04204df13f909a02eb818ec1c353de918df9a4fb4c22e1300351a86682a59cd1ac51",
            "042076d54e8d9dbae157aee63c357683ba37bdc3d108b89cf43f79325fd2136cefe0",
            "02045f9c324b",
        ))
        .expect("Invalid hex");
        assert_eq!(request.der(), expected.as_slice());
        assert_eq!(request.url(), "http://ocsp.systemtest.example/responder");
    }

    #[test]
    fn cert_id_identifies_leaf_and_issuer() {
        let leaf = certificate(LEAF);
        let intermediate = certificate(INTERMEDIATE);

        let request = OcspRequest::new(&leaf, &intermediate).expect("Failed building request");

        let cert_id = request.cert_id();
        assert_eq!(cert_id.hash_algorithm, HashAlgorithm::Sha256);
        assert_eq!(cert_id.issuer_name_hash, intermediate.hashed_subject());
        assert_eq!(cert_id.issuer_key_hash, intermediate.hashed_public_key());
        assert_eq!(cert_id.serial_number, [0x5F, 0x9C, 0x32, 0x4B]);
    }

    #[test]
    fn certificate_without_responder() {
        let intermediate = certificate(INTERMEDIATE);
        let root = certificate(ROOT);

        assert_matches!(
            OcspRequest::new(&intermediate, &root),
            Err(Error::MissingResponderUrl)
        );
    }

    #[test]
    fn request_differs_by_issuer() {
        let leaf = certificate(LEAF);

        let from_intermediate =
            OcspRequest::new(&leaf, &certificate(INTERMEDIATE)).expect("Failed building request");
        let from_root =
            OcspRequest::new(&leaf, &certificate(ROOT)).expect("Failed building request");

        assert_ne!(from_intermediate.der(), from_root.der());
        assert_eq!(from_intermediate.cert_id().serial_number, from_root.cert_id().serial_number);
    }
}
