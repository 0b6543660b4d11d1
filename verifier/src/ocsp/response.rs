// Copyright (c) 2023 The NemID Verifier Developers

//! Parsing of DER encoded OCSP responses.
//!
//! ```ignore
//!     OCSPResponse ::= SEQUENCE {
//!         responseStatus         OCSPResponseStatus,
//!         responseBytes          [0] EXPLICIT ResponseBytes OPTIONAL }
//!
//!     ResponseBytes ::= SEQUENCE {
//!         responseType   OBJECT IDENTIFIER,
//!         response       OCTET STRING }
//!
//!     BasicOCSPResponse ::= SEQUENCE {
//!         tbsResponseData      ResponseData,
//!         signatureAlgorithm   AlgorithmIdentifier,
//!         signature            BIT STRING,
//!         certs            [0] EXPLICIT SEQUENCE OF Certificate OPTIONAL }
//!
//!     ResponseData ::= SEQUENCE {
//!         version              [0] EXPLICIT Version DEFAULT v1,
//!         responderID              ResponderID,
//!         producedAt               GeneralizedTime,
//!         responses                SEQUENCE OF SingleResponse,
//!         responseExtensions   [1] EXPLICIT Extensions OPTIONAL }
//!
//!     SingleResponse ::= SEQUENCE {
//!         certID                       CertID,
//!         certStatus                   CertStatus,
//!         thisUpdate                   GeneralizedTime,
//!         nextUpdate         [0]       EXPLICIT GeneralizedTime OPTIONAL,
//!         singleExtensions   [1]       EXPLICIT Extensions OPTIONAL }
//! ```
//!
//! Fields that are not used to verify the response, like the responder ID and
//! the extensions, are skipped. Only the first `SingleResponse` is decoded,
//! later entries are stepped over. Bytes after the last field of any
//! structure are rejected.

use super::CertId;
use crate::asn1::{self, tag};
use crate::certificate::{self, Certificate};
use crate::signer::{HashAlgorithm, SignatureAlgorithm};
use const_oid::ObjectIdentifier;
use der::DateTime;

const OID_PKIX_OCSP_BASIC: ObjectIdentifier =
    ObjectIdentifier::new_unwrap("1.3.6.1.5.5.7.48.1.1");

/// Result of parsing a response.
pub type Result<T> = core::result::Result<T, Error>;

/// Error parsing an OCSP response
#[derive(Debug, displaydoc::Display, Clone, PartialEq, Eq)]
pub enum Error {
    /// Failed to parse the OCSP response: {0}
    FailedToParseResponse(asn1::Error),
    /// Unknown OCSP response status {0}
    UnknownResponseStatus(i64),
    /// The response type is not id-pkix-ocsp-basic
    ResponseTypeWasNotBasic,
    /// Unknown signature algorithm {0}
    UnknownSignatureAlgorithm(ObjectIdentifier),
    /// Unknown hash algorithm {0} in the certificate ID
    UnknownHashAlgorithm(ObjectIdentifier),
    /// Unknown certificate status with tag {0:#04x}
    UnknownCertStatus(u8),
    /// The single response does not have a next update time
    NextUpdateDateWasNotPresent,
    /// Failed to decode the embedded responder certificate: {0}
    EmbeddedCertificate(certificate::Error),
}

impl From<asn1::Error> for Error {
    fn from(src: asn1::Error) -> Self {
        Error::FailedToParseResponse(src)
    }
}

/// Processing status of the request, reported by the responder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResponseStatus {
    /// The response has valid confirmations
    Successful,
    /// Illegal confirmation request
    MalformedRequest,
    /// Internal error in issuer
    InternalError,
    /// Try again later
    TryLater,
    /// Must sign the request
    SigRequired,
    /// Request unauthorized
    Unauthorized,
}

impl TryFrom<i64> for ResponseStatus {
    type Error = Error;

    fn try_from(value: i64) -> Result<Self> {
        match value {
            0 => Ok(ResponseStatus::Successful),
            1 => Ok(ResponseStatus::MalformedRequest),
            2 => Ok(ResponseStatus::InternalError),
            3 => Ok(ResponseStatus::TryLater),
            5 => Ok(ResponseStatus::SigRequired),
            6 => Ok(ResponseStatus::Unauthorized),
            other => Err(Error::UnknownResponseStatus(other)),
        }
    }
}

/// Revocation status of a certificate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CertStatus {
    /// Not revoked
    Good,
    /// Revoked, permanently or temporarily
    Revoked,
    /// The responder does not know about the certificate
    Unknown,
}

/// An OCSP response as sent by the responder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OcspResponse {
    /// Whether the responder could process the request
    pub status: ResponseStatus,
    /// The signed response, absent unless `status` is successful
    pub basic_response: Option<BasicOcspResponse>,
}

impl OcspResponse {
    /// Parse a DER encoded OCSP response.
    ///
    /// A response with an unsuccessful status and no response bytes parses
    /// fine; it is up to the caller to reject it.
    pub fn from_der(der: &[u8]) -> Result<Self> {
        let (response, rest) = asn1::read_sequence(der)?;
        asn1::expect_end(rest)?;
        let (status, rest) = asn1::read_enumerated(response)?;
        let status = ResponseStatus::try_from(status)?;

        let (response_bytes, rest) = asn1::read_optional_tagged(rest, tag::explicit(0))?;
        asn1::expect_end(rest)?;
        let basic_response = response_bytes
            .map(BasicOcspResponse::from_response_bytes)
            .transpose()?;

        Ok(Self {
            status,
            basic_response,
        })
    }
}

/// The signed part of a response of type id-pkix-ocsp-basic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BasicOcspResponse {
    /// The data covered by `signature`
    pub tbs_response_data: ResponseData,
    /// The algorithm used to sign `tbs_response_data`
    pub signature_algorithm: SignatureAlgorithm,
    /// The signature, without the BIT STRING unused bits octet
    pub signature: Vec<u8>,
    /// The first certificate embedded by the responder, normally the one that
    /// signed the response
    pub certificate: Option<Certificate>,
}

impl BasicOcspResponse {
    /// Parse the `[0]` contents of an OCSP response, which wrap the
    /// `ResponseBytes` sequence.
    fn from_response_bytes(explicit: &[u8]) -> Result<Self> {
        let (response_bytes, rest) = asn1::read_sequence(explicit)?;
        asn1::expect_end(rest)?;
        let (response_type, rest) = asn1::read_oid(response_bytes)?;
        if response_type != OID_PKIX_OCSP_BASIC {
            return Err(Error::ResponseTypeWasNotBasic);
        }
        let (response, rest) = asn1::read_octet_string(rest)?;
        asn1::expect_end(rest)?;
        Self::from_der(response)
    }

    /// Parse a DER encoded `BasicOCSPResponse`.
    pub fn from_der(der: &[u8]) -> Result<Self> {
        let (basic, rest) = asn1::read_sequence(der)?;
        asn1::expect_end(rest)?;

        let (tbs, rest) = asn1::read_element(basic)?;
        if tbs.tag != tag::SEQUENCE {
            return Err(asn1::Error::UnexpectedTag {
                expected: tag::SEQUENCE,
                actual: tbs.tag,
            }
            .into());
        }
        let tbs_response_data = ResponseData::parse(tbs.encoded, tbs.contents)?;

        let (algorithm, rest) = asn1::read_sequence(rest)?;
        let algorithm = parse_algorithm(algorithm)?;
        let signature_algorithm =
            SignatureAlgorithm::try_from(algorithm).map_err(Error::UnknownSignatureAlgorithm)?;

        let (signature, rest) = asn1::read_bit_string(rest)?;

        let (certs, rest) = asn1::read_optional_tagged(rest, tag::explicit(0))?;
        asn1::expect_end(rest)?;
        let certificate = match certs {
            Some(certs) => {
                let (certs, rest) = asn1::read_sequence(certs)?;
                asn1::expect_end(rest)?;
                if certs.is_empty() {
                    None
                } else {
                    let (first, others) = asn1::read_element(certs)?;
                    asn1::skip_elements(others)?;
                    Some(
                        Certificate::from_der(first.encoded)
                            .map_err(Error::EmbeddedCertificate)?,
                    )
                }
            }
            None => None,
        };

        Ok(Self {
            tbs_response_data,
            signature_algorithm,
            signature: signature.to_vec(),
            certificate,
        })
    }
}

/// The signed content of a basic response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseData {
    /// The complete DER encoding, which is what the signature covers
    pub der: Vec<u8>,
    /// The first entry of the responses list, absent when the list is empty
    pub single_response: Option<SingleResponse>,
}

impl ResponseData {
    fn parse(encoded: &[u8], contents: &[u8]) -> Result<Self> {
        let (_version, rest) = asn1::read_optional_tagged(contents, tag::explicit(0))?;
        let (_responder_id, rest) = asn1::read_element(rest)?;
        let (_produced_at, rest) = asn1::read_tagged(rest, tag::GENERALIZED_TIME)?;
        let (list, rest) = asn1::read_sequence(rest)?;
        let (_extensions, rest) = asn1::read_optional_tagged(rest, tag::explicit(1))?;
        asn1::expect_end(rest)?;

        let single_response = if list.is_empty() {
            None
        } else {
            let (single, others) = asn1::read_sequence(list)?;
            asn1::skip_elements(others)?;
            Some(SingleResponse::parse(single)?)
        };

        Ok(Self {
            der: encoded.to_vec(),
            single_response,
        })
    }
}

/// The status of one certificate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SingleResponse {
    /// The certificate this status is about
    pub cert_id: CertId,
    /// The revocation status
    pub cert_status: CertStatus,
    /// When the status was known to be correct
    pub this_update: DateTime,
    /// When newer status information will be available
    pub next_update: DateTime,
}

impl SingleResponse {
    fn parse(contents: &[u8]) -> Result<Self> {
        let (cert_id, rest) = asn1::read_sequence(contents)?;
        let cert_id = parse_cert_id(cert_id)?;

        let (status, rest) = asn1::read_element(rest)?;
        let cert_status = match tag::context_number(status.tag) {
            Some(0) => CertStatus::Good,
            Some(1) => CertStatus::Revoked,
            Some(2) => CertStatus::Unknown,
            _ => return Err(Error::UnknownCertStatus(status.tag)),
        };

        let (this_update, rest) = asn1::read_generalized_time(rest)?;
        let (next_update, rest) = asn1::read_optional_tagged(rest, tag::explicit(0))?;
        let (_extensions, rest) = asn1::read_optional_tagged(rest, tag::explicit(1))?;
        asn1::expect_end(rest)?;
        let next_update = next_update.ok_or(Error::NextUpdateDateWasNotPresent)?;
        let (next_update, rest) = asn1::read_generalized_time(next_update)?;
        asn1::expect_end(rest)?;

        Ok(Self {
            cert_id,
            cert_status,
            this_update,
            next_update,
        })
    }
}

/// The OID of an `AlgorithmIdentifier`, whose parameters may only be an
/// absent or NULL value.
fn parse_algorithm(contents: &[u8]) -> Result<ObjectIdentifier> {
    let (algorithm, rest) = asn1::read_oid(contents)?;
    let (_parameters, rest) = asn1::read_optional_tagged(rest, tag::NULL)?;
    asn1::expect_end(rest)?;
    Ok(algorithm)
}

fn parse_cert_id(contents: &[u8]) -> Result<CertId> {
    let (algorithm, rest) = asn1::read_sequence(contents)?;
    let algorithm = parse_algorithm(algorithm)?;
    let hash_algorithm =
        HashAlgorithm::try_from(algorithm).map_err(Error::UnknownHashAlgorithm)?;
    let (issuer_name_hash, rest) = asn1::read_octet_string(rest)?;
    let (issuer_key_hash, rest) = asn1::read_octet_string(rest)?;
    let (serial_number, rest) = asn1::read_integer(rest)?;
    asn1::expect_end(rest)?;

    Ok(CertId {
        hash_algorithm,
        issuer_name_hash: issuer_name_hash.to_vec(),
        issuer_key_hash: issuer_key_hash.to_vec(),
        serial_number: serial_number.to_vec(),
    })
}
