// Copyright (c) 2023 The NemID Verifier Developers

//! Online Certificate Status Protocol as defined in
//! [RFC6960](https://datatracker.ietf.org/doc/html/rfc6960).
//!
//! Only the pieces needed to ask about a single certificate are covered: a
//! request without nonce or requestor signature, the basic response type and
//! a transport posting the request to the responder named in the
//! certificate's authority information access extension.

pub mod client;
pub mod request;
pub mod response;

use crate::signer::HashAlgorithm;

pub use client::{OcspClient, TransportError};
#[cfg(feature = "http")]
pub use client::HttpOcspClient;
pub use request::OcspRequest;
pub use response::{BasicOcspResponse, CertStatus, OcspResponse, ResponseStatus, SingleResponse};

/// Identifies the certificate a request or response is about.
///
/// ```ignore
///     CertID ::= SEQUENCE {
///         hashAlgorithm       AlgorithmIdentifier,
///         issuerNameHash      OCTET STRING, -- Hash of issuer's DN
///         issuerKeyHash       OCTET STRING, -- Hash of issuer's public key
///         serialNumber        CertificateSerialNumber }
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CertId {
    /// The algorithm both hashes were made with
    pub hash_algorithm: HashAlgorithm,
    /// Hash of the issuer's DER encoded subject name
    pub issuer_name_hash: Vec<u8>,
    /// Hash of the issuer's public key bits
    pub issuer_key_hash: Vec<u8>,
    /// The certificate serial number as it is encoded, sign octet included
    pub serial_number: Vec<u8>,
}
