// Copyright (c) 2023 The NemID Verifier Developers

//! X509 certificates as presented by the NemID client and OCSP responders.
//!
//! A [`Certificate`] is decoded once from DER and never changes afterwards.
//! The raw encodings of the TBS portion and of the subject and issuer names
//! are kept next to the decoded values, since signatures and the OCSP hashes
//! are computed over the exact bytes received.

mod name;

use crate::asn1::{self, tag};
use crate::signer::{RsaVerifier, SignatureAlgorithm};
use const_oid::ObjectIdentifier;
use der::DateTime;
use rsa::pkcs1::DecodeRsaPublicKey;
use rsa::RsaPublicKey;
use sha2::{Digest, Sha256};
use x509_cert::der::Decode;
use x509_cert::ext::pkix::name::GeneralName;
use x509_cert::ext::pkix::{
    AuthorityInfoAccessSyntax, BasicConstraints, ExtendedKeyUsage as ExtendedKeyUsageExtension,
    KeyUsage,
};
use x509_cert::Certificate as X509Certificate;

pub use x509_cert::ext::pkix::KeyUsages;

const OID_RSA_ENCRYPTION: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.2.840.113549.1.1.1");
const OID_KEY_USAGE: ObjectIdentifier = ObjectIdentifier::new_unwrap("2.5.29.15");
const OID_BASIC_CONSTRAINTS: ObjectIdentifier = ObjectIdentifier::new_unwrap("2.5.29.19");
const OID_EXTENDED_KEY_USAGE: ObjectIdentifier = ObjectIdentifier::new_unwrap("2.5.29.37");
const OID_AUTHORITY_INFO_ACCESS: ObjectIdentifier =
    ObjectIdentifier::new_unwrap("1.3.6.1.5.5.7.1.1");
const OID_ACCESS_METHOD_OCSP: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.3.6.1.5.5.7.48.1");
const OID_OCSP_NO_CHECK: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.3.6.1.5.5.7.48.1.5");

/// Result of decoding a certificate.
pub type Result<T> = core::result::Result<T, Error>;

/// Error decoding a certificate
#[derive(Debug, displaydoc::Display, Clone, PartialEq, Eq)]
pub enum Error {
    /// The certificate structure is malformed: {0}
    MalformedStructure(asn1::Error),
    /// An error occurred decoding the certificate: {0}
    MalformedCertificate(der::Error),
    /// The certificate does not contain a serial number
    MissingSerialNumber,
    /// The certificate does not contain a validity period
    MissingValidity,
    /// The certificate public key is not an RSA key
    UnsupportedPublicKey,
}

impl From<asn1::Error> for Error {
    fn from(src: asn1::Error) -> Self {
        Error::MalformedStructure(src)
    }
}

impl From<der::Error> for Error {
    fn from(src: der::Error) -> Self {
        Error::MalformedCertificate(src)
    }
}

/// Extended key usage purposes from
/// [RFC5280 4.2.1.12](https://datatracker.ietf.org/doc/html/rfc5280#section-4.2.1.12).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExtendedKeyUsage {
    /// id-kp-serverAuth
    ServerAuth,
    /// id-kp-clientAuth
    ClientAuth,
    /// id-kp-codeSigning
    CodeSigning,
    /// id-kp-emailProtection
    EmailProtection,
    /// id-kp-timeStamping
    TimeStamping,
    /// id-kp-OCSPSigning
    OcspSigning,
}

impl ExtendedKeyUsage {
    /// The key purpose identifier of this usage.
    pub fn oid(&self) -> ObjectIdentifier {
        let oid = match self {
            ExtendedKeyUsage::ServerAuth => "1.3.6.1.5.5.7.3.1",
            ExtendedKeyUsage::ClientAuth => "1.3.6.1.5.5.7.3.2",
            ExtendedKeyUsage::CodeSigning => "1.3.6.1.5.5.7.3.3",
            ExtendedKeyUsage::EmailProtection => "1.3.6.1.5.5.7.3.4",
            ExtendedKeyUsage::TimeStamping => "1.3.6.1.5.5.7.3.8",
            ExtendedKeyUsage::OcspSigning => "1.3.6.1.5.5.7.3.9",
        };
        ObjectIdentifier::new_unwrap(oid)
    }
}

/// A decoded X509 certificate holding an RSA public key.
///
/// Two certificates are equal when their DER encodings are identical.
#[derive(Debug, Clone)]
pub struct Certificate {
    der: Vec<u8>,
    tbs: Vec<u8>,
    subject: Vec<u8>,
    issuer: Vec<u8>,
    raw_serial_number: Vec<u8>,
    common_name: Option<String>,
    serial_number: Option<String>,
    not_before: DateTime,
    not_after: DateTime,
    key_usage: Option<KeyUsage>,
    extended_key_usages: Vec<ObjectIdentifier>,
    ca: bool,
    ocsp_no_check: bool,
    ocsp_url: Option<String>,
    public_key: RsaPublicKey,
    public_key_bits: Vec<u8>,
    signature_algorithm: ObjectIdentifier,
    signature: Vec<u8>,
}

/// The raw pieces of a certificate that are needed byte for byte.
struct RawFields<'a> {
    tbs: &'a [u8],
    serial_number: &'a [u8],
    issuer: &'a [u8],
    subject: &'a [u8],
}

impl<'a> RawFields<'a> {
    /// Walks the outer structure of the certificate, as laid out in
    /// [RFC5280 4.1](https://datatracker.ietf.org/doc/html/rfc5280#section-4.1).
    fn walk(der: &'a [u8]) -> Result<Self> {
        let (certificate, _) = asn1::read_sequence(der)?;
        let (tbs, _) = asn1::read_element(certificate)?;
        if tbs.tag != tag::SEQUENCE {
            return Err(asn1::Error::UnexpectedTag {
                expected: tag::SEQUENCE,
                actual: tbs.tag,
            }
            .into());
        }

        let (_version, fields) = asn1::read_optional_tagged(tbs.contents, tag::explicit(0))?;
        let (serial_number, fields) =
            asn1::read_integer(fields).map_err(|_| Error::MissingSerialNumber)?;
        let (_signature, fields) = asn1::read_sequence(fields)?;
        let (issuer, fields) = asn1::read_element(fields)?;
        let (validity, fields) = asn1::read_sequence(fields).map_err(|_| Error::MissingValidity)?;
        let (not_before, validity) =
            asn1::read_element(validity).map_err(|_| Error::MissingValidity)?;
        let (not_after, _) = asn1::read_element(validity).map_err(|_| Error::MissingValidity)?;
        for time in [not_before, not_after] {
            if time.tag != tag::UTC_TIME && time.tag != tag::GENERALIZED_TIME {
                return Err(Error::MissingValidity);
            }
        }
        let (subject, _) = asn1::read_element(fields)?;

        Ok(Self {
            tbs: tbs.encoded,
            serial_number,
            issuer: issuer.encoded,
            subject: subject.encoded,
        })
    }
}

impl Certificate {
    /// Decode a certificate from its DER encoding.
    pub fn from_der(der: &[u8]) -> Result<Self> {
        let raw = RawFields::walk(der)?;
        let certificate = X509Certificate::from_der(der)?;
        let tbs_certificate = &certificate.tbs_certificate;

        let mut key_usage = None;
        let mut extended_key_usages = Vec::new();
        let mut ca = false;
        let mut ocsp_no_check = false;
        let mut ocsp_url = None;
        for extension in tbs_certificate.extensions.iter().flatten() {
            let value = extension.extn_value.as_bytes();
            match extension.extn_id {
                OID_KEY_USAGE => key_usage = Some(KeyUsage::from_der(value)?),
                OID_EXTENDED_KEY_USAGE => {
                    extended_key_usages = ExtendedKeyUsageExtension::from_der(value)?.0
                }
                OID_BASIC_CONSTRAINTS => ca = BasicConstraints::from_der(value)?.ca,
                OID_OCSP_NO_CHECK => ocsp_no_check = true,
                OID_AUTHORITY_INFO_ACCESS => {
                    let access = AuthorityInfoAccessSyntax::from_der(value)?;
                    ocsp_url = access
                        .0
                        .iter()
                        .filter(|description| description.access_method == OID_ACCESS_METHOD_OCSP)
                        .find_map(|description| match &description.access_location {
                            GeneralName::UniformResourceIdentifier(uri) => Some(uri.to_string()),
                            _ => None,
                        });
                }
                _ => {}
            }
        }

        let key_info = &tbs_certificate.subject_public_key_info;
        if key_info.algorithm.oid != OID_RSA_ENCRYPTION {
            return Err(Error::UnsupportedPublicKey);
        }
        let public_key_bits = key_info.subject_public_key.raw_bytes();
        let public_key = RsaPublicKey::from_pkcs1_der(public_key_bits)
            .map_err(|_| Error::UnsupportedPublicKey)?;

        Ok(Self {
            der: der.to_vec(),
            tbs: raw.tbs.to_vec(),
            subject: raw.subject.to_vec(),
            issuer: raw.issuer.to_vec(),
            raw_serial_number: raw.serial_number.to_vec(),
            common_name: name::attribute(&tbs_certificate.subject, name::OID_COMMON_NAME)?,
            serial_number: name::attribute(&tbs_certificate.subject, name::OID_SERIAL_NUMBER)?,
            not_before: tbs_certificate.validity.not_before.to_date_time(),
            not_after: tbs_certificate.validity.not_after.to_date_time(),
            key_usage,
            extended_key_usages,
            ca,
            ocsp_no_check,
            ocsp_url,
            public_key,
            public_key_bits: public_key_bits.to_vec(),
            signature_algorithm: certificate.signature_algorithm.oid,
            signature: certificate.signature.raw_bytes().to_vec(),
        })
    }

    /// The DER encoding of the certificate.
    pub fn der(&self) -> &[u8] {
        &self.der
    }

    /// The DER encoding of the subject name.
    pub fn subject(&self) -> &[u8] {
        &self.subject
    }

    /// The DER encoding of the issuer name.
    pub fn issuer(&self) -> &[u8] {
        &self.issuer
    }

    /// The common name of the subject.
    pub fn common_name(&self) -> Option<&str> {
        self.common_name.as_deref()
    }

    /// The `serialNumber` attribute of the subject name.
    ///
    /// Not to be confused with [`Certificate::raw_serial_number`].
    pub fn serial_number(&self) -> Option<&str> {
        self.serial_number.as_deref()
    }

    /// The content octets of the certificate serial number INTEGER.
    pub fn raw_serial_number(&self) -> &[u8] {
        &self.raw_serial_number
    }

    /// Start of the validity period.
    pub fn not_before(&self) -> DateTime {
        self.not_before
    }

    /// End of the validity period.
    pub fn not_after(&self) -> DateTime {
        self.not_after
    }

    /// Whether `time` lies strictly inside the validity period.
    pub fn is_valid_at(&self, time: DateTime) -> bool {
        let time = time.unix_duration();
        self.not_before.unix_duration() < time && time < self.not_after.unix_duration()
    }

    /// The subject public key.
    pub fn public_key(&self) -> &RsaPublicKey {
        &self.public_key
    }

    /// SHA-256 over the DER encoding of the certificate.
    pub fn fingerprint(&self) -> [u8; 32] {
        Sha256::digest(&self.der).into()
    }

    /// The OCSP responder location from the authority information access
    /// extension.
    pub fn ocsp_url(&self) -> Option<&str> {
        self.ocsp_url.as_deref()
    }

    /// Whether the key usage extension is present and asserts `usage`.
    pub fn has_key_usage(&self, usage: KeyUsages) -> bool {
        self.key_usage
            .as_ref()
            .map_or(false, |key_usage| key_usage.0.contains(usage))
    }

    /// Whether the extended key usage extension lists `usage`.
    pub fn has_extended_key_usage(&self, usage: ExtendedKeyUsage) -> bool {
        self.extended_key_usages.contains(&usage.oid())
    }

    /// Whether the basic constraints extension marks the subject as a CA.
    pub fn has_ca_flag(&self) -> bool {
        self.ca
    }

    /// Whether the certificate carries the id-pkix-ocsp-nocheck extension.
    pub fn has_ocsp_no_check_extension(&self) -> bool {
        self.ocsp_no_check
    }

    /// SHA-256 over the DER encoding of the subject name.
    pub fn hashed_subject(&self) -> Vec<u8> {
        Sha256::digest(&self.subject).to_vec()
    }

    /// SHA-256 over the subject public key BIT STRING, excluding the unused
    /// bits octet.
    pub fn hashed_public_key(&self) -> Vec<u8> {
        Sha256::digest(&self.public_key_bits).to_vec()
    }

    /// Whether this certificate was signed with the key of `signer`.
    ///
    /// Only the signature is checked. Neither validity periods nor the names
    /// of the two certificates are looked at.
    pub fn is_signed_by(&self, signer: &Certificate) -> bool {
        let Ok(algorithm) = SignatureAlgorithm::try_from(self.signature_algorithm) else {
            return false;
        };
        RsaVerifier::new(signer.public_key())
            .verify(algorithm.hash_algorithm(), &self.tbs, &self.signature)
            .is_ok()
    }
}

impl PartialEq for Certificate {
    fn eq(&self, other: &Self) -> bool {
        self.der == other.der
    }
}

impl Eq for Certificate {}
