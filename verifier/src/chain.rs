// Copyright (c) 2023 The NemID Verifier Developers

//! Recovery of the certificate chain embedded in a NemID signature.
//!
//! The client sends its chain as an unordered list of three certificates:
//! the user's certificate, the issuing CA and the root CA. The position of
//! each certificate is found by counting how often every distinguished name
//! is used across all subjects and issuers:
//!
//! | certificate  | used as                                         | count |
//! |--------------|-------------------------------------------------|-------|
//! | leaf         | its own subject                                 | 1     |
//! | intermediate | its own subject, issuer of the leaf             | 2     |
//! | root         | its own subject and issuer, issuer of the intermediate | 3 |
//!
//! Anything but a strict three level hierarchy is rejected.

use crate::certificate::{self, Certificate};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use std::collections::HashMap;

/// Result of recovering a certificate chain.
pub type Result<T> = core::result::Result<T, Error>;

/// Error recovering the certificate chain
#[derive(Debug, displaydoc::Display, Clone, PartialEq, Eq)]
pub enum Error {
    /// A certificate is not valid base64
    FailedToDecodeCertificate,
    /// A certificate could not be decoded: {0}
    MalformedCertificate(certificate::Error),
    /// Expected 3 certificates but found {0}
    UnexpectedCertificateCount(usize),
    /// The same certificate occurs more than once
    DuplicateCertificate,
    /// More than one certificate qualifies for the same position in the chain
    AmbiguousCertificateChain,
    /// No certificate qualifies as the leaf certificate
    FailedToLocateLeafCertificate,
    /// No certificate qualifies as the intermediate certificate
    FailedToLocateIntermediateCertificate,
    /// No certificate qualifies as the root certificate
    FailedToLocateRootCertificate,
    /// The leaf certificate was not issued by the intermediate certificate
    LeafIssuerWasNotIntermediate,
    /// The intermediate certificate was not issued by the root certificate
    IntermediateIssuerWasNotRoot,
    /// The root certificate is not self-issued
    RootWasNotSelfSigned,
}

impl From<certificate::Error> for Error {
    fn from(src: certificate::Error) -> Self {
        Error::MalformedCertificate(src)
    }
}

/// A root, an intermediate and a leaf certificate, linked by their names.
///
/// Only the names are known to line up. Signatures, validity periods and
/// usages are checked by the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CertificateChain {
    /// The self-issued trust anchor
    pub root: Certificate,
    /// The CA issued by the root
    pub intermediate: Certificate,
    /// The user's certificate, issued by the intermediate
    pub leaf: Certificate,
}

impl CertificateChain {
    /// The certificates from the root down to the leaf.
    pub fn iter(&self) -> impl Iterator<Item = &Certificate> {
        [&self.root, &self.intermediate, &self.leaf].into_iter()
    }
}

/// Builds the certificate chain from the base64 encoded certificates of a
/// signature.
pub trait CertificateExtractor {
    /// Decode `certificates` and order them into a chain.
    fn extract(&self, certificates: &[String]) -> Result<CertificateChain>;
}

/// [`CertificateExtractor`] ordering the certificates by how often their
/// names are used.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct UsageCountExtractor;

impl CertificateExtractor for UsageCountExtractor {
    fn extract(&self, certificates: &[String]) -> Result<CertificateChain> {
        if certificates.len() != 3 {
            return Err(Error::UnexpectedCertificateCount(certificates.len()));
        }
        let certificates = certificates
            .iter()
            .map(|encoded| {
                let der = decode_base64(encoded).ok_or(Error::FailedToDecodeCertificate)?;
                Ok(Certificate::from_der(&der)?)
            })
            .collect::<Result<Vec<_>>>()?;

        let names = certificates
            .iter()
            .map(|certificate| Names {
                der: certificate.der(),
                subject: certificate.subject(),
                issuer: certificate.issuer(),
            })
            .collect::<Vec<_>>();
        let Positions {
            root,
            intermediate,
            leaf,
        } = classify(&names)?;

        let mut certificates = certificates.into_iter().map(Some).collect::<Vec<_>>();
        let mut take = |index: usize| {
            certificates
                .get_mut(index)
                .and_then(Option::take)
                .ok_or(Error::AmbiguousCertificateChain)
        };
        Ok(CertificateChain {
            root: take(root)?,
            intermediate: take(intermediate)?,
            leaf: take(leaf)?,
        })
    }
}

/// Decodes base64 text content, skipping the XML whitespace that wrapped
/// values carry. Any other character outside the alphabet fails.
pub(crate) fn decode_base64(encoded: &str) -> Option<Vec<u8>> {
    let unwrapped = encoded
        .chars()
        .filter(|c| !matches!(c, ' ' | '\t' | '\r' | '\n'))
        .collect::<String>();
    STANDARD.decode(unwrapped).ok()
}

#[derive(Debug, Clone, Copy)]
struct Names<'a> {
    der: &'a [u8],
    subject: &'a [u8],
    issuer: &'a [u8],
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Positions {
    root: usize,
    intermediate: usize,
    leaf: usize,
}

/// Finds the index of the root, intermediate and leaf certificate.
fn classify(names: &[Names]) -> Result<Positions> {
    for (index, certificate) in names.iter().enumerate() {
        if names[index + 1..]
            .iter()
            .any(|other| other.der == certificate.der)
        {
            return Err(Error::DuplicateCertificate);
        }
    }

    let mut usage = HashMap::<&[u8], usize>::new();
    for certificate in names {
        *usage.entry(certificate.subject).or_default() += 1;
        *usage.entry(certificate.issuer).or_default() += 1;
    }

    let find = |count: usize, missing: Error| -> Result<usize> {
        let mut used = usage
            .iter()
            .filter(|(_, used)| **used == count)
            .map(|(name, _)| *name);
        let name = used.next().ok_or_else(|| missing.clone())?;
        if used.next().is_some() {
            return Err(Error::AmbiguousCertificateChain);
        }
        let mut subjects = names
            .iter()
            .enumerate()
            .filter(|(_, certificate)| certificate.subject == name)
            .map(|(index, _)| index);
        let index = subjects.next().ok_or(missing)?;
        if subjects.next().is_some() {
            return Err(Error::AmbiguousCertificateChain);
        }
        Ok(index)
    };
    let leaf = find(1, Error::FailedToLocateLeafCertificate)?;
    let intermediate = find(2, Error::FailedToLocateIntermediateCertificate)?;
    let root = find(3, Error::FailedToLocateRootCertificate)?;

    if names[leaf].issuer != names[intermediate].subject {
        return Err(Error::LeafIssuerWasNotIntermediate);
    }
    if names[intermediate].issuer != names[root].subject {
        return Err(Error::IntermediateIssuerWasNotRoot);
    }
    if names[root].issuer != names[root].subject {
        return Err(Error::RootWasNotSelfSigned);
    }

    Ok(Positions {
        root,
        intermediate,
        leaf,
    })
}
