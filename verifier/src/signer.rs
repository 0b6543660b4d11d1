// Copyright (c) 2023 The NemID Verifier Developers

//! RSA PKCS#1 v1.5 signing and verification over SHA-1 or SHA-256.

use const_oid::ObjectIdentifier;
use rsa::{Pkcs1v15Sign, RsaPrivateKey, RsaPublicKey};
use sha1::Sha1;
use sha2::{Digest, Sha256};

const OID_SHA1: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.3.14.3.2.26");
const OID_SHA256: ObjectIdentifier = ObjectIdentifier::new_unwrap("2.16.840.1.101.3.4.2.1");
const OID_PKCS1_SHA1_WITH_RSA: ObjectIdentifier =
    ObjectIdentifier::new_unwrap("1.2.840.113549.1.1.5");
const OID_PKCS1_SHA256_WITH_RSA: ObjectIdentifier =
    ObjectIdentifier::new_unwrap("1.2.840.113549.1.1.11");

/// Result of a signature operation.
pub type Result<T> = core::result::Result<T, Error>;

/// Error creating or verifying a signature
#[derive(Debug, displaydoc::Display, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// The signature does not match the message and key
    SignatureVerification,
    /// The message could not be signed with the key
    Signing,
}

/// Digest algorithm applied to the message before signing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HashAlgorithm {
    /// SHA-1, only accepted for verifying OCSP responses
    Sha1,
    /// SHA-256
    Sha256,
}

impl HashAlgorithm {
    /// Hash `data` with this algorithm.
    pub fn digest(&self, data: &[u8]) -> Vec<u8> {
        match self {
            HashAlgorithm::Sha1 => Sha1::digest(data).to_vec(),
            HashAlgorithm::Sha256 => Sha256::digest(data).to_vec(),
        }
    }

    /// The object identifier used for this algorithm in an
    /// `AlgorithmIdentifier`.
    pub fn oid(&self) -> ObjectIdentifier {
        match self {
            HashAlgorithm::Sha1 => OID_SHA1,
            HashAlgorithm::Sha256 => OID_SHA256,
        }
    }

    fn padding(&self) -> Pkcs1v15Sign {
        match self {
            HashAlgorithm::Sha1 => Pkcs1v15Sign::new::<Sha1>(),
            HashAlgorithm::Sha256 => Pkcs1v15Sign::new::<Sha256>(),
        }
    }
}

impl TryFrom<ObjectIdentifier> for HashAlgorithm {
    type Error = ObjectIdentifier;

    fn try_from(oid: ObjectIdentifier) -> core::result::Result<Self, Self::Error> {
        match oid {
            OID_SHA1 => Ok(HashAlgorithm::Sha1),
            OID_SHA256 => Ok(HashAlgorithm::Sha256),
            other => Err(other),
        }
    }
}

/// A signature algorithm as named in certificates and OCSP responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SignatureAlgorithm {
    /// sha1WithRSAEncryption
    Sha1WithRsa,
    /// sha256WithRSAEncryption
    Sha256WithRsa,
}

impl SignatureAlgorithm {
    /// The digest this algorithm signs.
    pub fn hash_algorithm(&self) -> HashAlgorithm {
        match self {
            SignatureAlgorithm::Sha1WithRsa => HashAlgorithm::Sha1,
            SignatureAlgorithm::Sha256WithRsa => HashAlgorithm::Sha256,
        }
    }
}

impl TryFrom<ObjectIdentifier> for SignatureAlgorithm {
    type Error = ObjectIdentifier;

    fn try_from(oid: ObjectIdentifier) -> core::result::Result<Self, Self::Error> {
        match oid {
            OID_PKCS1_SHA1_WITH_RSA => Ok(SignatureAlgorithm::Sha1WithRsa),
            OID_PKCS1_SHA256_WITH_RSA => Ok(SignatureAlgorithm::Sha256WithRsa),
            other => Err(other),
        }
    }
}

/// Verifies signatures made by the holder of an RSA key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RsaVerifier<'a> {
    key: &'a RsaPublicKey,
}

impl<'a> RsaVerifier<'a> {
    /// Create a verifier for `key`.
    pub fn new(key: &'a RsaPublicKey) -> Self {
        Self { key }
    }

    /// Verify that `signature` signs `message` when hashed with `algorithm`.
    pub fn verify(&self, algorithm: HashAlgorithm, message: &[u8], signature: &[u8]) -> Result<()> {
        let hashed = algorithm.digest(message);
        self.key
            .verify(algorithm.padding(), &hashed, signature)
            .map_err(|_| Error::SignatureVerification)
    }
}

/// Creates signatures with an RSA private key.
#[derive(Debug, Clone)]
pub struct RsaSigner {
    key: RsaPrivateKey,
}

impl RsaSigner {
    /// Create a signer for `key`.
    pub fn new(key: RsaPrivateKey) -> Self {
        Self { key }
    }

    /// The public half of the signing key.
    pub fn public_key(&self) -> RsaPublicKey {
        self.key.to_public_key()
    }

    /// Sign `message`, hashing it with `algorithm` first.
    pub fn sign(&self, algorithm: HashAlgorithm, message: &[u8]) -> Result<Vec<u8>> {
        let hashed = algorithm.digest(message);
        self.key
            .sign(algorithm.padding(), &hashed)
            .map_err(|_| Error::Signing)
    }
}
