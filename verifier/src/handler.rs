// Copyright (c) 2023 The NemID Verifier Developers

//! Verification of the response the NemID client posts back after a login.
//!
//! The response is checked in a fixed order and the first failure aborts:
//!
//! 1. the response is decoded and checked for a client error code
//! 2. the XML signature parts and the certificate chain are extracted
//! 3. the XML signature is checked with the leaf certificate
//! 4. the chain is checked up to the pinned root of the environment
//! 5. the revocation status of the leaf is asked from its OCSP responder
//! 6. the user is read from the leaf certificate

use crate::c14n::canonicalize;
use crate::certificate::{Certificate, ExtendedKeyUsage, KeyUsages};
use crate::chain::{self, decode_base64, CertificateChain, CertificateExtractor};
use crate::client_error::ClientError;
use crate::environment::Environment;
use crate::error::{Error, ErrorFamily, Result};
use crate::ocsp::{
    response, CertStatus, OcspClient, OcspRequest, OcspResponse, ResponseStatus, TransportError,
};
use crate::signer::{HashAlgorithm, RsaVerifier};
use crate::user::{self, NemIdUser};
use crate::xmldsig::{self, ParsedXmlDsigResponse, XmlDsigParser};
use base64::{engine::general_purpose::STANDARD, Engine};
use der::DateTime;
use log::{debug, info, warn};
use std::time::SystemTime;
use subtle::ConstantTimeEq;

#[cfg(feature = "http")]
use crate::{
    chain::UsageCountExtractor, environment::Configuration, ocsp::HttpOcspClient,
    xmldsig::DefaultXmlDsigParser,
};

/// A response that could not be verified
#[derive(Debug, displaydoc::Display, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// The response is not valid base64
    FailedToDecodeResponseAsBase64,
    /// The response is not an XML signature: {0}
    Xml(xmldsig::Error),
    /// The certificate chain could not be recovered: {0}
    Chain(chain::Error),
    /// The signed info could not be canonicalized
    FailedToExtractSignedInfo,
    /// The reference digest is not valid base64
    FailedToExtractReferenceDigest,
    /// The signed object could not be canonicalized
    FailedToExtractObjectToBeSigned,
    /// The signature value is not valid base64
    FailedToExtractSignatureValue,
    /// The digest of the signed object does not match the reference digest
    DigestDidNotMatchSignedObject,
    /// The signed info was not signed by the leaf certificate
    SignedInfoWasNotSignedByCertificate,
    /// The certificate chain is not valid: {0}
    CertificateChain(ChainValidationError),
    /// The root certificate is not the one trusted for the environment
    UntrustedRootCertificate,
    /// Failed to build the OCSP request: {0}
    FailedToGenerateRequest(crate::ocsp::request::Error),
    /// The OCSP responder could not be asked: {0}
    OcspUnavailable(TransportError),
    /// The OCSP response could not be parsed: {0}
    OcspResponse(response::Error),
    /// The OCSP response does not vouch for the leaf certificate: {0}
    Ocsp(OcspValidationError),
    /// The user could not be read from the leaf certificate: {0}
    User(user::Error),
    /// The system clock could not be read as a certificate time
    SystemTime,
}

impl ValidationError {
    /// Whether the response was malformed or failed a trust check.
    pub fn family(&self) -> ErrorFamily {
        match self {
            ValidationError::FailedToDecodeResponseAsBase64
            | ValidationError::Xml(_)
            | ValidationError::Chain(_)
            | ValidationError::FailedToExtractSignedInfo
            | ValidationError::FailedToExtractReferenceDigest
            | ValidationError::FailedToExtractObjectToBeSigned
            | ValidationError::FailedToExtractSignatureValue
            | ValidationError::FailedToGenerateRequest(_)
            | ValidationError::OcspResponse(_)
            | ValidationError::User(_) => ErrorFamily::MalformedInput,
            ValidationError::DigestDidNotMatchSignedObject
            | ValidationError::SignedInfoWasNotSignedByCertificate
            | ValidationError::CertificateChain(_)
            | ValidationError::UntrustedRootCertificate
            | ValidationError::OcspUnavailable(_)
            | ValidationError::Ocsp(_)
            | ValidationError::SystemTime => ErrorFamily::TrustFailure,
        }
    }
}

impl From<xmldsig::Error> for ValidationError {
    fn from(src: xmldsig::Error) -> Self {
        ValidationError::Xml(src)
    }
}

impl From<chain::Error> for ValidationError {
    fn from(src: chain::Error) -> Self {
        ValidationError::Chain(src)
    }
}

impl From<ChainValidationError> for ValidationError {
    fn from(src: ChainValidationError) -> Self {
        ValidationError::CertificateChain(src)
    }
}

impl From<crate::ocsp::request::Error> for ValidationError {
    fn from(src: crate::ocsp::request::Error) -> Self {
        ValidationError::FailedToGenerateRequest(src)
    }
}

impl From<TransportError> for ValidationError {
    fn from(src: TransportError) -> Self {
        ValidationError::OcspUnavailable(src)
    }
}

impl From<response::Error> for ValidationError {
    fn from(src: response::Error) -> Self {
        ValidationError::OcspResponse(src)
    }
}

impl From<OcspValidationError> for ValidationError {
    fn from(src: OcspValidationError) -> Self {
        ValidationError::Ocsp(src)
    }
}

impl From<user::Error> for ValidationError {
    fn from(src: user::Error) -> Self {
        ValidationError::User(src)
    }
}

/// A certificate chain that can not be trusted
#[derive(Debug, displaydoc::Display, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChainValidationError {
    /// The leaf certificate may not be used for digital signatures
    LeafDidNotHaveDigitalSignatureKeyUsage,
    /// A certificate is not valid at the time of verification
    CertificateIsOutsideValidTime,
    /// An issuing certificate is not a CA
    IssuerDidNotHaveCAFlag,
    /// An issuing certificate may not sign certificates
    IssuerDidNotHaveKeyCertSignKeyUsage,
    /// A certificate was not signed by its issuer
    CertificateWasNotSignedByCorrectCertificate,
}

/// An OCSP response that does not vouch for the leaf certificate
#[derive(Debug, displaydoc::Display, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OcspValidationError {
    /// The responder did not answer the request successfully
    RequestWasNotSuccessful,
    /// The response has no basic response
    BasicResponseIsNotPresent,
    /// The response does not embed the responder certificate
    CertificateNotFoundInResponse,
    /// The response was not signed by the embedded responder certificate
    SignatureWasNotSignedByCertificate,
    /// The responder certificate was not issued by the intermediate certificate
    CertificateWasNotSignedByIssuer,
    /// The response has no certificate status
    CertificateResponseNotPresent,
    /// The certificate status is not good
    CertificateStatusIsNotGood,
    /// The certificate identifier is not hashed with SHA-256
    CertificateWrongHashAlgorithm,
    /// The serial number is not the one asked about
    SerialNumberDidNotMatchRequest,
    /// The issuer key hash is not the one asked about
    IssuerKeyHashDidNotMatchRequest,
    /// The issuer name hash is not the one asked about
    IssuerNameHashDidNotMatchRequest,
    /// The time of verification is outside the validity of the response
    ResponseIsOutsideAllowedTime,
    /// The responder certificate may not sign OCSP responses
    CertificateDidNotHaveOCSPSigningExtendedKeyUsage,
    /// The responder certificate lacks the OCSP no check extension
    CertificateNoCheckExtensionNotFound,
}

/// Verifies NemID client responses and extracts the user they identify.
///
/// The XML parsing, the chain extraction and the OCSP transport are
/// supplied by the caller, or wired to the defaults with
/// [`ResponseHandler::new()`].
#[derive(Debug, Clone)]
pub struct ResponseHandler<P, E, C> {
    environment: Environment,
    parser: P,
    extractor: E,
    client: C,
}

#[cfg(feature = "http")]
impl ResponseHandler<DefaultXmlDsigParser, UsageCountExtractor, HttpOcspClient> {
    /// Create a handler asking the OCSP responders over HTTP.
    pub fn new(configuration: &Configuration) -> core::result::Result<Self, TransportError> {
        let client = HttpOcspClient::new(configuration.ocsp_timeout())?;
        Ok(Self::with_collaborators(
            configuration.environment.clone(),
            DefaultXmlDsigParser,
            UsageCountExtractor,
            client,
        ))
    }
}

impl<C: OcspClient> ResponseHandler<xmldsig::DefaultXmlDsigParser, chain::UsageCountExtractor, C> {
    /// Create a handler with the default parsing and `client` as the OCSP
    /// transport.
    pub fn with_client(environment: Environment, client: C) -> Self {
        Self::with_collaborators(
            environment,
            xmldsig::DefaultXmlDsigParser,
            chain::UsageCountExtractor,
            client,
        )
    }
}

impl<P, E, C> ResponseHandler<P, E, C>
where
    P: XmlDsigParser,
    E: CertificateExtractor,
    C: OcspClient,
{
    /// Create a handler from its parts.
    pub fn with_collaborators(environment: Environment, parser: P, extractor: E, client: C) -> Self {
        Self {
            environment,
            parser,
            extractor,
            client,
        }
    }

    /// The environment responses are verified against.
    pub fn environment(&self) -> &Environment {
        &self.environment
    }

    /// Verify the base64 encoded `response` of the NemID client as of now.
    pub async fn verify_and_extract_user(&self, response: &str) -> Result<NemIdUser> {
        let now = DateTime::from_system_time(SystemTime::now()).map_err(|_| {
            let error = ValidationError::SystemTime;
            log_rejection(&error);
            Error::Validation(error)
        })?;
        self.verify_and_extract_user_at(response, now).await
    }

    /// Verify the base64 encoded `response` of the NemID client as of `now`.
    ///
    /// # Errors
    /// - [`Error::Client`] when the client reported an error instead of
    ///   signing
    /// - [`Error::Validation`] when any check fails
    pub async fn verify_and_extract_user_at(
        &self,
        response: &str,
        now: DateTime,
    ) -> Result<NemIdUser> {
        let decoded = match STANDARD.decode(response.trim()) {
            Ok(decoded) => decoded,
            Err(_) => {
                let error = ValidationError::FailedToDecodeResponseAsBase64;
                log_rejection(&error);
                return Err(error.into());
            }
        };

        if let Some(client_error) = reported_client_error(&decoded) {
            debug!("The NemID client reported {}", client_error.code());
            return Err(Error::Client(client_error));
        }

        match self.validate(&decoded, now).await {
            Ok(user) => {
                info!("Verified NemID response");
                Ok(user)
            }
            Err(error) => {
                log_rejection(&error);
                Err(error.into())
            }
        }
    }

    async fn validate(
        &self,
        xml: &[u8],
        now: DateTime,
    ) -> core::result::Result<NemIdUser, ValidationError> {
        let parsed = self.parser.parse(xml)?;
        debug!("Parsed XML signature");
        let chain = self.extractor.extract(&parsed.x509_certificates)?;
        debug!(
            "Extracted certificate chain for {:?}",
            chain.leaf.common_name()
        );

        validate_signature(&parsed, &chain.leaf)?;
        debug!("XML signature is valid");
        validate_certificate_chain(&chain, &self.environment, now)?;
        debug!("Certificate chain is trusted");

        let request = OcspRequest::new(&chain.leaf, &chain.intermediate)?;
        let der = self.client.send(&request).await?;
        let response = OcspResponse::from_der(&der)?;
        validate_ocsp_response(&response, &request, &chain.intermediate, now)?;
        debug!("OCSP responder vouched for the leaf certificate");

        Ok(NemIdUser::try_from(&chain.leaf)?)
    }
}

fn log_rejection(error: &ValidationError) {
    match error.family() {
        ErrorFamily::MalformedInput => warn!("Rejected NemID response as untrusted input: {error}"),
        _ => warn!("Rejected NemID response on trust failure: {error}"),
    }
}

fn reported_client_error(decoded: &[u8]) -> Option<ClientError> {
    core::str::from_utf8(decoded).ok()?.parse().ok()
}

fn validate_signature(
    parsed: &ParsedXmlDsigResponse,
    leaf: &Certificate,
) -> core::result::Result<(), ValidationError> {
    let signed_info =
        canonicalize(&parsed.signed_info).ok_or(ValidationError::FailedToExtractSignedInfo)?;
    let reference_digest = decode_base64(&parsed.reference_digest_value)
        .ok_or(ValidationError::FailedToExtractReferenceDigest)?;
    let object = canonicalize(&parsed.object_to_be_signed)
        .ok_or(ValidationError::FailedToExtractObjectToBeSigned)?;
    let signature = decode_base64(&parsed.signature_value)
        .ok_or(ValidationError::FailedToExtractSignatureValue)?;

    let digest = HashAlgorithm::Sha256.digest(&object);
    if !bool::from(digest.ct_eq(&reference_digest)) {
        return Err(ValidationError::DigestDidNotMatchSignedObject);
    }

    RsaVerifier::new(leaf.public_key())
        .verify(HashAlgorithm::Sha256, &signed_info, &signature)
        .map_err(|_| ValidationError::SignedInfoWasNotSignedByCertificate)
}

fn validate_certificate_chain(
    chain: &CertificateChain,
    environment: &Environment,
    now: DateTime,
) -> core::result::Result<(), ValidationError> {
    let CertificateChain {
        root,
        intermediate,
        leaf,
    } = chain;

    if !leaf.has_key_usage(KeyUsages::DigitalSignature) {
        return Err(ChainValidationError::LeafDidNotHaveDigitalSignatureKeyUsage.into());
    }
    if !chain.iter().all(|certificate| certificate.is_valid_at(now)) {
        return Err(ChainValidationError::CertificateIsOutsideValidTime.into());
    }
    if !(intermediate.has_ca_flag() && root.has_ca_flag()) {
        return Err(ChainValidationError::IssuerDidNotHaveCAFlag.into());
    }
    if !(intermediate.has_key_usage(KeyUsages::KeyCertSign)
        && root.has_key_usage(KeyUsages::KeyCertSign))
    {
        return Err(ChainValidationError::IssuerDidNotHaveKeyCertSignKeyUsage.into());
    }
    if !(leaf.is_signed_by(intermediate)
        && intermediate.is_signed_by(root)
        && root.is_signed_by(root))
    {
        return Err(ChainValidationError::CertificateWasNotSignedByCorrectCertificate.into());
    }

    if !environment.is_trusted_root(&root.fingerprint()) {
        return Err(ValidationError::UntrustedRootCertificate);
    }
    Ok(())
}

/// Checks that `response` answers `request` and says the certificate is good.
///
/// Only the first status in the response is looked at.
fn validate_ocsp_response(
    response: &OcspResponse,
    request: &OcspRequest,
    issuer: &Certificate,
    now: DateTime,
) -> core::result::Result<(), OcspValidationError> {
    if response.status != ResponseStatus::Successful {
        return Err(OcspValidationError::RequestWasNotSuccessful);
    }
    let basic = response
        .basic_response
        .as_ref()
        .ok_or(OcspValidationError::BasicResponseIsNotPresent)?;

    let responder = basic
        .certificate
        .as_ref()
        .ok_or(OcspValidationError::CertificateNotFoundInResponse)?;
    RsaVerifier::new(responder.public_key())
        .verify(
            basic.signature_algorithm.hash_algorithm(),
            &basic.tbs_response_data.der,
            &basic.signature,
        )
        .map_err(|_| OcspValidationError::SignatureWasNotSignedByCertificate)?;
    if !responder.is_signed_by(issuer) {
        return Err(OcspValidationError::CertificateWasNotSignedByIssuer);
    }

    let single = basic
        .tbs_response_data
        .single_response
        .as_ref()
        .ok_or(OcspValidationError::CertificateResponseNotPresent)?;
    if single.cert_status != CertStatus::Good {
        return Err(OcspValidationError::CertificateStatusIsNotGood);
    }

    let expected = request.cert_id();
    let actual = &single.cert_id;
    if actual.hash_algorithm != HashAlgorithm::Sha256 {
        return Err(OcspValidationError::CertificateWrongHashAlgorithm);
    }
    if actual.serial_number != expected.serial_number {
        return Err(OcspValidationError::SerialNumberDidNotMatchRequest);
    }
    if actual.issuer_key_hash != expected.issuer_key_hash {
        return Err(OcspValidationError::IssuerKeyHashDidNotMatchRequest);
    }
    if actual.issuer_name_hash != expected.issuer_name_hash {
        return Err(OcspValidationError::IssuerNameHashDidNotMatchRequest);
    }

    let now = now.unix_duration();
    if single.this_update.unix_duration() > now || now > single.next_update.unix_duration() {
        return Err(OcspValidationError::ResponseIsOutsideAllowedTime);
    }

    if !responder.has_extended_key_usage(ExtendedKeyUsage::OcspSigning) {
        return Err(OcspValidationError::CertificateDidNotHaveOCSPSigningExtendedKeyUsage);
    }
    if !responder.has_ocsp_no_check_extension() {
        return Err(OcspValidationError::CertificateNoCheckExtensionNotFound);
    }
    Ok(())
}
