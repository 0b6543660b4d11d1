// Copyright (c) 2023 The NemID Verifier Developers

#![allow(dead_code)]

use base64::{engine::general_purpose::STANDARD, Engine};
use der::DateTime;
use nemid_verifier::c14n::canonicalize;
use nemid_verifier::signer::{HashAlgorithm, RsaSigner};
use nemid_verifier::{
    DefaultXmlDsigParser, Environment, OcspClient, OcspRequest, TransportError, XmlDsigParser,
};
use rsa::pkcs8::DecodePrivateKey;
use rsa::RsaPrivateKey;

pub const ROOT: &[u8] = include_bytes!("../data/root.der");
pub const INTERMEDIATE: &[u8] = include_bytes!("../data/intermediate.der");
pub const LEAF: &[u8] = include_bytes!("../data/leaf.der");
pub const LEAF_KEY: &[u8] = include_bytes!("../data/leaf.pk8");
pub const PSEUDONYM: &[u8] = include_bytes!("../data/pseudonym.der");
pub const PSEUDONYM_KEY: &[u8] = include_bytes!("../data/pseudonym.pk8");
pub const OCSP_GOOD: &[u8] = include_bytes!("../data/ocsp-good.der");
pub const OCSP_REVOKED: &[u8] = include_bytes!("../data/ocsp-revoked.der");
pub const OCSP_PSEUDONYM_GOOD: &[u8] = include_bytes!("../data/ocsp-pseudonym-good.der");
pub const OCSP_WITHOUT_NO_CHECK: &[u8] = include_bytes!("../data/ocsp-without-no-check.der");

/// SHA-256 of `root.der`.
pub const ROOT_FINGERPRINT: &str =
    "d05e067f6844531d830ec5314b56e7ffbb5fcd9d5452d8f274d8b0d7df4d16e2";

/// A day after the OCSP fixtures were produced.
pub fn now() -> DateTime {
    DateTime::new(2026, 10, 20, 12, 0, 0).expect("Invalid time")
}

/// An environment trusting `root.der`.
pub fn environment() -> Environment {
    let mut fingerprint = [0u8; 32];
    hex::decode_to_slice(ROOT_FINGERPRINT, &mut fingerprint).expect("Invalid fingerprint");
    Environment::Custom {
        pid_cpr_match_endpoint: "https://localhost/pidxml/".to_owned(),
        oces_certificate_fingerprint: fingerprint,
    }
}

/// Answers every request with the same DER response.
#[derive(Debug, Clone, Copy)]
pub struct FixtureOcspClient {
    response: &'static [u8],
}

impl FixtureOcspClient {
    pub fn new(response: &'static [u8]) -> Self {
        Self { response }
    }
}

impl OcspClient for FixtureOcspClient {
    async fn send(&self, _request: &OcspRequest) -> Result<Vec<u8>, TransportError> {
        Ok(self.response.to_vec())
    }
}

/// Wraps base64 at 76 characters, the way the NemID client writes
/// certificates.
fn wrap(encoded: &str) -> String {
    encoded
        .as_bytes()
        .chunks(76)
        .map(|line| String::from_utf8_lossy(line).into_owned())
        .collect::<Vec<_>>()
        .join("\n")
}

fn document(digest: &str, signature: &str, certificates: &[&[u8]]) -> String {
    let certificates = certificates
        .iter()
        .map(|der| {
            format!(
                "<ds:X509Certificate>\n{}\n</ds:X509Certificate>",
                wrap(&STANDARD.encode(der))
            )
        })
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        r##"<?xml version="1.0" encoding="UTF-8"?>
<openoces:signature xmlns:openoces="http://www.openoces.org/2006/07/signature#" xmlns:ds="http://www.w3.org/2000/09/xmldsig#" version="0.1">
<ds:Signature Id="signature">
<ds:SignedInfo>
<ds:CanonicalizationMethod Algorithm="http://www.w3.org/TR/2001/REC-xml-c14n-20010315"/>
<ds:SignatureMethod Algorithm="http://www.w3.org/2001/04/xmldsig-more#rsa-sha256"/>
<ds:Reference URI="#ToBeSigned">
<ds:Transforms>
<ds:Transform Algorithm="http://www.w3.org/TR/2001/REC-xml-c14n-20010315"/>
</ds:Transforms>
<ds:DigestMethod Algorithm="http://www.w3.org/2001/04/xmlenc#sha256"/>
<ds:DigestValue>{digest}</ds:DigestValue>
</ds:Reference>
</ds:SignedInfo>
<ds:SignatureValue>
{signature}
</ds:SignatureValue>
<ds:KeyInfo>
<ds:X509Data>
{certificates}
</ds:X509Data>
</ds:KeyInfo>
<ds:Object Id="ToBeSigned">
<ds:SignatureProperties>
<ds:SignatureProperty Target="signature">
<openoces:Name>action</openoces:Name>
<openoces:Value Encoding="base64" VisibleToSigner="no">bG9nb24=</openoces:Value>
</ds:SignatureProperty>
<ds:SignatureProperty Target="signature">
<openoces:Name>TimeStamp</openoces:Name>
<openoces:Value Encoding="base64" VisibleToSigner="no">MjAyNi0xMC0yMCAxMjowMDowMCswMDAw</openoces:Value>
</ds:SignatureProperty>
</ds:SignatureProperties>
</ds:Object>
</ds:Signature>
</openoces:signature>
"##
    )
}

/// An XML signature by `key` carrying `certificates`, before base64
/// encoding.
pub fn signed_document(key: &[u8], certificates: &[&[u8]]) -> String {
    let parser = DefaultXmlDsigParser;

    let unsigned = parser
        .parse(document("", "", certificates).as_bytes())
        .expect("Failed parsing document");
    let object = canonicalize(&unsigned.object_to_be_signed).expect("Failed to canonicalize");
    let digest = STANDARD.encode(HashAlgorithm::Sha256.digest(&object));

    let digested = parser
        .parse(document(&digest, "", certificates).as_bytes())
        .expect("Failed parsing document");
    let signed_info = canonicalize(&digested.signed_info).expect("Failed to canonicalize");
    let key = RsaPrivateKey::from_pkcs8_der(key).expect("Failed decoding key");
    let signature = RsaSigner::new(key)
        .sign(HashAlgorithm::Sha256, &signed_info)
        .expect("Failed to sign");

    document(&digest, &wrap(&STANDARD.encode(signature)), certificates)
}

/// A base64 encoded response as posted by the NemID client.
pub fn signed_response(key: &[u8], certificates: &[&[u8]]) -> String {
    STANDARD.encode(signed_document(key, certificates))
}
