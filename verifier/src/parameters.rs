// Copyright (c) 2023 The NemID Verifier Developers

//! Signed parameters a service provider hands the NemID client to start a
//! login.
//!
//! The client checks `PARAMS_DIGEST` and `DIGEST_SIGNATURE` against the
//! normalized form of the other parameters: every parameter that is set,
//! sorted by name ignoring case, written as the name followed by the value
//! with nothing in between.

use crate::signer::{self, HashAlgorithm, RsaSigner};
use base64::{engine::general_purpose::STANDARD, Engine};
use serde::{Deserialize, Serialize, Serializer};

/// Result of signing the parameters.
pub type Result<T> = core::result::Result<T, signer::Error>;

/// The NemID flow to start.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub enum ClientFlow {
    /// Two factor OCES login
    #[serde(rename = "OCESLOGIN2")]
    OcesLogin2,
}

impl ClientFlow {
    fn as_str(&self) -> &'static str {
        match self {
            ClientFlow::OcesLogin2 => "OCESLOGIN2",
        }
    }
}

/// Language of the NemID client.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub enum ClientLanguage {
    /// Danish
    #[serde(rename = "DA")]
    Danish,
    /// English
    #[serde(rename = "EN")]
    English,
    /// Greenlandic
    #[serde(rename = "KL")]
    Greenlandic,
}

impl ClientLanguage {
    fn as_str(&self) -> &'static str {
        match self {
            ClientLanguage::Danish => "DA",
            ClientLanguage::English => "EN",
            ClientLanguage::Greenlandic => "KL",
        }
    }
}

/// Login parameters before signing.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct UnsignedClientParameters {
    /// Which NemID flow to start
    #[serde(rename = "CLIENTFLOW")]
    pub client_flow: ClientFlow,
    /// The client language
    #[serde(rename = "LANGUAGE")]
    pub language: ClientLanguage,
    /// Origin of the site embedding the client. The client aborts with
    /// APP001 or APP007 on messages from any other origin.
    #[serde(rename = "ORIGIN", skip_serializing_if = "Option::is_none")]
    pub origin: Option<String>,
    /// Token the client returned when the user chose to remember their user
    /// ID
    #[serde(rename = "REMEMBER_USERID", skip_serializing_if = "Option::is_none")]
    pub remember_user_id: Option<String>,
    /// Initial state of the "remember user ID" checkbox
    #[serde(
        rename = "REMEMBER_USERID_INITIAL_STATUS",
        skip_serializing_if = "Option::is_none",
        serialize_with = "serialize_flag"
    )]
    pub remember_user_id_initial_status: Option<bool>,
    /// The service provider certificate as base64 encoded DER
    #[serde(rename = "SP_CERT")]
    pub sp_cert: String,
    /// Milliseconds since the Unix epoch. NemID accepts timestamps within
    /// three minutes of its own clock.
    #[serde(rename = "TIMESTAMP", serialize_with = "serialize_timestamp")]
    pub timestamp: u64,
    /// Whether the client should emit an event while waiting for code app
    /// approval
    #[serde(
        rename = "ENABLE_AWAITING_APP_APPROVAL_EVENT",
        skip_serializing_if = "Option::is_none",
        serialize_with = "serialize_flag"
    )]
    pub enable_awaiting_app_approval_event: Option<bool>,
}

impl UnsignedClientParameters {
    /// The text the digest and signature are computed over.
    pub fn normalized(&self) -> String {
        let timestamp = self.timestamp.to_string();
        let mut parameters = vec![
            ("CLIENTFLOW", self.client_flow.as_str()),
            ("LANGUAGE", self.language.as_str()),
            ("SP_CERT", self.sp_cert.as_str()),
            ("TIMESTAMP", timestamp.as_str()),
        ];
        if let Some(origin) = &self.origin {
            parameters.push(("ORIGIN", origin.as_str()));
        }
        if let Some(remember_user_id) = &self.remember_user_id {
            parameters.push(("REMEMBER_USERID", remember_user_id.as_str()));
        }
        if let Some(status) = self.remember_user_id_initial_status {
            parameters.push(("REMEMBER_USERID_INITIAL_STATUS", flag(status)));
        }
        if let Some(enable) = self.enable_awaiting_app_approval_event {
            parameters.push(("ENABLE_AWAITING_APP_APPROVAL_EVENT", flag(enable)));
        }

        parameters.sort_by_key(|(name, _)| name.to_lowercase());
        parameters
            .into_iter()
            .map(|(name, value)| format!("{name}{value}"))
            .collect()
    }
}

/// Login parameters as sent to the NemID client.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct SignedClientParameters {
    /// The parameters that were signed
    #[serde(flatten)]
    pub parameters: UnsignedClientParameters,
    /// Base64 of the SHA-256 digest of the normalized parameters
    #[serde(rename = "PARAMS_DIGEST")]
    pub params_digest: String,
    /// Base64 of the RSA SHA-256 signature of the normalized parameters
    #[serde(rename = "DIGEST_SIGNATURE")]
    pub digest_signature: String,
}

/// Signs login parameters with the service provider's key.
#[derive(Debug, Clone)]
pub struct ParametersSigner {
    signer: RsaSigner,
}

impl ParametersSigner {
    /// Create a signer using the service provider's key.
    pub fn new(signer: RsaSigner) -> Self {
        Self { signer }
    }

    /// Compute the digest and signature of `parameters`.
    pub fn sign(&self, parameters: UnsignedClientParameters) -> Result<SignedClientParameters> {
        let normalized = parameters.normalized();
        let digest = HashAlgorithm::Sha256.digest(normalized.as_bytes());
        let signature = self
            .signer
            .sign(HashAlgorithm::Sha256, normalized.as_bytes())?;

        Ok(SignedClientParameters {
            parameters,
            params_digest: STANDARD.encode(digest),
            digest_signature: STANDARD.encode(signature),
        })
    }
}

fn flag(value: bool) -> &'static str {
    if value {
        "TRUE"
    } else {
        "FALSE"
    }
}

fn serialize_flag<S: Serializer>(
    value: &Option<bool>,
    serializer: S,
) -> core::result::Result<S::Ok, S::Error> {
    match value {
        Some(value) => serializer.serialize_str(flag(*value)),
        None => serializer.serialize_none(),
    }
}

fn serialize_timestamp<S: Serializer>(
    timestamp: &u64,
    serializer: S,
) -> core::result::Result<S::Ok, S::Error> {
    serializer.collect_str(timestamp)
}
