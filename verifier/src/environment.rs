// Copyright (c) 2023 The NemID Verifier Developers

//! The NemID environment to verify against and the verifier's configuration.

use core::time::Duration;
use serde::{Deserialize, Serialize};
use subtle::ConstantTimeEq;

const PRODUCTION_PID_CPR_MATCH_ENDPOINT: &str =
    "https://pidws.certifikat.dk/pid_serviceprovider_server/pidxml/";
const PREPRODUCTION_PID_CPR_MATCH_ENDPOINT: &str =
    "https://pidws.pp.certifikat.dk/pid_serviceprovider_server/pidxml/";

/// SHA-256 of the production OCES root certificate.
const PRODUCTION_OCES_FINGERPRINT: [u8; 32] = [
    0x92, 0xD8, 0x09, 0x2E, 0xE7, 0x7B, 0xC9, 0x20, 0x8F, 0x08, 0x97, 0xDC, 0x05, 0x27, 0x18, 0x94,
    0xE6, 0x3E, 0xF2, 0x79, 0x33, 0xAE, 0x53, 0x7F, 0xB9, 0x83, 0xEE, 0xF0, 0xEA, 0xE3, 0xEE, 0xC8,
];

/// SHA-256 of the pre-production OCES root certificate.
const PREPRODUCTION_OCES_FINGERPRINT: [u8; 32] = [
    0x0E, 0x2F, 0xD1, 0xFD, 0xA3, 0x6A, 0x4B, 0xF3, 0x99, 0x5E, 0x28, 0x61, 0x97, 0x04, 0xD6, 0x0E,
    0x33, 0x82, 0xC9, 0x1E, 0x44, 0xA2, 0xB4, 0x58, 0xAB, 0x89, 0x13, 0x16, 0x38, 0x0B, 0x1D, 0x50,
];

const DEFAULT_OCSP_TIMEOUT_SECONDS: u64 = 10;

/// Error loading a configuration
#[derive(Debug, displaydoc::Display)]
pub enum Error {
    /// Failed to parse the configuration JSON: {0}
    Json(serde_json::Error),
}

impl From<serde_json::Error> for Error {
    fn from(src: serde_json::Error) -> Self {
        Error::Json(src)
    }
}

/// A NemID environment, pinning the OCES root certificate that user
/// certificates must chain up to.
///
/// For JSON the production and pre-production environments are the strings
/// `"production"` and `"preproduction"`, while a custom environment is an
/// object with the fingerprint as hex-encoded bytes.
#[derive(Clone, Debug, Deserialize, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", deny_unknown_fields)]
pub enum Environment {
    /// The NemID production environment
    Production,
    /// The NemID pre-production (test) environment
    Preproduction,
    /// Any other environment, typically a local test setup
    Custom {
        /// The endpoint of the PID-CPR match service
        pid_cpr_match_endpoint: String,
        /// SHA-256 of the trusted root certificate
        #[serde(with = "hex")]
        oces_certificate_fingerprint: [u8; 32],
    },
}

impl Environment {
    /// SHA-256 of the trusted root certificate.
    pub fn oces_certificate_fingerprint(&self) -> &[u8; 32] {
        match self {
            Environment::Production => &PRODUCTION_OCES_FINGERPRINT,
            Environment::Preproduction => &PREPRODUCTION_OCES_FINGERPRINT,
            Environment::Custom {
                oces_certificate_fingerprint,
                ..
            } => oces_certificate_fingerprint,
        }
    }

    /// The endpoint of the PID-CPR match service.
    pub fn pid_cpr_match_endpoint(&self) -> &str {
        match self {
            Environment::Production => PRODUCTION_PID_CPR_MATCH_ENDPOINT,
            Environment::Preproduction => PREPRODUCTION_PID_CPR_MATCH_ENDPOINT,
            Environment::Custom {
                pid_cpr_match_endpoint,
                ..
            } => pid_cpr_match_endpoint,
        }
    }

    /// Whether `fingerprint` is the one pinned for this environment.
    ///
    /// The comparison is constant time.
    pub fn is_trusted_root(&self, fingerprint: &[u8; 32]) -> bool {
        self.oces_certificate_fingerprint()
            .ct_eq(fingerprint)
            .into()
    }
}

/// Configuration of a verifier.
///
/// Supports de/serialization to/from JSON. Unknown JSON fields are flagged as an error.
#[derive(Clone, Debug, Deserialize, PartialEq, Eq, Serialize)]
#[serde(deny_unknown_fields)]
pub struct Configuration {
    /// The environment responses are verified against
    pub environment: Environment,
    /// How long to wait for the OCSP responder
    #[serde(default = "default_ocsp_timeout_seconds")]
    pub ocsp_timeout_seconds: u64,
}

fn default_ocsp_timeout_seconds() -> u64 {
    DEFAULT_OCSP_TIMEOUT_SECONDS
}

impl Configuration {
    /// Create a configuration for `environment` with the default OCSP timeout.
    pub fn new(environment: Environment) -> Self {
        Self {
            environment,
            ocsp_timeout_seconds: DEFAULT_OCSP_TIMEOUT_SECONDS,
        }
    }

    /// How long to wait for the OCSP responder.
    pub fn ocsp_timeout(&self) -> Duration {
        Duration::from_secs(self.ocsp_timeout_seconds)
    }
}

impl TryFrom<&str> for Configuration {
    type Error = Error;

    /// Parse a configuration from its JSON text.
    fn try_from(json: &str) -> Result<Self, Self::Error> {
        Ok(serde_json::from_str(json)?)
    }
}
