// Copyright (c) 2023 The NemID Verifier Developers

//! The user a verified response identifies.

use crate::certificate::Certificate;
use serde::{Deserialize, Serialize};

const PID_PREFIX: &str = "PID:";
const PSEUDONYM: &str = "Pseudonym";

/// Result of extracting a user.
pub type Result<T> = core::result::Result<T, Error>;

/// Error extracting the user from a certificate
#[derive(Debug, displaydoc::Display, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// The certificate subject has no common name
    FailedToExtractCommonName,
    /// The certificate subject serial number does not hold a PID
    FailedToExtractPid,
}

/// A private NemID user (POCES certificate).
#[derive(Clone, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub struct NemIdUser {
    /// The PID of the user, which can be matched against a CPR number
    pub pid: String,
    /// The name of the user, for example "Bob Hansen", or `None` when the
    /// user has chosen not to share it
    pub name: Option<String>,
}

impl TryFrom<&Certificate> for NemIdUser {
    type Error = Error;

    fn try_from(certificate: &Certificate) -> Result<Self> {
        let common_name = certificate
            .common_name()
            .ok_or(Error::FailedToExtractCommonName)?;
        let pid = certificate
            .serial_number()
            .and_then(|serial_number| serial_number.rsplit_once(PID_PREFIX))
            .map(|(_, pid)| pid)
            .ok_or(Error::FailedToExtractPid)?;

        let name = (common_name != PSEUDONYM).then(|| common_name.to_owned());
        Ok(Self {
            pid: pid.to_owned(),
            name,
        })
    }
}
