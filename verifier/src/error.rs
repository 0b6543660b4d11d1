// Copyright (c) 2023 The NemID Verifier Developers

//! Errors that can occur during verification

use crate::client_error::{ClientError, Language};
use crate::handler::ValidationError;

/// Result of verifying a NemID response.
pub type Result<T> = core::result::Result<T, Error>;

const NOT_VERIFIED_EN: &str = "Authentication could not be verified.";
const NOT_VERIFIED_DA: &str = "Godkendelsen kunne ikke bekræftes.";

/// The kind of failure behind an [`Error`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorFamily {
    /// The NemID client reported an error instead of signing
    ClientReported,
    /// The response could not be decoded or has the wrong shape
    MalformedInput,
    /// A signature, a certificate or the revocation status could not be
    /// trusted
    TrustFailure,
}

/// Error verifying a NemID response
#[derive(Debug, displaydoc::Display, Clone, PartialEq, Eq)]
pub enum Error {
    /// {0}
    Client(ClientError),
    /// Failed to verify the NemID response: {0}
    Validation(ValidationError),
}

impl Error {
    /// The kind of failure.
    pub fn family(&self) -> ErrorFamily {
        match self {
            Error::Client(_) => ErrorFamily::ClientReported,
            Error::Validation(error) => error.family(),
        }
    }

    /// Text that may be shown to the user.
    ///
    /// Client errors have their own text. Every other failure gets the same
    /// generic text, the details are only for logs.
    pub fn public_message(&self, language: Language) -> &'static str {
        match (self, language) {
            (Error::Client(error), language) => error.description(language),
            (Error::Validation(_), Language::English) => NOT_VERIFIED_EN,
            (Error::Validation(_), Language::Danish) => NOT_VERIFIED_DA,
        }
    }
}

impl From<ValidationError> for Error {
    fn from(src: ValidationError) -> Self {
        Error::Validation(src)
    }
}

impl From<ClientError> for Error {
    fn from(src: ClientError) -> Self {
        Error::Client(src)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::handler::OcspValidationError;
    use yare::parameterized;

    #[parameterized(
        english = { Language::English, "You have cancelled the login." },
        danish = { Language::Danish, "Du har afbrudt login." },
    )]
    fn client_error_message(language: Language, expected: &str) {
        let error = Error::from(ClientError::Can002);

        assert_eq!(error.family(), ErrorFamily::ClientReported);
        assert_eq!(error.public_message(language), expected);
    }

    #[parameterized(
        malformed_english = {
            ValidationError::FailedToDecodeResponseAsBase64,
            Language::English,
            "Authentication could not be verified.",
        },
        trust_failure_english = {
            ValidationError::Ocsp(OcspValidationError::CertificateStatusIsNotGood),
            Language::English,
            "Authentication could not be verified.",
        },
        trust_failure_danish = {
            ValidationError::UntrustedRootCertificate,
            Language::Danish,
            "Godkendelsen kunne ikke bekræftes.",
        },
    )]
    fn validation_details_are_not_public(
        error: ValidationError,
        language: Language,
        expected: &str,
    ) {
        assert_eq!(Error::from(error).public_message(language), expected);
    }

    #[test]
    fn display_keeps_details_for_logs() {
        let error = Error::from(ValidationError::Ocsp(
            OcspValidationError::CertificateStatusIsNotGood,
        ));

        assert_eq!(
            error.to_string(),
            "Failed to verify the NemID response: The OCSP response does not vouch for the leaf certificate: The certificate status is not good"
        );
    }
}
