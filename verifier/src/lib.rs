// Copyright (c) 2023 The NemID Verifier Developers

#![doc = include_str!("../README.md")]
#![deny(missing_docs, missing_debug_implementations, unsafe_code)]

pub mod asn1;
pub mod c14n;
pub mod certificate;
pub mod chain;
pub mod client_error;
pub mod environment;
mod error;
pub mod handler;
pub mod ocsp;
pub mod parameters;
pub mod signer;
pub mod user;
pub mod xmldsig;

pub use certificate::{Certificate, ExtendedKeyUsage, KeyUsages};
pub use chain::{CertificateChain, CertificateExtractor, UsageCountExtractor};
pub use client_error::{ClientError, Language};
pub use environment::{Configuration, Environment};
pub use error::{Error, ErrorFamily, Result};
pub use handler::{ChainValidationError, OcspValidationError, ResponseHandler, ValidationError};
pub use ocsp::{OcspClient, OcspRequest, OcspResponse, TransportError};
#[cfg(feature = "http")]
pub use ocsp::HttpOcspClient;
pub use parameters::{ParametersSigner, SignedClientParameters, UnsignedClientParameters};
pub use user::NemIdUser;
pub use xmldsig::{DefaultXmlDsigParser, ParsedXmlDsigResponse, XmlDsigParser};
