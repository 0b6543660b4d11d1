// Copyright (c) 2023 The NemID Verifier Developers

//! Transport carrying OCSP requests to the responder.

use super::OcspRequest;
use core::future::Future;

#[cfg(feature = "http")]
pub use http::HttpOcspClient;

/// MIME type of a DER encoded OCSP request.
pub const OCSP_REQUEST_CONTENT_TYPE: &str = "application/ocsp-request";
/// MIME type of a DER encoded OCSP response.
pub const OCSP_RESPONSE_CONTENT_TYPE: &str = "application/ocsp-response";

/// Error getting an answer from the OCSP responder
#[derive(Debug, displaydoc::Display, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// The OCSP responder did not answer in time
    Timeout,
    /// Failed to reach the OCSP responder: {0}
    Network(String),
    /// The OCSP responder answered with HTTP status {0}
    UnexpectedStatus(u16),
    /// The response content type is not application/ocsp-response
    InvalidContentTypeHeader,
    /// The OCSP responder sent an empty body
    ResponseBodyWasEmpty,
}

/// Sends an OCSP request to the responder it names and returns the DER
/// encoded response.
pub trait OcspClient {
    /// Send `request` to [`OcspRequest::url()`].
    fn send(
        &self,
        request: &OcspRequest,
    ) -> impl Future<Output = Result<Vec<u8>, TransportError>> + Send;
}

#[cfg(feature = "http")]
mod http {
    use super::*;
    use core::time::Duration;
    use log::debug;
    use reqwest::header::CONTENT_TYPE;

    /// OCSP over HTTP POST, as described in
    /// [RFC6960 A.1](https://datatracker.ietf.org/doc/html/rfc6960#appendix-A.1).
    #[derive(Debug, Clone)]
    pub struct HttpOcspClient {
        client: reqwest::Client,
    }

    impl HttpOcspClient {
        /// Create a client giving up on requests that take longer than
        /// `timeout`.
        pub fn new(timeout: Duration) -> Result<Self, TransportError> {
            let client = reqwest::Client::builder().timeout(timeout).build()?;
            Ok(Self::from_client(client))
        }

        /// Send requests with an already configured `reqwest` client.
        pub fn from_client(client: reqwest::Client) -> Self {
            Self { client }
        }
    }

    impl OcspClient for HttpOcspClient {
        async fn send(&self, request: &OcspRequest) -> Result<Vec<u8>, TransportError> {
            debug!("Sending OCSP request to {}", request.url());
            let response = self
                .client
                .post(request.url())
                .header(CONTENT_TYPE, OCSP_REQUEST_CONTENT_TYPE)
                .body(request.der().to_vec())
                .send()
                .await?;

            let status = response.status();
            debug!("Received OCSP response with status {status}");
            if !status.is_success() {
                return Err(TransportError::UnexpectedStatus(status.as_u16()));
            }

            let content_type = response
                .headers()
                .get(CONTENT_TYPE)
                .and_then(|value| value.to_str().ok());
            if content_type != Some(OCSP_RESPONSE_CONTENT_TYPE) {
                return Err(TransportError::InvalidContentTypeHeader);
            }

            let body = response.bytes().await?;
            if body.is_empty() {
                return Err(TransportError::ResponseBodyWasEmpty);
            }
            Ok(body.to_vec())
        }
    }

    impl From<reqwest::Error> for TransportError {
        fn from(src: reqwest::Error) -> Self {
            if src.is_timeout() {
                TransportError::Timeout
            } else {
                TransportError::Network(src.to_string())
            }
        }
    }

}
