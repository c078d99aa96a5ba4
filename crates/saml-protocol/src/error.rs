//! SAML error types.
//!
//! One error enum covers configuration, transport decoding, XML structure,
//! signature trust and post-parse validation. Trust failures are distinct
//! variants so callers can never mistake them for malformed input.

use saml_crypto::CryptoError;
use thiserror::Error;

use crate::types::{status_codes, sub_status_codes};

/// Result type for SAML operations.
pub type SamlResult<T> = Result<T, SamlError>;

/// SAML protocol errors.
#[derive(Debug, Error)]
pub enum SamlError {
    /// Settings are incomplete or inconsistent for the requested operation.
    #[error("configuration error: {0}")]
    Config(String),

    /// Transport decoding failed (URL, base64, deflate or size limit).
    #[error("codec error: {0}")]
    Codec(String),

    /// The document is not well-formed XML.
    #[error("malformed XML: {0}")]
    MalformedXml(String),

    /// The document is XML but not the expected SAML message.
    #[error("schema mismatch: {0}")]
    SchemaMismatch(String),

    /// A signature was required but none was present.
    #[error("signature missing: {0}")]
    SignatureMissing(String),

    /// A signature was present but did not verify.
    #[error("signature invalid: {0}")]
    SignatureInvalid(String),

    /// The signature, digest, transform or canonicalization algorithm is not supported.
    #[error("signature algorithm unsupported: {0}")]
    SignatureAlgorithmUnsupported(String),

    /// The referenced content does not match the signed digest.
    #[error("digest mismatch for reference {0}")]
    DigestMismatch(String),

    /// Assertion expired.
    #[error("assertion expired")]
    AssertionExpired,

    /// Assertion not yet valid.
    #[error("assertion not yet valid")]
    AssertionNotYetValid,

    /// Invalid audience.
    #[error("invalid audience: expected {expected}, got {actual}")]
    InvalidAudience {
        /// The expected audience URI.
        expected: String,
        /// The actual audience URI.
        actual: String,
    },

    /// Invalid destination.
    #[error("invalid destination: expected {expected}, got {actual}")]
    InvalidDestination {
        /// The expected destination URL.
        expected: String,
        /// The actual destination URL.
        actual: String,
    },

    /// Invalid issuer.
    #[error("invalid issuer: expected {expected}, got {actual}")]
    InvalidIssuer {
        /// The expected issuer.
        expected: String,
        /// The actual issuer.
        actual: String,
    },

    /// The counterparty answered with a non-success status.
    #[error("unsuccessful status: {0}")]
    UnsuccessfulStatus(String),

    /// A cryptographic primitive failed while producing a signature.
    #[error("crypto error: {0}")]
    Crypto(String),
}

impl SamlError {
    /// Returns true for errors that mean the message must not be trusted.
    #[must_use]
    pub const fn is_trust_failure(&self) -> bool {
        matches!(
            self,
            Self::SignatureMissing(_)
                | Self::SignatureInvalid(_)
                | Self::SignatureAlgorithmUnsupported(_)
                | Self::DigestMismatch(_)
        )
    }

    /// Returns the SAML status code for this error.
    #[must_use]
    pub fn status_code(&self) -> &'static str {
        match self {
            Self::Codec(_)
            | Self::MalformedXml(_)
            | Self::SchemaMismatch(_)
            | Self::SignatureMissing(_)
            | Self::SignatureInvalid(_)
            | Self::DigestMismatch(_)
            | Self::AssertionExpired
            | Self::AssertionNotYetValid
            | Self::InvalidAudience { .. }
            | Self::InvalidDestination { .. }
            | Self::InvalidIssuer { .. } => status_codes::REQUESTER,
            Self::SignatureAlgorithmUnsupported(_) => sub_status_codes::REQUEST_UNSUPPORTED,
            Self::Config(_) | Self::UnsuccessfulStatus(_) | Self::Crypto(_) => {
                status_codes::RESPONDER
            }
        }
    }

    /// Returns the HTTP status code for this error.
    #[must_use]
    pub const fn http_status(&self) -> u16 {
        match self {
            Self::Codec(_) | Self::MalformedXml(_) | Self::SchemaMismatch(_) => 400,
            Self::SignatureMissing(_)
            | Self::SignatureInvalid(_)
            | Self::SignatureAlgorithmUnsupported(_)
            | Self::DigestMismatch(_) => 401,
            Self::AssertionExpired
            | Self::AssertionNotYetValid
            | Self::InvalidAudience { .. }
            | Self::InvalidDestination { .. }
            | Self::InvalidIssuer { .. }
            | Self::UnsuccessfulStatus(_) => 403,
            Self::Config(_) | Self::Crypto(_) => 500,
        }
    }
}

impl From<quick_xml::Error> for SamlError {
    fn from(err: quick_xml::Error) -> Self {
        Self::MalformedXml(err.to_string())
    }
}

impl From<quick_xml::events::attributes::AttrError> for SamlError {
    fn from(err: quick_xml::events::attributes::AttrError) -> Self {
        Self::MalformedXml(err.to_string())
    }
}

impl From<quick_xml::escape::EscapeError> for SamlError {
    fn from(err: quick_xml::escape::EscapeError) -> Self {
        Self::MalformedXml(err.to_string())
    }
}

impl From<base64::DecodeError> for SamlError {
    fn from(err: base64::DecodeError) -> Self {
        Self::Codec(format!("base64: {err}"))
    }
}

impl From<std::io::Error> for SamlError {
    fn from(err: std::io::Error) -> Self {
        Self::Codec(err.to_string())
    }
}

impl From<CryptoError> for SamlError {
    fn from(err: CryptoError) -> Self {
        match err {
            CryptoError::Verification => Self::SignatureInvalid(err.to_string()),
            CryptoError::UnsupportedAlgorithm(alg) => Self::SignatureAlgorithmUnsupported(alg),
            CryptoError::InvalidKey(_) | CryptoError::InvalidCertificate(_) => {
                Self::Config(err.to_string())
            }
            CryptoError::Signing(_) => Self::Crypto(err.to_string()),
        }
    }
}
