//! Error type for cryptographic operations.

use thiserror::Error;

/// Error type for key handling, signing and verification.
#[derive(Debug, Error)]
pub enum CryptoError {
    /// The private key could not be parsed.
    #[error("invalid key format: {0}")]
    InvalidKey(String),

    /// The certificate could not be parsed.
    #[error("invalid certificate: {0}")]
    InvalidCertificate(String),

    /// Signing failed.
    #[error("signing failed: {0}")]
    Signing(String),

    /// Verification failed.
    #[error("signature verification failed")]
    Verification,

    /// Algorithm not supported for the requested operation.
    #[error("algorithm not supported: {0}")]
    UnsupportedAlgorithm(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verification_error_is_generic() {
        let error = CryptoError::Verification;
        // Don't leak information about why verification failed
        assert_eq!(error.to_string(), "signature verification failed");
    }
}
