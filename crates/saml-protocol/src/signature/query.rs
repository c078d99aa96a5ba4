//! HTTP-Redirect binding signatures.
//!
//! The signature covers `SAMLRequest|SAMLResponse=..&RelayState=..&SigAlg=..`
//! exactly as the values appear on the wire, still percent-encoded. Verifying
//! therefore works on the raw query and never on re-encoded values.

use base64::Engine;
use saml_crypto::{Certificate, PrivateKey};

use super::{strip_whitespace, SignatureAlgorithm};
use crate::bindings::RedirectQuery;
use crate::error::{SamlError, SamlResult};
use crate::settings::Settings;

/// Signs redirect queries with the SP private key.
#[derive(Debug, Clone)]
pub struct QuerySigner<'a> {
    key: &'a PrivateKey,
    algorithm: SignatureAlgorithm,
}

impl<'a> QuerySigner<'a> {
    /// Creates a signer.
    ///
    /// # Errors
    ///
    /// Returns [`SamlError::SignatureAlgorithmUnsupported`] for RSA-SHA1.
    pub fn new(key: &'a PrivateKey, algorithm: SignatureAlgorithm) -> SamlResult<Self> {
        algorithm.ensure_can_sign()?;
        Ok(Self { key, algorithm })
    }

    /// Creates a signer from the SP key and algorithm in `settings`.
    ///
    /// # Errors
    ///
    /// Returns [`SamlError::Config`] if no private key is configured.
    pub fn from_settings(settings: &'a Settings) -> SamlResult<Self> {
        Self::new(settings.signing_key()?, settings.signature_algorithm)
    }

    /// Appends `SigAlg` and `Signature` to an unsigned query.
    ///
    /// `query` must be `SAMLRequest=..` or `SAMLResponse=..`, optionally
    /// followed by `&RelayState=..`, as built by
    /// [`HttpRedirectBinding::query`](crate::bindings::HttpRedirectBinding::query).
    ///
    /// # Errors
    ///
    /// Returns [`SamlError::Crypto`] if the signing primitive fails.
    pub fn sign_query(&self, query: &str) -> SamlResult<String> {
        let mut signed = format!(
            "{query}&SigAlg={}",
            urlencoding::encode(self.algorithm.uri())
        );
        let signature = self.key.sign(self.algorithm.rsa(), signed.as_bytes())?;
        let signature_b64 = base64::engine::general_purpose::STANDARD.encode(signature);

        tracing::debug!(algorithm = self.algorithm.uri(), "signed redirect query");
        signed.push_str("&Signature=");
        signed.push_str(&urlencoding::encode(&signature_b64));
        Ok(signed)
    }
}

/// Verifies the signature of a received redirect query.
///
/// Returns the algorithm the query was signed with.
///
/// # Errors
///
/// - [`SamlError::Codec`] if the query carries no SAML message
/// - [`SamlError::SignatureMissing`] if `SigAlg` or `Signature` is absent
/// - [`SamlError::SignatureAlgorithmUnsupported`] for an unknown `SigAlg`
/// - [`SamlError::SignatureInvalid`] if the signature does not decode or verify
pub fn verify_query(query: &str, certificate: &Certificate) -> SamlResult<SignatureAlgorithm> {
    verify_parsed(&RedirectQuery::parse(query)?, certificate)
}

pub(crate) fn verify_parsed(
    query: &RedirectQuery<'_>,
    certificate: &Certificate,
) -> SamlResult<SignatureAlgorithm> {
    let (Some(sig_alg), Some(signature)) = (query.sig_alg, query.signature) else {
        return Err(SamlError::SignatureMissing(
            "redirect query has no SigAlg/Signature pair".into(),
        ));
    };

    let sig_alg_uri = urlencoding::decode(sig_alg)
        .map_err(|_| SamlError::SignatureAlgorithmUnsupported(sig_alg.to_string()))?;
    let algorithm = SignatureAlgorithm::from_uri(&sig_alg_uri)
        .ok_or_else(|| SamlError::SignatureAlgorithmUnsupported(sig_alg_uri.to_string()))?;

    let mut signed = format!("{}={}", query.message_type.form_param(), query.message);
    if let Some(rs) = query.relay_state {
        signed.push_str("&RelayState=");
        signed.push_str(rs);
    }
    signed.push_str("&SigAlg=");
    signed.push_str(sig_alg);

    let signature = urlencoding::decode(signature)
        .ok()
        .and_then(|decoded| {
            base64::engine::general_purpose::STANDARD
                .decode(strip_whitespace(&decoded))
                .ok()
        })
        .ok_or_else(|| SamlError::SignatureInvalid("Signature is not valid base64".into()))?;

    certificate
        .verify(algorithm.rsa(), signed.as_bytes(), &signature)
        .map_err(|e| {
            tracing::warn!(algorithm = algorithm.uri(), "redirect query signature rejected");
            SamlError::from(e)
        })?;

    if algorithm.is_deprecated() {
        tracing::warn!("accepted redirect query signed with RSA-SHA1");
    }
    Ok(algorithm)
}

/// A message received over the redirect binding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Received<M> {
    /// The decoded message.
    pub message: M,
    /// The decoded `RelayState`, if any.
    pub relay_state: Option<String>,
    /// The algorithm of the verified query signature; `None` if unsigned.
    pub signature_algorithm: Option<SignatureAlgorithm>,
}

impl<M> Received<M> {
    /// Returns true if the query carried a signature that verified.
    #[must_use]
    pub const fn signed(&self) -> bool {
        self.signature_algorithm.is_some()
    }

    /// Rejects an unsigned receipt.
    ///
    /// # Errors
    ///
    /// Returns [`SamlError::SignatureMissing`] if the query was not signed.
    pub fn require_signature(self) -> SamlResult<Self> {
        if self.signed() {
            Ok(self)
        } else {
            Err(SamlError::SignatureMissing("redirect query was not signed".into()))
        }
    }

    /// Discards the transport details.
    #[must_use]
    pub fn into_message(self) -> M {
        self.message
    }
}
