//! Service provider settings.
//!
//! [`Settings`] is a passive value: every operation borrows it and none
//! mutates it. Key material is held already parsed, so nothing here touches
//! the filesystem.

use saml_crypto::{Certificate, PrivateKey};

use crate::error::{SamlError, SamlResult};
use crate::signature::SignatureAlgorithm;
use crate::types::SamlMessageType;

/// Default ceiling for decoded and inflated messages.
pub const DEFAULT_MAX_MESSAGE_SIZE: usize = 256 * 1024;

/// Everything the engine needs to know about both parties.
#[derive(Debug, Clone)]
pub struct Settings {
    /// The local service provider.
    pub sp: ServiceProviderSettings,
    /// The remote identity provider.
    pub idp: IdentityProviderSettings,
    /// Redirect-binding compression, per direction.
    pub compress: CompressionSettings,
    /// Algorithm for query and XML signatures produced locally.
    pub signature_algorithm: SignatureAlgorithm,
    /// Largest decoded (and inflated) message accepted, in bytes.
    pub max_message_size: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            sp: ServiceProviderSettings::default(),
            idp: IdentityProviderSettings::default(),
            compress: CompressionSettings::default(),
            signature_algorithm: SignatureAlgorithm::default(),
            max_message_size: DEFAULT_MAX_MESSAGE_SIZE,
        }
    }
}

/// The local service provider.
#[derive(Debug, Clone, Default)]
pub struct ServiceProviderSettings {
    /// Entity ID, used as `Issuer` and expected audience.
    pub entity_id: String,
    /// SP certificate, published to the IdP.
    pub certificate: Option<Certificate>,
    /// SP private key, required when `sign_request` is set.
    pub private_key: Option<PrivateKey>,
    /// Assertion consumer service URL.
    pub assertion_consumer_service_url: String,
    /// Single logout service URL.
    pub single_logout_service_url: String,
    /// Whether outgoing redirect queries are signed.
    pub sign_request: bool,
}

/// The remote identity provider.
#[derive(Debug, Clone, Default)]
pub struct IdentityProviderSettings {
    /// Entity ID expected as `Issuer` of what the IdP sends. Empty skips the check.
    pub entity_id: String,
    /// Single sign-on endpoint.
    pub single_sign_on_url: String,
    /// Single logout endpoint.
    pub single_logout_url: String,
    /// Where the IdP publishes its descriptor. Informational only.
    pub single_sign_on_descriptor_url: String,
    /// IdP certificate, required to verify anything the IdP signed.
    pub certificate: Option<Certificate>,
}

/// Redirect-binding compression flags.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CompressionSettings {
    /// Deflate requests (`SAMLRequest`).
    pub request: bool,
    /// Deflate responses (`SAMLResponse`).
    pub response: bool,
}

impl CompressionSettings {
    /// Compression on in both directions.
    #[must_use]
    pub const fn both() -> Self {
        Self {
            request: true,
            response: true,
        }
    }

    /// Returns the flag for messages of `message_type`.
    #[must_use]
    pub const fn applies_to(&self, message_type: SamlMessageType) -> bool {
        match message_type {
            SamlMessageType::Request => self.request,
            SamlMessageType::Response => self.response,
        }
    }
}

impl Settings {
    /// Checks the settings up front.
    ///
    /// # Errors
    ///
    /// Returns [`SamlError::Config`] if the entity ID is empty, if request
    /// signing is on without a private key, if the signature algorithm cannot
    /// sign, or if the size limit is zero.
    pub fn validate(&self) -> SamlResult<()> {
        if self.sp.entity_id.trim().is_empty() {
            return Err(SamlError::Config("SP entity ID is required".into()));
        }
        if self.sp.sign_request {
            self.signing_key()?;
            self.signature_algorithm
                .ensure_can_sign()
                .map_err(|e| SamlError::Config(e.to_string()))?;
        }
        if self.max_message_size == 0 {
            return Err(SamlError::Config("max_message_size must be positive".into()));
        }
        Ok(())
    }

    /// Returns the SP private key.
    ///
    /// # Errors
    ///
    /// Returns [`SamlError::Config`] if no key is configured.
    pub fn signing_key(&self) -> SamlResult<&PrivateKey> {
        self.sp
            .private_key
            .as_ref()
            .ok_or_else(|| SamlError::Config("signing requires an SP private key".into()))
    }

    /// Returns the IdP certificate.
    ///
    /// # Errors
    ///
    /// Returns [`SamlError::Config`] if no certificate is configured.
    pub fn idp_certificate(&self) -> SamlResult<&Certificate> {
        self.idp
            .certificate
            .as_ref()
            .ok_or_else(|| SamlError::Config("verification requires the IdP certificate".into()))
    }

    /// Checks `issuer` against the configured IdP entity ID, if one is set.
    ///
    /// # Errors
    ///
    /// Returns [`SamlError::InvalidIssuer`] on a mismatch.
    pub fn check_idp_issuer(&self, issuer: &str) -> SamlResult<()> {
        let expected = &self.idp.entity_id;
        if expected.is_empty() || expected == issuer {
            return Ok(());
        }
        Err(SamlError::InvalidIssuer {
            expected: expected.clone(),
            actual: issuer.to_string(),
        })
    }

    /// Returns the SP certificate.
    ///
    /// # Errors
    ///
    /// Returns [`SamlError::Config`] if no certificate is configured.
    pub fn sp_certificate(&self) -> SamlResult<&Certificate> {
        self.sp
            .certificate
            .as_ref()
            .ok_or_else(|| SamlError::Config("no SP certificate configured".into()))
    }
}
