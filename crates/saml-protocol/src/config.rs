//! Plain-data configuration.
//!
//! [`SamlConfig`] holds what an operator writes down: URLs, flags and PEM
//! text. It is loaded from environment variables or deserialized with serde,
//! then turned into [`Settings`] with `Settings::try_from`, which parses the
//! key material and validates the result.

use saml_crypto::{Certificate, PrivateKey};
use serde::{Deserialize, Serialize};

use crate::error::SamlError;
use crate::settings::{
    CompressionSettings, IdentityProviderSettings, ServiceProviderSettings, Settings,
    DEFAULT_MAX_MESSAGE_SIZE,
};
use crate::signature::SignatureAlgorithm;

/// Unparsed service provider configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SamlConfig {
    /// SP entity ID.
    pub sp_entity_id: String,
    /// Assertion consumer service URL.
    pub sp_acs_url: String,
    /// SP single logout service URL.
    pub sp_slo_url: String,
    /// Sign outgoing redirect queries.
    pub sp_sign_request: bool,
    /// SP private key, PEM.
    pub sp_private_key_pem: Option<String>,
    /// SP certificate, PEM.
    pub sp_certificate_pem: Option<String>,
    /// IdP entity ID, checked against received issuers when set.
    pub idp_entity_id: String,
    /// IdP single sign-on URL.
    pub idp_sso_url: String,
    /// IdP single logout URL.
    pub idp_slo_url: String,
    /// IdP descriptor URL.
    pub idp_descriptor_url: String,
    /// IdP certificate, PEM.
    pub idp_certificate_pem: Option<String>,
    /// Deflate redirect requests.
    pub compress_request: bool,
    /// Deflate redirect responses.
    pub compress_response: bool,
    /// Signature algorithm, as a URI or a short name such as `rsa-sha256`.
    pub signature_algorithm: String,
    /// Largest accepted message, in bytes.
    pub max_message_size: usize,
}

impl Default for SamlConfig {
    fn default() -> Self {
        Self {
            sp_entity_id: String::new(),
            sp_acs_url: String::new(),
            sp_slo_url: String::new(),
            sp_sign_request: false,
            sp_private_key_pem: None,
            sp_certificate_pem: None,
            idp_entity_id: String::new(),
            idp_sso_url: String::new(),
            idp_slo_url: String::new(),
            idp_descriptor_url: String::new(),
            idp_certificate_pem: None,
            compress_request: false,
            compress_response: false,
            signature_algorithm: SignatureAlgorithm::default().uri().to_string(),
            max_message_size: DEFAULT_MAX_MESSAGE_SIZE,
        }
    }
}

impl SamlConfig {
    /// Loads configuration from `SAML_*` environment variables.
    ///
    /// Unset variables keep their defaults. Unparseable numbers fall back to
    /// the default as well; flags are on unless `false` or `0`.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Loads configuration through `lookup`, keyed by environment variable name.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let string = |name: &str, default: String| lookup(name).unwrap_or(default);
        let flag = |name: &str, default: bool| {
            lookup(name)
                .map(|v| v.to_lowercase() != "false" && v != "0")
                .unwrap_or(default)
        };
        let pem = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        Self {
            sp_entity_id: string("SAML_SP_ENTITY_ID", defaults.sp_entity_id),
            sp_acs_url: string("SAML_SP_ACS_URL", defaults.sp_acs_url),
            sp_slo_url: string("SAML_SP_SLO_URL", defaults.sp_slo_url),
            sp_sign_request: flag("SAML_SP_SIGN_REQUEST", defaults.sp_sign_request),
            sp_private_key_pem: pem("SAML_SP_PRIVATE_KEY_PEM"),
            sp_certificate_pem: pem("SAML_SP_CERTIFICATE_PEM"),
            idp_entity_id: string("SAML_IDP_ENTITY_ID", defaults.idp_entity_id),
            idp_sso_url: string("SAML_IDP_SSO_URL", defaults.idp_sso_url),
            idp_slo_url: string("SAML_IDP_SLO_URL", defaults.idp_slo_url),
            idp_descriptor_url: string("SAML_IDP_DESCRIPTOR_URL", defaults.idp_descriptor_url),
            idp_certificate_pem: pem("SAML_IDP_CERTIFICATE_PEM"),
            compress_request: flag("SAML_COMPRESS_REQUEST", defaults.compress_request),
            compress_response: flag("SAML_COMPRESS_RESPONSE", defaults.compress_response),
            signature_algorithm: string("SAML_SIGNATURE_ALGORITHM", defaults.signature_algorithm),
            max_message_size: lookup("SAML_MAX_MESSAGE_SIZE")
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.max_message_size),
        }
    }
}

impl TryFrom<SamlConfig> for Settings {
    type Error = SamlError;

    fn try_from(config: SamlConfig) -> Result<Self, Self::Error> {
        let private_key = config
            .sp_private_key_pem
            .as_deref()
            .map(PrivateKey::from_pem)
            .transpose()
            .map_err(|e| SamlError::Config(format!("SP private key: {e}")))?;
        let sp_certificate = parse_certificate(config.sp_certificate_pem.as_deref(), "SP")?;
        let idp_certificate = parse_certificate(config.idp_certificate_pem.as_deref(), "IdP")?;
        let signature_algorithm: SignatureAlgorithm = config
            .signature_algorithm
            .parse()
            .map_err(|e: SamlError| SamlError::Config(e.to_string()))?;

        let settings = Self {
            sp: ServiceProviderSettings {
                entity_id: config.sp_entity_id,
                certificate: sp_certificate,
                private_key,
                assertion_consumer_service_url: config.sp_acs_url,
                single_logout_service_url: config.sp_slo_url,
                sign_request: config.sp_sign_request,
            },
            idp: IdentityProviderSettings {
                entity_id: config.idp_entity_id,
                single_sign_on_url: config.idp_sso_url,
                single_logout_url: config.idp_slo_url,
                single_sign_on_descriptor_url: config.idp_descriptor_url,
                certificate: idp_certificate,
            },
            compress: CompressionSettings {
                request: config.compress_request,
                response: config.compress_response,
            },
            signature_algorithm,
            max_message_size: config.max_message_size,
        };
        settings.validate()?;
        Ok(settings)
    }
}

fn parse_certificate(pem: Option<&str>, party: &str) -> Result<Option<Certificate>, SamlError> {
    pem.map(Certificate::from_pem)
        .transpose()
        .map_err(|e| SamlError::Config(format!("{party} certificate: {e}")))
}
