//! Common test utilities and fixtures.

#![allow(dead_code)]

use aws_lc_rs::encoding::{AsDer, Pkcs8V1Der};
use aws_lc_rs::rsa::{KeyPair, KeySize};
use chrono::{DateTime, Utc};

use saml_crypto::{Certificate, PrivateKey};
use saml_protocol::{
    Assertion, Attribute, AttributeStatement, AuthnContextClass, AuthnStatement,
    CompressionSettings, Conditions, NameId, Response, Settings, Subject, SubjectConfirmation,
    SubjectConfirmationData,
};

pub const SP_ENTITY_ID: &str = "https://sp.example.com/metadata";
pub const SP_ACS_URL: &str = "https://sp.example.com/saml/acs";
pub const SP_SLO_URL: &str = "https://sp.example.com/saml/slo";
pub const IDP_ENTITY_ID: &str = "https://idp.example.com/metadata";
pub const IDP_SSO_URL: &str = "https://idp.example.com/saml/sso";
pub const IDP_SLO_URL: &str = "https://idp.example.com/saml/slo";

/// One side of the exchange: an RSA-2048 key and a self-signed certificate for it.
pub struct Party {
    pub key: PrivateKey,
    pub certificate: Certificate,
    pub key_pem: String,
    pub certificate_pem: String,
}

impl Party {
    /// Generates a fresh key pair and certificate for `host`.
    pub fn generate(host: &str) -> anyhow::Result<Self> {
        let key_pair = KeyPair::generate(KeySize::Rsa2048)?;
        let pkcs8: Pkcs8V1Der<'static> = key_pair.as_der()?;
        let der: &[u8] = pkcs8.as_ref();
        let key = PrivateKey::from_der(der)?;
        let key_pem = key.to_pem()?;

        let rcgen_key = rcgen::KeyPair::try_from(der)?;
        let cert = rcgen::CertificateParams::new(vec![host.to_string()])?.self_signed(&rcgen_key)?;

        Ok(Self {
            key,
            certificate: Certificate::from_der(cert.der())?,
            key_pem,
            certificate_pem: cert.pem(),
        })
    }
}

/// Installs a test subscriber once; later calls are no-ops.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("saml_protocol=debug")
        .with_test_writer()
        .try_init();
}

/// SP settings trusting `idp`, signing with `sp`, compression on.
pub fn settings(sp: &Party, idp: &Party) -> Settings {
    let mut settings = Settings::default();
    settings.sp.entity_id = SP_ENTITY_ID.into();
    settings.sp.assertion_consumer_service_url = SP_ACS_URL.into();
    settings.sp.single_logout_service_url = SP_SLO_URL.into();
    settings.sp.private_key = Some(sp.key.clone());
    settings.sp.certificate = Some(sp.certificate.clone());
    settings.sp.sign_request = true;
    settings.idp.entity_id = IDP_ENTITY_ID.into();
    settings.idp.single_sign_on_url = IDP_SSO_URL.into();
    settings.idp.single_logout_url = IDP_SLO_URL.into();
    settings.idp.certificate = Some(idp.certificate.clone());
    settings.compress = CompressionSettings::both();
    settings
}

/// The IdP settings mirroring `settings`: signing with `idp`, addressing the SP.
pub fn idp_settings(idp: &Party) -> Settings {
    let mut settings = Settings::default();
    settings.sp.entity_id = IDP_ENTITY_ID.into();
    settings.sp.private_key = Some(idp.key.clone());
    settings.sp.certificate = Some(idp.certificate.clone());
    settings.sp.sign_request = true;
    settings.idp.single_logout_url = SP_SLO_URL.into();
    settings.compress = CompressionSettings::both();
    settings
}

/// A successful, unsigned Response the IdP would send for `request_id`.
pub fn idp_response(request_id: &str, now: DateTime<Utc>) -> Response {
    let assertion = Assertion::new(IDP_ENTITY_ID)
        .with_subject(
            Subject::new(NameId::email("alice@example.com")).with_confirmation(
                SubjectConfirmation::bearer().with_data(
                    SubjectConfirmationData::for_request(request_id, SP_ACS_URL, now, 5)
                        .expect("confirmation expiry in range"),
                ),
            ),
        )
        .with_conditions(Conditions::with_validity(now, 5)
                .expect("conditions window in range")
                .with_audience(SP_ENTITY_ID))
        .with_authn_statement(
            AuthnStatement::new(now, AuthnContextClass::PasswordProtectedTransport)
                .with_session_index("_session-1"),
        )
        .with_attribute_statement(
            AttributeStatement::new()
                .with_attribute(
                    Attribute::single("urn:oid:0.9.2342.19200300.100.1.3", "alice@example.com")
                        .with_friendly_name("mail"),
                )
                .with_attribute(Attribute::multi(
                    "groups",
                    vec!["admins".to_string(), "users".to_string()],
                )),
        );

    Response::success(IDP_ENTITY_ID)
        .in_response_to(request_id)
        .with_destination(SP_ACS_URL)
        .with_assertion(assertion)
}

/// Returns the raw value of query parameter `name` in `url`.
pub fn query_param<'a>(url: &'a str, name: &str) -> Option<&'a str> {
    url.split_once('?')?
        .1
        .split('&')
        .find_map(|pair| pair.strip_prefix(name)?.strip_prefix('='))
}
