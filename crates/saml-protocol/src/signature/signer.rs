//! XML Signature creation.
//!
//! Produces enveloped `<ds:Signature>` blocks over exclusive-canonical XML.
//! The signature is inserted right after the signed element's `saml:Issuer`.

use base64::Engine;
use saml_crypto::{Certificate, PrivateKey};

use super::{SignatureAlgorithm, XmlSignature};
use crate::error::{SamlError, SamlResult};
use crate::settings::Settings;
use crate::types::{Response, SamlMessage, SAML_NS, XMLDSIG_NS};
use crate::xml::c14n::{canonicalize, C14nOptions};
use crate::xml::Element;

/// XML document signer.
///
/// Signs SAML documents using the configured private key.
#[derive(Debug, Clone)]
pub struct XmlSigner<'a> {
    key: &'a PrivateKey,
    certificate: Option<&'a Certificate>,
    algorithm: SignatureAlgorithm,
}

impl<'a> XmlSigner<'a> {
    /// Creates a new signer.
    ///
    /// # Errors
    ///
    /// Returns [`SamlError::SignatureAlgorithmUnsupported`] for RSA-SHA1.
    pub fn new(key: &'a PrivateKey, algorithm: SignatureAlgorithm) -> SamlResult<Self> {
        algorithm.ensure_can_sign()?;
        Ok(Self {
            key,
            certificate: None,
            algorithm,
        })
    }

    /// Creates a signer from the SP key, certificate and algorithm in `settings`.
    ///
    /// # Errors
    ///
    /// Returns [`SamlError::Config`] if no private key is configured.
    pub fn from_settings(settings: &'a Settings) -> SamlResult<Self> {
        let signer = Self::new(settings.signing_key()?, settings.signature_algorithm)?;
        Ok(match &settings.sp.certificate {
            Some(cert) => signer.with_certificate(cert),
            None => signer,
        })
    }

    /// Embeds `certificate` in `KeyInfo/X509Data`.
    #[must_use]
    pub fn with_certificate(mut self, certificate: &'a Certificate) -> Self {
        self.certificate = Some(certificate);
        self
    }

    /// Signs an XML document.
    ///
    /// # Arguments
    ///
    /// * `xml` - The XML document to sign
    /// * `reference_id` - The ID of the element to sign (without the '#' prefix)
    ///
    /// # Returns
    ///
    /// The signed XML document with the `<ds:Signature>` element inserted.
    ///
    /// # Errors
    ///
    /// Returns [`SamlError::MalformedXml`] if `xml` does not parse,
    /// [`SamlError::SchemaMismatch`] if no element carries `reference_id` or
    /// it is already signed, and [`SamlError::Crypto`] if signing fails.
    pub fn sign(&self, xml: &str, reference_id: &str) -> SamlResult<String> {
        let mut root = Element::parse(xml)?;
        self.sign_element(&mut root, reference_id)?;
        root.to_xml()
    }

    /// Signs every assertion of `response`, then the response itself.
    ///
    /// # Errors
    ///
    /// See [`XmlSigner::sign`].
    pub fn sign_response(&self, response: &Response) -> SamlResult<String> {
        let mut root = response.to_element();
        for assertion in &response.assertions {
            self.sign_element(&mut root, &assertion.id)?;
        }
        self.sign_element(&mut root, response.id())?;
        root.to_xml()
    }

    /// Signs the element with `reference_id` inside an already parsed tree.
    ///
    /// # Errors
    ///
    /// See [`XmlSigner::sign`].
    pub fn sign_element(&self, root: &mut Element, reference_id: &str) -> SamlResult<()> {
        let not_found =
            || SamlError::SchemaMismatch(format!("no element with ID '{reference_id}'"));
        let inherited = root.namespaces_in_scope(reference_id).ok_or_else(not_found)?;
        let target = root.find_by_id(reference_id).ok_or_else(not_found)?;
        if target.child_element(XMLDSIG_NS, "Signature").is_some() {
            return Err(SamlError::SchemaMismatch(format!(
                "element '{reference_id}' is already signed"
            )));
        }

        let canonical = canonicalize(
            target,
            &C14nOptions {
                inherited: &inherited,
                enveloped: true,
                ..C14nOptions::default()
            },
        );
        let digest = saml_crypto::digest(self.algorithm.digest(), canonical.as_bytes());

        let mut signature = XmlSignature::new(self.algorithm, reference_id);
        signature.digest_value = base64::engine::general_purpose::STANDARD.encode(digest);

        let signed_info = canonicalize(&signature.signed_info_element(), &C14nOptions::default());
        let value = self.key.sign(self.algorithm.rsa(), signed_info.as_bytes())?;
        signature.signature_value = base64::engine::general_purpose::STANDARD.encode(value);
        signature.x509_certificate = self.certificate.map(Certificate::to_base64);

        let target = root.find_by_id_mut(reference_id).ok_or_else(not_found)?;
        target.insert_after(SAML_NS, "Issuer", signature.to_element());

        tracing::debug!(
            element = target.name.as_str(),
            id = reference_id,
            algorithm = self.algorithm.uri(),
            "signed XML element"
        );
        Ok(())
    }
}
