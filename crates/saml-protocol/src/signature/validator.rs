//! XML Signature validation.
//!
//! Verifies enveloped signatures against a single trusted certificate. The
//! certificate embedded in `KeyInfo` is never trusted on its own.

use base64::Engine;
use saml_crypto::Certificate;

use super::{digest_from_uri, strip_whitespace, SignatureAlgorithm, XmlSignature};
use crate::error::{SamlError, SamlResult};
use crate::settings::Settings;
use crate::types::{transform_algorithms, MessageKind, EXC_C14N_NS, SAMLP_NS, SAML_NS, XMLDSIG_NS};
use crate::xml::c14n::{canonicalize, C14nOptions};
use crate::xml::Element;

/// Signatures found and verified in a Response document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VerifiedSignatures {
    /// Whether the Response itself was signed.
    pub response: bool,
    /// IDs of the signed assertions.
    pub assertions: Vec<String>,
}

impl VerifiedSignatures {
    /// Returns true if no signature was present at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        !self.response && self.assertions.is_empty()
    }
}

/// XML signature validator.
///
/// Validates signatures on SAML documents using the counterparty certificate.
#[derive(Debug, Clone, Copy)]
pub struct XmlSignatureValidator<'a> {
    certificate: &'a Certificate,
}

impl<'a> XmlSignatureValidator<'a> {
    /// Creates a validator trusting `certificate`.
    #[must_use]
    pub const fn new(certificate: &'a Certificate) -> Self {
        Self { certificate }
    }

    /// Creates a validator trusting the IdP certificate in `settings`.
    ///
    /// # Errors
    ///
    /// Returns [`SamlError::Config`] if no IdP certificate is configured.
    pub fn from_settings(settings: &'a Settings) -> SamlResult<Self> {
        settings.idp_certificate().map(Self::new)
    }

    /// Parses `xml` and verifies the signature of the element with `id`.
    ///
    /// # Errors
    ///
    /// See [`XmlSignatureValidator::verify_element`].
    pub fn verify_xml(&self, xml: &str, id: &str) -> SamlResult<SignatureAlgorithm> {
        self.verify_element(&Element::parse(xml)?, id)
    }

    /// Verifies the enveloped signature of the element with `id` inside `root`.
    ///
    /// # Errors
    ///
    /// - [`SamlError::SignatureMissing`] if the element has no `ds:Signature` child
    /// - [`SamlError::SignatureInvalid`] if the reference does not point at the
    ///   element, the ID is not unique, or the signature value does not verify
    /// - [`SamlError::SignatureAlgorithmUnsupported`] for unknown methods or transforms
    /// - [`SamlError::DigestMismatch`] if the element changed after signing
    pub fn verify_element(&self, root: &Element, id: &str) -> SamlResult<SignatureAlgorithm> {
        let result = self.verify_unchecked(root, id);
        match &result {
            Ok(algorithm) => {
                tracing::debug!(id, algorithm = algorithm.uri(), "XML signature verified");
            }
            Err(e) if e.is_trust_failure() => {
                tracing::warn!(id, error = %e, "XML signature rejected");
            }
            Err(_) => {}
        }
        result
    }

    fn verify_unchecked(&self, root: &Element, id: &str) -> SamlResult<SignatureAlgorithm> {
        match count_ids(root, id) {
            0 => {
                return Err(SamlError::SchemaMismatch(format!("no element with ID '{id}'")));
            }
            1 => {}
            _ => {
                return Err(SamlError::SignatureInvalid(format!("ID '{id}' is not unique")));
            }
        }
        let target = root
            .find_by_id(id)
            .ok_or_else(|| SamlError::SchemaMismatch(format!("no element with ID '{id}'")))?;
        let signature_el = target
            .child_element(XMLDSIG_NS, "Signature")
            .ok_or_else(|| SamlError::SignatureMissing(format!("<{}> is not signed", target.name)))?;
        let signature = XmlSignature::from_element(signature_el)
            .map_err(|e| SamlError::SignatureInvalid(e.to_string()))?;

        if signature.reference_id() != Some(id) {
            return Err(SamlError::SignatureInvalid(format!(
                "reference '{}' does not point at '{id}'",
                signature.reference_uri
            )));
        }
        if signature.canonicalization_method != transform_algorithms::EXCLUSIVE_C14N {
            return Err(SamlError::SignatureAlgorithmUnsupported(
                signature.canonicalization_method,
            ));
        }
        if let Some(unknown) = signature.transforms.iter().find(|t| {
            *t != transform_algorithms::ENVELOPED_SIGNATURE
                && *t != transform_algorithms::EXCLUSIVE_C14N
        }) {
            return Err(SamlError::SignatureAlgorithmUnsupported(unknown.clone()));
        }
        let digest_algorithm = digest_from_uri(&signature.digest_method).ok_or_else(|| {
            SamlError::SignatureAlgorithmUnsupported(signature.digest_method.clone())
        })?;
        let algorithm = SignatureAlgorithm::from_uri(&signature.signature_method).ok_or_else(|| {
            SamlError::SignatureAlgorithmUnsupported(signature.signature_method.clone())
        })?;

        let mut scope = root
            .namespaces_in_scope(id)
            .ok_or_else(|| SamlError::SchemaMismatch(format!("no element with ID '{id}'")))?;

        let canonical = canonicalize(
            target,
            &C14nOptions {
                inherited: &scope,
                inclusive_prefixes: &signature.inclusive_prefixes,
                enveloped: signature
                    .transforms
                    .iter()
                    .any(|t| t == transform_algorithms::ENVELOPED_SIGNATURE),
            },
        );
        let computed = saml_crypto::digest(digest_algorithm, canonical.as_bytes());
        let expected = base64::engine::general_purpose::STANDARD
            .decode(&signature.digest_value)
            .map_err(|_| SamlError::SignatureInvalid("DigestValue is not valid base64".into()))?;
        if computed != expected {
            return Err(SamlError::DigestMismatch(signature.reference_uri));
        }

        let signed_info = signature_el
            .child_element(XMLDSIG_NS, "SignedInfo")
            .ok_or_else(|| SamlError::SignatureInvalid("Signature has no SignedInfo".into()))?;
        let signed_info_prefixes = signed_info
            .child_element(XMLDSIG_NS, "CanonicalizationMethod")
            .and_then(|method| method.child_element(EXC_C14N_NS, "InclusiveNamespaces"))
            .and_then(|inclusive| inclusive.attribute("PrefixList"))
            .map(|list| list.split_whitespace().map(str::to_string).collect::<Vec<_>>())
            .unwrap_or_default();
        scope.extend(signature_el.namespaces.iter().cloned());
        let canonical_signed_info = canonicalize(
            signed_info,
            &C14nOptions {
                inherited: &scope,
                inclusive_prefixes: &signed_info_prefixes,
                enveloped: false,
            },
        );

        let value = base64::engine::general_purpose::STANDARD
            .decode(strip_whitespace(&signature.signature_value))
            .map_err(|_| SamlError::SignatureInvalid("SignatureValue is not valid base64".into()))?;
        self.certificate
            .verify(algorithm.rsa(), canonical_signed_info.as_bytes(), &value)?;

        Ok(algorithm)
    }

    /// Verifies the Response-level signature and every signed Assertion.
    ///
    /// Unsigned parts are skipped; whether a signature is required is decided
    /// by [`Response::validate`](crate::types::Response::validate).
    ///
    /// # Errors
    ///
    /// Returns [`SamlError::SchemaMismatch`] if `root` is not a Response, and
    /// the first failure of [`XmlSignatureValidator::verify_element`].
    pub fn verify_response(&self, root: &Element) -> SamlResult<VerifiedSignatures> {
        if !root.is(SAMLP_NS, MessageKind::Response.element_name()) {
            return Err(SamlError::SchemaMismatch(format!(
                "expected <samlp:Response>, found <{}>",
                root.qualified_name()
            )));
        }

        let mut verified = VerifiedSignatures::default();
        if root.child_element(XMLDSIG_NS, "Signature").is_some() {
            let id = signed_id(root)?;
            self.verify_element(root, id)?;
            verified.response = true;
        }
        for assertion in root.child_elements(SAML_NS, "Assertion") {
            if assertion.child_element(XMLDSIG_NS, "Signature").is_some() {
                let id = signed_id(assertion)?;
                self.verify_element(root, id)?;
                verified.assertions.push(id.to_string());
            }
        }
        Ok(verified)
    }
}

fn signed_id(el: &Element) -> SamlResult<&str> {
    el.attribute("ID")
        .filter(|id| !id.is_empty())
        .ok_or_else(|| SamlError::SignatureInvalid(format!("signed <{}> has no ID", el.name)))
}

fn count_ids(el: &Element, id: &str) -> usize {
    usize::from(el.attribute("ID") == Some(id))
        + el.elements().map(|child| count_ids(child, id)).sum::<usize>()
}
