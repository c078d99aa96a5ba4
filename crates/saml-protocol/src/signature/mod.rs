//! Signature support for SAML.
//!
//! Two independent mechanisms live here:
//!
//! - [`query`]: the HTTP-Redirect binding signature over the raw query string
//! - [`XmlSigner`] / [`XmlSignatureValidator`]: enveloped XML-DSig blocks
//!   embedded in Responses and Assertions, canonicalized with exclusive c14n
//!
//! # Signing Algorithms
//!
//! The following signature algorithms are supported:
//! - RSA-SHA256 (recommended)
//! - RSA-SHA384
//! - RSA-SHA512
//!
//! Legacy RSA-SHA1 is accepted when verifying but never produced.

pub mod query;
mod signer;
mod validator;

use std::str::FromStr;

pub use query::{QuerySigner, Received};
pub use signer::*;
pub use validator::*;

use saml_crypto::{DigestAlgorithm, RsaAlgorithm};
use serde::{Deserialize, Serialize};

use crate::error::{SamlError, SamlResult};
use crate::types::{
    digest_algorithms, signature_algorithms, transform_algorithms, EXC_C14N_NS, XMLDSIG_NS,
};
use crate::xml::Element;

/// Signature algorithm selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum SignatureAlgorithm {
    /// RSA with SHA-256 (recommended).
    #[default]
    RsaSha256,
    /// RSA with SHA-384.
    RsaSha384,
    /// RSA with SHA-512.
    RsaSha512,
    /// Legacy RSA with SHA-1 (verification only).
    RsaSha1,
}

impl SignatureAlgorithm {
    /// Returns the URI for this signature algorithm.
    #[must_use]
    pub const fn uri(&self) -> &'static str {
        match self {
            Self::RsaSha256 => signature_algorithms::RSA_SHA256,
            Self::RsaSha384 => signature_algorithms::RSA_SHA384,
            Self::RsaSha512 => signature_algorithms::RSA_SHA512,
            Self::RsaSha1 => signature_algorithms::RSA_SHA1,
        }
    }

    /// Returns the corresponding digest algorithm URI.
    #[must_use]
    pub const fn digest_uri(&self) -> &'static str {
        match self {
            Self::RsaSha256 => digest_algorithms::SHA256,
            Self::RsaSha384 => digest_algorithms::SHA384,
            Self::RsaSha512 => digest_algorithms::SHA512,
            Self::RsaSha1 => digest_algorithms::SHA1,
        }
    }

    /// Parses a signature algorithm from its URI.
    #[must_use]
    pub fn from_uri(uri: &str) -> Option<Self> {
        match uri {
            signature_algorithms::RSA_SHA256 => Some(Self::RsaSha256),
            signature_algorithms::RSA_SHA384 => Some(Self::RsaSha384),
            signature_algorithms::RSA_SHA512 => Some(Self::RsaSha512),
            signature_algorithms::RSA_SHA1 => Some(Self::RsaSha1),
            _ => None,
        }
    }

    /// Returns the RSA primitive behind this algorithm.
    #[must_use]
    pub const fn rsa(&self) -> RsaAlgorithm {
        match self {
            Self::RsaSha256 => RsaAlgorithm::Sha256,
            Self::RsaSha384 => RsaAlgorithm::Sha384,
            Self::RsaSha512 => RsaAlgorithm::Sha512,
            Self::RsaSha1 => RsaAlgorithm::Sha1,
        }
    }

    /// Returns the digest used for references signed with this algorithm.
    #[must_use]
    pub const fn digest(&self) -> DigestAlgorithm {
        self.rsa().digest()
    }

    /// Returns true if this algorithm uses a deprecated hash (SHA-1).
    #[must_use]
    pub const fn is_deprecated(&self) -> bool {
        matches!(self, Self::RsaSha1)
    }

    /// Fails unless this algorithm may be used to produce signatures.
    ///
    /// # Errors
    ///
    /// Returns [`SamlError::SignatureAlgorithmUnsupported`] for RSA-SHA1.
    pub fn ensure_can_sign(&self) -> SamlResult<()> {
        if self.is_deprecated() {
            return Err(SamlError::SignatureAlgorithmUnsupported(format!(
                "{} is accepted for verification only",
                self.uri()
            )));
        }
        Ok(())
    }
}

impl FromStr for SignatureAlgorithm {
    type Err = SamlError;

    /// Accepts the algorithm URI or a short name such as `rsa-sha256` or `RS256`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Some(alg) = Self::from_uri(s) {
            return Ok(alg);
        }
        match s.trim().to_ascii_lowercase().as_str() {
            "rsa-sha256" | "rs256" => Ok(Self::RsaSha256),
            "rsa-sha384" | "rs384" => Ok(Self::RsaSha384),
            "rsa-sha512" | "rs512" => Ok(Self::RsaSha512),
            "rsa-sha1" | "rs1" => Ok(Self::RsaSha1),
            _ => Err(SamlError::SignatureAlgorithmUnsupported(s.to_string())),
        }
    }
}

/// Maps a `DigestMethod` URI to its algorithm.
#[must_use]
pub fn digest_from_uri(uri: &str) -> Option<DigestAlgorithm> {
    match uri {
        digest_algorithms::SHA256 => Some(DigestAlgorithm::Sha256),
        digest_algorithms::SHA384 => Some(DigestAlgorithm::Sha384),
        digest_algorithms::SHA512 => Some(DigestAlgorithm::Sha512),
        digest_algorithms::SHA1 => Some(DigestAlgorithm::Sha1),
        _ => None,
    }
}

/// XML Signature structure.
///
/// Represents the `<ds:Signature>` element in signed SAML documents. Algorithm
/// identifiers are kept as URIs so that a signature with an unknown method
/// still parses; the validator decides whether it is acceptable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct XmlSignature {
    /// `CanonicalizationMethod` URI.
    pub canonicalization_method: String,
    /// `SignatureMethod` URI.
    pub signature_method: String,
    /// Reference URI, `#` followed by the ID of the signed element.
    pub reference_uri: String,
    /// Transform URIs, in order.
    pub transforms: Vec<String>,
    /// `InclusiveNamespaces PrefixList` of the exc-c14n transform.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub inclusive_prefixes: Vec<String>,
    /// `DigestMethod` URI.
    pub digest_method: String,
    /// The digest value (base64 encoded).
    pub digest_value: String,
    /// The signature value (base64 encoded).
    pub signature_value: String,
    /// Optional X.509 certificate (base64 encoded, DER format).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub x509_certificate: Option<String>,
}

impl XmlSignature {
    /// Creates an unsigned signature block for the element with `reference_id`.
    ///
    /// The digest and signature values are filled in by [`XmlSigner`].
    #[must_use]
    pub fn new(algorithm: SignatureAlgorithm, reference_id: &str) -> Self {
        Self {
            canonicalization_method: transform_algorithms::EXCLUSIVE_C14N.to_string(),
            signature_method: algorithm.uri().to_string(),
            reference_uri: format!("#{reference_id}"),
            transforms: vec![
                transform_algorithms::ENVELOPED_SIGNATURE.to_string(),
                transform_algorithms::EXCLUSIVE_C14N.to_string(),
            ],
            inclusive_prefixes: Vec::new(),
            digest_method: algorithm.digest_uri().to_string(),
            digest_value: String::new(),
            signature_value: String::new(),
            x509_certificate: None,
        }
    }

    /// Returns the ID the reference points at, if it is a same-document reference.
    #[must_use]
    pub fn reference_id(&self) -> Option<&str> {
        self.reference_uri.strip_prefix('#')
    }

    /// Builds the `ds:SignedInfo` element.
    #[must_use]
    pub fn signed_info_element(&self) -> Element {
        let transforms = self.transforms.iter().map(|uri| {
            let transform = ds("Transform").attr("Algorithm", uri.as_str());
            if uri == transform_algorithms::EXCLUSIVE_C14N && !self.inclusive_prefixes.is_empty() {
                transform.child(
                    Element::new("ec", "InclusiveNamespaces", EXC_C14N_NS)
                        .declare("ec", EXC_C14N_NS)
                        .attr("PrefixList", self.inclusive_prefixes.join(" ")),
                )
            } else {
                transform
            }
        });

        ds("SignedInfo")
            .declare("ds", XMLDSIG_NS)
            .child(ds("CanonicalizationMethod").attr("Algorithm", self.canonicalization_method.as_str()))
            .child(ds("SignatureMethod").attr("Algorithm", self.signature_method.as_str()))
            .child(
                ds("Reference")
                    .attr("URI", self.reference_uri.as_str())
                    .child(ds("Transforms").extend_children(transforms))
                    .child(ds("DigestMethod").attr("Algorithm", self.digest_method.as_str()))
                    .child(ds("DigestValue").text(self.digest_value.as_str())),
            )
    }

    /// Builds the complete `ds:Signature` element.
    #[must_use]
    pub fn to_element(&self) -> Element {
        let mut signed_info = self.signed_info_element();
        signed_info.namespaces.clear();

        ds("Signature")
            .declare("ds", XMLDSIG_NS)
            .child(signed_info)
            .child(ds("SignatureValue").text(self.signature_value.as_str()))
            .opt_child(self.x509_certificate.as_ref().map(|cert| {
                ds("KeyInfo").child(ds("X509Data").child(ds("X509Certificate").text(cert.as_str())))
            }))
    }

    /// Reads a `ds:Signature` element.
    ///
    /// # Errors
    ///
    /// Returns [`SamlError::SchemaMismatch`] if a mandatory part is missing.
    pub fn from_element(el: &Element) -> SamlResult<Self> {
        let missing = |what: &str| SamlError::SchemaMismatch(format!("Signature has no {what}"));
        let algorithm = |parent: &Element, name: &str| {
            parent
                .child_element(XMLDSIG_NS, name)
                .and_then(|child| child.attribute("Algorithm"))
                .map(str::to_string)
                .ok_or_else(|| missing(name))
        };

        let signed_info = el
            .child_element(XMLDSIG_NS, "SignedInfo")
            .ok_or_else(|| missing("SignedInfo"))?;
        let reference = signed_info
            .child_element(XMLDSIG_NS, "Reference")
            .ok_or_else(|| missing("Reference"))?;

        let mut transforms = Vec::new();
        let mut inclusive_prefixes = Vec::new();
        if let Some(list) = reference.child_element(XMLDSIG_NS, "Transforms") {
            for transform in list.child_elements(XMLDSIG_NS, "Transform") {
                let uri = transform
                    .attribute("Algorithm")
                    .ok_or_else(|| missing("Transform Algorithm"))?;
                transforms.push(uri.to_string());
                if let Some(prefixes) = transform
                    .child_element(EXC_C14N_NS, "InclusiveNamespaces")
                    .and_then(|inc| inc.attribute("PrefixList"))
                {
                    inclusive_prefixes.extend(prefixes.split_whitespace().map(str::to_string));
                }
            }
        }

        let text = |parent: &Element, name: &str| {
            parent
                .child_element(XMLDSIG_NS, name)
                .map(|child| strip_whitespace(&child.text_content()))
        };

        Ok(Self {
            canonicalization_method: algorithm(signed_info, "CanonicalizationMethod")?,
            signature_method: algorithm(signed_info, "SignatureMethod")?,
            reference_uri: reference.attribute("URI").unwrap_or_default().to_string(),
            transforms,
            inclusive_prefixes,
            digest_method: algorithm(reference, "DigestMethod")?,
            digest_value: text(reference, "DigestValue").ok_or_else(|| missing("DigestValue"))?,
            signature_value: text(el, "SignatureValue").ok_or_else(|| missing("SignatureValue"))?,
            x509_certificate: el
                .child_element(XMLDSIG_NS, "KeyInfo")
                .and_then(|info| info.child_element(XMLDSIG_NS, "X509Data"))
                .and_then(|data| text(data, "X509Certificate")),
        })
    }

    /// Reads the `ds:Signature` child of `parent`, if there is one.
    pub(crate) fn child_of(parent: &Element) -> SamlResult<Option<Self>> {
        parent
            .child_element(XMLDSIG_NS, "Signature")
            .map(Self::from_element)
            .transpose()
    }
}

fn ds(name: &str) -> Element {
    Element::new("ds", name, XMLDSIG_NS)
}

pub(crate) fn strip_whitespace(value: &str) -> String {
    value.chars().filter(|c| !c.is_ascii_whitespace()).collect()
}
