//! Namespace and URI table.
//!
//! Every URI the service provider writes or compares lives here once; the
//! enums below map onto these constants rather than repeating the literals.

/// SAML 2.0 assertion namespace URI.
pub const SAML_NS: &str = "urn:oasis:names:tc:SAML:2.0:assertion";

/// SAML 2.0 protocol namespace URI.
pub const SAMLP_NS: &str = "urn:oasis:names:tc:SAML:2.0:protocol";

/// XML Digital Signature namespace URI.
pub const XMLDSIG_NS: &str = "http://www.w3.org/2000/09/xmldsig#";

/// Exclusive canonicalization namespace, also used for `InclusiveNamespaces`.
pub const EXC_C14N_NS: &str = "http://www.w3.org/2001/10/xml-exc-c14n#";

/// The only protocol version this crate speaks.
pub const SAML_VERSION: &str = "2.0";

/// Bearer subject confirmation method.
pub const BEARER_CONFIRMATION: &str = "urn:oasis:names:tc:SAML:2.0:cm:bearer";

/// `ProtocolBinding` URIs.
pub mod binding_uris {
    /// HTTP-POST.
    pub const HTTP_POST: &str = "urn:oasis:names:tc:SAML:2.0:bindings:HTTP-POST";
    /// HTTP-Redirect.
    pub const HTTP_REDIRECT: &str = "urn:oasis:names:tc:SAML:2.0:bindings:HTTP-Redirect";
}

/// `NameID` `Format` URIs.
pub mod name_id_formats {
    /// Unspecified.
    pub const UNSPECIFIED: &str = "urn:oasis:names:tc:SAML:1.1:nameid-format:unspecified";
    /// Email address.
    pub const EMAIL: &str = "urn:oasis:names:tc:SAML:1.1:nameid-format:emailAddress";
    /// Persistent pseudonym.
    pub const PERSISTENT: &str = "urn:oasis:names:tc:SAML:2.0:nameid-format:persistent";
    /// Transient pseudonym.
    pub const TRANSIENT: &str = "urn:oasis:names:tc:SAML:2.0:nameid-format:transient";
}

/// `AuthnContextClassRef` URIs.
pub mod authn_context_classes {
    /// Unspecified.
    pub const UNSPECIFIED: &str = "urn:oasis:names:tc:SAML:2.0:ac:classes:unspecified";
    /// Password over an unprotected channel.
    pub const PASSWORD: &str = "urn:oasis:names:tc:SAML:2.0:ac:classes:Password";
    /// Password over TLS.
    pub const PASSWORD_PROTECTED_TRANSPORT: &str =
        "urn:oasis:names:tc:SAML:2.0:ac:classes:PasswordProtectedTransport";
}

/// Top-level status codes.
pub mod status_codes {
    /// Success.
    pub const SUCCESS: &str = "urn:oasis:names:tc:SAML:2.0:status:Success";
    /// The requester is at fault.
    pub const REQUESTER: &str = "urn:oasis:names:tc:SAML:2.0:status:Requester";
    /// The responder is at fault.
    pub const RESPONDER: &str = "urn:oasis:names:tc:SAML:2.0:status:Responder";
}

/// Second-level status codes.
pub mod sub_status_codes {
    /// Authentication failed.
    pub const AUTHN_FAILED: &str = "urn:oasis:names:tc:SAML:2.0:status:AuthnFailed";
    /// Only some session participants were logged out.
    pub const PARTIAL_LOGOUT: &str = "urn:oasis:names:tc:SAML:2.0:status:PartialLogout";
    /// The request cannot be processed, for example because of its algorithm.
    pub const REQUEST_UNSUPPORTED: &str = "urn:oasis:names:tc:SAML:2.0:status:RequestUnsupported";
}

/// `SignatureMethod` and `SigAlg` URIs.
pub mod signature_algorithms {
    /// RSA-SHA256.
    pub const RSA_SHA256: &str = "http://www.w3.org/2001/04/xmldsig-more#rsa-sha256";
    /// RSA-SHA384.
    pub const RSA_SHA384: &str = "http://www.w3.org/2001/04/xmldsig-more#rsa-sha384";
    /// RSA-SHA512.
    pub const RSA_SHA512: &str = "http://www.w3.org/2001/04/xmldsig-more#rsa-sha512";
    /// Legacy RSA-SHA1, accepted for verification only.
    pub const RSA_SHA1: &str = "http://www.w3.org/2000/09/xmldsig#rsa-sha1";
}

/// `DigestMethod` URIs.
pub mod digest_algorithms {
    /// SHA-256.
    pub const SHA256: &str = "http://www.w3.org/2001/04/xmlenc#sha256";
    /// SHA-384.
    pub const SHA384: &str = "http://www.w3.org/2001/04/xmldsig-more#sha384";
    /// SHA-512.
    pub const SHA512: &str = "http://www.w3.org/2001/04/xmlenc#sha512";
    /// Legacy SHA-1.
    pub const SHA1: &str = "http://www.w3.org/2000/09/xmldsig#sha1";
}

/// Reference `Transform` URIs.
pub mod transform_algorithms {
    /// Enveloped signature.
    pub const ENVELOPED_SIGNATURE: &str = "http://www.w3.org/2000/09/xmldsig#enveloped-signature";
    /// Exclusive canonicalization without comments.
    pub const EXCLUSIVE_C14N: &str = super::EXC_C14N_NS;
}

/// Binding named in an AuthnRequest's `ProtocolBinding`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SamlBinding {
    /// HTTP-POST.
    HttpPost,
    /// HTTP-Redirect.
    HttpRedirect,
}

impl SamlBinding {
    /// Returns the binding URI.
    #[must_use]
    pub const fn uri(&self) -> &'static str {
        match self {
            Self::HttpPost => binding_uris::HTTP_POST,
            Self::HttpRedirect => binding_uris::HTTP_REDIRECT,
        }
    }

    /// Maps a binding URI back, `None` for bindings this crate does not speak.
    #[must_use]
    pub fn from_uri(uri: &str) -> Option<Self> {
        match uri {
            binding_uris::HTTP_POST => Some(Self::HttpPost),
            binding_uris::HTTP_REDIRECT => Some(Self::HttpRedirect),
            _ => None,
        }
    }
}

/// Well-known `NameID` formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum NameIdFormat {
    /// Unspecified.
    #[default]
    Unspecified,
    /// Email address.
    Email,
    /// Persistent pseudonym.
    Persistent,
    /// Transient pseudonym.
    Transient,
}

impl NameIdFormat {
    /// Returns the format URI.
    #[must_use]
    pub const fn uri(&self) -> &'static str {
        match self {
            Self::Unspecified => name_id_formats::UNSPECIFIED,
            Self::Email => name_id_formats::EMAIL,
            Self::Persistent => name_id_formats::PERSISTENT,
            Self::Transient => name_id_formats::TRANSIENT,
        }
    }

    /// Maps a format URI back; other formats stay available as raw strings.
    #[must_use]
    pub fn from_uri(uri: &str) -> Option<Self> {
        match uri {
            name_id_formats::UNSPECIFIED => Some(Self::Unspecified),
            name_id_formats::EMAIL => Some(Self::Email),
            name_id_formats::PERSISTENT => Some(Self::Persistent),
            name_id_formats::TRANSIENT => Some(Self::Transient),
            _ => None,
        }
    }
}

/// Authentication context classes the SP requests or an IdP reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum AuthnContextClass {
    /// Unspecified.
    #[default]
    Unspecified,
    /// Password.
    Password,
    /// Password over TLS.
    PasswordProtectedTransport,
}

impl AuthnContextClass {
    /// Returns the class URI.
    #[must_use]
    pub const fn uri(&self) -> &'static str {
        match self {
            Self::Unspecified => authn_context_classes::UNSPECIFIED,
            Self::Password => authn_context_classes::PASSWORD,
            Self::PasswordProtectedTransport => authn_context_classes::PASSWORD_PROTECTED_TRANSPORT,
        }
    }
}
