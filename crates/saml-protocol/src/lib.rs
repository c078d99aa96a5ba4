//! SAML 2.0 service provider protocol engine.
//!
//! This crate provides the message-level half of SAML 2.0 web single sign-on
//! and single logout:
//!
//! - **Message model** - AuthnRequest, Response, LogoutRequest and LogoutResponse
//!   with XML serialization and structural parsing
//! - **Bindings** - HTTP-Redirect (optionally deflated) and HTTP-POST codecs
//! - **XML signature** - enveloped XML-DSig with exclusive canonicalization
//! - **Query signatures** - signing and verifying redirect-binding queries
//! - **Service provider flows** - settings-driven URL building and parsing
//!
//! # Architecture
//!
//! - [`types`] - Core SAML types and data structures
//! - [`xml`] - Namespace-aware XML tree and exclusive canonicalization
//! - [`bindings`] - POST and Redirect binding implementations
//! - [`signature`] - XML and query signature signing and validation
//! - [`settings`] / [`config`] - Parsed settings and their plain-data source
//! - [`sp`] - Service provider flows built from the above
//! - [`error`] - Error types for SAML operations
//!
//! Parsing never implies trust: signatures are verified by the
//! [`signature`] handlers and by [`sp::parse_authn_response`], not by
//! [`SamlMessage::from_xml`].
//!
//! # Example
//!
//! ```rust,ignore
//! use saml_protocol::{config::SamlConfig, sp, Settings};
//!
//! let settings = Settings::try_from(SamlConfig::from_env())?;
//! let url = sp::authn_request_url(&settings, Some("/after-login"))?;
//! // redirect the browser to `url`, then on the ACS endpoint:
//! let response = sp::parse_authn_response(&settings, &form_value)?;
//! response.validate(&settings, chrono::Utc::now())?;
//! ```
//!
//! # SAML Specifications
//!
//! - [SAML 2.0 Core](https://docs.oasis-open.org/security/saml/v2.0/saml-core-2.0-os.pdf)
//! - [SAML 2.0 Bindings](https://docs.oasis-open.org/security/saml/v2.0/saml-bindings-2.0-os.pdf)
//! - [SAML 2.0 Profiles](https://docs.oasis-open.org/security/saml/v2.0/saml-profiles-2.0-os.pdf)
//! - [XML Signature](https://www.w3.org/TR/xmldsig-core1/)
//! - [Exclusive XML Canonicalization](https://www.w3.org/TR/xml-exc-c14n/)

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod bindings;
pub mod config;
pub mod error;
pub mod settings;
pub mod signature;
pub mod sp;
pub mod types;
pub mod xml;

pub use bindings::{HttpPostBinding, HttpRedirectBinding, RedirectQuery};
pub use error::{SamlError, SamlResult};
pub use settings::{CompressionSettings, IdentityProviderSettings, ServiceProviderSettings, Settings};
pub use signature::{QuerySigner, Received, SignatureAlgorithm, XmlSignatureValidator, XmlSigner};
pub use types::*;
