//! SAML bindings implementation.
//!
//! This module implements the SAML 2.0 bindings for message transport:
//!
//! - **HTTP-POST Binding** - Messages are base64-encoded and sent in HTML forms
//! - **HTTP-Redirect Binding** - Messages are optionally deflated, base64-encoded,
//!   and URL-encoded
//!
//! Whether a redirect payload is deflated is decided by local settings alone,
//! never by sniffing the payload. A flag that does not match the sender shows
//! up as a [`SamlError::Codec`], because every decoded payload must be UTF-8
//! text that starts with `<`.
//!
//! # Usage
//!
//! ```rust,ignore
//! use saml_protocol::bindings::{HttpPostBinding, HttpRedirectBinding};
//!
//! let value = HttpRedirectBinding::encode(&request, &settings)?;
//! let request: AuthnRequest = HttpRedirectBinding::decode(&value, &settings)?;
//!
//! let blob = HttpPostBinding::encode(&response)?;
//! let fields = HttpPostBinding::form_fields(SamlMessageType::Response, blob, Some("state"));
//! ```

mod post;
mod redirect;

pub use post::*;
pub use redirect::*;

pub use crate::types::SamlMessageType;

use base64::Engine;

use crate::error::{SamlError, SamlResult};

/// Base64-decodes a transport value, ignoring embedded ASCII whitespace.
pub(crate) fn decode_base64(value: &str, max_size: usize) -> SamlResult<Vec<u8>> {
    let compact: String = value.chars().filter(|c| !c.is_ascii_whitespace()).collect();
    if compact.is_empty() {
        return Err(SamlError::Codec("empty SAML message".into()));
    }
    // Base64 expands by 4/3, so reject oversized input before decoding it.
    if compact.len() / 4 * 3 > max_size.saturating_add(3) {
        return Err(SamlError::Codec(format!(
            "encoded message exceeds {max_size} bytes"
        )));
    }

    let bytes = base64::engine::general_purpose::STANDARD.decode(compact.as_bytes())?;
    ensure_within(bytes.len(), max_size)?;
    Ok(bytes)
}

/// Checks that a decoded payload is an XML document and returns it as text.
pub(crate) fn into_xml(bytes: Vec<u8>) -> SamlResult<String> {
    let xml = String::from_utf8(bytes)
        .map_err(|_| SamlError::Codec("decoded message is not UTF-8".into()))?;
    if !xml.trim_start().starts_with('<') {
        return Err(SamlError::Codec("decoded message is not XML".into()));
    }
    Ok(xml)
}

pub(crate) fn ensure_within(len: usize, max_size: usize) -> SamlResult<()> {
    if len > max_size {
        return Err(SamlError::Codec(format!("message exceeds {max_size} bytes")));
    }
    Ok(())
}
