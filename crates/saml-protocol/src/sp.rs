//! Service provider flows.
//!
//! Each function combines the model, the binding codec and the signature
//! handlers for one step of web single sign-on or single logout, driven
//! entirely by [`Settings`]. Nothing here performs I/O: outbound functions
//! return the URL to redirect the browser to, inbound functions take the
//! value the HTTP layer extracted.

use chrono::Utc;
use saml_crypto::Certificate;

use crate::bindings::{HttpRedirectBinding, RedirectQuery};
use crate::error::{SamlError, SamlResult};
use crate::settings::Settings;
use crate::signature::query::verify_parsed;
use crate::signature::{QuerySigner, Received, XmlSignatureValidator};
use crate::types::{
    generate_id, AuthnRequest, LogoutRequest, LogoutResponse, NameId, Response, SamlMessage,
    Status,
};
use crate::xml::Element;

/// Builds the IdP single sign-on URL carrying a fresh AuthnRequest.
///
/// # Errors
///
/// Returns [`SamlError::Config`] for an empty entity ID, or when signing is
/// on without a private key.
pub fn authn_request_url(settings: &Settings, relay_state: Option<&str>) -> SamlResult<String> {
    let request = AuthnRequest::build(settings, generate_id(), Utc::now())?;
    redirect_url(settings, &request, &settings.idp.single_sign_on_url, relay_state)
}

/// Builds the IdP single logout URL carrying a fresh LogoutRequest.
///
/// # Errors
///
/// See [`authn_request_url`].
pub fn logout_request_url(
    settings: &Settings,
    relay_state: Option<&str>,
    name_id: impl Into<NameId>,
    session_index: Option<&str>,
) -> SamlResult<String> {
    let request =
        LogoutRequest::build(settings, generate_id(), Utc::now(), name_id, session_index)?;
    redirect_url(settings, &request, &settings.idp.single_logout_url, relay_state)
}

/// Builds the IdP single logout URL answering an IdP-initiated logout.
///
/// # Errors
///
/// See [`authn_request_url`].
pub fn logout_response_url(
    settings: &Settings,
    in_response_to: &str,
    status: Status,
    relay_state: Option<&str>,
) -> SamlResult<String> {
    let response =
        LogoutResponse::build(settings, generate_id(), Utc::now(), in_response_to, status)?;
    redirect_url(settings, &response, &settings.idp.single_logout_url, relay_state)
}

/// Encodes `message` for the redirect binding, signs the query when
/// `sp.sign_request` is set, and appends it to `destination`.
///
/// # Errors
///
/// Returns [`SamlError::Config`] when signing is on without a private key,
/// and any encoding or signing failure.
pub fn redirect_url<M: SamlMessage>(
    settings: &Settings,
    message: &M,
    destination: &str,
    relay_state: Option<&str>,
) -> SamlResult<String> {
    let encoded = HttpRedirectBinding::encode(message, settings)?;
    let mut query = HttpRedirectBinding::query(M::KIND.message_type(), &encoded, relay_state);
    if settings.sp.sign_request {
        query = QuerySigner::from_settings(settings)?.sign_query(&query)?;
    }
    tracing::debug!(
        "built {} redirect to {} (signed: {})",
        M::KIND.element_name(),
        destination,
        settings.sp.sign_request
    );
    Ok(HttpRedirectBinding::url(destination, &query))
}

/// Decodes a `SAMLRequest` value into an AuthnRequest, inflating it if
/// `compress.request` is set.
///
/// # Errors
///
/// Returns [`SamlError::Codec`] or the parse errors of [`SamlMessage::from_xml`].
pub fn parse_authn_request(settings: &Settings, value: &str) -> SamlResult<AuthnRequest> {
    HttpRedirectBinding::decode(value, settings)
}

/// Decodes a `SAMLResponse` value and verifies every embedded signature
/// against the IdP certificate.
///
/// The value is inflated only if `compress.response` is set, so with
/// compression off this accepts exactly the POST binding. Timing, audience
/// and destination checks are left to [`Response::validate`].
///
/// # Errors
///
/// - [`SamlError::Codec`], [`SamlError::MalformedXml`] or [`SamlError::SchemaMismatch`]
///   if the value does not decode to a Response
/// - [`SamlError::Config`] if a signature is present but no IdP certificate is configured
/// - any trust failure of [`XmlSignatureValidator::verify_response`]
pub fn parse_authn_response(settings: &Settings, value: &str) -> SamlResult<Response> {
    let xml = HttpRedirectBinding::decode_value(
        value,
        settings.compress.response,
        settings.max_message_size,
    )?;
    let root = Element::parse(&xml)?;
    let response = Response::from_element(&root)?;

    let signed = response.signature.is_some()
        || response.assertions.iter().any(|a| a.signature.is_some());
    if signed {
        let verified = XmlSignatureValidator::from_settings(settings)?.verify_response(&root)?;
        tracing::debug!(
            "Response {} signatures verified (response: {}, assertions: {})",
            response.id,
            verified.response,
            verified.assertions.len()
        );
    } else {
        tracing::debug!("Response {} carries no signature", response.id);
    }
    Ok(response)
}

/// Decodes a `SAMLRequest` value into a LogoutRequest, inflating it if
/// `compress.request` is set.
///
/// # Errors
///
/// See [`parse_authn_request`].
pub fn parse_logout_request(settings: &Settings, value: &str) -> SamlResult<LogoutRequest> {
    HttpRedirectBinding::decode(value, settings)
}

/// Decodes a `SAMLResponse` value into a LogoutResponse, inflating it if
/// `compress.response` is set.
///
/// # Errors
///
/// See [`parse_authn_request`].
pub fn parse_logout_response(settings: &Settings, value: &str) -> SamlResult<LogoutResponse> {
    HttpRedirectBinding::decode(value, settings)
}

/// Receives a full redirect query.
///
/// When the query carries `SigAlg` and `Signature` they are verified against
/// `certificate` before the message is decoded. An unsigned query is accepted
/// and reported as such; use [`Received::require_signature`] to reject it.
///
/// # Errors
///
/// - [`SamlError::Codec`] if the query does not carry a message of type `M`
/// - [`SamlError::SignatureMissing`] if only one of `SigAlg` and `Signature` is present
/// - any trust failure of [`verify_query`](crate::signature::query::verify_query)
/// - the decoding errors of [`HttpRedirectBinding::decode`]
pub fn receive_redirect<M: SamlMessage>(
    settings: &Settings,
    query: &str,
    certificate: &Certificate,
) -> SamlResult<Received<M>> {
    let parsed = RedirectQuery::parse(query)?;
    let expected = M::KIND.message_type();
    if parsed.message_type != expected {
        return Err(SamlError::Codec(format!(
            "expected {} parameter, found {}",
            expected.form_param(),
            parsed.message_type.form_param()
        )));
    }

    let signature_algorithm = if parsed.sig_alg.is_none() && parsed.signature.is_none() {
        None
    } else {
        Some(verify_parsed(&parsed, certificate)?)
    };

    let message = HttpRedirectBinding::decode::<M>(parsed.message, settings)?;
    Ok(Received {
        message,
        relay_state: parsed.decoded_relay_state()?,
        signature_algorithm,
    })
}
