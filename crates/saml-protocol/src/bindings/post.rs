//! HTTP-POST Binding implementation.
//!
//! Implements the SAML 2.0 HTTP-POST binding for sending SAML messages
//! via HTML form POST. The payload is plain base64; it is never compressed
//! and carries no query signature.

use base64::Engine;

use super::{decode_base64, into_xml, SamlMessageType};
use crate::error::SamlResult;
use crate::settings::Settings;
use crate::types::SamlMessage;

/// HTTP-POST binding encoder/decoder.
pub struct HttpPostBinding;

impl HttpPostBinding {
    /// Encodes a message into a base64 form value.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn encode<M: SamlMessage>(message: &M) -> SamlResult<String> {
        tracing::debug!(
            kind = M::KIND.element_name(),
            id = message.id(),
            "encoding message for POST binding"
        );
        Ok(Self::encode_xml(&message.to_xml()?))
    }

    /// Encodes raw XML into a base64 form value.
    #[must_use]
    pub fn encode_xml(xml: &str) -> String {
        base64::engine::general_purpose::STANDARD.encode(xml)
    }

    /// Decodes a form value into a message.
    ///
    /// # Errors
    ///
    /// Returns [`SamlError::Codec`](crate::SamlError::Codec) if the value cannot
    /// be decoded, and the parse errors of [`SamlMessage::from_xml`] otherwise.
    pub fn decode<M: SamlMessage>(value: &str, settings: &Settings) -> SamlResult<M> {
        let xml = Self::decode_value(value, settings.max_message_size)?;
        let message = M::from_xml(&xml)?;
        tracing::debug!(
            kind = M::KIND.element_name(),
            id = message.id(),
            "decoded message from POST binding"
        );
        Ok(message)
    }

    /// Decodes a base64 form value into raw XML.
    ///
    /// # Errors
    ///
    /// Returns [`SamlError::Codec`](crate::SamlError::Codec) for an empty value,
    /// bad base64, a payload over `max_size` or a payload that is not XML.
    pub fn decode_value(value: &str, max_size: usize) -> SamlResult<String> {
        into_xml(decode_base64(value, max_size)?)
    }

    /// Returns the form fields that carry an encoded message.
    #[must_use]
    pub fn form_fields(
        message_type: SamlMessageType,
        encoded: String,
        relay_state: Option<&str>,
    ) -> Vec<(&'static str, String)> {
        let mut fields = vec![(message_type.form_param(), encoded)];
        if let Some(rs) = relay_state {
            fields.push(("RelayState", rs.to_string()));
        }
        fields
    }

    /// Renders form fields as an HTML page that auto-submits to `destination`.
    #[must_use]
    pub fn auto_submit_form(destination: &str, fields: &[(&str, String)]) -> String {
        let inputs: String = fields
            .iter()
            .map(|(name, value)| {
                format!(
                    r#"        <input type="hidden" name="{}" value="{}"/>
"#,
                    html_escape(name),
                    html_escape(value)
                )
            })
            .collect();

        format!(
            r#"<!DOCTYPE html>
<html>
<head>
    <meta charset="UTF-8">
    <title>SAML POST Binding</title>
</head>
<body onload="document.forms[0].submit()">
    <noscript>
        <p>JavaScript is disabled. Click the button below to continue.</p>
    </noscript>
    <form method="post" action="{}">
{}        <noscript>
            <input type="submit" value="Continue"/>
        </noscript>
    </form>
</body>
</html>"#,
            html_escape(destination),
            inputs
        )
    }
}

/// Escapes HTML special characters.
fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#x27;")
}
