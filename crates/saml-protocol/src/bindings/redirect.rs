//! HTTP-Redirect Binding implementation.
//!
//! Implements the SAML 2.0 HTTP-Redirect binding for sending SAML messages
//! via URL query parameters with optional DEFLATE compression.

use std::io::{Read, Write};

use base64::Engine;
use flate2::read::DeflateDecoder;
use flate2::write::DeflateEncoder;
use flate2::Compression;

use super::{decode_base64, ensure_within, into_xml, SamlMessageType};
use crate::error::{SamlError, SamlResult};
use crate::settings::Settings;
use crate::types::SamlMessage;

/// HTTP-Redirect binding encoder/decoder.
pub struct HttpRedirectBinding;

impl HttpRedirectBinding {
    /// Encodes a message into a URL-encoded `SAMLRequest`/`SAMLResponse` value.
    ///
    /// The message is deflated first when the settings ask for compression of
    /// its direction.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or compression fails.
    pub fn encode<M: SamlMessage>(message: &M, settings: &Settings) -> SamlResult<String> {
        let compress = settings.compress.applies_to(M::KIND.message_type());
        tracing::debug!(
            kind = M::KIND.element_name(),
            id = message.id(),
            compress,
            "encoding message for redirect binding"
        );
        Self::encode_xml(&message.to_xml()?, compress)
    }

    /// Encodes raw XML into a URL-encoded transport value.
    ///
    /// # Errors
    ///
    /// Returns an error if compression fails.
    pub fn encode_xml(xml: &str, compress: bool) -> SamlResult<String> {
        let bytes = if compress {
            deflate_compress(xml.as_bytes())?
        } else {
            xml.as_bytes().to_vec()
        };
        let encoded = base64::engine::general_purpose::STANDARD.encode(bytes);
        Ok(urlencoding::encode(&encoded).into_owned())
    }

    /// Decodes a `SAMLRequest`/`SAMLResponse` value into a message.
    ///
    /// # Errors
    ///
    /// Returns [`SamlError::Codec`] if the value cannot be decoded, and the
    /// parse errors of [`SamlMessage::from_xml`] otherwise.
    pub fn decode<M: SamlMessage>(value: &str, settings: &Settings) -> SamlResult<M> {
        let compress = settings.compress.applies_to(M::KIND.message_type());
        let xml = Self::decode_value(value, compress, settings.max_message_size)?;
        let message = M::from_xml(&xml)?;
        tracing::debug!(
            kind = M::KIND.element_name(),
            id = message.id(),
            "decoded message from redirect binding"
        );
        Ok(message)
    }

    /// Decodes a transport value into raw XML.
    ///
    /// The value may still be URL-encoded; decoding an already decoded base64
    /// value is a no-op because base64 never contains `%`.
    ///
    /// # Errors
    ///
    /// Returns [`SamlError::Codec`] for bad percent-encoding, bad base64, a
    /// failed inflate, a payload over `max_size` or a payload that is not XML.
    pub fn decode_value(value: &str, inflate: bool, max_size: usize) -> SamlResult<String> {
        let url_decoded = urlencoding::decode(value)
            .map_err(|e| SamlError::Codec(format!("URL decode error: {e}")))?;
        let bytes = decode_base64(&url_decoded, max_size)?;
        let bytes = if inflate {
            deflate_decompress(&bytes, max_size)?
        } else {
            bytes
        };
        into_xml(bytes)
    }

    /// Builds the unsigned query: the message parameter, then `RelayState` if present.
    ///
    /// `encoded` must already be URL-encoded, as returned by [`Self::encode`].
    #[must_use]
    pub fn query(message_type: SamlMessageType, encoded: &str, relay_state: Option<&str>) -> String {
        let mut query = format!("{}={encoded}", message_type.form_param());
        if let Some(rs) = relay_state {
            query.push_str("&RelayState=");
            query.push_str(&urlencoding::encode(rs));
        }
        query
    }

    /// Joins an endpoint and a query string.
    #[must_use]
    pub fn url(destination: &str, query: &str) -> String {
        let separator = if destination.contains('?') { '&' } else { '?' };
        format!("{destination}{separator}{query}")
    }

    /// Extracts the raw, still-encoded query string from a received URL.
    ///
    /// # Errors
    ///
    /// Returns [`SamlError::Codec`] if the URL does not parse or has no query.
    pub fn query_from_url(url: &str) -> SamlResult<String> {
        let parsed =
            url::Url::parse(url).map_err(|e| SamlError::Codec(format!("invalid URL: {e}")))?;
        parsed
            .query()
            .filter(|q| !q.is_empty())
            .map(str::to_string)
            .ok_or_else(|| SamlError::Codec("URL has no query string".into()))
    }
}

/// The SAML parameters of a redirect query, exactly as received.
///
/// Values are kept percent-encoded, because the query signature covers the
/// bytes on the wire rather than their decoded form.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RedirectQuery<'a> {
    /// Whether this carries `SAMLRequest` or `SAMLResponse`.
    pub message_type: SamlMessageType,
    /// The raw message value.
    pub message: &'a str,
    /// The raw `RelayState` value.
    pub relay_state: Option<&'a str>,
    /// The raw `SigAlg` value.
    pub sig_alg: Option<&'a str>,
    /// The raw `Signature` value.
    pub signature: Option<&'a str>,
}

impl<'a> RedirectQuery<'a> {
    /// Splits a query string into its SAML parameters.
    ///
    /// A leading `?` is ignored. Unknown parameters are skipped; the first
    /// occurrence of a repeated parameter wins.
    ///
    /// # Errors
    ///
    /// Returns [`SamlError::Codec`] if neither `SAMLRequest` nor `SAMLResponse`
    /// is present, or if both are.
    pub fn parse(query: &'a str) -> SamlResult<Self> {
        let query = query.strip_prefix('?').unwrap_or(query);

        let mut request = None;
        let mut response = None;
        let mut relay_state = None;
        let mut sig_alg = None;
        let mut signature = None;

        for pair in query.split('&').filter(|p| !p.is_empty()) {
            let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
            let slot = match key {
                "SAMLRequest" => &mut request,
                "SAMLResponse" => &mut response,
                "RelayState" => &mut relay_state,
                "SigAlg" => &mut sig_alg,
                "Signature" => &mut signature,
                _ => continue,
            };
            slot.get_or_insert(value);
        }

        let (message_type, message) = match (request, response) {
            (Some(value), None) => (SamlMessageType::Request, value),
            (None, Some(value)) => (SamlMessageType::Response, value),
            (Some(_), Some(_)) => {
                return Err(SamlError::Codec(
                    "query carries both SAMLRequest and SAMLResponse".into(),
                ))
            }
            (None, None) => {
                return Err(SamlError::Codec(
                    "no SAMLRequest or SAMLResponse parameter".into(),
                ))
            }
        };

        Ok(Self {
            message_type,
            message,
            relay_state,
            sig_alg,
            signature,
        })
    }

    /// Returns the percent-decoded `RelayState`.
    ///
    /// # Errors
    ///
    /// Returns [`SamlError::Codec`] if the value is not valid percent-encoded UTF-8.
    pub fn decoded_relay_state(&self) -> SamlResult<Option<String>> {
        self.relay_state
            .map(|rs| {
                urlencoding::decode(&rs.replace('+', " "))
                    .map(|decoded| decoded.into_owned())
                    .map_err(|e| SamlError::Codec(format!("RelayState decode error: {e}")))
            })
            .transpose()
    }

    /// Returns true if both `SigAlg` and `Signature` are present.
    #[must_use]
    pub const fn is_signed(&self) -> bool {
        self.sig_alg.is_some() && self.signature.is_some()
    }
}

/// Compresses data using DEFLATE (raw, no zlib header).
fn deflate_compress(data: &[u8]) -> SamlResult<Vec<u8>> {
    let mut encoder = DeflateEncoder::new(Vec::new(), Compression::default());
    encoder
        .write_all(data)
        .map_err(|e| SamlError::Codec(format!("compression error: {e}")))?;
    encoder
        .finish()
        .map_err(|e| SamlError::Codec(format!("compression finish error: {e}")))
}

/// Decompresses DEFLATE data, reading at most one byte past `max_size`.
fn deflate_decompress(data: &[u8], max_size: usize) -> SamlResult<Vec<u8>> {
    let limit = u64::try_from(max_size).unwrap_or(u64::MAX).saturating_add(1);
    let mut decompressed = Vec::new();
    DeflateDecoder::new(data)
        .take(limit)
        .read_to_end(&mut decompressed)
        .map_err(|e| SamlError::Codec(format!("decompression error: {e}")))?;
    ensure_within(decompressed.len(), max_size)?;
    Ok(decompressed)
}

#[cfg(test)]
mod tests {
    use super::*;

    const LIMIT: usize = 256 * 1024;

    #[test]
    fn encode_and_decode_with_compression() {
        let xml = r#"<samlp:AuthnRequest>test content here</samlp:AuthnRequest>"#;
        let value = HttpRedirectBinding::encode_xml(xml, true).unwrap();
        assert_eq!(HttpRedirectBinding::decode_value(&value, true, LIMIT).unwrap(), xml);
    }

    #[test]
    fn encode_and_decode_without_compression() {
        let xml = "<Test/>";
        let value = HttpRedirectBinding::encode_xml(xml, false).unwrap();
        assert_eq!(value, "PFRlc3QvPg%3D%3D");
        assert_eq!(HttpRedirectBinding::decode_value(&value, false, LIMIT).unwrap(), xml);
    }

    #[test]
    fn mismatched_compression_is_codec_error() {
        let xml = "<Test>payload</Test>";
        let deflated = HttpRedirectBinding::encode_xml(xml, true).unwrap();
        let plain = HttpRedirectBinding::encode_xml(xml, false).unwrap();

        assert!(matches!(
            HttpRedirectBinding::decode_value(&deflated, false, LIMIT),
            Err(SamlError::Codec(_))
        ));
        assert!(matches!(
            HttpRedirectBinding::decode_value(&plain, true, LIMIT),
            Err(SamlError::Codec(_))
        ));
    }

    #[test]
    fn inflation_is_bounded() {
        let xml = format!("<a>{}</a>", "x".repeat(10_000));
        let value = HttpRedirectBinding::encode_xml(&xml, true).unwrap();
        assert!(HttpRedirectBinding::decode_value(&value, true, 10_007).is_ok());
        assert!(matches!(
            HttpRedirectBinding::decode_value(&value, true, 10_006),
            Err(SamlError::Codec(_))
        ));
    }

    #[test]
    fn deflate_roundtrip() {
        let original = b"Test data for compression";
        let compressed = deflate_compress(original).unwrap();
        let decompressed = deflate_decompress(&compressed, LIMIT).unwrap();
        assert_eq!(decompressed, original);
    }

    #[test]
    fn query_and_url() {
        let query = HttpRedirectBinding::query(SamlMessageType::Request, "abc%2B", Some("a b&c"));
        assert_eq!(query, "SAMLRequest=abc%2B&RelayState=a%20b%26c");

        assert_eq!(
            HttpRedirectBinding::url("https://idp.example.com/sso", &query),
            format!("https://idp.example.com/sso?{query}")
        );
        // Should use & not ? since URL already has query params
        assert!(HttpRedirectBinding::url("https://idp.example.com/sso?existing=param", "x=1")
            .ends_with("?existing=param&x=1"));
    }

    #[test]
    fn raw_query_is_kept_encoded() {
        let url = "https://sp.example.com/slo?SAMLResponse=a%2Bb+c&RelayState=x%20y&SigAlg=alg&Signature=sig&extra=1";
        let query = HttpRedirectBinding::query_from_url(url).unwrap();
        let parsed = RedirectQuery::parse(&query).unwrap();

        assert_eq!(parsed.message_type, SamlMessageType::Response);
        assert_eq!(parsed.message, "a%2Bb+c");
        assert_eq!(parsed.relay_state, Some("x%20y"));
        assert_eq!(parsed.decoded_relay_state().unwrap().as_deref(), Some("x y"));
        assert!(parsed.is_signed());
    }

    #[test]
    fn query_needs_exactly_one_message() {
        assert!(matches!(RedirectQuery::parse("RelayState=x"), Err(SamlError::Codec(_))));
        assert!(matches!(
            RedirectQuery::parse("SAMLRequest=a&SAMLResponse=b"),
            Err(SamlError::Codec(_))
        ));
        assert!(matches!(
            HttpRedirectBinding::query_from_url("https://idp.example.com/sso"),
            Err(SamlError::Codec(_))
        ));
    }
}
