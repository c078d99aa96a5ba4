//! Binding codec tests against hand-built payloads.

use std::io::Write;

use base64::Engine;
use flate2::write::DeflateEncoder;
use flate2::Compression;

use saml_protocol::{
    AuthnRequest, HttpPostBinding, HttpRedirectBinding, RedirectQuery, SamlError, SamlMessage,
    SamlMessageType, Settings,
};

const REQUEST_XML: &str = r#"<samlp:AuthnRequest xmlns:samlp="urn:oasis:names:tc:SAML:2.0:protocol" xmlns:saml="urn:oasis:names:tc:SAML:2.0:assertion" ID="_abc" Version="2.0" IssueInstant="2024-01-01T00:00:00Z" AssertionConsumerServiceURL="https://sp.example.com/saml/acs"><saml:Issuer>https://sp.example.com/metadata</saml:Issuer></samlp:AuthnRequest>"#;

fn deflate(data: &[u8]) -> anyhow::Result<Vec<u8>> {
    let mut encoder = DeflateEncoder::new(Vec::new(), Compression::best());
    encoder.write_all(data)?;
    Ok(encoder.finish()?)
}

fn b64(data: &[u8]) -> String {
    base64::engine::general_purpose::STANDARD.encode(data)
}

/// Tests that a payload deflated by another implementation decodes.
#[test]
fn test_redirect_decodes_foreign_deflate() -> anyhow::Result<()> {
    let mut settings = Settings::default();
    settings.compress.request = true;

    let value = urlencoding::encode(&b64(&deflate(REQUEST_XML.as_bytes())?)).into_owned();
    let request: AuthnRequest = HttpRedirectBinding::decode(&value, &settings)?;
    assert_eq!(request.id(), "_abc");
    assert_eq!(request.issuer, "https://sp.example.com/metadata");
    Ok(())
}

/// Tests that line-wrapped base64 is accepted.
#[test]
fn test_whitespace_in_base64_is_ignored() -> anyhow::Result<()> {
    let encoded = b64(REQUEST_XML.as_bytes());
    let wrapped: String = encoded
        .as_bytes()
        .chunks(64)
        .map(|line| format!("{}\r\n", String::from_utf8_lossy(line)))
        .collect();

    let request: AuthnRequest = HttpPostBinding::decode(&wrapped, &Settings::default())?;
    assert_eq!(request.id, "_abc");
    Ok(())
}

/// Tests both directions of a compression mismatch.
#[test]
fn test_compression_mismatch_is_codec_error() -> anyhow::Result<()> {
    let deflated = b64(&deflate(REQUEST_XML.as_bytes())?);
    let plain = b64(REQUEST_XML.as_bytes());

    assert!(matches!(
        HttpRedirectBinding::decode_value(&deflated, false, 1 << 20),
        Err(SamlError::Codec(_))
    ));
    assert!(matches!(
        HttpRedirectBinding::decode_value(&plain, true, 1 << 20),
        Err(SamlError::Codec(_))
    ));
    Ok(())
}

/// Tests that inflation stops at the size limit.
#[test]
fn test_inflation_is_bounded() -> anyhow::Result<()> {
    let bomb = format!("<a>{}</a>", " ".repeat(4 << 20));
    let value = b64(&deflate(bomb.as_bytes())?);
    assert!(value.len() < 64 * 1024, "fixture should compress well");

    let result = HttpRedirectBinding::decode_value(&value, true, 256 * 1024);
    assert!(matches!(result, Err(SamlError::Codec(_))));
    Ok(())
}

/// Tests that an oversized POST body is refused before decoding.
#[test]
fn test_post_size_limit() {
    let value = b64(format!("<a>{}</a>", "x".repeat(2048)).as_bytes());
    assert!(matches!(
        HttpPostBinding::decode_value(&value, 1024),
        Err(SamlError::Codec(_))
    ));
}

/// Tests that empty and non-XML payloads are codec errors.
#[test]
fn test_empty_and_binary_payloads() {
    let binary = b64(b"\xff\xfe\x00binary");
    let text = b64(b"plain text");
    for value in ["", "   ", binary.as_str(), text.as_str()] {
        assert!(
            matches!(HttpPostBinding::decode_value(value, 1024), Err(SamlError::Codec(_))),
            "value {value:?} should be rejected"
        );
    }
}

/// Tests that decodable XML of the wrong message type is a schema mismatch.
#[test]
fn test_wrong_root_element() {
    let value = b64(br#"<samlp:LogoutRequest xmlns:samlp="urn:oasis:names:tc:SAML:2.0:protocol"/>"#);
    let result: Result<AuthnRequest, _> = HttpPostBinding::decode(&value, &Settings::default());
    assert!(matches!(result, Err(SamlError::SchemaMismatch(_))));
}

/// Tests query parsing against the raw values.
#[test]
fn test_redirect_query_keeps_raw_values() -> anyhow::Result<()> {
    let query = "?SAMLRequest=abc%2B%3D&RelayState=a+b%26c&SigAlg=x&Signature=y&Extra=1&RelayState=ignored";
    let parsed = RedirectQuery::parse(query)?;
    assert_eq!(parsed.message_type, SamlMessageType::Request);
    assert_eq!(parsed.message, "abc%2B%3D");
    assert_eq!(parsed.relay_state, Some("a+b%26c"));
    assert_eq!(parsed.decoded_relay_state()?.as_deref(), Some("a b&c"));
    assert!(parsed.is_signed());

    assert!(matches!(
        RedirectQuery::parse("SAMLRequest=a&SAMLResponse=b"),
        Err(SamlError::Codec(_))
    ));
    assert!(matches!(RedirectQuery::parse("RelayState=x"), Err(SamlError::Codec(_))));
    Ok(())
}

/// Tests that POST form fields render into an escaped auto-submit page.
#[test]
fn test_post_form() {
    let fields = HttpPostBinding::form_fields(
        SamlMessageType::Response,
        HttpPostBinding::encode_xml(REQUEST_XML),
        Some(r#"<script>"x"</script>"#),
    );
    assert_eq!(fields[0].0, "SAMLResponse");
    assert_eq!(fields[1].0, "RelayState");

    let html = HttpPostBinding::auto_submit_form("https://sp.example.com/saml/acs", &fields);
    assert!(html.contains(r#"action="https://sp.example.com/saml/acs""#));
    assert!(html.contains("&lt;script&gt;&quot;x&quot;&lt;/script&gt;"));
    assert!(!html.contains("<script>\"x\""));
}
