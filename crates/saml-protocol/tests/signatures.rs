//! XML and redirect-query signature tests.

mod common;

use chrono::Utc;

use common::Party;
use saml_protocol::signature::query::verify_query;
use saml_protocol::xml::Element;
use saml_protocol::{
    generate_id, HttpRedirectBinding, QuerySigner, Response, SamlError, SamlMessage,
    SamlMessageType, SignatureAlgorithm, XmlSignatureValidator, XmlSigner,
};

const SIGNING_ALGORITHMS: [SignatureAlgorithm; 3] = [
    SignatureAlgorithm::RsaSha256,
    SignatureAlgorithm::RsaSha384,
    SignatureAlgorithm::RsaSha512,
];

fn signed_assertion_only(idp: &Party) -> anyhow::Result<(Response, String)> {
    let response = common::idp_response(&generate_id(), Utc::now());
    let signer = XmlSigner::new(&idp.key, SignatureAlgorithm::RsaSha256)?;
    let signed = signer.sign(&response.to_xml()?, &response.assertions[0].id)?;
    Ok((response, signed))
}

/// Tests that every signing algorithm verifies and is reported back.
#[test]
fn test_xml_signature_algorithms() -> anyhow::Result<()> {
    common::init_tracing();
    let idp = Party::generate("idp.example.com")?;
    let validator = XmlSignatureValidator::new(&idp.certificate);

    for algorithm in SIGNING_ALGORITHMS {
        let response = common::idp_response(&generate_id(), Utc::now());
        let signed = XmlSigner::new(&idp.key, algorithm)?
            .with_certificate(&idp.certificate)
            .sign_response(&response)?;

        assert_eq!(validator.verify_xml(&signed, &response.id)?, algorithm);
        assert_eq!(
            validator.verify_xml(&signed, &response.assertions[0].id)?,
            algorithm
        );

        let parsed = Response::from_xml(&signed)?;
        let signature = parsed.signature.ok_or_else(|| anyhow::anyhow!("no signature"))?;
        assert_eq!(signature.signature_method, algorithm.uri());
        assert_eq!(signature.digest_method, algorithm.digest_uri());
        assert_eq!(signature.x509_certificate, Some(idp.certificate.to_base64()));
    }
    Ok(())
}

/// Tests that an assertion-only signature is found by the response walk.
#[test]
fn test_verify_response_reports_signed_parts() -> anyhow::Result<()> {
    let idp = Party::generate("idp.example.com")?;
    let (response, signed) = signed_assertion_only(&idp)?;

    let verified =
        XmlSignatureValidator::new(&idp.certificate).verify_response(&Element::parse(&signed)?)?;
    assert!(!verified.response);
    assert_eq!(verified.assertions, vec![response.assertions[0].id.clone()]);

    let unsigned = XmlSignatureValidator::new(&idp.certificate)
        .verify_response(&Element::parse(&response.to_xml()?)?)?;
    assert!(unsigned.is_empty());
    Ok(())
}

/// Tests that a second element carrying the signed ID is rejected.
#[test]
fn test_duplicate_id_is_rejected() -> anyhow::Result<()> {
    let idp = Party::generate("idp.example.com")?;
    let (response, signed) = signed_assertion_only(&idp)?;

    let start = signed
        .find("<saml:Assertion")
        .ok_or_else(|| anyhow::anyhow!("no assertion"))?;
    let end = signed
        .rfind("</saml:Assertion>")
        .ok_or_else(|| anyhow::anyhow!("no assertion end"))?
        + "</saml:Assertion>".len();
    let copy = signed[start..end].replace("alice@example.com", "mallory@example.com");
    let wrapped = signed.replacen("</samlp:Response>", &format!("{copy}</samlp:Response>"), 1);

    let result = XmlSignatureValidator::new(&idp.certificate)
        .verify_xml(&wrapped, &response.assertions[0].id);
    assert!(
        matches!(result, Err(SamlError::SignatureInvalid(_))),
        "expected invalid signature, got {result:?}"
    );
    Ok(())
}

/// Tests that an unsigned element reports a missing signature.
#[test]
fn test_missing_signature() -> anyhow::Result<()> {
    let idp = Party::generate("idp.example.com")?;
    let response = common::idp_response(&generate_id(), Utc::now());

    let result = XmlSignatureValidator::new(&idp.certificate).verify_xml(&response.to_xml()?, &response.id);
    assert!(matches!(result, Err(SamlError::SignatureMissing(_))));
    Ok(())
}

/// Tests that inclusive canonicalization is refused.
#[test]
fn test_unsupported_canonicalization() -> anyhow::Result<()> {
    let idp = Party::generate("idp.example.com")?;
    let response = common::idp_response(&generate_id(), Utc::now());
    let signed = XmlSigner::new(&idp.key, SignatureAlgorithm::RsaSha256)?
        .sign(&response.to_xml()?, &response.id)?;
    let inclusive = signed.replace(
        "http://www.w3.org/2001/10/xml-exc-c14n#",
        "http://www.w3.org/TR/2001/REC-xml-c14n-20010315",
    );

    let result = XmlSignatureValidator::new(&idp.certificate).verify_xml(&inclusive, &response.id);
    assert!(matches!(result, Err(SamlError::SignatureAlgorithmUnsupported(_))));
    Ok(())
}

/// Tests that a line-wrapped SignatureValue still verifies.
#[test]
fn test_wrapped_signature_value() -> anyhow::Result<()> {
    let idp = Party::generate("idp.example.com")?;
    let response = common::idp_response(&generate_id(), Utc::now());
    let signed = XmlSigner::new(&idp.key, SignatureAlgorithm::RsaSha256)?
        .sign(&response.to_xml()?, &response.id)?;
    let wrapped = signed.replace("<ds:SignatureValue>", "<ds:SignatureValue>\n    ");
    assert_ne!(wrapped, signed);

    XmlSignatureValidator::new(&idp.certificate).verify_xml(&wrapped, &response.id)?;
    Ok(())
}

/// Tests that a document signed with LF line endings still verifies after
/// being re-sent with CRLF or CR line endings.
#[test]
fn test_crlf_transport_verifies() -> anyhow::Result<()> {
    let idp = Party::generate("idp.example.com")?;
    let response = common::idp_response(&generate_id(), Utc::now());
    let indented = response.to_xml()?.replace("><", ">\n  <");
    let signed = XmlSigner::new(&idp.key, SignatureAlgorithm::RsaSha256)?
        .with_certificate(&idp.certificate)
        .sign(&indented, &response.id)?;
    assert!(signed.contains('\n'));

    let validator = XmlSignatureValidator::new(&idp.certificate);
    validator.verify_xml(&signed, &response.id)?;

    let crlf = signed.replace('\n', "\r\n");
    assert_eq!(validator.verify_xml(&crlf, &response.id)?, SignatureAlgorithm::RsaSha256);
    assert!(validator.verify_response(&Element::parse(&crlf)?)?.response);

    let cr = signed.replace('\n', "\r");
    validator.verify_xml(&cr, &response.id)?;
    Ok(())
}

/// Tests redirect query signatures with every signing algorithm.
#[test]
fn test_query_signature_algorithms() -> anyhow::Result<()> {
    let sp = Party::generate("sp.example.com")?;
    let other = Party::generate("sp.example.com")?;
    let value = HttpRedirectBinding::encode_xml("<samlp:LogoutRequest/>", true)?;
    let query = HttpRedirectBinding::query(SamlMessageType::Request, &value, Some("state&more"));

    for algorithm in SIGNING_ALGORITHMS {
        let signed = QuerySigner::new(&sp.key, algorithm)?.sign_query(&query)?;
        assert!(signed.starts_with(&query));
        assert_eq!(verify_query(&signed, &sp.certificate)?, algorithm);
        assert!(matches!(
            verify_query(&signed, &other.certificate),
            Err(SamlError::SignatureInvalid(_))
        ));
    }
    Ok(())
}

/// Tests that a reordered query still verifies against the wire values.
#[test]
fn test_query_parameter_order_is_irrelevant() -> anyhow::Result<()> {
    let sp = Party::generate("sp.example.com")?;
    let value = HttpRedirectBinding::encode_xml("<samlp:AuthnRequest/>", false)?;
    let query = HttpRedirectBinding::query(SamlMessageType::Request, &value, Some("s"));
    let signed = QuerySigner::new(&sp.key, SignatureAlgorithm::RsaSha256)?.sign_query(&query)?;

    let mut pairs: Vec<&str> = signed.split('&').collect();
    pairs.reverse();
    let reordered = format!("?{}", pairs.join("&"));
    assert_eq!(verify_query(&reordered, &sp.certificate)?, SignatureAlgorithm::RsaSha256);
    Ok(())
}

/// Tests that changing one character of the signed message breaks the signature.
#[test]
fn test_query_tamper_detection() -> anyhow::Result<()> {
    let sp = Party::generate("sp.example.com")?;
    let value = HttpRedirectBinding::encode_xml("<samlp:AuthnRequest ID=\"_a\"/>", true)?;
    let query = HttpRedirectBinding::query(SamlMessageType::Request, &value, None);
    let signed = QuerySigner::new(&sp.key, SignatureAlgorithm::RsaSha256)?.sign_query(&query)?;

    let position = "SAMLRequest=".len() + 2;
    let original = signed.as_bytes()[position];
    let flipped = if original == b'A' { 'B' } else { 'A' };
    let mut tampered = signed.clone();
    tampered.replace_range(position..=position, &flipped.to_string());

    assert!(matches!(
        verify_query(&tampered, &sp.certificate),
        Err(SamlError::SignatureInvalid(_))
    ));
    Ok(())
}

/// Tests that signing the same query twice yields two valid signatures.
#[test]
fn test_repeated_signatures_both_verify() -> anyhow::Result<()> {
    let sp = Party::generate("sp.example.com")?;
    let value = HttpRedirectBinding::encode_xml("<samlp:AuthnRequest/>", true)?;
    let query = HttpRedirectBinding::query(SamlMessageType::Request, &value, Some("state"));
    let signer = QuerySigner::new(&sp.key, SignatureAlgorithm::RsaSha384)?;

    let first = signer.sign_query(&query)?;
    let second = signer.sign_query(&query)?;
    verify_query(&first, &sp.certificate)?;
    verify_query(&second, &sp.certificate)?;
    Ok(())
}
