//! SAML Response types.
//!
//! Response messages sent by an identity provider to a service provider.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::message::{generate_id, issuer_element, parse_header, protocol_root, MessageKind, SamlMessage};
use super::{format_instant, Assertion, NameId, Status, SAMLP_NS, SAML_NS, SAML_VERSION};
use crate::error::{SamlError, SamlResult};
use crate::settings::Settings;
use crate::signature::XmlSignature;
use crate::xml::Element;

/// SAML Response.
///
/// A response message sent from an identity provider to a service provider
/// containing authentication results.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Response {
    /// Unique identifier for this response.
    pub id: String,

    /// Version of the SAML protocol (always "2.0").
    #[serde(default = "default_version")]
    pub version: String,

    /// Timestamp when this response was issued.
    pub issue_instant: DateTime<Utc>,

    /// The entity ID of the identity provider that issued this response.
    pub issuer: String,

    /// The ID of the request this response is for.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub in_response_to: Option<String>,

    /// The URL where this response was sent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub destination: Option<String>,

    /// The embedded signature, as received.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub signature: Option<XmlSignature>,

    /// The status of the response.
    pub status: Status,

    /// The assertions in this response.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub assertions: Vec<Assertion>,
}

fn default_version() -> String {
    SAML_VERSION.to_string()
}

impl Response {
    /// Creates a new response with the given status.
    #[must_use]
    pub fn new(issuer: impl Into<String>, status: Status) -> Self {
        Self {
            id: generate_id(),
            version: default_version(),
            issue_instant: Utc::now(),
            issuer: issuer.into(),
            in_response_to: None,
            destination: None,
            signature: None,
            status,
            assertions: Vec::new(),
        }
    }

    /// Creates a new success response.
    #[must_use]
    pub fn success(issuer: impl Into<String>) -> Self {
        Self::new(issuer, Status::success())
    }

    /// Creates a new error response.
    #[must_use]
    pub fn error(issuer: impl Into<String>, status: Status) -> Self {
        Self::new(issuer, status)
    }

    /// Sets the request ID this response is for.
    #[must_use]
    pub fn in_response_to(mut self, request_id: impl Into<String>) -> Self {
        self.in_response_to = Some(request_id.into());
        self
    }

    /// Sets the destination URL.
    #[must_use]
    pub fn with_destination(mut self, url: impl Into<String>) -> Self {
        self.destination = Some(url.into());
        self
    }

    /// Adds an assertion to this response.
    #[must_use]
    pub fn with_assertion(mut self, assertion: Assertion) -> Self {
        self.assertions.push(assertion);
        self
    }

    /// Returns true if this response indicates success.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    /// Gets the first assertion if present.
    #[must_use]
    pub fn first_assertion(&self) -> Option<&Assertion> {
        self.assertions.first()
    }

    /// Returns the first value of the named attribute.
    ///
    /// `name` matches either the `Name` or the `FriendlyName` of an attribute.
    #[must_use]
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attribute_values(name).first().copied()
    }

    /// Returns every value of the named attribute, or an empty list.
    #[must_use]
    pub fn attribute_values(&self, name: &str) -> Vec<&str> {
        self.first_assertion()
            .and_then(|a| a.attribute(name))
            .map(|attr| attr.values.iter().map(String::as_str).collect())
            .unwrap_or_default()
    }

    /// Returns the session index from the first assertion.
    #[must_use]
    pub fn session_index(&self) -> Option<&str> {
        self.first_assertion().and_then(Assertion::session_index)
    }

    /// Returns the subject's name ID from the first assertion.
    #[must_use]
    pub fn name_id(&self) -> Option<&NameId> {
        self.first_assertion().and_then(Assertion::name_id)
    }

    /// Checks a received response against the local settings at `now`.
    ///
    /// This does not verify signatures cryptographically; it only requires one
    /// to be present. Run [`XmlSignatureValidator`](crate::signature::XmlSignatureValidator)
    /// (or receive through [`sp::parse_authn_response`](crate::sp::parse_authn_response))
    /// before trusting the result.
    ///
    /// # Errors
    ///
    /// The first failing check, in this order: version, ID, status, destination,
    /// assertion presence, issuers, signature presence, bearer recipient,
    /// bearer expiry, conditions window and audience. Issuers are compared
    /// only when `idp.entity_id` is set.
    pub fn validate(&self, settings: &Settings, now: DateTime<Utc>) -> SamlResult<()> {
        if self.version != SAML_VERSION {
            return Err(SamlError::SchemaMismatch(format!(
                "unsupported SAML version: {}",
                self.version
            )));
        }
        if self.id.is_empty() {
            return Err(SamlError::SchemaMismatch("missing ID attribute on Response".into()));
        }
        self.status.ensure_success()?;

        let acs_url = &settings.sp.assertion_consumer_service_url;
        if let Some(destination) = &self.destination {
            if destination != acs_url {
                return Err(SamlError::InvalidDestination {
                    expected: acs_url.clone(),
                    actual: destination.clone(),
                });
            }
        }

        let assertion = self
            .first_assertion()
            .ok_or_else(|| SamlError::SchemaMismatch("no Assertions".into()))?;
        settings.check_idp_issuer(&self.issuer)?;
        settings.check_idp_issuer(&assertion.issuer)?;

        if self.signature.is_none() && assertion.signature.is_none() {
            return Err(SamlError::SignatureMissing(
                "neither the Response nor the Assertion is signed".into(),
            ));
        }

        let data = assertion
            .bearer_confirmation()
            .and_then(|c| c.subject_confirmation_data.as_ref());
        if let Some(data) = data {
            if let Some(recipient) = &data.recipient {
                if recipient != acs_url {
                    return Err(SamlError::InvalidDestination {
                        expected: acs_url.clone(),
                        actual: recipient.clone(),
                    });
                }
            }
            if data.not_on_or_after.is_some_and(|limit| now >= limit) {
                return Err(SamlError::AssertionExpired);
            }
        }

        assertion.validate(&settings.sp.entity_id, now)
    }
}

impl SamlMessage for Response {
    const KIND: MessageKind = MessageKind::Response;

    fn id(&self) -> &str {
        &self.id
    }

    fn issue_instant(&self) -> DateTime<Utc> {
        self.issue_instant
    }

    fn issuer(&self) -> &str {
        &self.issuer
    }

    fn to_element(&self) -> Element {
        protocol_root(Self::KIND)
            .attr("ID", self.id.as_str())
            .attr("Version", self.version.as_str())
            .attr("IssueInstant", format_instant(&self.issue_instant))
            .opt_attr("Destination", self.destination.as_deref())
            .opt_attr("InResponseTo", self.in_response_to.as_deref())
            .child(issuer_element(&self.issuer))
            .opt_child(self.signature.as_ref().map(XmlSignature::to_element))
            .child(self.status.to_element())
            .extend_children(self.assertions.iter().map(Assertion::to_element))
    }

    fn from_element(el: &Element) -> SamlResult<Self> {
        let header = parse_header(el, Self::KIND)?;
        let status = el
            .child_element(SAMLP_NS, "Status")
            .ok_or_else(|| SamlError::SchemaMismatch("Response has no Status".into()))?;

        Ok(Self {
            id: header.id,
            version: header.version,
            issue_instant: header.issue_instant,
            issuer: header.issuer,
            in_response_to: el.attribute("InResponseTo").map(str::to_string),
            destination: header.destination,
            signature: XmlSignature::child_of(el)?,
            status: Status::from_element(status)?,
            assertions: el
                .child_elements(SAML_NS, "Assertion")
                .map(Assertion::from_element)
                .collect::<SamlResult<_>>()?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{
        Attribute, AttributeStatement, AuthnContextClass, AuthnStatement, Conditions, Subject,
        SubjectConfirmation, SubjectConfirmationData,
    };
    use crate::signature::SignatureAlgorithm;

    const ACS: &str = "https://sp.example.com/acs";
    const SP: &str = "https://sp.example.com";

    fn settings() -> Settings {
        let mut settings = Settings::default();
        settings.sp.entity_id = SP.into();
        settings.sp.assertion_consumer_service_url = ACS.into();
        settings
    }

    fn signed_response(now: DateTime<Utc>) -> Response {
        let mut assertion = Assertion::new("https://idp.example.com")
            .with_subject(
                Subject::new(NameId::transient("nameid")).with_confirmation(
                    SubjectConfirmation::bearer()
                        .with_data(SubjectConfirmationData::for_request("_req", ACS, now, 5).unwrap()),
                ),
            )
            .with_conditions(Conditions::with_validity(now, 5).unwrap().with_audience(SP))
            .with_authn_statement(
                AuthnStatement::new(now, AuthnContextClass::Password).with_session_index("sessionindex"),
            )
            .with_attribute_statement(AttributeStatement::new().with_attribute(
                Attribute::single("urn:oid:2.5.4.42", "Jane").with_friendly_name("givenName"),
            ));
        assertion.signature = Some(XmlSignature::new(SignatureAlgorithm::RsaSha256, &assertion.id));

        Response::success("https://idp.example.com")
            .in_response_to("_req")
            .with_destination(ACS)
            .with_assertion(assertion)
    }

    #[test]
    fn response_helpers() {
        let response = signed_response(Utc::now());
        assert!(response.is_success());
        assert_eq!(response.session_index(), Some("sessionindex"));
        assert_eq!(response.name_id().map(|n| n.value.as_str()), Some("nameid"));
        assert_eq!(response.attribute("givenName"), Some("Jane"));
        assert_eq!(response.attribute_values("urn:oid:2.5.4.42"), vec!["Jane"]);
        assert!(response.attribute_values("sn").is_empty());
    }

    #[test]
    fn response_validation_passes() {
        let now = Utc::now();
        assert!(signed_response(now).validate(&settings(), now).is_ok());
    }

    #[test]
    fn response_validation_failures() {
        let now = Utc::now();
        let settings = settings();

        let mut wrong_destination = signed_response(now);
        wrong_destination.destination = Some("https://evil.example.com/acs".into());
        assert!(matches!(
            wrong_destination.validate(&settings, now),
            Err(SamlError::InvalidDestination { .. })
        ));

        let mut unsigned = signed_response(now);
        unsigned.assertions[0].signature = None;
        assert!(matches!(
            unsigned.validate(&settings, now),
            Err(SamlError::SignatureMissing(_))
        ));

        let failed = Response::error("https://idp.example.com", Status::authn_failed("nope"));
        assert!(matches!(
            failed.validate(&settings, now),
            Err(SamlError::UnsuccessfulStatus(_))
        ));

        let empty = Response::success("https://idp.example.com");
        assert!(matches!(
            empty.validate(&settings, now),
            Err(SamlError::SchemaMismatch(_))
        ));

        assert!(matches!(
            signed_response(now).validate(&settings, now + chrono::Duration::minutes(6)),
            Err(SamlError::AssertionExpired)
        ));
    }

    #[test]
    fn response_issuer_checked_against_idp() {
        let now = Utc::now();
        let mut settings = settings();
        settings.idp.entity_id = "https://idp.example.com".into();
        assert!(signed_response(now).validate(&settings, now).is_ok());

        let mut foreign = signed_response(now);
        foreign.issuer = "https://other-idp.example.com".into();
        assert!(matches!(
            foreign.validate(&settings, now),
            Err(SamlError::InvalidIssuer { ref actual, .. }) if actual == "https://other-idp.example.com"
        ));

        let mut foreign_assertion = signed_response(now);
        foreign_assertion.assertions[0].issuer = "https://other-idp.example.com".into();
        assert!(matches!(
            foreign_assertion.validate(&settings, now),
            Err(SamlError::InvalidIssuer { .. })
        ));
    }

    #[test]
    fn response_survives_xml() {
        let response = signed_response(Utc::now());
        let xml = response.to_xml().unwrap();
        assert_eq!(Response::from_xml(&xml).unwrap(), response);
    }

    #[test]
    fn status_is_required() {
        let xml = r#"<samlp:Response xmlns:samlp="urn:oasis:names:tc:SAML:2.0:protocol" xmlns:saml="urn:oasis:names:tc:SAML:2.0:assertion" ID="_r" Version="2.0" IssueInstant="2024-01-01T00:00:00Z"><saml:Issuer>idp</saml:Issuer></samlp:Response>"#;
        assert!(matches!(
            Response::from_xml(xml),
            Err(SamlError::SchemaMismatch(_))
        ));
    }
}
