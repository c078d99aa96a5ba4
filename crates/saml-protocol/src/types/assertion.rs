//! SAML Assertion types.
//!
//! Assertions contain statements about a subject made by an issuer.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::message::{
    child_text, generate_id, issuer_element, opt_instant, optional_instant, parse_instant,
    plus_minutes, required_attr, required_issuer,
};
use super::{format_instant, AuthnContextClass, NameId, BEARER_CONFIRMATION, SAML_NS, SAML_VERSION};
use crate::error::{SamlError, SamlResult};
use crate::signature::XmlSignature;
use crate::xml::Element;

/// SAML Assertion.
///
/// A package of information that supplies one or more statements made
/// by a SAML authority (the issuer).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Assertion {
    /// Unique identifier for this assertion.
    pub id: String,

    /// Version of the SAML protocol (always "2.0").
    #[serde(default = "default_version")]
    pub version: String,

    /// Timestamp when this assertion was issued.
    pub issue_instant: DateTime<Utc>,

    /// The entity ID of the identity provider that issued this assertion.
    pub issuer: String,

    /// The embedded signature, as received. Presence says nothing about validity.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub signature: Option<XmlSignature>,

    /// The subject of this assertion.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subject: Option<Subject>,

    /// Conditions that must be evaluated for the assertion to be valid.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub conditions: Option<Conditions>,

    /// Authentication statement describing how the subject authenticated.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub authn_statement: Option<AuthnStatement>,

    /// Attribute statement containing attributes about the subject.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attribute_statement: Option<AttributeStatement>,
}

fn default_version() -> String {
    SAML_VERSION.to_string()
}

impl Assertion {
    /// Creates a new assertion.
    #[must_use]
    pub fn new(issuer: impl Into<String>) -> Self {
        Self {
            id: generate_id(),
            version: default_version(),
            issue_instant: Utc::now(),
            issuer: issuer.into(),
            signature: None,
            subject: None,
            conditions: None,
            authn_statement: None,
            attribute_statement: None,
        }
    }

    /// Creates a new assertion with a custom ID.
    #[must_use]
    pub fn with_id(id: impl Into<String>, issuer: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Self::new(issuer)
        }
    }

    /// Sets the subject.
    #[must_use]
    pub fn with_subject(mut self, subject: Subject) -> Self {
        self.subject = Some(subject);
        self
    }

    /// Sets the conditions.
    #[must_use]
    pub fn with_conditions(mut self, conditions: Conditions) -> Self {
        self.conditions = Some(conditions);
        self
    }

    /// Sets the authentication statement.
    #[must_use]
    pub fn with_authn_statement(mut self, statement: AuthnStatement) -> Self {
        self.authn_statement = Some(statement);
        self
    }

    /// Sets the attribute statement.
    #[must_use]
    pub fn with_attribute_statement(mut self, statement: AttributeStatement) -> Self {
        self.attribute_statement = Some(statement);
        self
    }

    /// Returns the subject's name ID, if any.
    #[must_use]
    pub fn name_id(&self) -> Option<&NameId> {
        self.subject.as_ref().and_then(|s| s.name_id.as_ref())
    }

    /// Returns the session index of the authentication statement.
    #[must_use]
    pub fn session_index(&self) -> Option<&str> {
        self.authn_statement
            .as_ref()
            .and_then(|s| s.session_index.as_deref())
    }

    /// Finds an attribute by `Name` or `FriendlyName`.
    #[must_use]
    pub fn attribute(&self, name: &str) -> Option<&Attribute> {
        self.attribute_statement
            .as_ref()
            .and_then(|s| s.attributes.iter().find(|a| a.matches(name)))
    }

    /// Returns the first bearer subject confirmation, if any.
    #[must_use]
    pub fn bearer_confirmation(&self) -> Option<&SubjectConfirmation> {
        self.subject.as_ref().and_then(|s| {
            s.subject_confirmations
                .iter()
                .find(|c| c.method == BEARER_CONFIRMATION)
        })
    }

    /// Validates the assertion conditions.
    ///
    /// # Errors
    ///
    /// - [`SamlError::SchemaMismatch`] for a version other than 2.0
    /// - [`SamlError::AssertionNotYetValid`] before `NotBefore`
    /// - [`SamlError::AssertionExpired`] at or after `NotOnOrAfter`
    /// - [`SamlError::InvalidAudience`] if an audience restriction excludes `audience`
    pub fn validate(&self, audience: &str, now: DateTime<Utc>) -> SamlResult<()> {
        if self.version != SAML_VERSION {
            return Err(SamlError::SchemaMismatch(format!(
                "unsupported SAML version: {}",
                self.version
            )));
        }

        let Some(conditions) = &self.conditions else {
            return Ok(());
        };

        if conditions.not_before.is_some_and(|not_before| now < not_before) {
            return Err(SamlError::AssertionNotYetValid);
        }
        if conditions
            .not_on_or_after
            .is_some_and(|not_on_or_after| now >= not_on_or_after)
        {
            return Err(SamlError::AssertionExpired);
        }

        // Each restriction must be satisfied on its own.
        for restriction in &conditions.audience_restrictions {
            if !restriction.audiences.iter().any(|a| a == audience) {
                return Err(SamlError::InvalidAudience {
                    expected: audience.to_string(),
                    actual: restriction.audiences.join(" "),
                });
            }
        }

        Ok(())
    }

    /// Builds the `saml:Assertion` element.
    #[must_use]
    pub fn to_element(&self) -> Element {
        Element::new("saml", "Assertion", SAML_NS)
            .declare("saml", SAML_NS)
            .attr("ID", self.id.as_str())
            .attr("Version", self.version.as_str())
            .attr("IssueInstant", format_instant(&self.issue_instant))
            .child(issuer_element(&self.issuer))
            .opt_child(self.signature.as_ref().map(XmlSignature::to_element))
            .opt_child(self.subject.as_ref().map(Subject::to_element))
            .opt_child(self.conditions.as_ref().map(Conditions::to_element))
            .opt_child(self.authn_statement.as_ref().map(AuthnStatement::to_element))
            .opt_child(
                self.attribute_statement
                    .as_ref()
                    .map(AttributeStatement::to_element),
            )
    }

    /// Reads a `saml:Assertion` element.
    ///
    /// # Errors
    ///
    /// Returns [`SamlError::SchemaMismatch`] if the element is not an assertion
    /// or a required part is missing.
    pub fn from_element(el: &Element) -> SamlResult<Self> {
        if !el.is(SAML_NS, "Assertion") {
            return Err(SamlError::SchemaMismatch(format!(
                "expected <saml:Assertion>, found <{}>",
                el.qualified_name()
            )));
        }

        Ok(Self {
            id: required_attr(el, "ID")?.to_string(),
            version: el.attribute("Version").unwrap_or(SAML_VERSION).to_string(),
            issue_instant: parse_instant(required_attr(el, "IssueInstant")?)?,
            issuer: required_issuer(el)?,
            signature: XmlSignature::child_of(el)?,
            subject: el
                .child_element(SAML_NS, "Subject")
                .map(Subject::from_element)
                .transpose()?,
            conditions: el
                .child_element(SAML_NS, "Conditions")
                .map(Conditions::from_element)
                .transpose()?,
            authn_statement: el
                .child_element(SAML_NS, "AuthnStatement")
                .map(AuthnStatement::from_element)
                .transpose()?,
            attribute_statement: el
                .child_element(SAML_NS, "AttributeStatement")
                .map(AttributeStatement::from_element),
        })
    }
}

/// Subject of an assertion.
///
/// Identifies the principal that is the subject of all statements in the assertion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subject {
    /// The name identifier for the subject.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name_id: Option<NameId>,

    /// Subject confirmation data.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub subject_confirmations: Vec<SubjectConfirmation>,
}

impl Subject {
    /// Creates a new subject with a name ID.
    #[must_use]
    pub fn new(name_id: NameId) -> Self {
        Self {
            name_id: Some(name_id),
            subject_confirmations: Vec::new(),
        }
    }

    /// Adds a subject confirmation.
    #[must_use]
    pub fn with_confirmation(mut self, confirmation: SubjectConfirmation) -> Self {
        self.subject_confirmations.push(confirmation);
        self
    }

    fn to_element(&self) -> Element {
        Element::new("saml", "Subject", SAML_NS)
            .opt_child(self.name_id.as_ref().map(NameId::to_element))
            .extend_children(self.subject_confirmations.iter().map(SubjectConfirmation::to_element))
    }

    fn from_element(el: &Element) -> SamlResult<Self> {
        Ok(Self {
            name_id: el.child_element(SAML_NS, "NameID").map(NameId::from_element),
            subject_confirmations: el
                .child_elements(SAML_NS, "SubjectConfirmation")
                .map(SubjectConfirmation::from_element)
                .collect::<SamlResult<_>>()?,
        })
    }
}

/// Subject confirmation.
///
/// Information that allows the assertion consumer to confirm the subject.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubjectConfirmation {
    /// The confirmation method.
    pub method: String,

    /// Additional confirmation data.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subject_confirmation_data: Option<SubjectConfirmationData>,
}

impl SubjectConfirmation {
    /// Creates a bearer confirmation.
    #[must_use]
    pub fn bearer() -> Self {
        Self {
            method: BEARER_CONFIRMATION.to_string(),
            subject_confirmation_data: None,
        }
    }

    /// Sets the confirmation data.
    #[must_use]
    pub fn with_data(mut self, data: SubjectConfirmationData) -> Self {
        self.subject_confirmation_data = Some(data);
        self
    }

    fn to_element(&self) -> Element {
        Element::new("saml", "SubjectConfirmation", SAML_NS)
            .attr("Method", self.method.as_str())
            .opt_child(
                self.subject_confirmation_data
                    .as_ref()
                    .map(SubjectConfirmationData::to_element),
            )
    }

    fn from_element(el: &Element) -> SamlResult<Self> {
        Ok(Self {
            method: required_attr(el, "Method")?.to_string(),
            subject_confirmation_data: el
                .child_element(SAML_NS, "SubjectConfirmationData")
                .map(SubjectConfirmationData::from_element)
                .transpose()?,
        })
    }
}

/// Subject confirmation data.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubjectConfirmationData {
    /// The request ID that this assertion responds to.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub in_response_to: Option<String>,

    /// Time after which the subject can no longer be confirmed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub not_on_or_after: Option<DateTime<Utc>>,

    /// Time before which the subject cannot be confirmed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub not_before: Option<DateTime<Utc>>,

    /// The location to which the assertion can be presented.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recipient: Option<String>,

    /// IP address of the subject.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
}

impl SubjectConfirmationData {
    /// Creates confirmation data for a request, valid for `minutes` after `now`.
    ///
    /// # Errors
    ///
    /// Returns [`SamlError::Config`] if the expiry would overflow.
    pub fn for_request(
        request_id: impl Into<String>,
        recipient: impl Into<String>,
        now: DateTime<Utc>,
        minutes: i64,
    ) -> SamlResult<Self> {
        Ok(Self {
            in_response_to: Some(request_id.into()),
            recipient: Some(recipient.into()),
            not_on_or_after: Some(plus_minutes(now, minutes)?),
            not_before: None,
            address: None,
        })
    }

    fn to_element(&self) -> Element {
        Element::new("saml", "SubjectConfirmationData", SAML_NS)
            .opt_attr("NotBefore", opt_instant(self.not_before.as_ref()))
            .opt_attr("NotOnOrAfter", opt_instant(self.not_on_or_after.as_ref()))
            .opt_attr("Recipient", self.recipient.as_deref())
            .opt_attr("InResponseTo", self.in_response_to.as_deref())
            .opt_attr("Address", self.address.as_deref())
    }

    fn from_element(el: &Element) -> SamlResult<Self> {
        Ok(Self {
            in_response_to: el.attribute("InResponseTo").map(str::to_string),
            not_on_or_after: optional_instant(el, "NotOnOrAfter")?,
            not_before: optional_instant(el, "NotBefore")?,
            recipient: el.attribute("Recipient").map(str::to_string),
            address: el.attribute("Address").map(str::to_string),
        })
    }
}

/// Conditions for assertion validity.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Conditions {
    /// Time before which the assertion is not valid.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub not_before: Option<DateTime<Utc>>,

    /// Time at or after which the assertion is not valid.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub not_on_or_after: Option<DateTime<Utc>>,

    /// Audience restrictions.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub audience_restrictions: Vec<AudienceRestriction>,
}

impl Conditions {
    /// Creates conditions valid from `now` for `validity_minutes`.
    ///
    /// # Errors
    ///
    /// Returns [`SamlError::Config`] if the window end would overflow.
    pub fn with_validity(now: DateTime<Utc>, validity_minutes: i64) -> SamlResult<Self> {
        Ok(Self {
            not_before: Some(now),
            not_on_or_after: Some(plus_minutes(now, validity_minutes)?),
            audience_restrictions: Vec::new(),
        })
    }

    /// Adds an audience restriction.
    #[must_use]
    pub fn with_audience(mut self, audience: impl Into<String>) -> Self {
        self.audience_restrictions.push(AudienceRestriction {
            audiences: vec![audience.into()],
        });
        self
    }

    fn to_element(&self) -> Element {
        Element::new("saml", "Conditions", SAML_NS)
            .opt_attr("NotBefore", opt_instant(self.not_before.as_ref()))
            .opt_attr("NotOnOrAfter", opt_instant(self.not_on_or_after.as_ref()))
            .extend_children(self.audience_restrictions.iter().map(|restriction| {
                Element::new("saml", "AudienceRestriction", SAML_NS).extend_children(
                    restriction
                        .audiences
                        .iter()
                        .map(|a| Element::new("saml", "Audience", SAML_NS).text(a.as_str())),
                )
            }))
    }

    fn from_element(el: &Element) -> SamlResult<Self> {
        Ok(Self {
            not_before: optional_instant(el, "NotBefore")?,
            not_on_or_after: optional_instant(el, "NotOnOrAfter")?,
            audience_restrictions: el
                .child_elements(SAML_NS, "AudienceRestriction")
                .map(|restriction| AudienceRestriction {
                    audiences: restriction
                        .child_elements(SAML_NS, "Audience")
                        .map(|a| a.text_content().trim().to_string())
                        .collect(),
                })
                .collect(),
        })
    }
}

/// Audience restriction.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AudienceRestriction {
    /// List of valid audiences.
    pub audiences: Vec<String>,
}

/// Authentication statement.
///
/// Describes the act of authentication performed by the subject.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthnStatement {
    /// The time of authentication.
    pub authn_instant: DateTime<Utc>,

    /// The session index (for session management).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_index: Option<String>,

    /// Time at which the session ends.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_not_on_or_after: Option<DateTime<Utc>>,

    /// The authentication context class reference.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub authn_context_class_ref: Option<String>,
}

impl AuthnStatement {
    /// Creates a new authentication statement.
    #[must_use]
    pub fn new(authn_instant: DateTime<Utc>, context_class: AuthnContextClass) -> Self {
        Self {
            authn_instant,
            session_index: None,
            session_not_on_or_after: None,
            authn_context_class_ref: Some(context_class.uri().to_string()),
        }
    }

    /// Sets the session index.
    #[must_use]
    pub fn with_session_index(mut self, index: impl Into<String>) -> Self {
        self.session_index = Some(index.into());
        self
    }

    /// Sets the session timeout relative to the authentication instant.
    ///
    /// # Errors
    ///
    /// Returns [`SamlError::Config`] if the timeout would overflow.
    pub fn with_session_timeout(mut self, timeout_minutes: i64) -> SamlResult<Self> {
        self.session_not_on_or_after = Some(plus_minutes(self.authn_instant, timeout_minutes)?);
        Ok(self)
    }

    fn to_element(&self) -> Element {
        let context = Element::new("saml", "AuthnContext", SAML_NS).opt_child(
            self.authn_context_class_ref
                .as_ref()
                .map(|class| Element::new("saml", "AuthnContextClassRef", SAML_NS).text(class.as_str())),
        );

        Element::new("saml", "AuthnStatement", SAML_NS)
            .attr("AuthnInstant", format_instant(&self.authn_instant))
            .opt_attr("SessionIndex", self.session_index.as_deref())
            .opt_attr(
                "SessionNotOnOrAfter",
                opt_instant(self.session_not_on_or_after.as_ref()),
            )
            .child(context)
    }

    fn from_element(el: &Element) -> SamlResult<Self> {
        Ok(Self {
            authn_instant: parse_instant(required_attr(el, "AuthnInstant")?)?,
            session_index: el.attribute("SessionIndex").map(str::to_string),
            session_not_on_or_after: optional_instant(el, "SessionNotOnOrAfter")?,
            authn_context_class_ref: el
                .child_element(SAML_NS, "AuthnContext")
                .and_then(|context| child_text(context, SAML_NS, "AuthnContextClassRef")),
        })
    }
}

/// Attribute statement.
///
/// Contains attributes about the subject, in document order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributeStatement {
    /// List of attributes.
    pub attributes: Vec<Attribute>,
}

impl AttributeStatement {
    /// Creates a new empty attribute statement.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            attributes: Vec::new(),
        }
    }

    /// Adds an attribute.
    #[must_use]
    pub fn with_attribute(mut self, attr: Attribute) -> Self {
        self.attributes.push(attr);
        self
    }

    fn to_element(&self) -> Element {
        Element::new("saml", "AttributeStatement", SAML_NS)
            .extend_children(self.attributes.iter().map(Attribute::to_element))
    }

    fn from_element(el: &Element) -> Self {
        Self {
            attributes: el
                .child_elements(SAML_NS, "Attribute")
                .filter_map(Attribute::from_element)
                .collect(),
        }
    }
}

/// SAML Attribute.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attribute {
    /// The attribute name (typically a URI).
    pub name: String,

    /// The format of the attribute name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name_format: Option<String>,

    /// A human-readable name for the attribute.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub friendly_name: Option<String>,

    /// The attribute values.
    pub values: Vec<String>,
}

impl Attribute {
    /// URI name format.
    pub const NAME_FORMAT_URI: &'static str = "urn:oasis:names:tc:SAML:2.0:attrname-format:uri";

    /// Basic name format.
    pub const NAME_FORMAT_BASIC: &'static str =
        "urn:oasis:names:tc:SAML:2.0:attrname-format:basic";

    /// Creates a new attribute with a single value.
    #[must_use]
    pub fn single(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self::multi(name, vec![value.into()])
    }

    /// Creates a new attribute with multiple values.
    #[must_use]
    pub fn multi(name: impl Into<String>, values: Vec<String>) -> Self {
        Self {
            name: name.into(),
            name_format: None,
            friendly_name: None,
            values,
        }
    }

    /// Sets the friendly name.
    #[must_use]
    pub fn with_friendly_name(mut self, name: impl Into<String>) -> Self {
        self.friendly_name = Some(name.into());
        self
    }

    /// Sets the name format.
    #[must_use]
    pub fn with_format(mut self, format: impl Into<String>) -> Self {
        self.name_format = Some(format.into());
        self
    }

    /// Returns true if `name` is this attribute's `Name` or `FriendlyName`.
    #[must_use]
    pub fn matches(&self, name: &str) -> bool {
        self.name == name || self.friendly_name.as_deref() == Some(name)
    }

    fn to_element(&self) -> Element {
        Element::new("saml", "Attribute", SAML_NS)
            .attr("Name", self.name.as_str())
            .opt_attr("NameFormat", self.name_format.as_deref())
            .opt_attr("FriendlyName", self.friendly_name.as_deref())
            .extend_children(
                self.values
                    .iter()
                    .map(|v| Element::new("saml", "AttributeValue", SAML_NS).text(v.as_str())),
            )
    }

    // Nameless attributes are skipped.
    fn from_element(el: &Element) -> Option<Self> {
        Some(Self {
            name: el.attribute("Name")?.to_string(),
            name_format: el.attribute("NameFormat").map(str::to_string),
            friendly_name: el.attribute("FriendlyName").map(str::to_string),
            values: el
                .child_elements(SAML_NS, "AttributeValue")
                .map(Element::text_content)
                .collect(),
        })
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn instant() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap()
    }

    fn sample() -> Assertion {
        let now = instant();
        let mut assertion = Assertion::with_id("_a1", "https://idp.example.com")
            .with_subject(
                Subject::new(NameId::email("user@example.com")).with_confirmation(
                    SubjectConfirmation::bearer().with_data(SubjectConfirmationData::for_request(
                        "_req1",
                        "https://sp.example.com/acs",
                        now,
                        5,
                    )
                    .unwrap()),
                ),
            )
            .with_conditions(Conditions::with_validity(now, 5).unwrap().with_audience("https://sp.example.com"))
            .with_authn_statement(
                AuthnStatement::new(now, AuthnContextClass::PasswordProtectedTransport)
                    .with_session_index("sessionindex"),
            )
            .with_attribute_statement(
                AttributeStatement::new()
                    .with_attribute(
                        Attribute::single("urn:oid:0.9.2342.19200300.100.1.3", "user@example.com")
                            .with_friendly_name("mail")
                            .with_format(Attribute::NAME_FORMAT_URI),
                    )
                    .with_attribute(Attribute::multi(
                        "roles",
                        vec!["admin".to_string(), "user".to_string()],
                    )),
            );
        assertion.issue_instant = now;
        assertion
    }

    #[test]
    fn assertion_accessors() {
        let assertion = sample();
        assert_eq!(assertion.session_index(), Some("sessionindex"));
        assert_eq!(assertion.name_id().map(|n| n.value.as_str()), Some("user@example.com"));
        assert_eq!(assertion.attribute("mail").map(|a| a.values.len()), Some(1));
        assert_eq!(assertion.attribute("roles").map(|a| a.values.len()), Some(2));
        assert!(assertion.attribute("missing").is_none());
        assert!(assertion.bearer_confirmation().is_some());
    }

    #[test]
    fn assertion_validation() {
        let assertion = sample();
        let now = instant();

        assert!(assertion.validate("https://sp.example.com", now).is_ok());
        assert!(matches!(
            assertion.validate("https://other.example.com", now),
            Err(SamlError::InvalidAudience { .. })
        ));
        assert!(matches!(
            assertion.validate("https://sp.example.com", now - chrono::Duration::seconds(1)),
            Err(SamlError::AssertionNotYetValid)
        ));
        assert!(matches!(
            assertion.validate("https://sp.example.com", now + chrono::Duration::minutes(5)),
            Err(SamlError::AssertionExpired)
        ));
    }

    #[test]
    fn assertion_survives_xml() {
        let assertion = sample();
        let xml = assertion.to_element().to_xml().unwrap();
        assert!(xml.contains(r#"SessionIndex="sessionindex""#));

        let parsed = Assertion::from_element(&Element::parse(&xml).unwrap()).unwrap();
        assert_eq!(parsed, assertion);
    }

    #[test]
    fn assertion_requires_issuer() {
        let el = Element::new("saml", "Assertion", SAML_NS)
            .declare("saml", SAML_NS)
            .attr("ID", "_x")
            .attr("IssueInstant", "2024-03-01T09:00:00Z");
        assert!(matches!(
            Assertion::from_element(&el),
            Err(SamlError::SchemaMismatch(_))
        ));
    }

    #[test]
    fn validity_overflow_is_config_error() {
        let now = instant();
        assert!(matches!(
            Conditions::with_validity(now, i64::MAX),
            Err(SamlError::Config(_))
        ));
        assert!(matches!(
            SubjectConfirmationData::for_request("_r", "https://sp.example.com/acs", now, i64::MIN),
            Err(SamlError::Config(_))
        ));
        assert!(matches!(
            AuthnStatement::new(now, AuthnContextClass::Password).with_session_timeout(i64::MAX / 60),
            Err(SamlError::Config(_))
        ));

        let statement = AuthnStatement::new(now, AuthnContextClass::Password)
            .with_session_timeout(30)
            .unwrap();
        assert_eq!(
            statement.session_not_on_or_after,
            Some(now + chrono::TimeDelta::minutes(30))
        );
    }
}
