//! SAML Logout types.
//!
//! Single Logout (SLO) request and response messages.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::message::{
    generate_id, issuer_element, opt_instant, optional_instant, parse_header, plus_minutes,
    protocol_root, MessageKind, SamlMessage,
};
use super::{format_instant, sub_status_codes, NameId, Status, StatusCode, SAMLP_NS, SAML_VERSION};
use crate::error::{SamlError, SamlResult};
use crate::settings::Settings;
use crate::xml::Element;

/// SAML Logout Request.
///
/// A request to terminate an existing session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogoutRequest {
    /// Unique identifier for this request.
    pub id: String,

    /// Version of the SAML protocol (always "2.0").
    #[serde(default = "default_version")]
    pub version: String,

    /// Timestamp when this request was issued.
    pub issue_instant: DateTime<Utc>,

    /// The entity ID of the requester.
    pub issuer: String,

    /// The URL where this request was sent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub destination: Option<String>,

    /// The name identifier of the principal to log out.
    pub name_id: NameId,

    /// Session indexes to terminate.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub session_indexes: Vec<String>,

    /// Reason for the logout.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,

    /// Time after which the request is no longer valid.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub not_on_or_after: Option<DateTime<Utc>>,
}

fn default_version() -> String {
    SAML_VERSION.to_string()
}

impl LogoutRequest {
    /// User logout reason.
    pub const REASON_USER: &'static str = "urn:oasis:names:tc:SAML:2.0:logout:user";

    /// Admin logout reason.
    pub const REASON_ADMIN: &'static str = "urn:oasis:names:tc:SAML:2.0:logout:admin";

    /// Creates a new logout request.
    #[must_use]
    pub fn new(issuer: impl Into<String>, name_id: NameId) -> Self {
        Self {
            id: generate_id(),
            version: default_version(),
            issue_instant: Utc::now(),
            issuer: issuer.into(),
            destination: None,
            name_id,
            session_indexes: Vec::new(),
            reason: None,
            not_on_or_after: None,
        }
    }

    /// Builds the request a service provider sends to end a session at the IdP.
    ///
    /// # Errors
    ///
    /// Returns [`SamlError::Config`] if the SP entity ID is empty.
    pub fn build(
        settings: &Settings,
        id: impl Into<String>,
        issue_instant: DateTime<Utc>,
        name_id: impl Into<NameId>,
        session_index: Option<&str>,
    ) -> SamlResult<Self> {
        if settings.sp.entity_id.is_empty() {
            return Err(SamlError::Config("SP entity ID is required".into()));
        }

        let mut request = Self::new(settings.sp.entity_id.as_str(), name_id.into())
            .with_destination(settings.idp.single_logout_url.as_str());
        if let Some(index) = session_index {
            request = request.with_session_index(index);
        }
        request.id = id.into();
        request.issue_instant = issue_instant;
        Ok(request)
    }

    /// Sets the destination URL.
    #[must_use]
    pub fn with_destination(mut self, url: impl Into<String>) -> Self {
        self.destination = Some(url.into());
        self
    }

    /// Adds a session index.
    #[must_use]
    pub fn with_session_index(mut self, index: impl Into<String>) -> Self {
        self.session_indexes.push(index.into());
        self
    }

    /// Sets the logout reason.
    #[must_use]
    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// Sets `NotOnOrAfter` to `minutes` after the issue instant.
    ///
    /// # Errors
    ///
    /// Returns [`SamlError::Config`] if the instant would overflow.
    pub fn valid_for(mut self, minutes: i64) -> SamlResult<Self> {
        self.not_on_or_after = Some(plus_minutes(self.issue_instant, minutes)?);
        Ok(self)
    }

    /// Returns the first session index, if any.
    #[must_use]
    pub fn session_index(&self) -> Option<&str> {
        self.session_indexes.first().map(String::as_str)
    }

    /// Validates the basic structure of this request.
    ///
    /// # Errors
    ///
    /// Returns [`SamlError::SchemaMismatch`] for a wrong version or an empty
    /// name ID, and [`SamlError::AssertionExpired`] once `not_on_or_after` has passed.
    pub fn validate(&self, now: DateTime<Utc>) -> SamlResult<()> {
        if self.version != SAML_VERSION {
            return Err(SamlError::SchemaMismatch(format!(
                "unsupported SAML version: {}",
                self.version
            )));
        }
        if self.name_id.value.is_empty() {
            return Err(SamlError::SchemaMismatch("NameID is required".into()));
        }
        if self.is_expired_at(now) {
            return Err(SamlError::AssertionExpired);
        }
        Ok(())
    }

    /// Checks if the request has expired at `now`.
    #[must_use]
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.not_on_or_after.is_some_and(|not_after| now >= not_after)
    }
}

impl SamlMessage for LogoutRequest {
    const KIND: MessageKind = MessageKind::LogoutRequest;

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
            .opt_attr("NotOnOrAfter", opt_instant(self.not_on_or_after.as_ref()))
            .opt_attr("Reason", self.reason.as_deref())
            .child(issuer_element(&self.issuer))
            .child(self.name_id.to_element())
            .extend_children(
                self.session_indexes
                    .iter()
                    .map(|index| Element::new("samlp", "SessionIndex", SAMLP_NS).text(index.as_str())),
            )
    }

    fn from_element(el: &Element) -> SamlResult<Self> {
        let header = parse_header(el, Self::KIND)?;
        Ok(Self {
            id: header.id,
            version: header.version,
            issue_instant: header.issue_instant,
            issuer: header.issuer,
            destination: header.destination,
            name_id: NameId::required_child(el)?,
            session_indexes: el
                .child_elements(SAMLP_NS, "SessionIndex")
                .map(|index| index.text_content().trim().to_string())
                .collect(),
            reason: el.attribute("Reason").map(str::to_string),
            not_on_or_after: optional_instant(el, "NotOnOrAfter")?,
        })
    }
}

/// SAML Logout Response.
///
/// A response to a logout request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogoutResponse {
    /// Unique identifier for this response.
    pub id: String,

    /// Version of the SAML protocol (always "2.0").
    #[serde(default = "default_version")]
    pub version: String,

    /// Timestamp when this response was issued.
    pub issue_instant: DateTime<Utc>,

    /// The entity ID of the responder.
    pub issuer: String,

    /// The ID of the request this response is for.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub in_response_to: Option<String>,

    /// The URL where this response was sent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub destination: Option<String>,

    /// The status of the response.
    pub status: Status,
}

impl LogoutResponse {
    /// Creates a new logout response with the given status.
    #[must_use]
    pub fn new(issuer: impl Into<String>, status: Status) -> Self {
        Self {
            id: generate_id(),
            version: default_version(),
            issue_instant: Utc::now(),
            issuer: issuer.into(),
            in_response_to: None,
            destination: None,
            status,
        }
    }

    /// Creates a new success logout response.
    #[must_use]
    pub fn success(issuer: impl Into<String>) -> Self {
        Self::new(issuer, Status::success())
    }

    /// Creates a partial logout response.
    #[must_use]
    pub fn partial_logout(issuer: impl Into<String>) -> Self {
        Self::new(
            issuer,
            Status {
                status_code: StatusCode::success()
                    .with_sub_status(StatusCode::new(sub_status_codes::PARTIAL_LOGOUT)),
                status_message: Some("Some sessions could not be terminated".to_string()),
            },
        )
    }

    /// Builds the answer a service provider sends back for an IdP-initiated logout.
    ///
    /// # Errors
    ///
    /// Returns [`SamlError::Config`] if the SP entity ID is empty.
    pub fn build(
        settings: &Settings,
        id: impl Into<String>,
        issue_instant: DateTime<Utc>,
        in_response_to: impl Into<String>,
        status: Status,
    ) -> SamlResult<Self> {
        if settings.sp.entity_id.is_empty() {
            return Err(SamlError::Config("SP entity ID is required".into()));
        }

        let mut response = Self::new(settings.sp.entity_id.as_str(), status)
            .in_response_to(in_response_to)
            .with_destination(settings.idp.single_logout_url.as_str());
        response.id = id.into();
        response.issue_instant = issue_instant;
        Ok(response)
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

    /// Returns true if this response indicates success.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    /// Checks a received logout response against the local settings.
    ///
    /// # Errors
    ///
    /// - [`SamlError::SchemaMismatch`] for a wrong version or empty ID or issuer
    /// - [`SamlError::InvalidIssuer`] if the issuer is not the configured IdP
    /// - [`SamlError::InvalidDestination`] if the destination is not the SP logout URL
    /// - [`SamlError::UnsuccessfulStatus`] for any non-success status
    pub fn validate(&self, settings: &Settings) -> SamlResult<()> {
        if self.version != SAML_VERSION {
            return Err(SamlError::SchemaMismatch(format!(
                "unsupported SAML version: {}",
                self.version
            )));
        }
        if self.id.is_empty() {
            return Err(SamlError::SchemaMismatch("ID is required".into()));
        }
        if self.issuer.is_empty() {
            return Err(SamlError::SchemaMismatch("Issuer is required".into()));
        }
        settings.check_idp_issuer(&self.issuer)?;
        if let Some(destination) = &self.destination {
            let expected = &settings.sp.single_logout_service_url;
            if destination != expected {
                return Err(SamlError::InvalidDestination {
                    expected: expected.clone(),
                    actual: destination.clone(),
                });
            }
        }
        self.status.ensure_success()
    }
}

impl SamlMessage for LogoutResponse {
    const KIND: MessageKind = MessageKind::LogoutResponse;

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
            .child(self.status.to_element())
    }

    fn from_element(el: &Element) -> SamlResult<Self> {
        let header = parse_header(el, Self::KIND)?;
        let status = el
            .child_element(SAMLP_NS, "Status")
            .ok_or_else(|| SamlError::SchemaMismatch("LogoutResponse has no Status".into()))?;
        Ok(Self {
            id: header.id,
            version: header.version,
            issue_instant: header.issue_instant,
            issuer: header.issuer,
            in_response_to: el.attribute("InResponseTo").map(str::to_string),
            destination: header.destination,
            status: Status::from_element(status)?,
        })
    }
}
