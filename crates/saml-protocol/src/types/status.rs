//! SAML Status types.
//!
//! Status information returned in SAML protocol responses.

use serde::{Deserialize, Serialize};

use super::{status_codes, sub_status_codes, SAMLP_NS};
use crate::error::{SamlError, SamlResult};
use crate::xml::Element;

/// SAML protocol status.
///
/// Contains the status code and optional message for a SAML response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Status {
    /// The status code.
    pub status_code: StatusCode,

    /// Optional status message.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status_message: Option<String>,
}

impl Status {
    /// Creates a success status.
    #[must_use]
    pub fn success() -> Self {
        Self {
            status_code: StatusCode::success(),
            status_message: None,
        }
    }

    /// Creates a requester error status.
    #[must_use]
    pub fn requester_error(message: impl Into<String>) -> Self {
        Self {
            status_code: StatusCode::requester(),
            status_message: Some(message.into()),
        }
    }

    /// Creates a responder error status.
    #[must_use]
    pub fn responder_error(message: impl Into<String>) -> Self {
        Self {
            status_code: StatusCode::responder(),
            status_message: Some(message.into()),
        }
    }

    /// Creates an authentication failed status.
    #[must_use]
    pub fn authn_failed(message: impl Into<String>) -> Self {
        Self {
            status_code: StatusCode::authn_failed(),
            status_message: Some(message.into()),
        }
    }

    /// Returns true if this status indicates success.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.status_code.is_success()
    }

    /// Sets the status message.
    #[must_use]
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.status_message = Some(message.into());
        self
    }

    /// Fails with [`SamlError::UnsuccessfulStatus`] unless this is a success.
    ///
    /// # Errors
    ///
    /// Returns the status code (and message, if any) of a non-success status.
    pub fn ensure_success(&self) -> SamlResult<()> {
        if self.is_success() {
            return Ok(());
        }
        let mut detail = self.status_code.value.clone();
        if let Some(sub) = self.status_code.sub_status_value() {
            detail.push_str(" / ");
            detail.push_str(sub);
        }
        if let Some(message) = &self.status_message {
            detail.push_str(": ");
            detail.push_str(message);
        }
        Err(SamlError::UnsuccessfulStatus(detail))
    }

    pub(crate) fn to_element(&self) -> Element {
        Element::new("samlp", "Status", SAMLP_NS)
            .child(self.status_code.to_element())
            .opt_child(
                self.status_message
                    .as_ref()
                    .map(|m| Element::new("samlp", "StatusMessage", SAMLP_NS).text(m.as_str())),
            )
    }

    pub(crate) fn from_element(el: &Element) -> SamlResult<Self> {
        let code = el
            .child_element(SAMLP_NS, "StatusCode")
            .ok_or_else(|| SamlError::SchemaMismatch("Status has no StatusCode".into()))?;
        Ok(Self {
            status_code: StatusCode::from_element(code)?,
            status_message: el
                .child_element(SAMLP_NS, "StatusMessage")
                .map(Element::text_content),
        })
    }
}

impl Default for Status {
    fn default() -> Self {
        Self::success()
    }
}

/// SAML status code.
///
/// Status codes can be nested, with a top-level code and optional sub-code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusCode {
    /// The status code URI value.
    pub value: String,

    /// Optional nested status code providing more detail.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status_code: Option<Box<StatusCode>>,
}

impl StatusCode {
    /// Creates a new status code with the given value.
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            status_code: None,
        }
    }

    /// Creates a success status code.
    #[must_use]
    pub fn success() -> Self {
        Self::new(status_codes::SUCCESS)
    }

    /// Creates a requester error status code.
    #[must_use]
    pub fn requester() -> Self {
        Self::new(status_codes::REQUESTER)
    }

    /// Creates a responder error status code.
    #[must_use]
    pub fn responder() -> Self {
        Self::new(status_codes::RESPONDER)
    }

    /// Creates an authentication failed status code.
    #[must_use]
    pub fn authn_failed() -> Self {
        Self::requester().with_sub_status(Self::new(sub_status_codes::AUTHN_FAILED))
    }

    /// Adds a sub-status code.
    #[must_use]
    pub fn with_sub_status(mut self, sub: StatusCode) -> Self {
        self.status_code = Some(Box::new(sub));
        self
    }

    /// Returns true if this is a success status code.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.value == status_codes::SUCCESS
    }

    /// Returns the sub-status code value if present.
    #[must_use]
    pub fn sub_status_value(&self) -> Option<&str> {
        self.status_code.as_ref().map(|s| s.value.as_str())
    }

    fn to_element(&self) -> Element {
        Element::new("samlp", "StatusCode", SAMLP_NS)
            .attr("Value", self.value.as_str())
            .opt_child(self.status_code.as_ref().map(|sub| sub.to_element()))
    }

    fn from_element(el: &Element) -> SamlResult<Self> {
        let value = el
            .attribute("Value")
            .ok_or_else(|| SamlError::SchemaMismatch("StatusCode has no Value".into()))?;
        let status_code = el
            .child_element(SAMLP_NS, "StatusCode")
            .map(Self::from_element)
            .transpose()?
            .map(Box::new);
        Ok(Self {
            value: value.to_string(),
            status_code,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_success() {
        let status = Status::success();
        assert!(status.is_success());
        assert!(status.status_message.is_none());
        assert!(status.ensure_success().is_ok());
    }

    #[test]
    fn status_error() {
        let status = Status::requester_error("Invalid request");
        assert!(!status.is_success());
        assert_eq!(status.status_message.as_deref(), Some("Invalid request"));
        assert!(matches!(
            status.ensure_success(),
            Err(SamlError::UnsuccessfulStatus(detail)) if detail.ends_with("Invalid request")
        ));
    }

    #[test]
    fn status_authn_failed() {
        let status = Status::authn_failed("Wrong password");
        assert!(!status.is_success());
        assert_eq!(
            status.status_code.sub_status_value(),
            Some("urn:oasis:names:tc:SAML:2.0:status:AuthnFailed")
        );
    }

    #[test]
    fn nested_codes_survive_xml() {
        let status = Status {
            status_code: StatusCode::responder()
                .with_sub_status(StatusCode::new(sub_status_codes::PARTIAL_LOGOUT)),
            status_message: Some("partial".into()),
        };
        let el = status.to_element();
        assert_eq!(Status::from_element(&el).unwrap(), status);
    }

    #[test]
    fn status_code_is_required() {
        let el = Element::new("samlp", "Status", SAMLP_NS);
        assert!(matches!(
            Status::from_element(&el),
            Err(SamlError::SchemaMismatch(_))
        ));
    }
}
