//! SAML Name ID types.
//!
//! Name identifiers are used to identify subjects in SAML assertions.

use serde::{Deserialize, Serialize};

use super::message::optional_bool;
use super::{NameIdFormat, SAMLP_NS, SAML_NS};
use crate::error::{SamlError, SamlResult};
use crate::xml::Element;

/// SAML Name ID.
///
/// Represents the identifier of a subject in a SAML assertion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NameId {
    /// The actual identifier value.
    pub value: String,

    /// The format of the name identifier.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,

    /// The security or administrative domain that qualifies the name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name_qualifier: Option<String>,

    /// The service provider's entity ID that qualifies the name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sp_name_qualifier: Option<String>,

    /// Alternative identifier assigned by the service provider.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sp_provided_id: Option<String>,
}

impl NameId {
    /// Creates a new name ID with the given value.
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            format: None,
            name_qualifier: None,
            sp_name_qualifier: None,
            sp_provided_id: None,
        }
    }

    /// Creates a new email name ID.
    #[must_use]
    pub fn email(email: impl Into<String>) -> Self {
        Self::new(email).with_format(NameIdFormat::Email)
    }

    /// Creates a new persistent name ID.
    #[must_use]
    pub fn persistent(value: impl Into<String>) -> Self {
        Self::new(value).with_format(NameIdFormat::Persistent)
    }

    /// Creates a new transient name ID.
    #[must_use]
    pub fn transient(value: impl Into<String>) -> Self {
        Self::new(value).with_format(NameIdFormat::Transient)
    }

    /// Sets the format for this name ID.
    #[must_use]
    pub fn with_format(mut self, format: NameIdFormat) -> Self {
        self.format = Some(format.uri().to_string());
        self
    }

    /// Sets the name qualifier.
    #[must_use]
    pub fn with_name_qualifier(mut self, qualifier: impl Into<String>) -> Self {
        self.name_qualifier = Some(qualifier.into());
        self
    }

    /// Sets the SP name qualifier.
    #[must_use]
    pub fn with_sp_name_qualifier(mut self, qualifier: impl Into<String>) -> Self {
        self.sp_name_qualifier = Some(qualifier.into());
        self
    }

    /// Sets the SP-provided identifier.
    #[must_use]
    pub fn with_sp_provided_id(mut self, id: impl Into<String>) -> Self {
        self.sp_provided_id = Some(id.into());
        self
    }

    /// Returns the parsed name ID format.
    #[must_use]
    pub fn parsed_format(&self) -> NameIdFormat {
        self.format
            .as_deref()
            .and_then(NameIdFormat::from_uri)
            .unwrap_or_default()
    }

    pub(crate) fn to_element(&self) -> Element {
        Element::new("saml", "NameID", SAML_NS)
            .opt_attr("Format", self.format.as_deref())
            .opt_attr("NameQualifier", self.name_qualifier.as_deref())
            .opt_attr("SPNameQualifier", self.sp_name_qualifier.as_deref())
            .opt_attr("SPProvidedID", self.sp_provided_id.as_deref())
            .text(self.value.as_str())
    }

    pub(crate) fn from_element(el: &Element) -> Self {
        Self {
            value: el.text_content().trim().to_string(),
            format: el.attribute("Format").map(str::to_string),
            name_qualifier: el.attribute("NameQualifier").map(str::to_string),
            sp_name_qualifier: el.attribute("SPNameQualifier").map(str::to_string),
            sp_provided_id: el.attribute("SPProvidedID").map(str::to_string),
        }
    }

    pub(crate) fn required_child(parent: &Element) -> SamlResult<Self> {
        parent
            .child_element(SAML_NS, "NameID")
            .map(Self::from_element)
            .ok_or_else(|| SamlError::SchemaMismatch(format!("<{}> has no NameID", parent.name)))
    }
}

impl From<&str> for NameId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for NameId {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

/// Name ID policy for authentication requests.
///
/// Specifies constraints on the name identifier to be returned.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NameIdPolicy {
    /// The requested name ID format.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,

    /// The SP name qualifier for the name ID.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sp_name_qualifier: Option<String>,

    /// Whether a new identifier should be created for this request.
    #[serde(default)]
    pub allow_create: bool,
}

impl NameIdPolicy {
    /// Creates a new name ID policy with no constraints.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            format: None,
            sp_name_qualifier: None,
            allow_create: false,
        }
    }

    /// Creates a policy requesting a specific format.
    #[must_use]
    pub fn with_format(format: NameIdFormat) -> Self {
        Self {
            format: Some(format.uri().to_string()),
            ..Self::new()
        }
    }

    /// Sets whether new identifiers can be created.
    #[must_use]
    pub const fn allow_create(mut self, allow: bool) -> Self {
        self.allow_create = allow;
        self
    }

    /// Returns the parsed name ID format.
    #[must_use]
    pub fn parsed_format(&self) -> Option<NameIdFormat> {
        self.format.as_deref().and_then(NameIdFormat::from_uri)
    }

    pub(crate) fn to_element(&self) -> Element {
        Element::new("samlp", "NameIDPolicy", SAMLP_NS)
            .opt_attr("Format", self.format.as_deref())
            .opt_attr("SPNameQualifier", self.sp_name_qualifier.as_deref())
            .attr("AllowCreate", self.allow_create.to_string())
    }

    pub(crate) fn from_element(el: &Element) -> SamlResult<Self> {
        Ok(Self {
            format: el.attribute("Format").map(str::to_string),
            sp_name_qualifier: el.attribute("SPNameQualifier").map(str::to_string),
            allow_create: optional_bool(el, "AllowCreate")?.unwrap_or(false),
        })
    }
}
