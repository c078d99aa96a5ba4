//! SAML AuthnRequest types.
//!
//! Authentication request message sent by a service provider to an identity provider.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::message::{
    generate_id, issuer_element, optional_bool, parse_header, protocol_root, MessageKind,
    SamlMessage,
};
use super::{
    format_instant, AuthnContextClass, NameIdFormat, NameIdPolicy, SamlBinding, SAMLP_NS,
    SAML_NS, SAML_VERSION,
};
use crate::error::{SamlError, SamlResult};
use crate::settings::Settings;
use crate::xml::Element;

/// SAML Authentication Request.
///
/// An authentication request message sent from a service provider to an
/// identity provider requesting authentication of a principal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthnRequest {
    /// Unique identifier for this request.
    pub id: String,

    /// Version of the SAML protocol (always "2.0").
    #[serde(default = "default_version")]
    pub version: String,

    /// Timestamp when this request was issued.
    pub issue_instant: DateTime<Utc>,

    /// The entity ID of the service provider issuing the request.
    pub issuer: String,

    /// The URL where the response should be sent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assertion_consumer_service_url: Option<String>,

    /// The IdP endpoint this request is sent to.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub destination: Option<String>,

    /// Binding to use for the response.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub protocol_binding: Option<String>,

    /// Name ID policy constraints.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name_id_policy: Option<NameIdPolicy>,

    /// Requested authentication context.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub requested_authn_context: Option<RequestedAuthnContext>,

    /// Whether the IdP must authenticate the user directly.
    #[serde(default)]
    pub force_authn: bool,

    /// Whether the IdP must not interact with the user.
    #[serde(default)]
    pub is_passive: bool,

    /// A human-readable name for the requester.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider_name: Option<String>,
}

fn default_version() -> String {
    SAML_VERSION.to_string()
}

impl AuthnRequest {
    /// Creates a new authentication request with a fresh ID and the current time.
    #[must_use]
    pub fn new(issuer: impl Into<String>) -> Self {
        Self {
            id: generate_id(),
            version: default_version(),
            issue_instant: Utc::now(),
            issuer: issuer.into(),
            assertion_consumer_service_url: None,
            destination: None,
            protocol_binding: None,
            name_id_policy: None,
            requested_authn_context: None,
            force_authn: false,
            is_passive: false,
            provider_name: None,
        }
    }

    /// Builds the request a service provider sends to start single sign-on.
    ///
    /// The response is requested over HTTP-POST with a transient name ID the
    /// IdP may create.
    ///
    /// # Errors
    ///
    /// Returns [`SamlError::Config`] if the SP entity ID is empty.
    pub fn build(
        settings: &Settings,
        id: impl Into<String>,
        issue_instant: DateTime<Utc>,
    ) -> SamlResult<Self> {
        if settings.sp.entity_id.is_empty() {
            return Err(SamlError::Config("SP entity ID is required".into()));
        }

        let mut request = Self::new(settings.sp.entity_id.as_str())
            .with_acs_url(settings.sp.assertion_consumer_service_url.as_str())
            .with_destination(settings.idp.single_sign_on_url.as_str())
            .with_binding(SamlBinding::HttpPost)
            .with_name_id_policy(
                NameIdPolicy::with_format(NameIdFormat::Transient).allow_create(true),
            );
        request.id = id.into();
        request.issue_instant = issue_instant;
        Ok(request)
    }

    /// Sets the assertion consumer service URL.
    #[must_use]
    pub fn with_acs_url(mut self, url: impl Into<String>) -> Self {
        self.assertion_consumer_service_url = Some(url.into());
        self
    }

    /// Sets the destination URL.
    #[must_use]
    pub fn with_destination(mut self, url: impl Into<String>) -> Self {
        self.destination = Some(url.into());
        self
    }

    /// Sets the protocol binding for the response.
    #[must_use]
    pub fn with_binding(mut self, binding: SamlBinding) -> Self {
        self.protocol_binding = Some(binding.uri().to_string());
        self
    }

    /// Sets the name ID policy.
    #[must_use]
    pub fn with_name_id_policy(mut self, policy: NameIdPolicy) -> Self {
        self.name_id_policy = Some(policy);
        self
    }

    /// Sets the requested authentication context.
    #[must_use]
    pub fn with_authn_context(mut self, context: RequestedAuthnContext) -> Self {
        self.requested_authn_context = Some(context);
        self
    }

    /// Sets force authentication.
    #[must_use]
    pub const fn force_authn(mut self, force: bool) -> Self {
        self.force_authn = force;
        self
    }

    /// Sets passive authentication.
    #[must_use]
    pub const fn is_passive(mut self, passive: bool) -> Self {
        self.is_passive = passive;
        self
    }

    /// Sets the provider name.
    #[must_use]
    pub fn with_provider_name(mut self, name: impl Into<String>) -> Self {
        self.provider_name = Some(name.into());
        self
    }

    /// Returns the parsed protocol binding.
    #[must_use]
    pub fn parsed_binding(&self) -> Option<SamlBinding> {
        self.protocol_binding.as_deref().and_then(SamlBinding::from_uri)
    }
}

impl SamlMessage for AuthnRequest {
    const KIND: MessageKind = MessageKind::AuthnRequest;

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
            .opt_attr("ProviderName", self.provider_name.as_deref())
            .opt_attr("ForceAuthn", self.force_authn.then_some("true"))
            .opt_attr("IsPassive", self.is_passive.then_some("true"))
            .opt_attr("ProtocolBinding", self.protocol_binding.as_deref())
            .opt_attr(
                "AssertionConsumerServiceURL",
                self.assertion_consumer_service_url.as_deref(),
            )
            .child(issuer_element(&self.issuer))
            .opt_child(self.name_id_policy.as_ref().map(NameIdPolicy::to_element))
            .opt_child(
                self.requested_authn_context
                    .as_ref()
                    .map(RequestedAuthnContext::to_element),
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
            assertion_consumer_service_url: el
                .attribute("AssertionConsumerServiceURL")
                .map(str::to_string),
            protocol_binding: el.attribute("ProtocolBinding").map(str::to_string),
            name_id_policy: el
                .child_element(SAMLP_NS, "NameIDPolicy")
                .map(NameIdPolicy::from_element)
                .transpose()?,
            requested_authn_context: el
                .child_element(SAMLP_NS, "RequestedAuthnContext")
                .map(RequestedAuthnContext::from_element)
                .transpose()?,
            force_authn: optional_bool(el, "ForceAuthn")?.unwrap_or(false),
            is_passive: optional_bool(el, "IsPassive")?.unwrap_or(false),
            provider_name: el.attribute("ProviderName").map(str::to_string),
        })
    }
}

/// Requested authentication context.
///
/// Specifies the authentication context requirements for the request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestedAuthnContext {
    /// Comparison method for the authentication context.
    #[serde(default)]
    pub comparison: AuthnContextComparison,

    /// List of acceptable authentication context class references.
    #[serde(default)]
    pub authn_context_class_refs: Vec<String>,
}

impl RequestedAuthnContext {
    /// Creates a new requested authentication context.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            comparison: AuthnContextComparison::Exact,
            authn_context_class_refs: Vec::new(),
        }
    }

    /// Creates a context requiring exact match of a class reference.
    #[must_use]
    pub fn exact(class: AuthnContextClass) -> Self {
        Self::new().with_class_ref(class)
    }

    /// Adds a class reference.
    #[must_use]
    pub fn with_class_ref(mut self, class: AuthnContextClass) -> Self {
        self.authn_context_class_refs.push(class.uri().to_string());
        self
    }

    /// Sets the comparison method.
    #[must_use]
    pub const fn with_comparison(mut self, comparison: AuthnContextComparison) -> Self {
        self.comparison = comparison;
        self
    }

    fn to_element(&self) -> Element {
        Element::new("samlp", "RequestedAuthnContext", SAMLP_NS)
            .attr("Comparison", self.comparison.as_str())
            .extend_children(self.authn_context_class_refs.iter().map(|class| {
                Element::new("saml", "AuthnContextClassRef", SAML_NS).text(class.as_str())
            }))
    }

    fn from_element(el: &Element) -> SamlResult<Self> {
        let comparison = match el.attribute("Comparison") {
            Some(value) => AuthnContextComparison::from_str_value(value).ok_or_else(|| {
                SamlError::SchemaMismatch(format!("unknown Comparison {value:?}"))
            })?,
            None => AuthnContextComparison::Exact,
        };
        Ok(Self {
            comparison,
            authn_context_class_refs: el
                .child_elements(SAML_NS, "AuthnContextClassRef")
                .map(|class| class.text_content().trim().to_string())
                .collect(),
        })
    }
}

/// Authentication context comparison methods.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthnContextComparison {
    /// Exact match required.
    #[default]
    Exact,
    /// Match must be at least as strong.
    Minimum,
    /// Match must be at most as strong.
    Maximum,
    /// Match must be stronger.
    Better,
}

impl AuthnContextComparison {
    /// Returns the string value for this comparison.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Exact => "exact",
            Self::Minimum => "minimum",
            Self::Maximum => "maximum",
            Self::Better => "better",
        }
    }

    fn from_str_value(value: &str) -> Option<Self> {
        match value {
            "exact" => Some(Self::Exact),
            "minimum" => Some(Self::Minimum),
            "maximum" => Some(Self::Maximum),
            "better" => Some(Self::Better),
            _ => None,
        }
    }
}
