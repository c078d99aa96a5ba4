//! Behaviour shared by the four protocol messages.

use chrono::{DateTime, SecondsFormat, TimeDelta, Utc};

use super::{SAMLP_NS, SAML_NS, SAML_VERSION};
use crate::error::{SamlError, SamlResult};
use crate::xml::Element;

/// Direction of a message, which selects its transport parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SamlMessageType {
    /// AuthnRequest or LogoutRequest.
    Request,
    /// Response or LogoutResponse.
    Response,
}

impl SamlMessageType {
    /// Returns the form/query parameter name for this message type.
    #[must_use]
    pub const fn form_param(&self) -> &'static str {
        match self {
            Self::Request => "SAMLRequest",
            Self::Response => "SAMLResponse",
        }
    }
}

/// The four protocol messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageKind {
    /// `samlp:AuthnRequest`.
    AuthnRequest,
    /// `samlp:Response`.
    Response,
    /// `samlp:LogoutRequest`.
    LogoutRequest,
    /// `samlp:LogoutResponse`.
    LogoutResponse,
}

impl MessageKind {
    /// Returns the local name of the root element.
    #[must_use]
    pub const fn element_name(self) -> &'static str {
        match self {
            Self::AuthnRequest => "AuthnRequest",
            Self::Response => "Response",
            Self::LogoutRequest => "LogoutRequest",
            Self::LogoutResponse => "LogoutResponse",
        }
    }

    /// Returns whether this is a request or a response.
    #[must_use]
    pub const fn message_type(self) -> SamlMessageType {
        match self {
            Self::AuthnRequest | Self::LogoutRequest => SamlMessageType::Request,
            Self::Response | Self::LogoutResponse => SamlMessageType::Response,
        }
    }
}

/// A SAML protocol message that can be written to and read from XML.
///
/// Parsing checks structure only. Embedded signatures are carried through
/// untouched; verifying them is the job of
/// [`XmlSignatureValidator`](crate::signature::XmlSignatureValidator).
pub trait SamlMessage: Sized {
    /// Which message this is.
    const KIND: MessageKind;

    /// Returns the message ID.
    fn id(&self) -> &str;

    /// Returns the issue instant.
    fn issue_instant(&self) -> DateTime<Utc>;

    /// Returns the issuer entity ID.
    fn issuer(&self) -> &str;

    /// Builds the XML tree for this message.
    fn to_element(&self) -> Element;

    /// Reads a message from a parsed XML tree.
    ///
    /// # Errors
    ///
    /// Returns [`SamlError::SchemaMismatch`] if the tree is not this message.
    fn from_element(element: &Element) -> SamlResult<Self>;

    /// Serializes this message.
    ///
    /// # Errors
    ///
    /// Returns an error if the writer fails.
    fn to_xml(&self) -> SamlResult<String> {
        self.to_element().to_xml()
    }

    /// Parses a message from an XML document.
    ///
    /// # Errors
    ///
    /// Returns [`SamlError::MalformedXml`] or [`SamlError::SchemaMismatch`].
    fn from_xml(xml: &str) -> SamlResult<Self> {
        Self::from_element(&Element::parse(xml)?)
    }
}

/// Generates a fresh message ID.
///
/// IDs are `xs:ID` values and must not start with a digit, hence the prefix.
#[must_use]
pub fn generate_id() -> String {
    format!("_{}", uuid::Uuid::new_v4())
}

/// Formats a timestamp as an `xs:dateTime` in UTC.
///
/// Fractional seconds are written only as far as needed, so parsing the
/// result gives back the same instant.
#[must_use]
pub fn format_instant(instant: &DateTime<Utc>) -> String {
    instant.to_rfc3339_opts(SecondsFormat::AutoSi, true)
}

/// Parses an `xs:dateTime` with an explicit offset.
///
/// # Errors
///
/// Returns [`SamlError::SchemaMismatch`] if the value is not a valid timestamp.
pub fn parse_instant(value: &str) -> SamlResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value.trim())
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| SamlError::SchemaMismatch(format!("invalid dateTime {value:?}: {e}")))
}

/// Returns `instant` moved forward by `minutes`.
///
/// # Errors
///
/// Returns [`SamlError::Config`] if the result is out of range.
pub fn plus_minutes(instant: DateTime<Utc>, minutes: i64) -> SamlResult<DateTime<Utc>> {
    TimeDelta::try_minutes(minutes)
        .and_then(|delta| instant.checked_add_signed(delta))
        .ok_or_else(|| {
            SamlError::Config(format!("{minutes} minutes after {instant} is out of range"))
        })
}

/// Fields every protocol message carries.
#[derive(Debug)]
pub(crate) struct Header {
    pub id: String,
    pub version: String,
    pub issue_instant: DateTime<Utc>,
    pub issuer: String,
    pub destination: Option<String>,
}

/// Checks the root element and reads the common header.
pub(crate) fn parse_header(el: &Element, kind: MessageKind) -> SamlResult<Header> {
    let expected = kind.element_name();
    if el.name != expected {
        return Err(SamlError::SchemaMismatch(format!(
            "expected <{expected}>, found <{}>",
            el.qualified_name()
        )));
    }
    if el.namespace.as_deref() != Some(SAMLP_NS) {
        return Err(SamlError::SchemaMismatch(format!(
            "<{expected}> is not in the protocol namespace"
        )));
    }

    Ok(Header {
        id: required_attr(el, "ID")?.to_string(),
        version: el.attribute("Version").unwrap_or(SAML_VERSION).to_string(),
        issue_instant: parse_instant(required_attr(el, "IssueInstant")?)?,
        issuer: required_issuer(el)?,
        destination: el.attribute("Destination").map(str::to_string),
    })
}

/// Creates the root element for a protocol message, declaring `samlp` and `saml`.
pub(crate) fn protocol_root(kind: MessageKind) -> Element {
    Element::new("samlp", kind.element_name(), SAMLP_NS)
        .declare("samlp", SAMLP_NS)
        .declare("saml", SAML_NS)
}

pub(crate) fn issuer_element(issuer: &str) -> Element {
    Element::new("saml", "Issuer", SAML_NS).text(issuer)
}

pub(crate) fn required_issuer(el: &Element) -> SamlResult<String> {
    el.child_element(SAML_NS, "Issuer")
        .map(|issuer| issuer.text_content().trim().to_string())
        .filter(|issuer| !issuer.is_empty())
        .ok_or_else(|| SamlError::SchemaMismatch(format!("<{}> has no Issuer", el.name)))
}

pub(crate) fn required_attr<'a>(el: &'a Element, name: &str) -> SamlResult<&'a str> {
    el.attribute(name)
        .filter(|value| !value.is_empty())
        .ok_or_else(|| SamlError::SchemaMismatch(format!("<{}> is missing {name}", el.name)))
}

pub(crate) fn optional_instant(el: &Element, name: &str) -> SamlResult<Option<DateTime<Utc>>> {
    el.attribute(name).map(parse_instant).transpose()
}

pub(crate) fn optional_bool(el: &Element, name: &str) -> SamlResult<Option<bool>> {
    el.attribute(name)
        .map(|value| match value.trim() {
            "true" | "1" => Ok(true),
            "false" | "0" => Ok(false),
            other => Err(SamlError::SchemaMismatch(format!("invalid boolean {name}={other:?}"))),
        })
        .transpose()
}

pub(crate) fn child_text(el: &Element, namespace: &str, name: &str) -> Option<String> {
    el.child_element(namespace, name)
        .map(|child| child.text_content().trim().to_string())
}

pub(crate) fn opt_instant(instant: Option<&DateTime<Utc>>) -> Option<String> {
    instant.map(format_instant)
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    #[test]
    fn kinds_map_to_parameters() {
        assert_eq!(MessageKind::AuthnRequest.message_type().form_param(), "SAMLRequest");
        assert_eq!(MessageKind::LogoutRequest.message_type().form_param(), "SAMLRequest");
        assert_eq!(MessageKind::Response.message_type().form_param(), "SAMLResponse");
        assert_eq!(MessageKind::LogoutResponse.element_name(), "LogoutResponse");
    }

    #[test]
    fn instants_are_lossless() {
        let whole = Utc.with_ymd_and_hms(2024, 5, 1, 12, 30, 0).unwrap();
        assert_eq!(format_instant(&whole), "2024-05-01T12:30:00Z");

        let precise = whole + chrono::Duration::nanoseconds(123_456_789);
        let text = format_instant(&precise);
        assert_eq!(text, "2024-05-01T12:30:00.123456789Z");
        assert_eq!(parse_instant(&text).unwrap(), precise);
    }

    #[test]
    fn offsets_normalized_and_garbage_rejected() {
        let parsed = parse_instant("2024-05-01T14:30:00+02:00").unwrap();
        assert_eq!(format_instant(&parsed), "2024-05-01T12:30:00Z");
        assert!(matches!(parse_instant("yesterday"), Err(SamlError::SchemaMismatch(_))));
    }

    #[test]
    fn generated_ids_are_ncnames() {
        let id = generate_id();
        assert!(id.starts_with('_'));
        assert_ne!(id, generate_id());
    }

    #[test]
    fn header_requires_fields() {
        let el = protocol_root(MessageKind::LogoutResponse).attr("ID", "_1");
        assert!(matches!(
            parse_header(&el, MessageKind::LogoutResponse),
            Err(SamlError::SchemaMismatch(_))
        ));
        assert!(matches!(
            parse_header(&el, MessageKind::Response),
            Err(SamlError::SchemaMismatch(_))
        ));
    }
}
