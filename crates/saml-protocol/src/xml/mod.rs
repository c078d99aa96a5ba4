//! Namespace-aware XML tree.
//!
//! SAML messages are small, so they are held as an owned tree rather than
//! streamed. Every element and attribute keeps both its lexical prefix and the
//! namespace URI it resolved to at parse time; the latter is what matching and
//! canonicalization operate on.
//!
//! Parsing is strict about well-formedness and rejects document type
//! declarations outright. Comments and processing instructions are dropped.
//! Line endings and attribute whitespace are normalized as XML 1.0 requires
//! of a parser, so a document re-wrapped with CRLF in transit yields the same
//! tree, and the same canonical form, as the original.

pub mod c14n;

use std::borrow::Cow;

use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};

use crate::error::{SamlError, SamlResult};

/// Namespace bound to the reserved `xml` prefix.
pub const XML_NS: &str = "http://www.w3.org/XML/1998/namespace";

/// Namespace declaration: `None` is the default namespace, an empty URI undeclares it.
pub type NamespaceDecl = (Option<String>, String);

/// A node in the tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    /// Child element.
    Element(Element),
    /// Character data, already unescaped.
    Text(String),
}

/// An attribute other than a namespace declaration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    /// Lexical prefix, if any.
    pub prefix: Option<String>,
    /// Local name.
    pub name: String,
    /// Resolved namespace URI; unprefixed attributes have none.
    pub namespace: Option<String>,
    /// Unescaped value.
    pub value: String,
}

impl Attribute {
    /// Returns `prefix:name` or `name`.
    #[must_use]
    pub fn qualified_name(&self) -> String {
        qualify(self.prefix.as_deref(), &self.name)
    }
}

/// An XML element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    /// Lexical prefix, if any.
    pub prefix: Option<String>,
    /// Local name.
    pub name: String,
    /// Resolved namespace URI.
    pub namespace: Option<String>,
    /// Namespace declarations made on this element, in document order.
    pub namespaces: Vec<NamespaceDecl>,
    /// Attributes in document order.
    pub attributes: Vec<Attribute>,
    /// Child nodes.
    pub children: Vec<Node>,
}

impl Element {
    /// Creates an element in `namespace` written with `prefix`.
    ///
    /// The namespace is not declared; call [`Element::declare`] on this element
    /// or an ancestor.
    #[must_use]
    pub fn new(prefix: &str, name: &str, namespace: &str) -> Self {
        Self {
            prefix: (!prefix.is_empty()).then(|| prefix.to_string()),
            name: name.to_string(),
            namespace: Some(namespace.to_string()),
            namespaces: Vec::new(),
            attributes: Vec::new(),
            children: Vec::new(),
        }
    }

    /// Adds a namespace declaration.
    #[must_use]
    pub fn declare(mut self, prefix: &str, uri: &str) -> Self {
        let prefix = (!prefix.is_empty()).then(|| prefix.to_string());
        self.namespaces.push((prefix, uri.to_string()));
        self
    }

    /// Adds an unqualified attribute.
    #[must_use]
    pub fn attr(mut self, name: &str, value: impl Into<String>) -> Self {
        self.attributes.push(Attribute {
            prefix: None,
            name: name.to_string(),
            namespace: None,
            value: value.into(),
        });
        self
    }

    /// Adds an unqualified attribute when `value` is present.
    #[must_use]
    pub fn opt_attr(self, name: &str, value: Option<impl Into<String>>) -> Self {
        match value {
            Some(value) => self.attr(name, value),
            None => self,
        }
    }

    /// Appends a child element.
    #[must_use]
    pub fn child(mut self, child: Element) -> Self {
        self.children.push(Node::Element(child));
        self
    }

    /// Appends a child element when present.
    #[must_use]
    pub fn opt_child(self, child: Option<Element>) -> Self {
        match child {
            Some(child) => self.child(child),
            None => self,
        }
    }

    /// Appends every element yielded by `children`.
    #[must_use]
    pub fn extend_children(mut self, children: impl IntoIterator<Item = Element>) -> Self {
        self.children.extend(children.into_iter().map(Node::Element));
        self
    }

    /// Appends a text node.
    #[must_use]
    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.children.push(Node::Text(text.into()));
        self
    }

    /// Returns `prefix:name` or `name`.
    #[must_use]
    pub fn qualified_name(&self) -> String {
        qualify(self.prefix.as_deref(), &self.name)
    }

    /// Returns true if this element has the given namespace and local name.
    #[must_use]
    pub fn is(&self, namespace: &str, name: &str) -> bool {
        self.name == name && self.namespace.as_deref() == Some(namespace)
    }

    /// Returns the value of an unqualified attribute.
    #[must_use]
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|a| a.namespace.is_none() && a.name == name)
            .map(|a| a.value.as_str())
    }

    /// Returns the value of a namespaced attribute.
    #[must_use]
    pub fn attribute_ns(&self, namespace: &str, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|a| a.namespace.as_deref() == Some(namespace) && a.name == name)
            .map(|a| a.value.as_str())
    }

    /// Iterates over child elements, skipping text.
    pub fn elements(&self) -> impl Iterator<Item = &Element> {
        self.children.iter().filter_map(|node| match node {
            Node::Element(el) => Some(el),
            Node::Text(_) => None,
        })
    }

    /// Returns the first child element with the given name.
    #[must_use]
    pub fn child_element(&self, namespace: &str, name: &str) -> Option<&Element> {
        self.elements().find(|el| el.is(namespace, name))
    }

    /// Iterates over child elements with the given name.
    pub fn child_elements<'a>(
        &'a self,
        namespace: &'a str,
        name: &'a str,
    ) -> impl Iterator<Item = &'a Element> + 'a {
        self.elements().filter(move |el| el.is(namespace, name))
    }

    /// Returns the concatenated text of this element and its descendants.
    #[must_use]
    pub fn text_content(&self) -> String {
        let mut out = String::new();
        self.collect_text(&mut out);
        out
    }

    fn collect_text(&self, out: &mut String) {
        for node in &self.children {
            match node {
                Node::Text(text) => out.push_str(text),
                Node::Element(el) => el.collect_text(out),
            }
        }
    }

    /// Finds the element (this one or a descendant) whose `ID` attribute equals `id`.
    #[must_use]
    pub fn find_by_id(&self, id: &str) -> Option<&Element> {
        if self.attribute("ID") == Some(id) {
            return Some(self);
        }
        self.elements().find_map(|el| el.find_by_id(id))
    }

    /// Mutable variant of [`Element::find_by_id`].
    pub fn find_by_id_mut(&mut self, id: &str) -> Option<&mut Element> {
        if self.attribute("ID") == Some(id) {
            return Some(self);
        }
        for node in &mut self.children {
            if let Node::Element(el) = node {
                if let Some(found) = el.find_by_id_mut(id) {
                    return Some(found);
                }
            }
        }
        None
    }

    /// Returns every namespace declaration in scope at the element with the
    /// given `ID`, outermost first, or `None` if no such element exists.
    #[must_use]
    pub fn namespaces_in_scope(&self, id: &str) -> Option<Vec<NamespaceDecl>> {
        let mut scope = Vec::new();
        self.collect_scope(id, &mut scope).then_some(scope)
    }

    fn collect_scope(&self, id: &str, scope: &mut Vec<NamespaceDecl>) -> bool {
        let mark = scope.len();
        scope.extend(self.namespaces.iter().cloned());
        if self.attribute("ID") == Some(id) {
            return true;
        }
        for el in self.elements() {
            if el.collect_scope(id, scope) {
                return true;
            }
        }
        scope.truncate(mark);
        false
    }

    /// Inserts `child` right after the first child element named
    /// `after_namespace:after_name`, or first if there is none.
    pub fn insert_after(&mut self, after_namespace: &str, after_name: &str, child: Element) {
        let position = self
            .children
            .iter()
            .position(|node| matches!(node, Node::Element(el) if el.is(after_namespace, after_name)))
            .map_or(0, |i| i + 1);
        self.children.insert(position, Node::Element(child));
    }

    /// Parses a document and returns its root element.
    ///
    /// # Errors
    ///
    /// Returns [`SamlError::MalformedXml`] if the document is not well-formed,
    /// contains a DTD, or uses an undeclared prefix.
    pub fn parse(xml: &str) -> SamlResult<Self> {
        let xml = normalize_line_endings(xml);
        let mut reader = Reader::from_str(&xml);
        let mut stack: Vec<Element> = Vec::new();
        let mut scopes: Vec<Vec<NamespaceDecl>> = Vec::new();
        let mut root: Option<Element> = None;

        loop {
            match reader.read_event()? {
                Event::Start(start) => {
                    ensure_single_root(&root)?;
                    let el = open_element(&start, &scopes)?;
                    scopes.push(el.namespaces.clone());
                    stack.push(el);
                }
                Event::Empty(start) => {
                    ensure_single_root(&root)?;
                    let el = open_element(&start, &scopes)?;
                    close_element(&mut stack, &mut root, el);
                }
                Event::End(_) => {
                    scopes.pop();
                    let el = stack
                        .pop()
                        .ok_or_else(|| SamlError::MalformedXml("unexpected end tag".into()))?;
                    close_element(&mut stack, &mut root, el);
                }
                Event::Text(text) => push_text(&mut stack, text.unescape()?)?,
                Event::CData(data) => {
                    let text = std::str::from_utf8(&data)
                        .map_err(|e| SamlError::MalformedXml(e.to_string()))?
                        .to_string();
                    push_text(&mut stack, Cow::Owned(text))?;
                }
                Event::DocType(_) => {
                    return Err(SamlError::MalformedXml(
                        "document type declarations are not permitted".into(),
                    ))
                }
                Event::Eof => break,
                _ => {}
            }
        }

        if !stack.is_empty() {
            return Err(SamlError::MalformedXml("unclosed element".into()));
        }
        root.ok_or_else(|| SamlError::MalformedXml("no root element".into()))
    }

    /// Serializes this element as a document without an XML declaration.
    ///
    /// # Errors
    ///
    /// Returns an error only if the writer fails.
    pub fn to_xml(&self) -> SamlResult<String> {
        let mut writer = Writer::new(Vec::new());
        self.write(&mut writer)?;
        String::from_utf8(writer.into_inner()).map_err(|e| SamlError::MalformedXml(e.to_string()))
    }

    fn write(&self, writer: &mut Writer<Vec<u8>>) -> SamlResult<()> {
        let qname = self.qualified_name();
        let mut start = BytesStart::new(qname.as_str());
        for (prefix, uri) in &self.namespaces {
            let key = match prefix {
                Some(prefix) => format!("xmlns:{prefix}"),
                None => "xmlns".to_string(),
            };
            start.push_attribute((key.as_str(), uri.as_str()));
        }
        for attr in &self.attributes {
            start.push_attribute((attr.qualified_name().as_str(), attr.value.as_str()));
        }

        if self.children.is_empty() {
            writer.write_event(Event::Empty(start))?;
            return Ok(());
        }

        writer.write_event(Event::Start(start))?;
        for node in &self.children {
            match node {
                Node::Element(el) => el.write(writer)?,
                Node::Text(text) => writer.write_event(Event::Text(BytesText::new(text)))?,
            }
        }
        writer.write_event(Event::End(BytesEnd::new(qname.as_str())))?;
        Ok(())
    }
}

fn qualify(prefix: Option<&str>, name: &str) -> String {
    match prefix {
        Some(prefix) => format!("{prefix}:{name}"),
        None => name.to_string(),
    }
}

fn split_qname(qname: &str) -> (Option<String>, String) {
    match qname.split_once(':') {
        Some((prefix, local)) => (Some(prefix.to_string()), local.to_string()),
        None => (None, qname.to_string()),
    }
}

fn resolve(
    prefix: Option<&str>,
    own: &[NamespaceDecl],
    scopes: &[Vec<NamespaceDecl>],
) -> Option<String> {
    if prefix == Some("xml") {
        return Some(XML_NS.to_string());
    }
    own.iter()
        .rev()
        .chain(scopes.iter().rev().flat_map(|decls| decls.iter().rev()))
        .find(|(p, _)| p.as_deref() == prefix)
        .map(|(_, uri)| uri.clone())
        .filter(|uri| !uri.is_empty())
}

fn open_element(start: &BytesStart<'_>, scopes: &[Vec<NamespaceDecl>]) -> SamlResult<Element> {
    let qname = std::str::from_utf8(start.name().as_ref())
        .map_err(|e| SamlError::MalformedXml(e.to_string()))?
        .to_string();

    let mut namespaces = Vec::new();
    let mut raw = Vec::new();
    for attr in start.attributes() {
        let attr = attr?;
        let key = std::str::from_utf8(attr.key.as_ref())
            .map_err(|e| SamlError::MalformedXml(e.to_string()))?
            .to_string();
        let value = normalize_attribute_value(&attr.value)?;
        if key == "xmlns" {
            namespaces.push((None, value));
        } else if let Some(prefix) = key.strip_prefix("xmlns:") {
            namespaces.push((Some(prefix.to_string()), value));
        } else {
            raw.push((key, value));
        }
    }

    let (prefix, name) = split_qname(&qname);
    let namespace = resolve(prefix.as_deref(), &namespaces, scopes);
    if prefix.is_some() && namespace.is_none() {
        return Err(SamlError::MalformedXml(format!("undeclared prefix in <{qname}>")));
    }

    let mut attributes = Vec::with_capacity(raw.len());
    for (key, value) in raw {
        let (prefix, name) = split_qname(&key);
        let namespace = match prefix.as_deref() {
            Some(p) => Some(resolve(Some(p), &namespaces, scopes).ok_or_else(|| {
                SamlError::MalformedXml(format!("undeclared prefix in attribute {key}"))
            })?),
            None => None,
        };
        attributes.push(Attribute {
            prefix,
            name,
            namespace,
            value,
        });
    }

    Ok(Element {
        prefix,
        name,
        namespace,
        namespaces,
        attributes,
        children: Vec::new(),
    })
}

/// Translates `\r\n` and lone `\r` to `\n`. Character references are
/// untouched, so an escaped `&#13;` still reaches the tree as a carriage return.
fn normalize_line_endings(xml: &str) -> Cow<'_, str> {
    if !xml.contains('\r') {
        return Cow::Borrowed(xml);
    }
    Cow::Owned(xml.replace("\r\n", "\n").replace('\r', "\n"))
}

/// Replaces literal whitespace in a raw attribute value with spaces, then
/// resolves references.
fn normalize_attribute_value(raw: &[u8]) -> SamlResult<String> {
    let raw = std::str::from_utf8(raw).map_err(|e| SamlError::MalformedXml(e.to_string()))?;
    let spaced = raw.replace(['\t', '\n', '\r'], " ");
    Ok(quick_xml::escape::unescape(&spaced)?.into_owned())
}

fn ensure_single_root(root: &Option<Element>) -> SamlResult<()> {
    if root.is_some() {
        return Err(SamlError::MalformedXml("content after root element".into()));
    }
    Ok(())
}

fn close_element(stack: &mut [Element], root: &mut Option<Element>, el: Element) {
    match stack.last_mut() {
        Some(parent) => parent.children.push(Node::Element(el)),
        None => *root = Some(el),
    }
}

fn push_text(stack: &mut [Element], text: Cow<'_, str>) -> SamlResult<()> {
    let Some(parent) = stack.last_mut() else {
        if text.trim().is_empty() {
            return Ok(());
        }
        return Err(SamlError::MalformedXml("text outside root element".into()));
    };
    if let Some(Node::Text(previous)) = parent.children.last_mut() {
        previous.push_str(&text);
    } else {
        parent.children.push(Node::Text(text.into_owned()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const NS: &str = "urn:example";

    #[test]
    fn parse_resolves_namespaces() {
        let doc = r#"<a:Root xmlns:a="urn:example" xmlns="urn:default" ID="_1"><Child b="1" xml:lang="en">x &amp; y</Child></a:Root>"#;
        let root = Element::parse(doc).unwrap();
        assert!(root.is(NS, "Root"));
        assert_eq!(root.attribute("ID"), Some("_1"));

        let child = root.child_element("urn:default", "Child").unwrap();
        assert_eq!(child.prefix, None);
        assert_eq!(child.attribute("b"), Some("1"));
        assert_eq!(child.attribute_ns(XML_NS, "lang"), Some("en"));
        assert_eq!(child.text_content(), "x & y");
    }

    #[test]
    fn build_then_render_then_parse() {
        let built = Element::new("a", "Root", NS)
            .declare("a", NS)
            .attr("ID", "_1")
            .opt_attr("Missing", None::<String>)
            .child(Element::new("a", "Leaf", NS).text("<text>"));
        let xml = built.to_xml().unwrap();
        assert_eq!(
            xml,
            r#"<a:Root xmlns:a="urn:example" ID="_1"><a:Leaf>&lt;text&gt;</a:Leaf></a:Root>"#
        );
        assert_eq!(Element::parse(&xml).unwrap(), built);
    }

    #[test]
    fn malformed_documents_rejected() {
        for doc in [
            "",
            "<a>",
            "<a></b>",
            "<a/><b/>",
            "text",
            "<p:a/>",
            "<a>&unknown;</a>",
            r#"<!DOCTYPE a [<!ENTITY x "y">]><a/>"#,
        ] {
            assert!(
                matches!(Element::parse(doc), Err(SamlError::MalformedXml(_))),
                "accepted {doc:?}"
            );
        }
    }

    #[test]
    fn comments_dropped_and_cdata_kept() {
        let root = Element::parse("<a><!-- note -->x<![CDATA[<y>]]></a>").unwrap();
        assert_eq!(root.children, vec![Node::Text("x<y>".into())]);
    }

    #[test]
    fn find_by_id_and_scope() {
        let doc = r#"<a:R xmlns:a="urn:example" ID="r"><a:S xmlns:b="urn:b" ID="s"><a:T ID="t"/></a:S></a:R>"#;
        let root = Element::parse(doc).unwrap();
        assert_eq!(root.find_by_id("t").unwrap().name, "T");
        assert!(root.find_by_id("zzz").is_none());

        let scope = root.namespaces_in_scope("t").unwrap();
        assert_eq!(
            scope,
            vec![
                (Some("a".to_string()), "urn:example".to_string()),
                (Some("b".to_string()), "urn:b".to_string()),
            ]
        );
    }

    #[test]
    fn insert_after_named_child() {
        let mut root = Element::new("a", "R", NS)
            .child(Element::new("a", "First", NS))
            .child(Element::new("a", "Last", NS));
        root.insert_after(NS, "First", Element::new("a", "Middle", NS));
        let names: Vec<_> = root.elements().map(|el| el.name.as_str()).collect();
        assert_eq!(names, ["First", "Middle", "Last"]);

        root.insert_after(NS, "Absent", Element::new("a", "Zero", NS));
        assert_eq!(root.elements().next().unwrap().name, "Zero");
    }

    #[test]
    fn line_endings_normalized() {
        let lf = Element::parse("<R>\n  <C>a\nb</C>\n</R>").unwrap();
        let crlf = Element::parse("<R>\r\n  <C>a\r\nb</C>\r\n</R>").unwrap();
        let cr = Element::parse("<R>\r  <C>a\rb</C>\r</R>").unwrap();
        assert_eq!(crlf, lf);
        assert_eq!(cr, lf);

        let escaped = Element::parse("<R>a&#13;&#10;b</R>").unwrap();
        assert_eq!(escaped.text_content(), "a\r\nb");
    }

    #[test]
    fn attribute_whitespace_normalized() {
        let root = Element::parse("<R a=\"x\r\ny\tz\nw\" b=\"x&#10;y&#9;z\"/>").unwrap();
        assert_eq!(root.attribute("a"), Some("x y z w"));
        assert_eq!(root.attribute("b"), Some("x\ny\tz"));
    }
}
