//! Exclusive XML canonicalization (exc-c14n, without comments).
//!
//! Only the subset needed for SAML signatures is implemented: the input is an
//! element subtree, never a general node-set. A namespace declaration is
//! emitted on an element when that element or one of its attributes visibly
//! uses the prefix and no output ancestor already rendered the same binding.
//! Prefixes listed in an `InclusiveNamespaces PrefixList` are treated
//! inclusively.

use std::collections::BTreeMap;

use super::{Element, NamespaceDecl, Node};
use crate::types::XMLDSIG_NS;

type Bindings = BTreeMap<Option<String>, String>;

/// Canonicalization options for one subtree.
#[derive(Debug, Clone, Default)]
pub struct C14nOptions<'a> {
    /// Namespace declarations in scope at the apex, outermost first.
    pub inherited: &'a [NamespaceDecl],
    /// `InclusiveNamespaces PrefixList` entries; `#default` names the default namespace.
    pub inclusive_prefixes: &'a [String],
    /// Drop `ds:Signature` children of the apex (enveloped-signature transform).
    pub enveloped: bool,
}

/// Canonicalizes `element` and its descendants.
#[must_use]
pub fn canonicalize(element: &Element, options: &C14nOptions<'_>) -> String {
    let mut in_scope = Bindings::new();
    for (prefix, uri) in options.inherited {
        in_scope.insert(prefix.clone(), uri.clone());
    }

    let mut out = String::new();
    write_element(
        element,
        &Bindings::new(),
        &in_scope,
        options.inclusive_prefixes,
        options.enveloped,
        &mut out,
    );
    out
}

fn write_element(
    el: &Element,
    rendered: &Bindings,
    in_scope: &Bindings,
    inclusive: &[String],
    enveloped: bool,
    out: &mut String,
) {
    let mut scope = in_scope.clone();
    for (prefix, uri) in &el.namespaces {
        scope.insert(prefix.clone(), uri.clone());
    }

    let mut emit = Bindings::new();
    let mut utilize = |prefix: &Option<String>, uri: &str| {
        if prefix.as_deref() == Some("xml") {
            return;
        }
        let current = rendered.get(prefix).map_or("", String::as_str);
        if current != uri {
            emit.insert(prefix.clone(), uri.to_string());
        }
    };

    utilize(&el.prefix, el.namespace.as_deref().unwrap_or_default());
    for attr in &el.attributes {
        if let (Some(_), Some(uri)) = (&attr.prefix, &attr.namespace) {
            utilize(&attr.prefix, uri);
        }
    }
    for listed in inclusive {
        let prefix = (listed != "#default").then(|| listed.clone());
        if let Some(uri) = scope.get(&prefix) {
            utilize(&prefix, uri);
        }
    }

    let qname = el.qualified_name();
    out.push('<');
    out.push_str(&qname);
    for (prefix, uri) in &emit {
        match prefix {
            Some(prefix) => {
                out.push_str(" xmlns:");
                out.push_str(prefix);
            }
            None => out.push_str(" xmlns"),
        }
        out.push_str("=\"");
        escape_attr(uri, out);
        out.push('"');
    }

    let mut attributes: Vec<_> = el.attributes.iter().collect();
    attributes.sort_by(|a, b| {
        let a_ns = a.namespace.as_deref().unwrap_or_default();
        let b_ns = b.namespace.as_deref().unwrap_or_default();
        (a_ns, a.name.as_str()).cmp(&(b_ns, b.name.as_str()))
    });
    for attr in attributes {
        out.push(' ');
        out.push_str(&attr.qualified_name());
        out.push_str("=\"");
        escape_attr(&attr.value, out);
        out.push('"');
    }
    out.push('>');

    let mut now_rendered = rendered.clone();
    now_rendered.extend(emit);

    for node in &el.children {
        match node {
            Node::Text(text) => escape_text(text, out),
            Node::Element(child) if enveloped && child.is(XMLDSIG_NS, "Signature") => {}
            Node::Element(child) => {
                write_element(child, &now_rendered, &scope, inclusive, false, out);
            }
        }
    }

    out.push_str("</");
    out.push_str(&qname);
    out.push('>');
}

fn escape_text(text: &str, out: &mut String) {
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '\r' => out.push_str("&#xD;"),
            _ => out.push(c),
        }
    }
}

fn escape_attr(value: &str, out: &mut String) {
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '"' => out.push_str("&quot;"),
            '\t' => out.push_str("&#x9;"),
            '\n' => out.push_str("&#xA;"),
            '\r' => out.push_str("&#xD;"),
            _ => out.push(c),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn c14n(doc: &str) -> String {
        let root = Element::parse(doc).unwrap();
        canonicalize(&root, &C14nOptions::default())
    }

    #[test]
    fn unused_declarations_dropped_and_attributes_sorted() {
        let doc = r#"<a:R xmlns:unused="urn:u" xmlns:a="urn:a" z="1" b:y="2" xmlns:b="urn:b" a="3"/>"#;
        assert_eq!(
            c14n(doc),
            r#"<a:R xmlns:a="urn:a" xmlns:b="urn:b" a="3" z="1" b:y="2"></a:R>"#
        );
    }

    #[test]
    fn declarations_not_repeated_on_descendants() {
        let doc = r#"<a:R xmlns:a="urn:a"><a:C><b:D xmlns:b="urn:b"/></a:C></a:R>"#;
        assert_eq!(
            c14n(doc),
            r#"<a:R xmlns:a="urn:a"><a:C><b:D xmlns:b="urn:b"></b:D></a:C></a:R>"#
        );
    }

    #[test]
    fn subtree_carries_its_own_declarations() {
        let doc = r#"<a:R xmlns:a="urn:a" xmlns:s="urn:s"><s:C ID="x">t</s:C></a:R>"#;
        let root = Element::parse(doc).unwrap();
        let sub = root.find_by_id("x").unwrap();
        assert_eq!(
            canonicalize(sub, &C14nOptions::default()),
            r#"<s:C xmlns:s="urn:s" ID="x">t</s:C>"#
        );
    }

    #[test]
    fn default_namespace_undeclared_under_default() {
        let doc = r#"<R xmlns="urn:d"><C xmlns=""/></R>"#;
        assert_eq!(c14n(doc), r#"<R xmlns="urn:d"><C xmlns=""></C></R>"#);
    }

    #[test]
    fn inclusive_prefix_list_emits_unused_binding() {
        let doc = r#"<a:R xmlns:a="urn:a" xmlns:xs="urn:xs"><a:C ID="x"/></a:R>"#;
        let root = Element::parse(doc).unwrap();
        let inherited = root.namespaces_in_scope("x").unwrap();
        let prefixes = vec!["xs".to_string()];
        let options = C14nOptions {
            inherited: &inherited,
            inclusive_prefixes: &prefixes,
            enveloped: false,
        };
        assert_eq!(
            canonicalize(root.find_by_id("x").unwrap(), &options),
            r#"<a:C xmlns:a="urn:a" xmlns:xs="urn:xs" ID="x"></a:C>"#
        );
    }

    #[test]
    fn escaping() {
        let doc = "<R a=\"&quot;&lt;&#9;&#10;\">&amp;&lt;&gt;&#13;\"</R>";
        assert_eq!(
            c14n(doc),
            "<R a=\"&quot;&lt;&#x9;&#xA;\">&amp;&lt;&gt;&#xD;\"</R>"
        );
    }

    #[test]
    fn enveloped_signature_excluded() {
        let doc = r#"<a:R xmlns:a="urn:a" ID="r"><a:I>x</a:I><ds:Signature xmlns:ds="http://www.w3.org/2000/09/xmldsig#"><ds:SignedInfo/></ds:Signature><a:B/></a:R>"#;
        let root = Element::parse(doc).unwrap();
        let options = C14nOptions {
            enveloped: true,
            ..C14nOptions::default()
        };
        assert_eq!(
            canonicalize(&root, &options),
            r#"<a:R xmlns:a="urn:a" ID="r"><a:I>x</a:I><a:B></a:B></a:R>"#
        );
    }
}
