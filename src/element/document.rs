//! Arena-backed XML document tree.
//!
//! A [`Document`] owns every node of one tree in a flat arena;
//! an [`Element`] is a `Copy` index handle into that arena. All navigation
//! and mutation go through `Document` methods, which keeps aliasing rules
//! simple: one `&mut Document` is the single writer for the whole tree.
//!
//! Text follows the dual-slot model used by ODF processing: an element owns
//! its *leading text* (before the first child) and each child owns the
//! *tail text* that follows it. Every text run belongs to exactly one slot,
//! so mixed content like `<p>a<span>b</span>c</p>` is `p.text = "a"`,
//! `span.text = "b"`, `span.tail = "c"`.
//!
//! Deleting a node detaches it but never frees it: retained handles stay
//! readable, and `parent()` reports the detachment. Handles are only
//! meaningful for the document that produced them.

use crate::element::escape::escape_xml;
use crate::element::registry::{self, ElementKind};
use crate::{Error, Result, namespace};
use quick_xml::Reader;
use quick_xml::escape::unescape;
use quick_xml::events::Event;
use smallvec::SmallVec;
use std::collections::BTreeSet;

/// Handle to one element node inside a [`Document`] arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Element(pub(crate) usize);

/// Where [`Document::insert`] places an element relative to its target.
///
/// `FirstChild`, `LastChild` and `Index` treat the target as the parent;
/// `NextSibling` and `PrevSibling` treat it as the reference sibling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Position {
    /// First child of the target
    FirstChild,
    /// Last child of the target
    LastChild,
    /// Immediately after the target, under the target's parent
    NextSibling,
    /// Immediately before the target, under the target's parent
    PrevSibling,
    /// Explicit child index of the target
    Index(usize),
}

/// One piece of mixed content: a text run or an element.
#[derive(Debug, Clone, PartialEq)]
pub enum Content {
    /// A text run
    Text(String),
    /// An element handle
    Element(Element),
}

impl From<&str> for Content {
    #[inline]
    fn from(text: &str) -> Self {
        Content::Text(text.to_string())
    }
}

impl From<String> for Content {
    #[inline]
    fn from(text: String) -> Self {
        Content::Text(text)
    }
}

impl From<Element> for Content {
    #[inline]
    fn from(el: Element) -> Self {
        Content::Element(el)
    }
}

#[derive(Debug, Clone)]
pub(crate) struct NodeData {
    tag: String,
    kind: ElementKind,
    attributes: SmallVec<[(String, String); 8]>,
    text: Option<String>,
    tail: Option<String>,
    children: Vec<Element>,
    parent: Option<Element>,
}

/// An XML document tree with a single root element.
#[derive(Debug, Clone)]
pub struct Document {
    nodes: Vec<NodeData>,
    root: Element,
}

impl Document {
    // ------------------------------------------------------------------
    // Construction
    // ------------------------------------------------------------------

    /// Create a document with a fresh root element.
    ///
    /// # Examples
    ///
    /// ```
    /// use longan::Document;
    ///
    /// let doc = Document::new("office:document-content").unwrap();
    /// assert_eq!(doc.tag(doc.root()), "office:document-content");
    /// ```
    pub fn new(root_tag: &str) -> Result<Self> {
        namespace::resolve(root_tag)?;
        let mut doc = Document {
            nodes: Vec::new(),
            root: Element(0),
        };
        let root = doc.alloc(root_tag);
        doc.root = root;
        Ok(doc)
    }

    /// Create the minimal spreadsheet content tree: `office:document-content`
    /// down to an empty `office:spreadsheet` body.
    pub fn new_spreadsheet() -> Self {
        let mut doc = Document {
            nodes: Vec::new(),
            root: Element(0),
        };
        let root = doc.alloc("office:document-content");
        doc.root = root;
        doc.node_mut(root)
            .attributes
            .push(("office:version".to_string(), "1.3".to_string()));

        for tag in [
            "office:scripts",
            "office:font-face-decls",
            "office:automatic-styles",
        ] {
            let el = doc.alloc(tag);
            doc.attach_last(root, el);
        }
        let body = doc.alloc("office:body");
        doc.attach_last(root, body);
        let spreadsheet = doc.alloc("office:spreadsheet");
        doc.attach_last(body, spreadsheet);
        doc
    }

    /// Parse a document from XML text.
    pub fn from_str(xml: &str) -> Result<Self> {
        Self::from_bytes(xml.as_bytes())
    }

    /// Parse a document from XML bytes.
    ///
    /// Prefixes on tags and attributes must come from the fixed ODF
    /// registry. `xmlns` declarations are dropped on input; serialization
    /// re-emits declarations for exactly the prefixes in use. Comments and
    /// processing instructions are not part of the model and are skipped.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let mut reader = Reader::from_reader(bytes);
        let mut buf = Vec::new();

        let mut doc = Document {
            nodes: Vec::new(),
            root: Element(0),
        };
        let mut stack: Vec<Element> = Vec::new();
        let mut seen_root = false;

        loop {
            match reader
                .read_event_into(&mut buf)
                .map_err(|e| Error::Xml(e.to_string()))?
            {
                Event::Start(ref e) => {
                    let el = doc.parse_open_tag(e, &stack, &mut seen_root)?;
                    stack.push(el);
                },
                Event::Empty(ref e) => {
                    doc.parse_open_tag(e, &stack, &mut seen_root)?;
                },
                Event::Text(ref t) => {
                    let raw = t.decode().map_err(|e| Error::Xml(e.to_string()))?;
                    let text = unescape(&raw).map_err(|e| Error::Xml(e.to_string()))?;
                    doc.parse_text(&text, &stack)?;
                },
                Event::GeneralRef(ref r) => {
                    let name = std::str::from_utf8(r.as_ref())
                        .map_err(|_| Error::Xml("invalid UTF-8 in reference".to_string()))?;
                    let ch = Self::resolve_reference(name)?;
                    doc.parse_text(ch.encode_utf8(&mut [0u8; 4]), &stack)?;
                },
                Event::CData(ref t) => {
                    let text = std::str::from_utf8(t.as_ref())
                        .map_err(|_| Error::Xml("invalid UTF-8 in CDATA".to_string()))?;
                    doc.parse_text(text, &stack)?;
                },
                Event::End(_) => {
                    stack.pop();
                },
                Event::Eof => break,
                // Declarations, comments and PIs are not modeled
                _ => {},
            }
            buf.clear();
        }

        if !seen_root {
            return Err(Error::Xml("no root element".to_string()));
        }
        if !stack.is_empty() {
            return Err(Error::Xml("truncated document".to_string()));
        }
        Ok(doc)
    }

    fn parse_open_tag(
        &mut self,
        e: &quick_xml::events::BytesStart<'_>,
        stack: &[Element],
        seen_root: &mut bool,
    ) -> Result<Element> {
        let name = e.name();
        let tag = std::str::from_utf8(name.as_ref())
            .map_err(|_| Error::Xml("invalid UTF-8 in tag name".to_string()))?;
        namespace::resolve(tag)?;

        let el = self.alloc(tag);
        for attr in e.attributes() {
            let attr = attr.map_err(|e| Error::Xml(e.to_string()))?;
            let key = std::str::from_utf8(attr.key.as_ref())
                .map_err(|_| Error::Xml("invalid UTF-8 in attribute name".to_string()))?;
            // Namespace declarations are subsumed by the fixed registry
            if key == "xmlns" || key.starts_with("xmlns:") {
                continue;
            }
            let value = attr
                .unescape_value()
                .map_err(|e| Error::Xml(e.to_string()))?;
            self.set_attribute(el, key, &value)?;
        }

        match stack.last() {
            Some(&parent) => self.attach_last(parent, el),
            None => {
                if *seen_root {
                    return Err(Error::Xml("multiple root elements".to_string()));
                }
                *seen_root = true;
                self.root = el;
            },
        }
        Ok(el)
    }

    fn parse_text(&mut self, text: &str, stack: &[Element]) -> Result<()> {
        let Some(&current) = stack.last() else {
            // Only whitespace may appear outside the root
            if text.trim().is_empty() {
                return Ok(());
            }
            return Err(Error::Xml("text outside the root element".to_string()));
        };

        let last_child = self.node(current).children.last().copied();
        let slot = match last_child {
            Some(child) => &mut self.node_mut(child).tail,
            None => &mut self.node_mut(current).text,
        };
        slot.get_or_insert_with(String::new).push_str(text);
        Ok(())
    }

    /// Resolve a reference emitted separately from its text run: the five
    /// predefined entities and numeric character references. Anything else
    /// would need a DTD, which the model does not carry.
    fn resolve_reference(name: &str) -> Result<char> {
        let unknown = || Error::Xml(format!("unresolved reference '&{};'", name));
        if let Some(num) = name.strip_prefix('#') {
            let code = match num.strip_prefix('x') {
                Some(hex) => u32::from_str_radix(hex, 16),
                None => num.parse(),
            }
            .map_err(|_| unknown())?;
            return char::from_u32(code).ok_or_else(unknown);
        }
        match name {
            "amp" => Ok('&'),
            "lt" => Ok('<'),
            "gt" => Ok('>'),
            "quot" => Ok('"'),
            "apos" => Ok('\''),
            _ => Err(unknown()),
        }
    }

    // ------------------------------------------------------------------
    // Node creation
    // ------------------------------------------------------------------

    /// Create a detached element with the given qualified tag.
    pub fn new_element(&mut self, tag: &str) -> Result<Element> {
        namespace::resolve(tag)?;
        Ok(self.alloc(tag))
    }

    /// Create a detached element and set attributes in one step.
    pub fn new_element_with(&mut self, tag: &str, attrs: &[(&str, &str)]) -> Result<Element> {
        let el = self.new_element(tag)?;
        for (name, value) in attrs {
            self.set_attribute(el, name, value)?;
        }
        Ok(el)
    }

    /// Deep-copy a subtree, returning a detached element.
    ///
    /// The copy shares nothing with the original: children, attributes and
    /// both text slots are duplicated, and any derived table caches are
    /// rebuilt on the next bind rather than carried over. Prefixes stay
    /// meaningful because they are bound by the fixed registry, so a cloned
    /// fragment serializes byte-identically to its source.
    pub fn clone_node(&mut self, el: Element) -> Element {
        let snapshot = self.node(el).clone();
        let copy = Element(self.nodes.len());
        self.nodes.push(NodeData {
            tag: snapshot.tag,
            kind: snapshot.kind,
            attributes: snapshot.attributes,
            text: snapshot.text,
            tail: snapshot.tail,
            children: Vec::with_capacity(snapshot.children.len()),
            parent: None,
        });
        for child in snapshot.children {
            let child_copy = self.clone_node(child);
            self.node_mut(child_copy).parent = Some(copy);
            self.node_mut(copy).children.push(child_copy);
        }
        copy
    }

    fn alloc(&mut self, tag: &str) -> Element {
        let kind = registry::resolve_kind(tag, None);
        self.nodes.push(NodeData {
            tag: tag.to_string(),
            kind,
            attributes: SmallVec::new(),
            text: None,
            tail: None,
            children: Vec::new(),
            parent: None,
        });
        Element(self.nodes.len() - 1)
    }

    fn attach_last(&mut self, parent: Element, el: Element) {
        self.node_mut(el).parent = Some(parent);
        self.node_mut(parent).children.push(el);
    }

    #[inline]
    pub(crate) fn node(&self, el: Element) -> &NodeData {
        &self.nodes[el.0]
    }

    #[inline]
    fn node_mut(&mut self, el: Element) -> &mut NodeData {
        &mut self.nodes[el.0]
    }

    // ------------------------------------------------------------------
    // Tags and kinds
    // ------------------------------------------------------------------

    /// The root element.
    #[inline]
    pub fn root(&self) -> Element {
        self.root
    }

    /// Qualified tag of an element.
    #[inline]
    pub fn tag(&self, el: Element) -> &str {
        &self.node(el).tag
    }

    /// What the element represents in the ODF vocabulary.
    #[inline]
    pub fn kind(&self, el: Element) -> ElementKind {
        self.node(el).kind
    }

    /// Re-tag an element in place and return the kind it now maps to.
    pub fn set_tag(&mut self, el: Element, tag: &str) -> Result<ElementKind> {
        namespace::resolve(tag)?;
        let family = self
            .attribute(el, "style:family")
            .map(|f| f.to_string());
        let node = self.node_mut(el);
        node.tag = tag.to_string();
        node.kind = registry::resolve_kind(tag, family.as_deref());
        Ok(node.kind)
    }

    /// The `office:body` content element (spreadsheet, text, ...), if the
    /// document has the standard ODF content layout.
    pub fn body(&self) -> Option<Element> {
        let body = self
            .node(self.root)
            .children
            .iter()
            .find(|&&c| self.node(c).tag == "office:body")?;
        self.node(*body).children.first().copied()
    }

    // ------------------------------------------------------------------
    // Attributes
    // ------------------------------------------------------------------

    /// Attribute value by qualified name; `None` when absent.
    pub fn attribute(&self, el: Element, name: &str) -> Option<&str> {
        self.node(el)
            .attributes
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    /// All attributes in document order.
    pub fn attributes(&self, el: Element) -> &[(String, String)] {
        &self.node(el).attributes
    }

    /// Boolean attribute: "true"/"1" and "false"/"0" decode; anything else
    /// (including absence) is `None`.
    pub fn attribute_bool(&self, el: Element, name: &str) -> Option<bool> {
        self.attribute(el, name).and_then(|s| match s {
            "true" | "1" => Some(true),
            "false" | "0" => Some(false),
            _ => None,
        })
    }

    /// Integer attribute, `None` when absent or malformed.
    pub fn attribute_int(&self, el: Element, name: &str) -> Option<i64> {
        self.attribute(el, name)
            .and_then(|s| atoi_simd::parse::<i64>(s.as_bytes()).ok())
    }

    /// Unsigned integer attribute (repeat counts, spans), `None` when absent
    /// or malformed.
    pub fn attribute_uint(&self, el: Element, name: &str) -> Option<u64> {
        self.attribute(el, name)
            .and_then(|s| atoi_simd::parse::<u64>(s.as_bytes()).ok())
    }

    /// Floating-point attribute, `None` when absent or malformed.
    pub fn attribute_float(&self, el: Element, name: &str) -> Option<f64> {
        self.attribute(el, name)
            .and_then(|s| fast_float2::parse::<f64, _>(s).ok())
    }

    /// Set an attribute, replacing any previous value in place.
    pub fn set_attribute(&mut self, el: Element, name: &str, value: &str) -> Result<()> {
        namespace::resolve(name)?;
        let node = self.node_mut(el);
        match node.attributes.iter_mut().find(|(k, _)| k == name) {
            Some((_, v)) => *v = value.to_string(),
            None => node.attributes.push((name.to_string(), value.to_string())),
        }
        if name == "style:family" {
            self.refresh_style_kind(el);
        }
        Ok(())
    }

    /// Set or remove an attribute: `None` deletes it (no-op when absent).
    pub fn set_attribute_opt(&mut self, el: Element, name: &str, value: Option<&str>) -> Result<()> {
        match value {
            Some(value) => self.set_attribute(el, name, value),
            None => {
                self.remove_attribute(el, name);
                Ok(())
            },
        }
    }

    /// Set a boolean attribute as ODF "true"/"false" text.
    pub fn set_attribute_bool(&mut self, el: Element, name: &str, value: bool) -> Result<()> {
        self.set_attribute(el, name, crate::datatype::Boolean::encode(value))
    }

    /// Remove every attribute of an element.
    pub fn clear_attributes(&mut self, el: Element) {
        self.node_mut(el).attributes.clear();
        self.refresh_style_kind(el);
    }

    /// Remove an attribute, returning its old value. Absent is a no-op.
    pub fn remove_attribute(&mut self, el: Element, name: &str) -> Option<String> {
        let node = self.node_mut(el);
        let idx = node.attributes.iter().position(|(k, _)| k == name)?;
        let (_, value) = node.attributes.remove(idx);
        if name == "style:family" {
            self.refresh_style_kind(el);
        }
        Some(value)
    }

    fn refresh_style_kind(&mut self, el: Element) {
        let family = self
            .attribute(el, "style:family")
            .map(|f| f.to_string());
        let node = self.node_mut(el);
        node.kind = registry::resolve_kind(&node.tag, family.as_deref());
    }

    // ------------------------------------------------------------------
    // Text and tail
    // ------------------------------------------------------------------

    /// Leading text: the run before the first child.
    #[inline]
    pub fn text(&self, el: Element) -> Option<&str> {
        self.node(el).text.as_deref()
    }

    /// Set or clear the leading text.
    pub fn set_text(&mut self, el: Element, text: Option<&str>) {
        self.node_mut(el).text = text.map(|t| t.to_string());
    }

    /// Tail text: the run after this element, inside its parent.
    #[inline]
    pub fn tail(&self, el: Element) -> Option<&str> {
        self.node(el).tail.as_deref()
    }

    /// Set or clear the tail text.
    pub fn set_tail(&mut self, el: Element, tail: Option<&str>) {
        self.node_mut(el).tail = tail.map(|t| t.to_string());
    }

    /// All text inside a subtree, in document order: leading text, then each
    /// child's content followed by its tail. The element's own tail is not
    /// included.
    pub fn text_content(&self, el: Element) -> String {
        let mut out = String::new();
        self.gather_text(el, &mut out);
        out
    }

    fn gather_text(&self, el: Element, out: &mut String) {
        let node = self.node(el);
        if let Some(text) = &node.text {
            out.push_str(text);
        }
        for &child in &node.children {
            self.gather_text(child, out);
            if let Some(tail) = &self.node(child).tail {
                out.push_str(tail);
            }
        }
    }

    // ------------------------------------------------------------------
    // Navigation
    // ------------------------------------------------------------------

    /// Child elements in document order.
    #[inline]
    pub fn children(&self, el: Element) -> &[Element] {
        &self.node(el).children
    }

    /// Parent element; `None` at the root or after detachment.
    #[inline]
    pub fn parent(&self, el: Element) -> Option<Element> {
        self.node(el).parent
    }

    /// Position of an element among its parent's children.
    pub fn index_in_parent(&self, el: Element) -> Option<usize> {
        let parent = self.node(el).parent?;
        self.node(parent).children.iter().position(|&c| c == el)
    }

    /// Following sibling, if any.
    pub fn next_sibling(&self, el: Element) -> Option<Element> {
        let parent = self.node(el).parent?;
        let idx = self.index_in_parent(el)?;
        self.node(parent).children.get(idx + 1).copied()
    }

    /// Preceding sibling, if any.
    pub fn prev_sibling(&self, el: Element) -> Option<Element> {
        let parent = self.node(el).parent?;
        let idx = self.index_in_parent(el)?;
        if idx == 0 {
            return None;
        }
        self.node(parent).children.get(idx - 1).copied()
    }

    // ------------------------------------------------------------------
    // Structural mutation
    // ------------------------------------------------------------------

    /// Insert a detached element at a position relative to `target`.
    ///
    /// `FirstChild`/`LastChild`/`Index` insert under `target` itself;
    /// `NextSibling`/`PrevSibling` insert beside it under its parent.
    /// The element must be detached, and `target` must not live inside
    /// its subtree.
    pub fn insert(&mut self, target: Element, el: Element, position: Position) -> Result<()> {
        if self.node(el).parent.is_some() {
            return Err(Error::Structure(
                "element is already attached; clone or delete it first".to_string(),
            ));
        }
        let mut cursor = Some(target);
        while let Some(current) = cursor {
            if current == el {
                return Err(Error::Structure(
                    "cannot insert an element into its own subtree".to_string(),
                ));
            }
            cursor = self.node(current).parent;
        }

        let (parent, index) = match position {
            Position::FirstChild => (target, 0),
            Position::LastChild => (target, self.node(target).children.len()),
            Position::Index(index) => {
                if index > self.node(target).children.len() {
                    return Err(Error::Structure(format!(
                        "insert index {} out of range for {} children",
                        index,
                        self.node(target).children.len()
                    )));
                }
                (target, index)
            },
            Position::NextSibling | Position::PrevSibling => {
                let parent = self.node(target).parent.ok_or_else(|| {
                    Error::Structure("target of a sibling insert has no parent".to_string())
                })?;
                let idx = self
                    .index_in_parent(target)
                    .ok_or_else(|| Error::Structure("target not found in parent".to_string()))?;
                match position {
                    Position::NextSibling => (parent, idx + 1),
                    _ => (parent, idx),
                }
            },
        };

        self.node_mut(parent).children.insert(index, el);
        self.node_mut(el).parent = Some(parent);
        Ok(())
    }

    /// Append mixed content to an element.
    ///
    /// Text lands on the last child's tail when children exist, otherwise
    /// on the element's leading text; ODF text flow alternates between the
    /// two slots and there is no single inner-text field. Elements are
    /// appended as the last child.
    pub fn append(&mut self, parent: Element, content: impl Into<Content>) -> Result<()> {
        match content.into() {
            Content::Text(text) => {
                let last_child = self.node(parent).children.last().copied();
                let slot = match last_child {
                    Some(child) => &mut self.node_mut(child).tail,
                    None => &mut self.node_mut(parent).text,
                };
                slot.get_or_insert_with(String::new).push_str(&text);
                Ok(())
            },
            Content::Element(el) => self.insert(parent, el, Position::LastChild),
        }
    }

    /// Detach an element from its parent, relocating its tail text so
    /// visible text is not lost (see [`Document::delete_keep_tail`]).
    pub fn delete(&mut self, el: Element) -> Result<()> {
        self.delete_keep_tail(el, true)
    }

    /// Detach an element from its parent.
    ///
    /// With `keep_tail`, the node's tail text moves onto the previous
    /// sibling's tail, or the parent's leading text when the node was
    /// first. The detached node stays readable through its handle and
    /// keeps its own content; its `parent()` becomes `None`. Deleting the
    /// root or an already-detached node is an error.
    pub fn delete_keep_tail(&mut self, el: Element, keep_tail: bool) -> Result<()> {
        let parent = self.node(el).parent.ok_or_else(|| {
            Error::Structure("cannot delete the root or a detached element".to_string())
        })?;
        let idx = self
            .index_in_parent(el)
            .ok_or_else(|| Error::Structure("element not found in parent".to_string()))?;

        self.node_mut(parent).children.remove(idx);
        self.node_mut(el).parent = None;

        if keep_tail {
            if let Some(tail) = self.node(el).tail.clone() {
                let slot = if idx > 0 {
                    let prev = self.node(parent).children[idx - 1];
                    &mut self.node_mut(prev).tail
                } else {
                    &mut self.node_mut(parent).text
                };
                slot.get_or_insert_with(String::new).push_str(&tail);
            }
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Serialization
    // ------------------------------------------------------------------

    /// Serialize a subtree as an XML fragment.
    ///
    /// Fragments carry no namespace declarations, so serializing a clone is
    /// byte-identical to serializing the original in place. The element's
    /// own tail is not part of the fragment. Pretty printing indents only
    /// element-only content; runs adjacent to text are left intact.
    pub fn serialize(&self, el: Element, pretty: bool) -> String {
        let mut out = String::new();
        self.write_element(el, &mut out, None, pretty, 0);
        out
    }

    /// Serialize the whole document with the XML header and namespace
    /// declarations for every prefix in use, sorted for stable output.
    pub fn to_xml(&self) -> String {
        let mut prefixes = BTreeSet::new();
        self.collect_prefixes(self.root, &mut prefixes);
        let decls: Vec<(String, &'static str)> = prefixes
            .into_iter()
            .filter_map(|p| namespace::prefix_uri(&p).map(|uri| (p, uri)))
            .collect();

        let mut out = String::from("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
        self.write_element(self.root, &mut out, Some(&decls), false, 0);
        out
    }

    fn collect_prefixes(&self, el: Element, prefixes: &mut BTreeSet<String>) {
        let node = self.node(el);
        if let (Some(prefix), _) = namespace::split(&node.tag) {
            if !prefixes.contains(prefix) {
                prefixes.insert(prefix.to_string());
            }
        }
        for (name, _) in &node.attributes {
            if let (Some(prefix), _) = namespace::split(name) {
                if !prefixes.contains(prefix) {
                    prefixes.insert(prefix.to_string());
                }
            }
        }
        for &child in &node.children {
            self.collect_prefixes(child, prefixes);
        }
    }

    fn write_element(
        &self,
        el: Element,
        out: &mut String,
        decls: Option<&[(String, &'static str)]>,
        pretty: bool,
        depth: usize,
    ) {
        let node = self.node(el);
        out.push('<');
        out.push_str(&node.tag);

        if let Some(decls) = decls {
            for (prefix, uri) in decls {
                out.push_str(" xmlns:");
                out.push_str(prefix);
                out.push_str("=\"");
                out.push_str(uri);
                out.push('"');
            }
        }
        for (name, value) in &node.attributes {
            out.push(' ');
            out.push_str(name);
            out.push_str("=\"");
            out.push_str(&escape_xml(value));
            out.push('"');
        }

        if node.text.is_none() && node.children.is_empty() {
            out.push_str("/>");
            return;
        }
        out.push('>');

        if let Some(text) = &node.text {
            out.push_str(&escape_xml(text));
        }

        // Indentation must never inject characters into mixed content
        let block = pretty
            && node.text.is_none()
            && !node.children.is_empty()
            && node
                .children
                .iter()
                .all(|&c| self.node(c).tail.is_none());

        for &child in &node.children {
            if block {
                out.push('\n');
                for _ in 0..=depth {
                    out.push_str("  ");
                }
            }
            self.write_element(child, out, None, pretty, depth + 1);
            if let Some(tail) = &self.node(child).tail {
                out.push_str(&escape_xml(tail));
            }
        }
        if block {
            out.push('\n');
            for _ in 0..depth {
                out.push_str("  ");
            }
        }

        out.push_str("</");
        out.push_str(&node.tag);
        out.push('>');
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::element::registry::StyleFamily;

    fn sample() -> Document {
        Document::from_str(
            r#"<office:document-content office:version="1.3"><office:body><office:text><text:p text:style-name="T1">a<text:span>b</text:span>c</text:p></office:text></office:body></office:document-content>"#,
        )
        .unwrap()
    }

    #[test]
    fn test_parse_structure() {
        let doc = sample();
        let root = doc.root();
        assert_eq!(doc.tag(root), "office:document-content");
        assert_eq!(doc.attribute(root, "office:version"), Some("1.3"));
        assert_eq!(doc.parent(root), None);

        let body = doc.children(root)[0];
        let text = doc.children(body)[0];
        let p = doc.children(text)[0];
        assert_eq!(doc.tag(p), "text:p");
        assert_eq!(doc.kind(p), ElementKind::Paragraph);
        assert_eq!(doc.text(p), Some("a"));

        let span = doc.children(p)[0];
        assert_eq!(doc.text(span), Some("b"));
        assert_eq!(doc.tail(span), Some("c"));
        assert_eq!(doc.parent(span), Some(p));
    }

    #[test]
    fn test_parse_rejects_unknown_prefix() {
        assert!(matches!(
            Document::from_str("<bogus:root/>"),
            Err(Error::UnknownPrefix(_))
        ));
        assert!(matches!(
            Document::from_str(r#"<text:p bogus:x="1"/>"#),
            Err(Error::UnknownPrefix(_))
        ));
    }

    #[test]
    fn test_parse_drops_xmlns_declarations() {
        let doc = Document::from_str(
            r#"<office:document-content xmlns:office="urn:oasis:names:tc:opendocument:xmlns:office:1.0"/>"#,
        )
        .unwrap();
        assert_eq!(doc.attributes(doc.root()).len(), 0);
    }

    #[test]
    fn test_parse_unescapes_entities() {
        let doc = Document::from_str(r#"<text:p text:style-name="a&amp;b">x &lt; y</text:p>"#)
            .unwrap();
        let p = doc.root();
        assert_eq!(doc.attribute(p, "text:style-name"), Some("a&b"));
        assert_eq!(doc.text(p), Some("x < y"));
    }

    #[test]
    fn test_parse_resolves_character_references() {
        // Numeric references resolve alongside the named entities.
        let doc = Document::from_str("<text:p>A&#38;B&#x0A;&#169;</text:p>").unwrap();
        assert_eq!(doc.text(doc.root()), Some("A&B\n\u{a9}"));
    }

    #[test]
    fn test_attribute_coercion() {
        let mut doc = Document::new("table:table-cell").unwrap();
        let el = doc.root();
        doc.set_attribute(el, "table:number-columns-repeated", "5")
            .unwrap();
        doc.set_attribute(el, "office:value", "3.14").unwrap();
        doc.set_attribute_bool(el, "table:protected", true).unwrap();

        assert_eq!(doc.attribute_int(el, "table:number-columns-repeated"), Some(5));
        assert_eq!(doc.attribute_uint(el, "table:number-columns-repeated"), Some(5));
        assert_eq!(doc.attribute_float(el, "office:value"), Some(3.14));
        assert_eq!(doc.attribute_bool(el, "table:protected"), Some(true));
        assert_eq!(doc.attribute_bool(el, "office:value"), None);
        assert_eq!(doc.attribute_int(el, "absent"), None);
    }

    #[test]
    fn test_set_attribute_opt_none_removes() {
        let mut doc = Document::new("text:p").unwrap();
        let el = doc.root();
        doc.set_attribute(el, "text:style-name", "T1").unwrap();
        doc.set_attribute_opt(el, "text:style-name", None).unwrap();
        assert_eq!(doc.attribute(el, "text:style-name"), None);
        // Removing an absent attribute is a no-op, not an error
        doc.set_attribute_opt(el, "text:style-name", None).unwrap();
    }

    #[test]
    fn test_set_tag_changes_kind() {
        let mut doc = Document::new("office:annotation").unwrap();
        let el = doc.root();
        assert_eq!(doc.kind(el), ElementKind::Generic);
        let kind = doc.set_tag(el, "table:table-cell").unwrap();
        assert_eq!(kind, ElementKind::Cell);
        assert_eq!(doc.kind(el), ElementKind::Cell);
    }

    #[test]
    fn test_style_family_discriminates_kind() {
        let mut doc = Document::new("style:style").unwrap();
        let el = doc.root();
        assert_eq!(doc.kind(el), ElementKind::Style(StyleFamily::Other));
        doc.set_attribute(el, "style:family", "table-cell").unwrap();
        assert_eq!(doc.kind(el), ElementKind::Style(StyleFamily::TableCell));
        doc.remove_attribute(el, "style:family");
        assert_eq!(doc.kind(el), ElementKind::Style(StyleFamily::Other));
    }

    #[test]
    fn test_insert_positions() {
        let mut doc = Document::new("office:body").unwrap();
        let root = doc.root();
        let a = doc.new_element("text:p").unwrap();
        let b = doc.new_element("text:p").unwrap();
        let c = doc.new_element("text:p").unwrap();
        let d = doc.new_element("text:p").unwrap();

        doc.insert(root, a, Position::LastChild).unwrap();
        doc.insert(root, b, Position::FirstChild).unwrap();
        doc.insert(a, c, Position::NextSibling).unwrap();
        doc.insert(a, d, Position::PrevSibling).unwrap();
        assert_eq!(doc.children(root), &[b, d, a, c]);

        let e = doc.new_element("text:p").unwrap();
        doc.insert(root, e, Position::Index(2)).unwrap();
        assert_eq!(doc.children(root), &[b, d, e, a, c]);

        assert_eq!(doc.next_sibling(d), Some(e));
        assert_eq!(doc.prev_sibling(d), Some(b));
        assert_eq!(doc.prev_sibling(b), None);
    }

    #[test]
    fn test_insert_invalid_positions() {
        let mut doc = Document::new("office:body").unwrap();
        let root = doc.root();
        let a = doc.new_element("text:p").unwrap();
        assert!(matches!(
            doc.insert(root, a, Position::Index(1)),
            Err(Error::Structure(_))
        ));

        doc.insert(root, a, Position::LastChild).unwrap();
        let b = doc.new_element("text:p").unwrap();
        // Sibling insert relative to the root has no parent to attach under
        assert!(matches!(
            doc.insert(root, b, Position::NextSibling),
            Err(Error::Structure(_))
        ));
        // Already-attached elements must be cloned or deleted first
        assert!(matches!(
            doc.insert(root, a, Position::LastChild),
            Err(Error::Structure(_))
        ));
    }

    #[test]
    fn test_insert_rejects_own_subtree() {
        let mut doc = Document::new("office:body").unwrap();
        let outer = doc.new_element("text:list").unwrap();
        let inner = doc.new_element("text:list-item").unwrap();
        doc.insert(outer, inner, Position::LastChild).unwrap();
        assert!(matches!(
            doc.insert(inner, outer, Position::LastChild),
            Err(Error::Structure(_))
        ));
    }

    #[test]
    fn test_append_text_dual_behavior() {
        let mut doc = Document::new("text:p").unwrap();
        let p = doc.root();

        // No children yet: text goes to the leading slot
        doc.append(p, "hello").unwrap();
        assert_eq!(doc.text(p), Some("hello"));

        let span = doc.new_element("text:span").unwrap();
        doc.append(p, span).unwrap();

        // With children: text accumulates on the last child's tail
        doc.append(p, " world").unwrap();
        doc.append(p, "!").unwrap();
        assert_eq!(doc.tail(span), Some(" world!"));
        assert_eq!(doc.text_content(p), "hello world!");
    }

    #[test]
    fn test_delete_relocates_tail() {
        let mut doc = Document::from_str("<text:p>a<text:span>b</text:span>c<text:span>d</text:span>e</text:p>").unwrap();
        let p = doc.root();
        let first = doc.children(p)[0];
        let second = doc.children(p)[1];

        // Deleting a middle element moves its tail to the previous sibling
        doc.delete(second).unwrap();
        assert_eq!(doc.tail(first), Some("ce"));

        // Deleting the first element moves its tail to the parent text
        doc.delete(first).unwrap();
        assert_eq!(doc.text(p), Some("ace"));
        assert_eq!(doc.children(p).len(), 0);
    }

    #[test]
    fn test_delete_without_keep_tail() {
        let mut doc = Document::from_str("<text:p>a<text:span>b</text:span>c</text:p>").unwrap();
        let p = doc.root();
        let span = doc.children(p)[0];
        doc.delete_keep_tail(span, false).unwrap();
        assert_eq!(doc.text(p), Some("a"));
        assert_eq!(doc.text_content(p), "a");
    }

    #[test]
    fn test_deleted_node_stays_readable() {
        let mut doc = Document::from_str("<text:p><text:span text:style-name=\"S\">b</text:span></text:p>").unwrap();
        let p = doc.root();
        let span = doc.children(p)[0];
        doc.delete(span).unwrap();

        assert_eq!(doc.parent(span), None);
        assert_eq!(doc.tag(span), "text:span");
        assert_eq!(doc.text(span), Some("b"));
        assert_eq!(doc.attribute(span, "text:style-name"), Some("S"));

        // Deleting again fails: the node is already detached
        assert!(matches!(doc.delete(span), Err(Error::Structure(_))));
    }

    #[test]
    fn test_delete_root_is_an_error() {
        let mut doc = Document::new("text:p").unwrap();
        let root = doc.root();
        assert!(matches!(doc.delete(root), Err(Error::Structure(_))));
    }

    #[test]
    fn test_clone_serializes_identically() {
        let mut doc = sample();
        let root = doc.root();
        let body = doc.children(root)[0];
        let text = doc.children(body)[0];
        let p = doc.children(text)[0];

        let copy = doc.clone_node(p);
        assert_eq!(doc.serialize(copy, false), doc.serialize(p, false));
        assert_eq!(doc.parent(copy), None);

        // The copy is independently mutable
        doc.set_text(copy, Some("changed"));
        assert_eq!(doc.text(p), Some("a"));
    }

    #[test]
    fn test_serialize_forms() {
        let mut doc = Document::new("office:body").unwrap();
        let root = doc.root();
        assert_eq!(doc.serialize(root, false), "<office:body/>");

        let p = doc.new_element("text:p").unwrap();
        doc.append(root, p).unwrap();
        doc.append(p, "x & y").unwrap();
        doc.set_attribute(p, "text:style-name", "a\"b").unwrap();
        assert_eq!(
            doc.serialize(root, false),
            "<office:body><text:p text:style-name=\"a&quot;b\">x &amp; y</text:p></office:body>"
        );
    }

    #[test]
    fn test_serialize_pretty_keeps_mixed_content_intact() {
        let doc = sample();
        let root = doc.root();
        let pretty = doc.serialize(root, true);

        // Structural levels are indented
        assert!(pretty.contains("\n  <office:body>"));
        // The mixed-content paragraph serializes inline, unchanged
        assert!(pretty.contains("<text:p text:style-name=\"T1\">a<text:span>b</text:span>c</text:p>"));
    }

    #[test]
    fn test_to_xml_declares_used_prefixes() {
        let doc = sample();
        let xml = doc.to_xml();
        assert!(xml.starts_with("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n"));
        assert!(xml.contains("xmlns:office=\"urn:oasis:names:tc:opendocument:xmlns:office:1.0\""));
        assert!(xml.contains("xmlns:text=\"urn:oasis:names:tc:opendocument:xmlns:text:1.0\""));
        // Unused prefixes are not declared
        assert!(!xml.contains("xmlns:table"));

        // Round trip: parse the serialized form and serialize again
        let doc2 = Document::from_str(&xml).unwrap();
        assert_eq!(doc2.to_xml(), xml);
    }

    #[test]
    fn test_text_content_nested() {
        let doc = Document::from_str(
            "<text:p>a<text:span>b<text:span>c</text:span>d</text:span>e</text:p>",
        )
        .unwrap();
        assert_eq!(doc.text_content(doc.root()), "abcde");
    }

    #[test]
    fn test_new_spreadsheet_skeleton() {
        let doc = Document::new_spreadsheet();
        let root = doc.root();
        assert_eq!(doc.tag(root), "office:document-content");
        assert_eq!(doc.attribute(root, "office:version"), Some("1.3"));
        let body = doc.body().unwrap();
        assert_eq!(doc.tag(body), "office:spreadsheet");
        assert!(doc.to_xml().contains("<office:spreadsheet/>"));
    }
}
