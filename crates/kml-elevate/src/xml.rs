//! Mutable XML tree that writes untouched markup back verbatim
//!
//! The tree is an arena of elements built from `quick-xml` events. Every
//! start tag, text run, comment, processing instruction, declaration and
//! DOCTYPE is kept as the owned event it was read from, end tags included, so
//! serializing an unmodified document reproduces its input.
//!
//! Names are matched on their local part: `kml:LineString` and `LineString`
//! both match `"LineString"`.

use crate::error::{ElevateError, Result};
use quick_xml::events::{BytesCData, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::name::{QName, ResolveResult};
use quick_xml::reader::NsReader;
use quick_xml::Writer;

/// Index of an element in a [`Document`]
pub type ElementId = usize;

#[derive(Debug, Clone)]
enum Node {
    Element(ElementId),
    Text(BytesText<'static>),
    CData(BytesCData<'static>),
    /// Comments, processing instructions, declaration, DOCTYPE
    Markup(Event<'static>),
}

#[derive(Debug, Clone)]
struct Element {
    start: BytesStart<'static>,
    /// Read as `<name/>`; cleared once the element gains children
    self_closing: bool,
    /// End tag as written; `None` for created and self-closing elements
    end: Option<BytesEnd<'static>>,
    parent: Option<ElementId>,
    children: Vec<Node>,
}

/// A parsed XML document
#[derive(Debug, Clone)]
pub struct Document {
    /// Top-level nodes: prolog, root element, trailing whitespace/comments
    nodes: Vec<Node>,
    elements: Vec<Element>,
    root: ElementId,
}

impl Document {
    /// Parse XML text into a tree
    ///
    /// # Errors
    ///
    /// Returns [`ElevateError::InvalidFormat`] if the text is not a
    /// well-formed XML document: syntax errors, mismatched or unclosed tags,
    /// `--` inside comments, characters XML does not allow, undecodable
    /// entities, unbound namespace prefixes, or anything other than exactly
    /// one root element.
    pub fn parse(input: &str) -> Result<Self> {
        let input = input.strip_prefix('\u{feff}').unwrap_or(input);
        let mut reader = NsReader::from_str(input);
        // End tags are kept as written and matched below
        reader
            .check_comments(true)
            .check_end_names(false)
            .trim_markup_names_in_closing_tags(false);

        let mut nodes = Vec::new();
        let mut elements: Vec<Element> = Vec::new();
        let mut root = None;
        let mut stack: Vec<ElementId> = Vec::new();

        loop {
            let event = reader.read_event().map_err(|e| {
                ElevateError::InvalidFormat(format!(
                    "{e} (at byte {})",
                    reader.buffer_position()
                ))
            })?;
            let parent = stack.last().copied();

            let node = match event {
                Event::Eof => break,
                Event::Start(start) | Event::Empty(start) if parent.is_none() && root.is_some() => {
                    return Err(ElevateError::InvalidFormat(format!(
                        "second root element <{}>",
                        String::from_utf8_lossy(start.name().as_ref())
                    )));
                }
                Event::Start(start) => {
                    let id = push_element(&reader, &mut elements, start, false, parent)?;
                    root.get_or_insert(id);
                    stack.push(id);
                    Node::Element(id)
                }
                Event::Empty(start) => {
                    let id = push_element(&reader, &mut elements, start, true, parent)?;
                    root.get_or_insert(id);
                    Node::Element(id)
                }
                Event::End(end) => {
                    let Some(open) = stack.pop() else {
                        return Err(ElevateError::InvalidFormat(format!(
                            "unexpected </{}>",
                            String::from_utf8_lossy(end.name().as_ref()).trim_end()
                        )));
                    };
                    let raw = end.name().into_inner();
                    let found = &raw[..raw.len() - trailing_whitespace(raw)];
                    let expected = elements[open].start.name();
                    if found != expected.as_ref() {
                        return Err(ElevateError::InvalidFormat(format!(
                            "expected </{}>, found </{}>",
                            String::from_utf8_lossy(expected.as_ref()),
                            String::from_utf8_lossy(found)
                        )));
                    }
                    elements[open].end = Some(end.into_owned());
                    continue;
                }
                Event::Text(text) => {
                    check_chars(text.unescape()?.as_bytes(), "text")?;
                    if parent.is_none() && !text.iter().all(u8::is_ascii_whitespace) {
                        return Err(ElevateError::InvalidFormat(
                            "text outside the root element".to_string(),
                        ));
                    }
                    Node::Text(text.into_owned())
                }
                Event::CData(cdata) => {
                    if parent.is_none() {
                        return Err(ElevateError::InvalidFormat(
                            "CDATA outside the root element".to_string(),
                        ));
                    }
                    check_chars(&cdata, "CDATA section")?;
                    Node::CData(cdata.into_owned())
                }
                Event::Comment(comment) => {
                    check_chars(&comment, "comment")?;
                    Node::Markup(Event::Comment(comment.into_owned()))
                }
                other => Node::Markup(other.into_owned()),
            };

            match parent {
                Some(parent) => elements[parent].children.push(node),
                None => nodes.push(node),
            }
        }

        if let Some(&open) = stack.last() {
            return Err(ElevateError::InvalidFormat(format!(
                "unclosed element <{}>",
                String::from_utf8_lossy(elements[open].start.name().as_ref())
            )));
        }
        let root =
            root.ok_or_else(|| ElevateError::InvalidFormat("no root element".to_string()))?;

        Ok(Self {
            nodes,
            elements,
            root,
        })
    }

    /// Serialize the tree back to XML text
    ///
    /// # Errors
    ///
    /// Propagates writer errors from `quick-xml`.
    pub fn to_xml_string(&self) -> Result<String> {
        let mut writer = Writer::new(Vec::new());
        for node in &self.nodes {
            self.write_node(&mut writer, node)?;
        }
        String::from_utf8(writer.into_inner())
            .map_err(|e| ElevateError::InvalidFormat(format!("serialized output: {e}")))
    }

    fn write_node(&self, writer: &mut Writer<Vec<u8>>, node: &Node) -> Result<()> {
        match node {
            Node::Element(id) => {
                let element = &self.elements[*id];
                if element.self_closing && element.children.is_empty() {
                    writer.write_event(Event::Empty(element.start.borrow()))?;
                } else {
                    writer.write_event(Event::Start(element.start.borrow()))?;
                    for child in &element.children {
                        self.write_node(writer, child)?;
                    }
                    let end = match &element.end {
                        Some(end) => end.borrow(),
                        None => element.start.to_end(),
                    };
                    writer.write_event(Event::End(end))?;
                }
            }
            Node::Text(text) => writer.write_event(Event::Text(text.clone()))?,
            Node::CData(cdata) => writer.write_event(Event::CData(cdata.clone()))?,
            Node::Markup(event) => writer.write_event(event)?,
        }
        Ok(())
    }

    /// The document element
    #[inline]
    #[must_use]
    pub const fn root(&self) -> ElementId {
        self.root
    }

    /// Whether the element's local name is `local_name`
    #[inline]
    #[must_use]
    pub fn is(&self, id: ElementId, local_name: &str) -> bool {
        self.elements[id].start.local_name().as_ref() == local_name.as_bytes()
    }

    /// Qualified name of an element, e.g. `kml:Placemark`
    #[must_use]
    pub fn name(&self, id: ElementId) -> String {
        String::from_utf8_lossy(self.elements[id].start.name().as_ref()).into_owned()
    }

    /// All elements named `local_name` in document order, root included
    #[must_use]
    pub fn elements_named(&self, local_name: &str) -> Vec<ElementId> {
        let mut found = Vec::new();
        if self.is(self.root, local_name) {
            found.push(self.root);
        }
        found.extend(self.descendants(self.root, local_name));
        found
    }

    /// Descendants of `id` named `local_name` in document order
    #[must_use]
    pub fn descendants(&self, id: ElementId, local_name: &str) -> Vec<ElementId> {
        let mut found = Vec::new();
        self.collect_descendants(id, local_name, &mut found);
        found
    }

    fn collect_descendants(&self, id: ElementId, local_name: &str, found: &mut Vec<ElementId>) {
        for child in self.child_elements(id) {
            if self.is(child, local_name) {
                found.push(child);
            }
            self.collect_descendants(child, local_name, found);
        }
    }

    /// First descendant of `id` named `local_name`
    #[must_use]
    pub fn first_descendant(&self, id: ElementId, local_name: &str) -> Option<ElementId> {
        self.child_elements(id).find_map(|child| {
            if self.is(child, local_name) {
                Some(child)
            } else {
                self.first_descendant(child, local_name)
            }
        })
    }

    /// Nearest ancestor of `id` named `local_name`
    #[must_use]
    pub fn ancestor(&self, id: ElementId, local_name: &str) -> Option<ElementId> {
        let mut current = self.elements[id].parent;
        while let Some(parent) = current {
            if self.is(parent, local_name) {
                return Some(parent);
            }
            current = self.elements[parent].parent;
        }
        None
    }

    fn child_elements(&self, id: ElementId) -> impl Iterator<Item = ElementId> + '_ {
        self.elements[id].children.iter().filter_map(|node| match node {
            Node::Element(child) => Some(*child),
            _ => None,
        })
    }

    /// Parent of an element; `None` for the root and detached elements
    #[inline]
    #[must_use]
    pub fn parent(&self, id: ElementId) -> Option<ElementId> {
        self.elements[id].parent
    }

    /// Position of `child` among all child nodes of `parent` (text included)
    #[must_use]
    pub fn child_position(&self, parent: ElementId, child: ElementId) -> Option<usize> {
        self.elements[parent]
            .children
            .iter()
            .position(|node| matches!(node, Node::Element(id) if *id == child))
    }

    /// Concatenated, unescaped text of an element and its descendants
    ///
    /// # Errors
    ///
    /// Returns [`ElevateError::InvalidFormat`] if a text node cannot be
    /// unescaped.
    pub fn text(&self, id: ElementId) -> Result<String> {
        let mut out = String::new();
        self.collect_text(id, &mut out)?;
        Ok(out)
    }

    fn collect_text(&self, id: ElementId, out: &mut String) -> Result<()> {
        for node in &self.elements[id].children {
            match node {
                Node::Element(child) => self.collect_text(*child, out)?,
                Node::Text(text) => out.push_str(&text.unescape()?),
                Node::CData(cdata) => out.push_str(&String::from_utf8_lossy(cdata)),
                Node::Markup(_) => {}
            }
        }
        Ok(())
    }

    /// Replace all children of an element with one (escaped) text node
    pub fn set_text(&mut self, id: ElementId, text: &str) {
        let old = std::mem::replace(
            &mut self.elements[id].children,
            vec![Node::Text(BytesText::new(text).into_owned())],
        );
        for node in old {
            if let Node::Element(child) = node {
                self.elements[child].parent = None;
            }
        }
    }

    /// Create a detached element named `local_name`
    ///
    /// The new element takes the namespace prefix of `context` (the element
    /// it is about to be inserted into), so children of `kml:LineString`
    /// come out as `kml:altitudeMode`.
    pub fn create_element(&mut self, context: ElementId, local_name: &str) -> ElementId {
        let name = match self.elements[context].start.name().prefix() {
            Some(prefix) => format!(
                "{}:{local_name}",
                String::from_utf8_lossy(prefix.as_ref())
            ),
            None => local_name.to_string(),
        };
        log::trace!("creating <{name}>");
        self.elements.push(Element {
            start: BytesStart::new(name),
            self_closing: false,
            end: None,
            parent: None,
            children: Vec::new(),
        });
        self.elements.len() - 1
    }

    /// Insert a detached element as child node `index` of `parent`
    ///
    /// `index` counts all child nodes and is clamped to the child count.
    pub fn insert_child(&mut self, parent: ElementId, index: usize, child: ElementId) {
        debug_assert!(self.elements[child].parent.is_none(), "element already attached");
        let element = &mut self.elements[parent];
        let index = index.min(element.children.len());
        element.children.insert(index, Node::Element(child));
        element.self_closing = false;
        self.elements[child].parent = Some(parent);
    }

    /// Append a detached element as the last child of `parent`
    pub fn append_child(&mut self, parent: ElementId, child: ElementId) {
        let end = self.elements[parent].children.len();
        self.insert_child(parent, end, child);
    }
}

fn push_element<R>(
    reader: &NsReader<R>,
    elements: &mut Vec<Element>,
    start: BytesStart<'_>,
    self_closing: bool,
    parent: Option<ElementId>,
) -> Result<ElementId> {
    if let (ResolveResult::Unknown(prefix), _) = reader.resolve_element(start.name()) {
        return Err(unbound_prefix(&prefix, start.name()));
    }
    for attr in start.attributes() {
        let attr = attr?;
        if let (ResolveResult::Unknown(prefix), _) = reader.resolve_attribute(attr.key) {
            return Err(unbound_prefix(&prefix, attr.key));
        }
        check_chars(attr.unescape_value()?.as_bytes(), "attribute value")?;
    }
    elements.push(Element {
        start: start.into_owned(),
        self_closing,
        end: None,
        parent,
        children: Vec::new(),
    });
    Ok(elements.len() - 1)
}

fn unbound_prefix(prefix: &[u8], name: QName<'_>) -> ElevateError {
    ElevateError::InvalidFormat(format!(
        "namespace prefix `{}` of `{}` is not declared",
        String::from_utf8_lossy(prefix),
        String::from_utf8_lossy(name.as_ref())
    ))
}

/// Reject characters outside the XML `Char` production
fn check_chars(bytes: &[u8], what: &str) -> Result<()> {
    let text = std::str::from_utf8(bytes)
        .map_err(|e| ElevateError::InvalidFormat(format!("{what}: {e}")))?;
    match text.chars().find(|&c| !is_xml_char(c)) {
        Some(c) => Err(ElevateError::InvalidFormat(format!(
            "{what} contains character U+{:04X}, which XML does not allow",
            u32::from(c)
        ))),
        None => Ok(()),
    }
}

fn trailing_whitespace(bytes: &[u8]) -> usize {
    bytes
        .iter()
        .rev()
        .take_while(|b| b.is_ascii_whitespace())
        .count()
}

const fn is_xml_char(c: char) -> bool {
    matches!(
        c,
        '\t' | '\n' | '\r' | '\u{20}'..='\u{D7FF}' | '\u{E000}'..='\u{FFFD}' | '\u{10000}'..='\u{10FFFF}'
    )
}
