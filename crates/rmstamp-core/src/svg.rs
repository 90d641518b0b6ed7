//! Minimal document-object model for SVG page markup
//!
//! The stroke rasterizer emits one SVG per page. Styling works on a parsed
//! tree rather than on the raw text: elements keep their attributes in
//! source order, text nodes keep their escaped form, and everything else
//! (declarations, comments, CDATA) is carried through verbatim.
//!
//! # Example
//!
//! ```
//! use rmstamp_core::svg::{Element, Node, SvgDocument};
//!
//! let mut doc = SvgDocument::parse(r#"<svg width="10" height="10"><path d="M0 0"/></svg>"#)?;
//! doc.root_mut()
//!     .children
//!     .push(Node::Element(Element::new("rect").with_attr("width", "10")));
//! assert!(doc.to_markup()?.contains("<rect width=\"10\"/>"));
//! # Ok::<(), rmstamp_core::svg::SvgError>(())
//! ```

use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};
use thiserror::Error;

/// SVG namespace URI
pub const SVG_NS: &str = "http://www.w3.org/2000/svg";

/// Errors raised while reading or writing markup
#[derive(Error, Debug)]
pub enum SvgError {
    /// Low-level XML error from the reader
    #[error("XML error: {0}")]
    Xml(#[from] quick_xml::Error),

    /// The markup is well-formed XML but not a usable SVG tree
    #[error("Malformed markup: {0}")]
    Malformed(String),

    /// Serializing the tree failed
    #[error("Write error: {0}")]
    Write(String),
}

/// A node in the tree
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Element(Element),
    /// Character data, kept escaped as it appeared in the source
    Text(String),
    /// Declarations, comments, CDATA, processing instructions
    Other(Event<'static>),
}

/// An element with ordered attributes and children
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Element {
    pub name: String,
    pub attributes: Vec<(String, String)>,
    pub children: Vec<Node>,
}

impl Element {
    /// Create an element with no attributes or children
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Builder-style attribute setter
    pub fn with_attr(mut self, name: &str, value: impl Into<String>) -> Self {
        self.set_attr(name, value);
        self
    }

    /// Element name without any namespace prefix
    pub fn local_name(&self) -> &str {
        match self.name.rsplit_once(':') {
            Some((_, local)) => local,
            None => &self.name,
        }
    }

    /// Get an attribute value
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    /// Set an attribute, replacing the value in place if it already exists
    pub fn set_attr(&mut self, name: &str, value: impl Into<String>) {
        let value = value.into();
        match self.attributes.iter_mut().find(|(k, _)| k == name) {
            Some((_, v)) => *v = value,
            None => self.attributes.push((name.to_string(), value)),
        }
    }

    /// Parsed `style` declarations, in source order
    pub fn style_declarations(&self) -> Vec<(String, String)> {
        self.attr("style")
            .map(parse_declarations)
            .unwrap_or_default()
    }

    /// Get a single property from the `style` attribute
    pub fn style_property(&self, name: &str) -> Option<String> {
        self.style_declarations()
            .into_iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v)
    }

    /// Set a property inside the `style` attribute, creating it if needed
    pub fn set_style_property(&mut self, name: &str, value: &str) {
        let mut decls = self.style_declarations();
        match decls.iter_mut().find(|(k, _)| k == name) {
            Some((_, v)) => *v = value.to_string(),
            None => decls.push((name.to_string(), value.to_string())),
        }
        let style = decls
            .iter()
            .map(|(k, v)| format!("{k}:{v}"))
            .collect::<Vec<_>>()
            .join(";");
        self.set_attr("style", style);
    }

    /// Set a paint property wherever the element declares it
    ///
    /// Updates the `style` declaration and the presentation attribute when
    /// either is present; when neither is, the property is added to `style`.
    pub fn set_paint_property(&mut self, name: &str, value: &str) {
        let in_style = self.style_property(name).is_some();
        let in_attr = self.attr(name).is_some();
        if in_style || !in_attr {
            self.set_style_property(name, value);
        }
        if in_attr {
            self.set_attr(name, value);
        }
    }

    /// Iterate over child elements
    pub fn child_elements(&self) -> impl Iterator<Item = &Element> {
        self.children.iter().filter_map(|n| match n {
            Node::Element(e) => Some(e),
            _ => None,
        })
    }

    /// Visit this element and every descendant, depth-first
    pub fn walk_mut(&mut self, f: &mut dyn FnMut(&mut Element)) {
        f(self);
        for child in &mut self.children {
            if let Node::Element(e) = child {
                e.walk_mut(f);
            }
        }
    }

    /// Whether this element or any descendant matches
    pub fn any(&self, pred: &dyn Fn(&Element) -> bool) -> bool {
        pred(self) || self.child_elements().any(|c| c.any(pred))
    }

    fn from_start(start: &BytesStart<'_>) -> Result<Self, SvgError> {
        let name = utf8(start.name().as_ref())?;
        let mut attributes = Vec::new();
        for attr in start.attributes() {
            let attr = attr.map_err(quick_xml::Error::from)?;
            let key = utf8(attr.key.as_ref())?;
            let value = attr
                .unescape_value()
                .map_err(|e| SvgError::Malformed(format!("attribute {key}: {e}")))?
                .into_owned();
            attributes.push((key, value));
        }
        Ok(Self {
            name,
            attributes,
            children: Vec::new(),
        })
    }

    fn write_to(&self, writer: &mut Writer<Vec<u8>>) -> Result<(), SvgError> {
        let mut start = BytesStart::new(self.name.as_str());
        for (k, v) in &self.attributes {
            start.push_attribute((k.as_str(), v.as_str()));
        }

        if self.children.is_empty() {
            return emit(writer, Event::Empty(start));
        }

        emit(writer, Event::Start(start))?;
        for child in &self.children {
            child.write_to(writer)?;
        }
        emit(writer, Event::End(BytesEnd::new(self.name.as_str())))
    }
}

impl Node {
    fn write_to(&self, writer: &mut Writer<Vec<u8>>) -> Result<(), SvgError> {
        match self {
            Node::Element(e) => e.write_to(writer),
            Node::Text(t) => emit(writer, Event::Text(BytesText::from_escaped(t.as_str()))),
            Node::Other(event) => emit(writer, event.borrow()),
        }
    }
}

/// A parsed SVG document: prolog, single root element, epilog
#[derive(Debug, Clone, PartialEq)]
pub struct SvgDocument {
    prolog: Vec<Node>,
    root: Element,
    epilog: Vec<Node>,
}

impl SvgDocument {
    /// Wrap an element as a document root
    pub fn from_root(root: Element) -> Self {
        Self {
            prolog: Vec::new(),
            root,
            epilog: Vec::new(),
        }
    }

    /// An empty, fully transparent page of the given size in points
    pub fn blank(width: f64, height: f64) -> Self {
        Self::from_root(
            Element::new("svg")
                .with_attr("xmlns", SVG_NS)
                .with_attr("width", format_number(width))
                .with_attr("height", format_number(height))
                .with_attr(
                    "viewBox",
                    format!("0 0 {} {}", format_number(width), format_number(height)),
                ),
        )
    }

    /// Parse markup into a tree
    pub fn parse(markup: &str) -> Result<Self, SvgError> {
        let mut reader = Reader::from_str(markup);

        let mut stack: Vec<Element> = Vec::new();
        let mut prolog = Vec::new();
        let mut epilog = Vec::new();
        let mut root: Option<Element> = None;

        loop {
            let node = match reader.read_event()? {
                Event::Start(ref e) => {
                    stack.push(Element::from_start(e)?);
                    continue;
                }
                Event::End(_) => {
                    let element = stack
                        .pop()
                        .ok_or_else(|| SvgError::Malformed("unbalanced end tag".to_string()))?;
                    Node::Element(element)
                }
                Event::Empty(ref e) => Node::Element(Element::from_start(e)?),
                Event::Text(t) => Node::Text(utf8(&t)?),
                Event::Eof => break,
                other => Node::Other(other.into_owned()),
            };

            if let Some(parent) = stack.last_mut() {
                parent.children.push(node);
                continue;
            }

            match node {
                Node::Element(element) => {
                    if root.is_some() {
                        return Err(SvgError::Malformed(
                            "more than one root element".to_string(),
                        ));
                    }
                    root = Some(element);
                }
                other if root.is_none() => prolog.push(other),
                other => epilog.push(other),
            }
        }

        if !stack.is_empty() {
            return Err(SvgError::Malformed("unclosed element".to_string()));
        }
        let root = root.ok_or_else(|| SvgError::Malformed("no root element".to_string()))?;
        if root.local_name() != "svg" {
            return Err(SvgError::Malformed(format!(
                "root element is <{}>, expected <svg>",
                root.name
            )));
        }

        Ok(Self {
            prolog,
            root,
            epilog,
        })
    }

    /// The root `<svg>` element
    pub fn root(&self) -> &Element {
        &self.root
    }

    pub fn root_mut(&mut self) -> &mut Element {
        &mut self.root
    }

    /// Serialize the tree back to markup
    pub fn to_markup(&self) -> Result<String, SvgError> {
        let mut writer = Writer::new(Vec::new());
        for node in &self.prolog {
            node.write_to(&mut writer)?;
        }
        self.root.write_to(&mut writer)?;
        for node in &self.epilog {
            node.write_to(&mut writer)?;
        }
        String::from_utf8(writer.into_inner()).map_err(|e| SvgError::Write(e.to_string()))
    }
}

/// Format a length without a trailing `.0`
pub fn format_number(value: f64) -> String {
    format!("{value}")
}

fn emit(writer: &mut Writer<Vec<u8>>, event: Event<'_>) -> Result<(), SvgError> {
    writer
        .write_event(event)
        .map_err(|e| SvgError::Write(e.to_string()))
}

fn utf8(bytes: &[u8]) -> Result<String, SvgError> {
    std::str::from_utf8(bytes)
        .map(str::to_string)
        .map_err(|e| SvgError::Malformed(e.to_string()))
}

fn parse_declarations(style: &str) -> Vec<(String, String)> {
    style
        .split(';')
        .filter_map(|decl| {
            let (k, v) = decl.split_once(':')?;
            let k = k.trim();
            (!k.is_empty()).then(|| (k.to_string(), v.trim().to_string()))
        })
        .collect()
}
