use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use super::{split_qname, AnnotatedDocument, DocumentError, Element, SmaxDocument};

const XML_NAMESPACE: &str = "http://www.w3.org/XML/1998/namespace";

/// In-scope prefix bindings, innermost last. `None` is the default namespace;
/// an empty URI undeclares it.
#[derive(Default)]
struct Scope {
    bindings: Vec<(Option<String>, String)>,
    marks: Vec<usize>,
}

impl Scope {
    fn push(&mut self) {
        self.marks.push(self.bindings.len());
    }

    fn pop(&mut self) {
        if let Some(mark) = self.marks.pop() {
            self.bindings.truncate(mark);
        }
    }

    fn bind(&mut self, prefix: Option<&str>, uri: &str) {
        self.bindings
            .push((prefix.map(str::to_string), uri.to_string()));
    }

    fn resolve(&self, prefix: Option<&str>) -> Option<&str> {
        if prefix == Some("xml") {
            return Some(XML_NAMESPACE);
        }
        self.bindings
            .iter()
            .rev()
            .find(|(p, _)| p.as_deref() == prefix)
            .map(|(_, uri)| uri.as_str())
            .filter(|uri| !uri.is_empty())
    }
}

fn xml_error(e: impl std::fmt::Display) -> DocumentError {
    DocumentError::Xml(e.to_string())
}

impl SmaxDocument {
    /// Read an XML document. Comments, processing instructions and the
    /// document type declaration are dropped.
    pub fn from_xml(xml: &str) -> Result<Self, DocumentError> {
        let mut reader = Reader::from_str(xml);
        reader.config_mut().trim_text(false);

        let mut content: Vec<char> = Vec::new();
        let mut open: Vec<Element> = Vec::new();
        let mut scope = Scope::default();
        let mut root: Option<Element> = None;

        loop {
            match reader.read_event().map_err(xml_error)? {
                Event::Start(start) => {
                    if root.is_some() {
                        return Err(xml_error("more than one root element"));
                    }
                    scope.push();
                    let mut element = open_element(&start, &mut scope)?;
                    element.start = content.len();
                    open.push(element);
                }
                Event::Empty(start) => {
                    if root.is_some() {
                        return Err(xml_error("more than one root element"));
                    }
                    scope.push();
                    let mut element = open_element(&start, &mut scope)?;
                    scope.pop();
                    element.start = content.len();
                    element.end = content.len();
                    match open.last_mut() {
                        Some(parent) => parent.children.push(element),
                        None => root = Some(element),
                    }
                }
                Event::End(_) => {
                    scope.pop();
                    let Some(mut element) = open.pop() else {
                        return Err(xml_error("unexpected end tag"));
                    };
                    element.end = content.len();
                    match open.last_mut() {
                        Some(parent) => parent.children.push(element),
                        None => root = Some(element),
                    }
                }
                Event::Text(text) => {
                    let text = text.unescape().map_err(xml_error)?;
                    if open.is_empty() {
                        if !text.trim().is_empty() {
                            return Err(xml_error("text outside the document element"));
                        }
                    } else {
                        content.extend(text.chars());
                    }
                }
                Event::CData(data) => {
                    if open.is_empty() {
                        return Err(xml_error("CDATA outside the document element"));
                    }
                    let bytes = data.into_inner();
                    content.extend(std::str::from_utf8(&bytes).map_err(xml_error)?.chars());
                }
                Event::Eof => break,
                _ => {}
            }
        }

        if !open.is_empty() {
            return Err(xml_error("unclosed element"));
        }
        let root = root.ok_or(DocumentError::NoRootElement)?;
        Ok(SmaxDocument { content, root })
    }

    /// Serialize to XML without an XML declaration.
    ///
    /// Namespace declarations from the source are kept; elements whose
    /// namespace is not bound in scope (such as inserted annotations) get
    /// their own declaration.
    pub fn to_xml(&self) -> String {
        let mut out = String::with_capacity(self.content.len() * 2);
        let mut scope = Scope::default();
        write_element(&mut out, self.content(), self.root(), &mut scope);
        out
    }
}

fn open_element(start: &BytesStart<'_>, scope: &mut Scope) -> Result<Element, DocumentError> {
    let qname = std::str::from_utf8(start.name().as_ref())
        .map_err(xml_error)?
        .to_string();
    let mut attributes = Vec::new();
    let mut declarations = Vec::new();
    for attr in start.attributes() {
        let attr = attr.map_err(xml_error)?;
        let key = std::str::from_utf8(attr.key.as_ref()).map_err(xml_error)?;
        let value = attr.unescape_value().map_err(xml_error)?.into_owned();
        if key == "xmlns" {
            declarations.push((None, value));
        } else if let Some(prefix) = key.strip_prefix("xmlns:") {
            declarations.push((Some(prefix.to_string()), value));
        } else {
            attributes.push((key.to_string(), value));
        }
    }
    for (prefix, uri) in &declarations {
        scope.bind(prefix.as_deref(), uri);
    }

    let (prefix, _) = split_qname(&qname);
    let namespace_uri = scope.resolve(prefix);
    if prefix.is_some() && namespace_uri.is_none() {
        return Err(xml_error(format!("unbound namespace prefix in <{qname}>")));
    }
    let mut element = Element::new(namespace_uri, &qname);
    element.attributes = attributes;
    for (prefix, uri) in &declarations {
        element.declare_namespace(prefix.as_deref(), uri);
    }
    Ok(element)
}

/// An element whose start tag is written, with the index of the next child to emit.
struct OpenTag<'a> {
    element: &'a Element,
    next_child: usize,
    /// Text offset up to which content has been written.
    pos: usize,
}

fn write_element(out: &mut String, content: &[char], root: &Element, scope: &mut Scope) {
    let mut open: Vec<OpenTag<'_>> = Vec::new();
    if write_start_tag(out, root, scope) {
        open.push(OpenTag {
            element: root,
            next_child: 0,
            pos: root.start(),
        });
    }
    while let Some(tag) = open.last_mut() {
        let element = tag.element;
        match element.children().get(tag.next_child) {
            Some(child) => {
                escape_text(out, &content[tag.pos..child.start()]);
                tag.next_child += 1;
                tag.pos = child.end();
                if write_start_tag(out, child, scope) {
                    open.push(OpenTag {
                        element: child,
                        next_child: 0,
                        pos: child.start(),
                    });
                }
            }
            None => {
                escape_text(out, &content[tag.pos..element.end()]);
                out.push_str("</");
                out.push_str(element.qualified_name());
                out.push('>');
                scope.pop();
                open.pop();
            }
        }
    }
}

/// Write the start tag of `element`, or the whole element when it is empty.
/// Returns whether the element was left open, with its namespace scope pushed.
fn write_start_tag(out: &mut String, element: &Element, scope: &mut Scope) -> bool {
    scope.push();
    out.push('<');
    out.push_str(element.qualified_name());
    for (prefix, uri) in element.declarations() {
        write_declaration(out, prefix.as_deref(), uri);
        scope.bind(prefix.as_deref(), uri);
    }
    let prefix = element.prefix();
    if prefix != Some("xml") && scope.resolve(prefix) != element.namespace_uri() {
        let uri = element.namespace_uri().unwrap_or("");
        write_declaration(out, prefix, uri);
        scope.bind(prefix, uri);
    }
    for (name, value) in element.attributes() {
        out.push(' ');
        out.push_str(name);
        out.push_str("=\"");
        escape_attribute(out, value);
        out.push('"');
    }

    if element.children().is_empty() && element.start() == element.end() {
        out.push_str("/>");
        scope.pop();
        return false;
    }
    out.push('>');
    true
}

fn write_declaration(out: &mut String, prefix: Option<&str>, uri: &str) {
    match prefix {
        Some(prefix) => {
            out.push_str(" xmlns:");
            out.push_str(prefix);
        }
        None => out.push_str(" xmlns"),
    }
    out.push_str("=\"");
    escape_attribute(out, uri);
    out.push('"');
}

fn escape_text(out: &mut String, text: &[char]) {
    for &c in text {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(c),
        }
    }
}

fn escape_attribute(out: &mut String, value: &str) {
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\t' => out.push_str("&#9;"),
            '\n' => out.push_str("&#10;"),
            '\r' => out.push_str("&#13;"),
            _ => out.push(c),
        }
    }
}
