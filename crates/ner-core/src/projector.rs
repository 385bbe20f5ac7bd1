//! Turns match spans into annotation elements on an [`AnnotatedDocument`].

use crate::document::{AnnotatedDocument, Balancing, DocumentError, Element};

/// Namespace of the default `fn:match` annotation element.
pub const FN_NAMESPACE: &str = "http://www.w3.org/2005/xpath-functions";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarkupProjector {
    element_name: String,
    namespace_uri: Option<String>,
    attribute: String,
    balancing: Balancing,
}

impl MarkupProjector {
    pub fn new(
        element_name: &str,
        namespace_uri: Option<&str>,
        attribute: &str,
        balancing: Balancing,
    ) -> Self {
        Self {
            element_name: element_name.to_string(),
            namespace_uri: namespace_uri.map(str::to_string),
            attribute: attribute.to_string(),
            balancing,
        }
    }

    pub fn element_name(&self) -> &str {
        &self.element_name
    }

    pub fn namespace_uri(&self) -> Option<&str> {
        self.namespace_uri.as_deref()
    }

    pub fn attribute(&self) -> &str {
        &self.attribute
    }

    pub fn balancing(&self) -> Balancing {
        self.balancing
    }

    /// The annotation element for `ids`, joined with tabs in reported order.
    pub fn annotation(&self, ids: &[String]) -> Element {
        let mut element = Element::new(self.namespace_uri(), &self.element_name);
        element.set_attribute(&self.attribute, ids.join("\t"));
        element
    }

    /// `element` has the annotation element's local name and namespace.
    pub fn is_annotation(&self, element: &Element) -> bool {
        let local = self
            .element_name
            .split_once(':')
            .map_or(self.element_name.as_str(), |(_, local)| local);
        element.has_name(self.namespace_uri(), local)
    }

    /// Non-empty ranges already covered by annotation elements, in document order.
    pub fn annotated_ranges(&self, root: &Element) -> Vec<(usize, usize)> {
        root.descendants()
            .filter(|element| element.start() < element.end() && self.is_annotation(element))
            .map(|element| (element.start(), element.end()))
            .collect()
    }

    /// Insert one annotation over `[start, end)` of `document`.
    pub fn project<D: AnnotatedDocument + ?Sized>(
        &self,
        document: &mut D,
        start: usize,
        end: usize,
        ids: &[String],
    ) -> Result<bool, DocumentError> {
        document.insert_markup(self.annotation(ids), self.balancing, start, end)
    }
}

/// Selects the elements whose content a restricted scan looks at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementFilter {
    local_name: String,
    namespace_uri: Option<String>,
}

impl ElementFilter {
    /// An empty namespace means "no namespace".
    pub fn new(local_name: &str, namespace_uri: Option<&str>) -> Self {
        Self {
            local_name: local_name.to_string(),
            namespace_uri: namespace_uri
                .filter(|uri| !uri.is_empty())
                .map(str::to_string),
        }
    }

    pub fn local_name(&self) -> &str {
        &self.local_name
    }

    pub fn namespace_uri(&self) -> Option<&str> {
        self.namespace_uri.as_deref()
    }

    pub fn matches(&self, element: &Element) -> bool {
        element.has_name(self.namespace_uri(), &self.local_name)
    }
}

/// Character ranges of the elements selected by `filter`, depth-first in
/// document order. The content of a selected element is one region; its
/// descendants are not searched further.
pub fn qualifying_regions(root: &Element, filter: &ElementFilter) -> Vec<(usize, usize)> {
    let mut regions = Vec::new();
    let mut stack = vec![root];
    while let Some(element) = stack.pop() {
        if filter.matches(element) {
            regions.push((element.start(), element.end()));
        } else {
            stack.extend(element.children().iter().rev());
        }
    }
    regions
}
