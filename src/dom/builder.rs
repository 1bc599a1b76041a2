//! Fluent element construction.

use super::{Document, NodeId};

/// Builder for an element subtree.
#[derive(Debug, Clone, Default)]
pub struct ElementBuilder {
    tag: String,
    classes: Vec<String>,
    attrs: Vec<(String, String)>,
    text: Option<String>,
    value: Option<String>,
    hidden: bool,
    disabled: bool,
    children: Vec<ElementBuilder>,
}

impl ElementBuilder {
    /// Start a new element.
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            ..Default::default()
        }
    }

    /// Set the `id` attribute.
    pub fn id(self, id: impl Into<String>) -> Self {
        self.attr("id", id)
    }

    /// Add one or more space-separated classes.
    pub fn class(mut self, class: &str) -> Self {
        self.classes
            .extend(class.split_whitespace().map(str::to_string));
        self
    }

    /// Set an attribute.
    pub fn attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attrs.push((name.into(), value.into()));
        self
    }

    /// Set own text.
    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    /// Set a form value.
    pub fn value(mut self, value: impl Into<String>) -> Self {
        self.value = Some(value.into());
        self
    }

    /// Start hidden.
    pub fn hidden(mut self) -> Self {
        self.hidden = true;
        self
    }

    /// Start disabled.
    pub fn disabled(mut self) -> Self {
        self.disabled = true;
        self
    }

    /// Add a child element.
    pub fn child(mut self, child: ElementBuilder) -> Self {
        self.children.push(child);
        self
    }

    /// Create the subtree detached from the document.
    pub fn build(self, doc: &mut Document) -> NodeId {
        let node = doc.create(&self.tag);
        if let Some(el) = doc.get_mut(node) {
            for class in &self.classes {
                el.add_class(class);
            }
            for (name, value) in &self.attrs {
                el.set_attr(name, value.as_str());
            }
            if let Some(text) = self.text {
                el.set_text(text);
            }
            if let Some(value) = self.value {
                el.set_value(value);
            }
            el.set_hidden(self.hidden);
            el.set_disabled(self.disabled);
        }
        for child in self.children {
            let child_id = child.build(doc);
            doc.append(node, child_id);
        }
        node
    }

    /// Create the subtree and append it under `parent`.
    pub fn append_to(self, doc: &mut Document, parent: NodeId) -> NodeId {
        let node = self.build(doc);
        doc.append(parent, node);
        node
    }
}
