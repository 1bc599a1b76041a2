//! Headless document model.
//!
//! A small arena of elements standing in for the page the behaviors run
//! against. Nodes are addressed by [`NodeId`]; a removed node simply stops
//! resolving, so handlers re-query through [`Document::get`] before touching
//! anything they did not create in the same critical section.

mod builder;

pub use builder::ElementBuilder;

use crate::validate::SelectedFile;
use parking_lot::Mutex;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

/// Document shared between the controller and its timer tasks.
pub type SharedDocument = Arc<Mutex<Document>>;

/// Handle to a node in a [`Document`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u64);

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Tags rendered without a closing tag.
const VOID_TAGS: &[&str] = &["img", "input", "br", "hr", "meta", "link"];

/// A single element.
#[derive(Debug, Clone, Default)]
pub struct Element {
    tag: String,
    classes: Vec<String>,
    attrs: BTreeMap<String, String>,
    styles: BTreeMap<String, String>,
    text: String,
    value: String,
    files: Vec<SelectedFile>,
    disabled: bool,
    hidden: bool,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

/// Restorable presentation state of one element.
#[derive(Debug, Clone, PartialEq)]
pub struct ElementState {
    classes: Vec<String>,
    attrs: BTreeMap<String, String>,
    styles: BTreeMap<String, String>,
    text: String,
    disabled: bool,
    hidden: bool,
}

impl Element {
    fn new(tag: &str) -> Self {
        Self {
            tag: tag.to_ascii_lowercase(),
            ..Default::default()
        }
    }

    /// Lowercase tag name.
    pub fn tag(&self) -> &str {
        &self.tag
    }

    /// Value of the `id` attribute.
    pub fn id(&self) -> Option<&str> {
        self.attr("id")
    }

    /// Check for a class.
    pub fn has_class(&self, class: &str) -> bool {
        self.classes.iter().any(|c| c == class)
    }

    /// Add a class (no duplicates).
    pub fn add_class(&mut self, class: &str) {
        if !self.has_class(class) {
            self.classes.push(class.to_string());
        }
    }

    /// Remove a class.
    pub fn remove_class(&mut self, class: &str) {
        self.classes.retain(|c| c != class);
    }

    /// Toggle a class, returning whether it is now present.
    pub fn toggle_class(&mut self, class: &str) -> bool {
        if self.has_class(class) {
            self.remove_class(class);
            false
        } else {
            self.add_class(class);
            true
        }
    }

    /// Replace all classes with a space-separated list.
    pub fn set_classes(&mut self, classes: &str) {
        self.classes.clear();
        for class in classes.split_whitespace() {
            self.add_class(class);
        }
    }

    /// Classes in insertion order.
    pub fn classes(&self) -> &[String] {
        &self.classes
    }

    /// Read an attribute.
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs.get(name).map(String::as_str)
    }

    /// Set an attribute.
    pub fn set_attr(&mut self, name: &str, value: impl Into<String>) {
        self.attrs.insert(name.to_string(), value.into());
    }

    /// Remove an attribute, returning its old value.
    pub fn remove_attr(&mut self, name: &str) -> Option<String> {
        self.attrs.remove(name)
    }

    /// Read an inline style property.
    pub fn style(&self, property: &str) -> Option<&str> {
        self.styles.get(property).map(String::as_str)
    }

    /// Set an inline style property.
    pub fn set_style(&mut self, property: &str, value: impl Into<String>) {
        self.styles.insert(property.to_string(), value.into());
    }

    /// Own text (not including children).
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Replace own text. Text is never interpreted as markup.
    pub fn set_text(&mut self, text: impl Into<String>) {
        self.text = text.into();
    }

    /// Form control value.
    pub fn value(&self) -> &str {
        &self.value
    }

    /// Set the form control value.
    pub fn set_value(&mut self, value: impl Into<String>) {
        self.value = value.into();
    }

    /// Files selected in a file input.
    pub fn files(&self) -> &[SelectedFile] {
        &self.files
    }

    /// Replace the selected files; the value mirrors the first file name.
    pub fn set_files(&mut self, files: Vec<SelectedFile>) {
        self.value = files
            .first()
            .map(|f| format!("C:\\fakepath\\{}", f.name))
            .unwrap_or_default();
        self.files = files;
    }

    /// Clear the input value and any selected files.
    pub fn clear_files(&mut self) {
        self.files.clear();
        self.value.clear();
    }

    /// Whether the control is disabled.
    pub fn is_disabled(&self) -> bool {
        self.disabled
    }

    /// Enable or disable the control.
    pub fn set_disabled(&mut self, disabled: bool) {
        self.disabled = disabled;
    }

    /// Whether the element is hidden.
    pub fn is_hidden(&self) -> bool {
        self.hidden
    }

    /// Show or hide the element.
    pub fn set_hidden(&mut self, hidden: bool) {
        self.hidden = hidden;
    }

    /// Parent node, if attached.
    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    /// Child nodes in order.
    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    /// Capture the presentation state for a later [`Element::restore`].
    pub fn snapshot(&self) -> ElementState {
        ElementState {
            classes: self.classes.clone(),
            attrs: self.attrs.clone(),
            styles: self.styles.clone(),
            text: self.text.clone(),
            disabled: self.disabled,
            hidden: self.hidden,
        }
    }

    /// Restore presentation state captured by [`Element::snapshot`].
    pub fn restore(&mut self, state: &ElementState) {
        self.classes = state.classes.clone();
        self.attrs = state.attrs.clone();
        self.styles = state.styles.clone();
        self.text = state.text.clone();
        self.disabled = state.disabled;
        self.hidden = state.hidden;
    }
}

/// Snapshot of an element and its descendants.
#[derive(Debug, Clone)]
pub struct SubtreeState(Vec<(NodeId, ElementState)>);

/// In-memory page.
#[derive(Debug)]
pub struct Document {
    nodes: HashMap<NodeId, Element>,
    next_id: u64,
    body: NodeId,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    /// Create an empty document with a `<body>`.
    pub fn new() -> Self {
        let body = NodeId(0);
        let mut nodes = HashMap::new();
        nodes.insert(body, Element::new("body"));
        Self {
            nodes,
            next_id: 1,
            body,
        }
    }

    /// Wrap into a [`SharedDocument`].
    pub fn shared(self) -> SharedDocument {
        Arc::new(Mutex::new(self))
    }

    /// The `<body>` node.
    pub fn body(&self) -> NodeId {
        self.body
    }

    /// Create a detached element.
    pub fn create(&mut self, tag: &str) -> NodeId {
        let id = NodeId(self.next_id);
        self.next_id += 1;
        self.nodes.insert(id, Element::new(tag));
        id
    }

    /// Append `child` to `parent`, moving it if already attached elsewhere.
    pub fn append(&mut self, parent: NodeId, child: NodeId) -> bool {
        if parent == child || !self.contains(parent) || !self.contains(child) {
            return false;
        }
        if self.ancestors(parent).contains(&child) {
            return false;
        }
        self.detach(child);
        if let Some(el) = self.nodes.get_mut(&child) {
            el.parent = Some(parent);
        }
        if let Some(el) = self.nodes.get_mut(&parent) {
            el.children.push(child);
        }
        true
    }

    fn detach(&mut self, node: NodeId) {
        let parent = self.nodes.get_mut(&node).and_then(|el| el.parent.take());
        if let Some(parent) = parent
            && let Some(el) = self.nodes.get_mut(&parent)
        {
            el.children.retain(|c| *c != node);
        }
    }

    /// Remove a node and its subtree. The body cannot be removed.
    pub fn remove(&mut self, node: NodeId) -> bool {
        if node == self.body || !self.contains(node) {
            return false;
        }
        self.detach(node);
        let mut stack = vec![node];
        while let Some(id) = stack.pop() {
            if let Some(el) = self.nodes.remove(&id) {
                stack.extend(el.children);
            }
        }
        true
    }

    /// Whether the node still exists.
    pub fn contains(&self, node: NodeId) -> bool {
        self.nodes.contains_key(&node)
    }

    /// Whether the node is reachable from the body.
    pub fn is_attached(&self, node: NodeId) -> bool {
        node == self.body || self.ancestors(node).contains(&self.body)
    }

    /// Borrow an element.
    pub fn get(&self, node: NodeId) -> Option<&Element> {
        self.nodes.get(&node)
    }

    /// Mutably borrow an element.
    pub fn get_mut(&mut self, node: NodeId) -> Option<&mut Element> {
        self.nodes.get_mut(&node)
    }

    /// Ancestors from parent up to the root.
    pub fn ancestors(&self, node: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut current = self.get(node).and_then(Element::parent);
        while let Some(id) = current {
            out.push(id);
            current = self.get(id).and_then(Element::parent);
        }
        out
    }

    /// Descendants of `node` in document order, excluding `node`.
    pub fn descendants(&self, node: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = match self.get(node) {
            Some(el) => el.children.iter().rev().copied().collect(),
            None => return out,
        };
        while let Some(id) = stack.pop() {
            out.push(id);
            if let Some(el) = self.get(id) {
                stack.extend(el.children.iter().rev().copied());
            }
        }
        out
    }

    /// First attached element whose `id` attribute matches.
    pub fn by_id(&self, id: &str) -> Option<NodeId> {
        self.find_in(self.body, |el| el.id() == Some(id))
    }

    /// Mutably borrow the first attached element with the given `id`.
    pub fn by_id_mut(&mut self, id: &str) -> Option<&mut Element> {
        let node = self.by_id(id)?;
        self.get_mut(node)
    }

    /// Attached elements carrying `class`, in document order.
    pub fn by_class(&self, class: &str) -> Vec<NodeId> {
        self.filter_in(self.body, |el| el.has_class(class))
    }

    /// Attached elements with the given tag, in document order.
    pub fn by_tag(&self, tag: &str) -> Vec<NodeId> {
        self.filter_in(self.body, |el| el.tag == tag)
    }

    /// First descendant of `root` matching `pred`.
    pub fn find_in(&self, root: NodeId, pred: impl Fn(&Element) -> bool) -> Option<NodeId> {
        self.descendants(root)
            .into_iter()
            .find(|id| self.get(*id).is_some_and(&pred))
    }

    /// All descendants of `root` matching `pred`.
    pub fn filter_in(&self, root: NodeId, pred: impl Fn(&Element) -> bool) -> Vec<NodeId> {
        self.descendants(root)
            .into_iter()
            .filter(|id| self.get(*id).is_some_and(&pred))
            .collect()
    }

    /// Nearest node (self included) carrying `class`.
    pub fn closest(&self, node: NodeId, class: &str) -> Option<NodeId> {
        if self.get(node)?.has_class(class) {
            return Some(node);
        }
        self.ancestors(node)
            .into_iter()
            .find(|id| self.get(*id).is_some_and(|el| el.has_class(class)))
    }

    /// Concatenated text of a node and its descendants.
    pub fn text_content(&self, node: NodeId) -> String {
        let mut out = self.get(node).map(|el| el.text.clone()).unwrap_or_default();
        for id in self.descendants(node) {
            if let Some(el) = self.get(id) {
                out.push_str(&el.text);
            }
        }
        out
    }

    /// Capture a node and its descendants.
    pub fn snapshot(&self, node: NodeId) -> SubtreeState {
        let mut ids = vec![node];
        ids.extend(self.descendants(node));
        SubtreeState(
            ids.into_iter()
                .filter_map(|id| self.get(id).map(|el| (id, el.snapshot())))
                .collect(),
        )
    }

    /// Restore a captured subtree; nodes removed since are skipped.
    pub fn restore(&mut self, state: &SubtreeState) {
        for (id, el_state) in &state.0 {
            if let Some(el) = self.get_mut(*id) {
                el.restore(el_state);
            }
        }
    }

    /// Serialize a node to HTML with all text and attributes escaped.
    pub fn render(&self, node: NodeId) -> String {
        let mut out = String::new();
        self.render_into(node, &mut out);
        out
    }

    fn render_into(&self, node: NodeId, out: &mut String) {
        let Some(el) = self.get(node) else {
            return;
        };
        out.push('<');
        out.push_str(&el.tag);
        for (name, value) in &el.attrs {
            out.push_str(&format!(" {}=\"{}\"", name, escape_html(value)));
        }
        if !el.classes.is_empty() {
            out.push_str(&format!(" class=\"{}\"", escape_html(&el.classes.join(" "))));
        }
        if !el.styles.is_empty() {
            let style: Vec<String> = el
                .styles
                .iter()
                .map(|(k, v)| format!("{}: {};", k, v))
                .collect();
            out.push_str(&format!(" style=\"{}\"", escape_html(&style.join(" "))));
        }
        if el.disabled {
            out.push_str(" disabled");
        }
        if el.hidden {
            out.push_str(" hidden");
        }
        out.push('>');
        if VOID_TAGS.contains(&el.tag.as_str()) {
            return;
        }
        out.push_str(&escape_html(&el.text));
        for child in &el.children {
            self.render_into(*child, out);
        }
        out.push_str("</");
        out.push_str(&el.tag);
        out.push('>');
    }
}

/// Neutralize markup characters in user-supplied text.
pub fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_html() {
        assert_eq!(
            escape_html(r#"<b onclick="x">Tom & 'Jerry'</b>"#),
            "&lt;b onclick=&quot;x&quot;&gt;Tom &amp; &#39;Jerry&#39;&lt;/b&gt;"
        );
    }

    #[test]
    fn test_remove_subtree() {
        let mut doc = Document::new();
        let list = doc.create("ul");
        let item = doc.create("li");
        doc.append(doc.body(), list);
        doc.append(list, item);

        assert!(doc.remove(list));
        assert!(!doc.contains(item));
        assert!(doc.get(doc.body()).unwrap().children().is_empty());
        assert!(!doc.remove(doc.body()));
    }

    #[test]
    fn test_append_rejects_cycles() {
        let mut doc = Document::new();
        let outer = doc.create("div");
        let inner = doc.create("div");
        doc.append(doc.body(), outer);
        doc.append(outer, inner);

        assert!(!doc.append(inner, outer));
        assert_eq!(doc.ancestors(inner), vec![outer, doc.body()]);
    }

    #[test]
    fn test_queries_follow_document_order() {
        let mut doc = Document::new();
        let body = doc.body();
        let a = ElementBuilder::new("div")
            .class("card")
            .child(ElementBuilder::new("span").class("card").id("nested"))
            .append_to(&mut doc, body);
        let b = ElementBuilder::new("div").class("card").append_to(&mut doc, body);

        let nested = doc.by_id("nested").unwrap();
        assert_eq!(doc.by_class("card"), vec![a, nested, b]);
        assert_eq!(doc.closest(nested, "card"), Some(nested));
        assert_eq!(doc.closest(b, "missing"), None);
    }

    #[test]
    fn test_snapshot_restores_subtree() {
        let mut doc = Document::new();
        let body = doc.body();
        let button = ElementBuilder::new("button")
            .class("btn")
            .text("Save")
            .child(ElementBuilder::new("i").class("far"))
            .append_to(&mut doc, body);
        let icon = doc.get(button).unwrap().children()[0];
        let saved = doc.snapshot(button);

        let el = doc.get_mut(button).unwrap();
        el.set_disabled(true);
        el.set_text("...");
        doc.get_mut(icon).unwrap().add_class("fa-spin");

        doc.restore(&saved);
        assert!(!doc.get(button).unwrap().is_disabled());
        assert_eq!(doc.get(button).unwrap().text(), "Save");
        assert!(!doc.get(icon).unwrap().has_class("fa-spin"));
    }

    #[test]
    fn test_render_escapes_text_and_attributes() {
        let mut doc = Document::new();
        let body = doc.body();
        let node = ElementBuilder::new("div")
            .attr("title", "a\"b")
            .text("<script>")
            .child(ElementBuilder::new("img").attr("src", "x.png"))
            .append_to(&mut doc, body);

        assert_eq!(
            doc.render(node),
            "<div title=\"a&quot;b\">&lt;script&gt;<img src=\"x.png\"></div>"
        );
    }
}
