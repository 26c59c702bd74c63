//! In-process document model the pipeline operates on.
//!
//! Nodes live in an arena and are addressed by `NodeId`. Ids are stable
//! for the life of the document and never reused; a removed node simply
//! stops being `contains`-reachable. Structural additions are broadcast as
//! `DomEvent`s to explicit subscriptions, which is the mutation-observer
//! seam.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tokio::sync::mpsc;
use tracing::trace;

pub type SharedDocument = Arc<Mutex<Document>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(transparent)]
pub struct NodeId(usize);

impl NodeId {
    pub fn index(self) -> usize {
        self.0
    }
}

#[derive(Debug, Clone)]
pub enum NodeData {
    /// Synthetic document root; serializes to nothing.
    Root,
    Element {
        tag: String,
        attributes: HashMap<String, String>,
    },
    Text(String),
}

#[derive(Debug, Clone)]
struct Node {
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    data: NodeData,
}

/// A structural mutation delivered to subscribers.
#[derive(Debug, Clone, Copy)]
pub enum DomEvent {
    ChildAdded(NodeId),
}

/// Receiving half of a mutation subscription. Dropping the receiver alone
/// does not detach it; pass `id()` to [`Document::unsubscribe`].
pub struct Subscription {
    id: usize,
    pub events: mpsc::UnboundedReceiver<DomEvent>,
}

impl Subscription {
    pub fn id(&self) -> usize {
        self.id
    }
}

pub struct Document {
    nodes: Vec<Node>,
    root: NodeId,
    subscribers: Vec<(usize, mpsc::UnboundedSender<DomEvent>)>,
    next_subscriber: usize,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    pub fn new() -> Self {
        Document {
            nodes: vec![Node {
                parent: None,
                children: Vec::new(),
                data: NodeData::Root,
            }],
            root: NodeId(0),
            subscribers: Vec::new(),
            next_subscriber: 0,
        }
    }

    /// Parse a full page snapshot. Notification is not emitted for the
    /// initial parse; observers that attach later perform their own sweep.
    pub fn parse(html: &str) -> Self {
        let mut doc = Document::new();
        let parsed = scraper::Html::parse_document(html);
        let root = doc.root;
        doc.convert(root, *parsed.root_element());
        doc
    }

    pub fn into_shared(self) -> SharedDocument {
        Arc::new(Mutex::new(self))
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    /// The `body` element, when the parsed page has one.
    pub fn body(&self) -> Option<NodeId> {
        self.descendants(self.root)
            .into_iter()
            .find(|id| self.tag(*id) == Some("body"))
    }

    /// Resolve a raw arena index (as carried over the session API) back to
    /// a node id.
    pub fn node_at(&self, index: usize) -> Option<NodeId> {
        (index < self.nodes.len()).then_some(NodeId(index))
    }

    fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.0]
    }

    fn node_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.nodes[id.0]
    }

    pub fn data(&self, id: NodeId) -> &NodeData {
        &self.node(id).data
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).parent
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.node(id).children
    }

    pub fn is_element(&self, id: NodeId) -> bool {
        matches!(self.node(id).data, NodeData::Element { .. })
    }

    pub fn tag(&self, id: NodeId) -> Option<&str> {
        match &self.node(id).data {
            NodeData::Element { tag, .. } => Some(tag),
            _ => None,
        }
    }

    pub fn attr(&self, id: NodeId, name: &str) -> Option<&str> {
        match &self.node(id).data {
            NodeData::Element { attributes, .. } => attributes.get(name).map(String::as_str),
            _ => None,
        }
    }

    pub fn set_attr(&mut self, id: NodeId, name: &str, value: &str) {
        if let NodeData::Element { attributes, .. } = &mut self.node_mut(id).data {
            attributes.insert(name.to_string(), value.to_string());
        }
    }

    pub fn classes(&self, id: NodeId) -> Vec<String> {
        self.attr(id, "class")
            .map(|c| c.split_whitespace().map(String::from).collect())
            .unwrap_or_default()
    }

    pub fn has_class(&self, id: NodeId, class: &str) -> bool {
        self.attr(id, "class")
            .map(|c| c.split_whitespace().any(|item| item == class))
            .unwrap_or(false)
    }

    pub fn add_class(&mut self, id: NodeId, class: &str) {
        if self.has_class(id, class) {
            return;
        }
        let mut value = self.attr(id, "class").unwrap_or("").to_string();
        if !value.is_empty() {
            value.push(' ');
        }
        value.push_str(class);
        self.set_attr(id, "class", &value);
    }

    pub fn remove_class(&mut self, id: NodeId, class: &str) {
        let Some(current) = self.attr(id, "class") else {
            return;
        };
        let value = current
            .split_whitespace()
            .filter(|item| *item != class)
            .collect::<Vec<_>>()
            .join(" ");
        self.set_attr(id, "class", &value);
    }

    /// True while the node is still attached under the document root.
    pub fn contains(&self, id: NodeId) -> bool {
        if id.0 >= self.nodes.len() {
            return false;
        }
        let mut current = id;
        while let Some(parent) = self.node(current).parent {
            current = parent;
        }
        current == self.root
    }

    /// Pre-order traversal of the subtree below `id` (excluding `id` itself).
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = self.node(id).children.iter().rev().copied().collect();
        while let Some(next) = stack.pop() {
            out.push(next);
            stack.extend(self.node(next).children.iter().rev().copied());
        }
        out
    }

    pub fn ancestors(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut current = id;
        while let Some(parent) = self.node(current).parent {
            out.push(parent);
            current = parent;
        }
        out
    }

    /// Concatenated text of every text node under `id`, `id` included.
    pub fn text_content(&self, id: NodeId) -> String {
        let mut out = String::new();
        self.collect_text(id, &mut out);
        out
    }

    fn collect_text(&self, id: NodeId, out: &mut String) {
        match &self.node(id).data {
            NodeData::Text(text) => out.push_str(text),
            _ => {
                for child in &self.node(id).children {
                    self.collect_text(*child, out);
                }
            }
        }
    }

    // ---- mutation ----

    fn alloc(&mut self, parent: Option<NodeId>, data: NodeData) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node {
            parent,
            children: Vec::new(),
            data,
        });
        id
    }

    pub fn create_text(&mut self, text: &str) -> NodeId {
        self.alloc(None, NodeData::Text(text.to_string()))
    }

    fn attach(&mut self, parent: NodeId, child: NodeId) {
        self.node_mut(child).parent = Some(parent);
        self.node_mut(parent).children.push(child);
    }

    fn attach_at(&mut self, parent: NodeId, index: usize, child: NodeId) {
        self.node_mut(child).parent = Some(parent);
        self.node_mut(parent).children.insert(index, child);
    }

    /// Detach `id` from its parent. The arena entry stays put; the id is
    /// never reused.
    pub fn remove(&mut self, id: NodeId) {
        let Some(parent) = self.node(id).parent else {
            return;
        };
        self.node_mut(parent).children.retain(|child| *child != id);
        self.node_mut(id).parent = None;
    }

    /// Parse `html` as a fragment and append its top-level nodes under
    /// `parent`, notifying subscribers of each addition.
    pub fn append_html(&mut self, parent: NodeId, html: &str) -> Vec<NodeId> {
        let added = self.parse_fragment_under(parent, html, None);
        for id in &added {
            self.notify(DomEvent::ChildAdded(*id));
        }
        added
    }

    /// Parse `html` as a fragment and insert its top-level nodes as
    /// following siblings of `reference`.
    pub fn insert_html_after(&mut self, reference: NodeId, html: &str) -> Vec<NodeId> {
        let Some(parent) = self.node(reference).parent else {
            return Vec::new();
        };
        let position = self
            .node(parent)
            .children
            .iter()
            .position(|child| *child == reference)
            .map(|index| index + 1);
        let added = self.parse_fragment_under(parent, html, position);
        for id in &added {
            self.notify(DomEvent::ChildAdded(*id));
        }
        added
    }

    /// Replace the children of `id` with the parsed fragment, notifying
    /// subscribers of the new children. The detached originals keep their
    /// ids and content.
    pub fn set_inner_html(&mut self, id: NodeId, html: &str) -> Vec<NodeId> {
        let old = self.node(id).children.clone();
        for child in old {
            self.node_mut(child).parent = None;
        }
        self.node_mut(id).children.clear();
        let added = self.parse_fragment_under(id, html, None);
        for child in &added {
            self.notify(DomEvent::ChildAdded(*child));
        }
        added
    }

    /// Replace the children of `id` with a single text node. No escaping
    /// round trip, no fragment parse.
    pub fn set_text(&mut self, id: NodeId, text: &str) {
        let old = self.node(id).children.clone();
        for child in old {
            self.node_mut(child).parent = None;
        }
        self.node_mut(id).children.clear();
        let child = self.alloc(None, NodeData::Text(text.to_string()));
        self.attach(id, child);
    }

    fn parse_fragment_under(
        &mut self,
        parent: NodeId,
        html: &str,
        position: Option<usize>,
    ) -> Vec<NodeId> {
        let parsed = scraper::Html::parse_fragment(html);
        // Fragments come back wrapped in a synthetic `html` element.
        let wrapper = *parsed.root_element();
        let mut added = Vec::new();
        for child in wrapper.children() {
            if let Some(id) = self.convert(parent, child) {
                added.push(id);
            }
        }
        if let Some(mut index) = position {
            // Re-home the freshly appended nodes at the requested slot.
            for id in &added {
                self.node_mut(parent).children.retain(|child| child != id);
            }
            for id in &added {
                self.attach_at(parent, index, *id);
                index += 1;
            }
        }
        trace!(count = added.len(), "parsed fragment");
        added
    }

    fn convert(
        &mut self,
        parent: NodeId,
        node: ego_tree::NodeRef<'_, scraper::Node>,
    ) -> Option<NodeId> {
        match node.value() {
            scraper::Node::Element(element) => {
                let mut attributes = HashMap::new();
                for (name, value) in element.attrs() {
                    attributes.insert(name.to_string(), value.to_string());
                }
                let id = self.alloc(
                    None,
                    NodeData::Element {
                        tag: element.name().to_string(),
                        attributes,
                    },
                );
                self.attach(parent, id);
                for child in node.children() {
                    self.convert(id, child);
                }
                Some(id)
            }
            scraper::Node::Text(text) => {
                let id = self.alloc(None, NodeData::Text(text.to_string()));
                self.attach(parent, id);
                Some(id)
            }
            // Doctype, comments and processing instructions carry nothing
            // the pipeline reads.
            _ => None,
        }
    }

    // ---- serialization ----

    pub fn inner_html(&self, id: NodeId) -> String {
        let mut out = String::new();
        for child in &self.node(id).children {
            self.serialize(*child, &mut out);
        }
        out
    }

    pub fn outer_html(&self, id: NodeId) -> String {
        let mut out = String::new();
        self.serialize(id, &mut out);
        out
    }

    /// Serialized form of the whole document.
    pub fn html(&self) -> String {
        self.inner_html(self.root)
    }

    fn serialize(&self, id: NodeId, out: &mut String) {
        match &self.node(id).data {
            NodeData::Root => {
                for child in &self.node(id).children {
                    self.serialize(*child, out);
                }
            }
            NodeData::Text(text) => out.push_str(&escape_text(text)),
            NodeData::Element { tag, attributes } => {
                out.push('<');
                out.push_str(tag);
                let mut names: Vec<&String> = attributes.keys().collect();
                names.sort();
                for name in names {
                    out.push(' ');
                    out.push_str(name);
                    out.push_str("=\"");
                    out.push_str(&escape_attr(&attributes[name]));
                    out.push('"');
                }
                out.push('>');
                if is_void_element(tag) {
                    return;
                }
                for child in &self.node(id).children {
                    self.serialize(*child, out);
                }
                out.push_str("</");
                out.push_str(tag);
                out.push('>');
            }
        }
    }

    // ---- subscriptions ----

    pub fn subscribe(&mut self) -> Subscription {
        let (tx, rx) = mpsc::unbounded_channel();
        let id = self.next_subscriber;
        self.next_subscriber += 1;
        self.subscribers.push((id, tx));
        Subscription { id, events: rx }
    }

    pub fn unsubscribe(&mut self, id: usize) {
        self.subscribers.retain(|(sub, _)| *sub != id);
    }

    fn notify(&mut self, event: DomEvent) {
        self.subscribers
            .retain(|(_, tx)| tx.send(event).is_ok());
    }
}

fn is_void_element(tag: &str) -> bool {
    matches!(
        tag,
        "area"
            | "base"
            | "br"
            | "col"
            | "embed"
            | "hr"
            | "img"
            | "input"
            | "link"
            | "meta"
            | "param"
            | "source"
            | "track"
            | "wbr"
    )
}

pub fn escape_text(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

fn escape_attr(value: &str) -> String {
    escape_text(value).replace('"', "&quot;")
}
