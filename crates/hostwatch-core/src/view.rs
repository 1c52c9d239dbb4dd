//! View handle interface and the in-memory tree that implements it.
//!
//! Engines never touch the screen directly. They create, locate, patch and
//! remove nodes addressed by string ids through [`ViewHandle`]; the terminal
//! renderer walks the resulting [`ViewTree`] and headless tests inspect it.

use std::collections::HashMap;
use std::fmt;

use crate::color::Rgb;

/// Id of the node every [`ViewTree`] starts with.
pub const ROOT: &str = "root";

/// What a node represents; decides how the renderer draws it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    /// Generic parent with no visual of its own.
    Container,
    /// Bordered host card.
    Card,
    /// A single line of text.
    Text,
    /// Horizontal usage bar; width is a percent.
    Bar,
    /// Horizontal strip of GPU boxes.
    Row,
    /// One GPU device.
    GpuBox,
    /// Instruction strip shown while editing the layout.
    Banner,
    /// Dimmed stand-in at a prospective drop position.
    Placeholder,
}

/// A single patchable attribute of a node.
#[derive(Debug, Clone, PartialEq)]
pub enum Field {
    Text(String),
    Width(f64),
    Background(Rgb),
    Foreground(Rgb),
    Border(Rgb),
    Hidden(bool),
    /// New child order. Every id must already be a child of the node.
    Children(Vec<String>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViewError {
    /// An expected node id is not in the view.
    MissingElement(String),
    /// `create` was asked for an id that already exists.
    DuplicateId(String),
}

impl fmt::Display for ViewError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ViewError::MissingElement(id) => write!(f, "view element '{}' not found", id),
            ViewError::DuplicateId(id) => write!(f, "view element '{}' already exists", id),
        }
    }
}

impl std::error::Error for ViewError {}

/// Capability set engines need from a rendering surface.
pub trait ViewHandle {
    /// Append a new node of `kind` as the last child of `parent`.
    fn create(&mut self, parent: &str, id: &str, kind: NodeKind) -> Result<(), ViewError>;

    /// Look a node up by id.
    fn locate(&self, id: &str) -> Result<&Node, ViewError>;

    /// Update one attribute of an existing node.
    fn patch(&mut self, id: &str, field: Field) -> Result<(), ViewError>;

    /// Remove a node together with its subtree.
    fn remove(&mut self, id: &str) -> Result<(), ViewError>;

    fn exists(&self, id: &str) -> bool {
        self.locate(id).is_ok()
    }
}

/// One element of the view tree.
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub id: String,
    pub kind: NodeKind,
    pub parent: Option<String>,
    pub children: Vec<String>,
    pub text: String,
    pub width: Option<f64>,
    pub background: Option<Rgb>,
    pub foreground: Option<Rgb>,
    pub border: Option<Rgb>,
    pub hidden: bool,
}

impl Node {
    fn new(id: &str, kind: NodeKind, parent: Option<&str>) -> Self {
        Self {
            id: id.to_string(),
            kind,
            parent: parent.map(str::to_string),
            children: Vec::new(),
            text: String::new(),
            width: None,
            background: None,
            foreground: None,
            border: None,
            hidden: false,
        }
    }
}

/// Flat id → node map with parent/child links.
#[derive(Debug, Clone)]
pub struct ViewTree {
    nodes: HashMap<String, Node>,
}

impl Default for ViewTree {
    fn default() -> Self {
        Self::new()
    }
}

impl ViewTree {
    pub fn new() -> Self {
        let mut nodes = HashMap::new();
        nodes.insert(ROOT.to_string(), Node::new(ROOT, NodeKind::Container, None));
        Self { nodes }
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        // the root is always present
        false
    }

    /// Text of a node, or `None` when absent.
    pub fn text(&self, id: &str) -> Option<&str> {
        self.nodes.get(id).map(|n| n.text.as_str())
    }

    /// Child ids of a node in display order (empty when absent).
    pub fn children(&self, id: &str) -> &[String] {
        self.nodes
            .get(id)
            .map(|n| n.children.as_slice())
            .unwrap_or(&[])
    }

    /// Children that are not hidden.
    pub fn visible_children(&self, id: &str) -> Vec<&Node> {
        self.children(id)
            .iter()
            .filter_map(|c| self.nodes.get(c))
            .filter(|n| !n.hidden)
            .collect()
    }

    /// Number of direct children of `id` with the given kind.
    pub fn count_children(&self, id: &str, kind: NodeKind) -> usize {
        self.children(id)
            .iter()
            .filter_map(|c| self.nodes.get(c))
            .filter(|n| n.kind == kind)
            .count()
    }

    /// Validate a requested child order. Children left out keep their
    /// relative position after the listed ones; repeated ids count once.
    fn reordered(&self, id: &str, order: Vec<String>) -> Result<Vec<String>, ViewError> {
        let current = self.locate(id)?.children.clone();
        let mut next: Vec<String> = Vec::with_capacity(current.len());
        for c in order {
            if !current.contains(&c) {
                return Err(ViewError::MissingElement(c));
            }
            if !next.contains(&c) {
                next.push(c);
            }
        }
        for c in current {
            if !next.contains(&c) {
                next.push(c);
            }
        }
        Ok(next)
    }

    fn collect_subtree(&self, id: &str, out: &mut Vec<String>) {
        out.push(id.to_string());
        for child in self.children(id) {
            self.collect_subtree(child, out);
        }
    }
}

impl ViewHandle for ViewTree {
    fn create(&mut self, parent: &str, id: &str, kind: NodeKind) -> Result<(), ViewError> {
        if self.nodes.contains_key(id) {
            return Err(ViewError::DuplicateId(id.to_string()));
        }
        let p = self
            .nodes
            .get_mut(parent)
            .ok_or_else(|| ViewError::MissingElement(parent.to_string()))?;
        p.children.push(id.to_string());
        self.nodes
            .insert(id.to_string(), Node::new(id, kind, Some(parent)));
        Ok(())
    }

    fn locate(&self, id: &str) -> Result<&Node, ViewError> {
        self.nodes
            .get(id)
            .ok_or_else(|| ViewError::MissingElement(id.to_string()))
    }

    fn patch(&mut self, id: &str, field: Field) -> Result<(), ViewError> {
        let field = match field {
            Field::Children(order) => Field::Children(self.reordered(id, order)?),
            other => other,
        };
        let node = self
            .nodes
            .get_mut(id)
            .ok_or_else(|| ViewError::MissingElement(id.to_string()))?;
        match field {
            Field::Text(t) => node.text = t,
            Field::Width(w) => node.width = Some(w),
            Field::Background(c) => node.background = Some(c),
            Field::Foreground(c) => node.foreground = Some(c),
            Field::Border(c) => node.border = Some(c),
            Field::Hidden(h) => node.hidden = h,
            Field::Children(c) => node.children = c,
        }
        Ok(())
    }

    fn remove(&mut self, id: &str) -> Result<(), ViewError> {
        if id == ROOT {
            return Err(ViewError::MissingElement(id.to_string()));
        }
        let parent = self.locate(id)?.parent.clone();
        let mut doomed = Vec::new();
        self.collect_subtree(id, &mut doomed);
        for d in &doomed {
            self.nodes.remove(d);
        }
        if let Some(p) = parent.and_then(|p| self.nodes.get_mut(&p)) {
            p.children.retain(|c| c != id);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> ViewTree {
        let mut v = ViewTree::new();
        v.create(ROOT, "cards", NodeKind::Container).unwrap();
        v.create("cards", "a", NodeKind::Card).unwrap();
        v.create("a", "a-title", NodeKind::Text).unwrap();
        v.create("cards", "b", NodeKind::Card).unwrap();
        v.create("cards", "c", NodeKind::Card).unwrap();
        v
    }

    #[test]
    fn test_create_and_locate() {
        let v = sample();
        assert_eq!(v.len(), 6);
        assert_eq!(v.children("cards"), ["a", "b", "c"]);
        assert_eq!(v.locate("a-title").unwrap().parent.as_deref(), Some("a"));
        assert_eq!(
            v.locate("nope").unwrap_err(),
            ViewError::MissingElement("nope".to_string())
        );
    }

    #[test]
    fn test_create_errors() {
        let mut v = sample();
        assert_eq!(
            v.create("ghost", "x", NodeKind::Text),
            Err(ViewError::MissingElement("ghost".to_string()))
        );
        assert_eq!(
            v.create("cards", "a", NodeKind::Card),
            Err(ViewError::DuplicateId("a".to_string()))
        );
    }

    #[test]
    fn test_patch_fields() {
        let mut v = sample();
        v.patch("a-title", Field::Text("gpu01".into())).unwrap();
        v.patch("a", Field::Border(Rgb::ALERT)).unwrap();
        v.patch("b", Field::Hidden(true)).unwrap();
        assert_eq!(v.text("a-title"), Some("gpu01"));
        assert_eq!(v.locate("a").unwrap().border, Some(Rgb::ALERT));
        let visible: Vec<&str> = v
            .visible_children("cards")
            .iter()
            .map(|n| n.id.as_str())
            .collect();
        assert_eq!(visible, ["a", "c"]);
        assert!(v.patch("zzz", Field::Width(3.0)).is_err());
    }

    #[test]
    fn test_reorder_children() {
        let mut v = sample();
        v.patch("cards", Field::Children(vec!["c".into(), "a".into()]))
            .unwrap();
        assert_eq!(v.children("cards"), ["c", "a", "b"]);
        assert_eq!(
            v.patch("cards", Field::Children(vec!["a-title".into()])),
            Err(ViewError::MissingElement("a-title".to_string()))
        );
    }

    #[test]
    fn test_remove_subtree() {
        let mut v = sample();
        v.remove("a").unwrap();
        assert!(!v.exists("a"));
        assert!(!v.exists("a-title"));
        assert_eq!(v.children("cards"), ["b", "c"]);
        assert!(v.remove("a").is_err());
        assert!(v.remove(ROOT).is_err());
    }
}
