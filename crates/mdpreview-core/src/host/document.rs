use std::collections::BTreeMap;
use std::collections::HashMap;

use ratatui::layout::Rect;

use crate::render::rect_contains;

/// Stable handle to a node in a [`Document`].
///
/// Ids are never reused, so a handle to a removed node stays dangling forever and every
/// operation on it is a no-op.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u64);

#[derive(Clone, Debug)]
struct Node {
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    rect: Rect,
    attributes: BTreeMap<String, String>,
}

/// A retained tree of on-screen elements with string attributes.
///
/// Components mount the regions they paint as nodes so that window-level listeners can resolve a
/// pointer position to an element (and walk to its parent or siblings) without holding a
/// reference to the component that produced it.
#[derive(Clone, Debug)]
pub struct Document {
    nodes: HashMap<NodeId, Node>,
    root: NodeId,
    next_id: u64,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    pub fn new() -> Self {
        let root = NodeId(0);
        let mut nodes = HashMap::new();
        nodes.insert(
            root,
            Node {
                parent: None,
                children: Vec::new(),
                rect: Rect::default(),
                attributes: BTreeMap::new(),
            },
        );
        Self {
            nodes,
            root,
            next_id: 1,
        }
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Number of live nodes, including the root.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.len() <= 1
    }

    pub fn contains(&self, node: NodeId) -> bool {
        self.nodes.contains_key(&node)
    }

    /// Appends a new element under `parent`. Returns `None` if `parent` has been removed.
    pub fn create_element(&mut self, parent: NodeId, rect: Rect) -> Option<NodeId> {
        let id = NodeId(self.next_id);
        let parent_node = self.nodes.get_mut(&parent)?;
        parent_node.children.push(id);
        self.next_id += 1;
        self.nodes.insert(
            id,
            Node {
                parent: Some(parent),
                children: Vec::new(),
                rect,
                attributes: BTreeMap::new(),
            },
        );
        Some(id)
    }

    pub fn set_attribute(
        &mut self,
        node: NodeId,
        name: impl Into<String>,
        value: impl Into<String>,
    ) -> bool {
        let Some(n) = self.nodes.get_mut(&node) else {
            return false;
        };
        n.attributes.insert(name.into(), value.into());
        true
    }

    pub fn attribute(&self, node: NodeId, name: &str) -> Option<&str> {
        self.nodes
            .get(&node)?
            .attributes
            .get(name)
            .map(String::as_str)
    }

    pub fn remove_attribute(&mut self, node: NodeId, name: &str) -> Option<String> {
        self.nodes.get_mut(&node)?.attributes.remove(name)
    }

    pub fn rect(&self, node: NodeId) -> Option<Rect> {
        self.nodes.get(&node).map(|n| n.rect)
    }

    pub fn set_rect(&mut self, node: NodeId, rect: Rect) -> bool {
        let Some(n) = self.nodes.get_mut(&node) else {
            return false;
        };
        n.rect = rect;
        true
    }

    /// Parent element, or `None` for the root and for removed nodes.
    pub fn parent_element(&self, node: NodeId) -> Option<NodeId> {
        self.nodes.get(&node)?.parent
    }

    pub fn previous_element_sibling(&self, node: NodeId) -> Option<NodeId> {
        let parent = self.parent_element(node)?;
        let siblings = &self.nodes.get(&parent)?.children;
        let idx = siblings.iter().position(|&c| c == node)?;
        idx.checked_sub(1).map(|i| siblings[i])
    }

    pub fn children(&self, node: NodeId) -> &[NodeId] {
        self.nodes
            .get(&node)
            .map(|n| n.children.as_slice())
            .unwrap_or(&[])
    }

    /// Removes `node` and its whole subtree. The root itself cannot be removed.
    pub fn remove(&mut self, node: NodeId) {
        if node == self.root {
            return;
        }
        let Some(parent) = self.parent_element(node) else {
            return;
        };
        if let Some(p) = self.nodes.get_mut(&parent) {
            p.children.retain(|&c| c != node);
        }
        let mut stack = vec![node];
        while let Some(id) = stack.pop() {
            if let Some(n) = self.nodes.remove(&id) {
                stack.extend(n.children);
            }
        }
    }

    /// Removes every descendant of `node`, keeping `node` itself.
    pub fn clear_children(&mut self, node: NodeId) {
        let children = self.children(node).to_vec();
        for child in children {
            self.remove(child);
        }
    }

    /// Returns the deepest element whose rect contains `(x, y)`.
    ///
    /// Later siblings are painted on top of earlier ones, so they win ties.
    pub fn hit_test(&self, x: u16, y: u16) -> Option<NodeId> {
        self.hit_test_in(self.root, x, y)
    }

    fn hit_test_in(&self, node: NodeId, x: u16, y: u16) -> Option<NodeId> {
        for &child in self.children(node).iter().rev() {
            let Some(rect) = self.rect(child) else {
                continue;
            };
            if !rect_contains(rect, x, y) {
                continue;
            }
            return self.hit_test_in(child, x, y).or(Some(child));
        }
        None
    }

    /// All nodes (in tree order) whose `name` attribute equals `value`.
    pub fn find_by_attribute(&self, name: &str, value: &str) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = vec![self.root];
        while let Some(id) = stack.pop() {
            if self.attribute(id, name) == Some(value) {
                out.push(id);
            }
            stack.extend(self.children(id).iter().rev().copied());
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn siblings_and_parents() {
        let mut doc = Document::new();
        let root = doc.root();
        let block = doc.create_element(root, Rect::new(0, 0, 10, 3)).unwrap();
        let body = doc.create_element(block, Rect::new(0, 1, 10, 2)).unwrap();
        let icon = doc.create_element(block, Rect::new(8, 0, 2, 1)).unwrap();

        assert_eq!(doc.parent_element(icon), Some(block));
        assert_eq!(doc.previous_element_sibling(icon), Some(body));
        assert_eq!(doc.previous_element_sibling(body), None);
        assert_eq!(doc.parent_element(root), None);
    }

    #[test]
    fn hit_test_prefers_deepest_then_topmost() {
        let mut doc = Document::new();
        let root = doc.root();
        let block = doc.create_element(root, Rect::new(0, 0, 10, 3)).unwrap();
        let icon = doc.create_element(block, Rect::new(8, 0, 2, 1)).unwrap();
        let overlay = doc.create_element(root, Rect::new(5, 2, 5, 1)).unwrap();

        assert_eq!(doc.hit_test(9, 0), Some(icon));
        assert_eq!(doc.hit_test(1, 1), Some(block));
        assert_eq!(doc.hit_test(6, 2), Some(overlay));
        assert_eq!(doc.hit_test(20, 20), None);
    }

    #[test]
    fn removed_nodes_are_inert() {
        let mut doc = Document::new();
        let root = doc.root();
        let block = doc.create_element(root, Rect::new(0, 0, 4, 1)).unwrap();
        let child = doc.create_element(block, Rect::new(0, 0, 1, 1)).unwrap();
        doc.remove(block);

        assert!(!doc.contains(child));
        assert!(!doc.set_attribute(child, "data-copied", "false"));
        assert_eq!(doc.attribute(child, "data-copied"), None);
        assert!(doc.create_element(block, Rect::default()).is_none());
        assert!(doc.is_empty());
    }

    #[test]
    fn find_by_attribute_in_tree_order() {
        let mut doc = Document::new();
        let root = doc.root();
        let a = doc.create_element(root, Rect::default()).unwrap();
        let b = doc.create_element(a, Rect::default()).unwrap();
        let c = doc.create_element(root, Rect::default()).unwrap();
        for id in [a, b, c] {
            doc.set_attribute(id, "class", "x");
        }
        assert_eq!(doc.find_by_attribute("class", "x"), vec![a, b, c]);
    }
}
