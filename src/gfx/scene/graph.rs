use cgmath::{Matrix4, SquareMatrix};

use super::node::{ModelNode, SceneNode};

/// Stable handle to a node in a [`SceneGraph`]
///
/// Handles carry a generation, so a handle to a removed node never aliases a
/// node that later reuses its slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId {
    index: u32,
    generation: u32,
}

struct Slot {
    generation: u32,
    entry: Option<Entry>,
}

struct Entry {
    node: SceneNode,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

/// Arena-backed scene hierarchy
#[derive(Default)]
pub struct SceneGraph {
    slots: Vec<Slot>,
    free: Vec<u32>,
    roots: Vec<NodeId>,
    len: usize,
}

impl SceneGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert `node` under `parent`, or as a root
    ///
    /// An unknown parent handle inserts the node as a root.
    pub fn add_node(&mut self, node: SceneNode, parent: Option<NodeId>) -> NodeId {
        let parent = parent.filter(|p| self.contains(*p));
        let entry = Entry {
            node,
            parent,
            children: Vec::new(),
        };

        let id = match self.free.pop() {
            Some(index) => {
                let slot = &mut self.slots[index as usize];
                slot.entry = Some(entry);
                NodeId {
                    index,
                    generation: slot.generation,
                }
            }
            None => {
                self.slots.push(Slot {
                    generation: 0,
                    entry: Some(entry),
                });
                NodeId {
                    index: (self.slots.len() - 1) as u32,
                    generation: 0,
                }
            }
        };

        let attached = match parent.and_then(|p| self.entry_mut(p)) {
            Some(parent_entry) => {
                parent_entry.children.push(id);
                true
            }
            None => false,
        };
        if !attached {
            self.roots.push(id);
        }
        self.len += 1;
        id
    }

    /// Absorb a detached model tree, returning the id of its root
    pub fn add_tree(&mut self, tree: &ModelNode, parent: Option<NodeId>) -> NodeId {
        let id = self.add_node(SceneNode::from_model(tree), parent);
        for child in &tree.children {
            self.add_tree(child, Some(id));
        }
        id
    }

    /// Remove a node and its whole subtree; returns `false` for stale handles
    pub fn remove(&mut self, id: NodeId) -> bool {
        let Some(entry) = self.take_entry(id) else {
            return false;
        };
        match entry.parent {
            Some(parent) => {
                if let Some(parent_entry) = self.entry_mut(parent) {
                    parent_entry.children.retain(|c| *c != id);
                }
            }
            None => self.roots.retain(|r| *r != id),
        }
        let mut pending = entry.children;
        while let Some(child) = pending.pop() {
            if let Some(child_entry) = self.take_entry(child) {
                pending.extend(child_entry.children);
            }
        }
        true
    }

    fn take_entry(&mut self, id: NodeId) -> Option<Entry> {
        let slot = self.slots.get_mut(id.index as usize)?;
        if slot.generation != id.generation {
            return None;
        }
        let entry = slot.entry.take()?;
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(id.index);
        self.len -= 1;
        Some(entry)
    }

    fn entry(&self, id: NodeId) -> Option<&Entry> {
        self.slots
            .get(id.index as usize)
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.entry.as_ref())
    }

    fn entry_mut(&mut self, id: NodeId) -> Option<&mut Entry> {
        self.slots
            .get_mut(id.index as usize)
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.entry.as_mut())
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.entry(id).is_some()
    }

    pub fn get(&self, id: NodeId) -> Option<&SceneNode> {
        self.entry(id).map(|e| &e.node)
    }

    pub fn get_mut(&mut self, id: NodeId) -> Option<&mut SceneNode> {
        self.entry_mut(id).map(|e| &mut e.node)
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.entry(id).and_then(|e| e.parent)
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.entry(id).map(|e| e.children.as_slice()).unwrap_or(&[])
    }

    pub fn roots(&self) -> &[NodeId] {
        &self.roots
    }

    /// First node with the given name, depth-first from the roots
    pub fn find_by_name(&self, name: &str) -> Option<NodeId> {
        let mut found = None;
        self.traverse(|id, node, _| {
            if found.is_none() && node.name == name {
                found = Some(id);
            }
        });
        found
    }

    /// Local-to-world matrix of a node
    pub fn world_matrix(&self, id: NodeId) -> Matrix4<f32> {
        let mut matrix = Matrix4::identity();
        let mut current = Some(id);
        while let Some(node_id) = current {
            let Some(entry) = self.entry(node_id) else {
                break;
            };
            matrix = entry.node.transform.matrix() * matrix;
            current = entry.parent;
        }
        matrix
    }

    /// Whether the node and every ancestor are visible
    pub fn is_visible(&self, id: NodeId) -> bool {
        let mut current = Some(id);
        while let Some(node_id) = current {
            match self.entry(node_id) {
                Some(entry) if entry.node.visible => current = entry.parent,
                _ => return false,
            }
        }
        true
    }

    /// Depth-first walk handing each node its world matrix
    pub fn traverse<F>(&self, mut visitor: F)
    where
        F: FnMut(NodeId, &SceneNode, &Matrix4<f32>),
    {
        let mut stack: Vec<(NodeId, Matrix4<f32>)> = self
            .roots
            .iter()
            .rev()
            .map(|id| (*id, Matrix4::identity()))
            .collect();

        while let Some((id, parent_world)) = stack.pop() {
            let Some(entry) = self.entry(id) else {
                continue;
            };
            let world = parent_world * entry.node.transform.matrix();
            visitor(id, &entry.node, &world);
            for child in entry.children.iter().rev() {
                stack.push((*child, world));
            }
        }
    }

    /// Like [`SceneGraph::traverse`] but skips hidden subtrees
    pub fn traverse_visible<F>(&self, mut visitor: F)
    where
        F: FnMut(NodeId, &SceneNode, &Matrix4<f32>),
    {
        let mut stack: Vec<(NodeId, Matrix4<f32>)> = self
            .roots
            .iter()
            .rev()
            .map(|id| (*id, Matrix4::identity()))
            .collect();

        while let Some((id, parent_world)) = stack.pop() {
            let Some(entry) = self.entry(id) else {
                continue;
            };
            if !entry.node.visible {
                continue;
            }
            let world = parent_world * entry.node.transform.matrix();
            visitor(id, &entry.node, &world);
            for child in entry.children.iter().rev() {
                stack.push((*child, world));
            }
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Remove every node; outstanding handles become stale
    pub fn clear(&mut self) {
        for (index, slot) in self.slots.iter_mut().enumerate() {
            if slot.entry.take().is_some() {
                slot.generation = slot.generation.wrapping_add(1);
                self.free.push(index as u32);
            }
        }
        self.roots.clear();
        self.len = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gfx::scene::node::Transform;
    use cgmath::{Vector3, Vector4};

    #[test]
    fn test_add_tree_preserves_hierarchy() {
        let tree = ModelNode::new("root")
            .with_child(ModelNode::new("arm").with_child(ModelNode::new("hand")));
        let mut graph = SceneGraph::new();
        let root = graph.add_tree(&tree, None);

        assert_eq!(graph.len(), 3);
        let arm = graph.children(root)[0];
        let hand = graph.children(arm)[0];
        assert_eq!(graph.get(hand).unwrap().name, "hand");
        assert_eq!(graph.parent(hand), Some(arm));
        assert_eq!(graph.find_by_name("arm"), Some(arm));
    }

    #[test]
    fn test_world_matrix_composes_parents() {
        let mut graph = SceneGraph::new();
        let mut parent = SceneNode::new("parent");
        parent.transform = Transform::from_position(Vector3::new(1.0, 0.0, 0.0));
        let parent_id = graph.add_node(parent, None);
        let mut child = SceneNode::new("child");
        child.transform = Transform::from_position(Vector3::new(0.0, 2.0, 0.0));
        let child_id = graph.add_node(child, Some(parent_id));

        let origin = graph.world_matrix(child_id) * Vector4::new(0.0, 0.0, 0.0, 1.0);
        assert_eq!(origin, Vector4::new(1.0, 2.0, 0.0, 1.0));

        let mut seen = Vec::new();
        graph.traverse(|id, _, world| seen.push((id, *world)));
        assert_eq!(seen.len(), 2);
        assert_eq!(seen[1].1, graph.world_matrix(child_id));
    }

    #[test]
    fn test_remove_subtree_and_stale_handles() {
        let mut graph = SceneGraph::new();
        let root = graph.add_node(SceneNode::new("root"), None);
        let child = graph.add_node(SceneNode::new("child"), Some(root));
        assert!(graph.remove(root));
        assert!(!graph.contains(child));
        assert!(graph.is_empty());

        // Reused slot does not resurrect the old handle
        let fresh = graph.add_node(SceneNode::new("fresh"), None);
        assert!(!graph.contains(root));
        assert!(graph.contains(fresh));
        assert!(!graph.remove(root));
    }

    #[test]
    fn test_hidden_subtrees() {
        let mut graph = SceneGraph::new();
        let mut hidden = SceneNode::new("hidden");
        hidden.visible = false;
        let hidden_id = graph.add_node(hidden, None);
        let child = graph.add_node(SceneNode::new("child"), Some(hidden_id));
        graph.add_node(SceneNode::new("shown"), None);

        assert!(!graph.is_visible(child));
        let mut count = 0;
        graph.traverse_visible(|_, _, _| count += 1);
        assert_eq!(count, 1);
    }

    #[test]
    fn test_clear() {
        let mut graph = SceneGraph::new();
        let id = graph.add_node(SceneNode::new("a"), None);
        graph.clear();
        assert!(graph.is_empty());
        assert!(graph.roots().is_empty());
        assert!(graph.get(id).is_none());
    }
}
