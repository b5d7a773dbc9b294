//! Output-side contract.
//!
//! The core treats rendered nodes as opaque [`NodeId`]s and only ever asks a
//! [`Renderer`] to create, remove or update them. [`MemoryRenderer`] keeps a
//! plain node tree in memory for headless use and tests.

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use serde::Serialize;

use crate::scope::ScopeId;
use crate::value::Value;

/// Opaque handle to a rendered node.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Serialize)]
pub struct NodeId(pub u64);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "node#{}", self.0)
    }
}

pub trait Renderer {
    /// Create a node for `scope` under `parent`, placed directly after
    /// `after` or first when `after` is `None`.
    fn create(&mut self, parent: NodeId, after: Option<NodeId>, scope: ScopeId) -> NodeId;

    /// Remove a node and everything below it.
    fn remove(&mut self, node: NodeId);

    fn set_text(&mut self, node: NodeId, text: &str);

    fn set_visible(&mut self, node: NodeId, visible: bool);

    /// Push a value into an input-like node (text field, checkbox).
    fn set_input(&mut self, node: NodeId, value: &Value);
}

/// Renderer shared between the host and the listeners that drive it.
///
/// Listeners borrow it while a digest runs, so the host must not hold a
/// borrow across `digest`.
pub type SharedRenderer = Rc<RefCell<dyn Renderer>>;

/// A recorded renderer call.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum RenderOp {
    Create {
        node: NodeId,
        parent: NodeId,
        after: Option<NodeId>,
        scope: ScopeId,
    },
    Remove {
        node: NodeId,
    },
    SetText {
        node: NodeId,
        text: String,
    },
    SetVisible {
        node: NodeId,
        visible: bool,
    },
    SetInput {
        node: NodeId,
        value: String,
    },
}

/// A node held by [`MemoryRenderer`].
#[derive(Debug, Clone)]
pub struct MemoryNode {
    pub parent: Option<NodeId>,
    pub children: Vec<NodeId>,
    /// Scope the node was created for; `None` for host-built nodes.
    pub scope: Option<ScopeId>,
    pub text: String,
    pub visible: bool,
    pub input: Value,
}

impl MemoryNode {
    fn new(parent: Option<NodeId>, scope: Option<ScopeId>) -> Self {
        Self {
            parent,
            children: Vec::new(),
            scope,
            text: String::new(),
            visible: true,
            input: Value::Undefined,
        }
    }
}

/// In-memory node tree that logs every renderer call.
pub struct MemoryRenderer {
    nodes: HashMap<NodeId, MemoryNode>,
    root: NodeId,
    next_id: u64,
    ops: Vec<RenderOp>,
}

impl MemoryRenderer {
    pub fn new() -> Self {
        let root = NodeId(0);
        let mut nodes = HashMap::new();
        nodes.insert(root, MemoryNode::new(None, None));
        Self {
            nodes,
            root,
            next_id: 1,
            ops: Vec::new(),
        }
    }

    /// Wrap in the shared handle the directives expect.
    pub fn shared() -> Rc<RefCell<MemoryRenderer>> {
        Rc::new(RefCell::new(Self::new()))
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    fn alloc(&mut self) -> NodeId {
        let id = NodeId(self.next_id);
        self.next_id += 1;
        id
    }

    fn insert(&mut self, parent: NodeId, after: Option<NodeId>, node: MemoryNode) -> NodeId {
        let id = self.alloc();
        self.nodes.insert(id, node);
        if let Some(parent_node) = self.nodes.get_mut(&parent) {
            let position = match after {
                None => 0,
                Some(after) => match parent_node.children.iter().position(|child| *child == after) {
                    Some(index) => index + 1,
                    None => {
                        log::warn!("{after} is not a child of {parent}; appending {id}");
                        parent_node.children.len()
                    }
                },
            };
            parent_node.children.insert(position, id);
        } else {
            log::warn!("creating {id} under missing parent {parent}");
        }
        id
    }

    /// Append a host-built node (a static element) without logging an op.
    pub fn append(&mut self, parent: NodeId) -> NodeId {
        let after = self.nodes.get(&parent).and_then(|node| node.children.last().copied());
        self.insert(parent, after, MemoryNode::new(Some(parent), None))
    }

    pub fn node(&self, id: NodeId) -> Option<&MemoryNode> {
        self.nodes.get(&id)
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.nodes.contains_key(&id)
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.nodes.get(&id).map(|node| node.children.as_slice()).unwrap_or(&[])
    }

    pub fn text(&self, id: NodeId) -> Option<&str> {
        self.nodes.get(&id).map(|node| node.text.as_str())
    }

    pub fn is_visible(&self, id: NodeId) -> Option<bool> {
        self.nodes.get(&id).map(|node| node.visible)
    }

    pub fn input(&self, id: NodeId) -> Option<&Value> {
        self.nodes.get(&id).map(|node| &node.input)
    }

    /// Concatenated text of `id` and its visible descendants, depth-first.
    pub fn text_content(&self, id: NodeId) -> String {
        let mut out = String::new();
        self.collect_text(id, &mut out);
        out
    }

    fn collect_text(&self, id: NodeId, out: &mut String) {
        let Some(node) = self.nodes.get(&id) else {
            return;
        };
        if !node.visible {
            return;
        }
        out.push_str(&node.text);
        for child in &node.children {
            self.collect_text(*child, out);
        }
    }

    pub fn ops(&self) -> &[RenderOp] {
        &self.ops
    }

    /// Drain the operation log.
    pub fn take_ops(&mut self) -> Vec<RenderOp> {
        std::mem::take(&mut self.ops)
    }

    /// Number of live nodes, root included.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

impl Default for MemoryRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl Renderer for MemoryRenderer {
    fn create(&mut self, parent: NodeId, after: Option<NodeId>, scope: ScopeId) -> NodeId {
        let node = self.insert(parent, after, MemoryNode::new(Some(parent), Some(scope)));
        self.ops.push(RenderOp::Create {
            node,
            parent,
            after,
            scope,
        });
        node
    }

    fn remove(&mut self, node: NodeId) {
        self.ops.push(RenderOp::Remove { node });
        let Some(removed) = self.nodes.remove(&node) else {
            return;
        };
        if let Some(parent) = removed.parent {
            if let Some(parent) = self.nodes.get_mut(&parent) {
                parent.children.retain(|child| *child != node);
            }
        }
        let mut pending = removed.children;
        while let Some(child) = pending.pop() {
            if let Some(child) = self.nodes.remove(&child) {
                pending.extend(child.children);
            }
        }
    }

    fn set_text(&mut self, node: NodeId, text: &str) {
        self.ops.push(RenderOp::SetText {
            node,
            text: text.to_owned(),
        });
        if let Some(node) = self.nodes.get_mut(&node) {
            node.text = text.to_owned();
        }
    }

    fn set_visible(&mut self, node: NodeId, visible: bool) {
        self.ops.push(RenderOp::SetVisible { node, visible });
        if let Some(node) = self.nodes.get_mut(&node) {
            node.visible = visible;
        }
    }

    fn set_input(&mut self, node: NodeId, value: &Value) {
        self.ops.push(RenderOp::SetInput {
            node,
            value: value.display_text(),
        });
        if let Some(node) = self.nodes.get_mut(&node) {
            node.input = value.clone();
        }
    }
}
