//! Serializable view of a scope tree for debugging.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::scope::{ScopeId, ScopeTree};
use crate::value::Value;

/// Scopes of a tree in digest traversal order.
#[derive(Debug, Clone, Serialize)]
pub struct TreeSnapshot {
    pub version: u32,
    pub scopes: Vec<ScopeSnapshot>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ScopeSnapshot {
    pub id: ScopeId,
    pub parent: Option<ScopeId>,
    pub depth: usize,
    pub isolated: bool,
    /// Local bindings only, sorted by name.
    pub bindings: BTreeMap<String, Value>,
    pub watchers: usize,
}

impl TreeSnapshot {
    pub const VERSION: u32 = 1;

    pub fn find(&self, id: ScopeId) -> Option<&ScopeSnapshot> {
        self.scopes.iter().find(|scope| scope.id == id)
    }
}

impl ScopeTree {
    /// Capture every live scope reachable from the root.
    pub fn snapshot(&self) -> TreeSnapshot {
        let mut scopes = Vec::with_capacity(self.scope_count());
        let mut stack = vec![(self.root, 0)];

        while let Some((id, depth)) = stack.pop() {
            let Ok(data) = self.data(id) else {
                continue;
            };
            scopes.push(ScopeSnapshot {
                id,
                parent: data.parent,
                depth,
                isolated: data.isolated,
                bindings: data
                    .bindings
                    .iter()
                    .map(|(name, value)| (name.clone(), value.clone()))
                    .collect(),
                watchers: data.watchers.len(),
            });
            stack.extend(data.children.iter().rev().map(|child| (*child, depth + 1)));
        }

        TreeSnapshot {
            version: TreeSnapshot::VERSION,
            scopes,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::accessor;

    #[test]
    fn snapshot_lists_scopes_depth_first() {
        let mut tree = ScopeTree::new();
        let root = tree.root();
        let a = tree.create_child(root).unwrap();
        let a1 = tree.create_child(a).unwrap();
        let b = tree.create_child(root).unwrap();
        tree.set(a1, "name", Value::text("Ada")).unwrap();
        tree.watch(b, accessor::constant(Value::Null), |_, _, _| {})
            .unwrap();

        let snapshot = tree.snapshot();
        let order: Vec<_> = snapshot.scopes.iter().map(|scope| scope.id).collect();

        assert_eq!(order, vec![root, a, a1, b]);
        assert_eq!(snapshot.find(a1).unwrap().depth, 2);
        assert_eq!(snapshot.find(b).unwrap().watchers, 1);
    }

    #[test]
    fn snapshot_serializes_bindings_as_json() {
        let mut tree = ScopeTree::new();
        let root = tree.root();
        tree.set(
            root,
            "contacts",
            Value::list([Value::object([("name", Value::text("Ada"))])]),
        )
        .unwrap();
        tree.set(root, "missing", Value::Undefined).unwrap();

        let json = serde_json::to_value(tree.snapshot()).unwrap();

        assert_eq!(json["version"], 1);
        assert_eq!(
            json["scopes"][0]["bindings"]["contacts"][0]["name"],
            serde_json::json!("Ada")
        );
        assert!(json["scopes"][0]["bindings"]["missing"].is_null());
        assert!(json["scopes"][0]["parent"].is_null());
    }
}
