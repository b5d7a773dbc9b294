use std::rc::Rc;

use watchtree::{Accessor, NodeId, ScopeId, ScopeTree, SharedRenderer, WatcherId};

use crate::DirectiveError;

/// Show `node` while the accessor is truthy, hide it otherwise.
pub fn show(
    tree: &mut ScopeTree,
    scope: ScopeId,
    node: NodeId,
    accessor: Rc<dyn Accessor>,
    renderer: SharedRenderer,
) -> Result<WatcherId, DirectiveError> {
    let watcher = tree.watch(scope, accessor, move |_, value, _| {
        renderer.borrow_mut().set_visible(node, value.is_truthy());
    })?;
    Ok(watcher)
}
