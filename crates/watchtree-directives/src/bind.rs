use std::rc::Rc;

use watchtree::{Accessor, NodeId, ScopeId, ScopeTree, SharedRenderer, WatcherId};

use crate::DirectiveError;

/// Keep `node`'s text equal to the accessor's display text. `Undefined`
/// renders as empty text.
pub fn bind(
    tree: &mut ScopeTree,
    scope: ScopeId,
    node: NodeId,
    accessor: Rc<dyn Accessor>,
    renderer: SharedRenderer,
) -> Result<WatcherId, DirectiveError> {
    let watcher = tree.watch(scope, accessor, move |_, value, _| {
        renderer.borrow_mut().set_text(node, &value.display_text());
    })?;
    Ok(watcher)
}
