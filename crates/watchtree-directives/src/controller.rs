use watchtree::{AccessorError, ScopeId, ScopeTree};

use crate::DirectiveError;

/// Give a controller its own child scope under `parent` and run its
/// initializer there. The scope is destroyed again if the initializer fails.
pub fn controller<F>(tree: &mut ScopeTree, parent: ScopeId, init: F) -> Result<ScopeId, DirectiveError>
where
    F: FnOnce(&mut ScopeTree, ScopeId) -> Result<(), AccessorError>,
{
    let scope = tree.create_child(parent)?;
    if let Err(error) = tree.run_action(scope, init) {
        log::warn!("controller init in {scope} failed: {error}");
        tree.destroy(scope);
        return Err(error.into());
    }
    log::debug!("controller scope {scope} ready under {parent}");
    Ok(scope)
}

#[cfg(test)]
mod tests {
    use super::*;
    use watchtree::Value;

    #[test]
    fn controller_state_is_private_to_its_scope() {
        let mut tree = ScopeTree::new();
        let root = tree.root();

        let scope = controller(&mut tree, root, |tree, scope| {
            tree.set(scope, "greeting", Value::text("hi"))?;
            Ok(())
        })
        .unwrap();

        assert_eq!(tree.parent(scope).unwrap(), Some(root));
        assert_eq!(tree.get(scope, "greeting").unwrap(), Value::text("hi"));
        assert!(tree.get(root, "greeting").unwrap().is_undefined());
    }

    #[test]
    fn failed_init_leaves_no_scope() {
        let mut tree = ScopeTree::new();
        let root = tree.root();

        let result = controller(&mut tree, root, |_, _| {
            Err(AccessorError::Failed(String::from("missing service")))
        });

        assert!(result.is_err());
        assert!(tree.children(root).unwrap().is_empty());
    }
}
