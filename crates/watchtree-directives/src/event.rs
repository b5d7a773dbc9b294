use watchtree::{Action, DigestReport, ScopeId, ScopeTree};

use crate::DirectiveError;

/// Run `action` once against `scope`. No digest follows.
pub fn init(tree: &mut ScopeTree, scope: ScopeId, action: &Action) -> Result<(), DirectiveError> {
    tree.run_action(scope, |tree, scope| action(tree, scope))?;
    Ok(())
}

/// Click handler bound to a scope.
#[derive(Clone)]
pub struct Click {
    scope: ScopeId,
    action: Action,
}

pub fn click(scope: ScopeId, action: Action) -> Click {
    Click { scope, action }
}

impl Click {
    pub fn scope(&self) -> ScopeId {
        self.scope
    }

    /// Run the action, then digest the handler's scope.
    ///
    /// A failing action is returned and no digest runs.
    pub fn fire(&self, tree: &mut ScopeTree) -> Result<DigestReport, DirectiveError> {
        tree.run_action(self.scope, |tree, scope| (self.action)(tree, scope))?;
        Ok(tree.digest(self.scope)?)
    }
}
