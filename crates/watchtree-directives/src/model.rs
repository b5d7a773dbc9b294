use std::rc::Rc;

use watchtree::{
    Accessor, DigestReport, NodeId, ScopeError, ScopeId, ScopeTree, SharedRenderer, Value, WatcherId,
};

use crate::DirectiveError;

/// Two-way binding between an input node and an assignable accessor.
///
/// The scope-to-node direction is a watcher. The node-to-scope direction is
/// [`Model::input`], which the host calls from its input or change event.
pub struct Model {
    scope: ScopeId,
    accessor: Rc<dyn Accessor>,
    watcher: WatcherId,
}

pub fn model(
    tree: &mut ScopeTree,
    scope: ScopeId,
    node: NodeId,
    accessor: Rc<dyn Accessor>,
    renderer: SharedRenderer,
) -> Result<Model, DirectiveError> {
    let watcher = tree.watch(scope, accessor.clone(), move |_, value, _| {
        let shown = match value {
            Value::Undefined => Value::text(""),
            other => other.clone(),
        };
        renderer.borrow_mut().set_input(node, &shown);
    })?;
    Ok(Model {
        scope,
        accessor,
        watcher,
    })
}

impl Model {
    pub fn scope(&self) -> ScopeId {
        self.scope
    }

    pub fn watcher(&self) -> WatcherId {
        self.watcher
    }

    /// Write a value entered by the user, then digest the model's scope.
    ///
    /// Only the model's subtree is digested; watchers above it see the write
    /// on the next digest that reaches them.
    pub fn input(&self, tree: &mut ScopeTree, value: Value) -> Result<DigestReport, DirectiveError> {
        if !tree.is_alive(self.scope) {
            return Err(ScopeError::Destroyed(self.scope).into());
        }
        self.accessor.write(tree, self.scope, value)?;
        log::trace!("model `{}` written in {}", self.accessor.describe(), self.scope);
        Ok(tree.digest(self.scope)?)
    }

    /// Text field keystroke.
    pub fn input_text(&self, tree: &mut ScopeTree, text: &str) -> Result<DigestReport, DirectiveError> {
        self.input(tree, Value::text(text))
    }

    /// Checkbox click.
    pub fn set_checked(&self, tree: &mut ScopeTree, checked: bool) -> Result<DigestReport, DirectiveError> {
        self.input(tree, Value::bool(checked))
    }
}
