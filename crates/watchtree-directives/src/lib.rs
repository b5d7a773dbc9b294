//! Element directives built on the watchtree core.
//!
//! Each directive wires one rendered node to a scope through watchers and
//! returns a handle the host's event system calls into. Parsing markup and
//! dispatching DOM-style events stay with the host.

mod bind;
mod controller;
mod event;
mod model;
mod repeat;
mod show;

use std::fmt;

use watchtree::{AccessorError, DigestError, ScopeError};

pub use bind::bind;
pub use controller::controller;
pub use event::{Click, click, init};
pub use model::{Model, model};
pub use repeat::{RepeatExpression, repeat};
pub use show::show;

/// Error returned by directive setup and event handlers.
#[derive(Debug, Clone, PartialEq)]
pub enum DirectiveError {
    Scope(ScopeError),
    Digest(DigestError),
    Accessor(AccessorError),
    /// A repeat expression not of the form `item in collection`.
    InvalidExpression(String),
}

impl fmt::Display for DirectiveError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DirectiveError::Scope(error) => write!(f, "{error}"),
            DirectiveError::Digest(error) => write!(f, "{error}"),
            DirectiveError::Accessor(error) => write!(f, "{error}"),
            DirectiveError::InvalidExpression(source) => {
                write!(f, "expected `item in collection`, got `{source}`")
            }
        }
    }
}

impl std::error::Error for DirectiveError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            DirectiveError::Scope(error) => Some(error),
            DirectiveError::Digest(error) => Some(error),
            DirectiveError::Accessor(error) => Some(error),
            DirectiveError::InvalidExpression(_) => None,
        }
    }
}

impl From<ScopeError> for DirectiveError {
    fn from(error: ScopeError) -> Self {
        DirectiveError::Scope(error)
    }
}

impl From<DigestError> for DirectiveError {
    fn from(error: DigestError) -> Self {
        DirectiveError::Digest(error)
    }
}

impl From<AccessorError> for DirectiveError {
    fn from(error: AccessorError) -> Self {
        match error {
            AccessorError::Destroyed(scope) => DirectiveError::Scope(ScopeError::Destroyed(scope)),
            other => DirectiveError::Accessor(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use watchtree::ScopeTree;

    #[test]
    fn destroyed_accessor_error_becomes_scope_error() {
        let mut tree = ScopeTree::new();
        let root = tree.root();
        let gone = tree.create_child(root).unwrap();
        tree.destroy(gone);

        let error = AccessorError::from(tree.get(gone, "x").unwrap_err());

        assert_eq!(
            DirectiveError::from(error),
            DirectiveError::Scope(ScopeError::Destroyed(gone))
        );
        assert_eq!(
            DirectiveError::from(AccessorError::Failed(String::from("boom"))),
            DirectiveError::Accessor(AccessorError::Failed(String::from("boom")))
        );
    }
}
