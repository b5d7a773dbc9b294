// --- Error Types ---

use std::fmt;

use crate::scope::ScopeId;

/// Failure reported by an accessor or action.
///
/// Inside a digest these are caught per watcher, logged and recorded in the
/// [`DigestReport`](crate::DigestReport); the watcher counts as unchanged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccessorError {
    /// The expression failed while reading or writing.
    Failed(String),
    /// The expression cannot be written to.
    NotAssignable(String),
    /// The expression produced or received a value it cannot handle.
    InvalidValue(String),
    /// The scope the expression ran against is gone.
    Destroyed(ScopeId),
}

impl fmt::Display for AccessorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AccessorError::Failed(msg) => write!(f, "accessor failed: {msg}"),
            AccessorError::NotAssignable(expr) => write!(f, "`{expr}` is not assignable"),
            AccessorError::InvalidValue(msg) => write!(f, "invalid value: {msg}"),
            AccessorError::Destroyed(scope) => write!(f, "{scope} is destroyed"),
        }
    }
}

impl std::error::Error for AccessorError {}

/// Lets actions use `?` on scope operations.
impl From<ScopeError> for AccessorError {
    fn from(error: ScopeError) -> Self {
        match error {
            ScopeError::Accessor { source, .. } => source,
            ScopeError::Destroyed(scope) => AccessorError::Destroyed(scope),
        }
    }
}

/// Error returned by operations addressed at a single scope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScopeError {
    /// The scope was destroyed (or its handle belongs to a reused slot).
    Destroyed(ScopeId),
    /// An accessor or action evaluated against the scope failed.
    Accessor {
        scope: ScopeId,
        source: AccessorError,
    },
}

impl fmt::Display for ScopeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScopeError::Destroyed(scope) => write!(f, "{scope} is destroyed"),
            ScopeError::Accessor { scope, source } => write!(f, "in {scope}: {source}"),
        }
    }
}

impl std::error::Error for ScopeError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ScopeError::Destroyed(_) => None,
            ScopeError::Accessor { source, .. } => Some(source),
        }
    }
}

/// Structural digest failures. Always surfaced to the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DigestError {
    /// `digest` was called while a digest of the same tree is running.
    /// Recoverable: defer the work (e.g. `eval_async`) and retry later.
    InProgress,
    /// Watchers were still changing after `passes` passes.
    /// Bindings keep the values of the last completed pass.
    Convergence { passes: usize },
    /// The digest was started on, or its start scope was destroyed during,
    /// the run.
    Destroyed(ScopeId),
}

impl fmt::Display for DigestError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DigestError::InProgress => write!(f, "digest already in progress"),
            DigestError::Convergence { passes } => {
                write!(f, "digest did not stabilize after {passes} passes")
            }
            DigestError::Destroyed(scope) => write!(f, "cannot digest {scope}: destroyed"),
        }
    }
}

impl std::error::Error for DigestError {}

/// Invalid [`DigestConfig`](crate::DigestConfig).
#[derive(Debug)]
pub enum ConfigError {
    /// The pass cap must allow at least one pass.
    ZeroMaxPasses,
    Parse(toml::de::Error),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::ZeroMaxPasses => write!(f, "max_passes must be at least 1"),
            ConfigError::Parse(error) => write!(f, "invalid digest config: {error}"),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::ZeroMaxPasses => None,
            ConfigError::Parse(error) => Some(error),
        }
    }
}

impl From<toml::de::Error> for ConfigError {
    fn from(error: toml::de::Error) -> Self {
        ConfigError::Parse(error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ScopeTree;

    #[test]
    fn destroyed_scope_survives_conversion() {
        let mut tree = ScopeTree::new();
        let root = tree.root();
        let child = tree.create_child(root).unwrap();
        tree.destroy(child);

        let error = tree.get(child, "name").unwrap_err();
        assert_eq!(AccessorError::from(error), AccessorError::Destroyed(child));
    }
}
