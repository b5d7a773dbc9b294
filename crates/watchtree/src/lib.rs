//! Scope tree with digest-style change detection.
//!
//! State lives in a tree of binding scopes. Watchers pair an accessor with a
//! listener; a digest re-reads every watcher in a subtree until nothing
//! changes. On top of that sits a positional reconciler that keeps one child
//! scope and one rendered node per item of a watched collection.
//!
//! The expression layer and the output surface are both external: the core
//! only sees [`Accessor`]s and talks to a [`Renderer`].

pub mod accessor;
pub mod arena;
pub mod config;
pub mod digest;
pub mod error;
pub mod reconcile;
pub mod render;
pub mod scope;
pub mod snapshot;
pub mod value;
pub mod watcher;

pub use accessor::{Accessor, Action, Lookup, PathAccessor};
pub use config::DigestConfig;
pub use digest::{AccessorFailure, DigestReport};
pub use error::{AccessorError, ConfigError, DigestError, ScopeError};
pub use reconcile::{LinkFn, Repeat, RepeatBuilder, RepeatEntry, RepeatTarget};
pub use render::{MemoryRenderer, NodeId, RenderOp, Renderer, SharedRenderer};
pub use scope::{DestroyHook, ScopeId, ScopeTree};
pub use snapshot::{ScopeSnapshot, TreeSnapshot};
pub use value::Value;
pub use watcher::{Listener, WatchMode, WatcherId};
