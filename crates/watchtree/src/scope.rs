//! Hierarchical binding scopes.
//!
//! All scopes of one tree live in a generational arena owned by
//! [`ScopeTree`]. A [`ScopeId`] is a plain handle: it owns nothing and stops
//! resolving once its scope is destroyed, so use-after-destroy surfaces as
//! [`ScopeError::Destroyed`] instead of touching freed state.

use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::rc::Rc;

use serde::Serialize;

use crate::accessor::{Accessor, Lookup};
use crate::arena::{Arena, SlotId};
use crate::config::DigestConfig;
use crate::error::{AccessorError, ConfigError, ScopeError};
use crate::value::Value;
use crate::watcher::{Listener, WatchMode, Watcher, WatcherId};

/// Handle to a scope in a [`ScopeTree`].
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Serialize)]
#[serde(transparent)]
pub struct ScopeId(pub(crate) SlotId);

impl fmt::Display for ScopeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "scope#{}.{}", self.0.index, self.0.generation)
    }
}

/// Registration returned by [`ScopeTree::on_destroy`], used to cancel it.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct DestroyHook(u64);

pub(crate) type DestroyCallback = Box<dyn FnOnce(&mut ScopeTree)>;
pub(crate) type AsyncTask = Box<dyn FnOnce(&mut ScopeTree, ScopeId) -> Result<(), AccessorError>>;
pub(crate) type PostDigestTask = Box<dyn FnOnce(&mut ScopeTree)>;

pub(crate) struct ScopeData {
    pub(crate) parent: Option<ScopeId>,
    pub(crate) children: Vec<ScopeId>,
    pub(crate) bindings: HashMap<String, Value>,
    pub(crate) watchers: Vec<WatcherId>,
    /// Lookup stops here instead of falling through to `parent`.
    pub(crate) isolated: bool,
    pub(crate) on_destroy: Vec<(DestroyHook, DestroyCallback)>,
}

impl ScopeData {
    fn new(parent: Option<ScopeId>, isolated: bool) -> Self {
        Self {
            parent,
            children: Vec::new(),
            bindings: HashMap::new(),
            watchers: Vec::new(),
            isolated,
            on_destroy: Vec::new(),
        }
    }
}

/// A tree of binding scopes plus the watchers registered on them.
///
/// Everything runs synchronously on the calling thread. The tree is `!Send`,
/// so an embedding that uses threads must keep every call on the thread that
/// owns the tree.
pub struct ScopeTree {
    pub(crate) config: DigestConfig,
    pub(crate) root: ScopeId,
    pub(crate) scopes: Arena<ScopeData>,
    pub(crate) watchers: Arena<Watcher>,
    pub(crate) digesting: bool,
    pub(crate) async_queue: VecDeque<(ScopeId, AsyncTask)>,
    pub(crate) post_digest: Vec<PostDigestTask>,
    next_hook: u64,
}

impl ScopeTree {
    /// Create a tree with its root scope and the default config.
    pub fn new() -> Self {
        Self::build(DigestConfig::default())
    }

    pub fn with_config(config: DigestConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self::build(config))
    }

    fn build(config: DigestConfig) -> Self {
        let mut scopes = Arena::new();
        let root = ScopeId(scopes.alloc(ScopeData::new(None, false)));
        Self {
            config,
            root,
            scopes,
            watchers: Arena::new(),
            digesting: false,
            async_queue: VecDeque::new(),
            post_digest: Vec::new(),
            next_hook: 0,
        }
    }

    pub fn config(&self) -> &DigestConfig {
        &self.config
    }

    pub fn root(&self) -> ScopeId {
        self.root
    }

    pub fn is_alive(&self, scope: ScopeId) -> bool {
        self.scopes.is_valid(scope.0)
    }

    /// Number of live scopes, root included.
    pub fn scope_count(&self) -> usize {
        self.scopes.len()
    }

    /// Number of live watchers across the tree.
    pub fn total_watchers(&self) -> usize {
        self.watchers.len()
    }

    pub(crate) fn data(&self, scope: ScopeId) -> Result<&ScopeData, ScopeError> {
        self.scopes.get(scope.0).ok_or(ScopeError::Destroyed(scope))
    }

    pub(crate) fn data_mut(&mut self, scope: ScopeId) -> Result<&mut ScopeData, ScopeError> {
        self.scopes.get_mut(scope.0).ok_or(ScopeError::Destroyed(scope))
    }

    pub fn parent(&self, scope: ScopeId) -> Result<Option<ScopeId>, ScopeError> {
        Ok(self.data(scope)?.parent)
    }

    /// Children in traversal order.
    pub fn children(&self, scope: ScopeId) -> Result<&[ScopeId], ScopeError> {
        Ok(&self.data(scope)?.children)
    }

    pub fn watcher_count(&self, scope: ScopeId) -> Result<usize, ScopeError> {
        Ok(self.data(scope)?.watchers.len())
    }

    // --- Structure ---

    /// Append a new child whose lookups fall through to `parent`.
    pub fn create_child(&mut self, parent: ScopeId) -> Result<ScopeId, ScopeError> {
        self.attach_child(parent, false)
    }

    /// Append a new child that does not see its ancestors' bindings.
    pub fn create_isolated_child(&mut self, parent: ScopeId) -> Result<ScopeId, ScopeError> {
        self.attach_child(parent, true)
    }

    fn attach_child(&mut self, parent: ScopeId, isolated: bool) -> Result<ScopeId, ScopeError> {
        self.data(parent)?;
        let child = ScopeId(self.scopes.alloc(ScopeData::new(Some(parent), isolated)));
        self.data_mut(parent)?.children.push(child);
        Ok(child)
    }

    /// Destroy a scope and everything below it.
    ///
    /// Children go first (post-order). Each scope loses its watchers and
    /// bindings, its handle stops resolving, then its `on_destroy` callbacks
    /// run. Destroying an already destroyed scope does nothing.
    pub fn destroy(&mut self, scope: ScopeId) {
        let Some(parent) = self.scopes.get(scope.0).map(|data| data.parent) else {
            return;
        };
        if let Some(parent) = parent {
            if let Some(data) = self.scopes.get_mut(parent.0) {
                data.children.retain(|child| *child != scope);
            }
        }
        self.destroy_subtree(scope);
    }

    fn destroy_subtree(&mut self, scope: ScopeId) {
        let children = match self.scopes.get_mut(scope.0) {
            Some(data) => std::mem::take(&mut data.children),
            None => return,
        };
        for child in children {
            self.destroy_subtree(child);
        }
        let Some(data) = self.scopes.free(scope.0) else {
            return;
        };
        for watcher in &data.watchers {
            self.watchers.free(watcher.0);
        }
        log::trace!("destroyed {scope} ({} watchers)", data.watchers.len());
        for (_, callback) in data.on_destroy {
            callback(self);
        }
    }

    /// Run `callback` once when `scope` is destroyed.
    pub fn on_destroy<F>(&mut self, scope: ScopeId, callback: F) -> Result<DestroyHook, ScopeError>
    where
        F: FnOnce(&mut ScopeTree) + 'static,
    {
        let hook = DestroyHook(self.next_hook);
        self.data_mut(scope)?.on_destroy.push((hook, Box::new(callback)));
        self.next_hook += 1;
        Ok(hook)
    }

    /// Drop a pending `on_destroy` callback without running it. Returns
    /// `false` if it already ran or `scope` is gone.
    pub fn cancel_on_destroy(&mut self, scope: ScopeId, hook: DestroyHook) -> bool {
        let Some(data) = self.scopes.get_mut(scope.0) else {
            return false;
        };
        let before = data.on_destroy.len();
        data.on_destroy.retain(|(registered, _)| *registered != hook);
        data.on_destroy.len() != before
    }

    // --- Bindings ---

    pub(crate) fn lookup(&self, scope: ScopeId, name: &str) -> Option<Value> {
        let mut current = self.scopes.get(scope.0)?;
        loop {
            if let Some(value) = current.bindings.get(name) {
                return Some(value.clone());
            }
            if current.isolated {
                return None;
            }
            current = self.scopes.get(current.parent?.0)?;
        }
    }

    /// Resolve `name` locally, then up the parent chain. Unbound names read
    /// as `Undefined`.
    pub fn get(&self, scope: ScopeId, name: &str) -> Result<Value, ScopeError> {
        self.data(scope)?;
        Ok(self.lookup(scope, name).unwrap_or_default())
    }

    /// Whether `name` is bound on `scope` itself.
    pub fn has_own(&self, scope: ScopeId, name: &str) -> Result<bool, ScopeError> {
        Ok(self.data(scope)?.bindings.contains_key(name))
    }

    /// Bind `name` on `scope` itself. An inherited binding of the same name
    /// is shadowed, never modified.
    pub fn set(&mut self, scope: ScopeId, name: &str, value: Value) -> Result<(), ScopeError> {
        self.data_mut(scope)?.bindings.insert(name.to_owned(), value);
        Ok(())
    }

    /// Write `name` on the nearest scope in the chain that already binds it,
    /// or on `scope` when none does.
    pub fn assign(&mut self, scope: ScopeId, name: &str, value: Value) -> Result<ScopeId, ScopeError> {
        let owner = self.owner_of(scope, name)?.unwrap_or(scope);
        self.set(owner, name, value)?;
        Ok(owner)
    }

    fn owner_of(&self, scope: ScopeId, name: &str) -> Result<Option<ScopeId>, ScopeError> {
        let mut id = scope;
        let mut current = self.data(scope)?;
        loop {
            if current.bindings.contains_key(name) {
                return Ok(Some(id));
            }
            if current.isolated {
                return Ok(None);
            }
            match current.parent {
                Some(parent) => {
                    id = parent;
                    current = self.data(parent)?;
                }
                None => return Ok(None),
            }
        }
    }

    /// Remove a local binding, returning it. Inherited bindings are untouched.
    pub fn unset(&mut self, scope: ScopeId, name: &str) -> Result<Option<Value>, ScopeError> {
        Ok(self.data_mut(scope)?.bindings.remove(name))
    }

    // --- Evaluation ---

    /// Read an accessor against `scope`'s lookup chain.
    pub fn evaluate(&self, scope: ScopeId, accessor: &dyn Accessor) -> Result<Value, ScopeError> {
        self.data(scope)?;
        accessor
            .read(&Lookup::new(self, scope))
            .map_err(|source| ScopeError::Accessor { scope, source })
    }

    /// Run a statement against `scope` without digesting.
    pub fn run_action<F>(&mut self, scope: ScopeId, action: F) -> Result<(), ScopeError>
    where
        F: FnOnce(&mut ScopeTree, ScopeId) -> Result<(), AccessorError>,
    {
        self.data(scope)?;
        action(self, scope).map_err(|source| ScopeError::Accessor { scope, source })
    }

    // --- Watchers ---

    /// Register a watcher compared with [`Value::same`].
    ///
    /// The listener receives `(tree, new, old)`; on its first call `old` is
    /// `new`. It always fires on the first digest that reaches the scope.
    pub fn watch<F>(
        &mut self,
        scope: ScopeId,
        accessor: Rc<dyn Accessor>,
        listener: F,
    ) -> Result<WatcherId, ScopeError>
    where
        F: FnMut(&mut ScopeTree, &Value, &Value) + 'static,
    {
        self.register(scope, accessor, WatchMode::Reference, Box::new(listener))
    }

    /// Register a watcher that compares lists position by position and
    /// objects key by key, so in-place mutation is detected while a new
    /// reference with the same occupants is not a change.
    pub fn watch_collection<F>(
        &mut self,
        scope: ScopeId,
        accessor: Rc<dyn Accessor>,
        listener: F,
    ) -> Result<WatcherId, ScopeError>
    where
        F: FnMut(&mut ScopeTree, &Value, &Value) + 'static,
    {
        self.register(scope, accessor, WatchMode::Collection, Box::new(listener))
    }

    fn register(
        &mut self,
        scope: ScopeId,
        accessor: Rc<dyn Accessor>,
        mode: WatchMode,
        listener: Listener,
    ) -> Result<WatcherId, ScopeError> {
        self.data(scope)?;
        let id = WatcherId(self.watchers.alloc(Watcher::new(scope, accessor, mode, listener)));
        self.data_mut(scope)?.watchers.push(id);
        Ok(id)
    }

    /// Remove a watcher. Returns `false` when it was already gone.
    pub fn unwatch(&mut self, watcher: WatcherId) -> bool {
        let Some(removed) = self.watchers.free(watcher.0) else {
            return false;
        };
        if let Some(data) = self.scopes.get_mut(removed.scope.0) {
            data.watchers.retain(|id| *id != watcher);
        }
        true
    }

    pub fn is_watching(&self, watcher: WatcherId) -> bool {
        self.watchers.is_valid(watcher.0)
    }
}

impl Default for ScopeTree {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ScopeTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScopeTree")
            .field("root", &self.root)
            .field("scopes", &self.scopes.len())
            .field("watchers", &self.watchers.len())
            .field("digesting", &self.digesting)
            .finish()
    }
}
