//! Collection repeat: one child scope and one rendered node per item.
//!
//! # Positional identity
//!
//! Entries are matched to items by index only. When the occupant of an index
//! changes (by [`Value::same`]) the entry at that index is destroyed and a new
//! one is created in its place; a shrink destroys trailing entries in
//! ascending index order; a growth appends. There is no keyed diffing, so a
//! reorder churns every moved index.
//!
//! ```text
//! [a, b, c] -> [a, x, c]    destroy #1, create #1 after #0's node
//! [a, b, c] -> [a]          destroy #1, destroy #2
//! [a]       -> [a, b]       create #1 after #0's node
//! ```

use std::cell::RefCell;
use std::rc::Rc;

use crate::accessor::Accessor;
use crate::error::ScopeError;
use crate::render::{NodeId, SharedRenderer};
use crate::scope::{DestroyHook, ScopeId, ScopeTree};
use crate::value::Value;
use crate::watcher::WatcherId;

/// Where repeated nodes go: under `parent`, starting right after `anchor`
/// (or first when `anchor` is `None`).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RepeatTarget {
    pub parent: NodeId,
    pub anchor: Option<NodeId>,
}

/// Called for every new entry after its scope and node exist, to bind the
/// item's own directives.
pub type LinkFn = Box<dyn FnMut(&mut ScopeTree, ScopeId, NodeId)>;

/// One tracked item.
#[derive(Debug, Clone)]
pub struct RepeatEntry {
    pub scope: ScopeId,
    pub node: NodeId,
    /// The item occupying this index when the entry was created.
    pub item: Value,
}

struct RepeatState {
    host: ScopeId,
    item_name: String,
    renderer: SharedRenderer,
    target: RepeatTarget,
    link: Option<LinkFn>,
    entries: Vec<RepeatEntry>,
    watcher: Option<WatcherId>,
    hook: Option<DestroyHook>,
    detached: bool,
}

/// Configures a [`Repeat`] before attaching it.
pub struct RepeatBuilder {
    item_name: String,
    renderer: SharedRenderer,
    target: RepeatTarget,
    link: Option<LinkFn>,
}

impl RepeatBuilder {
    /// Bind each entry's directives once its node exists.
    pub fn link<F>(mut self, link: F) -> Self
    where
        F: FnMut(&mut ScopeTree, ScopeId, NodeId) + 'static,
    {
        self.link = Some(Box::new(link));
        self
    }

    /// Watch `accessor` on `host` as a collection and keep entries in sync
    /// from the next digest on. Destroying `host` detaches the repeat.
    pub fn attach(
        self,
        tree: &mut ScopeTree,
        host: ScopeId,
        accessor: Rc<dyn Accessor>,
    ) -> Result<Repeat, ScopeError> {
        let repeat = Repeat {
            state: Rc::new(RefCell::new(RepeatState {
                host,
                item_name: self.item_name,
                renderer: self.renderer,
                target: self.target,
                link: self.link,
                entries: Vec::new(),
                watcher: None,
                hook: None,
                detached: false,
            })),
        };

        let listener = repeat.clone();
        let watcher = tree.watch_collection(host, accessor, move |tree, collection, _old| {
            listener.reconcile(tree, collection);
        })?;
        repeat.state.borrow_mut().watcher = Some(watcher);

        let on_destroy = repeat.clone();
        let hook = tree.on_destroy(host, move |tree| on_destroy.detach(tree))?;
        repeat.state.borrow_mut().hook = Some(hook);
        Ok(repeat)
    }
}

/// Handle to an attached collection repeat. Clones share state.
#[derive(Clone)]
pub struct Repeat {
    state: Rc<RefCell<RepeatState>>,
}

impl Repeat {
    pub fn builder(item_name: impl Into<String>, renderer: SharedRenderer, target: RepeatTarget) -> RepeatBuilder {
        RepeatBuilder {
            item_name: item_name.into(),
            renderer,
            target,
            link: None,
        }
    }

    pub fn host(&self) -> ScopeId {
        self.state.borrow().host
    }

    pub fn is_attached(&self) -> bool {
        !self.state.borrow().detached
    }

    /// Current entries in collection order.
    pub fn entries(&self) -> Vec<RepeatEntry> {
        self.state.borrow().entries.clone()
    }

    pub fn len(&self) -> usize {
        self.state.borrow().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.borrow().entries.is_empty()
    }

    /// Tear down every entry (last first), then stop watching and drop the
    /// host's destroy hook. Calling it again does nothing.
    pub fn detach(&self, tree: &mut ScopeTree) {
        let (host, watcher, hook, entries) = {
            let mut state = self.state.borrow_mut();
            if state.detached {
                return;
            }
            state.detached = true;
            (
                state.host,
                state.watcher.take(),
                state.hook.take(),
                std::mem::take(&mut state.entries),
            )
        };
        for entry in entries.into_iter().rev() {
            self.remove_entry(tree, entry);
        }
        if let Some(watcher) = watcher {
            tree.unwatch(watcher);
        }
        if let Some(hook) = hook {
            tree.cancel_on_destroy(host, hook);
        }
    }

    fn reconcile(&self, tree: &mut ScopeTree, collection: &Value) {
        if self.state.borrow().detached {
            return;
        }
        let items = items_of(collection);
        let common = items.len().min(self.len());

        for (index, item) in items.iter().enumerate().take(common) {
            let replaced = {
                let mut state = self.state.borrow_mut();
                if state.entries[index].item.same(item) {
                    continue;
                }
                state.entries.remove(index)
            };
            self.remove_entry(tree, replaced);
            if !self.create_entry(tree, index, item.clone()) {
                return;
            }
        }

        let trailing = {
            let mut state = self.state.borrow_mut();
            let keep = items.len().min(state.entries.len());
            state.entries.split_off(keep)
        };
        for entry in trailing {
            self.remove_entry(tree, entry);
        }

        for (index, item) in items.into_iter().enumerate().skip(common) {
            if !self.create_entry(tree, index, item) {
                return;
            }
        }
    }

    /// Scope first, then node.
    fn remove_entry(&self, tree: &mut ScopeTree, entry: RepeatEntry) {
        tree.destroy(entry.scope);
        let renderer = self.state.borrow().renderer.clone();
        renderer.borrow_mut().remove(entry.node);
    }

    /// Create the entry for `index` and insert it there. Returns `false` when
    /// the host is gone and reconciliation should stop.
    fn create_entry(&self, tree: &mut ScopeTree, index: usize, item: Value) -> bool {
        let (host, item_name, renderer, target, after) = {
            let state = self.state.borrow();
            let after = match index {
                0 => state.target.anchor,
                _ => state.entries.get(index - 1).map(|entry| entry.node),
            };
            (
                state.host,
                state.item_name.clone(),
                state.renderer.clone(),
                state.target,
                after,
            )
        };

        let scope = match tree.create_child(host) {
            Ok(scope) => scope,
            Err(error) => {
                log::warn!("repeat cannot create entry {index}: {error}");
                return false;
            }
        };
        if let Err(error) = tree.set(scope, &item_name, item.clone()) {
            log::warn!("repeat cannot bind `{item_name}` for entry {index}: {error}");
            return false;
        }
        let node = renderer.borrow_mut().create(target.parent, after, scope);

        let link = self.state.borrow_mut().link.take();
        if let Some(mut link) = link {
            link(tree, scope, node);
            self.state.borrow_mut().link = Some(link);
        }

        self.state
            .borrow_mut()
            .entries
            .insert(index, RepeatEntry { scope, node, item });
        true
    }
}

/// Items of a watched collection: list items, or object values in key order.
fn items_of(collection: &Value) -> Vec<Value> {
    match collection {
        Value::List(items) => items.borrow().clone(),
        Value::Object(fields) => fields.borrow().values().cloned().collect(),
        Value::Undefined | Value::Null => Vec::new(),
        other => {
            log::warn!("repeat over non-collection value {other:?}; rendering nothing");
            Vec::new()
        }
    }
}
