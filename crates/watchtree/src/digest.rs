//! The digest loop.
//!
//! A digest repeats *passes* over a subtree until one pass sees no watcher
//! change, or fails after `max_passes` passes.
//!
//! # Pass order
//!
//! ```text
//! start
//!  ├── watchers of start (registration order)
//!  ├── child 0 ── its watchers, then its children ...
//!  └── child 1 ── ...
//! ```
//!
//! Depth-first pre-order: a scope's watchers run before any descendant's,
//! siblings in child order. Children are read after the scope's own
//! watchers ran, so scopes its listeners create are visited in the same
//! pass. Scopes destroyed mid-pass are skipped; watchers registered mid-pass
//! on an already visited scope are first evaluated by the next pass.

use smallvec::{SmallVec, smallvec};

use crate::accessor::Lookup;
use crate::error::{AccessorError, DigestError, ScopeError};
use crate::scope::{ScopeId, ScopeTree};
use crate::watcher::WatcherId;

/// An accessor or queued action that failed during a digest.
#[derive(Debug, Clone, PartialEq)]
pub struct AccessorFailure {
    pub scope: ScopeId,
    /// `None` for queued actions.
    pub watcher: Option<WatcherId>,
    pub error: AccessorError,
}

/// Outcome of a successful digest.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DigestReport {
    /// Passes run, the final clean pass included.
    pub passes: usize,
    /// Listener invocations across all passes.
    pub listener_calls: usize,
    /// Per-watcher failures; each counted as "no change" for its pass.
    pub failures: Vec<AccessorFailure>,
}

impl DigestReport {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

impl ScopeTree {
    /// Digest `scope` and its descendants.
    pub fn digest(&mut self, scope: ScopeId) -> Result<DigestReport, DigestError> {
        self.digest_with(scope, DigestReport::default())
    }

    /// Digest the whole tree.
    pub fn digest_root(&mut self) -> Result<DigestReport, DigestError> {
        self.digest(self.root)
    }

    /// Run `action` against `scope`, then digest from the root.
    ///
    /// A failing action is logged and reported in the returned report; the
    /// digest runs regardless, as the action may have written bindings before
    /// failing.
    pub fn apply<F>(&mut self, scope: ScopeId, action: F) -> Result<DigestReport, DigestError>
    where
        F: FnOnce(&mut ScopeTree, ScopeId) -> Result<(), AccessorError>,
    {
        if self.digesting {
            return Err(DigestError::InProgress);
        }
        let mut report = DigestReport::default();
        match self.run_action(scope, action) {
            Ok(()) => {}
            Err(ScopeError::Destroyed(scope)) => return Err(DigestError::Destroyed(scope)),
            Err(ScopeError::Accessor { scope, source }) => {
                log::warn!("apply in {scope} failed: {source}");
                report.failures.push(AccessorFailure {
                    scope,
                    watcher: None,
                    error: source,
                });
            }
        }
        self.digest_with(self.root, report)
    }

    /// Queue `action` to run at the start of the next pass of the current
    /// digest, or of the next digest when none is running.
    pub fn eval_async<F>(&mut self, scope: ScopeId, action: F) -> Result<(), ScopeError>
    where
        F: FnOnce(&mut ScopeTree, ScopeId) -> Result<(), AccessorError> + 'static,
    {
        self.data(scope)?;
        self.async_queue.push_back((scope, Box::new(action)));
        Ok(())
    }

    /// Run `callback` once after the next digest reaches a fixed point.
    pub fn post_digest<F>(&mut self, callback: F)
    where
        F: FnOnce(&mut ScopeTree) + 'static,
    {
        self.post_digest.push(Box::new(callback));
    }

    pub fn is_digesting(&self) -> bool {
        self.digesting
    }

    fn digest_with(&mut self, start: ScopeId, report: DigestReport) -> Result<DigestReport, DigestError> {
        if self.digesting {
            return Err(DigestError::InProgress);
        }
        if !self.is_alive(start) {
            return Err(DigestError::Destroyed(start));
        }
        self.digesting = true;
        let result = self.run_passes(start, report);
        self.digesting = false;

        let report = result?;
        for callback in std::mem::take(&mut self.post_digest) {
            callback(self);
        }
        Ok(report)
    }

    fn run_passes(&mut self, start: ScopeId, mut report: DigestReport) -> Result<DigestReport, DigestError> {
        let max_passes = self.config.max_passes;
        loop {
            if !self.is_alive(start) {
                return Err(DigestError::Destroyed(start));
            }
            self.drain_async_queue(&mut report);
            let dirty = self.pass(start, &mut report);
            report.passes += 1;

            if !dirty && self.async_queue.is_empty() {
                log::debug!(
                    "digest of {start} settled after {} passes, {} listener calls",
                    report.passes,
                    report.listener_calls
                );
                return Ok(report);
            }
            if report.passes >= max_passes {
                log::warn!("digest of {start} still dirty after {max_passes} passes");
                return Err(DigestError::Convergence { passes: report.passes });
            }
        }
    }

    fn drain_async_queue(&mut self, report: &mut DigestReport) {
        while let Some((scope, task)) = self.async_queue.pop_front() {
            if !self.is_alive(scope) {
                log::debug!("dropping queued action for destroyed {scope}");
                continue;
            }
            if let Err(error) = task(self, scope) {
                log::warn!("queued action in {scope} failed: {error}");
                report.failures.push(AccessorFailure {
                    scope,
                    watcher: None,
                    error,
                });
            }
        }
    }

    /// One pass over the subtree. Returns whether any watcher changed.
    fn pass(&mut self, start: ScopeId, report: &mut DigestReport) -> bool {
        let mut dirty = false;
        let mut stack: SmallVec<[ScopeId; 16]> = smallvec![start];

        while let Some(scope) = stack.pop() {
            let watchers: SmallVec<[WatcherId; 8]> = match self.scopes.get(scope.0) {
                Some(data) => data.watchers.iter().copied().collect(),
                None => continue,
            };
            for watcher in watchers {
                dirty |= self.check(watcher, report);
            }
            if let Some(data) = self.scopes.get(scope.0) {
                stack.extend(data.children.iter().rev().copied());
            }
        }
        dirty
    }

    /// Evaluate one watcher, firing its listener on change.
    fn check(&mut self, id: WatcherId, report: &mut DigestReport) -> bool {
        let Some(watcher) = self.watchers.get(id.0) else {
            return false;
        };
        let scope = watcher.scope;
        let accessor = watcher.accessor.clone();

        let value = match accessor.read(&Lookup::new(self, scope)) {
            Ok(value) => value,
            Err(error) => {
                log::warn!("{id} in {scope} (`{}`) failed: {error}", accessor.describe());
                report.failures.push(AccessorFailure {
                    scope,
                    watcher: Some(id),
                    error,
                });
                return false;
            }
        };

        let Some(watcher) = self.watchers.get_mut(id.0) else {
            return false;
        };
        let Some(old) = watcher.observe(&value) else {
            return false;
        };
        let Some(mut listener) = watcher.listener.take() else {
            return true;
        };

        report.listener_calls += 1;
        log::trace!("{id} in {scope} changed: {old:?} -> {value:?}");
        listener(self, &value, &old);

        // The listener may have removed its own watcher
        if let Some(watcher) = self.watchers.get_mut(id.0) {
            watcher.listener = Some(listener);
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::accessor;
    use crate::value::Value;
    use std::cell::Cell;
    use std::rc::Rc;

    #[test]
    fn digest_of_empty_tree_is_one_pass() {
        let mut tree = ScopeTree::new();
        let report = tree.digest_root().unwrap();
        assert_eq!(report.passes, 1);
        assert_eq!(report.listener_calls, 0);
    }

    #[test]
    fn listener_removing_itself_is_not_restored() {
        let mut tree = ScopeTree::new();
        let root = tree.root();
        let id = Rc::new(Cell::new(None));

        let watcher = {
            let id = Rc::clone(&id);
            tree.watch(root, accessor::constant(Value::int(1)), move |tree, _, _| {
                if let Some(id) = id.get() {
                    tree.unwatch(id);
                }
            })
            .unwrap()
        };
        id.set(Some(watcher));

        tree.digest_root().unwrap();
        assert!(!tree.is_watching(watcher));
        assert_eq!(tree.watcher_count(root).unwrap(), 0);
    }

    #[test]
    fn post_digest_runs_once_after_fixed_point() {
        let mut tree = ScopeTree::new();
        let calls = Rc::new(Cell::new(0));

        let counter = Rc::clone(&calls);
        tree.post_digest(move |_| counter.set(counter.get() + 1));

        tree.digest_root().unwrap();
        tree.digest_root().unwrap();
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn digest_of_destroyed_scope_fails() {
        let mut tree = ScopeTree::new();
        let child = tree.create_child(tree.root()).unwrap();
        tree.destroy(child);

        assert_eq!(tree.digest(child), Err(DigestError::Destroyed(child)));
        assert!(!tree.is_digesting());
    }
}
