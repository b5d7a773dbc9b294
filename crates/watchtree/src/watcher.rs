//! Watcher records and change detection.

use std::fmt;
use std::rc::Rc;

use serde::Serialize;
use smallvec::SmallVec;

use crate::accessor::Accessor;
use crate::arena::SlotId;
use crate::scope::{ScopeId, ScopeTree};
use crate::value::Value;

/// Handle to a registered watcher, used to remove it explicitly.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Serialize)]
#[serde(transparent)]
pub struct WatcherId(pub(crate) SlotId);

impl fmt::Display for WatcherId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "watcher#{}.{}", self.0.index, self.0.generation)
    }
}

/// Listener invoked with `(tree, new, old)` when a watcher changes.
pub type Listener = Box<dyn FnMut(&mut ScopeTree, &Value, &Value)>;

/// How a watcher decides that its value changed.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum WatchMode {
    /// [`Value::same`]: primitives by value, lists and objects by reference.
    Reference,
    /// Shallow comparison of list positions or object entries.
    Collection,
}

/// Shallow copy of a collection's occupants.
#[derive(Debug)]
enum Shape {
    Scalar(Value),
    List(SmallVec<[Value; 8]>),
    Object(Vec<(String, Value)>),
}

impl Shape {
    fn of(value: &Value) -> Self {
        match value {
            Value::List(items) => Shape::List(items.borrow().iter().cloned().collect()),
            Value::Object(fields) => Shape::Object(
                fields
                    .borrow()
                    .iter()
                    .map(|(key, value)| (key.clone(), value.clone()))
                    .collect(),
            ),
            other => Shape::Scalar(other.clone()),
        }
    }

    fn matches(&self, value: &Value) -> bool {
        match (self, value) {
            (Shape::List(before), Value::List(items)) => {
                let items = items.borrow();
                before.len() == items.len() && before.iter().zip(items.iter()).all(|(a, b)| a.same(b))
            }
            (Shape::Object(before), Value::Object(fields)) => {
                let fields = fields.borrow();
                before.len() == fields.len()
                    && before
                        .iter()
                        .zip(fields.iter())
                        .all(|((ka, va), (kb, vb))| ka == kb && va.same(vb))
            }
            (Shape::Scalar(before), other) => before.same(other),
            _ => false,
        }
    }
}

/// What a watcher saw on its last evaluation. `None` in [`Watcher::last`]
/// is the unset sentinel, distinct from every value including `Undefined`.
struct Observed {
    value: Value,
    shape: Option<Shape>,
}

pub(crate) struct Watcher {
    pub(crate) scope: ScopeId,
    pub(crate) accessor: Rc<dyn Accessor>,
    pub(crate) mode: WatchMode,
    last: Option<Observed>,
    /// Taken out while the listener runs so it can borrow the tree mutably.
    pub(crate) listener: Option<Listener>,
}

impl Watcher {
    pub(crate) fn new(scope: ScopeId, accessor: Rc<dyn Accessor>, mode: WatchMode, listener: Listener) -> Self {
        Self {
            scope,
            accessor,
            mode,
            last: None,
            listener: Some(listener),
        }
    }

    /// Record `value` if it differs from the last observation, returning the
    /// value to report as `old`. The first observation reports `value` itself.
    pub(crate) fn observe(&mut self, value: &Value) -> Option<Value> {
        let changed = match (&self.last, self.mode) {
            (None, _) => true,
            (Some(last), WatchMode::Reference) => !last.value.same(value),
            (Some(last), WatchMode::Collection) => !last
                .shape
                .as_ref()
                .is_some_and(|shape| shape.matches(value)),
        };
        if !changed {
            return None;
        }
        let shape = match self.mode {
            WatchMode::Reference => None,
            WatchMode::Collection => Some(Shape::of(value)),
        };
        let previous = self.last.replace(Observed {
            value: value.clone(),
            shape,
        });
        Some(previous.map_or_else(|| value.clone(), |observed| observed.value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::accessor;

    fn watcher(mode: WatchMode) -> Watcher {
        let scope = ScopeTree::new().root();
        Watcher::new(scope, accessor::constant(Value::Undefined), mode, Box::new(|_, _, _| {}))
    }

    #[test]
    fn first_observation_always_changes() {
        let mut watcher = watcher(WatchMode::Reference);

        let old = watcher.observe(&Value::Undefined);
        assert_eq!(old, Some(Value::Undefined));
        assert_eq!(watcher.observe(&Value::Undefined), None);
    }

    #[test]
    fn reference_mode_ignores_in_place_mutation() {
        let mut watcher = watcher(WatchMode::Reference);
        let list = Value::list([Value::int(1)]);

        watcher.observe(&list);
        list.push(Value::int(2));

        assert_eq!(watcher.observe(&list), None);
        assert!(watcher.observe(&Value::list([Value::int(1), Value::int(2)])).is_some());
    }

    #[test]
    fn collection_mode_sees_positions_not_references() {
        let mut watcher = watcher(WatchMode::Collection);
        let list = Value::list([Value::int(1)]);

        watcher.observe(&list);
        list.push(Value::int(2));
        assert!(watcher.observe(&list).is_some());

        // Same occupants behind a new reference
        let copy = Value::list([Value::int(1), Value::int(2)]);
        assert_eq!(watcher.observe(&copy), None);
    }

    #[test]
    fn collection_mode_compares_object_entries() {
        let mut watcher = watcher(WatchMode::Collection);
        let object = Value::object([("a", Value::int(1))]);

        watcher.observe(&object);
        assert_eq!(watcher.observe(&object), None);

        object.insert("b", Value::int(2));
        assert!(watcher.observe(&object).is_some());

        object.insert("b", Value::int(3));
        assert!(watcher.observe(&object).is_some());
    }

    #[test]
    fn collection_mode_kind_switch_is_a_change() {
        let mut watcher = watcher(WatchMode::Collection);

        watcher.observe(&Value::list([]));
        assert!(watcher.observe(&Value::Undefined).is_some());
        assert!(watcher.observe(&Value::object([("a", Value::int(1))])).is_some());
    }
}
