//! The contract between the core and an expression layer.
//!
//! The core never parses expressions. It stores compiled accessors per
//! watcher or binding site and calls `read`/`write` on them.

use std::cmp::Ordering;
use std::fmt;
use std::rc::Rc;

use crate::error::AccessorError;
use crate::scope::{ScopeId, ScopeTree};
use crate::value::Value;

/// Read-only view of one scope's lookup chain, handed to [`Accessor::read`].
#[derive(Clone, Copy)]
pub struct Lookup<'a> {
    tree: &'a ScopeTree,
    scope: ScopeId,
}

impl<'a> Lookup<'a> {
    pub(crate) fn new(tree: &'a ScopeTree, scope: ScopeId) -> Self {
        Self { tree, scope }
    }

    /// The scope the expression is evaluated in.
    pub fn scope(&self) -> ScopeId {
        self.scope
    }

    /// Resolve a name through the scope chain; `Undefined` when unbound.
    pub fn get(&self, name: &str) -> Value {
        self.tree.lookup(self.scope, name).unwrap_or_default()
    }

    pub fn tree(&self) -> &'a ScopeTree {
        self.tree
    }
}

/// A compiled expression: a read over a scope's bindings and, when the
/// expression is assignable, a write.
pub trait Accessor {
    fn read(&self, lookup: &Lookup<'_>) -> Result<Value, AccessorError>;

    fn write(&self, tree: &mut ScopeTree, scope: ScopeId, value: Value) -> Result<(), AccessorError> {
        let _ = (tree, scope, value);
        Err(AccessorError::NotAssignable(self.describe()))
    }

    /// Source text or a label, used in logs and errors.
    fn describe(&self) -> String {
        String::from("<accessor>")
    }
}

/// A statement run against a scope by init, click or `apply`.
pub type Action = Rc<dyn Fn(&mut ScopeTree, ScopeId) -> Result<(), AccessorError>>;

/// Wrap a closure as an [`Action`].
pub fn action<F>(f: F) -> Action
where
    F: Fn(&mut ScopeTree, ScopeId) -> Result<(), AccessorError> + 'static,
{
    Rc::new(f)
}

type ReadFn = dyn Fn(&Lookup<'_>) -> Result<Value, AccessorError>;
type WriteFn = dyn Fn(&mut ScopeTree, ScopeId, Value) -> Result<(), AccessorError>;

/// Accessor built from closures.
pub struct FnAccessor {
    label: String,
    read: Box<ReadFn>,
    write: Option<Box<WriteFn>>,
}

impl Accessor for FnAccessor {
    fn read(&self, lookup: &Lookup<'_>) -> Result<Value, AccessorError> {
        (self.read)(lookup)
    }

    fn write(&self, tree: &mut ScopeTree, scope: ScopeId, value: Value) -> Result<(), AccessorError> {
        match &self.write {
            Some(write) => write(tree, scope, value),
            None => Err(AccessorError::NotAssignable(self.label.clone())),
        }
    }

    fn describe(&self) -> String {
        self.label.clone()
    }
}

/// Read-only accessor from a closure.
pub fn read_fn<F>(read: F) -> Rc<dyn Accessor>
where
    F: Fn(&Lookup<'_>) -> Result<Value, AccessorError> + 'static,
{
    Rc::new(FnAccessor {
        label: String::from("<fn>"),
        read: Box::new(read),
        write: None,
    })
}

/// Assignable accessor from a pair of closures.
pub fn read_write_fn<R, W>(read: R, write: W) -> Rc<dyn Accessor>
where
    R: Fn(&Lookup<'_>) -> Result<Value, AccessorError> + 'static,
    W: Fn(&mut ScopeTree, ScopeId, Value) -> Result<(), AccessorError> + 'static,
{
    Rc::new(FnAccessor {
        label: String::from("<fn>"),
        read: Box::new(read),
        write: Some(Box::new(write)),
    })
}

/// Accessor that always reads the same value.
pub fn constant(value: Value) -> Rc<dyn Accessor> {
    let label = format!("{value:?}");
    Rc::new(FnAccessor {
        label,
        read: Box::new(move |_| Ok(value.clone())),
        write: None,
    })
}

/// Dotted binding path such as `contact.name` or `items.0`.
///
/// Reads resolve the first segment through the scope chain and the rest as
/// fields, yielding `Undefined` as soon as a segment is missing. Writes to a
/// single segment go to the acting scope's local bindings. Writes to a longer
/// path update the resolved object in place, creating missing intermediate
/// objects. A list index may overwrite an item or append right after the
/// last one.
#[derive(Clone, PartialEq, Eq)]
pub struct PathAccessor {
    source: String,
    segments: Vec<String>,
}

impl PathAccessor {
    pub fn parse(source: &str) -> Result<Self, AccessorError> {
        let trimmed = source.trim();
        let segments: Vec<String> = trimmed.split('.').map(str::to_owned).collect();
        let valid_segment = |segment: &String| {
            !segment.is_empty()
                && segment
                    .chars()
                    .all(|c| c.is_alphanumeric() || c == '_' || c == '$')
        };
        if !segments.iter().all(valid_segment) {
            return Err(AccessorError::InvalidValue(format!(
                "`{source}` is not a binding path"
            )));
        }
        Ok(Self {
            source: trimmed.to_owned(),
            segments,
        })
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// Walk `rest` below `value`, creating objects where nothing is bound,
    /// and return the object that should receive the last segment.
    fn container_for(&self, mut value: Value, rest: &[String]) -> Result<Value, AccessorError> {
        for segment in rest {
            let next = value.field(segment);
            value = if next.is_nullish() {
                let created = Value::object(std::iter::empty::<(String, Value)>());
                if !value.insert(segment.clone(), created.clone()) {
                    return Err(self.not_an_object(segment));
                }
                created
            } else {
                next
            };
        }
        Ok(value)
    }

    fn not_an_object(&self, segment: &str) -> AccessorError {
        AccessorError::InvalidValue(format!(
            "cannot assign `{}`: `{segment}` is not an object",
            self.source
        ))
    }
}

impl Accessor for PathAccessor {
    fn read(&self, lookup: &Lookup<'_>) -> Result<Value, AccessorError> {
        let (first, rest) = match self.segments.split_first() {
            Some(split) => split,
            None => return Ok(Value::Undefined),
        };
        let mut value = lookup.get(first);
        for segment in rest {
            if value.is_nullish() {
                return Ok(Value::Undefined);
            }
            value = value.field(segment);
        }
        Ok(value)
    }

    fn write(&self, tree: &mut ScopeTree, scope: ScopeId, value: Value) -> Result<(), AccessorError> {
        let Some((first, rest)) = self.segments.split_first() else {
            return Err(AccessorError::NotAssignable(self.source.clone()));
        };
        let Some((last, middle)) = rest.split_last() else {
            tree.set(scope, first, value)?;
            return Ok(());
        };

        let mut root = tree.get(scope, first)?;
        if root.is_nullish() {
            root = Value::object(std::iter::empty::<(String, Value)>());
            tree.set(scope, first, root.clone())?;
        }
        let container = self.container_for(root, middle)?;
        if let Value::List(items) = &container {
            let index: usize = last.parse().map_err(|_| self.not_an_object(last))?;
            let mut items = items.borrow_mut();
            match index.cmp(&items.len()) {
                Ordering::Less => items[index] = value,
                Ordering::Equal => items.push(value),
                Ordering::Greater => {
                    return Err(AccessorError::InvalidValue(format!(
                        "cannot assign `{}`: index {index} is past the end of a list of {}",
                        self.source,
                        items.len()
                    )));
                }
            }
            return Ok(());
        }
        if container.insert(last.clone(), value) {
            Ok(())
        } else {
            Err(self.not_an_object(last))
        }
    }

    fn describe(&self) -> String {
        self.source.clone()
    }
}

impl fmt::Debug for PathAccessor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PathAccessor({})", self.source)
    }
}

/// Parse a dotted binding path into a shareable accessor.
pub fn path(source: &str) -> Result<Rc<dyn Accessor>, AccessorError> {
    Ok(Rc::new(PathAccessor::parse(source)?))
}
