//! Runtime values stored in scope bindings.
//!
//! Primitives compare by value during a digest. Lists and objects are shared
//! mutable references and compare by identity, so mutating one in place is
//! invisible to an ordinary watch (a collection watch sees it).

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

use serde::ser::{Serialize, SerializeMap, SerializeSeq, Serializer};

/// Shared, mutable list storage.
pub type ListRef = Rc<RefCell<Vec<Value>>>;

/// Shared, mutable object storage. Keys iterate in sorted order.
pub type ObjectRef = Rc<RefCell<BTreeMap<String, Value>>>;

/// A binding value.
#[derive(Clone, Default)]
pub enum Value {
    /// Nothing is bound under the name anywhere in the lookup chain.
    #[default]
    Undefined,
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    /// Rc for O(1) clone
    Text(Rc<str>),
    List(ListRef),
    Object(ObjectRef),
}

impl Value {
    pub fn int(v: i64) -> Self {
        Value::Int(v)
    }

    pub fn float(v: f64) -> Self {
        Value::Float(v)
    }

    pub fn bool(v: bool) -> Self {
        Value::Bool(v)
    }

    pub fn text(v: impl Into<String>) -> Self {
        Value::Text(v.into().into())
    }

    /// Build a fresh list. Every call allocates a new reference.
    pub fn list(items: impl IntoIterator<Item = Value>) -> Self {
        Value::List(Rc::new(RefCell::new(items.into_iter().collect())))
    }

    /// Build a fresh object. Every call allocates a new reference.
    pub fn object(fields: impl IntoIterator<Item = (impl Into<String>, Value)>) -> Self {
        Value::Object(Rc::new(RefCell::new(
            fields.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        )))
    }

    pub fn is_undefined(&self) -> bool {
        matches!(self, Value::Undefined)
    }

    pub fn is_nullish(&self) -> bool {
        matches!(self, Value::Undefined | Value::Null)
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(v) => Some(*v),
            Value::Float(v) if v.fract() == 0.0 && v.is_finite() => Some(*v as i64),
            _ => None,
        }
    }

    /// Numeric view of `Int` and `Float`.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(v) => Some(*v as f64),
            Value::Float(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&ListRef> {
        match self {
            Value::List(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&ObjectRef> {
        match self {
            Value::Object(v) => Some(v),
            _ => None,
        }
    }

    /// Digest equality.
    ///
    /// Numbers compare numerically across `Int`/`Float`, and `NaN` is the same
    /// as `NaN` so a watcher yielding `NaN` settles. Lists and objects are the
    /// same only when they are the same reference.
    pub fn same(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Undefined, Value::Undefined) | (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Text(a), Value::Text(b)) => a == b,
            (Value::List(a), Value::List(b)) => Rc::ptr_eq(a, b),
            (Value::Object(a), Value::Object(b)) => Rc::ptr_eq(a, b),
            _ => match (self.as_f64(), other.as_f64()) {
                (Some(a), Some(b)) => a == b || (a.is_nan() && b.is_nan()),
                _ => false,
            },
        }
    }

    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Undefined | Value::Null => false,
            Value::Bool(v) => *v,
            Value::Int(v) => *v != 0,
            Value::Float(v) => *v != 0.0 && !v.is_nan(),
            Value::Text(v) => !v.is_empty(),
            Value::List(_) | Value::Object(_) => true,
        }
    }

    /// Text shown by a text binding. `Undefined` and `Null` render empty.
    pub fn display_text(&self) -> String {
        self.to_string()
    }

    /// Read a field (objects), an index (lists) or `length` (lists, text).
    /// Anything missing reads as `Undefined`.
    pub fn field(&self, name: &str) -> Value {
        match self {
            Value::Object(fields) => fields.borrow().get(name).cloned().unwrap_or_default(),
            Value::List(items) => {
                let items = items.borrow();
                if name == "length" {
                    return Value::Int(items.len() as i64);
                }
                name.parse::<usize>()
                    .ok()
                    .and_then(|index| items.get(index).cloned())
                    .unwrap_or_default()
            }
            Value::Text(text) if name == "length" => Value::Int(text.chars().count() as i64),
            _ => Value::Undefined,
        }
    }

    /// Number of positional items in a list, `None` for anything else.
    pub fn len(&self) -> Option<usize> {
        self.as_list().map(|items| items.borrow().len())
    }

    /// Append to a list in place, keeping its reference. Returns `false` if
    /// this is not a list.
    pub fn push(&self, item: Value) -> bool {
        match self {
            Value::List(items) => {
                items.borrow_mut().push(item);
                true
            }
            _ => false,
        }
    }

    /// Set an object field in place, keeping its reference. Returns `false` if
    /// this is not an object.
    pub fn insert(&self, name: impl Into<String>, value: Value) -> bool {
        match self {
            Value::Object(fields) => {
                fields.borrow_mut().insert(name.into(), value);
                true
            }
            _ => false,
        }
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.into())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v.into())
    }
}

/// Structural equality, used by tests and snapshots. The digest uses
/// [`Value::same`] instead.
impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::List(a), Value::List(b)) => Rc::ptr_eq(a, b) || *a.borrow() == *b.borrow(),
            (Value::Object(a), Value::Object(b)) => Rc::ptr_eq(a, b) || *a.borrow() == *b.borrow(),
            (Value::Float(a), Value::Float(b)) => a == b || (a.is_nan() && b.is_nan()),
            _ => self.same(other),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Undefined | Value::Null => Ok(()),
            Value::Bool(v) => write!(f, "{v}"),
            Value::Int(v) => write!(f, "{v}"),
            Value::Float(v) if v.is_nan() => write!(f, "NaN"),
            Value::Float(v) if v.is_finite() && v.fract() == 0.0 && v.abs() < 1e15 => {
                write!(f, "{}", *v as i64)
            }
            Value::Float(v) => write!(f, "{v}"),
            Value::Text(v) => f.write_str(v),
            Value::List(items) => {
                for (index, item) in items.borrow().iter().enumerate() {
                    if index > 0 {
                        f.write_str(",")?;
                    }
                    write!(f, "{item}")?;
                }
                Ok(())
            }
            Value::Object(fields) => {
                f.write_str("{")?;
                for (index, (key, value)) in fields.borrow().iter().enumerate() {
                    if index > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{key}: {value}")?;
                }
                f.write_str("}")
            }
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Undefined => f.write_str("Undefined"),
            Value::Null => f.write_str("Null"),
            Value::Bool(v) => write!(f, "Bool({v})"),
            Value::Int(v) => write!(f, "Int({v})"),
            Value::Float(v) => write!(f, "Float({v})"),
            Value::Text(v) => write!(f, "Text({v:?})"),
            Value::List(items) => match items.try_borrow() {
                Ok(items) => f.debug_list().entries(items.iter()).finish(),
                Err(_) => f.write_str("List(<borrowed>)"),
            },
            Value::Object(fields) => match fields.try_borrow() {
                Ok(fields) => f.debug_map().entries(fields.iter()).finish(),
                Err(_) => f.write_str("Object(<borrowed>)"),
            },
        }
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Value::Undefined | Value::Null => serializer.serialize_none(),
            Value::Bool(v) => serializer.serialize_bool(*v),
            Value::Int(v) => serializer.serialize_i64(*v),
            Value::Float(v) => serializer.serialize_f64(*v),
            Value::Text(v) => serializer.serialize_str(v),
            Value::List(items) => {
                let items = items.borrow();
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items.iter() {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            Value::Object(fields) => {
                let fields = fields.borrow();
                let mut map = serializer.serialize_map(Some(fields.len()))?;
                for (key, value) in fields.iter() {
                    map.serialize_entry(key, value)?;
                }
                map.end()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn primitives_compare_by_value() {
        assert!(Value::int(3).same(&Value::int(3)));
        assert!(Value::int(3).same(&Value::float(3.0)));
        assert!(Value::text("a").same(&Value::text("a")));
        assert!(!Value::text("a").same(&Value::text("b")));
        assert!(!Value::Undefined.same(&Value::Null));
        assert!(Value::float(f64::NAN).same(&Value::float(f64::NAN)));
    }

    #[test]
    fn composites_compare_by_reference() {
        let a = Value::list([Value::int(1)]);
        let b = Value::list([Value::int(1)]);
        assert!(!a.same(&b));
        assert!(a.same(&a.clone()));
        assert_eq!(a, b);

        // In-place mutation keeps identity
        let before = a.clone();
        a.push(Value::int(2));
        assert!(a.same(&before));
    }

    #[test]
    fn truthiness() {
        assert!(!Value::Undefined.is_truthy());
        assert!(!Value::int(0).is_truthy());
        assert!(!Value::text("").is_truthy());
        assert!(!Value::float(f64::NAN).is_truthy());
        assert!(Value::text("0").is_truthy());
        assert!(Value::list([]).is_truthy());
    }

    #[test]
    fn display_text() {
        assert_eq!(Value::Undefined.display_text(), "");
        assert_eq!(Value::float(2.0).display_text(), "2");
        assert_eq!(Value::float(2.5).display_text(), "2.5");
        assert_eq!(
            Value::list([Value::int(1), Value::text("b")]).display_text(),
            "1,b"
        );
        assert_eq!(
            Value::object([("name", Value::text("Ada"))]).display_text(),
            "{name: Ada}"
        );
    }

    #[test]
    fn field_access() {
        let contact = Value::object([("name", Value::text("Ada"))]);
        assert_eq!(contact.field("name"), Value::text("Ada"));
        assert!(contact.field("missing").is_undefined());

        let list = Value::list([Value::int(7), Value::int(8)]);
        assert_eq!(list.field("1"), Value::int(8));
        assert_eq!(list.field("length"), Value::int(2));
        assert!(Value::int(1).field("x").is_undefined());
    }
}
