//! Value model: the tagged [`Value`] enum and the shared [`Mapping`] handle.
//!
//! A [`Mapping`] is a reference-counted handle onto an insertion-ordered map.
//! Cloning the handle aliases the map; [`Mapping::shallow_copy`] and
//! [`Mapping::deep_copy`] are the only ways to get a new one.
//!
//! [`Value::Map`] is a *plain* mapping and is what recursive wrapping looks
//! for. [`Value::Proxy`] is an already-wrapped view and is never wrapped again.

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;
use std::thread::LocalKey;

use indexmap::IndexMap;
use serde::de::{Deserialize, Deserializer, MapAccess, SeqAccess, Visitor};
use serde::ser::{Error as _, Serialize, Serializer};

use crate::proxy::AttributeProxy;

/// Copies made so far during one deep copy, keyed by source mapping address.
pub(crate) type CopyMemo = HashMap<usize, Mapping>;

thread_local! {
    static RENDERING: RefCell<Vec<usize>> = const { RefCell::new(Vec::new()) };
    static SERIALIZING: RefCell<Vec<usize>> = const { RefCell::new(Vec::new()) };
    static COMPARING: RefCell<Vec<(usize, usize)>> = const { RefCell::new(Vec::new()) };
}

/// Marks a mapping (or a pair of them) as in progress on this thread until
/// dropped. Recursive walks use it to stop at a cycle.
struct Visit<K: PartialEq + 'static> {
    stack: &'static LocalKey<RefCell<Vec<K>>>,
}

impl<K: PartialEq + 'static> Visit<K> {
    /// `None` when `key` is already in progress.
    fn enter(stack: &'static LocalKey<RefCell<Vec<K>>>, key: K) -> Option<Self> {
        let entered = stack.with(|active| {
            let mut active = active.borrow_mut();
            if active.contains(&key) {
                return false;
            }
            active.push(key);
            true
        });
        entered.then(|| Self { stack })
    }
}

impl<K: PartialEq + 'static> Drop for Visit<K> {
    fn drop(&mut self) {
        self.stack.with(|active| {
            active.borrow_mut().pop();
        });
    }
}

/// Runtime representation of anything stored in a mapping.
#[derive(Debug, Clone)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    List(Vec<Value>),

    /// A plain mapping. Recursive proxies wrap this on read.
    Map(Mapping),

    /// An already-wrapped view over a mapping.
    Proxy(AttributeProxy),
}

impl Value {
    /// Truthiness, following the usual container rules.
    ///
    /// - Null: false
    /// - Bool: the boolean itself
    /// - Int / Float: non-zero
    /// - Str / List / Map / Proxy: non-empty
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Null => false,
            Value::Bool(v) => *v,
            Value::Int(v) => *v != 0,
            Value::Float(v) => *v != 0.0,
            Value::Str(v) => !v.is_empty(),
            Value::List(v) => !v.is_empty(),
            Value::Map(m) => !m.is_empty(),
            Value::Proxy(p) => p.is_truthy(),
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(v) => Some(*v),
            _ => None,
        }
    }

    /// Get a float, widening integers.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Float(v) => Some(*v),
            Value::Int(v) => Some(*v as f64),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_proxy(&self) -> Option<&AttributeProxy> {
        match self {
            Value::Proxy(p) => Some(p),
            _ => None,
        }
    }

    /// The mapping behind a plain map or a proxy.
    pub fn as_mapping(&self) -> Option<&Mapping> {
        match self {
            Value::Map(m) => Some(m),
            Value::Proxy(p) => Some(p.backing()),
            _ => None,
        }
    }

    /// Recursively duplicate every mapping reachable from this value.
    pub fn deep_copy(&self) -> Value {
        self.deep_copy_with(&mut CopyMemo::new())
    }

    pub(crate) fn deep_copy_with(&self, memo: &mut CopyMemo) -> Value {
        match self {
            Value::List(items) => {
                Value::List(items.iter().map(|v| v.deep_copy_with(memo)).collect())
            }
            Value::Map(m) => Value::Map(m.deep_copy_with(memo)),
            Value::Proxy(p) => Value::Proxy(p.deep_copy_with(memo)),
            other => other.clone(),
        }
    }
}

impl PartialEq for Value {
    /// Content equality. A plain map never equals a proxy, even over the
    /// same entries.
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a == b,
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::List(a), Value::List(b)) => a == b,
            (Value::Map(a), Value::Map(b)) => a == b,
            (Value::Proxy(a), Value::Proxy(b)) => a.backing() == b.backing(),
            _ => false,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("null"),
            Value::Bool(v) => write!(f, "{}", v),
            Value::Int(v) => write!(f, "{}", v),
            Value::Float(v) => write!(f, "{:?}", v),
            Value::Str(v) => write!(f, "{:?}", v),
            Value::List(items) => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                f.write_str("]")
            }
            Value::Map(m) => write!(f, "{}", m),
            Value::Proxy(p) => write!(f, "{}", p),
        }
    }
}

impl From<()> for Value {
    fn from(_: ()) -> Self {
        Value::Null
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(v.into())
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<u32> for Value {
    fn from(v: u32) -> Self {
        Value::Int(v.into())
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Str(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Str(v)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(v: Vec<T>) -> Self {
        Value::List(v.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Null, Into::into)
    }
}

impl From<Mapping> for Value {
    fn from(m: Mapping) -> Self {
        Value::Map(m)
    }
}

impl From<AttributeProxy> for Value {
    fn from(p: AttributeProxy) -> Self {
        Value::Proxy(p)
    }
}

/// Shared, insertion-ordered map from string keys to [`Value`]s.
///
/// Uses `Rc<RefCell<..>>` since proxies are single-threaded: every handle
/// sees every write made through any other handle.
#[derive(Clone, Default)]
pub struct Mapping(Rc<RefCell<IndexMap<String, Value>>>);

impl Mapping {
    pub fn new() -> Self {
        Self::default()
    }

    /// Clone of the value stored under `key`.
    pub fn get(&self, key: &str) -> Option<Value> {
        self.0.borrow().get(key).cloned()
    }

    /// Insert or replace. A new key goes last; a replaced key keeps its slot.
    pub fn insert(&self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.0.borrow_mut().insert(key.into(), value.into())
    }

    /// Remove a key, keeping the order of the remaining ones.
    pub fn remove(&self, key: &str) -> Option<Value> {
        self.0.borrow_mut().shift_remove(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.borrow().contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.0.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.borrow().is_empty()
    }

    pub fn clear(&self) {
        self.0.borrow_mut().clear();
    }

    pub fn keys(&self) -> Vec<String> {
        self.0.borrow().keys().cloned().collect()
    }

    pub fn values(&self) -> Vec<Value> {
        self.0.borrow().values().cloned().collect()
    }

    /// Snapshot of all entries in insertion order.
    pub fn entries(&self) -> Vec<(String, Value)> {
        self.0
            .borrow()
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }

    /// True when both handles point at the same map.
    pub fn ptr_eq(&self, other: &Mapping) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    /// New top-level map whose values are the same handles as this one's.
    pub fn shallow_copy(&self) -> Mapping {
        Mapping(Rc::new(RefCell::new(self.0.borrow().clone())))
    }

    /// New map sharing nothing mutable with this one.
    ///
    /// A mapping reachable twice is copied once, so aliasing inside the
    /// structure survives, and cycles terminate.
    pub fn deep_copy(&self) -> Mapping {
        self.deep_copy_with(&mut CopyMemo::new())
    }

    pub(crate) fn deep_copy_with(&self, memo: &mut CopyMemo) -> Mapping {
        let addr = self.addr();
        if let Some(copy) = memo.get(&addr) {
            return copy.clone();
        }
        let copy = Mapping::new();
        memo.insert(addr, copy.clone());
        for (key, value) in self.entries() {
            copy.insert(key, value.deep_copy_with(memo));
        }
        copy
    }

    fn addr(&self) -> usize {
        Rc::as_ptr(&self.0) as usize
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Mapping {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let map = iter
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect::<IndexMap<String, Value>>();
        Mapping(Rc::new(RefCell::new(map)))
    }
}

impl PartialEq for Mapping {
    /// Same keys with equal values; order is not compared. A pair of
    /// mappings reached again while it is being compared counts as equal.
    fn eq(&self, other: &Self) -> bool {
        if self.ptr_eq(other) {
            return true;
        }
        let Some(_visit) = Visit::enter(&COMPARING, (self.addr(), other.addr())) else {
            return true;
        };
        let ours = self.0.borrow();
        let theirs = other.0.borrow();
        ours.len() == theirs.len()
            && ours
                .iter()
                .all(|(k, v)| theirs.get(k).is_some_and(|other| v == other))
    }
}

impl fmt::Debug for Mapping {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Some(_visit) = Visit::enter(&RENDERING, self.addr()) else {
            return f.write_str("{...}");
        };
        f.debug_map().entries(self.0.borrow().iter()).finish()
    }
}

impl fmt::Display for Mapping {
    /// A mapping that contains itself renders the inner occurrence as `{...}`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Some(_visit) = Visit::enter(&RENDERING, self.addr()) else {
            return f.write_str("{...}");
        };
        f.write_str("{")?;
        for (i, (key, value)) in self.0.borrow().iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{:?}: {}", key, value)?;
        }
        f.write_str("}")
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Value::Null => serializer.serialize_unit(),
            Value::Bool(v) => serializer.serialize_bool(*v),
            Value::Int(v) => serializer.serialize_i64(*v),
            // JSON has no literal for non-finite floats.
            Value::Float(v) if !v.is_finite() => Err(S::Error::custom(format!(
                "non-finite float {} cannot be serialized",
                v
            ))),
            Value::Float(v) => serializer.serialize_f64(*v),
            Value::Str(v) => serializer.serialize_str(v),
            Value::List(items) => serializer.collect_seq(items),
            Value::Map(m) => m.serialize(serializer),
            // A proxy persists as the mapping it views.
            Value::Proxy(p) => p.backing().serialize(serializer),
        }
    }
}

impl Serialize for Mapping {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let Some(_visit) = Visit::enter(&SERIALIZING, self.addr()) else {
            return Err(S::Error::custom("cyclic mapping cannot be serialized"));
        };
        serializer.collect_map(self.0.borrow().iter())
    }
}

impl<'de> Deserialize<'de> for Value {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(ValueVisitor)
    }
}

impl<'de> Deserialize<'de> for Mapping {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_map(MappingVisitor)
    }
}

struct ValueVisitor;

impl<'de> Visitor<'de> for ValueVisitor {
    type Value = Value;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("a null, boolean, number, string, sequence or map")
    }

    fn visit_unit<E>(self) -> Result<Value, E> {
        Ok(Value::Null)
    }

    fn visit_none<E>(self) -> Result<Value, E> {
        Ok(Value::Null)
    }

    fn visit_some<D: Deserializer<'de>>(self, deserializer: D) -> Result<Value, D::Error> {
        Value::deserialize(deserializer)
    }

    fn visit_bool<E>(self, v: bool) -> Result<Value, E> {
        Ok(Value::Bool(v))
    }

    fn visit_i64<E>(self, v: i64) -> Result<Value, E> {
        Ok(Value::Int(v))
    }

    fn visit_u64<E>(self, v: u64) -> Result<Value, E> {
        Ok(i64::try_from(v).map_or(Value::Float(v as f64), Value::Int))
    }

    fn visit_f64<E>(self, v: f64) -> Result<Value, E> {
        Ok(Value::Float(v))
    }

    fn visit_str<E>(self, v: &str) -> Result<Value, E> {
        Ok(Value::Str(v.to_string()))
    }

    fn visit_string<E>(self, v: String) -> Result<Value, E> {
        Ok(Value::Str(v))
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Value, A::Error> {
        let mut items = Vec::with_capacity(seq.size_hint().unwrap_or(0));
        while let Some(item) = seq.next_element::<Value>()? {
            items.push(item);
        }
        Ok(Value::List(items))
    }

    fn visit_map<A: MapAccess<'de>>(self, map: A) -> Result<Value, A::Error> {
        MappingVisitor.visit_map(map).map(Value::Map)
    }
}

struct MappingVisitor;

impl<'de> Visitor<'de> for MappingVisitor {
    type Value = Mapping;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("a map with string keys")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Mapping, A::Error> {
        let mapping = Mapping::new();
        while let Some((key, value)) = access.next_entry::<String, Value>()? {
            mapping.insert(key, value);
        }
        Ok(mapping)
    }
}

/// Build a [`Mapping`] inline.
///
/// ```
/// use waterbear::{mapping, Value};
///
/// let m = mapping! { "a" => 0, "nested" => mapping! { "b" => 1 } };
/// assert_eq!(m.get("a"), Some(Value::Int(0)));
/// ```
#[macro_export]
macro_rules! mapping {
    () => {
        $crate::Mapping::new()
    };
    ($($key:expr => $value:expr),+ $(,)?) => {{
        let map = $crate::Mapping::new();
        $( map.insert($key, $crate::Value::from($value)); )+
        map
    }};
}
