//! Default factories and the registry that restores them.
//!
//! A [`DefaultFactory`] produces the value synthesized for a missing key. It
//! comes in three kinds:
//!
//! | Kind | Produces | Persists as |
//! |------|----------|-------------|
//! | `Value` | a clone of a literal | the literal |
//! | `Named` | the result of a registered `fn` | its name |
//! | `Anonymous` | the result of a closure | nothing: serialization fails |
//!
//! Named factories are resolved back from their name through a
//! [`FactoryRegistry`]. The built-in registry knows `none`, `list`, `dict`,
//! `str`, `int`, `float` and `bool`.

use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use crate::error::{Result, WaterbearError};
use crate::value::{CopyMemo, Mapping, Value};

/// Signature of a named factory.
pub type FactoryFn = fn() -> Value;

#[derive(Clone)]
pub enum DefaultFactory {
    /// Literal value. Cloning a `Map` literal clones its handle, so every
    /// key defaulted from it shares one mapping. Boxed because a literal
    /// may itself hold a proxy, which holds a factory.
    Value(Box<Value>),

    Named { name: String, make: FactoryFn },

    /// Closure with no name. Works at runtime but cannot be persisted.
    Anonymous(Rc<dyn Fn() -> Value>),
}

impl DefaultFactory {
    pub fn value(value: impl Into<Value>) -> Self {
        DefaultFactory::Value(Box::new(value.into()))
    }

    pub fn named(name: impl Into<String>, make: FactoryFn) -> Self {
        DefaultFactory::Named {
            name: name.into(),
            make,
        }
    }

    pub fn from_fn(make: impl Fn() -> Value + 'static) -> Self {
        DefaultFactory::Anonymous(Rc::new(make))
    }

    /// Always `Null`.
    pub fn none() -> Self {
        Self::named("none", || Value::Null)
    }

    /// A fresh empty list on every call.
    pub fn list() -> Self {
        Self::named("list", || Value::List(Vec::new()))
    }

    /// A fresh empty mapping on every call.
    pub fn dict() -> Self {
        Self::named("dict", || Value::Map(Mapping::new()))
    }

    /// True for factories that run code rather than clone a literal.
    pub fn is_callable(&self) -> bool {
        !matches!(self, DefaultFactory::Value(_))
    }

    pub fn produce(&self) -> Value {
        match self {
            DefaultFactory::Value(value) => (**value).clone(),
            DefaultFactory::Named { make, .. } => make(),
            DefaultFactory::Anonymous(make) => make(),
        }
    }

    /// What a read of the reserved `__default` name reports.
    pub fn describe(&self) -> Value {
        match self {
            DefaultFactory::Value(value) => (**value).clone(),
            DefaultFactory::Named { name, .. } => Value::Str(name.clone()),
            DefaultFactory::Anonymous(_) => Value::Str("<anonymous>".to_string()),
        }
    }

    /// Persistable form of this factory.
    ///
    /// # Errors
    /// `SerializationUnsupported` for an anonymous closure.
    pub fn to_state(&self) -> Result<FactoryState> {
        match self {
            DefaultFactory::Value(value) => Ok(FactoryState::Value {
                value: (**value).clone(),
            }),
            DefaultFactory::Named { name, .. } => Ok(FactoryState::Named { name: name.clone() }),
            DefaultFactory::Anonymous(_) => Err(WaterbearError::SerializationUnsupported(
                "default factory is an anonymous closure; use DefaultFactory::named".to_string(),
            )),
        }
    }

    pub(crate) fn deep_copy_with(&self, memo: &mut CopyMemo) -> Self {
        match self {
            DefaultFactory::Value(value) => {
                DefaultFactory::Value(Box::new(value.deep_copy_with(memo)))
            }
            other => other.clone(),
        }
    }
}

impl From<Value> for DefaultFactory {
    fn from(value: Value) -> Self {
        DefaultFactory::Value(Box::new(value))
    }
}

impl PartialEq for DefaultFactory {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (DefaultFactory::Value(a), DefaultFactory::Value(b)) => a == b,
            (DefaultFactory::Named { name: a, .. }, DefaultFactory::Named { name: b, .. }) => {
                a == b
            }
            (DefaultFactory::Anonymous(a), DefaultFactory::Anonymous(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl fmt::Debug for DefaultFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DefaultFactory::Value(value) => f.debug_tuple("Value").field(value).finish(),
            DefaultFactory::Named { name, .. } => f.debug_tuple("Named").field(name).finish(),
            DefaultFactory::Anonymous(_) => f.write_str("Anonymous"),
        }
    }
}

/// Persisted form of a [`DefaultFactory`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FactoryState {
    Value { value: Value },
    Named { name: String },
}

/// Name-to-function table used when restoring named factories.
#[derive(Debug, Clone, Default)]
pub struct FactoryRegistry {
    factories: HashMap<String, FactoryFn>,
}

static BUILTINS: Lazy<FactoryRegistry> = Lazy::new(FactoryRegistry::with_builtins);

impl FactoryRegistry {
    /// A registry with no entries.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn with_builtins() -> Self {
        let mut registry = Self::empty();
        registry.register("none", || Value::Null);
        registry.register("list", || Value::List(Vec::new()));
        registry.register("dict", || Value::Map(Mapping::new()));
        registry.register("str", || Value::Str(String::new()));
        registry.register("int", || Value::Int(0));
        registry.register("float", || Value::Float(0.0));
        registry.register("bool", || Value::Bool(false));
        registry
    }

    /// Shared registry holding only the built-ins.
    pub fn builtins() -> &'static FactoryRegistry {
        &BUILTINS
    }

    /// Add or replace a named factory.
    pub fn register(&mut self, name: impl Into<String>, make: FactoryFn) -> &mut Self {
        self.factories.insert(name.into(), make);
        self
    }

    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }

    pub fn get(&self, name: &str) -> Option<DefaultFactory> {
        self.factories
            .get(name)
            .map(|make| DefaultFactory::named(name, *make))
    }

    /// Turn a persisted factory back into a live one.
    ///
    /// # Errors
    /// `UnknownFactory` when a named factory is not registered.
    pub fn restore(&self, state: FactoryState) -> Result<DefaultFactory> {
        match state {
            FactoryState::Value { value } => Ok(DefaultFactory::from(value)),
            FactoryState::Named { name } => self
                .get(&name)
                .ok_or(WaterbearError::UnknownFactory(name)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::ProxyOptions;
    use crate::proxy::AttributeProxy;

    #[test]
    fn literal_factory_clones_its_value() {
        let factory = DefaultFactory::value(7);
        assert!(!factory.is_callable());
        assert_eq!(factory.produce(), Value::Int(7));
        assert_eq!(factory.produce(), Value::Int(7));
    }

    #[test]
    fn literal_map_factory_shares_one_mapping() {
        let factory = DefaultFactory::value(Mapping::new());
        let (Value::Map(a), Value::Map(b)) = (factory.produce(), factory.produce()) else {
            panic!("Expected Maps");
        };
        assert!(a.ptr_eq(&b));
    }

    #[test]
    fn literal_factory_may_hold_a_proxy() {
        let inner = AttributeProxy::with_options(
            Mapping::new(),
            ProxyOptions::new().default_value(Value::Int(0)),
        );
        let factory = DefaultFactory::value(inner.clone());
        assert_eq!(factory.produce(), Value::Proxy(inner));
    }

    #[test]
    fn dict_factory_makes_fresh_mappings() {
        let factory = DefaultFactory::dict();
        assert!(factory.is_callable());
        let (Value::Map(a), Value::Map(b)) = (factory.produce(), factory.produce()) else {
            panic!("Expected Maps");
        };
        assert!(!a.ptr_eq(&b));
    }

    #[test]
    fn anonymous_factory_runs_closure() {
        let factory = DefaultFactory::from_fn(|| Value::from("made"));
        assert!(factory.is_callable());
        assert_eq!(factory.produce(), Value::from("made"));
    }

    #[test]
    fn anonymous_factory_cannot_be_persisted() {
        let factory = DefaultFactory::from_fn(|| Value::Null);
        let err = factory.to_state().unwrap_err();
        assert!(matches!(err, WaterbearError::SerializationUnsupported(_)));
    }

    #[test]
    fn named_factory_persists_as_name() {
        let state = DefaultFactory::list().to_state().unwrap();
        assert_eq!(
            state,
            FactoryState::Named {
                name: "list".into()
            }
        );
    }

    #[test]
    fn builtins_restore_named_factories() {
        let registry = FactoryRegistry::builtins();
        for name in ["none", "list", "dict", "str", "int", "float", "bool"] {
            assert!(registry.contains(name), "missing builtin {}", name);
        }
        let factory = registry
            .restore(FactoryState::Named {
                name: "int".into(),
            })
            .unwrap();
        assert_eq!(factory.produce(), Value::Int(0));
    }

    #[test]
    fn restoring_unknown_name_fails() {
        let err = FactoryRegistry::builtins()
            .restore(FactoryState::Named {
                name: "zeros".into(),
            })
            .unwrap_err();
        assert!(matches!(err, WaterbearError::UnknownFactory(name) if name == "zeros"));
    }

    #[test]
    fn custom_registry_resolves_registered_names() {
        let mut registry = FactoryRegistry::with_builtins();
        registry.register("zeros", || Value::from(vec![0, 0, 0]));
        let factory = registry.get("zeros").unwrap();
        assert_eq!(factory.produce(), Value::from(vec![0, 0, 0]));
    }

    #[test]
    fn factory_state_json_shape() {
        let json = serde_json::to_string(&FactoryState::Named {
            name: "dict".into(),
        })
        .unwrap();
        assert_eq!(json, r#"{"kind":"named","name":"dict"}"#);

        let json = serde_json::to_string(&FactoryState::Value {
            value: Value::Int(3),
        })
        .unwrap();
        assert_eq!(json, r#"{"kind":"value","value":3}"#);
    }
}
