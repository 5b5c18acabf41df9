//! # Schema-Ordered Proxy
//!
//! A fixed-field record whose field set and order come from a [`Schema`]
//! type rather than from insertion order. Every field has a declared
//! default; an instance only stores the fields it overrides.
//!
//! ```
//! use waterbear::{schema, FieldDefault, SchemaOrderedProxy, Value};
//!
//! schema! {
//!     pub struct Stats {
//!         loss: FieldDefault::Null,
//!         entropy: FieldDefault::Null,
//!         mean_kl: FieldDefault::Float(0.0),
//!     }
//! }
//!
//! let stats = SchemaOrderedProxy::<Stats>::new([("entropy", 0), ("loss", 1)]).unwrap();
//! assert_eq!(stats.keys(), vec!["loss", "entropy", "mean_kl"]);
//! assert_eq!(stats.get("mean_kl").unwrap(), Value::Float(0.0));
//! ```
//!
//! `keys`, `values` and `items` name the introspection methods and are
//! never treated as data fields, even when a schema declares them.

use std::fmt;
use std::marker::PhantomData;

use indexmap::IndexMap;

use crate::error::{Result, WaterbearError};
use crate::proxy::AttributeProxy;
use crate::value::Value;

/// Names reserved for introspection.
pub const INTROSPECTION_NAMES: &[&str] = &["keys", "values", "items"];

/// Declared default of a schema field. Restricted to values that can be
/// built in a `const`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FieldDefault {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(&'static str),
}

impl FieldDefault {
    pub fn to_value(self) -> Value {
        match self {
            FieldDefault::Null => Value::Null,
            FieldDefault::Bool(v) => Value::Bool(v),
            FieldDefault::Int(v) => Value::Int(v),
            FieldDefault::Float(v) => Value::Float(v),
            FieldDefault::Str(v) => Value::Str(v.to_string()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FieldSpec {
    pub name: &'static str,
    pub default: FieldDefault,
}

impl FieldSpec {
    pub const fn new(name: &'static str, default: FieldDefault) -> Self {
        Self { name, default }
    }
}

/// A closed, ordered set of fields, fixed at the type level.
pub trait Schema {
    const FIELDS: &'static [FieldSpec];
}

/// Declared fields of `S` in order, minus the introspection names.
pub fn data_fields<S: Schema>() -> impl Iterator<Item = &'static FieldSpec> {
    S::FIELDS
        .iter()
        .filter(|spec| !INTROSPECTION_NAMES.contains(&spec.name))
}

/// Record over the fields of `S`, in declaration order.
pub struct SchemaOrderedProxy<S: Schema> {
    overrides: IndexMap<&'static str, Value>,
    _schema: PhantomData<S>,
}

impl<S: Schema> SchemaOrderedProxy<S> {
    /// Every field at its declared default.
    pub fn defaults() -> Self {
        Self {
            overrides: IndexMap::new(),
            _schema: PhantomData,
        }
    }

    /// Apply overrides on top of the declared defaults.
    ///
    /// # Errors
    /// `UnknownSchemaField` for a name the schema does not declare.
    pub fn new<I, K, V>(overrides: I) -> Result<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<Value>,
    {
        let mut proxy = Self::defaults();
        for (name, value) in overrides {
            proxy.set(name.as_ref(), value)?;
        }
        Ok(proxy)
    }

    /// Look up a field spec by name.
    pub fn field(name: &str) -> Result<&'static FieldSpec> {
        data_fields::<S>()
            .find(|spec| spec.name == name)
            .ok_or_else(|| WaterbearError::UnknownSchemaField {
                field: name.to_string(),
                schema: std::any::type_name::<S>(),
            })
    }

    /// Effective value: the override if any, else the declared default.
    pub fn get(&self, name: &str) -> Result<Value> {
        Self::field(name).map(|spec| self.effective(spec))
    }

    pub fn set(&mut self, name: &str, value: impl Into<Value>) -> Result<()> {
        let spec = Self::field(name)?;
        self.overrides.insert(spec.name, value.into());
        Ok(())
    }

    /// Drop an override, returning the field to its declared default.
    pub fn reset(&mut self, name: &str) -> Result<Option<Value>> {
        let spec = Self::field(name)?;
        Ok(self.overrides.shift_remove(spec.name))
    }

    pub fn is_overridden(&self, name: &str) -> bool {
        self.overrides.contains_key(name)
    }

    pub fn keys(&self) -> Vec<&'static str> {
        data_fields::<S>().map(|spec| spec.name).collect()
    }

    pub fn values(&self) -> Vec<Value> {
        data_fields::<S>().map(|spec| self.effective(spec)).collect()
    }

    pub fn items(&self) -> Vec<(&'static str, Value)> {
        data_fields::<S>()
            .map(|spec| (spec.name, self.effective(spec)))
            .collect()
    }

    /// An [`AttributeProxy`] over a fresh mapping holding [`items`](Self::items).
    pub fn to_proxy(&self) -> AttributeProxy {
        AttributeProxy::new(self.items().into_iter().collect())
    }

    fn effective(&self, spec: &FieldSpec) -> Value {
        self.overrides
            .get(spec.name)
            .cloned()
            .unwrap_or_else(|| spec.default.to_value())
    }
}

impl<S: Schema> Default for SchemaOrderedProxy<S> {
    fn default() -> Self {
        Self::defaults()
    }
}

impl<S: Schema> Clone for SchemaOrderedProxy<S> {
    fn clone(&self) -> Self {
        Self {
            overrides: self.overrides.clone(),
            _schema: PhantomData,
        }
    }
}

impl<S: Schema> PartialEq for SchemaOrderedProxy<S> {
    fn eq(&self, other: &Self) -> bool {
        self.items() == other.items()
    }
}

impl<S: Schema> fmt::Debug for SchemaOrderedProxy<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.items()).finish()
    }
}

impl<S: Schema> fmt::Display for SchemaOrderedProxy<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("{")?;
        for (i, (name, value)) in self.items().into_iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{:?}: {}", name, value)?;
        }
        f.write_str("}")
    }
}

/// Declare a unit type implementing [`Schema`].
///
/// Each field is `name: FieldDefault`, listed in the order `keys()` reports.
#[macro_export]
macro_rules! schema {
    ($(#[$meta:meta])* $vis:vis struct $name:ident { $($field:ident : $default:expr),* $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
        $vis struct $name;

        impl $crate::Schema for $name {
            const FIELDS: &'static [$crate::FieldSpec] = &[
                $($crate::FieldSpec::new(stringify!($field), $default)),*
            ];
        }
    };
}
