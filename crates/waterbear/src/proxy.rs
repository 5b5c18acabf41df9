//! # Attribute Proxy
//!
//! [`AttributeProxy`] redirects named attribute access to entries of a
//! backing [`Mapping`]. The mapping is aliased, not copied: writes through
//! the proxy are visible through every other handle onto the same mapping,
//! and vice versa.
//!
//! ## Two Namespaces
//!
//! Policy state (the [`ProxyOptions`]) and user data (the backing mapping)
//! are separate fields. The reserved names in [`crate::reserved`] address
//! the policy side: `get_attr` answers them, and `set_policy`/`del_policy`
//! change them. They are never stored in the mapping.
//!
//! Data writes only touch the shared mapping, so `set_attr`, `del_attr`,
//! `set_item` and `del_item` all take `&self` and reject reserved names.
//! Policy writes change this proxy alone and take `&mut self`.
//!
//! ## Read Resolution
//!
//! 1. **Reserved name** (attribute access only): answer from policy state
//!    without looking at the mapping.
//! 2. **Present key**: return the stored value. With `recursive` on, a
//!    plain [`Value::Map`] comes back as a [`Value::Proxy`] over the *same*
//!    nested mapping, so writes on it go through.
//! 3. **Absent key named after a mapping operation** (`keys`, `values`,
//!    `items`, `len`, `copy`): return that operation's result. Stored data
//!    always wins over these names since step 2 runs first.
//! 4. **Absent key with a default**: produce a value from the factory,
//!    write it back unless `idempotent_get` is on, and return it (wrapped
//!    like step 2).
//! 5. Otherwise fail with [`WaterbearError::MissingKey`].
//!
//! ## Copies
//!
//! | Operation | Top-level mapping | Nested mappings | Policy |
//! |-----------|-------------------|-----------------|--------|
//! | `clone()` | shared | shared | copied |
//! | `shallow_copy()` | new | shared | copied |
//! | `deep_copy()` | new | new | copied by value |
//!
//! ## State
//!
//! [`AttributeProxy::to_state`] records the backing mapping as plain data.
//! A proxy stored as a value inside the mapping is written as its own
//! mapping, and its policy is not recorded; after a restore that entry is a
//! [`Value::Map`]. Only the outer proxy's policy survives a round trip.
//! Cyclic mappings and non-finite floats cannot be written and fail with
//! [`WaterbearError::Serialization`].

use std::fmt;
use std::rc::Rc;

use crate::error::{Result, WaterbearError};
use crate::factory::{DefaultFactory, FactoryRegistry};
use crate::observe::{AccessObserver, NoopObserver, ReadOutcome};
use crate::options::ProxyOptions;
use crate::reserved::{self, Reserved};
use crate::state::ProxyState;
use crate::value::{CopyMemo, Mapping, Value};

/// Dot-notation view over a shared [`Mapping`].
#[derive(Clone)]
pub struct AttributeProxy {
    backing: Mapping,
    options: ProxyOptions,
    observer: Rc<dyn AccessObserver>,
}

impl AttributeProxy {
    /// Wrap `backing` with default options.
    ///
    /// The mapping is taken as-is. Entries named like reserved names stay in
    /// it but are unreachable through attribute or item access.
    pub fn new(backing: Mapping) -> Self {
        Self::with_options(backing, ProxyOptions::default())
    }

    pub fn with_options(backing: Mapping, options: ProxyOptions) -> Self {
        Self {
            backing,
            options,
            observer: Rc::new(NoopObserver),
        }
    }

    /// Build from keyword-style entries.
    ///
    /// `__recursive`, `__default` and `__idempotent_get` are removed from
    /// `entries` and become policy; whatever remains is the backing mapping.
    /// `__default` is taken as a literal value.
    ///
    /// # Errors
    /// - `InvalidPolicy` when a flag is not a boolean.
    /// - `ReservedName` when `entries` holds any other reserved name.
    ///
    /// `entries` is left untouched on error.
    pub fn from_kwargs(entries: Mapping) -> Result<Self> {
        if let Some(key) = entries
            .keys()
            .into_iter()
            .find(|k| reserved::is_reserved(k) && !reserved::POLICY_KEYS.contains(&k.as_str()))
        {
            return Err(WaterbearError::ReservedName(key));
        }
        let recursive = entries
            .get(reserved::RECURSIVE)
            .map(|v| expect_bool(reserved::RECURSIVE, &v))
            .transpose()?;
        let idempotent_get = entries
            .get(reserved::IDEMPOTENT_GET)
            .map(|v| expect_bool(reserved::IDEMPOTENT_GET, &v))
            .transpose()?;

        entries.remove(reserved::RECURSIVE);
        entries.remove(reserved::IDEMPOTENT_GET);
        let default = entries.remove(reserved::DEFAULT).map(DefaultFactory::from);

        let options = ProxyOptions {
            recursive: recursive.unwrap_or(true),
            default,
            idempotent_get: idempotent_get.unwrap_or(false),
        };
        Ok(Self::with_options(entries, options))
    }

    /// Attach an observer. Nested proxies created from this one share it.
    pub fn with_observer(mut self, observer: impl AccessObserver + 'static) -> Self {
        self.observer = Rc::new(observer);
        self
    }

    /// The aliased backing mapping.
    pub fn backing(&self) -> &Mapping {
        &self.backing
    }

    pub fn options(&self) -> &ProxyOptions {
        &self.options
    }

    pub fn is_recursive(&self) -> bool {
        self.options.recursive
    }

    pub fn has_default(&self) -> bool {
        self.options.has_default()
    }

    pub fn is_idempotent_get(&self) -> bool {
        self.options.idempotent_get
    }

    pub fn default_factory(&self) -> Option<&DefaultFactory> {
        self.options.default.as_ref()
    }

    pub fn set_recursive(&mut self, recursive: bool) {
        self.options.recursive = recursive;
        self.observer.on_policy_change(reserved::RECURSIVE);
    }

    pub fn set_idempotent_get(&mut self, idempotent_get: bool) {
        self.options.idempotent_get = idempotent_get;
        self.observer.on_policy_change(reserved::IDEMPOTENT_GET);
    }

    pub fn set_default(&mut self, default: impl Into<DefaultFactory>) {
        self.options.default = Some(default.into());
        self.observer.on_policy_change(reserved::DEFAULT);
    }

    pub fn clear_default(&mut self) {
        self.options.default = None;
        self.observer.on_policy_change(reserved::DEFAULT);
    }

    // --- Attribute access ---

    /// Read an attribute, following the resolution order in the module docs.
    pub fn get_attr(&self, name: &str) -> Result<Value> {
        match Reserved::parse(name) {
            Some(reserved) => Ok(self.reserved_value(reserved)),
            None => self.resolve(name),
        }
    }

    /// Write an attribute. The value is stored in the mapping as given; a
    /// proxy value is not unwrapped.
    ///
    /// # Errors
    /// `ReservedName` for a reserved name. Use [`set_policy`](Self::set_policy).
    pub fn set_attr(&self, name: &str, value: impl Into<Value>) -> Result<()> {
        reject_reserved(name)?;
        self.store(name, value.into());
        Ok(())
    }

    /// Delete an attribute.
    ///
    /// # Errors
    /// - `MissingKey` when the mapping has no such key.
    /// - `ReservedName` for a reserved name. Use [`del_policy`](Self::del_policy).
    pub fn del_attr(&self, name: &str) -> Result<()> {
        reject_reserved(name)?;
        self.remove(name)
    }

    // --- Policy access ---

    /// Write a reserved name:
    /// - `__recursive` / `__is_recursive` / `__idempotent_get` take a `Bool`
    /// - `__default` installs the value as a literal default
    /// - `__dict__` rebinds the backing mapping to a `Map` or a proxy's mapping
    ///
    /// # Errors
    /// - `UnknownPolicy` when `name` is not reserved.
    /// - `InvalidPolicy` when the value has the wrong kind. Policy is left
    ///   unchanged.
    pub fn set_policy(&mut self, name: &str, value: impl Into<Value>) -> Result<()> {
        let reserved =
            Reserved::parse(name).ok_or_else(|| WaterbearError::UnknownPolicy(name.to_string()))?;
        self.set_reserved(reserved, name, value.into())
    }

    /// Delete a reserved name. Deleting `__default` turns default synthesis
    /// off.
    ///
    /// # Errors
    /// - `UnknownPolicy` when `name` is not reserved.
    /// - `ReservedName` for the flags and `__dict__`, which cannot be deleted.
    pub fn del_policy(&mut self, name: &str) -> Result<()> {
        match Reserved::parse(name) {
            Some(Reserved::Default) => {
                self.clear_default();
                Ok(())
            }
            Some(_) => Err(WaterbearError::ReservedName(name.to_string())),
            None => Err(WaterbearError::UnknownPolicy(name.to_string())),
        }
    }

    // --- Item access ---

    /// Read a mapping entry. Same as [`get_attr`](Self::get_attr) for
    /// ordinary keys; reserved names are rejected.
    pub fn get_item(&self, key: &str) -> Result<Value> {
        reject_reserved(key)?;
        self.resolve(key)
    }

    pub fn set_item(&self, key: &str, value: impl Into<Value>) -> Result<()> {
        reject_reserved(key)?;
        self.store(key, value.into());
        Ok(())
    }

    pub fn del_item(&self, key: &str) -> Result<()> {
        reject_reserved(key)?;
        self.remove(key)
    }

    /// Read an optional field: `Ok(None)` instead of `MissingKey`.
    pub fn try_get(&self, key: &str) -> Result<Option<Value>> {
        match self.get_item(key) {
            Ok(value) => Ok(Some(value)),
            Err(WaterbearError::MissingKey(_)) => Ok(None),
            Err(err) => Err(err),
        }
    }

    // --- Introspection ---

    /// Keys in insertion order.
    pub fn keys(&self) -> Vec<String> {
        self.backing.keys()
    }

    /// Attribute names available for completion; the same as [`keys`](Self::keys).
    pub fn dir(&self) -> Vec<String> {
        self.keys()
    }

    /// Stored values in insertion order, without wrapping.
    pub fn values(&self) -> Vec<Value> {
        self.backing.values()
    }

    /// Stored entries in insertion order, without wrapping.
    pub fn items(&self) -> Vec<(String, Value)> {
        self.backing.entries()
    }

    pub fn len(&self) -> usize {
        self.backing.len()
    }

    pub fn is_empty(&self) -> bool {
        self.backing.is_empty()
    }

    /// False exactly when the backing mapping is empty.
    pub fn is_truthy(&self) -> bool {
        !self.is_empty()
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.backing.contains_key(key)
    }

    /// Iterate over a snapshot of the keys.
    pub fn iter(&self) -> std::vec::IntoIter<String> {
        self.keys().into_iter()
    }

    // --- Copies ---

    /// New proxy over a new top-level mapping holding the same values.
    pub fn shallow_copy(&self) -> Self {
        Self {
            backing: self.backing.shallow_copy(),
            options: self.options.clone(),
            observer: Rc::clone(&self.observer),
        }
    }

    /// New proxy sharing no mutable state with this one.
    pub fn deep_copy(&self) -> Self {
        self.deep_copy_with(&mut CopyMemo::new())
    }

    pub(crate) fn deep_copy_with(&self, memo: &mut CopyMemo) -> Self {
        Self {
            backing: self.backing.deep_copy_with(memo),
            options: self.options.deep_copy_with(memo),
            observer: Rc::clone(&self.observer),
        }
    }

    // --- State ---

    /// Snapshot this proxy as a persistable record.
    ///
    /// # Errors
    /// `SerializationUnsupported` when the default factory is an anonymous
    /// closure. The factory is never silently dropped.
    pub fn to_state(&self) -> Result<ProxyState> {
        let snapshot = self.deep_copy();
        let default = snapshot
            .options
            .default
            .as_ref()
            .map(DefaultFactory::to_state)
            .transpose()?;
        Ok(ProxyState {
            backing: snapshot.backing,
            recursive: snapshot.options.recursive,
            has_default: default.is_some(),
            idempotent_get: snapshot.options.idempotent_get,
            default,
        })
    }

    /// Rebuild a proxy, resolving named factories from the built-ins.
    pub fn from_state(state: ProxyState) -> Result<Self> {
        Self::from_state_with(state, FactoryRegistry::builtins())
    }

    /// Rebuild a proxy, resolving named factories from `registry`.
    ///
    /// # Errors
    /// - `UnknownFactory` when a named factory is not in `registry`.
    /// - `MalformedState` when `has_default` disagrees with `default`.
    pub fn from_state_with(state: ProxyState, registry: &FactoryRegistry) -> Result<Self> {
        let default = match (state.has_default, state.default) {
            (true, Some(factory)) => Some(registry.restore(factory)?),
            (false, None) => None,
            (true, None) => {
                return Err(WaterbearError::MalformedState(
                    "has_default is set but no default factory was recorded".to_string(),
                ))
            }
            (false, Some(_)) => {
                return Err(WaterbearError::MalformedState(
                    "default factory recorded while has_default is unset".to_string(),
                ))
            }
        };
        let options = ProxyOptions {
            recursive: state.recursive,
            default,
            idempotent_get: state.idempotent_get,
        };
        Ok(Self::with_options(state.backing, options))
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(&self.to_state()?)?)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Self::from_state(serde_json::from_str(json)?)
    }

    // --- Internals ---

    fn reserved_value(&self, reserved: Reserved) -> Value {
        match reserved {
            Reserved::Recursive => Value::Bool(self.options.recursive),
            Reserved::IdempotentGet => Value::Bool(self.options.idempotent_get),
            Reserved::Default => self
                .options
                .default
                .as_ref()
                .map_or(Value::Null, DefaultFactory::describe),
            Reserved::Backing => Value::Map(self.backing.clone()),
        }
    }

    fn set_reserved(&mut self, reserved: Reserved, name: &str, value: Value) -> Result<()> {
        match reserved {
            Reserved::Recursive => self.options.recursive = expect_bool(name, &value)?,
            Reserved::IdempotentGet => self.options.idempotent_get = expect_bool(name, &value)?,
            Reserved::Default => self.options.default = Some(DefaultFactory::from(value)),
            Reserved::Backing => {
                self.backing = match value {
                    Value::Map(mapping) => mapping,
                    Value::Proxy(proxy) => proxy.backing,
                    _ => {
                        return Err(WaterbearError::InvalidPolicy {
                            name: name.to_string(),
                            expected: "a mapping",
                        })
                    }
                }
            }
        }
        self.observer.on_policy_change(name);
        Ok(())
    }

    fn resolve(&self, key: &str) -> Result<Value> {
        if let Some(value) = self.backing.get(key) {
            let outcome = if self.wraps(&value) {
                ReadOutcome::Wrapped
            } else {
                ReadOutcome::Found
            };
            self.observer.on_read(key, outcome);
            return Ok(self.wrap(value));
        }

        if let Some(value) = self.delegate(key) {
            self.observer.on_read(key, ReadOutcome::Delegated);
            return Ok(value);
        }

        let Some(factory) = &self.options.default else {
            self.observer.on_read(key, ReadOutcome::Missing);
            return Err(WaterbearError::MissingKey(key.to_string()));
        };
        let value = factory.produce();
        let persisted = !self.options.idempotent_get;
        if persisted {
            self.backing.insert(key, value.clone());
        }
        self.observer
            .on_read(key, ReadOutcome::Synthesized { persisted });
        Ok(self.wrap(value))
    }

    /// Results of mapping operations, for names absent from the mapping.
    fn delegate(&self, key: &str) -> Option<Value> {
        let value = match key {
            "keys" => Value::List(self.backing.keys().into_iter().map(Value::Str).collect()),
            "values" => Value::List(self.backing.values()),
            "items" => Value::List(
                self.backing
                    .entries()
                    .into_iter()
                    .map(|(k, v)| Value::List(vec![Value::Str(k), v]))
                    .collect(),
            ),
            "len" => Value::Int(self.backing.len() as i64),
            "copy" => Value::Map(self.backing.shallow_copy()),
            _ => return None,
        };
        Some(value)
    }

    fn wraps(&self, value: &Value) -> bool {
        self.options.recursive && matches!(value, Value::Map(_))
    }

    fn wrap(&self, value: Value) -> Value {
        match value {
            Value::Map(nested) if self.options.recursive => Value::Proxy(self.nested(nested)),
            other => other,
        }
    }

    /// Proxy over a nested mapping, inheriting this proxy's policy and observer.
    fn nested(&self, backing: Mapping) -> Self {
        Self {
            backing,
            options: self.options.clone(),
            observer: Rc::clone(&self.observer),
        }
    }

    fn store(&self, key: &str, value: Value) {
        self.backing.insert(key, value);
        self.observer.on_write(key);
    }

    fn remove(&self, key: &str) -> Result<()> {
        match self.backing.remove(key) {
            Some(_) => {
                self.observer.on_delete(key);
                Ok(())
            }
            None => Err(WaterbearError::MissingKey(key.to_string())),
        }
    }
}

impl Default for AttributeProxy {
    fn default() -> Self {
        Self::new(Mapping::new())
    }
}

impl From<Mapping> for AttributeProxy {
    fn from(backing: Mapping) -> Self {
        Self::new(backing)
    }
}

impl fmt::Display for AttributeProxy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.backing)
    }
}

impl fmt::Debug for AttributeProxy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AttributeProxy")
            .field("backing", &self.backing)
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

impl<'a> IntoIterator for &'a AttributeProxy {
    type Item = String;
    type IntoIter = std::vec::IntoIter<String>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

fn expect_bool(name: &str, value: &Value) -> Result<bool> {
    value.as_bool().ok_or_else(|| WaterbearError::InvalidPolicy {
        name: name.to_string(),
        expected: "a boolean",
    })
}

fn reject_reserved(key: &str) -> Result<()> {
    if reserved::is_reserved(key) {
        return Err(WaterbearError::ReservedName(key.to_string()));
    }
    Ok(())
}
