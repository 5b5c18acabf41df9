//! # Waterbear
//!
//! Dot-notation access over ordinary key-value mappings. An
//! [`AttributeProxy`] redirects named reads and writes to entries of a
//! shared [`Mapping`], so `proxy.get_attr("field")` and
//! `proxy.get_item("field")` address the same data.
//!
//! ```
//! use waterbear::{mapping, AttributeProxy, Value};
//!
//! let args = AttributeProxy::new(mapping! { "a" => 0, "b" => 1 });
//! args.set_attr("haha", mapping! { "a" => 1 }).unwrap();
//!
//! let Value::Proxy(haha) = args.get_attr("haha").unwrap() else { unreachable!() };
//! assert_eq!(haha.get_attr("a").unwrap(), Value::Int(1));
//! assert_eq!(args.to_string(), r#"{"a": 0, "b": 1, "haha": {"a": 1}}"#);
//! ```
//!
//! ## Layers
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │  Proxies (proxy.rs, default_proxy.rs, schema.rs)            │
//! │  - Resolution order, reserved names, copies, state          │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │  Policy (options.rs, factory.rs, reserved.rs, observe.rs)   │
//! │  - Flags, default factories, access hook                    │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │  Values (value.rs)                                          │
//! │  - Tagged Value enum, shared insertion-ordered Mapping      │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Sharing
//!
//! Everything is single-threaded. A [`Mapping`] is an `Rc<RefCell<..>>`
//! handle: construction aliases the caller's mapping, recursive wrapping
//! and shallow copies share nested mappings, and only a deep copy yields
//! fully independent state.
//!
//! ## Module Overview
//!
//! - [`proxy`]: [`AttributeProxy`], the resolution and mutation protocol
//! - [`default_proxy`]: [`DefaultAttributeProxy`] constructor
//! - [`schema`]: [`SchemaOrderedProxy`] and the [`Schema`] trait
//! - [`value`]: [`Value`] and [`Mapping`]
//! - [`factory`]: default factories and their registry
//! - [`options`]: [`ProxyOptions`]
//! - [`reserved`]: reserved internal names
//! - [`observe`]: the [`AccessObserver`] hook
//! - [`state`]: [`ProxyState`], the persisted record
//! - [`error`]: error types

pub mod default_proxy;
pub mod error;
pub mod factory;
pub mod observe;
pub mod options;
pub mod proxy;
pub mod reserved;
pub mod schema;
pub mod state;
pub mod value;

pub use default_proxy::DefaultAttributeProxy;
pub use error::{Result, WaterbearError};
pub use factory::{DefaultFactory, FactoryFn, FactoryRegistry, FactoryState};
pub use observe::{AccessObserver, LogObserver, NoopObserver, ReadOutcome};
pub use options::ProxyOptions;
pub use proxy::AttributeProxy;
pub use schema::{FieldDefault, FieldSpec, Schema, SchemaOrderedProxy};
pub use state::ProxyState;
pub use value::{Mapping, Value};
