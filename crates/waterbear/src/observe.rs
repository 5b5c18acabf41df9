//! Observability hook for proxy access.
//!
//! The data path never logs on its own. A proxy reports each resolved read,
//! write and delete to its [`AccessObserver`], which is [`NoopObserver`]
//! unless one is attached with `AttributeProxy::with_observer`. Nested
//! proxies produced by recursive wrapping share their parent's observer.
//!
//! [`LogObserver`] forwards events to the `log` facade under the
//! `waterbear` target; installing a logger is left to the application.

use std::rc::Rc;

use log::{debug, trace};

/// How a read of a data key was resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadOutcome {
    /// Found and returned as stored.
    Found,
    /// Found a plain mapping and wrapped it in a nested proxy.
    Wrapped,
    /// Absent, answered by a mapping operation of the same name.
    Delegated,
    /// Absent, produced by the default factory.
    Synthesized { persisted: bool },
    /// Absent with nothing to fall back on.
    Missing,
}

pub trait AccessObserver {
    fn on_read(&self, _key: &str, _outcome: ReadOutcome) {}

    fn on_write(&self, _key: &str) {}

    fn on_delete(&self, _key: &str) {}

    /// A reserved policy name was written or cleared.
    fn on_policy_change(&self, _name: &str) {}
}

/// Lets a caller keep a handle on an observer it attached.
impl<T: AccessObserver + ?Sized> AccessObserver for Rc<T> {
    fn on_read(&self, key: &str, outcome: ReadOutcome) {
        (**self).on_read(key, outcome);
    }

    fn on_write(&self, key: &str) {
        (**self).on_write(key);
    }

    fn on_delete(&self, key: &str) {
        (**self).on_delete(key);
    }

    fn on_policy_change(&self, name: &str) {
        (**self).on_policy_change(name);
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NoopObserver;

impl AccessObserver for NoopObserver {}

#[derive(Debug, Clone, Copy, Default)]
pub struct LogObserver;

impl AccessObserver for LogObserver {
    fn on_read(&self, key: &str, outcome: ReadOutcome) {
        match outcome {
            ReadOutcome::Found | ReadOutcome::Wrapped | ReadOutcome::Delegated => {
                trace!(target: "waterbear", "read `{}`: {:?}", key, outcome)
            }
            ReadOutcome::Synthesized { persisted } => {
                debug!(target: "waterbear", "synthesized default for `{}` (persisted: {})", key, persisted)
            }
            ReadOutcome::Missing => debug!(target: "waterbear", "missing key `{}`", key),
        }
    }

    fn on_write(&self, key: &str) {
        trace!(target: "waterbear", "write `{}`", key);
    }

    fn on_delete(&self, key: &str) {
        trace!(target: "waterbear", "delete `{}`", key);
    }

    fn on_policy_change(&self, name: &str) {
        debug!(target: "waterbear", "policy `{}` changed", name);
    }
}
