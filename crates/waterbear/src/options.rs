//! # Proxy Options
//!
//! The three policy flags every [`AttributeProxy`](crate::AttributeProxy)
//! carries. They live next to the backing mapping, never inside it.
//!
//! | Option | Default | Effect |
//! |--------|---------|--------|
//! | `recursive` | `true` | Nested plain mappings come back wrapped in a proxy |
//! | `default` | none | Missing keys are synthesized instead of failing |
//! | `idempotent_get` | `false` | Synthesized values are not written back |

use crate::factory::DefaultFactory;
use crate::value::CopyMemo;

#[derive(Debug, Clone, PartialEq)]
pub struct ProxyOptions {
    pub recursive: bool,
    pub default: Option<DefaultFactory>,
    pub idempotent_get: bool,
}

impl Default for ProxyOptions {
    fn default() -> Self {
        Self {
            recursive: true,
            default: None,
            idempotent_get: false,
        }
    }
}

impl ProxyOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn recursive(mut self, recursive: bool) -> Self {
        self.recursive = recursive;
        self
    }

    /// Enable default synthesis with a literal or a factory.
    pub fn default_value(mut self, default: impl Into<DefaultFactory>) -> Self {
        self.default = Some(default.into());
        self
    }

    pub fn idempotent_get(mut self, idempotent_get: bool) -> Self {
        self.idempotent_get = idempotent_get;
        self
    }

    pub fn has_default(&self) -> bool {
        self.default.is_some()
    }

    pub(crate) fn deep_copy_with(&self, memo: &mut CopyMemo) -> Self {
        Self {
            recursive: self.recursive,
            default: self.default.as_ref().map(|f| f.deep_copy_with(memo)),
            idempotent_get: self.idempotent_get,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Value;

    #[test]
    fn defaults_are_recursive_without_default() {
        let options = ProxyOptions::default();
        assert!(options.recursive);
        assert!(!options.has_default());
        assert!(!options.idempotent_get);
    }

    #[test]
    fn builder_sets_each_flag() {
        let options = ProxyOptions::new()
            .recursive(false)
            .default_value(Value::Int(1))
            .idempotent_get(true);
        assert!(!options.recursive);
        assert_eq!(options.default, Some(DefaultFactory::value(1)));
        assert!(options.idempotent_get);
    }

    #[test]
    fn default_value_accepts_factories() {
        let options = ProxyOptions::new().default_value(DefaultFactory::list());
        assert!(options.has_default());
        assert_eq!(options.default, Some(DefaultFactory::list()));
    }
}
