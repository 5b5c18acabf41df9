//! Persisted proxy state.

use serde::{Deserialize, Serialize};

use crate::factory::FactoryState;
use crate::value::Mapping;

/// Everything needed to rebuild an [`AttributeProxy`](crate::AttributeProxy).
///
/// `default` is present exactly when `has_default` is true. Observers are
/// not part of the state; a restored proxy starts with a no-op observer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProxyState {
    pub backing: Mapping,
    pub recursive: bool,
    pub has_default: bool,
    pub idempotent_get: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<FactoryState>,
}
