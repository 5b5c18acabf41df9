//! Constructor for proxies with a default policy.

use crate::factory::DefaultFactory;
use crate::options::ProxyOptions;
use crate::proxy::AttributeProxy;
use crate::value::Mapping;

/// Builds an [`AttributeProxy`] whose missing keys are synthesized.
///
/// ```
/// use waterbear::{mapping, DefaultAttributeProxy, DefaultFactory, Value};
///
/// let proxy = DefaultAttributeProxy::new(DefaultFactory::none(), false, mapping! { "a" => 10 });
/// assert_eq!(proxy.get_attr("does_not_exist").unwrap(), Value::Null);
/// ```
pub struct DefaultAttributeProxy;

impl DefaultAttributeProxy {
    #[allow(clippy::new_ret_no_self)]
    pub fn new(
        default: impl Into<DefaultFactory>,
        idempotent_get: bool,
        entries: Mapping,
    ) -> AttributeProxy {
        let options = ProxyOptions::new()
            .default_value(default)
            .idempotent_get(idempotent_get);
        AttributeProxy::with_options(entries, options)
    }
}
