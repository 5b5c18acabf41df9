use waterbear::reserved;
use waterbear::{
    mapping, AttributeProxy, DefaultAttributeProxy, DefaultFactory, Mapping, ProxyOptions, Value,
};

fn setup() -> AttributeProxy {
    AttributeProxy::new(mapping! { "a" => 0, "b" => 1 })
}

fn nested(value: Value) -> AttributeProxy {
    match value {
        Value::Proxy(proxy) => proxy,
        other => panic!("Expected Proxy, got {:?}", other),
    }
}

#[test]
fn test_dot_access_scenario() {
    let args = setup();
    assert_eq!(args.get_attr("a").unwrap(), Value::Int(0));
    assert_eq!(args.get_attr("b").unwrap(), Value::Int(1));

    args.set_attr("haha", 0).unwrap();
    assert_eq!(args.get_attr("haha").unwrap(), Value::Int(0));

    args.set_attr("haha", mapping! { "a" => 1 }).unwrap();
    let haha = args.get_attr("haha").unwrap();
    // A wrapped view is never equal to the raw mapping it wraps.
    assert_ne!(haha, Value::Map(mapping! { "a" => 1 }));
    assert_eq!(haha.as_mapping(), Some(&mapping! { "a" => 1 }));
    assert_eq!(nested(haha).get_attr("a").unwrap(), Value::Int(1));

    let Value::Map(backing) = args.get_attr(reserved::BACKING).unwrap() else {
        panic!("Expected Map");
    };
    let Some(Value::Map(raw)) = backing.get("haha") else {
        panic!("Expected raw Map in backing");
    };
    assert_eq!(raw.get("a"), Some(Value::Int(1)));

    assert_eq!(args.to_string(), r#"{"a": 0, "b": 1, "haha": {"a": 1}}"#);
}

#[test]
fn test_non_recursive_scenario() {
    let entries = mapping! { reserved::RECURSIVE => false, "a" => 0, "b" => 1 };
    let args = AttributeProxy::from_kwargs(entries).unwrap();
    assert_eq!(args.get_attr(reserved::IS_RECURSIVE).unwrap(), Value::Bool(false));
    assert_eq!(args.get_attr("a").unwrap(), Value::Int(0));

    args.set_attr("haha", mapping! { "a" => 1 }).unwrap();
    let haha = args.get_attr("haha").unwrap();
    assert_eq!(haha, Value::Map(mapping! { "a" => 1 }));
    assert_eq!(
        haha.as_mapping().and_then(|m| m.get("a")),
        Some(Value::Int(1))
    );
}

#[test]
fn test_extra_entries_are_merged() {
    let entries = mapping! { "a" => 0, "b" => 1, "ha" => "ha", "no" => "no" };
    let args = AttributeProxy::new(entries);
    assert_eq!(args.get_attr("ha").unwrap(), Value::from("ha"));
}

#[test]
fn test_attr_and_item_agree_for_every_key() {
    let args = AttributeProxy::new(mapping! {
        "n" => 1,
        "s" => "x",
        "l" => vec![1, 2],
        "m" => mapping! { "k" => true },
    });
    for key in args.keys() {
        assert_eq!(args.get_attr(&key).unwrap(), args.get_item(&key).unwrap());
    }
}

#[test]
fn test_default_proxy_scenario() {
    let bear = DefaultAttributeProxy::new(Value::Null, false, mapping! { "a" => 10, "b" => 100 });
    assert_eq!(bear.backing(), &mapping! { "a" => 10, "b" => 100 });
    assert!(bear.get_attr("does_not_exist").unwrap().is_null());

    let bear = DefaultAttributeProxy::new(DefaultFactory::list(), false, mapping! { "a" => 10 });
    assert_eq!(bear.get_attr("does_not_exist").unwrap(), Value::List(vec![]));
}

#[test]
fn test_non_idempotent_default_persists_first_value() {
    let bear = DefaultAttributeProxy::new(
        DefaultFactory::from_fn(|| Value::from(vec![Value::Null])),
        false,
        Mapping::new(),
    );
    let first = bear.get_attr("xs").unwrap();
    assert!(bear.contains_key("xs"));
    assert_eq!(bear.backing().get("xs"), Some(first.clone()));
    assert_eq!(bear.get_attr("xs").unwrap(), first);
}

#[test]
fn test_idempotent_default_yields_independent_instances() {
    let bear = DefaultAttributeProxy::new(DefaultFactory::dict(), true, Mapping::new());
    let first = nested(bear.get_attr("cfg").unwrap());
    let second = nested(bear.get_attr("cfg").unwrap());
    assert!(!first.backing().ptr_eq(second.backing()));
    assert!(!bear.contains_key("cfg"));
}

#[test]
fn test_deep_copy_law() {
    let original = AttributeProxy::new(mapping! { "inner" => mapping! { "v" => 1 } });
    let copy = original.deep_copy();

    nested(copy.get_attr("inner").unwrap()).set_item("v", 2).unwrap();
    assert_eq!(
        nested(original.get_attr("inner").unwrap()).get_attr("v").unwrap(),
        Value::Int(1)
    );

    nested(original.get_attr("inner").unwrap()).set_item("v", 3).unwrap();
    assert_eq!(
        nested(copy.get_attr("inner").unwrap()).get_attr("v").unwrap(),
        Value::Int(2)
    );
}

#[test]
fn test_deep_copy_preserves_policy() {
    let options = ProxyOptions::new()
        .recursive(false)
        .default_value(Value::Int(7))
        .idempotent_get(true);
    let original = AttributeProxy::with_options(mapping! { "a" => 1 }, options);
    let copy = original.deep_copy();
    assert_eq!(copy.options(), original.options());
    assert_eq!(copy.get_attr("missing").unwrap(), Value::Int(7));
}

#[test]
fn test_shallow_copy_law() {
    let original = AttributeProxy::new(mapping! { "top" => 1, "inner" => mapping! { "v" => 1 } });
    let copy = original.shallow_copy();

    nested(copy.get_attr("inner").unwrap()).set_item("v", 2).unwrap();
    assert_eq!(
        nested(original.get_attr("inner").unwrap()).get_attr("v").unwrap(),
        Value::Int(2)
    );

    copy.set_attr("top", 99).unwrap();
    assert_eq!(original.get_attr("top").unwrap(), Value::Int(1));
}

#[test]
fn test_clone_aliases_backing() {
    let original = setup();
    let alias = original.clone();
    alias.set_item("c", 2).unwrap();
    assert!(original.contains_key("c"));
}

#[test]
fn test_truthiness() {
    assert!(!AttributeProxy::new(Mapping::new()).is_truthy());
    assert!(setup().is_truthy());
    assert!(!Value::Proxy(AttributeProxy::default()).is_truthy());
}

#[test]
fn test_cyclic_proxy_formats_and_compares() {
    let args = setup();
    args.set_item("me", args.backing().clone()).unwrap();

    assert_eq!(args.to_string(), r#"{"a": 0, "b": 1, "me": {...}}"#);
    assert!(format!("{:?}", args).contains("{...}"));

    let copy = args.deep_copy();
    assert_eq!(copy.backing(), args.backing());
    let me = nested(copy.get_attr("me").unwrap());
    assert!(me.backing().ptr_eq(copy.backing()));
}

#[test]
fn test_attribute_and_item_writes_share_a_receiver() {
    let args = setup();
    let write = |proxy: &AttributeProxy| {
        proxy.set_attr("c", 2).unwrap();
        proxy.del_attr("a").unwrap();
        proxy.set_item("d", 3).unwrap();
        proxy.del_item("b").unwrap();
    };
    write(&args);
    assert_eq!(args.keys(), vec!["c", "d"]);
}

#[test]
fn test_policy_writes_go_through_set_policy() {
    let mut args = setup();
    assert!(args.set_attr(reserved::RECURSIVE, false).is_err());

    args.set_policy(reserved::RECURSIVE, false).unwrap();
    args.set_item("m", mapping! { "k" => 1 }).unwrap();
    assert_eq!(args.get_attr("m").unwrap(), Value::Map(mapping! { "k" => 1 }));

    args.set_policy(reserved::DEFAULT, 0).unwrap();
    assert_eq!(args.get_attr("missing").unwrap(), Value::Int(0));
    args.del_policy(reserved::DEFAULT).unwrap();
    assert!(args.get_attr("other").unwrap_err().is_missing_key());
}

#[test]
fn test_missing_key_can_be_probed() {
    let args = setup();
    match args.get_attr("nope") {
        Err(err) if err.is_missing_key() => {}
        other => panic!("Expected MissingKey, got {:?}", other),
    }
    assert_eq!(args.try_get("nope").unwrap(), None);
}
