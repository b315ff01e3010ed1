//! The process-wide handle is shared by every test in a binary, so all of
//! its checks live in one test.

use std::sync::Arc;
use std::thread;

use compehndly_core::{
    AdapterRegistry, Args, DispatchError, FunctionLookup, FunctionRegistry, Value, global,
};

fn registry(name: &'static str, result: i64) -> Arc<dyn FunctionLookup> {
    let mut registry = FunctionRegistry::new(None, &AdapterRegistry::with_base()).unwrap();
    registry
        .register_fn(name, "1.0.0", move |_: &Args| Ok(Value::Int(result)))
        .unwrap();
    Arc::new(registry)
}

#[test]
fn global_handle_override_and_reset() {
    let handle = global();

    handle.override_builder(|| Ok(registry("first", 1)));
    let first = handle.lookup("first").unwrap();
    assert_eq!(first.call(Args::new()).unwrap(), Value::Int(1));

    let readers: Vec<_> = (0..4)
        .map(|_| thread::spawn(|| global().get().map(|r| r.function_names())))
        .collect();
    handle.override_builder(|| Ok(registry("second", 2)));
    for reader in readers {
        let names = reader.join().unwrap().unwrap();
        assert!(names == ["first"] || names == ["second"], "saw {names:?}");
    }

    assert!(matches!(
        handle.lookup("first"),
        Err(DispatchError::UnknownFunction { .. })
    ));
    assert_eq!(
        handle.lookup("second").unwrap().call(Args::new()).unwrap(),
        Value::Int(2)
    );

    // an accessor taken before an override keeps the registry it came from
    handle.override_builder(|| Ok(registry("third", 3)));
    assert_eq!(first.call(Args::new()).unwrap(), Value::Int(1));

    handle.reset();
    assert!(!handle.is_initialized());
    assert!(handle.lookup("third").is_ok());
}
