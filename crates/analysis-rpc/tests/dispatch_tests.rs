//! Integration tests for overload resolution and invocation.

use analysis_rpc::dispatch::{AmbiguityPolicy, Contract, DispatchTarget, Dispatchable};
use analysis_rpc::value::{ObjectArray, Prim};
use analysis_rpc::{Exception, RpcError, Type, Value};
use std::sync::{Arc, OnceLock};

const INT: Type = Type::Primitive(Prim::Int);

/// Nine `count` overloads taking 0 through 8 ints.
struct Counter;

impl Dispatchable for Counter {
    fn contract(&self) -> Arc<Contract> {
        static CONTRACT: OnceLock<Arc<Contract>> = OnceLock::new();
        CONTRACT
            .get_or_init(|| {
                let mut builder = Contract::builder::<Counter>("test.Counter");
                for k in 0..=8 {
                    builder = builder.method("count", vec![INT; k], move |_: &Counter, args| {
                        assert_eq!(args.len(), k);
                        Ok(Value::Int(k as i32))
                    });
                }
                builder.build()
            })
            .clone()
    }
}

#[test]
fn test_overloads_resolve_by_arity() {
    let target = DispatchTarget::new(Arc::new(Counter));
    for k in 0..=8 {
        let args = (0..k).map(|i| Value::Int(i as i32)).collect();
        assert_eq!(target.invoke("count", args).unwrap(), Value::Int(k as i32));
    }
}

#[test]
fn test_arity_gate() {
    let target = DispatchTarget::new(Arc::new(Counter));
    let args = (0..9).map(Value::Int).collect();
    match target.invoke("count", args) {
        Err(RpcError::MethodNotFound { method, .. }) => assert_eq!(method, "count"),
        other => panic!("Expected MethodNotFound, got: {:?}", other),
    }
    // Right arity, wrong argument types.
    match target.invoke("count", vec![Value::from("one")]) {
        Err(RpcError::MethodNotFound { arg_types, .. }) => {
            assert_eq!(arg_types, "java.lang.String")
        }
        other => panic!("Expected MethodNotFound, got: {:?}", other),
    }
}

/// Overloads over primitives, boxed types, strings and arrays.
struct Typed;

impl Dispatchable for Typed {
    fn contract(&self) -> Arc<Contract> {
        static CONTRACT: OnceLock<Arc<Contract>> = OnceLock::new();
        CONTRACT
            .get_or_init(|| {
                Contract::builder::<Typed>("test.Typed")
                    .method("primitive", vec![INT], |_: &Typed, args| {
                        Ok(Value::Int(args.int(0)? * 2))
                    })
                    .method("text", vec![Type::String], |_: &Typed, args| {
                        Ok(Value::from(args.opt_str(0)?.unwrap_or("<null>")))
                    })
                    .method("which", vec![Type::Boxed(Prim::Int)], |_: &Typed, _| {
                        Ok(Value::from("Integer"))
                    })
                    .method("which", vec![Type::String], |_: &Typed, _| {
                        Ok(Value::from("String"))
                    })
                    .method(
                        "sum",
                        vec![Type::array_of(Type::Primitive(Prim::Double))],
                        |_: &Typed, args| Ok(Value::from(format!("double[] {}", args.doubles(0)?.iter().sum::<f64>()))),
                    )
                    .method(
                        "sum",
                        vec![Type::array_of(Type::Primitive(Prim::Int))],
                        |_: &Typed, args| Ok(Value::from(format!("int[] {}", args.doubles(0)?.iter().sum::<f64>()))),
                    )
                    .method(
                        "sum",
                        vec![Type::array_of(Type::Number)],
                        |_: &Typed, args| Ok(Value::from(format!("Number[] {}", args.doubles(0)?.iter().sum::<f64>()))),
                    )
                    .method("boxed", vec![Type::Boxed(Prim::Long)], |_: &Typed, args| {
                        Ok(Value::Long(args.long(0)? + 1))
                    })
                    .method("kind", vec![Type::Primitive(Prim::Char)], |_: &Typed, args| {
                        Ok(Value::from(format!("char {}", args.char(0)?)))
                    })
                    .method("kind", vec![INT], |_: &Typed, _| Ok(Value::from("int")))
                    .method(
                        "kind",
                        vec![Type::array_of(Type::Primitive(Prim::Char))],
                        |_: &Typed, _| Ok(Value::from("char[]")),
                    )
                    .method(
                        "kind",
                        vec![Type::array_of(Type::Boxed(Prim::Char))],
                        |_: &Typed, _| Ok(Value::from("Character[]")),
                    )
                    .build()
            })
            .clone()
    }
}

fn typed() -> DispatchTarget {
    DispatchTarget::new(Arc::new(Typed))
}

#[test]
fn test_null_against_primitive_is_not_found() {
    assert!(matches!(
        typed().invoke("primitive", vec![Value::Null]),
        Err(RpcError::MethodNotFound { .. })
    ));
    assert_eq!(
        typed().invoke("primitive", vec![Value::Int(21)]).unwrap(),
        Value::Int(42)
    );
}

#[test]
fn test_null_against_reference_succeeds() {
    assert_eq!(
        typed().invoke("text", vec![Value::Null]).unwrap(),
        Value::from("<null>")
    );
}

#[test]
fn test_typed_none_selects_overload() {
    let target = typed().with_policy(AmbiguityPolicy::Reject);
    assert_eq!(
        target
            .invoke("which", vec![Value::typed_none(Type::Boxed(Prim::Int))])
            .unwrap(),
        Value::from("Integer")
    );
    assert_eq!(
        target
            .invoke("which", vec![Value::typed_none(Type::String)])
            .unwrap(),
        Value::from("String")
    );
    // A plain null matches both.
    assert!(matches!(
        target.invoke("which", vec![Value::Null]),
        Err(RpcError::AmbiguousMethod { .. })
    ));
    // A typed none for an unrelated type matches neither.
    assert!(matches!(
        target.invoke("which", vec![Value::typed_none(Type::Map)]),
        Err(RpcError::MethodNotFound { .. })
    ));
}

#[test]
fn test_plain_null_takes_first_declared_by_default() {
    assert_eq!(
        typed().invoke("which", vec![Value::Null]).unwrap(),
        Value::from("Integer")
    );
}

#[test]
fn test_arrays_select_by_element_type() {
    let target = typed();
    assert_eq!(
        target.invoke("sum", vec![Value::from(vec![1.5f64, 2.5])]).unwrap(),
        Value::from("double[] 4")
    );
    assert_eq!(
        target.invoke("sum", vec![Value::from(vec![1i32, 2, 3])]).unwrap(),
        Value::from("int[] 6")
    );
    let boxed = ObjectArray::infer(vec![Value::Long(1), Value::Long(2)]);
    assert_eq!(
        target.invoke("sum", vec![Value::Array(boxed)]).unwrap(),
        Value::from("Number[] 3")
    );
}

#[test]
fn test_boxed_parameter_takes_exact_kind_only() {
    let target = typed();
    assert_eq!(
        target.invoke("boxed", vec![Value::Long(1)]).unwrap(),
        Value::Long(2)
    );
    assert!(matches!(
        target.invoke("boxed", vec![Value::Int(1)]),
        Err(RpcError::MethodNotFound { .. })
    ));
}

#[test]
fn test_char_and_char_arrays_select_overload() {
    let target = typed().with_policy(AmbiguityPolicy::Reject);
    assert_eq!(
        target.invoke("kind", vec![Value::Char('x')]).unwrap(),
        Value::from("char x")
    );
    assert_eq!(target.invoke("kind", vec![Value::Int(0)]).unwrap(), Value::from("int"));
    assert_eq!(
        target.invoke("kind", vec![Value::from(vec!['\0'])]).unwrap(),
        Value::from("char[]")
    );
    let boxed = ObjectArray::infer(vec![Value::Char('\0')]);
    assert_eq!(
        target.invoke("kind", vec![Value::Array(boxed)]).unwrap(),
        Value::from("Character[]")
    );
}

/// Concrete type with more methods than the interface it implements.
struct Square {
    side: f64,
}

const SHAPE: &str = "test.Shape";

fn shape_interface() -> Arc<Contract> {
    Contract::interface(SHAPE)
        .method("area", vec![])
        .static_method("unit", vec![], |_| Ok(Value::Double(1.0)))
        .build()
}

impl Dispatchable for Square {
    fn contract(&self) -> Arc<Contract> {
        static CONTRACT: OnceLock<Arc<Contract>> = OnceLock::new();
        CONTRACT
            .get_or_init(|| {
                Contract::builder::<Square>("test.Square")
                    .implements(SHAPE)
                    .method("area", vec![], |s: &Square, _| Ok(Value::Double(s.side * s.side)))
                    .method("side", vec![], |s: &Square, _| Ok(Value::Double(s.side)))
                    .build()
            })
            .clone()
    }
}

#[test]
fn test_contract_narrowing_hides_concrete_methods() {
    let target = DispatchTarget::with_contract(shape_interface(), Arc::new(Square { side: 3.0 }))
        .unwrap();
    assert_eq!(target.invoke("area", vec![]).unwrap(), Value::Double(9.0));
    match target.invoke("side", vec![]) {
        Err(RpcError::MethodNotFound { destination, .. }) => assert_eq!(destination, SHAPE),
        other => panic!("Expected MethodNotFound, got: {:?}", other),
    }
    // Statics declared on the interface stay reachable.
    assert_eq!(target.invoke("unit", vec![]).unwrap(), Value::Double(1.0));

    let full = DispatchTarget::new(Arc::new(Square { side: 3.0 }));
    assert_eq!(full.invoke("side", vec![]).unwrap(), Value::Double(3.0));
}

#[test]
fn test_construction_fails_for_unimplemented_contract() {
    let other = Contract::interface("test.Other").method("area", vec![]).build();
    match DispatchTarget::with_contract(other, Arc::new(Square { side: 1.0 })) {
        Err(RpcError::Construction { message }) => assert!(message.contains("test.Other")),
        other => panic!("Expected Construction, got: {:?}", other),
    }

    // Declared but incomplete.
    let wider = Contract::interface(SHAPE)
        .method("area", vec![])
        .method("perimeter", vec![])
        .build();
    match DispatchTarget::with_contract(wider, Arc::new(Square { side: 1.0 })) {
        Err(RpcError::Construction { message }) => assert!(message.contains("perimeter")),
        other => panic!("Expected Construction, got: {:?}", other),
    }
}

fn measured() -> Arc<Contract> {
    static CONTRACT: OnceLock<Arc<Contract>> = OnceLock::new();
    CONTRACT
        .get_or_init(|| Contract::interface("test.Measured").method("size", vec![]).build())
        .clone()
}

fn solid() -> Arc<Contract> {
    static CONTRACT: OnceLock<Arc<Contract>> = OnceLock::new();
    CONTRACT
        .get_or_init(|| {
            Contract::interface("test.Solid")
                .extends(&measured())
                .method("volume", vec![])
                .build()
        })
        .clone()
}

struct Cube {
    side: f64,
}

impl Dispatchable for Cube {
    fn contract(&self) -> Arc<Contract> {
        static CONTRACT: OnceLock<Arc<Contract>> = OnceLock::new();
        CONTRACT
            .get_or_init(|| {
                Contract::builder::<Cube>("test.Cube")
                    .implements_interface(&solid())
                    .method("size", vec![], |c: &Cube, _| Ok(Value::Double(c.side)))
                    .method("volume", vec![], |c: &Cube, _| Ok(Value::Double(c.side.powi(3))))
                    .build()
            })
            .clone()
    }
}

#[test]
fn test_extended_interface_methods_reachable() {
    let cube = Arc::new(Cube { side: 2.0 });

    let target = DispatchTarget::with_contract(solid(), cube.clone()).unwrap();
    assert_eq!(target.invoke("volume", vec![]).unwrap(), Value::Double(8.0));
    assert_eq!(target.invoke("size", vec![]).unwrap(), Value::Double(2.0));

    // Narrowing to the parent interface works through the child.
    let target = DispatchTarget::with_contract(measured(), cube).unwrap();
    assert_eq!(target.invoke("size", vec![]).unwrap(), Value::Double(2.0));
    match target.invoke("volume", vec![]) {
        Err(RpcError::MethodNotFound { destination, .. }) => assert_eq!(destination, "test.Measured"),
        other => panic!("Expected MethodNotFound, got: {:?}", other),
    }
}

/// Instance and static overloads of the same name.
struct Factory;

impl Dispatchable for Factory {
    fn contract(&self) -> Arc<Contract> {
        static CONTRACT: OnceLock<Arc<Contract>> = OnceLock::new();
        CONTRACT
            .get_or_init(|| {
                Contract::builder::<Factory>("test.Factory")
                    .static_method("make", vec![Type::Object], |_| Ok(Value::from("static")))
                    .method("make", vec![Type::String], |_: &Factory, _| {
                        Ok(Value::from("instance"))
                    })
                    .method("read", vec![Type::String], |_: &Factory, args| {
                        let path = args.str(0)?;
                        let err = std::io::Error::new(
                            std::io::ErrorKind::NotFound,
                            format!("{} not found", path),
                        );
                        Err(Exception::from(err))
                    })
                    .method("crash", vec![], |_: &Factory, _| {
                        let empty: Vec<i32> = Vec::new();
                        Ok(Value::Int(empty[3]))
                    })
                    .build()
            })
            .clone()
    }
}

#[test]
fn test_instance_methods_win_over_statics() {
    let target = DispatchTarget::new(Arc::new(Factory)).with_policy(AmbiguityPolicy::Reject);
    assert_eq!(
        target.invoke("make", vec![Value::from("x")]).unwrap(),
        Value::from("instance")
    );
    // Only the static overload takes an int.
    assert_eq!(
        target.invoke("make", vec![Value::Int(1)]).unwrap(),
        Value::from("static")
    );
}

#[test]
fn test_returned_error_is_wrapped_with_cause() {
    let target = DispatchTarget::new(Arc::new(Factory));
    match target.dispatch("files", "read", vec![Value::from("/nope")]) {
        Err(RpcError::Invocation {
            destination,
            method,
            cause,
        }) => {
            assert_eq!(destination, "files");
            assert_eq!(method, "read");
            assert_eq!(cause.kind, "std::io::Error");
            assert_eq!(cause.message, "/nope not found");
        }
        other => panic!("Expected Invocation, got: {:?}", other),
    }
}

#[test]
fn test_panic_is_wrapped_and_target_survives() {
    let target = DispatchTarget::new(Arc::new(Factory));
    match target.invoke("crash", vec![]) {
        Err(RpcError::Invocation { cause, .. }) => {
            assert_eq!(cause.kind, Exception::PANIC_KIND);
            assert!(cause.message.contains("index out of bounds"));
        }
        other => panic!("Expected Invocation, got: {:?}", other),
    }
    assert_eq!(
        target.invoke("make", vec![Value::from("x")]).unwrap(),
        Value::from("instance")
    );
}
